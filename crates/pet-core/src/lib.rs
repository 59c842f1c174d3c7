pub mod ai;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod expression;
pub mod model;
pub mod priming;
pub mod session;
pub mod state;
pub mod tags;

// Re-export main types for convenience
pub use ai::{GeminiClient, GeminiOptions};
pub use config::Config;
pub use dispatcher::{HistoryPolicy, RequestDispatcher, ResponseRecord};
pub use error::{FailureKind, RequestError};
pub use expression::{AppClock, ExpressionController, ExpressionState};
pub use priming::{PrimingCoordinator, PrimingState, ReplyDisposition};
pub use session::{Author, ChatLog, ChatSession, LogLine, SubmitOutcome};
pub use state::{ChatRole, ChatTurn, ConversationHistory};
pub use tags::{extract, Extraction};
