//! Single-flight chat request dispatcher
//!
//! One long-lived worker task owns all network I/O. `send_message` hands it a
//! request through a one-slot channel; the worker publishes exactly one
//! [`ResponseRecord`] per request into the success or error queue and only
//! then clears the busy flag. Callers poll the queues once per frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::GeminiClient;
use crate::error::{FailureKind, RequestError};
use crate::state::{ChatTurn, ConversationHistory};

/// What happens to the optimistic user turn when its request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// Leave the unanswered user turn in place; it is replayed next time.
    #[default]
    KeepFailedTurns,
    /// Remove the user turn again so the transcript only holds answered turns.
    RollbackFailedTurns,
}

/// Outcome of one completed request
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub request_id: u64,
    pub success: bool,
    /// Reply text, set when `success` is true
    pub text: String,
    /// Human-readable failure, set when `success` is false
    pub error_text: String,
    pub code: i32,
    pub kind: Option<FailureKind>,
    pub timestamp: Instant,
}

impl ResponseRecord {
    fn success(request_id: u64, text: String) -> Self {
        Self {
            request_id,
            success: true,
            text,
            error_text: String::new(),
            code: 0,
            kind: None,
            timestamp: Instant::now(),
        }
    }

    fn failure(request_id: u64, err: &RequestError) -> Self {
        Self {
            request_id,
            success: false,
            text: String::new(),
            error_text: format!("Error: {err}"),
            code: err.code(),
            kind: Some(err.kind()),
            timestamp: Instant::now(),
        }
    }
}

struct PendingRequest {
    id: u64,
    text: String,
    transcript: Vec<ChatTurn>,
}

#[derive(Default)]
struct ResponseQueue {
    records: Mutex<VecDeque<ResponseRecord>>,
}

impl ResponseQueue {
    fn push(&self, record: ResponseRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(record);
    }

    /// Never waits: a contended lock reads as empty and is retried next frame.
    fn try_pop(&self) -> Option<ResponseRecord> {
        match self.records.try_lock() {
            Ok(mut records) => records.pop_front(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().pop_front(),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

struct Shared {
    client: GeminiClient,
    history: Mutex<ConversationHistory>,
    successes: ResponseQueue,
    errors: ResponseQueue,
    busy: AtomicBool,
    policy: HistoryPolicy,
}

impl Shared {
    fn history(&self) -> MutexGuard<'_, ConversationHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn perform(&self, request: PendingRequest) -> ResponseRecord {
        match self.client.generate(&request.transcript).await {
            Ok(reply) => {
                info!(request_id = request.id, chars = reply.len(), "Chat request completed");
                self.history().push(ChatTurn::model(reply.clone()));
                ResponseRecord::success(request.id, reply)
            }
            Err(err) => {
                warn!(request_id = request.id, code = err.code(), error = %err, "Chat request failed");
                if self.policy == HistoryPolicy::RollbackFailedTurns {
                    self.history().pop_trailing_user(&request.text);
                }
                ResponseRecord::failure(request.id, &err)
            }
        }
    }

    fn publish(&self, record: ResponseRecord) {
        if record.success {
            self.successes.push(record);
        } else {
            self.errors.push(record);
        }
    }
}

pub struct RequestDispatcher {
    shared: Arc<Shared>,
    sender: mpsc::Sender<PendingRequest>,
    worker: JoinHandle<()>,
    last_request_id: AtomicU64,
}

impl RequestDispatcher {
    /// Spawn the worker task. Must be called from within a Tokio runtime.
    pub fn new(client: GeminiClient, policy: HistoryPolicy) -> Self {
        let shared = Arc::new(Shared {
            client,
            history: Mutex::new(ConversationHistory::new()),
            successes: ResponseQueue::default(),
            errors: ResponseQueue::default(),
            busy: AtomicBool::new(false),
            policy,
        });

        let (sender, receiver) = mpsc::channel(1);
        let worker = tokio::spawn(run_worker(receiver, Arc::clone(&shared)));

        Self {
            shared,
            sender,
            worker,
            last_request_id: AtomicU64::new(0),
        }
    }

    /// Start a chat turn in the background.
    ///
    /// Returns the new request id, or `0` when a request is already in flight
    /// (nothing is queued and the history is untouched in that case).
    pub fn send_message(&self, text: &str) -> u64 {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Still processing previous request, rejecting new one");
            return 0;
        }

        let id = self.last_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let transcript = {
            let mut history = self.shared.history();
            history.push(ChatTurn::user(text));
            history.turns().to_vec()
        };

        let request = PendingRequest {
            id,
            text: text.to_string(),
            transcript,
        };

        match self.sender.try_send(request) {
            Ok(()) => {
                info!(request_id = id, "Dispatched chat request");
                id
            }
            Err(err) => {
                warn!(request_id = id, error = %err, "Worker unavailable, dropping request");
                self.shared.history().pop_trailing_user(text);
                self.shared.busy.store(false, Ordering::Release);
                0
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    pub fn pop_success_response(&self) -> Option<ResponseRecord> {
        self.shared.successes.try_pop()
    }

    pub fn pop_error_response(&self) -> Option<ResponseRecord> {
        self.shared.errors.try_pop()
    }

    /// Copy of the transcript that the next request will build on.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.shared.history().turns().to_vec()
    }

    pub fn history_len(&self) -> usize {
        self.shared.history().len()
    }

    /// Drop the transcript. Refused (returns false) while a request is in flight.
    pub fn clear_history(&self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.shared.history().clear();
        true
    }

    /// Close the request channel and wait for the worker to finish its
    /// current request, if any.
    pub async fn shutdown(self) {
        let Self { sender, worker, .. } = self;
        drop(sender);
        if let Err(err) = worker.await {
            warn!(error = %err, "Dispatcher worker ended abnormally");
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<PendingRequest>, shared: Arc<Shared>) {
    while let Some(request) = receiver.recv().await {
        let record = shared.perform(request).await;
        shared.publish(record);
        shared.busy.store(false, Ordering::Release);
    }
    debug!("Dispatcher worker stopped");
}
