//! One-shot startup handshake
//!
//! Before real chat starts, a fixed instruction is sent so the model knows to
//! tag its replies with expression markers. The first successful reply is the
//! acknowledgement and is never shown as a chat message.

use tracing::{info, warn};

use crate::dispatcher::{RequestDispatcher, ResponseRecord};

pub const DEFAULT_PRIMING_PROMPT: &str = "You are the voice of a small animated desktop companion. \
Keep replies short and friendly. Begin every reply with exactly one expression marker in square \
brackets that matches your mood, chosen from: [F01] neutral, [F02] talking, [F03] angry, \
[F04] sad, [F05] happy, [F06] surprised, [F07] shy, [F08] confused. \
Do not use square brackets for anything else. \
If you understand, reply with a marker followed by a one-line greeting.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimingState {
    NotStarted,
    Priming,
    Ready,
}

/// How a successful reply should be treated by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Handshake acknowledgement: apply its markers, show a notice, hide the text.
    Handshake,
    /// Normal reply shown in the chat log.
    Visible,
}

pub struct PrimingCoordinator {
    state: PrimingState,
    prompt: String,
    handshake_id: u64,
}

impl PrimingCoordinator {
    pub fn new(prompt: Option<String>) -> Self {
        Self {
            state: PrimingState::NotStarted,
            prompt: prompt.unwrap_or_else(|| DEFAULT_PRIMING_PROMPT.to_string()),
            handshake_id: 0,
        }
    }

    pub fn state(&self) -> PrimingState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PrimingState::Ready
    }

    /// Send the instruction prompt. Returns the request id, or 0 when the
    /// handshake was already started or the dispatcher was busy.
    pub fn start(&mut self, dispatcher: &RequestDispatcher) -> u64 {
        if self.state != PrimingState::NotStarted {
            return 0;
        }
        let id = dispatcher.send_message(&self.prompt);
        if id != 0 {
            info!(request_id = id, "Priming handshake sent");
            self.state = PrimingState::Priming;
            self.handshake_id = id;
        }
        id
    }

    /// Forget the handshake so `start` can send it again. Returns true when
    /// one had been started.
    pub fn reset(&mut self) -> bool {
        let started = self.state != PrimingState::NotStarted;
        self.state = PrimingState::NotStarted;
        self.handshake_id = 0;
        started
    }

    /// Decide whether a success record is the handshake or a visible reply.
    pub fn classify_success(&mut self, record: &ResponseRecord) -> ReplyDisposition {
        if self.state == PrimingState::Priming {
            info!(request_id = record.request_id, "Priming handshake acknowledged");
            self.state = PrimingState::Ready;
            ReplyDisposition::Handshake
        } else {
            ReplyDisposition::Visible
        }
    }

    /// A failed handshake still ends priming so no later reply is swallowed.
    /// Returns true when the record was the handshake's.
    pub fn observe_error(&mut self, record: &ResponseRecord) -> bool {
        if self.state == PrimingState::Priming && record.request_id == self.handshake_id {
            warn!(request_id = record.request_id, error = %record.error_text, "Priming handshake failed");
            self.state = PrimingState::Ready;
            true
        } else {
            false
        }
    }
}
