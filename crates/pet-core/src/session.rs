//! Glue between the dispatcher and whatever draws the avatar.
//!
//! A front end owns one [`ChatSession`], calls [`ChatSession::submit`] when the
//! user presses enter and [`ChatSession::poll`] once per frame.

use std::collections::VecDeque;

use anyhow::Result;
use tracing::warn;

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::dispatcher::{RequestDispatcher, ResponseRecord};
use crate::expression::ExpressionController;
use crate::model;
use crate::priming::{PrimingCoordinator, PrimingState, ReplyDisposition};
use crate::tags;

/// Oldest lines are dropped past this many.
pub const MAX_LOG_LINES: usize = 50;

pub const READY_NOTICE: &str = "AI is ready! Say hello.";
pub const NOT_READY_NOTICE: &str = "AI is not ready yet, it is still warming up...";
pub const BUSY_NOTICE: &str = "AI is busy, please wait...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    You,
    Ai,
    System,
}

impl Author {
    pub fn label(&self) -> &'static str {
        match self {
            Author::You => "You",
            Author::Ai => "AI",
            Author::System => "System",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub author: Author,
    pub text: String,
}

/// What the user sees in the chat window
#[derive(Debug, Default)]
pub struct ChatLog {
    lines: VecDeque<LogLine>,
}

impl ChatLog {
    pub fn push(&mut self, author: Author, text: impl Into<String>) {
        self.lines.push_back(LogLine {
            author,
            text: text.into(),
        });
        while self.lines.len() > MAX_LOG_LINES {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent(u64),
    Busy,
    Empty,
}

pub struct ChatSession {
    dispatcher: RequestDispatcher,
    priming: PrimingCoordinator,
    expressions: ExpressionController,
    log: ChatLog,
}

impl ChatSession {
    pub fn new(
        dispatcher: RequestDispatcher,
        priming: PrimingCoordinator,
        expressions: ExpressionController,
    ) -> Self {
        Self {
            dispatcher,
            priming,
            expressions,
            log: ChatLog::default(),
        }
    }

    /// Wire up client, dispatcher, expressions and priming from `config`.
    /// Must be called from within a Tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!("No API key configured; requests will be rejected by the endpoint");
        }

        let client = GeminiClient::new(&config.gemini_options(), api_key.as_deref())?;
        let dispatcher = RequestDispatcher::new(client, config.history_policy());
        let library = model::expression_library(config.model_setting.as_deref())?;
        let expressions = ExpressionController::new(library, config.expression_duration_secs);
        let priming = PrimingCoordinator::new(config.priming_prompt.clone());

        Ok(Self::new(dispatcher, priming, expressions))
    }

    /// Kick off the priming handshake.
    pub fn start(&mut self) -> u64 {
        let id = self.priming.start(&self.dispatcher);
        if id != 0 {
            self.log.push(Author::System, "Waking up the assistant...");
        }
        id
    }

    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }

        self.log.push(Author::You, text);
        let priming = self.priming.state() == PrimingState::Priming;
        if priming {
            self.log.push(Author::System, NOT_READY_NOTICE);
        }

        match self.dispatcher.send_message(text) {
            0 => {
                if !priming {
                    self.log.push(Author::System, BUSY_NOTICE);
                }
                SubmitOutcome::Busy
            }
            id => SubmitOutcome::Sent(id),
        }
    }

    /// Drain finished requests and advance expression timers. Call once per frame.
    pub fn poll(&mut self, now: f64) {
        self.expressions.tick(now);

        while let Some(record) = self.dispatcher.pop_success_response() {
            self.handle_success(record);
        }
        while let Some(record) = self.dispatcher.pop_error_response() {
            self.handle_error(record);
        }
    }

    fn handle_success(&mut self, record: ResponseRecord) {
        let extraction = tags::extract(&record.text);
        let disposition = self.priming.classify_success(&record);

        let applied = extraction
            .markers
            .iter()
            .any(|marker| self.expressions.apply_marker(marker));
        if !applied && extraction.markers.is_empty() {
            self.expressions.apply_text(&extraction.cleaned_text);
        }

        match disposition {
            ReplyDisposition::Handshake => self.log.push(Author::System, READY_NOTICE),
            ReplyDisposition::Visible => self.log.push(Author::Ai, extraction.cleaned_text),
        }
    }

    fn handle_error(&mut self, record: ResponseRecord) {
        if self.priming.observe_error(&record) {
            self.log.push(
                Author::System,
                format!("Warm-up failed, chatting without it. {}", record.error_text),
            );
        } else {
            self.log.push(Author::System, record.error_text.as_str());
        }
        self.expressions.apply_text(&record.error_text);
    }

    /// Forget the conversation. Refused while a request is in flight.
    ///
    /// The marker instruction lives in the cleared transcript, so a session
    /// that had been primed sends the handshake again.
    pub fn reset(&mut self) -> bool {
        if !self.dispatcher.clear_history() {
            self.log.push(Author::System, BUSY_NOTICE);
            return false;
        }
        self.log.clear();
        self.log.push(Author::System, "Conversation cleared.");
        if self.priming.reset() {
            self.start();
        }
        true
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn expressions(&self) -> &ExpressionController {
        &self.expressions
    }

    pub fn priming_state(&self) -> PrimingState {
        self.priming.state()
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}
