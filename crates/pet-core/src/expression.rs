//! Expression selection and timed reversion
//!
//! An emotion marker either names an expression directly (`F05`) or is free
//! text that gets matched against a keyword table. Applied expressions can be
//! temporary, in which case [`ExpressionController::tick`] puts the neutral
//! face back once their time is up.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, warn};

pub const NEUTRAL: &str = "F01";
pub const TALK: &str = "F02";
pub const ANGER: &str = "F03";
pub const SADNESS: &str = "F04";
pub const JOY: &str = "F05";
pub const SURPRISE: &str = "F06";
pub const SHYNESS: &str = "F07";
pub const CONFUSION: &str = "F08";

/// Expression codes every bundled model ships with.
pub const BUILTIN_EXPRESSIONS: [&str; 8] =
    [NEUTRAL, TALK, ANGER, SADNESS, JOY, SURPRISE, SHYNESS, CONFUSION];

// First match wins, so order matters.
const KEYWORD_TABLE: &[(&[&str], &str)] = &[
    (&["高兴", "开心", "笑", "happy", "glad", "joy"], JOY),
    (&["生气", "愤怒", "气", "angry", "mad"], ANGER),
    (&["难过", "伤心", "哭", "sad", "unhappy", "sorrow"], SADNESS),
    (&["惊讶", "惊", "surprise", "wow"], SURPRISE),
    (&["害羞", "脸红", "不好意思", "shy", "embarrass"], SHYNESS),
    (&["困惑", "疑惑", "疑问", "confuse", "huh"], CONFUSION),
    (&["open", "mouth", "说话", "嘴"], TALK),
];

const ERROR_INDICATORS: &[&str] = &[
    "error:",
    "failed",
    "http request failed",
    "timed out",
    "connection refused",
];

/// Normalize a direct expression code (`F` or `f` plus 2-3 digits).
pub fn direct_code(marker: &str) -> Option<String> {
    let mut chars = marker.chars();
    let first = chars.next()?;
    if !first.eq_ignore_ascii_case(&'f') {
        return None;
    }
    let digits = chars.as_str();
    let valid = (2..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| format!("F{digits}"))
}

/// Map free text to an expression code via the keyword table.
pub fn infer_expression(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let contains = |needle: &str| text.contains(needle) || lower.contains(needle);

    for (keywords, code) in KEYWORD_TABLE {
        if keywords.iter().any(|k| contains(*k)) {
            return *code;
        }
    }

    if ERROR_INDICATORS.iter().any(|k| contains(*k)) {
        SADNESS
    } else {
        NEUTRAL
    }
}

/// Resolve a marker: direct codes bypass the keyword table entirely.
pub fn resolve_marker(marker: &str) -> String {
    direct_code(marker).unwrap_or_else(|| infer_expression(marker).to_string())
}

/// Application-wide monotonic clock, in seconds since construction
#[derive(Debug, Clone, Copy)]
pub struct AppClock {
    start: Instant,
}

impl AppClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for AppClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionState {
    pub current_name: String,
    pub is_temporary: bool,
    pub duration_seconds: f64,
    pub set_at_time: f64,
}

pub struct ExpressionController {
    library: BTreeSet<String>,
    state: ExpressionState,
    now: f64,
    default_duration: f64,
}

impl ExpressionController {
    /// `library` holds the names of the loaded expression resources.
    pub fn new<I, S>(library: I, default_duration: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            library: library.into_iter().map(Into::into).collect(),
            state: ExpressionState {
                current_name: NEUTRAL.to_string(),
                is_temporary: false,
                duration_seconds: 0.0,
                set_at_time: 0.0,
            },
            now: 0.0,
            default_duration,
        }
    }

    pub fn state(&self) -> &ExpressionState {
        &self.state
    }

    pub fn current(&self) -> &str {
        &self.state.current_name
    }

    pub fn has_expression(&self, name: &str) -> bool {
        self.library.contains(name)
    }

    pub fn expression_names(&self) -> impl Iterator<Item = &str> {
        self.library.iter().map(String::as_str)
    }

    /// Seconds until a temporary expression reverts.
    pub fn remaining(&self) -> Option<f64> {
        self.state.is_temporary.then(|| {
            (self.state.set_at_time + self.state.duration_seconds - self.now).max(0.0)
        })
    }

    /// Start `name` as the active expression.
    ///
    /// Unknown names are logged and ignored. A positive duration makes the
    /// expression temporary; zero or less makes it permanent.
    pub fn apply(&mut self, name: &str, duration_seconds: f64) -> bool {
        if !self.library.contains(name) {
            warn!(expression = name, "Expression not found in loaded model");
            return false;
        }

        debug!(expression = name, duration = duration_seconds, "Starting expression");
        self.state.current_name = name.to_string();
        if duration_seconds > 0.0 {
            self.state.is_temporary = true;
            self.state.duration_seconds = duration_seconds;
            self.state.set_at_time = self.now;
        } else {
            self.state.is_temporary = false;
            self.state.duration_seconds = 0.0;
        }
        true
    }

    /// Apply a marker from a reply for the default duration.
    pub fn apply_marker(&mut self, marker: &str) -> bool {
        let name = resolve_marker(marker);
        self.apply(&name, self.default_duration)
    }

    /// Infer an expression from arbitrary text and apply it for the default duration.
    pub fn apply_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.apply(infer_expression(text), self.default_duration)
    }

    /// Advance the controller clock and revert an expired temporary expression.
    pub fn tick(&mut self, now: f64) {
        self.now = now;
        if !self.state.is_temporary || self.state.duration_seconds <= 0.0 {
            return;
        }
        if now - self.state.set_at_time >= self.state.duration_seconds {
            self.apply(NEUTRAL, 0.0);
            // Cleared even when the neutral expression is missing.
            self.state.is_temporary = false;
            self.state.duration_seconds = 0.0;
        }
    }
}
