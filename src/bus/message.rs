// User messages - the unit of console output
//
// A message carries semantics only (level + text + time + error flag).
// Terminal styling is applied by the printer at render time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity/kind of a console message.
///
/// Levels travel as numeric codes between collaborators. A code outside
/// the known range decodes to `Unknown` so it can still be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MessageLevel {
    Plain,
    Info,
    Note,
    Warn,
    Debug,
    Success,
    Unknown(u8),
}

impl MessageLevel {
    /// Numeric wire code of this level
    pub fn code(self) -> u8 {
        match self {
            MessageLevel::Plain => 0,
            MessageLevel::Info => 1,
            MessageLevel::Note => 2,
            MessageLevel::Warn => 3,
            MessageLevel::Debug => 4,
            MessageLevel::Success => 5,
            MessageLevel::Unknown(code) => code,
        }
    }
}

impl From<u8> for MessageLevel {
    fn from(code: u8) -> Self {
        match code {
            0 => MessageLevel::Plain,
            1 => MessageLevel::Info,
            2 => MessageLevel::Note,
            3 => MessageLevel::Warn,
            4 => MessageLevel::Debug,
            5 => MessageLevel::Success,
            other => MessageLevel::Unknown(other),
        }
    }
}

impl From<MessageLevel> for u8 {
    fn from(level: MessageLevel) -> Self {
        level.code()
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLevel::Plain => write!(f, "plain"),
            MessageLevel::Info => write!(f, "info"),
            MessageLevel::Note => write!(f, "note"),
            MessageLevel::Warn => write!(f, "warn"),
            MessageLevel::Debug => write!(f, "debug"),
            MessageLevel::Success => write!(f, "success"),
            MessageLevel::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// A leveled, timestamped unit of console output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    level: MessageLevel,
    text: String,
    time: DateTime<Utc>,
    #[serde(default)]
    error: bool,
}

impl UserMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            time: Utc::now(),
            error: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Plain, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, text)
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Note, text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Warn, text)
    }

    pub fn debug(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Debug, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Success, text)
    }

    /// A Warn-level message with the error flag set
    pub fn failure(text: impl Into<String>) -> Self {
        Self::warn(text).with_error(true)
    }

    /// Builder-style error flag
    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    pub fn level(&self) -> MessageLevel {
        self.level
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn is_error(&self) -> bool {
        self.error
    }
}
