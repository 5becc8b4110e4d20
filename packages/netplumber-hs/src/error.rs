//! Error types for netplumber-hs

use std::fmt;
use thiserror::Error;

/// Header-space error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed vector or header-space text
    Parse,
    /// Operand lengths do not agree
    Length,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Length => "length",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Header-space error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {message}")]
pub struct HsError {
    pub kind: ErrorKind,
    pub message: String,
}

impl HsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // Convenience constructors
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// Unexpected character `found` at trit/character position `position`
    pub fn bad_char(found: char, position: usize) -> Self {
        Self::new(
            ErrorKind::Parse,
            format!("unexpected character '{}' at position {}", found, position),
        )
    }

    pub fn length(expected: usize, found: usize) -> Self {
        Self::new(
            ErrorKind::Length,
            format!("length mismatch: expected {} bytes, found {}", expected, found),
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HsError>;
