//! Error types for netplumber-core
//!
//! Every mutation validates its arguments before touching state, so an
//! `Err` from a mutation leaves the network unchanged. The one exception
//! is [`PlumberError::TooComplex`], which aborts propagation midway and
//! marks the instance inconsistent.

use crate::config::ConfigError;
use netplumber_hs::HsError;
use thiserror::Error;

/// Main error type for NetPlumber operations
#[derive(Debug, Error)]
pub enum PlumberError {
    /// Table id already in use
    #[error("Table {0} already exists")]
    TableExists(u32),

    /// Table id 0 is reserved
    #[error("Invalid table id {0}: table ids must be non-zero")]
    InvalidTable(u32),

    /// No table with this id
    #[error("Table {0} not found")]
    TableNotFound(u32),

    /// Rule port outside its table's port list
    #[error("Port {port} is not a port of table {table}")]
    PortNotInTable { table: u32, port: u32 },

    /// No node with this id
    #[error("Node 0x{0:x} not found")]
    NodeNotFound(u64),

    /// Node exists but has a different type
    #[error("Node 0x{id:x} is not a {expected}")]
    WrongNodeType { id: u64, expected: &'static str },

    /// No such link
    #[error("Link {from} -> {to} not found")]
    LinkNotFound { from: u32, to: u32 },

    /// Vector or set width differs from the network's header length
    #[error("Length mismatch: expected {expected} bytes, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Malformed rule arguments
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Propagation exceeded its budget
    #[error("Propagation too complex ({reason}) after {visits} visits at depth {depth}")]
    TooComplex {
        reason: &'static str,
        depth: usize,
        visits: usize,
    },

    /// Header-space error
    #[error("Header space error: {0}")]
    HeaderSpace(#[from] HsError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PlumberError {
    pub fn length_mismatch(expected: usize, found: usize) -> Self {
        PlumberError::LengthMismatch { expected, found }
    }

    pub fn invalid_rule(msg: impl Into<String>) -> Self {
        PlumberError::InvalidRule(msg.into())
    }

    pub fn wrong_type(id: u64, expected: &'static str) -> Self {
        PlumberError::WrongNodeType { id, expected }
    }
}

/// Result type alias for NetPlumber operations
pub type Result<T> = std::result::Result<T, PlumberError>;
