//! Propagation budget
//!
//! Every public mutation propagates under a fresh budget. Running out of
//! depth, visits or time aborts the mutation with
//! [`PlumberError::TooComplex`](crate::PlumberError::TooComplex).

use crate::config::PlumberConfig;
use crate::errors::{PlumberError, Result};
use std::time::{Duration, Instant};

/// How often the clock is read
const DEADLINE_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone)]
pub struct PropagationBudget {
    max_depth: usize,
    max_visits: usize,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    depth: usize,
    visits: usize,
}

impl PropagationBudget {
    pub fn new(config: &PlumberConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_visits: config.max_visits,
            timeout: config.timeout(),
            deadline: None,
            depth: 0,
            visits: 0,
        }
    }

    /// Start a new mutation
    pub fn reset(&mut self) {
        self.depth = 0;
        self.visits = 0;
        self.deadline = self.timeout.map(|t| Instant::now() + t);
    }

    /// Account for one flow being processed one level deeper
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        self.visits += 1;

        if self.depth > self.max_depth {
            return Err(self.exhausted("depth"));
        }
        if self.max_visits > 0 && self.visits > self.max_visits {
            return Err(self.exhausted("visits"));
        }
        if let Some(deadline) = self.deadline {
            if self.visits % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return Err(self.exhausted("timeout"));
            }
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn visits(&self) -> usize {
        self.visits
    }

    fn exhausted(&self, reason: &'static str) -> PlumberError {
        PlumberError::TooComplex {
            reason,
            depth: self.depth,
            visits: self.visits,
        }
    }
}
