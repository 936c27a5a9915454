//! error.rs
//! Error types for the refactoring miner core.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors surfaced by the core.
///
/// Unmatched classes, unmatched generalizations and ambiguous hypotheses are
/// data, not errors; they show up in [`crate::ModelDiff`].
#[derive(Debug, Error)]
pub enum MinerError {
    /// Analysis ran past the configured time bound.
    #[error("Analysis timed out during {stage} after {elapsed_ms} ms")]
    TimedOut { stage: String, elapsed_ms: u128 },

    /// The structural model violates its own invariants.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MinerError>;

/// Wall-clock bound for one diff invocation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self { started: Instant::now(), limit }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Fails with [`MinerError::TimedOut`] once the limit has passed.
    pub fn check(&self, stage: &str) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.started.elapsed();
        if elapsed >= limit {
            return Err(MinerError::TimedOut {
                stage: stage.to_string(),
                elapsed_ms: elapsed.as_millis(),
            });
        }
        Ok(())
    }
}
