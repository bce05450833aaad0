// Path: crates/types/src/task.rs
//! The task state machine for a proof hash held by a prover node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of an admitted proof hash.
///
/// The only legal transition is `Pending → Running` (performed by a claim);
/// entries leave the cache exclusively through TTL expiry. There is no
/// success terminal: the cache is advisory and relies on TTL to reclaim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Admitted via `/push_task`, waiting for a claim.
    Pending,
    /// Claimed by a prove request; cannot be claimed again.
    Running,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
        }
    }
}
