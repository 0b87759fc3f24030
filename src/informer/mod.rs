//! List-watch informer.
//!
//! An [`Informer`] keeps an [`ObjectStore`](crate::ObjectStore) in sync with
//! a remote collection. One supervised task runs the cycle:
//!
//! ```text
//!  list ──► reconcile + dispatch ──► watch ──► (stream ends) ──┐
//!   ▲                                                          │
//!   └────────────────────── backoff on error ◄─────────────────┘
//! ```
//!
//! Reads (`get`/`list`) never wait on the network; during an outage they
//! serve the last applied state.

mod builder;
mod cache;
mod informer;
mod reconciler;

pub use builder::*;
pub use informer::*;


use std::fmt;

use async_trait::async_trait;

use crate::ObjectList;
use crate::Result;

/// Full-snapshot source used for bootstrap and every relist.
///
/// Calls must be idempotent: the informer retries them freely.
#[async_trait]
pub trait Lister<T>: Send + Sync + 'static {
    async fn list(&self) -> Result<ObjectList<T>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformerState {
    /// Built, not started
    Idle,
    /// First list in flight
    Bootstrapping,
    /// Watch session open
    Watching,
    /// Previous session ended, list in flight
    Relisting,
    /// `stop()` was called
    Stopped,
    /// A finite retry policy was exhausted
    Failed,
}

impl InformerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InformerState::Stopped | InformerState::Failed)
    }
}

impl fmt::Display for InformerState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            InformerState::Idle => "idle",
            InformerState::Bootstrapping => "bootstrapping",
            InformerState::Watching => "watching",
            InformerState::Relisting => "relisting",
            InformerState::Stopped => "stopped",
            InformerState::Failed => "failed",
        };
        f.write_str(s)
    }
}
