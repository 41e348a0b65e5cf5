//! Replication channel for the shared documents: pull-on-start,
//! push-on-mutate, broadcast-on-push. Full-state replacement, last push wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod documents;
pub use documents::*;

mod messages;
pub use messages::*;

mod client;
pub use client::*;

mod shared;
pub use shared::*;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Identifies one running client instance, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub uuid::Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}
