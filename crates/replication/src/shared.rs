use chrono::{DateTime, Utc};
use serde_json::Value;
use templates::{apply_command, TemplateTree, TreeCommand, TreeError};
use thiserror::Error;
use tracing::{info, warn};

use crate::{decode_snapshot, ClientId, Result, SyncClient, SyncError};

/// Failure of a local edit: either the mutation itself was invalid, or the
/// mutation applied locally but the push to the server failed.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Client-side holder of the replicated template tree.
///
/// Edits go through [`SharedTree::apply`]: the command mutates the local tree
/// first and, on success, the entire tree is pushed as a full replacement.
/// Broadcasts from the server replace the local tree wholesale; there is no
/// merge, so concurrent editors overwrite each other and the last push wins.
pub struct SharedTree {
    tree: TemplateTree,
    client: SyncClient,
    client_id: ClientId,
    synced: bool,
    last_synced_at: Option<DateTime<Utc>>,
}

impl SharedTree {
    /// A holder that has not talked to the server yet.
    pub fn new(client: SyncClient) -> Self {
        Self {
            tree: TemplateTree::new(),
            client,
            client_id: ClientId::new(),
            synced: false,
            last_synced_at: None,
        }
    }

    /// Pull-on-start. A failed pull is surfaced in the sync flag and the
    /// client begins with an empty tree: edits stay possible, but they are
    /// not backed by server state until a pull or a push succeeds.
    pub async fn start(client: SyncClient) -> Self {
        let mut shared = Self::new(client);
        match shared.client.pull_templates().await {
            Ok(tree) => {
                shared.tree = tree;
                shared.mark_synced();
                info!(client = %shared.client_id.0, "Loaded initial snapshot");
            }
            Err(e) => {
                warn!(
                    client = %shared.client_id.0,
                    "Starting degraded with an empty tree: {}", e
                );
            }
        }
        shared
    }

    pub fn tree(&self) -> &TemplateTree {
        &self.tree
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Applies a command locally and pushes the whole tree on success.
    ///
    /// A rejected command leaves the tree untouched. A failed push leaves the
    /// local mutation in place but drops the sync flag; the caller decides
    /// whether to retry the push by editing again or calling
    /// [`SharedTree::refresh`].
    pub async fn apply(&mut self, command: TreeCommand) -> std::result::Result<(), ApplyError> {
        apply_command(&mut self.tree, command)?;
        match self.client.push_templates(&self.tree).await {
            Ok(()) => {
                self.mark_synced();
                Ok(())
            }
            Err(e) => {
                self.synced = false;
                Err(e.into())
            }
        }
    }

    /// Replaces the local tree with a broadcast snapshot. Idempotent:
    /// re-applying one's own broadcast lands on the identical tree.
    pub fn apply_remote(&mut self, snapshot: Value) -> Result<()> {
        let tree = decode_snapshot(snapshot)?;
        self.tree = tree;
        self.mark_synced();
        Ok(())
    }

    /// Re-pulls the server snapshot, replacing local state. User-driven
    /// retry; never called automatically.
    pub async fn refresh(&mut self) -> Result<()> {
        let tree = self.client.pull_templates().await?;
        self.tree = tree;
        self.mark_synced();
        Ok(())
    }

    fn mark_synced(&mut self) {
        self.synced = true;
        self.last_synced_at = Some(Utc::now());
    }
}
