use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cafs_dag::{plan, WriteOrder};
use cafs_fs::{Directory, FileNode, PathMap, RegularFile};
use cafs_store::{BlockStore, Link, LinkKind, Links, PutResult, StoreError};
use cafs_types::{Context, Key};

use crate::config::{HookVisibility, WriterConfig};
use crate::error::{WriteError, WriteResult};
use crate::ledger::Ledger;
use crate::phase::WritePhase;

/// Result of a committed tree write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub root_key: Key,
    pub root_path: String,
    /// Key of every node in the tree, by path.
    pub path_map: PathMap,
    /// Objects this write added to the store. Content that was already
    /// present is not counted.
    pub created: usize,
    pub pinned: bool,
}

/// Writes [`FileNode`] trees into a [`BlockStore`].
///
/// A writer holds no per-write state, so one instance can serve any number
/// of writes, including concurrent ones.
#[derive(Clone)]
pub struct TreeWriter {
    store: Arc<dyn BlockStore>,
    config: WriterConfig,
}

impl TreeWriter {
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self {
            store,
            config: WriterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    /// Write `root` and everything beneath it.
    ///
    /// On success every node's key is in the returned path map and the
    /// root key addresses the whole tree. On failure every object this call
    /// created has been deleted again and the first error is returned.
    pub async fn write_tree(&self, ctx: &Context, root: &FileNode) -> WriteResult<WriteOutcome> {
        let mut phase = WritePhase::Planning;
        debug!(root = root.path(), phase = %phase, "planning tree write");
        if let Some(reason) = ctx.err() {
            advance(&mut phase, WritePhase::Failed);
            return Err(reason.into());
        }
        let order = match plan(root) {
            Ok(order) => order,
            Err(e) => {
                advance(&mut phase, WritePhase::Failed);
                warn!(root = root.path(), phase = %phase, error = %e, "tree rejected");
                return Err(e.into());
            }
        };

        advance(&mut phase, WritePhase::Writing);
        debug!(root = root.path(), phase = %phase, nodes = order.len(), "writing tree");
        let mut ledger = Ledger::new();
        match self.write_ordered(ctx, root, &order, &mut ledger).await {
            Ok(outcome) => {
                advance(&mut phase, WritePhase::Committed);
                info!(
                    root = root.path(),
                    key = %outcome.root_key,
                    created = outcome.created,
                    pinned = outcome.pinned,
                    phase = %phase,
                    "tree written"
                );
                Ok(outcome)
            }
            Err(e) => {
                advance(&mut phase, WritePhase::RollingBack);
                warn!(
                    root = root.path(),
                    error = %e,
                    created = ledger.len(),
                    phase = %phase,
                    "tree write failed, rolling back"
                );
                let report = ledger.rollback(self.store.as_ref()).await;
                advance(&mut phase, WritePhase::Failed);
                debug!(
                    removed = report.removed,
                    absent = report.absent,
                    failed = report.failed,
                    phase = %phase,
                    "rollback finished"
                );
                Err(e)
            }
        }
    }

    async fn write_ordered(
        &self,
        ctx: &Context,
        root: &FileNode,
        order: &WriteOrder<'_>,
        ledger: &mut Ledger,
    ) -> WriteResult<WriteOutcome> {
        let mut path_map = PathMap::new();
        let mut written: HashMap<&str, PutResult> = HashMap::with_capacity(order.len());

        for node in order.iter() {
            if let Some(reason) = ctx.err() {
                return Err(reason.into());
            }
            let object = match node {
                FileNode::File(file) => {
                    Prepared::Blob(self.prepare_file(ctx, file, &path_map).await?)
                }
                FileNode::Directory(dir) => {
                    Prepared::Node(self.prepare_directory(dir, &written)?)
                }
            };
            let put = self.store_object(ctx, node.path(), &object, ledger).await?;
            debug!(path = node.path(), key = %put.key.short_hex(), created = put.created, "stored node");
            path_map.record(node.path(), put.key)?;
            written.insert(node.path(), put);
        }

        let root_key = written
            .get(root.path())
            .map(|put| put.key)
            .ok_or_else(|| WriteError::OutOfOrder(root.path().to_string()))?;

        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }
        if self.config.pin_root {
            until_done(ctx, self.store.pin(&root_key, true))
                .await?
                .map_err(|source| WriteError::StoreWrite {
                    path: root.path().to_string(),
                    source,
                })?;
        }

        Ok(WriteOutcome {
            root_key,
            root_path: root.path().to_string(),
            path_map,
            created: ledger.len(),
            pinned: self.config.pin_root,
        })
    }

    /// Read a file's content and run its hook, if any.
    async fn prepare_file(
        &self,
        ctx: &Context,
        file: &RegularFile,
        paths: &PathMap,
    ) -> WriteResult<Vec<u8>> {
        let content = until_done(ctx, file.read_all())
            .await?
            .map_err(|source| WriteError::ContentRead {
                path: file.path().to_string(),
                source,
            })?;

        match file.hook() {
            Some(hook) => {
                let visible = match self.config.hook_visibility {
                    HookVisibility::Declared => paths.restricted_to(hook.dependencies()),
                    HookVisibility::Full => paths.clone(),
                };
                debug!(path = file.path(), visible = visible.len(), "applying hook");
                Ok(until_done(ctx, hook.apply(ctx, content, &visible)).await??)
            }
            None => Ok(content),
        }
    }

    /// Collect the links of a directory whose children are all written.
    fn prepare_directory(
        &self,
        dir: &Directory,
        written: &HashMap<&str, PutResult>,
    ) -> WriteResult<Links> {
        let mut links = Links::new();
        for child in dir.children() {
            let put = written
                .get(child.path())
                .ok_or_else(|| WriteError::OutOfOrder(child.path().to_string()))?;
            let kind = if child.is_directory() {
                LinkKind::Directory
            } else {
                LinkKind::File
            };
            links
                .add(Link::new(child.name(), put.key, put.size, kind))
                .map_err(|source| WriteError::StoreWrite {
                    path: dir.path().to_string(),
                    source,
                })?;
        }
        Ok(links)
    }

    /// Store one prepared object, recording it in `ledger` if it is new.
    ///
    /// The store call races `ctx`. When the context wins, the call may
    /// already have created the object, so the predicted key is recorded
    /// whenever the object was absent beforehand.
    async fn store_object(
        &self,
        ctx: &Context,
        path: &str,
        object: &Prepared,
        ledger: &mut Ledger,
    ) -> WriteResult<PutResult> {
        let store_err = |source: StoreError| WriteError::StoreWrite {
            path: path.to_string(),
            source,
        };

        let key = match object {
            Prepared::Blob(content) => self.store.key_for(content),
            Prepared::Node(links) => self.store.node_key_for(links).map_err(store_err)?,
        };
        let existed = until_done(ctx, self.store.has(&key)).await?.map_err(store_err)?;

        let stored = match object {
            Prepared::Blob(content) => until_done(ctx, self.store.put(content)).await,
            Prepared::Node(links) => until_done(ctx, self.store.put_node(links)).await,
        };
        match stored {
            Ok(result) => {
                let put = result.map_err(store_err)?;
                if put.created {
                    ledger.record(put.key);
                }
                Ok(put)
            }
            Err(abandoned) => {
                if !existed {
                    debug!(path, key = %key.short_hex(), "store call abandoned");
                    ledger.record(key);
                }
                Err(abandoned)
            }
        }
    }
}

/// Payload of one node, ready for the store.
enum Prepared {
    Blob(Vec<u8>),
    Node(Links),
}

/// Write `root` into `store` with the default configuration.
pub async fn write_tree(
    ctx: &Context,
    store: Arc<dyn BlockStore>,
    root: &FileNode,
) -> WriteResult<WriteOutcome> {
    TreeWriter::new(store).write_tree(ctx, root).await
}

/// Move `phase` to `next`, logging transitions the lifecycle does not allow.
fn advance(phase: &mut WritePhase, next: WritePhase) {
    if !phase.advance_to(next) {
        warn!(from = %phase, to = %next, "illegal write phase transition");
    }
}

/// Run `fut` unless `ctx` finishes first.
async fn until_done<F: Future>(ctx: &Context, fut: F) -> WriteResult<F::Output> {
    tokio::select! {
        biased;
        reason = ctx.done() => Err(reason.into()),
        out = fut => Ok(out),
    }
}
