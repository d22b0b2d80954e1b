//! Record of objects created by an in-flight write, for rollback.

use tracing::{debug, warn};

use cafs_store::BlockStore;
use cafs_types::Key;

/// Keys a write has created, in creation order.
///
/// Only objects the store reported as newly created are recorded, plus the
/// predicted key of an abandoned store call whose object was absent before
/// it. An object that already existed before the write belongs to someone
/// else and is never deleted by rollback.
#[derive(Debug, Default)]
pub struct Ledger {
    created: Vec<Key>,
}

/// What a rollback managed to undo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub removed: usize,
    /// Already gone when rollback reached them.
    pub absent: usize,
    /// Delete failed; the object may still be in the store.
    pub failed: usize,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: Key) {
        self.created.push(key);
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.created
    }

    /// Delete every recorded key, newest first.
    ///
    /// Never stops early: a failed delete is logged and the rest still run.
    pub async fn rollback(self, store: &dyn BlockStore) -> RollbackReport {
        let mut report = RollbackReport::default();
        for key in self.created.iter().rev() {
            match store.delete(key).await {
                Ok(()) => report.removed += 1,
                Err(e) if e.is_absent() => {
                    debug!(key = %key.short_hex(), "rollback: object already absent");
                    report.absent += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "rollback: failed to delete object");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
