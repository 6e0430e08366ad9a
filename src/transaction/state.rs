// ============================================================================
// Transaction State
// ============================================================================
//
// ReadTx holds an Arc of the committed catalog it started from, so it keeps
// seeing that point in time even while writers commit.
//
// WriteTx owns a clone of the committed catalog plus the change list. Nothing
// it does is visible until the engine publishes its catalog; dropping it is a
// rollback.
//
// ============================================================================

use super::Change;
use crate::core::{Result, StoreError};
use crate::storage::{BucketMut, BucketRef, Catalog};
use std::sync::Arc;

/// Identifier of a transaction: the catalog version it reads (read
/// transactions) or will produce on commit (write transactions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Read-only transaction pinned to a committed catalog.
pub struct ReadTx {
    catalog: Arc<Catalog>,
}

impl ReadTx {
    pub(crate) fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn id(&self) -> TransactionId {
        TransactionId(self.catalog.version())
    }

    pub fn bucket(&self, name: &str) -> Result<BucketRef<'_>> {
        self.catalog
            .bucket(name)
            .map(BucketRef::new)
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
    }
}

/// Read-write transaction over a private copy of the catalog.
pub struct WriteTx {
    id: TransactionId,
    catalog: Catalog,
    changes: Vec<Change>,
    max_value_size: usize,
}

impl WriteTx {
    pub(crate) fn new(base: &Catalog, max_value_size: usize) -> Self {
        let id = TransactionId(base.version() + 1);
        let mut catalog = base.clone();
        catalog.set_version(id.0);

        Self {
            id,
            catalog,
            changes: Vec::new(),
            max_value_size,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn bucket(&self, name: &str) -> Result<BucketRef<'_>> {
        self.catalog
            .bucket(name)
            .map(BucketRef::new)
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
    }

    pub fn bucket_mut(&mut self, name: &str) -> Result<BucketMut<'_>> {
        let bucket = self
            .catalog
            .bucket_mut(name)
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))?;

        Ok(BucketMut::new(
            name,
            bucket,
            &mut self.changes,
            self.max_value_size,
        ))
    }

    pub fn create_bucket_if_not_exists(&mut self, name: &str) -> Result<BucketMut<'_>> {
        if name.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        if self.catalog.ensure_bucket(name) {
            self.changes.push(Change::CreateBucket {
                bucket: name.to_string(),
            });
        }
        self.bucket_mut(name)
    }

    pub(crate) fn into_parts(self) -> (Catalog, Vec<Change>) {
        (self.catalog, self.changes)
    }
}
