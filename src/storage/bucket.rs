use crate::core::{Result, StoreError};
use crate::transaction::Change;
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// Largest key accepted by `put`.
pub const MAX_KEY_SIZE: usize = 32_768;

/// Largest value accepted by `put` unless the engine is configured lower.
pub const MAX_VALUE_SIZE: usize = (1 << 31) - 2;

/// A named keyspace: byte-ordered entries plus an auto-increment sequence.
///
/// Entries live in a persistent map, so cloning a bucket (which every write
/// transaction does) shares structure with the committed version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    entries: OrdMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    pub(crate) fn remove(&mut self, key: &[u8]) -> bool {
        self.entries.remove(key).is_some()
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
    }
}

/// Read-only view of a bucket inside a transaction.
#[derive(Debug, Clone, Copy)]
pub struct BucketRef<'tx> {
    bucket: &'tx Bucket,
}

impl<'tx> BucketRef<'tx> {
    pub(crate) fn new(bucket: &'tx Bucket) -> Self {
        Self { bucket }
    }

    pub fn get(&self, key: &[u8]) -> Option<&'tx [u8]> {
        self.bucket.get(key)
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'tx [u8], &'tx [u8])> + 'tx {
        self.bucket.iter()
    }

    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.bucket.sequence()
    }
}

/// Writable view of a bucket inside a write transaction.
///
/// Every mutation is applied to the transaction's private copy and recorded
/// as a [`Change`] so the commit can be logged as a single unit.
pub struct BucketMut<'tx> {
    name: String,
    bucket: &'tx mut Bucket,
    changes: &'tx mut Vec<Change>,
    max_value_size: usize,
}

impl<'tx> BucketMut<'tx> {
    pub(crate) fn new(
        name: &str,
        bucket: &'tx mut Bucket,
        changes: &'tx mut Vec<Change>,
        max_value_size: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            bucket,
            changes,
            max_value_size,
        }
    }

    /// Writes `value` under `key`, replacing any existing value.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        if key.len() > MAX_KEY_SIZE {
            return Err(StoreError::KeyTooLarge(key.len()));
        }
        if value.len() > self.max_value_size {
            return Err(StoreError::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }

        self.bucket.insert(key.to_vec(), value.clone());
        self.changes.push(Change::Put {
            bucket: self.name.clone(),
            key: key.to_vec(),
            value,
        });
        Ok(())
    }

    /// Removes `key`. Removing a missing key is not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if self.bucket.remove(key) {
            self.changes.push(Change::Delete {
                bucket: self.name.clone(),
                key: key.to_vec(),
            });
        }
        Ok(())
    }

    /// Advances the bucket sequence and returns the new value.
    ///
    /// The advance belongs to the enclosing transaction: if it rolls back the
    /// sequence is left where it was.
    pub fn next_sequence(&mut self) -> Result<u64> {
        let next = self
            .bucket
            .sequence()
            .checked_add(1)
            .ok_or_else(|| StoreError::SequenceOverflow(self.name.clone()))?;

        self.bucket.set_sequence(next);
        self.changes.push(Change::SetSequence {
            bucket: self.name.clone(),
            sequence: next,
        });
        Ok(next)
    }
}
