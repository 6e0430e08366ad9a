use super::Bucket;
use crate::transaction::Change;
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// Every bucket in the engine, as of one committed transaction.
///
/// The committed catalog is published behind an `Arc` and never mutated in
/// place: a write transaction clones it (cheap, structure is shared), edits
/// the clone and swaps it in on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    buckets: OrdMap<String, Bucket>,
    version: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the last transaction folded into this catalog.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    pub(crate) fn bucket_mut(&mut self, name: &str) -> Option<&mut Bucket> {
        self.buckets.get_mut(name)
    }

    /// Returns `true` when the bucket was created.
    pub(crate) fn ensure_bucket(&mut self, name: &str) -> bool {
        if self.buckets.contains_key(name) {
            return false;
        }
        self.buckets.insert(name.to_string(), Bucket::new());
        true
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Bucket::len).sum()
    }

    /// Replays a logged change during recovery.
    pub(crate) fn apply(&mut self, change: Change) {
        match change {
            Change::CreateBucket { bucket } => {
                self.ensure_bucket(&bucket);
            }
            Change::Put { bucket, key, value } => {
                self.ensure_bucket(&bucket);
                if let Some(target) = self.buckets.get_mut(&bucket) {
                    target.insert(key, value);
                }
            }
            Change::Delete { bucket, key } => {
                if let Some(target) = self.buckets.get_mut(&bucket) {
                    target.remove(&key);
                }
            }
            Change::SetSequence { bucket, sequence } => {
                self.ensure_bucket(&bucket);
                if let Some(target) = self.buckets.get_mut(&bucket) {
                    target.set_sequence(sequence);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_isolated() {
        let mut committed = Catalog::new();
        committed.apply(Change::Put {
            bucket: "commands".to_string(),
            key: vec![1],
            value: vec![10],
        });

        let mut draft = committed.clone();
        draft.apply(Change::Delete {
            bucket: "commands".to_string(),
            key: vec![1],
        });

        assert_eq!(committed.bucket("commands").unwrap().get(&[1]), Some(&[10u8][..]));
        assert!(draft.bucket("commands").unwrap().is_empty());
    }

    #[test]
    fn test_apply_sequence_creates_bucket() {
        let mut catalog = Catalog::new();
        catalog.apply(Change::SetSequence {
            bucket: "commands".to_string(),
            sequence: 9,
        });
        assert_eq!(catalog.bucket("commands").unwrap().sequence(), 9);
        assert_eq!(catalog.bucket_count(), 1);
    }
}
