// ============================================================================
// Transaction Change Log
// ============================================================================
//
// A write transaction records one Change per mutation. The whole list is
// written to the WAL as a single commit record, which makes replay
// all-or-nothing per transaction.
//
// ============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    CreateBucket { bucket: String },
    Put {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete { bucket: String, key: Vec<u8> },
    SetSequence { bucket: String, sequence: u64 },
}
