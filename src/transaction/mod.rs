// ============================================================================
// Transaction Module
// ============================================================================
//
// Transactions over the bucket engine:
// - ReadTx: pinned to one committed catalog, never sees uncommitted writes
// - WriteTx: private copy of the catalog, published atomically on commit
// - Change: logged form of every mutation, replayed on recovery
//
// Writers are serialized by the engine; readers never wait for writers.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{ReadTx, TransactionId, WriteTx};
