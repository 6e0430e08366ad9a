// ============================================================================
// Entity Store
// ============================================================================
//
// Binds the Command entity to the `commands` bucket:
// - keys are 8-byte big-endian ids, so bucket order is id order
// - ids come from the bucket sequence and are never reused
// - every mutation, including a whole Synchronize batch, is one write
//   transaction
//
// ============================================================================

pub mod codec;
pub mod commands;

pub use commands::{COMMAND_BUCKET, CommandStore, SyncBatch};
