//! Binary encoding of stored commands (MessagePack with named fields).

use crate::core::{Command, CommandId, Result, StoreError};

pub fn encode(command: &Command) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(command)
        .map_err(|e| StoreError::Serialization(format!("Failed to encode command: {}", e)))
}

pub fn decode(data: &[u8]) -> Result<Command> {
    rmp_serde::from_slice(data)
        .map_err(|e| StoreError::Serialization(format!("Failed to decode command: {}", e)))
}

/// Decodes the record stored under `key` and checks that it carries the id
/// the key encodes.
pub fn decode_record(key: &[u8], data: &[u8]) -> Result<Command> {
    let id = CommandId::from_key(key)
        .ok_or_else(|| StoreError::Corrupted(format!("invalid command key of {} bytes", key.len())))?;
    let command = decode(data)?;

    if !command.id.is_assigned() || command.id != id {
        return Err(StoreError::Corrupted(format!(
            "record under key {} carries id {}",
            id, command.id
        )));
    }
    Ok(command)
}
