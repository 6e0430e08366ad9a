use super::codec;
use crate::core::{Command, CommandId, Result, StoreError};
use crate::storage::{BucketMut, KvEngine};
use std::sync::Arc;
use tracing::{debug, info};

pub const COMMAND_BUCKET: &str = "commands";

/// Creates, updates and deletes to apply as one unit with
/// [`CommandStore::synchronize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    pub to_create: Vec<Command>,
    pub to_update: Vec<Command>,
    pub to_delete: Vec<Command>,
}

impl SyncBatch {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Durable mapping from [`CommandId`] to [`Command`].
pub struct CommandStore {
    engine: Arc<KvEngine>,
}

impl CommandStore {
    /// Binds the store to `engine`, creating the commands bucket if needed.
    pub async fn new(engine: Arc<KvEngine>) -> Result<Self> {
        engine
            .update(|tx| tx.create_bucket_if_not_exists(COMMAND_BUCKET).map(|_| ()))
            .await?;
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Arc<KvEngine> {
        &self.engine
    }

    /// Returns the committed command with `id`, or [`StoreError::NotFound`].
    pub async fn command(&self, id: CommandId) -> Result<Command> {
        self.engine
            .view(|tx| {
                let bucket = tx.bucket(COMMAND_BUCKET)?;
                let key = id.to_key();
                let data = bucket.get(&key).ok_or(StoreError::NotFound)?;
                codec::decode_record(&key, data)
            })
            .await
    }

    /// Every command, in ascending id order, as of a single point in time.
    pub async fn commands(&self) -> Result<Vec<Command>> {
        self.engine
            .view(|tx| {
                tx.bucket(COMMAND_BUCKET)?
                    .iter()
                    .map(|(key, data)| codec::decode_record(key, data))
                    .collect()
            })
            .await
    }

    /// Assigns the next id to `command` and stores it.
    pub async fn create_command(&self, command: Command) -> Result<Command> {
        let command = self
            .engine
            .update(|tx| {
                let mut bucket = tx.bucket_mut(COMMAND_BUCKET)?;
                store_new_command(&mut bucket, command)
            })
            .await?;

        debug!(id = %command.id, name = %command.name, "command created");
        Ok(command)
    }

    /// Replaces the record at `id` with `command`; the stored id is always `id`.
    ///
    /// This is an upsert: writing an id that has no record creates one. The
    /// caller owns any merging with the previous value.
    pub async fn update_command(&self, id: CommandId, command: &Command) -> Result<()> {
        if !id.is_assigned() {
            return Err(StoreError::Unassigned);
        }
        let data = codec::encode(&Command {
            id,
            ..command.clone()
        })?;

        self.engine
            .update(|tx| tx.bucket_mut(COMMAND_BUCKET)?.put(&id.to_key(), data))
            .await
    }

    /// Removes the record at `id`. Deleting an id with no record succeeds
    /// without doing anything.
    pub async fn delete_command(&self, id: CommandId) -> Result<()> {
        self.engine
            .update(|tx| tx.bucket_mut(COMMAND_BUCKET)?.delete(&id.to_key()))
            .await
    }

    /// Applies creates, then updates, then deletes inside one write
    /// transaction and returns the created commands with their ids.
    ///
    /// The first failure aborts the whole batch: no record and no sequence
    /// advance from it becomes visible.
    pub async fn synchronize(&self, batch: SyncBatch) -> Result<Vec<Command>> {
        let SyncBatch {
            to_create,
            to_update,
            to_delete,
        } = batch;
        let (updated, deleted) = (to_update.len(), to_delete.len());

        let created = self
            .engine
            .update(|tx| {
                let mut bucket = tx.bucket_mut(COMMAND_BUCKET)?;

                let created = to_create
                    .into_iter()
                    .map(|command| store_new_command(&mut bucket, command))
                    .collect::<Result<Vec<_>>>()?;

                for command in &to_update {
                    marshal_and_store_command(&mut bucket, command)?;
                }

                for command in &to_delete {
                    bucket.delete(&command.id.to_key())?;
                }

                Ok(created)
            })
            .await?;

        info!(
            created = created.len(),
            updated, deleted, "commands synchronized"
        );
        Ok(created)
    }
}

fn marshal_and_store_command(bucket: &mut BucketMut<'_>, command: &Command) -> Result<()> {
    if !command.id.is_assigned() {
        return Err(StoreError::Unassigned);
    }
    let data = codec::encode(command)?;
    bucket.put(&command.id.to_key(), data)
}

fn store_new_command(bucket: &mut BucketMut<'_>, mut command: Command) -> Result<Command> {
    command.id = CommandId(bucket.next_sequence()?);
    marshal_and_store_command(bucket, &command)?;
    Ok(command)
}
