//! Integration tests for the command entity store

use command_registry::store::COMMAND_BUCKET;
use command_registry::{Command, CommandId, CommandStore, DurabilityMode, EngineOptions, KvEngine, StoreError};
use std::sync::Arc;
use tempfile::TempDir;

async fn memory_store() -> CommandStore {
    CommandStore::new(Arc::new(KvEngine::in_memory())).await.unwrap()
}

#[tokio::test]
async fn test_first_ids_are_sequential() {
    let store = memory_store().await;

    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        ids.push(store.create_command(Command::new(name, "alpine")).await.unwrap().id);
    }

    assert_eq!(ids, vec![CommandId(1), CommandId(2), CommandId(3)]);
}

#[tokio::test]
async fn test_create_then_get_returns_same_fields() {
    let store = memory_store().await;
    let created = store
        .create_command(Command::new("backup", "alpine:3.19").with_command("tar czf /out.tgz /data"))
        .await
        .unwrap();

    let fetched = store.command(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.command, "tar czf /out.tgz /data");
}

#[tokio::test]
async fn test_deleted_id_is_not_reused() {
    let store = memory_store().await;
    let first = store.create_command(Command::new("a", "alpine")).await.unwrap();
    store.create_command(Command::new("b", "alpine")).await.unwrap();

    store.delete_command(first.id).await.unwrap();
    assert!(matches!(store.command(first.id).await, Err(StoreError::NotFound)));

    let third = store.create_command(Command::new("c", "alpine")).await.unwrap();
    assert_eq!(third.id, CommandId(3));
}

#[tokio::test]
async fn test_delete_missing_id_is_noop() {
    let store = memory_store().await;
    store.create_command(Command::new("a", "alpine")).await.unwrap();

    store.delete_command(CommandId(42)).await.unwrap();
    assert_eq!(store.commands().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_is_ascending_and_tracks_deletes() {
    let store = memory_store().await;
    for i in 0..300 {
        store
            .create_command(Command::new(format!("cmd-{i}"), "alpine"))
            .await
            .unwrap();
    }
    for id in [3, 256, 10] {
        store.delete_command(CommandId(id)).await.unwrap();
    }

    let commands = store.commands().await.unwrap();
    assert_eq!(commands.len(), 297);
    assert!(commands.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test]
async fn test_update_is_an_upsert() {
    let store = memory_store().await;
    store
        .update_command(CommandId(9), &Command::new("ghost", "alpine"))
        .await
        .unwrap();

    let stored = store.command(CommandId(9)).await.unwrap();
    assert_eq!(stored.id, CommandId(9));
    assert_eq!(stored.name, "ghost");
}

#[tokio::test]
async fn test_update_replaces_record() {
    let store = memory_store().await;
    let mut command = store.create_command(Command::new("ls", "alpine")).await.unwrap();

    command.image = "busybox".into();
    store.update_command(command.id, &command).await.unwrap();

    assert_eq!(store.command(command.id).await.unwrap().image, "busybox");
    assert_eq!(store.commands().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_command_is_rejected() {
    let engine = KvEngine::with_options(EngineOptions::default().max_value_size(64));
    let store = CommandStore::new(Arc::new(engine)).await.unwrap();

    let result = store
        .create_command(Command::new("big", "alpine").with_command("x".repeat(128)))
        .await;
    assert!(matches!(result, Err(StoreError::ValueTooLarge { .. })));
    assert!(store.commands().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commands_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let options = EngineOptions::default().durability(DurabilityMode::Sync);

    {
        let engine = Arc::new(KvEngine::open(temp_dir.path(), options.clone()).unwrap());
        let store = CommandStore::new(engine).await.unwrap();
        store.create_command(Command::new("a", "alpine")).await.unwrap();
        store.create_command(Command::new("b", "alpine")).await.unwrap();
        store.delete_command(CommandId(1)).await.unwrap();
    }

    let engine = Arc::new(KvEngine::open(temp_dir.path(), options).unwrap());
    let store = CommandStore::new(engine).await.unwrap();

    let commands = store.commands().await.unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].name, "b");

    let next = store.create_command(Command::new("c", "alpine")).await.unwrap();
    assert_eq!(next.id, CommandId(3));
}

#[tokio::test]
async fn test_reopen_after_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let options = EngineOptions::default()
        .durability(DurabilityMode::Sync)
        .checkpoint_threshold(2);

    {
        let engine = Arc::new(KvEngine::open(temp_dir.path(), options.clone()).unwrap());
        let store = CommandStore::new(Arc::clone(&engine)).await.unwrap();
        for name in ["a", "b", "c", "d", "e"] {
            store.create_command(Command::new(name, "alpine")).await.unwrap();
        }
        engine.close().await.unwrap();
    }

    let engine = Arc::new(KvEngine::open(temp_dir.path(), options).unwrap());
    let (len, sequence) = engine
        .view(|tx| {
            let bucket = tx.bucket(COMMAND_BUCKET)?;
            Ok((bucket.len(), bucket.sequence()))
        })
        .await
        .unwrap();
    assert_eq!(len, 5);
    assert_eq!(sequence, 5);
}
