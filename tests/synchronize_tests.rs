//! Integration tests for atomic batch synchronization

use command_registry::store::COMMAND_BUCKET;
use command_registry::{Command, CommandId, CommandStore, EngineOptions, KvEngine, StoreError, SyncBatch};
use std::sync::Arc;

async fn seeded_store(options: EngineOptions, names: &[&str]) -> CommandStore {
    let store = CommandStore::new(Arc::new(KvEngine::with_options(options)))
        .await
        .unwrap();
    for name in names {
        store.create_command(Command::new(*name, "alpine")).await.unwrap();
    }
    store
}

async fn sequence(store: &CommandStore) -> u64 {
    store
        .engine()
        .view(|tx| Ok(tx.bucket(COMMAND_BUCKET)?.sequence()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_synchronize_applies_all_parts() {
    let store = seeded_store(EngineOptions::default(), &["a", "b", "c"]).await;

    let mut b = store.command(CommandId(2)).await.unwrap();
    b.image = "busybox".into();
    let c = store.command(CommandId(3)).await.unwrap();

    let created = store
        .synchronize(SyncBatch {
            to_create: vec![Command::new("d", "alpine"), Command::new("e", "alpine")],
            to_update: vec![b],
            to_delete: vec![c],
        })
        .await
        .unwrap();

    let created_ids: Vec<_> = created.iter().map(|command| command.id).collect();
    assert_eq!(created_ids, vec![CommandId(4), CommandId(5)]);

    let names: Vec<_> = store
        .commands()
        .await
        .unwrap()
        .into_iter()
        .map(|command| command.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "d", "e"]);
    assert_eq!(store.command(CommandId(2)).await.unwrap().image, "busybox");
}

#[tokio::test]
async fn test_failed_create_rolls_back_whole_batch() {
    let store = seeded_store(EngineOptions::default().max_value_size(128), &["a", "b"]).await;
    let before = store.commands().await.unwrap();
    let a = before[0].clone();

    let result = store
        .synchronize(SyncBatch {
            to_create: vec![
                Command::new("ok", "alpine"),
                Command::new("huge", "alpine").with_command("x".repeat(512)),
            ],
            to_update: Vec::new(),
            to_delete: vec![a],
        })
        .await;

    assert!(matches!(result, Err(StoreError::ValueTooLarge { .. })));
    assert_eq!(store.commands().await.unwrap(), before);
    assert_eq!(sequence(&store).await, 2);

    // The next id continues from the last committed sequence.
    let next = store.create_command(Command::new("c", "alpine")).await.unwrap();
    assert_eq!(next.id, CommandId(3));
}

#[tokio::test]
async fn test_failed_update_rolls_back_creates() {
    let store = seeded_store(EngineOptions::default(), &["a"]).await;

    let result = store
        .synchronize(SyncBatch {
            to_create: vec![Command::new("b", "alpine")],
            to_update: vec![Command::new("unassigned", "alpine")],
            to_delete: Vec::new(),
        })
        .await;

    assert!(matches!(result, Err(StoreError::Unassigned)));
    assert_eq!(store.commands().await.unwrap().len(), 1);
    assert_eq!(sequence(&store).await, 1);
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let store = seeded_store(EngineOptions::default(), &["a"]).await;
    let created = store.synchronize(SyncBatch::default()).await.unwrap();
    assert!(created.is_empty());
    assert_eq!(store.commands().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_of_missing_entry_does_not_fail_batch() {
    let store = seeded_store(EngineOptions::default(), &["a"]).await;
    let mut ghost = Command::new("ghost", "alpine");
    ghost.id = CommandId(77);

    store
        .synchronize(SyncBatch {
            to_create: vec![Command::new("b", "alpine")],
            to_update: Vec::new(),
            to_delete: vec![ghost],
        })
        .await
        .unwrap();

    assert_eq!(store.commands().await.unwrap().len(), 2);
}
