//! Integration tests for reconciling the registry with a definitions file

use command_registry::sync::{SyncError, SyncSummary, synchronize_from_file};
use command_registry::{Command, CommandId, CommandStore, KvEngine, UserId};
use std::sync::Arc;
use tempfile::TempDir;

async fn memory_store() -> CommandStore {
    CommandStore::new(Arc::new(KvEngine::in_memory())).await.unwrap()
}

#[tokio::test]
async fn test_file_reconciles_registry() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("commands.json");
    let store = memory_store().await;

    std::fs::write(
        &path,
        r#"[
            {"Name": "ls", "Image": "alpine", "Command": "ls -la"},
            {"Name": "df", "Image": "alpine", "Command": "df -h"}
        ]"#,
    )
    .unwrap();

    let summary = synchronize_from_file(&store, &path).await.unwrap();
    assert_eq!(
        summary,
        SyncSummary {
            created: 2,
            updated: 0,
            deleted: 0
        }
    );

    let mut ls = store.command(CommandId(1)).await.unwrap();
    ls.authorized_users = vec![UserId(7)];
    store.update_command(ls.id, &ls).await.unwrap();

    std::fs::write(
        &path,
        r#"[
            {"Name": "ls", "Image": "busybox", "Command": "ls -la"},
            {"Name": "du", "Image": "alpine", "Command": "du -sh /"}
        ]"#,
    )
    .unwrap();

    let summary = synchronize_from_file(&store, &path).await.unwrap();
    assert_eq!(
        summary,
        SyncSummary {
            created: 1,
            updated: 1,
            deleted: 1
        }
    );

    let commands = store.commands().await.unwrap();
    let names: Vec<_> = commands.iter().map(|command| command.name.as_str()).collect();
    assert_eq!(names, vec!["ls", "du"]);
    assert_eq!(commands[0].id, CommandId(1));
    assert_eq!(commands[0].image, "busybox");
    assert_eq!(commands[0].authorized_users, vec![UserId(7)]);
    assert_eq!(commands[1].id, CommandId(3));

    let summary = synchronize_from_file(&store, &path).await.unwrap();
    assert_eq!(summary, SyncSummary::default());
}

#[tokio::test]
async fn test_invalid_file_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("commands.json");
    let store = memory_store().await;
    store.create_command(Command::new("keep", "alpine")).await.unwrap();

    std::fs::write(&path, r#"[{"Name": "a", "Image": "alpine"}, {"Name": "a", "Image": "busybox"}]"#).unwrap();
    assert!(matches!(
        synchronize_from_file(&store, &path).await,
        Err(SyncError::Invalid(_))
    ));

    std::fs::write(&path, "{").unwrap();
    assert!(matches!(
        synchronize_from_file(&store, &path).await,
        Err(SyncError::Parse(_))
    ));

    let missing = temp_dir.path().join("missing.json");
    assert!(matches!(
        synchronize_from_file(&store, &missing).await,
        Err(SyncError::Read { .. })
    ));

    assert_eq!(store.commands().await.unwrap().len(), 1);
}
