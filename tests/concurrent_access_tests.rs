/// Concurrent access tests
///
/// Readers listing the registry while a writer synchronizes must only ever
/// see the table before or after the batch.
/// Run with: cargo test --test concurrent_access_tests

use command_registry::{Command, CommandId, CommandStore, KvEngine, SyncBatch};
use std::sync::Arc;
use tokio::sync::Barrier;

async fn seeded_store(count: usize) -> Arc<CommandStore> {
    let store = CommandStore::new(Arc::new(KvEngine::in_memory())).await.unwrap();
    for i in 0..count {
        store
            .create_command(Command::new(format!("cmd-{i}"), "alpine"))
            .await
            .unwrap();
    }
    Arc::new(store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_synchronize() {
    let store = seeded_store(50).await;
    let before = 50;

    let to_delete: Vec<Command> = store.commands().await.unwrap().into_iter().take(10).collect();
    let to_create: Vec<Command> = (0..40)
        .map(|i| Command::new(format!("new-{i}"), "busybox"))
        .collect();
    let after = before - to_delete.len() + to_create.len();

    let num_readers = 8;
    let barrier = Arc::new(Barrier::new(num_readers + 1));
    let mut handles = vec![];

    for reader_id in 0..num_readers {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            for _ in 0..200 {
                let len = store.commands().await.unwrap().len();
                assert!(
                    len == before || len == after,
                    "Reader {} observed intermediate size {}",
                    reader_id,
                    len
                );
                tokio::task::yield_now().await;
            }
        }));
    }

    barrier.wait().await;
    store
        .synchronize(SyncBatch {
            to_create,
            to_update: Vec::new(),
            to_delete,
        })
        .await
        .unwrap();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.commands().await.unwrap().len(), after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_unique_ids() {
    let store = seeded_store(0).await;
    let num_tasks = 5;
    let creates_per_task = 20;

    let mut handles = vec![];
    for task_id in 0..num_tasks {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..creates_per_task {
                let command = store
                    .create_command(Command::new(format!("t{task_id}-{i}"), "alpine"))
                    .await
                    .unwrap();
                ids.push(command.id);
            }
            ids
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.await.unwrap());
    }
    ids.sort();

    let expected: Vec<_> = (1..=(num_tasks * creates_per_task) as u64).map(CommandId).collect();
    assert_eq!(ids, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_get_during_updates_sees_whole_records() {
    let store = seeded_store(1).await;
    let id = CommandId(1);

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..100 {
                let command = Command::new(format!("v{i}"), format!("image-v{i}"));
                store.update_command(id, &command).await.unwrap();
            }
        })
    };

    for _ in 0..100 {
        let command = store.command(id).await.unwrap();
        if let Some(version) = command.name.strip_prefix('v') {
            assert_eq!(command.image, format!("image-v{version}"));
        }
    }

    writer.await.unwrap();
}
