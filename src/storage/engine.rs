use super::bucket::MAX_VALUE_SIZE;
use super::persistence::{CommitRecord, DurabilityMode, PersistenceManager};
use super::Catalog;
use crate::core::Result;
use crate::transaction::{ReadTx, WriteTx};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tuning knobs for [`KvEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub durability: DurabilityMode,
    pub checkpoint_threshold: usize,
    pub max_value_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            durability: DurabilityMode::default(),
            checkpoint_threshold: 1000,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}

impl EngineOptions {
    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    pub fn checkpoint_threshold(mut self, threshold: usize) -> Self {
        self.checkpoint_threshold = threshold;
        self
    }

    pub fn max_value_size(mut self, limit: usize) -> Self {
        self.max_value_size = limit;
        self
    }
}

/// Bucketed key-value engine with single-writer, multi-reader transactions.
///
/// - [`KvEngine::view`] runs against the catalog committed when it starts and
///   never observes a write transaction in flight.
/// - [`KvEngine::update`] runs with the writer lock held. Its changes become
///   visible all at once when the closure returns `Ok`, and are discarded when
///   it returns `Err`.
///
/// With a data directory, every commit is appended to a WAL before it is
/// published, and the WAL is folded into a snapshot periodically.
///
/// The only suspension point of `update` is acquiring the writer lock. Once
/// a commit record is in the WAL, publishing it runs to completion even if
/// the calling future is dropped.
pub struct KvEngine {
    committed: RwLock<Arc<Catalog>>,
    writer: Mutex<Option<PersistenceManager>>,
    options: EngineOptions,
}

impl KvEngine {
    pub fn in_memory() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// In-memory engine with custom limits; durability settings are ignored.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            committed: RwLock::new(Arc::new(Catalog::new())),
            writer: Mutex::new(None),
            options,
        }
    }

    /// Opens (or creates) a persistent engine in `data_dir`, replaying any
    /// committed state found there.
    pub fn open<P: AsRef<Path>>(data_dir: P, options: EngineOptions) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let mut persistence = PersistenceManager::new(data_dir, options.durability)?;
        persistence
            .wal_mut()
            .set_checkpoint_threshold(options.checkpoint_threshold);

        let catalog = match persistence.recover()? {
            Some(catalog) => {
                info!(
                    path = %data_dir.display(),
                    version = catalog.version(),
                    entries = catalog.entry_count(),
                    "recovered engine state"
                );
                catalog
            }
            None => Catalog::new(),
        };
        // Start the session from a clean WAL so that appends never follow a
        // torn record.
        persistence.checkpoint(&catalog)?;

        Ok(Self {
            committed: RwLock::new(Arc::new(catalog)),
            writer: Mutex::new(Some(persistence)),
            options,
        })
    }

    /// Runs `f` in a read-only transaction.
    pub async fn view<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx) -> Result<T>,
    {
        let tx = ReadTx::new(self.current());
        f(&tx)
    }

    /// Runs `f` in a read-write transaction and commits it if `f` succeeds.
    pub async fn update<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>,
    {
        let mut writer = self.writer.lock().await;
        let base = self.current();

        let mut tx = WriteTx::new(&base, self.options.max_value_size);
        let txid = tx.id();
        let output = match f(&mut tx) {
            Ok(output) => output,
            Err(err) => {
                debug!(%txid, error = %err, "write transaction rolled back");
                return Err(err);
            }
        };

        let (catalog, changes) = tx.into_parts();
        if changes.is_empty() {
            return Ok(output);
        }

        let change_count = changes.len();
        if let Some(persistence) = writer.as_mut() {
            persistence.log(&CommitRecord {
                txid: txid.as_u64(),
                changes,
            })?;
        }

        let catalog = Arc::new(catalog);
        self.publish(Arc::clone(&catalog));
        debug!(%txid, changes = change_count, "write transaction committed");

        if let Some(persistence) = writer.as_mut()
            && persistence.needs_checkpoint()
            && let Err(err) = persistence.checkpoint(&catalog)
        {
            warn!(%txid, error = %err, "checkpoint failed, WAL keeps growing");
        }

        Ok(output)
    }

    /// Folds the WAL into a fresh snapshot.
    pub async fn checkpoint(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        if let Some(persistence) = writer.as_mut() {
            persistence.checkpoint(&self.current())?;
        }
        Ok(())
    }

    fn current(&self) -> Arc<Catalog> {
        // The guarded sections only clone or replace an Arc, so a poisoned
        // lock still holds a consistent catalog.
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, catalog: Arc<Catalog>) {
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = catalog;
    }

    /// Writes a final checkpoint before shutdown.
    pub async fn close(&self) -> Result<()> {
        self.checkpoint().await?;
        info!("engine closed");
        Ok(())
    }
}
