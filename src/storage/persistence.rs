//! Write-Ahead Logging (WAL) and snapshot persistence for the bucket engine

use crate::core::{Result, StoreError};
use crate::storage::Catalog;
use crate::transaction::Change;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

// ============================================================================
// WAL Records
// ============================================================================

/// One committed write transaction. Recovery applies a record completely or
/// not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub txid: u64,
    pub changes: Vec<Change>,
}

// ============================================================================
// Database Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: u32,
    pub catalog: Catalog,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: i64,
    pub entry_count: usize,
    pub bucket_count: usize,
}

impl DatabaseSnapshot {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(catalog: Catalog) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now().timestamp_millis(),
            entry_count: catalog.entry_count(),
            bucket_count: catalog.bucket_count(),
        };

        Self {
            version: Self::FORMAT_VERSION,
            catalog,
            metadata,
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DurabilityMode {
    /// fsync the WAL on every commit
    Sync,
    /// flush the WAL on every commit, leave fsync to the OS
    #[default]
    Async,
    /// keep everything in memory
    None,
}

// ============================================================================
// WAL Manager
// ============================================================================

pub struct WalManager {
    wal_path: PathBuf,
    wal_file: Option<File>,
    durability_mode: DurabilityMode,
    /// File length after the last record known to be fully written.
    committed_len: u64,
    /// Set when a failed append could not be rolled back.
    poisoned: bool,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
}

impl WalManager {
    pub fn new<P: AsRef<Path>>(wal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("Failed to create WAL directory", e))?;
        }

        let (wal_file, committed_len) = if durability_mode != DurabilityMode::None {
            let file = Self::open_for_append(&wal_path)?;
            let len = file
                .metadata()
                .map_err(|e| StoreError::io("Failed to stat WAL file", e))?
                .len();
            (Some(file), len)
        } else {
            (None, 0)
        };

        Ok(Self {
            wal_path,
            wal_file,
            durability_mode,
            committed_len,
            poisoned: false,
            entries_since_checkpoint: 0,
            checkpoint_threshold: 1000,
        })
    }

    fn open_for_append(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io("Failed to open WAL file", e))
    }

    /// Appends one record as a single frame.
    ///
    /// On failure the file is cut back to the end of the previous record, so
    /// a record whose transaction is rolled back never reaches recovery. If
    /// that cut fails too, the WAL refuses every further append.
    pub fn append(&mut self, record: &CommitRecord) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        if self.poisoned {
            return Err(StoreError::IoError(
                "WAL is unusable after a failed write; restart to recover".to_string(),
            ));
        }

        let serialized = rmp_serde::to_vec(record)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize WAL record: {}", e)))?;
        let len = u32::try_from(serialized.len())
            .map_err(|_| StoreError::Serialization("WAL record exceeds 4 GiB".to_string()))?;
        let mut frame = Vec::with_capacity(4 + serialized.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&serialized);

        if let Err(err) = self.write_frame(&frame) {
            self.discard_uncommitted();
            return Err(err);
        }

        self.committed_len += frame.len() as u64;
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let file = self
            .wal_file
            .as_mut()
            .ok_or_else(|| StoreError::IoError("WAL file not initialized".to_string()))?;
        file.write_all(frame).map_err(|e| StoreError::io("Failed to write WAL", e))?;
        if self.durability_mode == DurabilityMode::Sync {
            file.sync_data().map_err(|e| StoreError::io("Failed to sync WAL", e))?;
        }
        Ok(())
    }

    /// Drops anything written after the last complete record.
    fn discard_uncommitted(&mut self) {
        self.wal_file = None;
        let reopened = OpenOptions::new()
            .write(true)
            .open(&self.wal_path)
            .and_then(|file| file.set_len(self.committed_len))
            .map_err(|e| StoreError::io("Failed to roll back WAL", e))
            .and_then(|()| Self::open_for_append(&self.wal_path));

        match reopened {
            Ok(file) => {
                warn!(path = %self.wal_path.display(), len = self.committed_len, "WAL rolled back after failed write");
                self.wal_file = Some(file);
            }
            Err(err) => {
                error!(path = %self.wal_path.display(), error = %err, "WAL rollback failed, refusing further writes");
                self.poisoned = true;
            }
        }
    }

    /// Reads every complete record. A truncated trailing record (a commit
    /// interrupted mid-write) ends the log.
    pub fn read_all(&self) -> Result<Vec<CommitRecord>> {
        if !self.wal_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.wal_path).map_err(|e| StoreError::io("Failed to open WAL for reading", e))?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(StoreError::io("Failed to read WAL record length", e)),
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(path = %self.wal_path.display(), "ignoring truncated WAL record");
                    break;
                }
                Err(e) => return Err(StoreError::io("Failed to read WAL record", e)),
            }
            let record: CommitRecord = rmp_serde::from_slice(&data)
                .map_err(|e| StoreError::Corrupted(format!("Failed to deserialize WAL record: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.wal_file = None;
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.wal_path)
            .map_err(|e| StoreError::io("Failed to truncate WAL", e))?;
        self.wal_file = Some(Self::open_for_append(&self.wal_path)?);
        self.committed_len = 0;
        self.poisoned = false;
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold.max(1);
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temp file, syncs it and renames it over the previous
    /// snapshot, so a crash leaves either the old or the new image.
    pub fn save(&self, snapshot: &DatabaseSnapshot) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("Failed to create snapshot directory", e))?;
        }
        let temp_path = self.snapshot_path.with_extension("tmp");
        let temp_file = File::create(&temp_path).map_err(|e| StoreError::io("Failed to create temp file", e))?;
        let mut writer = BufWriter::new(temp_file);
        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;
        writer.write_all(&serialized).map_err(|e| StoreError::io("Failed to write snapshot", e))?;
        writer.flush().map_err(|e| StoreError::io("Failed to flush snapshot", e))?;
        writer.get_mut().sync_all().map_err(|e| StoreError::io("Failed to sync snapshot", e))?;
        fs::rename(&temp_path, &self.snapshot_path).map_err(|e| StoreError::io("Failed to rename snapshot", e))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<DatabaseSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path).map_err(|e| StoreError::io("Failed to open snapshot", e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| StoreError::io("Failed to read snapshot", e))?;
        let snapshot: DatabaseSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| StoreError::Corrupted(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != DatabaseSnapshot::FORMAT_VERSION {
            return Err(StoreError::Corrupted(format!(
                "Unsupported snapshot format version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    wal: WalManager,
    snapshot: SnapshotManager,
    durability_mode: DurabilityMode,
}

impl PersistenceManager {
    pub const WAL_FILE: &'static str = "registry.wal";
    pub const SNAPSHOT_FILE: &'static str = "registry.snapshot";

    pub fn new<P: AsRef<Path>>(data_dir: P, durability_mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let wal = WalManager::new(data_dir.join(Self::WAL_FILE), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(Self::SNAPSHOT_FILE));
        Ok(Self {
            wal,
            snapshot,
            durability_mode,
        })
    }

    pub fn log(&mut self, record: &CommitRecord) -> Result<()> {
        self.wal.append(record)
    }

    pub fn checkpoint(&mut self, catalog: &Catalog) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let snapshot = DatabaseSnapshot::new(catalog.clone());
        self.snapshot.save(&snapshot)?;
        self.wal.clear()?;
        debug!(
            version = catalog.version(),
            entries = snapshot.metadata.entry_count,
            "checkpoint written"
        );
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.wal.needs_checkpoint()
    }

    /// Rebuilds the last committed catalog from the snapshot plus the WAL.
    ///
    /// Records already folded into the snapshot (a crash between writing the
    /// snapshot and truncating the WAL) are skipped by transaction id.
    pub fn recover(&self) -> Result<Option<Catalog>> {
        let mut catalog = match self.snapshot.load()? {
            Some(snapshot) => snapshot.catalog,
            None => Catalog::new(),
        };

        let records = self.wal.read_all()?;
        if catalog.bucket_count() == 0 && records.is_empty() {
            return Ok(None);
        }

        for record in records {
            if record.txid <= catalog.version() {
                continue;
            }
            for change in record.changes {
                catalog.apply(change);
            }
            catalog.set_version(record.txid);
        }
        Ok(Some(catalog))
    }

    pub fn wal_mut(&mut self) -> &mut WalManager {
        &mut self.wal
    }
}
