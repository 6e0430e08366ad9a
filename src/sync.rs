//! Reconciles the registry with a file of command definitions.
//!
//! Definitions are matched to stored commands by name. A stored command keeps
//! its id and access lists when its definition changes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::core::{Command, StoreError};
use crate::store::{CommandStore, SyncBatch};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse command definitions: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid command definition: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandDefinition {
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "image")]
    pub image: String,
    #[serde(alias = "command", default)]
    pub command: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

pub fn load_definitions(path: &Path) -> Result<Vec<CommandDefinition>, SyncError> {
    let raw = std::fs::read(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definitions(&raw)
}

pub fn parse_definitions(raw: &[u8]) -> Result<Vec<CommandDefinition>, SyncError> {
    let definitions: Vec<CommandDefinition> = serde_json::from_slice(raw)?;

    let mut names = HashSet::new();
    for definition in &definitions {
        if definition.name.is_empty() {
            return Err(SyncError::Invalid("Name is required".into()));
        }
        if definition.image.is_empty() {
            return Err(SyncError::Invalid(format!(
                "Image is required for '{}'",
                definition.name
            )));
        }
        if !names.insert(definition.name.as_str()) {
            return Err(SyncError::Invalid(format!(
                "duplicate command name '{}'",
                definition.name
            )));
        }
    }

    Ok(definitions)
}

/// Computes the batch that turns `stored` into `desired`.
///
/// `stored` is expected in ascending id order. When several stored commands
/// share a name, the lowest id is kept and the others are deleted.
pub fn plan(stored: &[Command], desired: &[CommandDefinition]) -> SyncBatch {
    let mut by_name: HashMap<&str, Vec<&Command>> = HashMap::new();
    for command in stored {
        by_name.entry(command.name.as_str()).or_default().push(command);
    }

    let mut batch = SyncBatch::default();
    for definition in desired {
        match by_name.get(definition.name.as_str()).and_then(|group| group.first()) {
            None => batch.to_create.push(
                Command::new(definition.name.clone(), definition.image.clone())
                    .with_command(definition.command.clone()),
            ),
            Some(existing)
                if existing.image != definition.image || existing.command != definition.command =>
            {
                let mut updated = (*existing).clone();
                updated.image = definition.image.clone();
                updated.command = definition.command.clone();
                batch.to_update.push(updated);
            }
            Some(_) => {}
        }
    }

    let wanted: HashSet<&str> = desired.iter().map(|d| d.name.as_str()).collect();
    batch.to_delete = stored
        .iter()
        .filter(|command| {
            let keeps_slot = by_name
                .get(command.name.as_str())
                .and_then(|group| group.first())
                .is_some_and(|first| first.id == command.id);
            !(wanted.contains(command.name.as_str()) && keeps_slot)
        })
        .cloned()
        .collect();

    batch
}

/// Loads `path` and applies the difference to `store` in one transaction.
pub async fn synchronize_from_file(store: &CommandStore, path: &Path) -> Result<SyncSummary, SyncError> {
    let desired = load_definitions(path)?;
    let stored = store.commands().await?;
    let batch = plan(&stored, &desired);

    let summary = SyncSummary {
        created: batch.to_create.len(),
        updated: batch.to_update.len(),
        deleted: batch.to_delete.len(),
    };
    if !batch.is_empty() {
        store.synchronize(batch).await?;
    }

    info!(
        path = %path.display(),
        created = summary.created,
        updated = summary.updated,
        deleted = summary.deleted,
        "external command definitions applied"
    );
    Ok(summary)
}
