// ============================================================================
// Command Registry Library
// ============================================================================
//
// Layers, bottom-up:
// - storage / transaction: bucketed key-value engine with single-writer,
//   snapshot-reader transactions and WAL + snapshot persistence
// - store: the Command entity store, including atomic Synchronize
// - security / proxy: request authentication and proxy route teardown
// - web: axum router exposing the registry over HTTP
//
// ============================================================================

pub mod config;
pub mod core;
pub mod proxy;
pub mod security;
pub mod storage;
pub mod store;
pub mod sync;
pub mod transaction;
pub mod web;

pub use config::Config;
pub use crate::core::{Command, CommandId, Result, StoreError, TeamId, UserId};
pub use proxy::{ProxyManager, RouteTable};
pub use security::{AuthManager, RequestBouncer, Role, TokenData};
pub use storage::{DurabilityMode, EngineOptions, KvEngine};
pub use store::{CommandStore, SyncBatch};
pub use web::{AppState, build_router};
