use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::storage::{DurabilityMode, EngineOptions};

#[derive(Debug, Clone, Parser)]
#[command(name = "command-registry")]
#[command(about = "Transactional command registry with a role-gated HTTP API")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "CMDREG_BIND", default_value = "0.0.0.0:9000")]
    pub bind: SocketAddr,

    /// Directory holding the WAL and snapshot; in-memory when absent
    #[arg(long, env = "CMDREG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = "CMDREG_DURABILITY", value_enum, default_value_t = DurabilityMode::Async)]
    pub durability: DurabilityMode,

    /// WAL records written before the log is folded into a snapshot
    #[arg(long, env = "CMDREG_CHECKPOINT_THRESHOLD", default_value_t = 1000)]
    pub checkpoint_threshold: usize,

    /// Largest encoded command accepted by the store, in bytes
    #[arg(long, env = "CMDREG_MAX_VALUE_SIZE")]
    pub max_value_size: Option<usize>,

    #[arg(long, env = "CMDREG_ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    #[arg(long, env = "CMDREG_ADMIN_PASSWORD", default_value = "adminpass", hide_env_values = true)]
    pub admin_password: String,

    /// Extra non-administrator account, as NAME:PASSWORD; repeatable
    #[arg(long = "user", env = "CMDREG_USERS", value_delimiter = ',', hide_env_values = true)]
    pub users: Vec<UserAccount>,

    #[arg(long, env = "CMDREG_BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// JSON file of command definitions the registry is reconciled with at
    /// startup. Implies --no-command-management.
    #[arg(long, env = "CMDREG_EXTERNAL_COMMANDS")]
    pub external_commands: Option<PathBuf>,

    /// Reject create, update and delete with 503
    #[arg(long, env = "CMDREG_NO_COMMAND_MANAGEMENT")]
    pub no_command_management: bool,
}

/// Credentials of an account given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub username: String,
    pub password: String,
}

impl FromStr for UserAccount {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (username, password) = value
            .split_once(':')
            .ok_or_else(|| format!("expected NAME:PASSWORD, got '{value}'"))?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl Config {
    /// Whether the mutating command endpoints are enabled.
    pub fn command_management(&self) -> bool {
        !self.no_command_management && self.external_commands.is_none()
    }

    pub fn engine_options(&self) -> EngineOptions {
        let options = EngineOptions::default()
            .durability(self.durability)
            .checkpoint_threshold(self.checkpoint_threshold);
        match self.max_value_size {
            Some(limit) => options.max_value_size(limit),
            None => options,
        }
    }
}
