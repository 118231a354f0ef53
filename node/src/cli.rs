//! # CLI Interface
//!
//! Defines the command-line argument structure for `nova-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// NOVA Protocol validator node.
///
/// A full validator node for the NOVA payment network. Participates in
/// consensus, validates transactions, serves the JSON-RPC API, and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "nova-node",
    about = "NOVA Protocol validator node",
    version,
    propagate_version = true
)]
pub struct NovaNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the NOVA node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the validator node.
    Run(RunArgs),
    /// Initialize a new node — creates the data directory and generates
    /// a fresh validator keypair.
    Init(InitArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    ///
    /// When omitted, the node looks for `config.toml` in the data directory.
    #[arg(long, short = 'c', env = "NOVA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the node data directory where blocks, state, and keys are stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "NOVA_DATA_DIR", default_value = "~/.nova")]
    pub data_dir: PathBuf,

    /// Bind address for the JSON-RPC and REST API.
    #[arg(long, env = "NOVA_RPC_ADDR", default_value = "0.0.0.0:9741")]
    pub rpc_addr: String,

    /// Bind address for P2P communication with other validators.
    #[arg(long, env = "NOVA_P2P_ADDR", default_value = "0.0.0.0:9740")]
    pub p2p_addr: String,

    /// Bind address for the Prometheus metrics endpoint.
    #[arg(long, env = "NOVA_METRICS_ADDR", default_value = "0.0.0.0:9742")]
    pub metrics_addr: String,

    /// Hex-encoded Ed25519 validator private key.
    ///
    /// If not provided, the node reads the key from the data directory.
    /// **Never pass this flag in production** — use a key file or vault instead.
    #[arg(long, env = "NOVA_VALIDATOR_KEY")]
    pub validator_key: Option<String>,

    /// Run in dev mode: ephemeral keypair, in-memory database, pre-funded
    /// test accounts, and a single-validator consensus set.
    #[arg(long)]
    pub dev: bool,

    /// Participate in consensus (propose and vote on blocks) rather than
    /// just relaying transactions and serving RPC queries.
    #[arg(long)]
    pub validator: bool,

    /// Amount staked, in photons. Ignored in dev mode (a fixed dev stake
    /// is used instead).
    #[arg(long, default_value_t = 0)]
    pub stake: u64,

    /// Log verbosity: error, warn, info, debug, or trace.
    #[arg(long, env = "NOVA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "NOVA_DATA_DIR", default_value = "~/.nova")]
    pub data_dir: PathBuf,

    /// Network to configure for: mainnet, testnet, or devnet.
    #[arg(long, default_value = "devnet")]
    pub network: String,

    /// Overwrite an existing data directory's validator key.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9741")]
    pub rpc_url: String,
}

/// Expands a leading `~` to the user's home directory, leaving other paths
/// untouched.
pub fn resolve_data_dir(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs_home() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Returns `$HOME`, or `None` if unset (falls back to the literal path).
fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Formats an amount of photons (10^-8 NOVA) as a fixed-point NOVA string.
pub fn format_nova_amount(photons: u64) -> String {
    const PHOTONS_PER_NOVA: u64 = 100_000_000;
    format!(
        "{}.{:08}",
        photons / PHOTONS_PER_NOVA,
        photons % PHOTONS_PER_NOVA
    )
}

/// Checks whether `level` is a valid `tracing`/`EnvFilter` level name.
pub fn validate_log_level(level: &str) -> bool {
    matches!(
        level.to_ascii_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        NovaNodeCli::command().debug_assert();
    }

    #[test]
    fn resolve_data_dir_expands_tilde() {
        std::env::set_var("HOME", "/home/nova-test-user");
        let resolved = resolve_data_dir(Path::new("~/.nova"));
        assert_eq!(resolved, PathBuf::from("/home/nova-test-user/.nova"));
    }

    #[test]
    fn resolve_data_dir_leaves_absolute_paths_alone() {
        let resolved = resolve_data_dir(Path::new("/var/lib/nova"));
        assert_eq!(resolved, PathBuf::from("/var/lib/nova"));
    }

    #[test]
    fn format_nova_amount_basic_values() {
        assert_eq!(format_nova_amount(0), "0.00000000");
        assert_eq!(format_nova_amount(1), "0.00000001");
        assert_eq!(format_nova_amount(100_000_000), "1.00000000");
    }

    #[test]
    fn validate_log_level_accepts_known_levels_only() {
        for level in ["error", "warn", "info", "debug", "trace", "INFO"] {
            assert!(validate_log_level(level), "{level} should be valid");
        }
        assert!(!validate_log_level("garbage"));
    }
}
