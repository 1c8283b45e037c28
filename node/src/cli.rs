//! # CLI Interface
//!
//! Defines the command-line argument structure for `docauth-node` using
//! `clap` derive. Subcommands: `run`, `keygen`, `sign`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use docauth_protocol::config::DEFAULT_MAX_DOCUMENT_BYTES;

use crate::logging::LogFormat;
use crate::session::DEFAULT_SESSION_TTL_SECS;

/// DocAuth node.
///
/// Serves DID challenge-response authentication and a content-addressed
/// document ledger over HTTP, with Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "docauth-node",
    about = "DocAuth authentication and document ledger node",
    version,
    propagate_version = true
)]
pub struct DocAuthCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the DocAuth node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Run(RunArgs),
    /// Generate an identity and keypair and print them as JSON.
    Keygen,
    /// Sign a challenge locally and print the assertion as JSON.
    Sign(SignArgs),
    /// Print version information and exit.
    Version,
}

/// Which key may sign for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolverKind {
    /// Trust the public key the assertion declares.
    Declared,
    /// Only keys generated by this node (via `POST /identities`).
    Registry,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP API.
    #[arg(long, env = "DOCAUTH_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "DOCAUTH_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// Directory for the sled document store. Without it the ledger is
    /// in-memory only.
    #[arg(long, short = 'd', env = "DOCAUTH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Challenge lifetime in seconds. `0` disables expiry.
    #[arg(long, env = "DOCAUTH_CHALLENGE_TTL_SECS", default_value_t = 300)]
    pub challenge_ttl_secs: u64,

    /// Lifetime of a login session, in seconds.
    #[arg(
        long,
        env = "DOCAUTH_SESSION_TTL_SECS",
        default_value_t = DEFAULT_SESSION_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub session_ttl_secs: u64,

    /// Largest document body accepted, in bytes.
    #[arg(long, env = "DOCAUTH_MAX_DOCUMENT_BYTES", default_value_t = DEFAULT_MAX_DOCUMENT_BYTES)]
    pub max_document_bytes: usize,

    /// Enable `POST /assertions/sign`, which takes a private key over the
    /// wire. **Demo only.**
    #[arg(long, env = "DOCAUTH_ALLOW_SERVER_SIGNING")]
    pub allow_server_signing: bool,

    /// Identity-to-key resolution strategy.
    #[arg(long, env = "DOCAUTH_RESOLVER", value_enum, default_value_t = ResolverKind::Declared)]
    pub resolver: ResolverKind,

    /// Log output format.
    #[arg(long, env = "DOCAUTH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Identity the challenge was issued for.
    #[arg(long)]
    pub identity: String,

    /// Hex-encoded challenge.
    #[arg(long)]
    pub challenge: String,

    /// Hex-encoded Ed25519 private key.
    #[arg(long, env = "DOCAUTH_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}
