use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bunq",
    version,
    about = "Set up bunq API credentials and send signed requests"
)]
pub struct Cli {
    /// Credential file (default: <config dir>/bunq/credentials.json)
    #[arg(long, global = true, env = "BUNQ_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Debug logging on stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install, register this device and open a session
    Setup(SetupArgs),
    /// Replace the session token (full setup if never installed)
    Refresh,
    /// Show environment and handshake progress
    Status,
    /// Store a new API key and forget everything derived from the old one
    RotateSecret(RotateSecretArgs),
    /// Switch between sandbox and production
    Environment(EnvironmentArgs),
    /// Delete all stored credentials
    Clear,
    /// Send a signed request and print the response envelope
    Request(RequestArgs),
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// API key to store before running the handshake
    #[arg(long, env = "BUNQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// sandbox or production
    #[arg(long)]
    pub environment: Option<String>,
}

#[derive(Args, Debug)]
pub struct RotateSecretArgs {
    #[arg(long, env = "BUNQ_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(Args, Debug)]
pub struct EnvironmentArgs {
    /// sandbox or production
    pub environment: String,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method, e.g. GET or POST
    pub method: String,

    /// Path below /v1, e.g. /user
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// On 401/403, refresh the session once and retry
    #[arg(long)]
    pub refresh_on_auth_failure: bool,
}
