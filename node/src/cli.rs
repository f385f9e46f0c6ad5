//! # CLI Interface
//!
//! Defines the command-line argument structure for `vowlock-node` using
//! `clap` derive. Two subcommands: `serve` and `version`.

use clap::{Parser, Subcommand};

/// VowLock configuration and asset server.
///
/// Serves the human-facing registry page and the component schema bundle
/// consumed by wallet-enabled frontends. All on-ledger logic lives in the
/// deployed contracts; this process is intentionally thin.
#[derive(Parser, Debug)]
#[command(
    name = "vowlock-node",
    about = "VowLock configuration and asset server",
    version,
    propagate_version = true
)]
pub struct VowlockNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VowLock node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, short = 'p', env = "VOWLOCK_PORT", default_value_t = 8350)]
    pub port: u16,

    /// Ledger address of the deployed pairing registry.
    ///
    /// When omitted, the `/config` endpoint serves an empty registry
    /// address — the read surface never refuses to start over this.
    #[arg(long, env = "VOWLOCK_REGISTRY_ADDRESS")]
    pub registry_address: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VOWLOCK_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        VowlockNodeCli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = VowlockNodeCli::parse_from(["vowlock-node", "serve"]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, 8350);
        assert!(args.registry_address.is_none());
    }
}
