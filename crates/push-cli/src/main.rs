//! `webpush` command-line entry point.
//!
//! - `generate`: print a fresh VAPID key pair as JSON.
//! - `send`: encrypt and deliver one message to a stored subscription.
//!
//! Startup sequence for `send`:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise telemetry (JSON logs, OTLP export when configured).
//! 3. Read the subscription and key-pair files.
//! 4. Dispatch once and report the push service status.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use push_engine::Config;

#[derive(Parser)]
#[command(name = "webpush")]
#[command(about = "Encrypt and send web push messages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID key pair
    Generate {
        /// Also write the key pair to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send one message to a subscription
    Send {
        /// Subscription JSON as produced by `PushSubscription.toJSON()`
        #[arg(short, long, default_value = ".keys/subscription.json")]
        subscription: PathBuf,

        /// VAPID key pair JSON
        #[arg(short, long, default_value = ".keys/serverKeyPair.json")]
        keys: PathBuf,

        /// Message text
        #[arg(short, long, default_value = "Hello, World!")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { output } => commands::generate(output.as_deref()),
        Commands::Send {
            subscription,
            keys,
            payload,
        } => {
            // -----------------------------------------------------------------
            // 1. Configuration
            // -----------------------------------------------------------------
            let cfg = Config::from_env().map_err(|e| {
                // Telemetry is not yet up; write to stderr directly.
                eprintln!("ERROR: configuration invalid: {e}");
                e
            })?;

            // -----------------------------------------------------------------
            // 2. Telemetry
            // -----------------------------------------------------------------
            push_engine::telemetry::init_telemetry(
                cfg.otel_exporter_otlp_endpoint.as_deref(),
                &cfg.log_level,
            )?;

            // -----------------------------------------------------------------
            // 3-4. Load inputs and dispatch
            // -----------------------------------------------------------------
            commands::send(cfg, &subscription, &keys, payload).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_defaults() {
        let cli = Cli::try_parse_from(["webpush", "send"]).unwrap();
        match cli.command {
            Commands::Send {
                subscription,
                keys,
                payload,
            } => {
                assert_eq!(subscription, PathBuf::from(".keys/subscription.json"));
                assert_eq!(keys, PathBuf::from(".keys/serverKeyPair.json"));
                assert_eq!(payload, "Hello, World!");
            }
            Commands::Generate { .. } => panic!("parsed as generate"),
        }
    }
}
