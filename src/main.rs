//! resilient-fetch CLI.
//!
//! ```text
//!   resilient-fetch [--config FILE] fetch <endpoint> <path>
//!   resilient-fetch [--config FILE] check
//! ```
//!
//! `fetch` prints the JSON body on stdout. Failures print the error envelope
//! as JSON on stdout and exit with status 1. Ctrl-C cancels the call.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use resilient_fetch::config::ClientConfig;
use resilient_fetch::lifecycle::{build_service, cancel_on_ctrl_c, resolve_config};
use resilient_fetch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resilient-fetch")]
#[command(about = "GET JSON from configured endpoints with retries, timeouts and circuit breaking", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a path from an endpoint and print the JSON body
    Fetch {
        /// Endpoint identity, e.g. ExternalApi
        endpoint: String,
        /// Path resolved against the endpoint's base address
        path: String,
    },
    /// Validate the configuration and list endpoints
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&config.observability);

    match cli.command {
        Commands::Check => check(&config),
        Commands::Fetch { endpoint, path } => fetch(&config, &endpoint, &path).await,
    }
}

fn check(config: &ClientConfig) -> ExitCode {
    for endpoint in &config.endpoints {
        println!(
            "{}\t{}\tretries={} threshold={} cooldown={}ms call_timeout={}ms",
            endpoint.name,
            endpoint.base_address,
            endpoint.retry.max_retries,
            endpoint.circuit_breaker.failure_threshold,
            endpoint.circuit_breaker.cooldown_ms,
            endpoint.timeouts.call_ms,
        );
    }
    ExitCode::SUCCESS
}

async fn fetch(config: &ClientConfig, endpoint: &str, path: &str) -> ExitCode {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = match build_service(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let signals = cancel_on_ctrl_c(cancel.clone());
    let result = service
        .fetch_with_cancel::<Value>(endpoint, path, &cancel)
        .await;
    cancel.cancel();
    let _ = signals.await;

    match result {
        Ok(Some(body)) => print_json(&body),
        Ok(None) => {
            eprintln!("{endpoint} returned no content for {path}");
            ExitCode::SUCCESS
        }
        Err(envelope) => {
            let _ = print_json(&envelope.to_json());
            ExitCode::FAILURE
        }
    }
}

fn print_json(value: &Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
