use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use caching_gateway::config::load_config;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the caching gateway", long_about = None)]
struct Cli {
    /// Base URL of a running gateway.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file without starting the gateway
    Check {
        /// Path to the TOML configuration file.
        config: PathBuf,
    },
    /// Send a request through the gateway and print the response
    Get {
        /// Path to request, e.g. "/assets/app.js".
        path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => match load_config(&config) {
            Ok(parsed) => {
                println!(
                    "OK: {} route(s), origin {}",
                    parsed.routes.len(),
                    parsed.upstream.origin
                );
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("Invalid configuration: {}", error);
                ExitCode::FAILURE
            }
        },
        Commands::Get { path } => {
            let target = format!("{}{}", cli.url.trim_end_matches('/'), path);
            let client = reqwest::Client::new();
            match client.get(&target).send().await {
                Ok(response) => {
                    let status = response.status();
                    let request_id = response
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string();
                    let body = response.text().await.unwrap_or_default();
                    println!("{} (request id {})", status, request_id);
                    println!("{}", body);
                    if status.is_success() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(error) => {
                    eprintln!("Request failed: {}", error);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
