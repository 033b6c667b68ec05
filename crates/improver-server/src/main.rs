//! Protocol Improver CLI
//!
//! Starts the HTTP API for protocol review and revision.

use improver_server::{config::ServerConfig, start_server, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the key may come from the shell or the config
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using defaults and environment");
        eprintln!("Usage: protocol-improver --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::from_env()?
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Protocol Improver - Laboratory protocol review API");
    println!();
    println!("USAGE:");
    println!("    protocol-improver --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    ANTHROPIC_API_KEY  API key (overrides provider.api_key; .env is read)");
    println!("    RUST_LOG           Log filter (default: info)");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address, bind_port: where to listen (default 127.0.0.1:8000)");
    println!("    - upload_dir, output_dir: file storage (default uploads/, outputs/)");
    println!("    - max_file_size_mb: upload ceiling (default: 10)");
    println!("    - preview_chars: upload preview length (default: 500)");
    println!("    - [analyzer]: model, max_tokens, temperature, revision_temperature,");
    println!("      health_check_max_tokens, model_timeout_secs");
    println!("    - [provider]: base_url, api_key");
    println!();
}
