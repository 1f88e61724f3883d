//! D-NAV — decision-candidate extraction server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dnav_core::ExtractionConfig;
use dnav_server::cli::{self, ExtractArgs};
use dnav_server::config::resolve_data_dir;
use dnav_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = resolve_data_dir();
    let config = ServerConfig::from_env(&data_dir);

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "extract" => {
                let extract_args = ExtractArgs::parse(&args[2..])?;
                let output = cli::run_extract(&extract_args, &config).await?;
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("D-NAV — decision-candidate extraction");
                println!();
                println!("Usage: dnav [command]");
                println!();
                println!("Commands:");
                println!("  (none)                              Start the server");
                println!("  extract <request.json> [--mode m]   Run one extraction and print the JSON response");
                println!("  help                                Show this help message");
                println!();
                println!("Modes: local, extract, refine");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'dnav help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    info!("Data directory: {}", data_dir.display());

    let port = config.port;
    let state = Arc::new(AppState::new(&config, ExtractionConfig::from_env()));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("D-NAV server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
