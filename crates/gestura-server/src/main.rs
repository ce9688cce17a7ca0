//! Gestura — personal hand-gesture recognition and action server.

use std::path::PathBuf;
use std::sync::Arc;

use gestura_ingest::{ExtractorHandle, JsonLandmarkExtractor};
use gestura_runtime::{Engine, SignedTokenVerifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("GESTURA_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "token" => {
                let Some(user_id) = args.get(2) else {
                    eprintln!("Usage: gestura token <user-id>");
                    std::process::exit(1);
                };
                let config = gestura_core::GesturaConfig::from_env(resolve_data_dir())?;
                let ttl = chrono::Duration::hours(config.token_ttl_hours);
                println!("{}", SignedTokenVerifier::new(config.auth_secret).issue(user_id, ttl)?);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("Gestura — personal gesture recognition server");
                println!();
                println!("Usage: gestura [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  token <user-id>          Print a session token for a user");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'gestura help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = gestura_core::GesturaConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = gestura_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let engine = Engine::from_config(&config, store, ExtractorHandle::new(JsonLandmarkExtractor))
        .map_err(|e| anyhow::anyhow!("Failed to start engine: {}", e))?;

    let state = Arc::new(AppState::new(config, engine));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gestura server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
