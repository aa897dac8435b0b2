//! Viewer server - read-only web interface over the release artifact tree.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "viewer")]
#[command(about = "Read-only web viewer for built task artifacts")]
struct Args {
    /// Artifact root written by `builder build`
    #[arg(long, default_value = "release")]
    release_dir: PathBuf,

    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Directory containing UI static files (defaults to ./ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("viewer=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let release_dir = args.release_dir.canonicalize().unwrap_or(args.release_dir);
    info!(release_dir = %release_dir.display(), "starting viewer");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(AppState::new(release_dir));

    let ui_dir = args.ui_dir.unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
