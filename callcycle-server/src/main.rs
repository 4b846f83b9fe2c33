//! Cycle server - HTTP shell around one simulation cycle per request.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use callcycle::cycle::Adapters;
use callcycle::io::config::load_config;
use callcycle::io::init::CallcyclePaths;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "callcycle-server")]
#[command(about = "HTTP server that runs simulation cycles on request")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Project directory (contains .callcycle/)
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("callcycle_server=info".parse()?)
                .add_directive("callcycle=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    info!(project_dir = %project_dir.display(), "starting callcycle-server");

    let paths = CallcyclePaths::new(&project_dir);
    let config = load_config(&paths.config_path)?;
    let adapters = Adapters::from_config(&config);
    let state = AppState::new(project_dir, config, adapters);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router().layer(cors).with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
