use std::env;
use std::path::Path;

use schemasmith_core::{CoreConfig, DesignSession};
use schemasmith_server::{AppState, router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::var("SCHEMASMITH_CONFIG") {
        Ok(path) => CoreConfig::load_from_path(Path::new(&path)),
        Err(_) => Ok(CoreConfig::default()),
    };
    let session = match config.and_then(DesignSession::new) {
        Ok(session) => session,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let addr = env::var("SCHEMASMITH_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "schemasmith_server listening");

    let app = router(AppState::new(session));
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        error!("server error: {e}");
    }
}
