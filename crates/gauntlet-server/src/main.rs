use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gauntlet_server::{AppState, router};
use gauntlet_session::GauntletConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gauntlet=debug".into()),
        )
        .init();

    let config = load_config()?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config);

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "gauntlet verification engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn load_config() -> Result<GauntletConfig> {
    match std::env::var("GAUNTLET_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))
        }
        Err(_) => Ok(GauntletConfig::default()),
    }
}
