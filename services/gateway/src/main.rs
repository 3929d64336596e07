use std::sync::Arc;

use anyhow::{Context, Result};
use gateway::{
    config::AppConfig,
    provider::BuildProvider,
    provider_eas::EasProvider,
    push::ExpoPushClient,
    state::AppState,
    store::BuildStore,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    // --- Build store ---
    let store = BuildStore::connect(&cfg.database_url)
        .await
        .with_context(|| format!("Failed to open build store at {}", cfg.database_url))?;
    store.ping().await.context("Build store ping failed")?;
    info!(database_url = %cfg.database_url, "store: ok");

    // --- Providers ---
    let provider: Option<Arc<dyn BuildProvider>> = match &cfg.eas {
        Some(creds) => {
            let eas = EasProvider::new(
                cfg.eas_api_url.clone(),
                creds.clone(),
                cfg.provider_timeout,
            )?;
            info!(
                base_url = %cfg.eas_api_url,
                project_id = %creds.project_id,
                "provider: eas configured"
            );
            let eas: Arc<dyn BuildProvider> = Arc::new(eas);
            Some(eas)
        }
        None => {
            warn!("provider: EXPO_TOKEN or EAS_PROJECT_ID missing; build submissions will fail");
            None
        }
    };
    let push = ExpoPushClient::new(cfg.expo_push_url.clone(), cfg.provider_timeout)?;

    info!(mode = %cfg.status_mode, "status: strategy selected");
    let bind_addr = cfg.bind_addr.clone();
    let state = Arc::new(AppState::new(cfg, store, provider, push));
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("gateway listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
