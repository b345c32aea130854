use anyhow::Result;
use clockface_core::NearestMatcher;
use clockface_store::Store;
use clockfaced::{build_router, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        threshold = config.match_threshold,
        "clockfaced starting"
    );
    if config.cross_tenant_match {
        tracing::warn!("cross-tenant matching enabled: punches compare against every tenant's descriptors");
    }

    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let store = Store::open(&config.db_path).await?;

    let matcher = NearestMatcher {
        threshold: config.match_threshold,
    };
    let state = AppState::new(store, matcher, config.cross_tenant_match);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "clockfaced ready");
    axum::serve(listener, app).await?;

    Ok(())
}
