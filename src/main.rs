use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, config_from_env, router};

/// Main entry point for the lab portal
///
/// Loads `.env` if present, resolves configuration once and serves the REST API.
///
/// # Environment Variables
/// - `LAB_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `LAB_UPLOAD_DIR`: Upload storage directory (default: "uploads")
/// - `LAB_PUBLIC_BASE_URL`: URL prefix for stored uploads
/// - `LAB_QUOTATION_PREFIX`: Prefix for issued quotation numbers (default: "QT")
/// - `LAB_CATALOG_FILE`: Optional guideline catalog override
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lab_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("lab_files=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("LAB_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env()?);
    tracing::info!(
        "++ Upload dir {}, quotation prefix {}",
        cfg.upload_dir().display(),
        cfg.quotation_prefix()
    );

    let state = AppState::from_config(cfg)?;
    tracing::info!(
        "++ Catalog loaded with {} categories",
        state.service().catalog().categories().len()
    );

    tracing::info!("++ Starting lab portal REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
