mod artifacts;
mod config;
mod errors;
mod handlers;
mod models;
mod services;

use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::artifacts::ModelRegistry;
use crate::config::Config;
use crate::handlers::AppState;

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, builds the model registry from
/// the artifact directory, and starts the Axum server. A missing or corrupt
/// model never aborts startup; its endpoints respond with a model-unavailable
/// error instead.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_ml_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load model artifacts exactly once for the process lifetime
    let registry = ModelRegistry::load(Path::new(&config.models_dir));
    tracing::info!(
        lead_scoring = registry.lead_scoring.is_some(),
        sales_forecasting = registry.sales_forecasting.is_some(),
        customer_segmentation = registry.customer_segmentation.is_some(),
        "Model registry initialized"
    );

    // Build application state
    let app_state = Arc::new(AppState {
        registry: Arc::new(registry),
        config: config.clone(),
    });

    let app = handlers::build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
