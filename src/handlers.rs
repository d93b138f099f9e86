use crate::artifacts::ModelRegistry;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::services::{LeadScoringService, SalesForecastService, SegmentationService};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable model registry built once at startup.
    pub registry: Arc<ModelRegistry>,
    /// Application configuration.
    pub config: Config,
}

/// Build the HTTP router over the given state.
///
/// Shared between `main` and the integration tests so both exercise the
/// exact same middleware stack and routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/lead-scoring", post(lead_scoring))
        .route("/api/sales-forecast", post(sales_forecast))
        .route("/api/customer-segment", post(customer_segment))
        .route("/api/batch-lead-scoring", post(batch_lead_scoring))
        // Request size limit: 2MB max payload, bounds batch scoring bodies
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /
///
/// Service metadata and endpoint listing.
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "ML API for CRM",
        "status": "running",
        "endpoints": {
            "health": "/api/health",
            "lead_scoring": "/api/lead-scoring",
            "sales_forecast": "/api/sales-forecast",
            "customer_segment": "/api/customer-segment",
            "batch_lead_scoring": "/api/batch-lead-scoring"
        }
    }))
}

/// GET /api/health
///
/// Reports which of the three artifact groups loaded at startup.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        models_loaded: ModelsLoaded {
            lead_scoring: state.registry.lead_scoring.is_some(),
            sales_forecasting: state.registry.sales_forecasting.is_some(),
            customer_segmentation: state.registry.customer_segmentation.is_some(),
        },
    })
}

/// POST /api/lead-scoring
///
/// Scores a single lead to a 0-100 conversion likelihood plus a priority
/// bucket.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - JSON body wrapping the lead record.
///
/// # Returns
///
/// * `Result<Json<LeadScoreResponse>, AppError>` - The score or an error.
pub async fn lead_scoring(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LeadScoringRequest>,
) -> Result<Json<LeadScoreResponse>, AppError> {
    let artifacts = state
        .registry
        .lead_scoring
        .as_ref()
        .ok_or_else(|| AppError::ModelUnavailable("Lead Scoring".to_string()))?;

    let response = LeadScoringService::new(artifacts).score(&request.lead)?;

    tracing::info!(
        lead_score = response.lead_score,
        priority = %response.priority,
        "Lead scored"
    );

    Ok(Json(response))
}

/// POST /api/batch-lead-scoring
///
/// Scores a list of leads. One item's failure is isolated to that item's
/// result entry; the batch as a whole still succeeds.
pub async fn batch_lead_scoring(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchLeadScoringRequest>,
) -> Result<Json<BatchLeadScoringResponse>, AppError> {
    let artifacts = state
        .registry
        .lead_scoring
        .as_ref()
        .ok_or_else(|| AppError::ModelUnavailable("Lead Scoring".to_string()))?;

    let results = LeadScoringService::new(artifacts).score_batch(&request.leads);

    tracing::info!(count = results.len(), "Batch lead scoring complete");

    Ok(Json(BatchLeadScoringResponse {
        success: true,
        results,
    }))
}

/// POST /api/sales-forecast
///
/// Produces a daily sales forecast over the requested closed date range.
pub async fn sales_forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SalesForecastRequest>,
) -> Result<Json<SalesForecastResponse>, AppError> {
    let artifacts = state
        .registry
        .sales_forecasting
        .as_ref()
        .ok_or_else(|| AppError::ModelUnavailable("Sales Forecasting".to_string()))?;

    let response = SalesForecastService::new(artifacts)
        .forecast(&request, state.config.max_forecast_days)?;

    tracing::info!(
        days = response.predictions.len(),
        total_forecast = response.total_forecast,
        "Sales forecast complete"
    );

    Ok(Json(response))
}

/// POST /api/customer-segment
///
/// Classifies a customer into a Bronze/Silver/Gold/Platinum tier.
pub async fn customer_segment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CustomerSegmentRequest>,
) -> Result<Json<CustomerSegmentResponse>, AppError> {
    let artifacts = state
        .registry
        .customer_segmentation
        .as_ref()
        .ok_or_else(|| AppError::ModelUnavailable("Customer Segmentation".to_string()))?;

    let response = SegmentationService::new(artifacts).segment(&request.customer)?;

    tracing::info!(
        segment = response.segment,
        segment_name = %response.segment_name,
        "Customer segmented"
    );

    Ok(Json(response))
}
