/// Integration tests driving the full axum router
/// Exercises the JSON envelope, model-unavailable errors, and the loader
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use crm_ml_api::artifacts::{
    CentroidClassifier, CustomerSegmentationArtifacts, LabelEncoder, LeadScoringArtifacts,
    LinearRegressor, LogisticModel, ModelRegistry, SalesForecastingArtifacts, StandardScaler,
};
use crm_ml_api::config::Config;
use crm_ml_api::handlers::{build_router, AppState};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        port: 5000,
        models_dir: "models".to_string(),
        max_forecast_days: 366,
    }
}

/// Registry with every artifact group present, using fixed parameters.
fn full_registry() -> ModelRegistry {
    ModelRegistry {
        lead_scoring: Some(LeadScoringArtifacts {
            model: LogisticModel {
                coefficients: vec![0.0; 5],
                intercept: 0.0,
            },
            le_source: LabelEncoder {
                classes: vec!["الموقع الإلكتروني".to_string()],
            },
            le_agent: LabelEncoder {
                classes: vec!["غير محدد".to_string()],
            },
        }),
        sales_forecasting: Some(SalesForecastingArtifacts {
            model: LinearRegressor {
                coefficients: vec![0.0; 9],
                intercept: 250.0,
            },
        }),
        customer_segmentation: Some(CustomerSegmentationArtifacts {
            model: CentroidClassifier {
                centroids: vec![
                    vec![0.0; 5],
                    vec![1.0, 1.0, 1.0, 1.0, 1.0],
                    vec![2.0, 2.0, 2.0, 2.0, 2.0],
                    vec![3.0, 3.0, 3.0, 3.0, 3.0],
                ],
            },
            scaler: StandardScaler {
                mean: vec![0.0; 5],
                scale: vec![1.0; 5],
            },
        }),
    }
}

fn app_with(registry: ModelRegistry) -> axum::Router {
    build_router(Arc::new(AppState {
        registry: Arc::new(registry),
        config: test_config(),
    }))
}

async fn send(
    app: axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(json_body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = send(app_with(full_registry()), Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ML API for CRM");
    assert_eq!(body["endpoints"]["lead_scoring"], "/api/lead-scoring");
    assert_eq!(
        body["endpoints"]["batch_lead_scoring"],
        "/api/batch-lead-scoring"
    );
}

#[tokio::test]
async fn test_health_reports_all_models_loaded() {
    let (status, body) = send(app_with(full_registry()), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["models_loaded"]["lead_scoring"], true);
    assert_eq!(body["models_loaded"]["sales_forecasting"], true);
    assert_eq!(body["models_loaded"]["customer_segmentation"], true);
}

#[tokio::test]
async fn test_health_reports_missing_models() {
    let registry = ModelRegistry {
        lead_scoring: full_registry().lead_scoring,
        ..ModelRegistry::default()
    };

    let (status, body) = send(app_with(registry), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"]["lead_scoring"], true);
    assert_eq!(body["models_loaded"]["sales_forecasting"], false);
    assert_eq!(body["models_loaded"]["customer_segmentation"], false);
}

#[tokio::test]
async fn test_lead_scoring_success_envelope() {
    let (status, body) = send(
        app_with(full_registry()),
        Method::POST,
        "/api/lead-scoring",
        Some(json!({"lead": {"name": "عميل", "budget": 10000, "tags": ["vip"]}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["lead_score"], 50.0);
    assert_eq!(body["priority"], "Medium");
}

#[tokio::test]
async fn test_lead_scoring_model_unavailable() {
    let registry = ModelRegistry {
        sales_forecasting: full_registry().sales_forecasting,
        ..ModelRegistry::default()
    };

    let (status, body) = send(
        app_with(registry),
        Method::POST,
        "/api/lead-scoring",
        Some(json!({"lead": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Lead Scoring model not loaded");
}

#[tokio::test]
async fn test_sales_forecast_success_envelope() {
    let (status, body) = send(
        app_with(full_registry()),
        Method::POST,
        "/api/sales-forecast",
        Some(json!({"start_date": "2025-10-01", "end_date": "2025-10-07"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["predictions"].as_array().unwrap().len(), 7);
    assert_eq!(body["predictions"][0]["date"], "2025-10-01");
    assert_eq!(body["predictions"][0]["predicted_sales"], 250.0);
    assert_eq!(body["total_forecast"], 1750.0);
    assert_eq!(body["average_daily"], 250.0);
}

#[tokio::test]
async fn test_sales_forecast_model_unavailable() {
    let registry = ModelRegistry {
        lead_scoring: full_registry().lead_scoring,
        ..ModelRegistry::default()
    };

    let (status, body) = send(
        app_with(registry),
        Method::POST,
        "/api/sales-forecast",
        Some(json!({"start_date": "2025-10-01", "end_date": "2025-10-07"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Sales Forecasting model not loaded");
}

#[tokio::test]
async fn test_sales_forecast_range_cap() {
    let (status, body) = send(
        app_with(full_registry()),
        Method::POST,
        "/api/sales-forecast",
        Some(json!({"start_date": "2020-01-01", "end_date": "2030-01-01"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("maximum"));
}

#[tokio::test]
async fn test_customer_segment_success_envelope() {
    let (status, body) = send(
        app_with(full_registry()),
        Method::POST,
        "/api/customer-segment",
        Some(json!({"customer": {"recency": 2.0, "frequency": 2.0, "monetary": 2.0, "lead_count": 2.0, "avg_budget": 2.0}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["segment"], 2);
    assert_eq!(body["segment_name"], "Gold");
}

#[tokio::test]
async fn test_customer_segment_model_unavailable() {
    let (status, body) = send(
        app_with(ModelRegistry::default()),
        Method::POST,
        "/api/customer-segment",
        Some(json!({"customer": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Customer Segmentation model not loaded");
}

#[tokio::test]
async fn test_batch_scoring_isolates_bad_item() {
    let (status, body) = send(
        app_with(full_registry()),
        Method::POST,
        "/api/batch-lead-scoring",
        Some(json!({"leads": [
            {"id": 1, "name": "سارة", "budget": 5000},
            {"id": 2, "name": "خالد", "budget": "كثير"},
            {"id": 3, "name": "منى"}
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["lead_id"], 1);
    assert!(results[0]["error"].is_null());
    assert_eq!(results[0]["priority"], "Medium");

    assert_eq!(results[1]["lead_id"], 2);
    assert_eq!(results[1]["name"], "خالد");
    assert!(results[1]["error"].as_str().unwrap().contains("budget"));
    assert!(results[1]["lead_score"].is_null());

    assert_eq!(results[2]["lead_id"], 3);
    assert!(results[2]["lead_score"].is_number());
}

// ============ Loader Tests ============

fn write_full_artifact_tree(base: &Path) {
    let lead_dir = base.join("Lead_scoring");
    std::fs::create_dir_all(&lead_dir).unwrap();
    std::fs::write(
        lead_dir.join("lead_scoring_model.json"),
        r#"{"coefficients":[0.1,0.2,0.3,0.4,0.5],"intercept":-1.0}"#,
    )
    .unwrap();
    std::fs::write(
        lead_dir.join("le_source.json"),
        r#"{"classes":["الموقع الإلكتروني","فيسبوك"]}"#,
    )
    .unwrap();
    std::fs::write(lead_dir.join("le_agent.json"), r#"{"classes":["غير محدد"]}"#).unwrap();

    let sales_dir = base.join("Sales_forecasting");
    std::fs::create_dir_all(&sales_dir).unwrap();
    std::fs::write(
        sales_dir.join("sales_forecasting_model.json"),
        r#"{"coefficients":[0,0,0,0,0,0,10.0,0,0],"intercept":50.0}"#,
    )
    .unwrap();

    let seg_dir = base.join("Customer_segmentation");
    std::fs::create_dir_all(&seg_dir).unwrap();
    std::fs::write(
        seg_dir.join("customer_segmentation_model.json"),
        r#"{"centroids":[[0,0,0,0,0],[1,1,1,1,1],[2,2,2,2,2],[3,3,3,3,3]]}"#,
    )
    .unwrap();
    std::fs::write(
        seg_dir.join("customer_segmentation_scaler.json"),
        r#"{"mean":[0,0,0,0,0],"scale":[1,1,1,1,1]}"#,
    )
    .unwrap();
}

#[test]
fn test_registry_loads_all_groups_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_artifact_tree(tmp.path());

    let registry = ModelRegistry::load(tmp.path());
    assert!(registry.lead_scoring.is_some());
    assert!(registry.sales_forecasting.is_some());
    assert!(registry.customer_segmentation.is_some());

    let lead = registry.lead_scoring.unwrap();
    assert_eq!(lead.model.coefficients.len(), 5);
    assert_eq!(lead.le_source.transform("فيسبوك"), Some(1));
}

#[test]
fn test_registry_tolerates_missing_group() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_artifact_tree(tmp.path());
    std::fs::remove_file(
        tmp.path()
            .join("Sales_forecasting")
            .join("sales_forecasting_model.json"),
    )
    .unwrap();

    let registry = ModelRegistry::load(tmp.path());
    assert!(registry.lead_scoring.is_some());
    assert!(registry.sales_forecasting.is_none());
    assert!(registry.customer_segmentation.is_some());
}

#[test]
fn test_registry_tolerates_corrupt_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_artifact_tree(tmp.path());
    std::fs::write(
        tmp.path().join("Lead_scoring").join("lead_scoring_model.json"),
        "definitely not json",
    )
    .unwrap();

    let registry = ModelRegistry::load(tmp.path());
    // Corrupt group stays unloaded, siblings are unaffected
    assert!(registry.lead_scoring.is_none());
    assert!(registry.sales_forecasting.is_some());
    assert!(registry.customer_segmentation.is_some());
}

#[test]
fn test_registry_empty_directory_loads_nothing() {
    let tmp = tempfile::tempdir().unwrap();

    let registry = ModelRegistry::load(tmp.path());
    assert!(registry.lead_scoring.is_none());
    assert!(registry.sales_forecasting.is_none());
    assert!(registry.customer_segmentation.is_none());
}

#[tokio::test]
async fn test_health_matches_artifacts_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    write_full_artifact_tree(tmp.path());
    std::fs::remove_file(
        tmp.path()
            .join("Sales_forecasting")
            .join("sales_forecasting_model.json"),
    )
    .unwrap();

    let registry = ModelRegistry::load(tmp.path());
    let (status, body) = send(app_with(registry), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"]["lead_scoring"], true);
    assert_eq!(body["models_loaded"]["sales_forecasting"], false);
    assert_eq!(body["models_loaded"]["customer_segmentation"], true);
}
