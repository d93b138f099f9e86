use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============ Request Models ============

/// A prospective customer record submitted for scoring.
///
/// Every field is optional; the feature encoder applies the documented
/// defaults for absent fields. `tags` and `budget` stay loosely typed on
/// purpose: the batch endpoint must isolate a malformed value to its own
/// item instead of failing deserialization of the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lead {
    /// Caller-side identifier, echoed back untouched in batch results.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    /// Marketing source channel. Defaults to "الموقع الإلكتروني" (website).
    #[serde(default)]
    pub source: Option<String>,
    /// Assigned sales agent. Defaults to "غير محدد" (unassigned).
    #[serde(default)]
    pub agent: Option<String>,
    /// Tag list; any non-array value counts as zero tags.
    #[serde(default)]
    pub tags: Option<Value>,
    /// Creation date string; an unparseable value counts as zero elapsed days.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
    /// Budget amount, number or numeric string. Defaults to 0.
    #[serde(default)]
    pub budget: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadScoringRequest {
    #[serde(default)]
    pub lead: Lead,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchLeadScoringRequest {
    #[serde(default)]
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalesForecastRequest {
    /// First forecast day, inclusive. Defaults to tomorrow.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Last forecast day, inclusive. Defaults to 30 days out.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Assumed average daily transaction count. Defaults to 5.
    #[serde(default)]
    pub avg_transactions: Option<f64>,
}

/// Behavioral/monetary features of an existing customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    /// Days since last activity. Defaults to 30.
    #[serde(default)]
    pub recency: Option<f64>,
    /// Purchase count. Defaults to 1.
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Total monetary value. Defaults to 0.
    #[serde(default)]
    pub monetary: Option<f64>,
    /// Number of leads attributed to the customer. Defaults to 1.
    #[serde(default)]
    pub lead_count: Option<f64>,
    /// Average lead budget. Defaults to 0.
    #[serde(default)]
    pub avg_budget: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerSegmentRequest {
    #[serde(default)]
    pub customer: Customer,
}

// ============ Response Models ============

#[derive(Debug, Clone, Serialize)]
pub struct LeadScoreResponse {
    pub success: bool,
    /// Conversion likelihood scaled to 0-100, rounded to 2 decimals.
    pub lead_score: f64,
    /// "High" (>70), "Medium" (>40) or "Low".
    pub priority: String,
}

/// One entry of a batch scoring response. A failed item carries an `error`
/// field instead of a score; sibling items are unaffected.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchScoreResult {
    Scored {
        lead_id: Option<Value>,
        name: Option<String>,
        lead_score: f64,
        priority: String,
    },
    Failed {
        lead_id: Option<Value>,
        name: Option<String>,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchLeadScoringResponse {
    pub success: bool,
    pub results: Vec<BatchScoreResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    /// Calendar day, YYYY-MM-DD.
    pub date: String,
    /// Regression output clamped at 0 and rounded to 2 decimals.
    pub predicted_sales: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesForecastResponse {
    pub success: bool,
    pub predictions: Vec<DailyForecast>,
    pub total_forecast: f64,
    /// `total_forecast / predictions.len()`, 0 for an empty range.
    pub average_daily: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSegmentResponse {
    pub success: bool,
    pub segment: i64,
    /// Bronze/Silver/Gold/Platinum, or "Unknown" for an unexpected code.
    pub segment_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsLoaded {
    pub lead_scoring: bool,
    pub sales_forecasting: bool,
    pub customer_segmentation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub models_loaded: ModelsLoaded,
}
