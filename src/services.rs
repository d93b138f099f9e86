use crate::artifacts::{
    CustomerSegmentationArtifacts, LeadScoringArtifacts, SalesForecastingArtifacts,
};
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

// ============ Fallback Policies ============
//
// The feature encoders recover from missing or malformed fields with these
// documented defaults instead of failing the request. The only field whose
// malformation is an error is `budget`, and in batch scoring that error is
// isolated to the offending item.

/// Default marketing source when the lead carries none ("website").
pub const DEFAULT_SOURCE: &str = "الموقع الإلكتروني";
/// Default agent when the lead is unassigned.
pub const DEFAULT_AGENT: &str = "غير محدد";
/// Encoder output for a category value the encoder never saw during fitting.
pub const UNSEEN_CATEGORY_CODE: f64 = 0.0;
/// Elapsed days when the creation date is absent or unparseable.
pub const DEFAULT_DAYS_SINCE_CREATED: f64 = 0.0;

pub const DEFAULT_BUDGET: f64 = 0.0;
pub const DEFAULT_RECENCY: f64 = 30.0;
pub const DEFAULT_FREQUENCY: f64 = 1.0;
pub const DEFAULT_MONETARY: f64 = 0.0;
pub const DEFAULT_LEAD_COUNT: f64 = 1.0;
pub const DEFAULT_AVG_BUDGET: f64 = 0.0;
pub const DEFAULT_AVG_TRANSACTIONS: f64 = 5.0;

/// Map a 0-100 lead score to its priority bucket.
///
/// Strict greater-than on both thresholds: 40 and 70 themselves fall into
/// the lower bucket.
pub fn priority_for_score(score: f64) -> &'static str {
    if score > 70.0 {
        "High"
    } else if score > 40.0 {
        "Medium"
    } else {
        "Low"
    }
}

/// Map a segment code to its display tier. Codes outside the trained range
/// map to "Unknown".
pub fn segment_name(segment: i64) -> &'static str {
    match segment {
        0 => "Bronze",
        1 => "Silver",
        2 => "Gold",
        3 => "Platinum",
        _ => "Unknown",
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Days elapsed since `raw`, or the documented default when it does not
/// parse. Accepts a plain date or a datetime prefix (the CRM sends both).
fn days_since_created(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return DEFAULT_DAYS_SINCE_CREATED;
    };

    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc().date())
        });

    match parsed {
        Ok(date) => (Utc::now().date_naive() - date).num_days() as f64,
        Err(_) => DEFAULT_DAYS_SINCE_CREATED,
    }
}

/// Budget arrives as a JSON number or a numeric string. Anything else is a
/// per-request (or per-item) error rather than a silent default.
fn parse_budget(raw: Option<&Value>) -> Result<f64, String> {
    match raw {
        None | Some(Value::Null) => Ok(DEFAULT_BUDGET),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("Invalid budget value: {}", n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid budget value: '{}'", s)),
        Some(other) => Err(format!("Invalid budget value: {}", other)),
    }
}

fn tag_count(tags: Option<&Value>) -> f64 {
    tags.and_then(Value::as_array).map_or(0.0, |a| a.len() as f64)
}

// ============ Lead Scoring ============

pub struct LeadScoringService<'a> {
    artifacts: &'a LeadScoringArtifacts,
}

impl<'a> LeadScoringService<'a> {
    pub fn new(artifacts: &'a LeadScoringArtifacts) -> Self {
        Self { artifacts }
    }

    /// Build the 5-feature row for a lead:
    /// `[source_code, agent_code, tag_count, days_since_created, budget]`.
    ///
    /// The only failure is a malformed budget; every other field falls back
    /// to its documented default.
    fn encode_features(&self, lead: &Lead) -> Result<[f64; 5], String> {
        let source = lead.source.as_deref().unwrap_or(DEFAULT_SOURCE);
        let agent = lead.agent.as_deref().unwrap_or(DEFAULT_AGENT);

        let source_code = self
            .artifacts
            .le_source
            .transform(source)
            .map_or(UNSEEN_CATEGORY_CODE, |c| c as f64);
        let agent_code = self
            .artifacts
            .le_agent
            .transform(agent)
            .map_or(UNSEEN_CATEGORY_CODE, |c| c as f64);

        Ok([
            source_code,
            agent_code,
            tag_count(lead.tags.as_ref()),
            days_since_created(lead.created_at.as_deref()),
            parse_budget(lead.budget.as_ref())?,
        ])
    }

    /// Score a single lead to a 0-100 value plus its priority bucket.
    pub fn score(&self, lead: &Lead) -> Result<LeadScoreResponse, AppError> {
        let features = self
            .encode_features(lead)
            .map_err(AppError::InternalError)?;

        let probability = self
            .artifacts
            .model
            .predict_proba(&features)
            .map_err(|e| AppError::InternalError(e.to_string()))
            .context("Lead scoring prediction failed")?;

        let score = round2(probability * 100.0);

        Ok(LeadScoreResponse {
            success: true,
            lead_score: score,
            priority: priority_for_score(score).to_string(),
        })
    }

    /// Score a batch of leads, isolating each item's failure to its own
    /// result entry. The batch as a whole always succeeds.
    pub fn score_batch(&self, leads: &[Lead]) -> Vec<BatchScoreResult> {
        leads
            .iter()
            .map(|lead| {
                let scored = self
                    .encode_features(lead)
                    .and_then(|features| {
                        self.artifacts
                            .model
                            .predict_proba(&features)
                            .map_err(|e| e.to_string())
                    });

                match scored {
                    Ok(probability) => {
                        let score = round2(probability * 100.0);
                        BatchScoreResult::Scored {
                            lead_id: lead.id.clone(),
                            name: lead.name.clone(),
                            lead_score: score,
                            priority: priority_for_score(score).to_string(),
                        }
                    }
                    Err(error) => BatchScoreResult::Failed {
                        lead_id: lead.id.clone(),
                        name: lead.name.clone(),
                        error,
                    },
                }
            })
            .collect()
    }
}

// ============ Sales Forecasting ============

pub struct SalesForecastService<'a> {
    artifacts: &'a SalesForecastingArtifacts,
}

impl<'a> SalesForecastService<'a> {
    pub fn new(artifacts: &'a SalesForecastingArtifacts) -> Self {
        Self { artifacts }
    }

    /// Produce one prediction per calendar day in the closed range
    /// `[start_date, end_date]`.
    ///
    /// A degenerate range (end before start) yields an empty series with
    /// zeroed totals. Ranges longer than `max_days` are rejected.
    pub fn forecast(
        &self,
        request: &SalesForecastRequest,
        max_days: u32,
    ) -> Result<SalesForecastResponse, AppError> {
        let today = Utc::now().date_naive();
        let start = parse_forecast_date(request.start_date.as_deref(), "start_date")?
            .unwrap_or(today + Duration::days(1));
        let end = parse_forecast_date(request.end_date.as_deref(), "end_date")?
            .unwrap_or(today + Duration::days(30));
        let avg_transactions = request
            .avg_transactions
            .unwrap_or(DEFAULT_AVG_TRANSACTIONS);

        if end >= start {
            let span = (end - start).num_days() + 1;
            if span > i64::from(max_days) {
                return Err(AppError::BadRequest(format!(
                    "Forecast range of {} days exceeds the maximum of {}",
                    span, max_days
                )));
            }
        }

        let mut predictions = Vec::new();
        let mut date = start;
        while date <= end {
            let features = day_features(date, avg_transactions);
            let raw = self
                .artifacts
                .model
                .predict(&features)
                .map_err(|e| AppError::InternalError(e.to_string()))
                .context("Sales forecast prediction failed")?;

            predictions.push(DailyForecast {
                date: date.format("%Y-%m-%d").to_string(),
                // No negative sales
                predicted_sales: round2(raw.max(0.0)),
            });
            date += Duration::days(1);
        }

        let total: f64 = predictions.iter().map(|p| p.predicted_sales).sum();
        let total_forecast = round2(total);
        // Explicit guard: an empty range must not divide by zero
        let average_daily = if predictions.is_empty() {
            0.0
        } else {
            round2(total / predictions.len() as f64)
        };

        Ok(SalesForecastResponse {
            success: true,
            predictions,
            total_forecast,
            average_daily,
        })
    }
}

fn parse_forecast_date(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<NaiveDate>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::BadRequest(format!("{} must be a YYYY-MM-DD date, got '{}'", field, s))
            }),
    }
}

/// Calendar covariates the regressor was trained on. The two trailing zeros
/// stand in for the 7-day and 30-day rolling sales averages: no sales
/// history is available at inference time, so the service feeds zero for
/// both, matching the behavior the model has always been served with.
fn day_features(date: NaiveDate, avg_transactions: f64) -> [f64; 9] {
    let quarter = (date.month() + 2) / 3;
    [
        f64::from(date.year()),
        f64::from(date.month()),
        f64::from(date.day()),
        f64::from(date.iso_week().week()),
        f64::from(date.weekday().num_days_from_monday()),
        f64::from(quarter),
        avg_transactions,
        0.0,
        0.0,
    ]
}

// ============ Customer Segmentation ============

pub struct SegmentationService<'a> {
    artifacts: &'a CustomerSegmentationArtifacts,
}

impl<'a> SegmentationService<'a> {
    pub fn new(artifacts: &'a CustomerSegmentationArtifacts) -> Self {
        Self { artifacts }
    }

    /// Classify a customer into a Bronze/Silver/Gold/Platinum tier.
    pub fn segment(&self, customer: &Customer) -> Result<CustomerSegmentResponse, AppError> {
        let features = [
            customer.recency.unwrap_or(DEFAULT_RECENCY),
            customer.frequency.unwrap_or(DEFAULT_FREQUENCY),
            customer.monetary.unwrap_or(DEFAULT_MONETARY),
            customer.lead_count.unwrap_or(DEFAULT_LEAD_COUNT),
            customer.avg_budget.unwrap_or(DEFAULT_AVG_BUDGET),
        ];

        let scaled = self
            .artifacts
            .scaler
            .transform(&features)
            .map_err(|e| AppError::InternalError(e.to_string()))
            .context("Customer feature scaling failed")?;

        let segment = self
            .artifacts
            .model
            .predict(&scaled)
            .map_err(|e| AppError::InternalError(e.to_string()))
            .context("Customer segmentation prediction failed")? as i64;

        Ok(CustomerSegmentResponse {
            success: true,
            segment,
            segment_name: segment_name(segment).to_string(),
        })
    }
}
