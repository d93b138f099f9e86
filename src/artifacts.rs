use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============ Serialized Artifact Types ============
//
// Artifacts are parameter exports produced by the offline training pipeline
// and serialized as JSON. The service treats them as opaque: it only ever
// calls `predict` / `predict_proba` / `transform` and never inspects or
// mutates the fitted parameters.

/// Binary classifier exported as logistic-regression parameters.
///
/// `predict_proba` returns the positive-class probability in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// Positive-class probability for a single feature row.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            bail!(
                "feature vector has {} columns, model expects {}",
                features.len(),
                self.coefficients.len()
            );
        }

        let z: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept;

        Ok(sigmoid(z))
    }
}

/// Fitted label encoder: maps a category string to its index in the class
/// list learned at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    /// Encode a label, or `None` when the label was never seen during fitting.
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }
}

/// Regressor exported as linear-model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressor {
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            bail!(
                "feature vector has {} columns, model expects {}",
                features.len(),
                self.coefficients.len()
            );
        }

        Ok(self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept)
    }
}

/// Fitted standard scaler (per-column z-score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() || features.len() != self.scale.len() {
            bail!(
                "feature vector has {} columns, scaler was fitted on {}",
                features.len(),
                self.mean.len()
            );
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| if *s == 0.0 { x - m } else { (x - m) / s })
            .collect())
    }
}

/// Cluster classifier exported as centroids; prediction is the index of the
/// nearest centroid by Euclidean distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClassifier {
    pub centroids: Vec<Vec<f64>>,
}

impl CentroidClassifier {
    pub fn predict(&self, features: &[f64]) -> Result<usize> {
        if self.centroids.is_empty() {
            bail!("classifier has no centroids");
        }

        let mut min_distance = f64::INFINITY;
        let mut closest = 0;

        for (idx, centroid) in self.centroids.iter().enumerate() {
            if centroid.len() != features.len() {
                bail!(
                    "feature vector has {} columns, centroid {} has {}",
                    features.len(),
                    idx,
                    centroid.len()
                );
            }

            // Squared distance is enough for the argmin
            let distance: f64 = features
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();

            if distance < min_distance {
                min_distance = distance;
                closest = idx;
            }
        }

        Ok(closest)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// ============ Artifact Groups ============

/// Lead scoring classifier plus its two fitted category encoders.
#[derive(Debug, Clone)]
pub struct LeadScoringArtifacts {
    pub model: LogisticModel,
    pub le_source: LabelEncoder,
    pub le_agent: LabelEncoder,
}

#[derive(Debug, Clone)]
pub struct SalesForecastingArtifacts {
    pub model: LinearRegressor,
}

#[derive(Debug, Clone)]
pub struct CustomerSegmentationArtifacts {
    pub model: CentroidClassifier,
    pub scaler: StandardScaler,
}

// ============ Model Registry ============

/// Immutable registry of whichever artifact groups loaded at startup.
///
/// Built exactly once in `main`, wrapped in an `Arc`, and injected into
/// handlers through application state. A missing or corrupt artifact group
/// stays `None` and never affects the other groups or aborts startup.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    pub lead_scoring: Option<LeadScoringArtifacts>,
    pub sales_forecasting: Option<SalesForecastingArtifacts>,
    pub customer_segmentation: Option<CustomerSegmentationArtifacts>,
}

impl ModelRegistry {
    /// Load all artifact groups from the fixed directory layout under `base_dir`.
    ///
    /// Each group is attempted independently: an absent primary file leaves
    /// the group unloaded, and a load failure is logged and swallowed. The
    /// artifacts are read exactly once per process lifetime; there is no
    /// retry or reload.
    pub fn load(base_dir: &Path) -> Self {
        let lead_scoring = load_group(
            "Lead Scoring",
            &base_dir.join("Lead_scoring").join("lead_scoring_model.json"),
            |primary| {
                let dir = base_dir.join("Lead_scoring");
                Ok(LeadScoringArtifacts {
                    model: load_artifact(primary)?,
                    le_source: load_artifact(&dir.join("le_source.json"))?,
                    le_agent: load_artifact(&dir.join("le_agent.json"))?,
                })
            },
        );

        let sales_forecasting = load_group(
            "Sales Forecasting",
            &base_dir
                .join("Sales_forecasting")
                .join("sales_forecasting_model.json"),
            |primary| {
                Ok(SalesForecastingArtifacts {
                    model: load_artifact(primary)?,
                })
            },
        );

        let customer_segmentation = load_group(
            "Customer Segmentation",
            &base_dir
                .join("Customer_segmentation")
                .join("customer_segmentation_model.json"),
            |primary| {
                let dir = base_dir.join("Customer_segmentation");
                Ok(CustomerSegmentationArtifacts {
                    model: load_artifact(primary)?,
                    scaler: load_artifact(&dir.join("customer_segmentation_scaler.json"))?,
                })
            },
        );

        Self {
            lead_scoring,
            sales_forecasting,
            customer_segmentation,
        }
    }
}

/// Attempt one artifact group. Absent primary file or any load error leaves
/// the group unloaded without aborting startup.
fn load_group<T>(name: &str, primary: &Path, load: impl FnOnce(&Path) -> Result<T>) -> Option<T> {
    if !primary.exists() {
        tracing::warn!(
            model = name,
            path = %primary.display(),
            "Artifact file not found, model stays unloaded"
        );
        return None;
    }

    match load(primary) {
        Ok(group) => {
            tracing::info!(model = name, "Model loaded");
            Some(group)
        }
        Err(e) => {
            tracing::warn!(model = name, error = %e, "Failed to load model, stays unloaded");
            None
        }
    }
}

fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse artifact {}", path.display()))
}
