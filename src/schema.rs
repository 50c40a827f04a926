//! Wire schema for the gateway's external HTTP surface and the backend
//! `/predict` contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_request_type() -> String {
    "input".to_string()
}

/// External request to `POST /v1/validate`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ValidateRequest {
    /// Client-supplied request id; a fresh one is generated if absent.
    pub request_id: Option<String>,
    /// Project id, used upstream of this gateway for config lookup. The
    /// core itself does not interpret it further.
    pub project_id: String,
    /// Text to validate, bounded to 50,000 chars by the external contract.
    pub text: String,
    #[serde(default = "default_request_type")]
    pub r#type: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Maximum accepted length of `ValidateRequest::text`.
pub const MAX_TEXT_LEN: usize = 50_000;

impl ValidateRequest {
    /// Validates the request envelope: `type` must be `input` or
    /// `output`, and text must not exceed [`MAX_TEXT_LEN`].
    pub fn validate(&self) -> Result<(), String> {
        if self.r#type != "input" && self.r#type != "output" {
            return Err(format!(
                "type must be \"input\" or \"output\", got {:?}",
                self.r#type
            ));
        }
        if self.text.chars().count() > MAX_TEXT_LEN {
            return Err(format!(
                "text exceeds maximum length of {MAX_TEXT_LEN} characters"
            ));
        }
        Ok(())
    }
}

/// The reply shape every backend's `POST /predict` must return on 2xx.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelPrediction {
    pub flagged: bool,
    pub score: f64,
    #[serde(default)]
    pub details: Vec<String>,
    pub latency_ms: u64,
}

impl ModelPrediction {
    /// `0 <= score <= 1` is an invariant the core enforces; a prediction
    /// violating it is treated as a backend [`crate::error::BackendError::Parse`].
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.score)
    }
}

/// Per-backend result folded into [`ValidateResponse::model_results`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResult {
    pub flagged: bool,
    pub score: f64,
    pub details: Vec<String>,
    pub latency_ms: u64,
}

impl From<ModelPrediction> for ModelResult {
    fn from(p: ModelPrediction) -> Self {
        Self {
            flagged: p.flagged,
            score: p.score,
            details: p.details,
            latency_ms: p.latency_ms,
        }
    }
}

/// The request body the gateway sends to a backend's `/predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest<'a> {
    pub text: &'a str,
    pub request_id: &'a str,
}

/// Aggregated verdict returned by `POST /v1/validate`. Every field is always
/// present; empty containers serialize as empty, never `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidateResponse {
    pub request_id: String,
    pub flagged: bool,
    pub flag_reasons: Vec<String>,
    pub model_results: BTreeMap<String, ModelResult>,
    pub partial_failure: bool,
    pub failed_models: Vec<String>,
    pub latency_ms: u64,
}
