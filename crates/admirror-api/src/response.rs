use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::PhaseResult;

/// Per-phase entry of the blocking response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PhaseResult> for PhaseOutcome {
    fn from(result: &PhaseResult) -> Self {
        Self {
            success: !result.is_failed(),
            count: result.count,
            error: result.error.clone(),
        }
    }
}

/// Aggregate result of a blocking sync
///
/// `success` says whether the pipeline ran at all; `overall_success` whether every phase
/// succeeded. Together with `results` a caller can tell "fully synced", "partially synced"
/// and "did not run" apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub overall_success: bool,
    pub results: BTreeMap<String, PhaseOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn from_results(overall_success: bool, results: &[PhaseResult]) -> Self {
        Self {
            success: true,
            overall_success,
            results: results
                .iter()
                .map(|r| (r.key.as_str().to_string(), PhaseOutcome::from(r)))
                .collect(),
            error: None,
        }
    }

    /// The pipeline could not be started
    pub fn not_run(error: impl Into<String>) -> Self {
        Self {
            success: false,
            overall_success: false,
            results: BTreeMap::new(),
            error: Some(error.into()),
        }
    }
}

/// Point-in-time view of the sync session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_active: bool,
    pub progress_percent: u8,
    pub current_phase_key: String,
    pub status_message: String,
    pub errors: Vec<String>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhaseKey;

    #[test]
    fn test_response_reports_per_phase_breakdown() {
        let mut zones = PhaseResult::pending(PhaseKey::Zones);
        zones.fail("HTTP 500");
        let mut networks = PhaseResult::pending(PhaseKey::Networks);
        networks.complete(3, 0);

        let response = SyncResponse::from_results(false, &[networks, zones]);
        assert!(response.success);
        assert!(!response.overall_success);
        assert!(response.results["networks"].success);
        assert_eq!(response.results["networks"].count, 3);
        assert!(!response.results["zones"].success);
        assert_eq!(response.results["zones"].error.as_deref(), Some("HTTP 500"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["overallSuccess"], false);
        assert!(json["results"]["networks"].get("error").is_none());
    }

    #[test]
    fn test_not_run_response() {
        let response = SyncResponse::not_run("invalid rate limit");
        assert!(!response.success);
        assert!(response.results.is_empty());
    }
}
