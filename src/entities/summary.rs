use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Random,
    Permutation,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Permutation => "permutation",
        }
    }
}

/// Method-specific context reported alongside the totals.
#[derive(Clone, Debug, PartialEq)]
pub enum RunContext {
    Country(String),
    Locations(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_routes: usize,
    pub successful_routes: usize,
    pub failed_routes: usize,
    pub success_rate: f64,
    pub duration_seconds: f64,
    pub generated_at: DateTime<Utc>,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_count: Option<usize>,
}

impl RunSummary {
    pub fn new(
        total: usize,
        successful: usize,
        failed: usize,
        elapsed: Duration,
        method: Method,
        context: RunContext,
    ) -> Self {
        let (country, location_count) = match context {
            RunContext::Country(country) => (Some(country), None),
            RunContext::Locations(count) => (None, Some(count)),
        };

        Self {
            total_routes: total,
            successful_routes: successful,
            failed_routes: failed,
            success_rate: success_rate(successful, total),
            duration_seconds: elapsed.as_secs_f64(),
            generated_at: Utc::now(),
            method,
            country,
            location_count,
        }
    }
}

/// Percentage of successful routes; 0 for an empty batch.
pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    100.0 * successful as f64 / total as f64
}

#[test]
fn success_rate_is_zero_guarded() {
    assert_eq!(success_rate(0, 0), 0.0);
    assert_eq!(success_rate(5, 5), 100.0);
    assert_eq!(success_rate(1, 4), 25.0);
    assert!(success_rate(3, 0).is_finite());
}

#[test]
fn summary_carries_method_context() {
    let summary = RunSummary::new(
        4,
        3,
        1,
        Duration::from_millis(1500),
        Method::Permutation,
        RunContext::Locations(6),
    );

    assert_eq!(summary.success_rate, 75.0);
    assert_eq!(summary.duration_seconds, 1.5);
    assert_eq!(summary.location_count, Some(6));
    assert!(summary.country.is_none());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["method"], "permutation");
    assert!(json.get("country").is_none());
}
