use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Profile, Route, RouteRequest, RouteResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub id: u64,
    pub generated_at: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub profile: Profile,
    pub distance: f64,
    pub duration: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RouteMetadata {
    pub fn new(request: &RouteRequest, result: &RouteResult) -> Self {
        let (distance, duration) = match &result.route {
            Some(route) if result.error.is_none() => (route.distance, route.duration),
            _ => (0.0, 0.0),
        };

        Self {
            id: request.id,
            generated_at: Utc::now(),
            start_lat: request.start.latitude,
            start_lng: request.start.longitude,
            end_lat: request.end.latitude,
            end_lng: request.end.longitude,
            profile: request.profile,
            distance,
            duration,
            success: result.is_success(),
            error_message: result.error.as_ref().map(|err| err.message.clone()),
        }
    }
}

/// Per-request artifact as written to the sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteData {
    pub metadata: RouteMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
}
