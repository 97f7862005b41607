use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, Profile, RouteRequest};

pub const CODE_OK: &str = "Ok";
pub const CODE_NO_ROUTE: &str = "NoRoute";

/// Body sent to the route service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub start: Coordinates,
    pub end: Coordinates,
    pub profile: Profile,
}

impl From<&RouteRequest> for RouteQuery {
    fn from(request: &RouteRequest) -> Self {
        Self {
            start: request.start,
            end: request.end,
            profile: request.profile,
        }
    }
}

/// OSRM-compatible route service response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RouteResponse {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Waypoint>,
}

impl RouteResponse {
    pub fn ok(route: Route) -> Self {
        Self {
            code: CODE_OK.into(),
            routes: vec![route],
            ..Default::default()
        }
    }

    pub fn no_route() -> Self {
        Self {
            code: CODE_NO_ROUTE.into(),
            message: Some("no route found".into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub geometry: String,
    pub legs: Vec<Leg>,
    /// metres
    pub distance: f64,
    /// seconds
    pub duration: f64,
    pub weight_name: String,
    pub weight: f64,
    pub summary: String,
}

impl Route {
    pub fn new(distance: f64, duration: f64) -> Self {
        Self {
            distance,
            duration,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Leg {
    pub steps: Vec<Step>,
    pub distance: f64,
    pub duration: f64,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub distance: f64,
    pub duration: f64,
    /// encoded polyline
    pub geometry: String,
    pub instruction: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver: Option<Maneuver>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub modifier: String,
    /// `[longitude, latitude]`
    pub location: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_before: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_after: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duration: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distance: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub speed: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Waypoint {
    pub name: String,
    pub location: Vec<f64>,
    pub distance: f64,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapped_distance: Option<f64>,
}

#[test]
fn decodes_backend_response_with_missing_fields() {
    let body = r#"{
        "code": "Ok",
        "routes": [{
            "distance": 2500.5,
            "duration": 400.0,
            "geometry": "_p~iF~ps|U_ulLnnqC",
            "legs": [{"steps": [{
                "distance": 10.0,
                "maneuver": {"type": "depart", "location": [-0.1278, 51.5074]}
            }]}]
        }],
        "unexpected": true
    }"#;

    let response: RouteResponse = serde_json::from_str(body).unwrap();

    assert_eq!(response.code, CODE_OK);
    assert!(response.message.is_none());
    assert_eq!(response.routes[0].distance, 2500.5);
    let maneuver = response.routes[0].legs[0].steps[0].maneuver.as_ref().unwrap();
    assert_eq!(maneuver.kind, "depart");
}
