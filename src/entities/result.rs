use crate::entities::Route;
use crate::error::Error;

/// Outcome for one request. Exactly one exists per request once a batch drains.
#[derive(Clone, Debug)]
pub struct RouteResult {
    pub id: u64,
    pub route: Option<Route>,
    pub error: Option<Error>,
    /// Network attempts started for this request; 0 when it was never dispatched.
    pub attempts: u32,
}

impl RouteResult {
    pub fn success(id: u64, route: Route, attempts: u32) -> Self {
        Self {
            id,
            route: Some(route),
            error: None,
            attempts,
        }
    }

    pub fn failure(id: u64, error: Error, attempts: u32) -> Self {
        Self {
            id,
            route: None,
            error: Some(error),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.route.is_some()
    }
}
