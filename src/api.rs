use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{RouteQuery, RouteResponse};
use crate::error::Error;

/// The routing backend. Implementations return the backend's response as-is;
/// classifying `code` is left to the processor.
#[async_trait]
pub trait RouteFinder {
    async fn find_route(&self, query: &RouteQuery) -> Result<RouteResponse, Error>;
}

/// Keyed byte storage for persisted artifacts.
#[async_trait]
pub trait ResultSink {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error>;
}

pub type DynRouteFinder = Arc<dyn RouteFinder + Send + Sync>;

pub type DynSink = Arc<dyn ResultSink + Send + Sync>;
