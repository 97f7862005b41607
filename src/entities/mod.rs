mod location;
mod metadata;
mod request;
mod result;
mod route;
mod summary;

pub use location::{Bounds, Coordinates, Location};
pub use metadata::{RouteData, RouteMetadata};
pub use request::{Profile, RouteRequest};
pub use result::RouteResult;
pub use route::{
    Annotation, Leg, Maneuver, Route, RouteQuery, RouteResponse, Step, Waypoint, CODE_NO_ROUTE,
    CODE_OK,
};
pub use summary::{success_rate, Method, RunContext, RunSummary};
