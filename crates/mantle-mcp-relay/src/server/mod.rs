//! HTTP surface: the SSE stream endpoint, the inbound-call endpoint and a
//! health probe.

mod health;
mod routes;

pub use health::HealthReport;
pub use routes::{AppState, RouteSettings, build_router};
