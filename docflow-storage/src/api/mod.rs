//! HTTP API handlers for docflow-storage

pub mod broker;
pub mod health;

pub use broker::broker_routes;
pub use health::health_routes;
