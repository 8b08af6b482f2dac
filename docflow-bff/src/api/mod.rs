//! HTTP API handlers for docflow-bff

pub mod broker;
pub mod health;
pub mod images;

pub use broker::{broker_routes, BffMessageHandler};
pub use health::health_routes;
pub use images::image_routes;
