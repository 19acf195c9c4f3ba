//! The jelly server: configured components mounted on one axum router

pub mod component;
pub mod components;
pub mod error;
pub mod routes;
pub mod state;

pub use component::{Component, ComponentRegistry};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::Environment;
