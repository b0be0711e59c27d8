//! Controller module turning service functions into request pipelines.
//!
//! This module handles:
//! - Buffering requests into a selector-friendly view
//! - Input selectors and pre-middleware stages
//! - The terminal stage that calls the service and writes the response
//! - Centralized error handling

pub mod error_handler;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod selector;

pub use error_handler::{fallback_response, ErrorEnvelope, ErrorHandler};
pub use middleware::{Middleware, Next};
pub use pipeline::{Controller, Pipeline, ServiceFuture};
pub use request::{Locals, RequestKey, ServiceRequest};
pub use selector::Selector;
