//! Typed service functions as axum request pipelines.
//!
//! A *service function* holds the business logic: it takes a typed input and
//! returns a [`ServiceResponse`] carrying a symbolic status key such as
//! `CREATED` or `NOT_FOUND`. A [`Controller`] wraps it into a [`Pipeline`]
//! of stages that can be mounted on any route:
//!
//! ```text
//! request ─▶ middleware 1 ─▶ … ─▶ terminal stage
//!                                  ├─ selector(request)  → input
//!                                  ├─ service(input).await → ServiceResponse
//!                                  └─ StatusTable[status] → HTTP code + JSON body
//! ```
//!
//! # Modules
//!
//! - [`status`]: Status key groups and the lookup table
//! - [`response`]: Success/error result type
//! - [`controller`]: Controller builder, selectors, middlewares, error handler
//! - [`config`]: Controller options loaded from environment
//! - [`error`]: Unified error types
//! - [`metrics`]: Controller counters and latency
//! - [`utils`]: Utility functions

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod response;
pub mod status;
pub mod utils;

pub use config::ControllerOptions;
pub use controller::{Controller, ErrorHandler, Middleware, Next, Pipeline, Selector};
pub use error::{ControllerError, Result, SelectorError, StatusError};
pub use response::{ServiceFailure, ServiceResponse, ServiceSuccess};
pub use status::{resolve, StatusKey, StatusTable};
