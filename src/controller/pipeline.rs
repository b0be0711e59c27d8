//! Controller builder and the tower service it produces.

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::Service;
use tracing::{debug, error, warn};

use crate::config::ControllerOptions;
use crate::error::{panic_message, ControllerError, SelectorError};
use crate::metrics::{self, LatencyTimer};
use crate::response::ServiceResponse;
use crate::status::StatusTable;

use super::error_handler::ErrorHandler;
use super::middleware::{Middleware, Next, Terminal};
use super::request::ServiceRequest;
use super::selector::Selector;

/// Boxed future returned by a stored service function.
pub type ServiceFuture<T, E> = BoxFuture<'static, anyhow::Result<ServiceResponse<T, E>>>;

type ServiceFn<I, T, E> = dyn Fn(I) -> ServiceFuture<T, E> + Send + Sync;

/// Builder wrapping a service function into a [`Pipeline`].
///
/// Defaults: the whole request body is the input, no middlewares, and
/// failures go to [`ErrorHandler::fallback`].
pub struct Controller<I, T = Value, E = Value> {
    service: Arc<ServiceFn<I, T, E>>,
    selector: Selector<I>,
    middlewares: Vec<Middleware>,
    error_handler: Option<ErrorHandler>,
    options: ControllerOptions,
    name: Cow<'static, str>,
}

impl<I, T, E> Controller<I, T, E>
where
    I: DeserializeOwned + Send + 'static,
    T: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    /// Controller whose input is the deserialized request body.
    pub fn new<F, Fut>(service: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ServiceResponse<T, E>>> + Send + 'static,
    {
        Self::with_selector(service, Selector::body())
    }
}

impl<I, T, E> Controller<I, T, E>
where
    I: Send + 'static,
    T: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    /// Controller with an explicit input selector.
    pub fn with_selector<F, Fut>(service: F, selector: Selector<I>) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ServiceResponse<T, E>>> + Send + 'static,
    {
        Self {
            service: Arc::new(move |input: I| service(input).boxed()),
            selector,
            middlewares: Vec::new(),
            error_handler: None,
            options: ControllerOptions::default(),
            name: Cow::Borrowed("controller"),
        }
    }

    /// Replace the input selector.
    pub fn selector(mut self, selector: Selector<I>) -> Self {
        self.selector = selector;
        self
    }

    /// Append a pre-middleware.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Append pre-middlewares, keeping their order.
    pub fn middlewares<M>(mut self, middlewares: M) -> Self
    where
        M: IntoIterator<Item = Middleware>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    /// Handler receiving every failure of this controller.
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Replace the options.
    pub fn options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Label used in logs and metrics.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Produce the ordered stages: middlewares, then the terminal stage.
    pub fn build(self) -> Pipeline {
        let error_handler = self
            .error_handler
            .unwrap_or_else(|| ErrorHandler::fallback(self.options.expose_error_details));

        let stage = Arc::new(TerminalStage {
            service: self.service,
            selector: self.selector,
            error_handler,
            body_limit: self.options.body_limit_bytes,
            name: self.name.clone(),
        });
        let terminal: Terminal = Arc::new(move |req: Request| {
            let stage = Arc::clone(&stage);
            async move { stage.respond(req).await }.boxed()
        });

        Pipeline {
            stages: self.middlewares.into(),
            terminal,
            name: self.name,
        }
    }
}

impl<I, T, E> fmt::Debug for Controller<I, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("middlewares", &self.middlewares.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct TerminalStage<I, T, E> {
    service: Arc<ServiceFn<I, T, E>>,
    selector: Selector<I>,
    error_handler: ErrorHandler,
    body_limit: usize,
    name: Cow<'static, str>,
}

impl<I, T, E> TerminalStage<I, T, E>
where
    I: Send + 'static,
    T: Serialize + Send + 'static,
    E: Serialize + Send + 'static,
{
    async fn respond(&self, req: Request) -> Response {
        let _timer = LatencyTimer::new(&self.name);

        match self.execute(req).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ControllerError::Status(_) | ControllerError::ServicePanicked(_) => {
                        error!(controller = %self.name, error = %err, "controller failed");
                    }
                    _ => {
                        warn!(
                            controller = %self.name,
                            error = %err,
                            "delegating failure to error handler"
                        );
                    }
                }
                metrics::inc_controller_failures(&self.name, err.kind());
                self.error_handler.handle(err)
            }
        }
    }

    async fn execute(&self, req: Request) -> Result<Response, ControllerError> {
        let request = ServiceRequest::from_request(req, self.body_limit).await?;

        let input = std::panic::catch_unwind(AssertUnwindSafe(|| self.selector.select(&request)))
            .map_err(|payload| SelectorError::Panicked(panic_message(payload)))??;
        drop(request);

        // Panics may happen in the call itself or while polling.
        let call = std::panic::catch_unwind(AssertUnwindSafe(|| (self.service)(input)))
            .map_err(|payload| ControllerError::ServicePanicked(panic_message(payload)))?;
        let result = AssertUnwindSafe(call)
            .catch_unwind()
            .await
            .map_err(|payload| ControllerError::ServicePanicked(panic_message(payload)))?
            .map_err(ControllerError::Service)?;

        let key = result.status();
        let status = StatusTable::global().code_for(key)?;
        let body = serde_json::to_vec(&result)?;

        debug!(
            controller = %self.name,
            status = %key,
            code = status.as_u16(),
            "controller responded"
        );
        metrics::inc_controller_requests(&self.name, key.as_str());

        Ok((status, [(CONTENT_TYPE, "application/json")], body).into_response())
    }
}

/// Ordered request-processing stages built by a [`Controller`].
///
/// A cloneable `tower::Service`; attach it with `Router::route_service` or
/// `axum::routing::{get_service, post_service, any_service}`.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Middleware]>,
    terminal: Terminal,
    name: Cow<'static, str>,
}

impl Pipeline {
    /// Number of stages, terminal included.
    pub fn len(&self) -> usize {
        self.stages.len() + 1
    }

    /// Always false; the terminal stage is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Controller label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every stage for `req`.
    pub async fn handle(&self, req: Request) -> Response {
        Next::new(Arc::clone(&self.stages), Arc::clone(&self.terminal))
            .run(req)
            .await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.len())
            .finish()
    }
}

impl Service<Request> for Pipeline {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let pipeline = self.clone();
        async move { Ok(pipeline.handle(req).await) }.boxed()
    }
}
