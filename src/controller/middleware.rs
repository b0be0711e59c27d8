//! Pre-middleware stages and the continuation that runs the rest of a pipeline.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;

type StageFn = dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// Terminal stage of a pipeline.
pub(crate) type Terminal = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// A request-processing stage that runs before the service call.
#[derive(Clone)]
pub struct Middleware {
    handler: Arc<StageFn>,
}

impl Middleware {
    /// Stage from an async function.
    ///
    /// Call `next.run(req)` to continue, or return a response to stop the
    /// pipeline.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |req: Request, next: Next| f(req, next).boxed()),
        }
    }

    /// Synchronous pass-through stage that may edit the request.
    pub fn inspect<F>(f: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        Self::from_fn(move |mut req, next: Next| {
            f(&mut req);
            next.run(req)
        })
    }

    fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Response> {
        (self.handler)(req, next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Remaining stages of the pipeline for the current request.
pub struct Next {
    stages: Arc<[Middleware]>,
    index: usize,
    terminal: Terminal,
}

impl Next {
    pub(crate) fn new(stages: Arc<[Middleware]>, terminal: Terminal) -> Self {
        Self {
            stages,
            index: 0,
            terminal,
        }
    }

    /// Run the next stage, or the terminal stage when none is left.
    pub async fn run(mut self, req: Request) -> Response {
        let stage = self.stages.get(self.index).cloned();
        match stage {
            Some(stage) => {
                self.index += 1;
                stage.call(req, self).await
            }
            None => (self.terminal)(req).await,
        }
    }

    /// Stages left before the terminal one.
    pub fn remaining(&self) -> usize {
        self.stages.len() - self.index
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("stages", &self.stages.len())
            .finish()
    }
}
