//! Middleware pipeline in front of the router.
//!
//! A [`Pipeline`] owns an ordered list of middleware and the [`Router`] at the
//! end of the chain. Each middleware receives the request [`Context`] and a
//! [`Next`] cursor; it may pass through, short-circuit, or decorate the
//! downstream response.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::info;

use crate::{
    context::Context,
    http::{Request, Response},
    router::Router,
};

/// Cursor into the remaining middleware chain for a single request.
///
/// Consumed by [`Next::run`], so a middleware can forward at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    index: usize,
    router: Arc<Router>,
}

/// Type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

impl Next {
    /// Invokes the next middleware, or the router once the chain is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = Arc::clone(&self.middlewares[self.index]);
            self.index += 1;
            handler(ctx, self).await
        } else {
            self.router.route(ctx).await
        }
    }
}

/// Request/response interception.
///
/// Implementations must be `Send + Sync` because one instance is shared by
/// every connection task, and must not hold locks across `.await` points.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs method, path, status and latency once per request.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str().to_owned();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            info!(
                %method,
                %path,
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request handled"
            );

            response
        })
    }
}

/// Middleware stack plus the router it feeds.
///
/// # Examples
///
/// ```rust,no_run
/// use itemproxy::middleware::{LoggerMiddleware, Pipeline};
/// use itemproxy::router::Router;
///
/// let pipeline = Pipeline::new(Router::new()).with(LoggerMiddleware);
/// ```
pub struct Pipeline {
    middlewares: Vec<MiddlewareHandler>,
    router: Arc<Router>,
}

impl Pipeline {
    pub fn new(router: Router) -> Self {
        Self {
            middlewares: Vec::new(),
            router: Arc::new(router),
        }
    }

    /// Appends a middleware. Earlier middleware wrap later ones.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    /// Runs `request` through the middleware chain and the router.
    pub fn handle(&self, request: Request) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let next = Next {
            middlewares: self.middlewares.iter().cloned().collect(),
            index: 0,
            router: Arc::clone(&self.router),
        };
        Box::pin(next.run(Context::new(request)))
    }
}
