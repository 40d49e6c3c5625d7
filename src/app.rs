//! Route table and middleware stack of the proxy.

use std::future::Future;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::context::Context;
use crate::http::{Response, StatusCode};
use crate::lookup::LookupService;
use crate::middleware::{LoggerMiddleware, Pipeline};
use crate::router::Router;
use crate::security::CorsMiddleware;
use crate::server::{Server, ServerError};

#[derive(Debug, Serialize)]
struct Health {
    ok: bool,
    msg: &'static str,
    time: String,
}

/// `GET /`: liveness probe with the current UTC time.
pub async fn health(_ctx: Context) -> Response {
    Response::new(StatusCode::Ok).json(&Health {
        ok: true,
        msg: "API Server is running",
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `GET /` and `POST /get-item`.
pub fn router(service: Arc<LookupService>) -> Router {
    let mut router = Router::new();
    router.get("/", health);
    router.post("/get-item", move |ctx: Context| {
        let service = Arc::clone(&service);
        async move { service.handle(ctx).await }
    });
    router
}

/// Request logging outermost, then CORS, then the routes.
pub fn pipeline(service: Arc<LookupService>) -> Pipeline {
    Pipeline::new(router(service))
        .with(LoggerMiddleware)
        .with(CorsMiddleware::permissive())
}

/// Serves `pipeline` on `server` until `shutdown` resolves.
pub async fn serve<S>(server: Server, pipeline: Pipeline, shutdown: S) -> Result<(), ServerError>
where
    S: Future<Output = ()>,
{
    let pipeline = Arc::new(pipeline);
    server
        .run_until(move |request| pipeline.handle(request), shutdown)
        .await
}
