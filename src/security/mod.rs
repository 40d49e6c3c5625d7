//! Cross-origin access for browser clients (scanner web apps call the proxy
//! directly from another origin).

use std::pin::Pin;

use crate::{
    context::Context,
    http::{Method, Response, StatusCode},
    middleware::{Middleware, Next},
};

/// CORS middleware: answers preflight requests and adds `Access-Control-*`
/// headers to actual responses.
///
/// - No `Origin` header, or an origin outside the allow-list: the request
///   passes through untouched.
/// - `OPTIONS` with an allowed origin: short-circuits with `204 No Content`;
///   the router is never reached.
/// - Any other request with an allowed origin: the response is decorated.
///   `Vary: Origin` is added when a specific origin is echoed back.
///
/// # Examples
///
/// ```rust
/// use itemproxy::security::CorsMiddleware;
///
/// let any_origin = CorsMiddleware::permissive();
/// let one_origin = CorsMiddleware::new().allow_origin("https://pos.example.com");
/// ```
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsMiddleware {
    /// No origins allowed yet; methods `GET, POST, OPTIONS`, header `Content-Type`.
    pub fn new() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allowed_headers: vec!["Content-Type".into()],
        }
    }

    /// Every origin allowed, answered with `Access-Control-Allow-Origin: *`.
    pub fn permissive() -> Self {
        Self::new().allow_origin("*")
    }

    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    fn resolve_origin(&self, origin: &str) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            Some("*".to_owned())
        } else if self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let allow_origin = ctx
            .request()
            .headers()
            .get("origin")
            .and_then(|origin| self.resolve_origin(origin));
        let Some(allow_origin) = allow_origin else {
            return Box::pin(next.run(ctx));
        };

        let is_preflight = ctx.request().method() == &Method::Options;
        let methods = self.allowed_methods.join(", ");
        let headers = self.allowed_headers.join(", ");
        let vary = allow_origin != "*";

        Box::pin(async move {
            let mut resp = if is_preflight {
                Response::new(StatusCode::NoContent).header("Access-Control-Max-Age", "3600")
            } else {
                next.run(ctx).await
            };

            resp.add_header("Access-Control-Allow-Origin", allow_origin);
            resp.add_header("Access-Control-Allow-Methods", methods);
            resp.add_header("Access-Control-Allow-Headers", headers);
            if vary {
                resp.add_header("Vary", "Origin");
            }
            resp
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::middleware::Pipeline;
    use crate::router::Router;

    fn pipeline(cors: CorsMiddleware) -> Pipeline {
        let mut router = Router::new();
        router.post("/get-item", |_ctx| async { Response::new(StatusCode::Ok) });
        Pipeline::new(router).with(cors)
    }

    fn request(method: &str, origin: Option<&str>) -> Request {
        let origin = origin
            .map(|o| format!("Origin: {o}\r\n"))
            .unwrap_or_default();
        let raw = format!("{method} /get-item HTTP/1.1\r\n{origin}\r\n");
        Request::parse(raw.as_bytes()).unwrap().0
    }

    #[tokio::test]
    async fn preflight_short_circuits() {
        let res = pipeline(CorsMiddleware::permissive())
            .handle(request("OPTIONS", Some("https://pos.example.com")))
            .await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some("GET, POST, OPTIONS")
        );
        assert!(res.headers().get("vary").is_none());
    }

    #[tokio::test]
    async fn actual_request_is_decorated() {
        let res = pipeline(CorsMiddleware::permissive())
            .handle(request("POST", Some("https://pos.example.com")))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn no_origin_passes_through() {
        let res = pipeline(CorsMiddleware::permissive())
            .handle(request("POST", None))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn specific_origin_is_echoed_with_vary() {
        let cors = CorsMiddleware::new().allow_origin("https://pos.example.com");
        let res = pipeline(cors)
            .handle(request("POST", Some("https://pos.example.com")))
            .await;
        assert_eq!(
            res.headers().get("access-control-allow-origin"),
            Some("https://pos.example.com")
        );
        assert_eq!(res.headers().get("vary"), Some("Origin"));
    }

    #[tokio::test]
    async fn unlisted_origin_is_ignored() {
        let cors = CorsMiddleware::new().allow_origin("https://pos.example.com");
        let res = pipeline(cors)
            .handle(request("OPTIONS", Some("https://evil.example.com")))
            .await;
        // Falls through to the router, which has no OPTIONS route.
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }
}
