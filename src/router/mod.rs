//! Request routing by method and exact path.
//!
//! The proxy exposes a handful of fixed endpoints, so routes are literal
//! paths. A trailing slash is ignored on both the pattern and the request
//! path. When a path is registered but not for the request's method the
//! router answers `405 Method Not Allowed` with an `Allow` header; an unknown
//! path gets `404 Not Found`.

use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::http::{Method, Response, StatusCode};

/// Type-erased async route handler.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Implemented for every `Fn(Context) -> impl Future<Output = Response> + Send`
/// that is `Send + Sync + 'static`.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

/// Dispatches requests to the first route registered for their method and path.
///
/// # Examples
///
/// ```rust,no_run
/// use itemproxy::router::Router;
/// use itemproxy::http::{Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/", |_ctx| async { Response::new(StatusCode::Ok) });
/// router.post("/get-item", |_ctx| async { Response::new(StatusCode::Ok) });
/// assert_eq!(router.len(), 2);
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `GET` handler. `HEAD` requests for the same path are
    /// answered by it too, with the body stripped.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, handler);
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method,
            path: normalize(path).to_owned(),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches `ctx` to the matching route.
    pub async fn route(&self, ctx: Context) -> Response {
        let path = normalize(ctx.request().path()).to_owned();
        let method = ctx.request().method().clone();
        let lookup = if method == Method::Head {
            &Method::Get
        } else {
            &method
        };

        if let Some(route) = self
            .routes
            .iter()
            .find(|r| &r.method == lookup && r.path == path)
        {
            let response = (route.handler)(ctx).await;
            return if method == Method::Head {
                response.head_only()
            } else {
                response
            };
        }

        let allowed: Vec<&str> = self
            .routes
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.method.as_str())
            .collect();

        if allowed.is_empty() {
            Response::new(StatusCode::NotFound).body("Not Found")
        } else {
            Response::new(StatusCode::MethodNotAllowed)
                .header("Allow", allowed.join(", "))
                .body("Method Not Allowed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;

    fn make_ctx(method: &str, path: &str) -> Context {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    fn sample_router() -> Router {
        let mut router = Router::new();
        router.get("/", |_ctx| async { Response::new(StatusCode::Ok).body("up") });
        router.post("/get-item", |_ctx| async {
            Response::new(StatusCode::Ok).body("item")
        });
        router
    }

    #[test]
    fn starts_empty() {
        assert!(Router::new().is_empty());
        assert_eq!(sample_router().len(), 2);
    }

    #[tokio::test]
    async fn exact_match_dispatches() {
        let router = sample_router();
        let res = router.route(make_ctx("POST", "/get-item")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.body_bytes(), b"item");
    }

    #[tokio::test]
    async fn trailing_slash_is_ignored() {
        let router = sample_router();
        let res = router.route(make_ctx("POST", "/get-item/")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = sample_router();
        let res = router.route(make_ctx("GET", "/items")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let router = sample_router();
        let res = router.route(make_ctx("GET", "/get-item")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("POST"));
    }

    #[tokio::test]
    async fn head_uses_get_route_without_body() {
        let router = sample_router();
        let get = router.route(make_ctx("GET", "/")).await.into_bytes();
        let head = router.route(make_ctx("HEAD", "/")).await;
        assert_eq!(head.status(), StatusCode::Ok);

        let head = String::from_utf8(head.into_bytes().to_vec()).unwrap();
        let get = String::from_utf8(get.to_vec()).unwrap();
        let (get_head, get_body) = get.split_once("\r\n\r\n").unwrap();
        assert!(!get_body.is_empty());
        assert_eq!(head, format!("{get_head}\r\n\r\n"));
    }

    #[tokio::test]
    async fn first_registration_wins() {
        let mut router = Router::new();
        router.get("/", |_ctx| async { Response::new(StatusCode::Ok) });
        router.get("/", |_ctx| async { Response::new(StatusCode::NoContent) });
        let res = router.route(make_ctx("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }
}
