//! Per-request context handed to middleware and route handlers.

use serde::de::DeserializeOwned;

use crate::http::Request;

/// Wraps the parsed [`Request`] as it travels through the pipeline.
pub struct Context {
    request: Request,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Deserializes the request body as JSON.
    ///
    /// An empty body is parsed as `{}` so that types whose fields are all
    /// optional still decode.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let body = self.request.body();
        if body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_slice(b"{}");
        }
        serde_json::from_slice(body)
    }
}
