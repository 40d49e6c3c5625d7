//! The `/get-item` handler: validate, read through the cache, fall back to
//! the inventory API, normalize, store, respond.
//!
//! Every outcome, failures included, is a well-formed [`LookupResponse`];
//! nothing raised below this layer reaches the caller as a raw error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::ItemCache;
use crate::context::Context;
use crate::http::{Response, StatusCode};
use crate::item::{ItemRecord, LookupKey};
use crate::upstream::Inventory;

/// Request body of `POST /get-item`. Both fields are required; they are
/// optional here so that a missing field is a validation failure rather than
/// a JSON error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl LookupRequest {
    pub fn new(company: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
            barcode: Some(barcode.into()),
        }
    }

    /// Turns the request into a cache key.
    pub fn validate(self) -> Result<LookupKey, ValidationError> {
        LookupKey::new(
            self.company.unwrap_or_default(),
            self.barcode.unwrap_or_default(),
        )
        .ok_or(ValidationError::MissingField)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing company or barcode")]
    MissingField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupStatus {
    Ok,
    NotFound,
    Error,
}

/// Where an `OK` record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Api,
}

/// JSON body of every `/get-item` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResponse {
    pub status: LookupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    pub data: ItemRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LookupResponse {
    fn found(source: Source, data: ItemRecord) -> Self {
        Self {
            status: LookupStatus::Ok,
            source: Some(source),
            data,
            message: None,
        }
    }

    fn not_found() -> Self {
        Self {
            status: LookupStatus::NotFound,
            source: None,
            data: ItemRecord::default(),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: LookupStatus::Error,
            source: None,
            data: ItemRecord::default(),
            message: Some(message.into()),
        }
    }
}

/// A response body paired with the HTTP status to send it with.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupReply {
    pub http_status: StatusCode,
    pub body: LookupResponse,
}

impl LookupReply {
    fn ok(body: LookupResponse) -> Self {
        Self {
            http_status: StatusCode::Ok,
            body,
        }
    }

    fn invalid(err: ValidationError) -> Self {
        Self {
            http_status: StatusCode::BadRequest,
            body: LookupResponse::error(err.to_string()),
        }
    }

    fn upstream_failed() -> Self {
        Self {
            http_status: StatusCode::InternalServerError,
            body: LookupResponse::error("Cannot get item"),
        }
    }

    pub fn into_response(self) -> Response {
        Response::new(self.http_status).json(&self.body)
    }
}

/// Shared per-process lookup state: the cache and the inventory backend.
pub struct LookupService {
    cache: Arc<ItemCache>,
    inventory: Arc<dyn Inventory>,
}

impl LookupService {
    pub fn new(cache: Arc<ItemCache>, inventory: Arc<dyn Inventory>) -> Self {
        Self { cache, inventory }
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    /// HTTP entry point: decodes the JSON body and runs [`lookup`](Self::lookup).
    pub async fn handle(&self, ctx: Context) -> Response {
        let reply = match ctx.json::<LookupRequest>() {
            Ok(request) => self.lookup(request).await,
            Err(e) => {
                warn!(error = %e, "unreadable lookup body");
                LookupReply::invalid(ValidationError::MissingField)
            }
        };
        reply.into_response()
    }

    pub async fn lookup(&self, request: LookupRequest) -> LookupReply {
        let key = match request.validate() {
            Ok(key) => key,
            Err(e) => return LookupReply::invalid(e),
        };

        if let Some(record) = self.cache.get(&key) {
            debug!(%key, "cache hit");
            return LookupReply::ok(LookupResponse::found(Source::Cache, record));
        }

        debug!(%key, "cache miss");
        let result = match self.inventory.lookup(key.company(), key.barcode()).await {
            Ok(result) => result,
            Err(e) => {
                error!(%key, error = %e, "inventory lookup failed");
                return LookupReply::upstream_failed();
            }
        };

        let Some(item) = result.first() else {
            info!(%key, "item not found upstream");
            return LookupReply::ok(LookupResponse::not_found());
        };

        let record = ItemRecord::from_upstream(item);
        self.cache.set(key, record.clone(), self.cache.default_ttl());
        LookupReply::ok(LookupResponse::found(Source::Api, record))
    }
}
