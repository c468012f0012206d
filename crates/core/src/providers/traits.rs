use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::CoreError;

/// Query parameters of an upstream request.
///
/// A `BTreeMap` keeps keys ordered, so the JSON rendering used in cache keys is stable.
pub type RequestParams = BTreeMap<String, String>;

/// Transport to the upstream aggregation API.
///
/// The production implementation goes through the same-origin proxy that
/// injects the API credential; tests substitute in-memory fakes. Swapping the
/// transport leaves caching, parsing and aggregation untouched.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Human-readable name of this transport (for logs/errors).
    fn name(&self) -> &str;

    /// Issue a GET for `endpoint` with `params` as the query string and
    /// return the parsed JSON body. Non-2xx statuses map to `CoreError::Http`.
    async fn get(&self, endpoint: &str, params: &RequestParams) -> Result<Value, CoreError>;
}

/// External token-metadata service used to resolve token icons.
#[async_trait]
pub trait LogoProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Logo of the token at `address` on the given provider platform.
    /// `Ok(None)` means the provider answered but had no image.
    async fn logo_by_contract(
        &self,
        platform: &str,
        address: &str,
    ) -> Result<Option<String>, CoreError>;

    /// Logo of the first search hit whose symbol matches case-insensitively.
    async fn search_logo(&self, symbol: &str) -> Result<Option<String>, CoreError>;
}
