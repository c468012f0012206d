use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::chain::is_supported;
use crate::models::upstream::TokenPricesResponse;
use crate::providers::traits::RequestParams;
use super::request_service::{RequestOptions, RequestService};

pub fn prices_endpoint(chain_id: u64) -> String {
    format!("swap/v6.0/{chain_id}/tokens/prices")
}

/// Spot token prices from the swap API, read through the shared request cache.
pub struct PriceService {
    requests: Arc<RequestService>,
}

impl PriceService {
    pub fn new(requests: Arc<RequestService>) -> Self {
        Self { requests }
    }

    /// USD prices for `addresses` on one chain, keyed by lowercased address.
    ///
    /// Unsupported chains and empty address lists return an empty map
    /// without calling upstream.
    pub async fn fetch_token_prices(
        &self,
        chain_id: u64,
        addresses: &[&str],
    ) -> Result<HashMap<String, f64>, CoreError> {
        if !is_supported(chain_id) || addresses.is_empty() {
            debug!(chain_id, "nothing to price");
            return Ok(HashMap::new());
        }

        let mut params = RequestParams::new();
        params.insert("addresses".into(), addresses.join(","));

        let payload = self
            .requests
            .make_request(&prices_endpoint(chain_id), &params, RequestOptions::default())
            .await?;
        let prices = TokenPricesResponse::parse(payload)?.into_prices();
        debug!(chain_id, requested = addresses.len(), priced = prices.len(), "token prices fetched");
        Ok(prices)
    }

    /// USD price of a single token; `None` when upstream has no price for it.
    pub async fn fetch_token_price(
        &self,
        chain_id: u64,
        token_address: &str,
    ) -> Result<Option<f64>, CoreError> {
        let prices = self.fetch_token_prices(chain_id, &[token_address]).await?;
        Ok(prices.get(&token_address.to_lowercase()).copied())
    }
}
