//! Response schemas of the upstream aggregation API.
//!
//! Payloads come back from the request cache as raw `serde_json::Value` and
//! are validated here, at the boundary, before any business logic sees them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::CoreError;

const PROVIDER: &str = "Portfolio API";

/// A JSON field that upstream sends either as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    /// Text form, as JavaScript's `String(x)` would render it for parsing.
    pub fn as_text(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.clone(),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Whole-number variant of [`lenient_f64`]; fractional parts are truncated.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrString::Number(n)) if n.is_finite() => Some(n as i64),
        Some(NumberOrString::Text(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n as i64))
        }
        _ => None,
    })
}

// ── Holdings ────────────────────────────────────────────────────────

/// One ERC-20 position as reported by the portfolio details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_to_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub abs_profit_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roi: Option<f64>,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Either an upstream error object or a list of holdings.
///
/// A missing or `null` `result` is an empty chain, not a failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HoldingsResponse {
    Failure {
        error: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default, rename = "statusCode")]
        status_code: Option<u16>,
    },
    Holdings {
        #[serde(default)]
        result: Option<Vec<HoldingRecord>>,
    },
}

impl HoldingsResponse {
    pub fn parse(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| {
            CoreError::Deserialization(format!("Unexpected holdings payload: {e}"))
        })
    }

    /// Unwrap the holdings, turning an upstream error object into `CoreError::Api`.
    pub fn into_records(self) -> Result<Vec<HoldingRecord>, CoreError> {
        match self {
            HoldingsResponse::Holdings { result } => Ok(result.unwrap_or_default()),
            HoldingsResponse::Failure {
                error,
                description,
                status_code,
            } => {
                let mut message = error;
                if let Some(desc) = description {
                    message.push_str(&format!(": {desc}"));
                }
                if let Some(code) = status_code {
                    message.push_str(&format!(" (status {code})"));
                }
                Err(CoreError::api(PROVIDER, message))
            }
        }
    }
}

// ── Token list ──────────────────────────────────────────────────────

/// Token metadata entry from a chain's token list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
}

/// Token list keyed by contract address.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenListResponse {
    #[serde(default)]
    pub tokens: HashMap<String, TokenMetadata>,
}

impl TokenListResponse {
    pub fn parse(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| {
            CoreError::Deserialization(format!("Unexpected token list payload: {e}"))
        })
    }
}

// ── Transaction history ─────────────────────────────────────────────

/// The history endpoint wraps its list either as `result` or as `items`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransactionListResponse {
    Result { result: Vec<Value> },
    Items { items: Vec<Value> },
}

impl TransactionListResponse {
    pub fn parse(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| {
            CoreError::Deserialization(format!("Unexpected transaction list payload: {e}"))
        })
    }

    pub fn into_entries(self) -> Vec<Value> {
        match self {
            TransactionListResponse::Result { result } => result,
            TransactionListResponse::Items { items } => items,
        }
    }
}

// ── Spot prices ─────────────────────────────────────────────────────

/// Spot prices in USD keyed by token address.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TokenPricesResponse {
    pub prices: HashMap<String, NumberOrString>,
}

impl TokenPricesResponse {
    pub fn parse(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| {
            CoreError::Deserialization(format!("Unexpected token prices payload: {e}"))
        })
    }

    /// Prices keyed by lowercased address; unparseable entries are left out.
    pub fn into_prices(self) -> HashMap<String, f64> {
        self.prices
            .into_iter()
            .filter_map(|(address, raw)| {
                let price = raw.as_text().trim().parse::<f64>().ok()?;
                price.is_finite().then(|| (address.to_lowercase(), price))
            })
            .collect()
    }
}
