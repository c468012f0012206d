use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::upstream::{lenient_i64, NumberOrString};

/// A raw transaction from the history endpoint.
///
/// Only the fields the summarizer reads are typed; everything else is kept
/// verbatim in `extra` so recent-transaction listings lose nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<NumberOrString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<NumberOrString>,

    /// Unix timestamp in seconds (number or numeric string upstream)
    #[serde(
        default,
        rename = "timeStamp",
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_stamp: Option<i64>,

    /// Unix timestamp in milliseconds
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionRecord {
    /// Convenience constructor for a typed record without extra fields.
    pub fn new(tx_type: impl Into<String>, value: impl Into<String>, time_stamp: i64) -> Self {
        Self {
            tx_type: Some(tx_type.into()),
            value: Some(NumberOrString::Text(value.into())),
            time_stamp: Some(time_stamp),
            ..Self::default()
        }
    }
}

/// Activity bucket a transaction is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Swap,
    Transfer,
    Approval,
    Other,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Swap => write!(f, "swap"),
            TransactionKind::Transfer => write!(f, "transfer"),
            TransactionKind::Approval => write!(f, "approval"),
            TransactionKind::Other => write!(f, "other"),
        }
    }
}

/// Counts per activity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBreakdown {
    pub swaps: usize,
    pub transfers: usize,
    pub approvals: usize,
    pub other: usize,
}

impl ActivityBreakdown {
    pub fn record(&mut self, kind: TransactionKind) {
        match kind {
            TransactionKind::Swap => self.swaps += 1,
            TransactionKind::Transfer => self.transfers += 1,
            TransactionKind::Approval => self.approvals += 1,
            TransactionKind::Other => self.other += 1,
        }
    }
}

/// Activity on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub count: usize,
    pub volume: f64,
}

/// Summary of a wallet's (or token's) transaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAnalytics {
    /// First 10 entries of the input, in input order
    pub recent_transactions: Vec<TransactionRecord>,
    pub total_transactions: usize,
    pub total_volume: f64,
    pub activity_breakdown: ActivityBreakdown,
    /// One point per day with activity, ascending by date
    pub timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDay {
    pub date: NaiveDate,
    pub count: usize,
}

/// Aggregate statistics over a transaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_count: usize,
    pub total_volume: f64,
    pub average_volume: f64,
    pub date_range: Option<DateRange>,
    pub most_active_day: Option<ActiveDay>,
}

/// Look-back windows for [`transactions_for_period`](crate::services::transaction_service::TransactionAnalyticsService::transactions_for_period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPeriod {
    Day,
    Week,
    Month,
    Quarter,
}

impl TransactionPeriod {
    pub fn days(&self) -> i64 {
        match self {
            TransactionPeriod::Day => 1,
            TransactionPeriod::Week => 7,
            TransactionPeriod::Month => 30,
            TransactionPeriod::Quarter => 90,
        }
    }
}

/// Parameters for the transaction history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub wallet_address: String,
    pub chain_id: u64,
    pub token_address: Option<String>,
    pub limit: u32,
}

impl TransactionQuery {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn new(wallet_address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            chain_id,
            token_address: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_token(mut self, token_address: impl Into<String>) -> Self {
        self.token_address = Some(token_address.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}
