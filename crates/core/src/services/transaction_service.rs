use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::CoreError;
use crate::models::transaction::{
    ActiveDay, ActivityBreakdown, DateRange, TimelinePoint, TransactionAnalytics,
    TransactionKind, TransactionPeriod, TransactionQuery, TransactionRecord, TransactionStats,
};
use crate::models::upstream::{NumberOrString, TransactionListResponse};
use crate::providers::traits::RequestParams;
use super::request_service::{RequestOptions, RequestService};

/// How many transactions `recent_transactions` keeps.
pub const RECENT_LIMIT: usize = 10;

pub fn history_endpoint(wallet_address: &str) -> String {
    format!("history/v2.0/history/{wallet_address}/events")
}

/// Numeric prefix of `raw`, the way JavaScript's `parseFloat` reads it.
///
/// Leading whitespace is skipped and parsing stops at the first character
/// that cannot continue a number: `"12.5abc"` is 12.5, `"abc"` is `None`.
pub fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return s[..end + "Infinity".len()].parse().ok();
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].trim_end_matches('.').parse().ok()
}

/// Activity bucket of a transaction: the first non-empty of `type` and
/// `method`, matched case-insensitively on `swap`, `transfer`, `approve`.
pub fn classify(tx: &TransactionRecord) -> TransactionKind {
    let label = [tx.tx_type.as_deref(), tx.method.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or("other")
        .to_lowercase();

    if label.contains("swap") {
        TransactionKind::Swap
    } else if label.contains("transfer") {
        TransactionKind::Transfer
    } else if label.contains("approve") {
        TransactionKind::Approval
    } else {
        TransactionKind::Other
    }
}

/// Traded amount of a transaction: `value`, else `amount`, else 0.
pub fn transaction_volume(tx: &TransactionRecord) -> f64 {
    let present = |field: &Option<NumberOrString>| match field {
        Some(NumberOrString::Number(n)) => *n != 0.0 && !n.is_nan(),
        Some(NumberOrString::Text(s)) => !s.is_empty(),
        None => false,
    };

    let raw = if present(&tx.value) {
        tx.value.as_ref()
    } else if present(&tx.amount) {
        tx.amount.as_ref()
    } else {
        None
    };

    raw.and_then(|v| parse_float(&v.as_text()))
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Summaries over a wallet's transaction history.
///
/// Transactions without a usable timestamp are dated "now" by the injected
/// clock, so they land on today's timeline point.
pub struct TransactionAnalyticsService {
    clock: Arc<dyn Clock>,
}

impl TransactionAnalyticsService {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn process_transaction_analytics(
        &self,
        transactions: &[TransactionRecord],
    ) -> TransactionAnalytics {
        let mut activity_breakdown = ActivityBreakdown::default();
        for tx in transactions {
            activity_breakdown.record(classify(tx));
        }

        TransactionAnalytics {
            recent_transactions: transactions.iter().take(RECENT_LIMIT).cloned().collect(),
            total_transactions: transactions.len(),
            total_volume: total_volume(transactions),
            activity_breakdown,
            timeline_data: self.timeline(transactions),
        }
    }

    /// When the transaction happened: `timeStamp` (seconds), else
    /// `timestamp` (milliseconds), else now.
    pub fn occurred_at(&self, tx: &TransactionRecord) -> DateTime<Utc> {
        let millis = tx
            .time_stamp
            .filter(|s| *s != 0)
            .and_then(|s| s.checked_mul(1000))
            .or(tx.timestamp.filter(|ms| *ms != 0));

        millis
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(|| self.clock.now())
    }

    /// Count and volume per UTC calendar day, oldest first.
    pub fn timeline(&self, transactions: &[TransactionRecord]) -> Vec<TimelinePoint> {
        let mut days: BTreeMap<_, TimelinePoint> = BTreeMap::new();
        for tx in transactions {
            let date = self.occurred_at(tx).date_naive();
            let point = days.entry(date).or_insert_with(|| TimelinePoint {
                date,
                count: 0,
                volume: 0.0,
            });
            point.count += 1;
            point.volume += transaction_volume(tx);
        }
        days.into_values().collect()
    }

    pub fn transaction_stats(&self, transactions: &[TransactionRecord]) -> TransactionStats {
        if transactions.is_empty() {
            return TransactionStats {
                total_count: 0,
                total_volume: 0.0,
                average_volume: 0.0,
                date_range: None,
                most_active_day: None,
            };
        }

        let total_volume = total_volume(transactions);
        let timeline = self.timeline(transactions);

        let date_range = match (timeline.first(), timeline.last()) {
            (Some(first), Some(last)) => Some(DateRange {
                start: first.date,
                end: last.date,
            }),
            _ => None,
        };

        // Earliest day wins ties
        let mut most_active_day: Option<&TimelinePoint> = None;
        for point in &timeline {
            if point.count > most_active_day.map_or(0, |d| d.count) {
                most_active_day = Some(point);
            }
        }

        TransactionStats {
            total_count: transactions.len(),
            total_volume,
            average_volume: total_volume / transactions.len() as f64,
            date_range,
            most_active_day: most_active_day.map(|d| ActiveDay {
                date: d.date,
                count: d.count,
            }),
        }
    }

    pub fn filter_by_kind(
        &self,
        transactions: &[TransactionRecord],
        kind: TransactionKind,
    ) -> Vec<TransactionRecord> {
        transactions
            .iter()
            .filter(|tx| classify(tx) == kind)
            .cloned()
            .collect()
    }

    /// Transactions that happened within `start..=end`.
    pub fn filter_by_date_range(
        &self,
        transactions: &[TransactionRecord],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<TransactionRecord> {
        transactions
            .iter()
            .filter(|tx| {
                let at = self.occurred_at(tx);
                at >= start && at <= end
            })
            .cloned()
            .collect()
    }

    /// Transactions from the last day, week, month or quarter.
    pub fn transactions_for_period(
        &self,
        transactions: &[TransactionRecord],
        period: TransactionPeriod,
    ) -> Vec<TransactionRecord> {
        let now = self.clock.now();
        let start = now - TimeDelta::days(period.days());
        self.filter_by_date_range(transactions, start, now)
    }

    /// Read the history endpoint for a wallet (optionally one token) on one chain.
    ///
    /// Entries that are not transaction objects are skipped.
    pub async fn fetch_transactions(
        &self,
        requests: &RequestService,
        query: &TransactionQuery,
    ) -> Result<Vec<TransactionRecord>, CoreError> {
        let mut params = RequestParams::new();
        params.insert("chainId".into(), query.chain_id.to_string());
        params.insert("limit".into(), query.limit.to_string());
        if let Some(token) = &query.token_address {
            params.insert("tokenAddress".into(), token.clone());
        }

        let payload = requests
            .make_request(
                &history_endpoint(&query.wallet_address),
                &params,
                RequestOptions::default(),
            )
            .await?;

        let entries = TransactionListResponse::parse(payload)?.into_entries();
        let total = entries.len();
        let records: Vec<TransactionRecord> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed transaction entry");
                    None
                }
            })
            .collect();
        debug!(total, parsed = records.len(), chain_id = query.chain_id, "transactions fetched");
        Ok(records)
    }
}

impl Default for TransactionAnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

fn total_volume(transactions: &[TransactionRecord]) -> f64 {
    transactions.iter().map(transaction_volume).sum()
}
