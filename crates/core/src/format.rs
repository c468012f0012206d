//! Display helpers for balances, USD amounts and percentages.
//!
//! Output matches what the web UI shows (en-US digit grouping, `$` prefix),
//! so strings can be handed to a presentation layer unchanged.

/// Human-readable token balance, chosen by magnitude:
///
/// | balance            | output                       |
/// |--------------------|------------------------------|
/// | 0                  | `"0"`                        |
/// | \|b\| < 0.0001     | exponential, `"5.00e-5"`     |
/// | \|b\| < 1          | 6 decimals, `"0.500000"`     |
/// | \|b\| < 1000       | 4 decimals, `"12.3457"`      |
/// | otherwise          | grouped, ≤ 2 decimals, `"1,234.5"` |
///
/// `decimals` is the token's contract precision. The balance is already
/// expressed in whole tokens, so it does not change the output.
pub fn format_token_balance(balance: f64, _decimals: u8) -> String {
    let magnitude = balance.abs();
    if balance == 0.0 {
        "0".to_string()
    } else if magnitude < 0.0001 {
        format!("{balance:.2e}")
    } else if magnitude < 1.0 {
        format!("{balance:.6}")
    } else if magnitude < 1000.0 {
        format!("{balance:.4}")
    } else {
        group_thousands(balance, 2)
    }
}

/// Compact USD amount: `$0.00`, `<$0.01`, `$12.34`, `$1.5K`, `$2.3M`, `$1.0B`.
pub fn format_usd_value(value: f64) -> String {
    if value == 0.0 {
        "$0.00".to_string()
    } else if value < 0.01 {
        "<$0.01".to_string()
    } else if value < 1_000.0 {
        format!("${value:.2}")
    } else if value < 1_000_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else if value < 1_000_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else {
        format!("${:.1}B", value / 1_000_000_000.0)
    }
}

/// `value` with a fixed number of decimals and a `%` suffix; zero is `"0%"`.
pub fn format_percentage(value: f64, decimals: usize) -> String {
    if value == 0.0 {
        return "0%".to_string();
    }
    format!("{value:.decimals$}%")
}

/// en-US grouping (`1,234,567.89`) with at most `max_fraction` fraction digits,
/// trailing zeros dropped.
fn group_thousands(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.max_fraction$}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits = int_part.len();
    let mut out = String::with_capacity(fixed.len() + digits / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}
