//! Display helpers for balances, amounts and addresses.

use chrono::{TimeZone, Utc};

use crate::models::LAMPORTS_PER_SOL;

/// Shorten an address to its first and last `chars` characters.
pub fn truncate_address(address: &str, chars: usize) -> String {
    if address.is_empty() {
        return String::new();
    }

    let head: String = address.chars().take(chars).collect();
    let total = address.chars().count();
    let tail: String = address.chars().skip(total.saturating_sub(chars)).collect();

    format!("{}...{}", head, tail)
}

/// Render lamports as SOL with a fixed number of decimals.
pub fn format_sol(lamports: u64, decimals: usize) -> String {
    let sol = lamports as f64 / LAMPORTS_PER_SOL as f64;
    format!("{:.*}", decimals, sol)
}

/// Convert a raw integer token amount to a UI amount.
///
/// Returns `None` if `raw_amount` is not an unsigned integer.
pub fn format_token_amount(raw_amount: &str, decimals: u8) -> Option<f64> {
    let raw: u128 = raw_amount.trim().parse().ok()?;
    Some(raw as f64 / 10f64.powi(decimals as i32))
}

/// US-style currency rendering, e.g. `$1,234.56` or `-$0.50`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, fraction)
}

/// Render a unix timestamp (seconds) as `Jan 5, 03:04 PM` in UTC.
pub fn format_date(unix_secs: i64) -> String {
    match Utc.timestamp_opt(unix_secs, 0).single() {
        Some(dt) => dt.format("%b %-d, %I:%M %p").to_string(),
        None => String::new(),
    }
}

pub fn calculate_percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}
