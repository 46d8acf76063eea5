/// Heuristic interpretation of account and vesting responses
///
/// The server publishes no schema, so eligibility and allocation amounts
/// are read from generic field maps by shape: text length, numeric
/// magnitude and number patterns. These rules are heuristics and can be
/// tuned through the configuration. When nothing matches the result is
/// "no data", never an error.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::core::parser::ParsedMessage;

/// Decimals of the LAYER token
pub const LAYER_DECIMALS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VestingData {
    pub total_allocation: String,
    pub vested_amount: String,
}

impl VestingData {
    fn same(amount: impl Into<String>) -> Self {
        let amount = amount.into();
        Self {
            total_allocation: amount.clone(),
            vested_amount: amount,
        }
    }
}

/// Eligible when field 1 is present and its text form is longer than
/// `min_length` characters
pub fn is_eligible(account: &ParsedMessage, min_length: usize) -> bool {
    account
        .get(1)
        .map(|value| value.display_text().chars().count() > min_length)
        .unwrap_or(false)
}

/// Pull allocation amounts out of `field` of a GetVestingClaimInfo response.
///
/// A nested-message view is searched for integers above `min_value`
/// (largest is the total, smallest the vested amount). Otherwise the
/// field text is scanned for a decimal number, then for long integer runs.
pub fn extract_vesting(response: &ParsedMessage, field: u32, min_value: u64) -> Option<VestingData> {
    let value = response.get(field)?;
    let nested = response.nested(field).or_else(|| value.as_nested());

    let data = match nested {
        Some(map) => from_nested(map, min_value),
        None => from_text(&value.display_text()),
    };
    debug!(field, ?data, "vesting data");
    data
}

fn from_nested(map: &ParsedMessage, min_value: u64) -> Option<VestingData> {
    let candidates: Vec<u64> = map
        .iter()
        .filter_map(|(_, value)| value.as_u64())
        .filter(|&n| n > min_value)
        .collect();

    let total = candidates.iter().max()?;
    let vested = candidates.iter().min()?;
    Some(VestingData {
        total_allocation: total.to_string(),
        vested_amount: vested.to_string(),
    })
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+").expect("valid decimal pattern"))
}

fn long_integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{9,}").expect("valid integer pattern"))
}

fn from_text(text: &str) -> Option<VestingData> {
    // the server repeats the same amount, so the first decimal wins
    if let Some(found) = decimal_pattern().find(text) {
        return Some(VestingData::same(found.as_str()));
    }

    let mut runs = long_integer_pattern().find_iter(text).map(|m| m.as_str());
    let total = runs.next()?;
    let vested = runs.next().unwrap_or(total);
    Some(VestingData {
        total_allocation: total.to_string(),
        vested_amount: vested.to_string(),
    })
}

/// Render a raw base-unit amount as LAYER with three decimals
pub fn format_layer_amount(raw: &str) -> String {
    format_token_amount(raw, LAYER_DECIMALS)
}

pub fn format_token_amount(raw: &str, decimals: u32) -> String {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => {
            format!("{:.3}", amount / 10f64.powi(decimals as i32))
        }
        _ => format!("{} (raw)", raw),
    }
}

/// Whether a result carries a positive allocation worth summing
pub fn allocation_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}
