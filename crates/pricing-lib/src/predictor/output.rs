//! Prediction output and price formatting

use super::schema::ReconcileMode;
use serde::{Deserialize, Serialize};

/// Currency symbol prefixed to formatted prices
pub const CURRENCY_SYMBOL: &str = "€";

/// Outcome of one successful inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted price
    pub value: f64,
    /// Column ordering used to build the model input
    pub mode: ReconcileMode,
    /// Fingerprint of the artifact that produced the value
    pub artifact_version: String,
    pub generated_at: i64,
}

impl PredictionResult {
    pub fn new(value: f64, mode: ReconcileMode, artifact_version: impl Into<String>) -> Self {
        Self {
            value,
            mode,
            artifact_version: artifact_version.into(),
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Display form, e.g. `€1,234,567.89`
    pub fn formatted(&self) -> String {
        format_price(self.value)
    }
}

/// Format an amount with a currency symbol, thousands separators and two decimals
pub fn format_price(amount: f64) -> String {
    let rounded = format!("{:.2}", amount.abs());
    let (whole, cents) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    // Negative amounts that round to zero still carry the sign
    let sign = if amount.is_sign_negative() { "-" } else { "" };
    format!("{}{}{}.{}", CURRENCY_SYMBOL, sign, group_thousands(whole), cents)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
