//! Display formatting for metric values
//!
//! Zero renders as a placeholder dash for every unit, since zero doubles as
//! "no value entered".

use crate::catalog::MetricUnit;
use crate::derived::{fixed1, RUNWAY_SENTINEL};

/// Placeholder for an unset (zero) value
pub const PLACEHOLDER: &str = "—";

/// Format a metric value for display
pub fn format_metric_value(value: f64, unit: MetricUnit) -> String {
    if value == 0.0 {
        return PLACEHOLDER.to_string();
    }
    match unit {
        MetricUnit::Currency => format!("${}", group_thousands(value)),
        MetricUnit::Percent => format!("{}%", fixed1(value)),
        MetricUnit::Ratio => format!("{}x", fixed1(value)),
        MetricUnit::Months => {
            if value >= RUNWAY_SENTINEL {
                "N/A".to_string()
            } else {
                format!("{} meses", fixed1(value))
            }
        }
        MetricUnit::Days => format!("{} días", fixed1(value)),
        MetricUnit::Score => format!("{}/100", round_half_up(value)),
        MetricUnit::Number => group_thousands(value),
    }
}

/// Nearest integer, halves rounded toward positive infinity
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Integer with `,` separators every three digits
fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
