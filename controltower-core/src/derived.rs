//! Derived financial metrics
//!
//! Burn rate, runway and fixed-cost ratio computed from itemized costs.
//!
//! Global invariants enforced:
//! - Division by zero is guarded by explicit branches
//! - Burn rate is never negative
//! - Runway with no burn is the 999 sentinel

use crate::project::{CostEntry, ProjectMetrics};
use serde::{Deserialize, Serialize};

/// Runway reported when nothing is being burned
pub const RUNWAY_SENTINEL: f64 = 999.0;

/// Metric keys written back by the edit flow
pub const DERIVED_KEYS: [&str; 3] = ["burnRate", "runway", "fixedCostRatio"];

/// Summed cost lists
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub fixed: f64,
    pub variable: f64,
}

impl CostTotals {
    pub fn from_entries(fixed: &[CostEntry], variable: &[CostEntry]) -> Self {
        CostTotals {
            fixed: fixed.iter().map(|c| c.amount).sum(),
            variable: variable.iter().map(|c| c.amount).sum(),
        }
    }

    pub fn total(&self) -> f64 {
        self.fixed + self.variable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub burn_rate: f64,
    pub runway: f64,
    pub fixed_cost_ratio: f64,
}

impl DerivedMetrics {
    /// (key, value) pairs in write-back order
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [
            (DERIVED_KEYS[0], self.burn_rate),
            (DERIVED_KEYS[1], self.runway),
            (DERIVED_KEYS[2], self.fixed_cost_ratio),
        ]
    }
}

/// Round to one decimal place, as `Number.prototype.toFixed(1)` does
pub fn round1(value: f64) -> f64 {
    fixed1(value).parse().unwrap_or(value)
}

/// One-decimal text of the exact stored value
///
/// 1.45 is stored just below the half and rounds down. The only exact
/// ties are quarters (x.25, x.75), which round away from zero.
pub fn fixed1(value: f64) -> String {
    let is_tie = (value * 4.0).fract() == 0.0 && (value * 2.0).fract() != 0.0;
    if is_tie {
        // value * 10 is exact for quarters
        format!("{:.1}", (value * 10.0).round() / 10.0)
    } else {
        format!("{:.1}", value)
    }
}

/// Monthly outflow net of recurring revenue, floored at zero
pub fn burn_rate(total_costs: f64, mrr: f64) -> f64 {
    (total_costs - mrr).max(0.0)
}

/// Months of cash left at the current burn, or the sentinel when not burning
pub fn runway(cash_balance: f64, burn_rate: f64) -> f64 {
    if burn_rate > 0.0 {
        round1(cash_balance / burn_rate)
    } else {
        RUNWAY_SENTINEL
    }
}

/// Share of total costs that are fixed, as a percentage
pub fn fixed_cost_ratio(total_fixed: f64, total_costs: f64) -> f64 {
    if total_costs > 0.0 {
        round1(total_fixed / total_costs * 100.0)
    } else {
        0.0
    }
}

/// Compute all three derived metrics
pub fn derive(totals: &CostTotals, mrr: f64, cash_balance: f64) -> DerivedMetrics {
    let total_costs = totals.total();
    let burn = burn_rate(total_costs, mrr);
    DerivedMetrics {
        burn_rate: burn,
        runway: runway(cash_balance, burn),
        fixed_cost_ratio: fixed_cost_ratio(totals.fixed, total_costs),
    }
}

/// Derive from cost lists, reading `mrr` and `cashBalance` from `metrics`
pub fn derive_from_costs(
    fixed: &[CostEntry],
    variable: &[CostEntry],
    metrics: &ProjectMetrics,
) -> DerivedMetrics {
    let totals = CostTotals::from_entries(fixed, variable);
    derive(&totals, metrics.get("mrr"), metrics.get("cashBalance"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, amount: f64) -> CostEntry {
        CostEntry {
            id: id.to_string(),
            label: String::new(),
            amount,
        }
    }

    #[test]
    fn test_burn_rate() {
        assert_eq!(burn_rate(10000.0, 4000.0), 6000.0);
        assert_eq!(burn_rate(4000.0, 10000.0), 0.0);
        assert_eq!(burn_rate(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_runway() {
        assert_eq!(runway(30000.0, 6000.0), 5.0);
        assert_eq!(runway(10000.0, 3000.0), 3.3);
        assert_eq!(runway(30000.0, 0.0), RUNWAY_SENTINEL);
        assert_eq!(runway(0.0, 6000.0), 0.0);
    }

    #[test]
    fn test_round1_uses_exact_stored_value() {
        // 0.35 and 1.45 are stored slightly below the half
        assert_eq!(round1(7000.0 / 20000.0), 0.3);
        assert_eq!(round1(1.45), 1.4);
        assert_eq!(round1(12.35), 12.3);
        assert_eq!(round1(2.675), 2.7);
        // quarters are exact ties
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(0.75), 0.8);
        assert_eq!(round1(-0.25), -0.3);
        assert_eq!(round1(6.0), 6.0);
    }

    #[test]
    fn test_fixed1_text() {
        assert_eq!(fixed1(1.45), "1.4");
        assert_eq!(fixed1(2.25), "2.3");
        assert_eq!(fixed1(83.636), "83.6");
        assert_eq!(fixed1(5.0), "5.0");
        assert_eq!(fixed1(f64::NAN), "NaN");
    }

    #[test]
    fn test_runway_below_half_rounds_down() {
        let totals = CostTotals {
            fixed: 20000.0,
            variable: 0.0,
        };
        let derived = derive(&totals, 0.0, 7000.0);
        assert_eq!(derived.burn_rate, 20000.0);
        assert_eq!(derived.runway, 0.3);
        assert_eq!(derived.fixed_cost_ratio, 100.0);
    }

    #[test]
    fn test_fixed_cost_ratio() {
        assert_eq!(fixed_cost_ratio(6000.0, 10000.0), 60.0);
        assert_eq!(fixed_cost_ratio(1.0, 3.0), 33.3);
        assert_eq!(fixed_cost_ratio(2.0, 3.0), 66.7);
        assert_eq!(fixed_cost_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_derive_with_costs() {
        let fixed = vec![entry("c1", 4000.0), entry("c2", 2000.0)];
        let variable = vec![entry("c3", 4000.0)];
        let totals = CostTotals::from_entries(&fixed, &variable);
        assert_eq!(totals.fixed, 6000.0);
        assert_eq!(totals.total(), 10000.0);

        let derived = derive(&totals, 4000.0, 30000.0);
        assert_eq!(derived.burn_rate, 6000.0);
        assert_eq!(derived.runway, 5.0);
        assert_eq!(derived.fixed_cost_ratio, 60.0);
    }

    #[test]
    fn test_derive_no_costs() {
        let derived = derive(&CostTotals::default(), 0.0, 50000.0);
        assert_eq!(derived.burn_rate, 0.0);
        assert_eq!(derived.runway, RUNWAY_SENTINEL);
        assert_eq!(derived.fixed_cost_ratio, 0.0);
    }

    #[test]
    fn test_revenue_covers_costs() {
        let totals = CostTotals {
            fixed: 3000.0,
            variable: 2000.0,
        };
        let derived = derive(&totals, 5000.0, 10000.0);
        assert_eq!(derived.burn_rate, 0.0);
        assert_eq!(derived.runway, RUNWAY_SENTINEL);
        assert_eq!(derived.fixed_cost_ratio, 60.0);
    }

    #[test]
    fn test_derive_from_costs_reads_metrics() {
        let mut metrics = ProjectMetrics::default();
        metrics.set("mrr", 1000.0);
        metrics.set("cashBalance", 9000.0);
        let derived = derive_from_costs(&[entry("a", 4000.0)], &[], &metrics);
        assert_eq!(derived.burn_rate, 3000.0);
        assert_eq!(derived.runway, 3.0);
        assert_eq!(derived.fixed_cost_ratio, 100.0);

        // absent mrr/cashBalance read as zero
        let derived = derive_from_costs(&[], &[entry("b", 500.0)], &ProjectMetrics::default());
        assert_eq!(derived.burn_rate, 500.0);
        assert_eq!(derived.runway, 0.0);
        assert_eq!(derived.fixed_cost_ratio, 0.0);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let totals = CostTotals {
            fixed: 1234.5,
            variable: 678.9,
        };
        assert_eq!(derive(&totals, 100.0, 5000.0), derive(&totals, 100.0, 5000.0));
    }
}
