//! Metric health classification
//!
//! Global invariants enforced:
//! - Zero is the "no data" sentinel and always classifies as warning
//! - Unknown metrics classify as warning, never healthy
//! - Comparisons are strict; a value equal to a cutoff falls to the next tier
//! - Pure and deterministic, no hidden state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health tier of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Critical => "critical",
        }
    }

    /// Sort key, most severe first
    pub fn severity(&self) -> u8 {
        match self {
            Health::Critical => 0,
            Health::Warning => 1,
            Health::Healthy => 2,
        }
    }
}

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Cutoffs for one metric
///
/// `healthy` and `warning` are exclusive bounds in `direction`:
/// higher-is-better means `value > healthy` is healthy, lower-is-better
/// means `value < healthy` is healthy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthThreshold {
    pub healthy: f64,
    pub warning: f64,
    pub direction: Direction,
}

impl HealthThreshold {
    pub const fn higher(healthy: f64, warning: f64) -> Self {
        HealthThreshold {
            healthy,
            warning,
            direction: Direction::HigherIsBetter,
        }
    }

    pub const fn lower(healthy: f64, warning: f64) -> Self {
        HealthThreshold {
            healthy,
            warning,
            direction: Direction::LowerIsBetter,
        }
    }

    fn passes(&self, value: f64, cutoff: f64) -> bool {
        match self.direction {
            Direction::HigherIsBetter => value > cutoff,
            Direction::LowerIsBetter => value < cutoff,
        }
    }

    /// Tier for a non-zero value
    pub fn tier(&self, value: f64) -> Health {
        if self.passes(value, self.healthy) {
            Health::Healthy
        } else if self.passes(value, self.warning) {
            Health::Warning
        } else {
            Health::Critical
        }
    }

    /// True when the healthy cutoff is stricter than the warning cutoff
    pub fn is_ordered(&self) -> bool {
        match self.direction {
            Direction::HigherIsBetter => self.healthy > self.warning,
            Direction::LowerIsBetter => self.healthy < self.warning,
        }
    }
}

/// Built-in business cutoffs, one per classified metric
pub const BUILTIN_THRESHOLDS: &[(&str, HealthThreshold)] = &[
    ("burnRate", HealthThreshold::lower(5000.0, 15000.0)),
    ("runway", HealthThreshold::higher(6.0, 3.0)),
    ("fixedCostRatio", HealthThreshold::lower(50.0, 70.0)),
    ("revenueConcentration", HealthThreshold::lower(40.0, 70.0)),
    ("mrr", HealthThreshold::higher(10000.0, 5000.0)),
    ("netRevenue", HealthThreshold::higher(10000.0, 5000.0)),
    ("revenueGrowthRate", HealthThreshold::higher(10.0, 5.0)),
    ("arpu", HealthThreshold::higher(20.0, 10.0)),
    ("grossMargin", HealthThreshold::higher(60.0, 40.0)),
    ("appRoi", HealthThreshold::higher(50.0, 0.0)),
    ("contributionMargin", HealthThreshold::higher(15.0, 5.0)),
    ("cac", HealthThreshold::lower(20.0, 50.0)),
    ("costPerLead", HealthThreshold::lower(10.0, 25.0)),
    ("trialToPaidConversion", HealthThreshold::higher(15.0, 5.0)),
    ("activationRate", HealthThreshold::higher(40.0, 20.0)),
    ("churnRate", HealthThreshold::lower(5.0, 8.0)),
    ("revenueChurn", HealthThreshold::lower(5.0, 8.0)),
    ("retentionRate", HealthThreshold::higher(95.0, 90.0)),
    ("averageLifetime", HealthThreshold::higher(18.0, 12.0)),
    ("totalUsers", HealthThreshold::higher(5000.0, 1000.0)),
    ("dauMauRatio", HealthThreshold::higher(30.0, 20.0)),
    ("ltv", HealthThreshold::higher(500.0, 200.0)),
    ("ltvCacRatio", HealthThreshold::higher(3.0, 1.5)),
    ("paybackPeriod", HealthThreshold::lower(3.0, 6.0)),
    ("timeToActivation", HealthThreshold::lower(2.0, 5.0)),
    ("featureAdoptionRate", HealthThreshold::higher(50.0, 30.0)),
    ("sessionFrequency", HealthThreshold::higher(4.0, 2.0)),
    ("growthEfficiency", HealthThreshold::higher(1.0, 0.5)),
    ("startupHealthScore", HealthThreshold::higher(70.0, 50.0)),
    ("platformRiskIndex", HealthThreshold::lower(40.0, 70.0)),
    ("operationalLeverage", HealthThreshold::higher(2.0, 1.0)),
    ("portfolioPerformanceIndex", HealthThreshold::higher(70.0, 50.0)),
    ("margenOperativo", HealthThreshold::higher(30.0, 15.0)),
    ("cashBalance", HealthThreshold::higher(50000.0, 20000.0)),
];

/// Built-in threshold for a metric key
pub fn threshold_for(key: &str) -> Option<&'static HealthThreshold> {
    BUILTIN_THRESHOLDS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, t)| t)
}

/// Classify a value against an optional threshold
pub fn classify_with_threshold(value: f64, threshold: Option<&HealthThreshold>) -> Health {
    if value == 0.0 {
        return Health::Warning;
    }
    match threshold {
        Some(t) => t.tier(value),
        None => Health::Warning,
    }
}

/// Classify a metric value with the built-in thresholds
pub fn classify(key: &str, value: f64) -> Health {
    let threshold = threshold_for(key);
    if threshold.is_none() && value != 0.0 {
        tracing::debug!(metric = key, "no threshold rule, defaulting to warning");
    }
    classify_with_threshold(value, threshold)
}

/// Resolved threshold table: built-in rules plus any overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRules {
    rules: BTreeMap<String, HealthThreshold>,
}

impl Default for ThresholdRules {
    fn default() -> Self {
        ThresholdRules::builtin()
    }
}

impl ThresholdRules {
    pub fn builtin() -> Self {
        ThresholdRules {
            rules: BUILTIN_THRESHOLDS
                .iter()
                .map(|(k, t)| (k.to_string(), *t))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&HealthThreshold> {
        self.rules.get(key)
    }

    /// Replace or add the rule for `key`
    pub fn set(&mut self, key: impl Into<String>, threshold: HealthThreshold) {
        self.rules.insert(key.into(), threshold);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HealthThreshold)> {
        self.rules.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn classify(&self, key: &str, value: f64) -> Health {
        classify_with_threshold(value, self.get(key))
    }
}

/// Classify against a resolved rule set
pub fn classify_with(rules: &ThresholdRules, key: &str, value: f64) -> Health {
    rules.classify(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_zero_is_warning_for_every_key() {
        for (key, _) in BUILTIN_THRESHOLDS {
            assert_eq!(classify(key, 0.0), Health::Warning, "{}", key);
        }
        for key in catalog::keys() {
            assert_eq!(classify(key, 0.0), Health::Warning, "{}", key);
        }
        assert_eq!(classify("unknownKey", 0.0), Health::Warning);
        assert_eq!(classify("burnRate", -0.0), Health::Warning);
    }

    #[test]
    fn test_burn_rate_lower_is_better() {
        assert_eq!(classify("burnRate", 4999.0), Health::Healthy);
        assert_eq!(classify("burnRate", 5000.0), Health::Warning);
        assert_eq!(classify("burnRate", 14999.0), Health::Warning);
        assert_eq!(classify("burnRate", 15000.0), Health::Critical);
        assert_eq!(classify("burnRate", 20000.0), Health::Critical);
    }

    #[test]
    fn test_mrr_higher_is_better() {
        assert_eq!(classify("mrr", 10001.0), Health::Healthy);
        assert_eq!(classify("mrr", 10000.0), Health::Warning);
        assert_eq!(classify("mrr", 5001.0), Health::Warning);
        assert_eq!(classify("mrr", 5000.0), Health::Critical);
        assert_eq!(classify("mrr", 100.0), Health::Critical);
    }

    #[test]
    fn test_unknown_key_is_warning() {
        assert_eq!(classify("unknownKey", 42.0), Health::Warning);
        // catalogued but without a rule
        assert_eq!(classify("averageTicket", 1_000_000.0), Health::Warning);
        assert_eq!(classify("breakEven", 3.0), Health::Warning);
    }

    #[test]
    fn test_boundaries_are_strict() {
        assert_eq!(classify("runway", 6.0), Health::Warning);
        assert_eq!(classify("runway", 6.1), Health::Healthy);
        assert_eq!(classify("runway", 3.0), Health::Critical);
        assert_eq!(classify("ltvCacRatio", 1.5), Health::Critical);
        assert_eq!(classify("ltvCacRatio", 1.6), Health::Warning);
        assert_eq!(classify("churnRate", 5.0), Health::Warning);
        assert_eq!(classify("churnRate", 8.0), Health::Critical);
    }

    #[test]
    fn test_app_roi_negative_is_critical() {
        assert_eq!(classify("appRoi", -1.0), Health::Critical);
        assert_eq!(classify("appRoi", 0.5), Health::Warning);
        assert_eq!(classify("appRoi", 51.0), Health::Healthy);
    }

    #[test]
    fn test_threshold_only_metric() {
        assert_eq!(classify("margenOperativo", 31.0), Health::Healthy);
        assert_eq!(classify("margenOperativo", 20.0), Health::Warning);
        assert_eq!(classify("margenOperativo", 10.0), Health::Critical);
    }

    #[test]
    fn test_nan_is_critical_for_known_keys() {
        assert_eq!(classify("mrr", f64::NAN), Health::Critical);
        assert_eq!(classify("burnRate", f64::NAN), Health::Critical);
        assert_eq!(classify("unknownKey", f64::NAN), Health::Warning);
    }

    #[test]
    fn test_builtin_rules_are_ordered() {
        assert_eq!(BUILTIN_THRESHOLDS.len(), 34);
        for (key, t) in BUILTIN_THRESHOLDS {
            assert!(t.is_ordered(), "{} has unordered cutoffs", key);
        }
    }

    #[test]
    fn test_directions_agree_with_catalog() {
        for (key, t) in BUILTIN_THRESHOLDS {
            if let Some(def) = catalog::lookup(key) {
                let higher = t.direction == Direction::HigherIsBetter;
                assert_eq!(higher, def.higher_is_better, "{}", key);
            }
        }
    }

    #[test]
    fn test_rules_override() {
        let mut rules = ThresholdRules::builtin();
        assert_eq!(rules.classify("mrr", 8000.0), Health::Warning);
        rules.set("mrr", HealthThreshold::higher(7500.0, 2000.0));
        assert_eq!(rules.classify("mrr", 8000.0), Health::Healthy);
        assert_eq!(classify_with(&rules, "mrr", 1000.0), Health::Critical);
        // built-in table is untouched
        assert_eq!(classify("mrr", 8000.0), Health::Warning);
    }

    #[test]
    fn test_classify_is_idempotent() {
        for v in [1.0, 4999.0, 12000.0, 90000.0] {
            assert_eq!(classify("burnRate", v), classify("burnRate", v));
        }
    }
}
