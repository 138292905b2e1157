//! Per-project health tallies over key metric categories

use crate::catalog::{self, MetricCategory, MetricDefinition};
use crate::health::{Health, ThresholdRules};
use crate::project::Project;
use serde::{Deserialize, Serialize};

/// Categories summarized when no others are configured
pub const KEY_CATEGORIES: [MetricCategory; 5] = [
    MetricCategory::Survival,
    MetricCategory::Revenue,
    MetricCategory::Profitability,
    MetricCategory::Retention,
    MetricCategory::CustomerValue,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

impl HealthSummary {
    pub fn record(&mut self, health: Health) {
        match health {
            Health::Healthy => self.healthy += 1,
            Health::Warning => self.warning += 1,
            Health::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.warning + self.critical
    }

    /// Most severe tier present, if any metric was counted
    pub fn worst(&self) -> Option<Health> {
        if self.critical > 0 {
            Some(Health::Critical)
        } else if self.warning > 0 {
            Some(Health::Warning)
        } else if self.healthy > 0 {
            Some(Health::Healthy)
        } else {
            None
        }
    }
}

/// Catalogued metrics in `categories` that carry a non-zero value
pub fn key_metrics<'a>(
    project: &'a Project,
    categories: &'a [MetricCategory],
) -> impl Iterator<Item = &'static MetricDefinition> + 'a {
    catalog::definitions()
        .iter()
        .filter(move |d| categories.contains(&d.category) && project.metric(d.key) != 0.0)
}

/// Tally the health of a project's key metrics
///
/// Zero values are unset, not readings, so they are left out of the tally.
pub fn summarize(
    project: &Project,
    rules: &ThresholdRules,
    categories: &[MetricCategory],
) -> HealthSummary {
    let mut summary = HealthSummary::default();
    for def in key_metrics(project, categories) {
        summary.record(rules.classify(def.key, project.metric(def.key)));
    }
    summary
}
