//! Configuration file support for Control Tower
//!
//! Loads threshold overrides and report options from JSON files.
//!
//! Config sits next to the projects file it applies to. Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.controltowerrc.json` in the projects directory
//! 3. `controltower.config.json` in the projects directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::catalog::MetricCategory;
use crate::health::{self, Direction, HealthThreshold, ThresholdRules};
use crate::report::ReportOptions;
use crate::summary::KEY_CATEGORIES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Control Tower configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlTowerConfig {
    /// Per-metric cutoff overrides, keyed by metric key
    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdOverride>,

    /// Categories counted in health summaries (default: survival, revenue,
    /// profitability, retention, customer value)
    #[serde(default)]
    pub summary_categories: Vec<MetricCategory>,

    /// Omit zero-valued metrics from reports (default: false)
    #[serde(default)]
    pub hide_empty: Option<bool>,
}

/// Override for one metric's cutoffs
///
/// Unset fields keep the built-in value. Metrics without a built-in rule
/// must set all three fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdOverride {
    pub healthy: Option<f64>,
    pub warning: Option<f64>,
    pub direction: Option<Direction>,
}

/// Resolved configuration ready for use
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Built-in rules merged with overrides
    pub rules: ThresholdRules,
    pub summary_categories: Vec<MetricCategory>,
    pub hide_empty: bool,
    /// Number of overridden or added rules
    pub overrides: usize,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ThresholdOverride {
    /// Merge with the built-in rule for `key`
    fn merge(&self, key: &str) -> Result<HealthThreshold> {
        let merged = match health::threshold_for(key) {
            Some(base) => {
                if let Some(direction) = self.direction {
                    if direction != base.direction {
                        anyhow::bail!(
                            "thresholds.{}: direction cannot be changed for a built-in metric",
                            key
                        );
                    }
                }
                HealthThreshold {
                    healthy: self.healthy.unwrap_or(base.healthy),
                    warning: self.warning.unwrap_or(base.warning),
                    direction: base.direction,
                }
            }
            None => match (self.healthy, self.warning, self.direction) {
                (Some(healthy), Some(warning), Some(direction)) => HealthThreshold {
                    healthy,
                    warning,
                    direction,
                },
                _ => anyhow::bail!(
                    "thresholds.{}: metric has no built-in rule, so healthy, warning and direction are all required",
                    key
                ),
            },
        };

        if !merged.healthy.is_finite() {
            anyhow::bail!("thresholds.{}.healthy must be finite", key);
        }
        if !merged.warning.is_finite() {
            anyhow::bail!("thresholds.{}.warning must be finite", key);
        }
        if !merged.is_ordered() {
            let relation = match merged.direction {
                Direction::HigherIsBetter => "greater than",
                Direction::LowerIsBetter => "less than",
            };
            anyhow::bail!(
                "thresholds.{}.healthy ({}) must be {} thresholds.{}.warning ({})",
                key,
                merged.healthy,
                relation,
                key,
                merged.warning
            );
        }

        Ok(merged)
    }
}

impl ControlTowerConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        for (key, over) in &self.thresholds {
            if key.trim().is_empty() {
                anyhow::bail!("thresholds: metric key must not be empty");
            }
            over.merge(key)?;
        }

        for (i, category) in self.summary_categories.iter().enumerate() {
            if self.summary_categories[..i].contains(category) {
                anyhow::bail!("summary_categories lists {} more than once", category);
            }
        }

        Ok(())
    }

    /// Resolve config into merged form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let mut rules = ThresholdRules::builtin();
        for (key, over) in &self.thresholds {
            rules.set(key.clone(), over.merge(key)?);
        }

        let summary_categories = if self.summary_categories.is_empty() {
            KEY_CATEGORIES.to_vec()
        } else {
            self.summary_categories.clone()
        };

        Ok(ResolvedConfig {
            rules,
            summary_categories,
            hide_empty: self.hide_empty.unwrap_or(false),
            overrides: self.thresholds.len(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        ControlTowerConfig::default().resolve()
    }

    /// Report options from this config, optionally narrowed to a category
    pub fn report_options(&self, category: Option<MetricCategory>) -> ReportOptions {
        ReportOptions {
            category,
            hide_empty: self.hide_empty,
            summary_categories: self.summary_categories.clone(),
        }
    }
}

/// Config file names looked up in a directory, highest priority first
pub const CONFIG_FILE_NAMES: [&str; 2] = [".controltowerrc.json", "controltower.config.json"];

/// Find and load the first config file in `dir`
///
/// Returns `None` if there is none (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(ControlTowerConfig, PathBuf)>> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .map(|path| load_config_file(&path).map(|config| (config, path)))
        .transpose()
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<ControlTowerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config in: {}", path.display()))
}

/// Parse and validate config JSON
pub fn parse_config(json: &str) -> Result<ControlTowerConfig> {
    let config: ControlTowerConfig = serde_json::from_str(json).context("malformed config")?;
    config.validate()?;
    Ok(config)
}

/// Resolve the config that applies to `dir`
///
/// An explicit `config_path` wins over discovery. Without either, the
/// built-in rules apply.
pub fn load_and_resolve(dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let found = match config_path {
        Some(path) => Some((load_config_file(path)?, path.to_path_buf())),
        None => discover_config(dir)?,
    };

    let Some((config, path)) = found else {
        tracing::debug!(dir = %dir.display(), "no config file found, using defaults");
        return ResolvedConfig::defaults();
    };

    tracing::debug!(path = %path.display(), overrides = config.thresholds.len(), "config loaded");
    let mut resolved = config.resolve()?;
    resolved.config_path = Some(path);
    Ok(resolved)
}
