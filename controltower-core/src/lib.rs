//! Control Tower core library - business metric catalog, health classification,
//! and derived financial metrics for client projects

#![deny(warnings)]

// Global invariants enforced in this crate:
// - The metric catalog is immutable and ordered by category
// - No global mutable state; stores and rules are passed explicitly
// - Classification and formatting are pure functions of their inputs
// - Zero means "unset" and always classifies as warning
// - Derived metrics are rounded to one decimal place
// - Identical input yields byte-for-byte identical output

pub mod catalog;
pub mod config;
pub mod derived;
pub mod format;
pub mod health;
pub mod project;
pub mod report;
pub mod store;
pub mod summary;

pub use catalog::{MetricCategory, MetricDefinition, MetricUnit};
pub use config::ResolvedConfig;
pub use derived::{derive, DerivedMetrics};
pub use format::format_metric_value;
pub use health::{classify, Health, ThresholdRules};
pub use project::{Project, ProjectError};
pub use report::{render_json, render_text, ProjectReport, ReportOptions};
pub use store::ProjectStore;
