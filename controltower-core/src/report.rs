//! Metric reports and output rendering
//!
//! Global invariants enforced:
//! - Rows follow catalog order, so categories form contiguous runs
//! - Multi-project output order equals input order
//! - Identical input yields byte-for-byte identical output

use crate::catalog::{self, MetricCategory, MetricUnit};
use crate::format::format_metric_value;
use crate::health::{Health, ThresholdRules};
use crate::project::Project;
use crate::summary::{self, HealthSummary};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Most projects the comparison table shows side by side
pub const MAX_COMPARED_PROJECTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("cannot compare {selected} projects side by side (at most {max})")]
    TooManyProjects { selected: usize, max: usize },
}

/// Row filters shared by every report
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Only rows of this category
    pub category: Option<MetricCategory>,
    /// Drop rows whose value is zero (unset)
    pub hide_empty: bool,
    /// Categories counted in the health summary (empty means the defaults)
    pub summary_categories: Vec<MetricCategory>,
}

impl ReportOptions {
    fn summary_categories(&self) -> &[MetricCategory] {
        if self.summary_categories.is_empty() {
            &summary::KEY_CATEGORIES
        } else {
            &self.summary_categories
        }
    }

    fn includes(&self, category: MetricCategory) -> bool {
        self.category.is_none() || self.category == Some(category)
    }
}

/// One metric of one project
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricRow {
    pub key: String,
    pub name: String,
    pub category: MetricCategory,
    pub unit: MetricUnit,
    pub value: f64,
    pub display: String,
    pub health: Health,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectReport {
    pub id: String,
    pub name: String,
    pub status: String,
    pub summary: HealthSummary,
    pub rows: Vec<MetricRow>,
}

/// Build the catalog-ordered metric rows for a project
pub fn project_report(
    project: &Project,
    rules: &ThresholdRules,
    options: &ReportOptions,
) -> ProjectReport {
    let rows = catalog::definitions()
        .iter()
        .filter(|d| options.includes(d.category))
        .filter_map(|d| {
            let value = project.metric(d.key);
            if options.hide_empty && value == 0.0 {
                return None;
            }
            Some(MetricRow {
                key: d.key.to_string(),
                name: d.name.to_string(),
                category: d.category,
                unit: d.unit,
                value,
                display: format_metric_value(value, d.unit),
                health: rules.classify(d.key, value),
            })
        })
        .collect();

    ProjectReport {
        id: project.id.clone(),
        name: project.name.clone(),
        status: project.status.label().to_string(),
        summary: summary::summarize(project, rules, options.summary_categories()),
        rows,
    }
}

/// Build reports for many projects in parallel, preserving input order
pub fn project_reports(
    projects: &[Project],
    rules: &ThresholdRules,
    options: &ReportOptions,
) -> Vec<ProjectReport> {
    projects
        .par_iter()
        .map(|p| project_report(p, rules, options))
        .collect()
}

/// Reorder rows most severe first, ties kept in catalog order
pub fn sort_by_health(mut rows: Vec<MetricRow>) -> Vec<MetricRow> {
    rows.sort_by_key(|r| r.health.severity());
    rows
}

/// One metric across several projects
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricCell {
    pub value: f64,
    pub display: String,
    pub health: Health,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableRow {
    pub key: String,
    pub name: String,
    pub category: MetricCategory,
    pub formula: String,
    pub cells: Vec<MetricCell>,
}

/// Side-by-side comparison of projects
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsTable {
    pub projects: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Build the comparison table for up to `MAX_COMPARED_PROJECTS` projects
pub fn metrics_table(
    projects: &[&Project],
    rules: &ThresholdRules,
    options: &ReportOptions,
) -> Result<MetricsTable, ReportError> {
    if projects.len() > MAX_COMPARED_PROJECTS {
        return Err(ReportError::TooManyProjects {
            selected: projects.len(),
            max: MAX_COMPARED_PROJECTS,
        });
    }

    let rows = catalog::definitions()
        .iter()
        .filter(|d| options.includes(d.category))
        .filter(|d| !options.hide_empty || projects.iter().any(|p| p.metric(d.key) != 0.0))
        .map(|d| TableRow {
            key: d.key.to_string(),
            name: d.name.to_string(),
            category: d.category,
            formula: d.formula.to_string(),
            cells: projects
                .iter()
                .map(|p| {
                    let value = p.metric(d.key);
                    MetricCell {
                        value,
                        display: format_metric_value(value, d.unit),
                        health: rules.classify(d.key, value),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(MetricsTable {
        projects: projects.iter().map(|p| p.name.clone()).collect(),
        rows,
    })
}

/// Render project reports as text
///
/// A section header is emitted each time the category changes.
pub fn render_text(reports: &[ProjectReport]) -> String {
    let mut output = String::new();

    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!(
            "{} ({}) [{}]\n",
            report.name, report.id, report.status
        ));
        output.push_str(&format!(
            "Health: {} healthy, {} warning, {} critical\n",
            report.summary.healthy, report.summary.warning, report.summary.critical
        ));
        output.push_str(&format!(
            "{:<30} {:<16} {}\n",
            "METRIC", "VALUE", "HEALTH"
        ));

        let mut current: Option<MetricCategory> = None;
        for row in &report.rows {
            if current != Some(row.category) {
                output.push_str(&format!("-- {} --\n", row.category.label()));
                current = Some(row.category);
            }
            output.push_str(&format!(
                "{:<30} {:<16} {}\n",
                truncate_or_pad(&row.name, 30),
                row.display,
                row.health.as_str()
            ));
        }
    }

    output
}

/// Render a comparison table as text
pub fn render_table_text(table: &MetricsTable) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<30}", "METRIC"));
    for name in &table.projects {
        output.push_str(&format!(" {:<20}", truncate_or_pad(name, 20)));
    }
    output.push('\n');

    let mut current: Option<MetricCategory> = None;
    for row in &table.rows {
        if current != Some(row.category) {
            output.push_str(&format!("-- {} --\n", row.category.label()));
            current = Some(row.category);
        }
        output.push_str(&format!("{:<30}", truncate_or_pad(&row.name, 30)));
        for cell in &row.cells {
            let text = format!("{} ({})", cell.display, cell.health.as_str());
            output.push_str(&format!(" {:<20}", text));
        }
        output.push('\n');
    }

    output
}

/// Render any report value as pretty JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to a fixed width in characters
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Industry, NewProject, Priority, ProjectStatus};

    fn project(id: &str, name: &str) -> Project {
        NewProject {
            name: name.to_string(),
            description: String::new(),
            client_id: "cl1".to_string(),
            industry: Industry::Media,
            status: ProjectStatus::Completed,
            priority: Priority::Medium,
            budget: 1000.0,
            start_date: "2025-01-01".to_string(),
            end_date: "2025-02-01".to_string(),
            team_ids: Vec::new(),
            tech_stack: Vec::new(),
        }
        .into_project(id)
        .unwrap()
    }

    #[test]
    fn test_report_rows_follow_catalog() {
        let p = project("p1", "Media Hub");
        let report = project_report(&p, &ThresholdRules::builtin(), &ReportOptions::default());
        assert_eq!(report.rows.len(), catalog::definitions().len());
        assert_eq!(report.rows[0].key, "cashBalance");
        assert!(report.rows.iter().all(|r| r.display == "—"));
        assert!(report.rows.iter().all(|r| r.health == Health::Warning));
        assert_eq!(report.status, "Completado");
    }

    #[test]
    fn test_report_filters() {
        let mut p = project("p1", "Media Hub");
        p.metrics.set("churnRate", 9.0);
        let options = ReportOptions {
            category: Some(MetricCategory::Retention),
            hide_empty: true,
            summary_categories: Vec::new(),
        };
        let report = project_report(&p, &ThresholdRules::builtin(), &options);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].display, "9.0%");
        assert_eq!(report.rows[0].health, Health::Critical);
        assert_eq!(report.summary.critical, 1);
    }

    #[test]
    fn test_sort_by_health_is_stable() {
        let mut p = project("p1", "Media Hub");
        p.metrics.set("mrr", 20000.0);
        p.metrics.set("burnRate", 50000.0);
        p.metrics.set("churnRate", 20.0);
        let options = ReportOptions {
            hide_empty: true,
            ..ReportOptions::default()
        };
        let rows = sort_by_health(
            project_report(&p, &ThresholdRules::builtin(), &options).rows,
        );
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["burnRate", "churnRate", "mrr"]);
    }

    #[test]
    fn test_parallel_reports_keep_order() {
        let projects: Vec<Project> = (1..=8)
            .map(|i| project(&format!("p{}", i), &format!("Project {}", i)))
            .collect();
        let reports = project_reports(&projects, &ThresholdRules::builtin(), &ReportOptions::default());
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"]);
    }

    #[test]
    fn test_render_text_one_header_per_category_run() {
        let p = project("p1", "Media Hub");
        let report = project_report(&p, &ThresholdRules::builtin(), &ReportOptions::default());
        let text = render_text(&[report]);
        let headers = text.lines().filter(|l| l.starts_with("-- ")).count();
        assert_eq!(headers, MetricCategory::all().len());
        assert!(text.contains("-- Valor Cliente --"));
        assert!(text.starts_with("Media Hub (p1) [Completado]\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut p = project("p1", "Media Hub");
        p.metrics.set("ltv", 750.0);
        let rules = ThresholdRules::builtin();
        let a = render_text(&[project_report(&p, &rules, &ReportOptions::default())]);
        let b = render_text(&[project_report(&p, &rules, &ReportOptions::default())]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_metrics_table() {
        let mut a = project("p1", "Alpha");
        let b = project("p2", "Beta");
        a.metrics.set("ltvCacRatio", 4.2);
        let options = ReportOptions {
            hide_empty: true,
            ..ReportOptions::default()
        };
        let table = metrics_table(&[&a, &b], &ThresholdRules::builtin(), &options).unwrap();
        assert_eq!(table.projects, vec!["Alpha", "Beta"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[0].display, "4.2x");
        assert_eq!(table.rows[0].cells[0].health, Health::Healthy);
        assert_eq!(table.rows[0].cells[1].display, "—");

        let text = render_table_text(&table);
        assert!(text.contains("-- Valor Cliente --"));
        assert!(text.contains("4.2x (healthy)"));
    }

    #[test]
    fn test_metrics_table_caps_selection() {
        let projects: Vec<Project> = (1..=5)
            .map(|i| project(&format!("p{}", i), &format!("Project {}", i)))
            .collect();
        let refs: Vec<&Project> = projects.iter().collect();
        let rules = ThresholdRules::builtin();
        let options = ReportOptions::default();

        let table = metrics_table(&refs[..MAX_COMPARED_PROJECTS], &rules, &options).unwrap();
        assert_eq!(table.projects.len(), 4);
        assert!(table.rows.iter().all(|r| r.cells.len() == 4));

        assert_eq!(
            metrics_table(&refs, &rules, &options),
            Err(ReportError::TooManyProjects {
                selected: 5,
                max: 4
            })
        );
    }

    #[test]
    fn test_render_json() {
        let p = project("p1", "Media Hub");
        let options = ReportOptions {
            category: Some(MetricCategory::Portfolio),
            ..ReportOptions::default()
        };
        let report = project_report(&p, &ThresholdRules::builtin(), &options);
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&[report])).unwrap();
        assert_eq!(json[0]["rows"][0]["key"], "portfolioPerformanceIndex");
        assert_eq!(json[0]["rows"][0]["category"], "portafolio");
        assert_eq!(json[0]["rows"][0]["health"], "warning");
    }

    #[test]
    fn test_truncate_or_pad_handles_multibyte() {
        assert_eq!(truncate_or_pad("Adquisición", 5), "Ad...");
        assert_eq!(truncate_or_pad("días", 6), "días  ");
    }
}
