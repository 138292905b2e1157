//! Project entity: metric values and itemized costs
//!
//! Derived metrics are snapshot-written into `metrics` only when an edit is
//! applied. `Project::derived_metrics` always recomputes from the current
//! cost lists.

use crate::catalog;
use crate::derived::{self, DerivedMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Metric values keyed by metric key; absent keys read as zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMetrics(BTreeMap<String, f64>);

impl ProjectMetrics {
    /// One zero entry per catalogued metric
    pub fn empty() -> Self {
        ProjectMetrics(catalog::keys().map(|k| (k.to_string(), 0.0)).collect())
    }

    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write the three derived metrics
    pub fn apply_derived(&mut self, derived: &DerivedMetrics) {
        for (key, value) in derived.entries() {
            self.set(key, value);
        }
    }
}

impl FromIterator<(String, f64)> for ProjectMetrics {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        ProjectMetrics(iter.into_iter().collect())
    }
}

/// Itemized recurring cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub amount: f64,
}

/// Which cost list an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    Fixed,
    Variable,
}

impl CostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostKind::Fixed => "fixed",
            CostKind::Variable => "variable",
        }
    }
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Proposal,
    InDevelopment,
    Testing,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Proposal => "Propuesta",
            ProjectStatus::InDevelopment => "En Desarrollo",
            ProjectStatus::Testing => "Testing",
            ProjectStatus::Completed => "Completado",
            ProjectStatus::OnHold => "En Pausa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Fintech,
    Healthcare,
    Ecommerce,
    Education,
    Logistics,
    Saas,
    Media,
    RealEstate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub due_date: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client_id: String,
    pub industry: Industry,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub budget: f64,
    #[serde(default)]
    pub spent: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub team_ids: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub metrics: ProjectMetrics,
    #[serde(default)]
    pub fixed_costs: Vec<CostEntry>,
    #[serde(default)]
    pub variable_costs: Vec<CostEntry>,
}

/// A single failed validation rule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("name is required")]
    MissingName,
    #[error("a client must be selected")]
    MissingClient,
    #[error("invalid budget: {0}")]
    InvalidBudget(f64),
    #[error("start date is required")]
    MissingStartDate,
    #[error("end date is required")]
    MissingEndDate,
    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart { start: String, end: String },
}

/// Error type for project operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectError {
    #[error("invalid project: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("project already exists: {0}")]
    Duplicate(String),
    #[error("{kind} cost entry not found: {id}")]
    CostNotFound { kind: CostKind, id: String },
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Shared field checks for new and edited projects
fn check_common(
    name: &str,
    client_id: &str,
    start_date: &str,
    end_date: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if name.trim().is_empty() {
        issues.push(ValidationIssue::MissingName);
    }
    if client_id.is_empty() {
        issues.push(ValidationIssue::MissingClient);
    }
    if start_date.is_empty() {
        issues.push(ValidationIssue::MissingStartDate);
    }
    if end_date.is_empty() {
        issues.push(ValidationIssue::MissingEndDate);
    }
    // ISO dates compare correctly as strings
    if !start_date.is_empty() && !end_date.is_empty() && end_date <= start_date {
        issues.push(ValidationIssue::EndNotAfterStart {
            start: start_date.to_string(),
            end: end_date.to_string(),
        });
    }
}

fn into_result(issues: Vec<ValidationIssue>) -> Result<(), ProjectError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ProjectError::Invalid(issues))
    }
}

/// Input for creating a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client_id: String,
    pub industry: Industry,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub budget: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub team_ids: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), ProjectError> {
        let mut issues = Vec::new();
        check_common(
            &self.name,
            &self.client_id,
            &self.start_date,
            &self.end_date,
            &mut issues,
        );
        if !(self.budget.is_finite() && self.budget > 0.0) {
            issues.push(ValidationIssue::InvalidBudget(self.budget));
        }
        into_result(issues)
    }

    /// Build the project with zeroed metrics and no costs
    pub fn into_project(self, id: impl Into<String>) -> Result<Project, ProjectError> {
        self.validate()?;
        Ok(Project {
            id: id.into(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            client_id: self.client_id,
            industry: self.industry,
            status: self.status,
            priority: self.priority,
            budget: self.budget,
            spent: 0.0,
            start_date: self.start_date,
            end_date: self.end_date,
            team_ids: self.team_ids,
            milestones: Vec::new(),
            progress: 0.0,
            tech_stack: self.tech_stack,
            metrics: ProjectMetrics::empty(),
            fixed_costs: Vec::new(),
            variable_costs: Vec::new(),
        })
    }
}

/// Full replacement of a project's editable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEdit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub client_id: String,
    pub industry: Industry,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub budget: f64,
    #[serde(default)]
    pub spent: f64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub team_ids: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub metrics: ProjectMetrics,
    #[serde(default)]
    pub fixed_costs: Vec<CostEntry>,
    #[serde(default)]
    pub variable_costs: Vec<CostEntry>,
}

impl ProjectEdit {
    pub fn validate(&self) -> Result<(), ProjectError> {
        let mut issues = Vec::new();
        check_common(
            &self.name,
            &self.client_id,
            &self.start_date,
            &self.end_date,
            &mut issues,
        );
        if !self.budget.is_finite() {
            issues.push(ValidationIssue::InvalidBudget(self.budget));
        }
        into_result(issues)
    }
}

impl Project {
    /// Current value of a metric, zero when absent
    pub fn metric(&self, key: &str) -> f64 {
        self.metrics.get(key)
    }

    /// Burn rate, runway and fixed-cost ratio from the current cost lists
    pub fn derived_metrics(&self) -> DerivedMetrics {
        derived::derive_from_costs(&self.fixed_costs, &self.variable_costs, &self.metrics)
    }

    /// Start an edit from the project's current state
    pub fn to_edit(&self) -> ProjectEdit {
        ProjectEdit {
            name: self.name.clone(),
            description: self.description.clone(),
            client_id: self.client_id.clone(),
            industry: self.industry,
            status: self.status,
            priority: self.priority,
            budget: self.budget,
            spent: self.spent,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            progress: self.progress,
            team_ids: self.team_ids.clone(),
            tech_stack: self.tech_stack.clone(),
            metrics: self.metrics.clone(),
            fixed_costs: self.fixed_costs.clone(),
            variable_costs: self.variable_costs.clone(),
        }
    }

    /// Save an edit and snapshot the derived metrics into `metrics`
    pub fn apply_edit(&mut self, edit: ProjectEdit) -> Result<DerivedMetrics, ProjectError> {
        edit.validate()?;

        let derived =
            derived::derive_from_costs(&edit.fixed_costs, &edit.variable_costs, &edit.metrics);

        self.name = edit.name.trim().to_string();
        self.description = edit.description.trim().to_string();
        self.client_id = edit.client_id;
        self.industry = edit.industry;
        self.status = edit.status;
        self.priority = edit.priority;
        self.budget = edit.budget;
        self.spent = if edit.spent.is_finite() { edit.spent } else { 0.0 };
        self.start_date = edit.start_date;
        self.end_date = edit.end_date;
        self.progress = clamp_progress(edit.progress);
        self.team_ids = edit.team_ids;
        self.tech_stack = edit.tech_stack;
        self.fixed_costs = edit.fixed_costs;
        self.variable_costs = edit.variable_costs;
        self.metrics = edit.metrics;
        self.metrics.apply_derived(&derived);

        Ok(derived)
    }

    fn costs_mut(&mut self, kind: CostKind) -> &mut Vec<CostEntry> {
        match kind {
            CostKind::Fixed => &mut self.fixed_costs,
            CostKind::Variable => &mut self.variable_costs,
        }
    }

    pub fn costs(&self, kind: CostKind) -> &[CostEntry] {
        match kind {
            CostKind::Fixed => &self.fixed_costs,
            CostKind::Variable => &self.variable_costs,
        }
    }

    /// Append an empty cost entry and return its id
    pub fn add_cost(&mut self, kind: CostKind) -> String {
        let id = next_cost_id(&self.fixed_costs, &self.variable_costs);
        self.costs_mut(kind).push(CostEntry {
            id: id.clone(),
            label: String::new(),
            amount: 0.0,
        });
        id
    }

    pub fn update_cost(
        &mut self,
        kind: CostKind,
        id: &str,
        label: Option<&str>,
        amount: Option<f64>,
    ) -> Result<(), ProjectError> {
        let entry = self
            .costs_mut(kind)
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ProjectError::CostNotFound {
                kind,
                id: id.to_string(),
            })?;
        if let Some(label) = label {
            entry.label = label.to_string();
        }
        if let Some(amount) = amount {
            // unparsable input is stored as zero
            entry.amount = if amount.is_finite() { amount } else { 0.0 };
        }
        Ok(())
    }

    pub fn remove_cost(&mut self, kind: CostKind, id: &str) -> Result<CostEntry, ProjectError> {
        let list = self.costs_mut(kind);
        let pos = list
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ProjectError::CostNotFound {
                kind,
                id: id.to_string(),
            })?;
        Ok(list.remove(pos))
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Next `c<N>` id unused by either cost list
fn next_cost_id(fixed: &[CostEntry], variable: &[CostEntry]) -> String {
    let max = fixed
        .iter()
        .chain(variable)
        .filter_map(|c| c.id.strip_prefix('c').and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    format!("c{}", max + 1)
}
