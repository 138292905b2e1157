//! Control Tower CLI - business metric health and derived financial metrics

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Logs go to stderr; stdout carries only command output
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use controltower_core::catalog::{self, MetricCategory, MetricUnit};
use controltower_core::config::{self, ResolvedConfig};
use controltower_core::derived::{self, CostTotals};
use controltower_core::health::Direction;
use controltower_core::project::Project;
use controltower_core::report::{self, MetricRow};
use controltower_core::{format_metric_value, render_json, render_text, ProjectStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "controltower")]
#[command(about = "Business metric catalog, health classification and derived financial metrics")]
#[command(version = env!("CONTROLTOWER_VERSION"))]
struct Cli {
    /// Enable debug logging on stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List metric definitions in catalog order
    Catalog {
        /// Only metrics of this category (e.g. supervivencia, ingresos)
        #[arg(long)]
        category: Option<MetricCategory>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// List the fundamental business events
    Events {
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Classify a metric value as healthy, warning or critical
    Classify {
        /// Metric key (e.g. burnRate)
        key: String,

        /// Metric value
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Format a value for display
    Format {
        /// Value to format
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Unit: currency, percent, ratio, months, days, number or score
        unit: MetricUnit,
    },
    /// Compute burn rate, runway and fixed-cost ratio from cost amounts
    Derive {
        /// Fixed cost amounts
        #[arg(long, num_args = 1.., value_name = "AMOUNT")]
        fixed: Vec<f64>,

        /// Variable cost amounts
        #[arg(long, num_args = 1.., value_name = "AMOUNT")]
        variable: Vec<f64>,

        /// Monthly recurring revenue
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        mrr: f64,

        /// Cash balance
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        cash: f64,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Report metric health for projects in a JSON file
    Report {
        /// Path to a JSON array of projects
        path: PathBuf,

        /// Only these project ids (repeatable)
        #[arg(long = "project", value_name = "ID")]
        projects: Vec<String>,

        /// Skip projects still in proposal
        #[arg(long)]
        active: bool,

        /// Only metrics of this category
        #[arg(long)]
        category: Option<MetricCategory>,

        /// Omit zero-valued metrics (overrides config file)
        #[arg(long)]
        hide_empty: bool,

        /// Order rows critical first instead of catalog order
        #[arg(long)]
        sort_health: bool,

        /// Side-by-side comparison table (at most 4 projects) instead of per-project reports
        #[arg(long)]
        compare: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover next to the projects file)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Refresh stored burn rate, runway and fixed-cost ratio from cost lists
    Recompute {
        /// Path to a JSON array of projects
        path: PathBuf,

        /// Write the refreshed projects back to the file
        #[arg(long)]
        write: bool,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (built-in rules merged with config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct DerivedRow {
    key: &'static str,
    value: f64,
    display: String,
    health: controltower_core::Health,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Catalog { category, format } => {
            let defs: Vec<_> = match category {
                Some(c) => catalog::by_category(c).collect(),
                None => catalog::definitions().iter().collect(),
            };
            match format {
                OutputFormat::Json => println!("{}", render_json(&defs)),
                OutputFormat::Text => print!("{}", render_catalog_text(&defs)),
            }
        }
        Commands::Events { format } => {
            let events = catalog::fundamental_events();
            match format {
                OutputFormat::Json => println!("{}", render_json(events)),
                OutputFormat::Text => {
                    for event in events {
                        println!("{:<24} {}", event.name, event.description);
                    }
                }
            }
        }
        Commands::Classify { key, value, config } => {
            let resolved = load_config(&std::env::current_dir()?, config.as_deref())?;
            if catalog::lookup(&key).is_none() {
                tracing::debug!(key = %key, "metric not in catalog");
            }
            println!("{}", resolved.rules.classify(&key, value).as_str());
        }
        Commands::Format { value, unit } => {
            println!("{}", format_metric_value(value, unit));
        }
        Commands::Derive {
            fixed,
            variable,
            mrr,
            cash,
            format,
        } => {
            let totals = CostTotals {
                fixed: fixed.iter().sum(),
                variable: variable.iter().sum(),
            };
            let metrics = derived::derive(&totals, mrr, cash);
            let rows: Vec<DerivedRow> = metrics
                .entries()
                .iter()
                .map(|&(key, value)| {
                    let unit = catalog::lookup(key)
                        .map(|d| d.unit)
                        .unwrap_or(MetricUnit::Number);
                    DerivedRow {
                        key,
                        value,
                        display: format_metric_value(value, unit),
                        health: controltower_core::classify(key, value),
                    }
                })
                .collect();

            match format {
                OutputFormat::Json => println!("{}", render_json(&rows)),
                OutputFormat::Text => {
                    for row in &rows {
                        println!(
                            "{:<16} {:<16} {}",
                            row.key,
                            row.display,
                            row.health.as_str()
                        );
                    }
                }
            }
        }
        Commands::Report {
            path,
            projects,
            active,
            category,
            hide_empty,
            sort_health,
            compare,
            format,
            config: config_path,
        } => {
            let store = ProjectStore::load(&path)?;
            let project_root = config_root(&path);
            let resolved = load_config(&project_root, config_path.as_deref())?;

            let selected = select_projects(&store, &projects, active)?;

            let mut options = resolved.report_options(category);
            options.hide_empty |= hide_empty;

            if compare {
                let refs: Vec<&Project> = selected.iter().collect();
                let table = report::metrics_table(&refs, &resolved.rules, &options)
                    .context("narrow the comparison with --project")?;
                match format {
                    OutputFormat::Json => println!("{}", render_json(&table)),
                    OutputFormat::Text => print!("{}", report::render_table_text(&table)),
                }
            } else {
                let mut reports = report::project_reports(&selected, &resolved.rules, &options);
                if sort_health {
                    for r in &mut reports {
                        let rows: Vec<MetricRow> = std::mem::take(&mut r.rows);
                        r.rows = report::sort_by_health(rows);
                    }
                }
                match format {
                    OutputFormat::Json => println!("{}", render_json(&reports)),
                    OutputFormat::Text => print!("{}", render_text(&reports)),
                }
            }
        }
        Commands::Recompute { path, write } => {
            let mut store = ProjectStore::load(&path)?;
            let changed = store.recompute_derived();

            if write && changed > 0 {
                store
                    .save(&path)
                    .with_context(|| format!("failed to update {}", path.display()))?;
                println!("Updated {} of {} project(s)", changed, store.len());
            } else if write {
                println!("All {} project(s) up to date", store.len());
            } else {
                println!(
                    "{} of {} project(s) have stale derived metrics (use --write to update)",
                    changed,
                    store.len()
                );
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print!("{}", render_config(&resolved));
            }
        },
    }

    Ok(())
}

/// Log to stderr; `-v` forces debug, otherwise RUST_LOG or "warn"
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(project_root: &Path, config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let resolved = config::load_and_resolve(project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }

    Ok(resolved)
}

/// Directory searched for config files when reporting on a projects file
fn config_root(projects_path: &Path) -> PathBuf {
    match projects_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn select_projects(store: &ProjectStore, ids: &[String], active: bool) -> anyhow::Result<Vec<Project>> {
    if !ids.is_empty() {
        return ids
            .iter()
            .map(|id| {
                store
                    .get(id)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("project not found: {}", id))
            })
            .collect();
    }

    if active {
        Ok(store.active().cloned().collect())
    } else {
        Ok(store.list().to_vec())
    }
}

fn render_catalog_text(defs: &[&catalog::MetricDefinition]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<28} {:<9} {:<7} {}\n",
        "KEY", "UNIT", "BETTER", "NAME"
    ));

    let mut current: Option<MetricCategory> = None;
    for def in defs {
        if current != Some(def.category) {
            output.push_str(&format!("-- {} --\n", def.category.label()));
            current = Some(def.category);
        }
        output.push_str(&format!(
            "{:<28} {:<9} {:<7} {}\n",
            def.key,
            def.unit.as_str(),
            if def.higher_is_better { "higher" } else { "lower" },
            def.name
        ));
    }

    output
}

fn render_config(resolved: &ResolvedConfig) -> String {
    let mut output = String::from("Configuration:\n");
    match &resolved.config_path {
        Some(p) => output.push_str(&format!("  Source: {}\n", p.display())),
        None => output.push_str("  Source: defaults (no config file found)\n"),
    }
    output.push('\n');

    output.push_str(&format!(
        "Thresholds ({} rules, {} overridden):\n",
        resolved.rules.len(),
        resolved.overrides
    ));
    for (key, rule) in resolved.rules.iter() {
        let (op, direction) = match rule.direction {
            Direction::HigherIsBetter => (">", "higher is better"),
            Direction::LowerIsBetter => ("<", "lower is better"),
        };
        output.push_str(&format!(
            "  {:<28} healthy {}{:<10} warning {}{:<10} {}\n",
            key, op, rule.healthy, op, rule.warning, direction
        ));
    }
    output.push('\n');

    output.push_str("Report:\n");
    let categories: Vec<&str> = resolved
        .summary_categories
        .iter()
        .map(|c| c.as_str())
        .collect();
    output.push_str(&format!(
        "  summary_categories: {}\n",
        categories.join(", ")
    ));
    output.push_str(&format!("  hide_empty: {}\n", resolved.hide_empty));

    output
}
