//! Metric catalog
//!
//! Static registry of every Control Tower metric.
//!
//! Global invariants enforced:
//! - Keys are unique across the catalog
//! - Entries of one category are contiguous, in `MetricCategory::all()` order
//! - The catalog is immutable; there is no runtime registration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Business category a metric belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricCategory {
    #[serde(rename = "supervivencia")]
    Survival,
    #[serde(rename = "riesgo_financiero")]
    FinancialRisk,
    #[serde(rename = "ingresos")]
    Revenue,
    #[serde(rename = "rentabilidad")]
    Profitability,
    #[serde(rename = "adquisicion")]
    Acquisition,
    #[serde(rename = "activacion")]
    Activation,
    #[serde(rename = "retencion")]
    Retention,
    #[serde(rename = "engagement")]
    Engagement,
    #[serde(rename = "valor_cliente")]
    CustomerValue,
    #[serde(rename = "producto")]
    Product,
    #[serde(rename = "estrategica")]
    Strategic,
    #[serde(rename = "riesgo_estructural")]
    StructuralRisk,
    #[serde(rename = "escalabilidad")]
    Scalability,
    #[serde(rename = "portafolio")]
    Portfolio,
}

const ALL_CATEGORIES: [MetricCategory; 14] = [
    MetricCategory::Survival,
    MetricCategory::FinancialRisk,
    MetricCategory::Revenue,
    MetricCategory::Profitability,
    MetricCategory::Acquisition,
    MetricCategory::Activation,
    MetricCategory::Retention,
    MetricCategory::Engagement,
    MetricCategory::CustomerValue,
    MetricCategory::Product,
    MetricCategory::Strategic,
    MetricCategory::StructuralRisk,
    MetricCategory::Scalability,
    MetricCategory::Portfolio,
];

impl MetricCategory {
    /// All categories in display order
    pub fn all() -> &'static [MetricCategory] {
        &ALL_CATEGORIES
    }

    /// Stable identifier used in config files and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Survival => "supervivencia",
            MetricCategory::FinancialRisk => "riesgo_financiero",
            MetricCategory::Revenue => "ingresos",
            MetricCategory::Profitability => "rentabilidad",
            MetricCategory::Acquisition => "adquisicion",
            MetricCategory::Activation => "activacion",
            MetricCategory::Retention => "retencion",
            MetricCategory::Engagement => "engagement",
            MetricCategory::CustomerValue => "valor_cliente",
            MetricCategory::Product => "producto",
            MetricCategory::Strategic => "estrategica",
            MetricCategory::StructuralRisk => "riesgo_estructural",
            MetricCategory::Scalability => "escalabilidad",
            MetricCategory::Portfolio => "portafolio",
        }
    }

    /// Human-readable section label
    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::Survival => "Supervivencia",
            MetricCategory::FinancialRisk => "Riesgo Financiero",
            MetricCategory::Revenue => "Ingresos",
            MetricCategory::Profitability => "Rentabilidad",
            MetricCategory::Acquisition => "Adquisición",
            MetricCategory::Activation => "Activación",
            MetricCategory::Retention => "Retención",
            MetricCategory::Engagement => "Engagement",
            MetricCategory::CustomerValue => "Valor Cliente",
            MetricCategory::Product => "Producto",
            MetricCategory::Strategic => "Estratégica",
            MetricCategory::StructuralRisk => "Riesgo Estructural",
            MetricCategory::Scalability => "Escalabilidad",
            MetricCategory::Portfolio => "Portafolio",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for MetricCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Display unit of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Currency,
    Percent,
    Ratio,
    Months,
    Days,
    Number,
    Score,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Currency => "currency",
            MetricUnit::Percent => "percent",
            MetricUnit::Ratio => "ratio",
            MetricUnit::Months => "months",
            MetricUnit::Days => "days",
            MetricUnit::Number => "number",
            MetricUnit::Score => "score",
        }
    }

    pub fn all() -> &'static [MetricUnit] {
        &[
            MetricUnit::Currency,
            MetricUnit::Percent,
            MetricUnit::Ratio,
            MetricUnit::Months,
            MetricUnit::Days,
            MetricUnit::Number,
            MetricUnit::Score,
        ]
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric unit: {0} (expected currency, percent, ratio, months, days, number or score)")]
pub struct ParseUnitError(pub String);

impl FromStr for MetricUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricUnit::all()
            .iter()
            .copied()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ParseUnitError(s.to_string()))
    }
}

/// Static definition of a single metric
///
/// `formula` and `events` are documentation only; nothing evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub category: MetricCategory,
    pub formula: &'static str,
    pub events: &'static [&'static str],
    pub unit: MetricUnit,
    pub higher_is_better: bool,
}

macro_rules! metric_def {
    ($key:expr, $name:expr, $category:ident, $formula:expr, [$($event:expr),*], $unit:ident, $higher:expr) => {
        MetricDefinition {
            key: $key,
            name: $name,
            category: MetricCategory::$category,
            formula: $formula,
            events: &[$($event),*],
            unit: MetricUnit::$unit,
            higher_is_better: $higher,
        }
    };
}

pub const METRIC_DEFINITIONS: &[MetricDefinition] = &[
    // Supervivencia
    metric_def!("cashBalance", "Cash Balance", Survival, "Bancos + Pasarelas – Obligaciones", [], Currency, true),
    metric_def!(
        "burnRate",
        "Burn Rate",
        Survival,
        "Costos – Ingresos",
        ["subscription_started", "subscription_renewed", "refund_issued"],
        Currency,
        false
    ),
    metric_def!("runway", "Runway", Survival, "Caja / Burn Rate", [], Months, true),
    metric_def!("fixedCostRatio", "Fixed Cost Ratio", Survival, "Costos fijos / Costos totales", [], Percent, false),
    // Riesgo financiero
    metric_def!(
        "revenueConcentration",
        "Revenue Concentration",
        FinancialRisk,
        "Ingresos principal fuente / Total ingresos",
        ["subscription_started"],
        Percent,
        false
    ),
    // Ingresos
    metric_def!(
        "mrr",
        "MRR",
        Revenue,
        "Σ planes activos × precio",
        ["subscription_started", "subscription_renewed"],
        Currency,
        true
    ),
    metric_def!(
        "netRevenue",
        "Net Revenue",
        Revenue,
        "Ingresos – comisiones – reembolsos",
        ["subscription_started", "subscription_renewed", "refund_issued"],
        Currency,
        true
    ),
    metric_def!(
        "revenueGrowthRate",
        "Revenue Growth Rate",
        Revenue,
        "(MRR actual – MRR anterior) / anterior",
        ["subscription_started", "subscription_renewed"],
        Percent,
        true
    ),
    metric_def!("arpu", "ARPU", Revenue, "Ingresos / Usuarios pagados", ["subscription_started"], Currency, true),
    metric_def!(
        "averageTicket",
        "Average Ticket",
        Revenue,
        "Ingresos pedidos / Nº pedidos",
        ["order_completed"],
        Currency,
        true
    ),
    // Rentabilidad
    metric_def!(
        "grossMargin",
        "Gross Margin",
        Profitability,
        "(Ingresos – Costos directos) / Ingresos",
        ["subscription_started"],
        Percent,
        true
    ),
    metric_def!(
        "appRoi",
        "App ROI",
        Profitability,
        "(Ingresos – Costos directos) / Costos directos",
        ["subscription_started"],
        Percent,
        true
    ),
    metric_def!(
        "breakEven",
        "Break-even",
        Profitability,
        "Costos totales / Precio promedio",
        ["subscription_started"],
        Number,
        false
    ),
    metric_def!(
        "contributionMargin",
        "Contribution Margin",
        Profitability,
        "ARPU – Costo variable",
        ["subscription_started"],
        Currency,
        true
    ),
    // Adquisición
    metric_def!(
        "cac",
        "CAC",
        Acquisition,
        "Marketing / Nuevos clientes",
        ["user_registered", "subscription_started"],
        Currency,
        false
    ),
    metric_def!("costPerLead", "Cost per Lead", Acquisition, "Marketing / Registros", ["user_registered"], Currency, false),
    metric_def!(
        "trialToPaidConversion",
        "Trial → Paid Conversion",
        Acquisition,
        "Paid / Trials",
        ["trial_started", "subscription_started"],
        Percent,
        true
    ),
    // Activación
    metric_def!(
        "activationRate",
        "Activation Rate",
        Activation,
        "Activados / Registrados",
        ["user_registered", "activation_event"],
        Percent,
        true
    ),
    // Retención
    metric_def!(
        "churnRate",
        "Churn Rate",
        Retention,
        "Cancelados / Activos inicio",
        ["subscription_cancelled"],
        Percent,
        false
    ),
    metric_def!(
        "revenueChurn",
        "Revenue Churn",
        Retention,
        "Ingresos perdidos / MRR inicio",
        ["subscription_cancelled"],
        Percent,
        false
    ),
    metric_def!("retentionRate", "Retention Rate", Retention, "1 – Churn", ["subscription_cancelled"], Percent, true),
    metric_def!("averageLifetime", "Average Lifetime", Retention, "1 / Churn", ["subscription_cancelled"], Months, true),
    // Engagement
    metric_def!("totalUsers", "Total Users", Engagement, "Σ acumulado user_registered", ["user_registered"], Number, true),
    metric_def!("dauMauRatio", "DAU/MAU Ratio", Engagement, "DAU / MAU", ["session_started"], Percent, true),
    // Valor cliente
    metric_def!(
        "ltv",
        "LTV",
        CustomerValue,
        "ARPU × Lifetime",
        ["subscription_started", "subscription_cancelled"],
        Currency,
        true
    ),
    metric_def!("ltvCacRatio", "LTV/CAC", CustomerValue, "LTV / CAC", ["subscription_started"], Ratio, true),
    metric_def!(
        "paybackPeriod",
        "Payback Period",
        CustomerValue,
        "CAC / Margen mensual",
        ["subscription_started"],
        Months,
        false
    ),
    // Producto
    metric_def!(
        "timeToActivation",
        "Time to Activation",
        Product,
        "Promedio (activación – registro)",
        ["user_registered", "activation_event"],
        Days,
        false
    ),
    metric_def!(
        "featureAdoptionRate",
        "Feature Adoption Rate",
        Product,
        "Usuarios feature / Usuarios activos",
        ["feature_used"],
        Percent,
        true
    ),
    metric_def!("sessionFrequency", "Session Frequency", Product, "Sesiones / Usuario", ["session_started"], Number, true),
    // Estratégica
    metric_def!("growthEfficiency", "Growth Efficiency", Strategic, "Growth / CAC", ["subscription_started"], Ratio, true),
    metric_def!(
        "startupHealthScore",
        "Startup Health Score",
        Strategic,
        "Score ponderado (Runway, ROI, Churn, Growth)",
        [],
        Score,
        true
    ),
    // Riesgo estructural
    metric_def!(
        "platformRiskIndex",
        "Platform Risk Index",
        StructuralRisk,
        "% ingresos plataforma dominante",
        ["subscription_started"],
        Percent,
        false
    ),
    // Escalabilidad
    metric_def!(
        "operationalLeverage",
        "Operational Leverage",
        Scalability,
        "Revenue Growth / Cost Growth",
        ["subscription_started"],
        Ratio,
        true
    ),
    // Portafolio
    metric_def!(
        "portfolioPerformanceIndex",
        "Portfolio Performance Index",
        Portfolio,
        "ROI ponderado",
        ["subscription_started"],
        Score,
        true
    ),
];

/// A business event that conceptually feeds one or more metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FundamentalEvent {
    pub name: &'static str,
    pub description: &'static str,
}

pub const FUNDAMENTAL_EVENTS: &[FundamentalEvent] = &[
    FundamentalEvent {
        name: "user_registered",
        description: "Usuario crea cuenta en la app",
    },
    FundamentalEvent {
        name: "activation_event",
        description: "Usuario realiza acción clave que demuestra valor",
    },
    FundamentalEvent {
        name: "trial_started",
        description: "Usuario inicia periodo gratuito",
    },
    FundamentalEvent {
        name: "subscription_started",
        description: "Usuario inicia suscripción paga",
    },
    FundamentalEvent {
        name: "subscription_renewed",
        description: "Renovación automática exitosa",
    },
    FundamentalEvent {
        name: "subscription_cancelled",
        description: "Usuario cancela su suscripción",
    },
    FundamentalEvent {
        name: "refund_issued",
        description: "Reembolso realizado al usuario",
    },
    FundamentalEvent {
        name: "session_started",
        description: "Inicio de sesión activa",
    },
    FundamentalEvent {
        name: "order_completed",
        description: "Pedido completado",
    },
];

/// All definitions in catalog order
pub fn definitions() -> &'static [MetricDefinition] {
    METRIC_DEFINITIONS
}

/// Look up a definition by key
///
/// Callers treat `None` as "metric not shown".
pub fn lookup(key: &str) -> Option<&'static MetricDefinition> {
    METRIC_DEFINITIONS.iter().find(|d| d.key == key)
}

/// Definitions of one category, in catalog order
pub fn by_category(category: MetricCategory) -> impl Iterator<Item = &'static MetricDefinition> {
    METRIC_DEFINITIONS
        .iter()
        .filter(move |d| d.category == category)
}

/// All metric keys in catalog order
pub fn keys() -> impl Iterator<Item = &'static str> {
    METRIC_DEFINITIONS.iter().map(|d| d.key)
}

pub fn fundamental_events() -> &'static [FundamentalEvent] {
    FUNDAMENTAL_EVENTS
}
