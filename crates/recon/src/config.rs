use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Confidence, RouteKey, Shift};
use crate::scorer::ScorerKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration, usually read from `routeplan.toml`. Every section is
/// optional; an empty document yields the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteKey>,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            scorer: ScorerConfig::default(),
            routes: default_routes(),
            planning: PlanningConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

fn default_routes() -> Vec<RouteKey> {
    RouteKey::ALL.to_vec()
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Confidence cutoffs on the 0–100 score scale.
///
/// `min_score` is the matcher cutoff: candidates scoring below it are not
/// considered matches at all. It defaults to `medium`, which leaves the LOW
/// tier empty; lowering it opens up `MANUAL_REVIEW` results.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
    #[serde(default)]
    pub min_score: Option<f64>,
}

fn default_high() -> f64 {
    90.0
}

fn default_medium() -> f64 {
    70.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { high: default_high(), medium: default_medium(), min_score: None }
    }
}

impl Thresholds {
    pub fn new(high: f64, medium: f64) -> Self {
        Self { high, medium, min_score: None }
    }

    /// Matcher cutoff.
    pub fn cutoff(&self) -> f64 {
        self.min_score.unwrap_or(self.medium)
    }

    /// Tier for a score that already passed the matcher cutoff.
    pub fn confidence(&self, score: f64) -> Confidence {
        if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (label, value) in [("high", Some(self.high)), ("medium", Some(self.medium)), ("min_score", self.min_score)] {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    return Err(ReconError::ConfigValidation(format!(
                        "threshold {label} must be within 0..=100, got {v}"
                    )));
                }
            }
        }
        if self.medium > self.high {
            return Err(ReconError::ConfigValidation(format!(
                "threshold medium ({}) exceeds high ({})",
                self.medium, self.high
            )));
        }
        if self.cutoff() > self.medium {
            return Err(ReconError::ConfigValidation(format!(
                "min_score ({}) exceeds medium ({})",
                self.cutoff(),
                self.medium
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    #[serde(default)]
    pub kind: ScorerKind,
}

// ---------------------------------------------------------------------------
// Planning workbook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanningConfig {
    /// Sheet-name overrides per route; routes not listed use the defaults.
    #[serde(default)]
    pub sheets: BTreeMap<RouteKey, String>,
    /// Case-insensitive substrings identifying the customer column header.
    #[serde(default = "default_customer_hints")]
    pub customer_hints: Vec<String>,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self { sheets: BTreeMap::new(), customer_hints: default_customer_hints() }
    }
}

fn default_customer_hints() -> Vec<String> {
    ["customer", "klant", "client", "naam", "name"].iter().map(|s| s.to_string()).collect()
}

impl PlanningConfig {
    /// Evening sheets are "Avond. <Site>", morning sheets just "<Site>".
    pub fn sheet_for(&self, route: RouteKey) -> String {
        if let Some(name) = self.sheets.get(&route) {
            return name.clone();
        }
        let site = route.site.title();
        match route.shift {
            Shift::Evening => format!("Avond. {site}"),
            Shift::Morning => site,
        }
    }
}

// ---------------------------------------------------------------------------
// System export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    #[serde(default = "default_customer_column")]
    pub customer_column: String,
    #[serde(default = "default_route_column")]
    pub route_column: String,
    /// Placeholder customer names dropped on load (case-insensitive).
    #[serde(default = "default_ignore_names")]
    pub ignore_names: Vec<String>,
    /// Sheet-name overrides per route when the export is a workbook.
    #[serde(default)]
    pub sheets: BTreeMap<RouteKey, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            customer_column: default_customer_column(),
            route_column: default_route_column(),
            ignore_names: default_ignore_names(),
            sheets: BTreeMap::new(),
        }
    }
}

fn default_customer_column() -> String {
    "Customer Name".into()
}

fn default_route_column() -> String {
    "Route Key".into()
}

fn default_ignore_names() -> Vec<String> {
    vec!["Unknown".into(), "nan".into()]
}

impl ExportConfig {
    /// Default sheet title is "<Site> <Shift>", e.g. "Aalsmeer Evening".
    pub fn sheet_for(&self, route: RouteKey) -> String {
        self.sheets.get(&route).cloned().unwrap_or_else(|| route.title())
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        let name = name.trim();
        name.is_empty() || self.ignore_names.iter().any(|n| n.trim().eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line threshold overrides, then re-validate.
    pub fn with_overrides(
        mut self,
        high: Option<f64>,
        medium: Option<f64>,
        min_score: Option<f64>,
    ) -> Result<Self, ReconError> {
        if let Some(h) = high {
            self.thresholds.high = h;
        }
        if let Some(m) = medium {
            self.thresholds.medium = m;
        }
        if min_score.is_some() {
            self.thresholds.min_score = min_score;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.thresholds.validate()?;

        if self.routes.is_empty() {
            return Err(ReconError::ConfigValidation("at least one route is required".into()));
        }
        let mut seen = BTreeSet::new();
        for route in &self.routes {
            if !seen.insert(*route) {
                return Err(ReconError::ConfigValidation(format!("route '{route}' listed twice")));
            }
        }

        if self.planning.customer_hints.iter().all(|h| h.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "planning.customer_hints must contain at least one non-empty hint".into(),
            ));
        }
        if self.export.customer_column.trim().is_empty() || self.export.route_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "export.customer_column and export.route_column must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
