use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Aalsmeer,
    Naaldwijk,
    Rijnsburg,
}

impl Site {
    pub const ALL: [Site; 3] = [Site::Aalsmeer, Site::Naaldwijk, Site::Rijnsburg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aalsmeer => "aalsmeer",
            Self::Naaldwijk => "naaldwijk",
            Self::Rijnsburg => "rijnsburg",
        }
    }

    /// "aalsmeer" → "Aalsmeer".
    pub fn title(&self) -> String {
        capitalize(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }
}

/// Partition identifier: one site on one shift. Matching never crosses routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub site: Site,
    pub shift: Shift,
}

impl RouteKey {
    pub const ALL: [RouteKey; 6] = [
        RouteKey::new(Site::Aalsmeer, Shift::Morning),
        RouteKey::new(Site::Aalsmeer, Shift::Evening),
        RouteKey::new(Site::Naaldwijk, Shift::Morning),
        RouteKey::new(Site::Naaldwijk, Shift::Evening),
        RouteKey::new(Site::Rijnsburg, Shift::Morning),
        RouteKey::new(Site::Rijnsburg, Shift::Evening),
    ];

    pub const fn new(site: Site, shift: Shift) -> Self {
        Self { site, shift }
    }

    /// "aalsmeer_evening" → "Aalsmeer Evening". Used for report sheet titles.
    pub fn title(&self) -> String {
        format!("{} {}", self.site.title(), capitalize(self.shift.as_str()))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.site.as_str(), self.shift.as_str())
    }
}

impl FromStr for RouteKey {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        RouteKey::ALL
            .into_iter()
            .find(|r| r.to_string() == key)
            .ok_or_else(|| ReconError::UnknownRoute(s.to_string()))
    }
}

impl Serialize for RouteKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    /// The manually maintained planning workbook.
    Planning,
    /// The automated system export.
    Export,
}

/// A customer name exactly as read from its originating dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub raw_name: String,
    pub route: RouteKey,
    pub source: Source,
}

impl CustomerRecord {
    pub fn new(raw_name: impl Into<String>, route: RouteKey, source: Source) -> Self {
        Self { raw_name: raw_name.into(), route, source }
    }
}

/// Per-route customer name lists, deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub planning: Vec<String>,
    pub export: Vec<String>,
}

/// Customer names and order (row) count for one route of one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteCounts {
    /// Trimmed, distinct, sorted raw names.
    pub customers: Vec<String>,
    pub orders: usize,
}

/// One source as seen by the aggregator: counts per route.
pub type Snapshot = BTreeMap<RouteKey, RouteCounts>;

/// Flatten a snapshot into records for the matcher.
pub fn records_from(snapshot: &Snapshot, source: Source) -> Vec<CustomerRecord> {
    snapshot
        .iter()
        .flat_map(|(route, counts)| {
            counts.customers.iter().map(move |name| CustomerRecord::new(name.as_str(), *route, source))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub source_name: String,
    pub target_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    UpdateExcel,
    AddToExcel,
    Review,
    ManualReview,
    NotInApi,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateExcel => "UPDATE_EXCEL",
            Self::AddToExcel => "ADD_TO_EXCEL",
            Self::Review => "REVIEW",
            Self::ManualReview => "MANUAL_REVIEW",
            Self::NotInApi => "NOT_IN_API",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UPDATE_EXCEL" => Ok(Self::UpdateExcel),
            "ADD_TO_EXCEL" => Ok(Self::AddToExcel),
            "REVIEW" => Ok(Self::Review),
            "MANUAL_REVIEW" => Ok(Self::ManualReview),
            "NOT_IN_API" => Ok(Self::NotInApi),
            other => Err(ReconError::InvalidAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "NONE" | "" => Ok(Self::None),
            other => Err(ReconError::ConfigValidation(format!("unknown confidence '{other}'"))),
        }
    }
}

/// One classified pairing. The unit of work for the update applier and the
/// unit of row in the mapping exchange file.
///
/// `source_name` is the planning-side name (empty for `AddToExcel`),
/// `target_name` the export-side name (empty for `NotInApi`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub route: RouteKey,
    pub source_name: String,
    pub target_name: String,
    pub score: f64,
    pub confidence: Confidence,
    pub action: Action,
    pub notes: String,
}

impl MatchResult {
    /// Names must be present or absent as the action says: NOT_IN_API has no
    /// export name, ADD_TO_EXCEL no planning name, every other action both.
    pub fn check_names(&self) -> Result<(), ReconError> {
        let has_source = !self.source_name.trim().is_empty();
        let has_target = !self.target_name.trim().is_empty();
        let problem = match self.action {
            Action::NotInApi if has_target => Some("carries an export name"),
            Action::NotInApi if !has_source => Some("has no planning name"),
            Action::AddToExcel if has_source => Some("carries a planning name"),
            Action::AddToExcel if !has_target => Some("has no export name"),
            Action::NotInApi | Action::AddToExcel => None,
            _ if !has_source || !has_target => Some("needs both a planning and an export name"),
            _ => None,
        };
        match problem {
            Some(problem) => Err(ReconError::InconsistentResult(format!("{} {problem}", self.action.as_str()))),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Update applier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Updated,
    Added,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "UPDATED",
            Self::Added => "ADDED",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UPDATED" => Ok(Self::Updated),
            "ADDED" => Ok(Self::Added),
            other => Err(ReconError::InvalidAction(other.to_string())),
        }
    }
}

/// Append-only audit record of one mutation the applier performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeLogEntry {
    pub route: RouteKey,
    pub action: ChangeAction,
    pub old_name: String,
    pub new_name: String,
    pub rows_affected: usize,
}

/// One planning sheet held in memory: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    pub headers: Vec<String>,
    /// Index into each row of the customer-name column.
    pub customer_col: usize,
    pub rows: Vec<Vec<String>>,
}

impl RouteTable {
    pub fn new(headers: Vec<String>, customer_col: usize, rows: Vec<Vec<String>>) -> Self {
        Self { headers, customer_col, rows }
    }

    /// Customer cell of `row`, or "" when the row is shorter than the column.
    pub fn customer<'a>(&self, row: &'a [String]) -> &'a str {
        row.get(self.customer_col).map(String::as_str).unwrap_or("")
    }

    /// Distinct trimmed non-empty customer names, sorted.
    pub fn customer_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| self.customer(r).trim())
            .filter(|name| !is_blank_name(name))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain([self.headers.len(), self.customer_col + 1])
            .max()
            .unwrap_or(0)
    }
}

/// Blank cells include the literal "nan" spreadsheet exports leave behind.
pub fn is_blank_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Snapshot diff for one route (or the TOTAL row when `route` is `None`).
///
/// Customer lists hold sorted normalized names. `missing` are export customers
/// the planning source lacks, `extra` are planning customers absent from the
/// export. The TOTAL row concatenates the per-route lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub route: Option<RouteKey>,
    pub planning_orders: usize,
    pub export_orders: usize,
    pub source_count: usize,
    pub target_count: usize,
    pub matched_count: usize,
    pub match_rate: f64,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl RouteSummary {
    /// Export orders minus planning orders.
    pub fn order_diff(&self) -> i64 {
        self.export_orders as i64 - self.planning_orders as i64
    }

    pub fn in_lockstep(&self) -> bool {
        self.order_diff() == 0
    }
}

/// Before/after comparison row for one route (or TOTAL when `route` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub route: Option<RouteKey>,
    pub export_customers: usize,
    pub planning_before: usize,
    pub planning_after: usize,
    pub before_matched: usize,
    pub after_matched: usize,
    pub before_rate: f64,
    pub after_rate: f64,
}

impl ComparisonRow {
    pub fn improvement(&self) -> i64 {
        self.after_matched as i64 - self.before_matched as i64
    }

    pub fn customers_added(&self) -> i64 {
        self.planning_after as i64 - self.planning_before as i64
    }
}

/// Presence of one export customer in each planning snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonDetail {
    pub route: RouteKey,
    pub export_customer: String,
    pub in_before: bool,
    pub in_after: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Per-route rows followed by the TOTAL row.
    pub rows: Vec<ComparisonRow>,
    pub details: Vec<ComparisonDetail>,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub total: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub not_in_api: usize,
    pub add_to_excel: usize,
    pub update_excel: usize,
    pub needs_review: usize,
}
