//! Update applier: turns classified results into renames and inserts on the
//! planning dataset.
//!
//! Split into a pure [`plan`] step (what would change, with preview lines)
//! and a [`commit`] step that mutates. Both are deterministic; applying the
//! same results twice logs nothing the second time.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{is_blank_name, Action, ChangeAction, ChangeLogEntry, MatchResult, RouteKey, RouteTable};

/// Planning dataset held in memory: one table per route.
pub type Dataset = BTreeMap<RouteKey, RouteTable>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Also apply `REVIEW` results as renames. `MANUAL_REVIEW` and
    /// `NOT_IN_API` are never applied.
    pub include_review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlannedOp {
    Rename { old_name: String, new_name: String },
    Add { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub route: RouteKey,
    #[serde(flatten)]
    pub op: PlannedOp,
    /// Source action, so previews can flag opted-in reviews.
    pub action: Action,
}

impl PlannedChange {
    pub fn preview(&self) -> String {
        let tag = if self.action == Action::Review { " (review)" } else { "" };
        match &self.op {
            PlannedOp::Rename { old_name, new_name } => {
                format!("rename {}: '{old_name}' -> '{new_name}'{tag}", self.route)
            }
            PlannedOp::Add { name } => format!("add    {}: '{name}'", self.route),
        }
    }
}

/// Intended mutations, in result order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyPlan {
    pub changes: Vec<PlannedChange>,
}

impl ApplyPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn preview(&self) -> Vec<String> {
        self.changes.iter().map(PlannedChange::preview).collect()
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Select the applicable results. Results for routes missing from the
/// dataset are skipped with a warning.
pub fn plan(dataset: &Dataset, results: &[MatchResult], opts: ApplyOptions) -> ApplyPlan {
    let mut changes = Vec::new();
    let mut skipped: BTreeMap<RouteKey, usize> = BTreeMap::new();

    for r in results {
        let op = match r.action {
            Action::UpdateExcel => rename_op(r),
            Action::Review if opts.include_review => rename_op(r),
            Action::AddToExcel if !r.target_name.trim().is_empty() => {
                Some(PlannedOp::Add { name: r.target_name.trim().to_string() })
            }
            _ => None,
        };
        let Some(op) = op else { continue };

        if !dataset.contains_key(&r.route) {
            *skipped.entry(r.route).or_default() += 1;
            continue;
        }
        changes.push(PlannedChange { route: r.route, op, action: r.action });
    }

    for (route, count) in skipped {
        log::warn!("{route}: no planning sheet loaded, skipping {count} change(s)");
    }

    ApplyPlan { changes }
}

fn rename_op(r: &MatchResult) -> Option<PlannedOp> {
    let old_name = r.source_name.trim();
    let new_name = r.target_name.trim();
    if old_name.is_empty() || new_name.is_empty() || old_name == new_name {
        return None;
    }
    Some(PlannedOp::Rename { old_name: old_name.to_string(), new_name: new_name.to_string() })
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Apply `plan` to `dataset` and sort every table. Returns one log entry per
/// mutation actually performed.
pub fn commit(dataset: &mut Dataset, plan: &ApplyPlan) -> Vec<ChangeLogEntry> {
    let mut log_entries = Vec::new();

    for change in &plan.changes {
        let Some(table) = dataset.get_mut(&change.route) else { continue };
        match &change.op {
            PlannedOp::Rename { old_name, new_name } => {
                let rows_affected = rename_rows(table, old_name, new_name);
                if rows_affected > 0 {
                    log::debug!("{}: renamed '{old_name}' -> '{new_name}' ({rows_affected} rows)", change.route);
                    log_entries.push(ChangeLogEntry {
                        route: change.route,
                        action: ChangeAction::Updated,
                        old_name: old_name.clone(),
                        new_name: new_name.clone(),
                        rows_affected,
                    });
                }
            }
            PlannedOp::Add { name } => {
                if add_row(table, name) {
                    log::debug!("{}: added '{name}'", change.route);
                    log_entries.push(ChangeLogEntry {
                        route: change.route,
                        action: ChangeAction::Added,
                        old_name: String::new(),
                        new_name: name.clone(),
                        rows_affected: 1,
                    });
                } else {
                    log::debug!("{}: '{name}' already present, not added", change.route);
                }
            }
        }
    }

    for table in dataset.values_mut() {
        sort_rows(table);
    }

    log_entries
}

/// Plan and commit in one step.
pub fn apply(
    mut dataset: Dataset,
    results: &[MatchResult],
    opts: ApplyOptions,
) -> (Dataset, Vec<ChangeLogEntry>) {
    let plan = plan(&dataset, results, opts);
    let log_entries = commit(&mut dataset, &plan);
    (dataset, log_entries)
}

/// Rename every row whose trimmed customer cell equals `old_name`.
fn rename_rows(table: &mut RouteTable, old_name: &str, new_name: &str) -> usize {
    let col = table.customer_col;
    let mut count = 0;
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(col) {
            if cell.trim() == old_name {
                *cell = new_name.to_string();
                count += 1;
            }
        }
    }
    count
}

/// Append a row for `name` unless one exists (case-insensitive, trimmed).
fn add_row(table: &mut RouteTable, name: &str) -> bool {
    let wanted = name.trim().to_lowercase();
    if table.rows.iter().any(|row| table.customer(row).trim().to_lowercase() == wanted) {
        return false;
    }
    let mut row = vec![String::new(); table.width()];
    row[table.customer_col] = name.to_string();
    table.rows.push(row);
    true
}

/// Blank customer rows first in their original order, then the rest sorted
/// case-insensitively by customer name (stable).
pub fn sort_rows(table: &mut RouteTable) {
    let col = table.customer_col;

    let (mut blank, mut named): (Vec<_>, Vec<_>) =
        std::mem::take(&mut table.rows).into_iter().partition(|row| is_blank_name(cell(row, col)));
    named.sort_by_cached_key(|row| cell(row, col).trim().to_lowercase());

    blank.append(&mut named);
    table.rows = blank;
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}
