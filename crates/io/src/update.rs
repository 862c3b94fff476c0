//! The update run: backup, plan, confirm, commit, save.
//!
//! Order matters. The backup is durable before anything else happens, a
//! declined confirmation returns [`UpdateOutcome::Cancelled`] with the
//! primary file untouched, and the final write goes through
//! [`write_atomic`] so a crash mid-save never leaves a half-written workbook.
//!
//! Single writer: nothing guards against two runs on the same file.

use std::path::{Path, PathBuf};

use serde::Serialize;

use routeplan_recon::apply::{self, ApplyOptions, ApplyPlan};
use routeplan_recon::{ChangeLogEntry, MatchResult, ReconConfig, RouteKey};

use crate::error::IoError;
use crate::fsutil::{create_backup, write_atomic};
use crate::workbook::{load_planning, save_planning};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub apply: ApplyOptions,
    /// Ask `confirm` before committing. When false the plan is committed
    /// without asking.
    pub review_required: bool,
    /// Write here instead of replacing the input workbook.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub backup: PathBuf,
    pub output: PathBuf,
    /// Entries added by this run.
    pub entries: Vec<ChangeLogEntry>,
    /// Changes in the plan, including ones that turned out to be no-ops.
    pub planned: usize,
    pub missing_routes: Vec<RouteKey>,
}

impl UpdateReport {
    pub fn rows_affected(&self) -> usize {
        self.entries.iter().map(|e| e.rows_affected).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied(UpdateReport),
    /// Confirmation declined. The backup exists; nothing else was written.
    Cancelled { backup: PathBuf },
}

/// Apply `results` to the planning workbook at `planning_path`.
///
/// `confirm` sees the plan and decides whether to proceed; it is only
/// called when `opts.review_required` is set.
pub fn run_update<F>(
    planning_path: &Path,
    results: &[MatchResult],
    config: &ReconConfig,
    opts: &UpdateOptions,
    confirm: F,
) -> Result<UpdateOutcome, IoError>
where
    F: FnOnce(&ApplyPlan) -> bool,
{
    let mut workbook = load_planning(planning_path, config)?;
    let backup = create_backup(planning_path)?;

    let plan = apply::plan(&workbook.dataset, results, opts.apply);
    log::info!("{} change(s) planned", plan.len());

    if opts.review_required && !confirm(&plan) {
        log::info!("update cancelled, {} left unchanged", planning_path.display());
        return Ok(UpdateOutcome::Cancelled { backup });
    }

    let entries = apply::commit(&mut workbook.dataset, &plan);
    workbook.change_log.extend(entries.iter().cloned());

    let output = opts.output.clone().unwrap_or_else(|| planning_path.to_path_buf());
    write_atomic(&output, |tmp| save_planning(&workbook, tmp))?;
    log::info!("{} change(s) written to {}", entries.len(), output.display());

    Ok(UpdateOutcome::Applied(UpdateReport {
        backup,
        output,
        entries,
        planned: plan.len(),
        missing_routes: workbook.missing_routes,
    }))
}
