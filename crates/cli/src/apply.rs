//! `rplan apply`: mapping file into the planning workbook.

use std::path::{Path, PathBuf};

use dialoguer::Input;

use routeplan_io::{read_mapping, run_update, UpdateOptions, UpdateOutcome};
use routeplan_recon::{ApplyOptions, ApplyPlan, ChangeAction};

use crate::exit_codes::EXIT_CANCELLED;
use crate::{load_config, print_json, CliError, ConfigArgs};

pub fn cmd_apply(
    planning_path: &Path,
    mapping_path: &Path,
    output: Option<PathBuf>,
    include_review: bool,
    yes: bool,
    config_args: &ConfigArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_args)?;
    let results = read_mapping(mapping_path)?;

    let opts = UpdateOptions {
        apply: ApplyOptions { include_review },
        review_required: !yes,
        output,
    };

    let mut prompt_error = None;
    let outcome = run_update(planning_path, &results, &config, &opts, |plan| match confirm(plan) {
        Ok(answer) => answer,
        Err(e) => {
            prompt_error = Some(e);
            false
        }
    })?;
    if let Some(e) = prompt_error {
        return Err(e);
    }

    match outcome {
        UpdateOutcome::Cancelled { backup } => Err(CliError {
            code: EXIT_CANCELLED,
            message: "update cancelled, workbook unchanged".into(),
            hint: Some(format!("backup kept at {}", backup.display())),
        }),
        UpdateOutcome::Applied(report) => {
            if json {
                print_json(&report)?;
            }
            let updated = report.entries.iter().filter(|e| e.action == ChangeAction::Updated).count();
            let added = report.entries.len() - updated;
            eprintln!(
                "{} rename(s), {} addition(s), {} row(s) affected",
                updated,
                added,
                report.rows_affected()
            );
            if !report.missing_routes.is_empty() {
                let routes: Vec<String> = report.missing_routes.iter().map(|r| r.to_string()).collect();
                eprintln!("routes without a planning sheet: {}", routes.join(", "));
            }
            eprintln!("backup: {}", report.backup.display());
            eprintln!("wrote {}", report.output.display());
            Ok(())
        }
    }
}

/// Show the plan and ask. Only "yes" or "y" proceeds.
fn confirm(plan: &ApplyPlan) -> Result<bool, CliError> {
    if plan.is_empty() {
        eprintln!("no changes to apply");
        return Ok(true);
    }

    eprintln!("{} change(s) planned:", plan.len());
    for line in plan.preview() {
        eprintln!("  {line}");
    }

    let answer: String = Input::new()
        .with_prompt("Proceed with these changes? (yes/no)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| {
            CliError::runtime(format!("cannot read confirmation: {e}"))
                .with_hint("pass --yes to apply without prompting")
        })?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}
