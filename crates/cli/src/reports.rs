//! `rplan diff` and `rplan compare`.

use std::path::Path;

use routeplan_io::{load_export, load_planning, write_comparison_report, write_diff_report};
use routeplan_recon::aggregate::{compare_before_after, snapshot_diff};
use routeplan_recon::model::RouteSummary;

use crate::{load_config, print_json, CliError, ConfigArgs};

fn label(route: Option<routeplan_recon::RouteKey>) -> String {
    route.map(|r| r.to_string()).unwrap_or_else(|| "TOTAL".to_string())
}

pub fn cmd_diff(
    planning_path: &Path,
    export_path: &Path,
    output: &Path,
    config_args: &ConfigArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_args)?;
    let planning = load_planning(planning_path, &config)?;
    let export = load_export(export_path, &config.export, &config.routes)?;

    let summaries = snapshot_diff(&config.routes, &planning.snapshot(), &export.snapshot);
    write_diff_report(output, &summaries)?;

    if json {
        print_json(&summaries)?;
    }

    for s in &summaries {
        eprintln!("{}", diff_line(s));
    }
    eprintln!("wrote {}", output.display());
    Ok(())
}

fn diff_line(s: &RouteSummary) -> String {
    format!(
        "{:<18} orders {:>4} / {:<4} ({:+})  customers {:>3} / {:<3} common {:>3}  missing {} extra {}  {}",
        label(s.route),
        s.planning_orders,
        s.export_orders,
        s.order_diff(),
        s.source_count,
        s.target_count,
        s.matched_count,
        s.missing.len(),
        s.extra.len(),
        if s.in_lockstep() { "MATCH" } else { "MISMATCH" },
    )
}

pub fn cmd_compare(
    export_path: &Path,
    before_path: &Path,
    after_path: &Path,
    output: &Path,
    config_args: &ConfigArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_args)?;
    let export = load_export(export_path, &config.export, &config.routes)?;
    let before = load_planning(before_path, &config)?;
    let after = load_planning(after_path, &config)?;

    let comparison = compare_before_after(&config.routes, &export.snapshot, &before.snapshot(), &after.snapshot());
    write_comparison_report(output, &comparison)?;

    if json {
        print_json(&comparison)?;
    }

    for row in &comparison.rows {
        eprintln!(
            "{:<18} {:>3} export customers  before {:>3} ({:.1}%)  after {:>3} ({:.1}%)  {:+}",
            label(row.route),
            row.export_customers,
            row.before_matched,
            row.before_rate,
            row.after_matched,
            row.after_rate,
            row.improvement(),
        );
    }
    eprintln!("wrote {}", output.display());
    Ok(())
}
