//! `rplan match`: planning vs export matching, written to a mapping file.

use std::path::Path;

use routeplan_io::{load_export, load_planning, write_mapping};
use routeplan_recon::model::records_from;
use routeplan_recon::{run, MatchRun, Source};

use crate::{load_config, print_json, ConfigArgs, CliError};

pub fn cmd_match(
    planning_path: &Path,
    export_path: &Path,
    output: &Path,
    config_args: &ConfigArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_args)?;

    let planning = load_planning(planning_path, &config)?;
    let export = load_export(export_path, &config.export, &config.routes)?;

    let mut records = records_from(&planning.snapshot(), Source::Planning);
    records.extend(records_from(&export.snapshot, Source::Export));

    let result = run(&config, &records);
    write_mapping(output, &result.results)?;

    if json {
        print_json(&result)?;
    }

    print_summary(&result, config.routes.len());
    eprintln!("wrote {}", output.display());
    Ok(())
}

fn print_summary(result: &MatchRun, routes: usize) {
    let s = &result.stats;
    eprintln!("matched {} route(s) with {}: {} results", routes, result.scorer, s.total);
    eprintln!(
        "  confidence: {} high, {} medium, {} low",
        s.high_confidence, s.medium_confidence, s.low_confidence
    );
    eprintln!(
        "  actions:    {} update, {} add, {} review, {} not in export",
        s.update_excel, s.add_to_excel, s.needs_review, s.not_in_api
    );
}
