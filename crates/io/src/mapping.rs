//! Mapping exchange file: the serialized result list handed from `match` to
//! `apply`. Columns: Route, Excel_Name, API_Name, Match_Score, Confidence,
//! Action, Notes.

use std::path::Path;

use routeplan_recon::{Action, Confidence, MatchResult, ReconError, RouteKey};

use crate::error::IoError;

pub const MAPPING_HEADERS: [&str; 7] =
    ["Route", "Excel_Name", "API_Name", "Match_Score", "Confidence", "Action", "Notes"];

/// Score cell text: "92.3%", or "0%" for results without a match.
pub fn format_score(result: &MatchResult) -> String {
    if result.confidence == Confidence::None {
        "0%".to_string()
    } else {
        format!("{:.1}%", result.score)
    }
}

/// Accepts "92.3%", "92.3" and blank (0).
pub fn parse_score(raw: &str) -> Result<f64, ReconError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if number.is_empty() {
        return Ok(0.0);
    }
    match number.parse::<f64>() {
        Ok(n) if (0.0..=100.0).contains(&n) => Ok(n),
        _ => Err(ReconError::InvalidScore(raw.to_string())),
    }
}

pub fn write_mapping(path: &Path, results: &[MatchResult]) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| IoError::Write(format!("cannot create {}: {e}", path.display())))?;
    writer.write_record(MAPPING_HEADERS)?;
    for r in results {
        let route = r.route.to_string();
        let score = format_score(r);
        writer.write_record([
            route.as_str(),
            r.source_name.as_str(),
            r.target_name.as_str(),
            score.as_str(),
            r.confidence.as_str(),
            r.action.as_str(),
            r.notes.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_mapping(path: &Path) -> Result<Vec<MatchResult>, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound { what: "mapping file", path: path.to_path_buf() });
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut cols = [0usize; 7];
    for (slot, name) in cols.iter_mut().zip(MAPPING_HEADERS) {
        *slot = headers.iter().position(|h| h.trim() == name).ok_or_else(|| IoError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?;
    }

    let mut results = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let field = |i: usize| record.get(cols[i]).unwrap_or("").trim();
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let wrap = |source: ReconError| IoError::Mapping { line, source };
        let route: RouteKey = field(0).parse().map_err(wrap)?;
        let score = parse_score(field(3)).map_err(wrap)?;
        let confidence: Confidence = field(4).parse().map_err(wrap)?;
        let action: Action = field(5).parse().map_err(wrap)?;

        let result = MatchResult {
            route,
            source_name: field(1).to_string(),
            target_name: field(2).to_string(),
            score,
            confidence,
            action,
            notes: field(6).to_string(),
        };
        result.check_names().map_err(wrap)?;
        results.push(result);
    }
    Ok(results)
}
