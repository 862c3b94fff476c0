//! System export: the automated order list, either as one CSV with a route
//! column or as a workbook with one sheet per route.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use calamine::{open_workbook_auto, Reader};

use routeplan_recon::config::ExportConfig;
use routeplan_recon::{RouteCounts, RouteKey, Snapshot};

use crate::error::IoError;
use crate::workbook::{find_column, range_rows};

/// Per-route customers and order counts read from the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportData {
    pub snapshot: Snapshot,
    /// Rows whose route key was blank or not one of the known routes.
    pub unrouted_orders: usize,
}

#[derive(Default)]
struct RouteAccumulator {
    customers: BTreeSet<String>,
    orders: usize,
}

fn finish(acc: BTreeMap<RouteKey, RouteAccumulator>) -> Snapshot {
    acc.into_iter()
        .map(|(route, a)| (route, RouteCounts { customers: a.customers.into_iter().collect(), orders: a.orders }))
        .collect()
}

/// Load the export. `.csv`/`.txt` go through the CSV reader, everything else
/// through the workbook reader.
pub fn load_export(path: &Path, config: &ExportConfig, routes: &[RouteKey]) -> Result<ExportData, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound { what: "export file", path: path.to_path_buf() });
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let data = match ext.as_str() {
        "csv" | "txt" | "tsv" => load_csv(path, config)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path, config, routes)?,
        other => return Err(IoError::Workbook(format!("unsupported export format: '.{other}'"))),
    };

    if data.unrouted_orders > 0 {
        log::warn!("{}: {} order(s) without a known route key ignored", path.display(), data.unrouted_orders);
    }
    for (route, counts) in &data.snapshot {
        log::info!("{route}: {} export orders, {} customers", counts.orders, counts.customers.len());
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, config: &ExportConfig) -> Result<ExportData, IoError> {
    let content = read_file_as_utf8(path)?;
    parse_csv(&content, config, path)
}

fn parse_csv(content: &str, config: &ExportConfig, path: &Path) -> Result<ExportData, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let customer_col = find_column(&headers, &config.customer_column).ok_or_else(|| IoError::MissingColumn {
        path: path.to_path_buf(),
        column: config.customer_column.clone(),
    })?;
    let route_col = find_column(&headers, &config.route_column).ok_or_else(|| IoError::MissingColumn {
        path: path.to_path_buf(),
        column: config.route_column.clone(),
    })?;

    let mut acc: BTreeMap<RouteKey, RouteAccumulator> = BTreeMap::new();
    let mut unrouted_orders = 0;
    let mut unknown_keys: BTreeSet<String> = BTreeSet::new();

    for record in reader.records() {
        let record = record?;
        let route_raw = record.get(route_col).unwrap_or("").trim();
        let Ok(route) = route_raw.parse::<RouteKey>() else {
            unrouted_orders += 1;
            if !route_raw.is_empty() {
                unknown_keys.insert(route_raw.to_string());
            }
            continue;
        };
        let entry = acc.entry(route).or_default();
        entry.orders += 1;
        let name = record.get(customer_col).unwrap_or("").trim();
        if !config.is_ignored(name) {
            entry.customers.insert(name.to_string());
        }
    }

    if !unknown_keys.is_empty() {
        let keys: Vec<&str> = unknown_keys.iter().map(String::as_str).collect();
        log::warn!("unknown route keys in export: {}", keys.join(", "));
    }

    Ok(ExportData { snapshot: finish(acc), unrouted_orders })
}

/// Pick the delimiter that splits the first lines most consistently.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t'];
    let sample_lines: Vec<&str> = content.lines().take(10).filter(|l| !l.trim().is_empty()).collect();

    let mut best = b',';
    let mut best_score = 0usize;
    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else { continue };
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

/// Read a text file as UTF-8, falling back to Windows-1252 (spreadsheet
/// exports often use it).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, config: &ExportConfig, routes: &[RouteKey]) -> Result<ExportData, IoError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IoError::Workbook(format!("cannot open {}: {e}", path.display())))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    // Not a single route sheet: almost certainly the wrong file.
    if !routes.iter().any(|r| sheet_names.contains(&config.sheet_for(*r))) {
        let expected: Vec<String> = routes.iter().map(|r| config.sheet_for(*r)).collect();
        return Err(IoError::MissingSheet { path: path.to_path_buf(), sheet: expected.join("', '") });
    }

    let mut acc: BTreeMap<RouteKey, RouteAccumulator> = BTreeMap::new();
    for route in routes {
        let sheet = config.sheet_for(*route);
        if !sheet_names.contains(&sheet) {
            log::warn!("{route}: export sheet '{sheet}' not found, treating as empty");
            continue;
        }
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| IoError::Workbook(format!("cannot read sheet '{sheet}': {e}")))?;
        let mut rows = range_rows(&range)
            .into_iter()
            .skip_while(|r| r.iter().all(|c| c.trim().is_empty()));
        let Some(headers) = rows.next() else {
            log::warn!("{route}: export sheet '{sheet}' is empty");
            continue;
        };

        let entry = acc.entry(*route).or_default();
        let customer_col = find_column(&headers, &config.customer_column);
        if customer_col.is_none() {
            log::warn!("{route}: export sheet '{sheet}' has no '{}' column", config.customer_column);
        }
        for row in rows.filter(|r| r.iter().any(|c| !c.trim().is_empty())) {
            entry.orders += 1;
            let name = customer_col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("");
            if !config.is_ignored(name) {
                entry.customers.insert(name.to_string());
            }
        }
    }

    Ok(ExportData { snapshot: finish(acc), unrouted_orders: 0 })
}
