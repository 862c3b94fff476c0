//! Report workbooks for `rplan diff` and `rplan compare`.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use routeplan_recon::model::{Comparison, RouteSummary};

use crate::error::IoError;
use crate::fsutil::write_atomic;
use crate::workbook::add_sheet;

const SUMMARY_SHEET: &str = "Summary";
const DETAILS_SHEET: &str = "Details";

const DIFF_HEADERS: [&str; 10] = [
    "Route",
    "Planning Orders",
    "Export Orders",
    "Difference",
    "Planning Customers",
    "Export Customers",
    "Common Customers",
    "Missing",
    "Extra",
    "Status",
];

const COMPARISON_HEADERS: [&str; 10] = [
    "Route",
    "Export_Customers",
    "Planning_Before",
    "Planning_After",
    "Before_Matched",
    "After_Matched",
    "Before_Match_Rate",
    "After_Match_Rate",
    "Improvement",
    "New_Customers_Added",
];

const TOTAL_LABEL: &str = "TOTAL";

/// One typed report cell.
enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

fn header(ws: &mut Worksheet, headers: &[&str]) -> Result<(), IoError> {
    let bold = Format::new().set_bold();
    for (col, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *h, &bold)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn row(ws: &mut Worksheet, row: u32, cells: Vec<Cell>) -> Result<(), IoError> {
    for (col, cell) in cells.into_iter().enumerate() {
        match cell {
            Cell::Text(s) => ws.write_string(row, col as u16, s)?,
            Cell::Number(n) => ws.write_number(row, col as u16, n)?,
        };
    }
    Ok(())
}

fn percent(rate: f64) -> String {
    format!("{rate:.1}%")
}

fn save(book: &mut XlsxWorkbook, path: &Path) -> Result<(), IoError> {
    write_atomic(path, |tmp| {
        book.save(tmp)
            .map_err(|e| IoError::Write(format!("cannot save {}: {e}", path.display())))
    })
}

// ---------------------------------------------------------------------------
// Snapshot diff
// ---------------------------------------------------------------------------

fn route_label(route: Option<routeplan_recon::RouteKey>) -> String {
    route.map(|r| r.to_string()).unwrap_or_else(|| TOTAL_LABEL.to_string())
}

/// `Summary`, then `Details` when any route has discrepancies, then one sheet
/// per route with discrepancies.
pub fn write_diff_report(path: &Path, summaries: &[RouteSummary]) -> Result<(), IoError> {
    let mut book = XlsxWorkbook::new();

    let ws = add_sheet(&mut book, SUMMARY_SHEET)?;
    header(ws, &DIFF_HEADERS)?;
    for (i, s) in summaries.iter().enumerate() {
        let status = if s.in_lockstep() { "MATCH" } else { "MISMATCH" };
        row(
            ws,
            i as u32 + 1,
            vec![
                route_label(s.route).into(),
                s.planning_orders.into(),
                s.export_orders.into(),
                s.order_diff().into(),
                s.source_count.into(),
                s.target_count.into(),
                s.matched_count.into(),
                s.missing.len().into(),
                s.extra.len().into(),
                status.into(),
            ],
        )?;
    }

    let per_route: Vec<&RouteSummary> = summaries
        .iter()
        .filter(|s| s.route.is_some() && (!s.missing.is_empty() || !s.extra.is_empty()))
        .collect();

    if !per_route.is_empty() {
        let ws = add_sheet(&mut book, DETAILS_SHEET)?;
        header(ws, &["Route", "Customer", "Issue"])?;
        let mut r = 1;
        for s in &per_route {
            let label = route_label(s.route);
            let issues = s
                .missing
                .iter()
                .map(|c| (c, "Missing in planning"))
                .chain(s.extra.iter().map(|c| (c, "Not in export")));
            for (customer, issue) in issues {
                row(ws, r, vec![label.as_str().into(), customer.as_str().into(), issue.into()])?;
                r += 1;
            }
        }
    }

    for s in per_route {
        let Some(route) = s.route else { continue };
        let ws = add_sheet(&mut book, &route.title())?;
        header(ws, &["Type", "Customer"])?;
        let lines = s.missing.iter().map(|c| ("Missing", c)).chain(s.extra.iter().map(|c| ("Extra", c)));
        for (i, (kind, customer)) in lines.enumerate() {
            row(ws, i as u32 + 1, vec![kind.into(), customer.as_str().into()])?;
        }
    }

    save(&mut book, path)?;
    log::info!("diff report written to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Before/after comparison
// ---------------------------------------------------------------------------

/// `Summary` with the TOTAL row, then one detail sheet per route that has
/// export customers.
pub fn write_comparison_report(path: &Path, comparison: &Comparison) -> Result<(), IoError> {
    let mut book = XlsxWorkbook::new();

    let ws = add_sheet(&mut book, SUMMARY_SHEET)?;
    header(ws, &COMPARISON_HEADERS)?;
    for (i, c) in comparison.rows.iter().enumerate() {
        row(
            ws,
            i as u32 + 1,
            vec![
                route_label(c.route).into(),
                c.export_customers.into(),
                c.planning_before.into(),
                c.planning_after.into(),
                c.before_matched.into(),
                c.after_matched.into(),
                percent(c.before_rate).into(),
                percent(c.after_rate).into(),
                format!("{:+}", c.improvement()).into(),
                c.customers_added().into(),
            ],
        )?;
    }

    for route in comparison.rows.iter().filter_map(|c| c.route) {
        let details: Vec<_> = comparison.details.iter().filter(|d| d.route == route).collect();
        if details.is_empty() {
            continue;
        }
        let ws = add_sheet(&mut book, &route.title())?;
        header(ws, &["Export_Customer", "In_Planning_Before", "In_Planning_After", "Status"])?;
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        for (i, d) in details.iter().enumerate() {
            let status = if d.in_after { "Matched" } else { "Missing" };
            row(
                ws,
                i as u32 + 1,
                vec![
                    d.export_customer.as_str().into(),
                    yes_no(d.in_before).into(),
                    yes_no(d.in_after).into(),
                    status.into(),
                ],
            )?;
        }
    }

    save(&mut book, path)?;
    log::info!("comparison report written to {}", path.display());
    Ok(())
}
