//! Planning workbook: one sheet per route, read into a [`Dataset`] and written
//! back with every other sheet preserved.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use routeplan_recon::apply::Dataset;
use routeplan_recon::config::PlanningConfig;
use routeplan_recon::{ChangeAction, ChangeLogEntry, ReconConfig, RouteCounts, RouteKey, RouteTable, Snapshot};

use crate::error::IoError;

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME: usize = 31;

pub const CHANGES_LOG_SHEET: &str = "Changes_Log";
const CHANGES_LOG_HEADERS: [&str; 5] = ["Route", "Action", "Old_Name", "New_Name", "Rows_Affected"];

/// Cut a sheet title to the first 31 characters.
pub fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME).collect()
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Cell text as the planning sheets present it. Whole floats drop their
/// decimals so numeric IDs survive a round trip. Dates and times become ISO
/// text, which [`write_cell`] turns back into date cells.
pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) if dt.is_datetime() => {
            serial_to_text(dt.as_f64()).unwrap_or_else(|| format_number(dt.as_f64()))
        }
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_TEXT: &str = "%Y-%m-%d";
const DATETIME_TEXT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_TEXT: &str = "%H:%M:%S";
const SECONDS_PER_DAY: f64 = 86_400.0;

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0)).unwrap_or_default()
}

/// Excel serial (days since 1899-12-30, fraction is the time of day) as ISO
/// text: a bare time below one day, a bare date at midnight, else both.
fn serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || !(0.0..3_000_000.0).contains(&serial) {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    let dt = excel_epoch().checked_add_signed(Duration::seconds(seconds))?;
    let text = if serial < 1.0 {
        dt.format(TIME_TEXT)
    } else if dt.num_seconds_from_midnight() == 0 {
        dt.format(DATE_TEXT)
    } else {
        dt.format(DATETIME_TEXT)
    };
    Some(text.to_string())
}

/// ISO text back to an Excel serial and the number format to show it with.
fn parse_temporal(value: &str) -> Option<(f64, &'static str)> {
    let days = |dt: NaiveDateTime| (dt - excel_epoch()).num_seconds() as f64 / SECONDS_PER_DAY;
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DATETIME_TEXT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
    {
        return Some((days(dt), "yyyy-mm-dd hh:mm:ss"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_TEXT) {
        return Some((days(date.and_hms_opt(0, 0, 0)?), "yyyy-mm-dd"));
    }
    if let Ok(time) = NaiveTime::parse_from_str(value, TIME_TEXT) {
        return Some((time.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY, "hh:mm:ss"));
    }
    None
}

/// Range as text rows, anchored at A1 so cell positions survive a rewrite.
/// Trailing all-blank rows are dropped.
pub(crate) fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_text));
        rows.push(cells);
    }
    while rows.last().is_some_and(|r| r.iter().all(|c| c.trim().is_empty())) {
        rows.pop();
    }
    rows
}

/// First header containing any hint (case-insensitive substring).
pub(crate) fn find_customer_column(headers: &[String], hints: &[String]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.to_lowercase();
        hints.iter().map(|hint| hint.trim().to_lowercase()).any(|hint| !hint.is_empty() && h.contains(&hint))
    })
}

/// Exact header lookup, ignoring case and surrounding whitespace.
pub(crate) fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
}

/// The table starts at the first non-blank row; its index is returned so the
/// sheet can be written back at the same offset.
fn route_table(sheet: &str, rows: Vec<Vec<String>>, planning: &PlanningConfig) -> (RouteTable, usize) {
    let header_row = rows.iter().take_while(|r| r.iter().all(|c| c.trim().is_empty())).count();
    let mut rows = rows.into_iter().skip(header_row);
    let Some(headers) = rows.next() else {
        log::warn!("sheet '{sheet}' is empty");
        return (RouteTable::default(), 0);
    };
    let rows: Vec<Vec<String>> = rows.collect();
    let customer_col = find_customer_column(&headers, &planning.customer_hints).unwrap_or_else(|| {
        log::warn!("sheet '{sheet}': no customer column found, using the first column");
        0
    });
    (RouteTable::new(headers, customer_col, rows), header_row)
}

fn parse_change_log(rows: &[Vec<String>]) -> Vec<ChangeLogEntry> {
    let Some((headers, data)) = rows.split_first() else { return Vec::new() };
    let cols: Vec<Option<usize>> = CHANGES_LOG_HEADERS.iter().map(|h| find_column(headers, h)).collect();
    let cell = |row: &[String], i: usize| -> String {
        cols[i].and_then(|c| row.get(c)).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let mut entries = Vec::new();
    for (idx, row) in data.iter().enumerate() {
        let row = row.as_slice();
        let parsed = (|| {
            let route: RouteKey = cell(row, 0).parse().ok()?;
            let action: ChangeAction = cell(row, 1).parse().ok()?;
            let rows_affected = cell(row, 4).parse::<f64>().ok().filter(|n| *n >= 0.0)? as usize;
            Some(ChangeLogEntry { route, action, old_name: cell(row, 2), new_name: cell(row, 3), rows_affected })
        })();
        match parsed {
            Some(entry) => entries.push(entry),
            None if row.iter().all(|c| c.trim().is_empty()) => {}
            None => log::warn!("{CHANGES_LOG_SHEET} row {}: unreadable entry, dropped", idx + 2),
        }
    }
    entries
}

#[derive(Debug, Clone, PartialEq)]
enum SheetSlot {
    Route { route: RouteKey, name: String, header_row: usize },
    Other { name: String, rows: Vec<Vec<String>> },
}

/// A planning workbook held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningWorkbook {
    /// Route sheets that were found.
    pub dataset: Dataset,
    /// Audit log read from an existing `Changes_Log` sheet, plus new entries.
    pub change_log: Vec<ChangeLogEntry>,
    /// Configured routes whose sheet was absent.
    pub missing_routes: Vec<RouteKey>,
    slots: Vec<SheetSlot>,
}

impl PlanningWorkbook {
    /// Customer names and row counts per loaded route.
    pub fn snapshot(&self) -> Snapshot {
        self.dataset
            .iter()
            .map(|(route, table)| {
                (*route, RouteCounts { customers: table.customer_names(), orders: table.rows.len() })
            })
            .collect()
    }

    pub fn sheet_name(&self, route: RouteKey) -> Option<&str> {
        self.slots.iter().find_map(|slot| match slot {
            SheetSlot::Route { route: r, name, .. } if *r == route => Some(name.as_str()),
            _ => None,
        })
    }

    /// Names of sheets carried through unchanged.
    pub fn passthrough_sheets(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                SheetSlot::Other { name, .. } => Some(name.as_str()),
                SheetSlot::Route { .. } => None,
            })
            .collect()
    }
}

/// Read every configured route sheet. Missing sheets are reported in
/// `missing_routes` with a warning, not as an error.
pub fn load_planning(path: &Path, config: &ReconConfig) -> Result<PlanningWorkbook, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound { what: "planning workbook", path: path.to_path_buf() });
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IoError::Workbook(format!("cannot open {}: {e}", path.display())))?;

    let route_sheets: BTreeMap<String, RouteKey> =
        config.routes.iter().map(|route| (config.planning.sheet_for(*route), *route)).collect();

    let mut dataset = Dataset::new();
    let mut change_log = Vec::new();
    let mut slots = Vec::new();

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| IoError::Workbook(format!("cannot read sheet '{name}': {e}")))?;
        let rows = range_rows(&range);

        if let Some(route) = route_sheets.get(&name) {
            let (table, header_row) = route_table(&name, rows, &config.planning);
            log::info!("{route}: loaded sheet '{name}' ({} rows)", table.rows.len());
            dataset.insert(*route, table);
            slots.push(SheetSlot::Route { route: *route, name, header_row });
        } else if name == CHANGES_LOG_SHEET {
            change_log = parse_change_log(&rows);
        } else {
            slots.push(SheetSlot::Other { name, rows });
        }
    }

    let mut missing_routes = Vec::new();
    for route in &config.routes {
        if !dataset.contains_key(route) {
            log::warn!(
                "{route}: sheet '{}' not found in {}, treating as empty",
                config.planning.sheet_for(*route),
                path.display()
            );
            missing_routes.push(*route);
        }
    }

    Ok(PlanningWorkbook { dataset, change_log, missing_routes, slots })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn cell_pos(row: usize, col: usize) -> Result<(u32, u16), IoError> {
    let r = u32::try_from(row).map_err(|_| IoError::Write(format!("row {row} out of range")))?;
    let c = u16::try_from(col).map_err(|_| IoError::Write(format!("column {col} out of range")))?;
    Ok((r, c))
}

/// Write one cell. Text that reads back as the same number is written as a
/// number, ISO dates and times as formatted date cells; blanks are skipped.
pub(crate) fn write_cell(ws: &mut Worksheet, row: usize, col: usize, value: &str) -> Result<(), IoError> {
    if value.is_empty() {
        return Ok(());
    }
    let (r, c) = cell_pos(row, col)?;
    if let Some((serial, num_format)) = parse_temporal(value) {
        ws.write_number_with_format(r, c, serial, &Format::new().set_num_format(num_format))?;
        return Ok(());
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && format_number(n) == value => ws.write_number(r, c, n)?,
        _ => ws.write_string(r, c, value)?,
    };
    Ok(())
}

pub(crate) fn write_row<S: AsRef<str>>(ws: &mut Worksheet, row: usize, cells: &[S]) -> Result<(), IoError> {
    for (col, value) in cells.iter().enumerate() {
        write_cell(ws, row, col, value.as_ref())?;
    }
    Ok(())
}

pub(crate) fn add_sheet<'a>(book: &'a mut XlsxWorkbook, name: &str) -> Result<&'a mut Worksheet, IoError> {
    book.add_worksheet()
        .set_name(truncate_sheet_name(name))
        .map_err(|e| IoError::Write(format!("cannot create sheet '{name}': {e}")))
}

/// Write the workbook to `path`: sheets in their original order, route
/// sheets from the dataset, then `Changes_Log` when it has entries.
pub fn save_planning(workbook: &PlanningWorkbook, path: &Path) -> Result<(), IoError> {
    let mut book = XlsxWorkbook::new();

    for slot in &workbook.slots {
        match slot {
            SheetSlot::Route { route, name, header_row } => {
                let ws = add_sheet(&mut book, name)?;
                if let Some(table) = workbook.dataset.get(route) {
                    write_row(ws, *header_row, &table.headers)?;
                    for (i, row) in table.rows.iter().enumerate() {
                        write_row(ws, header_row + 1 + i, row)?;
                    }
                }
            }
            SheetSlot::Other { name, rows } => {
                let ws = add_sheet(&mut book, name)?;
                for (i, row) in rows.iter().enumerate() {
                    write_row(ws, i, row)?;
                }
            }
        }
    }

    if !workbook.change_log.is_empty() {
        let ws = add_sheet(&mut book, CHANGES_LOG_SHEET)?;
        write_row(ws, 0, &CHANGES_LOG_HEADERS)?;
        for (i, entry) in workbook.change_log.iter().enumerate() {
            let route = entry.route.to_string();
            write_row(ws, i + 1, &[route.as_str(), entry.action.as_str(), entry.old_name.as_str(), entry.new_name.as_str()])?;
            let (r, c) = cell_pos(i + 1, 4)?;
            ws.write_number(r, c, entry.rows_affected as f64)?;
        }
    }

    book.save(path)
        .map_err(|e| IoError::Write(format!("cannot save {}: {e}", path.display())))
}
