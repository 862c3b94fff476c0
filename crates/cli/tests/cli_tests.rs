// End-to-end tests for the `rplan` binary.
// Run with: cargo test -p routeplan-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;

fn rplan(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rplan"));
    cmd.current_dir(dir);
    cmd.env_remove("RPLAN_CONFIG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    rplan(dir).args(args).output().expect("run rplan")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Planning workbook with the Aalsmeer evening sheet and one unrelated sheet.
fn write_planning(path: &Path) {
    let mut book = Workbook::new();
    let ws = book.add_worksheet().set_name("Avond. Aalsmeer").unwrap();
    ws.write_string(0, 0, "Kar").unwrap();
    ws.write_string(0, 1, "Klantnaam").unwrap();
    for (i, name) in ["Zon Kwekerij", "Acme Bloemen", "Acme Bloemen"].iter().enumerate() {
        ws.write_number(i as u32 + 1, 0, (i + 1) as f64).unwrap();
        ws.write_string(i as u32 + 1, 1, *name).unwrap();
    }
    let ws = book.add_worksheet().set_name("Instructies").unwrap();
    ws.write_string(0, 0, "Niet wijzigen").unwrap();
    book.save(path).unwrap();
}

const EXPORT: &str = "\
Order,Customer Name,Route Key
1,Acme Bloemen B.V.,aalsmeer_evening
2,Acme Bloemen B.V.,aalsmeer_evening
3,Zon Kwekerij,aalsmeer_evening
4,Tulpenhof,aalsmeer_evening
5,Unknown,aalsmeer_evening
";

const CONFIG: &str = r#"routes = ["aalsmeer_evening"]"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_planning(&dir.path().join("planning.xlsx"));
        std::fs::write(dir.path().join("export.csv"), EXPORT).unwrap();
        std::fs::write(dir.path().join("routeplan.toml"), CONFIG).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        run(self.path(), args)
    }

    fn match_(&self) -> Output {
        self.run(&["match", "-p", "planning.xlsx", "-e", "export.csv", "-c", "routeplan.toml"])
    }

    fn backups(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains("_BACKUP_"))
            .collect()
    }
}

fn customers(path: &Path) -> Vec<String> {
    let mut book = open_workbook_auto(path).unwrap();
    let range = book.worksheet_range("Avond. Aalsmeer").unwrap();
    range
        .rows()
        .skip(1)
        .filter_map(|r| match r.get(1) {
            Some(Data::String(s)) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// match
// ---------------------------------------------------------------------------

#[test]
fn match_writes_mapping_file() {
    let fx = Fixture::new();
    let output = fx.match_();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let mapping = std::fs::read_to_string(fx.file("mapping.csv")).unwrap();
    let mut lines = mapping.lines();
    assert_eq!(lines.next(), Some("Route,Excel_Name,API_Name,Match_Score,Confidence,Action,Notes"));
    assert!(mapping.contains("ADD_TO_EXCEL"));
    assert!(mapping.contains("Tulpenhof"));
    assert!(!mapping.contains("Unknown"));
    assert!(stderr(&output).contains("wrote mapping.csv"));
}

#[test]
fn match_json_reports_stats() {
    let fx = Fixture::new();
    let output = fx.run(&["match", "-p", "planning.xlsx", "-e", "export.csv", "-c", "routeplan.toml", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let results = json["results"].as_array().unwrap();
    assert_eq!(json["stats"]["total"].as_u64().unwrap() as usize, results.len());
    assert_eq!(json["stats"]["add_to_excel"], 1);
    assert!(results.iter().all(|r| r["route"] == "aalsmeer_evening"));
}

#[test]
fn bad_threshold_order_is_a_usage_error() {
    let fx = Fixture::new();
    let output = fx.run(&[
        "match", "-p", "planning.xlsx", "-e", "export.csv", "--threshold-high", "50", "--threshold-medium", "80",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("error:"));
}

#[test]
fn broken_config_is_a_usage_error() {
    let fx = Fixture::new();
    std::fs::write(fx.file("broken.toml"), "routes = [\"westland_evening\"]").unwrap();
    let output = fx.run(&["match", "-p", "planning.xlsx", "-e", "export.csv", "-c", "broken.toml"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("westland_evening"));
}

#[test]
fn missing_planning_file_exits_1_with_hint() {
    let fx = Fixture::new();
    let output = fx.run(&["match", "-p", "absent.xlsx", "-e", "export.csv"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("not found"));
    assert!(err.contains("hint:"));
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

#[test]
fn apply_with_yes_updates_workbook() {
    let fx = Fixture::new();
    assert!(fx.match_().status.success());

    let output = fx.run(&["apply", "-p", "planning.xlsx", "-m", "mapping.csv", "-c", "routeplan.toml", "--yes"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(fx.backups().len(), 1);

    let names = customers(&fx.file("planning.xlsx"));
    assert_eq!(names, vec!["Acme Bloemen B.V.", "Acme Bloemen B.V.", "Tulpenhof", "Zon Kwekerij"]);

    let mut book = open_workbook_auto(fx.file("planning.xlsx")).unwrap();
    assert_eq!(book.sheet_names().to_vec(), vec!["Avond. Aalsmeer", "Instructies", "Changes_Log"]);
    let log = book.worksheet_range("Changes_Log").unwrap();
    assert_eq!(log.get_value((0, 0)), Some(&Data::String("Route".into())));
    assert_eq!(log.height(), 3);
}

#[test]
fn apply_without_confirmation_leaves_workbook_unchanged() {
    let fx = Fixture::new();
    assert!(fx.match_().status.success());
    let before = std::fs::read(fx.file("planning.xlsx")).unwrap();

    // stdin is closed, so the prompt cannot be answered with "yes"
    let output = fx.run(&["apply", "-p", "planning.xlsx", "-m", "mapping.csv", "-c", "routeplan.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(std::fs::read(fx.file("planning.xlsx")).unwrap(), before);
    assert_eq!(fx.backups().len(), 1);
}

#[test]
fn apply_to_separate_output() {
    let fx = Fixture::new();
    assert!(fx.match_().status.success());
    let before = std::fs::read(fx.file("planning.xlsx")).unwrap();

    let output = fx.run(&[
        "apply", "-p", "planning.xlsx", "-m", "mapping.csv", "-c", "routeplan.toml", "-o", "updated.xlsx", "-y",
        "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read(fx.file("planning.xlsx")).unwrap(), before);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert!(report["output"].as_str().unwrap().ends_with("updated.xlsx"));
    assert!(customers(&fx.file("updated.xlsx")).contains(&"Tulpenhof".to_string()));
}

#[test]
fn apply_rejects_corrupt_mapping() {
    let fx = Fixture::new();
    std::fs::write(
        fx.file("mapping.csv"),
        "Route,Excel_Name,API_Name,Match_Score,Confidence,Action,Notes\naalsmeer_evening,A,B,95%,HIGH,DELETE,\n",
    )
    .unwrap();
    let output = fx.run(&["apply", "-p", "planning.xlsx", "-m", "mapping.csv", "-y"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("mapping line 2"));
    assert!(fx.backups().is_empty());
}

// ---------------------------------------------------------------------------
// diff / compare
// ---------------------------------------------------------------------------

#[test]
fn diff_writes_report() {
    let fx = Fixture::new();
    let output = fx.run(&["diff", "-p", "planning.xlsx", "-e", "export.csv", "-c", "routeplan.toml", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["planning_orders"], 3);
    assert_eq!(rows[0]["export_orders"], 5);
    assert!(stderr(&output).contains("MISMATCH"));

    let book = open_workbook_auto(fx.file("route_diff.xlsx")).unwrap();
    assert_eq!(book.sheet_names().to_vec(), vec!["Summary", "Details", "Aalsmeer Evening"]);
}

#[test]
fn compare_backup_against_updated_workbook() {
    let fx = Fixture::new();
    assert!(fx.match_().status.success());
    assert!(fx.run(&["apply", "-p", "planning.xlsx", "-m", "mapping.csv", "-c", "routeplan.toml", "-y"]).status.success());
    let backup = fx.backups().pop().unwrap();

    let output = fx.run(&[
        "compare",
        "-e",
        "export.csv",
        "--before",
        backup.to_str().unwrap(),
        "--after",
        "planning.xlsx",
        "-c",
        "routeplan.toml",
        "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let route = &json["rows"][0];
    assert_eq!(route["export_customers"], 3);
    assert_eq!(route["after_matched"], 3);
    assert!(route["after_matched"].as_u64() > route["before_matched"].as_u64());
    assert!(fx.file("comparison.xlsx").exists());
}
