use routeplan_recon::aggregate::{compare_before_after, snapshot_diff};
use routeplan_recon::apply::{apply, plan, sort_rows, ApplyOptions, Dataset};
use routeplan_recon::engine::run;
use routeplan_recon::model::records_from;
use routeplan_recon::{
    normalize, Action, ChangeAction, Confidence, CustomerRecord, ReconConfig, RouteCounts, RouteKey, RouteTable,
    Shift, Site, Snapshot, Source,
};

const AALSMEER_EVE: RouteKey = RouteKey::new(Site::Aalsmeer, Shift::Evening);
const NAALDWIJK_EVE: RouteKey = RouteKey::new(Site::Naaldwijk, Shift::Evening);

fn snapshot(entries: &[(RouteKey, &[&str])]) -> Snapshot {
    entries
        .iter()
        .map(|(route, names)| {
            let customers = names.iter().map(|s| s.to_string()).collect();
            (*route, RouteCounts { customers, orders: names.len() })
        })
        .collect()
}

fn planning_table(names: &[&str]) -> RouteTable {
    RouteTable::new(
        vec!["Klantnaam".into(), "Kar".into()],
        0,
        names.iter().map(|n| vec![n.to_string(), "K1".into()]).collect(),
    )
}

// -------------------------------------------------------------------------
// Matching
// -------------------------------------------------------------------------

#[test]
fn normalize_example() {
    assert_eq!(normalize("ACME Bloemen B.V."), "acme bloemen");
}

#[test]
fn high_confidence_match_becomes_update() {
    let records = vec![
        CustomerRecord::new("Acme Bloemen", AALSMEER_EVE, Source::Planning),
        CustomerRecord::new("ACME Bloemen B.V.", AALSMEER_EVE, Source::Export),
        CustomerRecord::new("Other Co", AALSMEER_EVE, Source::Export),
    ];
    let result = run(&ReconConfig::default(), &records);

    let acme = result.results.iter().find(|r| r.source_name == "Acme Bloemen").unwrap();
    assert_eq!(acme.target_name, "ACME Bloemen B.V.");
    assert!(acme.score >= 90.0);
    assert_eq!(acme.action, Action::UpdateExcel);
    assert_eq!(acme.confidence, Confidence::High);

    let leftover = result.results.iter().find(|r| r.target_name == "Other Co").unwrap();
    assert_eq!(leftover.action, Action::AddToExcel);
    assert!(leftover.source_name.is_empty());
}

#[test]
fn unmatched_source_is_not_in_api() {
    let records = vec![
        CustomerRecord::new("Unknown Florist", AALSMEER_EVE, Source::Planning),
        CustomerRecord::new("ACME Bloemen B.V.", AALSMEER_EVE, Source::Export),
    ];
    let result = run(&ReconConfig::default(), &records);
    let florist = result.results.iter().find(|r| r.source_name == "Unknown Florist").unwrap();
    assert_eq!(florist.action, Action::NotInApi);
    assert_eq!(florist.score, 0.0);
    assert!(florist.target_name.is_empty());
    assert_eq!(florist.confidence, Confidence::None);
}

#[test]
fn action_invariants_hold_for_every_result() {
    let planning = snapshot(&[
        (AALSMEER_EVE, &["Acme Bloemen", "Kwekerij de Zon", "Bloemenhuis Jansen", "Nobody"][..]),
        (NAALDWIJK_EVE, &["Westland Plant", "Acme"][..]),
    ]);
    let export = snapshot(&[
        (AALSMEER_EVE, &["ACME Bloemen B.V.", "Zon Kwekerij", "Jansen Bloemenhuis Aalsmeer", "Fresh Co"][..]),
        (NAALDWIJK_EVE, &["Westland Plants BV"][..]),
    ]);
    let mut records = records_from(&planning, Source::Planning);
    records.extend(records_from(&export, Source::Export));

    let config = ReconConfig::from_toml("[thresholds]\nmin_score = 40\n").unwrap();
    let result = run(&config, &records);

    for r in &result.results {
        match r.action {
            Action::NotInApi => assert!(r.target_name.is_empty()),
            Action::AddToExcel => assert!(r.source_name.is_empty()),
            _ => assert!(!r.source_name.is_empty() && !r.target_name.is_empty()),
        }
        assert_eq!(r.confidence == Confidence::None, matches!(r.action, Action::NotInApi | Action::AddToExcel));
        assert!(r.check_names().is_ok(), "{r:?}");
        // Route consistency: each side's name comes from its own route.
        if !r.source_name.is_empty() {
            assert!(planning[&r.route].customers.contains(&r.source_name));
        }
        if !r.target_name.is_empty() {
            assert!(export[&r.route].customers.contains(&r.target_name));
        }
    }

    let planning_total: usize = planning.values().map(|c| c.customers.len()).sum();
    let with_source = result.results.iter().filter(|r| !r.source_name.is_empty()).count();
    assert_eq!(with_source, planning_total);
    assert_eq!(result.stats.total, result.results.len());
}

#[test]
fn run_serializes_with_action_labels() {
    let records = vec![
        CustomerRecord::new("Acme", AALSMEER_EVE, Source::Planning),
        CustomerRecord::new("Acme", AALSMEER_EVE, Source::Export),
    ];
    let result = run(&ReconConfig::default(), &records);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["results"][0]["action"], "UPDATE_EXCEL");
    assert_eq!(json["results"][0]["route"], "aalsmeer_evening");
    assert_eq!(json["stats"]["update_excel"], 1);
}

// -------------------------------------------------------------------------
// Match → apply → compare
// -------------------------------------------------------------------------

#[test]
fn end_to_end_apply_then_compare() {
    let export = snapshot(&[(AALSMEER_EVE, &["ACME Bloemen B.V.", "New Customer", "Zon Kwekerij"])]);
    let before = snapshot(&[(AALSMEER_EVE, &["Acme Bloemen", "Unknown Florist", "Zon Kwekerij"])]);

    let mut records = records_from(&before, Source::Planning);
    records.extend(records_from(&export, Source::Export));
    let matched = run(&ReconConfig::default(), &records);

    let mut dataset = Dataset::new();
    dataset.insert(AALSMEER_EVE, planning_table(&["Zon Kwekerij", "Acme Bloemen", "", "Unknown Florist"]));

    let (dataset, log) = apply(dataset, &matched.results, ApplyOptions::default());
    assert!(log.iter().any(|e| e.action == ChangeAction::Updated && e.new_name == "ACME Bloemen B.V."));
    assert!(log.iter().any(|e| e.action == ChangeAction::Added && e.new_name == "New Customer"));

    let names: Vec<&str> = dataset[&AALSMEER_EVE].rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, vec!["", "ACME Bloemen B.V.", "New Customer", "Unknown Florist", "Zon Kwekerij"]);

    let after: Snapshot = dataset
        .iter()
        .map(|(route, table)| {
            (*route, RouteCounts { customers: table.customer_names(), orders: table.rows.len() })
        })
        .collect();
    let cmp = compare_before_after(&[AALSMEER_EVE], &export, &before, &after);
    let row = &cmp.rows[0];
    assert_eq!(row.before_matched, 2);
    assert_eq!(row.after_matched, 3);
    assert_eq!(row.improvement(), 1);
    assert_eq!(row.customers_added(), 1);
}

#[test]
fn apply_twice_is_idempotent() {
    let export = snapshot(&[(AALSMEER_EVE, &["ACME Bloemen B.V.", "New Customer"])]);
    let before = snapshot(&[(AALSMEER_EVE, &["Acme Bloemen"])]);
    let mut records = records_from(&before, Source::Planning);
    records.extend(records_from(&export, Source::Export));
    let matched = run(&ReconConfig::default(), &records);

    let mut dataset = Dataset::new();
    dataset.insert(AALSMEER_EVE, planning_table(&["Acme Bloemen", "Acme Bloemen"]));

    let (once, first) = apply(dataset, &matched.results, ApplyOptions::default());
    let (twice, second) = apply(once.clone(), &matched.results, ApplyOptions::default());

    let added_first: usize =
        first.iter().filter(|e| e.action == ChangeAction::Added).map(|e| e.rows_affected).sum();
    assert_eq!(added_first, 1);
    assert_eq!(first.iter().find(|e| e.action == ChangeAction::Updated).unwrap().rows_affected, 2);
    assert!(second.is_empty());
    assert_eq!(once, twice);
}

#[test]
fn plan_does_not_mutate() {
    let mut dataset = Dataset::new();
    dataset.insert(AALSMEER_EVE, planning_table(&["b", "a"]));
    let snapshot_before = dataset.clone();
    let records = vec![CustomerRecord::new("c", AALSMEER_EVE, Source::Export)];
    let matched = run(&ReconConfig::default(), &records);
    let p = plan(&dataset, &matched.results, ApplyOptions::default());
    assert_eq!(p.len(), 1);
    assert_eq!(dataset, snapshot_before);

    let mut table = dataset.remove(&AALSMEER_EVE).unwrap();
    sort_rows(&mut table);
    assert_eq!(table.rows[0][0], "a");
}

// -------------------------------------------------------------------------
// Snapshot diff
// -------------------------------------------------------------------------

#[test]
fn snapshot_diff_lockstep_and_mismatch() {
    let planning = snapshot(&[(AALSMEER_EVE, &["Acme BV", "Zon"]), (NAALDWIJK_EVE, &["Plant"])]);
    let export = snapshot(&[(AALSMEER_EVE, &["ACME", "Zon"]), (NAALDWIJK_EVE, &["Plant", "Extra"])]);
    let rows = snapshot_diff(&[AALSMEER_EVE, NAALDWIJK_EVE], &planning, &export);

    assert_eq!(rows.len(), 3);
    assert!(rows[0].in_lockstep());
    assert!(rows[0].missing.is_empty() && rows[0].extra.is_empty());
    assert_eq!(rows[1].missing, vec!["extra"]);
    assert_eq!(rows[1].order_diff(), 1);
    assert_eq!(rows[2].route, None);
    assert_eq!(rows[2].matched_count, 3);
}

#[test]
fn before_after_example_rates() {
    let names: Vec<String> = (1..=10).map(|i| format!("Kweker {}", char::from(b'A' + i as u8))).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let export = snapshot(&[(AALSMEER_EVE, &refs[..])]);
    let before = snapshot(&[(AALSMEER_EVE, &refs[..6])]);
    let after = snapshot(&[(AALSMEER_EVE, &refs[..9])]);

    let cmp = compare_before_after(&[AALSMEER_EVE], &export, &before, &after);
    let total = cmp.rows.last().unwrap();
    assert_eq!(total.route, None);
    assert_eq!(total.before_rate, 60.0);
    assert_eq!(total.after_rate, 90.0);
    assert_eq!(total.improvement(), 3);
}
