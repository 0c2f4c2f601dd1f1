//! Exported results read back through the loader and recomputed.

use evm_report::loader::{load_path, read_csv};
use evm_report::output::{to_csv_writer, write_csv, write_document};
use evm_report::{compute, CurveType, EnrichedRecord, GlobalSettings, Session};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const INPUT: &str = "\
Project ID,Project Name,Department,Budget (BAC),Actual Cost (AC),Plan Start Date,Plan Finish Date,Data Date,Curve
P1,Bridge,Works,100000,40000,2024-01-01,2024-07-01,2024-04-01,linear
P2,Tunnel,Works,250000,90000,45292,45658,45444,
P3,Depot,Fleet,50000,0,01/15/2024,12/31/2024,2024-03-01,s-curve
P3,Depot,Fleet,50000,12000,01/15/2024,12/31/2024,2024-06-01,s-curve
P4,Yard,Fleet,,500,2024-01-01,,2024-02-01,
";

fn computed() -> Vec<EnrichedRecord> {
    let table = read_csv(INPUT.as_bytes()).unwrap().table;
    compute(&table, &GlobalSettings::default()).unwrap().records
}

fn close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => (x - y).abs() <= 1e-9 * x.abs().max(1.0),
        (None, None) => true,
        _ => false,
    }
}

fn assert_same(left: &[EnrichedRecord], right: &[EnrichedRecord]) {
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right) {
        assert_eq!(l.project_id, r.project_id);
        assert_eq!(l.project_name, r.project_name);
        assert_eq!(l.department, r.department);
        assert_eq!(
            (l.plan_start_date, l.plan_finish_date, l.data_date, l.likely_completion),
            (r.plan_start_date, r.plan_finish_date, r.data_date, r.likely_completion)
        );
        assert_eq!(l.curve, r.curve);
        let pairs = [
            (l.bac, r.bac),
            (l.ac, r.ac),
            (l.pv, r.pv),
            (l.ev, r.ev),
            (l.present_value, r.present_value),
            (l.cpi, r.cpi),
            (l.spi, r.spi),
            (l.tcpi, r.tcpi),
            (l.eac, r.eac),
            (l.es, r.es),
            (l.spie, r.spie),
            (l.ld, r.ld),
            (l.planned_value_project, r.planned_value_project),
            (l.likely_value_project, r.likely_value_project),
        ];
        for (i, (a, b)) in pairs.into_iter().enumerate() {
            assert!(close(a, b), "{}: metric #{i} differs: {a:?} vs {b:?}", l.project_id);
        }
    }
}

#[test]
fn csv_export_recomputes_to_the_same_results() {
    let records = computed();
    let mut buf = Vec::new();
    to_csv_writer(&mut buf, &records).unwrap();

    let text = String::from_utf8(buf.clone()).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("project_id,project_name,department,bac,ac,plan_start_date"));
    assert!(header.ends_with("percent_likely_value_project"));
    assert!(text.contains("P1,Bridge,Works,100000.0,40000.0,2024-01-01,2024-07-01,2024-04-01,linear"));

    let reloaded = read_csv(buf.as_slice()).unwrap().table;
    let again = compute(&reloaded, &GlobalSettings::default()).unwrap();
    assert_same(&records, &again.records);
}

#[test]
fn json_document_carries_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    let settings = GlobalSettings {
        curve: CurveType::Linear,
        inflation_rate: 5.0,
        ..GlobalSettings::default()
    };
    let table = read_csv(INPUT.as_bytes()).unwrap().table;
    let records = compute(&table, &settings).unwrap().records;
    write_document(&path, &records, Some(&settings)).unwrap();

    let loaded = load_path(&path).unwrap();
    assert_eq!(loaded.settings.as_ref(), Some(&settings));
    assert_eq!(loaded.report.total_rows, records.len());
    assert_eq!(loaded.table.headers[0], "project_id");

    let again = compute(&loaded.table, &settings).unwrap();
    assert_same(&records, &again.records);
}

#[test]
fn json_document_without_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.json");
    let records = computed();
    write_document(&path, &records, None).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("global_values"));
    let loaded = load_path(&path).unwrap();
    assert_eq!(loaded.settings, None);
}

#[test]
fn session_runs_from_a_file_on_disk() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("portfolio.csv");
    std::fs::write(&input, INPUT).unwrap();

    let loaded = load_path(&input).unwrap();
    assert_eq!(loaded.report.total_rows, 5);

    let mut session = Session::new();
    session.load_input(loaded.table);
    session.configure(GlobalSettings::default());
    let records = session.calculate().unwrap().records.clone();
    assert_same(&records, &computed());

    let out = dir.path().join("results.csv");
    write_csv(&out, &records).unwrap();
    let reloaded = load_path(&out).unwrap();
    assert_eq!(reloaded.report.total_rows, 5);
    // no row carries a manual value, but the column is recognized and kept
    assert!(reloaded.table.headers.contains(&"manual_ev".to_string()));
    assert!(!reloaded.report.dropped_columns.contains(&"manual_ev".to_string()));
}
