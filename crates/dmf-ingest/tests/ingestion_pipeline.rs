//! Directory ingestion in dependency order, against the in-memory
//! repository and scratch directories.

use std::path::Path;

use dmf_core::metadata::props;
use dmf_core::{ErrorKind, ObjectId, Principal, PropertyValue};
use dmf_ingest::{ArtifactSet, DependencyIngestionResolver, IngestOptions, IngestReport};
use dmf_repository::{Connection, InMemoryRepository, Repository, RepositoryCall, Session};

const TARGET: &str = "/Shared/SorbentFit";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connect() -> Connection<InMemoryRepository> {
    init_tracing();
    let user = Principal::new("alice").unwrap();
    let repo = InMemoryRepository::new(user.clone()).unwrap();
    Connection::new(repo, Session::new(user, Principal::new("admin").unwrap()))
}

/// Write a complete artifact set with `inputs` input files.
fn write_set(dir: &Path, key: &str, deps: &[&str], inputs: usize) {
    let config = format!(
        "# SorbentFit configuration {key}\n# {}\n\
         # timestep (s) | relative convergence tolerance | absolute convergence tolerance\n\
         0.5 1e-4 1e-6\n",
        deps.join(" ")
    );
    std::fs::write(dir.join(format!("config{key}.txt")), config).unwrap();

    let mut filelist = format!("# inputs for {key}\n# {inputs}\n");
    for i in 0..inputs {
        let name = format!("input{key}_{i}.txt");
        filelist.push_str(&format!("{i:<5}{name}\n"));
        std::fs::write(dir.join(&name), format!("raw data {key} {i}\n")).unwrap();
        std::fs::write(
            dir.join(format!("data{key}_{i}.txt")),
            format!("co2 h2o temp time x y\n1 2 300 0 0 0.1\n3 1 310 {} 0 0.2\n", 10 * (i + 1)),
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("filelist{key}.txt")), filelist).unwrap();

    std::fs::write(
        dir.join(format!("optresults{key}.txt")),
        format!("results {key}\nnv\n12 0.25 0.75\nThe Final Parameters are as Follows:\n[best] (1.5)\n"),
    )
    .unwrap();
}

fn ingest(conn: &Connection<InMemoryRepository>, dir: &Path) -> IngestReport {
    DependencyIngestionResolver::default().ingest(conn, dir)
}

fn set<'a>(report: &'a IngestReport, key: &str) -> &'a ArtifactSet {
    report.sets.iter().find(|s| s.key() == key).unwrap()
}

fn document_properties(conn: &Connection<InMemoryRepository>, name: &str) -> dmf_core::PropertyMap {
    conn.repository()
        .get_object_by_path(&format!("{TARGET}/{name}"))
        .unwrap()
        .into_document()
        .unwrap()
        .properties
}

fn parents(conn: &Connection<InMemoryRepository>, name: &str) -> Vec<String> {
    document_properties(conn, name)
        .get(props::PARENTS)
        .and_then(PropertyValue::as_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

fn position(created: &[String], name: &str) -> usize {
    let path = format!("{TARGET}/{name}");
    created.iter().position(|p| *p == path).unwrap()
}

// ── Ordering ────────────────────────────────────────────────────────

#[test]
fn test_chain_is_materialized_dependencies_first() {
    let dir = tempfile::tempdir().unwrap();
    // Keys sort as X < Y < Z, the reverse of dependency order.
    write_set(dir.path(), "X", &["Y"], 1);
    write_set(dir.path(), "Y", &["Z"], 1);
    write_set(dir.path(), "Z", &[], 2);

    let conn = connect();
    let report = ingest(&conn, dir.path());
    assert!(report.status.is_success(), "{}", report.status.detail());

    let created = conn.repository().created_documents();
    assert_eq!(created.len(), 5 + 5 + 7);
    assert!(position(&created, "optresultsZ.txt") < position(&created, "inputY_0.txt"));
    assert!(position(&created, "optresultsY.txt") < position(&created, "inputX_0.txt"));

    let y_id = set(&report, "Y").object_id().unwrap().to_string();
    assert_eq!(parents(&conn, "configX.txt"), vec![y_id]);
    assert!(parents(&conn, "configZ.txt").is_empty());
    assert_eq!(report.status.object_id(), set(&report, "Z").object_id());
}

#[test]
fn test_set_file_order_and_parents() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "1", &[], 2);
    let conn = connect();
    let report = ingest(&conn, dir.path());
    assert!(report.status.is_success(), "{}", report.status.detail());

    let names: Vec<String> = conn
        .repository()
        .created_documents()
        .iter()
        .map(|p| p.trim_start_matches("/Shared/SorbentFit/").to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "input1_0.txt",
            "input1_1.txt",
            "filelist1.txt",
            "config1.txt",
            "data1_0.txt",
            "data1_1.txt",
            "optresults1.txt",
        ]
    );

    let id_of = |name: &str| -> String {
        conn.repository()
            .get_object_by_path(&format!("{TARGET}/{name}"))
            .unwrap()
            .id()
            .bare()
            .to_string()
    };
    assert_eq!(parents(&conn, "filelist1.txt"), vec![id_of("input1_0.txt"), id_of("input1_1.txt")]);
    assert_eq!(parents(&conn, "data1_1.txt"), vec![id_of("filelist1.txt"), id_of("config1.txt")]);
    assert_eq!(
        parents(&conn, "optresults1.txt"),
        vec![
            id_of("filelist1.txt"),
            id_of("config1.txt"),
            id_of("data1_0.txt"),
            id_of("data1_1.txt"),
        ]
    );
    assert_eq!(
        set(&report, "1").object_id().map(ObjectId::to_string),
        Some(id_of("optresults1.txt"))
    );

    let output = document_properties(&conn, "optresults1.txt");
    assert_eq!(output.get("sbf_o:NumberOfIterations"), Some(&PropertyValue::Integer(12)));
    assert_eq!(output.get("sbf_o:nv"), Some(&PropertyValue::Decimal(1.5)));
    let config = document_properties(&conn, "config1.txt");
    assert_eq!(config.get("sbf_c:Timestep"), Some(&PropertyValue::Decimal(0.5)));
}

#[test]
fn test_sorbentfit_layout_uploads_every_results_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(
        root.join("config1389.txt"),
        "# SorbentFit configuration\n#\n# timestep (s) | relative convergence tolerance | absolute convergence tolerance\n1 1e-4 1e-6\n",
    )
    .unwrap();
    std::fs::write(
        root.join("filelist1389.txt"),
        "# list of data files\n# 2\n1    dry_run.csv\n2    humid_run.csv\n",
    )
    .unwrap();
    std::fs::write(root.join("dry_run.csv"), "t,co2\n0,0.1\n").unwrap();
    std::fs::write(root.join("humid_run.csv"), "t,co2,h2o\n0,0.1,0.02\n").unwrap();
    for i in 0..2 {
        std::fs::write(
            root.join(format!("data1389_{i}.txt")),
            "co2\th2o\ttemp\ttime\tx\ty\n1\t0\t300\t0\t0\t0.1\n2\t0\t305\t30\t0\t0.2\n",
        )
        .unwrap();
    }
    std::fs::write(
        root.join("optresults1389.txt"),
        "SorbentFit results\nnv|dH\n40 0.01 0.09\nThe Final Parameters are as Follows:\n[best] (2.5, -60000)\n",
    )
    .unwrap();
    assert!(!root.join("data1389_2.txt").exists());

    let conn = connect();
    let report = ingest(&conn, root);
    assert!(report.status.is_success(), "{}", report.status.detail());

    let id_of = |name: &str| -> String {
        conn.repository()
            .get_object_by_path(&format!("{TARGET}/{name}"))
            .unwrap()
            .id()
            .bare()
            .to_string()
    };
    let set_parents = vec![id_of("filelist1389.txt"), id_of("config1389.txt")];
    assert_eq!(parents(&conn, "data1389_0.txt"), set_parents);
    assert_eq!(parents(&conn, "data1389_1.txt"), set_parents);
    assert_eq!(
        parents(&conn, "optresults1389.txt"),
        vec![
            id_of("filelist1389.txt"),
            id_of("config1389.txt"),
            id_of("data1389_0.txt"),
            id_of("data1389_1.txt"),
        ]
    );
    assert_eq!(
        parents(&conn, "filelist1389.txt"),
        vec![id_of("dry_run.csv"), id_of("humid_run.csv")]
    );
}

#[test]
fn test_shared_dependency_is_uploaded_once() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "base", &[], 1);
    write_set(dir.path(), "left", &["base"], 1);
    write_set(dir.path(), "right", &["base"], 1);

    let conn = connect();
    let report = ingest(&conn, dir.path());
    assert!(report.status.is_success(), "{}", report.status.detail());
    assert!(!conn
        .repository()
        .calls()
        .iter()
        .any(|c| matches!(c, RepositoryCall::CheckOut(_))));

    let base = set(&report, "base").object_id().unwrap().to_string();
    assert_eq!(parents(&conn, "configleft.txt"), vec![base.clone()]);
    assert_eq!(parents(&conn, "configright.txt"), vec![base]);
}

// ── Reruns ──────────────────────────────────────────────────────────

#[test]
fn test_rerun_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "1", &[], 1);
    write_set(dir.path(), "2", &["1"], 1);
    let conn = connect();
    let first = ingest(&conn, dir.path());
    assert!(first.status.is_success());
    conn.repository().clear_calls();

    let second = ingest(&conn, dir.path());
    assert!(second.status.is_success(), "{}", second.status.detail());
    assert_eq!(second.status.object_id(), first.status.object_id());
    assert!(!conn.repository().calls().iter().any(|c| matches!(
        c,
        RepositoryCall::CreateDocument(_) | RepositoryCall::CheckIn(_)
    )));
    assert!(second
        .status
        .detail()
        .contains("config2.txt: is identical to /Shared/SorbentFit/config2.txt. No action performed."));
}

#[test]
fn test_changed_dependency_is_checked_in() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "1", &[], 1);
    let conn = connect();
    assert!(ingest(&conn, dir.path()).status.is_success());

    std::fs::write(dir.path().join("input1_0.txt"), "corrected raw data\n").unwrap();
    let report = ingest(&conn, dir.path());
    assert!(report.status.is_success());
    assert!(report
        .status
        .detail()
        .contains("input1_0.txt: file exists in /Shared/SorbentFit/ and its content has been updated."));
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn test_failed_dependency_stops_dependents() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "A", &["B"], 1);
    write_set(dir.path(), "B", &[], 1);
    std::fs::write(dir.path().join("dataB_0.txt"), "header\n1 2 3\n").unwrap();

    let conn = connect();
    let report = ingest(&conn, dir.path());
    assert_eq!(report.status.error_kind(), Some(ErrorKind::ParseFailure));
    assert!(report.status.detail().contains("dataB_0.txt: Failed with error: "));
    assert!(!set(&report, "A").has_created());
    assert!(!set(&report, "B").has_created());
    assert!(conn
        .repository()
        .created_documents()
        .iter()
        .all(|p| !p.contains("A")));
}

#[test]
fn test_cycle_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "1", &["2"], 1);
    write_set(dir.path(), "2", &["1"], 1);

    let conn = connect();
    let status = DependencyIngestionResolver::default().ingest_directory(&conn, dir.path());
    assert!(!status.is_success());
    assert_eq!(status.message(), "dependency cycle: 1 -> 2 -> 1");
    assert!(conn.repository().created_documents().is_empty());
}

#[test]
fn test_missing_target_folder_without_create() {
    let dir = tempfile::tempdir().unwrap();
    write_set(dir.path(), "1", &[], 1);
    let options = IngestOptions {
        create_missing_folder: false,
        ..IngestOptions::default()
    };
    let resolver = DependencyIngestionResolver::new(Default::default(), options);
    let status = resolver.ingest_directory(&connect(), dir.path());
    assert_eq!(status.error_kind(), Some(ErrorKind::NotFound));
    assert!(status.detail().starts_with(&format!(
        "uploading files from folder: {}\n\n",
        dir.path().display()
    )));
}
