//! Integration tests for the `build` command.
use rusqlite::Connection;
use std::path::PathBuf;
use temoatools::cli::{BuildOpts, PerturbationOpts, handle_build_command};
use temoatools::settings::Settings;
use tempfile::tempdir;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

fn count_rows(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

/// An integration test for the `build` command.
#[test]
fn test_handle_build_command() {
    unsafe { std::env::set_var("TEMOATOOLS_LOG_LEVEL", "off") };

    // Write to a non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("databases");
    let opts = BuildOpts {
        output_dir: Some(output_dir.clone()),
        ..BuildOpts::default()
    };
    let model_dir = get_model_dir();
    handle_build_command(
        &model_dir.join("inputs"),
        &model_dir.join("scenarios"),
        "A",
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    let conn = Connection::open(output_dir.join("inputs_A.sqlite")).unwrap();
    assert_eq!(
        count_rows(&conn, "SELECT COUNT(*) FROM time_periods WHERE flag = 'f'"),
        4
    );
    assert_eq!(
        count_rows(
            &conn,
            "SELECT COUNT(*) FROM technologies WHERE tech IN ('COAL_PP', 'IMPCOAL', 'ELC_TX')"
        ),
        3
    );
    assert_eq!(
        count_rows(&conn, "SELECT COUNT(*) FROM technologies WHERE tech = 'BATT_PP'"),
        0
    );
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM SegFrac"), 4);
}

/// Building with a sensitivity directive changes the written values
#[test]
fn test_handle_build_command_sensitivity() {
    unsafe { std::env::set_var("TEMOATOOLS_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let directives = tempdir.path().join("directives.csv");
    std::fs::write(
        &directives,
        "type,variable,tech,multiplier,value\nGlobals,DiscountRate,global,100,\n",
    )
    .unwrap();

    let opts = BuildOpts {
        name: Some("perturbed".into()),
        output_dir: Some(tempdir.path().to_path_buf()),
        perturbations: PerturbationOpts {
            sensitivity: Some(directives),
            ..PerturbationOpts::default()
        },
        ..BuildOpts::default()
    };
    let model_dir = get_model_dir();
    handle_build_command(
        &model_dir.join("inputs"),
        &model_dir.join("scenarios"),
        "A",
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    let conn = Connection::open(tempdir.path().join("perturbed.sqlite")).unwrap();
    let rate: f64 = conn
        .query_row("SELECT * FROM GlobalDiscountRate", [], |row| row.get(0))
        .unwrap();
    float_cmp::assert_approx_eq!(f64, rate, 0.1);
}
