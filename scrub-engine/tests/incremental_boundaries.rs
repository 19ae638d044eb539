//! Incremental-update behavior around the commit-batch boundary.

use scrub_engine::backend::{connect, CommitMode, DbConfig, DialectKind};
use scrub_engine::error::ScrubError;
use scrub_engine::installer::{self, ExecutionTables};
use scrub_engine::model::{Cell, Column, Fix, Value};
use scrub_engine::pipeline::{IncrementalUpdater, Operator, COMMIT_BATCH_SIZE};

fn installed_config(dir: &tempfile::TempDir) -> (DbConfig, ExecutionTables) {
    let path = dir.path().join("exec.db");
    let config = DbConfig::new(DialectKind::Sqlite, path.to_string_lossy().to_string());
    let tables = ExecutionTables::default();
    installer::install(&config, &tables).unwrap();
    (config, tables)
}

fn seed_violations(config: &DbConfig, tids: &[i64]) {
    let mut conn = connect(config, CommitMode::Manual).unwrap();
    for (index, tid) in tids.iter().enumerate() {
        conn.execute(
            "INSERT INTO violation (vid, rid, tablename, tupleid, attribute, value) \
             VALUES (?1, 'r', 'emp', ?2, 'manager', 'X')",
            &[Value::Int(index as i64 + 1), Value::Int(*tid)],
        )
        .unwrap();
    }
    conn.commit().unwrap();
}

fn fixes_for_tids(count: usize) -> Vec<Fix> {
    (0..count as i64)
        .map(|tid| {
            let left = Cell::new(Column::new("emp", "manager"), tid, Value::from("Y"));
            Fix::set_value(0, left, "X")
        })
        .collect()
}

fn remaining_tids(config: &DbConfig) -> Vec<i64> {
    let mut conn = connect(config, CommitMode::Auto).unwrap();
    conn.query("SELECT tupleid FROM violation ORDER BY tupleid", &[])
        .unwrap()
        .iter()
        .map(|row| match row.get("tupleid") {
            Some(Value::Int(t)) => *t,
            other => panic!("unexpected tupleid {other:?}"),
        })
        .collect()
}

fn assert_batch_size_behaves(batch: usize) {
    let dir = tempfile::tempdir().unwrap();
    let (config, tables) = installed_config(&dir);

    // Violations sprinkled across the fixed range plus two sentinels that no
    // fix touches.
    let sentinel_a = 1_000_000;
    let sentinel_b = 1_000_001;
    let mut seeded: Vec<i64> = vec![sentinel_a, sentinel_b];
    if batch > 0 {
        seeded.push(0);
        seeded.push(batch as i64 / 2);
        seeded.push(batch as i64 - 1);
    }
    seeded.sort_unstable();
    seeded.dedup();
    seed_violations(&config, &seeded);

    let fixes = fixes_for_tids(batch);
    let mut updater = IncrementalUpdater::new(config.clone(), tables);
    let affected = updater.execute(fixes).unwrap();

    // Output is index-aligned with the input fixes.
    assert_eq!(affected.len(), batch);
    assert_eq!(affected, (0..batch as i64).collect::<Vec<_>>());

    // Every violation inside the fixed range is gone; the sentinels survive.
    assert_eq!(remaining_tids(&config), vec![sentinel_a, sentinel_b]);
}

#[test]
fn batch_of_zero() {
    assert_batch_size_behaves(0);
}

#[test]
fn batch_of_one() {
    assert_batch_size_behaves(1);
}

#[test]
fn batch_just_below_commit_boundary() {
    assert_batch_size_behaves(COMMIT_BATCH_SIZE - 1);
}

#[test]
fn batch_exactly_at_commit_boundary() {
    assert_batch_size_behaves(COMMIT_BATCH_SIZE);
}

#[test]
fn batch_just_above_commit_boundary() {
    assert_batch_size_behaves(COMMIT_BATCH_SIZE + 1);
}

#[test]
fn failures_propagate_instead_of_returning_partial_results() {
    // No install: the violation table is missing, so the first delete fails.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exec.db");
    let config = DbConfig::new(DialectKind::Sqlite, path.to_string_lossy().to_string());

    let mut updater = IncrementalUpdater::new(config, ExecutionTables::default());
    let err = updater.execute(fixes_for_tids(3)).unwrap_err();

    match err {
        ScrubError::Backend(message) => {
            assert!(
                message.contains("0 committed operations"),
                "message should state committed progress: {message}"
            );
        }
        other => panic!("expected Backend error, got {other:?}"),
    }
}
