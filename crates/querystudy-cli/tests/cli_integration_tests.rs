//! CLI integration tests
//!
//! Drive the built binary against a temporary database.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("members.yaml")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_querystudy"))
        .args(args)
        .env_remove("QUERYSTUDY_DB")
        .env_remove("QUERYSTUDY_FLUSH_MODE")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn seeded_db(temp_dir: &TempDir) -> String {
    let db = temp_dir.path().join("members.db");
    let db = db.to_str().unwrap().to_string();
    let output = run(&["seed", "--db", &db, fixture().to_str().unwrap()]);
    assert!(
        output.status.success(),
        "seed failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    db
}

#[test]
fn test_seed_prints_assigned_ids() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("members.db");
    let output = run(&[
        "seed",
        "--db",
        db.to_str().unwrap(),
        fixture().to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("team teamA -> 1"));
    assert!(stdout.contains("member member4 -> 6"));
    assert!(stdout.contains("Imported 2 teams, 4 members"));
}

#[test]
fn test_query_with_parameter_prints_json_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_db(&temp_dir);

    let output = run(&[
        "query",
        "--db",
        &db,
        "select m.username, m.age from Member m where m.age > :age",
        "--param",
        "age=25",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec![r#"["member3",30]"#, r#"["member4",40]"#]);
}

#[test]
fn test_query_group_by() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_db(&temp_dir);

    let output = run(&[
        "query",
        "--db",
        &db,
        "select t.teamName, avg(m.age) from Member m join m.team t group by t.teamName",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec![r#"["teamA",15.0]"#, r#"["teamB",35.0]"#]
    );
}

#[test]
fn test_invalid_query_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_db(&temp_dir);

    let output = run(&["query", "--db", &db, "select x from Member m"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_INVALID_QUERY"));
}

#[test]
fn test_missing_database_is_reported() {
    let output = run(&["query", "select m from Member m"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--db"));
}
