#![allow(clippy::unwrap_used, clippy::expect_used)]

use querystudy_store::migrations::apply_migrations;
use rusqlite::Connection;

#[test]
fn test_migrations_are_idempotent() {
    let mut conn = Connection::open_in_memory().unwrap();
    let first = apply_migrations(&mut conn).unwrap();
    let second = apply_migrations(&mut conn).unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 0);
}

#[test]
fn test_id_sequence_is_seeded() {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    let next: i64 = conn
        .query_row(
            "SELECT next_id FROM id_sequence WHERE name = 'entity'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(next, 1);
}

#[test]
fn test_member_team_foreign_key() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", true).unwrap();
    apply_migrations(&mut conn).unwrap();
    let result = conn.execute(
        "INSERT INTO member (member_id, username, age, team_id) VALUES (1, 'm', 1, 42)",
        [],
    );
    assert!(result.is_err());
}
