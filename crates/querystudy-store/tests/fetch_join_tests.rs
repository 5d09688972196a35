#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{open_db, seed};
use querystudy_core::errors::ExErrorKind;
use querystudy_core::model::{Association, Member, TeamId};
use querystudy_core::query::{select_from, QMember, QTeam};
use querystudy_store::{FlushMode, Session};

fn find_member1(session: &mut Session<'_>, fetch: bool) -> Member {
    let m = QMember::new("m");
    let t = QTeam::new("t");
    let mut builder = select_from(&m).join(&m.team, &t);
    if fetch {
        builder = builder.fetch_join();
    }
    let query = builder
        .filter(m.username.eq("member1"))
        .build()
        .unwrap();
    session.fetch_one(&query).unwrap()
}

#[test]
fn test_plain_join_leaves_team_lazy() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    seed(&mut session);

    let member = find_member1(&mut session, false);
    assert!(!session.is_loaded(&member.team));
}

#[test]
fn test_fetch_join_loads_team() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    seed(&mut session);

    let member = find_member1(&mut session, true);
    assert!(session.is_loaded(&member.team));
    assert_eq!(
        member.team.get().map(|t| t.team_name.as_str()),
        Some("teamA")
    );
}

#[test]
fn test_left_fetch_join_without_team() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    seed(&mut session);
    session.persist(&mut Member::with_username("solo")).unwrap();

    let m = QMember::new("m");
    let t = QTeam::new("t");
    let query = select_from(&m)
        .left_join(&m.team, &t)
        .fetch_join()
        .filter(m.username.eq("solo"))
        .build()
        .unwrap();

    let member = session.fetch_one(&query).unwrap();
    assert!(member.team.is_absent());
    assert!(session.is_loaded(&member.team));
}

#[test]
fn test_fetch_join_rejects_on_restriction() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    let seeded = seed(&mut session);

    let m = QMember::new("m");
    let t = QTeam::new("t");
    let err = select_from(&m)
        .left_join(&m.team, &t)
        .fetch_join()
        .on(t.team_name.eq("teamA"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidQuery);
    assert_eq!(err.clause(), Some("on"));

    // the restriction belongs on a plain join; team references survive it
    let query = select_from(&m)
        .left_join(&m.team, &t)
        .on(t.team_name.eq("teamA"))
        .order_by(m.username.asc())
        .build()
        .unwrap();
    let members = session.fetch(&query).unwrap();
    assert_eq!(members.len(), 4);
    assert_eq!(members[2].team_id(), seeded.team_b.id());
    assert_eq!(members[3].team_id(), seeded.team_b.id());
}

#[test]
fn test_load_team_on_first_access() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    let seeded = seed(&mut session);

    let mut member = find_member1(&mut session, false);
    let team = session.load_team(&mut member).unwrap().cloned();
    assert_eq!(team.as_ref(), Some(&seeded.team_a));
    assert!(session.is_loaded(&member.team));
}

#[test]
fn test_load_team_for_missing_row() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();

    let mut member = Member::with_username("ghost");
    member.team = Association::Lazy(TeamId::new(999));
    let err = session.load_team(&mut member).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_results_compare_equal_by_id() {
    let mut conn = open_db();
    let mut session = Session::begin(&mut conn, FlushMode::Auto).unwrap();
    let seeded = seed(&mut session);

    let lazy = find_member1(&mut session, false);
    let eager = find_member1(&mut session, true);
    assert_eq!(lazy, eager);
    assert_eq!(lazy, seeded.members[0]);
}
