use querystudy_core::model::{Member, Team};
use querystudy_store::{Session, StoreConfig};
use rusqlite::Connection;

/// Open a migrated in-memory database
#[allow(dead_code)]
pub fn open_db() -> Connection {
    StoreConfig::in_memory().open().unwrap()
}

/// The two teams and four members every query test starts from
#[allow(dead_code)]
pub struct Seeded {
    pub team_a: Team,
    pub team_b: Team,
    pub members: Vec<Member>,
}

/// Persist teamA, teamB and member1..member4 (ages 10, 20, 30, 40)
///
/// member1 and member2 join teamA, member3 and member4 join teamB. The
/// session is flushed before returning.
#[allow(dead_code)]
pub fn seed(session: &mut Session<'_>) -> Seeded {
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    session.persist(&mut team_a).unwrap();
    session.persist(&mut team_b).unwrap();

    let mut members = vec![
        Member::new("member1", 10, Some(&team_a)),
        Member::new("member2", 20, Some(&team_a)),
        Member::new("member3", 30, Some(&team_b)),
        Member::new("member4", 40, Some(&team_b)),
    ];
    for member in &mut members {
        session.persist(member).unwrap();
    }
    session.flush().unwrap();

    Seeded {
        team_a,
        team_b,
        members,
    }
}

#[allow(dead_code)]
pub fn usernames(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .map(|m| m.username.clone().unwrap_or_default())
        .collect()
}
