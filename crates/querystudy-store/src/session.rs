//! Unit of work over one SQLite transaction
//!
//! A `Session` assigns identities on `persist`, queues the inserts and
//! writes them on `flush`. Queries run inside the same transaction, so
//! flushed but uncommitted rows are visible to them. Dropping a session
//! without `commit` rolls everything back.

use crate::config::FlushMode;
use crate::errors::{from_rusqlite, Result};
use crate::sql::{compile_count, compile_select, insert_statement, query_rows, to_sql_values};
use querystudy_core::errors::QueryError;
use querystudy_core::exec::{Parameters, ResultIter, RowSource};
use querystudy_core::mapping::FromRow;
use querystudy_core::model::{
    Association, Entity, EntityKind, Id, Member, MemberId, Team, TeamId,
};
use querystudy_core::query::{select_from, ColumnGroup, QMember, QTeam, Query, QueryModel};
use querystudy_core::{log_op_end, log_op_error, log_op_start, Value};
use querystudy_core_types::SessionId;
use rusqlite::{Connection, Transaction};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Instant;

/// Insert waiting for the next flush
#[derive(Debug, Clone)]
struct PendingInsert {
    kind: EntityKind,
    id: i64,
    values: Vec<Value>,
}

pub struct Session<'c> {
    tx: Transaction<'c>,
    id: SessionId,
    flush_mode: FlushMode,
    pending: VecDeque<PendingInsert>,
    // identities handed out whose insert will never be written
    discarded: HashSet<(EntityKind, i64)>,
}

impl<'c> Session<'c> {
    /// Open a transaction on `conn` for the lifetime of the session
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the transaction cannot be started.
    pub fn begin(conn: &'c mut Connection, flush_mode: FlushMode) -> Result<Self> {
        let tx = conn.transaction().map_err(from_rusqlite)?;
        let session = Self {
            tx,
            id: SessionId::new(),
            flush_mode,
            pending: VecDeque::new(),
            discarded: HashSet::new(),
        };
        tracing::debug!(
            session_id = session.id.as_str(),
            flush_mode = ?flush_mode,
            "session opened"
        );
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Number of queued inserts not yet written
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Run `f` between start and end events tagged with this session
    fn logged<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        log_op_start!(op, session_id = self.id.as_str());
        let start = Instant::now();
        let result = f(&mut *self).map_err(|e| e.with_session_id(self.id.clone()));
        let duration = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration, session_id = self.id.as_str());
            }
            Err(e) => {
                log_op_error!(op, e, duration_ms = duration, session_id = self.id.as_str());
            }
        }
        result
    }

    /// Assign an identity to a transient entity and queue its insert
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPersisted` when the entity already has an id and
    /// `TransientReference` when it points at an entity that has none or
    /// whose insert was dropped by `clear` or a failed flush.
    pub fn persist<E: Entity + fmt::Display>(&mut self, entity: &mut E) -> Result<Id<E>> {
        self.logged("persist", |s| {
            if let Some(id) = entity.id() {
                return Err(QueryError::AlreadyPersisted {
                    entity: E::KIND.name().to_string(),
                    id: id.get(),
                }
                .into());
            }
            entity.check_references()?;
            if let Some((kind, id)) = entity
                .references()
                .into_iter()
                .find(|target| s.discarded.contains(target))
            {
                return Err(QueryError::TransientReference {
                    entity: entity.to_string(),
                    target: format!("{}(id={}, discarded)", kind, id),
                }
                .into());
            }

            let id = Id::new(s.next_id()?);
            entity.assign_id(id);
            s.pending.push_back(PendingInsert {
                kind: E::KIND,
                id: id.get(),
                values: entity.column_values(),
            });
            tracing::debug!(entity = %entity, pending = s.pending.len(), "queued insert");
            Ok(id)
        })
    }

    /// Identities come from one sequence shared by both tables
    fn next_id(&self) -> Result<i64> {
        self.tx
            .query_row(
                "UPDATE id_sequence SET next_id = next_id + 1 WHERE name = 'entity' \
                 RETURNING next_id - 1",
                [],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)
    }

    /// Write every queued insert, in persist order
    ///
    /// # Errors
    ///
    /// Returns the first store failure. The failing insert is dropped and
    /// its identity can no longer be referenced; later inserts stay queued.
    pub fn flush(&mut self) -> Result<usize> {
        self.logged("flush", Self::flush_pending)
    }

    fn flush_pending(&mut self) -> Result<usize> {
        let mut written = 0;
        while let Some(insert) = self.pending.pop_front() {
            let outcome = self.tx.execute(
                &insert_statement(insert.kind),
                rusqlite::params_from_iter(to_sql_values(&insert.values)),
            );
            if let Err(e) = outcome {
                self.discarded.insert((insert.kind, insert.id));
                tracing::debug!(
                    entity = %insert.kind,
                    entity_id = insert.id,
                    "dropped failing insert"
                );
                return Err(from_rusqlite(e));
            }
            written += 1;
        }
        Ok(written)
    }

    /// Drop queued inserts without writing them
    ///
    /// Entities keep the identities already assigned to them, but later
    /// `persist` calls reject references to those identities.
    pub fn clear(&mut self) -> usize {
        log_op_start!("clear", session_id = self.id.as_str());
        let start = Instant::now();
        let dropped = self.pending.len();
        self.discarded.extend(self.pending.drain(..).map(|insert| (insert.kind, insert.id)));
        log_op_end!(
            "clear",
            duration_ms = start.elapsed().as_millis() as u64,
            session_id = self.id.as_str(),
            pending = dropped
        );
        dropped
    }

    /// Flush and make the whole unit of work durable
    ///
    /// # Errors
    ///
    /// Returns the flush or commit failure; the transaction is rolled back.
    pub fn commit(mut self) -> Result<()> {
        self.flush()?;
        let id = self.id.clone();
        log_op_start!("commit", session_id = id.as_str());
        let start = Instant::now();
        match self.tx.commit() {
            Ok(()) => {
                log_op_end!(
                    "commit",
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = id.as_str()
                );
                Ok(())
            }
            Err(e) => {
                let err = from_rusqlite(e).with_session_id(id.clone());
                log_op_error!(
                    "commit",
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    session_id = id.as_str()
                );
                Err(err)
            }
        }
    }

    /// Whether reading the association's target needs no store access
    pub fn is_loaded<T: Entity>(&self, association: &Association<T>) -> bool {
        association.is_loaded()
    }

    /// Materialize a member's team on first access
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the referenced team no longer exists.
    pub fn load_team<'m>(&mut self, member: &'m mut Member) -> Result<Option<&'m Team>> {
        if let Association::Lazy(team_id) = member.team {
            let team = self.logged("load_team", |s| {
                s.team_by_id(team_id)?.ok_or_else(|| {
                    QueryError::EntityNotFound {
                        entity: EntityKind::Team.name().to_string(),
                        id: team_id.get(),
                    }
                    .into()
                })
            })?;
            member.team = Association::Loaded(team);
        }
        Ok(member.team.get())
    }

    /// Members of `team` in insertion order; none for a transient team
    ///
    /// # Errors
    ///
    /// Returns any store failure.
    pub fn members_of(&mut self, team: &Team) -> Result<Vec<Member>> {
        let Some(team_id) = team.id() else {
            return Ok(Vec::new());
        };
        let m = QMember::new("m");
        let t = QTeam::new("t");
        let query = select_from(&m)
            .join(&m.team, &t)
            .filter(t.id.eq(team_id.get()))
            .build()?;
        self.fetch(&query)
    }

    /// # Errors
    ///
    /// Returns any store failure.
    pub fn find_member(&mut self, id: MemberId) -> Result<Option<Member>> {
        let m = QMember::new("m");
        let query = select_from(&m).filter(m.id.eq(id.get())).build()?;
        self.fetch_first(&query)
    }

    /// # Errors
    ///
    /// Returns any store failure.
    pub fn find_team(&mut self, id: TeamId) -> Result<Option<Team>> {
        self.logged("find_team", |s| s.team_by_id(id))
    }

    fn team_by_id(&mut self, id: TeamId) -> Result<Option<Team>> {
        let t = QTeam::new("t");
        let query = select_from(&t).filter(t.id.eq(id.get())).build()?;
        query.fetch_first(self, &Parameters::new())
    }

    /// # Errors
    ///
    /// Returns `AmbiguousProjection` when `R` does not fit the selection,
    /// or any store failure.
    pub fn fetch<R: FromRow>(&mut self, query: &Query<R>) -> Result<Vec<R>> {
        self.logged("fetch", |s| query.fetch(s, &Parameters::new()))
    }

    /// Execute now, decode one row per `next()`
    ///
    /// # Errors
    ///
    /// As `fetch`.
    pub fn iterate<R: FromRow>(&mut self, query: &Query<R>) -> Result<ResultIter<R>> {
        self.logged("iterate", |s| query.iterate(s, &Parameters::new()))
    }

    /// # Errors
    ///
    /// Returns `NoUniqueResult` unless exactly one row matches.
    pub fn fetch_one<R: FromRow>(&mut self, query: &Query<R>) -> Result<R> {
        self.logged("fetch_one", |s| query.fetch_one(s, &Parameters::new()))
    }

    /// # Errors
    ///
    /// As `fetch`.
    pub fn fetch_first<R: FromRow>(&mut self, query: &Query<R>) -> Result<Option<R>> {
        self.logged("fetch_first", |s| query.fetch_first(s, &Parameters::new()))
    }

    /// # Errors
    ///
    /// As `fetch`.
    pub fn fetch_count<R: FromRow>(&mut self, query: &Query<R>) -> Result<i64> {
        self.logged("fetch_count", |s| query.fetch_count(s, &Parameters::new()))
    }

    /// Parse a textual query for execution in this session
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for syntax errors and undeclared names.
    pub fn create_query<R: FromRow>(&mut self, text: &str) -> Result<TextQuery<'_, 'c, R>> {
        let query = self.logged("create_query", |_| Query::parse(text))?;
        Ok(TextQuery {
            session: self,
            query,
            params: Parameters::new(),
        })
    }

    fn auto_flush(&mut self) -> Result<()> {
        if self.flush_mode == FlushMode::Auto && !self.pending.is_empty() {
            let written = self.flush_pending()?;
            tracing::debug!(session_id = self.id.as_str(), written, "auto flush");
        }
        Ok(())
    }
}

impl RowSource for Session<'_> {
    fn fetch_rows(
        &mut self,
        model: &QueryModel,
        layout: &[ColumnGroup],
        params: &Parameters,
    ) -> Result<Vec<Vec<Value>>> {
        self.auto_flush()?;
        let compiled = compile_select(model, layout, params)?;
        tracing::debug!(sql = %compiled.sql, join_count = model.joins.len(), "select");
        let width = layout.iter().map(ColumnGroup::width).sum();
        let rows = query_rows(&self.tx, &compiled, width)?;
        tracing::debug!(row_count = rows.len(), "rows fetched");
        Ok(rows)
    }

    fn count_rows(&mut self, model: &QueryModel, params: &Parameters) -> Result<i64> {
        self.auto_flush()?;
        let compiled = compile_count(model, params)?;
        tracing::debug!(sql = %compiled.sql, "count");
        self.tx
            .query_row(
                &compiled.sql,
                rusqlite::params_from_iter(compiled.params.iter()),
                |row| row.get(0),
            )
            .map_err(from_rusqlite)
    }
}

/// A parsed textual query bound to a session, plus its parameters
pub struct TextQuery<'s, 'c, R> {
    session: &'s mut Session<'c>,
    query: Query<R>,
    params: Parameters,
}

impl<R: FromRow> TextQuery<'_, '_, R> {
    /// Bind `:name`; binding twice keeps the last value
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn query(&self) -> &Query<R> {
        &self.query
    }

    /// # Errors
    ///
    /// Returns `InvalidQuery` when a parameter is unbound, or any store
    /// failure.
    pub fn get_result_list(&mut self) -> Result<Vec<R>> {
        let TextQuery {
            session,
            query,
            params,
        } = self;
        session.logged("fetch", |s| query.fetch(s, params))
    }

    /// # Errors
    ///
    /// Returns `NoUniqueResult` unless exactly one row matches.
    pub fn get_single_result(&mut self) -> Result<R> {
        let TextQuery {
            session,
            query,
            params,
        } = self;
        session.logged("fetch_one", |s| query.fetch_one(s, params))
    }

    /// # Errors
    ///
    /// As `get_result_list`.
    pub fn iterate(&mut self) -> Result<ResultIter<R>> {
        let TextQuery {
            session,
            query,
            params,
        } = self;
        session.logged("iterate", |s| query.iterate(s, params))
    }
}
