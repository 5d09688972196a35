//! Compilation of query models to SQLite statements
//!
//! Every literal and parameter becomes a positional `?` placeholder; only
//! table names, column names and validated aliases are spliced into the
//! text.

use crate::errors::{from_rusqlite, Result};
use querystudy_core::errors::QueryError;
use querystudy_core::exec::Parameters;
use querystudy_core::model::EntityKind;
use querystudy_core::query::{
    AggregateFn, ColumnGroup, ColumnRef, Direction, Expr, JoinType, Predicate, QueryModel,
    SelectItem,
};
use querystudy_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;

/// A statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        ValueRef::Real(r) => Ok(Value::Real(r)),
        ValueRef::Text(bytes) => Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(QueryError::projection("scalar value", "BLOB").into()),
    }
}

struct Writer<'p> {
    sql: String,
    params: Vec<SqlValue>,
    bindings: &'p Parameters,
}

impl Writer<'_> {
    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: SqlValue) {
        self.sql.push('?');
        self.params.push(value);
    }

    fn column(&mut self, col: &ColumnRef) {
        let text = format!("{}.{}", quote(&col.alias), quote(col.column));
        self.push(&text);
    }

    fn entity_columns(&mut self, alias: &str, kind: EntityKind, next: &mut usize) {
        for column in kind.columns() {
            if *next > 0 {
                self.push(", ");
            }
            let text = format!("{}.{} AS \"c{}\"", quote(alias), quote(column), next);
            self.push(&text);
            *next += 1;
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(col) => self.column(col),
            Expr::Literal(value) => self.bind(to_sql_value(value)),
            Expr::Param(name) => {
                let value = self
                    .bindings
                    .get(name)
                    .ok_or_else(|| QueryError::MissingParameter { name: name.clone() })?;
                self.bind(to_sql_value(value));
            }
            Expr::Aggregate { func, arg } => {
                let (open, close) = match func {
                    AggregateFn::Count => ("COUNT(", ")"),
                    AggregateFn::Sum => ("COALESCE(SUM(", "), 0)"),
                    AggregateFn::Avg => ("AVG(", ")"),
                    AggregateFn::Min => ("MIN(", ")"),
                    AggregateFn::Max => ("MAX(", ")"),
                };
                self.push(open);
                self.column(arg);
                self.push(close);
            }
        }
        Ok(())
    }

    fn list(&mut self, exprs: &[Expr]) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr)?;
        }
        Ok(())
    }

    fn predicate(&mut self, pred: &Predicate) -> Result<()> {
        match pred {
            Predicate::Compare { op, lhs, rhs } => {
                self.push("(");
                self.expr(lhs)?;
                self.push(&format!(" {} ", op.symbol()));
                self.expr(rhs)?;
                self.push(")");
            }
            Predicate::IsNull { expr, negated } => {
                self.push("(");
                self.expr(expr)?;
                self.push(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
            }
            Predicate::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    self.push(if *negated { "(1 = 1)" } else { "(1 = 0)" });
                } else {
                    self.push("(");
                    self.expr(expr)?;
                    self.push(if *negated { " NOT IN (" } else { " IN (" });
                    self.list(list)?;
                    self.push("))");
                }
            }
            Predicate::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.push("(");
                self.expr(expr)?;
                self.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.expr(low)?;
                self.push(" AND ");
                self.expr(high)?;
                self.push(")");
            }
            Predicate::Like {
                expr,
                pattern,
                negated,
            } => {
                self.push("(");
                self.expr(expr)?;
                self.push(if *negated { " NOT LIKE " } else { " LIKE " });
                self.expr(pattern)?;
                self.push(" ESCAPE '\\')");
            }
            Predicate::And(parts) => self.junction(parts, " AND ", "(1 = 1)")?,
            Predicate::Or(parts) => self.junction(parts, " OR ", "(1 = 0)")?,
            Predicate::Not(inner) => {
                self.push("(NOT ");
                self.predicate(inner)?;
                self.push(")");
            }
        }
        Ok(())
    }

    fn junction(&mut self, parts: &[Predicate], separator: &str, empty: &str) -> Result<()> {
        if parts.is_empty() {
            self.push(empty);
            return Ok(());
        }
        self.push("(");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            self.predicate(part)?;
        }
        self.push(")");
        Ok(())
    }

    fn select_list(&mut self, layout: &[ColumnGroup]) -> Result<()> {
        let mut next = 0;
        for group in layout {
            match &group.item {
                SelectItem::Entity { alias, kind } => {
                    self.entity_columns(alias, *kind, &mut next);
                    for fetched in &group.fetched {
                        self.entity_columns(&fetched.alias, fetched.kind, &mut next);
                    }
                }
                SelectItem::Expr(expr) => {
                    if next > 0 {
                        self.push(", ");
                    }
                    self.expr(expr)?;
                    self.push(&format!(" AS \"c{}\"", next));
                    next += 1;
                }
            }
        }
        Ok(())
    }

    /// FROM through HAVING
    fn body(&mut self, model: &QueryModel) -> Result<()> {
        self.push(" FROM ");
        for (i, source) in model.from.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let text = format!("{} AS {}", quote(source.kind.table()), quote(&source.alias));
            self.push(&text);
        }

        for join in &model.joins {
            self.push(match join.join_type {
                JoinType::Inner => " INNER JOIN ",
                JoinType::Left => " LEFT JOIN ",
            });
            let text = format!(
                "{} AS {} ON ",
                quote(join.target.kind.table()),
                quote(&join.target.alias)
            );
            self.push(&text);

            let fk = join.association.as_ref().map(|assoc| {
                format!(
                    "({}.{} = {}.{})",
                    quote(&assoc.owner_alias),
                    quote(assoc.meta.fk_column),
                    quote(&join.target.alias),
                    quote(join.target.kind.id_column())
                )
            });
            match (fk, &join.on) {
                (Some(fk), Some(on)) => {
                    self.push("(");
                    self.push(&fk);
                    self.push(" AND ");
                    self.predicate(on)?;
                    self.push(")");
                }
                (Some(fk), None) => self.push(&fk),
                (None, Some(on)) => self.predicate(on)?,
                (None, None) => self.push("(1 = 1)"),
            }
        }

        if let Some(filter) = &model.filter {
            self.push(" WHERE ");
            self.predicate(filter)?;
        }
        if !model.group_by.is_empty() {
            self.push(" GROUP BY ");
            self.list(&model.group_by)?;
        }
        if let Some(having) = &model.having {
            self.push(" HAVING ");
            self.predicate(having)?;
        }
        Ok(())
    }

    fn order_by(&mut self, model: &QueryModel) -> Result<()> {
        if !model.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, spec) in model.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.expr(&spec.expr)?;
                self.push(match spec.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
            }
        } else if !model.group_by.is_empty() {
            self.push(" ORDER BY ");
            self.list(&model.group_by)?;
        } else if !model.is_aggregate() {
            // Identities are allocated in insertion order
            let keys: Vec<String> = model
                .from
                .iter()
                .chain(model.joins.iter().map(|j| &j.target))
                .map(|s| format!("{}.{}", quote(&s.alias), quote(s.kind.id_column())))
                .collect();
            self.push(" ORDER BY ");
            self.push(&keys.join(", "));
        }
        Ok(())
    }
}

/// SELECT statement yielding the columns of `layout`
pub fn compile_select(
    model: &QueryModel,
    layout: &[ColumnGroup],
    bindings: &Parameters,
) -> Result<CompiledSql> {
    let mut w = Writer {
        sql: String::from("SELECT "),
        params: Vec::new(),
        bindings,
    };
    w.select_list(layout)?;
    w.body(model)?;
    w.order_by(model)?;

    match (model.limit, model.offset) {
        (Some(limit), Some(offset)) => w.push(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => w.push(&format!(" LIMIT {}", limit)),
        (None, Some(offset)) => w.push(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }

    Ok(CompiledSql {
        sql: w.sql,
        params: w.params,
    })
}

/// `SELECT COUNT(*)` over the unpaged query
pub fn compile_count(model: &QueryModel, bindings: &Parameters) -> Result<CompiledSql> {
    let mut w = Writer {
        sql: String::from("SELECT COUNT(*) FROM (SELECT "),
        params: Vec::new(),
        bindings,
    };
    w.select_list(&model.layout())?;
    w.body(model)?;
    w.push(")");
    Ok(CompiledSql {
        sql: w.sql,
        params: w.params,
    })
}

/// INSERT of one entity row, columns in metadata order
pub fn insert_statement(kind: EntityKind) -> String {
    let columns: Vec<String> = kind.columns().iter().map(|c| quote(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(kind.table()),
        columns.join(", "),
        placeholders
    )
}

pub fn to_sql_values(values: &[Value]) -> Vec<SqlValue> {
    values.iter().map(to_sql_value).collect()
}

/// Run a compiled SELECT and collect every row as `width` values
pub fn query_rows(
    conn: &Connection,
    compiled: &CompiledSql,
    width: usize,
) -> Result<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(&compiled.sql).map_err(from_rusqlite)?;
    let mut rows = stmt
        .query(rusqlite::params_from_iter(compiled.params.iter()))
        .map_err(from_rusqlite)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_value_ref(row.get_ref(idx).map_err(from_rusqlite)?)?);
        }
        out.push(values);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystudy_core::query::{select, select_from, QMember, QTeam};

    fn no_params() -> Parameters {
        Parameters::new()
    }

    #[test]
    fn test_association_join_with_on() {
        let m = QMember::new("m");
        let t = QTeam::new("t");
        let query = select((&m, t.optional()))
            .from(&m)
            .left_join(&m.team, &t)
            .on(t.team_name.eq("teamA"))
            .build()
            .unwrap();

        let compiled = compile_select(query.model(), query.layout(), &no_params()).unwrap();
        assert!(compiled.sql.contains(
            r#"LEFT JOIN "team" AS "t" ON (("m"."team_id" = "t"."team_id") AND ("t"."team_name" = ?))"#
        ));
        assert!(compiled.sql.ends_with(r#"ORDER BY "m"."member_id", "t"."team_id""#));
        assert_eq!(compiled.params, vec![SqlValue::Text("teamA".to_string())]);
    }

    #[test]
    fn test_fetch_columns_follow_owner() {
        let m = QMember::new("m");
        let t = QTeam::new("t");
        let query = select_from(&m).join(&m.team, &t).fetch_join().build().unwrap();
        let compiled = compile_select(query.model(), query.layout(), &no_params()).unwrap();
        assert!(compiled.sql.starts_with(
            r#"SELECT "m"."member_id" AS "c0", "m"."username" AS "c1", "m"."age" AS "c2", "m"."team_id" AS "c3", "t"."team_id" AS "c4", "t"."team_name" AS "c5" FROM"#
        ));
    }

    #[test]
    fn test_aggregates_without_default_order() {
        let m = QMember::new("m");
        let query = select((m.count(), m.age.sum(), m.age.avg()))
            .from(&m)
            .build()
            .unwrap();
        let compiled = compile_select(query.model(), query.layout(), &no_params()).unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT COUNT("m"."member_id") AS "c0", COALESCE(SUM("m"."age"), 0) AS "c1", AVG("m"."age") AS "c2" FROM "member" AS "m""#
        );
    }

    #[test]
    fn test_paging() {
        let m = QMember::new("m");
        let query = select_from(&m)
            .order_by(m.age.desc())
            .offset(1)
            .limit(2)
            .build()
            .unwrap();
        let compiled = compile_select(query.model(), query.layout(), &no_params()).unwrap();
        assert!(compiled
            .sql
            .ends_with(r#"ORDER BY "m"."age" DESC LIMIT 2 OFFSET 1"#));

        let count = compile_count(query.model(), &no_params()).unwrap();
        assert!(count.sql.starts_with("SELECT COUNT(*) FROM (SELECT "));
        assert!(!count.sql.contains("LIMIT"));
    }

    #[test]
    fn test_like_uses_escape_clause() {
        let m = QMember::new("m");
        let query = select_from(&m)
            .filter(m.username.starts_with("mem"))
            .build()
            .unwrap();
        let compiled = compile_select(query.model(), query.layout(), &no_params()).unwrap();
        assert!(compiled.sql.contains(r#"("m"."username" LIKE ? ESCAPE '\')"#));
        assert_eq!(compiled.params, vec![SqlValue::Text("mem%".to_string())]);
    }

    #[test]
    fn test_unbound_parameter() {
        let query: querystudy_core::Query<querystudy_core::Member> =
            querystudy_core::Query::parse("select m from Member m where m.age > :age").unwrap();
        let err = compile_select(query.model(), query.layout(), &no_params()).unwrap_err();
        assert_eq!(err.kind(), querystudy_core::ExErrorKind::InvalidQuery);

        let mut params = Parameters::new();
        params.insert("age".to_string(), Value::Integer(15));
        let compiled = compile_select(query.model(), query.layout(), &params).unwrap();
        assert_eq!(compiled.params, vec![SqlValue::Integer(15)]);
    }

    #[test]
    fn test_insert_statement() {
        assert_eq!(
            insert_statement(EntityKind::Team),
            r#"INSERT INTO "team" ("team_id", "team_name") VALUES (?, ?)"#
        );
    }
}
