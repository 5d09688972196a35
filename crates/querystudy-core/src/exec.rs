//! Execution seam between built queries and a backing store

use crate::errors::{QueryError, Result};
use crate::mapping::{FromRow, RowReader};
use crate::query::{ColumnGroup, Query, QueryModel};
use crate::value::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Named parameter bindings for textual queries
pub type Parameters = BTreeMap<String, Value>;

/// A store able to run a query model and return raw rows
pub trait RowSource {
    /// Rows in the column order given by `layout`
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the store cannot be reached, or
    /// `InvalidQuery` for unbound parameters.
    fn fetch_rows(
        &mut self,
        model: &QueryModel,
        layout: &[ColumnGroup],
        params: &Parameters,
    ) -> Result<Vec<Vec<Value>>>;

    /// Number of rows `model` yields, ignoring offset and limit
    ///
    /// # Errors
    ///
    /// Same as `fetch_rows`.
    fn count_rows(&mut self, model: &QueryModel, params: &Parameters) -> Result<i64>;
}

fn check_parameters(model: &QueryModel, params: &Parameters) -> Result<()> {
    match model
        .parameter_names()
        .into_iter()
        .find(|name| !params.contains_key(name))
    {
        Some(name) => Err(QueryError::MissingParameter { name }.into()),
        None => Ok(()),
    }
}

/// Results of one execution, decoded one row per `next()`
///
/// Consumed once; reading again means executing the query again.
pub struct ResultIter<R> {
    rows: std::vec::IntoIter<Vec<Value>>,
    layout: Vec<ColumnGroup>,
    _row: PhantomData<fn() -> R>,
}

impl<R: FromRow> Iterator for ResultIter<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.rows.next()?;
        let mut reader = RowReader::new(&self.layout, &values);
        Some(R::decode(&mut reader).and_then(|row| reader.finish().map(|_| row)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<R: FromRow> Query<R> {
    fn run(
        &self,
        model: &QueryModel,
        source: &mut impl RowSource,
        params: &Parameters,
    ) -> Result<ResultIter<R>> {
        R::check_layout(self.layout())?;
        check_parameters(model, params)?;
        let rows = source.fetch_rows(model, self.layout(), params)?;
        Ok(ResultIter {
            rows: rows.into_iter(),
            layout: self.layout().to_vec(),
            _row: PhantomData,
        })
    }

    /// Execute and return a lazily decoding iterator
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousProjection` when `R` does not fit the selection,
    /// or any store error.
    pub fn iterate(
        &self,
        source: &mut impl RowSource,
        params: &Parameters,
    ) -> Result<ResultIter<R>> {
        self.run(self.model(), source, params)
    }

    /// Execute and decode every row
    ///
    /// # Errors
    ///
    /// As `iterate`, plus the first row decoding failure.
    pub fn fetch(&self, source: &mut impl RowSource, params: &Parameters) -> Result<Vec<R>> {
        self.iterate(source, params)?.collect()
    }

    /// Exactly one row
    ///
    /// # Errors
    ///
    /// Returns `NoUniqueResult` when zero or several rows match; nothing
    /// is decoded in that case.
    pub fn fetch_one(&self, source: &mut impl RowSource, params: &Parameters) -> Result<R> {
        let mut rows = self.iterate(source, params)?;
        let count = rows.size_hint().0;
        if count != 1 {
            return Err(QueryError::NoUniqueResult { count }.into());
        }
        match rows.next() {
            Some(row) => row,
            None => Err(QueryError::NoUniqueResult { count: 0 }.into()),
        }
    }

    /// The first row, if any
    ///
    /// # Errors
    ///
    /// As `iterate`.
    pub fn fetch_first(
        &self,
        source: &mut impl RowSource,
        params: &Parameters,
    ) -> Result<Option<R>> {
        let mut model = self.model().clone();
        model.limit = Some(model.limit.map_or(1, |limit| limit.min(1)));
        self.run(&model, source, params)?.next().transpose()
    }

    /// Number of rows the query yields, ignoring offset and limit
    ///
    /// # Errors
    ///
    /// As `iterate`.
    pub fn fetch_count(&self, source: &mut impl RowSource, params: &Parameters) -> Result<i64> {
        check_parameters(self.model(), params)?;
        source.count_rows(self.model(), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::model::Member;
    use crate::query::{select_from, QMember};

    /// Serves canned rows and records the models it was asked to run
    #[derive(Default)]
    struct CannedRows {
        rows: Vec<Vec<Value>>,
        seen: Vec<QueryModel>,
    }

    impl RowSource for CannedRows {
        fn fetch_rows(
            &mut self,
            model: &QueryModel,
            _layout: &[ColumnGroup],
            _params: &Parameters,
        ) -> Result<Vec<Vec<Value>>> {
            self.seen.push(model.clone());
            let limit = model.limit.map_or(usize::MAX, |l| l as usize);
            Ok(self.rows.iter().take(limit).cloned().collect())
        }

        fn count_rows(&mut self, _model: &QueryModel, _params: &Parameters) -> Result<i64> {
            Ok(self.rows.len() as i64)
        }
    }

    fn member_row(id: i64, name: &str, age: i64) -> Vec<Value> {
        vec![Value::Integer(id), Value::from(name), Value::Integer(age), Value::Null]
    }

    fn members_query() -> Query<Member> {
        let m = QMember::new("m");
        select_from(&m).build().unwrap()
    }

    #[test]
    fn test_fetch_one_rejects_multiple_rows() {
        let mut source = CannedRows {
            rows: vec![member_row(1, "member1", 10), member_row(2, "member2", 20)],
            ..CannedRows::default()
        };
        let err = members_query()
            .fetch_one(&mut source, &Parameters::new())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NoUniqueResult);
    }

    #[test]
    fn test_fetch_one_rejects_empty() {
        let mut source = CannedRows::default();
        let err = members_query()
            .fetch_one(&mut source, &Parameters::new())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NoUniqueResult);
    }

    #[test]
    fn test_fetch_first_limits_to_one() {
        let mut source = CannedRows {
            rows: vec![member_row(1, "member1", 10), member_row(2, "member2", 20)],
            ..CannedRows::default()
        };
        let first = members_query()
            .fetch_first(&mut source, &Parameters::new())
            .unwrap();
        assert_eq!(first.and_then(|m| m.username).as_deref(), Some("member1"));
        assert_eq!(source.seen[0].limit, Some(1));
    }

    #[test]
    fn test_iterate_decodes_lazily() {
        let mut bad = member_row(2, "member2", 20);
        bad[2] = Value::from("twenty");
        let mut source = CannedRows {
            rows: vec![member_row(1, "member1", 10), bad],
            ..CannedRows::default()
        };
        let mut iter = members_query()
            .iterate(&mut source, &Parameters::new())
            .unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert_eq!(
            iter.next().unwrap().unwrap_err().kind(),
            ExErrorKind::AmbiguousProjection
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_missing_parameter_is_invalid_query() {
        let query: Query<Member> =
            Query::parse("select m from Member m where m.username = :username").unwrap();
        let mut source = CannedRows::default();
        let err = query.fetch(&mut source, &Parameters::new()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidQuery);
        assert!(source.seen.is_empty());
    }
}
