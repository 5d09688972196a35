use super::lexer::{tokenize, Spanned, Token};
use crate::errors::{QueryError, Result};
use crate::model::{EntityKind, ValueKind};
use crate::query::expr::{AggregateFn, ColumnRef, CompareOp, Direction, Expr, OrderSpec, Predicate};
use crate::query::model::{AssociationRef, Join, JoinType, QueryModel, Source};
use crate::query::selection::SelectItem;
use crate::value::Value;

const RESERVED: &[&str] = &[
    "select", "from", "join", "inner", "left", "outer", "fetch", "on", "where", "group", "by",
    "having", "order", "and", "or", "not", "is", "null", "like", "between", "in", "asc", "desc",
    "as",
];

/// An operand before alias resolution
#[derive(Debug, Clone)]
enum RawOperand {
    Path {
        alias: String,
        field: Option<String>,
    },
    Aggregate {
        func: AggregateFn,
        alias: String,
        field: Option<String>,
    },
    Param(String),
    Literal(Value),
}

struct Parser {
    tokens: Vec<Spanned>,
    idx: usize,
    end: usize,
    scope: Vec<(String, EntityKind)>,
}

fn syntax<T>(position: usize, reason: impl Into<String>) -> Result<T> {
    Err(QueryError::Syntax {
        position,
        reason: reason.into(),
    }
    .into())
}

fn invalid<T>(clause: &str, reason: impl Into<String>) -> Result<T> {
    Err(QueryError::invalid(clause, reason).into())
}

/// Parse a textual query into a query model
///
/// # Errors
///
/// Returns `InvalidQuery`: syntax errors carry the byte position, scope
/// errors carry the clause.
pub fn parse(text: &str) -> Result<QueryModel> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        idx: 0,
        end: text.len(),
        scope: Vec::new(),
    };
    parser.query()
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.idx + offset).map(|s| &s.token)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.idx).map_or(self.end, |s| s.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).map(|s| s.token.clone());
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            syntax(self.pos(), format!("expected '{}'", keyword))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            syntax(self.pos(), format!("expected {}", what))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        let pos = self.pos();
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            _ => syntax(pos, format!("expected {}", what)),
        }
    }

    fn alias(&mut self) -> Result<String> {
        self.eat_keyword("as");
        let pos = self.pos();
        let name = self.ident("alias")?;
        if RESERVED.iter().any(|k| name.eq_ignore_ascii_case(k)) {
            return syntax(pos, format!("'{}' is reserved and cannot be an alias", name));
        }
        Ok(name)
    }

    fn lookup(&self, alias: &str) -> Option<EntityKind> {
        self.scope
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, kind)| *kind)
    }

    fn declare(&mut self, alias: String, kind: EntityKind, clause: &str) -> Result<Source> {
        if self.lookup(&alias).is_some() {
            return invalid(clause, format!("alias {} is declared twice", alias));
        }
        self.scope.push((alias.clone(), kind));
        Ok(Source { kind, alias })
    }

    fn entity(&mut self, clause: &str) -> Result<EntityKind> {
        let name = self.ident("entity name")?;
        match EntityKind::from_name(&name) {
            Some(kind) => Ok(kind),
            None => invalid(clause, format!("unknown entity {}", name)),
        }
    }

    fn query(&mut self) -> Result<QueryModel> {
        self.expect_keyword("select")?;
        let mut raw_select = vec![self.operand()?];
        while self.eat(&Token::Comma) {
            raw_select.push(self.operand()?);
        }

        self.expect_keyword("from")?;
        let mut model = QueryModel::default();
        loop {
            let kind = self.entity("from")?;
            let alias = self.alias()?;
            model.from.push(self.declare(alias, kind, "from")?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        while let Some(join) = self.join()? {
            model.joins.push(join);
        }

        if self.eat_keyword("where") {
            model.filter = Some(self.predicate("where")?);
        }
        if self.eat_keyword("group") {
            self.expect_keyword("by")?;
            loop {
                let raw = self.operand()?;
                model.group_by.push(self.resolve(raw, "group by")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        if self.eat_keyword("having") {
            model.having = Some(self.predicate("having")?);
        }
        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let raw = self.operand()?;
                let expr = self.resolve(raw, "order by")?;
                let direction = if self.eat_keyword("desc") {
                    Direction::Desc
                } else {
                    self.eat_keyword("asc");
                    Direction::Asc
                };
                model.order_by.push(OrderSpec { expr, direction });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        if self.peek().is_some() {
            return syntax(self.pos(), "unexpected trailing input");
        }

        for raw in raw_select {
            model.select.push(self.select_item(raw)?);
        }
        Ok(model)
    }

    fn join(&mut self) -> Result<Option<Join>> {
        let join_type = if self.eat_keyword("inner") {
            self.expect_keyword("join")?;
            JoinType::Inner
        } else if self.eat_keyword("left") {
            self.eat_keyword("outer");
            self.expect_keyword("join")?;
            JoinType::Left
        } else if self.eat_keyword("join") {
            JoinType::Inner
        } else {
            return Ok(None);
        };
        let fetch = self.eat_keyword("fetch");

        let (target, association) = if self.peek_at(1) == Some(&Token::Dot) {
            let owner_alias = self.ident("alias")?;
            self.expect(&Token::Dot, "'.'")?;
            let name = self.ident("association name")?;
            let owner = match self.lookup(&owner_alias) {
                Some(kind) => kind,
                None => {
                    return invalid(
                        "join",
                        format!("alias {} is not declared at this point", owner_alias),
                    )
                }
            };
            let meta = match owner.association(&name) {
                Some(meta) => meta,
                None => return invalid("join", format!("{} has no association {}", owner, name)),
            };
            let alias = self.alias()?;
            let target = self.declare(alias, meta.target, "join")?;
            (target, Some(AssociationRef { owner_alias, meta }))
        } else {
            let kind = self.entity("join")?;
            let alias = self.alias()?;
            (self.declare(alias, kind, "join")?, None)
        };

        let on = if self.eat_keyword("on") {
            Some(self.predicate("on")?)
        } else {
            None
        };

        Ok(Some(Join {
            join_type,
            target,
            association,
            on,
            fetch,
        }))
    }

    fn operand(&mut self) -> Result<RawOperand> {
        let pos = self.pos();
        match self.advance() {
            Some(Token::Param(name)) => Ok(RawOperand::Param(name)),
            Some(Token::Str(s)) => Ok(RawOperand::Literal(Value::Text(s))),
            Some(Token::Integer(i)) => Ok(RawOperand::Literal(Value::Integer(i))),
            Some(Token::Minus) => match self.advance() {
                Some(Token::Integer(i)) => Ok(RawOperand::Literal(Value::Integer(-i))),
                _ => syntax(pos, "expected integer after '-'"),
            },
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let Some(func) = AggregateFn::from_name(&name) else {
                        return syntax(pos, format!("unknown function {}", name));
                    };
                    self.idx += 1;
                    let alias = self.ident("alias")?;
                    let field = self.field_suffix()?;
                    self.expect(&Token::RParen, "')'")?;
                    Ok(RawOperand::Aggregate { func, alias, field })
                } else if RESERVED.iter().any(|k| name.eq_ignore_ascii_case(k)) {
                    syntax(pos, format!("unexpected keyword '{}'", name))
                } else {
                    let field = self.field_suffix()?;
                    Ok(RawOperand::Path { alias: name, field })
                }
            }
            _ => syntax(pos, "expected an operand"),
        }
    }

    fn field_suffix(&mut self) -> Result<Option<String>> {
        if self.eat(&Token::Dot) {
            Ok(Some(self.ident("field name")?))
        } else {
            Ok(None)
        }
    }

    fn column(&self, alias: &str, field: &str, clause: &str) -> Result<ColumnRef> {
        let Some(kind) = self.lookup(alias) else {
            return invalid(clause, format!("alias {} is not declared at this point", alias));
        };
        match kind.field(field) {
            Some(meta) => Ok(ColumnRef::field(alias, kind, meta)),
            None if kind.association(field).is_some() => invalid(
                clause,
                format!("association {}.{} must be joined to be used", alias, field),
            ),
            None => invalid(clause, format!("{} has no field {}", kind, field)),
        }
    }

    fn resolve(&self, raw: RawOperand, clause: &str) -> Result<Expr> {
        match raw {
            RawOperand::Param(name) => Ok(Expr::Param(name)),
            RawOperand::Literal(value) => Ok(Expr::Literal(value)),
            RawOperand::Path {
                alias,
                field: Some(field),
            } => Ok(Expr::Column(self.column(&alias, &field, clause)?)),
            RawOperand::Path { alias, field: None } => invalid(
                clause,
                format!("entity alias {} cannot be used as a value", alias),
            ),
            RawOperand::Aggregate { func, alias, field } => {
                let arg = match field {
                    Some(field) => self.column(&alias, &field, clause)?,
                    None => {
                        let Some(kind) = self.lookup(&alias) else {
                            return invalid(
                                clause,
                                format!("alias {} is not declared at this point", alias),
                            );
                        };
                        if func != AggregateFn::Count {
                            return invalid(
                                clause,
                                format!("{}({}) needs a field", func.name(), alias),
                            );
                        }
                        ColumnRef::id(alias, kind)
                    }
                };
                if matches!(func, AggregateFn::Sum | AggregateFn::Avg)
                    && arg.kind != ValueKind::Integer
                {
                    return invalid(
                        clause,
                        format!("{} needs a numeric field, {} is text", func.name(), arg.column),
                    );
                }
                Ok(Expr::Aggregate { func, arg })
            }
        }
    }

    fn select_item(&self, raw: RawOperand) -> Result<SelectItem> {
        match raw {
            RawOperand::Path { alias, field: None } => match self.lookup(&alias) {
                Some(kind) => Ok(SelectItem::Entity { alias, kind }),
                None => invalid("select", format!("alias {} is not declared", alias)),
            },
            other => Ok(SelectItem::Expr(self.resolve(other, "select")?)),
        }
    }

    fn predicate(&mut self, clause: &str) -> Result<Predicate> {
        let mut left = self.conjunction(clause)?;
        while self.eat_keyword("or") {
            let right = self.conjunction(clause)?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn conjunction(&mut self, clause: &str) -> Result<Predicate> {
        let mut left = self.negation(clause)?;
        while self.eat_keyword("and") {
            let right = self.negation(clause)?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn negation(&mut self, clause: &str) -> Result<Predicate> {
        if self.eat_keyword("not") {
            return Ok(!self.negation(clause)?);
        }
        if self.eat(&Token::LParen) {
            let inner = self.predicate(clause)?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(inner);
        }
        self.comparison(clause)
    }

    fn value(&mut self, clause: &str) -> Result<Expr> {
        let raw = self.operand()?;
        self.resolve(raw, clause)
    }

    fn comparison(&mut self, clause: &str) -> Result<Predicate> {
        let lhs = self.value(clause)?;

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Predicate::IsNull { expr: lhs, negated });
        }

        let negated = self.eat_keyword("not");
        if self.eat_keyword("like") {
            let pattern = self.value(clause)?;
            return Ok(Predicate::Like {
                expr: lhs,
                pattern,
                negated,
            });
        }
        if self.eat_keyword("between") {
            let low = self.value(clause)?;
            self.expect_keyword("and")?;
            let high = self.value(clause)?;
            return Ok(Predicate::Between {
                expr: lhs,
                low,
                high,
                negated,
            });
        }
        if self.eat_keyword("in") {
            self.expect(&Token::LParen, "'('")?;
            let mut list = vec![self.value(clause)?];
            while self.eat(&Token::Comma) {
                list.push(self.value(clause)?);
            }
            self.expect(&Token::RParen, "')'")?;
            return Ok(Predicate::InList {
                expr: lhs,
                list,
                negated,
            });
        }
        if negated {
            return syntax(self.pos(), "expected like, between or in after not");
        }

        let pos = self.pos();
        let op = match self.advance() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return syntax(pos, "expected a comparison operator"),
        };
        let rhs = self.value(clause)?;
        Ok(Predicate::compare(op, lhs, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_select_entity_with_param() {
        let model = parse("select m from Member m where m.username = :username").unwrap();
        assert_eq!(
            model.select,
            vec![SelectItem::Entity {
                alias: "m".to_string(),
                kind: EntityKind::Member
            }]
        );
        assert!(model.parameter_names().contains("username"));
    }

    #[test]
    fn test_select_items_resolve_join_aliases() {
        let model =
            parse("select t.teamName, avg(m.age) from Member m join m.team t group by t.teamName")
                .unwrap();
        assert_eq!(model.select.len(), 2);
        assert_eq!(model.joins[0].target.kind, EntityKind::Team);
        assert_eq!(model.group_by.len(), 1);
    }

    #[test]
    fn test_left_outer_join_fetch() {
        let model = parse("SELECT m FROM Member m LEFT OUTER JOIN FETCH m.team t").unwrap();
        assert_eq!(model.joins[0].join_type, JoinType::Left);
        assert!(model.joins[0].fetch);
    }

    #[test]
    fn test_on_clause_cannot_see_later_aliases() {
        let err =
            parse("select m from Member m join Team t on m.username = x.teamName").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidQuery);
        assert_eq!(err.clause(), Some("on"));
    }

    #[test]
    fn test_unknown_entity() {
        let err = parse("select x from Order x").unwrap_err();
        assert_eq!(err.clause(), Some("from"));
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let err = parse("select m from Member m where m.age >").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidQuery);
        assert!(err.message().contains("position 36"), "{}", err.message());
    }

    #[test]
    fn test_sum_of_text_is_rejected() {
        let err = parse("select sum(m.username) from Member m").unwrap_err();
        assert_eq!(err.clause(), Some("select"));
    }

    #[test]
    fn test_operator_precedence() {
        let model =
            parse("select m from Member m where m.age = 10 or m.age = 20 and m.username = 'x'")
                .unwrap();
        match model.filter {
            Some(Predicate::Or(parts)) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], Predicate::And(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_between_not_in_and_is_null() {
        let model = parse(
            "select m from Member m where m.age between 10 and 30 \
             and m.age not in (20) and m.username is not null",
        )
        .unwrap();
        match model.filter {
            Some(Predicate::And(parts)) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[1], Predicate::InList { negated: true, .. }));
                assert!(matches!(parts[2], Predicate::IsNull { negated: true, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reserved_alias_is_rejected() {
        assert!(parse("select m from Member where").is_err());
    }
}
