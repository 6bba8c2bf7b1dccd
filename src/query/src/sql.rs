//! Typed SQL fragments.
//!
//! Queries are assembled from clauses and rendered in one deterministic pass. Names that
//! come from callers can only enter a fragment through [`Ident::new`], which validates
//! them, so the rendered text never carries an unchecked identifier.

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

use chrono::DateTime;
use chrono::Utc;
use common::query::AggregateFunction;
use common::query::Expr;
use common::query::Operator;
use common::query::Ordering;
use common::query::Value;
use common::validation::check_identifier;

use crate::error::QueryError;
use crate::Result;

/// Timestamp literal format understood by the event engine, always UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    name: String,
    quoted: bool,
}

impl Ident {
    /// Validated, caller-supplied name. Rendered quoted.
    pub fn new(name: &str, kind: &str) -> Result<Ident> {
        check_identifier(name, kind)?;
        Ok(Ident {
            name: name.to_string(),
            quoted: true,
        })
    }

    /// Built-in name such as a system column or a table alias. Rendered as is.
    pub(crate) fn system(name: &'static str) -> Ident {
        Ident {
            name: name.to_string(),
            quoted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Possibly qualified table name, e.g. `user.users."shop"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName(pub Vec<Ident>);

impl TableName {
    pub fn new(parts: Vec<Ident>) -> Self {
        TableName(parts)
    }
}

impl From<Ident> for TableName {
    fn from(ident: Ident) -> Self {
        TableName(vec![ident])
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.0, ".")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlExpr {
    Column {
        relation: Option<Ident>,
        name: Ident,
    },
    /// Column reference taken from a filter expression, one identifier per name part.
    Reference(Vec<Ident>),
    Literal(Value),
    Timestamp(DateTime<Utc>),
    Coalesce(Vec<SqlExpr>),
    Aggregate {
        func: AggregateFunction,
        arg: Box<SqlExpr>,
    },
    Binary {
        left: Box<SqlExpr>,
        op: Operator,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
    IsNull(Box<SqlExpr>),
    IsNotNull(Box<SqlExpr>),
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<SqlExpr>,
        query: Box<Query>,
    },
    Like {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
        negated: bool,
    },
}

impl SqlExpr {
    pub fn column(relation: Option<Ident>, name: Ident) -> SqlExpr {
        SqlExpr::Column { relation, name }
    }

    pub fn binary(left: SqlExpr, op: Operator, right: SqlExpr) -> SqlExpr {
        SqlExpr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn is_not_null(self) -> SqlExpr {
        SqlExpr::IsNotNull(Box::new(self))
    }

    pub fn is_null(self) -> SqlExpr {
        SqlExpr::IsNull(Box::new(self))
    }

    pub fn and(self, other: SqlExpr) -> SqlExpr {
        SqlExpr::binary(self, Operator::And, other)
    }

    pub fn aggregate(func: AggregateFunction, arg: SqlExpr) -> SqlExpr {
        SqlExpr::Aggregate {
            func,
            arg: Box::new(arg),
        }
    }

    pub fn in_subquery(self, query: Query) -> SqlExpr {
        SqlExpr::InSubquery {
            expr: Box::new(self),
            query: Box::new(query),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            SqlExpr::Binary { op, .. } => op_precedence(op),
            SqlExpr::Not(_) => 3,
            SqlExpr::IsNull(_)
            | SqlExpr::IsNotNull(_)
            | SqlExpr::InList { .. }
            | SqlExpr::InSubquery { .. }
            | SqlExpr::Like { .. }
            | SqlExpr::Between { .. } => 4,
            _ => 10,
        }
    }

    /// Writes `self` as an operand of something binding with `parent` precedence.
    fn fmt_operand(&self, f: &mut Formatter<'_>, parent: u8, strict: bool) -> fmt::Result {
        let prec = self.precedence();
        if prec < parent || (strict && prec == parent) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn op_precedence(op: &Operator) -> u8 {
    match op {
        Operator::Or => 1,
        Operator::And => 2,
        Operator::Eq
        | Operator::NotEq
        | Operator::Lt
        | Operator::LtEq
        | Operator::Gt
        | Operator::GtEq => 4,
        Operator::Plus | Operator::Minus => 5,
        Operator::Multiply | Operator::Divide | Operator::Modulo => 6,
    }
}

fn fmt_value(f: &mut Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Boolean(true) => write!(f, "TRUE"),
        Value::Boolean(false) => write!(f, "FALSE"),
        Value::Int64(v) => write!(f, "{v}"),
        // debug keeps the fraction of whole numbers: 2.0, not 2
        Value::Float64(v) if v.is_finite() => write!(f, "{v:?}"),
        Value::Float64(_) => write!(f, "NULL"),
        Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
    }
}

impl Display for SqlExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Column { relation, name } => match relation {
                None => write!(f, "{name}"),
                Some(relation) => write!(f, "{relation}.{name}"),
            },
            SqlExpr::Reference(parts) => write_separated(f, parts, "."),
            SqlExpr::Literal(value) => fmt_value(f, value),
            SqlExpr::Timestamp(ts) => {
                write!(f, "CAST('{}' AS timestamp)", ts.format(TIMESTAMP_FORMAT))
            }
            SqlExpr::Coalesce(args) => {
                write!(f, "coalesce(")?;
                write_separated(f, args, ", ")?;
                write!(f, ")")
            }
            SqlExpr::Aggregate { func, arg } => match func {
                AggregateFunction::CountUnique => write!(f, "{}(DISTINCT {arg})", func.sql_name()),
                _ => write!(f, "{}({arg})", func.sql_name()),
            },
            SqlExpr::Binary { left, op, right } => {
                let prec = op_precedence(op);
                let strict = !op.is_logical();
                left.fmt_operand(f, prec, strict && prec == 4)?;
                write!(f, " {op} ")?;
                right.fmt_operand(f, prec, strict)
            }
            SqlExpr::Not(expr) => {
                write!(f, "NOT ")?;
                expr.fmt_operand(f, 3, false)
            }
            SqlExpr::IsNull(expr) => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, " IS NULL")
            }
            SqlExpr::IsNotNull(expr) => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, " IS NOT NULL")
            }
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, "{} IN (", if *negated { " NOT" } else { "" })?;
                write_separated(f, list, ", ")?;
                write!(f, ")")
            }
            SqlExpr::InSubquery { expr, query } => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, " IN ({query})")
            }
            SqlExpr::Like {
                expr,
                pattern,
                negated,
            } => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, "{} LIKE ", if *negated { " NOT" } else { "" })?;
                pattern.fmt_operand(f, 4, true)
            }
            SqlExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.fmt_operand(f, 4, true)?;
                write!(f, "{} BETWEEN ", if *negated { " NOT" } else { "" })?;
                low.fmt_operand(f, 4, true)?;
                write!(f, " AND ")?;
                high.fmt_operand(f, 4, true)
            }
        }
    }
}

/// Converts a caller-supplied predicate, validating every name part on the way.
pub fn filter_to_sql(expr: &Expr) -> Result<SqlExpr> {
    let boxed = |e: &Expr| -> Result<Box<SqlExpr>> { Ok(Box::new(filter_to_sql(e)?)) };

    Ok(match expr {
        Expr::Column(parts) => {
            if parts.is_empty() {
                return Err(QueryError::BadRequest("empty column reference".to_string()));
            }
            SqlExpr::Reference(
                parts
                    .iter()
                    .map(|p| Ident::new(p, "filter column"))
                    .collect::<Result<Vec<_>>>()?,
            )
        }
        Expr::Literal(Value::Float64(v)) if !v.is_finite() => {
            return Err(QueryError::BadRequest(format!("invalid number {v}")));
        }
        Expr::Literal(v) => SqlExpr::Literal(v.clone()),
        Expr::Binary { left, op, right } => SqlExpr::Binary {
            left: boxed(left)?,
            op: *op,
            right: boxed(right)?,
        },
        Expr::Not(e) => SqlExpr::Not(boxed(e)?),
        Expr::IsNull(e) => SqlExpr::IsNull(boxed(e)?),
        Expr::IsNotNull(e) => SqlExpr::IsNotNull(boxed(e)?),
        Expr::InList {
            expr,
            list,
            negated,
        } => SqlExpr::InList {
            expr: boxed(expr)?,
            list: list.iter().map(filter_to_sql).collect::<Result<Vec<_>>>()?,
            negated: *negated,
        },
        Expr::Like {
            expr,
            pattern,
            negated,
        } => SqlExpr::Like {
            expr: boxed(expr)?,
            pattern: boxed(pattern)?,
            negated: *negated,
        },
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => SqlExpr::Between {
            expr: boxed(expr)?,
            low: boxed(low)?,
            high: boxed(high)?,
            negated: *negated,
        },
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<Ident>,
}

impl SelectItem {
    pub fn new(expr: SqlExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: SqlExpr, alias: Ident) -> Self {
        Self {
            expr,
            alias: Some(alias),
        }
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.alias {
            None => write!(f, "{}", self.expr),
            Some(alias) => write!(f, "{} AS {alias}", self.expr),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Relation {
    Table {
        name: TableName,
        alias: Option<Ident>,
    },
    Subquery {
        query: Box<Query>,
        alias: Option<Ident>,
    },
}

impl Relation {
    pub fn table(name: TableName, alias: Option<Ident>) -> Self {
        Relation::Table { name, alias }
    }

    pub fn subquery(query: Query, alias: Option<Ident>) -> Self {
        Relation::Subquery {
            query: Box::new(query),
            alias,
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let alias = match self {
            Relation::Table { name, alias } => {
                write!(f, "{name}")?;
                alias
            }
            Relation::Subquery { query, alias } => {
                write!(f, "({query})")?;
                alias
            }
        };
        match alias {
            None => Ok(()),
            Some(alias) => write!(f, " AS {alias}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Left,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: Relation,
    pub on: SqlExpr,
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            JoinKind::Left => "LEFT JOIN",
        };
        write!(f, "{kind} {} ON ({})", self.relation, self.on)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub expr: SqlExpr,
    pub order: Ordering,
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.order)
    }
}

/// One clause of a `SELECT`. Clauses of the same kind accumulate in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Projection(SelectItem),
    From(Relation),
    Join(Join),
    Predicate(SqlExpr),
    GroupBy(SqlExpr),
    Having(SqlExpr),
    OrderBy(OrderBy),
    Limit(u64),
    Offset(u64),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<Relation>,
    pub joins: Vec<Join>,
    pub predicates: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Vec<SqlExpr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        match clause {
            Clause::Projection(item) => self.projection.push(item),
            Clause::From(relation) => self.from = Some(relation),
            Clause::Join(join) => self.joins.push(join),
            Clause::Predicate(expr) => self.predicates.push(expr),
            Clause::GroupBy(expr) => self.group_by.push(expr),
            Clause::Having(expr) => self.having.push(expr),
            Clause::OrderBy(order) => self.order_by.push(order),
            Clause::Limit(limit) => self.limit = Some(limit),
            Clause::Offset(offset) => self.offset = Some(offset),
        }
    }
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_conjunction(f: &mut Formatter<'_>, exprs: &[SqlExpr]) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            write!(f, " AND ")?;
        }
        expr.fmt_operand(f, op_precedence(&Operator::And), false)?;
    }
    Ok(())
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.projection.is_empty() {
            write!(f, "*")?;
        } else {
            write_separated(f, &self.projection, ", ")?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        for join in self.joins.iter() {
            write!(f, " {join}")?;
        }
        if !self.predicates.is_empty() {
            write!(f, " WHERE ")?;
            write_conjunction(f, &self.predicates)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_separated(f, &self.group_by, ", ")?;
        }
        if !self.having.is_empty() {
            write!(f, " HAVING ")?;
            write_conjunction(f, &self.having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            write_separated(f, &self.order_by, ", ")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    Select(Box<Select>),
    UnionAll(Vec<Query>),
}

impl Query {
    /// Combines branches with `UNION ALL`. A union needs at least one branch.
    pub fn union_all(mut branches: Vec<Query>) -> Result<Query> {
        match branches.len() {
            0 => Err(QueryError::Internal(
                "union requires at least one branch".to_string(),
            )),
            1 => Ok(branches.remove(0)),
            _ => Ok(Query::UnionAll(branches)),
        }
    }

    /// Number of top level `SELECT` branches.
    pub fn branches(&self) -> usize {
        match self {
            Query::Select(_) => 1,
            Query::UnionAll(branches) => branches.iter().map(|b| b.branches()).sum(),
        }
    }
}

impl From<Select> for Query {
    fn from(select: Select) -> Self {
        Query::Select(Box::new(select))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Query::Select(select) => write!(f, "{select}"),
            Query::UnionAll(branches) => write_separated(f, branches, " UNION ALL "),
        }
    }
}
