use std::fmt;
use std::fmt::Display;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub use crate::query::expr::Expr;
pub use crate::query::expr::Value;

pub mod expr;

/// Enum of all supported aggregate functions
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AggregateFunction {
    /// count
    Count,
    /// count(distinct)
    CountUnique,
    /// sum
    Sum,
    /// min
    Min,
    /// max
    Max,
    /// avg
    Avg,
}

impl AggregateFunction {
    /// Function name as it appears in generated SQL.
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count | AggregateFunction::CountUnique => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Avg => "avg",
        }
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_uppercase())
    }
}

/// Operators applied to expressions
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Expressions are equal
    Eq,
    /// Expressions are not equal
    NotEq,
    /// Left side is smaller than right side
    Lt,
    /// Left side is smaller or equal to right side
    LtEq,
    /// Left side is greater than right side
    Gt,
    /// Left side is greater or equal to right side
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::And => "AND",
            Operator::Or => "OR",
        };
        write!(f, "{op}")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Timeframe {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Threshold on an aggregate computed per user. `minimum` is inclusive, `maximum` exclusive.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Aggregation {
    #[serde(rename = "type")]
    pub typ: AggregateFunction,
    pub field: Option<String>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl Aggregation {
    /// Aggregation over the user itself: `COUNT` without a field.
    pub fn targets_user(&self) -> bool {
        self.typ == AggregateFunction::Count && self.field.is_none()
    }
}

/// Users who did at least one event of `collection` matching the optional constraints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub collection: String,
    #[serde(default)]
    pub filter: Option<Expr>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
}

impl EventFilter {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            timeframe: None,
            aggregation: None,
        }
    }

    pub fn with_filter(self, filter: Expr) -> Self {
        Self {
            filter: Some(filter),
            ..self
        }
    }

    pub fn with_timeframe(self, timeframe: Timeframe) -> Self {
        Self {
            timeframe: Some(timeframe),
            ..self
        }
    }

    pub fn with_aggregation(self, aggregation: Aggregation) -> Self {
        Self {
            aggregation: Some(aggregation),
            ..self
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Ordering {
    #[default]
    Asc,
    Desc,
}

impl Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ordering::Asc => write!(f, "ASC"),
            Ordering::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Sorting {
    pub column: String,
    #[serde(default)]
    pub order: Ordering,
}

impl Sorting {
    pub fn new(column: impl Into<String>, order: Ordering) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }
}
