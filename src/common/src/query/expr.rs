//! Boolean predicate AST used by event filters and attribute searches.

use serde::Deserialize;
use serde::Serialize;
use sqlparser::ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::error::CommonError;
use crate::error::Result;
use crate::query::Operator;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Expr {
    /// Possibly qualified column reference, one entry per name part.
    Column(Vec<String>),
    Literal(Value),
    Binary {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
}

impl Expr {
    /// Parses SQL predicate text, e.g. `amount > 10 AND country = 'US'`.
    pub fn parse(sql: &str) -> Result<Expr> {
        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect).try_with_sql(sql)?;
        let expr = parser.parse_expr()?;
        let next = parser.peek_token();
        if next.token != Token::EOF {
            return Err(CommonError::BadRequest(format!(
                "unexpected {} after filter expression",
                next.token
            )));
        }

        expr.try_into()
    }

    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(vec![name.into()])
    }

    pub fn lit(value: Value) -> Expr {
        Expr::Literal(value)
    }

    pub fn binary(left: Expr, op: Operator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(self, Operator::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(self, Operator::Or, other)
    }
}

fn boxed(expr: ast::Expr) -> Result<Box<Expr>> {
    Ok(Box::new(expr.try_into()?))
}

fn unsupported(what: impl ToString) -> CommonError {
    CommonError::BadRequest(format!("unsupported filter expression: {}", what.to_string()))
}

impl TryFrom<ast::Value> for Value {
    type Error = CommonError;

    fn try_from(v: ast::Value) -> std::result::Result<Self, Self::Error> {
        Ok(match v {
            ast::Value::Null => Value::Null,
            ast::Value::Boolean(b) => Value::Boolean(b),
            ast::Value::SingleQuotedString(s) => Value::String(s),
            ast::Value::Number(n, _) => match n.parse::<i64>() {
                Ok(i) => Value::Int64(i),
                Err(_) => match n.parse::<f64>() {
                    Ok(f) if f.is_finite() => Value::Float64(f),
                    _ => return Err(CommonError::BadRequest(format!("invalid number {n}"))),
                },
            },
            other => return Err(unsupported(other)),
        })
    }
}

impl TryFrom<ast::BinaryOperator> for Operator {
    type Error = CommonError;

    fn try_from(op: ast::BinaryOperator) -> std::result::Result<Self, Self::Error> {
        Ok(match op {
            ast::BinaryOperator::Eq => Operator::Eq,
            ast::BinaryOperator::NotEq => Operator::NotEq,
            ast::BinaryOperator::Lt => Operator::Lt,
            ast::BinaryOperator::LtEq => Operator::LtEq,
            ast::BinaryOperator::Gt => Operator::Gt,
            ast::BinaryOperator::GtEq => Operator::GtEq,
            ast::BinaryOperator::Plus => Operator::Plus,
            ast::BinaryOperator::Minus => Operator::Minus,
            ast::BinaryOperator::Multiply => Operator::Multiply,
            ast::BinaryOperator::Divide => Operator::Divide,
            ast::BinaryOperator::Modulo => Operator::Modulo,
            ast::BinaryOperator::And => Operator::And,
            ast::BinaryOperator::Or => Operator::Or,
            other => return Err(unsupported(other)),
        })
    }
}

impl TryFrom<ast::Expr> for Expr {
    type Error = CommonError;

    fn try_from(expr: ast::Expr) -> std::result::Result<Self, Self::Error> {
        Ok(match expr {
            ast::Expr::Identifier(ident) => Expr::Column(vec![ident.value]),
            ast::Expr::CompoundIdentifier(idents) => {
                Expr::Column(idents.into_iter().map(|i| i.value).collect())
            }
            ast::Expr::Value(v) => Expr::Literal(v.try_into()?),
            ast::Expr::Nested(e) => (*e).try_into()?,
            ast::Expr::BinaryOp { left, op, right } => Expr::Binary {
                left: boxed(*left)?,
                op: op.try_into()?,
                right: boxed(*right)?,
            },
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Not,
                expr,
            } => Expr::Not(boxed(*expr)?),
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Minus,
                expr,
            } => match Expr::try_from(*expr)? {
                Expr::Literal(Value::Int64(v)) => Expr::Literal(Value::Int64(-v)),
                Expr::Literal(Value::Float64(v)) => Expr::Literal(Value::Float64(-v)),
                other => Expr::binary(Expr::Literal(Value::Int64(0)), Operator::Minus, other),
            },
            ast::Expr::IsNull(e) => Expr::IsNull(boxed(*e)?),
            ast::Expr::IsNotNull(e) => Expr::IsNotNull(boxed(*e)?),
            ast::Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: boxed(*expr)?,
                list: list
                    .into_iter()
                    .map(Expr::try_from)
                    .collect::<Result<Vec<_>>>()?,
                negated,
            },
            ast::Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => Expr::Like {
                expr: boxed(*expr)?,
                pattern: boxed(*pattern)?,
                negated,
            },
            ast::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Expr::Between {
                expr: boxed(*expr)?,
                low: boxed(*low)?,
                high: boxed(*high)?,
                negated,
            },
            other => return Err(unsupported(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_comparison_and_logic() -> Result<()> {
        let expr = Expr::parse("amount >= 10 AND (country = 'US' OR country IS NULL)")?;
        let expected = Expr::binary(
            Expr::column("amount"),
            Operator::GtEq,
            Expr::lit(Value::Int64(10)),
        )
        .and(
            Expr::binary(
                Expr::column("country"),
                Operator::Eq,
                Expr::lit(Value::String("US".to_string())),
            )
            .or(Expr::IsNull(Box::new(Expr::column("country")))),
        );
        assert_eq!(expr, expected);
        Ok(())
    }

    #[test]
    fn parse_qualified_and_lists() -> Result<()> {
        let expr = Expr::parse("collection.plan NOT IN ('free', 'trial')")?;
        assert_eq!(
            expr,
            Expr::InList {
                expr: Box::new(Expr::Column(vec![
                    "collection".to_string(),
                    "plan".to_string()
                ])),
                list: vec![
                    Expr::lit(Value::String("free".to_string())),
                    Expr::lit(Value::String("trial".to_string())),
                ],
                negated: true,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_negative_and_float_literals() -> Result<()> {
        let expr = Expr::parse("price BETWEEN -1 AND 2.5")?;
        assert_eq!(
            expr,
            Expr::Between {
                expr: Box::new(Expr::column("price")),
                low: Box::new(Expr::lit(Value::Int64(-1))),
                high: Box::new(Expr::lit(Value::Float64(2.5))),
                negated: false,
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let err = Expr::parse("amount > 1e400").unwrap_err();
        assert!(matches!(err, CommonError::BadRequest(_)));
    }

    #[test]
    fn rejects_trailing_statements() {
        assert!(Expr::parse("a = 1; DROP TABLE users").is_err());
    }

    #[test]
    fn rejects_subqueries_and_functions() {
        assert!(Expr::parse("a IN (SELECT id FROM secrets)").is_err());
        assert!(Expr::parse("lower(a) = 'x'").is_err());
    }

    #[test]
    fn deserialize_from_json() -> Result<()> {
        let expr: Expr = serde_json::from_str(
            r#"{"binary":{"left":{"column":["amount"]},"op":"gt","right":{"literal":{"int64":3}}}}"#,
        )?;
        assert_eq!(
            expr,
            Expr::binary(Expr::column("amount"), Operator::Gt, Expr::lit(Value::Int64(3)))
        );
        Ok(())
    }
}
