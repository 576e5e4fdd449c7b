// qualis-core/src/infrastructure/compiler/expression.rs

// Turns SQL boolean expressions ("quantity < 1", "email NOT LIKE '%@%'")
// into domain predicates. Parsing is delegated to sqlparser; only the subset
// that maps onto a per-record predicate is accepted.

use chrono::{NaiveDate, NaiveDateTime};
use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;
use tracing::warn;

use crate::domain::quality::{Comparison, Operand, Predicate};
use crate::domain::record::Value;
use crate::infrastructure::error::InfrastructureError;

/// Compiles `expression` or fails with [`InfrastructureError::Expression`].
pub fn compile_predicate(expression: &str) -> Result<Predicate, InfrastructureError> {
    let fail = |reason: String| InfrastructureError::Expression {
        expression: expression.to_string(),
        reason,
    };

    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(expression)
        .map_err(|e| fail(e.to_string()))?;
    let expr = parser.parse_expr().map_err(|e| fail(e.to_string()))?;

    let trailing = parser.peek_token();
    if trailing.token != Token::EOF {
        return Err(fail(format!("unexpected trailing input at `{}`", trailing.token)));
    }

    to_predicate(&expr).map_err(fail)
}

/// Like [`compile_predicate`], but a failure becomes a `Malformed` predicate
/// so the owning rule errors at evaluation time instead of blocking the run.
pub fn compile_predicate_lenient(expression: &str) -> Predicate {
    match compile_predicate(expression) {
        Ok(predicate) => predicate,
        Err(e) => {
            warn!(%expression, error = %e, "keeping malformed predicate");
            let reason = match e {
                InfrastructureError::Expression { reason, .. } => reason,
                other => other.to_string(),
            };
            Predicate::Malformed {
                expression: expression.to_string(),
                reason,
            }
        }
    }
}

fn to_predicate(expr: &Expr) -> Result<Predicate, String> {
    match expr {
        Expr::Nested(inner) => to_predicate(inner),

        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(to_predicate(left)?.and(to_predicate(right)?)),
            BinaryOperator::Or => Ok(to_predicate(left)?.or(to_predicate(right)?)),
            other => Ok(Predicate::Compare {
                left: operand(left)?,
                op: comparison(other)?,
                right: operand(right)?,
            }),
        },

        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr,
        } => Ok(to_predicate(expr)?.negate()),

        Expr::IsNull(inner) => Ok(Predicate::is_null(&column(inner)?, false)),
        Expr::IsNotNull(inner) => Ok(Predicate::is_null(&column(inner)?, true)),

        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => {
            let pattern = match operand(pattern)? {
                Operand::Literal(Value::Text(p)) => p,
                other => return Err(format!("LIKE pattern must be a string, got `{}`", other)),
            };
            Predicate::like(&column(expr)?, &pattern, *negated).map_err(|e| e.to_string())
        }

        Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let subject = operand(expr)?;
            let inside = Predicate::Compare {
                left: subject.clone(),
                op: Comparison::GtEq,
                right: operand(low)?,
            }
            .and(Predicate::Compare {
                left: subject,
                op: Comparison::LtEq,
                right: operand(high)?,
            });
            Ok(if *negated { inside.negate() } else { inside })
        }

        other => Err(format!("unsupported expression `{}`", other)),
    }
}

fn operand(expr: &Expr) -> Result<Operand, String> {
    match expr {
        Expr::Identifier(ident) => Ok(Operand::Column(ident.value.clone())),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| Operand::Column(ident.value.clone()))
            .ok_or_else(|| "empty identifier".to_string()),
        Expr::Nested(inner) => operand(inner),
        Expr::Value(v) => literal(&v.value).map(Operand::Literal),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match operand(expr)? {
            Operand::Literal(Value::Integer(i)) => Ok(Operand::Literal(Value::Integer(-i))),
            Operand::Literal(Value::Float(f)) => Ok(Operand::Literal(Value::Float(-f))),
            other => Err(format!("cannot negate `{}`", other)),
        },
        Expr::TypedString { .. } => typed_literal(&expr.to_string()).map(Operand::Literal),
        other => Err(format!("unsupported operand `{}`", other)),
    }
}

fn column(expr: &Expr) -> Result<String, String> {
    match operand(expr)? {
        Operand::Column(c) => Ok(c),
        Operand::Literal(v) => Err(format!("expected a column, got literal {}", v)),
    }
}

fn comparison(op: &BinaryOperator) -> Result<Comparison, String> {
    match op {
        BinaryOperator::Lt => Ok(Comparison::Lt),
        BinaryOperator::LtEq => Ok(Comparison::LtEq),
        BinaryOperator::Gt => Ok(Comparison::Gt),
        BinaryOperator::GtEq => Ok(Comparison::GtEq),
        BinaryOperator::Eq => Ok(Comparison::Eq),
        BinaryOperator::NotEq => Ok(Comparison::NotEq),
        other => Err(format!("unsupported operator `{}`", other)),
    }
}

fn literal(value: &SqlValue) -> Result<Value, String> {
    match value {
        SqlValue::Number(n, _) => n
            .parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| n.parse::<f64>().map(Value::Float))
            .map_err(|_| format!("invalid number `{}`", n)),
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(format!("unsupported literal `{}`", other)),
    }
}

// `DATE '2024-01-01'` / `TIMESTAMP '2024-01-01 10:00:00'`, from the rendered SQL
fn typed_literal(rendered: &str) -> Result<Value, String> {
    let (type_name, rest) = rendered
        .split_once(' ')
        .ok_or_else(|| format!("unsupported typed literal `{}`", rendered))?;
    let text = rest.trim().trim_matches('\'');

    match type_name.to_ascii_uppercase().as_str() {
        "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| format!("invalid date `{}`: {}", text, e)),
        "TIMESTAMP" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .map(Value::Timestamp)
            .map_err(|e| format!("invalid timestamp `{}`: {}", text, e)),
        _ => Ok(Value::Text(text.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::record::Record;

    fn eval(expression: &str, record: &Record) -> Option<bool> {
        compile_predicate(expression)
            .unwrap()
            .evaluate(record)
            .unwrap()
    }

    #[test]
    fn test_simple_comparison() {
        let p = compile_predicate("quantity < 1").unwrap();
        assert_eq!(p.columns(), vec!["quantity"]);
        let rec = Record::from_pairs([("quantity", Value::Integer(-1))]);
        assert_eq!(p.evaluate(&rec).unwrap(), Some(true));
    }

    #[test]
    fn test_column_to_column_and_negative_literal() {
        let rec = Record::from_pairs([
            ("ship_date", Value::Text("2024-01-01".into())),
            ("order_date", Value::Text("2024-01-05".into())),
            ("delta", Value::Integer(-3)),
        ]);
        assert_eq!(eval("ship_date < order_date", &rec), Some(true));
        assert_eq!(eval("delta = -3", &rec), Some(true));
    }

    #[test]
    fn test_boolean_composition() {
        let rec = Record::from_pairs([("quantity", Value::Integer(5)), ("price", Value::Float(12.5))]);
        assert_eq!(eval("quantity < 1 OR NOT (price <= 10)", &rec), Some(true));
        assert_eq!(eval("quantity < 1 AND price > 10", &rec), Some(false));
    }

    #[test]
    fn test_null_tests_and_like() {
        let rec = Record::from_pairs([
            ("email", Value::Text("nobody".into())),
            ("discount", Value::Null),
        ]);
        assert_eq!(eval("email NOT LIKE '%@%'", &rec), Some(true));
        assert_eq!(eval("discount IS NULL", &rec), Some(true));
        assert_eq!(eval("discount IS NOT NULL", &rec), Some(false));
    }

    #[test]
    fn test_between_and_date_literal() {
        let rec = Record::from_pairs([
            ("quantity", Value::Integer(150)),
            (
                "order_date",
                Value::Date(NaiveDate::from_ymd_opt(2019, 6, 1).unwrap()),
            ),
        ]);
        assert_eq!(eval("quantity NOT BETWEEN 1 AND 100", &rec), Some(true));
        assert_eq!(eval("order_date < DATE '2020-01-01'", &rec), Some(true));
    }

    #[test]
    fn test_incomplete_expression_is_rejected() {
        let err = compile_predicate("quantity <").unwrap_err();
        assert!(matches!(err, InfrastructureError::Expression { .. }));
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        assert!(compile_predicate("quantity < 1 2").is_err());
    }

    #[test]
    fn test_unsupported_function_is_rejected() {
        let err = compile_predicate("length(name) > 3").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_lenient_compile_keeps_malformed() {
        let p = compile_predicate_lenient("quantity <");
        assert!(matches!(p, Predicate::Malformed { .. }));
    }
}
