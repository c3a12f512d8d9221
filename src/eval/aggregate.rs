//! Aggregate evaluation.
//!
//! Aggregates run in two contexts with one shared fold:
//!
//! - **group context** (summarize, summarize-all): the rows are a group
//!   partition and the argument is evaluated once per row.
//! - **tuple context** (extend, filters): the argument is an attribute
//!   path whose head resolves to a relation-valued attribute; the fold
//!   runs over that nested relation's tuples.
//!
//! Empty-input policy: count, sum, and mean of nothing are integer zero;
//! min and max of nothing is a domain error.

use rust_decimal::Decimal;

use crate::ast::{AggregateFunc, ScalarExpr};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::value::{Tuple, Value};

use super::scalar::{arith, eval_scalar, order_values, resolve_name};
use crate::ast::ArithOp;

/// Evaluate an aggregate over a group of rows
pub fn eval_group(
    func: AggregateFunc,
    arg: Option<&ScalarExpr>,
    rows: &[&Tuple],
    env: &Environment,
) -> Result<Value, EvalError> {
    if func == AggregateFunc::Count {
        return Ok(Value::Int(rows.len() as i64));
    }

    let arg = arg.ok_or(EvalError::AggregateNeedsArgument(func.as_str()))?;
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        values.push(eval_scalar(arg, row, env)?);
    }
    fold(func, values)
}

/// Evaluate an aggregate inside a single-tuple context (extend or a
/// filter predicate). The argument must be an attribute path whose first
/// segment is a relation-valued attribute of the current tuple (or a
/// relation in the environment); the remaining path is evaluated per
/// inner tuple.
pub fn eval_tuple_context(
    func: AggregateFunc,
    arg: Option<&ScalarExpr>,
    tuple: &Tuple,
    env: &Environment,
) -> Result<Value, EvalError> {
    let arg = arg.ok_or(EvalError::AggregateNeedsArgument(func.as_str()))?;
    let path = arg
        .as_attribute()
        .ok_or(EvalError::UnexpectedType {
            expected: "an attribute path into a nested relation",
            found: "expression",
        })?;

    let (head, rest) = path
        .split_first()
        .ok_or_else(|| EvalError::UnknownAttribute(String::new()))?;
    let base = resolve_name(head, tuple, env)?;
    let Value::Relation(inner) = base else {
        return Err(EvalError::UnexpectedType {
            expected: "relation",
            found: base.type_name(),
        });
    };

    let rows: Vec<&Tuple> = inner.tuples().collect();
    if rest.is_empty() {
        if func == AggregateFunc::Count {
            return Ok(Value::Int(rows.len() as i64));
        }
        return Err(EvalError::UnexpectedType {
            expected: "an attribute path into the nested relation",
            found: "relation",
        });
    }

    let inner_arg = ScalarExpr::Attribute(rest.to_vec());
    eval_group(func, Some(&inner_arg), &rows, env)
}

/// Fold a collected value column into the aggregate result
fn fold(func: AggregateFunc, values: Vec<Value>) -> Result<Value, EvalError> {
    match func {
        AggregateFunc::Count => Ok(Value::Int(values.len() as i64)),
        AggregateFunc::Sum => fold_sum(values),
        AggregateFunc::Mean => fold_mean(values),
        AggregateFunc::Min | AggregateFunc::Max => fold_extremum(func, values),
    }
}

fn fold_sum(values: Vec<Value>) -> Result<Value, EvalError> {
    let mut acc = Value::Int(0);
    for value in values {
        if !value.is_numeric() {
            return Err(EvalError::UnexpectedType {
                expected: "numeric",
                found: value.type_name(),
            });
        }
        acc = arith(ArithOp::Add, &acc, &value)?;
    }
    Ok(acc)
}

fn fold_mean(values: Vec<Value>) -> Result<Value, EvalError> {
    if values.is_empty() {
        return Ok(Value::Int(0));
    }
    let count = values.len() as i64;
    let sum = fold_sum(values)?;
    match sum {
        // All-integer groups stay in integer arithmetic: floor division
        Value::Int(_) => arith(ArithOp::Div, &sum, &Value::Int(count)),
        Value::Decimal(total) => {
            let quotient = total
                .checked_div(Decimal::from(count))
                .ok_or(EvalError::NumericOverflow("%."))?;
            Ok(Value::Decimal(quotient))
        }
        _ => Err(EvalError::UnexpectedType {
            expected: "numeric",
            found: sum.type_name(),
        }),
    }
}

fn fold_extremum(func: AggregateFunc, values: Vec<Value>) -> Result<Value, EvalError> {
    let mut iter = values.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(EvalError::EmptyAggregate(func.as_str()));
    };
    for value in iter {
        let ordering = order_values(&value, &best)?;
        let replace = match func {
            AggregateFunc::Max => ordering == std::cmp::Ordering::Greater,
            _ => ordering == std::cmp::Ordering::Less,
        };
        if replace {
            best = value;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Relation;
    use std::str::FromStr;

    fn rows(values: &[i64]) -> Vec<Tuple> {
        values
            .iter()
            .map(|v| Tuple::from_pairs([("salary", Value::Int(*v))]))
            .collect()
    }

    fn group_eval(func: AggregateFunc, tuples: &[Tuple]) -> Result<Value, EvalError> {
        let env = Environment::new();
        let arg = ScalarExpr::attribute("salary");
        let refs: Vec<&Tuple> = tuples.iter().collect();
        eval_group(func, Some(&arg), &refs, &env)
    }

    #[test]
    fn test_count_ignores_argument() {
        let env = Environment::new();
        let tuples = rows(&[1, 2, 3]);
        let refs: Vec<&Tuple> = tuples.iter().collect();
        assert_eq!(
            eval_group(AggregateFunc::Count, None, &refs, &env),
            Ok(Value::Int(3))
        );
    }

    #[test]
    fn test_sum_min_max() {
        let tuples = rows(&[80_000, 60_000, 90_000]);
        assert_eq!(
            group_eval(AggregateFunc::Sum, &tuples),
            Ok(Value::Int(230_000))
        );
        assert_eq!(
            group_eval(AggregateFunc::Min, &tuples),
            Ok(Value::Int(60_000))
        );
        assert_eq!(
            group_eval(AggregateFunc::Max, &tuples),
            Ok(Value::Int(90_000))
        );
    }

    #[test]
    fn test_integer_mean_floors() {
        // (80000 + 60000 + 90000) / 3 = 76666.67 floored
        let tuples = rows(&[80_000, 60_000, 90_000]);
        assert_eq!(
            group_eval(AggregateFunc::Mean, &tuples),
            Ok(Value::Int(76_666))
        );
    }

    #[test]
    fn test_mixed_mean_promotes_to_decimal() {
        let tuples = vec![
            Tuple::from_pairs([("salary", Value::Int(1))]),
            Tuple::from_pairs([(
                "salary",
                Value::Decimal(Decimal::from_str("2.5").expect("decimal")),
            )]),
        ];
        assert_eq!(
            group_eval(AggregateFunc::Mean, &tuples),
            Ok(Value::Decimal(Decimal::from_str("1.75").expect("decimal")))
        );
    }

    #[test]
    fn test_empty_policies() {
        let empty: Vec<Tuple> = Vec::new();
        assert_eq!(group_eval(AggregateFunc::Sum, &empty), Ok(Value::Int(0)));
        assert_eq!(group_eval(AggregateFunc::Mean, &empty), Ok(Value::Int(0)));
        assert_eq!(
            group_eval(AggregateFunc::Min, &empty),
            Err(EvalError::EmptyAggregate("<."))
        );
        assert_eq!(
            group_eval(AggregateFunc::Max, &empty),
            Err(EvalError::EmptyAggregate(">."))
        );
    }

    #[test]
    fn test_sum_rejects_strings() {
        let tuples = vec![Tuple::from_pairs([("salary", Value::from("oops"))])];
        assert!(matches!(
            group_eval(AggregateFunc::Sum, &tuples),
            Err(EvalError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_tuple_context_aggregates_nested_relation() {
        let env = Environment::new();
        let mut team = Relation::new(["salary"]);
        for v in [55_000, 45_000] {
            team.insert(Tuple::from_pairs([("salary", Value::Int(v))]));
        }
        let outer = Tuple::from_pairs([
            ("dept_id", Value::Int(20)),
            ("team", Value::Relation(team)),
        ]);

        let arg = ScalarExpr::Attribute(vec!["team".into(), "salary".into()]);
        assert_eq!(
            eval_tuple_context(AggregateFunc::Max, Some(&arg), &outer, &env),
            Ok(Value::Int(55_000))
        );

        let bare = ScalarExpr::attribute("team");
        assert_eq!(
            eval_tuple_context(AggregateFunc::Count, Some(&bare), &outer, &env),
            Ok(Value::Int(2))
        );
    }

    #[test]
    fn test_tuple_context_requires_relation() {
        let env = Environment::new();
        let outer = Tuple::from_pairs([("x", Value::Int(1))]);
        let arg = ScalarExpr::attribute("x");
        assert!(matches!(
            eval_tuple_context(AggregateFunc::Count, Some(&arg), &outer, &env),
            Err(EvalError::UnexpectedType { .. })
        ));
    }
}
