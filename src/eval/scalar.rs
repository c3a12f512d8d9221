//! Scalar and predicate evaluation.
//!
//! Scalar expressions evaluate against a tuple context with a two-level
//! scope: attribute references resolve in the current tuple first, then
//! fall back to the environment (where a name denotes the whole relation
//! as a value). That fallback is what makes aggregates over nested
//! relations work inside extend.
//!
//! Arithmetic and comparison are per-domain with one promotion rule:
//! integers promote to decimals when the domains mix. Every other
//! cross-domain operation is a type error.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::ast::{ArithOp, CompareOp, CompareRhs, Predicate, ScalarExpr};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::value::{Tuple, Value};

use super::{aggregate, builtins, expect_relation};

/// Evaluate a scalar expression in a tuple context
pub fn eval_scalar(
    expr: &ScalarExpr,
    tuple: &Tuple,
    env: &Environment,
) -> Result<Value, EvalError> {
    match expr {
        ScalarExpr::Literal(lit) => Ok(lit.to_value()),
        ScalarExpr::Attribute(path) => eval_attribute(path, tuple, env),
        ScalarExpr::Binary { op, left, right } => {
            let l = eval_scalar(left, tuple, env)?;
            let r = eval_scalar(right, tuple, env)?;
            arith(*op, &l, &r)
        }
        ScalarExpr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_predicate(cond, tuple, env)? {
                eval_scalar(then_branch, tuple, env)
            } else {
                eval_scalar(else_branch, tuple, env)
            }
        }
        ScalarExpr::Aggregate { func, arg } => {
            aggregate::eval_tuple_context(*func, arg.as_deref(), tuple, env)
        }
        ScalarExpr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_scalar(arg, tuple, env)?);
            }
            builtins::call(name, &values)
        }
    }
}

fn eval_attribute(
    path: &[String],
    tuple: &Tuple,
    env: &Environment,
) -> Result<Value, EvalError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| EvalError::UnknownAttribute(String::new()))?;

    let base = resolve_name(first, tuple, env)?;

    if rest.is_empty() {
        return Ok(base);
    }
    // A dotted path reaches into a relation-valued attribute, which only
    // has a value under an aggregate.
    Err(EvalError::UnexpectedType {
        expected: "scalar attribute",
        found: base.type_name(),
    })
}

/// Resolve a bare name: current tuple first, environment second
pub fn resolve_name(
    name: &str,
    tuple: &Tuple,
    env: &Environment,
) -> Result<Value, EvalError> {
    if let Some(value) = tuple.get(name) {
        return Ok(value.clone());
    }
    if let Some(rel) = env.get(name) {
        return Ok(Value::Relation(rel.clone()));
    }
    Err(EvalError::UnknownAttribute(name.to_string()))
}

/// Evaluate a predicate directly (no pre-compilation). Used for ternary
/// conditions; filters go through the compiled path in the executor.
pub fn eval_predicate(
    pred: &Predicate,
    tuple: &Tuple,
    env: &Environment,
) -> Result<bool, EvalError> {
    match pred {
        Predicate::And(a, b) => Ok(eval_predicate(a, tuple, env)? && eval_predicate(b, tuple, env)?),
        Predicate::Or(a, b) => Ok(eval_predicate(a, tuple, env)? || eval_predicate(b, tuple, env)?),
        Predicate::Compare { left, op, rhs } => {
            let l = eval_scalar(left, tuple, env)?;
            match rhs {
                CompareRhs::Expr(expr) => {
                    let r = eval_scalar(expr, tuple, env)?;
                    apply_comparison(*op, &l, &r)
                }
                CompareRhs::Set(literals) => Ok(literals
                    .iter()
                    .any(|lit| values_equal(&l, &lit.to_value()))),
                CompareRhs::Subquery(sub) => {
                    let rel = expect_relation(super::eval_rel(sub, env)?)?;
                    if rel.schema().len() != 1 {
                        return Err(EvalError::SubqueryArity(rel.schema().len()));
                    }
                    let found = rel
                        .tuples()
                        .any(|t| t.iter().any(|(_, v)| values_equal(&l, v)));
                    Ok(found)
                }
            }
        }
    }
}

/// Apply a comparison operator to two values
pub fn apply_comparison(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Equal => Ok(values_equal(left, right)),
        CompareOp::NotEqual => Ok(!values_equal(left, right)),
        CompareOp::LessThan => Ok(order_values(left, right)? == Ordering::Less),
        CompareOp::LessOrEqual => Ok(order_values(left, right)? != Ordering::Greater),
        CompareOp::GreaterThan => Ok(order_values(left, right)? == Ordering::Greater),
        CompareOp::GreaterOrEqual => Ok(order_values(left, right)? != Ordering::Less),
    }
}

/// Equality with numeric promotion: integers and decimals compare by
/// numeric value; all other cross-domain pairs are simply unequal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Decimal(b)) => Decimal::from(*a) == *b,
        (Value::Decimal(a), Value::Int(b)) => *a == Decimal::from(*b),
        _ => left == right,
    }
}

/// Ordering within a single domain (with the numeric promotion rule).
/// Cross-domain ordering is an error, as is ordering relations.
pub fn order_values(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Decimal(b)) => Ok(Decimal::from(*a).cmp(b)),
        (Value::Decimal(a), Value::Int(b)) => Ok(a.cmp(&Decimal::from(*b))),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError::IncomparableTypes {
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

/// Canonical key for hash-set membership: integers are promoted to
/// decimals so `{1, 2}` matches a decimal column and vice versa.
pub fn membership_key(value: &Value) -> Value {
    match value {
        Value::Int(v) => Value::Decimal(Decimal::from(*v)),
        other => other.clone(),
    }
}

/// Floor division, rounding toward negative infinity
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Binary arithmetic over numeric values.
///
/// Integer division floors (matching the integer mean); any decimal
/// operand promotes the whole operation to decimal arithmetic.
pub fn arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
                ArithOp::Div => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    Some(floor_div(*a, *b))
                }
            };
            result
                .map(Value::Int)
                .ok_or(EvalError::NumericOverflow(op.as_str()))
        }
        (Value::Decimal(_) | Value::Int(_), Value::Decimal(_) | Value::Int(_)) => {
            let a = promote(left);
            let b = promote(right);
            let result = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Sub => a.checked_sub(b),
                ArithOp::Mul => a.checked_mul(b),
                ArithOp::Div => {
                    if b.is_zero() {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.checked_div(b)
                }
            };
            result
                .map(Value::Decimal)
                .ok_or(EvalError::NumericOverflow(op.as_str()))
        }
        _ => Err(EvalError::TypeMismatch {
            op: op.as_str(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

/// Promote a numeric value to decimal. Callers guarantee numeric input.
fn promote(value: &Value) -> Decimal {
    match value {
        Value::Int(v) => Decimal::from(*v),
        Value::Decimal(v) => *v,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).expect("decimal"))
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            arith(ArithOp::Add, &Value::Int(2), &Value::Int(3)),
            Ok(Value::Int(5))
        );
        assert_eq!(
            arith(ArithOp::Mul, &Value::Int(4), &Value::Int(-3)),
            Ok(Value::Int(-12))
        );
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(
            arith(ArithOp::Div, &Value::Int(7), &Value::Int(2)),
            Ok(Value::Int(3))
        );
        assert_eq!(
            arith(ArithOp::Div, &Value::Int(-7), &Value::Int(2)),
            Ok(Value::Int(-4))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            arith(ArithOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            arith(ArithOp::Div, &dec("1.5"), &dec("0.0")),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_decimal() {
        assert_eq!(arith(ArithOp::Add, &Value::Int(1), &dec("0.5")), Ok(dec("1.5")));
        assert_eq!(arith(ArithOp::Mul, &dec("2.5"), &Value::Int(2)), Ok(dec("5.0")));
    }

    #[test]
    fn test_arithmetic_rejects_non_numeric() {
        let err = arith(ArithOp::Add, &Value::from("a"), &Value::Int(1));
        assert!(matches!(err, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = arith(ArithOp::Add, &Value::Int(i64::MAX), &Value::Int(1));
        assert_eq!(err, Err(EvalError::NumericOverflow("+")));
    }

    #[test]
    fn test_numeric_equality_promotes() {
        assert!(values_equal(&Value::Int(2), &dec("2.0")));
        assert!(!values_equal(&Value::Int(2), &dec("2.5")));
        assert!(!values_equal(&Value::Int(1), &Value::from("1")));
    }

    #[test]
    fn test_ordering_within_domains() {
        assert_eq!(
            order_values(&Value::Int(1), &dec("1.5")),
            Ok(Ordering::Less)
        );
        assert_eq!(
            order_values(&Value::from("a"), &Value::from("b")),
            Ok(Ordering::Less)
        );
        assert!(matches!(
            order_values(&Value::Int(1), &Value::from("1")),
            Err(EvalError::IncomparableTypes { .. })
        ));
    }

    #[test]
    fn test_membership_key_unifies_numerics() {
        assert_eq!(membership_key(&Value::Int(3)), dec("3"));
        assert_eq!(membership_key(&dec("3.0")), dec("3.0"));
        // rust_decimal equality normalizes trailing zeros
        assert_eq!(membership_key(&Value::Int(3)), membership_key(&dec("3.00")));
    }

    #[test]
    fn test_two_level_scope() {
        let mut env = Environment::new();
        env.bind("R", crate::value::Relation::new(["x"]));
        let tuple = Tuple::from_pairs([("a", Value::Int(1))]);

        // tuple attribute wins
        assert_eq!(resolve_name("a", &tuple, &env), Ok(Value::Int(1)));
        // environment fallback yields the relation as a value
        assert!(matches!(
            resolve_name("R", &tuple, &env),
            Ok(Value::Relation(_))
        ));
        assert_eq!(
            resolve_name("missing", &tuple, &env),
            Err(EvalError::UnknownAttribute("missing".into()))
        );
    }
}
