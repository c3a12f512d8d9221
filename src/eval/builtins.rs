//! Built-in scalar functions.
//!
//! Functions live in a name -> callable table so new ones register by
//! adding a row; the evaluator dispatches through [`call`].

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::EvalError;
use crate::value::Value;

/// Signature shared by every built-in
pub type BuiltinFn = fn(&[Value]) -> Result<Value, EvalError>;

struct Builtin {
    arity: usize,
    func: BuiltinFn,
}

fn registry() -> &'static HashMap<&'static str, Builtin> {
    static REGISTRY: OnceLock<HashMap<&'static str, Builtin>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, Builtin> = HashMap::new();
        map.insert(
            "round",
            Builtin {
                arity: 2,
                func: builtin_round,
            },
        );
        map
    })
}

/// Invoke a built-in by name
pub fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let builtin = registry()
        .get(name)
        .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
    if args.len() != builtin.arity {
        return Err(EvalError::FunctionArity {
            name: name.to_string(),
            expected: builtin.arity,
            got: args.len(),
        });
    }
    (builtin.func)(args)
}

/// `round(x, n)` - round `x` to `n` fractional digits.
/// Integers pass through unchanged; decimals stay decimal.
fn builtin_round(args: &[Value]) -> Result<Value, EvalError> {
    let digits = match &args[1] {
        Value::Int(n) if *n >= 0 => u32::try_from(*n).unwrap_or(u32::MAX),
        other => {
            return Err(EvalError::UnexpectedType {
                expected: "non-negative integer digit count",
                found: other.type_name(),
            })
        }
    };
    match &args[0] {
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Decimal(v) => Ok(Value::Decimal(v.round_dp(digits))),
        other => Err(EvalError::UnexpectedType {
            expected: "numeric",
            found: other.type_name(),
        }),
    }
}
