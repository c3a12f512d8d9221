//! Error taxonomy tests: every failure class surfaces as the right
//! error, with no partial results and no effect on the environment.

use rela::value::{Relation, Tuple, Value};
use rela::{compile_and_eval, Environment, Error, EvalError, LexError, ParseError};

fn small_env() -> Environment {
    let mut env = Environment::new();

    let mut e = Relation::new(["emp_id", "name", "salary"]);
    for (emp_id, name, salary) in [(1, "Alice", 80_000), (2, "Bob", 60_000)] {
        e.insert(Tuple::from_pairs([
            ("emp_id", Value::Int(emp_id)),
            ("name", Value::from(name)),
            ("salary", Value::Int(salary)),
        ]));
    }
    env.bind("E", e);

    let mut d = Relation::new(["dept_id"]);
    d.insert(Tuple::from_pairs([("dept_id", Value::Int(10))]));
    env.bind("D", d);

    env
}

fn eval_err(source: &str) -> Error {
    compile_and_eval(source, &small_env()).expect_err("query must fail")
}

// --- lex errors ---

#[test]
fn test_unterminated_string() {
    assert!(matches!(
        eval_err("E ? name = \"oops"),
        Error::Parse(ParseError::Lex(LexError::UnterminatedString { .. }))
    ));
}

#[test]
fn test_unexpected_character() {
    assert!(matches!(
        eval_err("E ! x"),
        Error::Parse(ParseError::Lex(LexError::UnexpectedChar { ch: '!', .. }))
    ));
}

#[test]
fn test_integer_out_of_range() {
    assert!(matches!(
        eval_err("E ? salary > 99999999999999999999"),
        Error::Parse(ParseError::Lex(LexError::InvalidNumber { .. }))
    ));
}

// --- parse errors ---

#[test]
fn test_unexpected_token_carries_position() {
    let Error::Parse(ParseError::UnexpectedToken { line, col, .. }) = eval_err("E # 42") else {
        panic!("expected an unexpected-token error");
    };
    assert_eq!(line, 1);
    assert_eq!(col, 5);
}

#[test]
fn test_unexpected_end() {
    assert!(matches!(
        eval_err("E ? salary >"),
        Error::Parse(ParseError::UnexpectedEnd { .. })
    ));
}

#[test]
fn test_invalid_right_operand() {
    assert!(matches!(
        eval_err("E | 5"),
        Error::Parse(ParseError::InvalidRightOperand { .. })
    ));
    assert!(matches!(
        eval_err("E * (D # dept_id)"),
        Error::Parse(ParseError::InvalidRightOperand { .. })
    ));
}

#[test]
fn test_bracket_required_for_aggregates() {
    assert!(matches!(
        eval_err("E / emp_id n: #."),
        Error::Parse(ParseError::BracketRequired { .. })
    ));
}

#[test]
fn test_arithmetic_in_ternary_branch() {
    assert!(matches!(
        eval_err("E + x: ? salary > 0 salary / 2 0"),
        Error::Parse(ParseError::ArithmeticInBranch { .. })
    ));
}

#[test]
fn test_take_without_sort() {
    assert!(matches!(
        eval_err("E ^ 3"),
        Error::Parse(ParseError::TakeWithoutSort { .. })
    ));
}

// --- name errors ---

#[test]
fn test_unknown_relation() {
    assert_eq!(
        eval_err("Missing # x"),
        Error::Eval(EvalError::UnknownRelation("Missing".into()))
    );
}

#[test]
fn test_unknown_attribute_in_expression() {
    assert_eq!(
        eval_err("E + x: missing + 1"),
        Error::Eval(EvalError::UnknownAttribute("missing".into()))
    );
}

// --- schema errors ---

#[test]
fn test_project_missing_attribute() {
    assert!(matches!(
        eval_err("E # missing"),
        Error::Eval(EvalError::MissingAttribute { .. })
    ));
}

#[test]
fn test_rename_missing_source() {
    assert!(matches!(
        eval_err("E @ missing > other"),
        Error::Eval(EvalError::MissingAttribute { .. })
    ));
}

#[test]
fn test_rename_collision() {
    assert_eq!(
        eval_err("E @ emp_id > name"),
        Error::Eval(EvalError::DuplicateAttribute("name".into()))
    );
}

#[test]
fn test_extend_collision() {
    assert_eq!(
        eval_err("E + name: 1"),
        Error::Eval(EvalError::DuplicateAttribute("name".into()))
    );
}

#[test]
fn test_set_op_schema_mismatch() {
    for op in ["|", "-", "&"] {
        assert!(matches!(
            eval_err(&format!("E {op} D")),
            Error::Eval(EvalError::SchemaMismatch { .. })
        ));
    }
}

#[test]
fn test_subquery_must_be_single_attribute() {
    assert_eq!(
        eval_err("E ? emp_id = (E)"),
        Error::Eval(EvalError::SubqueryArity(3))
    );
}

// --- type errors ---

#[test]
fn test_arithmetic_on_strings() {
    assert!(matches!(
        eval_err("E + x: name + 1"),
        Error::Eval(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn test_comparison_across_domains() {
    assert!(matches!(
        eval_err("E ? name > 5"),
        Error::Eval(EvalError::IncomparableTypes { .. })
    ));
}

#[test]
fn test_aggregate_over_non_numeric() {
    assert!(matches!(
        eval_err("E /. [t: +. name]"),
        Error::Eval(EvalError::UnexpectedType { .. })
    ));
}

#[test]
fn test_unknown_function() {
    assert_eq!(
        eval_err("E + x: sqrt(salary)"),
        Error::Eval(EvalError::UnknownFunction("sqrt".into()))
    );
}

#[test]
fn test_function_arity() {
    assert!(matches!(
        eval_err("E + x: round(salary)"),
        Error::Eval(EvalError::FunctionArity { .. })
    ));
}

// --- domain errors ---

#[test]
fn test_division_by_zero() {
    assert_eq!(
        eval_err("E + x: salary / 0"),
        Error::Eval(EvalError::DivisionByZero)
    );
}

#[test]
fn test_min_over_empty_input() {
    let mut env = Environment::new();
    env.bind("Empty", Relation::new(["v"]));
    let err = compile_and_eval("Empty /. [m: <. v]", &env).expect_err("must fail");
    assert_eq!(err, Error::Eval(EvalError::EmptyAggregate("<.")));
}

// --- boundary errors ---

#[test]
fn test_relational_operator_after_sort() {
    assert_eq!(
        eval_err("E $ salary ? salary > 0"),
        Error::Eval(EvalError::OrderedOperand)
    );
}

#[test]
fn test_sort_after_sort() {
    assert_eq!(
        eval_err("E $ salary $ emp_id"),
        Error::Eval(EvalError::OrderedOperand)
    );
}
