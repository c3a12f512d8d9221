//! # Executor
//!
//! Tree-walking evaluator for relational expressions. Each node evaluates
//! its children and applies set-based operator semantics over the
//! immutable data model.
//!
//! Every step of a chain is either a relation or an ordered sequence of
//! tuples, and the two do not mix: [`expect_relation`] guards every
//! relational operator, and take is the only consumer of ordered input.
//! Results never contain duplicate tuples and always carry a schema
//! derivable from the input schemas alone.
//!
//! Filters are compiled before the tuple loop: constant right-hand sides
//! are pre-evaluated, set literals and membership subqueries become hash
//! sets, and only genuinely tuple-dependent operands are re-evaluated per
//! tuple.

pub mod aggregate;
pub mod builtins;
pub mod scalar;

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::ast::{CompareOp, CompareRhs, Predicate, RelExpr, ScalarExpr, SortKey};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::value::{OrderedTuples, QueryResult, Relation, Tuple, Value};

use scalar::{apply_comparison, eval_scalar, membership_key, order_values};

/// Evaluate a relational expression against an environment
pub fn evaluate(expr: &RelExpr, env: &Environment) -> Result<QueryResult, EvalError> {
    debug!(relations = ?expr.referenced_relations(), "evaluating query");
    eval_rel(expr, env)
}

pub(crate) fn eval_rel(expr: &RelExpr, env: &Environment) -> Result<QueryResult, EvalError> {
    match expr {
        RelExpr::Relation(name) => env
            .get(name)
            .cloned()
            .map(QueryResult::Relation)
            .ok_or_else(|| EvalError::UnknownRelation(name.clone())),
        RelExpr::Filter {
            input,
            predicate,
            negated,
        } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_filter(&rel, predicate, *negated, env).map(QueryResult::Relation)
        }
        RelExpr::Project { input, attrs } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_project(&rel, attrs).map(QueryResult::Relation)
        }
        RelExpr::Remove { input, attrs } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_remove(&rel, attrs).map(QueryResult::Relation)
        }
        RelExpr::Join { left, right } => {
            let l = expect_relation(eval_rel(left, env)?)?;
            let r = lookup(right, env)?;
            Ok(QueryResult::Relation(eval_join(&l, &r)))
        }
        RelExpr::NestJoin { left, right, alias } => {
            let l = expect_relation(eval_rel(left, env)?)?;
            let r = lookup(right, env)?;
            eval_nest_join(&l, &r, alias).map(QueryResult::Relation)
        }
        RelExpr::Unnest { input, alias } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_unnest(&rel, alias).map(QueryResult::Relation)
        }
        RelExpr::Extend { input, items } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_extend(&rel, items, env).map(QueryResult::Relation)
        }
        RelExpr::Rename { input, renames } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_rename(&rel, renames).map(QueryResult::Relation)
        }
        RelExpr::Union { left, right } => {
            let (l, r) = eval_set_operands(left, right, env)?;
            let mut out = l;
            for tuple in r.tuples() {
                out.insert(tuple.clone());
            }
            Ok(QueryResult::Relation(out))
        }
        RelExpr::Difference { left, right } => {
            let (l, r) = eval_set_operands(left, right, env)?;
            let mut out = Relation::new(l.schema_vec());
            for tuple in l.tuples() {
                if !r.contains(tuple) {
                    out.insert(tuple.clone());
                }
            }
            Ok(QueryResult::Relation(out))
        }
        RelExpr::Intersect { left, right } => {
            let (l, r) = eval_set_operands(left, right, env)?;
            let mut out = Relation::new(l.schema_vec());
            for tuple in l.tuples() {
                if r.contains(tuple) {
                    out.insert(tuple.clone());
                }
            }
            Ok(QueryResult::Relation(out))
        }
        RelExpr::Summarize { input, keys, aggs } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_summarize(&rel, keys, aggs, env).map(QueryResult::Relation)
        }
        RelExpr::SummarizeAll { input, aggs } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_summarize_all(&rel, aggs, env).map(QueryResult::Relation)
        }
        RelExpr::NestBy { input, keys, alias } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_nest_by(&rel, keys, alias).map(QueryResult::Relation)
        }
        RelExpr::Sort { input, keys } => {
            let rel = expect_relation(eval_rel(input, env)?)?;
            eval_sort(&rel, keys).map(QueryResult::Ordered)
        }
        RelExpr::Take { input, count } => match eval_rel(input, env)? {
            QueryResult::Ordered(ordered) => Ok(QueryResult::Ordered(ordered.take(*count))),
            QueryResult::Relation(_) => Err(EvalError::TakeOnRelation),
        },
    }
}

/// Demand a relation; ordered sequences stop here
pub(crate) fn expect_relation(result: QueryResult) -> Result<Relation, EvalError> {
    match result {
        QueryResult::Relation(rel) => Ok(rel),
        QueryResult::Ordered(_) => Err(EvalError::OrderedOperand),
    }
}

fn lookup(name: &str, env: &Environment) -> Result<Relation, EvalError> {
    env.get(name)
        .cloned()
        .ok_or_else(|| EvalError::UnknownRelation(name.to_string()))
}

fn require_attrs(rel: &Relation, attrs: &[String]) -> Result<(), EvalError> {
    for attr in attrs {
        if !rel.has_attribute(attr) {
            return Err(EvalError::MissingAttribute {
                attr: attr.clone(),
                schema: rel.schema_vec(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Filter
// ============================================================================

/// Predicate with constant operands pre-evaluated and membership sets
/// hashed. Only tuple-dependent operands survive as expressions.
enum CompiledRhs {
    Const(Value),
    Membership(HashSet<Value>),
    Expr(ScalarExpr),
}

enum CompiledPredicate {
    Compare {
        left: ScalarExpr,
        op: CompareOp,
        rhs: CompiledRhs,
    },
    And(Box<CompiledPredicate>, Box<CompiledPredicate>),
    Or(Box<CompiledPredicate>, Box<CompiledPredicate>),
}

fn compile_predicate(
    pred: &Predicate,
    env: &Environment,
) -> Result<CompiledPredicate, EvalError> {
    match pred {
        Predicate::And(a, b) => Ok(CompiledPredicate::And(
            Box::new(compile_predicate(a, env)?),
            Box::new(compile_predicate(b, env)?),
        )),
        Predicate::Or(a, b) => Ok(CompiledPredicate::Or(
            Box::new(compile_predicate(a, env)?),
            Box::new(compile_predicate(b, env)?),
        )),
        Predicate::Compare { left, op, rhs } => {
            let rhs = match rhs {
                CompareRhs::Set(literals) => CompiledRhs::Membership(
                    literals
                        .iter()
                        .map(|lit| membership_key(&lit.to_value()))
                        .collect(),
                ),
                CompareRhs::Subquery(sub) => {
                    let rel = expect_relation(eval_rel(sub, env)?)?;
                    if rel.schema().len() != 1 {
                        return Err(EvalError::SubqueryArity(rel.schema().len()));
                    }
                    CompiledRhs::Membership(
                        rel.tuples()
                            .flat_map(|t| t.iter().map(|(_, v)| membership_key(v)))
                            .collect(),
                    )
                }
                CompareRhs::Expr(ScalarExpr::Literal(lit)) => CompiledRhs::Const(lit.to_value()),
                CompareRhs::Expr(expr) => CompiledRhs::Expr(expr.clone()),
            };
            Ok(CompiledPredicate::Compare {
                left: left.clone(),
                op: *op,
                rhs,
            })
        }
    }
}

fn eval_compiled(
    pred: &CompiledPredicate,
    tuple: &Tuple,
    env: &Environment,
) -> Result<bool, EvalError> {
    match pred {
        CompiledPredicate::And(a, b) => {
            Ok(eval_compiled(a, tuple, env)? && eval_compiled(b, tuple, env)?)
        }
        CompiledPredicate::Or(a, b) => {
            Ok(eval_compiled(a, tuple, env)? || eval_compiled(b, tuple, env)?)
        }
        CompiledPredicate::Compare { left, op, rhs } => {
            let l = eval_scalar(left, tuple, env)?;
            match rhs {
                CompiledRhs::Membership(set) => Ok(set.contains(&membership_key(&l))),
                CompiledRhs::Const(r) => apply_comparison(*op, &l, r),
                CompiledRhs::Expr(expr) => {
                    let r = eval_scalar(expr, tuple, env)?;
                    apply_comparison(*op, &l, &r)
                }
            }
        }
    }
}

fn eval_filter(
    rel: &Relation,
    predicate: &Predicate,
    negated: bool,
    env: &Environment,
) -> Result<Relation, EvalError> {
    let compiled = compile_predicate(predicate, env)?;
    let mut out = Relation::new(rel.schema_vec());
    for tuple in rel.tuples() {
        // Predicates are two-valued; negation is plain complement
        if eval_compiled(&compiled, tuple, env)? != negated {
            out.insert(tuple.clone());
        }
    }
    Ok(out)
}

// ============================================================================
// Project / remove / rename / extend
// ============================================================================

fn eval_project(rel: &Relation, attrs: &[String]) -> Result<Relation, EvalError> {
    require_attrs(rel, attrs)?;
    let mut out = Relation::new(attrs.iter().cloned());
    for tuple in rel.tuples() {
        if let Some(projected) = tuple.project(attrs.iter().map(String::as_str)) {
            out.insert(projected);
        }
    }
    Ok(out)
}

fn eval_remove(rel: &Relation, attrs: &[String]) -> Result<Relation, EvalError> {
    require_attrs(rel, attrs)?;
    let removed: BTreeSet<String> = attrs.iter().cloned().collect();
    let keep: Vec<String> = rel
        .schema()
        .iter()
        .filter(|name| !removed.contains(*name))
        .cloned()
        .collect();
    let mut out = Relation::new(keep);
    for tuple in rel.tuples() {
        out.insert(tuple.without(&removed));
    }
    Ok(out)
}

fn eval_rename(rel: &Relation, renames: &[(String, String)]) -> Result<Relation, EvalError> {
    let mut mapping: HashMap<&str, &str> = HashMap::new();
    for (old, new) in renames {
        if !rel.has_attribute(old) {
            return Err(EvalError::MissingAttribute {
                attr: old.clone(),
                schema: rel.schema_vec(),
            });
        }
        if mapping.insert(old.as_str(), new.as_str()).is_some() {
            return Err(EvalError::DuplicateAttribute(old.clone()));
        }
    }

    // All renames apply simultaneously, so swaps are legal; the check is
    // that the substituted schema has no collisions.
    let mut new_schema: BTreeSet<String> = BTreeSet::new();
    for attr in rel.schema() {
        let renamed = mapping.get(attr.as_str()).copied().unwrap_or(attr.as_str());
        if !new_schema.insert(renamed.to_string()) {
            return Err(EvalError::DuplicateAttribute(renamed.to_string()));
        }
    }

    let mut out = Relation::new(new_schema);
    for tuple in rel.tuples() {
        let renamed = Tuple::from_pairs(tuple.iter().map(|(name, value)| {
            let name = mapping.get(name.as_str()).copied().unwrap_or(name.as_str());
            (name.to_string(), value.clone())
        }));
        out.insert(renamed);
    }
    Ok(out)
}

fn eval_extend(
    rel: &Relation,
    items: &[(String, ScalarExpr)],
    env: &Environment,
) -> Result<Relation, EvalError> {
    let mut new_schema = rel.schema().clone();
    for (name, _) in items {
        if !new_schema.insert(name.clone()) {
            return Err(EvalError::DuplicateAttribute(name.clone()));
        }
    }

    let mut out = Relation::new(new_schema);
    for tuple in rel.tuples() {
        // Every computation sees the original tuple, not earlier items
        let mut extended = tuple.clone();
        for (name, expr) in items {
            let value = eval_scalar(expr, tuple, env)?;
            extended = extended.with(name.clone(), value);
        }
        out.insert(extended);
    }
    Ok(out)
}

// ============================================================================
// Joins and nesting
// ============================================================================

fn common_attrs(l: &Relation, r: &Relation) -> Vec<String> {
    l.schema().intersection(r.schema()).cloned().collect()
}

fn key_of(tuple: &Tuple, attrs: &[String]) -> Vec<Value> {
    attrs
        .iter()
        .filter_map(|attr| tuple.get(attr).cloned())
        .collect()
}

/// Index the right side by its values on the join attributes
fn index_by<'a>(rel: &'a Relation, attrs: &[String]) -> HashMap<Vec<Value>, Vec<&'a Tuple>> {
    let mut index: HashMap<Vec<Value>, Vec<&Tuple>> = HashMap::new();
    for tuple in rel.tuples() {
        index.entry(key_of(tuple, attrs)).or_default().push(tuple);
    }
    index
}

fn eval_join(l: &Relation, r: &Relation) -> Relation {
    let common = common_attrs(l, r);
    let index = index_by(r, &common);

    let schema: BTreeSet<String> = l.schema().union(r.schema()).cloned().collect();
    let mut out = Relation::new(schema);
    for left_tuple in l.tuples() {
        if let Some(matches) = index.get(&key_of(left_tuple, &common)) {
            for right_tuple in matches {
                out.insert(left_tuple.merged(right_tuple));
            }
        }
    }
    out
}

fn eval_nest_join(l: &Relation, r: &Relation, alias: &str) -> Result<Relation, EvalError> {
    if l.has_attribute(alias) {
        return Err(EvalError::DuplicateAttribute(alias.to_string()));
    }
    let common = common_attrs(l, r);
    let inner_schema: Vec<String> = r
        .schema()
        .iter()
        .filter(|attr| !l.has_attribute(attr))
        .cloned()
        .collect();
    let index = index_by(r, &common);

    let mut schema = l.schema().clone();
    schema.insert(alias.to_string());
    let mut out = Relation::new(schema);

    // Every left tuple survives; no matches means an empty nested
    // relation with the correct schema, never a dropped row.
    for left_tuple in l.tuples() {
        let mut inner = Relation::new(inner_schema.iter().cloned());
        if let Some(matches) = index.get(&key_of(left_tuple, &common)) {
            for right_tuple in matches {
                if let Some(projected) =
                    right_tuple.project(inner_schema.iter().map(String::as_str))
                {
                    inner.insert(projected);
                }
            }
        }
        out.insert(left_tuple.with(alias, Value::Relation(inner)));
    }
    Ok(out)
}

fn eval_unnest(rel: &Relation, alias: &str) -> Result<Relation, EvalError> {
    if !rel.has_attribute(alias) {
        return Err(EvalError::MissingAttribute {
            attr: alias.to_string(),
            schema: rel.schema_vec(),
        });
    }
    let dropped: BTreeSet<String> = [alias.to_string()].into();
    let outer_schema: BTreeSet<String> = rel
        .schema()
        .iter()
        .filter(|attr| attr.as_str() != alias)
        .cloned()
        .collect();

    // The inner schema lives in the values, so an empty input can only
    // keep its outer attributes.
    let mut tuples = rel.tuples();
    let Some(first) = tuples.next() else {
        return Ok(Relation::new(outer_schema));
    };

    let inner_schema = match first.get(alias) {
        Some(Value::Relation(inner)) => inner.schema().clone(),
        Some(other) => {
            return Err(EvalError::UnexpectedType {
                expected: "relation",
                found: other.type_name(),
            })
        }
        None => unreachable!("attribute presence checked above"),
    };
    for attr in &inner_schema {
        if outer_schema.contains(attr) {
            return Err(EvalError::UnnestCollision {
                alias: alias.to_string(),
                attr: attr.clone(),
            });
        }
    }

    let schema: BTreeSet<String> = outer_schema.union(&inner_schema).cloned().collect();
    let mut out = Relation::new(schema);
    for tuple in rel.tuples() {
        let Some(Value::Relation(inner)) = tuple.get(alias) else {
            return Err(EvalError::UnexpectedType {
                expected: "relation",
                found: tuple.get(alias).map_or("missing", Value::type_name),
            });
        };
        if *inner.schema() != inner_schema {
            return Err(EvalError::InconsistentInnerSchema(alias.to_string()));
        }
        let outer = tuple.without(&dropped);
        // An empty nested relation contributes no rows for this tuple
        for inner_tuple in inner.tuples() {
            out.insert(outer.merged(inner_tuple));
        }
    }
    Ok(out)
}

// ============================================================================
// Set operations
// ============================================================================

fn eval_set_operands(
    left: &RelExpr,
    right: &RelExpr,
    env: &Environment,
) -> Result<(Relation, Relation), EvalError> {
    let l = expect_relation(eval_rel(left, env)?)?;
    let r = expect_relation(eval_rel(right, env)?)?;
    if l.schema() != r.schema() {
        return Err(EvalError::SchemaMismatch {
            left: l.schema_vec(),
            right: r.schema_vec(),
        });
    }
    Ok((l, r))
}

// ============================================================================
// Grouping
// ============================================================================

fn check_agg_names(
    keys: &[String],
    aggs: &[(String, ScalarExpr)],
) -> Result<(), EvalError> {
    let mut seen: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
    for (name, _) in aggs {
        if !seen.insert(name) {
            return Err(EvalError::DuplicateAttribute(name.clone()));
        }
    }
    Ok(())
}

fn group_rows<'a>(rel: &'a Relation, keys: &[String]) -> HashMap<Vec<Value>, Vec<&'a Tuple>> {
    let mut groups: HashMap<Vec<Value>, Vec<&Tuple>> = HashMap::new();
    for tuple in rel.tuples() {
        groups.entry(key_of(tuple, keys)).or_default().push(tuple);
    }
    groups
}

fn eval_summarize(
    rel: &Relation,
    keys: &[String],
    aggs: &[(String, ScalarExpr)],
    env: &Environment,
) -> Result<Relation, EvalError> {
    require_attrs(rel, keys)?;
    check_agg_names(keys, aggs)?;

    let schema: Vec<String> = keys
        .iter()
        .cloned()
        .chain(aggs.iter().map(|(name, _)| name.clone()))
        .collect();
    let mut out = Relation::new(schema);

    // No input groups, no output tuples
    for rows in group_rows(rel, keys).values() {
        let representative = rows
            .first()
            .and_then(|t| t.project(keys.iter().map(String::as_str)));
        let Some(mut tuple) = representative else {
            continue;
        };
        for (name, expr) in aggs {
            let value = eval_agg_expr(expr, rows, env)?;
            tuple = tuple.with(name.clone(), value);
        }
        out.insert(tuple);
    }
    Ok(out)
}

fn eval_summarize_all(
    rel: &Relation,
    aggs: &[(String, ScalarExpr)],
    env: &Environment,
) -> Result<Relation, EvalError> {
    check_agg_names(&[], aggs)?;
    let rows: Vec<&Tuple> = rel.tuples().collect();

    let mut tuple = Tuple::new();
    for (name, expr) in aggs {
        let value = eval_agg_expr(expr, &rows, env)?;
        tuple = tuple.with(name.clone(), value);
    }

    let mut out = Relation::new(aggs.iter().map(|(name, _)| name.clone()));
    out.insert(tuple);
    Ok(out)
}

fn eval_agg_expr(
    expr: &ScalarExpr,
    rows: &[&Tuple],
    env: &Environment,
) -> Result<Value, EvalError> {
    match expr {
        ScalarExpr::Aggregate { func, arg } => {
            aggregate::eval_group(*func, arg.as_deref(), rows, env)
        }
        _ => Err(EvalError::UnexpectedType {
            expected: "aggregate",
            found: "expression",
        }),
    }
}

fn eval_nest_by(rel: &Relation, keys: &[String], alias: &str) -> Result<Relation, EvalError> {
    require_attrs(rel, keys)?;
    if keys.iter().any(|key| key == alias) {
        return Err(EvalError::DuplicateAttribute(alias.to_string()));
    }

    let key_set: BTreeSet<String> = keys.iter().cloned().collect();
    let inner_schema: Vec<String> = rel
        .schema()
        .iter()
        .filter(|attr| !key_set.contains(*attr))
        .cloned()
        .collect();

    let mut schema = key_set.clone();
    schema.insert(alias.to_string());
    let mut out = Relation::new(schema);

    for rows in group_rows(rel, keys).values() {
        let representative = rows
            .first()
            .and_then(|t| t.project(keys.iter().map(String::as_str)));
        let Some(key_tuple) = representative else {
            continue;
        };
        let mut inner = Relation::new(inner_schema.iter().cloned());
        for row in rows {
            if let Some(projected) = row.project(inner_schema.iter().map(String::as_str)) {
                inner.insert(projected);
            }
        }
        out.insert(key_tuple.with(alias, Value::Relation(inner)));
    }
    Ok(out)
}

// ============================================================================
// Sort / take
// ============================================================================

fn eval_sort(rel: &Relation, keys: &[SortKey]) -> Result<OrderedTuples, EvalError> {
    let attrs: Vec<String> = keys.iter().map(|key| key.attr.clone()).collect();
    require_attrs(rel, &attrs)?;

    // Validate each key column up front so the comparator below is total:
    // one domain per column, and relations do not order at all.
    for key in keys {
        let mut first_seen: Option<&Value> = None;
        for tuple in rel.tuples() {
            let Some(value) = tuple.get(&key.attr) else {
                continue;
            };
            if matches!(value, Value::Relation(_)) {
                return Err(EvalError::IncomparableTypes {
                    left: "relation",
                    right: "relation",
                });
            }
            match first_seen {
                None => first_seen = Some(value),
                Some(previous) => {
                    order_values(previous, value)?;
                }
            }
        }
    }

    // Stable sort over the canonical order, so equal-key runs come out
    // in a deterministic order.
    let mut rows: Vec<Tuple> = rel.tuples().cloned().collect();
    rows.sort_by(|a, b| {
        for key in keys {
            let (Some(l), Some(r)) = (a.get(&key.attr), b.get(&key.attr)) else {
                continue;
            };
            let ordering = order_values(l, r).unwrap_or(std::cmp::Ordering::Equal);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });

    Ok(OrderedTuples::new(rel.schema().clone(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn int_relation(attrs: &[&str], rows: &[&[i64]]) -> Relation {
        let mut rel = Relation::new(attrs.iter().copied());
        for row in rows {
            rel.insert(Tuple::from_pairs(
                attrs.iter().zip(row.iter()).map(|(a, v)| (*a, Value::Int(*v))),
            ));
        }
        rel
    }

    fn env_with(pairs: &[(&str, Relation)]) -> Environment {
        let mut env = Environment::new();
        for (name, rel) in pairs {
            env.bind(*name, rel.clone());
        }
        env
    }

    fn run(source: &str, env: &Environment) -> Result<QueryResult, EvalError> {
        let expr = parse_source(source).expect("parses");
        evaluate(&expr, env)
    }

    fn run_relation(source: &str, env: &Environment) -> Relation {
        match run(source, env).expect("evaluates") {
            QueryResult::Relation(rel) => rel,
            QueryResult::Ordered(_) => panic!("expected a relation"),
        }
    }

    #[test]
    fn test_unknown_relation() {
        let env = Environment::new();
        assert_eq!(
            run("Nope", &env),
            Err(EvalError::UnknownRelation("Nope".into()))
        );
    }

    #[test]
    fn test_project_deduplicates() {
        let rel = int_relation(&["a", "b"], &[&[1, 10], &[1, 20], &[2, 30]]);
        let env = env_with(&[("R", rel)]);
        let out = run_relation("R # a", &env);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_project_missing_attribute() {
        let env = env_with(&[("R", int_relation(&["a"], &[&[1]]))]);
        assert!(matches!(
            run("R # missing", &env),
            Err(EvalError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_remove_keeps_complement() {
        let rel = int_relation(&["a", "b", "c"], &[&[1, 2, 3]]);
        let env = env_with(&[("R", rel)]);
        let out = run_relation("R #! b", &env);
        assert_eq!(out.schema_vec(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_join_on_common_attribute() {
        let l = int_relation(&["id", "x"], &[&[1, 10], &[2, 20]]);
        let r = int_relation(&["id", "y"], &[&[1, 100], &[3, 300]]);
        let env = env_with(&[("L", l), ("R", r)]);
        let out = run_relation("L * R", &env);
        assert_eq!(out.len(), 1);
        let tuple = out.tuples().next().expect("one tuple");
        assert_eq!(tuple.get("x"), Some(&Value::Int(10)));
        assert_eq!(tuple.get("y"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_join_without_common_attributes_is_product() {
        let l = int_relation(&["a"], &[&[1], &[2]]);
        let r = int_relation(&["b"], &[&[10], &[20], &[30]]);
        let env = env_with(&[("L", l), ("R", r)]);
        assert_eq!(run_relation("L * R", &env).len(), 6);
    }

    #[test]
    fn test_nest_join_keeps_unmatched_left_tuples() {
        let l = int_relation(&["id"], &[&[1], &[2]]);
        let r = int_relation(&["id", "n"], &[&[1, 7], &[1, 8]]);
        let env = env_with(&[("L", l), ("R", r)]);
        let out = run_relation("L *: R > ns", &env);
        assert_eq!(out.len(), 2);
        for tuple in out.tuples() {
            let Some(Value::Relation(inner)) = tuple.get("ns") else {
                panic!("nested attribute must be a relation");
            };
            assert_eq!(inner.schema_vec(), vec!["n".to_string()]);
            match tuple.get("id") {
                Some(Value::Int(1)) => assert_eq!(inner.len(), 2),
                Some(Value::Int(2)) => assert!(inner.is_empty()),
                other => panic!("unexpected id {other:?}"),
            }
        }
    }

    #[test]
    fn test_unnest_inverts_nest_join_on_matches() {
        let l = int_relation(&["id"], &[&[1], &[2]]);
        let r = int_relation(&["id", "n"], &[&[1, 7], &[1, 8]]);
        let env = env_with(&[("L", l), ("R", r)]);
        let unnested = run_relation("L *: R > ns <: ns", &env);
        let joined = run_relation("L * R", &env);
        assert_eq!(unnested, joined);
    }

    #[test]
    fn test_extend_collision() {
        let env = env_with(&[("R", int_relation(&["a"], &[&[1]]))]);
        assert_eq!(
            run("R + a: 1", &env),
            Err(EvalError::DuplicateAttribute("a".into()))
        );
    }

    #[test]
    fn test_extend_sees_original_tuple() {
        let env = env_with(&[("R", int_relation(&["a"], &[&[2]]))]);
        // Both items compute from the original tuple; "b" is not visible to "c"
        let out = run_relation("R + [b: a * 10 c: a + 1]", &env);
        let tuple = out.tuples().next().expect("one tuple");
        assert_eq!(tuple.get("b"), Some(&Value::Int(20)));
        assert_eq!(tuple.get("c"), Some(&Value::Int(3)));
        assert!(matches!(
            run("R + [b: a c: b]", &env),
            Err(EvalError::UnknownAttribute(name)) if name == "b"
        ));
    }

    #[test]
    fn test_rename_swap() {
        let env = env_with(&[("R", int_relation(&["a", "b"], &[&[1, 2]]))]);
        let out = run_relation("R @ [a > b b > a]", &env);
        let tuple = out.tuples().next().expect("one tuple");
        assert_eq!(tuple.get("a"), Some(&Value::Int(2)));
        assert_eq!(tuple.get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_rename_collision() {
        let env = env_with(&[("R", int_relation(&["a", "b"], &[&[1, 2]]))]);
        assert_eq!(
            run("R @ a > b", &env),
            Err(EvalError::DuplicateAttribute("b".into()))
        );
    }

    #[test]
    fn test_set_ops_require_equal_schemas() {
        let env = env_with(&[
            ("L", int_relation(&["a"], &[&[1]])),
            ("R", int_relation(&["b"], &[&[1]])),
        ]);
        for op in ["|", "-", "&"] {
            assert!(matches!(
                run(&format!("L {op} R"), &env),
                Err(EvalError::SchemaMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_intersect_equals_join_on_same_schema() {
        let l = int_relation(&["a", "b"], &[&[1, 2], &[3, 4]]);
        let r = int_relation(&["a", "b"], &[&[1, 2], &[5, 6]]);
        let env = env_with(&[("L", l), ("R", r)]);
        assert_eq!(run_relation("L & R", &env), run_relation("L * R", &env));
    }

    #[test]
    fn test_summarize_empty_input_is_empty() {
        let env = env_with(&[("R", int_relation(&["k", "v"], &[]))]);
        let out = run_relation("R / k [n: #.]", &env);
        assert!(out.is_empty());
        assert_eq!(out.schema_vec(), vec!["k".to_string(), "n".to_string()]);
    }

    #[test]
    fn test_summarize_all_empty_input() {
        let env = env_with(&[("R", int_relation(&["v"], &[]))]);
        let out = run_relation("R /. [n: #. total: +. v]", &env);
        assert_eq!(out.len(), 1);
        let tuple = out.tuples().next().expect("one tuple");
        assert_eq!(tuple.get("n"), Some(&Value::Int(0)));
        assert_eq!(tuple.get("total"), Some(&Value::Int(0)));

        assert_eq!(
            run("R /. [m: <. v]", &env),
            Err(EvalError::EmptyAggregate("<."))
        );
    }

    #[test]
    fn test_nest_by_groups() {
        let rel = int_relation(&["k", "v"], &[&[1, 10], &[1, 20], &[2, 30]]);
        let env = env_with(&[("R", rel)]);
        let out = run_relation("R /: k > grp", &env);
        assert_eq!(out.len(), 2);
        for tuple in out.tuples() {
            let Some(Value::Relation(inner)) = tuple.get("grp") else {
                panic!("expected nested relation");
            };
            assert_eq!(inner.schema_vec(), vec!["v".to_string()]);
        }
    }

    #[test]
    fn test_sort_take_boundary() {
        let rel = int_relation(&["v"], &[&[3], &[1], &[2]]);
        let env = env_with(&[("R", rel)]);

        let QueryResult::Ordered(ordered) = run("R $ v- ^ 2", &env).expect("evaluates") else {
            panic!("expected ordered tuples");
        };
        let values: Vec<&Value> =
            ordered.rows().filter_map(|t| t.get("v")).collect();
        assert_eq!(values, [&Value::Int(3), &Value::Int(2)]);

        // A relational operator after sort crosses the type boundary
        assert_eq!(run("R $ v # v", &env), Err(EvalError::OrderedOperand));
    }

    #[test]
    fn test_sort_mixed_domain_errors() {
        let mut rel = Relation::new(["v"]);
        rel.insert(Tuple::from_pairs([("v", Value::Int(1))]));
        rel.insert(Tuple::from_pairs([("v", Value::from("a"))]));
        let env = env_with(&[("R", rel)]);
        assert!(matches!(
            run("R $ v", &env),
            Err(EvalError::IncomparableTypes { .. })
        ));
    }

    #[test]
    fn test_filter_membership_subquery() {
        let e = int_relation(&["emp_id", "x"], &[&[1, 0], &[2, 0], &[3, 0]]);
        let p = int_relation(&["emp_id", "n"], &[&[1, 7], &[3, 8]]);
        let env = env_with(&[("E", e), ("P", p)]);
        let out = run_relation("E ? emp_id = (P # emp_id)", &env);
        assert_eq!(out.len(), 2);

        assert_eq!(run("E ? emp_id = (P)", &env), Err(EvalError::SubqueryArity(2)));
    }

    #[test]
    fn test_filter_set_literal() {
        let rel = int_relation(&["v"], &[&[1], &[2], &[3]]);
        let env = env_with(&[("R", rel)]);
        assert_eq!(run_relation("R ? v = {1, 3}", &env).len(), 2);
        assert_eq!(run_relation("R ?! v = {1, 3}", &env).len(), 1);
    }
}
