//! # AST - Abstract Syntax Tree Types
//!
//! Node definitions for parsed queries. Two closed node families:
//!
//! - [`ScalarExpr`] / [`Predicate`]: expressions evaluated against a tuple
//!   context, producing a value or a truth value.
//! - [`RelExpr`]: relational expressions evaluated against the
//!   environment, producing a relation or an ordered sequence.
//!
//! Evaluation is a match over the variants; there is no open polymorphism
//! anywhere in the tree.

use rust_decimal::Decimal;

use crate::value::Value;

// ============================================================================
// Operator enums
// ============================================================================

/// Arithmetic operators inside computation expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
}

impl ArithOp {
    /// Get the string representation
    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Comparison operators inside predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,          // =
    NotEqual,       // !=
    LessThan,       // <
    LessOrEqual,    // <=
    GreaterThan,    // >
    GreaterOrEqual, // >=
}

impl CompareOp {
    /// Get the string representation
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterOrEqual => ">=",
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    /// `#.` - count of tuples
    Count,
    /// `+.` - sum of a numeric attribute
    Sum,
    /// `>.` - maximum of a comparable attribute
    Max,
    /// `<.` - minimum of a comparable attribute
    Min,
    /// `%.` - mean of a numeric attribute (floor division for integers)
    Mean,
}

impl AggregateFunc {
    /// Get the surface spelling
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunc::Count => "#.",
            AggregateFunc::Sum => "+.",
            AggregateFunc::Max => ">.",
            AggregateFunc::Min => "<.",
            AggregateFunc::Mean => "%.",
        }
    }

    /// Whether the aggregate can be written without an argument
    /// (only count, and only in a grouping context)
    pub fn allows_bare(self) -> bool {
        matches!(self, AggregateFunc::Count)
    }
}

// ============================================================================
// Scalar expressions and predicates
// ============================================================================

/// A literal scalar value as written in source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Decimal(Decimal),
    Bool(bool),
    Str(String),
}

impl Literal {
    /// Convert to a runtime value
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Int(v) => Value::Int(*v),
            Literal::Decimal(v) => Value::Decimal(*v),
            Literal::Bool(v) => Value::Bool(*v),
            Literal::Str(v) => Value::Str(v.clone()),
        }
    }
}

/// Scalar expression, evaluated against a tuple context
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    /// Literal value
    Literal(Literal),
    /// Attribute reference, possibly dotted to reach into a
    /// relation-valued attribute (`team.salary`)
    Attribute(Vec<String>),
    /// Binary arithmetic
    Binary {
        op: ArithOp,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
    },
    /// `? cond then else` (extend computations only)
    Ternary {
        cond: Box<Predicate>,
        then_branch: Box<ScalarExpr>,
        else_branch: Box<ScalarExpr>,
    },
    /// Aggregate call (`#.`, `+. salary`, `>. team.salary`, ...)
    Aggregate {
        func: AggregateFunc,
        arg: Option<Box<ScalarExpr>>,
    },
    /// Built-in function call (`round(x, 2)`)
    Call { name: String, args: Vec<ScalarExpr> },
}

impl ScalarExpr {
    /// Build a plain (undotted) attribute reference
    pub fn attribute(name: impl Into<String>) -> Self {
        ScalarExpr::Attribute(vec![name.into()])
    }

    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, ScalarExpr::Literal(_))
    }

    /// Check if this expression is an aggregate call
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ScalarExpr::Aggregate { .. })
    }

    /// Get the attribute path if this is an attribute reference
    pub fn as_attribute(&self) -> Option<&[String]> {
        if let ScalarExpr::Attribute(path) = self {
            Some(path)
        } else {
            None
        }
    }
}

/// The right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum CompareRhs {
    /// An ordinary scalar expression
    Expr(ScalarExpr),
    /// A set literal `{v1, v2, ...}` - membership test, `=` only
    Set(Vec<Literal>),
    /// A parenthesized relational subquery - membership test, `=` only.
    /// Must produce a single-attribute relation.
    Subquery(Box<RelExpr>),
}

/// Predicate over a tuple context
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `left op rhs`
    Compare {
        left: ScalarExpr,
        op: CompareOp,
        rhs: CompareRhs,
    },
    /// `p & q`
    And(Box<Predicate>, Box<Predicate>),
    /// `p | q`
    Or(Box<Predicate>, Box<Predicate>),
}

// ============================================================================
// Relational expressions
// ============================================================================

/// One sort key: attribute plus direction (`salary` / `salary-`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attr: String,
    pub descending: bool,
}

/// Relational expression, evaluated against the environment
#[derive(Debug, Clone, PartialEq)]
pub enum RelExpr {
    /// Bare relation name, looked up in the environment
    Relation(String),
    /// Filter `?` / negated filter `?!`
    Filter {
        input: Box<RelExpr>,
        predicate: Predicate,
        negated: bool,
    },
    /// Project `#`: keep only the named attributes
    Project {
        input: Box<RelExpr>,
        attrs: Vec<String>,
    },
    /// Remove `#!`: keep everything except the named attributes
    Remove {
        input: Box<RelExpr>,
        attrs: Vec<String>,
    },
    /// Natural join `*`; the right operand is always a bare name
    Join { left: Box<RelExpr>, right: String },
    /// Nest join `*: R > alias`
    NestJoin {
        left: Box<RelExpr>,
        right: String,
        alias: String,
    },
    /// Unnest `<: alias`
    Unnest {
        input: Box<RelExpr>,
        alias: String,
    },
    /// Extend `+`: add computed attributes
    Extend {
        input: Box<RelExpr>,
        items: Vec<(String, ScalarExpr)>,
    },
    /// Rename `@`: simultaneous `old > new` substitutions
    Rename {
        input: Box<RelExpr>,
        renames: Vec<(String, String)>,
    },
    /// Union `|`
    Union {
        left: Box<RelExpr>,
        right: Box<RelExpr>,
    },
    /// Difference `-`
    Difference {
        left: Box<RelExpr>,
        right: Box<RelExpr>,
    },
    /// Intersect `&`
    Intersect {
        left: Box<RelExpr>,
        right: Box<RelExpr>,
    },
    /// Summarize `/ key(s) [name: agg ...]`
    Summarize {
        input: Box<RelExpr>,
        keys: Vec<String>,
        aggs: Vec<(String, ScalarExpr)>,
    },
    /// Summarize-all `/. [name: agg ...]`
    SummarizeAll {
        input: Box<RelExpr>,
        aggs: Vec<(String, ScalarExpr)>,
    },
    /// Nest-by `/: key(s) > alias`
    NestBy {
        input: Box<RelExpr>,
        keys: Vec<String>,
        alias: String,
    },
    /// Sort `$`: leaves the relational world, producing ordered tuples
    Sort {
        input: Box<RelExpr>,
        keys: Vec<SortKey>,
    },
    /// Take `^ N`: first N rows of an ordered sequence
    Take { input: Box<RelExpr>, count: usize },
}

impl RelExpr {
    /// Check if this node is a sort (take is only legal directly after one)
    pub fn is_sort(&self) -> bool {
        matches!(self, RelExpr::Sort { .. })
    }

    /// Check if this node produces an ordered sequence rather than a relation
    pub fn is_ordered(&self) -> bool {
        matches!(self, RelExpr::Sort { .. } | RelExpr::Take { .. })
    }

    /// All relation names this expression reads, in first-seen order.
    /// Subqueries inside filter predicates are included.
    pub fn referenced_relations(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_relations(&mut names);
        names
    }

    fn collect_relations(&self, names: &mut Vec<String>) {
        fn push(names: &mut Vec<String>, name: &String) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        match self {
            RelExpr::Relation(name) => push(names, name),
            RelExpr::Filter {
                input, predicate, ..
            } => {
                input.collect_relations(names);
                collect_predicate_relations(predicate, names);
            }
            RelExpr::Project { input, .. }
            | RelExpr::Remove { input, .. }
            | RelExpr::Unnest { input, .. }
            | RelExpr::Extend { input, .. }
            | RelExpr::Rename { input, .. }
            | RelExpr::Summarize { input, .. }
            | RelExpr::SummarizeAll { input, .. }
            | RelExpr::NestBy { input, .. }
            | RelExpr::Sort { input, .. }
            | RelExpr::Take { input, .. } => input.collect_relations(names),
            RelExpr::Join { left, right } | RelExpr::NestJoin { left, right, .. } => {
                left.collect_relations(names);
                push(names, right);
            }
            RelExpr::Union { left, right }
            | RelExpr::Difference { left, right }
            | RelExpr::Intersect { left, right } => {
                left.collect_relations(names);
                right.collect_relations(names);
            }
        }
    }
}

fn collect_predicate_relations(pred: &Predicate, names: &mut Vec<String>) {
    match pred {
        Predicate::Compare { rhs, .. } => {
            if let CompareRhs::Subquery(sub) = rhs {
                sub.collect_relations(names);
            }
        }
        Predicate::And(a, b) | Predicate::Or(a, b) => {
            collect_predicate_relations(a, names);
            collect_predicate_relations(b, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_spellings() {
        assert_eq!(ArithOp::Mul.as_str(), "*");
        assert_eq!(CompareOp::GreaterOrEqual.as_str(), ">=");
        assert_eq!(AggregateFunc::Mean.as_str(), "%.");
    }

    #[test]
    fn test_only_count_allows_bare() {
        assert!(AggregateFunc::Count.allows_bare());
        assert!(!AggregateFunc::Sum.allows_bare());
        assert!(!AggregateFunc::Mean.allows_bare());
    }

    #[test]
    fn test_referenced_relations() {
        // E ? x = (D # id) * F
        let expr = RelExpr::Join {
            left: Box::new(RelExpr::Filter {
                input: Box::new(RelExpr::Relation("E".into())),
                predicate: Predicate::Compare {
                    left: ScalarExpr::attribute("x"),
                    op: CompareOp::Equal,
                    rhs: CompareRhs::Subquery(Box::new(RelExpr::Project {
                        input: Box::new(RelExpr::Relation("D".into())),
                        attrs: vec!["id".into()],
                    })),
                },
                negated: false,
            }),
            right: "F".into(),
        };
        assert_eq!(expr.referenced_relations(), vec!["E", "D", "F"]);
    }

    #[test]
    fn test_ordered_nodes() {
        let sort = RelExpr::Sort {
            input: Box::new(RelExpr::Relation("E".into())),
            keys: vec![SortKey {
                attr: "x".into(),
                descending: true,
            }],
        };
        assert!(sort.is_sort());
        let take = RelExpr::Take {
            input: Box::new(sort),
            count: 3,
        };
        assert!(take.is_ordered());
        assert!(!take.is_sort());
    }
}
