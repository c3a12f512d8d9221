//! Error Types
//!
//! One error enum per pipeline stage, plus a crate-level umbrella.
//! Every error carries a human-readable message; lexer and parser errors
//! also carry the (line, column) origin of the offending token.

use thiserror::Error;

/// Lexer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// String literal with no closing quote
    #[error("unterminated string literal starting at {line}:{col}")]
    UnterminatedString { line: u32, col: u32 },

    /// Regex literal with no closing slash
    #[error("unterminated regex literal starting at {line}:{col}")]
    UnterminatedRegex { line: u32, col: u32 },

    /// Character that starts no token
    #[error("unexpected character '{ch}' at {line}:{col}")]
    UnexpectedChar { ch: char, line: u32, col: u32 },

    /// Numeric literal that does not fit the value domain
    #[error("invalid numeric literal '{text}' at {line}:{col}")]
    InvalidNumber { text: String, line: u32, col: u32 },
}

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Lexing failed before parsing could start
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Token that does not fit the grammar at this point
    #[error("unexpected {found} at {line}:{col}: expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        line: u32,
        col: u32,
    },

    /// Input ended mid-production
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEnd { expected: String },

    /// Binary set operator whose right side is not a name or parenthesized chain
    #[error("invalid right operand for '{op}' at {line}:{col}: expected a relation name or a parenthesized chain")]
    InvalidRightOperand { op: String, line: u32, col: u32 },

    /// Multiple items supplied where brackets are required
    #[error("brackets required at {line}:{col}: {context}")]
    BracketRequired {
        context: String,
        line: u32,
        col: u32,
    },

    /// Bare binary arithmetic inside a ternary branch
    #[error("bare binary arithmetic is not allowed in a ternary branch at {line}:{col}; parenthesize the expression")]
    ArithmeticInBranch { line: u32, col: u32 },

    /// `^` used without a directly preceding sort
    #[error("'^' at {line}:{col} requires an immediately preceding sort")]
    TakeWithoutSort { line: u32, col: u32 },
}

/// Evaluation errors
///
/// Covers the name, schema, type, domain, and boundary error classes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    // --- name errors ---
    /// Reference to a relation name the environment does not bind
    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    /// Attribute reference that resolves neither in the tuple nor the environment
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    // --- schema errors ---
    /// Operator naming an attribute absent from its input schema
    #[error("attribute '{attr}' is not in the input schema {schema:?}")]
    MissingAttribute { attr: String, schema: Vec<String> },

    /// Set operation over relations with different schemas
    #[error("schemas do not match: left {left:?}, right {right:?}")]
    SchemaMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    /// Extended, renamed, or nested attribute colliding with an existing one
    #[error("attribute '{0}' already exists")]
    DuplicateAttribute(String),

    /// Unnest where the inner schema overlaps the outer one
    #[error("unnest of '{alias}' would collide on attribute '{attr}'")]
    UnnestCollision { alias: String, attr: String },

    /// Unnest over an attribute whose inner schemas disagree
    #[error("relation-valued attribute '{0}' has inconsistent inner schemas")]
    InconsistentInnerSchema(String),

    /// Membership subquery producing more than one attribute
    #[error("membership subquery must produce exactly one attribute, got {0}")]
    SubqueryArity(usize),

    // --- type errors ---
    /// Arithmetic over non-numeric operands
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Ordering comparison over values from different domains
    #[error("cannot compare {left} and {right}")]
    IncomparableTypes {
        left: &'static str,
        right: &'static str,
    },

    /// Value of the wrong kind in a position that demands a specific one
    #[error("expected a {expected} value, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    /// Unknown built-in function name
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Built-in called with the wrong number of arguments
    #[error("function '{name}' expects {expected} arguments, got {got}")]
    FunctionArity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Aggregate that needs an argument but was given none
    #[error("aggregate '{0}' requires an argument here")]
    AggregateNeedsArgument(&'static str),

    // --- domain errors ---
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Arithmetic result outside the representable range
    #[error("numeric overflow in '{0}'")]
    NumericOverflow(&'static str),

    /// Min or max over an empty collection
    #[error("aggregate '{0}' over an empty collection")]
    EmptyAggregate(&'static str),

    // --- boundary errors ---
    /// Relational operator applied to an ordered sequence
    #[error("relational operator applied to an ordered sequence; only '^' accepts one")]
    OrderedOperand,

    /// `^` applied to a relation
    #[error("'^' requires an ordered sequence produced by sort")]
    TakeOnRelation,
}

/// Crate-level error: anything the pipeline can surface to a host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexError> for Error {
    fn from(err: LexError) -> Self {
        Error::Parse(ParseError::Lex(err))
    }
}

/// Result alias for whole-pipeline operations
pub type RelaResult<T> = Result<T, Error>;
