//! # rela - a terse symbolic relational algebra
//!
//! An interpreter for a small relational algebra: source text describing
//! a query is lexed, parsed into an AST, and evaluated against an
//! environment of named in-memory relations.
//!
//! ## Pipeline
//!
//! ```text
//! source text
//!     |
//! [Lexer]     -> token stream (digraphs, literals, positions)
//!     |
//! [Parser]    -> AST (postfix chains, context-dependent * and /)
//!     |
//! [Executor]  -> QueryResult (a Relation, or OrderedTuples after sort)
//! ```
//!
//! The data model is set-based and immutable: a relation is a
//! deduplicated set of attribute-to-value tuples plus its schema, values
//! include nested relations (which is how the algebra avoids nulls), and
//! every operator returns a fresh relation. Sort is the single exit from
//! the relational world: it returns an ordered sequence that only take
//! (`^`) accepts.
//!
//! ## Usage
//!
//! ```rust
//! use rela::{compile_and_eval, Environment, QueryResult};
//! use rela::value::{Relation, Tuple, Value};
//!
//! let mut employees = Relation::new(["name", "salary"]);
//! employees.insert(Tuple::from_pairs([
//!     ("name", Value::from("Alice")),
//!     ("salary", Value::Int(80_000)),
//! ]));
//! employees.insert(Tuple::from_pairs([
//!     ("name", Value::from("Bob")),
//!     ("salary", Value::Int(60_000)),
//! ]));
//!
//! let mut env = Environment::new();
//! env.bind("E", employees);
//!
//! let result = compile_and_eval("E ? salary > 70000 # name", &env)?;
//! let QueryResult::Relation(rel) = result else { unreachable!() };
//! assert_eq!(rel.len(), 1);
//! # Ok::<(), rela::Error>(())
//! ```
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | Data model: Value, Tuple, Relation, OrderedTuples |
//! | `lexer` | Tokenization with digraphs and positions |
//! | `ast` | Node definitions for both expression families |
//! | `parser` | Recursive descent over postfix chains |
//! | `eval` | Tree-walking evaluator, aggregates, built-ins |
//! | `environment` | Name-to-relation bindings |
//! | `session` | Statement layer: meta commands, assignment sugar |
//! | `storage` | CSV/TSV/JSON loading, workspace snapshots |
//! | `render` | ASCII table output |
//! | `config` | Hierarchical configuration |

pub mod ast;
pub mod config;
pub mod environment;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod session;
pub mod storage;
pub mod value;

// Re-export the value-oriented API surface
pub use config::Config;
pub use environment::Environment;
pub use error::{Error, EvalError, LexError, ParseError, RelaResult};
pub use session::{Outcome, Session, SessionError};
pub use value::{OrderedTuples, QueryResult, Relation, Tuple, Value};

use ast::RelExpr;

/// Parse source text into an AST. Purely syntactic.
pub fn parse(source: &str) -> Result<RelExpr, Error> {
    parser::parse_source(source).map_err(Error::from)
}

/// Evaluate an AST against an environment. Purely semantic.
pub fn evaluate(expr: &RelExpr, env: &Environment) -> Result<QueryResult, Error> {
    eval::evaluate(expr, env).map_err(Error::from)
}

/// Parse and evaluate in one step
pub fn compile_and_eval(source: &str, env: &Environment) -> Result<QueryResult, Error> {
    let expr = parse(source)?;
    evaluate(&expr, env)
}
