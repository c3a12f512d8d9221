//! Session driver.
//!
//! The statement layer between a line of input and the core pipeline:
//!
//! - Meta commands (dot-prefix): `.load`, `.rel`, `.save`, `.open`,
//!   `.drop`, `.help`, `.quit`
//! - Assignment sugar: `name := chain` binds a query result, and the
//!   compound forms `|=` / `-=` / `?=` rebind a name through union,
//!   difference, or a filter
//! - Anything else is a query, evaluated and returned
//!
//! The session owns the environment and is the only thing that mutates
//! it. A query or assignment that fails leaves the environment exactly
//! as it was: results are computed first and bound after.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::ast::RelExpr;
use crate::environment::Environment;
use crate::error::Error;
use crate::eval::evaluate;
use crate::lexer::{tokenize, TokenKind};
use crate::parser::{parse_predicate_source, parse_source};
use crate::storage::{self, StorageError};
use crate::value::QueryResult;

/// Meta commands for environment and workspace management
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    /// `.load <path> [name]` - load a data file as a named relation
    Load { path: PathBuf, name: Option<String> },
    /// `.rel` - list bound relations
    Relations,
    /// `.rel <name>` - show one relation
    Describe(String),
    /// `.save <path>` - snapshot the environment to a workspace file
    Save(PathBuf),
    /// `.open <path>` - replace the environment from a workspace file
    Open(PathBuf),
    /// `.drop <name>` - remove a binding
    Drop(String),
    /// `.help`
    Help,
    /// `.quit` / `.exit`
    Quit,
}

/// What a statement produced
#[derive(Debug)]
pub enum Outcome {
    /// Blank or comment-only input
    Empty,
    /// A query result to render
    Result(QueryResult),
    /// An assignment bound a relation
    Bound { name: String, tuples: usize },
    /// A data file was loaded
    Loaded { name: String, tuples: usize },
    /// Listing of (name, cardinality, schema)
    Relations(Vec<(String, usize, Vec<String>)>),
    /// Workspace written
    Saved(PathBuf),
    /// Workspace loaded
    Opened { path: PathBuf, relations: usize },
    /// Binding removed
    Dropped(String),
    Help,
    Quit,
}

/// Errors surfaced by the session layer
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Query(#[from] Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unknown command '{0}'; try .help")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    #[error("only relations can be bound; a sorted result is an ordered sequence")]
    BindOrdered,
}

/// A REPL or script session: an environment plus statement dispatch
#[derive(Debug, Default)]
pub struct Session {
    env: Environment,
    data_dir: PathBuf,
}

impl Session {
    pub fn new() -> Self {
        Session {
            env: Environment::new(),
            data_dir: PathBuf::from("."),
        }
    }

    /// Session whose relative `.load` paths resolve against `data_dir`
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Session {
            env: Environment::new(),
            data_dir,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Execute one statement
    pub fn execute(&mut self, line: &str) -> Result<Outcome, SessionError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Outcome::Empty);
        }
        if let Some(rest) = trimmed.strip_prefix('.') {
            return self.execute_meta(parse_meta(rest)?);
        }

        let tokens = tokenize(line).map_err(Error::from)?;
        if tokens.is_empty() {
            return Ok(Outcome::Empty);
        }

        // name := / |= / -= / ?= rhs
        if tokens.len() >= 2 {
            if let (TokenKind::Ident(name), op) = (&tokens[0].kind, &tokens[1].kind) {
                let assignment = matches!(
                    op,
                    TokenKind::Assign
                        | TokenKind::PipeAssign
                        | TokenKind::MinusAssign
                        | TokenKind::QuestionAssign
                );
                if assignment {
                    let rhs = tokens
                        .get(2)
                        .map(|token| &line[token.offset..])
                        .ok_or(SessionError::Usage("<name> := <expression>"))?;
                    let name = name.clone();
                    let op = op.clone();
                    return self.execute_assignment(&name, &op, rhs);
                }
            }
        }

        debug!(query = trimmed, "executing query");
        let expr = parse_source(line).map_err(Error::from)?;
        let result = evaluate(&expr, &self.env).map_err(Error::from)?;
        Ok(Outcome::Result(result))
    }

    fn execute_assignment(
        &mut self,
        name: &str,
        op: &TokenKind,
        rhs: &str,
    ) -> Result<Outcome, SessionError> {
        debug!(name, "executing assignment");
        let expr = match op {
            TokenKind::Assign => parse_source(rhs).map_err(Error::from)?,
            TokenKind::PipeAssign | TokenKind::MinusAssign => {
                self.require_bound(name)?;
                let current = Box::new(RelExpr::Relation(name.to_string()));
                let right = Box::new(parse_source(rhs).map_err(Error::from)?);
                if *op == TokenKind::PipeAssign {
                    RelExpr::Union {
                        left: current,
                        right,
                    }
                } else {
                    RelExpr::Difference {
                        left: current,
                        right,
                    }
                }
            }
            TokenKind::QuestionAssign => {
                self.require_bound(name)?;
                let predicate = parse_predicate_source(rhs).map_err(Error::from)?;
                RelExpr::Filter {
                    input: Box::new(RelExpr::Relation(name.to_string())),
                    predicate,
                    negated: false,
                }
            }
            _ => return Err(SessionError::Usage("<name> := <expression>")),
        };

        let result = evaluate(&expr, &self.env).map_err(Error::from)?;
        let QueryResult::Relation(rel) = result else {
            return Err(SessionError::BindOrdered);
        };
        let tuples = rel.len();
        self.env.bind(name, rel);
        Ok(Outcome::Bound {
            name: name.to_string(),
            tuples,
        })
    }

    fn require_bound(&self, name: &str) -> Result<(), SessionError> {
        if self.env.contains(name) {
            Ok(())
        } else {
            Err(SessionError::UnknownRelation(name.to_string()))
        }
    }

    fn execute_meta(&mut self, command: MetaCommand) -> Result<Outcome, SessionError> {
        match command {
            MetaCommand::Load { path, name } => {
                let resolved = self.resolve(&path);
                let rel = storage::load_relation(&resolved)?;
                let name = name.unwrap_or_else(|| storage::relation_name_for(&path));
                let tuples = rel.len();
                self.env.bind(name.clone(), rel);
                Ok(Outcome::Loaded { name, tuples })
            }
            MetaCommand::Relations => Ok(Outcome::Relations(
                self.env
                    .iter()
                    .map(|(name, rel)| (name.clone(), rel.len(), rel.schema_vec()))
                    .collect(),
            )),
            MetaCommand::Describe(name) => {
                let rel = self
                    .env
                    .get(&name)
                    .cloned()
                    .ok_or(SessionError::UnknownRelation(name))?;
                Ok(Outcome::Result(QueryResult::Relation(rel)))
            }
            MetaCommand::Save(path) => {
                let resolved = self.resolve(&path);
                storage::save_workspace(&resolved, &self.env)?;
                Ok(Outcome::Saved(resolved))
            }
            MetaCommand::Open(path) => {
                let resolved = self.resolve(&path);
                let env = storage::load_workspace(&resolved)?;
                let relations = env.len();
                self.env = env;
                Ok(Outcome::Opened {
                    path: resolved,
                    relations,
                })
            }
            MetaCommand::Drop(name) => {
                if self.env.remove(&name).is_none() {
                    return Err(SessionError::UnknownRelation(name));
                }
                Ok(Outcome::Dropped(name))
            }
            MetaCommand::Help => Ok(Outcome::Help),
            MetaCommand::Quit => Ok(Outcome::Quit),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

fn parse_meta(rest: &str) -> Result<MetaCommand, SessionError> {
    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (command, args.as_slice()) {
        ("load", [path]) => Ok(MetaCommand::Load {
            path: PathBuf::from(path),
            name: None,
        }),
        ("load", [path, name]) => Ok(MetaCommand::Load {
            path: PathBuf::from(path),
            name: Some((*name).to_string()),
        }),
        ("load", _) => Err(SessionError::Usage(".load <path> [name]")),
        ("rel", []) => Ok(MetaCommand::Relations),
        ("rel", [name]) => Ok(MetaCommand::Describe((*name).to_string())),
        ("rel", _) => Err(SessionError::Usage(".rel [name]")),
        ("save", [path]) => Ok(MetaCommand::Save(PathBuf::from(path))),
        ("save", _) => Err(SessionError::Usage(".save <path>")),
        ("open", [path]) => Ok(MetaCommand::Open(PathBuf::from(path))),
        ("open", _) => Err(SessionError::Usage(".open <path>")),
        ("drop", [name]) => Ok(MetaCommand::Drop((*name).to_string())),
        ("drop", _) => Err(SessionError::Usage(".drop <name>")),
        ("help", _) => Ok(MetaCommand::Help),
        ("quit" | "exit", _) => Ok(MetaCommand::Quit),
        (other, _) => Err(SessionError::UnknownCommand(format!(".{other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Relation, Tuple, Value};

    fn session_with_numbers() -> Session {
        let mut session = Session::new();
        let mut rel = Relation::new(["v"]);
        for v in [1, 2, 3] {
            rel.insert(Tuple::from_pairs([("v", Value::Int(v))]));
        }
        session.environment_mut().bind("R", rel);
        session
    }

    #[test]
    fn test_query_statement() {
        let mut session = session_with_numbers();
        let outcome = session.execute("R ? v > 1").expect("executes");
        let Outcome::Result(QueryResult::Relation(rel)) = outcome else {
            panic!("expected a relation result");
        };
        assert_eq!(rel.len(), 2);
    }

    #[test]
    fn test_assignment_binds() {
        let mut session = session_with_numbers();
        let outcome = session.execute("Big := R ? v > 1").expect("executes");
        assert!(matches!(outcome, Outcome::Bound { ref name, tuples: 2 } if name == "Big"));
        assert!(session.environment().contains("Big"));
    }

    #[test]
    fn test_compound_assignments() {
        let mut session = session_with_numbers();
        session.execute("Big := R ? v > 1").expect("bind");
        session.execute("Big |= (R ? v = 1)").expect("union-assign");
        assert_eq!(session.environment().get("Big").map(Relation::len), Some(3));

        session.execute("Big -= (R ? v = 2)").expect("diff-assign");
        assert_eq!(session.environment().get("Big").map(Relation::len), Some(2));

        session.execute("Big ?= v > 2").expect("filter-assign");
        assert_eq!(session.environment().get("Big").map(Relation::len), Some(1));
    }

    #[test]
    fn test_compound_assignment_requires_binding() {
        let mut session = session_with_numbers();
        let err = session.execute("Nope |= R").expect_err("must fail");
        assert!(matches!(err, SessionError::UnknownRelation(name) if name == "Nope"));
    }

    #[test]
    fn test_failed_query_leaves_environment_untouched() {
        let mut session = session_with_numbers();
        let before = session.environment().clone();
        assert!(session.execute("Big := R # missing").is_err());
        assert_eq!(session.environment(), &before);
    }

    #[test]
    fn test_binding_ordered_result_is_rejected() {
        let mut session = session_with_numbers();
        let err = session.execute("S := R $ v").expect_err("must fail");
        assert!(matches!(err, SessionError::BindOrdered));
    }

    #[test]
    fn test_meta_commands() {
        let mut session = session_with_numbers();
        let Outcome::Relations(list) = session.execute(".rel").expect("lists") else {
            panic!("expected a listing");
        };
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].0, "R");
        assert_eq!(list[0].1, 3);

        assert!(matches!(
            session.execute(".drop R").expect("drops"),
            Outcome::Dropped(name) if name == "R"
        ));
        assert!(session.environment().is_empty());

        assert!(matches!(
            session.execute(".quit").expect("quits"),
            Outcome::Quit
        ));
        assert!(matches!(
            session.execute(".bogus"),
            Err(SessionError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_empty_and_comment_lines() {
        let mut session = Session::new();
        assert!(matches!(session.execute("   ").expect("ok"), Outcome::Empty));
        assert!(matches!(
            session.execute("-- just a comment").expect("ok"),
            Outcome::Empty
        ));
    }

    #[test]
    fn test_workspace_save_and_open() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ws.json");
        let path_str = path.to_str().expect("utf-8 path");

        let mut session = session_with_numbers();
        session
            .execute(&format!(".save {path_str}"))
            .expect("saves");

        let mut fresh = Session::new();
        let outcome = fresh
            .execute(&format!(".open {path_str}"))
            .expect("opens");
        assert!(matches!(outcome, Outcome::Opened { relations: 1, .. }));
        assert!(fresh.environment().contains("R"));
    }
}
