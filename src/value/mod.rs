//! # Value Type System
//!
//! Core value types for the algebra: `Value`, `Tuple`, `Relation`,
//! `OrderedTuples`, and `QueryResult`.
//!
//! Everything here is an immutable value. Tuples are unordered attribute
//! maps stored behind a canonical (sorted-name) ordering so that equality
//! and hashing are independent of construction order. A relation is a
//! deduplicated set of tuples plus its attribute schema; the schema is a
//! first-class field so empty relations still carry type information.
//!
//! `OrderedTuples` is deliberately a distinct type from `Relation`: only
//! sort produces it and only take consumes it. That distinction is the
//! algebra's type boundary and is enforced by the evaluator.
//!
//! ## Usage
//!
//! ```rust
//! use rela::value::{Relation, Tuple, Value};
//!
//! let mut employees = Relation::new(["name", "salary"]);
//! employees.insert(Tuple::from_pairs([
//!     ("name", Value::from("Alice")),
//!     ("salary", Value::Int(80_000)),
//! ]));
//! assert_eq!(employees.len(), 1);
//! ```

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single value: the tagged union over the algebra's domains.
///
/// The `Relation` case is what makes the value space non-regular; it is
/// how relation-valued attributes (and therefore nest join and nest-by)
/// work without nulls.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),
    /// Arbitrary-precision decimal
    Decimal(Decimal),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    Str(String),
    /// Nested relation (relation-valued attribute)
    Relation(Relation),
}

impl Value {
    /// Human-readable name of this value's domain
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Relation(_) => "relation",
        }
    }

    /// Check if this value is numeric (integer or decimal)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_))
    }

    /// Get the nested relation if this is a relation value
    pub fn as_relation(&self) -> Option<&Relation> {
        if let Value::Relation(rel) = self {
            Some(rel)
        } else {
            None
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Relation(rel) => {
                // Compact inline form for nested relations
                write!(f, "{{")?;
                for (i, tuple) in rel.tuples().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    for (j, (_, value)) in tuple.iter().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{value}")?;
                    }
                    write!(f, ")")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An unordered mapping from attribute name to value.
///
/// Stored as a `BTreeMap` so iteration, equality, and hashing all follow
/// the canonical sorted-name order regardless of how the tuple was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tuple(BTreeMap<String, Value>);

impl Tuple {
    /// Create an empty tuple
    pub fn new() -> Self {
        Tuple(BTreeMap::new())
    }

    /// Build a tuple from (name, value) pairs
    pub fn from_pairs<N, I>(pairs: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        Tuple(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Look up an attribute by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the tuple has no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate (attribute, value) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Attribute names in canonical order
    pub fn attributes(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// The attribute set of this tuple
    pub fn attribute_set(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Restrict to the named attributes. Returns `None` if any is absent.
    pub fn project<S: Borrow<str>>(&self, attrs: impl IntoIterator<Item = S>) -> Option<Tuple> {
        let mut out = BTreeMap::new();
        for attr in attrs {
            let attr = attr.borrow();
            let value = self.0.get(attr)?;
            out.insert(attr.to_string(), value.clone());
        }
        Some(Tuple(out))
    }

    /// Drop the named attributes, keeping everything else
    pub fn without(&self, attrs: &BTreeSet<String>) -> Tuple {
        Tuple(
            self.0
                .iter()
                .filter(|(name, _)| !attrs.contains(*name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    /// Copy of this tuple with one more attribute
    pub fn with(&self, name: impl Into<String>, value: Value) -> Tuple {
        let mut map = self.0.clone();
        map.insert(name.into(), value);
        Tuple(map)
    }

    /// Union of two tuples. Shared attributes must agree; the caller is
    /// expected to have checked agreement (see [`Tuple::agrees_with`]).
    pub fn merged(&self, other: &Tuple) -> Tuple {
        let mut map = self.0.clone();
        for (name, value) in &other.0 {
            map.insert(name.clone(), value.clone());
        }
        Tuple(map)
    }

    /// Check that two tuples hold equal values on every given attribute
    pub fn agrees_with<S: Borrow<str>>(
        &self,
        other: &Tuple,
        attrs: impl IntoIterator<Item = S>,
    ) -> bool {
        attrs
            .into_iter()
            .all(|attr| self.0.get(attr.borrow()) == other.0.get(attr.borrow()))
    }
}

/// Raised when a tuple's attribute set does not match the relation schema
/// it is being placed into. Internal construction sites guarantee
/// conformance; this surfaces only from deserialized or hand-built data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tuple attributes {found:?} do not match relation schema {expected:?}")]
pub struct SchemaViolation {
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// An unordered, deduplicated set of tuples plus its attribute schema.
///
/// The schema is stored separately from the tuple set so an empty relation
/// still knows its attributes. Tuples live in a `BTreeSet`, which gives
/// the set discipline (no duplicates) and a canonical iteration order that
/// sort uses as its tie-break.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    schema: BTreeSet<String>,
    tuples: BTreeSet<Tuple>,
}

impl Relation {
    /// Create an empty relation with the given attribute schema
    pub fn new<S: Into<String>>(schema: impl IntoIterator<Item = S>) -> Self {
        Relation {
            schema: schema.into_iter().map(Into::into).collect(),
            tuples: BTreeSet::new(),
        }
    }

    /// Build a relation from a schema and tuples, validating conformance
    pub fn from_tuples<S: Into<String>>(
        schema: impl IntoIterator<Item = S>,
        tuples: impl IntoIterator<Item = Tuple>,
    ) -> Result<Self, SchemaViolation> {
        let mut rel = Relation::new(schema);
        for tuple in tuples {
            rel.try_insert(tuple)?;
        }
        Ok(rel)
    }

    /// The attribute schema
    pub fn schema(&self) -> &BTreeSet<String> {
        &self.schema
    }

    /// Schema as a sorted vector, for messages and rendering
    pub fn schema_vec(&self) -> Vec<String> {
        self.schema.iter().cloned().collect()
    }

    /// Check whether an attribute belongs to the schema
    pub fn has_attribute(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Number of tuples
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Check if the relation holds no tuples
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Membership test
    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples.contains(tuple)
    }

    /// Iterate tuples in canonical order
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// Insert a tuple whose attribute set is known to match the schema.
    /// Returns `true` if the tuple was not already present.
    ///
    /// Construction sites inside the evaluator always build conforming
    /// tuples; conformance is checked in debug builds.
    pub fn insert(&mut self, tuple: Tuple) -> bool {
        debug_assert!(
            tuple.attributes().eq(self.schema.iter()),
            "tuple attributes must equal the relation schema"
        );
        self.tuples.insert(tuple)
    }

    /// Insert with a schema-conformance check, for untrusted tuples
    pub fn try_insert(&mut self, tuple: Tuple) -> Result<bool, SchemaViolation> {
        if !tuple.attributes().eq(self.schema.iter()) {
            return Err(SchemaViolation {
                expected: self.schema_vec(),
                found: tuple.attributes().cloned().collect(),
            });
        }
        Ok(self.tuples.insert(tuple))
    }

    /// Validate every tuple against the schema (used after deserialization)
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        for tuple in &self.tuples {
            if !tuple.attributes().eq(self.schema.iter()) {
                return Err(SchemaViolation {
                    expected: self.schema_vec(),
                    found: tuple.attributes().cloned().collect(),
                });
            }
        }
        Ok(())
    }
}

/// A finite, ordered sequence of tuples.
///
/// Produced only by sort and consumed only by take. No relational operator
/// accepts it; that restriction is the algebra's type boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTuples {
    schema: BTreeSet<String>,
    rows: Vec<Tuple>,
}

impl OrderedTuples {
    /// Build an ordered sequence over the given schema
    pub fn new(schema: BTreeSet<String>, rows: Vec<Tuple>) -> Self {
        OrderedTuples { schema, rows }
    }

    /// The attribute schema
    pub fn schema(&self) -> &BTreeSet<String> {
        &self.schema
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in sequence order
    pub fn rows(&self) -> impl Iterator<Item = &Tuple> {
        self.rows.iter()
    }

    /// First `count` rows, or all of them if fewer exist
    pub fn take(mut self, count: usize) -> OrderedTuples {
        self.rows.truncate(count);
        self
    }
}

/// The result of evaluating a relational expression: either a relation or
/// (after sort) an ordered sequence of tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Relation(Relation),
    Ordered(OrderedTuples),
}

impl QueryResult {
    /// Check if this result is a relation
    pub fn is_relation(&self) -> bool {
        matches!(self, QueryResult::Relation(_))
    }

    /// Get the relation if this result is one
    pub fn as_relation(&self) -> Option<&Relation> {
        if let QueryResult::Relation(rel) = self {
            Some(rel)
        } else {
            None
        }
    }

    /// Get the ordered sequence if this result is one
    pub fn as_ordered(&self) -> Option<&OrderedTuples> {
        if let QueryResult::Ordered(ord) = self {
            Some(ord)
        } else {
            None
        }
    }

    /// The attribute schema of either result kind
    pub fn schema(&self) -> &BTreeSet<String> {
        match self {
            QueryResult::Relation(rel) => rel.schema(),
            QueryResult::Ordered(ord) => ord.schema(),
        }
    }
}

impl From<Relation> for QueryResult {
    fn from(rel: Relation) -> Self {
        QueryResult::Relation(rel)
    }
}

impl From<OrderedTuples> for QueryResult {
    fn from(ord: OrderedTuples) -> Self {
        QueryResult::Ordered(ord)
    }
}
