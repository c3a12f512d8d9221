//! JSON loading.
//!
//! A JSON data file is an array of flat objects, one per tuple. Every
//! object must carry the same key set (the schema), and values must be
//! scalars: numbers, booleans, or strings. Nulls and nested structures
//! are rejected; the data model has no nulls, and relation-valued
//! attributes are built with the algebra (nest join, nest-by), not
//! loaded from files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::storage::error::{StorageError, StorageResult};
use crate::value::{Relation, Tuple, Value};

/// Load a relation from a JSON array-of-objects file
pub fn load_json<P: AsRef<Path>>(path: P) -> StorageResult<Relation> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let document: serde_json::Value = serde_json::from_reader(reader)?;

    let serde_json::Value::Array(items) = document else {
        return Err(StorageError::Parse {
            row: 1,
            message: "expected a top-level JSON array of objects".to_string(),
        });
    };

    let mut schema: Option<Vec<String>> = None;
    let mut tuples = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let row = index + 1;
        let serde_json::Value::Object(object) = item else {
            return Err(StorageError::Parse {
                row,
                message: "expected a JSON object".to_string(),
            });
        };

        let keys: Vec<String> = object.keys().cloned().collect();
        match &schema {
            None => schema = Some(keys),
            Some(expected) => {
                let mut sorted = keys.clone();
                sorted.sort();
                let mut expected_sorted = expected.clone();
                expected_sorted.sort();
                if sorted != expected_sorted {
                    return Err(StorageError::Parse {
                        row,
                        message: format!(
                            "object keys {sorted:?} do not match the first object's keys {expected_sorted:?}"
                        ),
                    });
                }
            }
        }

        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            pairs.push((key.clone(), convert_value(value, row, key)?));
        }
        tuples.push(Tuple::from_pairs(pairs));
    }

    let schema = schema.ok_or(StorageError::Parse {
        row: 1,
        message: "empty JSON array; a relation needs a schema".to_string(),
    })?;
    Ok(Relation::from_tuples(schema, tuples)?)
}

fn convert_value(value: &serde_json::Value, row: usize, key: &str) -> StorageResult<Value> {
    match value {
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Int(i));
            }
            Decimal::from_str(&n.to_string())
                .map(Value::Decimal)
                .map_err(|_| StorageError::Parse {
                    row,
                    message: format!("number {n} in '{key}' does not fit the decimal domain"),
                })
        }
        serde_json::Value::Null => Err(StorageError::EmptyField {
            row,
            column: key.to_string(),
        }),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(StorageError::Parse {
                row,
                message: format!("nested value in '{key}'; data files hold flat tuples"),
            })
        }
    }
}
