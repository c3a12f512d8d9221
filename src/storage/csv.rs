//! CSV and TSV loading.
//!
//! Delimited files are the simplest way to get relations into a session:
//! the first row names the attributes, and each field's type is inferred
//! from its content.
//!
//! ## Format
//!
//! - First row is the header with attribute names
//! - Types are inferred per field:
//!   - Integers: parsed as i64
//!   - Decimal forms (`1.5`): parsed as exact decimals
//!   - `true` / `false` (case-insensitive): booleans
//!   - Anything else: strings, quoted or unquoted
//! - Empty fields are errors; the data model has no nulls
//!
//! ## Example
//!
//! ```csv
//! emp_id,name,salary
//! 1,Alice,80000
//! 2,Bob,60000
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::storage::error::{StorageError, StorageResult};
use crate::value::{Relation, Tuple, Value};

/// Options for delimited-file parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: char,
    /// Quote character for strings (default: '"')
    pub quote_char: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            quote_char: '"',
        }
    }
}

impl CsvOptions {
    /// Tab-separated variant
    pub fn tsv() -> Self {
        CsvOptions {
            delimiter: '\t',
            ..CsvOptions::default()
        }
    }
}

/// Load a relation from a CSV file
pub fn load_csv<P: AsRef<Path>>(path: P) -> StorageResult<Relation> {
    load_delimited(path, CsvOptions::default())
}

/// Load a relation from a TSV file
pub fn load_tsv<P: AsRef<Path>>(path: P) -> StorageResult<Relation> {
    load_delimited(path, CsvOptions::tsv())
}

/// Load a relation from a delimited file with custom options
pub fn load_delimited<P: AsRef<Path>>(path: P, options: CsvOptions) -> StorageResult<Relation> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => return Err(StorageError::MissingHeader),
    };
    let header: Vec<String> = parse_line(&header_line, &options);
    if header.is_empty() || header.iter().all(String::is_empty) {
        return Err(StorageError::MissingHeader);
    }
    for (i, name) in header.iter().enumerate() {
        if header[..i].contains(name) {
            return Err(StorageError::DuplicateColumn(name.clone()));
        }
    }

    let mut rel = Relation::new(header.iter().cloned());
    let mut row = 2;
    for line_result in lines {
        let line = line_result?;
        if line.trim().is_empty() {
            row += 1;
            continue;
        }

        let fields = parse_line(&line, &options);
        if fields.len() != header.len() {
            return Err(StorageError::Parse {
                row,
                message: format!(
                    "expected {} fields, got {}",
                    header.len(),
                    fields.len()
                ),
            });
        }

        let mut pairs = Vec::with_capacity(header.len());
        for (name, field) in header.iter().zip(&fields) {
            pairs.push((name.clone(), infer_value(field, row, name)?));
        }
        rel.try_insert(Tuple::from_pairs(pairs))?;
        row += 1;
    }

    Ok(rel)
}

/// Save a relation to a CSV file
pub fn save_csv<P: AsRef<Path>>(path: P, rel: &Relation) -> StorageResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let options = CsvOptions::default();
    let schema = rel.schema_vec();

    let header = schema
        .iter()
        .map(|name| escape_field(name, &options))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{header}")?;

    for tuple in rel.tuples() {
        let row = schema
            .iter()
            .filter_map(|name| tuple.get(name))
            .map(|value| value_to_field(value, &options))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{row}")?;
    }

    writer.flush()?;
    Ok(())
}

/// Split one line into fields, honoring quotes and doubled-quote escapes
fn parse_line(line: &str, options: &CsvOptions) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == options.quote_char {
            if in_quotes && chars.peek() == Some(&options.quote_char) {
                current.push(options.quote_char);
                chars.next(); // doubled quote inside a quoted field
            } else {
                in_quotes = !in_quotes;
                was_quoted = true;
            }
        } else if c == options.delimiter && !in_quotes {
            fields.push(finish_field(&current, was_quoted));
            current.clear();
            was_quoted = false;
        } else {
            current.push(c);
        }
    }
    fields.push(finish_field(&current, was_quoted));

    fields
}

fn finish_field(field: &str, was_quoted: bool) -> String {
    if was_quoted {
        field.to_string()
    } else {
        field.trim().to_string()
    }
}

/// Infer a value from field text
fn infer_value(field: &str, row: usize, column: &str) -> StorageResult<Value> {
    if field.is_empty() {
        return Err(StorageError::EmptyField {
            row,
            column: column.to_string(),
        });
    }

    if field.eq_ignore_ascii_case("true") {
        return Ok(Value::Bool(true));
    }
    if field.eq_ignore_ascii_case("false") {
        return Ok(Value::Bool(false));
    }

    if let Ok(i) = field.parse::<i64>() {
        return Ok(Value::Int(i));
    }

    if field.contains('.') {
        if let Ok(d) = Decimal::from_str(field) {
            return Ok(Value::Decimal(d));
        }
    }

    Ok(Value::Str(field.to_string()))
}

/// Render a value as a CSV field
fn value_to_field(value: &Value, options: &CsvOptions) -> String {
    match value {
        Value::Str(s) => escape_field(s, options),
        other => other.to_string(),
    }
}

/// Quote a field if it contains the delimiter, a quote, or a newline
fn escape_field(s: &str, options: &CsvOptions) -> String {
    let needs_quoting = s.contains(options.delimiter)
        || s.contains(options.quote_char)
        || s.contains('\n')
        || s.contains('\r');

    if needs_quoting {
        let doubled = format!("{}{}", options.quote_char, options.quote_char);
        let escaped = s.replace(options.quote_char, &doubled);
        format!("{}{}{}", options.quote_char, escaped, options.quote_char)
    } else {
        s.to_string()
    }
}
