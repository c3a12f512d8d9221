//! ASCII table rendering.
//!
//! The core leaves display order open: relations are unordered in both
//! rows and attributes. The renderer picks sorted attribute names for
//! columns, canonical order for relation rows, and the given order for
//! ordered tuples. Relation-valued attributes render in their compact
//! inline form.

use crate::value::{OrderedTuples, QueryResult, Relation, Tuple, Value};

/// Render a query result as an ASCII table
pub fn render_result(result: &QueryResult) -> String {
    match result {
        QueryResult::Relation(rel) => render_relation(rel),
        QueryResult::Ordered(ordered) => render_ordered(ordered),
    }
}

/// Render a relation; rows come out in canonical order
pub fn render_relation(rel: &Relation) -> String {
    let attrs = rel.schema_vec();
    let rows: Vec<&Tuple> = rel.tuples().collect();
    let mut out = render_table(&attrs, &rows);
    out.push_str(&count_line(rows.len()));
    out
}

/// Render an ordered sequence; rows keep their order
pub fn render_ordered(ordered: &OrderedTuples) -> String {
    let attrs: Vec<String> = ordered.schema().iter().cloned().collect();
    let rows: Vec<&Tuple> = ordered.rows().collect();
    let mut out = render_table(&attrs, &rows);
    out.push_str(&count_line(rows.len()));
    out
}

fn count_line(count: usize) -> String {
    if count == 1 {
        "(1 tuple)\n".to_string()
    } else {
        format!("({count} tuples)\n")
    }
}

fn render_table(attrs: &[String], rows: &[&Tuple]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|tuple| {
            attrs
                .iter()
                .map(|attr| tuple.get(attr).map_or_else(String::new, format_value))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = attrs.iter().map(String::len).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let mut out = String::new();
    out.push_str(&separator);
    out.push_str(&format_row(attrs, &widths));
    out.push_str(&separator);
    for row in &cells {
        out.push_str(&format_row(row, &widths));
    }
    out.push_str(&separator);
    out
}

fn format_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(cell.as_ref());
        line.push_str(&" ".repeat(width - cell.as_ref().len()));
        line.push_str(" |");
    }
    line.push('\n');
    line
}

fn format_value(value: &Value) -> String {
    value.to_string()
}
