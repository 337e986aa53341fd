//! Table and card reshaping of fetched objects. Produces plain strings; how
//! they are drawn is up to the caller.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::db::DatabaseObject;

/// Placeholder for absent cells in table layout.
pub const EMPTY_CELL: &str = "-";

const SHORT_ID_LEN: usize = 8;

/// Every property key used by any object, sorted and deduplicated.
pub fn table_columns(objects: &[DatabaseObject]) -> Vec<String> {
    objects
        .iter()
        .flat_map(|o| o.properties.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_CELL.to_string(),
        Some(v) => render(v),
    }
}

/// Card layout spells out nulls instead of using the table placeholder.
pub fn format_card_value(value: &Value) -> String {
    render(value)
}

pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(SHORT_ID_LEN).collect();
    format!("{}...", prefix)
}

pub fn vector_summary(vector: Option<&[f64]>) -> String {
    match vector {
        Some(v) => format!("[{}D]", v.len()),
        None => EMPTY_CELL.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub class: String,
    /// Aligned with the columns passed to `to_table_rows`.
    pub cells: Vec<String>,
    pub vector: String,
}

pub fn to_table_rows(objects: &[DatabaseObject], columns: &[String]) -> Vec<TableRow> {
    objects
        .iter()
        .map(|o| TableRow {
            id: short_id(&o.id),
            class: o.class.clone(),
            cells: columns
                .iter()
                .map(|c| format_cell(o.properties.get(c)))
                .collect(),
            vector: vector_summary(o.vector.as_deref()),
        })
        .collect()
}
