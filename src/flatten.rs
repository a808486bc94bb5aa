//! Flattening of nested tile payloads into vessel rows

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::FlattenError;

/// Flat table of JSON rows.
///
/// Columns are the union of row keys in order of first discovery. A row
/// may lack some columns; missing cells read as absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Map<String, Value>> {
        self.rows
    }

    pub fn push_row(&mut self, row: Map<String, Value>) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append all rows of `other`, keeping the column union
    pub fn extend(&mut self, other: Table) {
        for row in other.rows {
            self.push_row(row);
        }
    }
}

impl FromIterator<Map<String, Value>> for Table {
    fn from_iter<T: IntoIterator<Item = Map<String, Value>>>(iter: T) -> Self {
        let mut table = Table::default();
        for row in iter {
            table.push_row(row);
        }
        table
    }
}

/// Flatten one tile payload into its vessel rows.
///
/// Looks under `"data"` when present. Every column of the first row whose
/// value is a list of objects is taken as a table of vessels, and those
/// tables are concatenated. Never fails: payloads of unexpected shape give
/// an empty table.
pub fn flatten(payload: &Value) -> Table {
    match try_flatten(payload) {
        Ok(table) => table,
        Err(e) => {
            debug!("Discarding tile payload: {}", e);
            Table::default()
        }
    }
}

fn try_flatten(payload: &Value) -> Result<Table, FlattenError> {
    let container = payload.get("data").unwrap_or(payload);
    let normalized = normalize(container)?;

    let Some(first) = normalized.rows().first() else {
        return Ok(Table::default());
    };

    let mut vessels = Table::default();
    for column in normalized.columns() {
        let Some(Value::Array(items)) = first.get(column) else {
            continue;
        };
        if !matches!(items.first(), Some(Value::Object(_))) {
            continue;
        }
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::Object(row) => vessels.push_row(row.clone()),
                _ => {
                    return Err(FlattenError::MalformedRow {
                        column: column.clone(),
                        index,
                    })
                }
            }
        }
    }

    // The container may itself be the list of vessel records.
    if vessels.is_empty() {
        if let Value::Array(items) = container {
            return Ok(items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect());
        }
    }

    Ok(vessels)
}

/// Normalize an object or a list of objects into a table, flattening
/// nested objects into dotted column names.
fn normalize(value: &Value) -> Result<Table, FlattenError> {
    match value {
        Value::Object(object) => {
            let mut row = Map::new();
            flatten_object(None, object, &mut row);
            Ok(std::iter::once(row).collect())
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => {
                    let mut row = Map::new();
                    flatten_object(None, object, &mut row);
                    Ok(row)
                }
                _ => Err(FlattenError::NotTabular),
            })
            .collect(),
        _ => Err(FlattenError::NotTabular),
    }
}

fn flatten_object(
    prefix: Option<&str>,
    object: &Map<String, Value>,
    row: &mut Map<String, Value>,
) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                flatten_object(Some(&name), nested, row)
            }
            _ => {
                row.insert(name, value.clone());
            }
        }
    }
}
