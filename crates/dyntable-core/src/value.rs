use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single cell value in a row's data map.
///
/// Row data is schemaless at the storage level: values are one of four
/// JSON-natural primitives and are checked against the owning column's
/// declared type after the fact, never at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Empty values are always valid; required-ness is checked separately.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
        }
    }

    /// Raw textual rendering, without any column-type formatting applied.
    /// Whole numbers drop the trailing `.0`.
    pub fn to_plain_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            CellValue::Text(value) => value.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Ordered column-name → value mapping carried by every row.
///
/// Keys are column *names*, not ids; renaming a column therefore requires a
/// bulk rewrite of this map across the table (see the schema store).
pub type RowData = BTreeMap<String, CellValue>;

/// Rename a data key in place. Returns true when the old key existed.
pub fn rename_data_key(data: &mut RowData, old: &str, new: &str) -> bool {
    match data.remove(old) {
        Some(value) => {
            data.insert(new.to_string(), value);
            true
        }
        None => false,
    }
}

/// Numeric field accessor with a zero default for absent or non-numeric
/// values, matching how commerce fields are read off live row data.
pub fn number_field(data: &RowData, key: &str) -> f64 {
    data.get(key).and_then(CellValue::as_f64).unwrap_or(0.0)
}

/// Boolean field accessor with an explicit default for absent values.
pub fn bool_field(data: &RowData, key: &str, default: bool) -> bool {
    data.get(key).and_then(CellValue::as_bool).unwrap_or(default)
}
