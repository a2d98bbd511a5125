//! One-row feature table.
//!
//! A [`FeatureFrame`] holds one [`Cell`] per schema column, in schema order.
//! Cells keep the type the JSON decoder produced until [`FeatureFrame::coerce`]
//! converts the coercion set to float64 with Python `float()` semantics.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::CoercionError;
use crate::schema::{self, ColumnKind, FEATURE_SCHEMA};

/// A single table value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Key absent from the record, or JSON `null`.
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Nested array or object.
    Other(Value),
}

impl Cell {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Missing,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Cell::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => Cell::Other(value.clone()),
        }
    }

    /// Pandas-style dtype label.
    pub fn dtype(&self) -> &'static str {
        match self {
            Cell::Bool(_) => "bool",
            Cell::Int(_) => "int64",
            Cell::Float(_) => "float64",
            Cell::Missing | Cell::Str(_) | Cell::Other(_) => "object",
        }
    }

    /// Convert to float64 the way Python's `float()` does.
    pub fn to_float(&self) -> Result<f64, CoercionError> {
        match self {
            Cell::Missing => Ok(f64::NAN),
            Cell::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Cell::Int(i) => Ok(*i as f64),
            Cell::Float(f) => Ok(*f),
            Cell::Str(s) => parse_float(s),
            Cell::Other(Value::Array(_)) => Err(CoercionError::NotANumber("list")),
            Cell::Other(_) => Err(CoercionError::NotANumber("dict")),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => write!(f, "NaN"),
            Cell::Bool(true) => write!(f, "True"),
            Cell::Bool(false) => write!(f, "False"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x:?}"),
            Cell::Str(s) => write!(f, "{s}"),
            Cell::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Parse a string as a float, accepting what Python's `float()` accepts:
/// surrounding whitespace, a sign, `nan`/`inf`/`infinity` in any case, and
/// single underscores between digits.
pub fn parse_float(raw: &str) -> Result<f64, CoercionError> {
    let fail = || CoercionError::StringToFloat(raw.to_string());
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(fail());
    }

    let cleaned;
    let text = if trimmed.contains('_') {
        let bytes = trimmed.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'_' {
                let digit_before = i > 0 && bytes[i - 1].is_ascii_digit();
                let digit_after = bytes.get(i + 1).is_some_and(|c| c.is_ascii_digit());
                if !(digit_before && digit_after) {
                    return Err(fail());
                }
            }
        }
        cleaned = trimmed.replace('_', "");
        cleaned.as_str()
    } else {
        trimmed
    };

    let unsigned = text.trim_start_matches(&['+', '-'][..]);
    if text.len() - unsigned.len() > 1 {
        return Err(fail());
    }
    match unsigned.to_ascii_lowercase().as_str() {
        "nan" => return Ok(f64::NAN),
        "inf" | "infinity" => {
            return Ok(if text.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            })
        }
        _ => {}
    }
    text.parse::<f64>().map_err(|_| fail())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A one-row table laid out in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    cells: Vec<Cell>,
}

impl FeatureFrame {
    /// Build the row from a decoded JSON record.
    ///
    /// Anything other than a JSON object is rejected.
    pub fn from_record(record: &Value) -> Result<Self, CoercionError> {
        match record {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(CoercionError::NotAnObject(json_type_name(other))),
        }
    }

    /// Build the row by looking up each schema column by name.
    ///
    /// Absent columns become [`Cell::Missing`]; keys outside the schema are ignored.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let cells = FEATURE_SCHEMA
            .iter()
            .map(|col| map.get(col.name).map_or(Cell::Missing, Cell::from_json))
            .collect();
        Self { cells }
    }

    /// Coerce every [`ColumnKind::Float`] column to float64.
    ///
    /// Stops at the first column that cannot be converted, leaving earlier
    /// columns converted.
    pub fn coerce(&mut self) -> Result<(), CoercionError> {
        for (col, cell) in FEATURE_SCHEMA.iter().zip(self.cells.iter_mut()) {
            if col.kind == ColumnKind::Float {
                *cell = Cell::Float(cell.to_float()?);
            }
        }
        Ok(())
    }

    /// Number of columns (always the schema width).
    pub fn n_columns(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Look up a cell by column name.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        schema::position(name).map(|idx| &self.cells[idx])
    }

    /// Iterate over `(column name, cell)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Cell)> {
        FEATURE_SCHEMA.iter().map(|c| c.name).zip(self.cells.iter())
    }

    /// Iterate over `(column name, dtype)` pairs in schema order.
    pub fn dtypes(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.iter().map(|(name, cell)| (name, cell.dtype()))
    }
}
