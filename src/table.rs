use serde_json::{Map, Number, Value};

use crate::error::LoaderError;

/// One cell of a row table. `Float` may hold NaN; NaN never reaches the
/// store because record building drops such fields entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl Cell {
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan") {
            return Cell::Null;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Cell::Float(value);
        }
        match trimmed {
            "true" | "True" | "TRUE" => Cell::Bool(true),
            "false" | "False" | "FALSE" => Cell::Bool(false),
            _ => Cell::Str(trimmed.to_string()),
        }
    }

    pub fn to_json(&self) -> Option<Value> {
        match self {
            Cell::Int(value) => Some(Value::Number((*value).into())),
            Cell::Float(value) => Number::from_f64(*value).map(Value::Number),
            Cell::Bool(value) => Some(Value::Bool(*value)),
            Cell::Str(value) => Some(Value::String(value.clone())),
            Cell::Null => None,
        }
    }
}

/// Replace characters the store cannot hold in field names.
pub fn sanitize_column(name: &str) -> String {
    name.replace('.', "_")
}

#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn require_column(&self, column: &str) -> Result<usize, LoaderError> {
        self.column_index(column)
            .ok_or_else(|| LoaderError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(index) = self.column_index(from) {
            self.columns[index] = to.to_string();
        }
    }

    pub fn add_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    pub fn map_column(&mut self, index: usize, map: impl Fn(&Cell) -> Cell) {
        for row in &mut self.rows {
            row[index] = map(&row[index]);
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.rows[row][column]
    }

    /// Store-ready records: column names sanitized, NaN and null fields
    /// omitted from each record.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        let fields: Vec<String> = self.columns.iter().map(|name| sanitize_column(name)).collect();
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (field, cell) in fields.iter().zip(row) {
                    if let Some(value) = cell.to_json() {
                        record.insert(field.clone(), value);
                    }
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse("42"), Cell::Int(42));
        assert_eq!(Cell::parse("0.25"), Cell::Float(0.25));
        assert_eq!(Cell::parse("True"), Cell::Bool(true));
        assert_eq!(Cell::parse("chr1"), Cell::Str("chr1".to_string()));
        assert_eq!(Cell::parse(""), Cell::Null);
        assert_eq!(Cell::parse("NaN"), Cell::Null);
    }

    #[test]
    fn sanitize_dotted_columns() {
        assert_eq!(sanitize_column("foo.bar"), "foo_bar");
        assert_eq!(sanitize_column("plain"), "plain");
    }

    #[test]
    fn records_drop_nan_fields() {
        let mut table = Table::new("metrics", vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec![Cell::Float(1.0), Cell::Float(f64::NAN)]);

        let records = table.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], 1.0);
        assert!(!records[0].contains_key("b"));
    }

    #[test]
    fn records_sanitize_columns() {
        let mut table = Table::new("metrics", vec!["foo.bar".to_string()]);
        table.push_row(vec![Cell::Int(7)]);

        let records = table.records();
        assert!(records[0].contains_key("foo_bar"));
        assert!(!records[0].contains_key("foo.bar"));
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = Table::new("metrics", vec!["cell_id".to_string()]);
        let err = table.require_column("total_reads").unwrap_err();
        assert!(err.to_string().contains("total_reads"));
        assert!(err.to_string().contains("metrics"));
    }
}
