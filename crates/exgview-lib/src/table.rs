use crate::error::{ExgError, Result};
use serde::{Deserialize, Serialize};

/// Tokens treated as missing values, compared case-insensitively after trimming.
const MISSING_TOKENS: &[&str] = &["", "nan", "-nan", "na", "n/a", "#n/a", "<na>", "null", "none"];

/// Single table cell. Serializes as a bare number, string or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
        {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_nan() => Cell::Missing,
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }
}

/// Named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// True when no cell holds text; all-missing columns count as numeric.
    pub fn is_numeric(&self) -> bool {
        !self.cells.iter().any(|cell| matches!(cell, Cell::Text(_)))
    }

    /// Numeric view of the column; text cells become `None`.
    pub fn to_numeric(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(Cell::as_f64).collect()
    }

    /// Number of cells holding text rather than a number.
    pub fn text_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, Cell::Text(_)))
            .count()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Column-major table; every column has `row_count` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table, padding short columns with missing cells and truncating long ones
    /// to the length of the first column.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        for column in &mut columns {
            column.cells.resize(row_count, Cell::Missing);
        }
        Self { columns, row_count }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Keep rows `0, factor, 2 * factor, ...`. A factor of 1 returns an identical table.
    pub fn downsample(&self, factor: usize) -> Result<Table> {
        if factor == 0 {
            return Err(ExgError::InvalidDownsample(factor));
        }
        if factor == 1 {
            return Ok(self.clone());
        }
        let columns = self
            .columns
            .iter()
            .map(|column| {
                Column::new(
                    column.name.clone(),
                    column.cells.iter().step_by(factor).cloned().collect(),
                )
            })
            .collect();
        Ok(Table {
            columns,
            row_count: self.row_count.div_ceil(factor),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Vec<Cell> {
        values.iter().copied().map(Cell::Number).collect()
    }

    fn sample_table(rows: usize) -> Table {
        let time: Vec<f64> = (0..rows).map(|i| i as f64 * 0.004).collect();
        let fz: Vec<f64> = (0..rows).map(|i| i as f64 * 10.0).collect();
        Table::new(vec![
            Column::new("Time", numbers(&time)),
            Column::new("Fz", numbers(&fz)),
        ])
    }

    #[test]
    fn parses_cells() {
        assert_eq!(Cell::parse(" 1.5 "), Cell::Number(1.5));
        assert_eq!(Cell::parse("-2e3"), Cell::Number(-2000.0));
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("NA"), Cell::Missing);
        assert_eq!(Cell::parse("spike"), Cell::Text("spike".into()));
    }

    #[test]
    fn numeric_detection_ignores_missing() {
        let col = Column::new("a", vec![Cell::Number(1.0), Cell::Missing]);
        assert!(col.is_numeric());
        let col = Column::new("b", vec![Cell::Number(1.0), Cell::Text("x".into())]);
        assert!(!col.is_numeric());
        assert_eq!(col.to_numeric(), vec![Some(1.0), None]);
        assert_eq!(col.text_count(), 1);
        assert!(Column::new("c", vec![Cell::Missing]).is_numeric());
    }

    #[test]
    fn ragged_columns_are_padded() {
        let table = Table::new(vec![
            Column::new("a", numbers(&[1.0, 2.0, 3.0])),
            Column::new("b", numbers(&[4.0])),
        ]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("b").unwrap().cells[2], Cell::Missing);
    }

    #[test]
    fn downsample_by_one_is_identity() {
        let table = sample_table(10);
        assert_eq!(table.downsample(1).unwrap(), table);
    }

    #[test]
    fn downsample_keeps_every_nth_row() {
        let table = sample_table(10);
        let reduced = table.downsample(3).unwrap();
        assert_eq!(reduced.row_count(), 4);
        let fz = reduced.column("Fz").unwrap().to_numeric();
        assert_eq!(fz, vec![Some(0.0), Some(30.0), Some(60.0), Some(90.0)]);
    }

    #[test]
    fn downsample_row_count_is_ceiling() {
        for rows in [0usize, 1, 7, 9, 10, 11] {
            for factor in 1..5 {
                let reduced = sample_table(rows).downsample(factor).unwrap();
                assert_eq!(reduced.row_count(), rows.div_ceil(factor));
                assert_eq!(reduced.columns()[0].len(), reduced.row_count());
            }
        }
    }

    #[test]
    fn downsample_rejects_zero() {
        let err = sample_table(4).downsample(0).unwrap_err();
        assert!(matches!(err, ExgError::InvalidDownsample(0)));
    }
}
