use std::{fs::File, io::Read, path::Path};

use common::{
    error::ParseError,
    util::{median_filter, scale_to_micros},
};
use csv::{ReaderBuilder, Trim};
use tracing::debug;

pub const MIN_COLUMNS: usize = 3;
pub const X_COLUMN: usize = 1;
pub const TIME_COLUMN: usize = 2;

/// Rectangular numeric table, every row has the same number of columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Panics if `idx >= self.columns()`
    pub(crate) fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    fn set_column(&mut self, idx: usize, values: &[f64]) {
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = *value;
        }
    }

    /// Panics if `x` or `y` is not below `self.columns()`
    pub(crate) fn points(&self, x: usize, y: usize) -> Vec<(f64, f64)> {
        self.rows.iter().map(|row| (row[x], row[y])).collect()
    }
}

/// Reads a headerless comma separated table of numbers as is
pub fn load_table<R: Read>(reader: R) -> Result<Table, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        if record.len() < MIN_COLUMNS {
            return Err(ParseError::TooFewColumns {
                line,
                expected: MIN_COLUMNS,
                found: record.len(),
            });
        }
        let row = record
            .iter()
            .enumerate()
            .map(|(column, field)| {
                field.parse::<f64>().map_err(|_| ParseError::InvalidField {
                    line,
                    column,
                    value: field.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyTable);
    }
    Ok(Table { rows })
}

/// Reads a benchmark table and replaces the time column with its median
/// filtered value in microseconds.
pub fn read_table<R: Read>(reader: R, kernel_size: usize) -> Result<Table, ParseError> {
    let mut table = load_table(reader)?;
    let mut times = median_filter(&table.column(TIME_COLUMN), kernel_size)?;
    scale_to_micros(&mut times);
    table.set_column(TIME_COLUMN, &times);
    debug!(
        "Read table with {} rows and {} columns",
        table.rows.len(),
        table.columns()
    );
    Ok(table)
}

pub fn read_table_file(path: &Path, kernel_size: usize) -> Result<Table, ParseError> {
    read_table(File::open(path)?, kernel_size)
}
