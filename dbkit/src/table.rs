//! Generic, in-memory tables of dynamically-typed values.
//!
//! When the shape of a result isn't known ahead of time (reports, ad-hoc
//! queries, tools that print whatever comes back) a [`Table`] holds the
//! columns and rows of one result set, and a [`DataSet`] holds one table
//! per result set of a command.

use std::collections::HashMap;

use crate::error::ColumnError;
use crate::reader::{Reader, ResultSet};
use crate::row::{ColumnIndex, Columns, Row};
use crate::value::{FromValue, Value};

/// The columns and rows of one result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Columns,
    rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(name: S, columns: Columns) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: vec![],
        }
    }

    pub fn from_result_set<S: Into<String>>(name: S, set: ResultSet) -> Self {
        let columns = set.columns().clone();
        Table {
            name: name.into(),
            columns,
            rows: set.into_rows(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.index_of(name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One cell, converted to `T`.
    pub fn get<I: ColumnIndex, T: FromValue>(&self, row: usize, column: I) -> Result<T, ColumnError> {
        self.rows
            .get(row)
            .ok_or_else(|| {
                ColumnError::new(format!("row {row} out of range, the table has {} rows", self.len()))
            })?
            .get(column)
    }

    /// Every value of one column, top to bottom.
    pub fn column<I: ColumnIndex>(&self, column: I) -> Result<Vec<&Value>, ColumnError> {
        let index = column.index(&self.columns)?;
        Ok(self.rows.iter().map(|row| &row.values()[index]).collect())
    }

    /// The rows as maps from column name to value.
    pub fn to_maps(&self) -> Vec<HashMap<String, Value>> {
        self.rows.iter().map(Row::to_map).collect()
    }
}

/// One table per result set, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    tables: Vec<Table>,
}

impl DataSet {
    /// The name given to the table at `index` when none is supplied:
    /// `Table`, `Table1`, `Table2`, ...
    pub fn default_name(index: usize) -> String {
        match index {
            0 => "Table".into(),
            n => format!("Table{n}"),
        }
    }

    /// Drain every remaining result set of a reader into tables.
    ///
    /// Sets without columns (statements that only changed rows) don't
    /// become tables.
    pub fn from_reader(reader: Reader) -> Self {
        Self::from_reader_named(reader, &[])
    }

    /// Like [`from_reader`](DataSet::from_reader), naming tables in
    /// order from `names` and falling back to the default names.
    pub fn from_reader_named(reader: Reader, names: &[&str]) -> Self {
        let tables = reader
            .into_result_sets()
            .into_iter()
            .filter(ResultSet::has_columns)
            .enumerate()
            .map(|(index, set)| {
                let name = names
                    .get(index)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| Self::default_name(index));
                Table::from_result_set(name, set)
            })
            .collect();
        DataSet { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.name == name)
            .or_else(|| self.tables.iter().find(|table| table.name.eq_ignore_ascii_case(name)))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl std::ops::Index<usize> for DataSet {
    type Output = Table;

    fn index(&self, index: usize) -> &Table {
        &self.tables[index]
    }
}
