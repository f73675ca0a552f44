//! Result sets and the forward-only reader over them.
//!
//! Running a command produces a [`Reader`]: one or more result sets,
//! walked in order.  The reader starts positioned on the first result
//! set, before its first row.  [`Reader::read`] moves to the next row
//! of the current set; [`Reader::next_result`] moves to the next set.
//! Rows that have been passed are gone, there is no going back.
//!
//! Statements that only change rows (no columns) don't become result
//! sets of the reader.  Their counts still add up in
//! [`Reader::rows_affected`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::row::{Columns, Row};
use crate::value::Value;

/// One ordered sequence of rows returned by a single statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Arc<Columns>,
    rows: Vec<Row>,
    rows_affected: u64,
}

impl ResultSet {
    pub fn new(columns: Columns) -> Self {
        ResultSet {
            columns: Arc::new(columns),
            rows: vec![],
            rows_affected: 0,
        }
    }

    /// A set with no columns, from a statement that only changed rows.
    pub fn affected(rows_affected: u64) -> Self {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Append a row; `values` must line up with the columns.
    pub fn push(&mut self, values: Vec<Value>) {
        let row = Row::new(Arc::clone(&self.columns), values);
        self.rows.push(row);
    }

    pub fn set_rows_affected(&mut self, rows_affected: u64) {
        self.rows_affected = rows_affected;
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
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

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Whether the statement returned rows at all, as opposed to
    /// only changing them.
    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Where a row sits in the output of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based index of the result set.
    pub result_set: usize,
    /// Zero-based index of the row within its result set.
    pub row: usize,
    /// Zero-based index of the row across all result sets.
    pub global: usize,
}

#[derive(Debug)]
struct Cursor {
    columns: Arc<Columns>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
    read: usize,
    rows_affected: u64,
}

impl Cursor {
    fn new(set: ResultSet) -> Self {
        Cursor {
            columns: set.columns,
            rows: set.rows.into_iter(),
            current: None,
            read: 0,
            rows_affected: set.rows_affected,
        }
    }
}

/// A forward-only, read-once cursor over the result sets of a command.
#[derive(Debug)]
pub struct Reader {
    cursor: Option<Cursor>,
    pending: VecDeque<ResultSet>,
    result_index: usize,
    set_count: usize,
    rows_read: usize,
    rows_affected: u64,
}

impl Reader {
    pub fn new(sets: Vec<ResultSet>) -> Self {
        let rows_affected = sets.iter().map(ResultSet::rows_affected).sum();
        let mut pending: VecDeque<_> = sets.into_iter().filter(ResultSet::has_columns).collect();
        let set_count = pending.len();
        let cursor = pending.pop_front().map(Cursor::new);
        Reader {
            cursor,
            pending,
            result_index: 0,
            set_count,
            rows_read: 0,
            rows_affected,
        }
    }

    /// Move to the next row of the current result set.
    ///
    /// Returns `None` once the set is exhausted; the reader then stays
    /// on that set until [`next_result`](Reader::next_result).
    pub fn read(&mut self) -> Option<&Row> {
        let cursor = self.cursor.as_mut()?;
        cursor.current = cursor.rows.next();
        if cursor.current.is_some() {
            cursor.read += 1;
            self.rows_read += 1;
        }
        cursor.current.as_ref()
    }

    /// Move to the next row, taking ownership of it.
    pub fn read_owned(&mut self) -> Option<Row> {
        self.read()?;
        self.cursor.as_mut().and_then(|cursor| cursor.current.take())
    }

    /// The row most recently returned by `read`.
    pub fn current(&self) -> Option<&Row> {
        self.cursor.as_ref().and_then(|cursor| cursor.current.as_ref())
    }

    /// Where the most recently read row sits, if any row was read yet.
    pub fn position(&self) -> Option<Position> {
        let cursor = self.cursor.as_ref()?;
        if cursor.read == 0 {
            return None;
        }
        Some(Position {
            result_set: self.result_index,
            row: cursor.read - 1,
            global: self.rows_read - 1,
        })
    }

    /// Skip what's left of the current result set and move to the next.
    ///
    /// Returns `false` when there are no more result sets.
    pub fn next_result(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(set) => {
                self.cursor = Some(Cursor::new(set));
                self.result_index += 1;
                true
            }
            None => {
                self.cursor = None;
                false
            }
        }
    }

    /// Queue the unread rest of `other` after this reader's sets.
    pub fn append(&mut self, other: Reader) {
        let had_sets = self.set_count > 0;
        self.rows_affected += other.rows_affected;
        let sets = other.into_result_sets();
        self.set_count += sets.len();
        self.pending.extend(sets);

        if self.cursor.is_none() {
            if let Some(set) = self.pending.pop_front() {
                if had_sets {
                    self.result_index += 1;
                }
                self.cursor = Some(Cursor::new(set));
            }
        }
    }

    /// Zero-based index of the current result set.
    pub fn result_index(&self) -> usize {
        self.result_index
    }

    /// The columns of the current result set.
    pub fn columns(&self) -> Option<&Columns> {
        self.cursor.as_ref().map(|cursor| &*cursor.columns)
    }

    pub fn field_count(&self) -> usize {
        self.columns().map(Columns::len).unwrap_or(0)
    }

    /// Whether the current result set has rows left to read.
    pub fn has_rows(&self) -> bool {
        self.cursor
            .as_ref()
            .map(|cursor| cursor.rows.len() > 0)
            .unwrap_or(false)
    }

    /// Whether the reader has moved past its last result set.
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Number of result sets with columns the command produced.
    pub fn set_count(&self) -> usize {
        self.set_count
    }

    /// Rows changed by the command, over all of its statements.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Drain the rest of the current result set.
    pub fn rows(&mut self) -> impl Iterator<Item = Row> + '_ {
        std::iter::from_fn(move || self.read_owned())
    }

    /// The unread remainder: the rest of the current set, then every
    /// pending set.
    pub fn into_result_sets(mut self) -> Vec<ResultSet> {
        let mut sets = Vec::with_capacity(self.pending.len() + 1);
        if let Some(cursor) = self.cursor.take() {
            sets.push(ResultSet {
                columns: cursor.columns,
                rows: cursor.rows.collect(),
                rows_affected: cursor.rows_affected,
            });
        }
        sets.extend(self.pending);
        sets
    }
}
