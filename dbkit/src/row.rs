//! Result rows and the traits to load typed values from them.
//!
//! A [`Row`] owns its values and shares its [`Columns`] with every
//! other row of the same result set.  Typed access is by position or
//! by name; names match exactly first and then ignoring ASCII case.
//!
//! Types that can be built from a whole row implement [`FromRow`].
//! Structs usually get it by deriving, which delegates to one of the
//! two column loading strategies:
//!
//! * [`FromColumnsIndexed`], reading columns in order through a
//!   [`ColumnsIndexed`] view, and
//! * [`FromColumnsNamed`], reading columns by name through a
//!   [`ColumnsNamed`] view.
//!
//! Views can be narrowed to a child view (an offset, or a name prefix)
//! which is how nested structs are loaded from a flat row.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ColumnError;
use crate::value::{FromValue, Value};

/// The ordered column names of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Columns {
    names: Vec<String>,
}

impl Columns {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Columns {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Find a column by name: exact match first, then ignoring ASCII case.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .or_else(|| self.names.iter().position(|n| n.eq_ignore_ascii_case(name)))
    }
}

/// Something that picks out a column of a row.
pub trait ColumnIndex {
    fn index(&self, columns: &Columns) -> Result<usize, ColumnError>;

    /// How to name this column in an error message.
    fn describe(&self) -> String;
}

impl ColumnIndex for usize {
    fn index(&self, columns: &Columns) -> Result<usize, ColumnError> {
        if *self < columns.len() {
            Ok(*self)
        } else {
            Err(ColumnError::new(format!(
                "index out of range, the row has {} columns",
                columns.len()
            ))
            .at(self.describe()))
        }
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl ColumnIndex for &str {
    fn index(&self, columns: &Columns) -> Result<usize, ColumnError> {
        columns
            .index_of(self)
            .ok_or_else(|| ColumnError::new("no such column").at(self.describe()))
    }

    fn describe(&self) -> String {
        (*self).to_owned()
    }
}

impl ColumnIndex for String {
    fn index(&self, columns: &Columns) -> Result<usize, ColumnError> {
        self.as_str().index(columns)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

/// One row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<Columns>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Row { columns, values }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// The raw value of a column.
    pub fn value<I: ColumnIndex>(&self, index: I) -> Result<&Value, ColumnError> {
        let i = index.index(&self.columns)?;
        Ok(&self.values[i])
    }

    /// The value of a column, converted to `T`.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use dbkit::row::{Columns, Row};
    /// # use dbkit::Value;
    /// let columns = Arc::new(Columns::new(["id", "name"]));
    /// let row = Row::new(columns, vec![Value::Integer(1), Value::Text("Dan".into())]);
    ///
    /// let id: i32 = row.get(0)?;
    /// let name: String = row.get("NAME")?;
    /// assert_eq!((1, "Dan".to_string()), (id, name));
    /// # Ok::<(), dbkit::error::ColumnError>(())
    /// ```
    pub fn get<I: ColumnIndex, T: FromValue>(&self, index: I) -> Result<T, ColumnError> {
        let i = index.index(&self.columns)?;
        T::from_value(&self.values[i]).map_err(|e| e.at(index.describe()))
    }

    pub fn is_null<I: ColumnIndex>(&self, index: I) -> Result<bool, ColumnError> {
        self.value(index).map(Value::is_null)
    }

    /// The row as a map from column name to value.
    ///
    /// If two columns share a name the later one wins.
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.columns
            .names()
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

/// A positional view of a row, starting at some offset.
#[derive(Debug, Clone, Copy)]
pub struct ColumnsIndexed<'a> {
    row: &'a Row,
    offset: usize,
}

impl<'a> ColumnsIndexed<'a> {
    pub fn new(row: &'a Row) -> Self {
        ColumnsIndexed { row, offset: 0 }
    }

    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ColumnError> {
        self.row.get(self.offset + index)
    }

    pub fn get_nested<T: FromColumnsIndexed>(&self, index: usize) -> Result<T, ColumnError> {
        T::from_columns(self.child(index))
    }

    pub fn child(&self, offset: usize) -> Self {
        ColumnsIndexed {
            row: self.row,
            offset: self.offset + offset,
        }
    }
}

/// A by-name view of a row, with a prefix for nested loads.
#[derive(Debug, Clone)]
pub struct ColumnsNamed<'a> {
    row: &'a Row,
    prefix: String,
}

impl<'a> ColumnsNamed<'a> {
    pub fn new(row: &'a Row) -> Self {
        ColumnsNamed {
            row,
            prefix: String::new(),
        }
    }

    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ColumnError> {
        if self.prefix.is_empty() {
            self.row.get(name)
        } else {
            let mut full = self.prefix.clone();
            full.push_str(name);
            self.row.get(full.as_str())
        }
    }

    pub fn get_nested<T: FromColumnsNamed>(&self, prefix: &str) -> Result<T, ColumnError> {
        T::from_columns(self.child(prefix))
    }

    pub fn child(&self, prefix: &str) -> Self {
        let mut full = self.prefix.clone();
        full.push_str(prefix);
        ColumnsNamed {
            row: self.row,
            prefix: full,
        }
    }
}

/// A type that can be loaded from consecutive columns.
pub trait FromColumnsIndexed: Sized {
    /// How many columns this type consumes.
    const NUM_COLUMNS: usize;

    fn from_columns(columns: ColumnsIndexed<'_>) -> Result<Self, ColumnError>;
}

/// A type that can be loaded from named columns.
pub trait FromColumnsNamed: Sized {
    fn from_columns(columns: ColumnsNamed<'_>) -> Result<Self, ColumnError>;
}

/// A type that can be produced from a result row.
///
/// Any [`FromValue`] type reads the first column, which is what makes
/// `query_as::<i64>("SELECT count(*) ...")` work.  Tuples read their
/// elements by position.
#[cfg_attr(
    feature = "derive",
    doc = r##"

Structs and tuple structs can derive it.  Named fields match columns
by name unless the struct opts in to `by_index`:

```
use dbkit::FromRow;

#[derive(FromRow)]
pub struct Customer {
    id: i32,
    first_name: String,
    #[dbkit(column = "surname")]
    last_name: String,
}

#[derive(FromRow)]
#[dbkit(by_index)]
pub struct Pair {
    key: String,
    value: Option<i64>,
}
```
"##
)]
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, ColumnError>;

    fn from_rows(rows: &[Row]) -> Result<Vec<Self>, ColumnError> {
        rows.iter().map(Self::from_row).collect()
    }
}

impl<T: FromValue> FromRow for T {
    fn from_row(row: &Row) -> Result<Self, ColumnError> {
        row.get(0)
    }
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, ColumnError> {
        Ok(row.clone())
    }
}

impl FromRow for Vec<Value> {
    fn from_row(row: &Row) -> Result<Self, ColumnError> {
        Ok(row.values.clone())
    }
}

impl FromRow for HashMap<String, Value> {
    fn from_row(row: &Row) -> Result<Self, ColumnError> {
        Ok(row.to_map())
    }
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_tuple_from_row {
    (
        $(
            $name:ident
        ),*
        $(,)?
    ) => {
        impl<
            $(
                $name,
            )*
        > FromColumnsIndexed for ($($name,)*)
        where
            $(
                $name: FromValue,
            )*
        {
            const NUM_COLUMNS: usize = count!($($name)*);

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn from_columns(columns: ColumnsIndexed<'_>) -> Result<Self, ColumnError> {
                let mut index = 0;
                Ok((
                    $(
                        {
                            let value: $name = columns.get(index)?;
                            index += 1;
                            value
                        },
                    )*
                ))
            }
        }

        impl<
            $(
                $name,
            )*
        > FromRow for ($($name,)*)
        where
            $(
                $name: FromValue,
            )*
        {
            fn from_row(row: &Row) -> Result<Self, ColumnError> {
                FromColumnsIndexed::from_columns(ColumnsIndexed::new(row))
            }
        }
    };
}

impl_tuple_from_row!(T0);
impl_tuple_from_row!(T0, T1);
impl_tuple_from_row!(T0, T1, T2);
impl_tuple_from_row!(T0, T1, T2, T3);
impl_tuple_from_row!(T0, T1, T2, T3, T4);
impl_tuple_from_row!(T0, T1, T2, T3, T4, T5);
impl_tuple_from_row!(T0, T1, T2, T3, T4, T5, T6);
impl_tuple_from_row!(T0, T1, T2, T3, T4, T5, T6, T7);
