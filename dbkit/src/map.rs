//! Row mapping callbacks of several shapes.
//!
//! Materializing rows usually wants one of a handful of callbacks:
//! the row alone, the row and where it sits, or just the field values.
//! Each shape is a small adapter implementing [`MapRow`], built by a
//! constructor function so that closures get their argument types
//! inferred:
//!
//! | Constructor | Callback |
//! | ----------- | -------- |
//! | [`by_row`] | `FnMut(&Row) -> Result<T, Error<E>>` |
//! | [`by_row_at`] | `FnMut(&Row, Position) -> Result<T, Error<E>>` |
//! | [`by_values`] | `FnMut(&[Value]) -> Result<T, Error<E>>` |
//! | [`by_values_at`] | `FnMut(&[Value], Position) -> Result<T, Error<E>>` |
//! | [`typed`] | none, loads any [`FromRow`] type |
//!
//! A [`Position`] carries the result set index, the row index within
//! that set and the row index across all sets of the command.
//!
//! ```
//! use dbkit::map::{self, Scope};
//! use dbkit::reader::{Reader, ResultSet};
//! use dbkit::row::Columns;
//! use dbkit::Value;
//!
//! let mut set = ResultSet::new(Columns::new(["n"]));
//! set.push(vec![Value::Integer(10)]);
//! set.push(vec![Value::Integer(20)]);
//! let mut reader = Reader::new(vec![set]);
//!
//! let labels = map::map_reader(
//!     &mut reader,
//!     map::by_row_at(|row, at| {
//!         let n: i64 = row.get(0)?;
//!         Ok::<_, dbkit::Error<std::convert::Infallible>>(format!("{}:{n}", at.row))
//!     }),
//!     Scope::All,
//! )?;
//! assert_eq!(vec!["0:10", "1:20"], labels);
//! # Ok::<(), dbkit::Error<std::convert::Infallible>>(())
//! ```

use std::marker::PhantomData;

use crate::error::Error;
use crate::reader::Reader;
use crate::row::{FromRow, Row};
use crate::value::Value;

pub use crate::reader::Position;

/// Turns one row into one output value.
pub trait MapRow<E> {
    type Output;

    fn map_row(&mut self, row: &Row, at: Position) -> Result<Self::Output, Error<E>>;
}

impl<E, M: MapRow<E> + ?Sized> MapRow<E> for &mut M {
    type Output = M::Output;

    fn map_row(&mut self, row: &Row, at: Position) -> Result<Self::Output, Error<E>> {
        (**self).map_row(row, at)
    }
}

/// A callback taking the row.
#[derive(Debug, Clone, Copy)]
pub struct ByRow<F>(F);

/// A callback taking the row and its position.
#[derive(Debug, Clone, Copy)]
pub struct ByRowAt<F>(F);

/// A callback taking the field values by index.
#[derive(Debug, Clone, Copy)]
pub struct ByValues<F>(F);

/// A callback taking the field values and the row's position.
#[derive(Debug, Clone, Copy)]
pub struct ByValuesAt<F>(F);

/// Loads a [`FromRow`] type.
#[derive(Debug)]
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Typed<T> {}

pub fn by_row<F, T, E>(f: F) -> ByRow<F>
where
    F: FnMut(&Row) -> Result<T, Error<E>>,
{
    ByRow(f)
}

pub fn by_row_at<F, T, E>(f: F) -> ByRowAt<F>
where
    F: FnMut(&Row, Position) -> Result<T, Error<E>>,
{
    ByRowAt(f)
}

pub fn by_values<F, T, E>(f: F) -> ByValues<F>
where
    F: FnMut(&[Value]) -> Result<T, Error<E>>,
{
    ByValues(f)
}

pub fn by_values_at<F, T, E>(f: F) -> ByValuesAt<F>
where
    F: FnMut(&[Value], Position) -> Result<T, Error<E>>,
{
    ByValuesAt(f)
}

pub fn typed<T: FromRow>() -> Typed<T> {
    Typed(PhantomData)
}

impl<F, T, E> MapRow<E> for ByRow<F>
where
    F: FnMut(&Row) -> Result<T, Error<E>>,
{
    type Output = T;

    fn map_row(&mut self, row: &Row, _at: Position) -> Result<T, Error<E>> {
        (self.0)(row)
    }
}

impl<F, T, E> MapRow<E> for ByRowAt<F>
where
    F: FnMut(&Row, Position) -> Result<T, Error<E>>,
{
    type Output = T;

    fn map_row(&mut self, row: &Row, at: Position) -> Result<T, Error<E>> {
        (self.0)(row, at)
    }
}

impl<F, T, E> MapRow<E> for ByValues<F>
where
    F: FnMut(&[Value]) -> Result<T, Error<E>>,
{
    type Output = T;

    fn map_row(&mut self, row: &Row, _at: Position) -> Result<T, Error<E>> {
        (self.0)(row.values())
    }
}

impl<F, T, E> MapRow<E> for ByValuesAt<F>
where
    F: FnMut(&[Value], Position) -> Result<T, Error<E>>,
{
    type Output = T;

    fn map_row(&mut self, row: &Row, at: Position) -> Result<T, Error<E>> {
        (self.0)(row.values(), at)
    }
}

impl<T: FromRow, E> MapRow<E> for Typed<T> {
    type Output = T;

    fn map_row(&mut self, row: &Row, _at: Position) -> Result<T, Error<E>> {
        Ok(T::from_row(row)?)
    }
}

/// Which result sets a walk over a reader covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// The rest of the current result set.
    #[default]
    Current,

    /// The rest of the current result set and every one after it.
    All,
}

/// Map rows from a reader until the scope is exhausted.
///
/// The first error from the mapper stops the walk and is returned.
pub fn map_reader<M, E>(
    reader: &mut Reader,
    mut mapper: M,
    scope: Scope,
) -> Result<Vec<M::Output>, Error<E>>
where
    M: MapRow<E>,
{
    let mut result = vec![];
    loop {
        while let Some(row) = reader.read_owned() {
            let at = reader.position().unwrap_or_default();
            result.push(mapper.map_row(&row, at)?);
        }

        if scope == Scope::Current || !reader.next_result() {
            break;
        }
    }

    tracing::trace!(rows = result.len(), "mapped rows");
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::ResultSet;
    use crate::row::Columns;

    type Result<T> = std::result::Result<T, Error<()>>;

    fn reader() -> Reader {
        let mut first = ResultSet::new(Columns::new(["id", "name"]));
        first.push(vec![Value::Integer(1), Value::Text("one".into())]);
        first.push(vec![Value::Integer(2), Value::Text("two".into())]);
        let mut second = ResultSet::new(Columns::new(["id", "name"]));
        second.push(vec![Value::Integer(3), Value::Text("three".into())]);
        Reader::new(vec![first, second])
    }

    #[test]
    fn by_row_current_set_only() {
        let mut reader = reader();
        let names: Vec<String> = map_reader(
            &mut reader,
            by_row(|row| -> Result<String> { Ok(row.get("name")?) }),
            Scope::Current,
        )
        .unwrap();
        assert_eq!(vec!["one", "two"], names);
        assert_eq!(0, reader.result_index());
    }

    #[test]
    fn by_row_at_sees_every_position() {
        let mut reader = reader();
        let positions = map_reader(
            &mut reader,
            by_row_at(|_row, at| -> Result<Position> { Ok(at) }),
            Scope::All,
        )
        .unwrap();
        assert_eq!(
            vec![
                Position { result_set: 0, row: 0, global: 0 },
                Position { result_set: 0, row: 1, global: 1 },
                Position { result_set: 1, row: 0, global: 2 },
            ],
            positions
        );
    }

    #[test]
    fn by_values_reads_fields_by_index() {
        let mut reader = reader();
        let ids = map_reader(
            &mut reader,
            by_values(|values| -> Result<i64> { Ok(values[0].get()?) }),
            Scope::All,
        )
        .unwrap();
        assert_eq!(vec![1, 2, 3], ids);
    }

    #[test]
    fn by_values_at_combines_both() {
        let mut reader = reader();
        let tagged = map_reader(
            &mut reader,
            by_values_at(|values, at| -> Result<(usize, String)> {
                Ok((at.result_set, values[1].get()?))
            }),
            Scope::All,
        )
        .unwrap();
        assert_eq!((1, "three".to_string()), tagged[2]);
    }

    #[test]
    fn typed_rows() {
        let mut reader = reader();
        let rows: Vec<(i32, String)> =
            map_reader::<_, ()>(&mut reader, typed(), Scope::All).unwrap();
        assert_eq!((3, "three".to_string()), rows[2]);
    }

    #[test]
    fn errors_stop_the_walk() {
        let mut reader = reader();
        let mut seen = 0;
        let result = map_reader(
            &mut reader,
            by_row(|row| -> Result<i32> {
                seen += 1;
                row.get("missing").map_err(Into::into)
            }),
            Scope::All,
        );
        assert_eq!(ErrorKind::FromColumn, result.unwrap_err().kind());
        assert_eq!(1, seen);
    }

    #[test]
    fn mapper_by_reference() {
        let mut reader = reader();
        let mut mapper = by_row(|row| -> Result<i64> { Ok(row.get(0)?) });
        let first = map_reader(&mut reader, &mut mapper, Scope::Current).unwrap();
        reader.next_result();
        let second = map_reader(&mut reader, &mut mapper, Scope::Current).unwrap();
        assert_eq!((vec![1, 2], vec![3]), (first, second));
    }
}
