//! Gathering rows into containers.
//!
//! These work on any sequence of rows, usually one result set drained
//! from a [`Reader`](crate::reader::Reader).  Key and value callbacks
//! return the same `Result` as row mappers, so they can use `?` on
//! column access.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Error;
use crate::row::{FromRow, Row};
use crate::value::FromValue;

/// Key each row, failing on a duplicate key.
pub fn to_dictionary<I, K, V, E, FK, FV>(
    rows: I,
    mut key: FK,
    mut value: FV,
) -> Result<HashMap<K, V>, Error<E>>
where
    I: IntoIterator<Item = Row>,
    K: Eq + Hash + Debug,
    FK: FnMut(&Row) -> Result<K, Error<E>>,
    FV: FnMut(&Row) -> Result<V, Error<E>>,
{
    let mut result = HashMap::new();
    for row in rows {
        let k = key(&row)?;
        if result.contains_key(&k) {
            return Err(Error::collect_str(format!("duplicate key {k:?}")));
        }
        let v = value(&row)?;
        result.insert(k, v);
    }
    Ok(result)
}

/// Group rows by key, keeping row order within each group.
pub fn to_lookup<I, K, V, E, FK, FV>(
    rows: I,
    mut key: FK,
    mut value: FV,
) -> Result<HashMap<K, Vec<V>>, Error<E>>
where
    I: IntoIterator<Item = Row>,
    K: Eq + Hash,
    FK: FnMut(&Row) -> Result<K, Error<E>>,
    FV: FnMut(&Row) -> Result<V, Error<E>>,
{
    let mut result: HashMap<K, Vec<V>> = HashMap::new();
    for row in rows {
        let k = key(&row)?;
        let v = value(&row)?;
        result.entry(k).or_default().push(v);
    }
    Ok(result)
}

/// The first row, if there is one.  The rest are not looked at.
pub fn first<I, T, E>(rows: I) -> Result<Option<T>, Error<E>>
where
    I: IntoIterator<Item = Row>,
    T: FromRow,
{
    match rows.into_iter().next() {
        Some(row) => Ok(Some(T::from_row(&row)?)),
        None => Ok(None),
    }
}

/// The only row, if there is one; more than one row is an error.
pub fn single<I, T, E>(rows: I) -> Result<Option<T>, Error<E>>
where
    I: IntoIterator<Item = Row>,
    T: FromRow,
{
    let mut rows = rows.into_iter();
    let row = match rows.next() {
        Some(row) => row,
        None => return Ok(None),
    };
    if rows.next().is_some() {
        return Err(Error::collect_str("expected at most one row, got more"));
    }
    Ok(Some(T::from_row(&row)?))
}

/// The first column of the first row.
///
/// No rows and a `NULL` value both give `None`.
pub fn scalar<I, T, E>(rows: I) -> Result<Option<T>, Error<E>>
where
    I: IntoIterator<Item = Row>,
    T: FromValue,
{
    match rows.into_iter().next() {
        Some(row) => Ok(row.get::<_, Option<T>>(0)?),
        None => Ok(None),
    }
}
