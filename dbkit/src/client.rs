//! The database client and the helpers built on top of it.
//!
//! A backend implements just two methods of [`Client`]:
//!
//! * [`execute`](Client::execute), to run a command for its side effects,
//!   returning the number of rows changed, and
//! * [`read`](Client::read), to run a command and get a [`Reader`] over
//!   every result set it produced.
//!
//! Everything else (typed rows, scalars, dictionaries, tables) is a
//! provided method that works the same on every backend.  Clients that
//! can open transactions also implement [`Transactional`], which adds a
//! commit-or-rollback wrapper.
#![cfg_attr(
    feature = "rusqlite",
    doc = r##"

```
use dbkit::client::{Client, Transactional};
use dbkit::rusqlite::Client as Sqlite;

# fn main() -> Result<(), dbkit::rusqlite::Error> {
let mut db = Sqlite::open_in_memory()?;
db.execute_all([
    "CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT, species TEXT)",
    "INSERT INTO pets (name, species) VALUES ('Dan', 'cat'), ('Polly', 'bird')",
])?;

let pets: Vec<(i64, String)> = db.query_as("SELECT id, name FROM pets ORDER BY id")?;
assert_eq!(2, pets.len());

let count: Option<i64> = db.query_scalar("SELECT COUNT(*) FROM pets")?;
assert_eq!(Some(2), count);

db.transaction(|tx| {
    tx.execute(&("DELETE FROM pets WHERE name = ?", ("Polly",)).into())
})?;
# Ok(())
# }
```
"##
)]

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::collect;
use crate::command::Command;
use crate::error::Error;
use crate::map::{self, MapRow, Position, Scope};
use crate::reader::Reader;
use crate::row::{Columns, FromRow, Row};
use crate::table::{DataSet, Table};
use crate::value::{FromValue, Value};

/// A database client.
///
/// Single-set helpers (`query_as`, `query_map`, `query_scalar`, ...)
/// look only at the first result set of the command; the rest are
/// discarded.  Use [`query_with`](Client::query_with),
/// [`for_each_row`](Client::for_each_row) or
/// [`query_data_set`](Client::query_data_set) to see them all.
pub trait Client {
    /// The underlying driver's error type.
    type Error;

    /// Run a command, returning the number of rows it changed.
    fn execute(&mut self, command: &Command) -> Result<u64, Error<Self::Error>>;

    /// Run a command, returning a reader over its result sets.
    fn read(&mut self, command: &Command) -> Result<Reader, Error<Self::Error>>;

    /// Run each command in turn, returning the total rows changed.
    ///
    /// Stops at the first failure.
    fn execute_all<I>(&mut self, commands: I) -> Result<u64, Error<Self::Error>>
    where
        I: IntoIterator,
        I::Item: Into<Command>,
        Self: Sized,
    {
        let mut total = 0;
        for command in commands {
            total += self.execute(&command.into())?;
        }
        Ok(total)
    }

    /// Run each command in turn, returning one reader over all of
    /// their result sets, in order.
    fn read_batch<I>(&mut self, commands: I) -> Result<Reader, Error<Self::Error>>
    where
        I: IntoIterator,
        I::Item: Into<Command>,
        Self: Sized,
    {
        let mut reader = Reader::new(vec![]);
        for command in commands {
            reader.append(self.read(&command.into())?);
        }
        Ok(reader)
    }

    /// Load every row of the first result set as `T`.
    fn query_as<T, C>(&mut self, command: C) -> Result<Vec<T>, Error<Self::Error>>
    where
        T: FromRow,
        C: Into<Command>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        map::map_reader(&mut reader, map::typed::<T>(), Scope::Current)
    }

    /// Load exactly one row.  No rows or more than one is an error.
    fn query_one<T, C>(&mut self, command: C) -> Result<T, Error<Self::Error>>
    where
        T: FromRow,
        C: Into<Command>,
        Self: Sized,
    {
        self.query_opt(command)?
            .ok_or_else(|| Error::collect_str("expected one row, got none"))
    }

    /// Load zero or one row.  More than one is an error.
    fn query_opt<T, C>(&mut self, command: C) -> Result<Option<T>, Error<Self::Error>>
    where
        T: FromRow,
        C: Into<Command>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        collect::single(reader.rows())
    }

    /// Load the first row, if any; the rest are ignored.
    fn query_first<T, C>(&mut self, command: C) -> Result<Option<T>, Error<Self::Error>>
    where
        T: FromRow,
        C: Into<Command>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        collect::first(reader.rows())
    }

    /// The first column of the first row.  `NULL` and no rows are `None`.
    fn query_scalar<T, C>(&mut self, command: C) -> Result<Option<T>, Error<Self::Error>>
    where
        T: FromValue,
        C: Into<Command>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        collect::scalar(reader.rows())
    }

    /// Map every row of the first result set with a closure.
    fn query_map<T, C, F>(&mut self, command: C, f: F) -> Result<Vec<T>, Error<Self::Error>>
    where
        C: Into<Command>,
        F: FnMut(&Row) -> Result<T, Error<Self::Error>>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        map::map_reader(&mut reader, map::by_row(f), Scope::Current)
    }

    /// Map every row of every result set with any [`MapRow`] shape.
    fn query_with<C, M>(&mut self, command: C, mapper: M) -> Result<Vec<M::Output>, Error<Self::Error>>
    where
        C: Into<Command>,
        M: MapRow<Self::Error>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        map::map_reader(&mut reader, mapper, Scope::All)
    }

    /// Visit every row of every result set along with its position.
    fn for_each_row<C, F>(&mut self, command: C, f: F) -> Result<(), Error<Self::Error>>
    where
        C: Into<Command>,
        F: FnMut(&Row, Position) -> Result<(), Error<Self::Error>>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        map::map_reader(&mut reader, map::by_row_at(f), Scope::All)?;
        Ok(())
    }

    /// Key the rows of the first result set.  A duplicate key is an error.
    fn query_dictionary<K, V, C, FK, FV>(
        &mut self,
        command: C,
        key: FK,
        value: FV,
    ) -> Result<HashMap<K, V>, Error<Self::Error>>
    where
        K: Eq + Hash + Debug,
        C: Into<Command>,
        FK: FnMut(&Row) -> Result<K, Error<Self::Error>>,
        FV: FnMut(&Row) -> Result<V, Error<Self::Error>>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        collect::to_dictionary(reader.rows(), key, value)
    }

    /// A dictionary from the first column to the second.
    fn query_pairs<K, V, C>(&mut self, command: C) -> Result<HashMap<K, V>, Error<Self::Error>>
    where
        K: FromValue + Eq + Hash + Debug,
        V: FromValue,
        C: Into<Command>,
        Self: Sized,
    {
        self.query_dictionary(command, |row| Ok(row.get(0)?), |row| Ok(row.get(1)?))
    }

    /// Group the rows of the first result set by key.
    fn query_lookup<K, V, C, FK, FV>(
        &mut self,
        command: C,
        key: FK,
        value: FV,
    ) -> Result<HashMap<K, Vec<V>>, Error<Self::Error>>
    where
        K: Eq + Hash,
        C: Into<Command>,
        FK: FnMut(&Row) -> Result<K, Error<Self::Error>>,
        FV: FnMut(&Row) -> Result<V, Error<Self::Error>>,
        Self: Sized,
    {
        let mut reader = self.read(&command.into())?;
        collect::to_lookup(reader.rows(), key, value)
    }

    /// The rows of the first result set as column name to value maps.
    fn query_records<C>(&mut self, command: C) -> Result<Vec<HashMap<String, Value>>, Error<Self::Error>>
    where
        C: Into<Command>,
        Self: Sized,
    {
        self.query_as(command)
    }

    /// The first result set as a generic table.
    fn query_table<C>(&mut self, command: C) -> Result<Table, Error<Self::Error>>
    where
        C: Into<Command>,
        Self: Sized,
    {
        let reader = self.read(&command.into())?;
        let name = DataSet::default_name(0);
        Ok(match reader.into_result_sets().into_iter().next() {
            Some(set) => Table::from_result_set(name, set),
            None => Table::new(name, Columns::default()),
        })
    }

    /// Every result set with columns, one table each.
    fn query_data_set<C>(&mut self, command: C) -> Result<DataSet, Error<Self::Error>>
    where
        C: Into<Command>,
        Self: Sized,
    {
        let reader = self.read(&command.into())?;
        Ok(DataSet::from_reader(reader))
    }
}

/// Ending an open transaction.
pub trait TransactionControl: Client {
    fn commit(self) -> Result<(), Error<Self::Error>>;

    fn rollback(self) -> Result<(), Error<Self::Error>>;
}

/// A client that can open transactions.
pub trait Transactional: Client {
    type Transaction<'a>: TransactionControl<Error = Self::Error>
    where
        Self: 'a;

    /// Begin a new transaction.
    ///
    /// Dropping the transaction without committing rolls it back.
    fn begin(&mut self) -> Result<Self::Transaction<'_>, Error<Self::Error>>;

    /// Run `f` in a transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back if it
    /// returns `Err`.  Should the rollback fail too, that failure is
    /// logged and the error from `f` is the one returned.
    fn transaction<'a, T, F>(&'a mut self, f: F) -> Result<T, Error<Self::Error>>
    where
        F: FnOnce(&mut Self::Transaction<'a>) -> Result<T, Error<Self::Error>>,
        Self: Sized,
    {
        let mut tx = self.begin()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(%rollback, %error, "rollback failed");
                }
                Err(error)
            }
        }
    }

    /// Run each command in one transaction, returning the total rows
    /// changed.  Any failure rolls them all back.
    fn execute_in_transaction<I>(&mut self, commands: I) -> Result<u64, Error<Self::Error>>
    where
        I: IntoIterator,
        I::Item: Into<Command>,
        Self: Sized,
    {
        self.transaction(|tx| tx.execute_all(commands))
    }
}
