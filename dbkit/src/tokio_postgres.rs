//! An asynchronous, pipelined, PostgreSQL client.
//!
//! The async client can't implement the synchronous
//! [`Client`](crate::client::Client) trait, so it offers the same
//! helpers as inherent `async` methods instead.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tokio_postgres::GenericClient;

use crate::collect;
use crate::command::Command;
use crate::map::{self, MapRow, Position, Scope};
use crate::postgres_common;
use crate::reader::{Reader, ResultSet};
use crate::row::{Columns, FromRow, Row};
use crate::table::{DataSet, Table};
use crate::value::{FromValue, Value};

pub use crate::postgres_common::Error;

type Statements = HashMap<String, tokio_postgres::Statement>;

/// A convenience function which parses a connection string and connects to the database.
///
/// The connection itself is spawned onto the current tokio runtime,
/// and logs an error should it fail.
///
/// See the documentation for [`tokio_postgres::Config`] for details on the connection string format.
pub async fn connect<T>(config: &str, tls: T) -> Result<Client, Error>
where
    T: tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>,
    T::Stream: Send + 'static,
{
    tracing::debug!("connecting to postgres");
    let (client, connection) = tokio_postgres::connect(config, tls)
        .await
        .map_err(Error::connect)?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%error, "postgres connection failed");
        }
    });
    Ok(client.into())
}

async fn prepare_internal<C: GenericClient>(
    client: &C,
    statements: &mut Statements,
    query_text: String,
) -> Result<tokio_postgres::Statement, Error> {
    match statements.entry(query_text) {
        std::collections::hash_map::Entry::Occupied(entry) => Ok(entry.get().clone()),
        std::collections::hash_map::Entry::Vacant(entry) => {
            let statement = client
                .prepare(entry.key())
                .await
                .map_err(Error::prepare)?;
            Ok(entry.insert(statement).clone())
        }
    }
}

async fn execute_internal<C: GenericClient>(
    client: &C,
    statements: &mut Statements,
    command: &Command,
) -> Result<u64, Error> {
    let text = postgres_common::command_text(command);
    tracing::debug!(text = %text, params = command.params().len(), "executing command");
    let statement = prepare_internal(client, statements, text).await?;
    let params = postgres_common::to_params(&statement, command.params())?;

    client
        .execute(&statement, &postgres_common::borrow(&params))
        .await
        .map_err(Error::query)
}

async fn read_internal<C: GenericClient>(
    client: &C,
    statements: &mut Statements,
    command: &Command,
) -> Result<Reader, Error> {
    let text = postgres_common::command_text(command);
    tracing::debug!(text = %text, params = command.params().len(), "reading command");
    let statement = prepare_internal(client, statements, text).await?;
    let params = postgres_common::to_params(&statement, command.params())?;
    let params = postgres_common::borrow(&params);

    let set = if statement.columns().is_empty() {
        let rows_affected = client
            .execute(&statement, &params)
            .await
            .map_err(Error::query)?;
        ResultSet::affected(rows_affected)
    } else {
        let rows = client
            .query(&statement, &params)
            .await
            .map_err(Error::query)?;
        postgres_common::to_result_set(&statement, rows)?
    };
    Ok(Reader::new(vec![set]))
}

/// The helpers of [`Client`](crate::client::Client), for types with
/// inherent async `execute` and `read` methods.
macro_rules! async_helpers {
    () => {
        /// Run each command in turn, returning the total rows changed.
        pub async fn execute_all<I>(&mut self, commands: I) -> Result<u64, Error>
        where
            I: IntoIterator,
            I::Item: Into<Command>,
        {
            let mut total = 0;
            for command in commands {
                total += self.execute(&command.into()).await?;
            }
            Ok(total)
        }

        /// Run each command in turn, returning one reader over all of
        /// their result sets.
        pub async fn read_batch<I>(&mut self, commands: I) -> Result<Reader, Error>
        where
            I: IntoIterator,
            I::Item: Into<Command>,
        {
            let mut reader = Reader::new(vec![]);
            for command in commands {
                reader.append(self.read(&command.into()).await?);
            }
            Ok(reader)
        }

        /// Load every row as `T`.
        pub async fn query_as<T, C>(&mut self, command: C) -> Result<Vec<T>, Error>
        where
            T: FromRow,
            C: Into<Command>,
        {
            let mut reader = self.read(&command.into()).await?;
            map::map_reader(&mut reader, map::typed::<T>(), Scope::Current)
        }

        /// Load exactly one row.  No rows or more than one is an error.
        pub async fn query_one<T, C>(&mut self, command: C) -> Result<T, Error>
        where
            T: FromRow,
            C: Into<Command>,
        {
            self.query_opt(command)
                .await?
                .ok_or_else(|| Error::collect_str("expected one row, got none"))
        }

        /// Load zero or one row.  More than one is an error.
        pub async fn query_opt<T, C>(&mut self, command: C) -> Result<Option<T>, Error>
        where
            T: FromRow,
            C: Into<Command>,
        {
            let mut reader = self.read(&command.into()).await?;
            collect::single(reader.rows())
        }

        /// Load the first row, if any.
        pub async fn query_first<T, C>(&mut self, command: C) -> Result<Option<T>, Error>
        where
            T: FromRow,
            C: Into<Command>,
        {
            let mut reader = self.read(&command.into()).await?;
            collect::first(reader.rows())
        }

        /// The first column of the first row.  `NULL` and no rows are `None`.
        pub async fn query_scalar<T, C>(&mut self, command: C) -> Result<Option<T>, Error>
        where
            T: FromValue,
            C: Into<Command>,
        {
            let mut reader = self.read(&command.into()).await?;
            collect::scalar(reader.rows())
        }

        /// Map every row with a closure.
        pub async fn query_map<T, C, F>(&mut self, command: C, f: F) -> Result<Vec<T>, Error>
        where
            C: Into<Command>,
            F: FnMut(&Row) -> Result<T, Error>,
        {
            let mut reader = self.read(&command.into()).await?;
            map::map_reader(&mut reader, map::by_row(f), Scope::Current)
        }

        /// Map every row with any [`MapRow`] shape.
        pub async fn query_with<C, M>(&mut self, command: C, mapper: M) -> Result<Vec<M::Output>, Error>
        where
            C: Into<Command>,
            M: MapRow<tokio_postgres::Error>,
        {
            let mut reader = self.read(&command.into()).await?;
            map::map_reader(&mut reader, mapper, Scope::All)
        }

        /// Visit every row along with its position.
        pub async fn for_each_row<C, F>(&mut self, command: C, f: F) -> Result<(), Error>
        where
            C: Into<Command>,
            F: FnMut(&Row, Position) -> Result<(), Error>,
        {
            let mut reader = self.read(&command.into()).await?;
            map::map_reader(&mut reader, map::by_row_at(f), Scope::All)?;
            Ok(())
        }

        /// Key the rows.  A duplicate key is an error.
        pub async fn query_dictionary<K, V, C, FK, FV>(
            &mut self,
            command: C,
            key: FK,
            value: FV,
        ) -> Result<HashMap<K, V>, Error>
        where
            K: Eq + Hash + Debug,
            C: Into<Command>,
            FK: FnMut(&Row) -> Result<K, Error>,
            FV: FnMut(&Row) -> Result<V, Error>,
        {
            let mut reader = self.read(&command.into()).await?;
            collect::to_dictionary(reader.rows(), key, value)
        }

        /// A dictionary from the first column to the second.
        pub async fn query_pairs<K, V, C>(&mut self, command: C) -> Result<HashMap<K, V>, Error>
        where
            K: FromValue + Eq + Hash + Debug,
            V: FromValue,
            C: Into<Command>,
        {
            self.query_dictionary(command, |row| Ok(row.get(0)?), |row| Ok(row.get(1)?))
                .await
        }

        /// Group the rows by key.
        pub async fn query_lookup<K, V, C, FK, FV>(
            &mut self,
            command: C,
            key: FK,
            value: FV,
        ) -> Result<HashMap<K, Vec<V>>, Error>
        where
            K: Eq + Hash,
            C: Into<Command>,
            FK: FnMut(&Row) -> Result<K, Error>,
            FV: FnMut(&Row) -> Result<V, Error>,
        {
            let mut reader = self.read(&command.into()).await?;
            collect::to_lookup(reader.rows(), key, value)
        }

        /// The rows as column name to value maps.
        pub async fn query_records<C>(&mut self, command: C) -> Result<Vec<HashMap<String, Value>>, Error>
        where
            C: Into<Command>,
        {
            self.query_as(command).await
        }

        /// The result as a generic table.
        pub async fn query_table<C>(&mut self, command: C) -> Result<Table, Error>
        where
            C: Into<Command>,
        {
            let reader = self.read(&command.into()).await?;
            let name = DataSet::default_name(0);
            Ok(match reader.into_result_sets().into_iter().next() {
                Some(set) => Table::from_result_set(name, set),
                None => Table::new(name, Columns::default()),
            })
        }

        /// The result as a data set of one table, or none when the
        /// command returned no rows at all.
        pub async fn query_data_set<C>(&mut self, command: C) -> Result<DataSet, Error>
        where
            C: Into<Command>,
        {
            let reader = self.read(&command.into()).await?;
            Ok(DataSet::from_reader(reader))
        }
    };
}

/// An asynchronous PostgreSQL client.
pub struct Client {
    client: tokio_postgres::Client,
    statements: Statements,
}

impl AsMut<tokio_postgres::Client> for Client {
    fn as_mut(&mut self) -> &mut tokio_postgres::Client {
        &mut self.client
    }
}

impl AsRef<tokio_postgres::Client> for Client {
    fn as_ref(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

impl From<tokio_postgres::Client> for Client {
    fn from(client: tokio_postgres::Client) -> Self {
        Self::new(client)
    }
}

impl Client {
    /// Create a new `Client` from a `tokio_postgres::Client`.
    ///
    /// The connection half must be driven separately.
    pub fn new(client: tokio_postgres::Client) -> Self {
        let statements = HashMap::new();
        Client { client, statements }
    }

    /// A token to cancel whatever the server is running for this client.
    pub fn cancel_token(&self) -> tokio_postgres::CancelToken {
        self.client.cancel_token()
    }

    /// Creates and caches a new prepared statement.
    ///
    /// ```no_run
    /// # async fn xmain() -> Result<(), dbkit::tokio_postgres::Error> {
    /// # use dbkit::tokio_postgres::connect;
    /// # use tokio_postgres::NoTls;
    /// let mut client = connect("host=localhost user=postgres", NoTls).await?;
    ///
    /// // Prepare the query in the database.
    /// client.prepare("SELECT id, first, last FROM customers WHERE first = $1").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn prepare(&mut self, text: &str) -> Result<(), Error> {
        prepare_internal(&self.client, &mut self.statements, text.into()).await?;
        Ok(())
    }

    /// Run a command, returning the number of rows it changed.
    pub async fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        execute_internal(&self.client, &mut self.statements, command).await
    }

    /// Run a command, returning a reader over its result.
    pub async fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        read_internal(&self.client, &mut self.statements, command).await
    }

    async_helpers!();

    /// Begins a new database transaction.
    ///
    /// The transaction will roll back by default - use the `commit` method to commit it.
    pub async fn transaction(&mut self) -> Result<Transaction<'_>, Error> {
        tracing::debug!("begin transaction");
        Ok(Transaction {
            txn: self
                .client
                .transaction()
                .await
                .map_err(Error::transaction)?,
            statements: &mut self.statements,
        })
    }

    /// Run each command in one transaction, returning the total rows
    /// changed.  Any failure rolls them all back.
    ///
    /// ```no_run
    /// # async fn xmain() -> Result<(), dbkit::tokio_postgres::Error> {
    /// # use dbkit::command::Command;
    /// # use dbkit::tokio_postgres::connect;
    /// # use tokio_postgres::NoTls;
    /// let mut client = connect("host=localhost user=postgres", NoTls).await?;
    ///
    /// client.execute_in_transaction([
    ///     Command::with_params("UPDATE accounts SET balance = balance - $1 WHERE id = $2", (10, 1)),
    ///     Command::with_params("UPDATE accounts SET balance = balance + $1 WHERE id = $2", (10, 2)),
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute_in_transaction<I>(&mut self, commands: I) -> Result<u64, Error>
    where
        I: IntoIterator,
        I::Item: Into<Command>,
    {
        let txn = self.transaction().await?;
        execute_atomically(txn, commands).await
    }
}

/// A unit of work which either commits or rolls back as a whole.
trait Atomic: Sized {
    async fn execute(&mut self, command: &Command) -> Result<u64, Error>;
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}

/// Runs the commands in order, rolling back at the first failure.
///
/// The failure is returned even if the rollback fails as well.
async fn execute_atomically<T, I>(mut txn: T, commands: I) -> Result<u64, Error>
where
    T: Atomic,
    I: IntoIterator,
    I::Item: Into<Command>,
{
    let mut total = 0;
    for command in commands {
        match txn.execute(&command.into()).await {
            Ok(rows_affected) => total += rows_affected,
            Err(error) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(%rollback, %error, "rollback failed");
                }
                return Err(error);
            }
        }
    }
    txn.commit().await?;
    Ok(total)
}

/// An asynchronous PostgreSQL database transaction.
///
/// Transactions will implicitly roll back by default when dropped. Use the
/// `commit` method to commit the changes made in the transaction.
pub struct Transaction<'a> {
    txn: tokio_postgres::Transaction<'a>,
    statements: &'a mut Statements,
}

impl<'a> Transaction<'a> {
    /// Consumes the transaction, committing all changes made within it.
    pub async fn commit(self) -> Result<(), Error> {
        tracing::debug!("commit transaction");
        self.txn.commit().await.map_err(Error::transaction)
    }

    /// Rolls the transaction back, discarding all changes made within it.
    ///
    /// This is equivalent to `Transaction`'s `Drop` implementation, but provides any error encountered to the caller.
    pub async fn rollback(self) -> Result<(), Error> {
        tracing::debug!("rollback transaction");
        self.txn.rollback().await.map_err(Error::transaction)
    }

    /// Run a command, returning the number of rows it changed.
    pub async fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        execute_internal(&self.txn, self.statements, command).await
    }

    /// Run a command, returning a reader over its result.
    pub async fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        read_internal(&self.txn, self.statements, command).await
    }

    async_helpers!();
}

impl Atomic for Transaction<'_> {
    async fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        Transaction::execute(self, command).await
    }

    async fn commit(self) -> Result<(), Error> {
        Transaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), Error> {
        Transaction::rollback(self).await
    }
}
