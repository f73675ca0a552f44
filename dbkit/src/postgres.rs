//! A synchronous client for PostgreSQL.
//!
//! Commands are prepared once and cached by their text, and each
//! produces a single result set.  Procedures are called with
//! `CALL name($1, $2, ...)`.

use std::collections::HashMap;

use postgres::GenericClient;

use crate::client::{TransactionControl, Transactional};
use crate::command::Command;
use crate::connection::Connector;
use crate::postgres_common;
use crate::reader::{Reader, ResultSet};

pub use crate::postgres_common::Error;

type Statements = HashMap<String, tokio_postgres::Statement>;

fn prepare_internal<C: GenericClient>(
    client: &mut C,
    statements: &mut Statements,
    query_text: String,
) -> Result<tokio_postgres::Statement, Error> {
    match statements.entry(query_text) {
        std::collections::hash_map::Entry::Occupied(entry) => Ok(entry.get().clone()),
        std::collections::hash_map::Entry::Vacant(entry) => {
            let statement = client.prepare(entry.key()).map_err(Error::prepare)?;
            Ok(entry.insert(statement).clone())
        }
    }
}

fn execute_internal<C: GenericClient>(
    client: &mut C,
    statements: &mut Statements,
    command: &Command,
) -> Result<u64, Error> {
    let text = postgres_common::command_text(command);
    tracing::debug!(text = %text, params = command.params().len(), "executing command");
    let statement = prepare_internal(client, statements, text)?;
    let params = postgres_common::to_params(&statement, command.params())?;

    client
        .execute(&statement, &postgres_common::borrow(&params))
        .map_err(Error::query)
}

fn read_internal<C: GenericClient>(
    client: &mut C,
    statements: &mut Statements,
    command: &Command,
) -> Result<Reader, Error> {
    let text = postgres_common::command_text(command);
    tracing::debug!(text = %text, params = command.params().len(), "reading command");
    let statement = prepare_internal(client, statements, text)?;
    let params = postgres_common::to_params(&statement, command.params())?;
    let params = postgres_common::borrow(&params);

    let set = if statement.columns().is_empty() {
        let rows_affected = client.execute(&statement, &params).map_err(Error::query)?;
        ResultSet::affected(rows_affected)
    } else {
        let rows = client.query(&statement, &params).map_err(Error::query)?;
        postgres_common::to_result_set(&statement, rows)?
    };
    Ok(Reader::new(vec![set]))
}

/// A synchronous PostgreSQL client.
pub struct Client {
    client: postgres::Client,
    statements: Statements,
}

impl AsMut<postgres::Client> for Client {
    fn as_mut(&mut self) -> &mut postgres::Client {
        &mut self.client
    }
}

impl AsRef<postgres::Client> for Client {
    fn as_ref(&self) -> &postgres::Client {
        &self.client
    }
}

impl From<postgres::Client> for Client {
    fn from(client: postgres::Client) -> Self {
        Self::new(client)
    }
}

impl Client {
    /// Create a new `Client` from a `postgres::Client`.
    pub fn new(client: postgres::Client) -> Self {
        let statements = HashMap::new();
        Client { client, statements }
    }

    /// A convenience function which parses a configuration string into a `Config` and then connects to the database.
    ///
    /// See the documentation for `postgres::Config` for information about the connection syntax.
    ///
    /// ```no_run
    /// # fn main() -> Result<(), dbkit::postgres::Error> {
    /// # use postgres::NoTls;
    /// # use dbkit::postgres::Client;
    /// // Connect to the database.
    /// let mut client = Client::connect("host=localhost user=postgres", NoTls)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect<T>(params: &str, tls_mode: T) -> Result<Self, Error>
    where
        T: postgres::tls::MakeTlsConnect<postgres::Socket> + 'static + Send,
        T::TlsConnect: Send,
        T::Stream: Send,
        <T::TlsConnect as postgres::tls::TlsConnect<postgres::Socket>>::Future: Send,
    {
        tracing::debug!("connecting to postgres");
        let client = postgres::Client::connect(params, tls_mode).map_err(Error::connect)?;
        Ok(Self::new(client))
    }

    /// Creates and caches a new prepared statement.
    ///
    /// Commands are prepared on first use anyway, this just does it ahead
    /// of time so that mistakes in the text show up early.
    ///
    /// ```no_run
    /// # fn main() -> Result<(), dbkit::postgres::Error> {
    /// # use dbkit::postgres::Client;
    /// # use postgres::NoTls;
    /// let mut client = Client::connect("host=localhost user=postgres", NoTls)?;
    ///
    /// // Prepare the query in the database.
    /// client.prepare("SELECT id, first, last FROM customers WHERE first = $1")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn prepare(&mut self, text: &str) -> Result<(), Error> {
        prepare_internal(&mut self.client, &mut self.statements, text.into())?;
        Ok(())
    }

    /// Close the connection, reporting any error.
    pub fn close(self) -> Result<(), Error> {
        tracing::debug!("closing postgres connection");
        self.client.close().map_err(Error::connect)
    }
}

impl crate::client::Client for Client {
    type Error = tokio_postgres::Error;

    fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        execute_internal(&mut self.client, &mut self.statements, command)
    }

    fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        read_internal(&mut self.client, &mut self.statements, command)
    }
}

impl Transactional for Client {
    type Transaction<'a> = Transaction<'a>;

    /// Begins a new database transaction.
    ///
    /// The transaction will roll back by default - use the `commit` method to commit it.
    fn begin(&mut self) -> Result<Transaction<'_>, Error> {
        tracing::debug!("begin transaction");
        Ok(Transaction {
            txn: self.client.transaction().map_err(Error::transaction)?,
            statements: &mut self.statements,
        })
    }
}

/// A synchronous PostgreSQL transaction.
///
/// Transactions will implicitly roll back by default when dropped. Use the
/// `commit` method to commit the changes made in the transaction.
pub struct Transaction<'a> {
    txn: postgres::Transaction<'a>,
    statements: &'a mut Statements,
}

impl<'a> crate::client::Client for Transaction<'a> {
    type Error = tokio_postgres::Error;

    fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        execute_internal(&mut self.txn, self.statements, command)
    }

    fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        read_internal(&mut self.txn, self.statements, command)
    }
}

impl<'a> TransactionControl for Transaction<'a> {
    /// Consumes the transaction, committing all changes made within it.
    fn commit(self) -> Result<(), Error> {
        tracing::debug!("commit transaction");
        self.txn.commit().map_err(Error::transaction)
    }

    /// Rolls the transaction back, discarding all changes made within it.
    ///
    /// This is equivalent to `Transaction`'s `Drop` implementation, but provides any error encountered to the caller.
    fn rollback(self) -> Result<(), Error> {
        tracing::debug!("rollback transaction");
        self.txn.rollback().map_err(Error::transaction)
    }
}

/// Opens PostgreSQL clients from a `postgres::Config` and a TLS mode.
///
/// ```no_run
/// # fn main() -> Result<(), dbkit::postgres::Error> {
/// use dbkit::client::Client as _;
/// use dbkit::connection::Database;
/// use dbkit::postgres::PostgresConnector;
///
/// let connector = PostgresConnector::parse("host=localhost user=postgres", postgres::NoTls)?;
/// let mut db = Database::new(connector);
/// let count: Option<i64> = db.with_client(|client| client.query_scalar("SELECT COUNT(*) FROM pets"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PostgresConnector<T> {
    config: postgres::Config,
    tls: T,
}

impl<T> PostgresConnector<T> {
    pub fn new(config: postgres::Config, tls: T) -> Self {
        PostgresConnector { config, tls }
    }

    /// Parse a configuration string.  See `postgres::Config` for the syntax.
    pub fn parse(params: &str, tls: T) -> Result<Self, Error> {
        let config = params.parse().map_err(Error::connect)?;
        Ok(PostgresConnector::new(config, tls))
    }

    pub fn config(&self) -> &postgres::Config {
        &self.config
    }
}

impl<T> Connector for PostgresConnector<T>
where
    T: postgres::tls::MakeTlsConnect<postgres::Socket> + Clone + 'static + Send,
    T::TlsConnect: Send,
    T::Stream: Send,
    <T::TlsConnect as postgres::tls::TlsConnect<postgres::Socket>>::Future: Send,
{
    type Client = Client;

    fn connect(&self) -> Result<Client, Error> {
        tracing::debug!("connecting to postgres");
        self.config
            .connect(self.tls.clone())
            .map(Client::new)
            .map_err(Error::connect)
    }

    fn close(&self, client: Client) -> Result<(), Error> {
        client.close()
    }
}
