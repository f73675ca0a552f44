//! Sqlite bindings.
//!
//! A command may hold several statements separated by semicolons.  Each
//! statement takes as many of the command's parameters as it has
//! placeholders, in order.  Every statement that returns columns becomes
//! a result set; the others only add to the rows affected:
//!
//! ```
//! use dbkit::client::Client as _;
//! use dbkit::command::Command;
//! use dbkit::rusqlite::Client;
//!
//! # fn main() -> Result<(), dbkit::rusqlite::Error> {
//! let mut client = Client::open_in_memory()?;
//! let mut reader = client.read(&Command::with_params(
//!     "SELECT ?; SELECT ?, ?",
//!     (1, "two", 3.0),
//! ))?;
//! assert_eq!(2, reader.set_count());
//! assert_eq!(1, reader.field_count());
//! reader.next_result();
//! assert_eq!(2, reader.field_count());
//! # Ok(())
//! # }
//! ```

use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::client::{TransactionControl, Transactional};
use crate::command::{Command, CommandKind};
use crate::config::{SqliteConfig, SqliteMode};
use crate::connection::Connector;
use crate::error;
use crate::reader::{Reader, ResultSet};
use crate::row::Columns;
use crate::value::Value;

/// The type of errors from a `Client`.
pub type Error = error::Error<rusqlite::Error>;

impl rusqlite::types::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Bool(b) => ValueRef::Integer(i64::from(*b)),
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

fn from_value_ref(value: ValueRef<'_>, column: &str) -> Result<Value, Error> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => Value::Text(s.to_string()),
            Err(e) => {
                return Err(Error::from_column_str(
                    format!("column {column}: invalid UTF-8 text: {e}"),
                    None,
                ))
            }
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

/// Run one prepared statement, taking its parameters from the front
/// of `params`.
fn run_statement<'p>(
    statement: &mut rusqlite::Statement<'_>,
    params: &mut impl Iterator<Item = &'p Value>,
) -> Result<ResultSet, Error> {
    let wanted = statement.parameter_count();
    let taken: Vec<&Value> = params.take(wanted).collect();
    if taken.len() < wanted {
        return Err(Error::query_str(
            format!(
                "statement has {wanted} parameters but only {} were left",
                taken.len()
            ),
            None,
        ));
    }
    let params = rusqlite::params_from_iter(taken);

    if statement.column_count() == 0 {
        let changed = statement.execute(params).map_err(Error::query)?;
        return Ok(ResultSet::affected(changed.try_into().unwrap_or_default()));
    }

    let columns = Columns::new(statement.column_names());
    let mut set = ResultSet::new(columns.clone());
    let mut rows = statement.query(params).map_err(Error::query)?;
    while let Some(row) = rows.next().map_err(Error::query)? {
        let mut values = Vec::with_capacity(columns.len());
        for (index, name) in columns.names().iter().enumerate() {
            let value = row.get_ref(index).map_err(Error::from_column)?;
            values.push(from_value_ref(value, name)?);
        }
        set.push(values);
    }
    tracing::trace!(rows = set.len(), "read result set");
    Ok(set)
}

/// Run every statement of a command.
fn run(conn: &rusqlite::Connection, command: &Command) -> Result<Vec<ResultSet>, Error> {
    if command.kind() == CommandKind::Procedure {
        return Err(Error::prepare_str(
            format!("SQLite has no stored procedures, cannot call {}", command.text()),
            None,
        ));
    }
    tracing::debug!(
        text = command.text(),
        params = command.params().len(),
        "running command"
    );

    let mut params = command.params().iter();
    let mut sets = vec![];
    let mut batch = rusqlite::Batch::new(conn, command.text());
    while let Some(mut statement) = batch.next().map_err(Error::prepare)? {
        sets.push(run_statement(&mut statement, &mut params)?);
    }

    let left = params.len();
    if left > 0 {
        return Err(Error::query_str(
            format!("{left} parameters were not used by any statement"),
            None,
        ));
    }
    Ok(sets)
}

fn rows_affected(sets: &[ResultSet]) -> u64 {
    sets.iter().map(ResultSet::rows_affected).sum()
}

/// A synchronous Sqlite client.
#[derive(Debug)]
pub struct Client(rusqlite::Connection);

impl AsMut<rusqlite::Connection> for Client {
    fn as_mut(&mut self) -> &mut rusqlite::Connection {
        &mut self.0
    }
}

impl AsRef<rusqlite::Connection> for Client {
    fn as_ref(&self) -> &rusqlite::Connection {
        &self.0
    }
}

impl From<rusqlite::Connection> for Client {
    fn from(inner: rusqlite::Connection) -> Self {
        Client(inner)
    }
}

impl Client {
    /// Open a new connection to a SQLite database. If a database does not exist
    /// at the path, one is created.
    ///
    /// ```rust,no_run
    /// # use dbkit::rusqlite::{Client, Error};
    /// # fn open_my_db() -> Result<(), Error> {
    ///     let path = "./my_db.db3";
    ///     let db = Client::open(path)?;
    ///     // Use the database somehow...
    ///     println!("{}", db.as_ref().is_autocommit());
    ///     Ok(())
    /// # }
    /// ```
    ///
    /// # Failure
    ///
    /// Will return `Err` if `path` cannot be converted to a C-compatible string
    /// or if the underlying SQLite open call fails.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        tracing::debug!(path = %path.as_ref().display(), "opening sqlite database");
        rusqlite::Connection::open(path)
            .map(Client)
            .map_err(Error::connect)
    }

    /// Open a new connection to a SQLite database.
    ///
    /// [Database Connection](http://www.sqlite.org/c3ref/open.html) for a description of valid
    /// flag combinations.
    pub fn open_with_flags<P: AsRef<std::path::Path>>(
        path: P,
        flags: rusqlite::OpenFlags,
    ) -> Result<Self, Error> {
        tracing::debug!(path = %path.as_ref().display(), "opening sqlite database");
        rusqlite::Connection::open_with_flags(path, flags)
            .map(Client)
            .map_err(Error::connect)
    }

    /// Open a new connection to an in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self, Error> {
        tracing::debug!("opening in-memory sqlite database");
        rusqlite::Connection::open_in_memory()
            .map(Client)
            .map_err(Error::connect)
    }

    /// Open a connection as described by a [`SqliteConfig`].
    ///
    /// ```
    /// # use dbkit::config::SqliteConfig;
    /// # use dbkit::rusqlite::Client;
    /// # fn main() -> Result<(), dbkit::rusqlite::Error> {
    /// let config = SqliteConfig::parse("Data Source=:memory:; Foreign Keys=on")?;
    /// let client = Client::from_config(&config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &SqliteConfig) -> Result<Self, Error> {
        use rusqlite::OpenFlags;

        let mut flags = match config.mode {
            SqliteMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            SqliteMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            SqliteMode::ReadWriteCreate => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        flags |= OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let client = if config.is_in_memory() {
            tracing::debug!("opening in-memory sqlite database");
            rusqlite::Connection::open_in_memory_with_flags(flags)
                .map(Client)
                .map_err(Error::connect)?
        } else {
            Client::open_with_flags(&config.path, flags)?
        };

        if let Some(timeout) = config.busy_timeout {
            client.0.busy_timeout(timeout).map_err(Error::connect)?;
        }
        if let Some(enabled) = config.foreign_keys {
            client
                .0
                .pragma_update(None, "foreign_keys", enabled)
                .map_err(Error::connect)?;
        }
        Ok(client)
    }

    /// Close the connection, reporting any error.
    ///
    /// Dropping the client closes it too, but swallows the error.
    pub fn close(self) -> Result<(), Error> {
        tracing::debug!("closing sqlite database");
        self.0.close().map_err(|(_, e)| Error::connect(e))
    }
}

impl crate::client::Client for Client {
    type Error = rusqlite::Error;

    /// Executes a command, returning the number of rows modified.
    ///
    /// If the command does not modify any rows (e.g. SELECT), 0 is returned.
    fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        run(&self.0, command).map(|sets| rows_affected(&sets))
    }

    fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        run(&self.0, command).map(Reader::new)
    }
}

impl Transactional for Client {
    type Transaction<'a> = Transaction<'a>;

    /// Begins a new database transaction.
    ///
    /// The transaction will roll back by default - use the `commit` method to commit it.
    fn begin(&mut self) -> Result<Transaction<'_>, Error> {
        tracing::debug!("begin transaction");
        Ok(Transaction(
            self.0.transaction().map_err(Error::transaction)?,
        ))
    }
}

/// A synchronous Sqlite transaction.
///
/// Transactions will implicitly roll back by default when dropped. Use the
/// `commit` method to commit the changes made in the transaction.
#[derive(Debug)]
pub struct Transaction<'a>(rusqlite::Transaction<'a>);

impl<'a> crate::client::Client for Transaction<'a> {
    type Error = rusqlite::Error;

    fn execute(&mut self, command: &Command) -> Result<u64, Error> {
        run(&self.0, command).map(|sets| rows_affected(&sets))
    }

    fn read(&mut self, command: &Command) -> Result<Reader, Error> {
        run(&self.0, command).map(Reader::new)
    }
}

impl<'a> TransactionControl for Transaction<'a> {
    /// Consumes the transaction, committing all changes made within it.
    fn commit(self) -> Result<(), Error> {
        tracing::debug!("commit transaction");
        self.0.commit().map_err(Error::transaction)
    }

    /// Rolls the transaction back, discarding all changes made within it.
    ///
    /// This is equivalent to `Transaction`'s `Drop` implementation, but provides any error encountered to the caller.
    fn rollback(self) -> Result<(), Error> {
        tracing::debug!("rollback transaction");
        self.0.rollback().map_err(Error::transaction)
    }
}

/// Opens SQLite clients from a [`SqliteConfig`].
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    config: SqliteConfig,
}

impl SqliteConnector {
    pub fn new(config: SqliteConfig) -> Self {
        SqliteConnector { config }
    }

    /// Every connection gets its own, fresh in-memory database.
    pub fn in_memory() -> Self {
        SqliteConnector::new(SqliteConfig::in_memory())
    }

    /// Parse a connection string such as `Data Source=./pets.db`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        SqliteConfig::parse(text).map(SqliteConnector::new)
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl Connector for SqliteConnector {
    type Client = Client;

    fn connect(&self) -> Result<Client, Error> {
        Client::from_config(&self.config)
    }

    fn close(&self, client: Client) -> Result<(), Error> {
        client.close()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::Client as _;
    use crate::connection::Database;
    use crate::error::ErrorKind;

    fn pets() -> Client {
        let mut client = Client::open_in_memory().unwrap();
        client
            .execute(&Command::new(
                "CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT NOT NULL, species TEXT, photo BLOB);
                 INSERT INTO pets (name, species) VALUES ('Dan', 'cat'), ('Polly', 'bird'), ('Rex', NULL);",
            ))
            .unwrap();
        client
    }

    #[test]
    fn multiple_statements_multiple_sets() {
        let mut client = pets();
        let mut reader = client
            .read(&Command::with_params(
                "UPDATE pets SET species = ? WHERE name = ?;
                 SELECT name FROM pets WHERE species = ? ORDER BY name;
                 SELECT COUNT(*) AS n FROM pets",
                ("dog", "Rex", "cat"),
            ))
            .unwrap();

        assert_eq!(2, reader.set_count());
        assert_eq!(1, reader.rows_affected());
        assert_eq!(1, reader.field_count());

        let names: Vec<String> = reader.rows().map(|row| row.get(0).unwrap()).collect();
        assert_eq!(vec!["Dan"], names);

        assert!(reader.next_result());
        assert_eq!(Some("n"), reader.columns().and_then(|c| c.name(0)));
        assert_eq!(3, reader.read().unwrap().get::<_, i64>("n").unwrap());
    }

    #[test]
    fn parameter_count_must_match() {
        let mut client = pets();

        let error = client
            .read(&Command::with_params("SELECT ?; SELECT ?", (1,)))
            .unwrap_err();
        assert_eq!(ErrorKind::Query, error.kind());

        let error = client
            .read(&Command::with_params("SELECT ?", (1, 2)))
            .unwrap_err();
        assert_eq!(ErrorKind::Query, error.kind());
    }

    #[test]
    fn bad_sql_is_a_prepare_error() {
        let mut client = pets();
        let error = client.execute(&"SELEKT 1".into()).unwrap_err();
        assert_eq!(ErrorKind::Prepare, error.kind());
        assert!(error.inner().is_some());
    }

    #[test]
    fn procedures_are_refused() {
        let mut client = pets();
        let error = client
            .execute(&Command::procedure("add_pet", ("Tom",)))
            .unwrap_err();
        assert_eq!(ErrorKind::Prepare, error.kind());
    }

    #[test]
    fn values_round_the_driver() {
        let mut client = pets();
        client
            .execute(&Command::with_params(
                "UPDATE pets SET photo = ? WHERE name = 'Dan'",
                (vec![0xCAu8, 0xFE],),
            ))
            .unwrap();

        let row: (Option<String>, Option<Vec<u8>>, bool) = client
            .query_one("SELECT species, photo, 1.5 > 1 FROM pets WHERE name = 'Dan'")
            .unwrap();
        assert_eq!((Some("cat".into()), Some(vec![0xCA, 0xFE]), true), row);

        let species: Option<String> = client
            .query_scalar(("SELECT species FROM pets WHERE name = ?", ("Rex",)))
            .unwrap();
        assert_eq!(None, species);
    }

    #[test]
    fn transaction_commit_and_rollback() {
        let mut client = pets();

        client
            .transaction(|tx| tx.execute(&"DELETE FROM pets WHERE name = 'Rex'".into()))
            .unwrap();

        let result: Result<(), Error> = client.transaction(|tx| {
            tx.execute(&"DELETE FROM pets".into())?;
            Err(Error::query_str("stop", None))
        });
        assert!(result.is_err());

        let count: Option<i64> = client.query_scalar("SELECT COUNT(*) FROM pets").unwrap();
        assert_eq!(Some(2), count);
    }

    #[test]
    fn execute_in_transaction_rolls_back_everything() {
        let mut client = pets();

        let result = client.execute_in_transaction([
            "INSERT INTO pets (name) VALUES ('Tom')",
            "INSERT INTO pets (name) VALUES (NULL)",
        ]);
        assert_eq!(ErrorKind::Query, result.unwrap_err().kind());

        let count: Option<i64> = client.query_scalar("SELECT COUNT(*) FROM pets").unwrap();
        assert_eq!(Some(3), count);
    }

    #[test]
    fn database_from_connection_string() {
        let connector = SqliteConnector::parse("Data Source=:memory:; Foreign Keys=true").unwrap();
        let mut db = Database::new(connector);
        db.keep_open(true);

        let enabled: Option<bool> = db
            .with_client(|client| client.query_scalar("PRAGMA foreign_keys"))
            .unwrap();
        assert_eq!(Some(true), enabled);
        assert!(db.is_open());
        db.close().unwrap();
        assert!(!db.is_open());
    }

    #[test]
    fn open_modes() {
        let path = std::env::temp_dir().join(format!("dbkit-modes-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let source = format!("Data Source='{}'", path.display());

        let error = SqliteConnector::parse(&format!("{source}; Mode=ReadWrite"))
            .unwrap()
            .connect()
            .unwrap_err();
        assert_eq!(ErrorKind::Connect, error.kind());
        assert!(!path.exists());

        let mut client = SqliteConnector::parse(&format!("{source}; Mode=ReadWriteCreate"))
            .unwrap()
            .connect()
            .unwrap();
        client.execute(&"CREATE TABLE t (n INTEGER)".into()).unwrap();
        client.close().unwrap();

        let mut client = SqliteConnector::parse(&format!("{source}; Mode=ReadWrite"))
            .unwrap()
            .connect()
            .unwrap();
        assert_eq!(1, client.execute(&"INSERT INTO t VALUES (1)".into()).unwrap());
        client.close().unwrap();

        let mut client = SqliteConnector::parse(&format!("{source}; Mode=ReadOnly"))
            .unwrap()
            .connect()
            .unwrap();
        assert!(client.execute(&"INSERT INTO t VALUES (2)".into()).is_err());
        client.close().unwrap();

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn data_set_from_sqlite() {
        let mut client = pets();
        let data = client
            .query_data_set(
                "SELECT name FROM pets ORDER BY id;
                 DELETE FROM pets WHERE species IS NULL;
                 SELECT species, COUNT(*) AS n FROM pets GROUP BY species ORDER BY species",
            )
            .unwrap();
        assert_eq!(2, data.len());
        assert_eq!(3, data[0].len());
        assert_eq!("bird", data.table("Table1").unwrap().get::<_, String>(0, "species").unwrap());
    }

    #[test]
    fn row_counts_ahead_of_a_select() {
        let mut client = pets();

        let id: Option<i64> = client
            .query_scalar("INSERT INTO pets (name) VALUES ('Tom'); SELECT last_insert_rowid()")
            .unwrap();
        assert_eq!(Some(4), id);

        let cats: Vec<String> = client
            .query_as(
                "UPDATE pets SET species = 'cat' WHERE name = 'Tom';
                 SELECT name FROM pets WHERE species = 'cat' ORDER BY name",
            )
            .unwrap();
        assert_eq!(vec!["Dan", "Tom"], cats);

        let table = client
            .query_table("DELETE FROM pets WHERE name = 'Tom'; SELECT name FROM pets")
            .unwrap();
        let data = client
            .query_data_set("UPDATE pets SET name = name; SELECT name FROM pets")
            .unwrap();
        assert_eq!(3, table.len());
        assert_eq!(data[0].columns(), table.columns());
        assert_eq!(data[0].len(), table.len());
    }
}
