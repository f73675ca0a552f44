//! Opening connections on demand.
//!
//! A [`Connector`] knows how to open one kind of client.  A [`Database`]
//! wraps a connector and opens a connection only when it needs one.
//! If a call opened the connection, the same call closes it again
//! before returning, unless the database was told to
//! [`keep_open`](Database::keep_open).  A connection the caller opened
//! explicitly stays open.
//!
#![cfg_attr(
    feature = "rusqlite",
    doc = r##"

```
use dbkit::client::Client;
use dbkit::connection::Database;
use dbkit::rusqlite::SqliteConnector;

# fn main() -> Result<(), dbkit::rusqlite::Error> {
let mut db = Database::new(SqliteConnector::in_memory());
db.keep_open(true);

db.with_client(|client| client.execute(&"CREATE TABLE t (n INTEGER)".into()))?;
let inserted = db.transaction(|tx| tx.execute(&"INSERT INTO t VALUES (1)".into()))?;
assert_eq!(1, inserted);
assert!(db.is_open());
# Ok(())
# }
```
"##
)]

use crate::client::{Client, Transactional};
use crate::error::Error;

/// The error type of a connector's clients.
pub type ConnectorError<K> = Error<<<K as Connector>::Client as Client>::Error>;

/// How to open a client.
pub trait Connector {
    type Client: Transactional + 'static;

    /// Open a new connection.
    fn connect(&self) -> Result<Self::Client, ConnectorError<Self>>;

    /// Close a connection.  The default just drops it.
    fn close(&self, client: Self::Client) -> Result<(), ConnectorError<Self>> {
        drop(client);
        Ok(())
    }
}

impl<F, C> Connector for F
where
    F: Fn() -> Result<C, Error<C::Error>>,
    C: Transactional + 'static,
{
    type Client = C;

    fn connect(&self) -> Result<C, Error<C::Error>> {
        self()
    }
}

/// A database behind a connector, opened when needed.
pub struct Database<K: Connector> {
    connector: K,
    client: Option<K::Client>,
    keep_open: bool,
}

impl<K: Connector> Database<K> {
    pub fn new(connector: K) -> Self {
        Database {
            connector,
            client: None,
            keep_open: false,
        }
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Keep connections opened by `with_client` and `transaction`
    /// around for the next call.
    pub fn keep_open(&mut self, keep_open: bool) {
        self.keep_open = keep_open;
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Open the connection if it isn't open already.
    pub fn open(&mut self) -> Result<(), ConnectorError<K>> {
        self.ensure_open().map(|_| ())
    }

    /// Close the connection if it is open.
    pub fn close(&mut self) -> Result<(), ConnectorError<K>> {
        match self.client.take() {
            Some(client) => {
                tracing::debug!("closing connection");
                self.connector.close(client)
            }
            None => Ok(()),
        }
    }

    /// Run `f` with an open client.
    pub fn with_client<T, F>(&mut self, f: F) -> Result<T, ConnectorError<K>>
    where
        F: FnOnce(&mut K::Client) -> Result<T, ConnectorError<K>>,
    {
        let opened = self.ensure_open()?;
        let result = match self.client.as_mut() {
            Some(client) => f(client),
            None => Err(Error::connect_str("connection is not open", None)),
        };
        self.release(opened, result)
    }

    /// Run `f` in a transaction on an open client.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back
    /// otherwise.  It always ends before the connection is closed.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, ConnectorError<K>>
    where
        F: FnOnce(
            &mut <K::Client as Transactional>::Transaction<'_>,
        ) -> Result<T, ConnectorError<K>>,
    {
        self.with_client(|client| client.transaction(f))
    }

    fn ensure_open(&mut self) -> Result<bool, ConnectorError<K>> {
        if self.client.is_some() {
            return Ok(false);
        }
        tracing::debug!("opening connection");
        self.client = Some(self.connector.connect()?);
        Ok(true)
    }

    fn release<T>(&mut self, opened: bool, result: Result<T, ConnectorError<K>>) -> Result<T, ConnectorError<K>> {
        if !opened || self.keep_open {
            return result;
        }
        match (self.close(), result) {
            (Err(close), Ok(_)) => Err(close),
            (Err(close), Err(error)) => {
                tracing::warn!(%close, %error, "closing connection failed");
                Err(error)
            }
            (Ok(()), result) => result,
        }
    }
}

impl<K: Connector + std::fmt::Debug> std::fmt::Debug for Database<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connector", &self.connector)
            .field("open", &self.is_open())
            .field("keep_open", &self.keep_open)
            .finish()
    }
}

impl<K: Connector> Drop for Database<K> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!(%error, "closing connection failed");
        }
    }
}
