#![cfg_attr(docsrs, feature(doc_cfg))]

//! Ergonomic helpers over Rust database clients.
//!
//! The database work itself is left to the driver crates.  This crate
//! takes away the boilerplate around them: opening connections when
//! needed, running commands, walking result sets and loading rows into
//! collections, dictionaries, tuples or generic tables.
//!
//! The moving parts:
//!
//! * a [`Command`] is SQL text (or a procedure name) and its parameters,
//! * a [`Client`](client::Client) runs commands, answering with a count of
//!   rows changed or a [`Reader`] over one or more result sets,
//! * rows come back as backend-neutral [`Row`]s of [`Value`](value::Value)s,
//!   which load into your types through [`FromRow`],
//! * the [`map`] module turns a reader into a `Vec` through a callback of
//!   whichever shape is handy,
//! * the [`client::Transactional`] trait and the
//!   [`Database`](connection::Database) wrapper run closures in a
//!   transaction, committing on success and rolling back on failure.
#![cfg_attr(
    feature = "derive",
    doc = r##"

Row types can be derived:

```
use dbkit::FromRow;

#[derive(FromRow)]
struct Pet {
    id: i64,
    name: String,
    species: String,
}
```
"##
)]
//!
//! dbkit supports the following database client crates:
//!
//! | DB | Backend Crate | Feature | Sync/Async | Client |
//! | -- | ------------- | ------- | ---------- | ------ |
//! | SQLite | [rusqlite](https://crates.io/crates/rusqlite) | `rusqlite` | Sync | [`dbkit::rusqlite::Client`](rusqlite::Client) |
//! | PostgreSQL | [postgres](https://crates.io/crates/postgres) | `postgres` | Sync | [`dbkit::postgres::Client`](postgres::Client) |
//! | PostgreSQL | [tokio-postgres](https://crates.io/crates/tokio-postgres) | `tokio-postgres` | Async | [`dbkit::tokio_postgres::Client`](tokio_postgres::Client) |
//! | MySQL/MariaDB | [mysql](https://crates.io/crates/mysql) | `mysql` | Sync | [`dbkit::mysql::Client`](mysql::Client) |
//!
//! ## Examples
//!
//! Here's how it might look end-to-end with various clients.
#![cfg_attr(
    all(feature = "rusqlite", feature = "derive"),
    doc = r##"

The SQLite client, available when compiled with crate feature
`rusqlite` (on by default).

```
use dbkit::client::{Client, Transactional};
use dbkit::rusqlite;
use dbkit::{Command, FromRow};

#[derive(FromRow)]
struct Pet {
    id: i64,
    name: String,
    species: String,
}

# fn main() -> Result<(), rusqlite::Error> {
let mut client = rusqlite::Client::open_in_memory()?;

client.execute(&"CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT, species TEXT)".into())?;

// Several commands in one transaction, returning the number of rows modified.
let insert_count = client.execute_in_transaction([
    Command::with_params("INSERT INTO pets (name, species) VALUES (?, ?)", ("Dan", "Felis catus")),
    Command::with_params("INSERT INTO pets (name, species) VALUES (?, ?)", ("Rex", "Canis familiaris")),
])?;
assert_eq!(insert_count, 2);

// Run a query and load the rows.
let pets: Vec<Pet> = client.query_as("SELECT id, name, species FROM pets ORDER BY id")?;
assert_eq!(pets[0].name, "Dan");

// Or map them with a closure.
let names = client.query_map("SELECT name FROM pets ORDER BY name DESC", |row| {
    Ok(row.get::<_, String>("name")?)
})?;
assert_eq!(names, ["Rex", "Dan"]);
#
# Ok(())
# }
```
"##
)]
#![cfg_attr(
    feature = "tokio-postgres",
    doc = r##"

The asynchronous PostgreSQL client, available when compiled
with crate feature `tokio-postgres`.

```no_run
use tokio_postgres::NoTls;
use dbkit::tokio_postgres::connect;
use dbkit::Command;

# async fn try_main() -> Result<(), dbkit::tokio_postgres::Error> {
// Connect to the database.  The connection runs on its own task.
let mut client = connect("host=localhost user=postgres", NoTls).await?;

// Execute a statement, returning the number of rows modified.
let insert_count = client.execute(&Command::with_params(
    "INSERT INTO pets (name, species) VALUES ($1, $2)",
    ("Dan", "Felis catus"),
)).await?;
assert_eq!(insert_count, 1);

// Run a query and load the rows.
let rows: Vec<(i32, String)> = client.query_as("SELECT id, name FROM pets").await?;
assert_eq!(rows.len(), 1);
assert_eq!(rows[0].1, "Dan");
#
# Ok(())
# }
```
"##
)]
#![cfg_attr(
    feature = "postgres",
    doc = r##"

The synchronous PostgreSQL client, available when compiled
with crate feature `postgres`.

```no_run
use postgres::NoTls;
use dbkit::client::Client as _;
use dbkit::postgres::Client;
use dbkit::Command;

# fn try_main() -> Result<(), dbkit::postgres::Error> {
// Connect to the database
let mut client =
    Client::connect("host=localhost user=postgres", NoTls)?;

// Execute a statement, returning the number of rows modified.
let insert_count = client.execute(&Command::with_params(
    "INSERT INTO pets (name, species) VALUES ($1, $2)",
    ("Dan", "Felis catus"),
))?;
assert_eq!(insert_count, 1);

// Run a query and load the rows.
let rows: Vec<(i32, String)> = client.query_as("SELECT id, name FROM pets")?;
assert_eq!(rows.len(), 1);
assert_eq!(rows[0].1, "Dan");
#
# Ok(())
# }
```
"##
)]

pub mod client;
pub mod collect;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod map;
pub mod reader;
pub mod row;
pub mod table;
pub mod value;

#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql;
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres;
#[cfg(any(feature = "postgres", feature = "tokio-postgres"))]
mod postgres_common;
#[cfg(feature = "rusqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "rusqlite")))]
pub mod rusqlite;
#[cfg(feature = "tokio-postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-postgres")))]
pub mod tokio_postgres;

#[cfg(test)]
extern crate self as dbkit;

#[cfg(test)]
mod test;

pub use command::Command;
pub use error::Error;
pub use reader::Reader;
pub use row::{FromColumnsIndexed, FromColumnsNamed, FromRow, Row};
pub use table::{DataSet, Table};
pub use value::Value;

#[cfg(feature = "derive")]
#[cfg_attr(docsrs, doc(cfg(feature = "derive")))]
pub use dbkit_derive::{FromColumnsIndexed, FromColumnsNamed, FromRow};
