//! Error handling.
//!
//! Errors can happen in one of a few different phases:
//!
//! * connecting to a database
//! * preparing a command
//! * executing a command
//! * converting values out of the results
//! * collecting rows into a container
//! * transaction control
//!
//! Use the `kind()` method on [`Error`] to find out
//! which step it was.  If we have an underlying database
//! error it can be retrieved with the `inner()` method.
//!
//! Value and row conversions don't know which database they
//! came from, so they fail with a [`ColumnError`] instead.  It
//! converts into an [`Error`] of kind `FromColumn`, which lets
//! row callbacks use `?` on column access directly.

/// An error that occurred when trying to use the database.
#[derive(Debug, Clone)]
pub struct Error<ClientError> {
    message: String,
    kind: ErrorKind,
    inner: Option<ClientError>,
}

impl<ClientError> Error<ClientError> {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn inner(&self) -> Option<&ClientError> {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Option<ClientError> {
        self.inner
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn new<S: Into<String>>(kind: ErrorKind, message: S, inner: Option<ClientError>) -> Self {
        let message = message.into();
        Error {
            message,
            kind,
            inner,
        }
    }

    pub fn from_column_str<S: Into<String>>(message: S, inner: Option<ClientError>) -> Self {
        Self::new(ErrorKind::FromColumn, message, inner)
    }

    pub fn prepare_str<S: Into<String>>(message: S, inner: Option<ClientError>) -> Self {
        Self::new(ErrorKind::Prepare, message, inner)
    }

    pub fn query_str<S: Into<String>>(message: S, inner: Option<ClientError>) -> Self {
        Self::new(ErrorKind::Query, message, inner)
    }

    pub fn connect_str<S: Into<String>>(message: S, inner: Option<ClientError>) -> Self {
        Self::new(ErrorKind::Connect, message, inner)
    }

    pub fn transaction_str<S: Into<String>>(message: S, inner: Option<ClientError>) -> Self {
        Self::new(ErrorKind::Transaction, message, inner)
    }

    pub fn collect_str<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Collect, message, None)
    }
}

impl<ClientError: std::fmt::Display> Error<ClientError> {
    pub fn from_column(inner: ClientError) -> Self {
        let message = inner.to_string();
        Self::from_column_str(message, Some(inner))
    }

    pub fn prepare(inner: ClientError) -> Self {
        let message = inner.to_string();
        Self::prepare_str(message, Some(inner))
    }

    pub fn query(inner: ClientError) -> Self {
        let message = inner.to_string();
        Self::query_str(message, Some(inner))
    }

    pub fn connect(inner: ClientError) -> Self {
        let message = inner.to_string();
        Self::connect_str(message, Some(inner))
    }

    pub fn transaction(inner: ClientError) -> Self {
        let message = inner.to_string();
        Self::transaction_str(message, Some(inner))
    }
}

impl<ClientError: std::error::Error + 'static> std::error::Error for Error<ClientError> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.as_ref().map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// What operation prompted the error?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Database error while preparing a command.
    Prepare,

    /// Database error while executing a command.
    Query,

    /// Bad conversion from a database column.
    FromColumn,

    /// Problems connecting to the database.
    Connect,

    /// Error in transaction control.
    Transaction,

    /// The rows didn't fit the requested container, e.g. a
    /// duplicate dictionary key or too many rows.
    Collect,
}

impl<ClientError> std::fmt::Display for Error<ClientError> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

/// A failed conversion out of a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnError {
    message: String,
    column: Option<String>,
}

impl ColumnError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        ColumnError {
            message: message.into(),
            column: None,
        }
    }

    /// Attach the name or position of the offending column.
    pub fn at<S: Into<String>>(mut self, column: S) -> Self {
        if self.column.is_none() {
            self.column = Some(column.into());
        }
        self
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ColumnError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.column {
            Some(column) => write!(f, "column {column}: {}", self.message),
            None => self.message.fmt(f),
        }
    }
}

impl std::error::Error for ColumnError {}

impl<ClientError> From<ColumnError> for Error<ClientError> {
    fn from(error: ColumnError) -> Self {
        Error::from_column_str(error.to_string(), None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn column_error_names_the_column() {
        let error = ColumnError::new("unexpected null").at("name");
        assert_eq!("column name: unexpected null", error.to_string());
        assert_eq!(Some("name"), error.column());
    }

    #[test]
    fn first_column_wins() {
        let error = ColumnError::new("bad").at("inner").at("outer");
        assert_eq!(Some("inner"), error.column());
    }

    #[test]
    fn column_error_converts_to_from_column() {
        let error: Error<std::io::Error> = ColumnError::new("bad").into();
        assert_eq!(ErrorKind::FromColumn, error.kind());
        assert!(error.inner().is_none());
        assert_eq!("bad", error.to_string());
    }

    #[test]
    fn driver_error_is_the_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error = Error::query(io);
        assert_eq!(ErrorKind::Query, error.kind());
        assert_eq!("disk on fire", error.to_string());
        assert!(error.source().is_some());
    }
}
