//! Connection strings.
//!
//! A connection string is a list of `key=value` pairs separated by
//! semicolons:
//!
//! ```text
//! Data Source=./pets.db; Busy Timeout=5000; Foreign Keys=true
//! ```
//!
//! Keys are trimmed and matched ignoring ASCII case.  Values are
//! trimmed too, unless quoted with `'` or `"`; inside quotes the quote
//! character is escaped by doubling it, and `;` loses its meaning.
//! Empty segments are skipped.  When a key repeats, the last one wins.

use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse<E>(text: &str) -> Result<Self, Error<E>> {
        let mut pairs = vec![];
        let mut chars = text.chars().peekable();

        loop {
            let mut key = String::new();
            let mut has_value = false;
            for c in chars.by_ref() {
                match c {
                    '=' => {
                        has_value = true;
                        break;
                    }
                    ';' => break,
                    c => key.push(c),
                }
            }

            let key = key.trim();
            if !has_value {
                if !key.is_empty() {
                    return Err(Error::connect_str(
                        format!("missing '=' after {key:?} in connection string"),
                        None,
                    ));
                }
                if chars.peek().is_none() {
                    break;
                }
                continue;
            }
            if key.is_empty() {
                return Err(Error::connect_str("empty key in connection string", None));
            }

            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let value = match chars.peek().copied() {
                Some(quote @ ('\'' | '"')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => {
                                if chars.next_if_eq(&quote).is_some() {
                                    value.push(quote);
                                } else {
                                    break;
                                }
                            }
                            Some(c) => value.push(c),
                            None => {
                                return Err(Error::connect_str(
                                    format!("unterminated quote in value of {key:?}"),
                                    None,
                                ))
                            }
                        }
                    }
                    for c in chars.by_ref() {
                        match c {
                            ';' => break,
                            c if c.is_whitespace() => {}
                            c => {
                                return Err(Error::connect_str(
                                    format!("unexpected {c:?} after quoted value of {key:?}"),
                                    None,
                                ))
                            }
                        }
                    }
                    value
                }
                _ => {
                    let mut value = String::new();
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                        value.push(c);
                    }
                    value.trim().to_string()
                }
            };

            let key = key.to_ascii_lowercase();
            pairs.retain(|(k, _)| *k != key);
            pairs.push((key, value));
        }

        Ok(ConnectionString { pairs })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The first of several alternative keys that is present.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parse the value of `key`, if present.
    pub fn get_parsed<T, E>(&self, key: &str) -> Result<Option<T>, Error<E>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.parse().map_err(|e| {
                    Error::connect_str(format!("invalid value {value:?} for {key:?}: {e}"), None)
                })
            })
            .transpose()
    }

    /// A boolean value: `true`/`false`, `yes`/`no`, `on`/`off` or `1`/`0`.
    pub fn get_bool<E>(&self, key: &str) -> Result<Option<bool>, Error<E>> {
        self.get(key)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(Error::connect_str(
                    format!("invalid value {value:?} for {key:?}, expected a boolean"),
                    None,
                )),
            })
            .transpose()
    }

    /// Keys (lowercased) and values, in the order given.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The path SQLite uses for a private, in-memory database.
pub const IN_MEMORY: &str = ":memory:";

const PATH_KEYS: &[&str] = &["data source", "datasource", "filename"];
const KNOWN_KEYS: &[&str] = &[
    "data source",
    "datasource",
    "filename",
    "busy timeout",
    "foreign keys",
    "mode",
];

/// How a SQLite database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqliteMode {
    ReadOnly,
    /// The file must exist already.
    ReadWrite,
    #[default]
    ReadWriteCreate,
}

/// Settings for opening a SQLite database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: String,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: Option<bool>,
    pub mode: SqliteMode,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        SqliteConfig::in_memory()
    }
}

impl SqliteConfig {
    pub fn new<S: Into<String>>(path: S) -> Self {
        SqliteConfig {
            path: path.into(),
            busy_timeout: None,
            foreign_keys: None,
            mode: SqliteMode::default(),
        }
    }

    pub fn in_memory() -> Self {
        SqliteConfig::new(IN_MEMORY)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }

    /// Read the settings from a connection string.
    ///
    /// | Key | Setting |
    /// | --- | ------- |
    /// | `Data Source`, `DataSource`, `Filename` | `path`, `:memory:` for in-memory |
    /// | `Busy Timeout` | `busy_timeout`, in milliseconds |
    /// | `Foreign Keys` | `foreign_keys` |
    /// | `Mode` | `ReadOnly`, `ReadWrite` or `ReadWriteCreate` |
    ///
    /// Unknown keys are logged and ignored.
    pub fn from_connection_string<E>(conn: &ConnectionString) -> Result<Self, Error<E>> {
        let path = conn.get_any(PATH_KEYS).ok_or_else(|| {
            Error::connect_str("connection string has no Data Source", None)
        })?;

        let mut config = SqliteConfig::new(path);
        config.busy_timeout = conn
            .get_parsed::<u64, E>("busy timeout")?
            .map(Duration::from_millis);
        config.foreign_keys = conn.get_bool("foreign keys")?;
        config.mode = match conn.get("mode").map(str::to_ascii_lowercase).as_deref() {
            None | Some("readwritecreate") => SqliteMode::ReadWriteCreate,
            Some("readwrite") => SqliteMode::ReadWrite,
            Some("readonly") => SqliteMode::ReadOnly,
            Some(_) => {
                return Err(Error::connect_str(
                    format!("invalid Mode {:?}", conn.get("mode").unwrap_or_default()),
                    None,
                ))
            }
        };

        for (key, _) in conn.iter() {
            if !KNOWN_KEYS.contains(&key) {
                tracing::warn!(key, "ignoring unknown connection string key");
            }
        }

        Ok(config)
    }

    pub fn parse<E>(text: &str) -> Result<Self, Error<E>> {
        Self::from_connection_string(&ConnectionString::parse(text)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    type Result<T> = std::result::Result<T, Error<()>>;

    fn parse(text: &str) -> Result<ConnectionString> {
        ConnectionString::parse(text)
    }

    #[test]
    fn keys_ignore_case_and_space() {
        let conn = parse("  Data Source = ./pets.db ;BUSY TIMEOUT=250").unwrap();
        assert_eq!(Some("./pets.db"), conn.get("data source"));
        assert_eq!(Some("250"), conn.get("Busy Timeout"));
        assert_eq!(2, conn.len());
    }

    #[test]
    fn quoted_values() {
        let conn = parse(r#"a='x; y';b="say ""hi""" ; c='it''s'"#).unwrap();
        assert_eq!(Some("x; y"), conn.get("a"));
        assert_eq!(Some(r#"say "hi""#), conn.get("b"));
        assert_eq!(Some("it's"), conn.get("c"));
    }

    #[test]
    fn empty_segments_and_repeats() {
        let conn = parse(";;a=1;;a=2;").unwrap();
        assert_eq!(vec![("a", "2")], conn.iter().collect::<Vec<_>>());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn malformed() {
        assert_eq!(ErrorKind::Connect, parse("a=1;oops").unwrap_err().kind());
        assert!(parse("=1").is_err());
        assert!(parse("a='open").is_err());
        assert!(parse("a='x' y").is_err());
    }

    #[test]
    fn sqlite_config() {
        let config: SqliteConfig = SqliteConfig::parse::<()>(
            "Filename=pets.db; Busy Timeout=1500; Foreign Keys=yes; Mode=ReadOnly",
        )
        .unwrap();
        assert_eq!("pets.db", config.path);
        assert_eq!(Some(Duration::from_millis(1500)), config.busy_timeout);
        assert_eq!(Some(true), config.foreign_keys);
        assert_eq!(SqliteMode::ReadOnly, config.mode);
        assert!(!config.is_in_memory());

        let config = SqliteConfig::parse::<()>("Filename=pets.db; Mode=readwrite").unwrap();
        assert_eq!(SqliteMode::ReadWrite, config.mode);
    }

    #[test]
    fn sqlite_config_defaults() {
        let config = SqliteConfig::parse::<()>("DataSource=:memory:").unwrap();
        assert!(config.is_in_memory());
        assert_eq!(None, config.busy_timeout);
        assert_eq!(SqliteMode::ReadWriteCreate, config.mode);
    }

    #[test]
    fn sqlite_config_errors() {
        assert!(SqliteConfig::parse::<()>("Busy Timeout=5").is_err());
        assert!(SqliteConfig::parse::<()>("Data Source=x; Busy Timeout=soon").is_err());
        assert!(SqliteConfig::parse::<()>("Data Source=x; Foreign Keys=maybe").is_err());
        assert!(SqliteConfig::parse::<()>("Data Source=x; Mode=Sideways").is_err());
    }
}
