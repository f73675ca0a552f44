//! Conversions shared by the synchronous and asynchronous PostgreSQL clients.
//!
//! PostgreSQL is strict about types, so parameters are converted to
//! whatever Rust type matches the parameter type the server inferred
//! for the prepared statement, and columns are read according to their
//! declared type.
//!
//! Types without a [`Value`] of their own come back as text:
//!
//! | PostgreSQL | Text |
//! | ---------- | ---- |
//! | `NUMERIC` | `12.50` (exact) |
//! | `DATE` | `2024-01-31` |
//! | `TIME` | `13:45:00.250` |
//! | `TIMESTAMP` | `2024-01-31 13:45:00` |
//! | `TIMESTAMPTZ` | `2024-01-31 13:45:00+00:00` (in UTC) |
//! | `INTERVAL` | `1 year 2 mons 3 days 04:05:06` |
//! | `UUID` | `67e55044-10b1-426f-9247-bb680e5fe0c8` |
//! | `JSON`, `JSONB` | the serialized document |
//!
//! The same text forms are accepted for parameters of those types.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use postgres_types::{FromSql, IsNull, ToSql, Type};
use rust_decimal::Decimal;

use crate::command::Command;
use crate::error::{self, ColumnError};
use crate::reader::ResultSet;
use crate::row::Columns;
use crate::value::{FromValue, Value};

/// The type of errors from a PostgreSQL client.
pub type Error = error::Error<tokio_postgres::Error>;

/// A parameter converted for the driver.
pub(crate) type Param = Box<dyn ToSql + Sync + Send>;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

const DATE: &str = "%Y-%m-%d";
const TIME: &str = "%H:%M:%S%.f";
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMPTZ: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::UNKNOWN
}

/// The SQL to prepare for a command, with procedures as `CALL name($1, ...)`.
pub(crate) fn command_text(command: &Command) -> String {
    command.render(|n| format!("${n}"))
}

/// An `INTERVAL`, with its months, days and microseconds kept apart
/// the way the server stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Interval {
    months: i32,
    days: i32,
    micros: i64,
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 || n == -1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut parts = vec![];
        let years = i64::from(self.months / 12);
        let months = i64::from(self.months % 12);
        if years != 0 {
            parts.push(plural(years, "year"));
        }
        if months != 0 {
            parts.push(plural(months, "mon"));
        }
        if self.days != 0 {
            parts.push(plural(self.days.into(), "day"));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let micros = self.micros.unsigned_abs();
            let seconds = micros / MICROS_PER_SECOND as u64;
            let mut time = format!(
                "{sign}{:02}:{:02}:{:02}",
                seconds / 3600,
                seconds / 60 % 60,
                seconds % 60
            );
            let fraction = micros % MICROS_PER_SECOND as u64;
            if fraction != 0 {
                let digits = format!("{fraction:06}");
                time.push('.');
                time.push_str(digits.trim_end_matches('0'));
            }
            parts.push(time);
        }
        f.write_str(&parts.join(" "))
    }
}

/// `[-]HH:MM[:SS[.ffffff]]` as microseconds.
fn parse_clock(text: &str) -> Option<i64> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut fields = text.split(':');
    let hours: i64 = fields.next()?.parse().ok()?;
    let minutes: i64 = fields.next()?.parse().ok()?;
    let (seconds, fraction) = match fields.next() {
        None => (0, 0),
        Some(seconds) => {
            let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
            if fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let fraction = if fraction.is_empty() {
                0
            } else {
                format!("{fraction:0<6}").parse().ok()?
            };
            (whole.parse::<i64>().ok()?, fraction)
        }
    };
    if fields.next().is_some()
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }
    let micros = hours
        .checked_mul(MICROS_PER_HOUR)?
        .checked_add(minutes * MICROS_PER_MINUTE + seconds * MICROS_PER_SECOND + fraction)?;
    Some(if negative { -micros } else { micros })
}

impl FromStr for Interval {
    type Err = ColumnError;

    /// Reads the form `Display` writes: `<n> <unit>` pairs and an
    /// optional clock.
    fn from_str(text: &str) -> Result<Self, ColumnError> {
        let invalid = || ColumnError::new(format!("invalid interval {text:?}"));
        let mut months: i64 = 0;
        let mut days: i64 = 0;
        let mut micros: i64 = 0;

        let mut words = text.split_whitespace();
        while let Some(word) = words.next() {
            if word.contains(':') {
                micros = micros
                    .checked_add(parse_clock(word).ok_or_else(invalid)?)
                    .ok_or_else(invalid)?;
                continue;
            }
            let n: i64 = word.parse().map_err(|_| invalid())?;
            let unit = words.next().ok_or_else(invalid)?.to_ascii_lowercase();
            let (total, scale) = match unit.trim_end_matches('s') {
                "year" => (&mut months, 12),
                "mon" | "month" => (&mut months, 1),
                "week" => (&mut days, 7),
                "day" => (&mut days, 1),
                "hour" => (&mut micros, MICROS_PER_HOUR),
                "min" | "minute" => (&mut micros, MICROS_PER_MINUTE),
                "sec" | "second" => (&mut micros, MICROS_PER_SECOND),
                _ => return Err(invalid()),
            };
            let n = n.checked_mul(scale).ok_or_else(invalid)?;
            *total = total.checked_add(n).ok_or_else(invalid)?;
        }

        Ok(Interval {
            months: months.try_into().map_err(|_| invalid())?,
            days: days.try_into().map_err(|_| invalid())?,
            micros,
        })
    }
}

impl<'a> FromSql<'a> for Interval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if raw.len() != 16 {
            return Err("invalid message length: interval".into());
        }
        Ok(Interval {
            micros: i64::from_be_bytes(raw[0..8].try_into()?),
            days: i32::from_be_bytes(raw[8..12].try_into()?),
            months: i32::from_be_bytes(raw[12..16].try_into()?),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

impl ToSql for Interval {
    fn to_sql(&self, _ty: &Type, buf: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
        buf.extend_from_slice(&self.micros.to_be_bytes());
        buf.extend_from_slice(&self.days.to_be_bytes());
        buf.extend_from_slice(&self.months.to_be_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }

    postgres_types::to_sql_checked!();
}

/// A column value before decoding, of whatever type.
struct Raw<'a>(Option<&'a [u8]>);

impl<'a> FromSql<'a> for Raw<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(Raw(Some(raw)))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Raw(None))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn bind<T>(value: &Value) -> Result<Param, ColumnError>
where
    T: FromValue + ToSql + Sync + Send + 'static,
{
    Ok(Box::new(value.get::<Option<T>>()?))
}

/// Bind through a conversion of our own, for types `FromValue` doesn't know.
fn bind_with<T, F>(value: &Value, convert: F) -> Result<Param, ColumnError>
where
    T: ToSql + Sync + Send + 'static,
    F: FnOnce(&Value) -> Result<T, ColumnError>,
{
    if value.is_null() {
        return Ok(Box::new(None::<T>));
    }
    Ok(Box::new(Some(convert(value)?)))
}

fn text<'v>(value: &'v Value, what: &str) -> Result<&'v str, ColumnError> {
    match value {
        Value::Text(text) => Ok(text.trim()),
        other => Err(ColumnError::new(format!("expected {what} as text, found {other:?}"))),
    }
}

fn parsed<T, E: std::fmt::Display>(result: Result<T, E>, what: &str, text: &str) -> Result<T, ColumnError> {
    result.map_err(|e| ColumnError::new(format!("invalid {what} {text:?}: {e}")))
}

fn to_decimal(value: &Value) -> Result<Decimal, ColumnError> {
    match value {
        Value::Integer(i) => Ok(Decimal::from(*i)),
        Value::Real(r) => parsed(Decimal::try_from(*r), "numeric", &r.to_string()),
        value => {
            let text = text(value, "numeric")?;
            parsed(
                Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)),
                "numeric",
                text,
            )
        }
    }
}

fn to_date(value: &Value) -> Result<NaiveDate, ColumnError> {
    let text = text(value, "date")?;
    parsed(NaiveDate::parse_from_str(text, DATE), "date", text)
}

fn to_time(value: &Value) -> Result<NaiveTime, ColumnError> {
    let text = text(value, "time")?;
    parsed(NaiveTime::parse_from_str(text, TIME), "time", text)
}

fn parse_timestamp(text: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|e| {
            NaiveDate::parse_from_str(text, DATE)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or(e)
        })
}

fn to_timestamp(value: &Value) -> Result<NaiveDateTime, ColumnError> {
    let text = text(value, "timestamp")?;
    parsed(parse_timestamp(text), "timestamp", text)
}

/// Timestamps with an offset are moved to UTC; those without are taken
/// to be in UTC already.
fn to_timestamptz(value: &Value) -> Result<DateTime<Utc>, ColumnError> {
    let text = text(value, "timestamptz")?;
    let result = DateTime::parse_from_str(text, TIMESTAMPTZ)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .map(|time| time.with_timezone(&Utc))
        .or_else(|e| {
            parse_timestamp(text)
                .map(|naive| Utc.from_utc_datetime(&naive))
                .map_err(|_| e)
        });
    parsed(result, "timestamptz", text)
}

fn to_interval(value: &Value) -> Result<Interval, ColumnError> {
    text(value, "interval")?.parse()
}

fn to_uuid(value: &Value) -> Result<uuid::Uuid, ColumnError> {
    match value {
        Value::Blob(bytes) => parsed(uuid::Uuid::from_slice(bytes), "uuid", &format!("{bytes:?}")),
        value => {
            let text = text(value, "uuid")?;
            parsed(uuid::Uuid::parse_str(text), "uuid", text)
        }
    }
}

/// Text is taken to be a serialized document; other values become the
/// matching JSON scalar.
fn to_json(value: &Value) -> Result<serde_json::Value, ColumnError> {
    match value {
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Integer(i) => Ok(serde_json::Value::from(*i)),
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ColumnError::new(format!("{r} is not a JSON number"))),
        Value::Blob(bytes) => parsed(serde_json::from_slice(bytes), "json", "<blob>"),
        value => {
            let text = text(value, "json")?;
            parsed(serde_json::from_str(text), "json", text)
        }
    }
}

fn to_param(ty: &Type, value: &Value) -> Result<Param, ColumnError> {
    if *ty == Type::BOOL {
        bind::<bool>(value)
    } else if *ty == Type::INT2 {
        bind::<i16>(value)
    } else if *ty == Type::INT4 {
        bind::<i32>(value)
    } else if *ty == Type::INT8 {
        bind::<i64>(value)
    } else if *ty == Type::OID {
        bind::<u32>(value)
    } else if *ty == Type::FLOAT4 {
        bind::<f32>(value)
    } else if *ty == Type::FLOAT8 {
        bind::<f64>(value)
    } else if *ty == Type::BYTEA {
        bind::<Vec<u8>>(value)
    } else if *ty == Type::CHAR {
        bind::<i8>(value)
    } else if is_text(ty) {
        bind::<String>(value)
    } else if *ty == Type::NUMERIC {
        bind_with(value, to_decimal)
    } else if *ty == Type::DATE {
        bind_with(value, to_date)
    } else if *ty == Type::TIME {
        bind_with(value, to_time)
    } else if *ty == Type::TIMESTAMP {
        bind_with(value, to_timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        bind_with(value, to_timestamptz)
    } else if *ty == Type::INTERVAL {
        bind_with(value, to_interval)
    } else if *ty == Type::UUID {
        bind_with(value, to_uuid)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        bind_with(value, to_json)
    } else {
        Err(ColumnError::new(format!("unsupported parameter type {ty}")))
    }
}

/// Convert a command's parameters for a prepared statement.
pub(crate) fn to_params(
    statement: &tokio_postgres::Statement,
    values: &[Value],
) -> Result<Vec<Param>, Error> {
    let types = statement.params();
    if types.len() != values.len() {
        return Err(Error::query_str(
            format!(
                "statement has {} parameters but {} were given",
                types.len(),
                values.len()
            ),
            None,
        ));
    }
    types
        .iter()
        .zip(values)
        .enumerate()
        .map(|(index, (ty, value))| {
            to_param(ty, value).map_err(|e| {
                Error::query_str(format!("parameter ${}: {e}", index + 1), None)
            })
        })
        .collect()
}

/// Borrow converted parameters the way the driver wants them.
pub(crate) fn borrow(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| param.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

fn decode<'a, T: FromSql<'a>>(ty: &Type, raw: Option<&'a [u8]>) -> Result<Option<T>, ColumnError> {
    Option::<T>::from_sql_nullable(ty, raw).map_err(|e| ColumnError::new(e.to_string()))
}

fn text_of<'a, T, F>(ty: &Type, raw: Option<&'a [u8]>, format: F) -> Result<Option<Value>, ColumnError>
where
    T: FromSql<'a>,
    F: FnOnce(T) -> String,
{
    Ok(decode::<T>(ty, raw)?.map(|value| Value::Text(format(value))))
}

/// Decode one column value of the given type.
fn to_value(ty: &Type, raw: Option<&[u8]>) -> Result<Value, ColumnError> {
    let value = if *ty == Type::BOOL {
        decode::<bool>(ty, raw)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        decode::<i16>(ty, raw)?.map(|i| Value::Integer(i.into()))
    } else if *ty == Type::INT4 {
        decode::<i32>(ty, raw)?.map(|i| Value::Integer(i.into()))
    } else if *ty == Type::INT8 {
        decode::<i64>(ty, raw)?.map(Value::Integer)
    } else if *ty == Type::OID {
        decode::<u32>(ty, raw)?.map(|i| Value::Integer(i.into()))
    } else if *ty == Type::CHAR {
        decode::<i8>(ty, raw)?.map(|i| Value::Integer(i.into()))
    } else if *ty == Type::FLOAT4 {
        decode::<f32>(ty, raw)?.map(|r| Value::Real(r.into()))
    } else if *ty == Type::FLOAT8 {
        decode::<f64>(ty, raw)?.map(Value::Real)
    } else if *ty == Type::BYTEA {
        decode::<Vec<u8>>(ty, raw)?.map(Value::Blob)
    } else if is_text(ty) {
        decode::<String>(ty, raw)?.map(Value::Text)
    } else if *ty == Type::NUMERIC {
        text_of(ty, raw, |d: Decimal| d.to_string())?
    } else if *ty == Type::DATE {
        text_of(ty, raw, |d: NaiveDate| d.format(DATE).to_string())?
    } else if *ty == Type::TIME {
        text_of(ty, raw, |t: NaiveTime| t.format(TIME).to_string())?
    } else if *ty == Type::TIMESTAMP {
        text_of(ty, raw, |t: NaiveDateTime| t.format(TIMESTAMP).to_string())?
    } else if *ty == Type::TIMESTAMPTZ {
        text_of(ty, raw, |t: DateTime<Utc>| t.format(TIMESTAMPTZ).to_string())?
    } else if *ty == Type::INTERVAL {
        text_of(ty, raw, |i: Interval| i.to_string())?
    } else if *ty == Type::UUID {
        text_of(ty, raw, |u: uuid::Uuid| u.to_string())?
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        text_of(ty, raw, |j: serde_json::Value| j.to_string())?
    } else {
        return Err(ColumnError::new(format!("unsupported column type {ty}")));
    };
    Ok(value.unwrap_or(Value::Null))
}

fn from_column(row: &tokio_postgres::Row, index: usize, ty: &Type) -> Result<Value, Error> {
    let name = row.columns()[index].name();
    let raw: Raw = row.try_get(index).map_err(Error::from_column)?;
    to_value(ty, raw.0).map_err(|e| Error::from(e.at(name)))
}

/// Collect the rows of one statement into a result set.
pub(crate) fn to_result_set(
    statement: &tokio_postgres::Statement,
    rows: Vec<tokio_postgres::Row>,
) -> Result<ResultSet, Error> {
    let columns = statement.columns();
    let mut set = ResultSet::new(Columns::new(columns.iter().map(|c| c.name())));
    for row in &rows {
        let values = columns
            .iter()
            .enumerate()
            .map(|(index, column)| from_column(row, index, column.type_()))
            .collect::<Result<Vec<_>, _>>()?;
        set.push(values);
    }
    tracing::trace!(rows = set.len(), "read result set");
    Ok(set)
}

#[cfg(test)]
mod test {
    use super::*;

    /// What the driver would send for `value` as a `ty` parameter.
    fn wire(ty: &Type, value: Value) -> Option<Vec<u8>> {
        let param = to_param(ty, &value).unwrap();
        let mut buf = bytes::BytesMut::new();
        match param.to_sql_checked(ty, &mut buf).unwrap() {
            IsNull::Yes => None,
            IsNull::No => Some(buf.to_vec()),
        }
    }

    fn text(value: &str) -> Value {
        Value::Text(value.into())
    }

    #[test]
    fn procedures_use_numbered_placeholders() {
        let command = Command::procedure("adopt", (1, "Dan"));
        assert_eq!("CALL adopt($1, $2)", command_text(&command));
    }

    #[test]
    fn params_follow_the_declared_type() {
        assert!(to_param(&Type::INT4, &Value::Integer(7)).is_ok());
        assert!(to_param(&Type::INT4, &text("7")).is_ok());
        assert!(to_param(&Type::INT2, &Value::Integer(70_000)).is_err());
        assert!(to_param(&Type::TEXT, &Value::Null).is_ok());
        assert!(to_param(&Type::BOOL, &text("yes")).is_ok());
        assert!(to_param(&Type::JSON, &text("{}")).is_ok());
        assert!(to_param(&Type::POINT, &text("(1,2)")).is_err());
    }

    #[test]
    fn bad_text_for_typed_params() {
        assert!(to_param(&Type::DATE, &text("31/01/2024")).is_err());
        assert!(to_param(&Type::DATE, &Value::Integer(20240131)).is_err());
        assert!(to_param(&Type::UUID, &text("not-a-uuid")).is_err());
        assert!(to_param(&Type::NUMERIC, &text("twelve")).is_err());
        assert!(to_param(&Type::JSONB, &text("{oops")).is_err());
        assert!(to_param(&Type::INTERVAL, &text("3 fortnights")).is_err());
    }

    #[test]
    fn null_params_of_any_type() {
        for ty in [Type::NUMERIC, Type::TIMESTAMPTZ, Type::UUID, Type::JSONB, Type::INTERVAL] {
            assert_eq!(None, wire(&ty, Value::Null));
        }
    }

    #[test]
    fn unsupported_columns_name_the_type() {
        let error = to_value(&Type::POINT, Some(&[0; 16])).unwrap_err();
        assert_eq!("unsupported column type point", error.message());
    }

    #[test]
    fn simple_columns() {
        assert_eq!(Value::Integer(7), to_value(&Type::INT4, Some(&7i32.to_be_bytes())).unwrap());
        assert_eq!(Value::Null, to_value(&Type::INT4, None).unwrap());
        assert_eq!(text("Dan"), to_value(&Type::VARCHAR, Some(b"Dan")).unwrap());
    }

    #[test]
    fn numeric_stays_exact() {
        let raw = wire(&Type::NUMERIC, text("12.50")).unwrap();
        assert_eq!(text("12.50"), to_value(&Type::NUMERIC, Some(&raw)).unwrap());

        let raw = wire(&Type::NUMERIC, Value::Integer(-3)).unwrap();
        assert_eq!(text("-3"), to_value(&Type::NUMERIC, Some(&raw)).unwrap());
    }

    #[test]
    fn dates_and_times_as_text() {
        // Days and microseconds since 2000-01-01.
        let raw = 31i32.to_be_bytes();
        assert_eq!(text("2000-02-01"), to_value(&Type::DATE, Some(&raw)).unwrap());

        let raw = (49_500_250_000i64).to_be_bytes();
        assert_eq!(text("13:45:00.250"), to_value(&Type::TIME, Some(&raw)).unwrap());

        let raw = (86_400_000_000i64 + 3_600_000_000).to_be_bytes();
        assert_eq!(
            text("2000-01-02 01:00:00"),
            to_value(&Type::TIMESTAMP, Some(&raw)).unwrap()
        );
        assert_eq!(
            text("2000-01-02 01:00:00+00:00"),
            to_value(&Type::TIMESTAMPTZ, Some(&raw)).unwrap()
        );
    }

    #[test]
    fn timestamps_with_an_offset_move_to_utc() {
        let raw = wire(&Type::TIMESTAMPTZ, text("2024-01-31 15:45:00+02:00")).unwrap();
        assert_eq!(
            text("2024-01-31 13:45:00+00:00"),
            to_value(&Type::TIMESTAMPTZ, Some(&raw)).unwrap()
        );

        let raw = wire(&Type::TIMESTAMPTZ, text("2024-01-31T13:45:00Z")).unwrap();
        assert_eq!(
            text("2024-01-31 13:45:00+00:00"),
            to_value(&Type::TIMESTAMPTZ, Some(&raw)).unwrap()
        );

        let raw = wire(&Type::TIMESTAMP, text("2024-01-31")).unwrap();
        assert_eq!(
            text("2024-01-31 00:00:00"),
            to_value(&Type::TIMESTAMP, Some(&raw)).unwrap()
        );
    }

    #[test]
    fn uuid_and_json_as_text() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let raw = wire(&Type::UUID, text(&id.to_uppercase())).unwrap();
        assert_eq!(16, raw.len());
        assert_eq!(text(id), to_value(&Type::UUID, Some(&raw)).unwrap());

        let raw = wire(&Type::JSONB, text(r#" {"a": [1, true]} "#)).unwrap();
        assert_eq!(text(r#"{"a":[1,true]}"#), to_value(&Type::JSONB, Some(&raw)).unwrap());

        let raw = wire(&Type::JSON, Value::Integer(5)).unwrap();
        assert_eq!(text("5"), to_value(&Type::JSON, Some(&raw)).unwrap());
    }

    #[test]
    fn intervals() {
        let interval = Interval {
            months: 14,
            days: 3,
            micros: 4 * MICROS_PER_HOUR + 5 * MICROS_PER_MINUTE + 6 * MICROS_PER_SECOND + 500_000,
        };
        assert_eq!("1 year 2 mons 3 days 04:05:06.5", interval.to_string());
        assert_eq!(Ok(interval), "1 year 2 mons 3 days 04:05:06.5".parse());

        assert_eq!("00:00:00", Interval::default().to_string());
        assert_eq!("-1 day -00:30:00", Interval { months: 0, days: -1, micros: -30 * MICROS_PER_MINUTE }.to_string());
        assert_eq!(
            Ok(Interval { months: 0, days: 14, micros: 90 * MICROS_PER_MINUTE }),
            "2 weeks 1 hour 30 mins".parse()
        );
        assert!("1 year 2".parse::<Interval>().is_err());
        assert!("12:75".parse::<Interval>().is_err());

        let raw = wire(&Type::INTERVAL, text("1 mon -02:00:00")).unwrap();
        assert_eq!(16, raw.len());
        assert_eq!(text("1 mon -02:00:00"), to_value(&Type::INTERVAL, Some(&raw)).unwrap());
    }
}
