//! Dynamically-typed database values.
//!
//! Every backend converts the cells it reads into a [`Value`], so the
//! rest of the crate (rows, readers, tables) never needs to know which
//! driver produced them.  Typed access goes through [`FromValue`],
//! which is deliberately forgiving: text parses into numbers, integers
//! turn into booleans, and so on, the way loosely-typed drivers hand
//! values back.

use crate::error::ColumnError;

/// A single database cell or parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Convert into some typed value.
    pub fn get<T: FromValue>(&self) -> Result<T, ColumnError> {
        T::from_value(self)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => b.fmt(f),
            Value::Integer(i) => i.fmt(f),
            Value::Real(r) => r.fmt(f),
            Value::Text(s) => s.fmt(f),
            Value::Blob(bytes) => {
                f.write_str("X'")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                f.write_str("'")
            }
        }
    }
}

/// A type that can be taken out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ColumnError>;
}

/// A type that can be bound as a command parameter.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn unexpected(value: &Value, target: &str) -> ColumnError {
    match value {
        Value::Null => ColumnError::new(format!("unexpected null for {target}")),
        other => ColumnError::new(format!("cannot convert {} to {target}", other.type_name())),
    }
}

fn integer_of(value: &Value, target: &str) -> Result<i64, ColumnError> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Real(r) if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r < i64::MAX as f64 => {
            Ok(*r as i64)
        }
        Value::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| ColumnError::new(format!("cannot parse {s:?} as {target}: {e}"))),
        other => Err(unexpected(other, target)),
    }
}

macro_rules! impl_integer {
    (
        $(
            $ty:ty
        ),*
        $(,)?
    ) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ColumnError> {
                    let target = stringify!($ty);
                    let i = integer_of(value, target)?;
                    <$ty>::try_from(i)
                        .map_err(|_| ColumnError::new(format!("{i} is out of range for {target}")))
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32);

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| ColumnError::new(format!("cannot parse {s:?} as u64: {e}"))),
            other => {
                let i = integer_of(other, "u64")?;
                u64::try_from(i).map_err(|_| ColumnError::new(format!("{i} is out of range for u64")))
            }
        }
    }
}

impl ToValue for u64 {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Real(*self as f64),
        }
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        let wide = u64::from_value(value)?;
        usize::try_from(wide).map_err(|_| ColumnError::new(format!("{wide} is out of range for usize")))
    }
}

impl ToValue for usize {
    fn to_value(&self) -> Value {
        (*self as u64).to_value()
    }
}

impl FromValue for isize {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        let i = integer_of(value, "isize")?;
        isize::try_from(i).map_err(|_| ColumnError::new(format!("{i} is out of range for isize")))
    }
}

impl ToValue for isize {
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| ColumnError::new(format!("cannot parse {s:?} as f64: {e}"))),
            other => Err(unexpected(other, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        f64::from_value(value).map(|r| r as f32)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "y" | "yes" | "on" => Ok(true),
                "f" | "false" | "0" | "n" | "no" | "off" => Ok(false),
                _ => Err(ColumnError::new(format!("cannot parse {s:?} as bool"))),
            },
            other => Err(unexpected(other, "bool")),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Real(r) => Ok(r.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Blob(bytes) => String::from_utf8(bytes.clone())
                .map_err(|_| ColumnError::new("blob is not valid UTF-8")),
            Value::Null => Err(unexpected(value, "String")),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Blob(bytes) => Ok(bytes.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(unexpected(other, "Vec<u8>")),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ColumnError> {
        Ok(value.clone())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! impl_from {
    (
        $(
            $ty:ty
        ),*
        $(,)?
    ) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.to_value()
                }
            }
        )*
    };
}

impl_from!(i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, String, Vec<u8>, &str);
