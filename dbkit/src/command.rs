//! Commands: text or procedure calls with their parameters.
//!
//! A [`Command`] is what every client method runs.  Anything that is
//! `Into<Command>` works, so plain `&str` SQL is accepted wherever a
//! command is expected, and parameters are attached with a [`Params`]
//! tuple:
//!
//! ```
//! use dbkit::command::Command;
//!
//! let command = Command::with_params(
//!     "INSERT INTO pets (name, species) VALUES (?, ?)",
//!     ("Dan", "Felis catus"),
//! );
//! assert_eq!(2, command.params().len());
//! ```

use crate::value::{ToValue, Value};

/// What the text of a [`Command`] means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandKind {
    /// The text is one or more SQL statements.
    #[default]
    Text,

    /// The text is the name of a stored procedure, called with
    /// the command's parameters.
    Procedure,
}

/// A parameterized unit of SQL, ready to run on a client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    text: String,
    params: Vec<Value>,
    kind: CommandKind,
}

impl Command {
    /// A text command with no parameters.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Command {
            text: text.into(),
            params: vec![],
            kind: CommandKind::Text,
        }
    }

    /// A text command with positional parameters.
    pub fn with_params<S: Into<String>, P: Params>(text: S, params: P) -> Self {
        Command {
            text: text.into(),
            params: params.into_values(),
            kind: CommandKind::Text,
        }
    }

    /// A stored procedure call.
    ///
    /// Each backend renders the call in its own dialect.
    pub fn procedure<S: Into<String>, P: Params>(name: S, params: P) -> Self {
        Command {
            text: name.into(),
            params: params.into_values(),
            kind: CommandKind::Procedure,
        }
    }

    /// Append one more positional parameter.
    pub fn bind<T: ToValue>(mut self, value: T) -> Self {
        self.params.push(value.to_value());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Render the command as SQL, turning a procedure call into a
    /// `CALL` statement with one placeholder per parameter.
    ///
    /// `placeholder` gets the one-based parameter number.
    pub fn render<F>(&self, placeholder: F) -> String
    where
        F: Fn(usize) -> String,
    {
        match self.kind {
            CommandKind::Text => self.text.clone(),
            CommandKind::Procedure => {
                let args: Vec<_> = (1..=self.params.len()).map(placeholder).collect();
                format!("CALL {}({})", self.text, args.join(", "))
            }
        }
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Command::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Command::new(text)
    }
}

impl From<&Command> for Command {
    fn from(command: &Command) -> Self {
        command.clone()
    }
}

impl<S: Into<String>, P: Params> From<(S, P)> for Command {
    fn from((text, params): (S, P)) -> Self {
        Command::with_params(text, params)
    }
}

/// A list of positional parameters.
pub trait Params {
    fn into_values(self) -> Vec<Value>;
}

impl<T: ToValue> Params for Vec<T> {
    fn into_values(self) -> Vec<Value> {
        self.iter().map(ToValue::to_value).collect()
    }
}

impl<T: ToValue> Params for &[T] {
    fn into_values(self) -> Vec<Value> {
        self.iter().map(ToValue::to_value).collect()
    }
}

impl<T: ToValue, const N: usize> Params for [T; N] {
    fn into_values(self) -> Vec<Value> {
        self.iter().map(ToValue::to_value).collect()
    }
}

macro_rules! impl_tuple_params {
    (
        $(
            $name:ident
        ),*
        $(,)?
    ) => {
        impl<
            $(
                $name,
            )*
        > Params for ($($name,)*)
        where
            $(
                $name: ToValue,
            )*
        {
            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)*) = self;
                vec![$($name.to_value(),)*]
            }
        }
    };
}

impl_tuple_params!();
impl_tuple_params!(T0);
impl_tuple_params!(T0, T1);
impl_tuple_params!(T0, T1, T2);
impl_tuple_params!(T0, T1, T2, T3);
impl_tuple_params!(T0, T1, T2, T3, T4);
impl_tuple_params!(T0, T1, T2, T3, T4, T5);
impl_tuple_params!(T0, T1, T2, T3, T4, T5, T6);
impl_tuple_params!(T0, T1, T2, T3, T4, T5, T6, T7);
