//! Error type and Result alias used by the canonical encoder.

use core::fmt::Display;

use serde::ser;

/// Represents all possible errors that can happen while encoding.
///
/// The canonical encoding is deliberately small: everything that gets hashed
/// or signed in this crate is made of integers, booleans, byte strings,
/// sequences and field-less enums. Shapes outside that set have no canonical
/// form and are rejected instead of being given an ad-hoc one.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The value contains a type with no canonical encoding (floats, maps,
    /// options, data-carrying enum variants, ...).
    TypeNotCanonical(&'static str),
    /// A custom error raised through [serde::ser::Error].
    Custom(&'static str),
}

impl ser::Error for Error {
    fn custom<T>(_: T) -> Self
    where
        T: core::fmt::Display,
    {
        // We only ever serialize our own types, which never raise custom
        // errors. The message is dropped because it would force an allocation
        // into an otherwise allocation-free error type.
        Error::Custom("serialization error")
    }
}

impl ser::StdError for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TypeNotCanonical(type_name) => {
                f.write_str("type has no canonical encoding: ")?;
                f.write_str(type_name)
            }
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

/// Alias for `Result` using the [Error] returned by the encoder.
pub type Result<T> = core::result::Result<T, Error>;
