//! Error types for Ion binary encoding and decoding.
//!
//! Every failure is reported to the immediate caller of the operation that detected it.
//! Running out of input is *not* an error: the cursor reports
//! [`Event::NeedsData`](crate::Event::NeedsData) instead and the caller retries after
//! supplying more bytes.
//!
//! ## Error Categories
//!
//! - **Decode errors**: malformed type descriptors, lengths, or UTF-8, with the absolute stream
//!   position at which they were detected
//! - **Overflow errors**: a variable-length integer larger than the supported range
//! - **Symbol table errors**: interning into a read-only table, missing symbol text, unknown SIDs
//! - **Oversized values**: a value larger than the configured maximum that the handler chose to abort
//! - **Illegal state**: a writer or cursor operation invoked where it is not allowed
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::{BinaryCursor, Error};
//!
//! // A struct whose declared length runs past the end of a complete input.
//! let mut cursor = BinaryCursor::from_slice(&[0xE0, 0x01, 0x00, 0xEA, 0xD5, 0x84]);
//! cursor.next_value().unwrap();
//! let err = cursor.fill_value().unwrap_err();
//! assert!(matches!(err, Error::UnexpectedEof { .. }));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while reading or writing Ion binary data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error while writing to the underlying sink
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed binary data
    #[error("Decode error at byte {position}: {msg}")]
    Decode { position: u64, msg: String },

    /// The input ended inside a value and no further bytes can arrive
    #[error("Unexpected end of input at byte {position} while reading {context}")]
    UnexpectedEof { position: u64, context: String },

    /// A variable-length integer exceeded the supported magnitude
    #[error("Overflow: {what} exceeds the supported range")]
    Overflow { what: String },

    /// Symbol table misuse or unresolvable symbol
    #[error("Symbol table error: {0}")]
    SymbolTable(#[from] SymbolTableError),

    /// A value exceeded the configured maximum size and the handler aborted
    #[error("Value of {length} bytes at byte {position} exceeds the maximum of {limit} bytes")]
    OversizedValue { position: u64, length: u64, limit: u64 },

    /// A writer operation that is not legal in the writer's current state
    #[error("Illegal writer state: {0}")]
    IllegalWriterState(String),

    /// A cursor operation that is not legal after the last event
    #[error("Illegal cursor state: {0}")]
    IllegalCursorState(String),

    /// An accessor or serde target did not match the current value's type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A scalar constructed with out-of-range components
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Custom error (raised through serde)
    #[error("Error: {0}")]
    Custom(String),
}

/// Failures raised by symbol table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolTableError {
    /// New text cannot be added to a frozen table
    #[error("cannot intern '{text}' into a read-only symbol table")]
    ReadOnly { text: String },

    /// Interning and lookup require symbol text
    #[error("symbol text is required")]
    MissingText,

    /// A SID outside the range defined by the active table
    #[error("symbol ID {sid} is beyond the table's max id {max_id}")]
    UnknownSid { sid: u64, max_id: u64 },

    /// A local symbol table definition that does not follow the format
    #[error("malformed symbol table: {0}")]
    Malformed(String),
}

impl Error {
    /// Creates a decode error at an absolute stream position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::Error;
    ///
    /// let err = Error::decode(12, "invalid type descriptor 0xF0");
    /// assert!(err.to_string().contains("byte 12"));
    /// ```
    pub fn decode<T: fmt::Display>(position: u64, msg: T) -> Self {
        Error::Decode {
            position,
            msg: msg.to_string(),
        }
    }

    /// Creates an end-of-input error for a value that cannot be completed.
    pub fn unexpected_eof(position: u64, context: &str) -> Self {
        Error::UnexpectedEof {
            position,
            context: context.to_string(),
        }
    }

    /// Creates an overflow error naming the quantity that overflowed.
    pub fn overflow(what: &str) -> Self {
        Error::Overflow {
            what: what.to_string(),
        }
    }

    /// Creates an illegal writer state error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::Error;
    ///
    /// let err = Error::illegal_writer_state("field name set outside of a struct");
    /// assert!(err.to_string().contains("outside of a struct"));
    /// ```
    pub fn illegal_writer_state<T: fmt::Display>(msg: T) -> Self {
        Error::IllegalWriterState(msg.to_string())
    }

    /// Creates an illegal cursor state error.
    pub fn illegal_cursor_state<T: fmt::Display>(msg: T) -> Self {
        Error::IllegalCursorState(msg.to_string())
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch<E: fmt::Display, F: fmt::Display>(expected: E, found: F) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidValue(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Rebases a position relative to a value body onto the absolute stream position.
    pub(crate) fn at(self, base: u64) -> Self {
        match self {
            Error::Decode { position, msg } => Error::Decode {
                position: base + position,
                msg,
            },
            Error::UnexpectedEof { position, context } => Error::UnexpectedEof {
                position: base + position,
                context,
            },
            other => other,
        }
    }

    /// Creates an I/O error for sink failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns `true` for failures caused by malformed input data.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::UnexpectedEof { .. } | Error::Overflow { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
