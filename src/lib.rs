//! # ion_binary
//!
//! Reading and writing the Amazon Ion 1.0 binary format.
//!
//! ## Layers
//!
//! - [`codec`]: primitive encodings (VarUInt, VarInt, UInt, Int, floats, decimals, timestamps)
//!   with exact length calculations
//! - [`symbol_table`]: shared, local and frozen symbol tables plus a catalog of shared tables
//! - [`BinaryCursor`]: an incremental cursor that accepts input in arbitrary chunks and
//!   reports an [`Event`] for every value header it parses
//! - [`BinaryReader`]: an application reader that consumes version markers and local symbol
//!   tables and decodes typed scalars
//! - [`BinaryWriter`]: a writer that plans container lengths bottom-up and declares the
//!   symbols it uses
//! - [`Serializer`] / [`Deserializer`]: Serde support on top of the writer and reader
//!
//! ## Quick Start
//!
//! ```rust
//! use ion_binary::{from_slice, to_vec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let user = User {
//!     id: 123,
//!     name: "Alice".to_string(),
//!     tags: vec!["admin".to_string()],
//! };
//!
//! let bytes = to_vec(&user).unwrap();
//! assert_eq!(&bytes[..4], &[0xE0, 0x01, 0x00, 0xEA]);
//!
//! let user_back: User = from_slice(&bytes).unwrap();
//! assert_eq!(user, user_back);
//! ```
//!
//! ## Streaming Input
//!
//! A streaming cursor never blocks: when the bytes it needs have not arrived it reports
//! [`Event::NeedsData`] and the same call can be retried after [`BinaryCursor::append`].
//!
//! ```rust
//! use ion_binary::{BinaryCursor, Event};
//!
//! let data = [0xE0, 0x01, 0x00, 0xEA, 0x83, b'a', b'b', b'c'];
//! let mut cursor = BinaryCursor::streaming();
//! cursor.append(&data[..6]).unwrap();
//! assert_eq!(cursor.next_value().unwrap(), Event::StartScalar);
//! assert_eq!(cursor.fill_value().unwrap(), Event::NeedsData);
//! cursor.append(&data[6..]).unwrap();
//! assert_eq!(cursor.fill_value().unwrap(), Event::ValueReady);
//! assert_eq!(cursor.value_bytes().unwrap(), b"abc");
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::io;

pub mod codec;
pub mod cursor;
pub mod de;
pub mod error;
pub mod format;
pub mod header;
pub mod options;
pub mod reader;
pub mod ser;
pub mod symbol_table;
pub mod value;
pub mod writer;

pub use cursor::{BinaryCursor, CursorStats, Event, ValueHeader};
pub use de::Deserializer;
pub use error::{Error, Result, SymbolTableError};
pub use options::{
    AbortOnOversized, BufferConfiguration, ContainerHooks, IvmConsumer, NoHooks, OversizedAction,
    OversizedValue, OversizedValueHandler, ReaderOptions, SkipOversized, WriterOptions,
};
pub use reader::BinaryReader;
pub use ser::Serializer;
pub use symbol_table::{
    system_symbol_table, Catalog, FrozenSymbolTable, Import, ImportDescriptor, LocalSymbolTable,
    SharedSymbolTable, SymbolTable, SymbolToken,
};
pub use value::{Decimal, IonType, Precision, Timestamp};
pub use writer::BinaryWriter;

/// Serialize any `T: Serialize` to a complete Ion binary stream.
///
/// # Examples
///
/// ```rust
/// use ion_binary::to_vec;
///
/// let bytes = to_vec(&vec![1, 2, 3]).unwrap();
/// assert_eq!(bytes, vec![0xE0, 0x01, 0x00, 0xEA, 0xB6, 0x21, 0x01, 0x21, 0x02, 0x21, 0x03]);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_vec_with_options(value, WriterOptions::default())
}

/// Serialize any `T: Serialize` with custom writer options, such as shared symbol table
/// imports.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized, for example when it needs a symbol a
/// read-only table does not define.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options<T>(value: &T, options: WriterOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut serializer = Serializer::with_options(Vec::new(), options);
    value.serialize(&mut serializer)?;
    serializer.into_inner()
}

/// Serialize any `T: Serialize` to a writer as a complete Ion binary stream.
///
/// # Examples
///
/// ```rust
/// use ion_binary::to_writer;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &Point { x: 1, y: 2 }).unwrap();
/// assert!(buffer.starts_with(&[0xE0, 0x01, 0x00, 0xEA]));
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut serializer = Serializer::new(writer);
    value.serialize(&mut serializer)?;
    serializer.into_inner().map(drop)
}

/// Deserialize the single top-level value of an Ion binary stream.
///
/// # Errors
///
/// Returns an error if the input is malformed, holds no value or more than one, or cannot
/// be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    de::from_slice(bytes)
}

/// Deserialize the single top-level value of an Ion binary stream, resolving shared symbol
/// table imports through the options' catalog.
///
/// # Errors
///
/// Returns an error if the input is malformed or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with_options<T>(bytes: &[u8], options: ReaderOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut deserializer = Deserializer::from_slice_with_options(bytes, options);
    let value = deserializer
        .deserialize_next()?
        .ok_or_else(|| Error::unexpected_eof(bytes.len() as u64, "a top-level value"))?;
    deserializer.end()?;
    Ok(value)
}

/// Deserialize an instance of type `T` from an I/O stream of Ion binary.
///
/// # Errors
///
/// Returns an error if reading fails or the data cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
        scores: BTreeMap<String, f64>,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect(u32, u32),
        Named { label: String },
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: -2 };
        let bytes = to_vec(&point).unwrap();
        let point_back: Point = from_slice(&bytes).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_user() {
        let mut scores = BTreeMap::new();
        scores.insert("math".to_string(), 91.5);
        let user = User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "user".to_string()],
            scores,
        };

        let bytes = to_vec(&user).unwrap();
        let user_back: User = from_slice(&bytes).unwrap();
        assert_eq!(user, user_back);
    }

    #[test]
    fn test_enums() {
        let shapes = vec![
            Shape::Empty,
            Shape::Circle(1.5),
            Shape::Rect(2, 3),
            Shape::Named {
                label: "x".to_string(),
            },
        ];
        let bytes = to_vec(&shapes).unwrap();
        let back: Vec<Shape> = from_slice(&bytes).unwrap();
        assert_eq!(back, shapes);
    }

    #[test]
    fn test_arrays() {
        let numbers = vec![1, 2, 3, 4, 5];
        let bytes = to_vec(&numbers).unwrap();
        let numbers_back: Vec<i32> = from_slice(&bytes).unwrap();
        assert_eq!(numbers, numbers_back);
    }

    #[test]
    fn test_to_writer_and_from_reader() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &Point { x: 5, y: 6 }).unwrap();
        let point: Point = from_reader(io::Cursor::new(buffer)).unwrap();
        assert_eq!(point, Point { x: 5, y: 6 });
    }

    #[test]
    fn test_shared_table_options() {
        let shared = Arc::new(SharedSymbolTable::new("geo", 1, ["x", "y"]));
        let options = WriterOptions::new().with_imports(vec![Import::new(Arc::clone(&shared))]);
        let bytes = to_vec_with_options(&Point { x: 1, y: 2 }, options).unwrap();

        let mut catalog = Catalog::new();
        catalog.register(shared);
        let options = ReaderOptions::new().with_catalog(catalog);
        let point: Point = from_slice_with_options(&bytes, options).unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });
    }

    #[test]
    fn test_missing_catalog_entry_keeps_sids() {
        let shared = Arc::new(SharedSymbolTable::new("geo", 1, ["x", "y"]));
        let options = WriterOptions::new().with_imports(vec![Import::new(shared)]);
        let bytes = to_vec_with_options(&Point { x: 1, y: 2 }, options).unwrap();

        // Without the shared table the field names have no text.
        let err = from_slice::<Point>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::SymbolTable(SymbolTableError::MissingText)
        ));
    }
}
