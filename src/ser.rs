//! Serde serialization into Ion binary.
//!
//! This module provides the [`Serializer`] implementation that drives a
//! [`BinaryWriter`] from any `Serialize` value.
//!
//! ## Mapping
//!
//! | Rust | Ion |
//! |------|-----|
//! | `bool` | bool |
//! | integers | int (arbitrary size when past `i64`) |
//! | `f32`, `f64` | float |
//! | `char`, `&str`, `String` | string |
//! | byte buffers (`serialize_bytes`) | blob |
//! | `None`, `()`, unit structs | null |
//! | sequences, tuples | list |
//! | structs, maps | struct |
//! | unit variants | symbol |
//! | other variants | struct with a single field named after the variant |
//!
//! Map keys must serialize as strings, chars or integers; they become field names.
//!
//! ```rust
//! use ion_binary::{Serializer, BinaryReader, Event};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let mut serializer = Serializer::new(Vec::new());
//! Point { x: 1, y: 2 }.serialize(&mut serializer).unwrap();
//! let bytes = serializer.into_inner().unwrap();
//!
//! let mut reader = BinaryReader::from_slice(&bytes);
//! assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
//! ```

use std::io::Write;

use num_bigint::BigInt;
use serde::{ser, Serialize};

use crate::options::WriterOptions;
use crate::writer::BinaryWriter;
use crate::{Error, IonType, Result};

/// The Ion binary serializer.
pub struct Serializer<W: Write> {
    writer: BinaryWriter<W>,
}

impl<W: Write> Serializer<W> {
    pub fn new(sink: W) -> Self {
        Serializer {
            writer: BinaryWriter::new(sink),
        }
    }

    pub fn with_options(sink: W, options: WriterOptions) -> Self {
        Serializer {
            writer: BinaryWriter::with_options(sink, options),
        }
    }

    /// The underlying writer, for interleaving hand-written values.
    pub fn writer_mut(&mut self) -> &mut BinaryWriter<W> {
        &mut self.writer
    }

    /// Finishes the stream and returns the sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner()
    }

    fn write_u128(&mut self, v: u128) -> Result<()> {
        match i64::try_from(v) {
            Ok(small) => self.writer.write_i64(small),
            Err(_) => self.writer.write_big_int(&BigInt::from(v)),
        }
    }

    fn write_i128(&mut self, v: i128) -> Result<()> {
        match i64::try_from(v) {
            Ok(small) => self.writer.write_i64(small),
            Err(_) => self.writer.write_big_int(&BigInt::from(v)),
        }
    }

    fn begin_variant(&mut self, variant: &str) -> Result<()> {
        self.writer.step_in(IonType::Struct)?;
        self.writer.set_field_name(variant)
    }
}

impl<'a, W: Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Compound<'a, W>;
    type SerializeTuple = Compound<'a, W>;
    type SerializeTupleStruct = Compound<'a, W>;
    type SerializeTupleVariant = Compound<'a, W>;
    type SerializeMap = Compound<'a, W>;
    type SerializeStruct = Compound<'a, W>;
    type SerializeStructVariant = Compound<'a, W>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.writer.write_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.writer.write_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.write_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.writer.write_i64(i64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_u128(u128::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        self.write_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.writer.write_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.writer.write_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.writer.write_string(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.writer.write_string(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.writer.write_blob(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.writer.write_null(IonType::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.writer.write_null(IonType::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.writer.write_symbol(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.begin_variant(variant)?;
        value.serialize(&mut *self)?;
        self.writer.step_out()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.writer.step_in(IonType::List)?;
        Ok(Compound { ser: self, closes: 1 })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.begin_variant(variant)?;
        self.writer.step_in(IonType::List)?;
        Ok(Compound { ser: self, closes: 2 })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.writer.step_in(IonType::Struct)?;
        Ok(Compound { ser: self, closes: 1 })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.begin_variant(variant)?;
        self.writer.step_in(IonType::Struct)?;
        Ok(Compound { ser: self, closes: 2 })
    }
}

/// Serializes the elements or fields of a container. `closes` is the number of containers
/// to leave when it ends: two for variants, which wrap the payload in a struct.
pub struct Compound<'a, W: Write> {
    ser: &'a mut Serializer<W>,
    closes: usize,
}

impl<W: Write> Compound<'_, W> {
    fn end_all(self) -> Result<()> {
        for _ in 0..self.closes {
            self.ser.writer.step_out()?;
        }
        Ok(())
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.ser)
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.ser.writer.set_field_name(key)?;
        value.serialize(&mut *self.ser)
    }
}

impl<W: Write> ser::SerializeSeq for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeTuple for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeTupleStruct for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeTupleVariant for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeMap for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let name = key.serialize(MapKeySerializer)?;
        self.ser.writer.set_field_name(&name)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeStruct for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

impl<W: Write> ser::SerializeStructVariant for Compound<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.end_all()
    }
}

/// Turns a map key into field name text.
struct MapKeySerializer;

fn key_must_be_text() -> Error {
    Error::type_mismatch("string, char or integer map key", "another type")
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = ser::Impossible<String, Error>;
    type SerializeTuple = ser::Impossible<String, Error>;
    type SerializeTupleStruct = ser::Impossible<String, Error>;
    type SerializeTupleVariant = ser::Impossible<String, Error>;
    type SerializeMap = ser::Impossible<String, Error>;
    type SerializeStruct = ser::Impossible<String, Error>;
    type SerializeStructVariant = ser::Impossible<String, Error>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_some<T>(self, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(key_must_be_text())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_text())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_text())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_text())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_text())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_must_be_text())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_text())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_text())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_must_be_text())
    }
}
