//! Serde deserialization from Ion binary.
//!
//! This module provides the [`Deserializer`] implementation that reads Rust data structures
//! from a [`BinaryReader`]. Types follow the mapping used by the serializer; in addition
//! decimals and timestamps deserialize as their Ion text form, symbols as their text, and
//! clobs as bytes.
//!
//! ```rust
//! use ion_binary::{from_slice, to_vec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! enum Status { Active, Suspended { days: u32 } }
//!
//! let values = vec![Status::Active, Status::Suspended { days: 3 }];
//! let bytes = to_vec(&values).unwrap();
//! let back: Vec<Status> = from_slice(&bytes).unwrap();
//! assert_eq!(back, values);
//! ```

use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use crate::cursor::Event;
use crate::error::SymbolTableError;
use crate::options::ReaderOptions;
use crate::reader::BinaryReader;
use crate::{Error, IonType, Result};

/// A deserializer over complete Ion binary input.
pub struct Deserializer {
    reader: BinaryReader,
}

impl Deserializer {
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_reader(BinaryReader::from_slice(bytes))
    }

    pub fn from_slice_with_options(bytes: &[u8], options: ReaderOptions) -> Self {
        Self::from_reader(BinaryReader::from_slice_with_options(bytes, options))
    }

    /// Deserializes values from a reader positioned before its next top-level value.
    pub fn from_reader(reader: BinaryReader) -> Self {
        Deserializer { reader }
    }

    pub fn into_reader(self) -> BinaryReader {
        self.reader
    }

    /// Deserializes the next top-level value, or returns `None` at the end of the input.
    pub fn deserialize_next<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.reader.next_value()? {
            Event::StartScalar | Event::StartContainer => T::deserialize(&mut *self).map(Some),
            Event::NeedsData => Ok(None),
            event => Err(Error::illegal_cursor_state(format!(
                "unexpected {event:?} at the top level"
            ))),
        }
    }

    /// Checks that no top-level values remain.
    pub fn end(&mut self) -> Result<()> {
        match self.reader.next_value()? {
            Event::NeedsData => Ok(()),
            _ => Err(Error::custom(format!(
                "trailing value at byte {}",
                self.position()
            ))),
        }
    }

    fn position(&self) -> u64 {
        self.reader.cursor().position()
    }

    fn current_type(&self) -> Result<IonType> {
        self.reader
            .ion_type()
            .ok_or_else(|| Error::illegal_cursor_state("no current value"))
    }

    /// Advances inside a container; `false` at its end.
    fn advance(&mut self) -> Result<bool> {
        match self.reader.next_value()? {
            Event::StartScalar | Event::StartContainer => Ok(true),
            Event::EndContainer => Ok(false),
            _ => Err(Error::unexpected_eof(self.position(), "container")),
        }
    }

    fn step_out(&mut self) -> Result<()> {
        match self.reader.step_out_of_container()? {
            Event::NeedsData => Err(Error::unexpected_eof(self.position(), "container")),
            _ => Ok(()),
        }
    }

    fn field_text(&self) -> Result<String> {
        self.reader
            .field_name()?
            .and_then(|token| token.text().map(str::to_string))
            .ok_or_else(|| Error::SymbolTable(SymbolTableError::MissingText))
    }

    fn symbol_text(&mut self) -> Result<String> {
        self.reader
            .symbol_value()?
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::SymbolTable(SymbolTableError::MissingText))
    }

    fn visit_container<'de, V>(&mut self, ion_type: IonType, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.reader.step_into_container()?;
        let value = if ion_type == IonType::Struct {
            visitor.visit_map(MapDeserializer { de: self })?
        } else {
            visitor.visit_seq(SeqDeserializer { de: self })?
        };
        self.step_out()?;
        Ok(value)
    }

    fn visit_int<'de, V>(&mut self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.reader.i64_value() {
            Ok(v) => visitor.visit_i64(v),
            Err(Error::Overflow { .. }) => {
                let big = self.reader.big_int_value()?;
                if let Ok(v) = u64::try_from(&big) {
                    visitor.visit_u64(v)
                } else if let Ok(v) = i128::try_from(&big) {
                    visitor.visit_i128(v)
                } else {
                    Err(Error::overflow("int"))
                }
            }
            Err(err) => Err(err),
        }
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let ion_type = self.current_type()?;
        if self.reader.is_null() {
            return visitor.visit_unit();
        }
        match ion_type {
            IonType::Null => visitor.visit_unit(),
            IonType::Bool => visitor.visit_bool(self.reader.bool_value()?),
            IonType::Int => self.visit_int(visitor),
            IonType::Float => visitor.visit_f64(self.reader.f64_value()?),
            IonType::Decimal => visitor.visit_string(self.reader.decimal_value()?.to_string()),
            IonType::Timestamp => {
                visitor.visit_string(self.reader.timestamp_value()?.to_string())
            }
            IonType::Symbol => visitor.visit_string(self.symbol_text()?),
            IonType::String => visitor.visit_str(self.reader.string_value()?),
            IonType::Blob => visitor.visit_bytes(self.reader.blob_value()?),
            IonType::Clob => visitor.visit_bytes(self.reader.clob_value()?),
            IonType::List | IonType::SExp | IonType::Struct => {
                self.visit_container(ion_type, visitor)
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.reader.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let ion_type = self.current_type()?;
        if self.reader.is_null() {
            return Err(Error::type_mismatch("enum", format!("null.{ion_type}")));
        }
        match ion_type {
            IonType::Symbol => visitor.visit_enum(self.symbol_text()?.into_deserializer()),
            IonType::String => {
                visitor.visit_enum(self.reader.string_value()?.to_string().into_deserializer())
            }
            IonType::Struct => {
                self.reader.step_into_container()?;
                if !self.advance()? {
                    return Err(Error::custom("an enum struct needs exactly one field"));
                }
                let variant = self.field_text()?;
                let value = visitor.visit_enum(EnumDeserializer { de: self, variant })?;
                if self.advance()? {
                    return Err(Error::custom("an enum struct needs exactly one field"));
                }
                self.step_out()?;
                Ok(value)
            }
            other => Err(Error::type_mismatch("enum", other)),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        // The reader skips whatever is left of the value on the next advance.
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier
    }
}

struct SeqDeserializer<'a> {
    de: &'a mut Deserializer,
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer<'_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.de.advance()? {
            seed.deserialize(&mut *self.de).map(Some)
        } else {
            Ok(None)
        }
    }
}

struct MapDeserializer<'a> {
    de: &'a mut Deserializer,
}

impl<'de> de::MapAccess<'de> for MapDeserializer<'_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if !self.de.advance()? {
            return Ok(None);
        }
        let name = self.de.field_text()?;
        seed.deserialize(FieldNameDeserializer { name }).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

/// Field names are symbol text; integer map keys are parsed back from it.
struct FieldNameDeserializer {
    name: String,
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: Visitor<'de>,
            {
                let parsed = self
                    .name
                    .parse::<$ty>()
                    .map_err(|_| Error::type_mismatch(stringify!($ty), &self.name))?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for FieldNameDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_string(self.name)
    }

    deserialize_parsed_key! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_bool => visit_bool: bool,
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_enum(self.name.into_deserializer())
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        newtype_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumDeserializer<'a> {
    de: &'a mut Deserializer,
    variant: String,
}

impl<'de, 'a> de::EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = Error;
    type Variant = VariantDeserializer<'a>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant: de::value::StringDeserializer<Error> = self.variant.into_deserializer();
        let value = seed.deserialize(variant)?;
        Ok((value, VariantDeserializer { de: self.de }))
    }
}

struct VariantDeserializer<'a> {
    de: &'a mut Deserializer,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer<'_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

/// Deserializes the single top-level value in `bytes`.
///
/// # Errors
///
/// Returns an error if the input is malformed, holds no value or more than one value, or
/// does not match `T`.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = Deserializer::from_slice(bytes);
    let value = deserializer
        .deserialize_next()?
        .ok_or_else(|| Error::unexpected_eof(deserializer.position(), "a top-level value"))?;
    deserializer.end()?;
    Ok(value)
}
