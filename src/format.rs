//! Ion 1.0 binary format constants.
//!
//! ## Value Layout
//!
//! Every value starts with a one-byte *type descriptor*. Its high nibble is the type code
//! and its low nibble is either an inline length (0-13), `14` meaning a VarUInt length
//! follows, or `15` meaning the typed null. Booleans keep their value in the low nibble.
//!
//! ```text
//! +--------+-----------------+------------------+
//! | T | L  | [VarUInt length]| body (length)    |
//! +--------+-----------------+------------------+
//! ```
//!
//! Annotations wrap a value: `E` + length, a VarUInt byte count of the annotation SIDs,
//! the SIDs, then exactly one wrapped value that ends where the wrapper ends.
//!
//! A stream starts with the version marker `E0 01 00 EA`, which may reappear at the top
//! level to reset the symbol context.
//!
//! ## Variable-length Integers
//!
//! - **VarUInt**: 7 data bits per byte, big-endian, high bit marks the last byte
//! - **VarInt**: like VarUInt, but the first byte spends one bit on the sign
//! - **UInt / Int**: fixed-width big-endian magnitudes; Int's top bit is the sign

use crate::value::IonType;
use crate::{Error, Result};

/// The Ion 1.0 binary version marker.
pub const IVM: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

/// Low nibble announcing a VarUInt length field.
pub const VAR_LENGTH: u8 = 14;

/// Low nibble marking a typed null.
pub const NULL_LENGTH: u8 = 15;

/// Largest length that fits in the low nibble.
pub const MAX_INLINE_LENGTH: u64 = 13;

/// Text of the system symbols, SIDs 1 through 9.
pub const SYSTEM_SYMBOLS: [&str; 9] = [
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

/// The highest SID defined by the system symbol table.
pub const SYSTEM_MAX_ID: u64 = 9;

pub mod sid {
    pub const ION: u64 = 1;
    pub const ION_1_0: u64 = 2;
    pub const ION_SYMBOL_TABLE: u64 = 3;
    pub const NAME: u64 = 4;
    pub const VERSION: u64 = 5;
    pub const IMPORTS: u64 = 6;
    pub const SYMBOLS: u64 = 7;
    pub const MAX_ID: u64 = 8;
    pub const ION_SHARED_SYMBOL_TABLE: u64 = 9;
}

/// The high nibble of a type descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Null = 0,
    Bool = 1,
    PositiveInt = 2,
    NegativeInt = 3,
    Float = 4,
    Decimal = 5,
    Timestamp = 6,
    Symbol = 7,
    String = 8,
    Clob = 9,
    Blob = 10,
    List = 11,
    SExp = 12,
    Struct = 13,
    Annotation = 14,
    Reserved = 15,
}

impl TypeCode {
    #[must_use]
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => TypeCode::Null,
            1 => TypeCode::Bool,
            2 => TypeCode::PositiveInt,
            3 => TypeCode::NegativeInt,
            4 => TypeCode::Float,
            5 => TypeCode::Decimal,
            6 => TypeCode::Timestamp,
            7 => TypeCode::Symbol,
            8 => TypeCode::String,
            9 => TypeCode::Clob,
            10 => TypeCode::Blob,
            11 => TypeCode::List,
            12 => TypeCode::SExp,
            13 => TypeCode::Struct,
            14 => TypeCode::Annotation,
            _ => TypeCode::Reserved,
        }
    }

    /// The type code used to write a non-null value of `ion_type`.
    #[must_use]
    pub fn for_type(ion_type: IonType) -> Self {
        match ion_type {
            IonType::Null => TypeCode::Null,
            IonType::Bool => TypeCode::Bool,
            IonType::Int => TypeCode::PositiveInt,
            IonType::Float => TypeCode::Float,
            IonType::Decimal => TypeCode::Decimal,
            IonType::Timestamp => TypeCode::Timestamp,
            IonType::Symbol => TypeCode::Symbol,
            IonType::String => TypeCode::String,
            IonType::Clob => TypeCode::Clob,
            IonType::Blob => TypeCode::Blob,
            IonType::List => TypeCode::List,
            IonType::SExp => TypeCode::SExp,
            IonType::Struct => TypeCode::Struct,
        }
    }

    #[must_use]
    pub const fn high_nibble(self) -> u8 {
        (self as u8) << 4
    }
}

/// A decoded type descriptor byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub code: TypeCode,
    pub length_nibble: u8,
}

/// How a descriptor's body length is obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LengthSource {
    Inline(u64),
    VarUInt,
}

impl TypeDescriptor {
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        TypeDescriptor {
            code: TypeCode::from_nibble(byte >> 4),
            length_nibble: byte & 0x0F,
        }
    }

    /// `true` for any typed null, including `null.null` (0x0F).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.length_nibble == NULL_LENGTH && self.code != TypeCode::Annotation
    }

    /// `true` for a NOP pad: type 0 with a length other than 15.
    #[must_use]
    pub fn is_nop_pad(&self) -> bool {
        self.code == TypeCode::Null && self.length_nibble != NULL_LENGTH
    }

    /// `true` for a struct whose fields are sorted by SID (low nibble 1).
    #[must_use]
    pub fn is_ordered_struct(&self) -> bool {
        self.code == TypeCode::Struct && self.length_nibble == 1
    }

    /// The Ion type of a value with this descriptor; `None` for annotation wrappers and
    /// NOP pads.
    #[must_use]
    pub fn ion_type(&self) -> Option<IonType> {
        Some(match self.code {
            TypeCode::Null if self.length_nibble == NULL_LENGTH => IonType::Null,
            TypeCode::Null | TypeCode::Annotation | TypeCode::Reserved => return None,
            TypeCode::Bool => IonType::Bool,
            TypeCode::PositiveInt | TypeCode::NegativeInt => IonType::Int,
            TypeCode::Float => IonType::Float,
            TypeCode::Decimal => IonType::Decimal,
            TypeCode::Timestamp => IonType::Timestamp,
            TypeCode::Symbol => IonType::Symbol,
            TypeCode::String => IonType::String,
            TypeCode::Clob => IonType::Clob,
            TypeCode::Blob => IonType::Blob,
            TypeCode::List => IonType::List,
            TypeCode::SExp => IonType::SExp,
            TypeCode::Struct => IonType::Struct,
        })
    }

    #[must_use]
    pub fn length_source(&self) -> LengthSource {
        if self.is_null() || self.code == TypeCode::Bool {
            LengthSource::Inline(0)
        } else if self.length_nibble == VAR_LENGTH || self.is_ordered_struct() {
            LengthSource::VarUInt
        } else {
            LengthSource::Inline(u64::from(self.length_nibble))
        }
    }

    /// Rejects descriptors that no valid Ion 1.0 stream contains.
    pub fn validate(&self, position: u64) -> Result<()> {
        let byte = self.code.high_nibble() | self.length_nibble;
        let invalid = match self.code {
            TypeCode::Reserved => true,
            TypeCode::Bool => self.length_nibble > 1 && self.length_nibble != NULL_LENGTH,
            TypeCode::NegativeInt => self.length_nibble == 0,
            TypeCode::Float => !matches!(self.length_nibble, 0 | 4 | 8 | NULL_LENGTH),
            TypeCode::Annotation => self.length_nibble < 3 || self.length_nibble == NULL_LENGTH,
            _ => false,
        };
        if invalid {
            return Err(Error::decode(
                position,
                format!("invalid type descriptor 0x{byte:02X}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_classification() {
        let null_int = TypeDescriptor::from_byte(0x2F);
        assert!(null_int.is_null());
        assert_eq!(null_int.ion_type(), Some(IonType::Int));

        let pad = TypeDescriptor::from_byte(0x03);
        assert!(pad.is_nop_pad());
        assert_eq!(pad.ion_type(), None);

        assert_eq!(
            TypeDescriptor::from_byte(0x0F).ion_type(),
            Some(IonType::Null)
        );
        assert!(TypeDescriptor::from_byte(0xD1).is_ordered_struct());
        assert_eq!(
            TypeDescriptor::from_byte(0xD1).length_source(),
            LengthSource::VarUInt
        );
        assert_eq!(
            TypeDescriptor::from_byte(0x11).length_source(),
            LengthSource::Inline(0)
        );
        assert_eq!(
            TypeDescriptor::from_byte(0x8E).length_source(),
            LengthSource::VarUInt
        );
    }

    #[test]
    fn test_invalid_descriptors() {
        for byte in [0xF0u8, 0x12, 0x30, 0x41, 0x45, 0xE1, 0xE2, 0xEF] {
            assert!(
                TypeDescriptor::from_byte(byte).validate(7).is_err(),
                "0x{byte:02X} should be rejected"
            );
        }
        for byte in [0x10u8, 0x11, 0x1F, 0x20, 0x31, 0x40, 0x48, 0xE3, 0xD0] {
            assert!(TypeDescriptor::from_byte(byte).validate(0).is_ok());
        }
    }

    #[test]
    fn test_system_symbols_match_sids() {
        assert_eq!(SYSTEM_SYMBOLS[(sid::ION_SYMBOL_TABLE - 1) as usize], "$ion_symbol_table");
        assert_eq!(SYSTEM_SYMBOLS[(sid::MAX_ID - 1) as usize], "max_id");
        assert_eq!(SYSTEM_SYMBOLS.len() as u64, SYSTEM_MAX_ID);
    }
}
