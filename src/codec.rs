//! Scalar codec: encoded lengths, encoders and decoders for the Ion 1.0 binary primitives.
//!
//! Every encoded length computed here is exactly the number of bytes the matching
//! `write_*` function emits, so the length planner and the emitter never disagree.
//!
//! Two flavours of length exist for variable-length integers:
//!
//! - [`var_uint_len`] / [`var_int_len`] return `0` for zero, which is what a value whose
//!   zero is implied by an empty body needs
//! - [`var_uint_field_len`] / [`var_int_field_len`] return at least `1`, for mandatory
//!   fields such as length prefixes, field names and decimal exponents
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::codec;
//!
//! let mut out = Vec::new();
//! let written = codec::write_var_uint(&mut out, 2049);
//! assert_eq!(written, codec::var_uint_len(2049));
//! assert_eq!(codec::read_var_uint(&out).unwrap(), (2049, 2));
//! ```

use num_bigint::{BigInt, BigUint, Sign};

use crate::value::{Decimal, Precision, Timestamp, UtcFields};
use crate::{Error, Result};

/// Bytes in an encoded non-zero float.
pub const FLOAT_LEN: usize = 8;

/// Byte for an unknown timestamp offset (VarInt negative zero).
pub const UNKNOWN_OFFSET: u8 = 0xC0;

fn bit_len(value: u64) -> usize {
    (u64::BITS - value.leading_zeros()) as usize
}

/// Bytes needed for `value` as a VarUInt; zero needs none.
#[must_use]
pub fn var_uint_len(value: u64) -> usize {
    (bit_len(value) + 6) / 7
}

/// Bytes needed for `value` as a mandatory VarUInt field.
#[must_use]
pub fn var_uint_field_len(value: u64) -> usize {
    var_uint_len(value).max(1)
}

/// Bytes needed for `value` as a VarInt; zero needs none.
#[must_use]
pub fn var_int_len(value: i64) -> usize {
    let bits = bit_len(value.unsigned_abs());
    match bits {
        0 => 0,
        1..=6 => 1,
        _ => 1 + (bits - 6 + 6) / 7,
    }
}

/// Bytes needed for `value` as a mandatory VarInt field.
#[must_use]
pub fn var_int_field_len(value: i64) -> usize {
    var_int_len(value).max(1)
}

/// Bytes needed for `value` as a UInt; zero needs none.
#[must_use]
pub fn uint_len(value: u64) -> usize {
    (bit_len(value) + 7) / 8
}

#[must_use]
pub fn big_uint_len(value: &BigUint) -> usize {
    ((value.bits() + 7) / 8) as usize
}

/// Bytes needed for `value` as a sign-and-magnitude Int; zero needs none.
#[must_use]
pub fn int_len(value: i64) -> usize {
    match bit_len(value.unsigned_abs()) {
        0 => 0,
        bits => (bits + 8) / 8,
    }
}

#[must_use]
pub fn big_int_len(value: &BigInt) -> usize {
    signed_magnitude_len(value.magnitude())
}

fn signed_magnitude_len(magnitude: &BigUint) -> usize {
    match magnitude.bits() {
        0 => 0,
        bits => ((bits + 8) / 8) as usize,
    }
}

/// Body length of an Ion int: the UInt length of its magnitude.
#[must_use]
pub fn int_value_len(value: i64) -> usize {
    uint_len(value.unsigned_abs())
}

#[must_use]
pub fn big_int_value_len(value: &BigInt) -> usize {
    big_uint_len(value.magnitude())
}

/// Body length of a string: its UTF-8 byte count.
#[must_use]
pub fn string_len(value: &str) -> usize {
    value.len()
}

/// Body length of a float. Positive zero has an empty body.
#[must_use]
pub fn float_len(value: f64) -> usize {
    if value == 0.0 && value.is_sign_positive() {
        0
    } else {
        FLOAT_LEN
    }
}

/// Body length of a symbol value.
#[must_use]
pub fn symbol_len(sid: u64) -> usize {
    uint_len(sid)
}

fn is_default_zero(decimal: &Decimal) -> bool {
    decimal.is_zero() && !decimal.is_negative() && decimal.exponent() == 0
}

fn coefficient_len(decimal: &Decimal) -> usize {
    signed_magnitude_len(decimal.magnitude()).max(1)
}

/// Body length of a decimal.
///
/// `0d0` has an empty body. Otherwise the exponent always takes at least one byte and a
/// zero coefficient takes one byte so that negative zero keeps its sign.
#[must_use]
pub fn decimal_len(value: &Decimal) -> usize {
    if is_default_zero(value) {
        return 0;
    }
    var_int_field_len(value.exponent()) + coefficient_len(value)
}

fn has_fraction(timestamp: &Timestamp) -> Option<&Decimal> {
    timestamp
        .fraction()
        .filter(|f| !(f.is_zero() && f.exponent() >= 0))
}

/// Body length of a timestamp, computed from its UTC fields.
#[must_use]
pub fn timestamp_len(value: &Timestamp) -> usize {
    let utc = value.utc_fields();
    let precision = value.precision();
    let mut len = match value.offset() {
        Some(offset) => var_int_field_len(i64::from(offset)),
        None => 1,
    };
    len += var_uint_field_len(u64::from(utc.year));
    if precision >= Precision::Month {
        len += var_uint_field_len(u64::from(utc.month));
    }
    if precision >= Precision::Day {
        len += var_uint_field_len(u64::from(utc.day));
    }
    if precision >= Precision::Minute {
        len += var_uint_field_len(u64::from(utc.hour));
        len += var_uint_field_len(u64::from(utc.minute));
    }
    if precision >= Precision::Second {
        len += var_uint_field_len(u64::from(value.second()));
        if let Some(fraction) = has_fraction(value) {
            len += var_int_field_len(fraction.exponent()) + coefficient_len(fraction);
        }
    }
    len
}

/// Writes a VarUInt, always at least one byte. Returns the bytes written.
pub fn write_var_uint(out: &mut Vec<u8>, value: u64) -> usize {
    let len = var_uint_field_len(value);
    for i in (0..len).rev() {
        let mut byte = ((value >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
    len
}

/// Writes a VarInt, always at least one byte. Returns the bytes written.
pub fn write_var_int(out: &mut Vec<u8>, value: i64) -> usize {
    let magnitude = value.unsigned_abs();
    let len = var_int_field_len(value);
    for i in 0..len {
        let shift = 7 * (len - 1 - i);
        let mut byte = if i == 0 {
            let mut first = ((magnitude >> shift) & 0x3F) as u8;
            if value < 0 {
                first |= 0x40;
            }
            first
        } else {
            ((magnitude >> shift) & 0x7F) as u8
        };
        if i == len - 1 {
            byte |= 0x80;
        }
        out.push(byte);
    }
    len
}

/// Writes a big-endian UInt with no leading zero bytes; zero writes nothing.
pub fn write_uint(out: &mut Vec<u8>, value: u64) -> usize {
    let len = uint_len(value);
    out.extend_from_slice(&value.to_be_bytes()[8 - len..]);
    len
}

pub fn write_big_uint(out: &mut Vec<u8>, value: &BigUint) -> usize {
    if value.bits() == 0 {
        return 0;
    }
    let bytes = value.to_bytes_be();
    out.extend_from_slice(&bytes);
    bytes.len()
}

/// Writes a sign-and-magnitude Int. A zero magnitude writes one byte carrying the sign.
pub fn write_signed_magnitude(out: &mut Vec<u8>, negative: bool, magnitude: &BigUint) -> usize {
    let sign = if negative { 0x80 } else { 0x00 };
    if magnitude.bits() == 0 {
        out.push(sign);
        return 1;
    }
    let mut bytes = magnitude.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        out.push(sign);
        out.extend_from_slice(&bytes);
        bytes.len() + 1
    } else {
        bytes[0] |= sign;
        out.extend_from_slice(&bytes);
        bytes.len()
    }
}

pub fn write_float(out: &mut Vec<u8>, value: f64) -> usize {
    if float_len(value) == 0 {
        return 0;
    }
    out.extend_from_slice(&value.to_be_bytes());
    FLOAT_LEN
}

pub fn write_decimal(out: &mut Vec<u8>, value: &Decimal) -> usize {
    if is_default_zero(value) {
        return 0;
    }
    write_var_int(out, value.exponent())
        + write_signed_magnitude(out, value.is_negative(), value.magnitude())
}

pub fn write_timestamp(out: &mut Vec<u8>, value: &Timestamp) -> usize {
    let utc = value.utc_fields();
    let precision = value.precision();
    let mut written = match value.offset() {
        Some(offset) => write_var_int(out, i64::from(offset)),
        None => {
            out.push(UNKNOWN_OFFSET);
            1
        }
    };
    written += write_var_uint(out, u64::from(utc.year));
    if precision >= Precision::Month {
        written += write_var_uint(out, u64::from(utc.month));
    }
    if precision >= Precision::Day {
        written += write_var_uint(out, u64::from(utc.day));
    }
    if precision >= Precision::Minute {
        written += write_var_uint(out, u64::from(utc.hour));
        written += write_var_uint(out, u64::from(utc.minute));
    }
    if precision >= Precision::Second {
        written += write_var_uint(out, u64::from(value.second()));
        if let Some(fraction) = has_fraction(value) {
            written += write_var_int(out, fraction.exponent());
            written += write_signed_magnitude(out, false, fraction.magnitude());
        }
    }
    written
}

/// Reads a VarUInt from the front of `bytes`.
///
/// Returns `Ok(None)` when `bytes` ends before the terminating byte, leaving the caller to
/// decide whether that means "wait for more data" or "truncated".
pub fn peek_var_uint(bytes: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if value > (u64::MAX >> 7) {
            return Err(Error::overflow("VarUInt"));
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 != 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    Ok(None)
}

/// Reads a VarUInt that must be complete within `bytes`.
pub fn read_var_uint(bytes: &[u8]) -> Result<(u64, usize)> {
    peek_var_uint(bytes)?.ok_or_else(|| Error::decode(bytes.len() as u64, "truncated VarUInt"))
}

/// Reads a VarInt from the front of `bytes`. The value is `None` for negative zero.
pub fn peek_var_int(bytes: &[u8]) -> Result<Option<(Option<i64>, usize)>> {
    let Some(&first) = bytes.first() else {
        return Ok(None);
    };
    let negative = first & 0x40 != 0;
    let mut magnitude = u64::from(first & 0x3F);
    let mut len = 1;
    if first & 0x80 == 0 {
        loop {
            let Some(&byte) = bytes.get(len) else {
                return Ok(None);
            };
            if magnitude > (u64::MAX >> 7) {
                return Err(Error::overflow("VarInt"));
            }
            magnitude = (magnitude << 7) | u64::from(byte & 0x7F);
            len += 1;
            if byte & 0x80 != 0 {
                break;
            }
        }
    }
    let value = match (negative, magnitude) {
        (true, 0) => None,
        (true, m) if m <= 1 << 63 => Some((m as i64).wrapping_neg()),
        (false, m) if m <= i64::MAX as u64 => Some(m as i64),
        _ => return Err(Error::overflow("VarInt")),
    };
    Ok(Some((value, len)))
}

/// Reads a VarInt that must be complete within `bytes`.
pub fn read_var_int(bytes: &[u8]) -> Result<(Option<i64>, usize)> {
    peek_var_int(bytes)?.ok_or_else(|| Error::decode(bytes.len() as u64, "truncated VarInt"))
}

/// Reads a whole slice as a big-endian UInt.
pub fn read_uint(bytes: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for &byte in bytes {
        if value > (u64::MAX >> 8) {
            return Err(Error::overflow("UInt"));
        }
        value = (value << 8) | u64::from(byte);
    }
    Ok(value)
}

#[must_use]
pub fn read_big_uint(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Reads a whole slice as a sign-and-magnitude Int: `(negative, magnitude)`.
#[must_use]
pub fn read_signed_magnitude(bytes: &[u8]) -> (bool, BigUint) {
    match bytes.split_first() {
        None => (false, BigUint::default()),
        Some((&first, rest)) => {
            let mut magnitude = Vec::with_capacity(bytes.len());
            magnitude.push(first & 0x7F);
            magnitude.extend_from_slice(rest);
            (first & 0x80 != 0, BigUint::from_bytes_be(&magnitude))
        }
    }
}

/// Reads a sign-and-magnitude Int as a `BigInt`. Negative zero reads as zero.
#[must_use]
pub fn read_int(bytes: &[u8]) -> BigInt {
    let (negative, magnitude) = read_signed_magnitude(bytes);
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    BigInt::from_biguint(sign, magnitude)
}

/// Reads a float body of 0, 4 or 8 bytes.
pub fn read_float(bytes: &[u8]) -> Result<f64> {
    match bytes.len() {
        0 => Ok(0.0),
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(bytes);
            Ok(f64::from(f32::from_be_bytes(buf)))
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(f64::from_be_bytes(buf))
        }
        n => Err(Error::decode(0, format!("float of length {n}"))),
    }
}

pub fn read_decimal(bytes: &[u8]) -> Result<Decimal> {
    if bytes.is_empty() {
        return Ok(Decimal::new(0, 0));
    }
    let (exponent, used) = read_var_int(bytes)?;
    let (negative, magnitude) = read_signed_magnitude(&bytes[used..]);
    Ok(Decimal::from_parts(negative, magnitude, exponent.unwrap_or(0)))
}

fn read_timestamp_field(bytes: &[u8], pos: &mut usize) -> Result<u8> {
    let (value, used) = read_var_uint(&bytes[*pos..]).map_err(|e| e.at(*pos as u64))?;
    *pos += used;
    u8::try_from(value).map_err(|_| Error::decode(*pos as u64, "timestamp field out of range"))
}

pub fn read_timestamp(bytes: &[u8]) -> Result<Timestamp> {
    let (offset, mut pos) = read_var_int(bytes)?;
    let offset = offset
        .map(|o| i32::try_from(o).map_err(|_| Error::decode(0, "timestamp offset out of range")))
        .transpose()?;
    let (year, used) = read_var_uint(&bytes[pos..]).map_err(|e| e.at(pos as u64))?;
    pos += used;
    let year = u16::try_from(year).map_err(|_| Error::decode(pos as u64, "timestamp year"))?;
    let mut utc = UtcFields {
        year,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
    };
    let mut second = 0;
    let mut fraction = None;
    let mut precision = Precision::Year;
    if pos < bytes.len() {
        utc.month = read_timestamp_field(bytes, &mut pos)?;
        precision = Precision::Month;
    }
    if pos < bytes.len() {
        utc.day = read_timestamp_field(bytes, &mut pos)?;
        precision = Precision::Day;
    }
    if pos < bytes.len() {
        utc.hour = read_timestamp_field(bytes, &mut pos)?;
        if pos >= bytes.len() {
            return Err(Error::decode(pos as u64, "timestamp hour without minute"));
        }
        utc.minute = read_timestamp_field(bytes, &mut pos)?;
        precision = Precision::Minute;
    }
    if pos < bytes.len() {
        second = read_timestamp_field(bytes, &mut pos)?;
        precision = Precision::Second;
    }
    if pos < bytes.len() {
        let (exponent, used) = read_var_int(&bytes[pos..]).map_err(|e| e.at(pos as u64))?;
        let (negative, magnitude) = read_signed_magnitude(&bytes[pos + used..]);
        let exponent = exponent.unwrap_or(0);
        if !(magnitude.bits() == 0 && exponent >= 0) {
            if negative && magnitude.bits() != 0 {
                return Err(Error::decode(pos as u64, "negative fractional seconds"));
            }
            fraction = Some(Decimal::from_parts(false, magnitude, exponent));
        }
    }
    Timestamp::from_utc_fields(precision, utc, second, fraction, offset)
        .map_err(|e| Error::decode(0, e))
}

/// Validates a string body as UTF-8.
pub fn read_string(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| Error::decode(e.valid_up_to() as u64, "invalid UTF-8 in string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_uint_lengths() {
        assert_eq!(var_uint_len(0), 0);
        assert_eq!(var_uint_len(127), 1);
        assert_eq!(var_uint_len(128), 2);
        assert_eq!(var_uint_field_len(0), 1);
    }

    #[test]
    fn test_var_int_lengths() {
        let cases: [(i64, usize); 12] = [
            (0, 0),
            (5, 1),
            (2049, 2),
            (524289, 3),
            (8388613, 4),
            (-201326592, 5),
            (201326592, 5),
            (17179869185, 6),
            (140737496743941, 7),
            (422212473454597, 8),
            (72198331534671877, 9),
            (4611686035607257089, 10),
        ];
        for (value, len) in cases {
            assert_eq!(var_int_len(value), len, "var_int_len({value})");
            let mut out = Vec::new();
            if value != 0 {
                assert_eq!(write_var_int(&mut out, value), len);
                assert_eq!(read_var_int(&out).unwrap(), (Some(value), len));
            }
        }
        assert_eq!(var_int_len(i64::MIN), 10);
    }

    #[test]
    fn test_uint_lengths() {
        let cases: [(u64, usize); 9] = [
            (0, 0),
            (129, 1),
            (256, 2),
            (8388609, 3),
            (2155872257, 4),
            (274877907200, 5),
            (141012366262528, 6),
            (18014400665354241, 7),
            (4611686018427388160, 8),
        ];
        for (value, len) in cases {
            assert_eq!(uint_len(value), len, "uint_len({value})");
            let mut out = Vec::new();
            assert_eq!(write_uint(&mut out, value), len);
            assert_eq!(read_uint(&out).unwrap(), value);
        }
    }

    #[test]
    fn test_int_lengths() {
        assert_eq!(int_value_len(281), 2);
        assert_eq!(int_value_len(-12555), 2);
        assert_eq!(int_value_len(0), 0);
        assert_eq!(int_len(i64::MIN), 9);
        assert_eq!(int_len(127), 1);
        assert_eq!(int_len(128), 2);
        for value in [1i64, -1, 10, -10] {
            assert_eq!(big_int_len(&BigInt::from(value)), 1);
        }
        assert_eq!(big_int_value_len(&BigInt::from(250001)), 3);
    }

    #[test]
    fn test_string_lengths() {
        assert_eq!(string_len("\u{10437}"), 4);
        assert_eq!(string_len("\u{7E}\u{7F}"), 2);
        assert_eq!(string_len("\u{1}\u{85}"), 3);
        assert_eq!(string_len("\u{1}\u{901}"), 4);
    }

    #[test]
    fn test_float_lengths() {
        assert_eq!(float_len(0.0), 0);
        assert_eq!(float_len(-0.0), 8);
        assert_eq!(float_len(1.5), 8);
        let mut out = Vec::new();
        write_float(&mut out, -0.0);
        let back = read_float(&out).unwrap();
        assert!(back == 0.0 && back.is_sign_negative());
    }

    #[test]
    fn test_decimal_lengths() {
        let cases = [
            (Decimal::new(1, 0), 2),
            (Decimal::new(-1, 0), 2),
            (Decimal::new(15, -1), 2),
            (Decimal::new(-15, -1), 2),
            (Decimal::new(10, 0), 2),
            (Decimal::new(105, -1), 2),
            (Decimal::new(0, 0), 0),
            (Decimal::new(0, -2), 2),
            (Decimal::negative_zero(0), 2),
        ];
        for (decimal, len) in cases {
            assert_eq!(decimal_len(&decimal), len, "decimal_len({decimal})");
            let mut out = Vec::new();
            assert_eq!(write_decimal(&mut out, &decimal), len);
            assert_eq!(read_decimal(&out).unwrap(), decimal);
        }
    }

    #[test]
    fn test_timestamp_lengths() {
        let cases = [
            (Timestamp::for_year(2011).unwrap(), 3),
            (Timestamp::for_month(2011, 2).unwrap(), 4),
            (Timestamp::for_day(2011, 2, 20).unwrap(), 5),
            (Timestamp::for_minute(2011, 2, 20, 11, 30, None).unwrap(), 7),
            (
                Timestamp::for_second(2011, 2, 20, 11, 30, 59, None).unwrap(),
                8,
            ),
            (
                Timestamp::for_second(2011, 2, 20, 11, 30, 59, Some(0))
                    .unwrap()
                    .with_fraction(Decimal::new(3849, -4))
                    .unwrap(),
                11,
            ),
        ];
        for (ts, len) in cases {
            assert_eq!(timestamp_len(&ts), len, "timestamp_len({ts})");
            let mut out = Vec::new();
            assert_eq!(write_timestamp(&mut out, &ts), len);
            assert_eq!(read_timestamp(&out).unwrap(), ts);
        }
    }

    #[test]
    fn test_timestamp_offset_roundtrip() {
        let ts = Timestamp::for_minute(2009, 7, 13, 14, 2, Some(-300)).unwrap();
        let mut out = Vec::new();
        write_timestamp(&mut out, &ts);
        // Hour is stored in UTC.
        assert_eq!(out[6], 0x80 | 19);
        assert_eq!(read_timestamp(&out).unwrap(), ts);
    }

    #[test]
    fn test_var_uint_overflow_and_truncation() {
        let too_big = [0x7Fu8; 10]
            .iter()
            .copied()
            .chain([0xFF])
            .collect::<Vec<_>>();
        assert!(matches!(
            peek_var_uint(&too_big),
            Err(Error::Overflow { .. })
        ));
        assert_eq!(peek_var_uint(&[0x01, 0x02]).unwrap(), None);
        assert!(read_var_uint(&[0x01]).is_err());
    }

    #[test]
    fn test_var_int_negative_zero() {
        assert_eq!(read_var_int(&[0xC0]).unwrap(), (None, 1));
        assert_eq!(read_var_int(&[0x80]).unwrap(), (Some(0), 1));
        let mut out = Vec::new();
        write_var_int(&mut out, i64::MIN);
        assert_eq!(read_var_int(&out).unwrap(), (Some(i64::MIN), 10));
    }

    #[test]
    fn test_signed_magnitude() {
        let mut out = Vec::new();
        write_signed_magnitude(&mut out, true, &BigUint::from(0x80u32));
        assert_eq!(out, vec![0x80, 0x80]);
        assert_eq!(read_int(&out), BigInt::from(-128));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(read_string(&[0x61, 0xFF]).is_err());
        assert_eq!(read_string(b"abc").unwrap(), "abc");
    }
}
