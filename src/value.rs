//! Scalar value model for Ion data.
//!
//! This module provides the types a reader produces and a writer consumes for the
//! scalars that have no direct Rust counterpart:
//!
//! - [`IonType`]: The thirteen Ion types a value can have
//! - [`Decimal`]: An arbitrary-precision decimal that preserves its exponent and negative zero
//! - [`Timestamp`]: A calendar instant with an explicit [`Precision`] and optional UTC offset
//!
//! ## Usage Patterns
//!
//! ### Decimals
//!
//! ```rust
//! use ion_binary::Decimal;
//!
//! let price: Decimal = "10.5".parse().unwrap();
//! assert_eq!(price.exponent(), -1);
//! assert_eq!(price.to_string(), "10.5");
//!
//! // Negative zero is distinct from zero
//! let nz = Decimal::negative_zero(0);
//! assert!(nz.is_negative_zero());
//! assert_ne!(nz, Decimal::new(0, 0));
//! ```
//!
//! ### Timestamps
//!
//! ```rust
//! use ion_binary::{Precision, Timestamp};
//!
//! let ts = Timestamp::for_minute(2009, 7, 13, 14, 2, Some(-300)).unwrap();
//! assert_eq!(ts.precision(), Precision::Minute);
//! assert_eq!(ts.to_string(), "2009-07-13T14:02-05:00");
//! ```

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike,
};
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The type of an Ion value.
///
/// Typed nulls (`null.int`, `null.struct`, ...) carry the type they are a null of; the
/// untyped null has type [`IonType::Null`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    SExp,
    Struct,
}

impl IonType {
    /// Returns `true` for list, s-expression and struct.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, IonType::List | IonType::SExp | IonType::Struct)
    }

    /// Returns the Ion text name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::SExp => "sexp",
            IonType::Struct => "struct",
        }
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An arbitrary-precision decimal: `(-1)^sign * magnitude * 10^exponent`.
///
/// The sign is stored separately from the magnitude so that negative zero (`-0d0`) survives
/// a round trip. Equality is representational: `1.0` and `1.00` are different values.
///
/// # Examples
///
/// ```rust
/// use ion_binary::Decimal;
///
/// let d = Decimal::new(-15, -1);
/// assert!(d.is_negative());
/// assert_eq!(d.to_string(), "-1.5");
/// assert_eq!(d, "-1.5".parse().unwrap());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decimal {
    negative: bool,
    magnitude: BigUint,
    exponent: i64,
}

impl Decimal {
    /// Creates a decimal from a signed coefficient and an exponent.
    pub fn new(coefficient: impl Into<BigInt>, exponent: i64) -> Self {
        let coefficient = coefficient.into();
        Decimal {
            negative: coefficient.sign() == Sign::Minus,
            magnitude: coefficient.magnitude().clone(),
            exponent,
        }
    }

    /// Creates a decimal from its sign, magnitude and exponent.
    pub fn from_parts(negative: bool, magnitude: BigUint, exponent: i64) -> Self {
        Decimal {
            negative,
            magnitude,
            exponent,
        }
    }

    /// Creates a negative zero with the given exponent.
    #[must_use]
    pub fn negative_zero(exponent: i64) -> Self {
        Decimal {
            negative: true,
            magnitude: BigUint::default(),
            exponent,
        }
    }

    /// The signed coefficient. Negative zero yields zero.
    #[must_use]
    pub fn coefficient(&self) -> BigInt {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.magnitude.clone())
    }

    #[must_use]
    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    #[must_use]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.magnitude.bits() == 0
    }

    #[must_use]
    pub fn is_negative_zero(&self) -> bool {
        self.negative && self.is_zero()
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::new(value, 0)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    /// Parses `1.5`, `-0.05`, `15d-1` or `1.5e3` forms.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, mut exponent) = match unsigned.find(&['d', 'D', 'e', 'E'][..]) {
            Some(idx) => {
                let exponent = unsigned[idx + 1..]
                    .parse::<i64>()
                    .map_err(|e| Error::invalid_value(format!("decimal exponent: {e}")))?;
                (&unsigned[..idx], exponent)
            }
            None => (unsigned, 0),
        };
        let mut digits = String::with_capacity(mantissa.len());
        match mantissa.split_once('.') {
            Some((whole, fraction)) => {
                digits.push_str(whole);
                digits.push_str(fraction);
                exponent = exponent
                    .checked_sub(fraction.len() as i64)
                    .ok_or_else(|| Error::overflow("decimal exponent"))?;
            }
            None => digits.push_str(mantissa),
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_value(format!("'{s}' is not a decimal")));
        }
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::invalid_value(format!("'{s}' is not a decimal")))?;
        Ok(Decimal::from_parts(negative, magnitude, exponent))
    }
}

/// Leading zeros a plain-notation decimal may carry beyond its digit count.
const MAX_DISPLAY_PADDING: u64 = 20;

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let digits = self.magnitude.to_string();
        if self.exponent >= 0 {
            return write!(f, "{}d{}", digits, self.exponent);
        }
        let scale = self.exponent.unsigned_abs();
        let len = digits.len() as u64;
        if len > scale {
            let (whole, fraction) = digits.split_at((len - scale) as usize);
            write!(f, "{whole}.{fraction}")
        } else if scale - len <= len + MAX_DISPLAY_PADDING {
            write!(f, "0.{}{}", "0".repeat((scale - len) as usize), digits)
        } else {
            write!(f, "{}d{}", digits, self.exponent)
        }
    }
}

/// The finest field a [`Timestamp`] carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
}

/// Offsets must stay strictly inside one day.
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;
const MAX_FRACTION_SCALE: u64 = 1_000;
const NANOS_SCALE: u64 = 9;

/// An Ion timestamp.
///
/// Fields are held in local time. The offset is in minutes east of UTC; `None` is the
/// unknown offset (`-00:00`). Timestamps coarser than [`Precision::Minute`] never carry
/// an offset. Seconds may carry a fractional part in `[0, 1)` held as a [`Decimal`].
///
/// # Examples
///
/// ```rust
/// use ion_binary::{Decimal, Timestamp};
///
/// let ts = Timestamp::for_second(2001, 2, 3, 4, 5, 6, Some(0))
///     .unwrap()
///     .with_fraction(Decimal::new(3849, -4))
///     .unwrap();
/// assert_eq!(ts.to_string(), "2001-02-03T04:05:06.3849Z");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    precision: Precision,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    fraction: Option<Decimal>,
    offset: Option<i32>,
}

/// Timestamp fields shifted to UTC, as they appear on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UtcFields {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl Timestamp {
    pub fn for_year(year: u16) -> Result<Self> {
        Self::build(Precision::Year, year, 1, 1, 0, 0, 0, None)
    }

    pub fn for_month(year: u16, month: u8) -> Result<Self> {
        Self::build(Precision::Month, year, month, 1, 0, 0, 0, None)
    }

    pub fn for_day(year: u16, month: u8, day: u8) -> Result<Self> {
        Self::build(Precision::Day, year, month, day, 0, 0, 0, None)
    }

    pub fn for_minute(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        offset: Option<i32>,
    ) -> Result<Self> {
        Self::build(Precision::Minute, year, month, day, hour, minute, 0, offset)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_second(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        offset: Option<i32>,
    ) -> Result<Self> {
        Self::build(
            Precision::Second,
            year,
            month,
            day,
            hour,
            minute,
            second,
            offset,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        precision: Precision,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        offset: Option<i32>,
    ) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(Error::invalid_value(format!("timestamp year {year}")));
        }
        if NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day)).is_none() {
            return Err(Error::invalid_value(format!(
                "timestamp date {year:04}-{month:02}-{day:02}"
            )));
        }
        if NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)).is_none()
        {
            return Err(Error::invalid_value(format!(
                "timestamp time {hour:02}:{minute:02}:{second:02}"
            )));
        }
        if let Some(offset) = offset {
            if offset.abs() > MAX_OFFSET_MINUTES {
                return Err(Error::invalid_value(format!(
                    "timestamp offset {offset} minutes"
                )));
            }
        }
        let offset = if precision >= Precision::Minute {
            offset
        } else {
            None
        };
        Ok(Timestamp {
            precision,
            year,
            month,
            day,
            hour,
            minute,
            second,
            fraction: None,
            offset,
        })
    }

    /// Adds fractional seconds. Only legal at [`Precision::Second`]; the fraction must lie in `[0, 1)`.
    pub fn with_fraction(mut self, fraction: Decimal) -> Result<Self> {
        if self.precision != Precision::Second {
            return Err(Error::invalid_value(
                "fractional seconds require second precision",
            ));
        }
        if fraction.is_negative() && !fraction.is_zero() {
            return Err(Error::invalid_value("fractional seconds must not be negative"));
        }
        if fraction.exponent() < 0 && fraction.exponent().unsigned_abs() > MAX_FRACTION_SCALE {
            return Err(Error::invalid_value(format!(
                "fractional seconds carry more than {MAX_FRACTION_SCALE} digits"
            )));
        }
        if !fraction.is_zero() {
            let scale = fraction.exponent().unsigned_abs();
            let digits = fraction.magnitude().to_string().len() as u64;
            if fraction.exponent() >= 0 || digits > scale {
                return Err(Error::invalid_value(format!(
                    "fractional seconds {fraction} must be less than one"
                )));
            }
        }
        self.fraction = Some(Decimal::from_parts(
            false,
            fraction.magnitude().clone(),
            fraction.exponent(),
        ));
        Ok(self)
    }

    /// Converts a chrono date-time into a second-precision timestamp, keeping nanoseconds
    /// as the fractional part.
    pub fn from_datetime(dt: &DateTime<FixedOffset>) -> Self {
        let nanos = dt.nanosecond() % 1_000_000_000;
        let fraction = (nanos > 0).then(|| {
            let mut magnitude = nanos;
            let mut exponent = -9i64;
            while magnitude % 10 == 0 {
                magnitude /= 10;
                exponent += 1;
            }
            Decimal::new(magnitude, exponent)
        });
        Timestamp {
            precision: Precision::Second,
            year: dt.year().clamp(1, 9999) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second().min(59) as u8,
            fraction,
            offset: Some(dt.offset().local_minus_utc() / 60),
        }
    }

    /// Converts to a chrono date-time. An unknown offset is treated as UTC.
    pub fn to_datetime(&self) -> Result<DateTime<FixedOffset>> {
        let nanos = match &self.fraction {
            Some(fraction) if !fraction.is_zero() => {
                let scale = fraction.exponent().unsigned_abs();
                if scale > NANOS_SCALE {
                    return Err(Error::invalid_value(format!(
                        "fractional seconds of {self} are finer than nanoseconds"
                    )));
                }
                let width = scale as usize;
                let mut nine = format!("{:0>width$}", fraction.magnitude().to_string());
                while nine.len() < NANOS_SCALE as usize {
                    nine.push('0');
                }
                nine.parse::<u32>().map_err(|_| {
                    Error::invalid_value(format!("fractional seconds of {self}"))
                })?
            }
            _ => 0,
        };
        let naive = self
            .naive_local()
            .and_then(|n| n.with_nanosecond(nanos))
            .ok_or_else(|| Error::invalid_value(format!("timestamp {self}")))?;
        let offset = FixedOffset::east_opt(self.offset.unwrap_or(0) * 60)
            .ok_or_else(|| Error::invalid_value(format!("timestamp offset of {self}")))?;
        offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::invalid_value(format!("timestamp {self}")))
    }

    fn naive_local(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }

    /// Fields as written on the wire: shifted to UTC when the offset is known.
    pub(crate) fn utc_fields(&self) -> UtcFields {
        let local = UtcFields {
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
        };
        let offset = match self.offset {
            Some(offset) if offset != 0 && self.precision >= Precision::Minute => offset,
            _ => return local,
        };
        self.naive_local()
            .and_then(|n| n.checked_sub_signed(Duration::minutes(i64::from(offset))))
            .map(|utc| UtcFields {
                year: utc.year() as u16,
                month: utc.month() as u8,
                day: utc.day() as u8,
                hour: utc.hour() as u8,
                minute: utc.minute() as u8,
            })
            .unwrap_or(local)
    }

    /// Rebuilds a timestamp from wire fields, shifting UTC fields back to local time.
    pub(crate) fn from_utc_fields(
        precision: Precision,
        utc: UtcFields,
        second: u8,
        fraction: Option<Decimal>,
        offset: Option<i32>,
    ) -> Result<Self> {
        let mut fields = utc;
        if let Some(offset) = offset.filter(|o| *o != 0 && precision >= Precision::Minute) {
            let local = NaiveDate::from_ymd_opt(
                i32::from(utc.year),
                u32::from(utc.month),
                u32::from(utc.day),
            )
            .and_then(|d| d.and_hms_opt(u32::from(utc.hour), u32::from(utc.minute), 0))
            .and_then(|n| n.checked_add_signed(Duration::minutes(i64::from(offset))))
            .ok_or_else(|| Error::invalid_value("timestamp fields out of range"))?;
            fields = UtcFields {
                year: local.year().clamp(0, i32::from(u16::MAX)) as u16,
                month: local.month() as u8,
                day: local.day() as u8,
                hour: local.hour() as u8,
                minute: local.minute() as u8,
            };
        }
        let ts = Self::build(
            precision,
            fields.year,
            fields.month,
            fields.day,
            fields.hour,
            fields.minute,
            second,
            offset,
        )?;
        match fraction {
            Some(fraction) => ts.with_fraction(fraction),
            None => Ok(ts),
        }
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[must_use]
    pub fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u8 {
        self.month
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.day
    }

    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    #[must_use]
    pub fn second(&self) -> u8 {
        self.second
    }

    #[must_use]
    pub fn fraction(&self) -> Option<&Decimal> {
        self.fraction.as_ref()
    }

    /// Minutes east of UTC, or `None` when unknown.
    #[must_use]
    pub fn offset(&self) -> Option<i32> {
        self.offset
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        match self.precision {
            Precision::Year => return f.write_str("T"),
            Precision::Month => return write!(f, "-{:02}T", self.month),
            Precision::Day => return write!(f, "-{:02}-{:02}", self.month, self.day),
            _ => {}
        }
        write!(
            f,
            "-{:02}-{:02}T{:02}:{:02}",
            self.month, self.day, self.hour, self.minute
        )?;
        if self.precision == Precision::Second {
            write!(f, ":{:02}", self.second)?;
            if let Some(fraction) = &self.fraction {
                if fraction.exponent() < 0 {
                    let scale = fraction.exponent().unsigned_abs() as usize;
                    write!(f, ".{:0>scale$}", fraction.magnitude().to_string())?;
                }
            }
        }
        match self.offset {
            None => f.write_str("-00:00"),
            Some(0) => f.write_str("Z"),
            Some(offset) => {
                let sign = if offset < 0 { '-' } else { '+' };
                let abs = offset.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
        }
    }
}
