//! BSON element type tags and binary subtypes.
//!
//! <http://bsonspec.org/spec.html>

use crate::error::{Error, Result};

/// The BSON element type tag, the single byte that precedes every (key, value) element on the
/// wire and identifies how its payload is encoded.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementType {
    /// 64-bit binary floating point.
    Double = 0x01,
    /// UTF-8 string.
    String = 0x02,
    /// Embedded document.
    EmbeddedDocument = 0x03,
    /// Array.
    Array = 0x04,
    /// Binary data.
    Binary = 0x05,
    /// Undefined value (deprecated).
    Undefined = 0x06,
    /// ObjectId.
    ObjectId = 0x07,
    /// Boolean.
    Boolean = 0x08,
    /// UTC datetime.
    DateTime = 0x09,
    /// Null value.
    Null = 0x0A,
    /// Regular expression.
    RegularExpression = 0x0B,
    /// DBPointer (deprecated).
    DbPointer = 0x0C,
    /// JavaScript code.
    JavaScriptCode = 0x0D,
    /// Symbol (deprecated).
    Symbol = 0x0E,
    /// JavaScript code with scope.
    JavaScriptCodeWithScope = 0x0F,
    /// 32-bit signed integer.
    Int32 = 0x10,
    /// Timestamp.
    Timestamp = 0x11,
    /// 64-bit signed integer.
    Int64 = 0x12,
    /// 128-bit decimal floating point.
    Decimal128 = 0x13,
    /// Max key.
    MaxKey = 0x7F,
    /// Min key.
    MinKey = 0xFF,
}

impl ElementType {
    /// Attempts to map a raw wire tag byte to its [`ElementType`].
    #[inline]
    pub fn from(tag: u8) -> Option<ElementType> {
        use ElementType::*;
        Some(match tag {
            0x01 => Double,
            0x02 => String,
            0x03 => EmbeddedDocument,
            0x04 => Array,
            0x05 => Binary,
            0x06 => Undefined,
            0x07 => ObjectId,
            0x08 => Boolean,
            0x09 => DateTime,
            0x0A => Null,
            0x0B => RegularExpression,
            0x0C => DbPointer,
            0x0D => JavaScriptCode,
            0x0E => Symbol,
            0x0F => JavaScriptCodeWithScope,
            0x10 => Int32,
            0x11 => Timestamp,
            0x12 => Int64,
            0x13 => Decimal128,
            0x7F => MaxKey,
            0xFF => MinKey,
            _ => return None,
        })
    }

    /// The wire tag byte for this type.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// The subtype of a BSON [`Binary`](crate::Binary) value.
///
/// Values in `[0x08, 0x7F]` are reserved by the BSON spec and are rejected at construction time;
/// `[0x80, 0xFF]` is available for user-defined subtypes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinarySubtype {
    /// Generic binary subtype.
    Generic,
    /// Function.
    Function,
    /// Binary (old).
    BinaryOld,
    /// UUID (old).
    UuidOld,
    /// UUID.
    Uuid,
    /// MD5.
    Md5,
    /// Encrypted BSON value.
    Encrypted,
    /// Compressed time series column data.
    Column,
    /// User-defined subtype, in `[0x80, 0xFF]`.
    UserDefined(u8),
}

impl BinarySubtype {
    /// Validates and converts a raw subtype byte, rejecting the reserved range `[0x08, 0x7F]`.
    pub fn from_u8(t: u8) -> Result<BinarySubtype> {
        Ok(match t {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            0x07 => BinarySubtype::Column,
            0x08..=0x7F => {
                return Err(Error::invalid_argument(format!(
                    "binary subtype {t:#04x} is reserved"
                )))
            }
            other => BinarySubtype::UserDefined(other),
        })
    }
}

impl From<BinarySubtype> for u8 {
    #[inline]
    fn from(t: BinarySubtype) -> u8 {
        match t {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::Encrypted => 0x06,
            BinarySubtype::Column => 0x07,
            BinarySubtype::UserDefined(x) => x,
        }
    }
}

/// Infallibly maps any raw byte to a [`BinarySubtype`], treating the reserved range as
/// user-defined. Used when reading an already-on-the-wire value, where the reserved range was
/// validated (or deliberately not validated) at write time.
impl From<u8> for BinarySubtype {
    #[inline]
    fn from(t: u8) -> BinarySubtype {
        match t {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            0x07 => BinarySubtype::Column,
            other => BinarySubtype::UserDefined(other),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn element_type_round_trips() {
        for tag in [
            0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10, 0x11, 0x12, 0x13, 0x7F, 0xFF,
        ] {
            let ty = ElementType::from(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert!(ElementType::from(0x14).is_none());
        assert!(ElementType::from(0x7E).is_none());
    }

    #[test]
    fn reserved_subtype_range_rejected() {
        for t in 0x08u8..=0x7F {
            assert!(BinarySubtype::from_u8(t).is_err());
        }
    }

    #[test]
    fn well_known_and_user_defined_subtypes_accepted() {
        for t in [0x00u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07] {
            assert!(BinarySubtype::from_u8(t).is_ok());
        }
        for t in 0x80u8..=0xFF {
            assert!(BinarySubtype::from_u8(t).is_ok());
        }
    }
}
