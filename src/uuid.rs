//! UUID support for BSON.
//!
//! The BSON format represents UUIDs as a Binary value with subtype 0x04. This module provides a
//! [`Uuid`] newtype wrapping the `uuid` crate's type so that conversions to and from [`Binary`]
//! always land on the correct subtype, plus a [`UuidRepresentation`] enum covering the legacy
//! byte orderings used by older drivers.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::{
    error::{Error, Result},
    spec::BinarySubtype,
    Binary,
};

/// A struct modeling a BSON UUID value (i.e. a Binary value with subtype 4).
#[derive(Clone, Copy, PartialEq, Hash, Eq, PartialOrd, Ord)]
pub struct Uuid {
    uuid: uuid::Uuid,
}

impl Uuid {
    /// Creates a random UUID.
    ///
    /// This uses the operating system's RNG as the source of random numbers. If you'd like to use
    /// a custom generator, generate random bytes and pass them to [`Uuid::from_bytes`] instead.
    pub fn new() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4(),
        }
    }

    /// Creates a [`Uuid`] using the supplied bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self::from_external_uuid(uuid::Uuid::from_bytes(bytes))
    }

    /// Creates a [`Uuid`] from the provided hex string.
    pub fn parse_str(input: impl AsRef<str>) -> Result<Self> {
        let uuid = uuid::Uuid::parse_str(input.as_ref()).map_err(Error::invalid_uuid_string)?;
        Ok(Self::from_external_uuid(uuid))
    }

    pub(crate) const fn from_external_uuid(uuid: uuid::Uuid) -> Self {
        Self { uuid }
    }

    /// Returns an array of 16 bytes containing the [`Uuid`]'s data.
    pub const fn bytes(self) -> [u8; 16] {
        *self.uuid.as_bytes()
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uuid.fmt(f)
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.uuid, f)
    }
}

impl From<uuid::Uuid> for Uuid {
    fn from(u: uuid::Uuid) -> Self {
        Self::from_external_uuid(u)
    }
}

impl From<Uuid> for uuid::Uuid {
    fn from(u: Uuid) -> Self {
        u.uuid
    }
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl From<Uuid> for Binary {
    fn from(uuid: Uuid) -> Self {
        Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.bytes().to_vec(),
        }
    }
}

/// Enum of the possible representations to use when converting between [`Uuid`] and [`Binary`].
/// This enum is necessary because different drivers historically encoded UUIDs with different
/// byte orderings under BSON subtype 0x03 (UUID old). If a UUID has been serialized with a
/// particular representation, it MUST be deserialized with the same representation.
#[non_exhaustive]
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum UuidRepresentation {
    /// The canonical representation of UUIDs in BSON (binary with subtype 0x04).
    Standard,
    /// The legacy representation used by the C# driver (binary subtype 0x03).
    CSharpLegacy,
    /// The legacy representation used by the Java driver (binary subtype 0x03).
    JavaLegacy,
    /// The legacy representation used by the Python driver: the same byte order as
    /// [`UuidRepresentation::Standard`], but under binary subtype 0x03.
    PythonLegacy,
}

impl Binary {
    /// Serializes a [`Uuid`] into BSON [`Binary`] type, using the standard representation
    /// (subtype 0x04).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Binary::from(uuid)
    }

    /// Serializes a [`Uuid`] into BSON binary type using the requested representation.
    /// `Binary::from_uuid_with_representation(uuid, UuidRepresentation::Standard)` is
    /// equivalent to `Binary::from_uuid(uuid)`.
    pub fn from_uuid_with_representation(uuid: Uuid, rep: UuidRepresentation) -> Self {
        match rep {
            UuidRepresentation::Standard => Binary::from_uuid(uuid),
            UuidRepresentation::CSharpLegacy => {
                let mut bytes = uuid.bytes().to_vec();
                bytes[0..4].reverse();
                bytes[4..6].reverse();
                bytes[6..8].reverse();
                Binary {
                    subtype: BinarySubtype::UuidOld,
                    bytes,
                }
            }
            UuidRepresentation::PythonLegacy => Binary {
                subtype: BinarySubtype::UuidOld,
                bytes: uuid.bytes().to_vec(),
            },
            UuidRepresentation::JavaLegacy => {
                let mut bytes = uuid.bytes().to_vec();
                bytes[0..8].reverse();
                bytes[8..16].reverse();
                Binary {
                    subtype: BinarySubtype::UuidOld,
                    bytes,
                }
            }
        }
    }

    /// Deserializes a BSON [`Binary`] type into a [`Uuid`] according to the provided
    /// representation. If the representation does not match the [`Binary`]'s subtype, an error
    /// is returned.
    pub fn to_uuid_with_representation(&self, rep: UuidRepresentation) -> Result<Uuid> {
        let expected_subtype = if rep == UuidRepresentation::Standard {
            BinarySubtype::Uuid
        } else {
            BinarySubtype::UuidOld
        };
        if self.subtype != expected_subtype {
            return Err(Error::uuid_representation_mismatch(
                rep,
                self.subtype,
                expected_subtype,
            ));
        }
        if self.bytes.len() != 16 {
            return Err(Error::invalid_uuid_length(self.bytes.len()));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.bytes);
        Ok(match rep {
            UuidRepresentation::Standard | UuidRepresentation::PythonLegacy => {
                Uuid::from_bytes(buf)
            }
            UuidRepresentation::CSharpLegacy => {
                buf[0..4].reverse();
                buf[4..6].reverse();
                buf[6..8].reverse();
                Uuid::from_bytes(buf)
            }
            UuidRepresentation::JavaLegacy => {
                buf[0..8].reverse();
                buf[8..16].reverse();
                Uuid::from_bytes(buf)
            }
        })
    }

    /// Deserializes a BSON [`Binary`] type into a [`Uuid`] using the standard representation.
    pub fn to_uuid(&self) -> Result<Uuid> {
        self.to_uuid_with_representation(UuidRepresentation::Standard)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn standard_round_trip() {
        let uuid = Uuid::new();
        let bin = Binary::from_uuid(uuid);
        assert_eq!(bin.subtype, BinarySubtype::Uuid);
        assert_eq!(bin.to_uuid().unwrap(), uuid);
    }

    #[test]
    fn representation_mismatch_is_rejected() {
        let uuid = Uuid::new();
        let bin = Binary::from_uuid(uuid);
        assert!(bin
            .to_uuid_with_representation(UuidRepresentation::PythonLegacy)
            .is_err());
    }

    #[test]
    fn legacy_representations_round_trip() {
        let uuid = Uuid::new();
        for rep in [
            UuidRepresentation::CSharpLegacy,
            UuidRepresentation::JavaLegacy,
            UuidRepresentation::PythonLegacy,
        ] {
            let bin = Binary::from_uuid_with_representation(uuid, rep);
            assert_eq!(bin.subtype, BinarySubtype::UuidOld);
            assert_eq!(bin.to_uuid_with_representation(rep).unwrap(), uuid);
        }
    }

    #[test]
    fn invalid_length_is_rejected() {
        let bin = Binary {
            subtype: BinarySubtype::Uuid,
            bytes: vec![1, 2, 3],
        };
        assert!(bin.to_uuid().is_err());
    }
}
