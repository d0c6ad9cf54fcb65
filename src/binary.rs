//! Module containing functionality related to BSON binary values.

use std::fmt::{self, Display};

use crate::{
    base64,
    error::{Error, Result},
    spec::BinarySubtype,
};

/// Represents a BSON binary value.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Binary {
    /// The subtype of the bytes.
    pub subtype: BinarySubtype,

    /// The binary bytes.
    pub bytes: Vec<u8>,
}

impl Display for Binary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Binary({:#x}, {})",
            u8::from(self.subtype),
            base64::encode(&self.bytes)
        )
    }
}

impl Binary {
    /// Creates a [`Binary`] from a base64 string and optional [`BinarySubtype`]. If the
    /// `subtype` argument is [`None`], the [`Binary`] constructed will default to
    /// [`BinarySubtype::Generic`].
    ///
    /// ```rust
    /// # use bsonx::{Binary, error::Result};
    /// # fn example() -> Result<()> {
    /// let input = bsonx::base64::encode("hello");
    /// let binary = Binary::from_base64(input, None)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_base64(
        input: impl AsRef<str>,
        subtype: impl Into<Option<BinarySubtype>>,
    ) -> Result<Self> {
        let bytes = base64::decode(input.as_ref()).map_err(Error::binary)?;
        let subtype = match subtype.into() {
            Some(s) => s,
            None => BinarySubtype::Generic,
        };
        Ok(Binary { subtype, bytes })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_base64_defaults_to_generic() {
        let encoded = base64::encode("hello");
        let bin = Binary::from_base64(encoded, None).unwrap();
        assert_eq!(bin.subtype, BinarySubtype::Generic);
        assert_eq!(bin.bytes, b"hello");
    }

    #[test]
    fn display_matches_subtype_and_base64() {
        let bin = Binary {
            subtype: BinarySubtype::Md5,
            bytes: vec![1, 2, 3],
        };
        assert_eq!(format!("{bin}"), "Binary(0x5, AQID)");
    }
}
