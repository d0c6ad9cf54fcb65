//! Validation for BSON keys, which the wire format stores as C-strings.

use crate::error::{Error, Result};

/// Checks that `key` contains no embedded NUL byte, as required for a BSON key or string value
/// to be written as a C-string on the wire.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.as_bytes().contains(&0) {
        return Err(Error::invalid_argument(format!(
            "key contains an embedded NUL byte: {key:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_embedded_nul() {
        assert!(validate_key("foo\0bar").is_err());
    }

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("foo.bar").is_ok());
    }
}
