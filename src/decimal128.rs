//! Module containing functionality related to BSON Decimal128.

use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

use crate::error::{Decimal128ErrorKind, Error, Result};

const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MAX: i32 = 6111;
const EXPONENT_MIN: i32 = -6176;
const MAX_DIGITS: usize = 34;

/// A BSON Decimal128 value, stored as its raw 16-byte IEEE 754-2008 decimal128 interchange
/// representation (little-endian: the low 64 bits first, then the high 64 bits).
///
/// This type does not support arithmetic; it exists to parse, carry, and format decimal text
/// without the double rounding that binary floating point would introduce.
#[derive(Clone, Copy, PartialEq)]
pub struct Decimal128 {
    bytes: [u8; 16],
}

struct Parts {
    sign: bool,
    digits: Vec<u8>,
    exponent: i32,
}

impl Decimal128 {
    /// Constructs a new [`Decimal128`] from its raw byte representation, in which the first 8
    /// bytes are the little-endian low 64 bits and the second 8 are the little-endian high 64
    /// bits.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Returns the raw byte representation of this [`Decimal128`].
    pub const fn bytes(&self) -> [u8; 16] {
        self.bytes
    }

    fn low(&self) -> u64 {
        u64::from_le_bytes(self.bytes[0..8].try_into().unwrap())
    }

    fn high(&self) -> u64 {
        u64::from_le_bytes(self.bytes[8..16].try_into().unwrap())
    }

    fn from_high_low(high: u64, low: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&low.to_le_bytes());
        bytes[8..16].copy_from_slice(&high.to_le_bytes());
        Self { bytes }
    }

    /// Parses a [`Decimal128`] from its string representation.
    pub fn parse_str(input: impl AsRef<str>) -> Result<Self> {
        let s = input.as_ref();
        let (sign, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => match s.strip_prefix('+') {
                Some(rest) => (false, rest),
                None => (false, s),
            },
        };

        if rest.is_empty() {
            return Err(Error::decimal128(Decimal128ErrorKind::Unparseable {}));
        }

        if rest.eq_ignore_ascii_case("nan") {
            return Ok(Self::from_high_low(
                if sign { 0xFC00000000000000 } else { 0x7C00000000000000 },
                0,
            ));
        }
        if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
            let high = if sign { 0xF800000000000000 } else { 0x7800000000000000 };
            return Ok(Self::from_high_low(high, 0));
        }

        let parts = Self::parse_finite(rest, sign)?;
        Self::encode(parts)
    }

    fn parse_finite(rest: &str, sign: bool) -> Result<Parts> {
        let mut chars = rest.chars().peekable();
        let mut digits: Vec<u8> = Vec::new();
        let mut exponent = 0i32;
        let mut seen_point = false;
        let mut seen_digit = false;

        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c as u8 - b'0');
                seen_digit = true;
                if seen_point {
                    exponent -= 1;
                }
                chars.next();
            } else if c == '.' && !seen_point {
                seen_point = true;
                chars.next();
            } else {
                break;
            }
        }

        if !seen_digit {
            return Err(Error::decimal128(Decimal128ErrorKind::Unparseable {}));
        }

        if let Some(&c) = chars.peek() {
            if c == 'e' || c == 'E' {
                chars.next();
                let exp_str: String = chars.collect();
                if exp_str.is_empty() {
                    return Err(Error::decimal128(Decimal128ErrorKind::EmptyExponent {}));
                }
                let e: i32 = exp_str
                    .parse()
                    .map_err(|_| Error::decimal128(Decimal128ErrorKind::InvalidExponent {}))?;
                exponent += e;
            } else {
                return Err(Error::decimal128(Decimal128ErrorKind::Unparseable {}));
            }
        }

        // Strip leading zeros, keeping a single digit if the value is all zero.
        while digits.len() > 1 && digits[0] == 0 {
            digits.remove(0);
        }

        if digits.len() > MAX_DIGITS * 2 {
            // Pathological input; no amount of trimming will make this fit.
            return Err(Error::decimal128(Decimal128ErrorKind::InvalidCoefficient {}));
        }

        Ok(Parts {
            sign,
            digits,
            exponent,
        })
    }

    fn encode(mut parts: Parts) -> Result<Self> {
        let is_zero = parts.digits.iter().all(|&d| d == 0);

        if parts.exponent > EXPONENT_MAX {
            while parts.exponent > EXPONENT_MAX && parts.digits.len() < MAX_DIGITS {
                parts.digits.push(0);
                parts.exponent -= 1;
            }
            if parts.exponent > EXPONENT_MAX {
                return Err(Error::decimal128(Decimal128ErrorKind::Overflow {}));
            }
        }

        if parts.exponent < EXPONENT_MIN {
            while parts.exponent < EXPONENT_MIN
                && parts.digits.len() > 1
                && *parts.digits.last().unwrap() == 0
            {
                parts.digits.pop();
                parts.exponent += 1;
            }
            if parts.exponent < EXPONENT_MIN {
                if is_zero {
                    parts.exponent = EXPONENT_MIN;
                } else {
                    return Err(Error::decimal128(Decimal128ErrorKind::Underflow {}));
                }
            }
        }

        if parts.digits.len() > MAX_DIGITS {
            return Err(Error::decimal128(Decimal128ErrorKind::Overflow {}));
        }

        let significand = parts
            .digits
            .iter()
            .fold(0u128, |acc, &d| acc * 10 + d as u128);

        let biased_exponent = (parts.exponent + EXPONENT_BIAS) as u64;
        let significand_high = (significand >> 64) as u64;
        let significand_low = significand as u64;

        if significand_high > 0x1_FFFF_FFFF_FFFF {
            // Would require the alternate "large significand" combination-field encoding; this
            // cannot happen for a coefficient of at most 34 decimal digits.
            return Err(Error::internal(
                "decimal128 significand overflowed the 113-bit field",
            ));
        }

        let mut high = (biased_exponent & 0x3FFF) << 49 | significand_high;
        if parts.sign {
            high |= 0x8000_0000_0000_0000;
        }

        Ok(Self::from_high_low(high, significand_low))
    }

    /// If this value represents an exact, in-range integer, returns it.
    pub(crate) fn to_i64(&self) -> Option<i64> {
        let decoded = self.decode()?;
        if decoded.exponent != 0 {
            // Normalize by shifting the decimal point; bail if that would lose digits or
            // overflow i64.
            return None;
        }
        let mut value: i64 = 0;
        for &d in &decoded.digits {
            value = value.checked_mul(10)?.checked_add(d as i64)?;
        }
        Some(if decoded.sign { -value } else { value })
    }

    fn decode(&self) -> Option<Parts> {
        let high = self.high();
        let low = self.low();
        let sign = (high >> 63) & 1 != 0;
        let combination = (high >> 58) & 0x1F;
        if combination & 0x1E == 0x1E {
            // Infinity or NaN: no finite decomposition.
            return None;
        }

        // The top two bits of the combination field (G0 G1) select the significand layout:
        // `11` is the alternate "large significand" form, where the leading coefficient
        // nibble is the implicit `100x` rather than stored directly, freeing up two bits for
        // the exponent to shift up by two positions.
        let (biased_exponent, significand_high) = if (combination >> 3) & 0b11 == 0b11 {
            let biased_exponent = ((high >> 47) & 0x3FFF) as i32;
            let significand_high = 0x0008_0000_0000_0000 | (high & 0x0000_7FFF_FFFF_FFFF);
            (biased_exponent, significand_high)
        } else {
            let biased_exponent = ((high >> 49) & 0x3FFF) as i32;
            let significand_high = high & 0x0001_FFFF_FFFF_FFFF;
            (biased_exponent, significand_high)
        };

        let mut significand = (significand_high as u128) << 64 | low as u128;
        if significand >= 10u128.pow(34) {
            // Non-canonical significand; IEEE 754 mandates treating it as zero.
            significand = 0;
        }

        let exponent = biased_exponent - EXPONENT_BIAS;
        let mut digits: Vec<u8> = significand
            .to_string()
            .bytes()
            .map(|b| b - b'0')
            .collect();
        if digits.is_empty() {
            digits.push(0);
        }

        Some(Parts {
            sign,
            digits,
            exponent,
        })
    }
}

impl Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let high = self.high();
        let combination = (high >> 58) & 0x1F;
        if combination & 0x1E == 0x1E {
            return if combination == 0x1F {
                write!(f, "NaN")
            } else {
                let sign = (high >> 63) & 1 != 0;
                write!(f, "{}Infinity", if sign { "-" } else { "" })
            };
        }

        let parts = self.decode().expect("already checked for special values");
        if parts.sign {
            write!(f, "-")?;
        }

        let digit_count = parts.digits.len() as i32;
        let adjusted_exponent = parts.exponent + digit_count - 1;

        if parts.exponent > 0 || adjusted_exponent < -6 {
            let digit_str: String = parts.digits.iter().map(|d| (d + b'0') as char).collect();
            if digit_count > 1 {
                write!(f, "{}.{}", &digit_str[..1], &digit_str[1..])?;
            } else {
                write!(f, "{digit_str}")?;
            }
            write!(f, "E{}{}", if adjusted_exponent >= 0 { "+" } else { "" }, adjusted_exponent)
        } else {
            let point_from_right = (-parts.exponent) as usize;
            let digit_str: String = parts.digits.iter().map(|d| (d + b'0') as char).collect();
            match point_from_right.cmp(&(digit_str.len())) {
                Ordering::Less => {
                    let split = digit_str.len() - point_from_right;
                    if point_from_right == 0 {
                        write!(f, "{digit_str}")
                    } else {
                        write!(f, "{}.{}", &digit_str[..split], &digit_str[split..])
                    }
                }
                _ => {
                    let zeros = point_from_right - digit_str.len();
                    write!(f, "0.{}{}", "0".repeat(zeros), digit_str)
                }
            }
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128(\"{self}\")")
    }
}

impl FromStr for Decimal128 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_fixed_point_round_trips() {
        let d = Decimal128::parse_str("0.000001234").unwrap();
        assert_eq!(d.to_string(), "0.000001234");
    }

    #[test]
    fn integer_round_trips() {
        let d = Decimal128::parse_str("123").unwrap();
        assert_eq!(d.to_string(), "123");
        assert_eq!(d.to_i64(), Some(123));
    }

    #[test]
    fn negative_round_trips() {
        let d = Decimal128::parse_str("-123.45").unwrap();
        assert_eq!(d.to_string(), "-123.45");
    }

    #[test]
    fn scientific_round_trips() {
        let d = Decimal128::parse_str("1.5E+10").unwrap();
        assert_eq!(d.to_string(), "1.5E+10");
    }

    #[test]
    fn overflow_exponent_is_rejected() {
        let err = Decimal128::parse_str("1E+6176").unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::Decimal128 {
                kind: Decimal128ErrorKind::Overflow {}
            }
        ));
    }

    #[test]
    fn zero_clamps_to_emin() {
        let d = Decimal128::parse_str("0E-6177").unwrap();
        assert_eq!(d.to_string(), "0E-6176");
    }

    #[test]
    fn special_values_format() {
        assert_eq!(Decimal128::parse_str("NaN").unwrap().to_string(), "NaN");
        assert_eq!(
            Decimal128::parse_str("Infinity").unwrap().to_string(),
            "Infinity"
        );
        assert_eq!(
            Decimal128::parse_str("-Infinity").unwrap().to_string(),
            "-Infinity"
        );
    }

    #[test]
    fn alternate_form_combination_field_decodes_as_finite() {
        // Combination field 0b11000 (24): G0 G1 == 11 selects the large-significand layout,
        // distinct from the 0b11110/0b11111 (30/31) Inf/NaN patterns.
        let high = 0b11000u64 << 58;
        let d = Decimal128::from_high_low(high, 0);
        let rendered = d.to_string();
        assert!(rendered != "NaN" && !rendered.contains("Infinity"));
    }
}
