//! Byte-level scanning over a document's buffer: reading one element's key, tag, and value span
//! without requiring the whole document to have been validated up front.

use crate::{
    bson::{Bson, DbPointer, JavaScriptCodeWithScope, Regex, Timestamp},
    document::Document,
    error::{Error, Result},
    oid::ObjectId,
    spec::{BinarySubtype, ElementType},
    Binary,
    DateTime,
    Decimal128,
};

/// One scanned element: its key, type tag, and the byte span of its value (not including the
/// tag byte or key C-string).
pub(crate) struct Element<'a> {
    pub(crate) key: &'a str,
    pub(crate) kind: ElementType,
    pub(crate) value_start: usize,
    pub(crate) value_len: usize,
}

impl<'a> Element<'a> {
    /// The byte offset of this element's tag byte.
    pub(crate) fn start(&self) -> usize {
        self.value_start - self.key.len() - 2
    }

    /// The byte offset one past the end of this element's value.
    pub(crate) fn end(&self) -> usize {
        self.value_start + self.value_len
    }
}

/// Reads a NUL-terminated, UTF-8 C-string starting at `pos`. Returns the string and the offset
/// of the byte just past the terminator.
pub(crate) fn read_cstring(data: &[u8], pos: usize) -> Result<(&str, usize)> {
    let nul = data[pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::malformed_bytes("cstring is missing its NUL terminator"))?;
    let s = simdutf8::basic::from_utf8(&data[pos..pos + nul])
        .map_err(|_| Error::malformed_bytes("cstring is not valid UTF-8"))?;
    Ok((s, pos + nul + 1))
}

fn read_i32(data: &[u8], pos: usize) -> Result<i32> {
    let bytes: [u8; 4] = data
        .get(pos..pos + 4)
        .ok_or_else(|| Error::malformed_bytes("truncated i32"))?
        .try_into()
        .unwrap();
    Ok(i32::from_le_bytes(bytes))
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32> {
    read_i32(data, pos).map(|v| v as u32)
}

fn read_i64(data: &[u8], pos: usize) -> Result<i64> {
    let bytes: [u8; 8] = data
        .get(pos..pos + 8)
        .ok_or_else(|| Error::malformed_bytes("truncated i64"))?
        .try_into()
        .unwrap();
    Ok(i64::from_le_bytes(bytes))
}

/// The number of bytes occupied by a value of the given `kind` starting at `value_start`,
/// computed from fixed widths or length-prefix bytes alone, without decoding the payload.
pub(crate) fn element_value_len(kind: ElementType, data: &[u8], value_start: usize) -> Result<usize> {
    use ElementType::*;
    let len = match kind {
        Boolean => {
            let b = *data
                .get(value_start)
                .ok_or_else(|| Error::malformed_bytes("truncated bool"))?;
            if b > 1 {
                return Err(Error::malformed_bytes("boolean byte was neither 0 nor 1"));
            }
            1
        }
        Int32 => 4,
        Int64 | DateTime | Double | Timestamp => 8,
        ObjectId => 12,
        Decimal128 => 16,
        Null | Undefined | MinKey | MaxKey => 0,
        String | Symbol | JavaScriptCode => {
            let declared = read_i32(data, value_start)?;
            if declared < 1 {
                return Err(Error::malformed_bytes("string length must be at least 1"));
            }
            4 + declared as usize
        }
        EmbeddedDocument | Array => {
            let declared = read_i32(data, value_start)?;
            if declared < 5 {
                return Err(Error::malformed_bytes("document length too small"));
            }
            declared as usize
        }
        Binary => {
            let declared = read_i32(data, value_start)?;
            if declared < 0 {
                return Err(Error::malformed_bytes("negative binary length"));
            }
            4 + 1 + declared as usize
        }
        RegularExpression => {
            let (pattern, after_pattern) = read_cstring(data, value_start)?;
            let (options, after_options) = read_cstring(data, after_pattern)?;
            let _ = (pattern, options);
            after_options - value_start
        }
        DbPointer => {
            let declared = read_i32(data, value_start)?;
            if declared < 1 {
                return Err(Error::malformed_bytes("dbpointer namespace length must be at least 1"));
            }
            4 + declared as usize + 12
        }
        JavaScriptCodeWithScope => {
            let declared = read_i32(data, value_start)?;
            if declared < 14 {
                return Err(Error::malformed_bytes(
                    "code-with-scope length must be at least 14",
                ));
            }
            declared as usize
        }
    };
    if value_start + len > data.len() {
        return Err(Error::malformed_bytes("value runs past end of buffer"));
    }
    Ok(len)
}

fn read_bson_string(data: &[u8], value_start: usize) -> Result<String> {
    let declared = read_i32(data, value_start)? as usize;
    let bytes = &data[value_start + 4..value_start + 4 + declared];
    if bytes[declared - 1] != 0 {
        return Err(Error::malformed_bytes("string is not NUL-terminated"));
    }
    simdutf8::basic::from_utf8(&bytes[..declared - 1])
        .map(str::to_owned)
        .map_err(|_| Error::malformed_bytes("string is not valid UTF-8"))
}

/// Fully decodes the value of the given `kind` starting at `value_start`, whose size has
/// already been determined to be `value_len` bytes.
pub(crate) fn decode_value(
    kind: ElementType,
    data: &[u8],
    value_start: usize,
    value_len: usize,
) -> Result<Bson> {
    use ElementType::*;
    Ok(match kind {
        Double => Bson::Double(f64::from_le_bytes(
            data[value_start..value_start + 8].try_into().unwrap(),
        )),
        String => Bson::String(read_bson_string(data, value_start)?),
        Symbol => Bson::Symbol(read_bson_string(data, value_start)?),
        JavaScriptCode => Bson::JavaScriptCode(read_bson_string(data, value_start)?),
        EmbeddedDocument => {
            Bson::Document(Document::from_bytes_unchecked(
                data[value_start..value_start + value_len].to_vec(),
            )?)
        }
        Array => {
            let doc = Document::from_bytes_unchecked(
                data[value_start..value_start + value_len].to_vec(),
            )?;
            Bson::Array(doc.values().collect())
        }
        Binary => {
            let declared = read_i32(data, value_start)? as usize;
            let subtype = BinarySubtype::from(data[value_start + 4]);
            let payload_start = value_start + 5;
            let bytes = if matches!(subtype, BinarySubtype::BinaryOld) {
                let inner = read_i32(data, payload_start)? as usize;
                if inner + 4 != declared {
                    return Err(Error::malformed_bytes(
                        "binary subtype 0x02 inner length does not match outer length",
                    ));
                }
                data[payload_start + 4..payload_start + 4 + inner].to_vec()
            } else {
                data[payload_start..payload_start + declared].to_vec()
            };
            Bson::Binary(Binary { subtype, bytes })
        }
        Undefined => Bson::Undefined,
        ObjectId => {
            let mut bytes = [0u8; 12];
            bytes.copy_from_slice(&data[value_start..value_start + 12]);
            Bson::ObjectId(ObjectId::from_bytes(bytes))
        }
        Boolean => Bson::Boolean(data[value_start] == 1),
        DateTime => Bson::DateTime(DateTime::from_millis(read_i64(data, value_start)?)),
        Null => Bson::Null,
        RegularExpression => {
            let (pattern, after_pattern) = read_cstring(data, value_start)?;
            let (options, _) = read_cstring(data, after_pattern)?;
            Bson::RegularExpression(Regex {
                pattern: pattern.to_owned(),
                options: options.to_owned(),
            })
        }
        DbPointer => {
            let declared = read_i32(data, value_start)? as usize;
            let namespace_bytes = &data[value_start + 4..value_start + 4 + declared];
            if namespace_bytes[declared - 1] != 0 {
                return Err(Error::malformed_bytes("dbpointer namespace is not NUL-terminated"));
            }
            let namespace = simdutf8::basic::from_utf8(&namespace_bytes[..declared - 1])
                .map_err(|_| Error::malformed_bytes("dbpointer namespace is not valid UTF-8"))?
                .to_owned();
            let oid_start = value_start + 4 + declared;
            let mut oid_bytes = [0u8; 12];
            oid_bytes.copy_from_slice(&data[oid_start..oid_start + 12]);
            Bson::DbPointer(DbPointer {
                namespace,
                id: ObjectId::from_bytes(oid_bytes),
            })
        }
        JavaScriptCodeWithScope => {
            let code = read_bson_string(data, value_start + 4)?;
            let code_len = 4 + code.len() + 1;
            let scope_start = value_start + 4 + code_len;
            let scope = Document::from_bytes_unchecked(
                data[scope_start..value_start + value_len].to_vec(),
            )?;
            Bson::JavaScriptCodeWithScope(crate::bson::JavaScriptCodeWithScope { code, scope })
        }
        Int32 => Bson::Int32(read_i32(data, value_start)?),
        Timestamp => {
            let increment = read_u32(data, value_start)?;
            let time = read_u32(data, value_start + 4)?;
            Bson::Timestamp(Timestamp { time, increment })
        }
        Int64 => Bson::Int64(read_i64(data, value_start)?),
        Decimal128 => {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&data[value_start..value_start + 16]);
            Bson::Decimal128(Decimal128::from_bytes(bytes))
        }
        MaxKey => Bson::MaxKey,
        MinKey => Bson::MinKey,
    })
}

/// Reads the element (if any) whose tag byte sits at `pos`. Returns `Ok(None)` if `pos` points
/// at the document's terminating `0x00`.
pub(crate) fn next_element(data: &[u8], pos: usize) -> Result<Option<Element<'_>>> {
    let tag = *data
        .get(pos)
        .ok_or_else(|| Error::malformed_bytes("truncated element header"))?;
    if tag == 0 {
        return Ok(None);
    }
    let kind = ElementType::from(tag)
        .ok_or_else(|| Error::malformed_bytes(format!("unknown element type tag {tag:#04x}")))?;
    let (key, value_start) = read_cstring(data, pos + 1)?;
    let value_len = element_value_len(kind, data, value_start)?;
    Ok(Some(Element {
        key,
        kind,
        value_start,
        value_len,
    }))
}

/// A forward iterator over a document's `(key, value)` pairs, positioned at byte offset 4 (past
/// the length prefix) on construction. Malformed bytes cause iteration to stop and yield `None`
/// rather than panicking; this is the lazy counterpart to full document validation.
pub struct Iter<'a> {
    data: &'a [u8],
    pos: usize,
    valid: bool,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 4,
            valid: true,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (String, Bson);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.valid {
            return None;
        }
        match next_element(self.data, self.pos) {
            Ok(Some(element)) => {
                let value = match decode_value(
                    element.kind,
                    self.data,
                    element.value_start,
                    element.value_len,
                ) {
                    Ok(v) => v,
                    Err(_) => {
                        self.valid = false;
                        return None;
                    }
                };
                let key = element.key.to_owned();
                self.pos = element.end();
                Some((key, value))
            }
            Ok(None) => {
                self.valid = false;
                None
            }
            Err(_) => {
                self.valid = false;
                None
            }
        }
    }
}
