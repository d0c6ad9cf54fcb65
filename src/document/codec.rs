//! Encoding values and elements into a byte buffer.

use crate::{
    bson::{Bson, Timestamp},
    cstr::validate_key,
    error::Result,
    spec::BinarySubtype,
};

fn write_cstring(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

fn write_bson_string(buf: &mut Vec<u8>, s: &str) {
    let len = s.len() as i32 + 1;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Appends the payload bytes (not the tag or key) for `value` to `buf`.
pub(crate) fn encode_value(buf: &mut Vec<u8>, value: &Bson) {
    match value {
        Bson::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Bson::String(v) => write_bson_string(buf, v),
        Bson::Array(items) => {
            let mut doc = crate::document::Document::new();
            for (i, item) in items.iter().enumerate() {
                doc.set(i.to_string(), item.clone())
                    .expect("array index keys never exceed document size limits in practice");
            }
            buf.extend_from_slice(doc.as_bytes());
        }
        Bson::Document(doc) => buf.extend_from_slice(doc.as_bytes()),
        Bson::Boolean(v) => buf.push(if *v { 1 } else { 0 }),
        Bson::Null => {}
        Bson::RegularExpression(re) => {
            let mut chars: Vec<char> = re.options.chars().collect();
            chars.sort_unstable();
            let sorted: String = chars.into_iter().collect();
            write_cstring(buf, &re.pattern);
            write_cstring(buf, &sorted);
        }
        Bson::JavaScriptCode(code) => write_bson_string(buf, code),
        Bson::JavaScriptCodeWithScope(cws) => {
            let mut body = Vec::new();
            write_bson_string(&mut body, &cws.code);
            body.extend_from_slice(cws.scope.as_bytes());
            let total = (4 + body.len()) as i32;
            buf.extend_from_slice(&total.to_le_bytes());
            buf.extend_from_slice(&body);
        }
        Bson::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Bson::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Bson::Timestamp(Timestamp { time, increment }) => {
            buf.extend_from_slice(&increment.to_le_bytes());
            buf.extend_from_slice(&time.to_le_bytes());
        }
        Bson::Binary(bin) => {
            if matches!(bin.subtype, BinarySubtype::BinaryOld) {
                let inner_len = bin.bytes.len() as i32;
                let outer_len = inner_len + 4;
                buf.extend_from_slice(&outer_len.to_le_bytes());
                buf.push(u8::from(bin.subtype));
                buf.extend_from_slice(&inner_len.to_le_bytes());
                buf.extend_from_slice(&bin.bytes);
            } else {
                let len = bin.bytes.len() as i32;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.push(u8::from(bin.subtype));
                buf.extend_from_slice(&bin.bytes);
            }
        }
        Bson::ObjectId(oid) => buf.extend_from_slice(&oid.bytes()),
        Bson::DateTime(dt) => buf.extend_from_slice(&dt.timestamp_millis().to_le_bytes()),
        Bson::Symbol(v) => write_bson_string(buf, v),
        Bson::Decimal128(d) => buf.extend_from_slice(&d.bytes()),
        Bson::Undefined => {}
        Bson::MaxKey => {}
        Bson::MinKey => {}
        Bson::DbPointer(ptr) => {
            write_bson_string(buf, &ptr.namespace);
            buf.extend_from_slice(&ptr.id.bytes());
        }
    }
}

/// Builds a full `(tag, key, value)` element, ready to be appended or spliced into a document
/// buffer.
pub(crate) fn encode_element(key: &str, value: &Bson) -> Result<Vec<u8>> {
    validate_key(key)?;
    let mut buf = Vec::new();
    buf.push(value.element_type().tag());
    write_cstring(&mut buf, key);
    encode_value(&mut buf, value);
    Ok(buf)
}
