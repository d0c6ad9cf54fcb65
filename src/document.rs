//! A BSON document represented as a single contiguous, self-describing byte buffer.
//!
//! Unlike a map-backed representation, a [`Document`] *is* its wire bytes: reads scan the buffer
//! directly and writes splice new element bytes into place. This keeps `to_bytes` a no-op and
//! makes `from_bytes`/`to_bytes` bit-exact round trips by construction.

mod codec;
pub(crate) mod iter;

use std::{
    fmt::{self, Debug},
    io::{Read, Write},
    iter::FromIterator,
};

use crate::{
    bson::Bson,
    cstr::validate_key,
    document::iter::{next_element, Element},
    error::{Error, Result},
    oid::ObjectId,
};

pub use iter::Iter;

const EMPTY: [u8; 5] = [5, 0, 0, 0, 0];

/// An ordered, byte-backed BSON document.
///
/// A `Document` owns a single `Vec<u8>` holding its full wire representation, including the
/// 4-byte length prefix and the trailing `0x00`. Lookups and iteration scan this buffer; they
/// never panic on corrupt bytes, instead treating a decoding failure as "nothing more to find".
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
}

impl Document {
    /// Constructs a new, empty document.
    pub fn new() -> Self {
        Self {
            bytes: EMPTY.to_vec(),
        }
    }

    /// Parses and fully validates `bytes` as a BSON document: the outer length prefix must match
    /// the buffer, every element must decode without error, keys must be valid UTF-8 C-strings,
    /// no two keys may repeat, and nested documents and array element documents are validated
    /// recursively.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        validate(&bytes)?;
        Ok(Self { bytes })
    }

    /// Validates only the outer length prefix of `bytes`, deferring all element-level validation
    /// to whenever the document is iterated or queried. Useful when a sub-slice has already been
    /// bounds-checked by an enclosing document's own validation pass.
    pub fn from_bytes_unchecked(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        validate_outer_length(&bytes)?;
        Ok(Self { bytes })
    }

    /// Returns the wire bytes backing this document. This is always a valid, self-describing
    /// BSON document buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the document, returning its wire bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Reads and fully validates a single document from `reader`, using its own length prefix to
    /// know how many bytes to read.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let declared = i32::from_le_bytes(len_bytes);
        if declared < 5 {
            return Err(Error::invalid_argument(format!(
                "declared document length {declared} is smaller than the minimum of 5"
            )));
        }
        let mut bytes = Vec::with_capacity(declared as usize);
        bytes.extend_from_slice(&len_bytes);
        bytes.resize(declared as usize, 0);
        reader.read_exact(&mut bytes[4..])?;
        Self::from_bytes(bytes)
    }

    /// Writes this document's wire bytes to `writer`.
    pub fn to_writer(&self, mut writer: impl Write) -> Result<()> {
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    /// Returns the number of (key, value) pairs in this document. `O(n)`.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if this document has no elements.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() == EMPTY.len()
    }

    /// Looks up `key`, returning the first matching value if present. `O(n)`.
    pub fn get(&self, key: &str) -> Option<Bson> {
        find_element(&self.bytes, key).and_then(|element| {
            iter::decode_value(element.kind, &self.bytes, element.value_start, element.value_len)
                .ok()
        })
    }

    /// Returns `true` if `key` is present in this document.
    pub fn contains_key(&self, key: &str) -> bool {
        find_element(&self.bytes, key).is_some()
    }

    /// Returns an iterator over this document's keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over this document's values, in insertion order.
    pub fn values(&self) -> impl Iterator<Item = Bson> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Returns a forward iterator over this document's `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.bytes)
    }

    /// Sets `key` to `value`. If `key` is already present, its serialized element is spliced in
    /// place, preserving its position; otherwise the new element is appended just before the
    /// trailing `0x00`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bson>) -> Result<()> {
        let key = key.into();
        validate_key(&key)?;
        let value = value.into();
        let encoded = codec::encode_element(&key, &value)?;

        match find_element(&self.bytes, &key) {
            Some(element) => self.splice(element.start(), element.end(), &encoded),
            None => {
                let end = self.bytes.len() - 1;
                self.splice(end, end, &encoded)
            }
        }
    }

    /// Removes `key` if present, returning its value. Other keys' relative order is preserved.
    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        let element = find_element(&self.bytes, key)?;
        let value =
            iter::decode_value(element.kind, &self.bytes, element.value_start, element.value_len)
                .ok();
        let (start, end) = (element.start(), element.end());
        self.splice(start, end, &[])
            .expect("removing an element can only shrink a document");
        value
    }

    /// Returns a copy of this document with an [`ObjectId`] `_id` prepended, unless a `_id` key
    /// is already present, in which case the document is returned unchanged.
    pub fn with_id(&self) -> Result<Self> {
        if self.contains_key("_id") {
            return Ok(self.clone());
        }
        let encoded = codec::encode_element("_id", &Bson::ObjectId(ObjectId::new()))?;
        let mut copy = self.clone();
        copy.splice(4, 4, &encoded)?;
        Ok(copy)
    }

    /// Returns a new document containing only the entries for which `predicate` returns `true`.
    pub fn filter(&self, mut predicate: impl FnMut(&str, &Bson) -> bool) -> Self {
        let mut out = Document::new();
        for (k, v) in self.iter() {
            if predicate(&k, &v) {
                out.set(k, v).expect("filtering never grows a document past its source's size");
            }
        }
        out
    }

    /// Compares this document to `other` as multisets of (key, value) pairs, recursing into
    /// nested documents and arrays, ignoring top-level and nested key order.
    pub fn equals_ignoring_order(&self, other: &Self) -> bool {
        let mut ours: Vec<(String, Bson)> = self.iter().collect();
        let mut theirs: Vec<(String, Bson)> = other.iter().collect();
        if ours.len() != theirs.len() {
            return false;
        }
        ours.sort_by(|a, b| a.0.cmp(&b.0));
        theirs.sort_by(|a, b| a.0.cmp(&b.0));
        ours.into_iter()
            .zip(theirs)
            .all(|((k1, v1), (k2, v2))| k1 == k2 && values_equal_ignoring_order(&v1, &v2))
    }

    /// Renders this document as Canonical Extended JSON, wrapping every typed value in its
    /// `$`-prefixed wrapper object.
    pub fn to_canonical_extended_json(&self) -> serde_json::Value {
        crate::extjson::document_to_json(self, crate::extjson::Mode::Canonical)
    }

    /// Renders this document as Relaxed Extended JSON, using native JSON scalars wherever that
    /// can be done losslessly.
    pub fn to_relaxed_extended_json(&self) -> serde_json::Value {
        crate::extjson::document_to_json(self, crate::extjson::Mode::Relaxed)
    }

    /// Parses a document from its Extended JSON text representation (either Canonical or
    /// Relaxed, or a mix of the two).
    pub fn from_extended_json(json: &serde_json::Value) -> Result<Self> {
        crate::extjson::json_to_document(json)
    }

    /// Splices the byte range `[start, end)` out of the buffer and inserts `replacement` in its
    /// place, then rewrites the length prefix. `start == end` is a pure insertion; an empty
    /// `replacement` is a pure deletion.
    fn splice(&mut self, start: usize, end: usize, replacement: &[u8]) -> Result<()> {
        let mut out = Vec::with_capacity(self.bytes.len() - (end - start) + replacement.len());
        out.extend_from_slice(&self.bytes[4..start]);
        out.extend_from_slice(replacement);
        out.extend_from_slice(&self.bytes[end..self.bytes.len() - 1]);
        out.push(0);

        let new_len = out.len() + 4;
        if new_len > i32::MAX as usize {
            return Err(Error::document_too_large(new_len, i32::MAX as usize));
        }

        let mut bytes = Vec::with_capacity(new_len);
        bytes.extend_from_slice(&(new_len as i32).to_le_bytes());
        bytes.extend_from_slice(&out);
        self.bytes = bytes;
        Ok(())
    }
}

fn values_equal_ignoring_order(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Document(d1), Bson::Document(d2)) => d1.equals_ignoring_order(d2),
        (Bson::Array(a1), Bson::Array(a2)) => {
            a1.len() == a2.len()
                && a1
                    .iter()
                    .zip(a2)
                    .all(|(x, y)| values_equal_ignoring_order(x, y))
        }
        _ => a == b,
    }
}

fn find_element<'a>(data: &'a [u8], key: &str) -> Option<Element<'a>> {
    let mut pos = 4;
    loop {
        match next_element(data, pos) {
            Ok(Some(element)) => {
                if element.key == key {
                    return Some(element);
                }
                pos = element.end();
            }
            _ => return None,
        }
    }
}

fn validate_outer_length(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 5 {
        return Err(Error::invalid_argument("document buffer shorter than 5 bytes"));
    }
    let declared = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if declared < 5 || declared as usize != bytes.len() {
        return Err(Error::invalid_argument(format!(
            "declared document length {declared} does not match buffer length {}",
            bytes.len()
        )));
    }
    if bytes[bytes.len() - 1] != 0 {
        return Err(Error::invalid_argument("document is not NUL-terminated"));
    }
    Ok(())
}

fn validate(bytes: &[u8]) -> Result<()> {
    validate_outer_length(bytes)?;

    let mut seen = std::collections::HashSet::new();
    let mut pos = 4;
    while let Some(element) = next_element(bytes, pos).map_err(|e| {
        Error::invalid_argument(e.message.unwrap_or_else(|| "malformed element".into()))
    })? {
        if !seen.insert(element.key.to_owned()) {
            return Err(Error::invalid_argument(format!(
                "duplicate key {:?}",
                element.key
            )));
        }

        let value = iter::decode_value(element.kind, bytes, element.value_start, element.value_len)
            .map_err(|e| {
                Error::invalid_argument(e.message.unwrap_or_else(|| "malformed value".into()))
                    .with_key(element.key)
            })?;
        validate_nested(&value)?;

        pos = element.end();
    }

    Ok(())
}

fn validate_nested(value: &Bson) -> Result<()> {
    match value {
        Bson::Document(doc) => validate(&doc.bytes),
        Bson::Array(items) => {
            for item in items {
                validate_nested(item)?;
            }
            Ok(())
        }
        Bson::JavaScriptCodeWithScope(cws) => validate(&cws.scope.bytes),
        _ => Ok(()),
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Document {}

impl Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (String, Bson);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, Bson)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Bson)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.set(k, v).expect("literal document construction exceeded the size limit");
        }
        doc
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bson::Regex;

    #[test]
    fn empty_document_is_canonical_bytes() {
        let doc = Document::new();
        assert_eq!(doc.as_bytes(), &EMPTY);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut doc = Document::new();
        doc.set("a", 5i32).unwrap();
        assert_eq!(doc.get("a"), Some(Bson::Int32(5)));
    }

    #[test]
    fn set_on_absent_key_appends_last() {
        let mut doc = Document::new();
        doc.set("a", 1i32).unwrap();
        doc.set("b", 2i32).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn set_on_present_key_preserves_position() {
        let mut doc = Document::new();
        doc.set("a", 1i32).unwrap();
        doc.set("b", 2i32).unwrap();
        doc.set("a", 99i32).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(Bson::Int32(99)));
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut doc = Document::new();
        doc.set("a", 1i32).unwrap();
        doc.set("b", 2i32).unwrap();
        doc.set("c", 3i32).unwrap();
        doc.remove("b");
        assert!(!doc.contains_key("b"));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn with_id_prepends_when_absent() {
        let mut doc = Document::new();
        doc.set("a", 1i32).unwrap();
        let with_id = doc.with_id().unwrap();
        assert_eq!(with_id.keys().next().unwrap(), "_id");
        assert!(matches!(with_id.get("_id"), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn with_id_is_noop_when_present() {
        let mut doc = Document::new();
        doc.set("_id", 7i32).unwrap();
        let with_id = doc.with_id().unwrap();
        assert_eq!(with_id.get("_id"), Some(Bson::Int32(7)));
    }

    #[test]
    fn from_bytes_rejects_duplicate_keys() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0i32.to_le_bytes());
        raw.push(0x10);
        raw.extend_from_slice(b"a\0");
        raw.extend_from_slice(&1i32.to_le_bytes());
        raw.push(0x10);
        raw.extend_from_slice(b"a\0");
        raw.extend_from_slice(&2i32.to_le_bytes());
        raw.push(0);
        let len = raw.len() as i32;
        raw[0..4].copy_from_slice(&len.to_le_bytes());

        assert!(Document::from_bytes(raw.clone()).is_err());
        let unchecked = Document::from_bytes_unchecked(raw).unwrap();
        assert_eq!(unchecked.get("a"), Some(Bson::Int32(1)));
    }

    #[test]
    fn empty_document_boundary_scenario() {
        assert_eq!(Document::new().as_bytes(), &[0x05, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn int32_wrapper_binary_matches_boundary_scenario() {
        let mut doc = Document::new();
        doc.set("a", 5i32).unwrap();
        assert_eq!(
            doc.as_bytes(),
            &[0x0E, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x05, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn timestamp_wire_order_matches_boundary_scenario() {
        let mut doc = Document::new();
        doc.set(
            "k",
            Bson::Timestamp(crate::bson::Timestamp { time: 1, increment: 2 }),
        )
        .unwrap();
        let element = &doc.as_bytes()[4..];
        assert_eq!(
            element,
            &[0x11, b'k', 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn binary_old_subtype_matches_boundary_scenario() {
        let mut doc = Document::new();
        doc.set(
            "b",
            Bson::Binary(crate::Binary {
                subtype: crate::spec::BinarySubtype::BinaryOld,
                bytes: vec![0xAB],
            }),
        )
        .unwrap();
        let element = &doc.as_bytes()[4..];
        assert_eq!(
            element,
            &[
                0x05, b'b', 0x00, 0x05, 0x00, 0x00, 0x00, 0x02, 0x01, 0x00, 0x00, 0x00, 0xAB
            ]
        );
    }

    #[test]
    fn array_keys_are_sequential_indices() {
        let mut doc = Document::new();
        doc.set("a", vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)])
            .unwrap();
        match doc.get("a").unwrap() {
            Bson::Array(items) => assert_eq!(items.len(), 3),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn regex_options_are_sorted_on_write() {
        let mut doc = Document::new();
        doc.set("r", Regex::new("a", "xi")).unwrap();
        match doc.get("r").unwrap() {
            Bson::RegularExpression(re) => assert_eq!(re.options, "ix"),
            _ => panic!("expected regex"),
        }
    }

    #[test]
    fn equals_ignoring_order_compares_as_multiset() {
        let mut a = Document::new();
        a.set("x", 1i32).unwrap();
        a.set("y", 2i32).unwrap();
        let mut b = Document::new();
        b.set("y", 2i32).unwrap();
        b.set("x", 1i32).unwrap();
        assert_ne!(a, b);
        assert!(a.equals_ignoring_order(&b));
    }

    #[test]
    fn filter_keeps_matching_entries() {
        let mut doc = Document::new();
        doc.set("a", 1i32).unwrap();
        doc.set("b", 2i32).unwrap();
        let filtered = doc.filter(|_, v| v.as_i32() == Some(2));
        assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}
