//! Conversion between [`Bson`]/[`Document`] and [MongoDB Extended JSON
//! v2](https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/).
//!
//! There are two flavors: Canonical extended JSON represents every BSON type unambiguously, even
//! where that means wrapping a plain number in an object (`{"$numberInt": "5"}`). Relaxed
//! extended JSON renders numbers as ordinary JSON numbers where no precision would be lost,
//! trading unambiguity for readability.
//!
//! Parsing accepts both flavors, and a single document, or even a single value, may mix them.

use serde_json::{json, Map, Value};

use crate::{
    bson::{Bson, DbPointer, JavaScriptCodeWithScope, Regex, Timestamp},
    document::Document,
    error::{Error, PathSegment, Result},
    oid::ObjectId,
    spec::BinarySubtype,
    uuid::Uuid,
    Binary,
    DateTime,
    Decimal128,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    Canonical,
    Relaxed,
}

pub(crate) fn document_to_json(doc: &Document, mode: Mode) -> Value {
    Value::Object(
        doc.iter()
            .map(|(k, v)| (k, bson_to_json(&v, mode)))
            .collect(),
    )
}

fn bson_to_json(value: &Bson, mode: Mode) -> Value {
    match value {
        Bson::Double(v) => double_to_json(*v, mode),
        Bson::String(v) => json!(v),
        Bson::Array(items) => Value::Array(items.iter().map(|v| bson_to_json(v, mode)).collect()),
        Bson::Document(doc) => document_to_json(doc, mode),
        Bson::Boolean(v) => json!(v),
        Bson::Null => Value::Null,
        Bson::RegularExpression(Regex { pattern, options }) => {
            let mut chars: Vec<char> = options.chars().collect();
            chars.sort_unstable();
            let options: String = chars.into_iter().collect();
            json!({
                "$regularExpression": {
                    "pattern": pattern,
                    "options": options,
                }
            })
        }
        Bson::JavaScriptCode(code) => json!({ "$code": code }),
        Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope }) => json!({
            "$code": code,
            "$scope": document_to_json(scope, mode),
        }),
        Bson::Int32(v) => match mode {
            Mode::Canonical => json!({ "$numberInt": v.to_string() }),
            Mode::Relaxed => json!(v),
        },
        Bson::Int64(v) => match mode {
            Mode::Canonical => json!({ "$numberLong": v.to_string() }),
            Mode::Relaxed => json!(v),
        },
        Bson::Timestamp(Timestamp { time, increment }) => json!({
            "$timestamp": { "t": time, "i": increment },
        }),
        Bson::Binary(bin) => json!({
            "$binary": {
                "base64": crate::base64::encode(&bin.bytes),
                "subType": hex::encode([u8::from(bin.subtype)]),
            }
        }),
        Bson::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        Bson::DateTime(dt) => datetime_to_json(*dt, mode),
        Bson::Symbol(v) => json!({ "$symbol": v }),
        Bson::Decimal128(v) => json!({ "$numberDecimal": v.to_string() }),
        Bson::Undefined => json!({ "$undefined": true }),
        Bson::MaxKey => json!({ "$maxKey": 1 }),
        Bson::MinKey => json!({ "$minKey": 1 }),
        Bson::DbPointer(DbPointer { namespace, id }) => json!({
            "$dbPointer": {
                "$ref": namespace,
                "$id": { "$oid": id.to_hex() },
            }
        }),
    }
}

fn double_to_json(v: f64, mode: Mode) -> Value {
    if v.is_nan() {
        return json!({ "$numberDouble": if v.is_sign_negative() { "-NaN" } else { "NaN" } });
    }
    if v.is_infinite() {
        return json!({
            "$numberDouble": if v.is_sign_negative() { "-Infinity" } else { "Infinity" },
        });
    }
    if mode == Mode::Relaxed {
        return json!(v);
    }
    let mut s = v.to_string();
    if v.fract() == 0.0 && !s.contains(['e', 'E']) {
        s.push_str(".0");
    }
    json!({ "$numberDouble": s })
}

fn datetime_to_json(dt: DateTime, mode: Mode) -> Value {
    if mode == Mode::Relaxed && dt.is_relaxed_extjson_range() {
        // Unwrap safety: `is_relaxed_extjson_range` only accepts dates that format cleanly.
        return json!({ "$date": dt.try_to_rfc3339_string().unwrap() });
    }
    json!({ "$date": { "$numberLong": dt.timestamp_millis().to_string() } })
}

pub(crate) fn json_to_document(json: &Value) -> Result<Document> {
    match json_to_bson(json.clone())? {
        Bson::Document(doc) => Ok(doc),
        other => Err(Error::decoding(format!(
            "expected a JSON object, got {other:?}"
        ))),
    }
}

fn json_to_bson(json: Value) -> Result<Bson> {
    match json {
        Value::Null => Ok(Bson::Null),
        Value::Bool(b) => Ok(Bson::Boolean(b)),
        Value::String(s) => Ok(Bson::String(s)),
        Value::Array(items) => Ok(Bson::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| json_to_bson(v).map_err(|e| e.with_path_segment(PathSegment::Index(i))))
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    Ok(Bson::Int32(i as i32))
                } else {
                    Ok(Bson::Int64(i))
                }
            } else if let Some(f) = n.as_f64() {
                Ok(Bson::Double(f))
            } else {
                Err(Error::decoding(format!(
                    "{n} does not fit in an i64 or f64"
                )))
            }
        }
        Value::Object(obj) => object_to_bson(obj),
    }
}

fn object_to_bson(obj: Map<String, Value>) -> Result<Bson> {
    if let Some(v) = obj.get("$oid") {
        return Ok(Bson::ObjectId(ObjectId::parse_str(expect_str(
            v, "$oid",
        )?)?));
    }
    if let Some(v) = obj.get("$symbol") {
        return Ok(Bson::Symbol(expect_str(v, "$symbol")?.to_owned()));
    }
    if let Some(v) = obj.get("$numberInt") {
        let s = expect_str(v, "$numberInt")?;
        let i: i32 = s
            .parse()
            .map_err(|_| Error::decoding(format!("{s} is not a valid $numberInt")))?;
        return Ok(Bson::Int32(i));
    }
    if let Some(v) = obj.get("$numberLong") {
        let s = expect_str(v, "$numberLong")?;
        let i: i64 = s
            .parse()
            .map_err(|_| Error::decoding(format!("{s} is not a valid $numberLong")))?;
        return Ok(Bson::Int64(i));
    }
    if let Some(v) = obj.get("$numberDouble") {
        let s = expect_str(v, "$numberDouble")?;
        let d = match s {
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            "NaN" | "-NaN" => f64::NAN,
            other => other.parse().map_err(|_| {
                Error::decoding(format!("{other} is not a valid $numberDouble"))
            })?,
        };
        return Ok(Bson::Double(d));
    }
    if let Some(v) = obj.get("$numberDecimal") {
        let s = expect_str(v, "$numberDecimal")?;
        return Ok(Bson::Decimal128(Decimal128::parse_str(s)?));
    }
    if let Some(v) = obj.get("$binary") {
        return parse_binary(v);
    }
    if let Some(v) = obj.get("$uuid") {
        let s = expect_str(v, "$uuid")?;
        let uuid = Uuid::parse_str(s)?;
        return Ok(Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.bytes().to_vec(),
        }));
    }
    if let Some(v) = obj.get("$code") {
        let code = expect_str(v, "$code")?.to_owned();
        return match obj.get("$scope") {
            Some(scope) => Ok(Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code,
                scope: json_to_document(scope)?,
            })),
            None => Ok(Bson::JavaScriptCode(code)),
        };
    }
    if let Some(v) = obj.get("$timestamp") {
        return parse_timestamp(v);
    }
    if let Some(v) = obj.get("$date") {
        return parse_date(v);
    }
    if let Some(v) = obj.get("$regularExpression") {
        return parse_regex(v);
    }
    if obj.contains_key("$regex") {
        return parse_legacy_regex(&obj);
    }
    if let Some(v) = obj.get("$minKey") {
        return expect_one(v, "$minKey").map(|_| Bson::MinKey);
    }
    if let Some(v) = obj.get("$maxKey") {
        return expect_one(v, "$maxKey").map(|_| Bson::MaxKey);
    }
    if let Some(v) = obj.get("$dbPointer") {
        return parse_db_pointer(v);
    }
    if let Some(v) = obj.get("$undefined") {
        return match v {
            Value::Bool(true) => Ok(Bson::Undefined),
            other => Err(Error::decoding(format!(
                "$undefined should always be true, got {other:?}"
            ))),
        };
    }

    Ok(Bson::Document(
        obj.into_iter()
            .map(|(k, v)| {
                let value = json_to_bson(v)
                    .map_err(|e| e.with_path_segment(PathSegment::Key(k.clone())))?;
                Ok((k, value))
            })
            .collect::<Result<Vec<(String, Bson)>>>()?
            .into_iter()
            .collect(),
    ))
}

fn expect_str<'a>(v: &'a Value, wrapper: &str) -> Result<&'a str> {
    v.as_str()
        .ok_or_else(|| Error::decoding(format!("{wrapper} expects a string value")))
}

fn expect_one(v: &Value, wrapper: &str) -> Result<()> {
    match v.as_i64() {
        Some(1) => Ok(()),
        _ => Err(Error::decoding(format!(
            "{wrapper} should always be 1"
        ))),
    }
}

fn parse_binary(v: &Value) -> Result<Bson> {
    let obj = v
        .as_object()
        .ok_or_else(|| Error::decoding("$binary expects an object"))?;
    let base64 = expect_str(
        obj.get("base64")
            .ok_or_else(|| Error::decoding("$binary is missing \"base64\""))?,
        "$binary.base64",
    )?;
    let sub_type = expect_str(
        obj.get("subType")
            .ok_or_else(|| Error::decoding("$binary is missing \"subType\""))?,
        "$binary.subType",
    )?;
    let bytes = crate::base64::decode(base64)
        .map_err(|e| Error::decoding(format!("invalid base64 in $binary: {e}")))?;
    let subtype_bytes = hex::decode(sub_type)
        .map_err(|e| Error::decoding(format!("invalid hex subType in $binary: {e}")))?;
    if subtype_bytes.len() != 1 {
        return Err(Error::decoding(
            "$binary subType must be a one byte hex string",
        ));
    }
    Ok(Bson::Binary(Binary {
        subtype: BinarySubtype::from(subtype_bytes[0]),
        bytes,
    }))
}

fn parse_timestamp(v: &Value) -> Result<Bson> {
    let obj = v
        .as_object()
        .ok_or_else(|| Error::decoding("$timestamp expects an object"))?;
    let t = obj
        .get("t")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::decoding("$timestamp.t must be an unsigned integer"))?;
    let i = obj
        .get("i")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::decoding("$timestamp.i must be an unsigned integer"))?;
    Ok(Bson::Timestamp(Timestamp {
        time: t as u32,
        increment: i as u32,
    }))
}

fn parse_date(v: &Value) -> Result<Bson> {
    match v {
        Value::Object(obj) => {
            let millis = obj
                .get("$numberLong")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::decoding("$date expects a $numberLong body"))?;
            let millis: i64 = millis
                .parse()
                .map_err(|_| Error::decoding(format!("{millis} is not a valid $date")))?;
            Ok(Bson::DateTime(DateTime::from_millis(millis)))
        }
        Value::String(s) => Ok(Bson::DateTime(DateTime::parse_rfc3339_str(s).map_err(
            |e| Error::decoding(format!("invalid $date string {s:?}: {e}")),
        )?)),
        other => Err(Error::decoding(format!(
            "$date expects an object or a string, got {other:?}"
        ))),
    }
}

fn parse_regex(v: &Value) -> Result<Bson> {
    let obj = v
        .as_object()
        .ok_or_else(|| Error::decoding("$regularExpression expects an object"))?;
    let pattern = expect_str(
        obj.get("pattern")
            .ok_or_else(|| Error::decoding("$regularExpression is missing \"pattern\""))?,
        "$regularExpression.pattern",
    )?;
    let options = expect_str(
        obj.get("options")
            .ok_or_else(|| Error::decoding("$regularExpression is missing \"options\""))?,
        "$regularExpression.options",
    )?;
    Ok(Bson::RegularExpression(Regex::new(pattern, options)))
}

/// Legacy `{"$regex": ..., "$options": ...}` form, recognized only as a fallback since
/// `$regularExpression` is the canonical wrapper.
fn parse_legacy_regex(obj: &Map<String, Value>) -> Result<Bson> {
    let pattern = expect_str(&obj["$regex"], "$regex")?;
    let options = match obj.get("$options") {
        Some(v) => expect_str(v, "$options")?,
        None => "",
    };
    Ok(Bson::RegularExpression(Regex::new(pattern, options)))
}

fn parse_db_pointer(v: &Value) -> Result<Bson> {
    let obj = v
        .as_object()
        .ok_or_else(|| Error::decoding("$dbPointer expects an object"))?;
    let ns = expect_str(
        obj.get("$ref")
            .ok_or_else(|| Error::decoding("$dbPointer is missing \"$ref\""))?,
        "$dbPointer.$ref",
    )?
    .to_owned();
    let id_obj = obj
        .get("$id")
        .ok_or_else(|| Error::decoding("$dbPointer is missing \"$id\""))?;
    let id = match json_to_bson(id_obj.clone())? {
        Bson::ObjectId(id) => id,
        other => {
            return Err(Error::decoding(format!(
                "$dbPointer.$id must be an $oid, got {other:?}"
            )))
        }
    };
    Ok(Bson::DbPointer(DbPointer { namespace: ns, id }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::doc;

    #[test]
    fn canonical_int32_round_trips() {
        let doc = doc! { "a" => 5i32 };
        let json = document_to_json(&doc, Mode::Canonical);
        assert_eq!(json, json!({ "a": { "$numberInt": "5" } }));
        assert_eq!(json_to_document(&json).unwrap(), doc);
    }

    #[test]
    fn relaxed_int32_renders_as_plain_number() {
        let doc = doc! { "a" => 5i32 };
        assert_eq!(document_to_json(&doc, Mode::Relaxed), json!({ "a": 5 }));
    }

    #[test]
    fn oid_round_trips() {
        let oid = ObjectId::new();
        let doc = doc! { "_id" => oid };
        let json = document_to_json(&doc, Mode::Canonical);
        assert_eq!(json, json!({ "_id": { "$oid": oid.to_hex() } }));
        assert_eq!(json_to_document(&json).unwrap(), doc);
    }

    #[test]
    fn legacy_regex_is_accepted_as_fallback() {
        let json = json!({ "a": { "$regex": "x", "$options": "i" } });
        let doc = json_to_document(&json).unwrap();
        assert_eq!(
            doc.get("a").unwrap(),
            Bson::RegularExpression(Regex::new("x", "i"))
        );
    }

    #[test]
    fn mixed_modes_in_one_document_parse() {
        let json = json!({ "a": 5, "b": { "$numberInt": "6" } });
        let doc = json_to_document(&json).unwrap();
        assert_eq!(doc.get("a").unwrap(), Bson::Int32(5));
        assert_eq!(doc.get("b").unwrap(), Bson::Int32(6));
    }

    #[test]
    fn uuid_binary_emits_standard_binary_wrapper() {
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        let doc = doc! { "u" => Bson::Binary(Binary::from(uuid)) };
        let json = document_to_json(&doc, Mode::Canonical);
        assert_eq!(
            json,
            json!({ "u": { "$binary": { "base64": crate::base64::encode(&uuid.bytes()), "subType": "04" } } })
        );
        assert_eq!(json_to_document(&json).unwrap(), doc);
    }

    #[test]
    fn minkey_maxkey_round_trip() {
        let doc = doc! { "lo" => Bson::MinKey, "hi" => Bson::MaxKey };
        let json = document_to_json(&doc, Mode::Canonical);
        assert_eq!(json_to_document(&json).unwrap(), doc);
    }
}
