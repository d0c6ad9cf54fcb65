//! Hand-authored equivalent of the boundary scenarios and round-trip laws.
//!
//! No external corpus fixture files are available in this environment (see DESIGN.md), so
//! each scenario below is transcribed directly from its literal byte sequence and worked
//! example instead of being loaded from a JSON fixture on disk.

use bsonx::{doc, spec::BinarySubtype, Binary, Bson, Decimal128, Document};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn empty_document_round_trips() {
    let bytes: &[u8] = &[0x05, 0x00, 0x00, 0x00, 0x00];
    let doc = Document::from_bytes(bytes.to_vec()).unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc.as_bytes(), bytes);
}

#[test]
fn int32_wrapper_round_trips_bytes_and_both_extjson_flavors() {
    let canonical = json!({ "a": { "$numberInt": "5" } });
    let doc = Document::from_extended_json(&canonical).unwrap();
    assert_eq!(doc, doc! { "a" => 5i32 });
    assert_eq!(doc.to_canonical_extended_json(), canonical);
    assert_eq!(doc.to_relaxed_extended_json(), json!({ "a": 5 }));
    assert_eq!(
        doc.as_bytes(),
        &[
            0x0E, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x05, 0x00, 0x00, 0x00, 0x00
        ]
    );
    assert_eq!(Document::from_bytes(doc.as_bytes().to_vec()).unwrap(), doc);
}

#[test]
fn timestamp_wire_order_matches_worked_example() {
    let mut doc = Document::new();
    doc.set("k", Bson::Timestamp(bsonx::Timestamp { time: 1, increment: 2 }))
        .unwrap();
    let element = &doc.as_bytes()[4..];
    assert_eq!(
        element,
        &[0x11, b'k', 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
    );
}

#[test]
fn binary_subtype_0x02_single_byte_matches_worked_example() {
    let mut doc = Document::new();
    doc.set(
        "b",
        Bson::Binary(Binary {
            subtype: BinarySubtype::BinaryOld,
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
fn decimal128_overflow_clamp_and_fixed_form() {
    assert!(Decimal128::parse_str("1E+6176").is_err());

    let clamped = Decimal128::parse_str("0E-6177").unwrap();
    assert_eq!(clamped.to_string(), "0E-6176");

    let fixed = Decimal128::parse_str("0.000001234").unwrap();
    assert_eq!(fixed.to_string(), "0.000001234");
    let doc = doc! { "d" => Bson::Decimal128(fixed) };
    assert_eq!(
        doc.to_canonical_extended_json(),
        json!({ "d": { "$numberDecimal": "0.000001234" } })
    );
}

#[test]
fn regex_options_sorted_in_extended_json() {
    let doc = doc! { "r" => bsonx::Regex::new("pat", "xi") };
    assert_eq!(
        doc.to_canonical_extended_json(),
        json!({ "r": { "$regularExpression": { "pattern": "pat", "options": "ix" } } })
    );
}

#[test]
fn set_on_new_key_appends_last_and_is_retrievable() {
    let mut doc = doc! { "a" => 1i32 };
    doc.set("b", 2i32).unwrap();
    assert_eq!(doc.get("b"), Some(Bson::Int32(2)));
    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn set_on_existing_key_preserves_position() {
    let mut doc = doc! { "a" => 1i32, "b" => 2i32 };
    doc.set("a", 99i32).unwrap();
    assert_eq!(doc.get("a"), Some(Bson::Int32(99)));
    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn remove_preserves_other_keys_relative_order() {
    let mut doc = doc! { "a" => 1i32, "b" => 2i32, "c" => 3i32 };
    doc.remove("b");
    assert!(!doc.contains_key("b"));
    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "c"]);
}

#[test]
fn array_keys_are_sequential_indices() {
    let doc = doc! { "a" => [10i32, 20i32, 30i32] };
    match doc.get("a").unwrap() {
        Bson::Array(items) => assert_eq!(items.len(), 3),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn from_bytes_is_bitwise_identity_on_valid_input() {
    let doc = doc! { "a" => 1i32, "b" => "two", "c" => [1i32, 2i32] };
    let bytes = doc.as_bytes().to_vec();
    let round_tripped = Document::from_bytes(bytes.clone()).unwrap();
    assert_eq!(round_tripped.as_bytes(), bytes.as_slice());
}
