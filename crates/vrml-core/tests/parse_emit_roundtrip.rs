//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Emitting a parsed scene and parsing the output again must give an equal
//! scene, and emitting that second scene must reproduce the same text.

use pretty_assertions::assert_eq;
use vrml_core::*;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn emit_fresh(uri: &str, text: &str) -> (String, usize) {
    let mut browser = Browser::new();
    let scene = browser
        .load(uri, text)
        .unwrap_or_else(|e| panic!("parse of {uri} failed: {e}\n{text}"));
    (emit_scene(&scene, browser.graph()), browser.graph().node_count())
}

/// Parse, emit, re-parse, emit again, and compare.
fn assert_roundtrip(uri: &str, input: &str) -> String {
    let (first, first_count) = emit_fresh(uri, input);
    let (second, second_count) = emit_fresh(uri, &first);
    assert_eq!(first, second, "emitted text is not stable for {uri}");
    assert_eq!(first_count, second_count, "node count changed for {uri}");
    first
}

fn literal_roundtrip(field_type: FieldType, text: &str) {
    let value = FieldValue::parse_literal(field_type, text).unwrap();
    let printed = value.to_string();
    let again = FieldValue::parse_literal(field_type, &printed).unwrap();
    assert_eq!(value, again, "{field_type} literal {text:?} printed as {printed:?}");
}

// ─── Fixture-based tests ─────────────────────────────────────────────────

#[test]
fn roundtrip_shape_box() {
    let text = assert_roundtrip("shape.wrl", include_str!("fixtures/shape_box.wrl"));
    assert_eq!(text, "#VRML V2.0 utf8\n\nDEF S Shape {\n  geometry Box { }\n}\n");
}

#[test]
fn roundtrip_proto_with_is() {
    let text = assert_roundtrip("proto.wrl", include_str!("fixtures/proto_is.wrl"));
    assert!(text.contains("PROTO SizedBox ["));
    assert!(text.contains("size IS v"));
    assert!(text.contains("diffuseColor IS tint"));
    assert!(text.contains("DEF A SizedBox { }"));
    assert!(text.contains("DEF B SizedBox {\n  v 5 5 5\n}"));
}

#[test]
fn roundtrip_routes() {
    let text = assert_roundtrip("routes.wrl", include_str!("fixtures/routes.wrl"));
    assert_eq!(text.matches("ROUTE ").count(), 2);
    assert!(text.ends_with("ROUTE SPIN.value_changed TO XF.set_rotation\n"));
}

#[test]
fn roundtrip_nested_scopes() {
    assert_roundtrip("scopes.wrl", include_str!("fixtures/scopes.wrl"));
}

#[test]
fn roundtrip_script() {
    let text = assert_roundtrip("script.wrl", include_str!("fixtures/script.wrl"));
    assert!(text.contains("field SFNode me USE S"));
    assert!(text.contains("field SFFloat speed 1.5"));
    assert!(text.contains("eventOut SFTime done"));
}

#[test]
fn roundtrip_externproto() {
    let text = assert_roundtrip("ext.wrl", include_str!("fixtures/externproto.wrl"));
    assert!(text.contains("EXTERNPROTO MyBox [\n  field SFVec3f size\n] [\"urn:vrml97:node:Box\"]"));
}

#[test]
fn roundtrip_world() {
    let text = assert_roundtrip("world.wrl", include_str!("fixtures/world.wrl"));
    assert!(text.contains("DEF GEO Block"));
    assert!(text.contains("USE GEO"));
    assert!(text.contains("ROUTE BRAIN.lit TO L1.set_on"));
}

// ─── Literals ────────────────────────────────────────────────────────────

#[test]
fn scalar_literals_reparse_to_equal_values() {
    literal_roundtrip(FieldType::SFBool, "TRUE");
    literal_roundtrip(FieldType::SFInt32, "0x7F");
    literal_roundtrip(FieldType::SFInt32, "-42");
    literal_roundtrip(FieldType::SFFloat, "3.25e-2");
    literal_roundtrip(FieldType::SFTime, "1234567.125");
    literal_roundtrip(FieldType::SFString, r#""quote \" and backslash \\""#);
    literal_roundtrip(FieldType::SFColor, "0.1 0.2 0.3");
    literal_roundtrip(FieldType::SFVec2f, "-1 0.5");
    literal_roundtrip(FieldType::SFVec3f, "1e3 2 -3");
    literal_roundtrip(FieldType::SFRotation, "0 1 0 1.5708");
    literal_roundtrip(FieldType::SFImage, "2 2 3 0xFF0000 0x00FF00 0x0000FF 0xFFFFFF");
}

#[test]
fn multi_literals_reparse_to_equal_values() {
    literal_roundtrip(FieldType::MFString, r#"[ "a" "b c" ]"#);
    literal_roundtrip(FieldType::MFFloat, "[ 0, 0.25, 1 ]");
    literal_roundtrip(FieldType::MFVec3f, "[ 0 0 0, 1 1 1 ]");
    literal_roundtrip(FieldType::MFInt32, "[ 1 2 -1 ]");
    literal_roundtrip(FieldType::MFColor, "1 0 0");
    literal_roundtrip(FieldType::MFTime, "[]");
}
