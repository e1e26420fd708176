//! Hover: node types, DEF names, field types and keywords.

use crate::document::Document;
use std::fmt::Write;
use tower_lsp::lsp_types::*;
use vrml_core::{DefinitionKind, FieldType, NodeType, TypeOrigin};

/// Hover information at the given position.
///
/// - A node type name lists the type's interfaces with defaults.
/// - A DEF name shows the type of the node it names.
/// - A field-type keyword or a statement keyword shows a description.
pub fn compute_hover(doc: &Document, pos: Position) -> Option<Hover> {
    let line = doc.line(pos.line)?;
    let word = extract_word_at(&line, pos.character as usize);
    if word.is_empty() {
        return None;
    }

    if let Some(field_type) = FieldType::from_keyword(word) {
        return Some(make_hover(&describe_field_type(field_type)));
    }
    if let Some(text) = hover_keyword(word) {
        return Some(make_hover(text));
    }
    if let Some(node_type) = doc.find_type(word) {
        return Some(make_hover(&describe_type(&node_type)));
    }
    hover_def_name(doc, word)
}

/// Extract the identifier at a given column in a line.
fn extract_word_at(line: &str, col: usize) -> &str {
    let col = col.min(line.len());
    let bytes = line.as_bytes();

    let start = (0..col)
        .rev()
        .find(|&i| !is_word_char(bytes[i]))
        .map_or(0, |i| i + 1);
    let end = (col..bytes.len())
        .find(|&i| !is_word_char(bytes[i]))
        .unwrap_or(bytes.len());

    &line[start..end]
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn hover_def_name(doc: &Document, word: &str) -> Option<Hover> {
    let scene = doc.scene()?;
    let def = scene
        .definitions
        .iter()
        .find(|d| d.kind == DefinitionKind::Def && d.name.as_str() == word)?;
    Some(make_hover(&format!(
        "**DEF {}** `{}` node, line {}",
        def.name, def.type_name, def.line
    )))
}

fn describe_type(node_type: &NodeType) -> String {
    let origin = match &node_type.origin {
        TypeOrigin::Builtin => "built-in node".to_string(),
        TypeOrigin::Script => "script node".to_string(),
        TypeOrigin::Proto(def) => format!("PROTO `{}`", def.identity),
    };
    let mut out = format!("**{}** — {origin}\n\n```vrml\n", node_type.id);
    for (slot, interface) in node_type.interfaces.iter().enumerate() {
        let _ = write!(out, "{interface}");
        if interface.kind.has_value() {
            let _ = write!(out, " {}", node_type.default_at(slot));
        }
        out.push('\n');
    }
    out.push_str("```");
    out
}

fn describe_field_type(field_type: FieldType) -> String {
    let what = match field_type {
        FieldType::SFBool => "`TRUE` or `FALSE`",
        FieldType::SFColor => "an RGB color, three floats in [0, 1]",
        FieldType::SFFloat => "a 32-bit float",
        FieldType::SFImage => "an image: width, height, components, then packed hex pixels",
        FieldType::SFInt32 => "a 32-bit integer, decimal or `0x` hex",
        FieldType::SFNode => "a node, `USE` of a DEF'd node, or `NULL`",
        FieldType::SFRotation => "an axis (x y z) and an angle in radians",
        FieldType::SFString => "a double-quoted UTF-8 string",
        FieldType::SFTime => "a double-precision time in seconds",
        FieldType::SFVec2f => "two floats",
        FieldType::SFVec3f => "three floats",
        FieldType::MFColor => "zero or more RGB colors",
        FieldType::MFFloat => "zero or more floats",
        FieldType::MFInt32 => "zero or more integers; `-1` ends a face in index lists",
        FieldType::MFNode => "zero or more nodes",
        FieldType::MFRotation => "zero or more rotations",
        FieldType::MFString => "zero or more strings",
        FieldType::MFTime => "zero or more times",
        FieldType::MFVec2f => "zero or more 2D vectors",
        FieldType::MFVec3f => "zero or more 3D vectors",
    };
    let syntax = if field_type.is_multi() {
        "\n\nSeveral values go in `[ ]`; a single value may be written bare."
    } else {
        ""
    };
    format!("**{field_type}** — {what}.{syntax}")
}

fn hover_keyword(word: &str) -> Option<&'static str> {
    let info = match word {
        "DEF" => "**DEF** — Name a node so it can be `USE`d and routed.\n\nFormat: `DEF name Type { ... }`",
        "USE" => "**USE** — Share a node DEF'd earlier in this scope or an enclosing one.",
        "PROTO" => {
            "**PROTO** — Declare a new node type.\n\nFormat: `PROTO Name [ interfaces ] { body }`"
        }
        "EXTERNPROTO" => {
            "**EXTERNPROTO** — Declare a node type implemented elsewhere.\n\nFormat: `EXTERNPROTO Name [ interfaces ] \"url\"`"
        }
        "ROUTE" => "**ROUTE** — Connect an eventOut to an eventIn.\n\nFormat: `ROUTE A.out TO B.in`",
        "IS" => "**IS** — Bind a field of a PROTO body node to an interface of the PROTO.",
        "field" => "**field** — A value set at creation time only.",
        "exposedField" => {
            "**exposedField** — A value that also accepts `set_x` and emits `x_changed`."
        }
        "eventIn" => "**eventIn** — An input event, the target of a ROUTE.",
        "eventOut" => "**eventOut** — An output event, the source of a ROUTE.",
        _ => return None,
    };
    Some(info)
}

fn make_hover(content: &str) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: content.to_string(),
        }),
        range: None,
    }
}
