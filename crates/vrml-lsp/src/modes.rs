//! One-shot command-line modes: `--format`, `--check` and `--outline`.
//!
//! Each reads a whole document and writes its result to stdout, so editors
//! and scripts can use them without an LSP handshake.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;
use vrml_core::{
    Browser, Declaration, Definition, Diagnostic, NodeIndex, SceneGraph, Severity, VrmlError,
    emit_scene,
};

/// Parse and re-emit in canonical form.
pub fn format(uri: &str, text: &str) -> Result<String, VrmlError> {
    let mut browser = Browser::new();
    let scene = browser.load(uri, text)?;
    Ok(emit_scene(&scene, browser.graph()))
}

/// Diagnostics as `uri:line:column: severity: message` lines. The flag is
/// false when the document does not load.
pub fn check(uri: &str, text: &str) -> (String, bool) {
    let mut browser = Browser::new();
    match browser.load(uri, text) {
        Ok(scene) => {
            let mut out = String::new();
            for d in &scene.diagnostics {
                let severity = match d.severity {
                    Severity::Warning => "warning",
                    Severity::Info => "info",
                };
                let _ = writeln!(out, "{}:{}:{}: {severity}: {}", d.uri, d.line, d.column, d.message);
            }
            (out, true)
        }
        Err(e) => (format!("{e}\n"), false),
    }
}

// ─── Outline ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Outline {
    pub uri: String,
    pub declarations: Vec<OutlineDeclaration>,
    pub nodes: Vec<OutlineNode>,
    pub routes: Vec<String>,
    pub definitions: Vec<Definition>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct OutlineDeclaration {
    pub kind: &'static str,
    pub name: String,
    pub interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OutlineNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub def: Option<String>,
    /// Second and later occurrences of a shared node are written as a use.
    #[serde(rename = "use", skip_serializing_if = "std::ops::Not::not")]
    pub reused: bool,
    /// Node-valued fields and the nodes they hold.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, Vec<OutlineNode>)>,
}

/// Parse and describe the document as a JSON tree.
pub fn outline(uri: &str, text: &str) -> Result<String, VrmlError> {
    let mut browser = Browser::new();
    let scene = browser.load(uri, text)?;
    let graph = browser.graph();

    let mut seen = HashSet::new();
    let outline = Outline {
        uri: scene.uri.clone(),
        declarations: scene.declarations.iter().map(outline_declaration).collect(),
        nodes: scene
            .roots
            .iter()
            .filter_map(|&root| outline_node(graph, root, &mut seen))
            .collect(),
        routes: scene
            .routes
            .iter()
            .map(|r| {
                let name = |idx: NodeIndex| {
                    graph
                        .node(idx)
                        .and_then(|n| n.name)
                        .map_or_else(|| format!("#{}", idx.index()), |n| n.to_string())
                };
                format!(
                    "{}.{} TO {}.{}",
                    name(r.from_node),
                    r.from_event,
                    name(r.to_node),
                    r.to_event
                )
            })
            .collect(),
        definitions: scene.definitions.clone(),
        diagnostics: scene.diagnostics.clone(),
    };
    // Serializing plain strings and vectors cannot fail.
    Ok(serde_json::to_string_pretty(&outline).unwrap_or_default())
}

fn outline_declaration(declaration: &Declaration) -> OutlineDeclaration {
    match declaration {
        Declaration::Proto(node_type) => OutlineDeclaration {
            kind: "PROTO",
            name: node_type.id.to_string(),
            interfaces: node_type.interfaces.iter().map(ToString::to_string).collect(),
            urls: Vec::new(),
        },
        Declaration::ExternProto {
            id,
            interfaces,
            urls,
            ..
        } => OutlineDeclaration {
            kind: "EXTERNPROTO",
            name: id.to_string(),
            interfaces: interfaces.iter().map(ToString::to_string).collect(),
            urls: urls.clone(),
        },
    }
}

fn outline_node(graph: &SceneGraph, idx: NodeIndex, seen: &mut HashSet<NodeIndex>) -> Option<OutlineNode> {
    let node = graph.node(idx)?;
    let mut out = OutlineNode {
        node_type: node.type_name().to_string(),
        def: node.name.map(|n| n.to_string()),
        reused: !seen.insert(idx),
        fields: Vec::new(),
    };
    if out.reused {
        return Some(out);
    }
    for (slot, interface) in node.node_type.interfaces.iter().enumerate() {
        if !interface.field_type.is_node() || !interface.kind.has_value() {
            continue;
        }
        let children: Vec<OutlineNode> = node
            .value_at(slot)
            .node_refs()
            .iter()
            .filter_map(|&child| outline_node(graph, child, seen))
            .collect();
        if !children.is_empty() {
            out.fields.push((interface.id.to_string(), children));
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_writes_canonical_text() {
        let text = format("a.wrl", "Shape{geometry Box{size 1 1 1}}").unwrap();
        assert_eq!(
            text,
            "#VRML V2.0 utf8\n\nShape {\n  geometry Box {\n    size 1 1 1\n  }\n}\n"
        );
    }

    #[test]
    fn check_reports_warnings_and_failure() {
        let (out, ok) = check("a.wrl", "Material { diffuseColor 2 0 0 }");
        assert!(ok);
        assert!(out.starts_with("a.wrl:1:24: warning: "));

        let (out, ok) = check("a.wrl", "Nope { }");
        assert!(!ok);
        assert_eq!(out, "a.wrl:1:0: Unknown node type \"Nope\"\n");
    }

    #[test]
    fn outline_marks_shared_nodes_as_uses() {
        let json = outline(
            "a.wrl",
            "DEF G Group { children [ DEF B Box { } USE B ] }\nDEF S TouchSensor { }\nDEF T TimeSensor { }\nROUTE S.isActive TO T.set_enabled",
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let children = &value["nodes"][0]["fields"][0][1];
        assert_eq!(value["nodes"][0]["def"], "G");
        assert_eq!(children[0]["type"], "Box");
        assert_eq!(children[1]["use"], true);
        assert_eq!(value["routes"][0], "S.isActive TO T.set_enabled");
    }
}
