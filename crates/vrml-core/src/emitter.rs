//! Emitter: scene graph → VRML97 text.
//!
//! Output re-parses to an equivalent scene. A DEF'd node is written in full
//! on first occurrence and as `USE` afterwards; fields still holding their
//! type default are omitted; PROTO bodies keep their IS clauses.

use crate::browser::Scene;
use crate::builtins;
use crate::field::FieldValue;
use crate::model::{Route, SceneGraph};
use crate::node_type::{InterfaceKind, NodeType, TypeOrigin};
use crate::proto::{Declaration, IsMapping, ProtoDefinition};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use std::fmt::Write;

pub const HEADER: &str = "#VRML V2.0 utf8";

/// Emit a loaded scene as canonical VRML97 text.
#[must_use]
pub fn emit_scene(scene: &Scene, graph: &SceneGraph) -> String {
    emit_document(graph, &scene.declarations, &scene.roots, &scene.routes)
}

/// Emit a whole document: header, declarations, root nodes, then ROUTEs.
#[must_use]
pub fn emit_document<'g>(
    graph: &'g SceneGraph,
    declarations: &'g [Declaration],
    roots: &[NodeIndex],
    routes: &[Route],
) -> String {
    let mut e = Emitter::new(graph);
    e.out.push_str(HEADER);
    e.out.push_str("\n\n");
    for declaration in declarations {
        e.declaration(declaration, 0);
        e.out.push('\n');
    }
    for &root in roots {
        e.node(root, 0);
        e.out.push('\n');
    }
    for route in routes {
        e.route(route, 0);
    }
    e.out
}

/// Emit a single node and everything it references.
#[must_use]
pub fn emit_node(graph: &SceneGraph, node: NodeIndex) -> String {
    let mut e = Emitter::new(graph);
    e.node(node, 0);
    e.out
}

struct Emitter<'g> {
    graph: &'g SceneGraph,
    out: String,
    written: HashSet<NodeIndex>,
    /// PROTO bodies being written, innermost last.
    protos: Vec<&'g ProtoDefinition>,
    script_fixed: usize,
}

impl<'g> Emitter<'g> {
    fn new(graph: &'g SceneGraph) -> Self {
        Self {
            graph,
            out: String::with_capacity(1024),
            written: HashSet::new(),
            protos: Vec::new(),
            script_fixed: builtins::script_interfaces().len(),
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn line(&mut self, depth: usize) {
        self.out.push('\n');
        self.indent(depth);
    }

    // ─── Declarations ────────────────────────────────────────────────────

    fn declaration(&mut self, declaration: &'g Declaration, depth: usize) {
        match declaration {
            Declaration::Proto(node_type) => self.proto(node_type, depth),
            Declaration::ExternProto {
                id,
                interfaces,
                urls,
                ..
            } => {
                self.indent(depth);
                let _ = write!(self.out, "EXTERNPROTO {id} [");
                for interface in interfaces {
                    self.line(depth + 1);
                    let _ = write!(self.out, "{interface}");
                }
                self.line(depth);
                let _ = writeln!(self.out, "] {}", FieldValue::MFString(urls.clone()));
            }
        }
    }

    fn proto(&mut self, node_type: &'g NodeType, depth: usize) {
        let Some(def) = node_type.proto() else {
            log::warn!("{} is not a PROTO type; skipped", node_type.id);
            return;
        };
        self.indent(depth);
        let _ = write!(self.out, "PROTO {} [", node_type.id);
        for (slot, interface) in node_type.interfaces.iter().enumerate() {
            self.line(depth + 1);
            let _ = write!(self.out, "{interface}");
            if interface.kind.has_value() {
                self.out.push(' ');
                self.value(node_type.default_at(slot), depth + 1);
            }
        }
        self.line(depth);
        self.out.push_str("]");
        self.line(depth);
        self.out.push_str("{\n");

        self.protos.push(def.as_ref());
        for nested in &def.declarations {
            self.declaration(nested, depth + 1);
        }
        for &node in &def.implementation {
            self.indent(depth + 1);
            self.node(node, depth + 1);
            self.out.push('\n');
        }
        for route in &def.routes {
            self.route(route, depth + 1);
        }
        self.protos.pop();

        self.indent(depth);
        self.out.push_str("}\n");
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Write a node at the current position. The caller has indented.
    fn node(&mut self, idx: NodeIndex, depth: usize) {
        let graph = self.graph;
        let Some(node) = graph.node(idx) else {
            log::warn!("dangling node #{} written as NULL", idx.index());
            self.out.push_str("NULL");
            return;
        };
        if let Some(name) = node.name {
            if !self.written.insert(idx) {
                let _ = write!(self.out, "USE {name}");
                return;
            }
            let _ = write!(self.out, "DEF {name} ");
        }

        let node_type = &node.node_type;
        let _ = write!(self.out, "{} {{", node_type.id);
        let mappings: Vec<IsMapping> = self
            .protos
            .last()
            .map(|def| def.mappings_for(idx).copied().collect())
            .unwrap_or_default();
        let script = matches!(node_type.origin, TypeOrigin::Script);
        let mut wrote = false;

        for (slot, interface) in node_type.interfaces.iter().enumerate() {
            let mapped: Vec<&IsMapping> =
                mappings.iter().filter(|m| m.field == interface.id).collect();

            if script && slot >= self.script_fixed {
                self.line(depth + 1);
                let _ = write!(self.out, "{interface}");
                if let Some(m) = mapped.first() {
                    let _ = write!(self.out, " IS {}", m.interface);
                } else if interface.kind == InterfaceKind::Field {
                    self.out.push(' ');
                    self.value(node.value_at(slot), depth + 1);
                }
                wrote = true;
                continue;
            }

            for m in &mapped {
                self.line(depth + 1);
                let _ = write!(self.out, "{} IS {}", m.written, m.interface);
                wrote = true;
            }
            if mapped.iter().any(|m| m.maps_value())
                || !interface.kind.has_value()
                || node.is_default(slot)
            {
                continue;
            }
            self.line(depth + 1);
            let _ = write!(self.out, "{} ", interface.id);
            self.value(node.value_at(slot), depth + 1);
            wrote = true;
        }

        if wrote {
            self.line(depth);
            self.out.push('}');
        } else {
            self.out.push_str(" }");
        }
    }

    fn value(&mut self, value: &FieldValue, depth: usize) {
        match value {
            FieldValue::SFNode(Some(idx)) => self.node(*idx, depth),
            FieldValue::MFNode(nodes) if !nodes.is_empty() => {
                self.out.push('[');
                for &idx in nodes {
                    self.line(depth + 1);
                    self.node(idx, depth + 1);
                }
                self.line(depth);
                self.out.push(']');
            }
            other => {
                let _ = write!(self.out, "{other}");
            }
        }
    }

    fn route(&mut self, route: &Route, depth: usize) {
        let name = |idx| self.graph.node(idx).and_then(|n| n.name);
        let (Some(from), Some(to)) = (name(route.from_node), name(route.to_node)) else {
            log::warn!(
                "ROUTE #{}.{} → #{}.{} joins an unnamed node; skipped",
                route.from_node.index(),
                route.from_event,
                route.to_node.index(),
                route.to_event
            );
            return;
        };
        self.indent(depth);
        let _ = writeln!(
            self.out,
            "ROUTE {from}.{} TO {to}.{}",
            route.from_event, route.to_event
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin_types;
    use crate::id::Name;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn ty(name: &str) -> Arc<NodeType> {
        builtin_types()
            .into_iter()
            .find(|t| t.id.as_str() == name)
            .unwrap()
    }

    #[test]
    fn default_fields_are_omitted() {
        let mut g = SceneGraph::new();
        let b = g.add_node(&ty("Box"), Vec::new()).unwrap();
        assert_eq!(emit_node(&g, b), "Box { }");

        let b2 = g
            .add_node(
                &ty("Box"),
                vec![(Name::intern("size"), FieldValue::SFVec3f([1.0, 2.0, 3.0]))],
            )
            .unwrap();
        assert_eq!(emit_node(&g, b2), "Box {\n  size 1 2 3\n}");
    }

    #[test]
    fn shared_named_node_is_written_once_then_used() {
        let mut g = SceneGraph::new();
        let m = g.add_node(&ty("Material"), Vec::new()).unwrap();
        g.set_name(m, Name::intern("M"));
        let group = g
            .add_node(
                &ty("Group"),
                vec![(Name::intern("children"), FieldValue::MFNode(vec![m, m]))],
            )
            .unwrap();
        let text = emit_node(&g, group);
        assert_eq!(text, "Group {\n  children [\n    DEF M Material { }\n    USE M\n  ]\n}");
    }

    #[test]
    fn document_starts_with_header_and_ends_with_routes() {
        let mut g = SceneGraph::new();
        let a = g.add_node(&ty("TimeSensor"), Vec::new()).unwrap();
        let b = g.add_node(&ty("ScalarInterpolator"), Vec::new()).unwrap();
        g.set_name(a, Name::intern("T"));
        g.set_name(b, Name::intern("I"));
        let route = Route {
            from_node: a,
            from_event: Name::intern("fraction_changed"),
            to_node: b,
            to_event: Name::intern("set_fraction"),
        };
        let text = emit_document(&g, &[], &[a, b], &[route]);
        assert!(text.starts_with(HEADER));
        assert!(text.ends_with("ROUTE T.fraction_changed TO I.set_fraction\n"));
    }
}
