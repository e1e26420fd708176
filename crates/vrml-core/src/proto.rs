//! PROTO definitions and their instantiation.
//!
//! A PROTO's implementation is parsed once into template nodes that live in
//! the session arena. Instantiating it clones the template with an index
//! remap, replays the internal routes onto the copies, and binds the new
//! instance's public interface to the copies through the IS map.

use crate::error::VrmlError;
use crate::field::FieldValue;
use crate::id::Name;
use crate::model::{EventLink, LinkKind, Route, SceneGraph};
use crate::node_type::{InterfaceKind, InterfaceSet, NodeType};
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// One `IS` clause: implementation `node.field` is driven by the PROTO
/// interface `interface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsMapping {
    pub interface: Name,
    pub node: NodeIndex,
    /// Canonical interface id on the implementation node.
    pub field: Name,
    /// The name as written in the body, `set_x` or `x_changed` when only an
    /// event of exposedField `x` is mapped.
    pub written: Name,
    /// How the implementation side is reached: the interface kind, or
    /// eventIn/eventOut for an event alias.
    pub access: InterfaceKind,
}

impl IsMapping {
    /// Whether the implementation field's value comes from the PROTO.
    pub fn maps_value(&self) -> bool {
        self.access.has_value()
    }
}

/// A PROTO or EXTERNPROTO declaration, in source order.
#[derive(Debug, Clone)]
pub enum Declaration {
    /// The registered PROTO type. Its origin carries the definition.
    Proto(Arc<NodeType>),
    ExternProto {
        id: Name,
        interfaces: InterfaceSet,
        urls: Vec<String>,
        /// The type produced by the first matching node class, if any.
        bound: Option<Arc<NodeType>>,
    },
}

impl Declaration {
    pub fn id(&self) -> Name {
        match self {
            Declaration::Proto(ty) => ty.id,
            Declaration::ExternProto { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtoDefinition {
    pub id: Name,
    /// Node-class registry key: the `#`-joined scope path of the body.
    pub identity: String,
    pub interfaces: InterfaceSet,
    /// Top-level nodes of the body, in order.
    pub implementation: Vec<NodeIndex>,
    /// Every node created while the PROTO was declared: defaults, body nodes
    /// and nested instances. These are the template that gets cloned.
    pub members: Vec<NodeIndex>,
    pub is_map: Vec<IsMapping>,
    /// ROUTEs declared inside the body.
    pub routes: Vec<Route>,
    /// PROTO/EXTERNPROTO declarations nested in the body.
    pub declarations: Vec<Declaration>,
}

impl ProtoDefinition {
    /// IS clauses of one template node.
    pub fn mappings_for(&self, node: NodeIndex) -> impl Iterator<Item = &IsMapping> {
        self.is_map.iter().filter(move |m| m.node == node)
    }
}

/// Create an independent instance of a PROTO type.
pub fn instantiate(
    def: &Arc<ProtoDefinition>,
    node_type: &Arc<NodeType>,
    graph: &mut SceneGraph,
    initial: Vec<(Name, FieldValue)>,
) -> Result<NodeIndex, VrmlError> {
    let mut overrides: HashMap<Name, FieldValue> = HashMap::new();
    for (name, value) in initial {
        let slot = node_type
            .interfaces
            .field(name)
            .ok_or(VrmlError::UnknownInterface {
                node_type: node_type.id,
                interface: name,
            })?;
        value.expect_type(node_type.interfaces.at(slot).field_type)?;
        overrides.insert(name, value);
    }

    let remap = graph.clone_nodes(&def.members);
    let mapped = |idx: NodeIndex| remap.get(&idx).copied().unwrap_or(idx);

    for route in &def.routes {
        graph.add_route(
            mapped(route.from_node),
            route.from_event,
            mapped(route.to_node),
            route.to_event,
        )?;
    }

    // Defaults may hold template nodes; the instance gets the copies.
    let mut values = Vec::new();
    for (slot, interface) in node_type.interfaces.iter().enumerate() {
        if !interface.kind.has_value() {
            continue;
        }
        let value = overrides.remove(&interface.id).unwrap_or_else(|| {
            let mut v = node_type.default_at(slot).clone();
            v.remap_nodes(&remap);
            v
        });
        values.push((interface.id, value));
    }

    let instance = graph.add_node(node_type, values)?;
    if let Some(node) = graph.node_mut(instance) {
        node.implementation = def.implementation.iter().map(|&i| mapped(i)).collect::<SmallVec<_>>();
    }

    for m in &def.is_map {
        let Some(&target) = remap.get(&m.node) else {
            debug_assert!(false, "IS target #{} missing from template", m.node.index());
            log::error!(
                "PROTO {}: IS target #{} missing from template",
                def.id,
                m.node.index()
            );
            continue;
        };
        let Some(interface) = node_type.interfaces.get(m.interface).copied() else {
            log::error!("PROTO {} has no interface {}", def.id, m.interface);
            continue;
        };
        if (interface.kind.accepts_events() || interface.kind.has_value())
            && (m.access.accepts_events() || m.access.has_value())
        {
            graph.link(
                instance,
                target,
                EventLink {
                    kind: LinkKind::IsIn,
                    from: m.interface,
                    to: m.field,
                },
            );
        }
        if interface.kind.emits_events() && m.access.emits_events() {
            graph.link(
                target,
                instance,
                EventLink {
                    kind: LinkKind::IsOut,
                    from: m.field,
                    to: m.interface,
                },
            );
        }
        if interface.kind.has_value() && m.maps_value() {
            let value = graph.field(instance, m.interface)?.clone();
            graph.set_field(target, m.field, value)?;
        }
    }

    log::debug!(
        "instantiated PROTO {} as #{} ({} template nodes)",
        def.id,
        instance.index(),
        def.members.len()
    );
    Ok(instance)
}
