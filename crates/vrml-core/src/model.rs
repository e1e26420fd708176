//! Scene arena for one browser session.
//!
//! Every node lives in a single `StableDiGraph`. Node-valued fields hold
//! `NodeIndex` handles into it, so DEF/USE sharing is handle identity and a
//! node may have many parents. Graph edges are event links: ROUTEs plus the
//! forwarding links a PROTO instance installs between its public interface
//! and its implementation nodes.

use crate::error::VrmlError;
use crate::field::FieldValue;
use crate::id::Name;
use crate::node_type::NodeType;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A live instance of a node type. Values are stored one slot per
/// interface; event slots hold the last value sent or emitted.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_type: Arc<NodeType>,
    /// DEF name, if any.
    pub name: Option<Name>,
    values: Vec<FieldValue>,
    /// Root nodes of a PROTO instance's private implementation. The first
    /// one is what the instance renders as.
    pub implementation: SmallVec<[NodeIndex; 1]>,
    /// Part of a PROTO template: never rendered, only cloned.
    pub template: bool,
}

impl Node {
    fn new(node_type: &Arc<NodeType>) -> Self {
        Self {
            node_type: Arc::clone(node_type),
            name: None,
            values: node_type.defaults().to_vec(),
            implementation: SmallVec::new(),
            template: false,
        }
    }

    pub fn type_name(&self) -> Name {
        self.node_type.id
    }

    pub fn value_at(&self, slot: usize) -> &FieldValue {
        &self.values[slot]
    }

    /// Current value of a field or exposedField.
    pub fn field(&self, name: Name) -> Option<&FieldValue> {
        self.node_type
            .interfaces
            .field(name)
            .map(|slot| &self.values[slot])
    }

    /// Whether the slot still holds the type default.
    pub fn is_default(&self, slot: usize) -> bool {
        self.values[slot] == *self.node_type.default_at(slot)
    }

    /// Node handles referenced from any value slot, in slot order.
    pub fn node_refs(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.values.iter().flat_map(|v| v.node_refs().iter().copied())
    }
}

// ─── Links ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkKind {
    /// eventOut → eventIn.
    Route,
    /// PROTO instance interface → implementation node interface.
    IsIn,
    /// Implementation node eventOut → PROTO instance interface.
    IsOut,
}

/// Edge weight. `from`/`to` are canonical interface ids on the source and
/// target nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventLink {
    pub kind: LinkKind,
    pub from: Name,
    pub to: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub from_node: NodeIndex,
    pub from_event: Name,
    pub to_node: NodeIndex,
    pub to_event: Name,
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub graph: StableDiGraph<Node, EventLink>,
    /// Open capture frames, innermost last. Each records the nodes created
    /// while a PROTO declaration is being parsed.
    captures: Vec<Vec<NodeIndex>>,
}

type Result<T> = std::result::Result<T, VrmlError>;

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.graph.node_weight_mut(idx)
    }

    fn live(&self, idx: NodeIndex) -> Result<&Node> {
        self.graph
            .node_weight(idx)
            .ok_or(VrmlError::DanglingNode(idx.index()))
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn insert(&mut self, node: Node) -> NodeIndex {
        let idx = self.graph.add_node(node);
        if let Some(frame) = self.captures.last_mut() {
            frame.push(idx);
        }
        idx
    }

    /// Create a plain (non-PROTO) node. Initial values override the type
    /// defaults; each must name a field or exposedField of matching type.
    pub fn add_node(
        &mut self,
        node_type: &Arc<NodeType>,
        initial: Vec<(Name, FieldValue)>,
    ) -> Result<NodeIndex> {
        let mut node = Node::new(node_type);
        for (name, value) in initial {
            let slot = node_type.interfaces.field(name).ok_or(VrmlError::UnknownInterface {
                node_type: node_type.id,
                interface: name,
            })?;
            value.expect_type(node_type.interfaces.at(slot).field_type)?;
            node.values[slot] = value;
        }
        Ok(self.insert(node))
    }

    pub fn set_name(&mut self, idx: NodeIndex, name: Name) {
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.name = Some(name);
        }
    }

    /// Current value of a field or exposedField.
    pub fn field(&self, idx: NodeIndex, name: Name) -> Result<&FieldValue> {
        let node = self.live(idx)?;
        node.field(name).ok_or(VrmlError::UnknownInterface {
            node_type: node.type_name(),
            interface: name,
        })
    }

    /// Assign a field or exposedField. The value is type-checked and, on a
    /// PROTO instance, pushed into every implementation field bound to it.
    pub fn set_field(&mut self, idx: NodeIndex, name: Name, value: FieldValue) -> Result<()> {
        let node = self.live(idx)?;
        let slot = node.node_type.interfaces.field(name).ok_or(VrmlError::UnknownInterface {
            node_type: node.type_name(),
            interface: name,
        })?;
        let interface = *node.node_type.interfaces.at(slot);
        value.expect_type(interface.field_type)?;

        for (target, field) in self.links_from(idx, interface.id, LinkKind::IsIn) {
            let bound = self
                .node(target)
                .is_some_and(|n| n.node_type.interfaces.field(field).is_some());
            if bound {
                self.set_field(target, field, value.clone())?;
            }
        }
        self.store(idx, slot, value);
        Ok(())
    }

    pub(crate) fn store(&mut self, idx: NodeIndex, slot: usize, value: FieldValue) {
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.values[slot] = value;
        }
    }

    /// Targets of links of `kind` leaving `idx` from interface `from`.
    pub(crate) fn links_from(
        &self,
        idx: NodeIndex,
        from: Name,
        kind: LinkKind,
    ) -> Vec<(NodeIndex, Name)> {
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == kind && e.weight().from == from)
            .map(|e| (e.id(), e.target(), e.weight().to))
            .collect();
        out.sort_by_key(|(edge, _, _)| *edge);
        out.into_iter().map(|(_, n, to)| (n, to)).collect()
    }

    /// Every link leaving `idx`, in creation order.
    pub fn links(&self, idx: NodeIndex) -> Vec<(NodeIndex, EventLink)> {
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), *e.weight()))
            .collect();
        out.sort_by_key(|(edge, _, _)| *edge);
        out.into_iter().map(|(_, n, link)| (n, link)).collect()
    }

    /// Child handles held in node-valued fields, in slot order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.node(idx)
            .map(|n| n.node_refs().collect())
            .unwrap_or_default()
    }

    // ─── Routes ──────────────────────────────────────────────────────────

    /// Validate both endpoints and connect them. Returns `Ok(false)` if an
    /// identical route already exists; no second connection is made.
    pub fn add_route(
        &mut self,
        from_node: NodeIndex,
        from_event: Name,
        to_node: NodeIndex,
        to_event: Name,
    ) -> Result<bool> {
        let (from, to) = self.resolve_route(from_node, from_event, to_node, to_event)?;
        let exists = self
            .graph
            .edges_connecting(from_node, to_node)
            .any(|e| *e.weight() == EventLink { kind: LinkKind::Route, from, to });
        if exists {
            log::debug!("ignoring redundant route {from}→{to}");
            return Ok(false);
        }
        self.graph.add_edge(
            from_node,
            to_node,
            EventLink {
                kind: LinkKind::Route,
                from,
                to,
            },
        );
        log::debug!(
            "route #{}.{from} → #{}.{to}",
            from_node.index(),
            to_node.index()
        );
        Ok(true)
    }

    /// Canonical (eventOut, eventIn) ids of a prospective route.
    fn resolve_route(
        &self,
        from_node: NodeIndex,
        from_event: Name,
        to_node: NodeIndex,
        to_event: Name,
    ) -> Result<(Name, Name)> {
        let source = &self.live(from_node)?.node_type;
        let target = &self.live(to_node)?.node_type;
        let out_slot = source
            .interfaces
            .event_out(from_event)
            .ok_or(VrmlError::NoEventOut {
                node_type: source.id,
                event: from_event,
            })?;
        let in_slot = target
            .interfaces
            .event_in(to_event)
            .ok_or(VrmlError::NoEventIn {
                node_type: target.id,
                event: to_event,
            })?;
        let out = source.interfaces.at(out_slot);
        let input = target.interfaces.at(in_slot);
        if out.field_type != input.field_type {
            return Err(VrmlError::RouteTypeMismatch {
                from: out.field_type,
                to: input.field_type,
            });
        }
        Ok((out.id, input.id))
    }

    /// Remove a route. Returns whether one existed.
    pub fn delete_route(
        &mut self,
        from_node: NodeIndex,
        from_event: Name,
        to_node: NodeIndex,
        to_event: Name,
    ) -> bool {
        let Ok((from, to)) = self.resolve_route(from_node, from_event, to_node, to_event) else {
            return false;
        };
        let edge = self
            .graph
            .edges_connecting(from_node, to_node)
            .find(|e| *e.weight() == EventLink { kind: LinkKind::Route, from, to })
            .map(|e| e.id());
        edge.and_then(|e| self.graph.remove_edge(e)).is_some()
    }

    /// Every route in the arena, in creation order.
    pub fn routes(&self) -> Vec<Route> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .filter(|e| e.weight().kind == LinkKind::Route)
            .map(|e| {
                (
                    e.id(),
                    Route {
                        from_node: e.source(),
                        from_event: e.weight().from,
                        to_node: e.target(),
                        to_event: e.weight().to,
                    },
                )
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, r)| r).collect()
    }

    pub(crate) fn link(&mut self, from: NodeIndex, to: NodeIndex, link: EventLink) {
        self.graph.add_edge(from, to, link);
    }

    // ─── PROTO templates ─────────────────────────────────────────────────

    /// Start recording every node created from now on.
    pub fn begin_capture(&mut self) {
        self.captures.push(Vec::new());
    }

    /// Stop the innermost recording and return what it captured. With
    /// `merge_into_parent` the nodes are also recorded by the enclosing frame.
    pub fn end_capture(&mut self, merge_into_parent: bool) -> Vec<NodeIndex> {
        let captured = self.captures.pop().unwrap_or_default();
        if merge_into_parent && let Some(parent) = self.captures.last_mut() {
            parent.extend_from_slice(&captured);
        }
        captured
    }

    pub fn mark_template(&mut self, members: &[NodeIndex]) {
        for &idx in members {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                node.template = true;
            }
        }
    }

    /// Deep-copy a set of nodes. Node handles pointing inside the set are
    /// remapped to the copies, handles pointing outside are shared, and
    /// links between members are copied. Returns old → new handles.
    pub fn clone_nodes(&mut self, members: &[NodeIndex]) -> HashMap<NodeIndex, NodeIndex> {
        let mut remap = HashMap::with_capacity(members.len());
        for &old in members {
            if let Some(node) = self.graph.node_weight(old) {
                let mut copy = node.clone();
                copy.template = false;
                let new = self.insert(copy);
                remap.insert(old, new);
            }
        }

        for &new in remap.values() {
            if let Some(node) = self.graph.node_weight_mut(new) {
                for value in &mut node.values {
                    value.remap_nodes(&remap);
                }
                for idx in &mut node.implementation {
                    if let Some(mapped) = remap.get(idx) {
                        *idx = *mapped;
                    }
                }
            }
        }

        let mut links: Vec<_> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let from = remap.get(&e.source())?;
                let to = remap.get(&e.target())?;
                Some((e.id(), *from, *to, *e.weight()))
            })
            .collect();
        links.sort_by_key(|(id, _, _, _)| *id);
        for (_, from, to, link) in links {
            self.graph.add_edge(from, to, link);
        }
        remap
    }

    // ─── Garbage collection ──────────────────────────────────────────────

    /// Remove every node unreachable from `roots` through node-valued fields,
    /// PROTO implementations and the templates of PROTO types in use. Returns
    /// the removed nodes so a viewer can release their resources.
    pub fn collect_garbage(&mut self, roots: &[NodeIndex]) -> Vec<(NodeIndex, Node)> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<NodeIndex> = roots.to_vec();

        while let Some(idx) = stack.pop() {
            let Some(node) = self.graph.node_weight(idx) else {
                continue;
            };
            if !visited.insert(idx) {
                continue;
            }
            stack.extend(node.node_refs());
            stack.extend(node.implementation.iter().copied());
            if let Some(def) = node.node_type.proto() {
                stack.extend(def.members.iter().copied());
            }
        }

        let dead: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|i| !visited.contains(i))
            .collect();
        let mut removed = Vec::with_capacity(dead.len());
        for idx in dead {
            if let Some(node) = self.graph.remove_node(idx) {
                log::debug!("collected node #{} ({})", idx.index(), node.type_name());
                removed.push((idx, node));
            }
        }
        removed
    }
}
