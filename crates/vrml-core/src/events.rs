//! Event cascade over ROUTEs and PROTO forwarding links.
//!
//! One cascade starts from a single `send_event`/`emit_event` call. Every
//! (node, interface, direction) fires at most once per cascade, which keeps
//! routing loops finite. Events that reach a Script node are handed back to
//! the caller for the scripting backend.

use crate::error::VrmlError;
use crate::field::FieldValue;
use crate::id::Name;
use crate::model::{LinkKind, SceneGraph};
use crate::node_type::{InterfaceKind, TypeOrigin};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// An event delivered to a Script node's eventIn.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub script: NodeIndex,
    pub event: Name,
    pub value: FieldValue,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Direction {
    In,
    Out,
}

struct Cascade {
    timestamp: f64,
    visited: HashSet<(NodeIndex, Name, Direction)>,
    script_events: Vec<ScriptEvent>,
}

impl SceneGraph {
    /// Deliver `value` to eventIn `event_in` of `node` (exposedField `x` also
    /// answers to `set_x`) and run the resulting cascade.
    pub fn send_event(
        &mut self,
        node: NodeIndex,
        event_in: Name,
        value: FieldValue,
        timestamp: f64,
    ) -> Result<Vec<ScriptEvent>, VrmlError> {
        let ty = &self
            .node(node)
            .ok_or(VrmlError::DanglingNode(node.index()))?
            .node_type;
        let slot = ty.interfaces.event_in(event_in).ok_or(VrmlError::NoEventIn {
            node_type: ty.id,
            event: event_in,
        })?;
        value.expect_type(ty.interfaces.at(slot).field_type)?;

        let mut cascade = Cascade::new(timestamp);
        self.deliver(node, slot, value, &mut cascade);
        Ok(cascade.script_events)
    }

    /// Emit `value` from eventOut `event_out` of `node`, as a sensor or a
    /// scripting backend would, and run the resulting cascade.
    pub fn emit_event(
        &mut self,
        node: NodeIndex,
        event_out: Name,
        value: FieldValue,
        timestamp: f64,
    ) -> Result<Vec<ScriptEvent>, VrmlError> {
        let ty = &self
            .node(node)
            .ok_or(VrmlError::DanglingNode(node.index()))?
            .node_type;
        let slot = ty
            .interfaces
            .event_out(event_out)
            .ok_or(VrmlError::NoEventOut {
                node_type: ty.id,
                event: event_out,
            })?;
        value.expect_type(ty.interfaces.at(slot).field_type)?;

        let mut cascade = Cascade::new(timestamp);
        self.emit(node, slot, value, &mut cascade);
        Ok(cascade.script_events)
    }

    fn deliver(&mut self, node: NodeIndex, slot: usize, value: FieldValue, cascade: &mut Cascade) {
        let Some(ty) = self.node(node).map(|n| n.node_type.clone()) else {
            return;
        };
        let interface = *ty.interfaces.at(slot);
        if !cascade.visited.insert((node, interface.id, Direction::In)) {
            return;
        }
        log::trace!("event #{}.{} ← {value}", node.index(), interface.id);

        // A PROTO wrapping a Script forwards through IS instead.
        if matches!(ty.origin, TypeOrigin::Script) {
            cascade.script_events.push(ScriptEvent {
                script: node,
                event: interface.id,
                value,
                timestamp: cascade.timestamp,
            });
            return;
        }

        let exposed = interface.kind == InterfaceKind::ExposedField;
        if exposed || interface.kind == InterfaceKind::EventIn {
            self.store(node, slot, value.clone());
        }

        for (target, event) in self.links_from(node, interface.id, LinkKind::IsIn) {
            let target_slot = self
                .node(target)
                .and_then(|n| n.node_type.interfaces.event_in(event));
            if let Some(target_slot) = target_slot {
                self.deliver(target, target_slot, value.clone(), cascade);
            }
        }

        if exposed {
            self.emit(node, slot, value, cascade);
        }
    }

    fn emit(&mut self, node: NodeIndex, slot: usize, value: FieldValue, cascade: &mut Cascade) {
        let Some(ty) = self.node(node).map(|n| n.node_type.clone()) else {
            return;
        };
        let interface = *ty.interfaces.at(slot);
        if !cascade.visited.insert((node, interface.id, Direction::Out)) {
            return;
        }
        if interface.kind == InterfaceKind::EventOut {
            self.store(node, slot, value.clone());
        }

        for (target, event) in self.links_from(node, interface.id, LinkKind::Route) {
            let target_slot = self
                .node(target)
                .and_then(|n| n.node_type.interfaces.event_in(event));
            if let Some(target_slot) = target_slot {
                self.deliver(target, target_slot, value.clone(), cascade);
            }
        }
        for (instance, event) in self.links_from(node, interface.id, LinkKind::IsOut) {
            let target_slot = self
                .node(instance)
                .and_then(|n| n.node_type.interfaces.event_out(event));
            if let Some(target_slot) = target_slot {
                self.emit(instance, target_slot, value.clone(), cascade);
            }
        }
    }
}

impl Cascade {
    fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            visited: HashSet::new(),
            script_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin_types;
    use crate::node_type::NodeType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn ty(name: &str) -> Arc<NodeType> {
        builtin_types()
            .into_iter()
            .find(|t| t.id.as_str() == name)
            .unwrap()
    }

    fn n(s: &str) -> Name {
        Name::intern(s)
    }

    #[test]
    fn exposed_field_event_updates_value_and_follows_routes() {
        let mut g = SceneGraph::new();
        let a = g.add_node(&ty("Transform"), Vec::new()).unwrap();
        let b = g.add_node(&ty("Transform"), Vec::new()).unwrap();
        g.add_route(a, n("translation_changed"), b, n("set_translation"))
            .unwrap();

        let scripts = g
            .send_event(a, n("set_translation"), FieldValue::SFVec3f([1.0, 2.0, 3.0]), 0.5)
            .unwrap();
        assert!(scripts.is_empty());
        assert_eq!(g.field(a, n("translation")).unwrap(), &FieldValue::SFVec3f([1.0, 2.0, 3.0]));
        assert_eq!(g.field(b, n("translation")).unwrap(), &FieldValue::SFVec3f([1.0, 2.0, 3.0]));
    }

    #[test]
    fn route_cycles_terminate() {
        let mut g = SceneGraph::new();
        let a = g.add_node(&ty("Transform"), Vec::new()).unwrap();
        let b = g.add_node(&ty("Transform"), Vec::new()).unwrap();
        g.add_route(a, n("scale"), b, n("scale")).unwrap();
        g.add_route(b, n("scale"), a, n("scale")).unwrap();
        g.send_event(a, n("set_scale"), FieldValue::SFVec3f([2.0; 3]), 0.0)
            .unwrap();
        assert_eq!(g.field(b, n("scale")).unwrap(), &FieldValue::SFVec3f([2.0; 3]));
    }

    #[test]
    fn wrong_event_type_is_rejected() {
        let mut g = SceneGraph::new();
        let a = g.add_node(&ty("Transform"), Vec::new()).unwrap();
        let err = g
            .send_event(a, n("set_translation"), FieldValue::SFFloat(1.0), 0.0)
            .unwrap_err();
        assert!(matches!(err, VrmlError::TypeMismatch { .. }));
        let err = g
            .send_event(a, n("nothing"), FieldValue::SFFloat(1.0), 0.0)
            .unwrap_err();
        assert!(matches!(err, VrmlError::NoEventIn { .. }));
    }

    #[test]
    fn emitted_event_reaches_interpolator() {
        let mut g = SceneGraph::new();
        let timer = g.add_node(&ty("TimeSensor"), Vec::new()).unwrap();
        let interp = g.add_node(&ty("ScalarInterpolator"), Vec::new()).unwrap();
        g.add_route(timer, n("fraction_changed"), interp, n("set_fraction"))
            .unwrap();
        g.emit_event(timer, n("fraction_changed"), FieldValue::SFFloat(0.25), 1.0)
            .unwrap();
        let slot = ty("ScalarInterpolator")
            .interfaces
            .event_in(n("set_fraction"))
            .unwrap();
        assert_eq!(g.node(interp).unwrap().value_at(slot), &FieldValue::SFFloat(0.25));
    }
}
