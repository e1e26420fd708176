//! Node types, their interfaces, and the node-class registry.
//!
//! A `NodeType` is immutable once built and shared through `Arc` by every
//! node instance of that type. Types come from three places: the built-in
//! table, a Script node's inline declarations, or a PROTO declaration.
//! `NodeClass` is the factory seam used by EXTERNPROTO resolution.

use crate::error::VrmlError;
use crate::field::{FieldType, FieldValue};
use crate::id::Name;
use crate::model::SceneGraph;
use crate::proto::ProtoDefinition;
use crate::scanner::TokenKind;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry key prefix of the built-in node classes.
pub const BUILTIN_URN_PREFIX: &str = "urn:vrml97:node:";

// ─── Interfaces ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InterfaceKind {
    Field,
    ExposedField,
    EventIn,
    EventOut,
}

impl InterfaceKind {
    pub fn keyword(self) -> &'static str {
        match self {
            InterfaceKind::Field => "field",
            InterfaceKind::ExposedField => "exposedField",
            InterfaceKind::EventIn => "eventIn",
            InterfaceKind::EventOut => "eventOut",
        }
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Field => Some(InterfaceKind::Field),
            TokenKind::ExposedField => Some(InterfaceKind::ExposedField),
            TokenKind::EventIn => Some(InterfaceKind::EventIn),
            TokenKind::EventOut => Some(InterfaceKind::EventOut),
            _ => None,
        }
    }

    /// Field and exposedField interfaces carry a stored value.
    pub fn has_value(self) -> bool {
        matches!(self, InterfaceKind::Field | InterfaceKind::ExposedField)
    }

    pub fn accepts_events(self) -> bool {
        matches!(self, InterfaceKind::EventIn | InterfaceKind::ExposedField)
    }

    pub fn emits_events(self) -> bool {
        matches!(self, InterfaceKind::EventOut | InterfaceKind::ExposedField)
    }

    /// Whether an implementation interface of kind `self` may be bound with
    /// `IS` to a PROTO interface of kind `proto`.
    pub fn can_be_bound_to(self, proto: InterfaceKind) -> bool {
        match self {
            InterfaceKind::ExposedField => true,
            InterfaceKind::EventIn | InterfaceKind::EventOut => {
                proto == self || proto == InterfaceKind::ExposedField
            }
            InterfaceKind::Field => proto == InterfaceKind::Field,
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeInterface {
    pub kind: InterfaceKind,
    pub field_type: FieldType,
    pub id: Name,
}

impl NodeInterface {
    pub fn new(kind: InterfaceKind, field_type: FieldType, id: impl Into<Name>) -> Self {
        Self {
            kind,
            field_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.field_type, self.id)
    }
}

/// Ordered set of interfaces, unique by id. A node's value slots are indexed
/// by position in this set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceSet {
    items: Vec<NodeInterface>,
}

impl InterfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interface. Returns false, leaving the set unchanged, if the
    /// id is already declared.
    pub fn add(&mut self, interface: NodeInterface) -> bool {
        if self.position(interface.id).is_some() {
            return false;
        }
        self.items.push(interface);
        true
    }

    pub fn position(&self, id: Name) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    pub fn get(&self, id: Name) -> Option<&NodeInterface> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn at(&self, slot: usize) -> &NodeInterface {
        &self.items[slot]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeInterface> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slot of a field or exposedField named `id`.
    pub fn field(&self, id: Name) -> Option<usize> {
        self.position(id)
            .filter(|&slot| self.items[slot].kind.has_value())
    }

    /// Slot answering to eventIn `id`. An exposedField `x` also answers to
    /// `set_x`.
    pub fn event_in(&self, id: Name) -> Option<usize> {
        if let Some(slot) = self.position(id)
            && self.items[slot].kind.accepts_events()
        {
            return Some(slot);
        }
        self.position(id.without_set_prefix()?)
            .filter(|&slot| self.items[slot].kind == InterfaceKind::ExposedField)
    }

    /// Slot answering to eventOut `id`. An exposedField `x` also answers to
    /// `x_changed`.
    pub fn event_out(&self, id: Name) -> Option<usize> {
        if let Some(slot) = self.position(id)
            && self.items[slot].kind.emits_events()
        {
            return Some(slot);
        }
        self.position(id.without_changed_suffix()?)
            .filter(|&slot| self.items[slot].kind == InterfaceKind::ExposedField)
    }
}

impl<'a> IntoIterator for &'a InterfaceSet {
    type Item = &'a NodeInterface;
    type IntoIter = std::slice::Iter<'a, NodeInterface>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ─── Capabilities ────────────────────────────────────────────────────────

/// What a node can do, independent of which class produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    /// May appear in a grouping node's `children`.
    Child,
    Grouping,
    Shape,
    Geometry,
    /// Coordinate, Normal, Color, TextureCoordinate.
    GeometryProperty,
    Appearance,
    Material,
    Texture,
    TextureTransform,
    FontStyle,
    Light,
    Bindable,
    Sensor,
    Interpolator,
    AudioSource,
    Script,
}

// ─── Node types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum TypeOrigin {
    Builtin,
    Script,
    Proto(Arc<ProtoDefinition>),
}

#[derive(Debug, Clone)]
pub struct NodeType {
    /// Name the type is known by in its scope.
    pub id: Name,
    /// The class this type was produced from: a built-in name, `Script`, or
    /// a PROTO identity.
    pub class: Name,
    pub interfaces: InterfaceSet,
    /// One default per interface slot. Event slots hold the zero value.
    defaults: Vec<FieldValue>,
    pub capabilities: SmallVec<[Capability; 2]>,
    pub origin: TypeOrigin,
}

impl NodeType {
    /// Build a type. `defaults` supplies values for field/exposedField
    /// interfaces; missing entries fall back to the type's zero value.
    pub fn new(
        id: Name,
        class: Name,
        interfaces: InterfaceSet,
        mut defaults: HashMap<Name, FieldValue>,
        capabilities: &[Capability],
        origin: TypeOrigin,
    ) -> Self {
        let defaults = interfaces
            .iter()
            .map(|i| match defaults.remove(&i.id) {
                Some(v) if i.kind.has_value() => v,
                _ => i.field_type.zero_value(),
            })
            .collect();
        Self {
            id,
            class,
            interfaces,
            defaults,
            capabilities: SmallVec::from_slice(capabilities),
            origin,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn default_at(&self, slot: usize) -> &FieldValue {
        &self.defaults[slot]
    }

    pub fn default_value(&self, id: Name) -> Option<&FieldValue> {
        self.interfaces.position(id).map(|slot| &self.defaults[slot])
    }

    pub fn defaults(&self) -> &[FieldValue] {
        &self.defaults
    }

    pub fn proto(&self) -> Option<&Arc<ProtoDefinition>> {
        match &self.origin {
            TypeOrigin::Proto(def) => Some(def),
            _ => None,
        }
    }

    /// Instantiate a node of this type into `graph`. Initial values override
    /// defaults and must match the declared field types.
    pub fn create_node(
        self: &Arc<Self>,
        graph: &mut SceneGraph,
        initial: Vec<(Name, FieldValue)>,
    ) -> Result<NodeIndex, VrmlError> {
        match &self.origin {
            TypeOrigin::Proto(def) => crate::proto::instantiate(def, self, graph, initial),
            TypeOrigin::Builtin | TypeOrigin::Script => graph.add_node(self, initial),
        }
    }

    /// Copy of this type known under a different id. Used when a class
    /// produces a type for an EXTERNPROTO.
    fn renamed(&self, id: Name) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

// ─── Node classes ────────────────────────────────────────────────────────

/// A factory of node types.
pub trait NodeClass: Send + Sync {
    /// Produce a type named `id` that provides every interface in
    /// `interfaces`.
    fn create_type(&self, id: Name, interfaces: &InterfaceSet) -> Result<Arc<NodeType>, VrmlError>;

    /// Arena nodes the class clones from. They stay alive while the class is
    /// registered.
    fn template_nodes(&self) -> &[NodeIndex] {
        &[]
    }
}

/// A class backed by a complete prototype type: built-ins and PROTOs.
/// `create_type` accepts any subset of the prototype's interfaces.
pub struct TypeClass {
    identity: String,
    prototype: Arc<NodeType>,
}

impl TypeClass {
    pub fn new(identity: impl Into<String>, prototype: Arc<NodeType>) -> Self {
        Self {
            identity: identity.into(),
            prototype,
        }
    }

    pub fn prototype(&self) -> &Arc<NodeType> {
        &self.prototype
    }
}

impl NodeClass for TypeClass {
    fn create_type(
        &self,
        id: Name,
        interfaces: &InterfaceSet,
    ) -> Result<Arc<NodeType>, VrmlError> {
        for declared in interfaces {
            let provided = self.prototype.interfaces.get(declared.id);
            if provided != Some(declared) {
                return Err(VrmlError::InterfaceMismatch {
                    class: self.identity.clone(),
                    interface: declared.to_string(),
                });
            }
        }
        Ok(Arc::new(self.prototype.renamed(id)))
    }

    fn template_nodes(&self) -> &[NodeIndex] {
        self.prototype.proto().map_or(&[], |def| def.members.as_slice())
    }
}

/// Node classes of one browser session, keyed by class identity.
#[derive(Clone, Default)]
pub struct NodeClassRegistry {
    classes: HashMap<String, Arc<dyn NodeClass>>,
}

impl NodeClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in VRML97 class under
    /// `urn:vrml97:node:<Name>`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ty in crate::builtins::builtin_types() {
            let identity = format!("{BUILTIN_URN_PREFIX}{}", ty.id);
            registry.register(identity.clone(), Arc::new(TypeClass::new(identity, ty)));
        }
        registry
    }

    /// Register a class, replacing any class with the same identity.
    pub fn register(&mut self, identity: impl Into<String>, class: Arc<dyn NodeClass>) {
        let identity = identity.into();
        log::debug!("registering node class {identity}");
        self.classes.insert(identity, class);
    }

    /// Drop a class, as when the document that declared it is unloaded.
    pub fn unregister(&mut self, identity: &str) -> Option<Arc<dyn NodeClass>> {
        log::debug!("unregistering node class {identity}");
        self.classes.remove(identity)
    }

    pub fn get(&self, identity: &str) -> Option<&Arc<dyn NodeClass>> {
        self.classes.get(identity)
    }

    /// Template nodes of every registered PROTO class.
    pub fn template_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.classes
            .values()
            .flat_map(|class| class.template_nodes().iter().copied())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.classes.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl fmt::Debug for NodeClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.identities().collect();
        keys.sort_unstable();
        f.debug_struct("NodeClassRegistry")
            .field("classes", &keys)
            .finish()
    }
}
