pub mod browser;
pub mod builtins;
pub mod emitter;
pub mod error;
pub mod events;
pub mod field;
pub mod id;
pub mod model;
pub mod node_type;
pub mod parser;
pub mod proto;
pub mod scanner;
pub mod scope;
pub mod values;

pub use browser::{Browser, DocumentSource, FileSource, Scene};
pub use emitter::{emit_document, emit_node, emit_scene};
pub use error::{Diagnostic, Severity, VrmlError};
pub use events::ScriptEvent;
pub use field::{Color, FieldType, FieldValue, Image, Rotation, Vec2f, Vec3f};
pub use id::Name;
pub use model::{EventLink, LinkKind, Node, Route, SceneGraph};
pub use node_type::{
    Capability, InterfaceKind, InterfaceSet, NodeClass, NodeClassRegistry, NodeInterface,
    NodeType, TypeOrigin,
};
pub use parser::{Definition, DefinitionKind};
pub use proto::{Declaration, ProtoDefinition};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
