//! Browser session: the node-class registry, the scene arena and document
//! loading.
//!
//! Loading is all-or-nothing. The parse runs against a staged copy of the
//! arena; only a successful parse replaces the live arena and commits the
//! PROTO classes it declared to the registry.

use crate::builtins;
use crate::error::{Diagnostic, VrmlError};
use crate::id::Name;
use crate::model::{Node, Route, SceneGraph};
use crate::node_type::{NodeClassRegistry, NodeType};
use crate::parser::{self, Definition};
use crate::proto::Declaration;
use crate::scope::{ScopeId, ScopeTree};
use petgraph::graph::NodeIndex;
use std::sync::Arc;

/// Produces the text of a document given its URI.
pub trait DocumentSource {
    fn fetch(&self, uri: &str) -> Result<String, VrmlError>;
}

/// Reads plain paths and `file://` URIs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl DocumentSource for FileSource {
    fn fetch(&self, uri: &str) -> Result<String, VrmlError> {
        let path = match uri.strip_prefix("file://") {
            Some(path) => path,
            None if uri.contains("://") => {
                return Err(VrmlError::Io(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("no transport for {uri}"),
                )));
            }
            None => uri,
        };
        Ok(std::fs::read_to_string(path)?)
    }
}

/// A successfully parsed document.
#[derive(Debug)]
pub struct Scene {
    pub uri: String,
    /// Top-level nodes in source order.
    pub roots: Vec<NodeIndex>,
    pub scopes: ScopeTree,
    pub root_scope: ScopeId,
    /// Top-level PROTO and EXTERNPROTO declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Top-level ROUTEs, redundant ones dropped.
    pub routes: Vec<Route>,
    pub definitions: Vec<Definition>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scene {
    /// A node DEF'd at the top level of the document.
    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.scopes.find_node(self.root_scope, Name::intern(name))
    }

    /// A node type visible at the top level: built-ins plus PROTOs and bound
    /// EXTERNPROTOs.
    pub fn find_type(&self, name: &str) -> Option<&Arc<NodeType>> {
        self.scopes.find_type(self.root_scope, Name::intern(name))
    }

    /// Nodes this scene keeps alive: its roots, every DEF'd node and the
    /// templates of the PROTOs it declares.
    pub fn live_nodes(&self) -> Vec<NodeIndex> {
        let mut nodes = self.roots.clone();
        nodes.extend(self.scopes.bound_nodes());
        for declaration in &self.declarations {
            if let Declaration::Proto(ty) = declaration
                && let Some(def) = ty.proto()
            {
                nodes.extend(def.members.iter().copied());
            }
        }
        nodes
    }
}

#[derive(Debug, Clone)]
pub struct Browser {
    registry: NodeClassRegistry,
    graph: SceneGraph,
}

impl Default for Browser {
    fn default() -> Self {
        Self::new()
    }
}

impl Browser {
    /// A session with the built-in node classes registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(NodeClassRegistry::with_builtins())
    }

    #[must_use]
    pub fn with_registry(registry: NodeClassRegistry) -> Self {
        Self {
            registry,
            graph: SceneGraph::new(),
        }
    }

    pub fn registry(&self) -> &NodeClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeClassRegistry {
        &mut self.registry
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Parse `text` as the document `uri`. On error the session is left
    /// exactly as it was.
    #[must_use = "the loaded scene should be used"]
    pub fn load(&mut self, uri: &str, text: &str) -> Result<Scene, VrmlError> {
        let mut staged = self.graph.clone();
        let mut scopes = ScopeTree::new();
        let root_scope = scopes.root(uri, builtins::builtin_types());

        let output = parser::parse_scene(uri, text, &mut staged, &mut scopes, root_scope, &self.registry)
            .inspect_err(|e| log::debug!("load of {uri} failed: {e}"))?;

        self.graph = staged;
        for (identity, class) in output.classes {
            self.registry.register(identity, class);
        }
        log::info!(
            "loaded {uri}: {} nodes in session, {} diagnostics",
            self.graph.node_count(),
            output.diagnostics.len()
        );
        Ok(Scene {
            uri: uri.to_string(),
            roots: output.roots,
            scopes,
            root_scope,
            declarations: output.declarations,
            routes: output.routes,
            definitions: output.definitions,
            diagnostics: output.diagnostics,
        })
    }

    /// Fetch `uri` through `source`, then [`load`](Self::load) it.
    #[must_use = "the loaded scene should be used"]
    pub fn load_url(&mut self, uri: &str, source: &dyn DocumentSource) -> Result<Scene, VrmlError> {
        let text = source.fetch(uri)?;
        self.load(uri, &text)
    }

    /// Drop every node no longer reachable from the given scenes or from the
    /// templates of registered PROTO classes. Returns the removed nodes so a
    /// viewer can release what it built for them.
    pub fn collect_garbage(&mut self, scenes: &[&Scene]) -> Vec<(NodeIndex, Node)> {
        let mut roots: Vec<NodeIndex> = scenes.iter().flat_map(|s| s.live_nodes()).collect();
        roots.extend(self.registry.template_nodes());
        let removed = self.graph.collect_garbage(&roots);
        log::debug!("garbage collection removed {} nodes", removed.len());
        removed
    }
}
