//! Recursive-descent parser for VRML97 text → live scene graph.
//!
//! There is no AST stage: every production builds nodes, scopes and node
//! types directly and validates them as it goes. The first syntax or
//! semantic error aborts the parse; the caller discards everything built
//! so far.

use crate::builtins;
use crate::error::{Diagnostic, VrmlError};
use crate::field::{FieldType, FieldValue};
use crate::id::Name;
use crate::model::{Route, SceneGraph};
use crate::node_type::{
    InterfaceKind, InterfaceSet, NodeClass, NodeClassRegistry, NodeInterface, NodeType,
    TypeClass, TypeOrigin,
};
use crate::proto::{Declaration, IsMapping, ProtoDefinition};
use crate::scanner::{Token, TokenKind};
use crate::scope::{NodeLookup, ScopeId, ScopeTree};
use crate::values::{self, TokenStream};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type Result<T> = std::result::Result<T, VrmlError>;

/// What a [`Definition`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefinitionKind {
    Def,
    Proto,
    ExternProto,
}

/// A DEF, PROTO or EXTERNPROTO site in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: Name,
    /// Node type of a DEF'd node; the declared name for PROTO/EXTERNPROTO.
    pub type_name: Name,
    pub line: usize,
    pub column: usize,
    /// Declared inside a PROTO body or interface list.
    pub in_proto: bool,
}

/// Everything a successful parse produced besides the nodes themselves.
pub struct ParseOutput {
    pub roots: Vec<NodeIndex>,
    pub routes: Vec<Route>,
    pub declarations: Vec<Declaration>,
    pub definitions: Vec<Definition>,
    pub diagnostics: Vec<Diagnostic>,
    /// PROTO classes to register once the parse is committed.
    pub classes: Vec<(String, Arc<dyn NodeClass>)>,
}

/// Parse `text` into `graph`, resolving names through `scopes` starting at
/// `root`.
pub fn parse_scene(
    uri: &str,
    text: &str,
    graph: &mut SceneGraph,
    scopes: &mut ScopeTree,
    root: ScopeId,
    registry: &NodeClassRegistry,
) -> Result<ParseOutput> {
    Parser {
        ts: TokenStream::new(uri, text),
        uri: uri.to_string(),
        graph,
        scopes,
        registry,
        protos: Vec::new(),
        routes: Vec::new(),
        declarations: Vec::new(),
        definitions: Vec::new(),
        staged: Vec::new(),
    }
    .scene(root)
}

/// Whether `IS` clauses are legal at this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Scene,
    ProtoBody,
}

enum NodeRef {
    Node(NodeIndex),
    /// `USE` of the Script whose body is being parsed.
    SelfRef,
}

/// An IS clause seen in a node body, before the node exists.
struct IsBinding {
    interface: Name,
    field: Name,
    written: Name,
    access: InterfaceKind,
}

/// State of a PROTO declaration being parsed.
#[derive(Default)]
struct ProtoFrame {
    interfaces: InterfaceSet,
    is_map: Vec<IsMapping>,
    routes: Vec<Route>,
    declarations: Vec<Declaration>,
}

struct Parser<'a, 'g> {
    ts: TokenStream<'a>,
    uri: String,
    graph: &'g mut SceneGraph,
    scopes: &'g mut ScopeTree,
    registry: &'g NodeClassRegistry,
    protos: Vec<ProtoFrame>,
    routes: Vec<Route>,
    declarations: Vec<Declaration>,
    definitions: Vec<Definition>,
    staged: Vec<(String, Arc<dyn NodeClass>)>,
}

impl Parser<'_, '_> {
    fn semantic(&self, token: &Token, message: impl Into<String>) -> VrmlError {
        VrmlError::semantic(&self.uri, token, message)
    }

    fn expect_id(&mut self, what: &str) -> Result<Token> {
        self.ts.expect(TokenKind::Id, what)
    }

    fn unexpected_next(&mut self, what: &str) -> VrmlError {
        let token = self.ts.next();
        self.ts.unexpected(&token, what)
    }

    // ─── Statements ──────────────────────────────────────────────────────

    fn scene(mut self, root: ScopeId) -> Result<ParseOutput> {
        let mut roots = Vec::new();
        while self.ts.peek_kind() != TokenKind::Eof {
            if let Some(node) = self.statement(root)? {
                roots.push(node);
            }
        }
        log::debug!(
            "parsed {}: {} root nodes, {} routes, {} declarations",
            self.uri,
            roots.len(),
            self.routes.len(),
            self.declarations.len()
        );
        Ok(ParseOutput {
            roots,
            routes: self.routes,
            declarations: self.declarations,
            definitions: self.definitions,
            diagnostics: self.ts.diagnostics,
            classes: self.staged,
        })
    }

    fn statement(&mut self, scope: ScopeId) -> Result<Option<NodeIndex>> {
        match self.ts.peek_kind() {
            TokenKind::Id | TokenKind::Def | TokenKind::Use => {
                self.node_statement(scope, Ctx::Scene).map(Some)
            }
            TokenKind::Proto | TokenKind::ExternProto => {
                self.proto_statement(scope)?;
                Ok(None)
            }
            TokenKind::Route => {
                self.route_statement(scope)?;
                Ok(None)
            }
            _ => Err(self.unexpected_next("a node, PROTO, EXTERNPROTO or ROUTE statement")),
        }
    }

    /// A node statement outside any Script body.
    fn node_statement(&mut self, scope: ScopeId, ctx: Ctx) -> Result<NodeIndex> {
        let start = self.ts.peek().clone();
        match self.node_reference(scope, ctx, None)? {
            NodeRef::Node(idx) => Ok(idx),
            NodeRef::SelfRef => Err(self.semantic(&start, "Script self-reference outside its body")),
        }
    }

    /// `DEF <id> <node>`, `USE <id>` or a bare node.
    fn node_reference(
        &mut self,
        scope: ScopeId,
        ctx: Ctx,
        self_id: Option<Name>,
    ) -> Result<NodeRef> {
        match self.ts.peek_kind() {
            TokenKind::Def => {
                self.ts.next();
                let name_tok = self.expect_id("a node name after DEF")?;
                let name = Name::intern(&name_tok.text);
                let idx = self.node(scope, ctx, Some(name))?;
                if !self.scopes.add_node(scope, name, idx) {
                    return Err(self.semantic(
                        &name_tok,
                        format!("Node \"{name}\" is already defined in this scope"),
                    ));
                }
                self.graph.set_name(idx, name);
                let type_name = self.graph.node(idx).map_or(name, |n| n.type_name());
                self.define(DefinitionKind::Def, name, type_name, &name_tok);
                Ok(NodeRef::Node(idx))
            }
            TokenKind::Use => {
                self.ts.next();
                let name_tok = self.expect_id("a node name after USE")?;
                let name = Name::intern(&name_tok.text);
                match self.scopes.lookup_node(scope, name, self_id) {
                    NodeLookup::Resolved(idx) => Ok(NodeRef::Node(idx)),
                    NodeLookup::SelfReference => Ok(NodeRef::SelfRef),
                    NodeLookup::Unresolved => Err(self.semantic(
                        &name_tok,
                        format!("Node \"{name}\" has not been defined in this scope"),
                    )),
                }
            }
            TokenKind::Id => self.node(scope, ctx, None).map(NodeRef::Node),
            _ => Err(self.unexpected_next("a node")),
        }
    }

    fn define(&mut self, kind: DefinitionKind, name: Name, type_name: Name, token: &Token) {
        self.definitions.push(Definition {
            kind,
            name,
            type_name,
            line: token.line,
            column: token.column,
            in_proto: !self.protos.is_empty(),
        });
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// `<type> { <body> }`. `def_name` is the DEF name being bound, which a
    /// Script body may `USE` to refer to itself.
    fn node(&mut self, scope: ScopeId, ctx: Ctx, def_name: Option<Name>) -> Result<NodeIndex> {
        let type_tok = self.expect_id("a node type name")?;
        if type_tok.text == "Script" {
            return self.script_node(scope, ctx, def_name, &type_tok);
        }
        let type_name = Name::intern(&type_tok.text);
        let Some(node_type) = self.scopes.find_type(scope, type_name).cloned() else {
            return Err(self.semantic(&type_tok, format!("Unknown node type \"{type_name}\"")));
        };
        self.ts.expect(TokenKind::LBrace, "'{'")?;

        let mut values: Vec<(Name, FieldValue)> = Vec::new();
        let mut seen: HashSet<Name> = HashSet::new();
        let mut bindings: Vec<IsBinding> = Vec::new();
        loop {
            match self.ts.peek_kind() {
                TokenKind::RBrace => {
                    self.ts.next();
                    break;
                }
                TokenKind::Id => {
                    let field_tok = self.ts.next();
                    let name = Name::intern(&field_tok.text);
                    if self.ts.peek_kind() == TokenKind::Is {
                        let interface = any_interface(&node_type.interfaces, name).ok_or_else(
                            || self.semantic(&field_tok, format!("Node has no interface \"{name}\"")),
                        )?;
                        self.is_binding(ctx, &field_tok, interface, &mut values, &mut seen, &mut bindings)?;
                        continue;
                    }
                    let slot = node_type.interfaces.field(name).ok_or_else(|| {
                        self.semantic(
                            &field_tok,
                            format!("Node has no field or exposedField \"{name}\""),
                        )
                    })?;
                    if !seen.insert(name) {
                        return Err(
                            self.semantic(&field_tok, format!("Value for {name} already declared"))
                        );
                    }
                    let field_type = node_type.interfaces.at(slot).field_type;
                    let (value, _) = self.field_value(scope, ctx, field_type, None)?;
                    values.push((name, value));
                }
                TokenKind::Route => self.route_statement(scope)?,
                TokenKind::Proto | TokenKind::ExternProto => self.proto_statement(scope)?,
                _ => return Err(self.unexpected_next("a field name, ROUTE, PROTO or '}'")),
            }
        }

        let idx = node_type
            .create_node(self.graph, values)
            .map_err(|e| e.at(&self.uri, &type_tok))?;
        self.bind_is(idx, bindings);
        log::trace!("node #{} {type_name}", idx.index());
        Ok(idx)
    }

    /// `Script { ... }`: the fixed Script interfaces plus inline
    /// `eventIn`/`eventOut`/`field` declarations build a per-node type.
    fn script_node(
        &mut self,
        scope: ScopeId,
        ctx: Ctx,
        self_id: Option<Name>,
        type_tok: &Token,
    ) -> Result<NodeIndex> {
        self.ts.expect(TokenKind::LBrace, "'{'")?;

        let mut interfaces = builtins::script_interfaces();
        let mut values: Vec<(Name, FieldValue)> = Vec::new();
        let mut seen: HashSet<Name> = HashSet::new();
        let mut bindings: Vec<IsBinding> = Vec::new();
        let mut self_refs: Vec<(Name, Vec<usize>)> = Vec::new();
        loop {
            let token = self.ts.peek().clone();
            match token.kind {
                TokenKind::RBrace => {
                    self.ts.next();
                    break;
                }
                TokenKind::EventIn | TokenKind::EventOut | TokenKind::Field => {
                    let (interface, id_tok) = self.interface_decl()?;
                    if !interfaces.add(interface) {
                        return Err(self.semantic(
                            &id_tok,
                            format!("Interface \"{}\" already declared", interface.id),
                        ));
                    }
                    if self.ts.peek_kind() == TokenKind::Is {
                        self.is_binding(ctx, &id_tok, interface, &mut values, &mut seen, &mut bindings)?;
                    } else if interface.kind == InterfaceKind::Field
                        && self.starts_value(scope, interface.field_type)
                    {
                        let (value, selfs) =
                            self.field_value(scope, ctx, interface.field_type, self_id)?;
                        if !selfs.is_empty() {
                            self_refs.push((interface.id, selfs));
                        }
                        seen.insert(interface.id);
                        values.push((interface.id, value));
                    }
                }
                TokenKind::ExposedField => {
                    return Err(self.semantic(
                        &token,
                        "Script nodes cannot declare exposedField interfaces",
                    ));
                }
                TokenKind::Id => {
                    self.ts.next();
                    let name = Name::intern(&token.text);
                    if self.ts.peek_kind() == TokenKind::Is {
                        let interface = any_interface(&interfaces, name).ok_or_else(|| {
                            self.semantic(&token, format!("Node has no interface \"{name}\""))
                        })?;
                        self.is_binding(ctx, &token, interface, &mut values, &mut seen, &mut bindings)?;
                        continue;
                    }
                    let slot = interfaces.field(name).ok_or_else(|| {
                        self.semantic(&token, format!("Node has no field or exposedField \"{name}\""))
                    })?;
                    if !seen.insert(name) {
                        return Err(
                            self.semantic(&token, format!("Value for {name} already declared"))
                        );
                    }
                    let field_type = interfaces.at(slot).field_type;
                    let (value, _) = self.field_value(scope, ctx, field_type, None)?;
                    values.push((name, value));
                }
                _ => {
                    return Err(
                        self.unexpected_next("an interface declaration, field name or '}'")
                    );
                }
            }
        }

        let script = Name::intern("Script");
        let node_type = Arc::new(NodeType::new(
            script,
            script,
            interfaces,
            HashMap::new(),
            builtins::SCRIPT_CAPABILITIES,
            TypeOrigin::Script,
        ));
        let idx = self
            .graph
            .add_node(&node_type, values)
            .map_err(|e| e.at(&self.uri, type_tok))?;

        for (field, positions) in self_refs {
            let mut value = self.graph.field(idx, field)?.clone();
            match &mut value {
                FieldValue::SFNode(slot) => *slot = Some(idx),
                FieldValue::MFNode(nodes) => {
                    for p in positions {
                        if let Some(handle) = nodes.get_mut(p) {
                            *handle = idx;
                        }
                    }
                }
                _ => {}
            }
            self.graph.set_field(idx, field, value)?;
        }
        self.bind_is(idx, bindings);
        Ok(idx)
    }

    /// `eventIn|eventOut|exposedField|field <type> <id>`.
    fn interface_decl(&mut self) -> Result<(NodeInterface, Token)> {
        let kind_tok = self.ts.next();
        let Some(kind) = InterfaceKind::from_token(kind_tok.kind) else {
            return Err(self.ts.unexpected(&kind_tok, "an interface declaration"));
        };
        let type_tok = self.ts.next();
        let TokenKind::FieldType(field_type) = type_tok.kind else {
            return Err(self.ts.unexpected(&type_tok, "a field type"));
        };
        let id_tok = self.expect_id("an interface name")?;
        let interface = NodeInterface::new(kind, field_type, id_tok.text.as_str());
        Ok((interface, id_tok))
    }

    /// Whether the next token can begin a value of `field_type`. Decides if
    /// an inline Script `field` declaration carries an initial value.
    fn starts_value(&mut self, scope: ScopeId, field_type: FieldType) -> bool {
        let token = self.ts.peek().clone();
        let scalar = match field_type {
            FieldType::SFBool => matches!(token.kind, TokenKind::True | TokenKind::False),
            FieldType::SFString | FieldType::MFString => token.kind == TokenKind::String,
            FieldType::SFNode | FieldType::MFNode => match token.kind {
                TokenKind::Null | TokenKind::Def | TokenKind::Use => true,
                TokenKind::Id => {
                    token.text == "Script"
                        || self.scopes.find_type(scope, Name::intern(&token.text)).is_some()
                }
                _ => false,
            },
            _ => matches!(
                token.kind,
                TokenKind::Integer | TokenKind::Real | TokenKind::HexInteger
            ),
        };
        scalar || (field_type.is_multi() && token.kind == TokenKind::LBracket)
    }

    /// Parse a value of `field_type`. Also returns the positions that held a
    /// Script self-reference, to be patched once the Script node exists.
    fn field_value(
        &mut self,
        scope: ScopeId,
        ctx: Ctx,
        field_type: FieldType,
        self_id: Option<Name>,
    ) -> Result<(FieldValue, Vec<usize>)> {
        match field_type {
            FieldType::SFNode => {
                if self.ts.eat(TokenKind::Null).is_some() {
                    return Ok((FieldValue::SFNode(None), Vec::new()));
                }
                Ok(match self.node_reference(scope, ctx, self_id)? {
                    NodeRef::Node(idx) => (FieldValue::SFNode(Some(idx)), Vec::new()),
                    NodeRef::SelfRef => (FieldValue::SFNode(None), vec![0]),
                })
            }
            FieldType::MFNode => {
                let bracketed = self.ts.eat(TokenKind::LBracket).is_some();
                let mut nodes = Vec::new();
                let mut selfs = Vec::new();
                loop {
                    if bracketed && self.ts.eat(TokenKind::RBracket).is_some() {
                        break;
                    }
                    match self.node_reference(scope, ctx, self_id)? {
                        NodeRef::Node(idx) => nodes.push(idx),
                        NodeRef::SelfRef => {
                            selfs.push(nodes.len());
                            nodes.push(NodeIndex::end());
                        }
                    }
                    if !bracketed {
                        break;
                    }
                }
                Ok((FieldValue::MFNode(nodes), selfs))
            }
            _ => Ok((values::parse_value(&mut self.ts, field_type)?, Vec::new())),
        }
    }

    // ─── IS ──────────────────────────────────────────────────────────────

    /// Handle `<interface> IS <protoInterface>` in a node body. Only a
    /// value-carrying mapping takes the field: it gets a zero placeholder
    /// until instantiation copies the PROTO's value in.
    fn is_binding(
        &mut self,
        ctx: Ctx,
        field_tok: &Token,
        interface: NodeInterface,
        values: &mut Vec<(Name, FieldValue)>,
        seen: &mut HashSet<Name>,
        bindings: &mut Vec<IsBinding>,
    ) -> Result<()> {
        let proto_interface = self.is_clause(ctx, interface)?;
        let access = match interface.kind {
            InterfaceKind::ExposedField => proto_interface.kind,
            kind => kind,
        };
        if access.has_value() {
            if !seen.insert(interface.id) {
                return Err(self.semantic(
                    field_tok,
                    format!("Value for {} already declared", interface.id),
                ));
            }
            values.push((interface.id, interface.field_type.zero_value()));
        }
        bindings.push(IsBinding {
            interface: proto_interface.id,
            field: interface.id,
            written: Name::intern(&field_tok.text),
            access,
        });
        Ok(())
    }

    /// `IS <id>`: check the PROTO interface exists and is compatible with the
    /// implementation interface.
    fn is_clause(&mut self, ctx: Ctx, interface: NodeInterface) -> Result<NodeInterface> {
        let is_tok = self.ts.next();
        if ctx != Ctx::ProtoBody {
            return Err(VrmlError::syntax(
                &self.uri,
                &is_tok,
                "IS is only allowed inside a PROTO body",
            ));
        }
        let id_tok = self.expect_id("a PROTO interface name after IS")?;
        let name = Name::intern(&id_tok.text);
        let Some(proto_interface) = self
            .protos
            .last()
            .and_then(|frame| frame.interfaces.get(name))
            .copied()
        else {
            return Err(self.semantic(&id_tok, format!("PROTO has no interface \"{name}\"")));
        };
        if !interface.kind.can_be_bound_to(proto_interface.kind)
            || interface.field_type != proto_interface.field_type
        {
            return Err(self.semantic(
                &id_tok,
                format!("{interface} cannot be mapped IS {proto_interface}"),
            ));
        }
        Ok(proto_interface)
    }

    fn bind_is(&mut self, node: NodeIndex, bindings: Vec<IsBinding>) {
        if let Some(frame) = self.protos.last_mut() {
            frame.is_map.extend(bindings.into_iter().map(|b| IsMapping {
                interface: b.interface,
                node,
                field: b.field,
                written: b.written,
                access: b.access,
            }));
        }
    }

    // ─── ROUTE ───────────────────────────────────────────────────────────

    /// `ROUTE <node>.<eventOut> TO <node>.<eventIn>`.
    fn route_statement(&mut self, scope: ScopeId) -> Result<()> {
        let route_tok = self.ts.expect(TokenKind::Route, "ROUTE")?;
        let from_tok = self.expect_id("a node name")?;
        self.ts.expect(TokenKind::Period, "'.'")?;
        let out_tok = self.expect_id("an eventOut name")?;
        self.ts.expect(TokenKind::To, "TO")?;
        let to_tok = self.expect_id("a node name")?;
        self.ts.expect(TokenKind::Period, "'.'")?;
        let in_tok = self.expect_id("an eventIn name")?;

        let route = Route {
            from_node: self.resolve_def(scope, &from_tok)?,
            from_event: Name::intern(&out_tok.text),
            to_node: self.resolve_def(scope, &to_tok)?,
            to_event: Name::intern(&in_tok.text),
        };
        let added = self
            .graph
            .add_route(route.from_node, route.from_event, route.to_node, route.to_event)
            .map_err(|e| e.at(&self.uri, &route_tok))?;
        if added {
            match self.protos.last_mut() {
                Some(frame) => frame.routes.push(route),
                None => self.routes.push(route),
            }
        }
        Ok(())
    }

    fn resolve_def(&self, scope: ScopeId, token: &Token) -> Result<NodeIndex> {
        let name = Name::intern(&token.text);
        self.scopes.find_node(scope, name).ok_or_else(|| {
            self.semantic(token, format!("Node \"{name}\" has not been defined in this scope"))
        })
    }

    // ─── PROTO / EXTERNPROTO ─────────────────────────────────────────────

    fn proto_statement(&mut self, scope: ScopeId) -> Result<()> {
        match self.ts.peek_kind() {
            TokenKind::Proto => self.proto(scope),
            TokenKind::ExternProto => self.extern_proto(scope),
            _ => Err(self.unexpected_next("PROTO or EXTERNPROTO")),
        }
    }

    fn declare(&mut self, declaration: Declaration) {
        match self.protos.last_mut() {
            Some(frame) => frame.declarations.push(declaration),
            None => self.declarations.push(declaration),
        }
    }

    /// `PROTO <id> [ <interfaces> ] { <body> }`.
    fn proto(&mut self, scope: ScopeId) -> Result<()> {
        self.ts.next();
        let id_tok = self.expect_id("a PROTO name")?;
        let id = Name::intern(&id_tok.text);
        self.ts.expect(TokenKind::LBracket, "'['")?;

        self.graph.begin_capture();
        self.protos.push(ProtoFrame::default());
        let parsed = self.proto_rest(scope, id);
        let frame = self.protos.pop().unwrap_or_default();
        let members = self.graph.end_capture(false);
        let (defaults, implementation, body_scope) = parsed?;

        self.graph.mark_template(&members);
        let identity = self.scopes.path(body_scope);
        let capabilities = implementation
            .first()
            .and_then(|&idx| self.graph.node(idx))
            .map(|n| n.node_type.capabilities.clone())
            .unwrap_or_default();

        let definition = Arc::new(ProtoDefinition {
            id,
            identity: identity.clone(),
            interfaces: frame.interfaces.clone(),
            implementation,
            members,
            is_map: frame.is_map,
            routes: frame.routes,
            declarations: frame.declarations,
        });
        let node_type = Arc::new(NodeType::new(
            id,
            Name::intern(&identity),
            frame.interfaces,
            defaults,
            &capabilities,
            TypeOrigin::Proto(definition),
        ));
        if !self.scopes.add_type(scope, node_type.clone()) {
            return Err(self.semantic(
                &id_tok,
                format!("Node type \"{id}\" is already defined in this scope"),
            ));
        }
        let class = TypeClass::new(identity.clone(), node_type.clone());
        self.staged.push((identity.clone(), Arc::new(class)));
        self.declare(Declaration::Proto(node_type));
        self.define(DefinitionKind::Proto, id, id, &id_tok);
        log::debug!("registered PROTO {id} as {identity}");
        Ok(())
    }

    /// Interface list and body of a PROTO, after its opening `[`.
    fn proto_rest(
        &mut self,
        scope: ScopeId,
        id: Name,
    ) -> Result<(HashMap<Name, FieldValue>, Vec<NodeIndex>, ScopeId)> {
        let defaults_scope = self.scopes.child(scope, id.as_str());
        let mut defaults = HashMap::new();
        while self.ts.eat(TokenKind::RBracket).is_none() {
            let (interface, id_tok) = self.interface_decl()?;
            let added = self
                .protos
                .last_mut()
                .is_some_and(|frame| frame.interfaces.add(interface));
            if !added {
                return Err(self.semantic(
                    &id_tok,
                    format!("Interface \"{}\" already declared", interface.id),
                ));
            }
            if interface.kind.has_value() {
                let (value, _) =
                    self.field_value(defaults_scope, Ctx::Scene, interface.field_type, None)?;
                defaults.insert(interface.id, value);
            }
        }

        self.ts.expect(TokenKind::LBrace, "'{'")?;
        let body_scope = self.scopes.child(scope, id.as_str());
        let mut implementation = Vec::new();
        loop {
            match self.ts.peek_kind() {
                TokenKind::RBrace => {
                    let close = self.ts.next();
                    if implementation.is_empty() {
                        return Err(self.ts.unexpected(&close, "a node in the PROTO body"));
                    }
                    break;
                }
                TokenKind::Proto | TokenKind::ExternProto => self.proto_statement(body_scope)?,
                TokenKind::Route => self.route_statement(body_scope)?,
                TokenKind::Id | TokenKind::Def | TokenKind::Use => {
                    implementation.push(self.node_statement(body_scope, Ctx::ProtoBody)?);
                }
                _ => return Err(self.unexpected_next("a node, PROTO or ROUTE in the PROTO body")),
            }
        }
        Ok((defaults, implementation, body_scope))
    }

    /// `EXTERNPROTO <id> [ <interfaces> ] <urls>`. Binds to the first node
    /// class one of the URLs names; registers no type if none matches.
    fn extern_proto(&mut self, scope: ScopeId) -> Result<()> {
        self.ts.next();
        let id_tok = self.expect_id("an EXTERNPROTO name")?;
        let id = Name::intern(&id_tok.text);
        self.ts.expect(TokenKind::LBracket, "'['")?;
        let mut interfaces = InterfaceSet::new();
        while self.ts.eat(TokenKind::RBracket).is_none() {
            let (interface, decl_tok) = self.interface_decl()?;
            if !interfaces.add(interface) {
                return Err(self.semantic(
                    &decl_tok,
                    format!("Interface \"{}\" already declared", interface.id),
                ));
            }
        }
        let urls = values::parse_multi(&mut self.ts, values::parse_string)?;

        let bound = self.bind_extern(id, &interfaces, &urls);
        match &bound {
            Some(node_type) => {
                if !self.scopes.add_type(scope, node_type.clone()) {
                    return Err(self.semantic(
                        &id_tok,
                        format!("Node type \"{id}\" is already defined in this scope"),
                    ));
                }
            }
            None => {
                log::warn!("EXTERNPROTO {id}: no registered node class matches {urls:?}");
                self.ts.info(
                    &id_tok,
                    format!("EXTERNPROTO {id} matches no registered node class and cannot be used"),
                );
            }
        }
        self.declare(Declaration::ExternProto {
            id,
            interfaces,
            urls,
            bound,
        });
        self.define(DefinitionKind::ExternProto, id, id, &id_tok);
        Ok(())
    }

    fn bind_extern(
        &self,
        id: Name,
        interfaces: &InterfaceSet,
        urls: &[String],
    ) -> Option<Arc<NodeType>> {
        for url in urls {
            let candidates = std::iter::once(url.clone()).chain(resolve_relative(&self.uri, url));
            for candidate in candidates {
                let Some(class) = self.find_class(&candidate) else {
                    continue;
                };
                match class.create_type(id, interfaces) {
                    Ok(node_type) => {
                        log::debug!("EXTERNPROTO {id} bound to {candidate}");
                        return Some(node_type);
                    }
                    Err(e) => log::debug!("EXTERNPROTO {id}: {candidate} rejected: {e}"),
                }
            }
        }
        None
    }

    /// Classes declared earlier in this parse take precedence over the
    /// session registry.
    fn find_class(&self, identity: &str) -> Option<Arc<dyn NodeClass>> {
        self.staged
            .iter()
            .rev()
            .find(|(key, _)| key == identity)
            .map(|(_, class)| Arc::clone(class))
            .or_else(|| self.registry.get(identity).cloned())
    }
}

/// The interface answering to `name` as a field, eventIn or eventOut. The
/// `set_x` and `x_changed` events of exposedField `x` come back as an eventIn
/// or eventOut of `x`.
fn any_interface(set: &InterfaceSet, name: Name) -> Option<NodeInterface> {
    if let Some(interface) = set.get(name) {
        return Some(*interface);
    }
    let alias = |slot: usize, kind: InterfaceKind| NodeInterface { kind, ..*set.at(slot) };
    set.event_in(name)
        .map(|slot| alias(slot, InterfaceKind::EventIn))
        .or_else(|| set.event_out(name).map(|slot| alias(slot, InterfaceKind::EventOut)))
}

/// Resolve a relative URL against the document URI. Absolute URLs and URNs
/// resolve to nothing.
fn resolve_relative(base: &str, url: &str) -> Option<String> {
    if url.contains("://") || url.starts_with("urn:") {
        return None;
    }
    if let Some(fragment) = url.strip_prefix('#') {
        let document = base.split('#').next().unwrap_or(base);
        return Some(format!("{document}#{fragment}"));
    }
    let dir = base.rfind('/').map_or("", |i| &base[..=i]);
    Some(format!("{dir}{url}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_urls() {
        assert_eq!(resolve_relative("dir/world.wrl", "#Thing").as_deref(), Some("dir/world.wrl#Thing"));
        assert_eq!(resolve_relative("dir/world.wrl", "lib.wrl#P").as_deref(), Some("dir/lib.wrl#P"));
        assert_eq!(resolve_relative("world.wrl", "lib.wrl").as_deref(), Some("lib.wrl"));
        assert_eq!(resolve_relative("world.wrl", "urn:vrml97:node:Box"), None);
        assert_eq!(resolve_relative("world.wrl", "http://example.com/a.wrl"), None);
    }

    #[test]
    fn any_interface_resolves_event_aliases() {
        let types = builtins::builtin_types();
        let transform = types.iter().find(|t| t.id.as_str() == "Transform").unwrap();
        let found = any_interface(&transform.interfaces, Name::intern("set_translation")).unwrap();
        assert_eq!(found.id.as_str(), "translation");
        assert_eq!(found.kind, InterfaceKind::EventIn);
        let found = any_interface(&transform.interfaces, Name::intern("translation_changed")).unwrap();
        assert_eq!(found.kind, InterfaceKind::EventOut);
        let found = any_interface(&transform.interfaces, Name::intern("translation")).unwrap();
        assert_eq!(found.kind, InterfaceKind::ExposedField);
        assert!(any_interface(&transform.interfaces, Name::intern("nope")).is_none());
    }
}
