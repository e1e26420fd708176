//! Error and diagnostic types.
//!
//! Syntax and semantic errors abort the parse of the current document and
//! carry the source URI plus the 1-based line / 0-based column of the
//! offending token. Scene-graph operations (`set_field`, `add_route`,
//! `create_node`) report position-free variants; the parser attaches the
//! position with [`VrmlError::at`]. Non-fatal repairs go to the
//! [`Diagnostic`] side channel instead.

use crate::field::FieldType;
use crate::id::Name;
use crate::scanner::Token;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while parsing or manipulating a VRML97 scene.
#[derive(Error, Debug)]
pub enum VrmlError {
    /// The current token matches no grammar alternative.
    #[error("{uri}:{line}:{column}: syntax error: {message}")]
    Syntax {
        uri: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Well-formed syntax that violates a scene invariant.
    #[error("{uri}:{line}:{column}: {message}")]
    Semantic {
        uri: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A value does not have the statically expected field type.
    #[error("incorrect value type: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: FieldType,
        actual: FieldType,
    },

    /// No field/exposedField with this name on the node type.
    #[error("Node has no field or exposedField \"{interface}\" (type {node_type})")]
    UnknownInterface { node_type: Name, interface: Name },

    #[error("Node type {node_type} has no eventOut \"{event}\"")]
    NoEventOut { node_type: Name, event: Name },

    #[error("Node type {node_type} has no eventIn \"{event}\"")]
    NoEventIn { node_type: Name, event: Name },

    #[error("ROUTE type mismatch: {from} eventOut cannot feed {to} eventIn")]
    RouteTypeMismatch { from: FieldType, to: FieldType },

    /// The handle does not refer to a live node in the scene graph.
    #[error("dangling node reference #{0}")]
    DanglingNode(usize),

    /// A node class rejected an interface declaration (EXTERNPROTO binding).
    #[error("node class {class} cannot provide {interface}")]
    InterfaceMismatch { class: String, interface: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VrmlError {
    pub fn syntax(uri: &str, token: &Token, message: impl Into<String>) -> Self {
        Self::Syntax {
            uri: uri.to_string(),
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    pub fn semantic(uri: &str, token: &Token, message: impl Into<String>) -> Self {
        Self::Semantic {
            uri: uri.to_string(),
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    /// Attach a source position to a position-free error. Errors that already
    /// carry a position are returned unchanged.
    pub fn at(self, uri: &str, token: &Token) -> Self {
        match self {
            VrmlError::Syntax { .. } | VrmlError::Semantic { .. } | VrmlError::Io(_) => self,
            other => Self::semantic(uri, token, other.to_string()),
        }
    }

    /// `(line, column)` of a positioned error.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            VrmlError::Syntax { line, column, .. } | VrmlError::Semantic { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }

    /// The bare message without the `uri:line:column:` prefix.
    pub fn message(&self) -> String {
        match self {
            VrmlError::Syntax { message, .. } => format!("syntax error: {message}"),
            VrmlError::Semantic { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ─── Diagnostics ─────────────────────────────────────────────────────────

/// Severity of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// A value was repaired (clamped color, renormalized axis).
    Warning,
    /// Informational, e.g. an EXTERNPROTO that bound to no node class.
    Info,
}

/// A non-fatal finding reported through the side channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub uri: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn warning(uri: &str, token: &Token, message: impl Into<String>) -> Self {
        let d = Self {
            severity: Severity::Warning,
            message: message.into(),
            uri: uri.to_string(),
            line: token.line,
            column: token.column,
        };
        log::warn!("{}:{}:{}: {}", d.uri, d.line, d.column, d.message);
        d
    }

    pub fn info(uri: &str, token: &Token, message: impl Into<String>) -> Self {
        let d = Self {
            severity: Severity::Info,
            message: message.into(),
            uri: uri.to_string(),
            line: token.line,
            column: token.column,
        };
        log::info!("{}:{}:{}: {}", d.uri, d.line, d.column, d.message);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::TokenKind;

    fn token_at(line: usize, column: usize) -> Token {
        Token {
            kind: TokenKind::Id,
            text: "x".into(),
            line,
            column,
        }
    }

    #[test]
    fn positioned_errors_render_uri_line_column() {
        let err = VrmlError::semantic("scene.wrl", &token_at(3, 7), "Unknown node type \"Foo\"");
        assert_eq!(err.to_string(), "scene.wrl:3:7: Unknown node type \"Foo\"");
        assert_eq!(err.position(), Some((3, 7)));
    }

    #[test]
    fn at_wraps_position_free_errors() {
        let err = VrmlError::TypeMismatch {
            expected: FieldType::SFFloat,
            actual: FieldType::SFColor,
        }
        .at("a.wrl", &token_at(1, 0));
        assert_eq!(
            err.message(),
            "incorrect value type: expected SFFloat, got SFColor"
        );
        assert_eq!(err.position(), Some((1, 0)));
    }
}
