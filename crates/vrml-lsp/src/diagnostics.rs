//! Diagnostics: load result → LSP diagnostics.
//!
//! A failed load gives one error at the offending token. A successful load
//! reports its side-channel warnings and infos, which clears earlier errors.

use crate::document::Document;
use tower_lsp::lsp_types::*;
use vrml_core::Severity;

const SOURCE: &str = "vrml-lsp";

pub fn compute_diagnostics(doc: &Document) -> Vec<Diagnostic> {
    match &doc.outcome {
        Err(err) => {
            let start = err
                .position()
                .map_or_else(|| end_of_document(doc), |(line, column)| to_lsp(line, column));
            vec![Diagnostic {
                range: Range {
                    start,
                    end: Position::new(start.line, start.character + 1),
                },
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(SOURCE.to_string()),
                message: err.message(),
                ..Default::default()
            }]
        }
        Ok(scene) => scene
            .diagnostics
            .iter()
            .map(|d| {
                let start = to_lsp(d.line, d.column);
                Diagnostic {
                    range: Range {
                        start,
                        end: Position::new(start.line, start.character + 1),
                    },
                    severity: Some(match d.severity {
                        Severity::Warning => DiagnosticSeverity::WARNING,
                        Severity::Info => DiagnosticSeverity::INFORMATION,
                    }),
                    source: Some(SOURCE.to_string()),
                    message: d.message.clone(),
                    ..Default::default()
                }
            })
            .collect(),
    }
}

/// Scanner positions are 1-based lines and 0-based columns.
pub fn to_lsp(line: usize, column: usize) -> Position {
    Position::new(line.saturating_sub(1) as u32, column as u32)
}

fn end_of_document(doc: &Document) -> Position {
    let last = doc.rope.len_lines().saturating_sub(1);
    let column = doc.rope.line(last).len_chars();
    Position::new(last as u32, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_document_produces_no_diagnostics() {
        let doc = Document::parse("a.wrl", "#VRML V2.0 utf8\nShape { geometry Box { } }\n");
        assert!(compute_diagnostics(&doc).is_empty());
    }

    #[test]
    fn parse_error_lands_on_the_offending_token() {
        let doc = Document::parse("a.wrl", "Group {\n  children [ Teapot { } ]\n}\n");
        let diags = compute_diagnostics(&doc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start, Position::new(1, 13));
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert!(diags[0].message.contains("Unknown node type \"Teapot\""));
    }

    #[test]
    fn repaired_values_are_warnings() {
        let doc = Document::parse("a.wrl", "Material { diffuseColor 2 0 0 }");
        let diags = compute_diagnostics(&doc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diags[0].range.start, Position::new(0, 24));
    }

    #[test]
    fn unbound_externproto_is_information() {
        let doc = Document::parse(
            "a.wrl",
            "EXTERNPROTO Gone [ field SFFloat x ] \"urn:nowhere:Gone\"\n",
        );
        let diags = compute_diagnostics(&doc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::INFORMATION));
    }
}
