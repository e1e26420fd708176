//! Completions: context-aware VRML97 completions.

use crate::document::Document;
use tower_lsp::lsp_types::*;
use vrml_core::FieldType;

/// Compute completions at the given cursor position.
///
/// The text before the cursor decides the context: right after an
/// interface keyword the field types are offered; inside a node body the
/// enclosing type's fields plus node types for node-valued fields; at the
/// top level (and in PROTO bodies) statement keywords and node types.
pub fn compute_completions(doc: &Document, pos: Position) -> Vec<CompletionItem> {
    let before = doc.text_before(pos.line, pos.character);
    let mut words = before.split_whitespace().rev();
    // The word being typed, if any, then the one before it.
    let previous = if before.ends_with(char::is_whitespace) {
        words.next()
    } else {
        words.nth(1)
    };

    if matches!(previous, Some("field" | "exposedField" | "eventIn" | "eventOut")) {
        return field_type_completions();
    }

    match enclosing_type(&before) {
        Some(type_name) => {
            let mut items = field_completions(doc, &type_name);
            items.extend(type_completions(doc));
            items
        }
        None => {
            let mut items = top_level_completions();
            items.extend(type_completions(doc));
            items
        }
    }
}

/// Type name in front of the innermost unclosed `{`, skipping strings and
/// comments. `None` at the top level and directly inside a PROTO body.
fn enclosing_type(text: &str) -> Option<String> {
    let mut stack: Vec<Option<String>> = Vec::new();
    let mut last_word = String::new();
    let mut word = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let mut escaped = false;
                for c in chars.by_ref() {
                    match c {
                        '\\' if !escaped => escaped = true,
                        '"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                last_word.clear();
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => {
                end_word(&mut word, &mut last_word);
                stack.push((!last_word.is_empty()).then(|| last_word.clone()));
                last_word.clear();
            }
            '}' => {
                end_word(&mut word, &mut last_word);
                stack.pop();
                last_word.clear();
            }
            '[' | ']' => {
                end_word(&mut word, &mut last_word);
                last_word.clear();
            }
            c if c.is_whitespace() || c == ',' => end_word(&mut word, &mut last_word),
            c => word.push(c),
        }
    }
    stack.pop().flatten()
}

fn end_word(word: &mut String, last_word: &mut String) {
    if !word.is_empty() {
        *last_word = std::mem::take(word);
    }
}

/// Statement keywords valid at the top level of a document or PROTO body.
fn top_level_completions() -> Vec<CompletionItem> {
    let keywords = [
        ("DEF", "Name a node", "DEF ${1:NAME} ${2:Transform} {\n  $0\n}"),
        ("USE", "Share a named node", "USE ${1:NAME}"),
        (
            "PROTO",
            "Declare a node type",
            "PROTO ${1:Name} [\n  ${2:field SFFloat value 1}\n]\n{\n  $0\n}",
        ),
        (
            "EXTERNPROTO",
            "Declare an external node type",
            "EXTERNPROTO ${1:Name} [\n  $2\n] \"${3:urn:vrml97:node:Name}\"",
        ),
        (
            "ROUTE",
            "Connect an eventOut to an eventIn",
            "ROUTE ${1:FROM}.${2:eventOut} TO ${3:TO}.${4:eventIn}",
        ),
    ];

    keywords
        .into_iter()
        .map(|(label, detail, snippet)| CompletionItem {
            label: label.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some(detail.to_string()),
            insert_text: Some(snippet.to_string()),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            ..Default::default()
        })
        .collect()
}

/// Every node type visible in the document.
fn type_completions(doc: &Document) -> Vec<CompletionItem> {
    doc.type_names()
        .into_iter()
        .map(|name| CompletionItem {
            insert_text: Some(format!("{name} {{ $0 }}")),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            label: name,
            kind: Some(CompletionItemKind::CLASS),
            ..Default::default()
        })
        .collect()
}

/// Fields and exposedFields of the enclosing node type.
fn field_completions(doc: &Document, type_name: &str) -> Vec<CompletionItem> {
    let Some(node_type) = doc.find_type(type_name) else {
        return Vec::new();
    };
    node_type
        .interfaces
        .iter()
        .filter(|i| i.kind.has_value())
        .map(|i| CompletionItem {
            label: i.id.to_string(),
            kind: Some(CompletionItemKind::PROPERTY),
            detail: Some(format!("{} {}", i.kind, i.field_type)),
            ..Default::default()
        })
        .collect()
}

fn field_type_completions() -> Vec<CompletionItem> {
    FieldType::ALL
        .iter()
        .map(|t| CompletionItem {
            label: t.keyword().to_string(),
            kind: Some(CompletionItemKind::TYPE_PARAMETER),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(text: &str, line: u32, character: u32) -> Vec<String> {
        let doc = Document::parse("a.wrl", text);
        compute_completions(&doc, Position::new(line, character))
            .into_iter()
            .map(|c| c.label)
            .collect()
    }

    #[test]
    fn top_level_returns_keywords_and_types() {
        let labels = labels("", 0, 0);
        assert_eq!(labels[..5], ["DEF", "USE", "PROTO", "EXTERNPROTO", "ROUTE"]);
        assert!(labels.contains(&"Transform".to_string()));
    }

    #[test]
    fn inside_node_returns_its_fields() {
        let text = "Transform {\n  \n}";
        let labels = labels(text, 1, 2);
        assert!(labels.contains(&"translation".to_string()));
        assert!(labels.contains(&"children".to_string()));
        assert!(!labels.contains(&"addChildren".to_string()));
        assert!(!labels.contains(&"ROUTE".to_string()));
    }

    #[test]
    fn deep_nesting_uses_innermost_type() {
        let text = "Group { children [ Shape { geometry Sphere { r";
        let labels = labels(text, 0, text.len() as u32);
        assert!(labels.contains(&"radius".to_string()));
        assert!(!labels.contains(&"geometry".to_string()));
    }

    #[test]
    fn closed_node_returns_to_top_level() {
        let text = "Box { size 1 1 1 }\n";
        let labels = labels(text, 1, 0);
        assert!(labels.contains(&"ROUTE".to_string()));
    }

    #[test]
    fn proto_body_is_top_level() {
        let text = "PROTO P [ field SFFloat r 1 ] {\n  \n}";
        let labels = labels(text, 1, 2);
        assert!(labels.contains(&"DEF".to_string()));
    }

    #[test]
    fn interface_keyword_returns_field_types() {
        let text = "PROTO P [ exposedField ";
        let labels = labels(text, 0, text.len() as u32);
        assert_eq!(labels.len(), 20);
        assert!(labels.contains(&"SFRotation".to_string()));

        let text = "PROTO P [ eventIn SFV";
        let labels = self::labels(text, 0, text.len() as u32);
        assert!(labels.contains(&"SFVec3f".to_string()));
    }

    #[test]
    fn braces_in_strings_and_comments_are_ignored() {
        assert_eq!(
            enclosing_type("WorldInfo { info \"{ not a node\" # } either\n"),
            Some("WorldInfo".to_string())
        );
        assert_eq!(enclosing_type("DEF T Transform { children Shape {"), Some("Shape".to_string()));
        assert_eq!(enclosing_type("PROTO P [ ] {"), None);
    }
}
