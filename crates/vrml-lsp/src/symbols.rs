//! Document symbols: DEF names and PROTO / EXTERNPROTO declarations.

use crate::diagnostics::to_lsp;
use crate::document::Document;
use tower_lsp::lsp_types::*;
use vrml_core::DefinitionKind;

/// Flat symbol list in source order. Empty when the document does not load.
#[allow(deprecated)] // SymbolInformation::deprecated is deprecated but required
pub fn compute_symbols(uri: &Url, doc: &Document) -> Vec<SymbolInformation> {
    let Some(scene) = doc.scene() else {
        return Vec::new();
    };
    let mut definitions: Vec<_> = scene.definitions.iter().collect();
    definitions.sort_by_key(|d| (d.line, d.column));
    definitions
        .into_iter()
        .map(|def| {
            let start = to_lsp(def.line, def.column);
            let end = Position::new(start.line, start.character + def.name.as_str().len() as u32);
            let (name, kind) = match def.kind {
                DefinitionKind::Def => (format!("DEF {}", def.name), SymbolKind::OBJECT),
                DefinitionKind::Proto => (format!("PROTO {}", def.name), SymbolKind::CLASS),
                DefinitionKind::ExternProto => {
                    (format!("EXTERNPROTO {}", def.name), SymbolKind::INTERFACE)
                }
            };
            SymbolInformation {
                name,
                kind,
                tags: None,
                deprecated: None,
                location: Location {
                    uri: uri.clone(),
                    range: Range { start, end },
                },
                container_name: match def.kind {
                    DefinitionKind::Def => Some(def.type_name.to_string()),
                    _ => None,
                },
            }
        })
        .collect()
}
