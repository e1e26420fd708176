//! One open document: its text and the result of loading it.

use ropey::Rope;
use std::sync::Arc;
use vrml_core::{Browser, Name, NodeType, Scene, VrmlError, builtins};

pub struct Document {
    pub uri: String,
    pub rope: Rope,
    pub browser: Browser,
    pub outcome: Result<Scene, VrmlError>,
}

impl Document {
    /// Load `text` in a fresh browser session.
    pub fn parse(uri: &str, text: &str) -> Self {
        let mut browser = Browser::new();
        let outcome = browser.load(uri, text);
        if let Err(e) = &outcome {
            log::debug!("{uri} does not load: {e}");
        }
        Self {
            uri: uri.to_string(),
            rope: Rope::from_str(text),
            browser,
            outcome,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.outcome.as_ref().ok()
    }

    /// Text of a 0-based line without its line break.
    pub fn line(&self, line: u32) -> Option<String> {
        let text = self.rope.get_line(line as usize)?.to_string();
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Everything before a 0-based position.
    pub fn text_before(&self, line: u32, character: u32) -> String {
        let Ok(start) = self.rope.try_line_to_char(line as usize) else {
            return self.rope.to_string();
        };
        let len = self.line(line).map_or(0, |l| l.chars().count());
        let end = start + (character as usize).min(len);
        self.rope.slice(..end).to_string()
    }

    /// A node type by name: the document's own types when it loaded, the
    /// built-ins otherwise.
    pub fn find_type(&self, name: &str) -> Option<Arc<NodeType>> {
        match self.scene() {
            Some(scene) => scene.find_type(name).cloned(),
            None => builtins::builtin_types()
                .into_iter()
                .find(|t| t.id == Name::intern(name)),
        }
    }

    /// Names of every node type usable at the top level, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.scene() {
            Some(scene) => scene
                .scopes
                .visible_types(scene.root_scope)
                .into_iter()
                .map(|t| t.id.to_string())
                .collect(),
            None => builtins::builtin_names().map(str::to_string).collect(),
        };
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_before_stops_at_the_cursor() {
        let doc = Document::parse("a.wrl", "Group {\n  children Box { }\n}\n");
        assert_eq!(doc.text_before(1, 11), "Group {\n  children ");
        assert_eq!(doc.line(1).as_deref(), Some("  children Box { }"));
    }

    #[test]
    fn proto_types_are_visible_when_the_document_loads() {
        let doc = Document::parse("a.wrl", "PROTO Unit [] { Box { } }\n");
        assert!(doc.type_names().contains(&"Unit".to_string()));
        assert!(doc.find_type("Unit").is_some());
    }

    #[test]
    fn builtins_are_used_when_the_document_fails() {
        let doc = Document::parse("a.wrl", "Group { children [ Nope { } ] }");
        assert!(doc.scene().is_none());
        assert!(doc.find_type("Transform").is_some());
        assert!(doc.type_names().contains(&"WorldInfo".to_string()));
    }
}
