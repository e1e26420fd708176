//! Interned VRML names.
//!
//! DEF names, node type ids and interface ids are compared constantly while
//! resolving USE, ROUTE and IS, so each is interned once per process.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A VRML identifier as written in the source: `DEF LAMP`, `Transform`,
/// `set_translation`. Case-sensitive; equality is a handle comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(Spur);

impl Name {
    pub fn intern(s: &str) -> Self {
        Name(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// `x` for the eventIn name `set_x` of an exposedField.
    pub fn without_set_prefix(self) -> Option<Name> {
        self.as_str()
            .strip_prefix("set_")
            .filter(|base| !base.is_empty())
            .map(Name::intern)
    }

    /// `x` for the eventOut name `x_changed` of an exposedField.
    pub fn without_changed_suffix(self) -> Option<Name> {
        self.as_str()
            .strip_suffix("_changed")
            .filter(|base| !base.is_empty())
            .map(Name::intern)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::intern(s)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Name::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_text_same_name() {
        let a = Name::intern("translation");
        assert_eq!(a, Name::intern("translation"));
        assert_eq!(a.as_str(), "translation");
        assert_ne!(Name::intern("Box"), Name::intern("box"));
    }

    #[test]
    fn event_aliases_strip_to_the_field() {
        let scale = Name::intern("scale");
        assert_eq!(Name::intern("set_scale").without_set_prefix(), Some(scale));
        assert_eq!(Name::intern("scale_changed").without_changed_suffix(), Some(scale));
        assert_eq!(Name::intern("set_").without_set_prefix(), None);
        assert_eq!(scale.without_set_prefix(), None);
    }

    #[test]
    fn serializes_as_plain_text() {
        let json = serde_json::to_string(&Name::intern("LAMP")).unwrap();
        assert_eq!(json, "\"LAMP\"");
    }
}
