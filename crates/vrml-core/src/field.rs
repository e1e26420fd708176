//! Field value model: the VRML97 `SF*`/`MF*` type family.
//!
//! A `FieldValue` is a tagged union whose `FieldType` never changes after
//! construction. Multi-valued variants own an ordered `Vec` of the scalar
//! type. Node-valued variants hold arena handles (`NodeIndex`) into the
//! session's `SceneGraph`; DEF/USE sharing is handle identity.

use crate::error::VrmlError;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ─── Scalar payloads ─────────────────────────────────────────────────────

pub type Vec2f = [f32; 2];
pub type Vec3f = [f32; 3];

/// RGB color. Components are kept in [0.0, 1.0] by the literal grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Clamp every component into [0, 1]. Returns the repaired color and
    /// whether anything was out of range.
    pub fn clamped(self) -> (Self, bool) {
        let clamp = |c: f32| c.clamp(0.0, 1.0);
        let out = Self::rgb(clamp(self.r), clamp(self.g), clamp(self.b));
        (out, out != self)
    }
}

/// Axis-angle rotation. The axis is unit length once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
}

impl Rotation {
    pub const fn new(x: f32, y: f32, z: f32, angle: f32) -> Self {
        Self { x, y, z, angle }
    }

    pub fn axis_length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 0.0)
    }
}

/// `SFImage` payload: `width * height` packed pixels of `components` bytes each.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub pixels: Vec<u32>,
}

// ─── Field types ─────────────────────────────────────────────────────────

/// Type id of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    SFBool,
    SFColor,
    SFFloat,
    SFImage,
    SFInt32,
    SFNode,
    SFRotation,
    SFString,
    SFTime,
    SFVec2f,
    SFVec3f,
    MFColor,
    MFFloat,
    MFInt32,
    MFNode,
    MFRotation,
    MFString,
    MFTime,
    MFVec2f,
    MFVec3f,
}

impl FieldType {
    pub const ALL: [FieldType; 20] = [
        FieldType::SFBool,
        FieldType::SFColor,
        FieldType::SFFloat,
        FieldType::SFImage,
        FieldType::SFInt32,
        FieldType::SFNode,
        FieldType::SFRotation,
        FieldType::SFString,
        FieldType::SFTime,
        FieldType::SFVec2f,
        FieldType::SFVec3f,
        FieldType::MFColor,
        FieldType::MFFloat,
        FieldType::MFInt32,
        FieldType::MFNode,
        FieldType::MFRotation,
        FieldType::MFString,
        FieldType::MFTime,
        FieldType::MFVec2f,
        FieldType::MFVec3f,
    ];

    /// Look up a field-type keyword such as `SFVec3f`.
    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.keyword() == s)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            FieldType::SFBool => "SFBool",
            FieldType::SFColor => "SFColor",
            FieldType::SFFloat => "SFFloat",
            FieldType::SFImage => "SFImage",
            FieldType::SFInt32 => "SFInt32",
            FieldType::SFNode => "SFNode",
            FieldType::SFRotation => "SFRotation",
            FieldType::SFString => "SFString",
            FieldType::SFTime => "SFTime",
            FieldType::SFVec2f => "SFVec2f",
            FieldType::SFVec3f => "SFVec3f",
            FieldType::MFColor => "MFColor",
            FieldType::MFFloat => "MFFloat",
            FieldType::MFInt32 => "MFInt32",
            FieldType::MFNode => "MFNode",
            FieldType::MFRotation => "MFRotation",
            FieldType::MFString => "MFString",
            FieldType::MFTime => "MFTime",
            FieldType::MFVec2f => "MFVec2f",
            FieldType::MFVec3f => "MFVec3f",
        }
    }

    pub fn is_multi(self) -> bool {
        self.keyword().starts_with("MF")
    }

    pub fn is_node(self) -> bool {
        matches!(self, FieldType::SFNode | FieldType::MFNode)
    }

    /// The zero value of this type. Used for event slots and as the
    /// placeholder of IS-mapped fields inside PROTO bodies.
    pub fn zero_value(self) -> FieldValue {
        match self {
            FieldType::SFBool => FieldValue::SFBool(false),
            FieldType::SFColor => FieldValue::SFColor(Color::default()),
            FieldType::SFFloat => FieldValue::SFFloat(0.0),
            FieldType::SFImage => FieldValue::SFImage(Image::default()),
            FieldType::SFInt32 => FieldValue::SFInt32(0),
            FieldType::SFNode => FieldValue::SFNode(None),
            FieldType::SFRotation => FieldValue::SFRotation(Rotation::default()),
            FieldType::SFString => FieldValue::SFString(String::new()),
            FieldType::SFTime => FieldValue::SFTime(0.0),
            FieldType::SFVec2f => FieldValue::SFVec2f([0.0; 2]),
            FieldType::SFVec3f => FieldValue::SFVec3f([0.0; 3]),
            FieldType::MFColor => FieldValue::MFColor(Vec::new()),
            FieldType::MFFloat => FieldValue::MFFloat(Vec::new()),
            FieldType::MFInt32 => FieldValue::MFInt32(Vec::new()),
            FieldType::MFNode => FieldValue::MFNode(Vec::new()),
            FieldType::MFRotation => FieldValue::MFRotation(Vec::new()),
            FieldType::MFString => FieldValue::MFString(Vec::new()),
            FieldType::MFTime => FieldValue::MFTime(Vec::new()),
            FieldType::MFVec2f => FieldValue::MFVec2f(Vec::new()),
            FieldType::MFVec3f => FieldValue::MFVec3f(Vec::new()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ─── Field values ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    SFBool(bool),
    SFColor(Color),
    SFFloat(f32),
    SFImage(Image),
    SFInt32(i32),
    SFNode(Option<NodeIndex>),
    SFRotation(Rotation),
    SFString(String),
    SFTime(f64),
    SFVec2f(Vec2f),
    SFVec3f(Vec3f),
    MFColor(Vec<Color>),
    MFFloat(Vec<f32>),
    MFInt32(Vec<i32>),
    MFNode(Vec<NodeIndex>),
    MFRotation(Vec<Rotation>),
    MFString(Vec<String>),
    MFTime(Vec<f64>),
    MFVec2f(Vec<Vec2f>),
    MFVec3f(Vec<Vec3f>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::SFBool(_) => FieldType::SFBool,
            FieldValue::SFColor(_) => FieldType::SFColor,
            FieldValue::SFFloat(_) => FieldType::SFFloat,
            FieldValue::SFImage(_) => FieldType::SFImage,
            FieldValue::SFInt32(_) => FieldType::SFInt32,
            FieldValue::SFNode(_) => FieldType::SFNode,
            FieldValue::SFRotation(_) => FieldType::SFRotation,
            FieldValue::SFString(_) => FieldType::SFString,
            FieldValue::SFTime(_) => FieldType::SFTime,
            FieldValue::SFVec2f(_) => FieldType::SFVec2f,
            FieldValue::SFVec3f(_) => FieldType::SFVec3f,
            FieldValue::MFColor(_) => FieldType::MFColor,
            FieldValue::MFFloat(_) => FieldType::MFFloat,
            FieldValue::MFInt32(_) => FieldType::MFInt32,
            FieldValue::MFNode(_) => FieldType::MFNode,
            FieldValue::MFRotation(_) => FieldType::MFRotation,
            FieldValue::MFString(_) => FieldType::MFString,
            FieldValue::MFTime(_) => FieldType::MFTime,
            FieldValue::MFVec2f(_) => FieldType::MFVec2f,
            FieldValue::MFVec3f(_) => FieldType::MFVec3f,
        }
    }

    /// Parse a literal of the given type, e.g. `"0 1 0 1.57"` as `SFRotation`.
    /// Node-valued types have no literal form and are rejected.
    pub fn parse_literal(field_type: FieldType, text: &str) -> Result<Self, VrmlError> {
        crate::values::parse_literal(field_type, text)
    }

    /// Ensure this value has the expected type.
    pub fn expect_type(&self, expected: FieldType) -> Result<(), VrmlError> {
        let actual = self.field_type();
        if actual == expected {
            Ok(())
        } else {
            Err(VrmlError::TypeMismatch { expected, actual })
        }
    }

    /// Node handles referenced by this value (empty for non-node types).
    pub fn node_refs(&self) -> &[NodeIndex] {
        match self {
            FieldValue::SFNode(Some(idx)) => std::slice::from_ref(idx),
            FieldValue::MFNode(nodes) => nodes,
            _ => &[],
        }
    }

    /// Rewrite node handles through a clone map. Handles absent from the map
    /// are left alone (shared with the original).
    pub fn remap_nodes(&mut self, remap: &HashMap<NodeIndex, NodeIndex>) {
        match self {
            FieldValue::SFNode(Some(idx)) => {
                if let Some(new) = remap.get(idx) {
                    *idx = *new;
                }
            }
            FieldValue::MFNode(nodes) => {
                for idx in nodes.iter_mut() {
                    if let Some(new) = remap.get(idx) {
                        *idx = *new;
                    }
                }
            }
            _ => {}
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::SFBool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::SFFloat(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3f(&self) -> Option<Vec3f> {
        match self {
            FieldValue::SFVec3f(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            FieldValue::SFColor(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_rotation(&self) -> Option<Rotation> {
        match self {
            FieldValue::SFRotation(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeIndex> {
        match self {
            FieldValue::SFNode(idx) => *idx,
            _ => None,
        }
    }
}

// ─── Textual form ────────────────────────────────────────────────────────

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

fn write_color(f: &mut fmt::Formatter<'_>, c: &Color) -> fmt::Result {
    write!(f, "{} {} {}", c.r, c.g, c.b)
}

fn write_rotation(f: &mut fmt::Formatter<'_>, r: &Rotation) -> fmt::Result {
    write!(f, "{} {} {} {}", r.x, r.y, r.z, r.angle)
}

fn write_bool(f: &mut fmt::Formatter<'_>, b: bool) -> fmt::Result {
    f.write_str(if b { "TRUE" } else { "FALSE" })
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item(f, v)?;
    }
    f.write_str("]")
}

/// VRML97 literal syntax. Node-valued variants have no literal form; they
/// print `NULL`/`[]` when empty and an opaque `<node N>` marker otherwise.
/// The emitter writes node values itself.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::SFBool(b) => write_bool(f, *b),
            FieldValue::SFColor(c) => write_color(f, c),
            FieldValue::SFFloat(v) => write!(f, "{v}"),
            FieldValue::SFImage(img) => {
                write!(f, "{} {} {}", img.width, img.height, img.components)?;
                let digits = (img.components.clamp(1, 4) * 2) as usize;
                for p in &img.pixels {
                    write!(f, " 0x{p:0digits$X}")?;
                }
                Ok(())
            }
            FieldValue::SFInt32(v) => write!(f, "{v}"),
            FieldValue::SFNode(None) => f.write_str("NULL"),
            FieldValue::SFNode(Some(idx)) => write!(f, "<node {}>", idx.index()),
            FieldValue::SFRotation(r) => write_rotation(f, r),
            FieldValue::SFString(s) => write_string(f, s),
            FieldValue::SFTime(v) => write!(f, "{v}"),
            FieldValue::SFVec2f(v) => write!(f, "{} {}", v[0], v[1]),
            FieldValue::SFVec3f(v) => write!(f, "{} {} {}", v[0], v[1], v[2]),
            FieldValue::MFColor(v) => write_list(f, v, write_color),
            FieldValue::MFFloat(v) => write_list(f, v, |f, x| write!(f, "{x}")),
            FieldValue::MFInt32(v) => write_list(f, v, |f, x| write!(f, "{x}")),
            FieldValue::MFNode(v) => write_list(f, v, |f, idx| write!(f, "<node {}>", idx.index())),
            FieldValue::MFRotation(v) => write_list(f, v, write_rotation),
            FieldValue::MFString(v) => write_list(f, v, |f, s| write_string(f, s)),
            FieldValue::MFTime(v) => write_list(f, v, |f, x| write!(f, "{x}")),
            FieldValue::MFVec2f(v) => write_list(f, v, |f, x| write!(f, "{} {}", x[0], x[1])),
            FieldValue::MFVec3f(v) => {
                write_list(f, v, |f, x| write!(f, "{} {} {}", x[0], x[1], x[2]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_roundtrip() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_keyword(t.keyword()), Some(t));
            assert_eq!(t.zero_value().field_type(), t);
        }
        assert_eq!(FieldType::from_keyword("SFDouble"), None);
    }

    #[test]
    fn multi_and_node_classification() {
        assert!(FieldType::MFVec3f.is_multi());
        assert!(!FieldType::SFVec3f.is_multi());
        assert!(FieldType::SFNode.is_node());
        assert!(FieldType::MFNode.is_node());
        assert!(!FieldType::MFString.is_node());
    }

    #[test]
    fn color_clamping_reports_repair() {
        let (c, repaired) = Color::rgb(1.5, -0.2, 0.5).clamped();
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.5));
        assert!(repaired);
        let (_, repaired) = Color::rgb(0.1, 0.2, 0.3).clamped();
        assert!(!repaired);
    }

    #[test]
    fn display_uses_vrml_syntax() {
        assert_eq!(FieldValue::SFBool(true).to_string(), "TRUE");
        assert_eq!(FieldValue::SFVec3f([2.0, 2.0, 2.0]).to_string(), "2 2 2");
        assert_eq!(
            FieldValue::SFString("say \"hi\"".into()).to_string(),
            r#""say \"hi\"""#
        );
        assert_eq!(
            FieldValue::MFFloat(vec![0.5, 1.0]).to_string(),
            "[0.5, 1]"
        );
        assert_eq!(FieldValue::SFNode(None).to_string(), "NULL");
        let img = Image {
            width: 2,
            height: 1,
            components: 1,
            pixels: vec![0xFF, 0x00],
        };
        assert_eq!(FieldValue::SFImage(img).to_string(), "2 1 1 0xFF 0x00");
        let img = Image {
            width: 1,
            height: 1,
            components: 2_000_000_000,
            pixels: vec![0],
        };
        assert_eq!(FieldValue::SFImage(img).to_string(), "1 1 2000000000 0x00000000");
    }

    #[test]
    fn remap_only_touches_mapped_handles() {
        let a = NodeIndex::new(1);
        let b = NodeIndex::new(2);
        let c = NodeIndex::new(7);
        let mut v = FieldValue::MFNode(vec![a, b]);
        let remap = HashMap::from([(a, c)]);
        v.remap_nodes(&remap);
        assert_eq!(v, FieldValue::MFNode(vec![c, b]));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let err = FieldValue::SFFloat(1.0)
            .expect_type(FieldType::SFColor)
            .unwrap_err();
        assert!(matches!(
            err,
            VrmlError::TypeMismatch {
                expected: FieldType::SFColor,
                actual: FieldType::SFFloat
            }
        ));
    }
}
