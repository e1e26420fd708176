//! The VRML97 standard node set.
//!
//! Each entry lists interfaces in declaration order with the default value
//! written as a VRML literal. Events and node-valued fields leave the
//! default empty and take the type's zero value.

use crate::field::FieldType::{self, *};
use crate::field::FieldValue;
use crate::id::Name;
use crate::node_type::{
    Capability, InterfaceKind, InterfaceSet, NodeInterface, NodeType, TypeOrigin,
};
use std::collections::HashMap;
use std::sync::Arc;

const F: InterfaceKind = InterfaceKind::Field;
const X: InterfaceKind = InterfaceKind::ExposedField;
const I: InterfaceKind = InterfaceKind::EventIn;
const O: InterfaceKind = InterfaceKind::EventOut;

type Decl = (InterfaceKind, FieldType, &'static str, &'static str);

struct Builtin {
    name: &'static str,
    capabilities: &'static [Capability],
    interfaces: &'static [Decl],
}

use Capability::{
    Appearance as AppearanceCap, AudioSource, Bindable, Child, FontStyle as FontStyleCap,
    Geometry, GeometryProperty, Grouping, Interpolator, Light, Material as MaterialCap,
    Script as ScriptCap, Sensor, Shape as ShapeCap, Texture, TextureTransform as TexTransformCap,
};

const SCRIPT: &[Decl] = &[
    (X, MFString, "url", "[]"),
    (F, SFBool, "directOutput", "FALSE"),
    (F, SFBool, "mustEvaluate", "FALSE"),
];

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "Anchor",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (I, MFNode, "addChildren", ""),
            (I, MFNode, "removeChildren", ""),
            (X, MFNode, "children", ""),
            (X, SFString, "description", "\"\""),
            (X, MFString, "parameter", "[]"),
            (X, MFString, "url", "[]"),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
        ],
    },
    Builtin {
        name: "Appearance",
        capabilities: &[AppearanceCap],
        interfaces: &[
            (X, SFNode, "material", ""),
            (X, SFNode, "texture", ""),
            (X, SFNode, "textureTransform", ""),
        ],
    },
    Builtin {
        name: "AudioClip",
        capabilities: &[AudioSource],
        interfaces: &[
            (X, SFString, "description", "\"\""),
            (X, SFBool, "loop", "FALSE"),
            (X, SFFloat, "pitch", "1"),
            (X, SFTime, "startTime", "0"),
            (X, SFTime, "stopTime", "0"),
            (X, MFString, "url", "[]"),
            (O, SFTime, "duration_changed", ""),
            (O, SFBool, "isActive", ""),
        ],
    },
    Builtin {
        name: "Background",
        capabilities: &[Bindable, Child],
        interfaces: &[
            (I, SFBool, "set_bind", ""),
            (X, MFFloat, "groundAngle", "[]"),
            (X, MFColor, "groundColor", "[]"),
            (X, MFString, "backUrl", "[]"),
            (X, MFString, "bottomUrl", "[]"),
            (X, MFString, "frontUrl", "[]"),
            (X, MFString, "leftUrl", "[]"),
            (X, MFString, "rightUrl", "[]"),
            (X, MFString, "topUrl", "[]"),
            (X, MFFloat, "skyAngle", "[]"),
            (X, MFColor, "skyColor", "0 0 0"),
            (O, SFBool, "isBound", ""),
        ],
    },
    Builtin {
        name: "Billboard",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (I, MFNode, "addChildren", ""),
            (I, MFNode, "removeChildren", ""),
            (X, SFVec3f, "axisOfRotation", "0 1 0"),
            (X, MFNode, "children", ""),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
        ],
    },
    Builtin {
        name: "Box",
        capabilities: &[Geometry],
        interfaces: &[(F, SFVec3f, "size", "2 2 2")],
    },
    Builtin {
        name: "Collision",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (I, MFNode, "addChildren", ""),
            (I, MFNode, "removeChildren", ""),
            (X, MFNode, "children", ""),
            (X, SFBool, "collide", "TRUE"),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
            (F, SFNode, "proxy", ""),
            (O, SFTime, "collideTime", ""),
        ],
    },
    Builtin {
        name: "Color",
        capabilities: &[GeometryProperty],
        interfaces: &[(X, MFColor, "color", "[]")],
    },
    Builtin {
        name: "ColorInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFColor, "keyValue", "[]"),
            (O, SFColor, "value_changed", ""),
        ],
    },
    Builtin {
        name: "Cone",
        capabilities: &[Geometry],
        interfaces: &[
            (F, SFFloat, "bottomRadius", "1"),
            (F, SFFloat, "height", "2"),
            (F, SFBool, "side", "TRUE"),
            (F, SFBool, "bottom", "TRUE"),
        ],
    },
    Builtin {
        name: "Coordinate",
        capabilities: &[GeometryProperty],
        interfaces: &[(X, MFVec3f, "point", "[]")],
    },
    Builtin {
        name: "CoordinateInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFVec3f, "keyValue", "[]"),
            (O, MFVec3f, "value_changed", ""),
        ],
    },
    Builtin {
        name: "Cylinder",
        capabilities: &[Geometry],
        interfaces: &[
            (F, SFBool, "bottom", "TRUE"),
            (F, SFFloat, "height", "2"),
            (F, SFFloat, "radius", "1"),
            (F, SFBool, "side", "TRUE"),
            (F, SFBool, "top", "TRUE"),
        ],
    },
    Builtin {
        name: "CylinderSensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFBool, "autoOffset", "TRUE"),
            (X, SFFloat, "diskAngle", "0.262"),
            (X, SFBool, "enabled", "TRUE"),
            (X, SFFloat, "maxAngle", "-1"),
            (X, SFFloat, "minAngle", "0"),
            (X, SFFloat, "offset", "0"),
            (O, SFBool, "isActive", ""),
            (O, SFRotation, "rotation_changed", ""),
            (O, SFVec3f, "trackPoint_changed", ""),
        ],
    },
    Builtin {
        name: "DirectionalLight",
        capabilities: &[Light, Child],
        interfaces: &[
            (X, SFFloat, "ambientIntensity", "0"),
            (X, SFColor, "color", "1 1 1"),
            (X, SFVec3f, "direction", "0 0 -1"),
            (X, SFFloat, "intensity", "1"),
            (X, SFBool, "on", "TRUE"),
        ],
    },
    Builtin {
        name: "ElevationGrid",
        capabilities: &[Geometry],
        interfaces: &[
            (I, MFFloat, "set_height", ""),
            (X, SFNode, "color", ""),
            (X, SFNode, "normal", ""),
            (X, SFNode, "texCoord", ""),
            (F, MFFloat, "height", "[]"),
            (F, SFBool, "ccw", "TRUE"),
            (F, SFBool, "colorPerVertex", "TRUE"),
            (F, SFFloat, "creaseAngle", "0"),
            (F, SFBool, "normalPerVertex", "TRUE"),
            (F, SFBool, "solid", "TRUE"),
            (F, SFInt32, "xDimension", "0"),
            (F, SFFloat, "xSpacing", "1"),
            (F, SFInt32, "zDimension", "0"),
            (F, SFFloat, "zSpacing", "1"),
        ],
    },
    Builtin {
        name: "Extrusion",
        capabilities: &[Geometry],
        interfaces: &[
            (I, MFVec2f, "set_crossSection", ""),
            (I, MFRotation, "set_orientation", ""),
            (I, MFVec2f, "set_scale", ""),
            (I, MFVec3f, "set_spine", ""),
            (F, SFBool, "beginCap", "TRUE"),
            (F, SFBool, "ccw", "TRUE"),
            (F, SFBool, "convex", "TRUE"),
            (F, SFFloat, "creaseAngle", "0"),
            (F, MFVec2f, "crossSection", "[1 1, 1 -1, -1 -1, -1 1, 1 1]"),
            (F, SFBool, "endCap", "TRUE"),
            (F, MFRotation, "orientation", "0 0 1 0"),
            (F, MFVec2f, "scale", "1 1"),
            (F, SFBool, "solid", "TRUE"),
            (F, MFVec3f, "spine", "[0 0 0, 0 1 0]"),
        ],
    },
    Builtin {
        name: "Fog",
        capabilities: &[Bindable, Child],
        interfaces: &[
            (X, SFColor, "color", "1 1 1"),
            (X, SFString, "fogType", "\"LINEAR\""),
            (X, SFFloat, "visibilityRange", "0"),
            (I, SFBool, "set_bind", ""),
            (O, SFBool, "isBound", ""),
        ],
    },
    Builtin {
        name: "FontStyle",
        capabilities: &[FontStyleCap],
        interfaces: &[
            (F, MFString, "family", "\"SERIF\""),
            (F, SFBool, "horizontal", "TRUE"),
            (F, MFString, "justify", "\"BEGIN\""),
            (F, SFString, "language", "\"\""),
            (F, SFBool, "leftToRight", "TRUE"),
            (F, SFFloat, "size", "1"),
            (F, SFFloat, "spacing", "1"),
            (F, SFString, "style", "\"PLAIN\""),
            (F, SFBool, "topToBottom", "TRUE"),
        ],
    },
    Builtin {
        name: "Group",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (I, MFNode, "addChildren", ""),
            (I, MFNode, "removeChildren", ""),
            (X, MFNode, "children", ""),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
        ],
    },
    Builtin {
        name: "ImageTexture",
        capabilities: &[Texture],
        interfaces: &[
            (X, MFString, "url", "[]"),
            (F, SFBool, "repeatS", "TRUE"),
            (F, SFBool, "repeatT", "TRUE"),
        ],
    },
    Builtin {
        name: "IndexedFaceSet",
        capabilities: &[Geometry],
        interfaces: &[
            (I, MFInt32, "set_colorIndex", ""),
            (I, MFInt32, "set_coordIndex", ""),
            (I, MFInt32, "set_normalIndex", ""),
            (I, MFInt32, "set_texCoordIndex", ""),
            (X, SFNode, "color", ""),
            (X, SFNode, "coord", ""),
            (X, SFNode, "normal", ""),
            (X, SFNode, "texCoord", ""),
            (F, SFBool, "ccw", "TRUE"),
            (F, MFInt32, "colorIndex", "[]"),
            (F, SFBool, "colorPerVertex", "TRUE"),
            (F, SFBool, "convex", "TRUE"),
            (F, MFInt32, "coordIndex", "[]"),
            (F, SFFloat, "creaseAngle", "0"),
            (F, MFInt32, "normalIndex", "[]"),
            (F, SFBool, "normalPerVertex", "TRUE"),
            (F, SFBool, "solid", "TRUE"),
            (F, MFInt32, "texCoordIndex", "[]"),
        ],
    },
    Builtin {
        name: "IndexedLineSet",
        capabilities: &[Geometry],
        interfaces: &[
            (I, MFInt32, "set_colorIndex", ""),
            (I, MFInt32, "set_coordIndex", ""),
            (X, SFNode, "color", ""),
            (X, SFNode, "coord", ""),
            (F, MFInt32, "colorIndex", "[]"),
            (F, SFBool, "colorPerVertex", "TRUE"),
            (F, MFInt32, "coordIndex", "[]"),
        ],
    },
    Builtin {
        name: "Inline",
        capabilities: &[Child],
        interfaces: &[
            (X, MFString, "url", "[]"),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
        ],
    },
    Builtin {
        name: "LOD",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (X, MFNode, "level", ""),
            (F, SFVec3f, "center", "0 0 0"),
            (F, MFFloat, "range", "[]"),
        ],
    },
    Builtin {
        name: "Material",
        capabilities: &[MaterialCap],
        interfaces: &[
            (X, SFFloat, "ambientIntensity", "0.2"),
            (X, SFColor, "diffuseColor", "0.8 0.8 0.8"),
            (X, SFColor, "emissiveColor", "0 0 0"),
            (X, SFFloat, "shininess", "0.2"),
            (X, SFColor, "specularColor", "0 0 0"),
            (X, SFFloat, "transparency", "0"),
        ],
    },
    Builtin {
        name: "MovieTexture",
        capabilities: &[Texture, AudioSource],
        interfaces: &[
            (X, SFBool, "loop", "FALSE"),
            (X, SFFloat, "speed", "1"),
            (X, SFTime, "startTime", "0"),
            (X, SFTime, "stopTime", "0"),
            (X, MFString, "url", "[]"),
            (F, SFBool, "repeatS", "TRUE"),
            (F, SFBool, "repeatT", "TRUE"),
            (O, SFTime, "duration_changed", ""),
            (O, SFBool, "isActive", ""),
        ],
    },
    Builtin {
        name: "NavigationInfo",
        capabilities: &[Bindable, Child],
        interfaces: &[
            (I, SFBool, "set_bind", ""),
            (X, MFFloat, "avatarSize", "[0.25, 1.6, 0.75]"),
            (X, SFBool, "headlight", "TRUE"),
            (X, SFFloat, "speed", "1"),
            (X, MFString, "type", "[\"WALK\", \"ANY\"]"),
            (X, SFFloat, "visibilityLimit", "0"),
            (O, SFBool, "isBound", ""),
        ],
    },
    Builtin {
        name: "Normal",
        capabilities: &[GeometryProperty],
        interfaces: &[(X, MFVec3f, "vector", "[]")],
    },
    Builtin {
        name: "NormalInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFVec3f, "keyValue", "[]"),
            (O, MFVec3f, "value_changed", ""),
        ],
    },
    Builtin {
        name: "OrientationInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFRotation, "keyValue", "[]"),
            (O, SFRotation, "value_changed", ""),
        ],
    },
    Builtin {
        name: "PixelTexture",
        capabilities: &[Texture],
        interfaces: &[
            (X, SFImage, "image", "0 0 0"),
            (F, SFBool, "repeatS", "TRUE"),
            (F, SFBool, "repeatT", "TRUE"),
        ],
    },
    Builtin {
        name: "PlaneSensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFBool, "autoOffset", "TRUE"),
            (X, SFBool, "enabled", "TRUE"),
            (X, SFVec2f, "maxPosition", "-1 -1"),
            (X, SFVec2f, "minPosition", "0 0"),
            (X, SFVec3f, "offset", "0 0 0"),
            (O, SFBool, "isActive", ""),
            (O, SFVec3f, "trackPoint_changed", ""),
            (O, SFVec3f, "translation_changed", ""),
        ],
    },
    Builtin {
        name: "PointLight",
        capabilities: &[Light, Child],
        interfaces: &[
            (X, SFFloat, "ambientIntensity", "0"),
            (X, SFVec3f, "attenuation", "1 0 0"),
            (X, SFColor, "color", "1 1 1"),
            (X, SFFloat, "intensity", "1"),
            (X, SFVec3f, "location", "0 0 0"),
            (X, SFBool, "on", "TRUE"),
            (X, SFFloat, "radius", "100"),
        ],
    },
    Builtin {
        name: "PointSet",
        capabilities: &[Geometry],
        interfaces: &[(X, SFNode, "color", ""), (X, SFNode, "coord", "")],
    },
    Builtin {
        name: "PositionInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFVec3f, "keyValue", "[]"),
            (O, SFVec3f, "value_changed", ""),
        ],
    },
    Builtin {
        name: "ProximitySensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFVec3f, "center", "0 0 0"),
            (X, SFVec3f, "size", "0 0 0"),
            (X, SFBool, "enabled", "TRUE"),
            (O, SFBool, "isActive", ""),
            (O, SFVec3f, "position_changed", ""),
            (O, SFRotation, "orientation_changed", ""),
            (O, SFTime, "enterTime", ""),
            (O, SFTime, "exitTime", ""),
        ],
    },
    Builtin {
        name: "ScalarInterpolator",
        capabilities: &[Interpolator, Child],
        interfaces: &[
            (I, SFFloat, "set_fraction", ""),
            (X, MFFloat, "key", "[]"),
            (X, MFFloat, "keyValue", "[]"),
            (O, SFFloat, "value_changed", ""),
        ],
    },
    Builtin {
        name: "Script",
        capabilities: &[ScriptCap, Child],
        interfaces: SCRIPT,
    },
    Builtin {
        name: "Shape",
        capabilities: &[ShapeCap, Child],
        interfaces: &[(X, SFNode, "appearance", ""), (X, SFNode, "geometry", "")],
    },
    Builtin {
        name: "Sound",
        capabilities: &[Child],
        interfaces: &[
            (X, SFVec3f, "direction", "0 0 1"),
            (X, SFFloat, "intensity", "1"),
            (X, SFVec3f, "location", "0 0 0"),
            (X, SFFloat, "maxBack", "10"),
            (X, SFFloat, "maxFront", "10"),
            (X, SFFloat, "minBack", "1"),
            (X, SFFloat, "minFront", "1"),
            (X, SFFloat, "priority", "0"),
            (X, SFNode, "source", ""),
            (F, SFBool, "spatialize", "TRUE"),
        ],
    },
    Builtin {
        name: "Sphere",
        capabilities: &[Geometry],
        interfaces: &[(F, SFFloat, "radius", "1")],
    },
    Builtin {
        name: "SphereSensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFBool, "autoOffset", "TRUE"),
            (X, SFBool, "enabled", "TRUE"),
            (X, SFRotation, "offset", "0 1 0 0"),
            (O, SFBool, "isActive", ""),
            (O, SFRotation, "rotation_changed", ""),
            (O, SFVec3f, "trackPoint_changed", ""),
        ],
    },
    Builtin {
        name: "SpotLight",
        capabilities: &[Light, Child],
        interfaces: &[
            (X, SFFloat, "ambientIntensity", "0"),
            (X, SFVec3f, "attenuation", "1 0 0"),
            (X, SFFloat, "beamWidth", "1.570796"),
            (X, SFColor, "color", "1 1 1"),
            (X, SFFloat, "cutOffAngle", "0.785398"),
            (X, SFVec3f, "direction", "0 0 -1"),
            (X, SFFloat, "intensity", "1"),
            (X, SFVec3f, "location", "0 0 0"),
            (X, SFBool, "on", "TRUE"),
            (X, SFFloat, "radius", "100"),
        ],
    },
    Builtin {
        name: "Switch",
        capabilities: &[Grouping, Child],
        interfaces: &[(X, MFNode, "choice", ""), (X, SFInt32, "whichChoice", "-1")],
    },
    Builtin {
        name: "Text",
        capabilities: &[Geometry],
        interfaces: &[
            (X, MFString, "string", "[]"),
            (X, SFNode, "fontStyle", ""),
            (X, MFFloat, "length", "[]"),
            (X, SFFloat, "maxExtent", "0"),
        ],
    },
    Builtin {
        name: "TextureCoordinate",
        capabilities: &[GeometryProperty],
        interfaces: &[(X, MFVec2f, "point", "[]")],
    },
    Builtin {
        name: "TextureTransform",
        capabilities: &[TexTransformCap],
        interfaces: &[
            (X, SFVec2f, "center", "0 0"),
            (X, SFFloat, "rotation", "0"),
            (X, SFVec2f, "scale", "1 1"),
            (X, SFVec2f, "translation", "0 0"),
        ],
    },
    Builtin {
        name: "TimeSensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFTime, "cycleInterval", "1"),
            (X, SFBool, "enabled", "TRUE"),
            (X, SFBool, "loop", "FALSE"),
            (X, SFTime, "startTime", "0"),
            (X, SFTime, "stopTime", "0"),
            (O, SFTime, "cycleTime", ""),
            (O, SFFloat, "fraction_changed", ""),
            (O, SFBool, "isActive", ""),
            (O, SFTime, "time", ""),
        ],
    },
    Builtin {
        name: "TouchSensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFBool, "enabled", "TRUE"),
            (O, SFVec3f, "hitNormal_changed", ""),
            (O, SFVec3f, "hitPoint_changed", ""),
            (O, SFVec2f, "hitTexCoord_changed", ""),
            (O, SFBool, "isActive", ""),
            (O, SFBool, "isOver", ""),
            (O, SFTime, "touchTime", ""),
        ],
    },
    Builtin {
        name: "Transform",
        capabilities: &[Grouping, Child],
        interfaces: &[
            (I, MFNode, "addChildren", ""),
            (I, MFNode, "removeChildren", ""),
            (X, SFVec3f, "center", "0 0 0"),
            (X, MFNode, "children", ""),
            (X, SFRotation, "rotation", "0 0 1 0"),
            (X, SFVec3f, "scale", "1 1 1"),
            (X, SFRotation, "scaleOrientation", "0 0 1 0"),
            (X, SFVec3f, "translation", "0 0 0"),
            (F, SFVec3f, "bboxCenter", "0 0 0"),
            (F, SFVec3f, "bboxSize", "-1 -1 -1"),
        ],
    },
    Builtin {
        name: "Viewpoint",
        capabilities: &[Bindable, Child],
        interfaces: &[
            (I, SFBool, "set_bind", ""),
            (X, SFFloat, "fieldOfView", "0.785398"),
            (X, SFBool, "jump", "TRUE"),
            (X, SFRotation, "orientation", "0 0 1 0"),
            (X, SFVec3f, "position", "0 0 10"),
            (F, SFString, "description", "\"\""),
            (O, SFTime, "bindTime", ""),
            (O, SFBool, "isBound", ""),
        ],
    },
    Builtin {
        name: "VisibilitySensor",
        capabilities: &[Sensor, Child],
        interfaces: &[
            (X, SFVec3f, "center", "0 0 0"),
            (X, SFBool, "enabled", "TRUE"),
            (X, SFVec3f, "size", "0 0 0"),
            (O, SFTime, "enterTime", ""),
            (O, SFTime, "exitTime", ""),
            (O, SFBool, "isActive", ""),
        ],
    },
    Builtin {
        name: "WorldInfo",
        capabilities: &[Child],
        interfaces: &[(F, MFString, "info", "[]"), (F, SFString, "title", "\"\"")],
    },
];

fn default_for(name: &str, (kind, field_type, id, literal): &Decl) -> FieldValue {
    if !kind.has_value() || literal.is_empty() {
        return field_type.zero_value();
    }
    FieldValue::parse_literal(*field_type, literal).unwrap_or_else(|e| {
        log::error!("bad default for {name}.{id}: {e}");
        field_type.zero_value()
    })
}

fn build(builtin: &Builtin) -> NodeType {
    let mut interfaces = InterfaceSet::new();
    let mut defaults = HashMap::new();
    for decl in builtin.interfaces {
        let (kind, field_type, id, _) = *decl;
        interfaces.add(NodeInterface::new(kind, field_type, id));
        defaults.insert(Name::intern(id), default_for(builtin.name, decl));
    }
    let origin = if builtin.name == "Script" {
        TypeOrigin::Script
    } else {
        TypeOrigin::Builtin
    };
    let name = Name::intern(builtin.name);
    NodeType::new(name, name, interfaces, defaults, builtin.capabilities, origin)
}

/// Every built-in node type, freshly built.
pub fn builtin_types() -> Vec<Arc<NodeType>> {
    BUILTINS.iter().map(|b| Arc::new(build(b))).collect()
}

/// The fixed interfaces every Script node starts with.
pub fn script_interfaces() -> InterfaceSet {
    let mut set = InterfaceSet::new();
    for (kind, field_type, id, _) in SCRIPT {
        set.add(NodeInterface::new(*kind, *field_type, *id));
    }
    set
}

/// Capabilities of every Script node type.
pub const SCRIPT_CAPABILITIES: &[Capability] = &[ScriptCap, Child];

/// Names of the built-in node types, in table order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Color, Rotation};
    use pretty_assertions::assert_eq;

    #[test]
    fn every_default_literal_parses() {
        for builtin in BUILTINS {
            for (kind, field_type, id, literal) in builtin.interfaces {
                if kind.has_value() && !literal.is_empty() {
                    let parsed = FieldValue::parse_literal(*field_type, literal);
                    assert!(parsed.is_ok(), "{}.{id}: {parsed:?}", builtin.name);
                }
            }
        }
    }

    #[test]
    fn interface_ids_are_unique_per_type() {
        for builtin in BUILTINS {
            let ty = build(builtin);
            assert_eq!(ty.interfaces.len(), builtin.interfaces.len(), "{}", builtin.name);
        }
    }

    #[test]
    fn standard_node_set_is_complete() {
        assert_eq!(builtin_names().count(), 54);
    }

    #[test]
    fn selected_defaults() {
        let types = builtin_types();
        let find = |n: &str| types.iter().find(|t| t.id.as_str() == n).unwrap().clone();

        let material = find("Material");
        assert_eq!(
            material.default_value(Name::intern("diffuseColor")),
            Some(&FieldValue::SFColor(Color::rgb(0.8, 0.8, 0.8)))
        );
        let transform = find("Transform");
        assert_eq!(
            transform.default_value(Name::intern("rotation")),
            Some(&FieldValue::SFRotation(Rotation::new(0.0, 0.0, 1.0, 0.0)))
        );
        let nav = find("NavigationInfo");
        assert_eq!(
            nav.default_value(Name::intern("type")),
            Some(&FieldValue::MFString(vec!["WALK".into(), "ANY".into()]))
        );
        assert!(find("Box").has_capability(Capability::Geometry));
        assert!(find("Viewpoint").has_capability(Capability::Bindable));
    }

    #[test]
    fn script_starts_with_three_fixed_interfaces() {
        let set = script_interfaces();
        assert_eq!(set.len(), 3);
        assert!(set.field(Name::intern("url")).is_some());
        assert!(set.field(Name::intern("mustEvaluate")).is_some());
    }
}
