//! Scene graph → viewer calls.
//!
//! Walks from the scene roots depth first. Grouping nodes open a viewer
//! object around their children; a Shape sets its appearance and then
//! inserts its geometry. A PROTO instance renders as the first node of its
//! implementation. Geometry reached a second time in the same pass is not
//! rebuilt: the viewer gets a reference to what it built the first time.

use crate::image::{DecodedImage, ImageDecoder};
use crate::viewer::{
    DirectionalLight, LightCommon, MaterialParams, ObjectHandle, PointLight, Shell, SpotLight,
    TransformParams, Viewer, ViewpointParams,
};
use std::collections::{HashMap, HashSet};
use vrml_core::{Capability, Color, FieldValue, Name, Node, NodeIndex, Rotation, SceneGraph, Vec3f};

/// What one render pass built, keyed by the node that produced it.
#[derive(Debug, Default)]
pub struct RenderedScene {
    pub objects: HashMap<NodeIndex, ObjectHandle>,
}

impl RenderedScene {
    pub fn handle(&self, node: NodeIndex) -> Option<ObjectHandle> {
        self.objects.get(&node).copied()
    }

    /// Tell the viewer to drop what it built for garbage-collected nodes.
    /// Returns how many objects were released.
    pub fn release(&mut self, viewer: &mut dyn Viewer, removed: &[(NodeIndex, Node)]) -> usize {
        let mut released = 0;
        for (idx, _) in removed {
            if let Some(handle) = self.objects.remove(idx) {
                viewer.remove_object(handle);
                released += 1;
            }
        }
        released
    }
}

/// Render `roots` into `viewer`. Image textures are read through `images`.
pub fn render_scene(
    graph: &SceneGraph,
    roots: &[NodeIndex],
    viewer: &mut dyn Viewer,
    images: &dyn ImageDecoder,
) -> RenderedScene {
    let mut walk = Walk {
        graph,
        viewer,
        images,
        objects: HashMap::new(),
        active: HashSet::new(),
        viewpoint_bound: false,
    };
    for &root in roots {
        walk.node(root);
    }
    log::debug!("render pass built {} objects", walk.objects.len());
    RenderedScene {
        objects: walk.objects,
    }
}

struct Walk<'a> {
    graph: &'a SceneGraph,
    viewer: &'a mut dyn Viewer,
    images: &'a dyn ImageDecoder,
    objects: HashMap<NodeIndex, ObjectHandle>,
    /// Grouping nodes on the current path.
    active: HashSet<NodeIndex>,
    viewpoint_bound: bool,
}

impl<'a> Walk<'a> {
    /// Follow PROTO instances down to the node they render as.
    fn resolve(&self, mut idx: NodeIndex) -> Option<(NodeIndex, &'a Node)> {
        let graph = self.graph;
        loop {
            let node = graph.node(idx)?;
            if node.template {
                return None;
            }
            if node.node_type.proto().is_none() {
                return Some((idx, node));
            }
            idx = *node.implementation.first()?;
        }
    }

    fn child(&self, node: &Node, field: &str) -> Option<(NodeIndex, &'a Node)> {
        value(node, field)
            .and_then(FieldValue::as_node)
            .and_then(|idx| self.resolve(idx))
    }

    fn node(&mut self, idx: NodeIndex) {
        let Some((idx, node)) = self.resolve(idx) else {
            log::trace!("node #{} has nothing to render", idx.index());
            return;
        };
        let node_type = &node.node_type;
        let class = node_type.class.as_str();

        if node_type.has_capability(Capability::Grouping) {
            if !self.active.insert(idx) {
                log::warn!("{} #{} contains itself; not descended", class, idx.index());
                return;
            }
            self.group(idx, node, class);
            self.active.remove(&idx);
        } else if node_type.has_capability(Capability::Shape) {
            self.shape(node);
        } else if node_type.has_capability(Capability::Light) {
            self.light(idx, node, class);
        } else if class == "Viewpoint" {
            self.viewpoint(node);
        } else {
            log::trace!("{} draws nothing", node_type.id);
        }
    }

    // ─── Grouping ────────────────────────────────────────────────────────

    fn group(&mut self, idx: NodeIndex, node: &'a Node, class: &str) {
        let name = node.name.map(|n| n.as_str().to_string());
        let handle = self.viewer.begin_object(name.as_deref());
        self.objects.insert(idx, handle);

        if class == "Transform" {
            self.viewer.transform(&TransformParams {
                translation: vec3(node, "translation", [0.0; 3]),
                rotation: rotation(node, "rotation"),
                scale: vec3(node, "scale", [1.0; 3]),
                scale_orientation: rotation(node, "scaleOrientation"),
                center: vec3(node, "center", [0.0; 3]),
            });
        }

        let children: &[NodeIndex] = match class {
            "Switch" => {
                let choice = nodes(node, "choice");
                match usize::try_from(int(node, "whichChoice", -1)) {
                    Ok(i) if i < choice.len() => &choice[i..=i],
                    _ => &[],
                }
            }
            "LOD" => {
                let level = nodes(node, "level");
                &level[..level.len().min(1)]
            }
            _ => nodes(node, "children"),
        };
        for &child in children {
            self.node(child);
        }
        self.viewer.end_object();
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    fn shape(&mut self, node: &'a Node) {
        if let Some((_, appearance)) = self.child(node, "appearance") {
            self.appearance(appearance);
        }
        if let Some((idx, geometry)) = self.child(node, "geometry") {
            self.geometry(idx, geometry);
        }
    }

    fn appearance(&mut self, node: &'a Node) {
        if let Some((_, material)) = self.child(node, "material") {
            self.viewer.set_material(&MaterialParams {
                ambient_intensity: float(material, "ambientIntensity", 0.2),
                diffuse_color: color(material, "diffuseColor", Color::rgb(0.8, 0.8, 0.8)),
                emissive_color: color(material, "emissiveColor", Color::default()),
                shininess: float(material, "shininess", 0.2),
                specular_color: color(material, "specularColor", Color::default()),
                transparency: float(material, "transparency", 0.0),
            });
        }
        if let Some((idx, texture)) = self.child(node, "texture") {
            self.texture(idx, texture);
        }
    }

    fn texture(&mut self, idx: NodeIndex, node: &'a Node) {
        let image = match node.node_type.class.as_str() {
            "ImageTexture" => self.load_image(strings(node, "url")),
            "PixelTexture" => match value(node, "image") {
                Some(FieldValue::SFImage(image)) if image.width > 0 && image.height > 0 => {
                    Some(DecodedImage::from_sfimage(image))
                }
                _ => None,
            },
            other => {
                log::debug!("{other} is not rendered");
                None
            }
        };
        if let Some(image) = image {
            let handle =
                self.viewer
                    .insert_texture(&image, flag(node, "repeatS", true), flag(node, "repeatT", true));
            self.objects.insert(idx, handle);
        }
    }

    /// First URL that decodes wins. Failures are logged, not fatal.
    fn load_image(&self, urls: &[String]) -> Option<DecodedImage> {
        for url in urls {
            match self.images.load(url) {
                Ok(image) => return Some(image),
                Err(e) => log::warn!("texture {url}: {e}"),
            }
        }
        None
    }

    fn geometry(&mut self, idx: NodeIndex, node: &'a Node) {
        if let Some(&existing) = self.objects.get(&idx) {
            self.viewer.insert_reference(existing);
            return;
        }
        let coords = self.coords(node);
        let handle = match node.node_type.class.as_str() {
            "Box" => self.viewer.insert_box(vec3(node, "size", [2.0; 3])),
            "Cone" => self.viewer.insert_cone(
                float(node, "bottomRadius", 1.0),
                float(node, "height", 2.0),
                flag(node, "side", true),
                flag(node, "bottom", true),
            ),
            "Cylinder" => self.viewer.insert_cylinder(
                float(node, "radius", 1.0),
                float(node, "height", 2.0),
                flag(node, "side", true),
                flag(node, "top", true),
                flag(node, "bottom", true),
            ),
            "Sphere" => self.viewer.insert_sphere(float(node, "radius", 1.0)),
            "IndexedFaceSet" => self.viewer.insert_shell(&Shell {
                coords: coords.to_vec(),
                coord_index: ints(node, "coordIndex").to_vec(),
                ccw: flag(node, "ccw", true),
                convex: flag(node, "convex", true),
                solid: flag(node, "solid", true),
                crease_angle: float(node, "creaseAngle", 0.0),
            }),
            "IndexedLineSet" => self.viewer.insert_line_set(coords, ints(node, "coordIndex")),
            "PointSet" => self.viewer.insert_point_set(coords),
            other => {
                log::debug!("{other} geometry is not rendered");
                return;
            }
        };
        self.objects.insert(idx, handle);
    }

    fn coords(&self, node: &Node) -> &'a [Vec3f] {
        match self.child(node, "coord").and_then(|(_, c)| value(c, "point")) {
            Some(FieldValue::MFVec3f(points)) => points,
            _ => &[],
        }
    }

    // ─── Lights and bindables ────────────────────────────────────────────

    fn light(&mut self, idx: NodeIndex, node: &Node, class: &str) {
        let common = LightCommon {
            ambient_intensity: float(node, "ambientIntensity", 0.0),
            color: color(node, "color", Color::rgb(1.0, 1.0, 1.0)),
            intensity: float(node, "intensity", 1.0),
            on: flag(node, "on", true),
        };
        let point = PointLight {
            common,
            location: vec3(node, "location", [0.0; 3]),
            attenuation: vec3(node, "attenuation", [1.0, 0.0, 0.0]),
            radius: float(node, "radius", 100.0),
        };
        let direction = vec3(node, "direction", [0.0, 0.0, -1.0]);
        let handle = match class {
            "DirectionalLight" => self
                .viewer
                .insert_dir_light(&DirectionalLight { common, direction }),
            "PointLight" => self.viewer.insert_point_light(&point),
            "SpotLight" => self.viewer.insert_spot_light(&SpotLight {
                point,
                direction,
                beam_width: float(node, "beamWidth", std::f32::consts::FRAC_PI_2),
                cut_off_angle: float(node, "cutOffAngle", std::f32::consts::FRAC_PI_4),
            }),
            other => {
                log::debug!("{other} light is not rendered");
                return;
            }
        };
        self.objects.insert(idx, handle);
    }

    /// The first Viewpoint reached is the one bound.
    fn viewpoint(&mut self, node: &Node) {
        if self.viewpoint_bound {
            return;
        }
        self.viewpoint_bound = true;
        let description = match value(node, "description") {
            Some(FieldValue::SFString(s)) => s.clone(),
            _ => String::new(),
        };
        self.viewer.set_viewpoint(&ViewpointParams {
            position: vec3(node, "position", [0.0, 0.0, 10.0]),
            orientation: rotation(node, "orientation"),
            field_of_view: float(node, "fieldOfView", std::f32::consts::FRAC_PI_4),
            description,
        });
    }
}

// ─── Field helpers ───────────────────────────────────────────────────────

fn value<'n>(node: &'n Node, field: &str) -> Option<&'n FieldValue> {
    node.field(Name::intern(field))
}

fn float(node: &Node, field: &str, default: f32) -> f32 {
    value(node, field).and_then(FieldValue::as_float).unwrap_or(default)
}

fn flag(node: &Node, field: &str, default: bool) -> bool {
    value(node, field).and_then(FieldValue::as_bool).unwrap_or(default)
}

fn vec3(node: &Node, field: &str, default: Vec3f) -> Vec3f {
    value(node, field).and_then(FieldValue::as_vec3f).unwrap_or(default)
}

fn color(node: &Node, field: &str, default: Color) -> Color {
    value(node, field).and_then(FieldValue::as_color).unwrap_or(default)
}

fn rotation(node: &Node, field: &str) -> Rotation {
    value(node, field)
        .and_then(FieldValue::as_rotation)
        .unwrap_or_default()
}

fn int(node: &Node, field: &str, default: i32) -> i32 {
    match value(node, field) {
        Some(FieldValue::SFInt32(v)) => *v,
        _ => default,
    }
}

fn nodes<'n>(node: &'n Node, field: &str) -> &'n [NodeIndex] {
    value(node, field).map(FieldValue::node_refs).unwrap_or(&[])
}

fn ints<'n>(node: &'n Node, field: &str) -> &'n [i32] {
    match value(node, field) {
        Some(FieldValue::MFInt32(v)) => v,
        _ => &[],
    }
}

fn strings<'n>(node: &'n Node, field: &str) -> &'n [String] {
    match value(node, field) {
        Some(FieldValue::MFString(v)) => v,
        _ => &[],
    }
}
