//! The viewer seam: what a rendering back end must accept.
//!
//! Every `insert_*` call returns a handle the back end chose. The traversal
//! keeps those handles so shared geometry can be referenced instead of
//! rebuilt, and so collected nodes can be released later.

use crate::image::DecodedImage;
use vrml_core::{Color, Rotation, Vec3f};

/// Opaque handle to something a viewer built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub translation: Vec3f,
    pub rotation: Rotation,
    pub scale: Vec3f,
    pub scale_orientation: Rotation,
    pub center: Vec3f,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: Rotation::default(),
            scale: [1.0; 3],
            scale_orientation: Rotation::default(),
            center: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub ambient_intensity: f32,
    pub diffuse_color: Color,
    pub emissive_color: Color,
    pub shininess: f32,
    pub specular_color: Color,
    pub transparency: f32,
}

/// Indexed polygon mesh from an `IndexedFaceSet`. Faces in `coord_index`
/// are terminated by `-1`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shell {
    pub coords: Vec<Vec3f>,
    pub coord_index: Vec<i32>,
    pub ccw: bool,
    pub convex: bool,
    pub solid: bool,
    pub crease_angle: f32,
}

// ─── Lights ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCommon {
    pub ambient_intensity: f32,
    pub color: Color,
    pub intensity: f32,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub common: LightCommon,
    pub direction: Vec3f,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub common: LightCommon,
    pub location: Vec3f,
    pub attenuation: Vec3f,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub point: PointLight,
    pub direction: Vec3f,
    pub beam_width: f32,
    pub cut_off_angle: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewpointParams {
    pub position: Vec3f,
    pub orientation: Rotation,
    pub field_of_view: f32,
    pub description: String,
}

// ─── Viewer ──────────────────────────────────────────────────────────────

/// A rendering back end.
///
/// Objects nest: everything inserted between `begin_object` and the matching
/// `end_object` belongs to that object, and a `transform` call applies to
/// the innermost open object.
pub trait Viewer {
    fn begin_object(&mut self, name: Option<&str>) -> ObjectHandle;
    fn end_object(&mut self);
    fn transform(&mut self, transform: &TransformParams);

    fn insert_box(&mut self, size: Vec3f) -> ObjectHandle;
    fn insert_cone(&mut self, bottom_radius: f32, height: f32, side: bool, bottom: bool) -> ObjectHandle;
    fn insert_cylinder(
        &mut self,
        radius: f32,
        height: f32,
        side: bool,
        top: bool,
        bottom: bool,
    ) -> ObjectHandle;
    fn insert_sphere(&mut self, radius: f32) -> ObjectHandle;
    fn insert_shell(&mut self, shell: &Shell) -> ObjectHandle;
    fn insert_line_set(&mut self, coords: &[Vec3f], coord_index: &[i32]) -> ObjectHandle;
    fn insert_point_set(&mut self, coords: &[Vec3f]) -> ObjectHandle;
    /// Instance something already built, typically shared geometry.
    fn insert_reference(&mut self, existing: ObjectHandle) -> ObjectHandle;

    /// Material for the geometry inserted next.
    fn set_material(&mut self, material: &MaterialParams);
    /// Texture for the geometry inserted next.
    fn insert_texture(&mut self, image: &DecodedImage, repeat_s: bool, repeat_t: bool) -> ObjectHandle;

    fn insert_dir_light(&mut self, light: &DirectionalLight) -> ObjectHandle;
    fn insert_point_light(&mut self, light: &PointLight) -> ObjectHandle;
    fn insert_spot_light(&mut self, light: &SpotLight) -> ObjectHandle;

    fn set_viewpoint(&mut self, viewpoint: &ViewpointParams);

    fn remove_object(&mut self, handle: ObjectHandle);
}
