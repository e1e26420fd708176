//! A viewer that records what it is told. Used by tests and by tools that
//! want a flat description of a scene.

use crate::image::DecodedImage;
use crate::viewer::{
    DirectionalLight, MaterialParams, ObjectHandle, PointLight, Shell, SpotLight, TransformParams,
    Viewer, ViewpointParams,
};
use vrml_core::Vec3f;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    BeginObject { handle: ObjectHandle, name: Option<String> },
    EndObject,
    Transform(TransformParams),
    Box { handle: ObjectHandle, size: Vec3f },
    Cone { handle: ObjectHandle, bottom_radius: f32, height: f32, side: bool, bottom: bool },
    Cylinder { handle: ObjectHandle, radius: f32, height: f32, side: bool, top: bool, bottom: bool },
    Sphere { handle: ObjectHandle, radius: f32 },
    Shell { handle: ObjectHandle, shell: Shell },
    LineSet { handle: ObjectHandle, coords: Vec<Vec3f>, coord_index: Vec<i32> },
    PointSet { handle: ObjectHandle, coords: Vec<Vec3f> },
    Reference { handle: ObjectHandle, existing: ObjectHandle },
    Material(MaterialParams),
    Texture { handle: ObjectHandle, width: u32, height: u32, components: u8 },
    DirectionalLight { handle: ObjectHandle, light: DirectionalLight },
    PointLight { handle: ObjectHandle, light: PointLight },
    SpotLight { handle: ObjectHandle, light: SpotLight },
    Viewpoint(ViewpointParams),
    Remove(ObjectHandle),
}

#[derive(Debug, Default)]
pub struct RecordingViewer {
    pub commands: Vec<ViewerCommand>,
    next: u64,
}

impl RecordingViewer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> ObjectHandle {
        self.next += 1;
        ObjectHandle(self.next)
    }

    fn push(&mut self, make: impl FnOnce(ObjectHandle) -> ViewerCommand) -> ObjectHandle {
        let handle = self.handle();
        self.commands.push(make(handle));
        handle
    }

    /// Commands of one kind, by a short label such as `"Box"`.
    pub fn count(&self, label: &str) -> usize {
        self.commands.iter().filter(|c| c.label() == label).count()
    }
}

impl ViewerCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BeginObject { .. } => "BeginObject",
            Self::EndObject => "EndObject",
            Self::Transform(_) => "Transform",
            Self::Box { .. } => "Box",
            Self::Cone { .. } => "Cone",
            Self::Cylinder { .. } => "Cylinder",
            Self::Sphere { .. } => "Sphere",
            Self::Shell { .. } => "Shell",
            Self::LineSet { .. } => "LineSet",
            Self::PointSet { .. } => "PointSet",
            Self::Reference { .. } => "Reference",
            Self::Material(_) => "Material",
            Self::Texture { .. } => "Texture",
            Self::DirectionalLight { .. } => "DirectionalLight",
            Self::PointLight { .. } => "PointLight",
            Self::SpotLight { .. } => "SpotLight",
            Self::Viewpoint(_) => "Viewpoint",
            Self::Remove(_) => "Remove",
        }
    }
}

impl Viewer for RecordingViewer {
    fn begin_object(&mut self, name: Option<&str>) -> ObjectHandle {
        let name = name.map(str::to_string);
        self.push(|handle| ViewerCommand::BeginObject { handle, name })
    }

    fn end_object(&mut self) {
        self.commands.push(ViewerCommand::EndObject);
    }

    fn transform(&mut self, transform: &TransformParams) {
        self.commands.push(ViewerCommand::Transform(*transform));
    }

    fn insert_box(&mut self, size: Vec3f) -> ObjectHandle {
        self.push(|handle| ViewerCommand::Box { handle, size })
    }

    fn insert_cone(&mut self, bottom_radius: f32, height: f32, side: bool, bottom: bool) -> ObjectHandle {
        self.push(|handle| ViewerCommand::Cone {
            handle,
            bottom_radius,
            height,
            side,
            bottom,
        })
    }

    fn insert_cylinder(
        &mut self,
        radius: f32,
        height: f32,
        side: bool,
        top: bool,
        bottom: bool,
    ) -> ObjectHandle {
        self.push(|handle| ViewerCommand::Cylinder {
            handle,
            radius,
            height,
            side,
            top,
            bottom,
        })
    }

    fn insert_sphere(&mut self, radius: f32) -> ObjectHandle {
        self.push(|handle| ViewerCommand::Sphere { handle, radius })
    }

    fn insert_shell(&mut self, shell: &Shell) -> ObjectHandle {
        let shell = shell.clone();
        self.push(|handle| ViewerCommand::Shell { handle, shell })
    }

    fn insert_line_set(&mut self, coords: &[Vec3f], coord_index: &[i32]) -> ObjectHandle {
        let (coords, coord_index) = (coords.to_vec(), coord_index.to_vec());
        self.push(|handle| ViewerCommand::LineSet {
            handle,
            coords,
            coord_index,
        })
    }

    fn insert_point_set(&mut self, coords: &[Vec3f]) -> ObjectHandle {
        let coords = coords.to_vec();
        self.push(|handle| ViewerCommand::PointSet { handle, coords })
    }

    fn insert_reference(&mut self, existing: ObjectHandle) -> ObjectHandle {
        self.push(|handle| ViewerCommand::Reference { handle, existing })
    }

    fn set_material(&mut self, material: &MaterialParams) {
        self.commands.push(ViewerCommand::Material(*material));
    }

    fn insert_texture(&mut self, image: &DecodedImage, _repeat_s: bool, _repeat_t: bool) -> ObjectHandle {
        let (width, height, components) = (image.width, image.height, image.components);
        self.push(|handle| ViewerCommand::Texture {
            handle,
            width,
            height,
            components,
        })
    }

    fn insert_dir_light(&mut self, light: &DirectionalLight) -> ObjectHandle {
        let light = *light;
        self.push(|handle| ViewerCommand::DirectionalLight { handle, light })
    }

    fn insert_point_light(&mut self, light: &PointLight) -> ObjectHandle {
        let light = *light;
        self.push(|handle| ViewerCommand::PointLight { handle, light })
    }

    fn insert_spot_light(&mut self, light: &SpotLight) -> ObjectHandle {
        let light = *light;
        self.push(|handle| ViewerCommand::SpotLight { handle, light })
    }

    fn set_viewpoint(&mut self, viewpoint: &ViewpointParams) {
        self.commands.push(ViewerCommand::Viewpoint(viewpoint.clone()));
    }

    fn remove_object(&mut self, handle: ObjectHandle) {
        self.commands.push(ViewerCommand::Remove(handle));
    }
}
