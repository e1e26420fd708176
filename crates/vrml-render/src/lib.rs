//! Rendering front end for VRML97 scenes.
//!
//! The traversal walks a loaded scene graph and drives a [`Viewer`]: the
//! back end owns geometry, materials, lights and textures and hands out
//! opaque [`ObjectHandle`]s. No graphics API is assumed here.

pub mod image;
pub mod recording;
pub mod traverse;
pub mod viewer;

pub use image::{DecodedImage, ImageDecoder, ImageError, PnmDecoder};
pub use recording::{RecordingViewer, ViewerCommand};
pub use traverse::{RenderedScene, render_scene};
pub use viewer::{
    DirectionalLight, LightCommon, MaterialParams, ObjectHandle, PointLight, Shell, SpotLight,
    TransformParams, Viewer, ViewpointParams,
};
