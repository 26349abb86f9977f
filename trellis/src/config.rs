use derivative::Derivative;
use glam::Vec3;

use crate::{CameraParams, LightDesc, LightKind};

#[derive(Clone, Debug, PartialEq, Derivative)]
#[derivative(Default)]
pub struct SyncConfig {
    /// Material assigned to objects whose primitive has no binding.
    #[derivative(Default(value = "String::from(\"default_material\")"))]
    pub default_material: String,

    /// Sharpness of the corners boundary vertices are turned into before
    /// subdivision; anything above the number of refinement passes pins
    /// them in place.
    #[derivative(Default(value = "10.0"))]
    pub boundary_corner_sharpness: f32,

    /// When disabled, meshes are always defined as their triangulated hull.
    #[derivative(Default(value = "true"))]
    pub refinement: bool,

    #[derivative(Default(value = "4"))]
    pub max_refine_level: u32,

    pub default_light: DefaultLightConfig,

    /// Camera the renderer is bootstrapped with, before the first frame
    /// provides a real one.
    pub camera: CameraParams,

    /// Number of threads used to pull primitives; `1` pulls on the calling
    /// thread.
    #[derivative(Default(value = "1"))]
    pub sync_threads: usize,
}

/// Light that keeps the renderer's scene lit before any real light is
/// authored.
#[derive(Clone, Debug, PartialEq, Derivative)]
#[derivative(Default)]
pub struct DefaultLightConfig {
    #[derivative(Default(value = "String::from(\"default_light\")"))]
    pub name: String,

    #[derivative(Default(value = "LightDesc {
        kind: LightKind::Point,
        color: Vec3::ONE,
        position: Vec3::new(1.0, 6.0, 3.0),
    }"))]
    pub light: LightDesc,
}
