#[cfg(test)]
pub(crate) mod mock;

use glam::{Mat4, UVec2, UVec3, Vec3};
use thiserror::Error;

use crate::{CameraParams, LightDesc, PrimPath};

pub type RendererResult<T = ()> = Result<T, RendererError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RendererError {
    #[error("scene can be modified only within an edit transaction")]
    NotEditing,

    #[error("an edit transaction is already open")]
    AlreadyEditing,

    #[error("unknown object: {0}")]
    UnknownObject(String),

    #[error("unknown mesh: {0}")]
    UnknownMesh(String),

    #[error("unknown light: {0}")]
    UnknownLight(String),

    #[error("cannot {action} while the session is {state}")]
    InvalidSessionState {
        action: &'static str,
        state: &'static str,
    },

    #[error("renderer failed: {0}")]
    Backend(String),
}

/// Prototype geometry, as handed over to [`Renderer::define_mesh()`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub points: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Vec<UVec3>,

    /// Whether the buffers contain a subdivided surface.
    pub refined: bool,
}

impl MeshBuffers {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn points_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    pub fn normals_flat(&self) -> Option<&[f32]> {
        self.normals
            .as_deref()
            .map(|normals| bytemuck::cast_slice(normals))
    }

    pub fn indices_flat(&self) -> &[u32] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Progressive path tracer whose scene is being kept in sync.
///
/// Scene mutations (meshes, objects, lights and camera) are only allowed
/// between [`Self::begin_edit()`] and [`Self::end_edit()`], and transactions
/// don't nest.
pub trait Renderer {
    fn define_mesh(
        &mut self,
        id: &PrimPath,
        mesh: &MeshBuffers,
    ) -> RendererResult;

    fn is_mesh_defined(&self, id: &PrimPath) -> bool;

    fn delete_mesh(&mut self, id: &PrimPath) -> RendererResult;

    fn create_or_update_object(
        &mut self,
        name: &str,
        shape: &PrimPath,
        material: &str,
    ) -> RendererResult;

    fn set_object_transform(
        &mut self,
        name: &str,
        transform: &Mat4,
    ) -> RendererResult;

    fn delete_object(&mut self, name: &str) -> RendererResult;

    fn create_light(&mut self, id: &str, light: &LightDesc) -> RendererResult;

    fn delete_light(&mut self, id: &str) -> RendererResult;

    fn reset_camera(&mut self, camera: &CameraParams) -> RendererResult;

    fn set_film_size(&mut self, size: UVec2) -> RendererResult;

    fn begin_edit(&mut self) -> RendererResult;

    fn end_edit(&mut self) -> RendererResult;

    fn pause(&mut self) -> RendererResult;

    fn resume(&mut self) -> RendererResult;

    fn stop(&mut self) -> RendererResult;

    fn start(&mut self) -> RendererResult;

    fn has_completed(&self) -> bool;

    /// Copies the current image into `output` as tightly packed RGB floats.
    fn film_output(&self, output: &mut [f32]) -> RendererResult;
}
