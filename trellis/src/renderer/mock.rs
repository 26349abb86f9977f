use fxhash::{FxHashMap, FxHashSet};
use glam::{Mat4, UVec2};

use crate::{
    CameraParams, LightDesc, MeshBuffers, PrimPath, Renderer, RendererError,
    RendererResult,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    DefineMesh {
        id: String,
        points: usize,
        triangles: usize,
    },
    DeleteMesh(String),
    CreateOrUpdateObject {
        name: String,
        material: String,
    },
    SetObjectTransform {
        name: String,
        transform: Mat4,
    },
    DeleteObject(String),
    CreateLight(String),
    DeleteLight(String),
    ResetCamera,
    SetFilmSize(UVec2),
    BeginEdit,
    EndEdit,
    Pause,
    Resume,
    Stop,
    Start,
}

#[derive(Default)]
pub struct MockRenderer {
    pub calls: Vec<Call>,
    pub meshes: FxHashSet<String>,
    pub objects: FxHashMap<String, Mat4>,
    pub lights: FxHashSet<String>,
    pub editing: bool,
    pub completed: bool,
    pub fail_creating: Option<String>,
}

impl MockRenderer {
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| f(call)).count()
    }

    fn mutate(&mut self, call: Call) -> RendererResult {
        if !self.editing {
            return Err(RendererError::NotEditing);
        }

        self.calls.push(call);

        Ok(())
    }
}

impl Renderer for MockRenderer {
    fn define_mesh(
        &mut self,
        id: &PrimPath,
        mesh: &MeshBuffers,
    ) -> RendererResult {
        self.mutate(Call::DefineMesh {
            id: id.to_string(),
            points: mesh.point_count(),
            triangles: mesh.triangle_count(),
        })?;

        self.meshes.insert(id.to_string());

        Ok(())
    }

    fn is_mesh_defined(&self, id: &PrimPath) -> bool {
        self.meshes.contains(id.as_str())
    }

    fn delete_mesh(&mut self, id: &PrimPath) -> RendererResult {
        self.mutate(Call::DeleteMesh(id.to_string()))?;

        if self.meshes.remove(id.as_str()) {
            Ok(())
        } else {
            Err(RendererError::UnknownMesh(id.to_string()))
        }
    }

    fn create_or_update_object(
        &mut self,
        name: &str,
        _shape: &PrimPath,
        material: &str,
    ) -> RendererResult {
        if self.fail_creating.as_deref() == Some(name) {
            return Err(RendererError::Backend("injected".into()));
        }

        self.mutate(Call::CreateOrUpdateObject {
            name: name.into(),
            material: material.into(),
        })?;

        self.objects.entry(name.into()).or_insert(Mat4::IDENTITY);

        Ok(())
    }

    fn set_object_transform(
        &mut self,
        name: &str,
        transform: &Mat4,
    ) -> RendererResult {
        self.mutate(Call::SetObjectTransform {
            name: name.into(),
            transform: *transform,
        })?;

        let object = self
            .objects
            .get_mut(name)
            .ok_or_else(|| RendererError::UnknownObject(name.into()))?;

        *object = *transform;

        Ok(())
    }

    fn delete_object(&mut self, name: &str) -> RendererResult {
        self.mutate(Call::DeleteObject(name.into()))?;

        self.objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RendererError::UnknownObject(name.into()))
    }

    fn create_light(&mut self, id: &str, _light: &LightDesc) -> RendererResult {
        self.mutate(Call::CreateLight(id.into()))?;
        self.lights.insert(id.into());

        Ok(())
    }

    fn delete_light(&mut self, id: &str) -> RendererResult {
        self.mutate(Call::DeleteLight(id.into()))?;

        if self.lights.remove(id) {
            Ok(())
        } else {
            Err(RendererError::UnknownLight(id.into()))
        }
    }

    fn reset_camera(&mut self, _camera: &CameraParams) -> RendererResult {
        self.mutate(Call::ResetCamera)
    }

    fn set_film_size(&mut self, size: UVec2) -> RendererResult {
        self.calls.push(Call::SetFilmSize(size));

        Ok(())
    }

    fn begin_edit(&mut self) -> RendererResult {
        if self.editing {
            return Err(RendererError::AlreadyEditing);
        }

        self.editing = true;
        self.calls.push(Call::BeginEdit);

        Ok(())
    }

    fn end_edit(&mut self) -> RendererResult {
        if !self.editing {
            return Err(RendererError::NotEditing);
        }

        self.editing = false;
        self.calls.push(Call::EndEdit);

        Ok(())
    }

    fn pause(&mut self) -> RendererResult {
        self.calls.push(Call::Pause);

        Ok(())
    }

    fn resume(&mut self) -> RendererResult {
        self.calls.push(Call::Resume);

        Ok(())
    }

    fn stop(&mut self) -> RendererResult {
        self.calls.push(Call::Stop);

        Ok(())
    }

    fn start(&mut self) -> RendererResult {
        self.calls.push(Call::Start);

        Ok(())
    }

    fn has_completed(&self) -> bool {
        self.completed
    }

    fn film_output(&self, output: &mut [f32]) -> RendererResult {
        output.fill(0.5);

        Ok(())
    }
}
