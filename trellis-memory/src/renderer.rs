use fxhash::FxHashMap;
use glam::{Mat4, UVec2};
use log::{debug, trace};
use trellis::{
    CameraParams, LightDesc, MeshBuffers, PrimPath, Renderer, RendererError,
    RendererResult,
};

#[derive(Clone, Debug, PartialEq)]
pub enum RendererCall {
    DefineMesh {
        id: String,
        points: usize,
        triangles: usize,
        normals: bool,
        refined: bool,
    },
    DeleteMesh(String),
    CreateOrUpdateObject {
        name: String,
        shape: String,
        material: String,
    },
    SetObjectTransform {
        name: String,
        transform: Mat4,
    },
    DeleteObject(String),
    CreateLight {
        id: String,
        light: LightDesc,
    },
    DeleteLight(String),
    ResetCamera(CameraParams),
    SetFilmSize(UVec2),
    BeginEdit,
    EndEdit,
    Pause,
    Resume,
    Stop,
    Start,
}

impl RendererCall {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::DefineMesh { .. } => CallKind::DefineMesh,
            Self::DeleteMesh(_) => CallKind::DeleteMesh,
            Self::CreateOrUpdateObject { .. } => CallKind::CreateOrUpdateObject,
            Self::SetObjectTransform { .. } => CallKind::SetObjectTransform,
            Self::DeleteObject(_) => CallKind::DeleteObject,
            Self::CreateLight { .. } => CallKind::CreateLight,
            Self::DeleteLight(_) => CallKind::DeleteLight,
            Self::ResetCamera(_) => CallKind::ResetCamera,
            Self::SetFilmSize(_) => CallKind::SetFilmSize,
            Self::BeginEdit => CallKind::BeginEdit,
            Self::EndEdit => CallKind::EndEdit,
            Self::Pause => CallKind::Pause,
            Self::Resume => CallKind::Resume,
            Self::Stop => CallKind::Stop,
            Self::Start => CallKind::Start,
        }
    }

    /// Whether this call modifies the renderer's scene (as opposed to its
    /// session).
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.kind(),
            CallKind::DefineMesh
                | CallKind::DeleteMesh
                | CallKind::CreateOrUpdateObject
                | CallKind::SetObjectTransform
                | CallKind::DeleteObject
                | CallKind::CreateLight
                | CallKind::DeleteLight
                | CallKind::ResetCamera
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    DefineMesh,
    DeleteMesh,
    CreateOrUpdateObject,
    SetObjectTransform,
    DeleteObject,
    CreateLight,
    DeleteLight,
    ResetCamera,
    SetFilmSize,
    BeginEdit,
    EndEdit,
    Pause,
    Resume,
    Stop,
    Start,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl SessionState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedObject {
    pub shape: String,
    pub material: String,
    pub transform: Mat4,
}

/// Renderer that keeps its scene in plain maps, records every call and
/// simulates progressive sampling.
///
/// Enforces the protocol real renderers expect: scene mutations happen only
/// within an edit transaction, transactions don't nest and are never opened
/// while the session is running.
#[derive(Debug)]
pub struct RecordingRenderer {
    calls: Vec<RendererCall>,
    meshes: FxHashMap<String, MeshBuffers>,
    objects: FxHashMap<String, RecordedObject>,
    lights: FxHashMap<String, LightDesc>,
    camera: Option<CameraParams>,
    film_size: UVec2,
    editing: bool,
    session: SessionState,
    samples: u32,
    samples_to_converge: u32,
    faults: Vec<(CallKind, usize)>,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new(16)
    }
}

impl RecordingRenderer {
    /// Creates a renderer that reports completion after accumulating given
    /// number of samples.
    pub fn new(samples_to_converge: u32) -> Self {
        Self {
            calls: Default::default(),
            meshes: Default::default(),
            objects: Default::default(),
            lights: Default::default(),
            camera: None,
            film_size: UVec2::ZERO,
            editing: false,
            session: SessionState::Stopped,
            samples: 0,
            samples_to_converge,
            faults: Default::default(),
        }
    }

    pub fn calls(&self) -> &[RendererCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<RendererCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.iter().filter(|call| call.kind() == kind).count()
    }

    pub fn mesh(&self, id: &str) -> Option<&MeshBuffers> {
        self.meshes.get(id)
    }

    pub fn meshes(&self) -> &FxHashMap<String, MeshBuffers> {
        &self.meshes
    }

    pub fn object(&self, name: &str) -> Option<&RecordedObject> {
        self.objects.get(name)
    }

    pub fn objects(&self) -> &FxHashMap<String, RecordedObject> {
        &self.objects
    }

    pub fn lights(&self) -> &FxHashMap<String, LightDesc> {
        &self.lights
    }

    pub fn camera(&self) -> Option<&CameraParams> {
        self.camera.as_ref()
    }

    pub fn film_size(&self) -> UVec2 {
        self.film_size
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Makes the `nth` (counting from 1) upcoming call of given kind fail.
    pub fn fail_on(&mut self, kind: CallKind, nth: usize) {
        self.faults.push((kind, nth.max(1)));
    }

    /// Simulates the sampling loop running for a while; samples accumulate
    /// only while the session is running.
    pub fn advance(&mut self, samples: u32) {
        if self.session == SessionState::Running {
            self.samples = self.samples.saturating_add(samples);
        }
    }

    fn inject(&mut self, kind: CallKind) -> RendererResult {
        let mut failed = false;

        for (fault_kind, remaining) in &mut self.faults {
            if *fault_kind == kind {
                *remaining -= 1;

                if *remaining == 0 {
                    failed = true;
                }
            }
        }

        self.faults.retain(|(_, remaining)| *remaining > 0);

        if failed {
            debug!("Injecting failure into {kind:?}");

            Err(RendererError::Backend(format!("injected {kind:?} failure")))
        } else {
            Ok(())
        }
    }

    fn mutate(&mut self, call: RendererCall) -> RendererResult {
        self.inject(call.kind())?;

        if !self.editing {
            return Err(RendererError::NotEditing);
        }

        trace!("{call:?}");

        self.calls.push(call);
        self.samples = 0;

        Ok(())
    }

    fn transition(
        &mut self,
        call: RendererCall,
        from: &[SessionState],
        to: SessionState,
    ) -> RendererResult {
        self.inject(call.kind())?;

        if !from.contains(&self.session) {
            return Err(RendererError::InvalidSessionState {
                action: match call.kind() {
                    CallKind::Pause => "pause",
                    CallKind::Resume => "resume",
                    CallKind::Stop => "stop",
                    _ => "start",
                },
                state: self.session.describe(),
            });
        }

        // Pausing or resuming a stopped session doesn't bring it to life
        let applies = match call.kind() {
            CallKind::Pause | CallKind::Resume => {
                self.session != SessionState::Stopped
            }
            _ => true,
        };

        if applies {
            self.session = to;
        }

        self.calls.push(call);

        Ok(())
    }
}

impl Renderer for RecordingRenderer {
    fn define_mesh(
        &mut self,
        id: &PrimPath,
        mesh: &MeshBuffers,
    ) -> RendererResult {
        if let Some(index) = mesh
            .indices_flat()
            .iter()
            .find(|&&index| index as usize >= mesh.point_count())
        {
            return Err(RendererError::Backend(format!(
                "mesh {id} refers to vertex {index}, but has only {} points",
                mesh.point_count()
            )));
        }

        self.mutate(RendererCall::DefineMesh {
            id: id.to_string(),
            points: mesh.point_count(),
            triangles: mesh.triangle_count(),
            normals: mesh.normals.is_some(),
            refined: mesh.refined,
        })?;

        self.meshes.insert(id.to_string(), mesh.clone());

        Ok(())
    }

    fn is_mesh_defined(&self, id: &PrimPath) -> bool {
        self.meshes.contains_key(id.as_str())
    }

    fn delete_mesh(&mut self, id: &PrimPath) -> RendererResult {
        if !self.meshes.contains_key(id.as_str()) {
            return Err(RendererError::UnknownMesh(id.to_string()));
        }

        self.mutate(RendererCall::DeleteMesh(id.to_string()))?;
        self.meshes.remove(id.as_str());

        Ok(())
    }

    fn create_or_update_object(
        &mut self,
        name: &str,
        shape: &PrimPath,
        material: &str,
    ) -> RendererResult {
        if !self.meshes.contains_key(shape.as_str()) {
            return Err(RendererError::UnknownMesh(shape.to_string()));
        }

        self.mutate(RendererCall::CreateOrUpdateObject {
            name: name.into(),
            shape: shape.to_string(),
            material: material.into(),
        })?;

        self.objects
            .entry(name.into())
            .and_modify(|object| {
                object.shape = shape.to_string();
                object.material = material.into();
            })
            .or_insert_with(|| RecordedObject {
                shape: shape.to_string(),
                material: material.into(),
                transform: Mat4::IDENTITY,
            });

        Ok(())
    }

    fn set_object_transform(
        &mut self,
        name: &str,
        transform: &Mat4,
    ) -> RendererResult {
        if !self.objects.contains_key(name) {
            return Err(RendererError::UnknownObject(name.into()));
        }

        self.mutate(RendererCall::SetObjectTransform {
            name: name.into(),
            transform: *transform,
        })?;

        if let Some(object) = self.objects.get_mut(name) {
            object.transform = *transform;
        }

        Ok(())
    }

    fn delete_object(&mut self, name: &str) -> RendererResult {
        if !self.objects.contains_key(name) {
            return Err(RendererError::UnknownObject(name.into()));
        }

        self.mutate(RendererCall::DeleteObject(name.into()))?;
        self.objects.remove(name);

        Ok(())
    }

    fn create_light(&mut self, id: &str, light: &LightDesc) -> RendererResult {
        self.mutate(RendererCall::CreateLight {
            id: id.into(),
            light: *light,
        })?;

        self.lights.insert(id.into(), *light);

        Ok(())
    }

    fn delete_light(&mut self, id: &str) -> RendererResult {
        if !self.lights.contains_key(id) {
            return Err(RendererError::UnknownLight(id.into()));
        }

        self.mutate(RendererCall::DeleteLight(id.into()))?;
        self.lights.remove(id);

        Ok(())
    }

    fn reset_camera(&mut self, camera: &CameraParams) -> RendererResult {
        self.mutate(RendererCall::ResetCamera(*camera))?;
        self.camera = Some(*camera);

        Ok(())
    }

    fn set_film_size(&mut self, size: UVec2) -> RendererResult {
        self.inject(CallKind::SetFilmSize)?;

        if self.session == SessionState::Running {
            return Err(RendererError::InvalidSessionState {
                action: "resize film",
                state: self.session.describe(),
            });
        }

        self.calls.push(RendererCall::SetFilmSize(size));
        self.film_size = size;
        self.samples = 0;

        Ok(())
    }

    fn begin_edit(&mut self) -> RendererResult {
        self.inject(CallKind::BeginEdit)?;

        if self.editing {
            return Err(RendererError::AlreadyEditing);
        }

        if self.session == SessionState::Running {
            return Err(RendererError::InvalidSessionState {
                action: "edit",
                state: self.session.describe(),
            });
        }

        self.calls.push(RendererCall::BeginEdit);
        self.editing = true;

        Ok(())
    }

    fn end_edit(&mut self) -> RendererResult {
        if !self.editing {
            return Err(RendererError::NotEditing);
        }

        self.calls.push(RendererCall::EndEdit);
        self.editing = false;

        Ok(())
    }

    fn pause(&mut self) -> RendererResult {
        self.transition(
            RendererCall::Pause,
            &[SessionState::Running, SessionState::Stopped],
            SessionState::Paused,
        )
    }

    fn resume(&mut self) -> RendererResult {
        self.transition(
            RendererCall::Resume,
            &[SessionState::Paused, SessionState::Stopped],
            SessionState::Running,
        )
    }

    fn stop(&mut self) -> RendererResult {
        self.transition(
            RendererCall::Stop,
            &[
                SessionState::Running,
                SessionState::Paused,
                SessionState::Stopped,
            ],
            SessionState::Stopped,
        )
    }

    fn start(&mut self) -> RendererResult {
        self.transition(
            RendererCall::Start,
            &[SessionState::Stopped],
            SessionState::Running,
        )
    }

    fn has_completed(&self) -> bool {
        self.samples >= self.samples_to_converge
    }

    fn film_output(&self, output: &mut [f32]) -> RendererResult {
        let expected = (self.film_size.x * self.film_size.y) as usize * 3;

        if output.len() != expected {
            return Err(RendererError::Backend(format!(
                "film is {}x{}, but got buffer for {} floats",
                self.film_size.x,
                self.film_size.y,
                output.len()
            )));
        }

        let progress = if self.samples_to_converge == 0 {
            1.0
        } else {
            (self.samples as f32 / self.samples_to_converge as f32).min(1.0)
        };

        output.fill(progress);

        Ok(())
    }
}
