
use fxhash::FxHashMap;
use glam::{Mat4, Vec3};
use parking_lot::Mutex;

use crate::{
    DirtyBits, DisplayStyle, LightParams, MeshTopology, PrimKind, PrimPath,
    Primvar, PrimvarDescriptor, SceneDelegate, SubdivTags,
};

#[derive(Clone, Debug)]
pub struct MockMesh {
    pub topology: MeshTopology,
    pub subdiv_tags: SubdivTags,
    pub display_style: DisplayStyle,
    pub points: Vec<Vec3>,
    pub transform: Mat4,
    pub visible: bool,
    pub primvars: Vec<(PrimvarDescriptor, Primvar)>,
    pub material: Option<String>,
}

impl MockMesh {
    pub fn triangle() -> Self {
        Self {
            topology: MeshTopology::new(vec![3], vec![0, 1, 2]),
            subdiv_tags: Default::default(),
            display_style: Default::default(),
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            transform: Mat4::IDENTITY,
            visible: true,
            primvars: Default::default(),
            material: None,
        }
    }

    pub fn quad() -> Self {
        Self {
            topology: MeshTopology::new(vec![4], vec![0, 1, 2, 3]),
            points: vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
            ..Self::triangle()
        }
    }
}

/// In-memory provider that complains about every query of a clean field.
#[derive(Default)]
pub struct MockScene {
    pub meshes: FxHashMap<PrimPath, MockMesh>,
    pub lights: FxHashMap<PrimPath, (Mat4, LightParams)>,
    pub instancers: FxHashMap<PrimPath, Vec<Mat4>>,
    pub dirty: Mutex<FxHashMap<PrimPath, DirtyBits>>,
    pub violations: Mutex<Vec<(PrimPath, DirtyBits)>>,
}

impl MockScene {
    pub fn add_mesh(&mut self, id: &str, mesh: MockMesh) -> PrimPath {
        let id = PrimPath::from(id);

        self.meshes.insert(id.clone(), mesh);
        self.mark(&id, PrimKind::Mesh.initial_dirty_bits());

        id
    }

    pub fn add_light(&mut self, id: &str, transform: Mat4) -> PrimPath {
        let id = PrimPath::from(id);

        self.lights
            .insert(id.clone(), (transform, LightParams::default()));

        self.mark(&id, PrimKind::Light.initial_dirty_bits());

        id
    }

    pub fn mesh_mut(
        &mut self,
        id: &PrimPath,
        bits: DirtyBits,
    ) -> &mut MockMesh {
        self.mark(id, bits);
        self.meshes.get_mut(id).unwrap()
    }

    pub fn mark(&self, id: &PrimPath, bits: DirtyBits) {
        *self
            .dirty
            .lock()
            .entry(id.clone())
            .or_default() |= bits;
    }

    pub fn violations(&self) -> Vec<(PrimPath, DirtyBits)> {
        self.violations.lock().clone()
    }

    fn query(&self, id: &PrimPath, bit: DirtyBits) {
        if !self.dirty_bits(id).contains(bit) {
            self.violations.lock().push((id.clone(), bit));
        }
    }

    fn mesh(&self, id: &PrimPath, bit: DirtyBits) -> &MockMesh {
        self.query(id, bit);
        &self.meshes[id]
    }
}

impl SceneDelegate for MockScene {
    fn dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.dirty
            .lock()
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    fn mark_clean(&self, id: &PrimPath, bits: DirtyBits) {
        if let Some(dirty) = self.dirty.lock().get_mut(id) {
            dirty.remove(bits);
        }
    }

    fn topology(&self, id: &PrimPath) -> MeshTopology {
        self.mesh(id, DirtyBits::TOPOLOGY).topology.clone()
    }

    fn subdiv_tags(&self, id: &PrimPath) -> SubdivTags {
        self.mesh(id, DirtyBits::SUBDIV_TAGS).subdiv_tags.clone()
    }

    fn display_style(&self, id: &PrimPath) -> DisplayStyle {
        self.mesh(id, DirtyBits::DISPLAY_STYLE).display_style
    }

    fn points(&self, id: &PrimPath) -> Vec<Vec3> {
        self.mesh(id, DirtyBits::POINTS).points.clone()
    }

    fn transform(&self, id: &PrimPath) -> Mat4 {
        self.query(id, DirtyBits::TRANSFORM);

        if let Some(mesh) = self.meshes.get(id) {
            mesh.transform
        } else {
            self.lights[id].0
        }
    }

    fn visible(&self, id: &PrimPath) -> bool {
        self.mesh(id, DirtyBits::VISIBILITY).visible
    }

    fn primvar_descriptors(&self, id: &PrimPath) -> Vec<PrimvarDescriptor> {
        self.meshes[id]
            .primvars
            .iter()
            .map(|(descriptor, _)| descriptor.clone())
            .collect()
    }

    fn primvar(&self, id: &PrimPath, name: &str) -> Option<Primvar> {
        self.meshes[id]
            .primvars
            .iter()
            .find(|(descriptor, _)| descriptor.name == name)
            .map(|(_, primvar)| primvar.clone())
    }

    fn material_binding(&self, id: &PrimPath) -> Option<String> {
        self.mesh(id, DirtyBits::MATERIAL_ID).material.clone()
    }

    fn instance_transforms(
        &self,
        instancer: &PrimPath,
        _prototype: &PrimPath,
    ) -> Vec<Mat4> {
        self.instancers.get(instancer).cloned().unwrap_or_default()
    }

    fn light_params(&self, id: &PrimPath) -> LightParams {
        self.query(id, DirtyBits::PARAMS);
        self.lights[id].1
    }
}
