use std::mem;

use fxhash::FxHashMap;
use glam::{Mat4, Vec3};
use log::{trace, warn};
use parking_lot::{Mutex, RwLock};
use trellis::{
    CullStyle, DirtyBits, DisplayStyle, Engine, LightParams, LightType,
    MeshTopology, PrimKind, PrimPath, Primvar, PrimvarDescriptor,
    SceneDelegate, SubdivTags,
};

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryMesh {
    pub topology: MeshTopology,
    pub subdiv_tags: SubdivTags,
    pub display_style: DisplayStyle,
    pub points: Vec<Vec3>,
    pub transform: Mat4,
    pub visible: bool,
    pub cull_style: CullStyle,
    pub double_sided: bool,
    pub primvars: Vec<(PrimvarDescriptor, Primvar)>,
    pub material: Option<String>,
    pub instancer: Option<PrimPath>,
}

impl MemoryMesh {
    pub fn new(topology: MeshTopology, points: Vec<Vec3>) -> Self {
        Self {
            topology,
            subdiv_tags: Default::default(),
            display_style: Default::default(),
            points,
            transform: Mat4::IDENTITY,
            visible: true,
            cull_style: Default::default(),
            double_sided: false,
            primvars: Default::default(),
            material: None,
            instancer: None,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_display_style(mut self, display_style: DisplayStyle) -> Self {
        self.display_style = display_style;
        self
    }

    pub fn with_subdiv_tags(mut self, subdiv_tags: SubdivTags) -> Self {
        self.subdiv_tags = subdiv_tags;
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_instancer(mut self, instancer: PrimPath) -> Self {
        self.instancer = Some(instancer);
        self
    }

    pub fn with_primvar(
        mut self,
        descriptor: PrimvarDescriptor,
        primvar: Primvar,
    ) -> Self {
        self.primvars.push((descriptor, primvar));
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemoryLight {
    pub light_type: LightType,
    pub transform: Mat4,
    pub params: LightParams,
}

impl MemoryLight {
    pub fn new(light_type: LightType, transform: Mat4) -> Self {
        Self {
            light_type,
            transform,
            params: Default::default(),
        }
    }

    pub fn with_params(mut self, params: LightParams) -> Self {
        self.params = params;
        self
    }
}

/// Primitive insertion or removal that the engine has to be told about.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneChange {
    MeshInserted {
        id: PrimPath,
        instancer: Option<PrimPath>,
    },
    MeshRemoved(PrimPath),
    LightInserted {
        id: PrimPath,
        light_type: LightType,
    },
    LightRemoved(PrimPath),
}

/// Field that's been queried while its dirty bit was clear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractViolation {
    pub prim: PrimPath,
    pub field: DirtyBits,
}

#[derive(Debug, Default)]
struct SceneData {
    meshes: FxHashMap<PrimPath, MemoryMesh>,
    lights: FxHashMap<PrimPath, MemoryLight>,
    instancers: FxHashMap<PrimPath, FxHashMap<PrimPath, Vec<Mat4>>>,
    dirty: FxHashMap<PrimPath, DirtyBits>,
    changes: Vec<SceneChange>,
}

impl SceneData {
    fn mark(&mut self, id: &PrimPath, bits: DirtyBits) {
        *self.dirty.entry(id.clone()).or_default() |= bits;
    }
}

/// Scene provider living entirely in memory.
///
/// Every modification marks the affected fields as dirty, and every query
/// of a clean field gets recorded as a [`ContractViolation`].
#[derive(Debug, Default)]
pub struct MemoryScene {
    data: RwLock<SceneData>,
    violations: Mutex<Vec<ContractViolation>>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mesh(&self, id: impl Into<PrimPath>, mesh: MemoryMesh) {
        let id = id.into();
        let mut data = self.data.write();

        data.changes.push(SceneChange::MeshInserted {
            id: id.clone(),
            instancer: mesh.instancer.clone(),
        });

        data.mark(&id, PrimKind::Mesh.initial_dirty_bits());
        data.meshes.insert(id, mesh);
    }

    /// Modifies a mesh, marking `bits` as dirty.
    pub fn update_mesh(
        &self,
        id: &PrimPath,
        bits: DirtyBits,
        f: impl FnOnce(&mut MemoryMesh),
    ) -> bool {
        let mut data = self.data.write();

        let Some(mesh) = data.meshes.get_mut(id) else {
            warn!("Cannot update unknown mesh {id}");
            return false;
        };

        f(mesh);
        data.mark(id, bits);

        true
    }

    pub fn remove_mesh(&self, id: &PrimPath) -> Option<MemoryMesh> {
        let mut data = self.data.write();
        let mesh = data.meshes.remove(id)?;

        data.dirty.remove(id);
        data.changes.push(SceneChange::MeshRemoved(id.clone()));

        Some(mesh)
    }

    pub fn insert_light(&self, id: impl Into<PrimPath>, light: MemoryLight) {
        let id = id.into();
        let mut data = self.data.write();

        data.changes.push(SceneChange::LightInserted {
            id: id.clone(),
            light_type: light.light_type,
        });

        data.mark(&id, PrimKind::Light.initial_dirty_bits());
        data.lights.insert(id, light);
    }

    pub fn update_light(
        &self,
        id: &PrimPath,
        bits: DirtyBits,
        f: impl FnOnce(&mut MemoryLight),
    ) -> bool {
        let mut data = self.data.write();

        let Some(light) = data.lights.get_mut(id) else {
            warn!("Cannot update unknown light {id}");
            return false;
        };

        f(light);
        data.mark(id, bits);

        true
    }

    pub fn remove_light(&self, id: &PrimPath) -> Option<MemoryLight> {
        let mut data = self.data.write();
        let light = data.lights.remove(id)?;

        data.dirty.remove(id);
        data.changes.push(SceneChange::LightRemoved(id.clone()));

        Some(light)
    }

    /// Sets transforms `instancer` applies to `prototype`, invalidating the
    /// prototype's instances.
    pub fn set_instance_transforms(
        &self,
        instancer: &PrimPath,
        prototype: &PrimPath,
        transforms: Vec<Mat4>,
    ) {
        let mut data = self.data.write();

        data.instancers
            .entry(instancer.clone())
            .or_default()
            .insert(prototype.clone(), transforms);

        data.mark(prototype, DirtyBits::INSTANCE_INDEX);
    }

    pub fn mark_dirty(&self, id: &PrimPath, bits: DirtyBits) {
        self.data.write().mark(id, bits);
    }

    pub fn mesh(&self, id: &PrimPath) -> Option<MemoryMesh> {
        self.data.read().meshes.get(id).cloned()
    }

    pub fn light(&self, id: &PrimPath) -> Option<MemoryLight> {
        self.data.read().lights.get(id).copied()
    }

    /// Returns (and forgets) insertions and removals since the last call.
    pub fn take_changes(&self) -> Vec<SceneChange> {
        mem::take(&mut self.data.write().changes)
    }

    /// Registers inserted and removed primitives with `engine`.
    pub fn apply_changes(&self, engine: &mut Engine) {
        for change in self.take_changes() {
            trace!("Applying {change:?}");

            match change {
                SceneChange::MeshInserted { id, instancer } => {
                    engine.insert_mesh(id, instancer);
                }
                SceneChange::MeshRemoved(id) => {
                    engine.remove_mesh(&id);
                }
                SceneChange::LightInserted { id, light_type } => {
                    engine.insert_light(id, light_type);
                }
                SceneChange::LightRemoved(id) => {
                    engine.remove_light(&id);
                }
            }
        }
    }

    pub fn violations(&self) -> Vec<ContractViolation> {
        self.violations.lock().clone()
    }

    /// Runs `f` on the data of given primitive, recording a violation if
    /// none of `bits` is dirty.
    fn query<T>(
        &self,
        id: &PrimPath,
        bits: DirtyBits,
        f: impl FnOnce(&SceneData) -> Option<T>,
    ) -> Option<T> {
        let data = self.data.read();
        let dirty = data.dirty.get(id).copied().unwrap_or_default();

        if !dirty.intersects(bits) {
            warn!("{id} has been queried for clean {bits:?}");

            self.violations.lock().push(ContractViolation {
                prim: id.clone(),
                field: bits,
            });
        }

        f(&data)
    }

    fn query_mesh<T>(
        &self,
        id: &PrimPath,
        bits: DirtyBits,
        f: impl FnOnce(&MemoryMesh) -> T,
    ) -> Option<T> {
        self.query(id, bits, |data| data.meshes.get(id).map(f))
    }
}

impl SceneDelegate for MemoryScene {
    fn dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.data
            .read()
            .dirty
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    fn mark_clean(&self, id: &PrimPath, bits: DirtyBits) {
        if let Some(dirty) = self.data.write().dirty.get_mut(id) {
            dirty.remove(bits);
        }
    }

    fn topology(&self, id: &PrimPath) -> MeshTopology {
        self.query_mesh(id, DirtyBits::TOPOLOGY, |mesh| mesh.topology.clone())
            .unwrap_or_default()
    }

    fn subdiv_tags(&self, id: &PrimPath) -> SubdivTags {
        self.query_mesh(id, DirtyBits::SUBDIV_TAGS, |mesh| {
            mesh.subdiv_tags.clone()
        })
        .unwrap_or_default()
    }

    fn display_style(&self, id: &PrimPath) -> DisplayStyle {
        self.query_mesh(id, DirtyBits::DISPLAY_STYLE, |mesh| mesh.display_style)
            .unwrap_or_default()
    }

    fn points(&self, id: &PrimPath) -> Vec<Vec3> {
        self.query_mesh(id, DirtyBits::POINTS, |mesh| mesh.points.clone())
            .unwrap_or_default()
    }

    fn transform(&self, id: &PrimPath) -> Mat4 {
        self.query(id, DirtyBits::TRANSFORM, |data| {
            data.meshes
                .get(id)
                .map(|mesh| mesh.transform)
                .or_else(|| data.lights.get(id).map(|light| light.transform))
        })
        .unwrap_or(Mat4::IDENTITY)
    }

    fn visible(&self, id: &PrimPath) -> bool {
        self.query_mesh(id, DirtyBits::VISIBILITY, |mesh| mesh.visible)
            .unwrap_or(false)
    }

    fn cull_style(&self, id: &PrimPath) -> CullStyle {
        self.query_mesh(id, DirtyBits::CULL_STYLE, |mesh| mesh.cull_style)
            .unwrap_or_default()
    }

    fn double_sided(&self, id: &PrimPath) -> bool {
        self.query_mesh(id, DirtyBits::DOUBLE_SIDED, |mesh| mesh.double_sided)
            .unwrap_or(false)
    }

    fn primvar_descriptors(&self, id: &PrimPath) -> Vec<PrimvarDescriptor> {
        self.query_mesh(id, DirtyBits::PRIMVAR | DirtyBits::NORMALS, |mesh| {
            mesh.primvars
                .iter()
                .map(|(descriptor, _)| descriptor.clone())
                .collect()
        })
        .unwrap_or_default()
    }

    fn primvar(&self, id: &PrimPath, name: &str) -> Option<Primvar> {
        self.query_mesh(id, DirtyBits::PRIMVAR | DirtyBits::NORMALS, |mesh| {
            mesh.primvars
                .iter()
                .find(|(descriptor, _)| descriptor.name == name)
                .map(|(_, primvar)| primvar.clone())
        })
        .flatten()
    }

    fn material_binding(&self, id: &PrimPath) -> Option<String> {
        self.query_mesh(id, DirtyBits::MATERIAL_ID, |mesh| {
            mesh.material.clone()
        })
        .flatten()
    }

    fn instance_transforms(
        &self,
        instancer: &PrimPath,
        prototype: &PrimPath,
    ) -> Vec<Mat4> {
        self.data
            .read()
            .instancers
            .get(instancer)
            .and_then(|prototypes| prototypes.get(prototype))
            .cloned()
            .unwrap_or_default()
    }

    fn light_params(&self, id: &PrimPath) -> LightParams {
        self.query(id, DirtyBits::PARAMS, |data| {
            data.lights.get(id).map(|light| light.params)
        })
        .unwrap_or_default()
    }
}
