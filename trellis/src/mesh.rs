use std::mem;

use glam::{Mat4, Vec3};
use log::{debug, info, trace, warn};

use crate::{
    is_valid_transform, smooth_normals, triangulate, CullStyle, DirtyFields,
    DisplayStyle, GeometryError, InstanceDiff, InstanceSet, MeshBuffers,
    MeshTopology, PrimKind, PrimPath, Primvars, Refiner, Renderer,
    RendererError, SceneDelegate, SubdivScheme, SyncConfig, SyncError,
    Triangulation,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshState {
    /// No prototype exists on the renderer's side yet.
    #[default]
    Undefined,

    /// Prototype has been defined; its geometry is never redefined and only
    /// its instances follow further edits.
    Defined,
}

/// What committing a mesh did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshCommit {
    pub defined: bool,
    pub instances: InstanceDiff,
    pub warnings: Vec<SyncError>,
}

/// Cached state of a mesh primitive.
#[derive(Clone, Debug)]
pub struct MeshPrim {
    id: PrimPath,
    instancer: Option<PrimPath>,
    state: MeshState,
    synced: bool,
    pending: bool,

    points: Option<Vec<Vec3>>,
    topology: Option<MeshTopology>,
    transform: Mat4,
    visible: bool,
    cull_style: CullStyle,
    double_sided: bool,
    display_style: DisplayStyle,
    primvars: Primvars,
    material: Option<String>,
    instance_transforms: Vec<Mat4>,
    smooth_normals: Option<Vec<Vec3>>,

    instances: InstanceSet,
}

impl MeshPrim {
    pub fn new(id: PrimPath, instancer: Option<PrimPath>) -> Self {
        Self {
            id,
            instancer,
            state: Default::default(),
            synced: false,
            pending: true,
            points: None,
            topology: None,
            transform: Mat4::IDENTITY,
            visible: true,
            cull_style: Default::default(),
            double_sided: false,
            display_style: Default::default(),
            primvars: Default::default(),
            material: None,
            instance_transforms: Default::default(),
            smooth_normals: None,
            instances: Default::default(),
        }
    }

    pub fn id(&self) -> &PrimPath {
        &self.id
    }

    pub fn instancer(&self) -> Option<&PrimPath> {
        self.instancer.as_ref()
    }

    pub(crate) fn set_instancer(&mut self, instancer: Option<PrimPath>) {
        if self.instancer != instancer {
            self.instancer = instancer;
            self.instance_transforms.clear();
            self.pending = true;
        }
    }

    pub fn state(&self) -> MeshState {
        self.state
    }

    pub fn is_defined(&self) -> bool {
        self.state == MeshState::Defined
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn points(&self) -> Option<&[Vec3]> {
        self.points.as_deref()
    }

    pub fn topology(&self) -> Option<&MeshTopology> {
        self.topology.as_ref()
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cull_style(&self) -> CullStyle {
        self.cull_style
    }

    pub fn is_double_sided(&self) -> bool {
        self.double_sided
    }

    pub fn display_style(&self) -> DisplayStyle {
        self.display_style
    }

    pub fn primvars(&self) -> &Primvars {
        &self.primvars
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    pub fn instance_transforms(&self) -> &[Mat4] {
        &self.instance_transforms
    }

    pub fn instances(&self) -> &InstanceSet {
        &self.instances
    }

    /// Pulls whatever the provider reports as dirty into the cache and
    /// clears the consumed bits.
    pub fn pull<D>(&mut self, delegate: &D) -> Vec<SyncError>
    where
        D: SceneDelegate + ?Sized,
    {
        let id = &self.id;
        let bits = delegate.dirty_bits(id);

        let fields = DirtyFields::interpret(
            !self.synced,
            bits,
            delegate.initial_dirty_bits(PrimKind::Mesh),
        );

        if !fields.any() {
            return Vec::new();
        }

        trace!("Pulling {id}: {bits:?}");

        let mut warnings = Vec::new();

        if self.is_defined() && fields.geometry() {
            debug!(
                "Mesh {id} has been already defined; ignoring its geometry \
                 changes"
            );
        }

        if fields.points {
            self.points = Some(delegate.points(id));
            self.smooth_normals = None;
        }

        if fields.topology {
            // Refine level and subdivision tags come through separate
            // channels and must survive a topology change
            let (refine_level, subdiv_tags) = self
                .topology
                .as_mut()
                .map(|topology| {
                    let tags = mem::take(&mut topology.subdiv_tags);

                    (topology.refine_level, tags)
                })
                .unwrap_or_default();

            let mut topology = delegate.topology(id);

            topology.refine_level = refine_level;
            topology.subdiv_tags = subdiv_tags;

            self.topology = Some(topology);
            self.smooth_normals = None;
        }

        if fields.display_style {
            self.display_style = delegate.display_style(id);

            if let Some(topology) = &mut self.topology {
                topology.refine_level = self.display_style.refine_level;
            }
        }

        if fields.subdiv_tags {
            if let Some(topology) = &mut self.topology {
                if topology.refine_level > 0 {
                    topology.subdiv_tags = delegate.subdiv_tags(id);
                }
            }
        }

        if fields.transform {
            let transform = delegate.transform(id);

            if is_valid_transform(&transform) {
                self.transform = transform;
            } else {
                warn!(
                    "Refusing invalid transform for {id}, keeping the \
                     previous one"
                );

                warnings.push(SyncError::InvalidTransform { prim: id.clone() });
            }
        }

        if fields.visibility {
            self.visible = delegate.visible(id);
        }

        if fields.cull_style {
            self.cull_style = delegate.cull_style(id);
        }

        if fields.double_sided {
            self.double_sided = delegate.double_sided(id);
        }

        if fields.primvars || fields.normals {
            for descriptor in delegate.primvar_descriptors(id) {
                if descriptor.name == Primvars::POINTS {
                    continue;
                }

                if let Some(primvar) = delegate.primvar(id, &descriptor.name) {
                    trace!("Pulled primvar {} for {id}", descriptor.name);

                    self.primvars.insert(descriptor.name, primvar);
                }
            }
        }

        if fields.material {
            self.material = delegate.material_binding(id);
        }

        if fields.instance_index {
            if let Some(instancer) = &self.instancer {
                let transforms = delegate.instance_transforms(instancer, id);

                if transforms.iter().all(is_valid_transform) {
                    self.instance_transforms = transforms;
                } else {
                    warn!(
                        "Refusing invalid instance transforms for {id}, \
                         keeping the previous ones"
                    );

                    warnings
                        .push(SyncError::InvalidTransform { prim: id.clone() });
                }
            }
        }

        self.synced = true;
        self.pending = true;

        delegate.mark_clean(id, bits);

        warnings
    }

    /// Applies cached state to the renderer: defines the prototype (once)
    /// and reconciles its instances.
    ///
    /// Must be called within an edit transaction; a renderer error leaves
    /// the mesh pending, so that it gets retried on the next commit.
    pub fn commit<R>(
        &mut self,
        renderer: &mut R,
        config: &SyncConfig,
    ) -> Result<MeshCommit, RendererError>
    where
        R: Renderer + ?Sized,
    {
        let mut outcome = MeshCommit::default();

        if self.state == MeshState::Undefined {
            if self.points.is_none() || self.topology.is_none() {
                trace!("Mesh {} is still missing points or topology", self.id);

                self.pending = false;
                return Ok(outcome);
            }

            if renderer.is_mesh_defined(&self.id) {
                debug!("Mesh {} is already known to the renderer", self.id);
            } else {
                let buffers = match self.build(config) {
                    Ok((buffers, warnings)) => {
                        outcome.warnings.extend(warnings);
                        buffers
                    }

                    Err(error) => {
                        warn!("Cannot define mesh {}: {error}", self.id);

                        outcome.warnings.push(SyncError::MalformedGeometry {
                            prim: self.id.clone(),
                            error,
                        });

                        self.pending = false;
                        return Ok(outcome);
                    }
                };

                renderer.define_mesh(&self.id, &buffers)?;

                info!(
                    "Defined mesh {} ({} points, {} triangles{})",
                    self.id,
                    buffers.point_count(),
                    buffers.triangle_count(),
                    if buffers.refined { ", refined" } else { "" },
                );

                outcome.defined = true;
            }

            self.state = MeshState::Defined;
        }

        let transforms = self.object_transforms();

        let material = self
            .material
            .as_deref()
            .unwrap_or(&config.default_material);

        outcome.instances = self.instances.reconcile(
            renderer,
            &self.id,
            &transforms,
            self.visible,
            material,
        )?;

        self.pending = false;

        Ok(outcome)
    }

    /// Deletes the prototype together with all of its objects.
    pub fn finalize<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<InstanceDiff, RendererError>
    where
        R: Renderer + ?Sized,
    {
        let diff = self.instances.clear(renderer)?;

        if self.is_defined() {
            renderer.delete_mesh(&self.id)?;
            self.state = MeshState::Undefined;

            info!("Deleted mesh {}", self.id);
        }

        Ok(diff)
    }

    /// Returns world transforms of objects this mesh should be rendered as:
    /// one per instancer's entry, or a single one when not instanced.
    pub fn object_transforms(&self) -> Vec<Mat4> {
        if self.instancer.is_some() {
            self.instance_transforms
                .iter()
                .map(|instance| *instance * self.transform)
                .collect()
        } else {
            vec![self.transform]
        }
    }

    /// Whether the prototype would be defined as a subdivided surface.
    pub fn wants_refinement(&self, config: &SyncConfig) -> bool {
        let Some(topology) = &self.topology else {
            return false;
        };

        config.refinement
            && self.display_style.refined
            && topology.scheme.refines()
            && topology.refine_level > 0
    }

    fn wants_smooth_normals(&self) -> bool {
        let Some(topology) = &self.topology else {
            return false;
        };

        !self.display_style.flat_shading
            && !matches!(
                topology.scheme,
                SubdivScheme::None | SubdivScheme::Bilinear
            )
            && !self.primvars.has_authored_normals()
    }

    fn build(
        &mut self,
        config: &SyncConfig,
    ) -> Result<(MeshBuffers, Vec<SyncError>), GeometryError> {
        let (Some(points), Some(topology)) = (&self.points, &self.topology)
        else {
            return Err(GeometryError::CountMismatch {
                expected: 0,
                actual: 0,
            });
        };

        topology.validate(points.len())?;

        let (triangulation, geometry_warnings) = triangulate(topology)?;

        let mut warnings: Vec<_> = geometry_warnings
            .into_iter()
            .map(|error| SyncError::MalformedGeometry {
                prim: self.id.clone(),
                error,
            })
            .collect();

        let normals = self.normals(&triangulation);

        if self.wants_refinement(config) {
            match self.refine(config, &triangulation, normals.as_deref()) {
                Ok(buffers) => return Ok((buffers, warnings)),

                Err(error) => {
                    warn!(
                        "Cannot refine mesh {}, falling back to its hull: \
                         {error}",
                        self.id
                    );

                    warnings.push(SyncError::MalformedGeometry {
                        prim: self.id.clone(),
                        error,
                    });
                }
            }
        }

        let buffers = MeshBuffers {
            points: self.points.clone().unwrap_or_default(),
            normals,
            indices: triangulation.indices,
            refined: false,
        };

        Ok((buffers, warnings))
    }

    fn refine(
        &self,
        config: &SyncConfig,
        triangulation: &Triangulation,
        normals: Option<&[Vec3]>,
    ) -> Result<MeshBuffers, GeometryError> {
        let (Some(points), Some(topology)) = (&self.points, &self.topology)
        else {
            return Err(GeometryError::CountMismatch {
                expected: 0,
                actual: 0,
            });
        };

        let levels = topology.refine_level.min(config.max_refine_level) + 1;

        let refined = Refiner::new(
            points.len(),
            &triangulation.indices,
            &topology.subdiv_tags,
            levels,
            config.boundary_corner_sharpness,
        )?
        .evaluate(points, normals)?;

        Ok(MeshBuffers {
            points: refined.points,
            normals: refined.normals,
            indices: refined.indices,
            refined: true,
        })
    }

    /// Returns per-vertex normals: authored ones when they match the point
    /// count, otherwise smooth ones when the mesh asks for them.
    fn normals(&mut self, triangulation: &Triangulation) -> Option<Vec<Vec3>> {
        let points = self.points.as_deref()?;

        if let Some(normals) = self.primvars.normals() {
            if normals.len() == points.len() {
                return Some(normals.to_vec());
            }

            debug!(
                "Ignoring authored normals of {}: got {}, expected {}",
                self.id,
                normals.len(),
                points.len()
            );
        }

        if !self.wants_smooth_normals() {
            return None;
        }

        if self.smooth_normals.is_none() {
            self.smooth_normals =
                Some(smooth_normals(points, &triangulation.indices));
        }

        self.smooth_normals.clone()
    }
}
