use std::{panic, thread};

use fxhash::FxHashMap;
use log::{debug, info, trace};

use crate::utils::metric;
use crate::{
    FrameReport, LightPrim, LightType, Lights, MeshPrim, PrimPath, Renderer,
    RendererError, SceneDelegate, SyncConfig, SyncError,
};

/// Owns cached primitive state and keeps it in sync with both sides: the
/// scene provider (through [`Self::sync()`]) and the renderer (through
/// [`Self::commit()`]).
#[derive(Debug, Default)]
pub struct Engine {
    config: SyncConfig,
    meshes: FxHashMap<PrimPath, MeshPrim>,
    removed_meshes: Vec<MeshPrim>,
    lights: Lights,
}

impl Engine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Starts tracking a mesh; `instancer` names the primitive whose
    /// instance transforms this mesh gets rendered with.
    pub fn insert_mesh(&mut self, id: PrimPath, instancer: Option<PrimPath>) {
        if let Some(mesh) = self.meshes.get_mut(&id) {
            debug!("Mesh {id} is already known; updating its instancer");

            mesh.set_instancer(instancer);
            return;
        }

        trace!("Inserting mesh {id}");

        self.meshes.insert(id.clone(), MeshPrim::new(id, instancer));
    }

    /// Stops tracking a mesh; its renderer-side counterparts get deleted on
    /// the next commit.
    pub fn remove_mesh(&mut self, id: &PrimPath) -> bool {
        let Some(mesh) = self.meshes.remove(id) else {
            return false;
        };

        trace!("Removing mesh {id}");

        if mesh.is_defined() || mesh.instances().rendered() > 0 {
            self.removed_meshes.push(mesh);
        }

        true
    }

    pub fn insert_light(&mut self, id: PrimPath, light_type: LightType) {
        trace!("Inserting light {id}");

        self.lights.insert(id, light_type);
    }

    pub fn remove_light(&mut self, id: &PrimPath) -> bool {
        trace!("Removing light {id}");

        self.lights.remove(id)
    }

    pub fn mesh(&self, id: &PrimPath) -> Option<&MeshPrim> {
        self.meshes.get(id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshPrim> + '_ {
        self.meshes.values()
    }

    pub fn light(&self, id: &PrimPath) -> Option<&LightPrim> {
        self.lights.get(id)
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    /// Pulls dirty state of every primitive from `delegate`.
    ///
    /// Meshes are pulled on up to [`SyncConfig::sync_threads`] threads, each
    /// primitive being touched by exactly one of them; the outcome doesn't
    /// depend on the number of threads.
    pub fn sync<D>(&mut self, delegate: &D) -> Vec<SyncError>
    where
        D: SceneDelegate + Sync + ?Sized,
    {
        let _metric = metric("sync");

        let mut meshes: Vec<_> = self.meshes.values_mut().collect();

        meshes.sort_by(|a, b| a.id().cmp(b.id()));

        let threads = self.config.sync_threads.clamp(1, meshes.len().max(1));
        let mut warnings = Vec::new();

        if threads == 1 {
            for mesh in meshes {
                warnings.extend(mesh.pull(delegate));
            }
        } else {
            let chunk_size = (meshes.len() + threads - 1) / threads;

            thread::scope(|scope| {
                let handles: Vec<_> = meshes
                    .chunks_mut(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move || {
                            chunk
                                .iter_mut()
                                .flat_map(|mesh| mesh.pull(delegate))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                for handle in handles {
                    match handle.join() {
                        Ok(chunk_warnings) => warnings.extend(chunk_warnings),
                        Err(payload) => panic::resume_unwind(payload),
                    }
                }
            });
        }

        warnings.extend(self.lights.sync(delegate));
        warnings
    }

    /// Applies everything pulled so far to the renderer; must be called
    /// within an edit transaction.
    ///
    /// Mutations happen in a fixed order: removals first, then meshes and
    /// their instances (sorted by path), then lights. A renderer error stops
    /// the commit, leaving whatever didn't get applied pending for the next
    /// one.
    pub fn commit<R>(
        &mut self,
        renderer: &mut R,
        report: &mut FrameReport,
    ) -> Result<(), RendererError>
    where
        R: Renderer + ?Sized,
    {
        let _metric = metric("commit");

        while let Some(mesh) = self.removed_meshes.last_mut() {
            report.instances += mesh.finalize(renderer)?;
            report.meshes_deleted += 1;

            self.removed_meshes.pop();
        }

        let mut pending: Vec<_> = self
            .meshes
            .values_mut()
            .filter(|mesh| mesh.is_pending())
            .collect();

        pending.sort_by(|a, b| a.id().cmp(b.id()));

        for mesh in pending {
            let outcome = mesh.commit(renderer, &self.config)?;

            if outcome.defined {
                report.meshes_defined += 1;
            }

            report.instances += outcome.instances;
            report.warnings.extend(outcome.warnings);
        }

        self.lights.commit(renderer, &self.config, report)?;

        if report.mutated() {
            info!(
                "Committed: {} mesh(es) defined, {} deleted; objects: {:?}; \
                 lights: {} created, {} deleted",
                report.meshes_defined,
                report.meshes_deleted,
                report.instances,
                report.lights_created,
                report.lights_deleted,
            );
        }

        Ok(())
    }

    /// Pushes the initial state every renderer session needs: the default
    /// camera and the default light.
    pub fn bootstrap<R>(
        &mut self,
        renderer: &mut R,
    ) -> Result<(), RendererError>
    where
        R: Renderer + ?Sized,
    {
        info!("Bootstrapping camera: {}", self.config.camera.describe());

        renderer.reset_camera(&self.config.camera)?;
        self.lights.bootstrap(renderer, &self.config)
    }
}
