use glam::{Mat4, UVec2};
use log::{debug, info, warn};

use crate::utils::{is_invertible, metric};
use crate::{
    AovBinding, Engine, InstanceDiff, PassState, PrimPath, Renderer,
    RendererResult, SceneDelegate, SyncError,
};

/// Path reported for camera matrices that can't be used.
const CAMERA: &str = "/camera";

/// What a single frame did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,

    /// Recoverable problems encountered during the frame; each one has been
    /// already logged.
    pub warnings: Vec<SyncError>,

    pub meshes_defined: usize,
    pub meshes_deleted: usize,
    pub instances: InstanceDiff,
    pub lights_created: usize,
    pub lights_deleted: usize,
    pub camera_reset: bool,
    pub film_resized: bool,
    pub converged: bool,
}

impl FrameReport {
    /// Whether the renderer's scene got modified during the frame.
    pub fn mutated(&self) -> bool {
        self.meshes_defined > 0
            || self.meshes_deleted > 0
            || !self.instances.is_empty()
            || self.lights_created > 0
            || self.lights_deleted > 0
    }
}

/// Sequences renderer mutations of each frame relative to the renderer's
/// own sampling loop, and tracks convergence.
#[derive(Debug, Default)]
pub struct RenderPass {
    frame: u64,
    viewport: UVec2,
    camera: Option<(Mat4, Mat4)>,
    converged: bool,
    aovs: Vec<AovBinding>,
    film: Vec<f32>,
}

impl RenderPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames executed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    /// Whether the renderer has reported completion since the last camera
    /// or scene change.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn set_aov_bindings(&mut self, aovs: Vec<AovBinding>) {
        self.aovs = aovs;
    }

    pub fn aov_bindings(&self) -> &[AovBinding] {
        &self.aovs
    }

    /// Pushes the default camera and light in a single transaction, and
    /// starts the renderer's session.
    pub fn bootstrap<R>(
        &mut self,
        engine: &mut Engine,
        renderer: &mut R,
    ) -> Result<(), SyncError>
    where
        R: Renderer + ?Sized,
    {
        let mut edit = EditTransaction::begin(renderer)?;

        engine.bootstrap(edit.renderer())?;
        edit.end()?;

        renderer.start()?;

        Ok(())
    }

    /// Pulls dirty state from `delegate` and executes a frame.
    pub fn run<D, R>(
        &mut self,
        engine: &mut Engine,
        delegate: &D,
        renderer: &mut R,
        state: &PassState,
    ) -> Result<FrameReport, SyncError>
    where
        D: SceneDelegate + Sync + ?Sized,
        R: Renderer + ?Sized,
    {
        let mut warnings = engine.sync(delegate);
        let mut report = self.execute(engine, renderer, state)?;

        warnings.append(&mut report.warnings);
        report.warnings = warnings;

        Ok(report)
    }

    /// Executes a frame: adjusts the film and the camera if needed, commits
    /// whatever `engine` has pulled so far and polls for convergence.
    ///
    /// A renderer error aborts the frame, but only after the edit
    /// transaction has been closed and the session resumed.
    pub fn execute<R>(
        &mut self,
        engine: &mut Engine,
        renderer: &mut R,
        state: &PassState,
    ) -> Result<FrameReport, SyncError>
    where
        R: Renderer + ?Sized,
    {
        let _metric = metric("execute");

        self.frame += 1;

        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        if state.viewport != self.viewport {
            info!(
                "Resizing film: {}x{} -> {}x{}",
                self.viewport.x,
                self.viewport.y,
                state.viewport.x,
                state.viewport.y
            );

            let mut session = SuspendedSession::pause(renderer)?;

            session.renderer().set_film_size(state.viewport)?;
            session.release()?;

            self.viewport = state.viewport;
            report.film_resized = true;
        }

        let matrices = state.inverse_matrices();

        if !is_invertible(&state.view) || !is_invertible(&state.projection) {
            warn!("Camera matrices are degenerate; keeping previous camera");

            report.warnings.push(SyncError::InvalidTransform {
                prim: PrimPath::new(CAMERA),
            });
        } else if self.camera != Some(matrices) {
            let camera = state.camera();

            info!("Resetting camera: {}", camera.describe());

            self.converged = false;

            let mut session = SuspendedSession::stop(renderer)?;
            let mut edit = EditTransaction::begin(session.renderer())?;

            edit.renderer().reset_camera(&camera)?;
            edit.end()?;
            session.release()?;

            self.camera = Some(matrices);
            report.camera_reset = true;
        }

        let committed = {
            let mut session = SuspendedSession::pause(renderer)?;
            let mut edit = EditTransaction::begin(session.renderer())?;
            let committed = engine.commit(edit.renderer(), &mut report);
            let ended = edit.end();
            let resumed = session.release();

            committed.and(ended).and(resumed)
        };

        if report.mutated() && self.converged {
            debug!("Scene has changed; convergence reset");
        }

        if report.mutated() {
            self.converged = false;
        }

        committed?;

        if !self.converged && renderer.has_completed() {
            info!("Rendering has converged (frame {})", self.frame);

            self.converged = true;
        }

        report.converged = self.converged;

        self.write_aovs(renderer, &mut report)?;

        Ok(report)
    }

    fn write_aovs<R>(
        &mut self,
        renderer: &mut R,
        report: &mut FrameReport,
    ) -> Result<(), SyncError>
    where
        R: Renderer + ?Sized,
    {
        let mut film_ready = false;

        for aov in &mut self.aovs {
            if let Err(err) = aov.validate(self.viewport) {
                warn!("Skipping AOV: {err}");

                report.warnings.push(err);
                continue;
            }

            if !aov.name.is_produced() {
                continue;
            }

            if !film_ready {
                let len = (self.viewport.x * self.viewport.y) as usize * 3;

                self.film.resize(len, 0.0);
                renderer.film_output(&mut self.film)?;

                film_ready = true;
            }

            aov.write_color(&self.film);
        }

        Ok(())
    }
}

/// Edit transaction that gets closed once dropped, so that bailing out of a
/// batch never leaves the renderer in the editing state.
struct EditTransaction<'a, R>
where
    R: Renderer + ?Sized,
{
    renderer: &'a mut R,
    open: bool,
}

impl<'a, R> EditTransaction<'a, R>
where
    R: Renderer + ?Sized,
{
    fn begin(renderer: &'a mut R) -> RendererResult<Self> {
        renderer.begin_edit()?;

        Ok(Self {
            renderer,
            open: true,
        })
    }

    fn renderer(&mut self) -> &mut R {
        &mut *self.renderer
    }

    fn end(mut self) -> RendererResult {
        self.open = false;
        self.renderer.end_edit()
    }
}

impl<R> Drop for EditTransaction<'_, R>
where
    R: Renderer + ?Sized,
{
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.renderer.end_edit() {
                warn!("Couldn't close edit transaction: {err}");
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Suspension {
    Paused,
    Stopped,
}

/// Paused or stopped renderer session that gets resumed (or restarted)
/// once dropped.
struct SuspendedSession<'a, R>
where
    R: Renderer + ?Sized,
{
    renderer: &'a mut R,
    suspension: Option<Suspension>,
}

impl<'a, R> SuspendedSession<'a, R>
where
    R: Renderer + ?Sized,
{
    fn pause(renderer: &'a mut R) -> RendererResult<Self> {
        renderer.pause()?;

        Ok(Self {
            renderer,
            suspension: Some(Suspension::Paused),
        })
    }

    fn stop(renderer: &'a mut R) -> RendererResult<Self> {
        renderer.stop()?;

        Ok(Self {
            renderer,
            suspension: Some(Suspension::Stopped),
        })
    }

    fn renderer(&mut self) -> &mut R {
        &mut *self.renderer
    }

    fn release(mut self) -> RendererResult {
        self.restore()
    }

    fn restore(&mut self) -> RendererResult {
        match self.suspension.take() {
            Some(Suspension::Paused) => self.renderer.resume(),
            Some(Suspension::Stopped) => self.renderer.start(),
            None => Ok(()),
        }
    }
}

impl<R> Drop for SuspendedSession<'_, R>
where
    R: Renderer + ?Sized,
{
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!("Couldn't restore renderer session: {err}");
        }
    }
}
