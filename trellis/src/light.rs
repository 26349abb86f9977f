use derivative::Derivative;
use glam::{Mat4, Vec3};
use log::{debug, trace, warn};

use crate::{
    is_valid_transform, DirtyFields, PrimKind, PrimPath, SceneDelegate,
    SyncError,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightType {
    #[default]
    Sphere,
    Disk,
    Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Derivative)]
#[derivative(Default)]
pub struct LightParams {
    #[derivative(Default(value = "Vec3::ONE"))]
    pub color: Vec3,

    #[derivative(Default(value = "1.0"))]
    pub intensity: f32,

    pub exposure: f32,

    pub treat_as_point: bool,

    #[derivative(Default(value = "0.5"))]
    pub radius: f32,
}

impl LightParams {
    /// Returns the linear color the renderer should emit,
    /// `color * intensity * 2^exposure`.
    pub fn emission(&self) -> Vec3 {
        self.color * self.intensity * self.exposure.exp2()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Point,
    Sphere { radius: f32 },
}

/// Light as handed over to the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightDesc {
    pub kind: LightKind,
    pub color: Vec3,
    pub position: Vec3,
}

impl LightDesc {
    pub fn describe(&self) -> String {
        format!(
            "kind={:?}, color={}, position={}",
            self.kind, self.color, self.position
        )
    }
}

/// Renderer-side state of a scene entity that is created once and never
/// updated afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Commit {
    #[default]
    Uncommitted,
    Committed,
}

/// Cached state of a light primitive.
///
/// Lights are committed to the renderer once; edits pulled afterwards only
/// update the cache and are not re-applied to the renderer-side light.
#[derive(Clone, Debug)]
pub struct LightPrim {
    id: PrimPath,
    light_type: LightType,
    transform: Mat4,
    params: LightParams,
    commit: Commit,
    synced: bool,
}

impl LightPrim {
    pub fn new(id: PrimPath, light_type: LightType) -> Self {
        Self {
            id,
            light_type,
            transform: Mat4::IDENTITY,
            params: Default::default(),
            commit: Commit::Uncommitted,
            synced: false,
        }
    }

    pub fn id(&self) -> &PrimPath {
        &self.id
    }

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn params(&self) -> &LightParams {
        &self.params
    }

    pub fn commit_state(&self) -> Commit {
        self.commit
    }

    pub fn is_committed(&self) -> bool {
        self.commit == Commit::Committed
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub(crate) fn mark_committed(&mut self) {
        self.commit = Commit::Committed;
    }

    pub fn pull<D>(&mut self, delegate: &D) -> Vec<SyncError>
    where
        D: SceneDelegate + ?Sized,
    {
        let bits = delegate.dirty_bits(&self.id);

        let fields = DirtyFields::interpret(
            !self.synced,
            bits,
            delegate.initial_dirty_bits(PrimKind::Light),
        );

        let mut warnings = Vec::new();

        if fields.transform {
            let transform = delegate.transform(&self.id);

            trace!("Pulled transform for light {}", self.id);

            if is_valid_transform(&transform) {
                self.transform = transform;
            } else {
                warn!(
                    "Refusing invalid transform for light {}, keeping the \
                     previous one",
                    self.id
                );

                warnings.push(SyncError::InvalidTransform {
                    prim: self.id.clone(),
                });
            }
        }

        if fields.params {
            self.params = delegate.light_params(&self.id);

            trace!("Pulled params for light {}: {:?}", self.id, self.params);
        }

        if self.is_committed() && (fields.transform || fields.params) {
            debug!(
                "Light {} has been already created; ignoring its changes",
                self.id
            );
        }

        self.synced = true;

        delegate.mark_clean(&self.id, bits);

        warnings
    }

    pub fn desc(&self) -> LightDesc {
        let kind = match self.light_type {
            LightType::Sphere if self.params.treat_as_point => {
                LightKind::Point
            }
            _ => LightKind::Sphere {
                radius: self.params.radius,
            },
        };

        LightDesc {
            kind,
            color: self.params.emission(),
            position: self.transform.w_axis.truncate(),
        }
    }
}
