use glam::{Mat4, Vec3};

use crate::{
    CullStyle, DirtyBits, DisplayStyle, LightParams, MeshTopology,
    PrimPath, Primvar, PrimvarDescriptor, SubdivTags,
};

#[cfg(test)]
pub(crate) mod mock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Mesh,
    Light,
}

impl PrimKind {
    /// Dirty bits that are assumed to be set on a primitive's first sync.
    pub fn initial_dirty_bits(&self) -> DirtyBits {
        match self {
            PrimKind::Mesh => DirtyBits::ALL_MESH,
            PrimKind::Light => DirtyBits::ALL_LIGHT,
        }
    }
}

/// Scene-graph provider; owns the scene and tells which parts of it
/// changed since the last frame.
///
/// Apart from [`Self::dirty_bits()`], [`Self::mark_clean()`] and
/// [`Self::instance_transforms()`], a field may only be queried while its
/// dirty bit is set.
///
/// Pulls of different primitives can happen concurrently, hence `&self`
/// everywhere; implementations are expected to use interior mutability for
/// `mark_clean()`.
pub trait SceneDelegate {
    fn dirty_bits(&self, id: &PrimPath) -> DirtyBits;

    /// Clears `bits` for given primitive, after they've been consumed.
    fn mark_clean(&self, id: &PrimPath, bits: DirtyBits);

    fn initial_dirty_bits(&self, kind: PrimKind) -> DirtyBits {
        kind.initial_dirty_bits()
    }

    fn topology(&self, id: &PrimPath) -> MeshTopology;

    fn subdiv_tags(&self, id: &PrimPath) -> SubdivTags;

    fn display_style(&self, id: &PrimPath) -> DisplayStyle;

    fn points(&self, id: &PrimPath) -> Vec<Vec3>;

    fn transform(&self, id: &PrimPath) -> Mat4;

    fn visible(&self, id: &PrimPath) -> bool;

    fn cull_style(&self, _id: &PrimPath) -> CullStyle {
        CullStyle::DontCare
    }

    fn double_sided(&self, _id: &PrimPath) -> bool {
        false
    }

    fn primvar_descriptors(&self, _id: &PrimPath) -> Vec<PrimvarDescriptor> {
        Vec::new()
    }

    fn primvar(&self, _id: &PrimPath, _name: &str) -> Option<Primvar> {
        None
    }

    /// Returns name of the material bound to given primitive, if any.
    fn material_binding(&self, _id: &PrimPath) -> Option<String> {
        None
    }

    /// Returns per-instance transforms `instancer` applies to `prototype`,
    /// in instance order.
    fn instance_transforms(
        &self,
        instancer: &PrimPath,
        prototype: &PrimPath,
    ) -> Vec<Mat4>;

    fn light_params(&self, id: &PrimPath) -> LightParams;
}
