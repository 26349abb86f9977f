use thiserror::Error;

use crate::{GeometryError, PrimPath, RendererError};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SyncError {
    /// Geometry that had to be (partially) skipped; synchronization carries
    /// on with whatever remained usable.
    #[error("malformed geometry in {prim}")]
    MalformedGeometry {
        prim: PrimPath,

        #[source]
        error: GeometryError,
    },

    /// Transform with non-finite or degenerate elements; the previous valid
    /// transform is kept.
    #[error("invalid transform for {prim}")]
    InvalidTransform { prim: PrimPath },

    /// Renderer refused a mutation; fatal for the current frame.
    #[error("renderer mutation failed")]
    RendererMutation(#[from] RendererError),

    /// Output binding that can't be served; it's skipped for the frame.
    #[error("cannot serve AOV `{aov}`: {reason}")]
    ConfigurationMismatch { aov: String, reason: String },
}

impl SyncError {
    /// Whether this error aborts the frame, as opposed to being merely
    /// reported.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RendererMutation(_))
    }
}
