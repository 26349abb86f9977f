//! In-memory implementations of both sides [`trellis`] synchronizes: a scene
//! provider ([`MemoryScene`]) and a renderer that records every call it gets
//! ([`RecordingRenderer`]).

mod renderer;
mod scene;

pub use trellis as tr;

pub use self::renderer::*;
pub use self::scene::*;
