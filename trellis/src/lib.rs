//! Incremental bridge between a retained scene graph and a progressive path
//! tracer.
//!
//! Each frame the caller asks [`Engine::sync()`] to pull whatever the scene
//! provider has invalidated, and then hands the engine over to
//! [`RenderPass::execute()`], which applies the minimal set of mutations to
//! the renderer inside a single edit transaction.

mod aov;
mod camera;
mod config;
mod delegate;
mod dirty;
mod display;
mod engine;
mod error;
mod instances;
mod light;
mod lights;
mod mesh;
mod normals;
mod path;
mod primvar;
mod render_pass;
mod renderer;
mod subdiv;
mod topology;
mod triangulate;
mod utils;

pub use glam;

pub use self::aov::*;
pub use self::camera::*;
pub use self::config::*;
pub use self::delegate::*;
pub use self::dirty::*;
pub use self::display::*;
pub use self::engine::*;
pub use self::error::*;
pub use self::instances::*;
pub use self::light::*;
pub use self::lights::*;
pub use self::mesh::*;
pub use self::normals::*;
pub use self::path::*;
pub use self::primvar::*;
pub use self::render_pass::*;
pub use self::renderer::*;
pub use self::subdiv::*;
pub use self::topology::*;
pub use self::triangulate::*;
pub use self::utils::{is_invertible, is_valid_transform};
