mod patch;
mod refiner;
mod stencil;

use glam::{UVec3, Vec3};

pub use self::patch::*;
pub use self::refiner::*;
pub use self::stencil::*;

/// Undirected edge between two vertices; endpoints are stored sorted, so
/// `Edge::new(a, b) == Edge::new(b, a)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(u32, u32);

impl Edge {
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn a(&self) -> u32 {
        self.0
    }

    pub fn b(&self) -> u32 {
        self.1
    }

    pub fn other(&self, vertex: u32) -> u32 {
        if vertex == self.0 {
            self.1
        } else {
            self.0
        }
    }
}

/// Output of [`Refiner::evaluate()`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RefinedMesh {
    pub points: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Vec<UVec3>,
}

impl RefinedMesh {
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }
}
