use std::f32::consts::TAU;

use fxhash::FxHashMap;
use glam::{UVec3, Vec3};
use log::trace;

use super::stencil::compose;
use crate::{
    Edge, GeometryError, PatchTable, RefinedMesh, StencilTable, SubdivTags,
};

/// Uniform Loop refinement of a triangle mesh.
///
/// Boundary edges are always sharp and boundary vertices are pinned as
/// corners (the "edge and corner" boundary rule); authored creases and
/// corners are honored as well, with fractional sharpness blended between
/// the smooth and the sharp rule and decremented once per level.
///
/// Topology is processed once, in [`Self::new()`]; [`Self::evaluate()`] is a
/// pure function of the coarse buffers and can be called repeatedly.
#[derive(Clone, Debug)]
pub struct Refiner {
    coarse_count: usize,
    stencils: StencilTable,
    patches: PatchTable,
}

impl Refiner {
    pub fn new(
        coarse_count: usize,
        triangles: &[UVec3],
        tags: &SubdivTags,
        levels: u32,
        boundary_corner_sharpness: f32,
    ) -> Result<Self, GeometryError> {
        let mut level = Level::coarse(coarse_count, triangles)?;
        let mut topology = level.topology()?;

        for (vertex, sharpness) in tags.corners() {
            if let Some(vs) = level.vertex_sharpness.get_mut(vertex as usize) {
                *vs = vs.max(sharpness);
            }
        }

        for (a, b, sharpness) in tags.crease_edges() {
            let edge = Edge::new(a, b);

            if sharpness <= 0.0 {
                continue;
            }

            if let Some(&edge_id) = topology.index.get(&edge) {
                topology.edges[edge_id as usize].sharpness = sharpness;
                level.creases.insert(edge, sharpness);
            } else {
                trace!("Ignoring crease ({a}, {b}): no such edge");
            }
        }

        for info in &topology.edges {
            if info.is_boundary() {
                for vertex in [info.edge.a(), info.edge.b()] {
                    let vs = &mut level.vertex_sharpness[vertex as usize];

                    *vs = vs.max(boundary_corner_sharpness);
                }
            }
        }

        let mut stencils: Vec<Vec<(u32, f32)>> =
            (0..coarse_count as u32).map(|i| vec![(i, 1.0)]).collect();

        let mut topology = Some(topology);

        for _ in 0..levels {
            let current = match topology.take() {
                Some(topology) => topology,
                None => level.topology()?,
            };

            let (next, local) = level.refine(&current);

            stencils = local
                .iter()
                .map(|local| compose(local, &stencils))
                .collect();

            level = next;
        }

        trace!(
            "Refined {} coarse vertices into {} vertices and {} triangles \
             ({levels} levels)",
            coarse_count,
            level.vertex_count,
            level.triangles.len()
        );

        let mut table = StencilTable::default();

        for stencil in &stencils {
            table.push(stencil);
        }

        let mut patches = PatchTable::default();

        for &triangle in &level.triangles {
            patches.push(triangle);
        }

        Ok(Self {
            coarse_count,
            stencils: table,
            patches,
        })
    }

    pub fn coarse_count(&self) -> usize {
        self.coarse_count
    }

    pub fn stencils(&self) -> &StencilTable {
        &self.stencils
    }

    pub fn patches(&self) -> &PatchTable {
        &self.patches
    }

    pub fn evaluate(
        &self,
        points: &[Vec3],
        normals: Option<&[Vec3]>,
    ) -> Result<RefinedMesh, GeometryError> {
        if points.len() != self.coarse_count {
            return Err(GeometryError::CountMismatch {
                expected: self.coarse_count,
                actual: points.len(),
            });
        }

        let vertex_count = self.patches.vertex_count();
        let points = self.stencils.evaluate(points, vertex_count)?;

        let normals = normals
            .map(|normals| {
                self.stencils.evaluate(normals, vertex_count).map(|normals| {
                    normals
                        .into_iter()
                        .map(|normal| normal.normalize_or_zero())
                        .collect()
                })
            })
            .transpose()?;

        Ok(RefinedMesh {
            points,
            normals,
            indices: self.patches.triangles().collect(),
        })
    }
}

struct Level {
    vertex_count: usize,
    triangles: Vec<[u32; 3]>,
    vertex_sharpness: Vec<f32>,
    creases: FxHashMap<Edge, f32>,
}

impl Level {
    fn coarse(
        vertex_count: usize,
        triangles: &[UVec3],
    ) -> Result<Self, GeometryError> {
        let mut tris = Vec::with_capacity(triangles.len());

        for (face, tri) in triangles.iter().enumerate() {
            let tri = tri.to_array();

            if let Some(&index) =
                tri.iter().find(|&&index| index as usize >= vertex_count)
            {
                return Err(GeometryError::IndexOutOfRange {
                    index,
                    point_count: vertex_count,
                });
            }

            if tri[0] == tri[1] || tri[1] == tri[2] {
                return Err(GeometryError::RepeatedVertex {
                    face,
                    vertex: tri[1],
                });
            }

            if tri[0] == tri[2] {
                return Err(GeometryError::RepeatedVertex {
                    face,
                    vertex: tri[0],
                });
            }

            tris.push(tri);
        }

        Ok(Self {
            vertex_count,
            triangles: tris,
            vertex_sharpness: vec![0.0; vertex_count],
            creases: Default::default(),
        })
    }

    fn topology(&self) -> Result<Topology, GeometryError> {
        let mut topology = Topology {
            edges: Vec::with_capacity(self.triangles.len() * 3 / 2),
            index: FxHashMap::default(),
            incident: vec![Vec::new(); self.vertex_count],
        };

        for tri in &self.triangles {
            for i in 0..3 {
                let edge = Edge::new(tri[i], tri[(i + 1) % 3]);
                let opposite = tri[(i + 2) % 3];

                let edge_id = *topology.index.entry(edge).or_insert_with(|| {
                    topology.edges.push(EdgeInfo {
                        edge,
                        opposite: [opposite; 2],
                        faces: 0,
                        sharpness: self
                            .creases
                            .get(&edge)
                            .copied()
                            .unwrap_or(0.0),
                    });

                    (topology.edges.len() - 1) as u32
                });

                let info = &mut topology.edges[edge_id as usize];

                if info.faces >= 2 {
                    return Err(GeometryError::NonManifoldEdge {
                        a: edge.a(),
                        b: edge.b(),
                        count: info.faces + 1,
                    });
                }

                info.opposite[info.faces] = opposite;
                info.faces += 1;

                if info.faces == 1 {
                    topology.incident[edge.a() as usize].push(edge_id);
                    topology.incident[edge.b() as usize].push(edge_id);
                }
            }
        }

        Ok(topology)
    }

    /// Performs a single Loop step; returns the finer level together with
    /// stencils of its vertices expressed over vertices of `self`.
    fn refine(&self, topology: &Topology) -> (Self, Vec<Vec<(u32, f32)>>) {
        let vertex_count = self.vertex_count + topology.edges.len();
        let mut local = Vec::with_capacity(vertex_count);

        for vertex in 0..self.vertex_count as u32 {
            local.push(self.vertex_rule(topology, vertex));
        }

        for info in &topology.edges {
            local.push(info.rule());
        }

        let edge_vertex = |a: u32, b: u32| {
            self.vertex_count as u32 + topology.index[&Edge::new(a, b)]
        };

        let mut triangles = Vec::with_capacity(self.triangles.len() * 4);

        for &[a, b, c] in &self.triangles {
            let ab = edge_vertex(a, b);
            let bc = edge_vertex(b, c);
            let ca = edge_vertex(c, a);

            triangles.push([a, ab, ca]);
            triangles.push([ab, b, bc]);
            triangles.push([ca, bc, c]);
            triangles.push([ab, bc, ca]);
        }

        let mut vertex_sharpness: Vec<_> = self
            .vertex_sharpness
            .iter()
            .map(|&sharpness| (sharpness - 1.0).max(0.0))
            .collect();

        vertex_sharpness.resize(vertex_count, 0.0);

        let mut creases = FxHashMap::default();

        for (edge, &sharpness) in &self.creases {
            let sharpness = sharpness - 1.0;

            if sharpness <= 0.0 {
                continue;
            }

            let mid = edge_vertex(edge.a(), edge.b());

            creases.insert(Edge::new(edge.a(), mid), sharpness);
            creases.insert(Edge::new(mid, edge.b()), sharpness);
        }

        let next = Self {
            vertex_count,
            triangles,
            vertex_sharpness,
            creases,
        };

        (next, local)
    }

    fn vertex_rule(&self, topology: &Topology, vertex: u32) -> Vec<(u32, f32)> {
        let incident = &topology.incident[vertex as usize];

        if incident.is_empty() {
            return vec![(vertex, 1.0)];
        }

        let corner = [(vertex, 1.0)];

        let sharp: Vec<_> = incident
            .iter()
            .map(|&edge_id| &topology.edges[edge_id as usize])
            .filter(|info| info.is_sharp())
            .collect();

        let base = match sharp.len() {
            0 | 1 => smooth_vertex(topology, vertex, incident),

            2 => {
                let crease = [
                    (vertex, 0.75),
                    (sharp[0].edge.other(vertex), 0.125),
                    (sharp[1].edge.other(vertex), 0.125),
                ];

                let t = (sharp[0].sharpness_weight()
                    + sharp[1].sharpness_weight())
                    / 2.0;

                blend(
                    &crease,
                    &smooth_vertex(topology, vertex, incident),
                    t,
                )
            }

            _ => corner.to_vec(),
        };

        blend(&corner, &base, self.vertex_sharpness[vertex as usize])
    }
}

struct Topology {
    edges: Vec<EdgeInfo>,
    index: FxHashMap<Edge, u32>,
    incident: Vec<Vec<u32>>,
}

struct EdgeInfo {
    edge: Edge,
    opposite: [u32; 2],
    faces: usize,
    sharpness: f32,
}

impl EdgeInfo {
    fn is_boundary(&self) -> bool {
        self.faces == 1
    }

    fn is_sharp(&self) -> bool {
        self.is_boundary() || self.sharpness > 0.0
    }

    fn sharpness_weight(&self) -> f32 {
        if self.is_boundary() {
            1.0
        } else {
            self.sharpness.min(1.0)
        }
    }

    fn rule(&self) -> Vec<(u32, f32)> {
        let mid = [(self.edge.a(), 0.5), (self.edge.b(), 0.5)];

        if self.is_boundary() {
            return mid.to_vec();
        }

        let smooth = [
            (self.edge.a(), 0.375),
            (self.edge.b(), 0.375),
            (self.opposite[0], 0.125),
            (self.opposite[1], 0.125),
        ];

        blend(&mid, &smooth, self.sharpness)
    }
}

fn smooth_vertex(
    topology: &Topology,
    vertex: u32,
    incident: &[u32],
) -> Vec<(u32, f32)> {
    let n = incident.len() as f32;
    let beta = loop_beta(incident.len());

    let mut stencil = Vec::with_capacity(incident.len() + 1);

    stencil.push((vertex, 1.0 - n * beta));

    for &edge_id in incident {
        let neighbour = topology.edges[edge_id as usize].edge.other(vertex);

        stencil.push((neighbour, beta));
    }

    stencil
}

/// Loop's own vertex weight for a smooth vertex of valence `n`.
fn loop_beta(n: usize) -> f32 {
    let n = n as f32;
    let x = 0.375 + 0.25 * (TAU / n).cos();

    (0.625 - x * x) / n
}

/// Returns `t * sharp + (1 - t) * smooth`, with `t` clamped to `0..=1`.
fn blend(
    sharp: &[(u32, f32)],
    smooth: &[(u32, f32)],
    t: f32,
) -> Vec<(u32, f32)> {
    if t >= 1.0 {
        return sharp.to_vec();
    }

    if t <= 0.0 {
        return smooth.to_vec();
    }

    sharp
        .iter()
        .map(|&(index, weight)| (index, weight * t))
        .chain(
            smooth
                .iter()
                .map(|&(index, weight)| (index, weight * (1.0 - t))),
        )
        .collect()
}
