use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubdivScheme {
    None,
    #[default]
    CatmullClark,
    Loop,
    Bilinear,
}

impl SubdivScheme {
    /// Whether this scheme produces a smooth limit surface; bilinear
    /// refinement would only add vertices on the flat cage, so it doesn't
    /// count.
    pub fn refines(&self) -> bool {
        matches!(self, Self::CatmullClark | Self::Loop)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    RightHanded,
    LeftHanded,
}

/// Authored sharpness hints for subdivision.
///
/// Creases are stored as chains: `crease_lengths[i]` consecutive vertices of
/// `crease_indices` form the i-th crease, weighted either by a single weight
/// (one per chain) or by one weight per edge of the chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubdivTags {
    pub corner_indices: Vec<u32>,
    pub corner_weights: Vec<f32>,
    pub crease_indices: Vec<u32>,
    pub crease_lengths: Vec<u32>,
    pub crease_weights: Vec<f32>,
}

impl SubdivTags {
    pub fn is_empty(&self) -> bool {
        self.corner_indices.is_empty() && self.crease_indices.is_empty()
    }

    /// Returns authored corners as `(vertex, sharpness)` pairs.
    pub fn corners(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.corner_indices.iter().enumerate().map(|(idx, &vertex)| {
            let weight = self
                .corner_weights
                .get(idx)
                .or_else(|| self.corner_weights.last())
                .copied()
                .unwrap_or(0.0);

            (vertex, weight)
        })
    }

    /// Returns authored crease edges as `(a, b, sharpness)` triples.
    pub fn crease_edges(&self) -> Vec<(u32, u32, f32)> {
        let edge_count: usize = self
            .crease_lengths
            .iter()
            .map(|&len| (len as usize).saturating_sub(1))
            .sum();

        let per_edge = self.crease_weights.len() == edge_count
            && edge_count != self.crease_lengths.len();

        let mut edges = Vec::with_capacity(edge_count);
        let mut offset = 0;
        let mut edge_idx = 0;

        for (chain_idx, &len) in self.crease_lengths.iter().enumerate() {
            let len = len as usize;

            let Some(chain) = self.crease_indices.get(offset..offset + len)
            else {
                break;
            };

            for pair in chain.windows(2) {
                let weight = if per_edge {
                    self.crease_weights.get(edge_idx)
                } else {
                    self.crease_weights.get(chain_idx)
                };

                edges.push((pair[0], pair[1], weight.copied().unwrap_or(0.0)));
                edge_idx += 1;
            }

            offset += len;
        }

        edges
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshTopology {
    pub face_vertex_counts: Vec<u32>,
    pub face_vertex_indices: Vec<u32>,
    pub hole_indices: Vec<u32>,
    pub orientation: Orientation,
    pub scheme: SubdivScheme,
    pub refine_level: u32,
    pub subdiv_tags: SubdivTags,
}

impl MeshTopology {
    pub fn new(
        face_vertex_counts: impl Into<Vec<u32>>,
        face_vertex_indices: impl Into<Vec<u32>>,
    ) -> Self {
        Self {
            face_vertex_counts: face_vertex_counts.into(),
            face_vertex_indices: face_vertex_indices.into(),
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: SubdivScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_refine_level(mut self, refine_level: u32) -> Self {
        self.refine_level = refine_level;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_holes(mut self, hole_indices: impl Into<Vec<u32>>) -> Self {
        self.hole_indices = hole_indices.into();
        self
    }

    pub fn with_subdiv_tags(mut self, subdiv_tags: SubdivTags) -> Self {
        self.subdiv_tags = subdiv_tags;
        self
    }

    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn is_hole(&self, face: usize) -> bool {
        self.hole_indices.contains(&(face as u32))
    }

    /// Checks invariants that make the topology walkable at all; per-face
    /// problems (e.g. degenerate faces) are reported later, during
    /// triangulation.
    pub fn validate(&self, point_count: usize) -> Result<(), GeometryError> {
        let expected: u64 = self
            .face_vertex_counts
            .iter()
            .map(|&count| count as u64)
            .sum();

        if expected != self.face_vertex_indices.len() as u64 {
            return Err(GeometryError::CountMismatch {
                expected: expected as usize,
                actual: self.face_vertex_indices.len(),
            });
        }

        if let Some(&index) = self
            .face_vertex_indices
            .iter()
            .find(|&&index| index as usize >= point_count)
        {
            return Err(GeometryError::IndexOutOfRange { index, point_count });
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error(
        "face vertex counts sum up to {expected}, but there are {actual} \
         face vertex indices"
    )]
    CountMismatch { expected: usize, actual: usize },

    #[error("vertex index {index} is out of range (point count: {point_count})")]
    IndexOutOfRange { index: u32, point_count: usize },

    #[error("face {face} has {arity} vertices, at least 3 are required")]
    DegenerateFace { face: usize, arity: u32 },

    #[error("edge ({a}, {b}) is shared by {count} faces")]
    NonManifoldEdge { a: u32, b: u32, count: usize },

    #[error("face {face} references vertex {vertex} more than once")]
    RepeatedVertex { face: usize, vertex: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate() {
        let topology = MeshTopology::new([3, 4], [0, 1, 2, 0, 2, 3, 4]);

        assert_eq!(Ok(()), topology.validate(5));

        assert_eq!(
            Err(GeometryError::IndexOutOfRange {
                index: 4,
                point_count: 4,
            }),
            topology.validate(4)
        );

        let topology = MeshTopology::new([3, 4], [0, 1, 2, 0, 2, 3]);

        assert_eq!(
            Err(GeometryError::CountMismatch {
                expected: 7,
                actual: 6,
            }),
            topology.validate(5)
        );
    }

    #[test]
    fn crease_edges() {
        let tags = SubdivTags {
            crease_indices: vec![0, 1, 2, 5, 6],
            crease_lengths: vec![3, 2],
            crease_weights: vec![2.0, 0.5],
            ..Default::default()
        };

        assert_eq!(
            vec![(0, 1, 2.0), (1, 2, 2.0), (5, 6, 0.5)],
            tags.crease_edges()
        );

        let tags = SubdivTags {
            crease_indices: vec![0, 1, 2],
            crease_lengths: vec![3],
            crease_weights: vec![1.0, 3.0],
            ..Default::default()
        };

        assert_eq!(vec![(0, 1, 1.0), (1, 2, 3.0)], tags.crease_edges());
    }

    #[test]
    fn corners() {
        let tags = SubdivTags {
            corner_indices: vec![4, 7],
            corner_weights: vec![1.5],
            ..Default::default()
        };

        assert_eq!(
            vec![(4, 1.5), (7, 1.5)],
            tags.corners().collect::<Vec<_>>()
        );
    }

    #[test]
    fn scheme() {
        assert!(SubdivScheme::CatmullClark.refines());
        assert!(SubdivScheme::Loop.refines());
        assert!(!SubdivScheme::Bilinear.refines());
        assert!(!SubdivScheme::None.refines());
    }
}
