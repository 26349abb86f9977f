use glam::UVec3;
use log::warn;

use crate::{GeometryError, MeshTopology, Orientation};

/// Triangle index buffer together with the face each triangle came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triangulation {
    pub indices: Vec<UVec3>,
    pub face_indices: Vec<u32>,
}

impl Triangulation {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Fan-triangulates `topology` from each face's first vertex.
///
/// Non-convex faces may come out wrong; that's a known limitation. Faces
/// with fewer than three vertices are skipped and reported through the
/// returned warnings, holes are skipped silently.
pub fn triangulate(
    topology: &MeshTopology,
) -> Result<(Triangulation, Vec<GeometryError>), GeometryError> {
    let mut triangulation = Triangulation {
        indices: Vec::with_capacity(topology.face_vertex_indices.len()),
        face_indices: Vec::with_capacity(topology.face_vertex_indices.len()),
    };

    let mut warnings = Vec::new();
    let mut offset = 0usize;

    for (face, &arity) in topology.face_vertex_counts.iter().enumerate() {
        let start = offset;
        let end = start + arity as usize;

        offset = end;

        let vertices = topology.face_vertex_indices.get(start..end).ok_or(
            GeometryError::CountMismatch {
                expected: end,
                actual: topology.face_vertex_indices.len(),
            },
        )?;

        if topology.is_hole(face) {
            continue;
        }

        if arity < 3 {
            warn!("Skipping face {face}: it has only {arity} vertices");

            warnings.push(GeometryError::DegenerateFace { face, arity });
            continue;
        }

        for idx in 1..(vertices.len() - 1) {
            let (b, c) = match topology.orientation {
                Orientation::RightHanded => (vertices[idx], vertices[idx + 1]),
                Orientation::LeftHanded => (vertices[idx + 1], vertices[idx]),
            };

            triangulation.indices.push(UVec3::new(vertices[0], b, c));
            triangulation.face_indices.push(face as u32);
        }
    }

    Ok((triangulation, warnings))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn triangles_pass_through() {
        let topology = MeshTopology::new([3, 3], [0, 1, 2, 2, 1, 3]);
        let (triangulation, warnings) = triangulate(&topology).unwrap();

        assert!(warnings.is_empty());

        assert_eq!(
            vec![UVec3::new(0, 1, 2), UVec3::new(2, 1, 3)],
            triangulation.indices
        );

        assert_eq!(vec![0, 1], triangulation.face_indices);
    }

    #[test]
    fn quad() {
        let topology = MeshTopology::new([4], [0, 1, 2, 3]);
        let (triangulation, _) = triangulate(&topology).unwrap();

        assert_eq!(
            vec![UVec3::new(0, 1, 2), UVec3::new(0, 2, 3)],
            triangulation.indices
        );

        // Both triangles share the 0-2 diagonal
        for tri in &triangulation.indices {
            assert!(tri.to_array().contains(&0));
            assert!(tri.to_array().contains(&2));
        }
    }

    #[test]
    fn fans() {
        let mut rng = StdRng::seed_from_u64(1234);

        for _ in 0..100 {
            let arity = rng.gen_range(3..16u32);

            let vertices: Vec<u32> =
                (0..arity).map(|_| rng.gen_range(0..1000)).collect();

            let topology = MeshTopology::new([arity], vertices.clone());
            let (triangulation, warnings) = triangulate(&topology).unwrap();

            assert!(warnings.is_empty());
            assert_eq!((arity - 2) as usize, triangulation.len());

            for tri in &triangulation.indices {
                for vertex in tri.to_array() {
                    assert!(vertices.contains(&vertex));
                }
            }
        }
    }

    #[test]
    fn degenerate_faces_are_skipped() {
        let topology = MeshTopology::new([2, 3, 0], [0, 1, 0, 1, 2]);
        let (triangulation, warnings) = triangulate(&topology).unwrap();

        assert_eq!(vec![UVec3::new(0, 1, 2)], triangulation.indices);
        assert_eq!(vec![1], triangulation.face_indices);

        assert_eq!(
            vec![
                GeometryError::DegenerateFace { face: 0, arity: 2 },
                GeometryError::DegenerateFace { face: 2, arity: 0 },
            ],
            warnings
        );
    }

    #[test]
    fn holes() {
        let topology =
            MeshTopology::new([3, 3], [0, 1, 2, 2, 1, 3]).with_holes([0]);

        let (triangulation, _) = triangulate(&topology).unwrap();

        assert_eq!(vec![UVec3::new(2, 1, 3)], triangulation.indices);
        assert_eq!(vec![1], triangulation.face_indices);
    }

    #[test]
    fn left_handed() {
        let topology = MeshTopology::new([4], [0, 1, 2, 3])
            .with_orientation(Orientation::LeftHanded);

        let (triangulation, _) = triangulate(&topology).unwrap();

        assert_eq!(
            vec![UVec3::new(0, 2, 1), UVec3::new(0, 3, 2)],
            triangulation.indices
        );
    }

    #[test]
    fn truncated_index_buffer() {
        let topology = MeshTopology::new([3, 3], [0, 1, 2, 3]);

        assert!(matches!(
            triangulate(&topology),
            Err(GeometryError::CountMismatch { .. })
        ));
    }
}
