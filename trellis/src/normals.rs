use glam::{UVec3, Vec3};

/// Computes per-vertex normals as the average of adjacent faces' normals,
/// weighted by face area.
///
/// Triangles referencing vertices outside of `points` are ignored; vertices
/// not used by any triangle get a zero normal.
pub fn smooth_normals(points: &[Vec3], triangles: &[UVec3]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; points.len()];

    for tri in triangles {
        let [a, b, c] = tri.to_array().map(|index| index as usize);

        let (Some(pa), Some(pb), Some(pc)) =
            (points.get(a), points.get(b), points.get(c))
        else {
            continue;
        };

        // Unnormalized; its length is twice the triangle's area
        let normal = (*pb - *pa).cross(*pc - *pa);

        normals[a] += normal;
        normals[b] += normal;
        normals[c] += normal;
    }

    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }

    normals
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn flat_quad() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let triangles = [UVec3::new(0, 1, 2), UVec3::new(0, 2, 3)];

        for normal in smooth_normals(&points, &triangles) {
            assert_relative_eq!(Vec3::Z, normal);
        }
    }

    #[test]
    fn shared_edge() {
        // Two triangles folded by 90 degrees along the X axis
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let triangles = [UVec3::new(0, 1, 2), UVec3::new(0, 3, 1)];
        let normals = smooth_normals(&points, &triangles);

        assert_relative_eq!(Vec3::Z, normals[2]);
        assert_relative_eq!(Vec3::Y, normals[3]);

        assert_relative_eq!(
            Vec3::new(0.0, 1.0, 1.0).normalize(),
            normals[0],
            epsilon = 1e-6
        );
    }

    #[test]
    fn unused_vertices() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE];
        let triangles = [UVec3::new(0, 1, 2), UVec3::new(0, 1, 7)];
        let normals = smooth_normals(&points, &triangles);

        assert_eq!(Vec3::ZERO, normals[3]);
        assert_relative_eq!(Vec3::Z, normals[0]);
    }
}
