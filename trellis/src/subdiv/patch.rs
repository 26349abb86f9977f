use glam::UVec3;

/// Triangular patches of the last refinement level, indexing the refined
/// vertex buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchTable {
    patches: Vec<[u32; 3]>,
}

impl PatchTable {
    pub fn push(&mut self, patch: [u32; 3]) {
        self.patches.push(patch);
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = UVec3> + '_ {
        self.patches.iter().copied().map(UVec3::from_array)
    }

    /// Number of refined vertices actually referenced by the patches.
    pub fn vertex_count(&self) -> usize {
        self.triangles()
            .map(|tri| tri.max_element() as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count() {
        let mut table = PatchTable::default();

        assert_eq!(0, table.vertex_count());

        table.push([0, 1, 2]);
        table.push([2, 1, 5]);

        assert_eq!(
            vec![UVec3::new(0, 1, 2), UVec3::new(2, 1, 5)],
            table.triangles().collect::<Vec<_>>()
        );

        assert_eq!(2, table.len());
        assert_eq!(6, table.vertex_count());
    }
}
