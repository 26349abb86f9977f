use fxhash::FxHashMap;
use glam::Vec3;

use crate::GeometryError;

/// Refined vertices expressed as weighted sums of coarse vertices.
///
/// Stencils are stored flat (one run of `(index, weight)` pairs per refined
/// vertex), sorted by coarse index; evaluation always walks them in the same
/// order, so evaluating the same table against the same buffer yields
/// bitwise-identical results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StencilTable {
    offsets: Vec<u32>,
    indices: Vec<u32>,
    weights: Vec<f32>,
    max_index: Option<u32>,
}

impl StencilTable {
    pub fn push(&mut self, stencil: &[(u32, f32)]) {
        self.offsets.push(self.indices.len() as u32);

        for &(index, weight) in stencil {
            self.indices.push(index);
            self.weights.push(weight);

            self.max_index =
                Some(self.max_index.map_or(index, |max| max.max(index)));
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, idx: usize) -> impl Iterator<Item = (u32, f32)> + '_ {
        let range = self.range(idx);

        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    fn range(&self, idx: usize) -> std::ops::Range<usize> {
        let start = self.offsets.get(idx).map_or(0, |&o| o as usize);

        let end = self
            .offsets
            .get(idx + 1)
            .map_or(self.indices.len(), |&o| o as usize);

        start..end
    }

    /// Evaluates the first `count` stencils against `coarse`.
    pub fn evaluate(
        &self,
        coarse: &[Vec3],
        count: usize,
    ) -> Result<Vec<Vec3>, GeometryError> {
        if let Some(index) = self.max_index {
            if index as usize >= coarse.len() {
                return Err(GeometryError::IndexOutOfRange {
                    index,
                    point_count: coarse.len(),
                });
            }
        }

        Ok((0..count.min(self.len()))
            .map(|idx| {
                self.get(idx)
                    .fold(Vec3::ZERO, |acc, (index, weight)| {
                        acc + coarse[index as usize] * weight
                    })
            })
            .collect())
    }
}

/// Composes `local` (weights over the previous refinement level) with the
/// stencils of that level, producing weights over coarse vertices.
pub(crate) fn compose(
    local: &[(u32, f32)],
    previous: &[Vec<(u32, f32)>],
) -> Vec<(u32, f32)> {
    let mut acc: FxHashMap<u32, f32> = FxHashMap::default();

    for &(vertex, weight) in local {
        if weight == 0.0 {
            continue;
        }

        for &(index, coarse_weight) in &previous[vertex as usize] {
            *acc.entry(index).or_default() += weight * coarse_weight;
        }
    }

    let mut stencil: Vec<_> = acc.into_iter().collect();

    stencil.sort_unstable_by_key(|(index, _)| *index);
    stencil
}
