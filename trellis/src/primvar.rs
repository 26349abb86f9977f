use fxhash::FxHashMap;
use glam::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Constant,
    Uniform,
    Varying,
    Vertex,
    FaceVarying,
    Instance,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimvarDescriptor {
    pub name: String,
    pub interpolation: Interpolation,
}

impl PrimvarDescriptor {
    pub fn new(name: impl Into<String>, interpolation: Interpolation) -> Self {
        Self {
            name: name.into(),
            interpolation,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrimvarValue {
    Float(Vec<f32>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
}

impl PrimvarValue {
    pub fn as_vec3(&self) -> Option<&[Vec3]> {
        match self {
            Self::Vec3(values) => Some(values),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Vec2(values) => values.len(),
            Self::Vec3(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primvar {
    pub interpolation: Interpolation,
    pub value: PrimvarValue,
}

/// Last pulled primvars of a primitive, keyed by name.
///
/// The provider has no way of reporting that a primvar disappeared, so
/// entries are only ever added or replaced.
#[derive(Clone, Debug, Default)]
pub struct Primvars {
    values: FxHashMap<String, Primvar>,
}

impl Primvars {
    pub const POINTS: &'static str = "points";
    pub const NORMALS: &'static str = "normals";

    pub fn insert(&mut self, name: impl Into<String>, primvar: Primvar) {
        self.values.insert(name.into(), primvar);
    }

    pub fn get(&self, name: &str) -> Option<&Primvar> {
        self.values.get(name)
    }

    /// Returns authored per-vertex normals, if any.
    pub fn normals(&self) -> Option<&[Vec3]> {
        let primvar = self.values.get(Self::NORMALS)?;

        match primvar.interpolation {
            Interpolation::Vertex | Interpolation::Varying => {
                primvar.value.as_vec3()
            }
            _ => None,
        }
    }

    pub fn has_authored_normals(&self) -> bool {
        self.values.contains_key(Self::NORMALS)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals() {
        let mut primvars = Primvars::default();

        assert!(primvars.normals().is_none());

        primvars.insert(
            "displayColor",
            Primvar {
                interpolation: Interpolation::Constant,
                value: PrimvarValue::Vec3(vec![Vec3::X]),
            },
        );

        assert!(!primvars.has_authored_normals());

        primvars.insert(
            Primvars::NORMALS,
            Primvar {
                interpolation: Interpolation::FaceVarying,
                value: PrimvarValue::Vec3(vec![Vec3::Z; 3]),
            },
        );

        // Face-varying normals count as authored, but can't be used as
        // per-vertex data
        assert!(primvars.has_authored_normals());
        assert!(primvars.normals().is_none());

        primvars.insert(
            Primvars::NORMALS,
            Primvar {
                interpolation: Interpolation::Vertex,
                value: PrimvarValue::Vec3(vec![Vec3::Z; 3]),
            },
        );

        assert_eq!(Some(&[Vec3::Z; 3][..]), primvars.normals());
        assert_eq!(2, primvars.len());
    }
}
