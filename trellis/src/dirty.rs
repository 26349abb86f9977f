use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of per-primitive fields invalidated by the scene provider.
///
/// A field may only be pulled from the provider while its bit is set - the
/// provider is free to compute data lazily and pulling a clean field is not
/// supported.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DirtyBits(u32);

impl DirtyBits {
    pub const CLEAN: Self = Self(0);
    pub const TRANSFORM: Self = Self(1 << 0);
    pub const POINTS: Self = Self(1 << 1);
    pub const TOPOLOGY: Self = Self(1 << 2);
    pub const VISIBILITY: Self = Self(1 << 3);
    pub const CULL_STYLE: Self = Self(1 << 4);
    pub const DOUBLE_SIDED: Self = Self(1 << 5);
    pub const DISPLAY_STYLE: Self = Self(1 << 6);
    pub const SUBDIV_TAGS: Self = Self(1 << 7);
    pub const PRIMVAR: Self = Self(1 << 8);
    pub const NORMALS: Self = Self(1 << 9);
    pub const INSTANCE_INDEX: Self = Self(1 << 10);
    pub const MATERIAL_ID: Self = Self(1 << 11);
    pub const PARAMS: Self = Self(1 << 12);

    /// Everything a mesh reads; synthesized on a mesh's first sync.
    pub const ALL_MESH: Self = Self(
        Self::TRANSFORM.0
            | Self::POINTS.0
            | Self::TOPOLOGY.0
            | Self::VISIBILITY.0
            | Self::CULL_STYLE.0
            | Self::DOUBLE_SIDED.0
            | Self::DISPLAY_STYLE.0
            | Self::SUBDIV_TAGS.0
            | Self::PRIMVAR.0
            | Self::NORMALS.0
            | Self::INSTANCE_INDEX.0
            | Self::MATERIAL_ID.0,
    );

    /// Everything a light reads; synthesized on a light's first sync.
    pub const ALL_LIGHT: Self = Self(Self::TRANSFORM.0 | Self::PARAMS.0);

    const NAMES: [(Self, &'static str); 13] = [
        (Self::TRANSFORM, "TRANSFORM"),
        (Self::POINTS, "POINTS"),
        (Self::TOPOLOGY, "TOPOLOGY"),
        (Self::VISIBILITY, "VISIBILITY"),
        (Self::CULL_STYLE, "CULL_STYLE"),
        (Self::DOUBLE_SIDED, "DOUBLE_SIDED"),
        (Self::DISPLAY_STYLE, "DISPLAY_STYLE"),
        (Self::SUBDIV_TAGS, "SUBDIV_TAGS"),
        (Self::PRIMVAR, "PRIMVAR"),
        (Self::NORMALS, "NORMALS"),
        (Self::INSTANCE_INDEX, "INSTANCE_INDEX"),
        (Self::MATERIAL_ID, "MATERIAL_ID"),
        (Self::PARAMS, "PARAMS"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_clean(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for DirtyBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DirtyBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DirtyBits {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for DirtyBits {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for DirtyBits {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::Debug for DirtyBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("CLEAN");
        }

        let mut names = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name);

        if let Some(name) = names.next() {
            f.write_str(name)?;
        }

        for name in names {
            write!(f, " | {name}")?;
        }

        Ok(())
    }
}

/// Decoded view of [`DirtyBits`]: one flag per field that needs to be
/// re-pulled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFields {
    pub transform: bool,
    pub points: bool,
    pub topology: bool,
    pub visibility: bool,
    pub cull_style: bool,
    pub double_sided: bool,
    pub display_style: bool,
    pub subdiv_tags: bool,
    pub primvars: bool,
    pub normals: bool,
    pub instance_index: bool,
    pub material: bool,
    pub params: bool,
}

impl DirtyFields {
    /// Decodes `bits` for a primitive; on its first sync `initial` is merged
    /// in so that the cache always starts fully populated.
    pub fn interpret(
        first_sync: bool,
        bits: DirtyBits,
        initial: DirtyBits,
    ) -> Self {
        if first_sync {
            Self::decode(bits | initial)
        } else {
            Self::decode(bits)
        }
    }

    pub fn decode(bits: DirtyBits) -> Self {
        Self {
            transform: bits.contains(DirtyBits::TRANSFORM),
            points: bits.contains(DirtyBits::POINTS),
            topology: bits.contains(DirtyBits::TOPOLOGY),
            visibility: bits.contains(DirtyBits::VISIBILITY),
            cull_style: bits.contains(DirtyBits::CULL_STYLE),
            double_sided: bits.contains(DirtyBits::DOUBLE_SIDED),
            display_style: bits.contains(DirtyBits::DISPLAY_STYLE),
            subdiv_tags: bits.contains(DirtyBits::SUBDIV_TAGS),
            primvars: bits.contains(DirtyBits::PRIMVAR),
            normals: bits.contains(DirtyBits::NORMALS),
            instance_index: bits.contains(DirtyBits::INSTANCE_INDEX),
            material: bits.contains(DirtyBits::MATERIAL_ID),
            params: bits.contains(DirtyBits::PARAMS),
        }
    }

    /// Whether anything that feeds the prototype geometry changed.
    pub fn geometry(&self) -> bool {
        self.points
            || self.topology
            || self.display_style
            || self.subdiv_tags
            || self.normals
    }

    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}
