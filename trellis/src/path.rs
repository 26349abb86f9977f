use std::fmt;
use std::sync::Arc;

/// Hierarchical name of a scene entity, e.g. `/world/props/chair`.
///
/// Paths are stable across frames and key every per-primitive table; they
/// are also used to derive renderer-side object names, so two frames that
/// see the same primitive must produce the same names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimPath(Arc<str>);

impl PrimPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last segment of the path (`chair` for
    /// `/world/props/chair`).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Self> {
        let (parent, _) = self.0.rsplit_once('/')?;

        if parent.is_empty() {
            if self.0.len() > 1 {
                Some(Self::new("/"))
            } else {
                None
            }
        } else {
            Some(Self::new(parent))
        }
    }

    /// Name of the `ordinal`-th renderer object instantiating this
    /// primitive.
    pub fn instance_name(&self, ordinal: usize) -> String {
        format!("{}{}", self.0, ordinal)
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for PrimPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PrimPath {
    fn from(path: String) -> Self {
        Self(Arc::from(path))
    }
}
