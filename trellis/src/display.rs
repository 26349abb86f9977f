/// How a mesh should be presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayStyle {
    /// Requested subdivision level; overrides the topology's own level.
    pub refine_level: u32,

    /// Whether the smooth (refined) surface is requested, as opposed to the
    /// coarse triangulated hull.
    pub refined: bool,

    pub flat_shading: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullStyle {
    #[default]
    DontCare,
    Nothing,
    Back,
    Front,
    BackUnlessDoubleSided,
    FrontUnlessDoubleSided,
}
