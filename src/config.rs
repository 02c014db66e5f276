/// Whether a node keeps its computed value.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// Keep valid parts and recompute only invalid ones.
    #[default]
    On,
    /// Recompute on every request.
    Off,
}

/// Graph-wide settings. New nodes take their defaults from here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// The cache mode of new nodes.
    pub cache_mode: CacheMode,
    /// Whether inverse functions may use the source's previous value to
    /// pick among several inverses (e.g. the branch of an inverse sine).
    pub input_aware_inversion: bool,
    /// Whether input nodes accept overrides by default.
    pub inputs_allow_overriding: bool,
    /// Whether function nodes accept overrides by default.
    pub functions_allow_overriding: bool,
    /// Whether assigned values are cast to the element type of the target
    /// and rounded to the precision of a tolerance.
    pub simplify_assignments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_mode: CacheMode::On,
            input_aware_inversion: true,
            inputs_allow_overriding: true,
            functions_allow_overriding: false,
            simplify_assignments: true,
        }
    }
}
