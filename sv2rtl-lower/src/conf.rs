use sv2rtl_utils::Id;

/// Options controlling how a design is lowered.
#[derive(Debug, Clone)]
pub struct LowerConf {
    /// Emit `$dff`/`$adff` cells for clocked blocks instead of edge-triggered
    /// sync rules.
    pub register_cells: bool,
    /// Cap on unrolled or interpreted loop iterations.
    pub max_loop_iterations: u64,
    /// Nesting limit for function calls, both folded and generated.
    pub max_call_depth: usize,
    /// Attach `src` attributes to generated objects.
    pub keep_src: bool,
    /// Overrides the top module recorded in the design.
    pub top: Option<Id>,
}

impl Default for LowerConf {
    fn default() -> Self {
        Self {
            register_cells: false,
            max_loop_iterations: 100_000,
            max_call_depth: 64,
            keep_src: true,
            top: None,
        }
    }
}
