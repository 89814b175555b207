use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Refine routines on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Hard limit on block visits per routine. `None` derives the limit from
    /// lattice height, block count and tracked values.
    pub max_block_visits: Option<usize>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_block_visits: None,
        }
    }
}

impl FlowConfig {
    pub(crate) fn visit_cap(&self, blocks: usize, values: usize, height: usize) -> usize {
        self.max_block_visits.unwrap_or_else(|| {
            blocks
                .saturating_mul(values.saturating_add(1))
                .saturating_mul(height.saturating_add(2))
                .max(blocks.saturating_mul(2))
        })
    }
}
