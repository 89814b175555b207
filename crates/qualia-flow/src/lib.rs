//! Flow-sensitive refinement: CFG construction and a worklist dataflow pass
//! that narrows primary qualifiers of locals and receiver-less fields.

mod cfg;
mod config;
mod refine;
mod store;

pub use crate::cfg::{build_cfg, BasicBlock, BlockId, ControlFlowGraph, Terminator};
pub use crate::config::FlowConfig;
pub use crate::refine::{refine, refine_all, Refinement, RefinementContext};
pub use crate::store::{FlowStore, FlowValue};
