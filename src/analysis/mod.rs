//! Program analyses built on the traversal framework

mod inst_to_vars;

pub use inst_to_vars::{InstSite, InstToVars, Solution};
