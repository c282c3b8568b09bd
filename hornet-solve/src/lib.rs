//! The predicate-abstraction fixpoint core: a worklist-driven refinement
//! loop over Horn constraints with unknown κ predicates, backed by an
//! SMT oracle, producing a `Safe`/`Unsafe` verdict and a minimal
//! qualifier assignment per κ.

use failure::Fallible;
use hornet_ir::SolverInfo;

pub mod config;
pub mod oracle;
pub mod refine;
pub mod result;
pub mod solution;
pub mod stats;
pub mod worklist;

mod errors;
mod solve;

pub use crate::config::Config;
pub use crate::errors::SolveError;
pub use crate::oracle::{SmtOracle, ValidityOracle};
pub use crate::result::{FixResult, FixStatus};
pub use crate::solution::Solution;
pub use crate::solve::{solve, solve_with, solve_with_oracle};
pub use crate::stats::Stats;

/// The κ-elimination pre-processor. Out of scope for the core: supplied
/// by the front-end when `use_elim` is configured.
pub trait Eliminator {
    fn eliminate(&mut self, si: SolverInfo) -> Fallible<SolverInfo>;
}

/// A whole-solve delegate for gradual refinement typing; when configured
/// the core is bypassed entirely.
pub trait GradualSolver {
    fn solve(&mut self, cfg: &Config, si: &SolverInfo) -> Fallible<FixResult>;
}

/// The optional external collaborators a solve may be handed.
#[derive(Default)]
pub struct Externals<'a> {
    pub eliminator: Option<&'a mut dyn Eliminator>,
    pub gradual: Option<&'a mut dyn GradualSolver>,
}
