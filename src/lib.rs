//! hornet decides, for a set of Horn implication constraints over
//! first-order predicates containing unknown predicate variables
//! (κ-variables), whether a satisfying assignment of the κs to
//! quantifier-free formulas exists, and if so produces a minimal one.
//!
//! It is the verification back-end consumed by refinement-type
//! front-ends: each subtyping obligation arrives as one implication
//! `Γ ⊢ p ⇒ κ(..)` or `Γ ⊢ p ⇒ q`, and the answer is `Safe` or
//! `Unsafe` (with the failing constraints) together with the predicate
//! inferred for each κ.
//!
//! The member crates split the work the obvious way:
//!
//! - `hornet-ir`: sorts, expressions, substitutions, constraints.
//! - `hornet-smt`: the SMT-LIB2 conversation with a solver subprocess.
//! - `hornet-solve`: the worklist-driven refinement fixpoint itself.

pub use hornet_ir::{
    BindEnv, BindId, ConstraintId, CRank, Expr, KVar, Qualifier, SimpC, SolverInfo, Sort,
    SortedReft, Subst, Symbol, Tag,
};
pub use hornet_smt::{SatResult, SmtSession, SmtSolver};
pub use hornet_solve::{
    solve, solve_with, solve_with_oracle, Config, Eliminator, Externals, FixResult, FixStatus,
    GradualSolver, SmtOracle, SolveError, ValidityOracle,
};
