use hornet_smt::{SmtOpts, SmtSolver};
use std::path::PathBuf;

/// Solver configuration, as handed over by the (out-of-scope) command
/// line front-end.
#[derive(Clone, Debug)]
pub struct Config {
    /// Which solver subprocess to spawn.
    pub solver: SmtSolver,

    /// The constraint file being solved; the sidecar SMT log derives its
    /// path from it.
    pub file: Option<PathBuf>,

    /// Mirror the solver conversation to `<file>.smt2`.
    pub save: bool,

    /// When false, MBQI is disabled in the Z3 preamble.
    pub extensionality: bool,

    /// Expression-normalisation toggles, consumed upstream and surfaced
    /// on the session for downstream passes.
    pub alpha_equivalence: bool,
    pub beta_equivalence: bool,
    pub normal_form: bool,

    /// Requires Z3 >= 4.4.2.
    pub string_theory: bool,

    /// Run the external κ-elimination pre-processor first.
    pub use_elim: bool,

    /// Minimise each κ's conjunction in the reported solution.
    pub minimal_sol: bool,

    /// Emit a worklist/constraint summary after solving.
    pub solver_stats: bool,

    /// Delegate the whole solve to the external gradual solver.
    pub gradual: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            solver: SmtSolver::Z3,
            file: None,
            save: false,
            extensionality: false,
            alpha_equivalence: false,
            beta_equivalence: false,
            normal_form: false,
            string_theory: false,
            use_elim: false,
            minimal_sol: false,
            solver_stats: false,
            gradual: false,
        }
    }
}

impl Config {
    pub fn smt_opts(&self) -> SmtOpts {
        SmtOpts {
            extensionality: self.extensionality,
            string_theory: self.string_theory,
            alpha_equivalence: self.alpha_equivalence,
            beta_equivalence: self.beta_equivalence,
            normal_form: self.normal_form,
        }
    }

    /// `<constraintFile>.smt2`, when logging is enabled.
    pub fn smt_log_file(&self) -> Option<PathBuf> {
        if !self.save {
            return None;
        }
        self.file
            .as_ref()
            .map(|f| PathBuf::from(format!("{}.smt2", f.display())))
    }
}
