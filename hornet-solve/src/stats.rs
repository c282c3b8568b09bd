use std::fmt;

/// Worklist and oracle counters, reported after solving when
/// `solver_stats` is set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Constraints in the problem.
    pub num_cstr: usize,
    /// Fixpoint iterations (new-SCC bumps from the worklist).
    pub num_iter: usize,
    /// Refinement brackets issued.
    pub num_brkt: usize,
    /// check-sat queries issued.
    pub num_chck: usize,
    /// Candidates the oracle validated.
    pub num_vald: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "constraints: {}, iterations: {}, brackets: {}, queries: {}, valid: {}",
            self.num_cstr, self.num_iter, self.num_brkt, self.num_chck, self.num_vald
        )
    }
}
