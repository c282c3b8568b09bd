//! Per-constraint refinement: assemble the antecedent under the current
//! solution, offer the RHS candidate qualifiers to the oracle, and keep
//! only those it validates.

use crate::oracle::ValidityOracle;
use crate::solution::Solution;
use crate::stats::Stats;
use failure::Fallible;
use hornet_ir::{conjuncts, p_and, vv, Expr, KVar, Qualifier, SimpC, SolverInfo, Subst};
use tracing::debug;

/// The tag a candidate carries through the oracle: which κ and which
/// qualifier survive if the candidate is validated.
pub type Bind = (KVar, Qualifier);

/// The formula representing a constraint's antecedent: the environment
/// refinements (in bind order, with `VV` instantiated to the binder),
/// then the constraint's own LHS, with every κ application expanded
/// through the current solution. The conjunct order is deterministic so
/// that repeated solves produce identical transcripts.
pub fn lhs_pred(si: &SolverInfo, s: &Solution, c: &SimpC) -> Expr {
    let mut ps = Vec::with_capacity(c.env.len() + 1);
    for &bid in &c.env {
        let (sym, sr) = &si.bind_env[bid];
        let instantiated = Subst::singleton(vv(), Expr::Var(*sym)).apply(&sr.reft);
        ps.push(s.apply(&instantiated));
    }
    ps.push(s.apply(&c.lhs));
    p_and(ps)
}

/// The `(predicate, (κ, qualifier))` pairs whose validity decides the
/// constraint, together with the κs whose bind the constraint can
/// shrink. Non-κ conjuncts on the RHS contribute nothing; those belong
/// to target constraints and are classified after the fixpoint.
pub fn rhs_cands(s: &Solution, c: &SimpC) -> (Vec<KVar>, Vec<(Expr, Bind)>) {
    let mut ks = Vec::new();
    let mut cands = Vec::new();
    for conj in conjuncts(&c.rhs) {
        if let Expr::KVar(k, su) = conj {
            ks.push(k);
            for q in s.get(k) {
                cands.push((q.instantiate(&su), (k, q.clone())));
            }
        }
    }
    (ks, cands)
}

/// One refinement step. Returns the (possibly unchanged) successor
/// solution and whether any bind shrank.
///
/// Contraction is what makes the fixpoint terminate: only qualifiers
/// already in a κ's bind can survive the filter, and the bind lattice
/// has finite height.
pub fn refine_c<O: ValidityOracle>(
    oracle: &mut O,
    si: &SolverInfo,
    s: &Solution,
    c: &SimpC,
    stats: &mut Stats,
) -> Fallible<(bool, Solution)> {
    let (ks, cands) = rhs_cands(s, c);
    if cands.is_empty() {
        return Ok((false, s.clone()));
    }
    let lhs = lhs_pred(si, s, c);
    debug!(
        "refine {:?} (iteration {}): {} candidate(s)",
        c.id, stats.num_iter, cands.len()
    );

    stats.num_brkt += 1;
    stats.num_chck += cands.len();
    let kqs = oracle.filter_valid(&lhs, &cands)?;
    stats.num_vald += kqs.len();

    Ok(s.update(&ks, &kqs))
}
