//! From a converged solution to the user-facing verdict: classify the
//! residual target constraints, materialise each κ's bind into one
//! conjunction over its originally declared parameters, and optionally
//! strip conjuncts implied by the rest.

use crate::config::Config;
use crate::errors::SolveError;
use crate::oracle::ValidityOracle;
use crate::refine::lhs_pred;
use crate::solution::Solution;
use crate::worklist::Worklist;
use failure::Fallible;
use hornet_ir::{
    conjuncts, contains_kvars, kvar_arg, p_and, tidy_symbol, ConstraintId, Expr, KVar, SolverInfo,
    Subst, Tag,
};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FixStatus {
    /// Every target constraint is valid under the final solution.
    Safe,
    /// The targets that failed, with their user tags.
    Unsafe(Vec<(ConstraintId, Option<Tag>)>),
    /// The solve was aborted; carries the constraints still in flight.
    Crash { cs: Vec<ConstraintId>, msg: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixResult {
    pub status: FixStatus,
    /// The inferred predicate for each κ, over its declared parameters.
    pub solution: BTreeMap<KVar, Expr>,
    pub warnings: Vec<String>,
}

impl FixResult {
    pub fn is_safe(&self) -> bool {
        self.status == FixStatus::Safe
    }
}

#[instrument(level = "debug", skip(cfg, si, oracle, s, w))]
pub(crate) fn build<O: ValidityOracle>(
    cfg: &Config,
    si: &SolverInfo,
    oracle: &mut O,
    s: &Solution,
    w: &Worklist,
) -> Fallible<FixResult> {
    // Phase 1: classify the residual targets.
    let mut failed = Vec::new();
    for &cid in w.unsat_candidates() {
        let c = &si.cs[&cid];
        if !c.is_target || contains_kvars(&c.rhs) {
            return Err(SolveError::NotATarget(cid).into());
        }
        let lp = lhs_pred(si, s, c);
        if !oracle.valid(&lp, &c.rhs)? {
            debug!("target {:?} refuted", cid);
            failed.push((cid, c.tag.clone()));
        }
    }
    let status = if failed.is_empty() {
        FixStatus::Safe
    } else {
        FixStatus::Unsafe(failed)
    };

    // Phase 2: materialise each κ's bind into one conjunction and
    // rename the internal parameter symbols back to the declared ones.
    let mut solution = BTreeMap::new();
    for (k, bind) in s.iter() {
        let p = p_and(bind.iter().map(|q| q.body.clone()).collect());
        solution.insert(k, tidy(rename_params(si, k, p)));
    }

    // Phase 3: per-κ minimisation.
    if cfg.minimal_sol {
        for p in solution.values_mut() {
            *p = minimize(oracle, p)?;
        }
    }

    Ok(FixResult {
        status,
        solution,
        warnings: Vec::new(),
    })
}

/// Replaces the `i`th internal κ parameter with the `i`th originally
/// declared one from the κ's well-formedness parameters.
fn rename_params(si: &SolverInfo, k: KVar, p: Expr) -> Expr {
    let params = match si.wfs.get(&k) {
        Some(params) if !params.is_empty() => params,
        _ => return p,
    };
    let su: Subst = params
        .iter()
        .enumerate()
        .map(|(i, (orig, _))| (kvar_arg(i), Expr::Var(*orig)))
        .collect();
    su.apply(&p)
}

/// Normalises the remaining free variables with `tidy_symbol`.
fn tidy(p: Expr) -> Expr {
    let su: Subst = p
        .free_vars()
        .into_iter()
        .filter_map(|sym| {
            let tidied = tidy_symbol(sym);
            if tidied == sym {
                None
            } else {
                Some((sym, Expr::Var(tidied)))
            }
        })
        .collect();
    if su.is_empty() {
        p
    } else {
        su.apply(&p)
    }
}

/// Drops every conjunct implied by the kept and still-pending ones.
/// Conjuncts are scanned in input order, so of two mutually implying
/// conjuncts exactly one survives. Idempotent under re-minimisation.
pub fn minimize<O: ValidityOracle>(oracle: &mut O, p: &Expr) -> Fallible<Expr> {
    let mut rest = conjuncts(p);
    if rest.len() <= 1 {
        return Ok(p.clone());
    }
    let mut keep: Vec<Expr> = Vec::with_capacity(rest.len());
    while !rest.is_empty() {
        let pi = rest.remove(0);
        let mut context = keep.clone();
        context.extend(rest.iter().cloned());
        if oracle.valid(&p_and(context), &pi)? {
            debug!("minimise: dropping implied conjunct {:?}", pi);
        } else {
            keep.push(pi);
        }
    }
    Ok(p_and(keep))
}
