//! The narrow seam between the fixpoint logic and the SMT session.
//! Everything the refiner, the result builder and the minimiser know
//! about the solver is `filter_valid` and the `valid` convenience built
//! on it.

use crate::config::Config;
use failure::Fallible;
use hornet_ir::{p_not, Expr, SolverInfo, Sort, Symbol};
use hornet_smt::{SatResult, SmtSession};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use tracing::debug;

pub trait ValidityOracle {
    /// Of the given `(predicate, tag)` candidates, returns the tags of
    /// those where `lhs ⇒ predicate` is valid.
    fn filter_valid<T: Clone>(&mut self, lhs: &Expr, cands: &[(Expr, T)]) -> Fallible<Vec<T>>;

    /// `p ⇒ q` validity, as a degenerate single-candidate filter.
    fn valid(&mut self, p: &Expr, q: &Expr) -> Fallible<bool> {
        Ok(!self.filter_valid(p, &[(q.clone(), ())])?.is_empty())
    }

    /// Non-fatal notes accumulated while answering queries.
    fn take_warnings(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// The production oracle: one SMT session per solve, with every symbol
/// of the problem declared up front so that brackets only ever push
/// assertions.
pub struct SmtOracle {
    session: SmtSession,
    declared: FxHashSet<Symbol>,
    warnings: Vec<String>,
}

impl SmtOracle {
    pub fn new(cfg: &Config, si: &SolverInfo) -> Fallible<SmtOracle> {
        let session = SmtSession::new(cfg.solver, cfg.smt_log_file(), cfg.smt_opts())?;
        let mut oracle = SmtOracle {
            session,
            declared: FxHashSet::default(),
            warnings: Vec::new(),
        };
        oracle.declare_problem(si)?;
        Ok(oracle)
    }

    /// Declares, in a fixed order: the uninterpreted object sorts, the
    /// constants, the binding-environment symbols, and the originally
    /// declared κ parameters (the result builder reports solutions over
    /// the latter, and minimisation queries them).
    fn declare_problem(&mut self, si: &SolverInfo) -> Fallible<()> {
        let mut obj_sorts: BTreeSet<Symbol> = BTreeSet::new();
        for sort in si.consts.values() {
            collect_obj_sorts(sort, &mut obj_sorts);
        }
        for (_, (_, sr)) in si.bind_env.iter() {
            collect_obj_sorts(&sr.sort, &mut obj_sorts);
        }
        for params in si.wfs.values() {
            for (_, sort) in params {
                collect_obj_sorts(sort, &mut obj_sorts);
            }
        }
        for sym in obj_sorts {
            self.session.declare_sort(sym)?;
        }

        let consts: Vec<(Symbol, Sort)> =
            si.consts.iter().map(|(s, sort)| (*s, sort.clone())).collect();
        for (sym, sort) in consts {
            self.declare_symbol(sym, &sort)?;
        }
        let binders: Vec<(Symbol, Sort)> = si
            .bind_env
            .iter()
            .map(|(_, (sym, sr))| (*sym, sr.sort.clone()))
            .collect();
        for (sym, sort) in binders {
            self.declare_symbol(sym, &sort)?;
        }
        let params: Vec<(Symbol, Sort)> = si
            .wfs
            .values()
            .flat_map(|ps| ps.iter().cloned())
            .collect();
        for (sym, sort) in params {
            self.declare_symbol(sym, &sort)?;
        }
        debug!("declared {} symbol(s)", self.declared.len());
        Ok(())
    }

    fn declare_symbol(&mut self, sym: Symbol, sort: &Sort) -> Fallible<()> {
        if !self.declared.insert(sym) {
            return Ok(());
        }
        match sort.as_func() {
            Some((args, ret)) => self.session.declare(sym, args.to_vec(), ret.clone()),
            None => self.session.declare(sym, vec![], sort.clone()),
        }
    }

    /// Tears the session down, returning the subprocess exit code.
    pub fn close(self) -> Fallible<i32> {
        self.session.close()
    }
}

impl ValidityOracle for SmtOracle {
    /// One bracket for the whole candidate batch: push, assert the LHS
    /// once, then check each negated candidate in its own inner scope.
    /// The outer pop discards everything.
    fn filter_valid<T: Clone>(&mut self, lhs: &Expr, cands: &[(Expr, T)]) -> Fallible<Vec<T>> {
        let mut unknowns = 0usize;
        let valid = self.session.bracket("filter-valid", |smt| {
            smt.assert_pred(lhs)?;
            let mut valid = Vec::with_capacity(cands.len());
            for (p, tag) in cands {
                let answer = smt.bracket("candidate", |smt| {
                    smt.assert_pred(&p_not(p.clone()))?;
                    smt.check_sat()
                })?;
                match answer {
                    SatResult::Unsat => valid.push(tag.clone()),
                    SatResult::Sat => {}
                    SatResult::Unknown => unknowns += 1,
                }
            }
            Ok(valid)
        })?;
        if unknowns > 0 {
            self.warnings
                .push(format!("solver replied unknown for {} candidate(s)", unknowns));
        }
        Ok(valid)
    }

    fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

fn collect_obj_sorts(sort: &Sort, out: &mut BTreeSet<Symbol>) {
    match sort {
        Sort::Obj(sym) => {
            out.insert(*sym);
        }
        Sort::Func(args, ret) => {
            for a in args {
                collect_obj_sorts(a, out);
            }
            collect_obj_sorts(ret, out);
        }
        _ => {}
    }
}
