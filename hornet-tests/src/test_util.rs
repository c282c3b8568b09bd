#![cfg(test)]

use failure::Fallible;
use hornet_ir::{
    kvar_arg, kvars, p_atom, symbol, BindEnv, BindId, ConstraintId, CRank, Expr, KVar, Qualifier,
    Rel, SimpC, SolverInfo, Sort, SortedReft, Subst, Symbol, Tag,
};
use hornet_solve::ValidityOracle;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

pub(crate) fn var(name: &str) -> Expr {
    Expr::Var(symbol(name))
}

pub(crate) fn int(n: i64) -> Expr {
    Expr::Int(n)
}

pub(crate) fn ge(a: Expr, b: Expr) -> Expr {
    p_atom(Rel::Ge, a, b)
}

pub(crate) fn gt(a: Expr, b: Expr) -> Expr {
    p_atom(Rel::Gt, a, b)
}

pub(crate) fn le(a: Expr, b: Expr) -> Expr {
    p_atom(Rel::Le, a, b)
}

pub(crate) fn eq(a: Expr, b: Expr) -> Expr {
    p_atom(Rel::Eq, a, b)
}

pub(crate) fn kv(name: &str) -> KVar {
    KVar(symbol(name))
}

/// `k(e0, e1, ...)`: the κ applied with its `i`th formal mapped to the
/// `i`th actual.
pub(crate) fn kapp(k: KVar, actuals: &[Expr]) -> Expr {
    let su: Subst = actuals
        .iter()
        .enumerate()
        .map(|(i, e)| (kvar_arg(i), e.clone()))
        .collect();
    Expr::KVar(k, su)
}

/// A single-parameter qualifier `name: kVarArg$0 <rel> n`.
pub(crate) fn qual1(name: &str, rel: Rel, n: i64) -> Qualifier {
    Qualifier {
        name: symbol(name),
        params: vec![(kvar_arg(0), Sort::Int)],
        body: p_atom(rel, Expr::Var(kvar_arg(0)), Expr::Int(n)),
    }
}

pub(crate) struct ProblemBuilder {
    bind_env: BindEnv,
    cs: BTreeMap<ConstraintId, SimpC>,
    consts: BTreeMap<Symbol, Sort>,
    wfs: BTreeMap<KVar, Vec<(Symbol, Sort)>>,
    quals: BTreeMap<KVar, Vec<Qualifier>>,
    ranks: BTreeMap<ConstraintId, CRank>,
    next: u32,
}

impl ProblemBuilder {
    pub(crate) fn new() -> ProblemBuilder {
        ProblemBuilder {
            bind_env: BindEnv::new(),
            cs: BTreeMap::new(),
            consts: BTreeMap::new(),
            wfs: BTreeMap::new(),
            quals: BTreeMap::new(),
            ranks: BTreeMap::new(),
            next: 0,
        }
    }

    pub(crate) fn bind(&mut self, name: &str, sort: Sort, reft: Expr) -> BindId {
        self.bind_env.insert(symbol(name), SortedReft { sort, reft })
    }

    /// Adds a constraint; targetness follows from the RHS shape, the
    /// tag and rank default from the id (one singleton SCC each, in
    /// insertion order).
    pub(crate) fn constraint(&mut self, env: &[BindId], lhs: Expr, rhs: Expr) -> ConstraintId {
        let id = ConstraintId { index: self.next };
        self.next += 1;
        let is_target = kvars(&rhs).is_empty();
        self.cs.insert(
            id,
            SimpC {
                id,
                env: env.to_vec(),
                lhs,
                rhs,
                tag: Some(Tag(format!("tag{}", id.index))),
                is_target,
            },
        );
        self.ranks.insert(
            id,
            CRank {
                scc: id.index as usize,
                rank: id.index as usize,
            },
        );
        id
    }

    pub(crate) fn set_rank(&mut self, id: ConstraintId, scc: usize, rank: usize) {
        self.ranks.insert(id, CRank { scc, rank });
    }

    pub(crate) fn wf(&mut self, k: KVar, params: &[(&str, Sort)]) {
        self.wfs.insert(
            k,
            params
                .iter()
                .map(|(name, sort)| (symbol(name), sort.clone()))
                .collect(),
        );
    }

    pub(crate) fn quals(&mut self, k: KVar, qs: Vec<Qualifier>) {
        self.quals.insert(k, qs);
    }

    pub(crate) fn build(self) -> SolverInfo {
        SolverInfo {
            bind_env: self.bind_env,
            cs: self.cs,
            consts: self.consts,
            wfs: self.wfs,
            quals: self.quals,
            ranks: self.ranks,
        }
    }
}

/// Decides `lhs ⇒ rhs` by exhaustive evaluation of every free variable
/// over a bounded integer domain. Exact for the scenario constraints,
/// which only mention small constants, and deterministic by
/// construction.
pub(crate) struct GridOracle {
    lo: i64,
    hi: i64,
}

impl GridOracle {
    pub(crate) fn new() -> GridOracle {
        GridOracle { lo: -8, hi: 8 }
    }

    pub(crate) fn implies(&self, lhs: &Expr, rhs: &Expr) -> bool {
        let mut vars: BTreeSet<Symbol> = lhs.free_vars();
        vars.extend(rhs.free_vars());
        let vars: Vec<Symbol> = vars.into_iter().collect();
        if vars.is_empty() {
            let env = BTreeMap::new();
            return !eval_bool(lhs, &env) || eval_bool(rhs, &env);
        }
        for values in vars.iter().map(|_| self.lo..=self.hi).multi_cartesian_product() {
            let env: BTreeMap<Symbol, i64> = vars.iter().copied().zip(values).collect();
            if eval_bool(lhs, &env) && !eval_bool(rhs, &env) {
                return false;
            }
        }
        true
    }
}

impl ValidityOracle for GridOracle {
    fn filter_valid<T: Clone>(&mut self, lhs: &Expr, cands: &[(Expr, T)]) -> Fallible<Vec<T>> {
        Ok(cands
            .iter()
            .filter(|(p, _)| self.implies(lhs, p))
            .map(|(_, tag)| tag.clone())
            .collect())
    }
}

fn eval_bool(e: &Expr, env: &BTreeMap<Symbol, i64>) -> bool {
    match e {
        Expr::Bool(b) => *b,
        Expr::And(ps) => ps.iter().all(|p| eval_bool(p, env)),
        Expr::Or(ps) => ps.iter().any(|p| eval_bool(p, env)),
        Expr::Not(p) => !eval_bool(p, env),
        Expr::Imp(p, q) => !eval_bool(p, env) || eval_bool(q, env),
        Expr::Iff(p, q) => eval_bool(p, env) == eval_bool(q, env),
        Expr::Atom(rel, a, b) => {
            let a = eval_int(a, env);
            let b = eval_int(b, env);
            match rel {
                Rel::Eq => a == b,
                Rel::Ne => a != b,
                Rel::Gt => a > b,
                Rel::Ge => a >= b,
                Rel::Lt => a < b,
                Rel::Le => a <= b,
            }
        }
        other => panic!("grid oracle cannot evaluate {:?} as a proposition", other),
    }
}

fn eval_int(e: &Expr, env: &BTreeMap<Symbol, i64>) -> i64 {
    match e {
        Expr::Int(n) => *n,
        Expr::Var(s) => *env
            .get(s)
            .unwrap_or_else(|| panic!("unbound variable {} in grid oracle", s)),
        Expr::Bin(op, a, b) => {
            let a = eval_int(a, env);
            let b = eval_int(b, env);
            match op {
                hornet_ir::BinOp::Plus => a + b,
                hornet_ir::BinOp::Minus => a - b,
                hornet_ir::BinOp::Times => a * b,
                hornet_ir::BinOp::Div => a / b,
                hornet_ir::BinOp::Mod => a % b,
            }
        }
        other => panic!("grid oracle cannot evaluate {:?} as a term", other),
    }
}

/// Asserts two renderings are identical, printing a line diff when they
/// are not.
pub(crate) fn assert_same_rendering(expected: &str, actual: &str) {
    if expected == actual {
        return;
    }

    let mut rendered = String::new();
    for result in diff::lines(expected, actual) {
        let (prefix, line) = match result {
            diff::Result::Both(l, _) => ("  ", l),
            diff::Result::Left(l) => ("- ", l),
            diff::Result::Right(l) => ("+ ", l),
        };
        writeln!(&mut rendered, "{}{}", prefix, line).unwrap();
    }
    panic!("renderings differ:\n{}", rendered);
}
