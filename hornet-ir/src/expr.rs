use crate::subst::Subst;
use crate::{KVar, Sort, Symbol};
use std::collections::BTreeSet;

/// A first-order expression. Propositions and terms share one tree;
/// sorting is the front-end's concern.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    Var(Symbol),
    Int(i64),
    Bool(bool),

    /// Arithmetic.
    Bin(BinOp, Box<Expr>, Box<Expr>),

    /// Uninterpreted application; a zero-argument application is a
    /// constant reference.
    App(Symbol, Vec<Expr>),

    /// Equality, inequality and order atoms.
    Atom(Rel, Box<Expr>, Box<Expr>),

    /// Conjunction is explicitly n-ary; `conjuncts` flattens nesting.
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Imp(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),

    /// An application of the unknown predicate `k` under a substitution
    /// mapping its formal parameters to actual arguments. Never reaches
    /// the solver; the refinement loop expands it first.
    KVar(KVar, Subst),

    Forall(Vec<(Symbol, Sort)>, Box<Expr>),
    Exists(Vec<(Symbol, Sort)>, Box<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rel {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Expr {
    pub fn var(sym: Symbol) -> Expr {
        Expr::Var(sym)
    }

    /// Free variables, excluding quantifier-bound occurrences. For a κ
    /// application the free variables are those of the substitution's
    /// images; the formals in its domain stand for bound parameters.
    pub fn free_vars(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        let mut bound = Vec::new();
        collect_free(self, &mut bound, &mut out);
        out
    }
}

fn collect_free(e: &Expr, bound: &mut Vec<Symbol>, out: &mut BTreeSet<Symbol>) {
    match e {
        Expr::Var(s) => {
            if !bound.contains(s) {
                out.insert(*s);
            }
        }
        Expr::Int(_) | Expr::Bool(_) => {}
        Expr::Bin(_, a, b) | Expr::Atom(_, a, b) | Expr::Imp(a, b) | Expr::Iff(a, b) => {
            collect_free(a, bound, out);
            collect_free(b, bound, out);
        }
        Expr::App(_, args) => {
            for a in args {
                collect_free(a, bound, out);
            }
        }
        Expr::And(ps) | Expr::Or(ps) => {
            for p in ps {
                collect_free(p, bound, out);
            }
        }
        Expr::Not(p) => collect_free(p, bound, out),
        Expr::KVar(_, su) => {
            for (_, image) in su.iter() {
                collect_free(image, bound, out);
            }
        }
        Expr::Forall(binders, body) | Expr::Exists(binders, body) => {
            let depth = bound.len();
            bound.extend(binders.iter().map(|(s, _)| *s));
            collect_free(body, bound, out);
            bound.truncate(depth);
        }
    }
}

/// Flattens nested `And`s into the list of atomic conjuncts, dropping
/// literal `true`s.
pub fn conjuncts(p: &Expr) -> Vec<Expr> {
    let mut out = Vec::new();
    flatten_into(p, &mut out);
    out
}

fn flatten_into(p: &Expr, out: &mut Vec<Expr>) {
    match p {
        Expr::And(ps) => {
            for q in ps {
                flatten_into(q, out);
            }
        }
        Expr::Bool(true) => {}
        _ => out.push(p.clone()),
    }
}

/// Smart n-ary conjunction: flattens, drops `true`, collapses to `false`
/// when any conjunct is literally `false`. The empty conjunction is `true`.
pub fn p_and(ps: Vec<Expr>) -> Expr {
    let mut out = Vec::new();
    for p in &ps {
        flatten_into(p, &mut out);
    }
    if out.iter().any(|p| *p == Expr::Bool(false)) {
        return Expr::Bool(false);
    }
    match out.len() {
        0 => Expr::Bool(true),
        1 => out.pop().unwrap(),
        _ => Expr::And(out),
    }
}

pub fn p_or(ps: Vec<Expr>) -> Expr {
    match ps.len() {
        0 => Expr::Bool(false),
        1 => ps.into_iter().next().unwrap(),
        _ => Expr::Or(ps),
    }
}

pub fn p_not(p: Expr) -> Expr {
    match p {
        Expr::Bool(b) => Expr::Bool(!b),
        Expr::Not(q) => *q,
        _ => Expr::Not(Box::new(p)),
    }
}

pub fn p_imp(p: Expr, q: Expr) -> Expr {
    Expr::Imp(Box::new(p), Box::new(q))
}

pub fn p_iff(p: Expr, q: Expr) -> Expr {
    Expr::Iff(Box::new(p), Box::new(q))
}

pub fn p_atom(rel: Rel, a: Expr, b: Expr) -> Expr {
    Expr::Atom(rel, Box::new(a), Box::new(b))
}

/// All κ applications in `p`, in syntactic order.
pub fn kvars(p: &Expr) -> Vec<(KVar, Subst)> {
    let mut out = Vec::new();
    collect_kvars(p, &mut out);
    out
}

fn collect_kvars(e: &Expr, out: &mut Vec<(KVar, Subst)>) {
    match e {
        Expr::KVar(k, su) => out.push((*k, su.clone())),
        Expr::Var(_) | Expr::Int(_) | Expr::Bool(_) => {}
        Expr::Bin(_, a, b) | Expr::Atom(_, a, b) | Expr::Imp(a, b) | Expr::Iff(a, b) => {
            collect_kvars(a, out);
            collect_kvars(b, out);
        }
        Expr::App(_, args) => {
            for a in args {
                collect_kvars(a, out);
            }
        }
        Expr::And(ps) | Expr::Or(ps) => {
            for p in ps {
                collect_kvars(p, out);
            }
        }
        Expr::Not(p) => collect_kvars(p, out),
        Expr::Forall(_, body) | Expr::Exists(_, body) => collect_kvars(body, out),
    }
}

pub fn contains_kvars(p: &Expr) -> bool {
    match p {
        Expr::KVar(..) => true,
        Expr::Var(_) | Expr::Int(_) | Expr::Bool(_) => false,
        Expr::Bin(_, a, b) | Expr::Atom(_, a, b) | Expr::Imp(a, b) | Expr::Iff(a, b) => {
            contains_kvars(a) || contains_kvars(b)
        }
        Expr::App(_, args) => args.iter().any(contains_kvars),
        Expr::And(ps) | Expr::Or(ps) => ps.iter().any(contains_kvars),
        Expr::Not(p) => contains_kvars(p),
        Expr::Forall(_, body) | Expr::Exists(_, body) => contains_kvars(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol;

    fn x() -> Expr {
        Expr::Var(symbol("x"))
    }

    #[test]
    fn p_and_flattens_nested_conjunctions() {
        let inner = Expr::And(vec![x(), Expr::Bool(true)]);
        let p = p_and(vec![inner, Expr::And(vec![Expr::And(vec![x()])])]);
        assert_eq!(conjuncts(&p), vec![x(), x()]);
    }

    #[test]
    fn p_and_collapses_false() {
        assert_eq!(p_and(vec![x(), Expr::Bool(false)]), Expr::Bool(false));
    }

    #[test]
    fn empty_conjunction_is_true() {
        assert_eq!(p_and(vec![]), Expr::Bool(true));
        assert_eq!(p_and(vec![Expr::Bool(true)]), Expr::Bool(true));
    }

    #[test]
    fn free_vars_skip_bound_occurrences() {
        let y = symbol("y");
        let p = Expr::Forall(
            vec![(y, Sort::Int)],
            Box::new(p_atom(Rel::Le, Expr::Var(y), x())),
        );
        let fvs = p.free_vars();
        assert!(fvs.contains(&symbol("x")));
        assert!(!fvs.contains(&y));
    }
}
