use lalrpop_intern::InternedString;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

pub mod debug;

mod expr;
mod subst;

pub use crate::expr::{
    conjuncts, contains_kvars, kvars, p_and, p_atom, p_iff, p_imp, p_not, p_or, BinOp, Expr, Rel,
};
pub use crate::subst::Subst;

/// A textual identifier with a cheap, hashable identity.
pub type Symbol = InternedString;

pub fn symbol(text: &str) -> Symbol {
    lalrpop_intern::intern(text)
}

/// The distinguished value variable that binding-environment refinements
/// range over. A binder `x : {VV : int | VV >= 0}` contributes the
/// predicate `x >= 0` once `VV` is instantiated to `x`.
pub fn vv() -> Symbol {
    symbol("VV")
}

/// The internal name of the `i`th formal parameter of a κ-variable.
/// Qualifier bodies and the substitutions carried by `Expr::KVar` are
/// expressed over these; they are renamed back to the originals declared
/// by the well-formedness parameters when a solution is reported.
pub fn kvar_arg(i: usize) -> Symbol {
    symbol(&format!("kVarArg${}", i))
}

/// Strips the `##n` uniqueness suffix that the front-end appends when it
/// freshens a program variable. Identity on symbols without a suffix.
pub fn tidy_symbol(sym: Symbol) -> Symbol {
    let text = sym.to_string();
    match text.find("##") {
        Some(ix) => symbol(&text[..ix]),
        None => sym,
    }
}

/// A first-order sort. Functional sorts decompose into their argument
/// sorts and return sort.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    Int,
    Bool,
    Real,
    Str,

    /// An uninterpreted object sort, declared to the solver by name.
    Obj(Symbol),

    Func(Vec<Sort>, Box<Sort>),
}

impl Sort {
    pub fn func(args: Vec<Sort>, ret: Sort) -> Sort {
        Sort::Func(args, Box::new(ret))
    }

    /// If this is a functional sort, returns `Some((args, ret))` else `None`.
    pub fn as_func(&self) -> Option<(&[Sort], &Sort)> {
        match self {
            Sort::Func(args, ret) => Some((args, ret)),
            _ => None,
        }
    }
}

/// An unknown refinement predicate variable. The set of κs in a problem
/// is finite and known up front.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KVar(pub Symbol);

/// A user-supplied label carried by a constraint; reported back verbatim
/// when the constraint is refuted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub String);

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId {
    pub index: u32,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindId {
    pub index: usize,
}

/// A sort together with a refinement over the value variable `VV`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortedReft {
    pub sort: Sort,
    pub reft: Expr,
}

impl SortedReft {
    pub fn trivial(sort: Sort) -> SortedReft {
        SortedReft {
            sort,
            reft: Expr::Bool(true),
        }
    }
}

/// A persistent, indexed table of `(symbol, sorted refinement)` binders
/// shared across constraints; constraints carry only index lists into it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindEnv {
    binds: Vec<(Symbol, SortedReft)>,
}

impl BindEnv {
    pub fn new() -> BindEnv {
        BindEnv::default()
    }

    pub fn insert(&mut self, sym: Symbol, sr: SortedReft) -> BindId {
        let id = BindId {
            index: self.binds.len(),
        };
        self.binds.push((sym, sr));
        id
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindId, &(Symbol, SortedReft))> {
        self.binds
            .iter()
            .enumerate()
            .map(|(index, bind)| (BindId { index }, bind))
    }
}

impl Index<BindId> for BindEnv {
    type Output = (Symbol, SortedReft);

    fn index(&self, id: BindId) -> &(Symbol, SortedReft) {
        &self.binds[id.index]
    }
}

/// A closed, parameterised predicate template. Instantiating `params`
/// under the substitution carried by a κ application yields a concrete
/// predicate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    pub name: Symbol,
    pub params: Vec<(Symbol, Sort)>,
    pub body: Expr,
}

impl Qualifier {
    pub fn instantiate(&self, su: &Subst) -> Expr {
        su.apply(&self.body)
    }
}

/// Topological position of a constraint in the SCC graph built by the
/// (external) dependency analysis. Lower ranks are solved first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CRank {
    /// Identifies the strongly connected component.
    pub scc: usize,
    /// Topological rank of that component.
    pub rank: usize,
}

/// A simple Horn implication constraint `Γ ⊢ lhs ⇒ rhs`.
///
/// The RHS is syntactically either a conjunction of κ applications (a
/// refining constraint) or a concrete proposition (a target constraint,
/// whose refutation produces a user-visible error).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpC {
    pub id: ConstraintId,
    pub env: Vec<BindId>,
    pub lhs: Expr,
    pub rhs: Expr,
    pub tag: Option<Tag>,
    pub is_target: bool,
}

impl SimpC {
    /// κ variables this constraint can constrain (those applied on its RHS).
    pub fn writes(&self) -> Vec<KVar> {
        kvars(&self.rhs).into_iter().map(|(k, _)| k).collect()
    }

    /// κ variables whose current bind flows into this constraint's LHS.
    /// Environment refinements are folded in by the caller, which owns
    /// the bind environment.
    pub fn lhs_reads(&self) -> Vec<KVar> {
        kvars(&self.lhs).into_iter().map(|(k, _)| k).collect()
    }
}

/// The typed input interface produced by the out-of-scope front-end:
/// everything the fixpoint core needs to solve one problem.
#[derive(Clone, Debug, Default)]
pub struct SolverInfo {
    pub bind_env: BindEnv,
    pub cs: BTreeMap<ConstraintId, SimpC>,

    /// Uninterpreted constants and functions, declared to the solver at
    /// session start.
    pub consts: BTreeMap<Symbol, Sort>,

    /// Well-formedness parameters per κ: the originally declared argument
    /// names and sorts, in κ-argument order.
    pub wfs: BTreeMap<KVar, Vec<(Symbol, Sort)>>,

    /// Initial qualifier candidates per κ, from the external enumerator.
    pub quals: BTreeMap<KVar, Vec<Qualifier>>,

    /// SCC ranks per constraint, from the external dependency analysis.
    pub ranks: BTreeMap<ConstraintId, CRank>,
}

impl SolverInfo {
    /// Every κ mentioned anywhere in the problem. The solution's key set
    /// must equal this set.
    pub fn all_kvars(&self) -> BTreeSet<KVar> {
        let mut out: BTreeSet<KVar> = BTreeSet::new();
        for c in self.cs.values() {
            out.extend(kvars(&c.lhs).into_iter().map(|(k, _)| k));
            out.extend(kvars(&c.rhs).into_iter().map(|(k, _)| k));
        }
        for (_, (_, sr)) in self.bind_env.iter() {
            out.extend(kvars(&sr.reft).into_iter().map(|(k, _)| k));
        }
        out.extend(self.wfs.keys().copied());
        out.extend(self.quals.keys().copied());
        out
    }

    pub fn targets(&self) -> impl Iterator<Item = &SimpC> {
        self.cs.values().filter(|c| c.is_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_strips_the_uniqueness_suffix() {
        assert_eq!(tidy_symbol(symbol("xs##4")), symbol("xs"));
        assert_eq!(tidy_symbol(symbol("xs")), symbol("xs"));
    }

    #[test]
    fn kvar_args_are_stable() {
        assert_eq!(kvar_arg(0), symbol("kVarArg$0"));
        assert_eq!(kvar_arg(3), kvar_arg(3));
    }

    #[test]
    fn bind_env_indexes_in_insertion_order() {
        let mut env = BindEnv::new();
        let a = env.insert(symbol("a"), SortedReft::trivial(Sort::Int));
        let b = env.insert(symbol("b"), SortedReft::trivial(Sort::Bool));
        assert_eq!(env[a].0, symbol("a"));
        assert_eq!(env[b].0, symbol("b"));
        assert_eq!(env.iter().count(), 2);
    }
}
