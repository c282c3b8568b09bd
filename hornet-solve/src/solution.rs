use hornet_ir::{p_and, Expr, KVar, Qualifier, SolverInfo};
use std::collections::BTreeMap;
use tracing::debug;

/// The current candidate set for each κ. The predicate denoted by
/// `KVar(k, σ)` is the conjunction of `q[σ]` over the κ's bind; the
/// empty bind therefore denotes `true`.
///
/// The store is a pure value: refinement threads new solutions through
/// the loop instead of mutating in place, which keeps the contraction
/// invariant easy to audit at each step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    binds: BTreeMap<KVar, Vec<Qualifier>>,
}

impl Solution {
    /// The initial solution: every κ of the problem mapped to its full
    /// candidate set. κs the enumerator produced no qualifiers for start
    /// (and stay) at the empty bind, i.e. `true`.
    pub fn init(si: &SolverInfo) -> Solution {
        let binds = si
            .all_kvars()
            .into_iter()
            .map(|k| (k, si.quals.get(&k).cloned().unwrap_or_default()))
            .collect();
        Solution { binds }
    }

    pub fn get(&self, k: KVar) -> &[Qualifier] {
        self.binds.get(&k).map(|qs| qs.as_slice()).unwrap_or(&[])
    }

    pub fn set(&mut self, k: KVar, bind: Vec<Qualifier>) {
        self.binds.insert(k, bind);
    }

    pub fn iter(&self) -> impl Iterator<Item = (KVar, &[Qualifier])> {
        self.binds.iter().map(|(k, qs)| (*k, qs.as_slice()))
    }

    /// Restricts each `k ∈ ks` to exactly the qualifiers paired with it
    /// in `kqs`, preserving the bind's original order. Contracting by
    /// construction: a qualifier not already in the bind cannot enter
    /// it. Returns whether any bind shrank.
    pub fn update(&self, ks: &[KVar], kqs: &[(KVar, Qualifier)]) -> (bool, Solution) {
        let mut next = self.clone();
        let mut changed = false;
        for &k in ks {
            let old = self.get(k);
            let new: Vec<Qualifier> = old
                .iter()
                .filter(|q| kqs.iter().any(|(k2, q2)| *k2 == k && &q2 == q))
                .cloned()
                .collect();
            if new.len() < old.len() {
                debug!("bind of {:?} shrank: {} -> {}", k, old.len(), new.len());
                changed = true;
            }
            next.set(k, new);
        }
        (changed, next)
    }

    /// Expands every κ application in `p` to the conjunction its bind
    /// currently denotes.
    pub fn apply(&self, p: &Expr) -> Expr {
        match p {
            Expr::KVar(k, su) => p_and(
                self.get(*k)
                    .iter()
                    .map(|q| q.instantiate(su))
                    .collect(),
            ),
            Expr::Var(_) | Expr::Int(_) | Expr::Bool(_) => p.clone(),
            Expr::Bin(op, a, b) => {
                Expr::Bin(*op, Box::new(self.apply(a)), Box::new(self.apply(b)))
            }
            Expr::App(f, args) => Expr::App(*f, args.iter().map(|a| self.apply(a)).collect()),
            Expr::Atom(rel, a, b) => {
                Expr::Atom(*rel, Box::new(self.apply(a)), Box::new(self.apply(b)))
            }
            Expr::And(ps) => Expr::And(ps.iter().map(|q| self.apply(q)).collect()),
            Expr::Or(ps) => Expr::Or(ps.iter().map(|q| self.apply(q)).collect()),
            Expr::Not(q) => Expr::Not(Box::new(self.apply(q))),
            Expr::Imp(a, b) => Expr::Imp(Box::new(self.apply(a)), Box::new(self.apply(b))),
            Expr::Iff(a, b) => Expr::Iff(Box::new(self.apply(a)), Box::new(self.apply(b))),
            Expr::Forall(bs, body) => Expr::Forall(bs.clone(), Box::new(self.apply(body))),
            Expr::Exists(bs, body) => Expr::Exists(bs.clone(), Box::new(self.apply(body))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hornet_ir::{kvar_arg, p_atom, symbol, Rel, Sort, Subst};

    fn qual(name: &str, rel: Rel, rhs: i64) -> Qualifier {
        Qualifier {
            name: symbol(name),
            params: vec![(kvar_arg(0), Sort::Int)],
            body: p_atom(rel, Expr::Var(kvar_arg(0)), Expr::Int(rhs)),
        }
    }

    fn k() -> KVar {
        KVar(symbol("$k0"))
    }

    fn sol(quals: Vec<Qualifier>) -> Solution {
        let mut s = Solution {
            binds: BTreeMap::new(),
        };
        s.set(k(), quals);
        s
    }

    #[test]
    fn update_is_contracting() {
        let nat = qual("Nat", Rel::Ge, 0);
        let big = qual("Big", Rel::Ge, 5);
        let s = sol(vec![nat.clone(), big.clone()]);

        let (changed, s2) = s.update(&[k()], &[(k(), nat.clone())]);
        assert!(changed);
        assert_eq!(s2.get(k()), &[nat.clone()][..]);

        // A second identical update is a no-op.
        let (changed, s3) = s2.update(&[k()], &[(k(), nat.clone())]);
        assert!(!changed);
        assert_eq!(s3, s2);

        // Qualifiers outside the bind cannot enter it.
        let (changed, s4) = s3.update(&[k()], &[(k(), nat), (k(), big)]);
        assert!(!changed);
        assert_eq!(s4, s3);
    }

    #[test]
    fn empty_bind_expands_to_true() {
        let s = sol(vec![]);
        let p = Expr::KVar(k(), Subst::empty());
        assert_eq!(s.apply(&p), Expr::Bool(true));
    }

    #[test]
    fn apply_instantiates_under_the_kvar_substitution() {
        let s = sol(vec![qual("Nat", Rel::Ge, 0)]);
        let su = Subst::singleton(kvar_arg(0), Expr::Var(symbol("x")));
        let p = Expr::KVar(k(), su);
        assert_eq!(
            s.apply(&p),
            p_atom(Rel::Ge, Expr::Var(symbol("x")), Expr::Int(0))
        );
    }
}
