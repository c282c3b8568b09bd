use crate::expr::Expr;
use crate::{symbol, Sort, Symbol};
use std::collections::{BTreeMap, BTreeSet};
use std::iter::FromIterator;

/// A finite mapping from symbols to expressions, applied by
/// capture-avoiding substitution.
///
/// Stored as a btree map so that iteration (and hence every derived
/// artifact, down to the SMT transcript) is deterministic.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subst {
    map: BTreeMap<Symbol, Expr>,
}

impl Subst {
    pub fn empty() -> Subst {
        Subst::default()
    }

    pub fn singleton(sym: Symbol, e: Expr) -> Subst {
        let mut map = BTreeMap::new();
        map.insert(sym, e);
        Subst { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, sym: Symbol) -> Option<&Expr> {
        self.map.get(&sym)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Expr)> {
        self.map.iter()
    }

    /// Sequential composition: `e[self][other] == e[self.after(other)]`
    /// for every expression `e`. Associative, with `Subst::empty()` as
    /// the identity on both sides.
    pub fn after(&self, other: &Subst) -> Subst {
        let mut map: BTreeMap<Symbol, Expr> = self
            .map
            .iter()
            .map(|(sym, e)| (*sym, other.apply(e)))
            .collect();
        for (sym, e) in &other.map {
            map.entry(*sym).or_insert_with(|| e.clone());
        }
        Subst { map }
    }

    pub fn apply(&self, e: &Expr) -> Expr {
        if self.is_empty() {
            return e.clone();
        }
        match e {
            Expr::Var(s) => match self.map.get(s) {
                Some(image) => image.clone(),
                None => e.clone(),
            },
            Expr::Int(_) | Expr::Bool(_) => e.clone(),
            Expr::Bin(op, a, b) => {
                Expr::Bin(*op, Box::new(self.apply(a)), Box::new(self.apply(b)))
            }
            Expr::App(f, args) => {
                Expr::App(*f, args.iter().map(|a| self.apply(a)).collect())
            }
            Expr::Atom(rel, a, b) => {
                Expr::Atom(*rel, Box::new(self.apply(a)), Box::new(self.apply(b)))
            }
            Expr::And(ps) => Expr::And(ps.iter().map(|p| self.apply(p)).collect()),
            Expr::Or(ps) => Expr::Or(ps.iter().map(|p| self.apply(p)).collect()),
            Expr::Not(p) => Expr::Not(Box::new(self.apply(p))),
            Expr::Imp(p, q) => Expr::Imp(Box::new(self.apply(p)), Box::new(self.apply(q))),
            Expr::Iff(p, q) => Expr::Iff(Box::new(self.apply(p)), Box::new(self.apply(q))),

            // Substitution distributes into the κ's own substitution;
            // the κ node itself survives until the solution expands it.
            Expr::KVar(k, su) => Expr::KVar(*k, su.after(self)),

            Expr::Forall(binders, body) => {
                let (binders, body) = self.apply_under_binders(binders, body);
                Expr::Forall(binders, Box::new(body))
            }
            Expr::Exists(binders, body) => {
                let (binders, body) = self.apply_under_binders(binders, body);
                Expr::Exists(binders, Box::new(body))
            }
        }
    }

    /// Substitution under a quantifier: bindings shadowed by the binders
    /// are dropped, and binders that would capture a free variable of an
    /// incoming image are renamed first.
    fn apply_under_binders(
        &self,
        binders: &[(Symbol, Sort)],
        body: &Expr,
    ) -> (Vec<(Symbol, Sort)>, Expr) {
        let mut inner = Subst {
            map: self
                .map
                .iter()
                .filter(|(sym, _)| !binders.iter().any(|(b, _)| b == *sym))
                .map(|(sym, e)| (*sym, e.clone()))
                .collect(),
        };
        if inner.is_empty() {
            return (binders.to_vec(), body.clone());
        }

        let mut avoid: BTreeSet<Symbol> = inner
            .map
            .values()
            .flat_map(|e| e.free_vars())
            .collect();
        avoid.extend(body.free_vars());

        let mut out = Vec::with_capacity(binders.len());
        for (sym, sort) in binders {
            if avoid.contains(sym) && inner.map.values().any(|e| e.free_vars().contains(sym)) {
                let fresh = fresh_symbol(*sym, &avoid);
                avoid.insert(fresh);
                inner.map.insert(*sym, Expr::Var(fresh));
                out.push((fresh, sort.clone()));
            } else {
                out.push((*sym, sort.clone()));
            }
        }
        (out, inner.apply(body))
    }
}

fn fresh_symbol(base: Symbol, avoid: &BTreeSet<Symbol>) -> Symbol {
    let text = base.to_string();
    let mut n = 0usize;
    loop {
        let candidate = symbol(&format!("{}!{}", text, n));
        if !avoid.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl FromIterator<(Symbol, Expr)> for Subst {
    fn from_iter<I: IntoIterator<Item = (Symbol, Expr)>>(iter: I) -> Subst {
        Subst {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{p_atom, Rel};
    use crate::KVar;

    fn var(name: &str) -> Expr {
        Expr::Var(symbol(name))
    }

    fn ge(a: Expr, b: Expr) -> Expr {
        p_atom(Rel::Ge, a, b)
    }

    #[test]
    fn identity_substitution() {
        let p = ge(var("x"), Expr::Int(0));
        assert_eq!(Subst::empty().apply(&p), p);
    }

    #[test]
    fn composition_agrees_with_sequential_application() {
        let su1 = Subst::singleton(symbol("x"), var("y"));
        let su2 = Subst::singleton(symbol("y"), Expr::Int(3));
        let p = ge(var("x"), var("y"));
        assert_eq!(su2.apply(&su1.apply(&p)), su1.after(&su2).apply(&p));
    }

    #[test]
    fn composition_is_associative() {
        let a = Subst::singleton(symbol("x"), var("y"));
        let b = Subst::singleton(symbol("y"), var("z"));
        let c = Subst::singleton(symbol("z"), Expr::Int(7));
        assert_eq!(a.after(&b).after(&c), a.after(&b.after(&c)));
    }

    #[test]
    fn empty_is_identity_of_composition() {
        let su = Subst::singleton(symbol("x"), Expr::Int(1));
        assert_eq!(su.after(&Subst::empty()), su);
        assert_eq!(Subst::empty().after(&su), su);
    }

    #[test]
    fn substitution_distributes_into_kvars() {
        let k = KVar(symbol("$k0"));
        let inner = Subst::singleton(symbol("a"), var("x"));
        let outer = Subst::singleton(symbol("x"), Expr::Int(2));
        let e = Expr::KVar(k, inner.clone());
        match outer.apply(&e) {
            Expr::KVar(k2, su) => {
                assert_eq!(k2, k);
                assert_eq!(su.get(symbol("a")), Some(&Expr::Int(2)));
            }
            other => panic!("expected a kvar, got {:?}", other),
        }
    }

    #[test]
    fn shadowed_bindings_are_dropped_under_quantifiers() {
        let body = ge(var("x"), Expr::Int(0));
        let q = Expr::Forall(vec![(symbol("x"), Sort::Int)], Box::new(body.clone()));
        let su = Subst::singleton(symbol("x"), Expr::Int(5));
        assert_eq!(su.apply(&q), q);
    }

    #[test]
    fn capturing_binders_are_renamed() {
        // (forall y. x <= y)[x := y]  must not capture the image's y.
        let q = Expr::Forall(
            vec![(symbol("y"), Sort::Int)],
            Box::new(p_atom(Rel::Le, var("x"), var("y"))),
        );
        let su = Subst::singleton(symbol("x"), var("y"));
        match su.apply(&q) {
            Expr::Forall(binders, body) => {
                let fresh = binders[0].0;
                assert_ne!(fresh, symbol("y"));
                assert_eq!(*body, p_atom(Rel::Le, var("y"), Expr::Var(fresh)));
            }
            other => panic!("expected a forall, got {:?}", other),
        }
    }
}
