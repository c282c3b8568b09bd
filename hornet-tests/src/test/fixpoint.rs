use crate::test_util::*;
use hornet_ir::{vv, Expr, Rel, Sort};
use hornet_solve::refine::{lhs_pred, rhs_cands};
use hornet_solve::solution::Solution;
use hornet_solve::{solve_with_oracle, Config, FixStatus};

#[test]
fn trivial_safe() {
    // x >= 0  =>  x >= -1, no κ anywhere.
    let mut b = ProblemBuilder::new();
    let x = b.bind("x", Sort::Int, Expr::Bool(true));
    b.constraint(&[x], ge(var("x"), int(0)), ge(var("x"), int(-1)));
    let si = b.build();

    let result = solve_with_oracle(&Config::default(), &si, &mut GridOracle::new()).unwrap();
    assert_eq!(result.status, FixStatus::Safe);
    assert!(result.solution.is_empty());
}

#[test]
fn trivial_unsafe() {
    // x = 0  =>  x > 0 is refuted, and the constraint's tag comes back.
    let mut b = ProblemBuilder::new();
    let x = b.bind("x", Sort::Int, Expr::Bool(true));
    let cid = b.constraint(&[x], eq(var("x"), int(0)), gt(var("x"), int(0)));
    let si = b.build();

    let result = solve_with_oracle(&Config::default(), &si, &mut GridOracle::new()).unwrap();
    match result.status {
        FixStatus::Unsafe(cs) => {
            assert_eq!(cs.len(), 1);
            assert_eq!(cs[0].0, cid);
            assert_eq!(cs[0].1.as_ref().unwrap().0, "tag0");
        }
        other => panic!("expected unsafe, got {:?}", other),
    }
}

#[test]
fn single_kvar_single_qualifier() {
    // v:{v >= 0} ⊢ true => κ(v)   and   v ⊢ κ(v) => v >= 0.
    let k = kv("$k0");
    let mut b = ProblemBuilder::new();
    b.wf(k, &[("v", Sort::Int)]);
    b.quals(k, vec![qual1("Nat", Rel::Ge, 0)]);
    let refined = b.bind("v", Sort::Int, ge(Expr::Var(vv()), int(0)));
    let plain = b.bind("v", Sort::Int, Expr::Bool(true));
    b.constraint(&[refined], Expr::Bool(true), kapp(k, &[var("v")]));
    b.constraint(&[plain], kapp(k, &[var("v")]), ge(var("v"), int(0)));
    let si = b.build();

    let result = solve_with_oracle(&Config::default(), &si, &mut GridOracle::new()).unwrap();
    assert_eq!(result.status, FixStatus::Safe);
    assert_eq!(result.solution[&k], ge(var("v"), int(0)));
}

#[test]
fn kvar_pruning() {
    // v = 2 => κ(v) keeps v >= 0 and drops v >= 5.
    let k = kv("$k0");
    let mut b = ProblemBuilder::new();
    b.wf(k, &[("v", Sort::Int)]);
    b.quals(k, vec![qual1("Nat", Rel::Ge, 0), qual1("Big", Rel::Ge, 5)]);
    let plain = b.bind("v", Sort::Int, Expr::Bool(true));
    b.constraint(&[plain], eq(var("v"), int(2)), kapp(k, &[var("v")]));
    let si = b.build();

    let result = solve_with_oracle(&Config::default(), &si, &mut GridOracle::new()).unwrap();
    assert_eq!(result.status, FixStatus::Safe);
    assert_eq!(result.solution[&k], ge(var("v"), int(0)));
}

#[test]
fn cyclic_scc_retains_both_qualifiers() {
    // κ1 => κ2 and κ2 => κ1 in one SCC; both keep {v >= 0, v <= 10}.
    let k1 = kv("$k1");
    let k2 = kv("$k2");
    let mut b = ProblemBuilder::new();
    for &k in &[k1, k2] {
        b.wf(k, &[("v", Sort::Int)]);
        b.quals(k, vec![qual1("Nat", Rel::Ge, 0), qual1("Le10", Rel::Le, 10)]);
    }
    let plain = b.bind("v", Sort::Int, Expr::Bool(true));
    let c0 = b.constraint(&[plain], kapp(k1, &[var("v")]), kapp(k2, &[var("v")]));
    let c1 = b.constraint(&[plain], kapp(k2, &[var("v")]), kapp(k1, &[var("v")]));
    b.set_rank(c0, 0, 0);
    b.set_rank(c1, 0, 0);
    let si = b.build();

    let result = solve_with_oracle(&Config::default(), &si, &mut GridOracle::new()).unwrap();
    assert_eq!(result.status, FixStatus::Safe);
    let expected = Expr::And(vec![ge(var("v"), int(0)), le(var("v"), int(10))]);
    assert_eq!(result.solution[&k1], expected);
    assert_eq!(result.solution[&k2], expected);
}

#[test]
fn refinement_is_monotone() {
    // A refinement step can only shrink a bind, never grow it.
    let k = kv("$k0");
    let mut b = ProblemBuilder::new();
    b.wf(k, &[("v", Sort::Int)]);
    b.quals(k, vec![qual1("Nat", Rel::Ge, 0), qual1("Big", Rel::Ge, 5)]);
    let plain = b.bind("v", Sort::Int, Expr::Bool(true));
    let cid = b.constraint(&[plain], eq(var("v"), int(2)), kapp(k, &[var("v")]));
    let si = b.build();

    let s = Solution::init(&si);
    let before: Vec<_> = s.get(k).to_vec();
    let mut stats = hornet_solve::Stats::default();
    let (changed, s2) = hornet_solve::refine::refine_c(
        &mut GridOracle::new(),
        &si,
        &s,
        &si.cs[&cid],
        &mut stats,
    )
    .unwrap();
    assert!(changed);
    for q in s2.get(k) {
        assert!(before.contains(q), "bind gained a qualifier: {:?}", q);
    }
    assert!(s2.get(k).len() < before.len());
}

#[test]
fn closure_holds_at_fixpoint() {
    // After convergence, every constraint's LHS implies each candidate
    // its κs retain.
    let k1 = kv("$k1");
    let k2 = kv("$k2");
    let mut b = ProblemBuilder::new();
    for &k in &[k1, k2] {
        b.wf(k, &[("v", Sort::Int)]);
        b.quals(k, vec![qual1("Nat", Rel::Ge, 0), qual1("Le10", Rel::Le, 10)]);
    }
    let plain = b.bind("v", Sort::Int, Expr::Bool(true));
    b.constraint(&[plain], ge(var("v"), int(0)), kapp(k1, &[var("v")]));
    b.constraint(&[plain], kapp(k1, &[var("v")]), kapp(k2, &[var("v")]));
    let si = b.build();

    let mut oracle = GridOracle::new();
    let result = solve_with_oracle(&Config::default(), &si, &mut oracle).unwrap();
    assert_eq!(result.status, FixStatus::Safe);

    // Re-derive the fixpoint solution and check the closure property.
    let mut s = Solution::init(&si);
    let mut stats = hornet_solve::Stats::default();
    for _ in 0..4 {
        for c in si.cs.values() {
            let (_, s2) = hornet_solve::refine::refine_c(&mut oracle, &si, &s, c, &mut stats).unwrap();
            s = s2;
        }
    }
    for c in si.cs.values() {
        let lhs = lhs_pred(&si, &s, c);
        let (_, cands) = rhs_cands(&s, c);
        for (p, _) in cands {
            assert!(oracle.implies(&lhs, &p), "{:?} not implied by {:?}", p, lhs);
        }
    }
}

#[test]
fn solving_is_deterministic() {
    let build = || {
        let k = kv("$k0");
        let mut b = ProblemBuilder::new();
        b.wf(k, &[("v", Sort::Int)]);
        b.quals(k, vec![qual1("Nat", Rel::Ge, 0), qual1("Big", Rel::Ge, 5)]);
        let plain = b.bind("v", Sort::Int, Expr::Bool(true));
        b.constraint(&[plain], eq(var("v"), int(2)), kapp(k, &[var("v")]));
        b.constraint(&[plain], kapp(k, &[var("v")]), ge(var("v"), int(-3)));
        b.build()
    };
    let first = solve_with_oracle(&Config::default(), &build(), &mut GridOracle::new()).unwrap();
    let second = solve_with_oracle(&Config::default(), &build(), &mut GridOracle::new()).unwrap();
    assert_same_rendering(&format!("{:#?}", first), &format!("{:#?}", second));
}
