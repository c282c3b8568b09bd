//! Scheduling of refinement work over the constraint dependency graph.
//! Constraints are visited in increasing SCC rank so dependencies settle
//! before their dependants; re-queued constraints land behind their
//! peers; the queue running dry is exactly the fixpoint.

use hornet_ir::{kvars, ConstraintId, CRank, KVar, SimpC, SolverInfo};
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::debug;

/// Queue entries order by `(rank, generation, id)`: rank drives the
/// SCC schedule, the generation stamp pushes re-inserted constraints
/// behind their peers, the id breaks remaining ties deterministically.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct WorkItem {
    rank: usize,
    time: u64,
    id: ConstraintId,
}

/// What `pop` hands the driver.
#[derive(Copy, Clone, Debug)]
pub struct Popped {
    pub id: ConstraintId,
    /// True the first time a constraint of a new SCC surfaces; the
    /// driver bumps its iteration counter on it.
    pub new_scc: bool,
    pub rank: usize,
}

pub struct Worklist {
    queue: BTreeSet<WorkItem>,
    queued: FxHashSet<ConstraintId>,
    ranks: FxHashMap<ConstraintId, CRank>,
    /// `deps[c]`: constraints whose LHS reads a κ that `c` writes.
    deps: FxHashMap<ConstraintId, Vec<ConstraintId>>,
    /// The refinable (κ-writing) constraints; only these are ever queued.
    refining: FxHashSet<ConstraintId>,
    targets: Vec<ConstraintId>,
    time: u64,
    last_scc: Option<usize>,
    num_ranks: usize,
}

impl Worklist {
    /// Seeds the queue with every refining constraint and derives the
    /// direct dependency edges. The SCC ranks themselves come from the
    /// external dependency analysis via `SolverInfo`; a constraint it
    /// did not rank defaults to the root rank.
    pub fn init(si: &SolverInfo) -> Worklist {
        let mut readers: FxHashMap<KVar, Vec<ConstraintId>> = FxHashMap::default();
        for c in si.cs.values() {
            for k in reads(si, c) {
                readers.entry(k).or_default().push(c.id);
            }
        }

        let mut deps: FxHashMap<ConstraintId, Vec<ConstraintId>> = FxHashMap::default();
        let mut refining: FxHashSet<ConstraintId> = FxHashSet::default();
        let mut targets = Vec::new();
        for c in si.cs.values() {
            let writes = c.writes();
            if writes.is_empty() {
                targets.push(c.id);
                continue;
            }
            refining.insert(c.id);
            let mut dependants: Vec<ConstraintId> = writes
                .iter()
                .flat_map(|k| readers.get(k).into_iter().flatten().copied())
                .collect();
            dependants.sort();
            dependants.dedup();
            deps.insert(c.id, dependants);
        }

        let ranks: FxHashMap<ConstraintId, CRank> = si
            .cs
            .keys()
            .map(|&id| (id, si.ranks.get(&id).copied().unwrap_or(CRank { scc: 0, rank: 0 })))
            .collect();

        let mut w = Worklist {
            queue: BTreeSet::new(),
            queued: FxHashSet::default(),
            ranks,
            deps,
            refining,
            targets,
            time: 0,
            last_scc: None,
            num_ranks: 0,
        };
        for id in w.refining.iter().copied().sorted() {
            w.push(id);
        }
        w.num_ranks = w
            .queue
            .iter()
            .map(|item| item.rank)
            .collect::<BTreeSet<_>>()
            .len();
        debug!(
            "worklist: {} refining, {} target(s), {} rank(s)",
            w.queue.len(),
            w.targets.len(),
            w.num_ranks
        );
        w
    }

    /// The lowest-ranked queued constraint, or `None` at fixpoint.
    pub fn pop(&mut self) -> Option<Popped> {
        let item = *self.queue.iter().next()?;
        self.queue.remove(&item);
        self.queued.remove(&item.id);
        let scc = self.ranks[&item.id].scc;
        let new_scc = self.last_scc != Some(scc);
        self.last_scc = Some(scc);
        Some(Popped {
            id: item.id,
            new_scc,
            rank: item.rank,
        })
    }

    /// Re-queues a refinable constraint. A constraint already queued is
    /// left where it is; a fresh insertion is stamped so it comes after
    /// every peer of its rank, bounding re-visits per round.
    pub fn push(&mut self, id: ConstraintId) {
        if !self.refining.contains(&id) || !self.queued.insert(id) {
            return;
        }
        self.time += 1;
        let rank = self.ranks.get(&id).map(|r| r.rank).unwrap_or(0);
        self.queue.insert(WorkItem {
            rank,
            time: self.time,
            id,
        });
    }

    /// Constraints whose refinement must be propagated when `id`'s
    /// update changed the solution.
    pub fn deps(&self, id: ConstraintId) -> &[ConstraintId] {
        self.deps.get(&id).map(|ds| ds.as_slice()).unwrap_or(&[])
    }

    /// The target constraints; once the queue has drained, all their
    /// ancestors have converged and they are ready for classification.
    pub fn unsat_candidates(&self) -> &[ConstraintId] {
        &self.targets
    }

    /// Everything still queued; used for the overflow diagnostic.
    pub fn queued_ids(&self) -> Vec<ConstraintId> {
        self.queue.iter().map(|item| item.id).collect()
    }

    /// Number of distinct ranks seeded, the driver's iteration-budget
    /// hint.
    pub fn w_ranks(&self) -> usize {
        self.num_ranks
    }
}

fn reads(si: &SolverInfo, c: &SimpC) -> Vec<KVar> {
    let mut ks = c.lhs_reads();
    for &bid in &c.env {
        let (_, sr) = &si.bind_env[bid];
        ks.extend(kvars(&sr.reft).into_iter().map(|(k, _)| k));
    }
    ks.sort();
    ks.dedup();
    ks
}

#[cfg(test)]
mod tests {
    use super::*;
    use hornet_ir::{p_atom, symbol, BindEnv, Expr, Rel, Subst, Tag};
    use std::collections::BTreeMap;

    fn kv(name: &str) -> Expr {
        Expr::KVar(KVar(symbol(name)), Subst::empty())
    }

    fn constraint(id: u32, lhs: Expr, rhs: Expr) -> SimpC {
        let is_target = hornet_ir::kvars(&rhs).is_empty();
        SimpC {
            id: ConstraintId { index: id },
            env: vec![],
            lhs,
            rhs,
            tag: Some(Tag(format!("t{}", id))),
            is_target,
        }
    }

    fn info(cs: Vec<SimpC>, ranks: Vec<(u32, usize, usize)>) -> SolverInfo {
        SolverInfo {
            bind_env: BindEnv::new(),
            cs: cs.into_iter().map(|c| (c.id, c)).collect(),
            consts: BTreeMap::new(),
            wfs: BTreeMap::new(),
            quals: BTreeMap::new(),
            ranks: ranks
                .into_iter()
                .map(|(id, scc, rank)| (ConstraintId { index: id }, CRank { scc, rank }))
                .collect(),
        }
    }

    fn truth() -> Expr {
        Expr::Bool(true)
    }

    #[test]
    fn pops_in_rank_order_and_flags_new_sccs() {
        let si = info(
            vec![
                constraint(0, truth(), kv("$k0")),
                constraint(1, kv("$k0"), kv("$k1")),
                constraint(2, kv("$k1"), kv("$k2")),
            ],
            vec![(2, 2, 2), (0, 0, 0), (1, 1, 1)],
        );
        let mut w = Worklist::init(&si);
        let p0 = w.pop().unwrap();
        let p1 = w.pop().unwrap();
        let p2 = w.pop().unwrap();
        assert_eq!((p0.id.index, p0.new_scc), (0, true));
        assert_eq!((p1.id.index, p1.new_scc), (1, true));
        assert_eq!((p2.id.index, p2.new_scc), (2, true));
        assert!(w.pop().is_none());
    }

    #[test]
    fn requeued_constraints_fall_behind_their_peers() {
        // Two constraints in the same SCC and rank.
        let si = info(
            vec![
                constraint(0, kv("$k1"), kv("$k0")),
                constraint(1, kv("$k0"), kv("$k1")),
            ],
            vec![(0, 0, 0), (1, 0, 0)],
        );
        let mut w = Worklist::init(&si);
        let first = w.pop().unwrap();
        assert_eq!(first.id.index, 0);
        w.push(first.id);
        // The re-pushed constraint comes after its still-queued peer.
        assert_eq!(w.pop().unwrap().id.index, 1);
        assert_eq!(w.pop().unwrap().id.index, 0);
        assert!(w.pop().is_none());
    }

    #[test]
    fn same_scc_pops_do_not_bump_the_iteration_flag() {
        let si = info(
            vec![
                constraint(0, kv("$k1"), kv("$k0")),
                constraint(1, kv("$k0"), kv("$k1")),
            ],
            vec![(0, 7, 0), (1, 7, 0)],
        );
        let mut w = Worklist::init(&si);
        assert!(w.pop().unwrap().new_scc);
        assert!(!w.pop().unwrap().new_scc);
    }

    #[test]
    fn targets_are_never_queued_but_are_unsat_candidates() {
        let target = constraint(3, kv("$k0"), p_atom(Rel::Ge, Expr::Var(symbol("x")), Expr::Int(0)));
        assert!(target.is_target);
        let si = info(
            vec![constraint(0, truth(), kv("$k0")), target],
            vec![(0, 0, 0), (3, 1, 1)],
        );
        let mut w = Worklist::init(&si);
        assert_eq!(w.unsat_candidates(), &[ConstraintId { index: 3 }][..]);
        assert_eq!(w.pop().unwrap().id.index, 0);
        assert!(w.pop().is_none());
        // Dependants of the refining constraint include the target, but
        // pushing it is a no-op.
        w.push(ConstraintId { index: 3 });
        assert!(w.pop().is_none());
    }

    #[test]
    fn dependency_edges_connect_writers_to_readers() {
        let si = info(
            vec![
                constraint(0, truth(), kv("$k0")),
                constraint(1, kv("$k0"), kv("$k1")),
            ],
            vec![(0, 0, 0), (1, 1, 1)],
        );
        let w = Worklist::init(&si);
        assert_eq!(w.deps(ConstraintId { index: 0 }), &[ConstraintId { index: 1 }][..]);
        assert!(w.deps(ConstraintId { index: 1 }).is_empty());
    }
}
