//! The fixpoint driver: schedules refinement through the worklist,
//! re-queues dependants on change, and hands the converged solution to
//! the result builder. One SMT session spans the whole solve and is
//! torn down after result construction on every path.

use crate::config::Config;
use crate::errors::SolveError;
use crate::oracle::{SmtOracle, ValidityOracle};
use crate::refine::refine_c;
use crate::result::{self, FixResult, FixStatus};
use crate::solution::Solution;
use crate::stats::Stats;
use crate::worklist::Worklist;
use crate::Externals;
use failure::Fallible;
use hornet_ir::SolverInfo;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Ticks allowed per distinct worklist rank before the driver gives up.
/// Contraction guarantees termination regardless; the cap turns a bug
/// that breaks it into a diagnostic instead of a hang.
const TICK_BUDGET_PER_RANK: usize = 100;

/// Solves with a fresh SMT session and no external collaborators.
pub fn solve(cfg: &Config, si: SolverInfo) -> Fallible<FixResult> {
    solve_with(cfg, si, Externals::default())
}

/// Full entry point: honours `gradual` (whole-solve delegation) and
/// `use_elim` (pre-processing) when the corresponding collaborator is
/// supplied.
pub fn solve_with(cfg: &Config, si: SolverInfo, mut exts: Externals<'_>) -> Fallible<FixResult> {
    if cfg.gradual {
        let gradual = exts.gradual.as_mut().ok_or(SolveError::GradualUnavailable)?;
        return gradual.solve(cfg, &si);
    }

    let mut si = si;
    let mut warnings = Vec::new();
    if cfg.use_elim {
        match exts.eliminator.as_mut() {
            Some(elim) => si = elim.eliminate(si)?,
            None => {
                let note = "use_elim requested but no eliminator was provided; \
                            solving the constraint graph as-is";
                warn!("{}", note);
                warnings.push(note.to_string());
            }
        }
    }

    let mut oracle = SmtOracle::new(cfg, &si)?;
    let result = solve_with_oracle(cfg, &si, &mut oracle);
    match oracle.close() {
        Ok(code) => debug!("solver session closed with exit code {}", code),
        Err(e) => warn!("error closing the solver session: {}", e),
    }
    let mut result = result?;
    warnings.extend(result.warnings.drain(..));
    result.warnings = warnings;
    Ok(result)
}

/// The core loop against an arbitrary oracle. Public so embedders and
/// tests can substitute their own decision procedure.
#[instrument(level = "debug", skip(cfg, si, oracle))]
pub fn solve_with_oracle<O: ValidityOracle>(
    cfg: &Config,
    si: &SolverInfo,
    oracle: &mut O,
) -> Fallible<FixResult> {
    let mut s = Solution::init(si);
    let mut w = Worklist::init(si);
    let mut stats = Stats {
        num_cstr: si.cs.len(),
        ..Stats::default()
    };

    let budget = TICK_BUDGET_PER_RANK * w.w_ranks().max(1);
    let mut ticks = 0usize;
    let mut overflow: Option<String> = None;

    while let Some(popped) = w.pop() {
        ticks += 1;
        if ticks > budget {
            overflow = Some(format!(
                "no fixpoint after {} ticks over {} rank(s)",
                ticks,
                w.w_ranks()
            ));
            break;
        }
        if popped.new_scc {
            stats.num_iter += 1;
        }
        let c = &si.cs[&popped.id];
        let (changed, s2) = refine_c(oracle, si, &s, c, &mut stats)?;
        s = s2;
        if changed {
            let dependants = w.deps(popped.id).to_vec();
            debug!(
                "{:?} changed the solution; re-queueing {} dependant(s)",
                popped.id,
                dependants.len()
            );
            for d in dependants {
                w.push(d);
            }
        }
    }

    if cfg.solver_stats {
        info!("solver stats: {}", stats);
    }

    if let Some(msg) = overflow {
        warn!("aborting: {}", msg);
        return Ok(FixResult {
            status: FixStatus::Crash {
                cs: w.queued_ids(),
                msg,
            },
            solution: BTreeMap::new(),
            warnings: oracle.take_warnings(),
        });
    }

    let mut result = result::build(cfg, si, oracle, &s, &w)?;
    result.warnings.extend(oracle.take_warnings());
    Ok(result)
}
