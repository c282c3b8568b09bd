//! A long-lived conversation with one solver subprocess. Commands are
//! serialised to single SMT-LIB2 lines and flushed eagerly; exactly one
//! response is read for `check-sat` and `get-value`, every other command
//! is acknowledged implicitly.

use crate::parse::{parse_response, Response};
use crate::smt2::{smt2, Command};
use crate::SmtError;
use failure::Fallible;
use hornet_ir::{Expr, Sort, Symbol};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SmtSolver {
    Z3,
    Mathsat,
    Cvc4,
}

impl SmtSolver {
    fn spawn(self) -> std::io::Result<Child> {
        let mut cmd = match self {
            SmtSolver::Z3 => {
                let mut c = std::process::Command::new("z3");
                c.args(&["-smt2", "-in"]);
                c
            }
            SmtSolver::Mathsat => {
                let mut c = std::process::Command::new("mathsat");
                c.arg("-input=smt2");
                c
            }
            SmtSolver::Cvc4 => {
                let mut c = std::process::Command::new("cvc4");
                c.args(&["--incremental", "-L", "smtlib2"]);
                c
            }
        };
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
    }
}

impl std::fmt::Display for SmtSolver {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSolver::Z3 => write!(fmt, "z3"),
            SmtSolver::Mathsat => write!(fmt, "mathsat"),
            SmtSolver::Cvc4 => write!(fmt, "cvc4"),
        }
    }
}

/// Session behaviour toggles. The normalisation flags are not consumed
/// here; they are surfaced on the session for downstream passes that
/// share its lifetime.
#[derive(Copy, Clone, Debug, Default)]
pub struct SmtOpts {
    /// When false, model-based quantifier instantiation is disabled in
    /// the Z3 preamble.
    pub extensionality: bool,
    /// Requires Z3 of at least 4.4.2.
    pub string_theory: bool,
    pub alpha_equivalence: bool,
    pub beta_equivalence: bool,
    pub normal_form: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

pub struct SmtSession {
    solver: SmtSolver,
    pub opts: SmtOpts,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    log: Option<BufWriter<File>>,
    /// Dot-split version components, queried from Z3 at startup.
    version: Option<Vec<u32>>,
    closed: bool,
}

impl SmtSession {
    /// Spawns the solver, probes its version (Z3) and emits the option
    /// preamble. When `log_path` is given, every outbound line and every
    /// received response is mirrored there.
    pub fn new(solver: SmtSolver, log_path: Option<PathBuf>, opts: SmtOpts) -> Fallible<SmtSession> {
        let log = match log_path {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                Some(BufWriter::new(File::create(path)?))
            }
            None => None,
        };

        let mut child = solver.spawn()?;
        let stdin = child.stdin.take().expect("child stdin was piped");
        let stdout = BufReader::new(child.stdout.take().expect("child stdout was piped"));

        let mut session = SmtSession {
            solver,
            opts,
            child,
            stdin: Some(stdin),
            stdout,
            log,
            version: None,
            closed: false,
        };

        if solver == SmtSolver::Z3 {
            session.version = Some(session.query_version()?);
        }
        session.check_theories()?;
        session.preamble()?;
        Ok(session)
    }

    pub fn solver(&self) -> SmtSolver {
        self.solver
    }

    fn check_theories(&self) -> Fallible<()> {
        if !self.opts.string_theory {
            return Ok(());
        }
        let supported = self.solver == SmtSolver::Z3 && self.version_at_least(&[4, 4, 2]);
        if !supported {
            return Err(SmtError::Unsupported(format!(
                "the string theory requires z3 version 4.4.2 or newer, got {} {}",
                self.solver,
                self.version_text()
            ))
            .into());
        }
        Ok(())
    }

    fn preamble(&mut self) -> Fallible<()> {
        match self.solver {
            SmtSolver::Z3 => {
                // Z3 renamed its options at 4.3.2.
                let new_names = self.version_at_least(&[4, 3, 2]);
                self.set_option(":auto-config", "false")?;
                self.set_option(":model", "true")?;
                if new_names {
                    self.set_option(":model.partial", "false")?;
                } else {
                    self.set_option(":model-partial", "false")?;
                }
                if !self.opts.extensionality {
                    if new_names {
                        self.set_option(":smt.mbqi", "false")?;
                    } else {
                        self.set_option(":mbqi", "false")?;
                    }
                }
            }
            SmtSolver::Mathsat => {
                self.set_option(":produce-models", "true")?;
            }
            // cvc4 is configured on its command line.
            SmtSolver::Cvc4 => {}
        }
        Ok(())
    }

    fn set_option(&mut self, key: &str, value: &str) -> Fallible<()> {
        self.send(&Command::SetOption(key.to_string(), value.to_string()))
    }

    /// `(get-info :version)`, answered as e.g. `(:version "4.8.7")`.
    fn query_version(&mut self) -> Fallible<Vec<u32>> {
        self.send(&Command::GetInfo(":version".to_string()))?;
        let line = self.read_raw_line()?;
        self.log_inbound(line.trim());
        let quoted = line
            .split('"')
            .nth(1)
            .ok_or_else(|| SmtError::BadResponse(line.clone()))?;
        let version = parse_version(quoted);
        debug!("solver version {:?}", version);
        Ok(version)
    }

    fn version_at_least(&self, wanted: &[u32]) -> bool {
        match &self.version {
            Some(have) => have.as_slice() >= wanted,
            None => false,
        }
    }

    fn version_text(&self) -> String {
        match &self.version {
            Some(v) => v
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join("."),
            None => "(unknown version)".to_string(),
        }
    }

    fn send(&mut self, cmd: &Command) -> Fallible<()> {
        let line = smt2(cmd);
        let stdin = self.stdin.as_mut().ok_or(SmtError::Disconnected)?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        if let Some(log) = self.log.as_mut() {
            writeln!(log, "{}", line)?;
        }
        Ok(())
    }

    fn read_raw_line(&mut self) -> Fallible<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line)?;
        if n == 0 {
            return Err(SmtError::Disconnected.into());
        }
        Ok(line)
    }

    fn read_response(&mut self) -> Fallible<Response> {
        let response = {
            let stdout = &mut self.stdout;
            let mut read_line = || -> Fallible<String> {
                let mut line = String::new();
                let n = stdout.read_line(&mut line)?;
                if n == 0 {
                    return Err(SmtError::Disconnected.into());
                }
                Ok(line)
            };
            parse_response(&mut read_line)?
        };
        let repr = response.to_string();
        self.log_inbound(&repr);
        Ok(response)
    }

    fn log_inbound(&mut self, repr: &str) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = writeln!(log, "; SMT Says: {}", repr) {
                warn!("failed to write the smt log: {}", e);
            }
        }
    }

    /// Writes a comment to the sidecar log only; nothing reaches the
    /// solver.
    pub fn comment(&mut self, text: &str) {
        if let Some(log) = self.log.as_mut() {
            let _ = writeln!(log, "; {}", text);
        }
    }

    pub fn declare(&mut self, sym: Symbol, arg_sorts: Vec<Sort>, ret: Sort) -> Fallible<()> {
        self.send(&Command::DeclareFun(sym, arg_sorts, ret))
    }

    pub fn declare_sort(&mut self, sym: Symbol) -> Fallible<()> {
        self.send(&Command::DeclareSort(sym))
    }

    pub fn assert_pred(&mut self, p: &Expr) -> Fallible<()> {
        self.send(&Command::Assert(p.clone()))
    }

    pub fn assert_with_trigger(&mut self, p: &Expr, triggers: &[Expr]) -> Fallible<()> {
        self.send(&Command::AssertWithTrigger(p.clone(), triggers.to_vec()))
    }

    pub fn distinct(&mut self, es: &[Expr]) -> Fallible<()> {
        self.send(&Command::Distinct(es.to_vec()))
    }

    pub fn push(&mut self) -> Fallible<()> {
        self.send(&Command::Push)
    }

    pub fn pop(&mut self) -> Fallible<()> {
        self.send(&Command::Pop)
    }

    pub fn check_sat(&mut self) -> Fallible<SatResult> {
        self.send(&Command::CheckSat)?;
        match self.read_response()? {
            Response::Sat => Ok(SatResult::Sat),
            Response::Unsat => Ok(SatResult::Unsat),
            Response::Unknown => Ok(SatResult::Unknown),
            Response::Error(msg) => Err(SmtError::SolverSaidError(msg).into()),
            other => Err(SmtError::BadResponse(other.to_string()).into()),
        }
    }

    /// True exactly when the current assertions are unsatisfiable; an
    /// `unknown` reply counts as not-unsat.
    pub fn check_unsat(&mut self) -> Fallible<bool> {
        Ok(self.check_sat()? == SatResult::Unsat)
    }

    pub fn get_value(&mut self, syms: &[Symbol]) -> Fallible<Vec<(Symbol, String)>> {
        self.send(&Command::GetValue(syms.to_vec()))?;
        match self.read_response()? {
            Response::Values(vs) => Ok(vs),
            Response::Error(msg) => Err(SmtError::SolverSaidError(msg).into()),
            other => Err(SmtError::BadResponse(other.to_string()).into()),
        }
    }

    /// Runs `body` inside a push/pop scope. The pop is issued on every
    /// exit path; when both the body and the pop fail, the body's error
    /// wins.
    pub fn bracket<T>(
        &mut self,
        label: &str,
        body: impl FnOnce(&mut SmtSession) -> Fallible<T>,
    ) -> Fallible<T> {
        self.comment(label);
        self.push()?;
        let result = body(self);
        let popped = self.pop();
        let value = result?;
        popped?;
        Ok(value)
    }

    /// Ends the conversation: sends `(exit)`, closes the pipe, waits for
    /// the subprocess and returns its exit code. IO trouble while
    /// closing handles is reported but not fatal.
    pub fn close(mut self) -> Fallible<i32> {
        self.closed = true;
        if let Err(e) = self.send(&Command::Exit) {
            warn!("failed to send (exit): {}", e);
        }
        drop(self.stdin.take());
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.flush() {
                warn!("failed to flush the smt log: {}", e);
            }
        }
        let status = self.child.wait()?;
        debug!("solver exited: {:?}", status);
        Ok(status.code().unwrap_or(-1))
    }
}

impl Drop for SmtSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn parse_version(text: &str) -> Vec<u32> {
    text.split('.')
        .map_while(|part| part.trim().parse::<u32>().ok())
        .collect()
}
