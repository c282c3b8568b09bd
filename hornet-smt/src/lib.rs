//! The conversation with an external SMT solver: command serialisation,
//! the response grammar, and a long-lived subprocess session with
//! push/pop scoping.

use failure::Fail;

mod parse;
mod session;
mod smt2;

pub use crate::parse::{parse_response, Response};
pub use crate::session::{SatResult, SmtOpts, SmtSession, SmtSolver};
pub use crate::smt2::{smt2, Command};

/// Errors of the solver conversation. Parse failures and solver-reported
/// errors are fatal: once a response cannot be understood the
/// conversation has desynchronised and nothing further can be trusted.
#[derive(Debug, Fail)]
pub enum SmtError {
    #[fail(display = "cannot parse solver response: {}", _0)]
    BadResponse(String),

    #[fail(display = "solver error: {}", _0)]
    SolverSaidError(String),

    #[fail(display = "solver closed its output stream")]
    Disconnected,

    #[fail(display = "{}", _0)]
    Unsupported(String),
}
