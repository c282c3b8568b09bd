use failure::Fail;
use hornet_ir::ConstraintId;

/// Fixpoint-level failures. Everything here unwinds the solve; the
/// session teardown in the driver guarantees the subprocess is reaped on
/// the way out.
#[derive(Debug, Fail)]
pub enum SolveError {
    /// A constraint with κ applications on its right-hand side reached
    /// the result classifier. Well-formed input never triggers this.
    #[fail(display = "constraint {:?} is not a target constraint", _0)]
    NotATarget(ConstraintId),

    #[fail(display = "gradual solving requested but no gradual solver was provided")]
    GradualUnavailable,
}
