//! Error taxonomy returned by the public API (§7).

use thiserror::Error;

/// Everything that can go wrong calling into a [`crate::Solver`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    /// Misuse: the operation isn't permitted in the handle's current state
    /// (already installed, wrong solver, relation already set, ...).
    #[error("operation not permitted: {0}")]
    Failed(&'static str),

    /// A freshly added constraint contradicts the required constraints
    /// already installed.
    #[error("constraint is unsatisfiable given the required constraints already installed")]
    Unsatisfied,

    /// The artificial-variable procedure could not eliminate the
    /// artificial; the system is over-determined.
    #[error("constraint cannot be satisfied from the current tableau (unbound)")]
    Unbound,
}

/// Integer result codes mirroring the reference C API's `AMCW_*` constants.
/// Kept for callers that want parity with the original surface; idiomatic
/// call sites should prefer [`SolverError`] via the `Result`-returning
/// methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    Failed = -1,
    Unsatisfied = -2,
    Unbound = -3,
}

impl From<Result<(), SolverError>> for ResultCode {
    fn from(result: Result<(), SolverError>) -> Self {
        match result {
            Ok(()) => ResultCode::Ok,
            Err(SolverError::Failed(_)) => ResultCode::Failed,
            Err(SolverError::Unsatisfied) => ResultCode::Unsatisfied,
            Err(SolverError::Unbound) => ResultCode::Unbound,
        }
    }
}

impl From<SolverError> for ResultCode {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Failed(_) => ResultCode::Failed,
            SolverError::Unsatisfied => ResultCode::Unsatisfied,
            SolverError::Unbound => ResultCode::Unbound,
        }
    }
}
