//! An incremental implementation of the Cassowary constraint-solving
//! algorithm: linear equalities and inequalities over `f64` variables, each
//! with a strength (`REQUIRED`, `STRONG`, `MEDIUM`, `WEAK`, or any other
//! positive weight), solved by a two-phase simplex method that reuses as
//! much of the existing tableau as it can when constraints are added,
//! removed, or edited one at a time.

mod config;
mod constraint;
mod error;
mod row;
mod solver;
mod symbol;
mod variable;

pub use config::{SolverConfig, DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS};
pub use constraint::{strength, Constraint, Relation};
pub use error::{ResultCode, SolverError};
pub use solver::Solver;
pub use variable::Variable;
