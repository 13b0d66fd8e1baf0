//! Constraint handles and the relation/strength vocabulary (§3, §6).

use crate::row::Row;
use crate::symbol::{SolverId, Symbol};

/// A linear relation between a constraint's expression and zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// Named strength levels from §3. A constraint's strength is any positive
/// `f64`; these are just well-known points on that scale, exactly as in the
/// reference (`AMCW_REQUIRED`, `AMCW_STRONG`, ...).
pub mod strength {
    pub const REQUIRED: f64 = 1_000_000_000.0;
    pub const STRONG: f64 = 1_000_000.0;
    pub const MEDIUM: f64 = 1_000.0;
    pub const WEAK: f64 = 1.0;
}

/// A lightweight, `Copy` handle to a constraint owned by a [`crate::Solver`].
/// All actual state — expression, markers, relation, strength — lives in
/// the solver's constraint table, keyed by `symbol`; the handle just names
/// which entry to look up, the same role the reference's
/// `amcw_Constraint*` pointer plays, minus the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub(crate) solver_id: SolverId,
    pub(crate) symbol: Symbol,
}

impl Constraint {
    pub(crate) fn new(solver_id: SolverId, symbol: Symbol) -> Self {
        Constraint { solver_id, symbol }
    }
}

/// The solver-side state a [`Constraint`] handle addresses.
#[derive(Debug, Clone)]
pub(crate) struct ConstraintInner {
    pub expression: Row,
    pub marker: Option<Symbol>,
    pub other: Option<Symbol>,
    pub relation: Option<Relation>,
    pub strength: f64,
}

impl ConstraintInner {
    pub fn new(strength: f64) -> Self {
        ConstraintInner {
            expression: Row::new(),
            marker: None,
            other: None,
            relation: None,
            strength,
        }
    }

    /// A constraint is installed iff it has a marker symbol (§3).
    pub fn is_installed(&self) -> bool {
        self.marker.is_some()
    }
}
