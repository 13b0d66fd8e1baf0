//! Tagged symbol identifiers used as the universal key of the tableau.
//!
//! Every quantity the solver pivots on — external variables, the slack,
//! error and dummy markers a constraint compiles into — is addressed by a
//! [`Symbol`]. Symbols are cheap, `Copy`, and meaningless outside the
//! [`crate::Solver`] that minted them; there is deliberately no "null"
//! symbol value, callers use `Option<Symbol>` wherever the reference
//! implementation relies on a zero id to mean absent.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

/// What role a [`Symbol`] plays in the tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A user-visible variable.
    External,
    /// Added for inequality constraints; may become basic.
    Slack,
    /// Added for non-required constraints; contributes to the objective.
    Error,
    /// Added for required equalities; never basic, never pivots.
    Dummy,
}

impl SymbolKind {
    /// Slack and error symbols are the only ones eligible to enter or leave
    /// the basis during a pivot.
    pub fn is_pivotable(self) -> bool {
        matches!(self, SymbolKind::Slack | SymbolKind::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: NonZeroU32,
    kind: SymbolKind,
}

impl Symbol {
    fn new(id: u32, kind: SymbolKind) -> Self {
        Symbol {
            id: NonZeroU32::new(id).expect("symbol ids are allocated starting at 1"),
            kind,
        }
    }

    /// The 1-based id this symbol was allocated with, stable for its whole
    /// lifetime. Mirrors `amcw_variableid`'s contract minus the "0 is null"
    /// convention, which `Option<Symbol>` replaces.
    pub fn id(&self) -> u32 {
        self.id.get()
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, SymbolKind::External)
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, SymbolKind::Dummy)
    }

    pub fn is_pivotable(&self) -> bool {
        self.kind.is_pivotable()
    }
}

/// The symbol id space wraps at 2^30-1, same bound as the reference's
/// 30-bit bitfield, even though a Rust `Symbol` does not pack its kind into
/// the id's bits.
const MAX_SYMBOL_ID: u32 = 0x3FFF_FFFF;

/// A monotonic counter that hands out fresh [`Symbol`]s of a given kind.
/// Rolling back to a captured value (see `Solver::add`'s failure path) undoes
/// every allocation made after the checkpoint, exactly like the reference's
/// `solver->symbol_count = oldsym` restore.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SymbolAllocator {
    count: u32,
}

impl SymbolAllocator {
    pub fn checkpoint(&self) -> u32 {
        self.count
    }

    pub fn restore(&mut self, checkpoint: u32) {
        self.count = checkpoint;
    }

    /// One ephemeral allocation (the artificial variable of §4.5) rolls back
    /// its own counter increment as soon as it is minted, since it never
    /// outlives the `add` call that created it.
    pub fn release_last(&mut self) {
        self.count -= 1;
    }

    pub fn next(&mut self, kind: SymbolKind) -> Symbol {
        self.count += 1;
        if self.count > MAX_SYMBOL_ID {
            self.count = 1;
        }
        Symbol::new(self.count, kind)
    }
}

/// A process-wide unique tag stamped into every [`crate::Variable`] and
/// [`crate::Constraint`] handle so that passing a handle from one solver into
/// another's API is detectable (`cons.solver != var.solver` in the
/// reference) instead of silently operating on a colliding symbol id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolverId(u64);

static NEXT_SOLVER_ID: AtomicU64 = AtomicU64::new(1);

impl SolverId {
    pub fn fresh() -> Self {
        SolverId(NEXT_SOLVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increment() {
        let mut alloc = SymbolAllocator::default();
        let a = alloc.next(SymbolKind::External);
        let b = alloc.next(SymbolKind::Slack);
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert!(a.is_external());
        assert!(!b.is_external());
    }

    #[test]
    fn checkpoint_restore_undoes_allocations() {
        let mut alloc = SymbolAllocator::default();
        alloc.next(SymbolKind::External);
        let checkpoint = alloc.checkpoint();
        alloc.next(SymbolKind::Slack);
        alloc.next(SymbolKind::Error);
        alloc.restore(checkpoint);
        let next = alloc.next(SymbolKind::Dummy);
        assert_eq!(next.id(), 2);
    }

    #[test]
    fn release_last_undoes_one_allocation() {
        let mut alloc = SymbolAllocator::default();
        alloc.next(SymbolKind::External);
        alloc.next(SymbolKind::Slack);
        alloc.release_last();
        let next = alloc.next(SymbolKind::Error);
        assert_eq!(next.id(), 2);
    }

    #[test]
    fn solver_ids_are_distinct() {
        let a = SolverId::fresh();
        let b = SolverId::fresh();
        assert_ne!(a, b);
    }
}
