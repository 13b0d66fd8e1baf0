//! The tableau, the primal/dual simplex loops, and the public operations
//! that drive them (§4, §6).
//!
//! `Solver` owns every piece of mutable state; [`crate::Variable`] and
//! [`crate::Constraint`] are cheap `Copy` handles that just name which
//! entry of the solver's internal tables to act on — the reference's
//! opaque-pointer API translated into an arena-and-handle shape, which
//! avoids threading an allocator callback or reference-counted interior
//! mutability through the public surface (see `DESIGN.md`).

use indexmap::IndexMap;

use crate::config::SolverConfig;
use crate::constraint::{strength, Constraint, ConstraintInner, Relation};
use crate::error::SolverError;
use crate::row::Row;
use crate::symbol::{SolverId, Symbol, SymbolAllocator, SymbolKind};
use crate::variable::{Variable, VariableInner};

pub struct Solver {
    id: SolverId,
    config: SolverConfig,
    objective: Row,
    vars: IndexMap<Symbol, VariableInner>,
    constraints: IndexMap<Symbol, ConstraintInner>,
    rows: IndexMap<Symbol, Row>,
    symbols: SymbolAllocator,
    constraint_ids: SymbolAllocator,
    auto_update: bool,
    infeasible_rows: Vec<Symbol>,
    dirty_vars: Vec<Symbol>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Solver {
            id: SolverId::fresh(),
            config,
            objective: Row::new(),
            vars: IndexMap::new(),
            constraints: IndexMap::new(),
            rows: IndexMap::new(),
            symbols: SymbolAllocator::default(),
            constraint_ids: SymbolAllocator::default(),
            auto_update: false,
            infeasible_rows: Vec::new(),
            dirty_vars: Vec::new(),
        }
    }

    fn check_solver(&self, id: SolverId) -> Result<(), SolverError> {
        if id == self.id {
            Ok(())
        } else {
            Err(SolverError::Failed("handle belongs to a different solver"))
        }
    }

    // ---- auto-update / bulk publication (§4.10, §6) ----------------------

    pub fn set_auto_update(&mut self, flag: bool) {
        self.auto_update = flag;
    }

    pub fn update_vars(&mut self) {
        while let Some(sym) = self.dirty_vars.pop() {
            match self.vars.get_mut(&sym) {
                Some(inner) => inner.dirty = false,
                None => continue,
            }
            let value = self.rows.get(&sym).map_or(0.0, |row| row.constant);
            self.vars.get_mut(&sym).unwrap().value = value;
        }
    }

    /// Drops all edits and, if `clear_constraints`, every installed
    /// constraint (§6).
    pub fn reset(&mut self, clear_constraints: bool) {
        if !self.auto_update {
            self.update_vars();
        }
        let var_syms: Vec<Symbol> = self.vars.keys().copied().collect();
        for sym in var_syms {
            let edit = self.vars.get(&sym).and_then(|v| v.edit_constraint);
            if let Some(edit) = edit {
                self.uninstall(edit.symbol);
            }
            if let Some(inner) = self.vars.get_mut(&sym) {
                inner.edit_constraint = None;
            }
        }
        debug_assert!(self.config.near_zero(self.objective.constant));
        debug_assert!(self.infeasible_rows.is_empty());
        debug_assert!(self.dirty_vars.is_empty());
        // Per the spec's design notes: zero explicitly rather than assert.
        self.objective.constant = 0.0;
        if !clear_constraints {
            return;
        }
        self.objective = Row::new();
        for inner in self.constraints.values_mut() {
            if inner.marker.is_some() {
                inner.marker = None;
                inner.other = None;
            }
        }
        self.rows.clear();
    }

    // ---- variables (§3, §5, §6) -------------------------------------------

    pub fn new_variable(&mut self) -> Variable {
        let symbol = self.symbols.next(SymbolKind::External);
        self.vars.insert(symbol, VariableInner::new(symbol));
        Variable::new(self.id, symbol)
    }

    pub fn use_variable(&mut self, var: Variable) {
        if var.solver_id != self.id {
            return;
        }
        self.bump_refcount(var.symbol);
    }

    fn bump_refcount(&mut self, symbol: Symbol) {
        if let Some(inner) = self.vars.get_mut(&symbol) {
            inner.refcount += 1;
        }
    }

    pub fn del_variable(&mut self, var: Variable) {
        if var.solver_id != self.id {
            return;
        }
        self.release_variable(var.symbol);
    }

    /// Drops one reference; when the count reaches zero, removes the
    /// variable's bookkeeping and uninstalls its owning edit constraint,
    /// if any (§5).
    fn release_variable(&mut self, symbol: Symbol) {
        let reached_zero = match self.vars.get_mut(&symbol) {
            Some(inner) => {
                inner.refcount = inner.refcount.saturating_sub(1);
                inner.refcount == 0
            }
            None => false,
        };
        if !reached_zero {
            return;
        }
        if let Some(inner) = self.vars.shift_remove(&symbol) {
            if let Some(edit) = inner.edit_constraint {
                self.uninstall(edit.symbol);
            }
        }
    }

    pub fn variable_id(&self, var: Variable) -> i64 {
        if var.solver_id != self.id || !self.vars.contains_key(&var.symbol) {
            return -1;
        }
        var.id() as i64
    }

    pub fn value(&self, var: Variable) -> f64 {
        if var.solver_id != self.id {
            return 0.0;
        }
        self.vars.get(&var.symbol).map_or(0.0, |v| v.value)
    }

    fn mark_dirty(&mut self, symbol: Symbol) {
        if let Some(inner) = self.vars.get_mut(&symbol) {
            if !inner.dirty {
                inner.dirty = true;
                self.dirty_vars.push(symbol);
            }
        }
    }

    // ---- constraints: construction (§3, §6) -------------------------------

    pub fn new_constraint(&mut self, strength: f64) -> Constraint {
        let strength = if self.config.near_zero(strength) {
            crate::constraint::strength::REQUIRED
        } else {
            strength
        };
        let symbol = self.constraint_ids.next(SymbolKind::External);
        self.constraints.insert(symbol, ConstraintInner::new(strength));
        Constraint::new(self.id, symbol)
    }

    pub fn clone_constraint(&mut self, other: Constraint, strength: f64) -> Result<Constraint, SolverError> {
        self.check_solver(other.solver_id)?;
        let (other_strength, other_relation) = {
            let inner = self
                .constraints
                .get(&other.symbol)
                .ok_or(SolverError::Failed("constraint not found"))?;
            (inner.strength, inner.relation)
        };
        let strength = if self.config.near_zero(strength) {
            other_strength
        } else {
            strength
        };
        let cons = self.new_constraint(strength);
        self.merge_constraint(cons, other, 1.0)?;
        if let Some(relation) = other_relation {
            self.constraints.get_mut(&cons.symbol).unwrap().relation = Some(relation);
        }
        Ok(cons)
    }

    pub fn del_constraint(&mut self, cons: Constraint) {
        if cons.solver_id != self.id {
            return;
        }
        self.uninstall(cons.symbol);
        if let Some(inner) = self.constraints.shift_remove(&cons.symbol) {
            let terms: Vec<Symbol> = inner.expression.terms.keys().copied().collect();
            for sym in terms {
                self.release_variable(sym);
            }
        }
    }

    pub fn reset_constraint(&mut self, cons: Constraint) {
        if cons.solver_id != self.id {
            return;
        }
        self.uninstall(cons.symbol);
        let terms: Vec<Symbol> = match self.constraints.get(&cons.symbol) {
            Some(inner) => inner.expression.terms.keys().copied().collect(),
            None => return,
        };
        for sym in terms {
            self.release_variable(sym);
        }
        if let Some(inner) = self.constraints.get_mut(&cons.symbol) {
            inner.relation = None;
            inner.expression = Row::new();
        }
    }

    pub fn add_term(&mut self, cons: Constraint, var: Variable, multiplier: f64) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        self.check_solver(var.solver_id)?;
        let relation = {
            let inner = self
                .constraints
                .get(&cons.symbol)
                .ok_or(SolverError::Failed("constraint not found"))?;
            if inner.is_installed() {
                return Err(SolverError::Failed("cannot modify an installed constraint"));
            }
            inner.relation
        };
        if !self.vars.contains_key(&var.symbol) {
            return Err(SolverError::Failed("variable not found"));
        }
        let multiplier = if relation == Some(Relation::GreaterEqual) {
            -multiplier
        } else {
            multiplier
        };
        let eps = self.config.epsilon();
        self.constraints
            .get_mut(&cons.symbol)
            .unwrap()
            .expression
            .add_var(var.symbol, multiplier, eps);
        self.bump_refcount(var.symbol);
        Ok(())
    }

    pub fn set_relation(&mut self, cons: Constraint, relation: Relation) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        let inner = self
            .constraints
            .get_mut(&cons.symbol)
            .ok_or(SolverError::Failed("constraint not found"))?;
        if inner.is_installed() || inner.relation.is_some() {
            return Err(SolverError::Failed(
                "relation already set, or constraint already installed",
            ));
        }
        if relation != Relation::GreaterEqual {
            inner.expression.multiply(-1.0);
        }
        inner.relation = Some(relation);
        Ok(())
    }

    pub fn add_constant(&mut self, cons: Constraint, constant: f64) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        let inner = self
            .constraints
            .get_mut(&cons.symbol)
            .ok_or(SolverError::Failed("constraint not found"))?;
        if inner.is_installed() {
            return Err(SolverError::Failed("cannot modify an installed constraint"));
        }
        inner.expression.constant += if inner.relation == Some(Relation::GreaterEqual) {
            -constant
        } else {
            constant
        };
        Ok(())
    }

    pub fn set_strength(&mut self, cons: Constraint, strength: f64) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        let strength = if self.config.near_zero(strength) {
            crate::constraint::strength::REQUIRED
        } else {
            strength
        };
        let (old_strength, marker, other, installed) = {
            let inner = self
                .constraints
                .get(&cons.symbol)
                .ok_or(SolverError::Failed("constraint not found"))?;
            (inner.strength, inner.marker, inner.other, inner.is_installed())
        };
        if old_strength == strength {
            return Ok(());
        }
        if old_strength >= crate::constraint::strength::REQUIRED || strength >= crate::constraint::strength::REQUIRED {
            self.uninstall(cons.symbol);
            self.constraints.get_mut(&cons.symbol).unwrap().strength = strength;
            return self.add(cons);
        }
        if installed {
            let diff = strength - old_strength;
            let eps = self.config.epsilon();
            if let Some(marker) = marker {
                Self::merge_row(&self.rows, &mut self.objective, marker, diff, eps);
            }
            if let Some(other) = other {
                Self::merge_row(&self.rows, &mut self.objective, other, diff, eps);
            }
            self.optimize_objective();
            if self.auto_update {
                self.update_vars();
            }
        }
        self.constraints.get_mut(&cons.symbol).unwrap().strength = strength;
        Ok(())
    }

    pub fn merge_constraint(&mut self, cons: Constraint, other: Constraint, multiplier: f64) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        self.check_solver(other.solver_id)?;
        let (relation, installed) = {
            let inner = self
                .constraints
                .get(&cons.symbol)
                .ok_or(SolverError::Failed("constraint not found"))?;
            (inner.relation, inner.is_installed())
        };
        if installed {
            return Err(SolverError::Failed("cannot modify an installed constraint"));
        }
        let multiplier = if relation == Some(Relation::GreaterEqual) {
            -multiplier
        } else {
            multiplier
        };
        let (other_constant, other_terms) = {
            let other_inner = self
                .constraints
                .get(&other.symbol)
                .ok_or(SolverError::Failed("constraint not found"))?;
            let terms: Vec<(Symbol, f64)> = other_inner
                .expression
                .terms
                .iter()
                .map(|(&s, &c)| (s, c))
                .collect();
            (other_inner.expression.constant, terms)
        };
        let eps = self.config.epsilon();
        self.constraints.get_mut(&cons.symbol).unwrap().expression.constant += other_constant * multiplier;
        for (sym, coeff) in other_terms {
            self.bump_refcount(sym);
            self.constraints
                .get_mut(&cons.symbol)
                .unwrap()
                .expression
                .add_var(sym, coeff * multiplier, eps);
        }
        Ok(())
    }

    pub fn has_constraint(&self, cons: Constraint) -> bool {
        cons.solver_id == self.id
            && self
                .constraints
                .get(&cons.symbol)
                .is_some_and(ConstraintInner::is_installed)
    }

    // ---- row algebra helpers shared across the engine ---------------------

    /// `target += (rows[symbol] or just `symbol`) * multiplier` — merges a
    /// symbol into a target row, expanding it through its basic row if it
    /// has one (§4.8's `merge_row`, shared with §4.3's `make_row`).
    fn merge_row(rows: &IndexMap<Symbol, Row>, target: &mut Row, symbol: Symbol, multiplier: f64, eps: f64) {
        match rows.get(&symbol) {
            Some(existing) => target.add_row(existing, multiplier, eps),
            None => target.add_var(symbol, multiplier, eps),
        }
    }

    fn take_row(&mut self, symbol: Symbol) -> Option<Row> {
        self.rows.shift_remove(&symbol)
    }

    fn put_row(&mut self, symbol: Symbol, row: Row) {
        self.rows.insert(symbol, row);
    }

    fn queue_infeasible_if_negative(&mut self, symbol: Symbol) {
        if let Some(row) = self.rows.get_mut(&symbol) {
            if row.constant < 0.0 && !row.infeasible_queued {
                row.infeasible_queued = true;
                self.infeasible_rows.push(symbol);
                tracing::debug!(symbol = symbol.id(), "row became infeasible");
            }
        }
    }

    /// Substitutes `symbol -> expr` into every basic row and into
    /// `self.objective`, marking touched external rows dirty and touched
    /// non-external rows for dual-simplex repair. Mirrors
    /// `amcw_substitute_rows`, which always substitutes into `solver->objective`
    /// unconditionally, on every pivot including phase-1 ones driven by a
    /// scratch objective in `add_with_artificial`. A caller threading a
    /// *different* row through `optimize` (that scratch objective, or the
    /// detached `self.objective` mid-`optimize_objective`) must still
    /// substitute into that local row itself — this only reaches the live
    /// `self.objective` field.
    fn substitute_rows(&mut self, symbol: Symbol, expr: &Row) {
        let eps = self.config.epsilon();
        let keys: Vec<Symbol> = self.rows.keys().copied().collect();
        for key in keys {
            self.rows.get_mut(&key).unwrap().substitute(symbol, expr, eps);
            if key.is_external() {
                self.mark_dirty(key);
            } else {
                self.queue_infeasible_if_negative(key);
            }
        }
        self.objective.substitute(symbol, expr, eps);
    }

    // ---- primal simplex (§4.6) --------------------------------------------

    fn find_entering(objective: &Row) -> Option<Symbol> {
        objective
            .terms
            .iter()
            .find(|(sym, &coeff)| !sym.is_dummy() && coeff < 0.0)
            .map(|(&sym, _)| sym)
    }

    fn find_leaving(&self, enter: Symbol) -> Option<Symbol> {
        let mut best: Option<(Symbol, f64)> = None;
        for (&key, row) in &self.rows {
            if !key.is_pivotable() {
                continue;
            }
            let Some(coeff) = row.coefficient(enter) else {
                continue;
            };
            if coeff > 0.0 {
                continue;
            }
            let ratio = -row.constant / coeff;
            let better = match best {
                None => true,
                Some((best_key, best_ratio)) => {
                    ratio < best_ratio || (self.config.approx(ratio, best_ratio) && key.id() < best_key.id())
                }
            };
            if better {
                best = Some((key, ratio));
            }
        }
        best.map(|(key, _)| key)
    }

    /// Minimizes `objective` against the current tableau, pivoting until no
    /// entering variable remains. Takes and returns the objective by value
    /// so it can be either `self.objective` (see `optimize_objective`) or a
    /// throwaway row (the phase-1-style objective of §4.5), without
    /// aliasing `self` while the loop also mutates `self.rows`.
    fn optimize(&mut self, mut objective: Row) -> Row {
        let eps = self.config.epsilon();
        let mut iterations = 0usize;
        loop {
            let Some(enter) = Self::find_entering(&objective) else {
                break;
            };
            let Some(exit) = self.find_leaving(enter) else {
                debug_assert!(
                    false,
                    "primal simplex found no leaving row for a well-formed constraint set (unbounded)"
                );
                break;
            };
            iterations += 1;
            if iterations > self.config.max_iterations() {
                debug_assert!(false, "primal simplex exceeded max_iterations without converging");
                tracing::warn!(iterations, "primal simplex gave up without converging");
                break;
            }
            tracing::trace!(enter = enter.id(), exit = exit.id(), "primal pivot");
            let mut tmp = self
                .take_row(exit)
                .expect("the chosen leaving row must exist in the tableau");
            tmp.solve_for(enter, Some(exit), eps);
            self.substitute_rows(enter, &tmp);
            objective.substitute(enter, &tmp, eps);
            self.put_row(enter, tmp);
        }
        objective
    }

    fn optimize_objective(&mut self) {
        let objective = std::mem::take(&mut self.objective);
        self.objective = self.optimize(objective);
        debug_assert!(self.infeasible_rows.is_empty());
    }

    // ---- dual simplex (§4.7) -----------------------------------------------

    fn dual_optimize(&mut self) {
        let eps = self.config.epsilon();
        let mut iterations = 0usize;
        while !self.infeasible_rows.is_empty() {
            iterations += 1;
            if iterations > self.config.max_iterations() {
                debug_assert!(false, "dual simplex exceeded max_iterations without converging");
                tracing::warn!(iterations, "dual simplex gave up without converging");
                break;
            }
            let leave = self.infeasible_rows.pop().unwrap();
            let terms: Vec<(Symbol, f64)> = {
                let Some(row) = self.rows.get_mut(&leave) else {
                    continue;
                };
                row.infeasible_queued = false;
                if self.config.near_zero(row.constant) || row.constant >= 0.0 {
                    continue;
                }
                row.terms.iter().map(|(&s, &c)| (s, c)).collect()
            };

            let mut enter: Option<Symbol> = None;
            let mut min_ratio = f64::MAX;
            for (sym, coeff) in terms {
                if sym.is_dummy() || coeff <= 0.0 {
                    continue;
                }
                let obj_coeff = self.objective.coefficient(sym).unwrap_or(0.0);
                let ratio = obj_coeff / coeff;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    enter = Some(sym);
                }
            }
            let enter = enter.expect(
                "dual simplex found no entering column for an infeasible row (system should be feasible)",
            );
            tracing::trace!(enter = enter.id(), exit = leave.id(), "dual pivot");
            let mut tmp = self
                .take_row(leave)
                .expect("the infeasible row must still exist in the tableau");
            tmp.solve_for(enter, Some(leave), eps);
            self.substitute_rows(enter, &tmp);
            self.put_row(enter, tmp);
        }
    }

    // ---- compiling and installing constraints (§4.3, §4.4, §4.5) ----------

    fn ensure_marker(&mut self, cons_symbol: Symbol, kind: SymbolKind) -> Symbol {
        if let Some(marker) = self.constraints.get(&cons_symbol).and_then(|c| c.marker) {
            return marker;
        }
        let symbol = self.symbols.next(kind);
        self.constraints.get_mut(&cons_symbol).unwrap().marker = Some(symbol);
        symbol
    }

    fn ensure_other(&mut self, cons_symbol: Symbol, kind: SymbolKind) -> Symbol {
        if let Some(other) = self.constraints.get(&cons_symbol).and_then(|c| c.other) {
            return other;
        }
        let symbol = self.symbols.next(kind);
        self.constraints.get_mut(&cons_symbol).unwrap().other = Some(symbol);
        symbol
    }

    /// Compiles a constraint's user-built expression into a canonical
    /// tableau row with slack/error/dummy markers, per the table in §4.3.
    fn make_row(&mut self, cons_symbol: Symbol) -> Row {
        let eps = self.config.epsilon();
        let (terms, constant, relation, strength) = {
            let inner = self.constraints.get(&cons_symbol).expect("constraint must exist");
            let terms: Vec<(Symbol, f64)> = inner.expression.terms.iter().map(|(&s, &c)| (s, c)).collect();
            (terms, inner.expression.constant, inner.relation, inner.strength)
        };
        let relation = relation.expect("a constraint's relation must be set before add");

        let mut row = Row::with_constant(constant);
        for (sym, coeff) in terms {
            self.mark_dirty(sym);
            Self::merge_row(&self.rows, &mut row, sym, coeff, eps);
        }

        if relation != Relation::Equal {
            let marker = self.ensure_marker(cons_symbol, SymbolKind::Slack);
            row.add_var(marker, -1.0, eps);
            if strength < crate::constraint::strength::REQUIRED {
                let other = self.ensure_other(cons_symbol, SymbolKind::Error);
                row.add_var(other, 1.0, eps);
                self.objective.add_var(other, strength, eps);
            }
        } else if strength >= crate::constraint::strength::REQUIRED {
            let marker = self.ensure_marker(cons_symbol, SymbolKind::Dummy);
            row.add_var(marker, 1.0, eps);
        } else {
            let marker = self.ensure_marker(cons_symbol, SymbolKind::Error);
            let other = self.ensure_other(cons_symbol, SymbolKind::Error);
            row.add_var(marker, -1.0, eps);
            row.add_var(other, 1.0, eps);
            self.objective.add_var(marker, strength, eps);
            self.objective.add_var(other, strength, eps);
        }

        if row.constant < 0.0 {
            row.multiply(-1.0);
        }
        row
    }

    /// Chooses a subject for the freshly compiled row and installs it, or
    /// falls back to the artificial-variable procedure (§4.4).
    fn try_add_row(&mut self, mut row: Row, cons_symbol: Symbol) -> Result<(), SolverError> {
        let eps = self.config.epsilon();
        let (marker, other) = {
            let inner = self.constraints.get(&cons_symbol).unwrap();
            (inner.marker, inner.other)
        };

        let mut subject = row.terms.keys().find(|s| s.is_external()).copied();

        if subject.is_none() {
            if let Some(marker) = marker {
                if marker.is_pivotable() && row.coefficient(marker).is_some_and(|c| c < 0.0) {
                    subject = Some(marker);
                }
            }
        }
        if subject.is_none() {
            if let Some(other) = other {
                if other.is_pivotable() && row.coefficient(other).is_some_and(|c| c < 0.0) {
                    subject = Some(other);
                }
            }
        }
        if subject.is_none() && !row.terms.keys().any(|s| !s.is_dummy()) {
            if self.config.near_zero(row.constant) {
                subject = marker;
            } else {
                return Err(SolverError::Unsatisfied);
            }
        }

        match subject {
            Some(subject) => {
                row.solve_for(subject, None, eps);
                self.substitute_rows(subject, &row);
                self.put_row(subject, row);
                Ok(())
            }
            None => self.add_with_artificial(row, cons_symbol),
        }
    }

    /// §4.5: pivots in a fresh artificial variable to find feasibility when
    /// no natural subject exists, then eliminates the artificial entirely.
    fn add_with_artificial(&mut self, row: Row, cons_symbol: Symbol) -> Result<(), SolverError> {
        let eps = self.config.epsilon();
        let artificial = self.symbols.next(SymbolKind::Slack);
        self.symbols.release_last();

        let mut phase_objective = Row::new();
        phase_objective.add_row(&row, 1.0, eps);
        self.put_row(artificial, row);

        let phase_objective = self.optimize(phase_objective);
        let feasible = self.config.near_zero(phase_objective.constant);

        if let Some(mut art_row) = self.take_row(artificial) {
            if art_row.is_constant() {
                return if feasible {
                    Ok(())
                } else {
                    self.uninstall(cons_symbol);
                    Err(SolverError::Unbound)
                };
            }
            let entry = art_row.terms.keys().find(|s| s.is_pivotable()).copied();
            match entry {
                Some(entry) => {
                    art_row.solve_for(entry, Some(artificial), eps);
                    self.substitute_rows(entry, &art_row);
                    self.put_row(entry, art_row);
                }
                None => {
                    self.uninstall(cons_symbol);
                    return Err(SolverError::Unbound);
                }
            }
        }

        for row in self.rows.values_mut() {
            row.terms.shift_remove(&artificial);
        }
        self.objective.terms.shift_remove(&artificial);

        if !feasible {
            self.uninstall(cons_symbol);
            return Err(SolverError::Unbound);
        }
        Ok(())
    }

    pub fn add(&mut self, cons: Constraint) -> Result<(), SolverError> {
        self.check_solver(cons.solver_id)?;
        let installed = self
            .constraints
            .get(&cons.symbol)
            .ok_or(SolverError::Failed("constraint not found"))?
            .is_installed();
        if installed {
            return Err(SolverError::Failed("constraint is already installed"));
        }

        tracing::debug!(constraint = cons.symbol.id(), "adding constraint");
        let checkpoint = self.symbols.checkpoint();
        let row = self.make_row(cons.symbol);
        let outcome = self.try_add_row(row, cons.symbol);
        let result = match outcome {
            Err(err) => {
                self.remove_errors(cons.symbol);
                self.symbols.restore(checkpoint);
                tracing::debug!(constraint = cons.symbol.id(), error = %err, "add failed, rolled back");
                Err(err)
            }
            Ok(()) => {
                self.optimize_objective();
                if self.auto_update {
                    self.update_vars();
                }
                Ok(())
            }
        };
        debug_assert!(self.infeasible_rows.is_empty());
        result
    }

    pub fn remove(&mut self, cons: Constraint) {
        if cons.solver_id != self.id {
            return;
        }
        tracing::debug!(constraint = cons.symbol.id(), "removing constraint");
        self.uninstall(cons.symbol);
    }

    /// The shared body of `remove`, `del_constraint`, `reset_constraint`,
    /// `set_strength`'s required-boundary crossing, a variable's refcount
    /// reaching zero, and `reset`: uninstall a constraint from the tableau,
    /// re-optimize, and (if auto-update is on) publish. A no-op if the
    /// constraint isn't currently installed (§4.8).
    fn uninstall(&mut self, cons_symbol: Symbol) {
        let Some(marker) = self.constraints.get(&cons_symbol).and_then(|c| c.marker) else {
            return;
        };
        self.remove_errors(cons_symbol);
        let eps = self.config.epsilon();
        match self.take_row(marker) {
            Some(_taken_marker_row) => {
                // The basic-row invariant (§3) guarantees `marker` appears
                // in no other row or the objective, so taking its row out
                // is the entire removal.
            }
            None => {
                let exit = self
                    .get_leaving_row(marker)
                    .expect("an installed, non-basic marker must appear as a term in some row");
                let mut exit_row = self.take_row(exit).expect("the chosen leaving row must exist");
                exit_row.solve_for(marker, Some(exit), eps);
                self.substitute_rows(marker, &exit_row);
            }
        }
        self.optimize_objective();
        if self.auto_update {
            self.update_vars();
        }
    }

    /// §4.8's `get_leaving_row`: partitions rows containing `marker` into
    /// negative-coefficient, positive-coefficient-non-external, and
    /// external, preferring the first category that has a candidate.
    fn get_leaving_row(&self, marker: Symbol) -> Option<Symbol> {
        let mut negative: Option<(Symbol, f64)> = None;
        let mut positive: Option<(Symbol, f64)> = None;
        let mut external: Option<Symbol> = None;
        for (&key, row) in &self.rows {
            let Some(coeff) = row.coefficient(marker) else {
                continue;
            };
            if key.is_external() {
                external = Some(key);
            } else if coeff < 0.0 {
                let ratio = -row.constant / coeff;
                if negative.is_none_or(|(_, best)| ratio < best) {
                    negative = Some((key, ratio));
                }
            } else {
                let ratio = row.constant / coeff;
                if positive.is_none_or(|(_, best)| ratio < best) {
                    positive = Some((key, ratio));
                }
            }
        }
        negative.map(|(k, _)| k).or(positive.map(|(k, _)| k)).or(external)
    }

    /// Subtracts a constraint's strength contribution from the objective
    /// and clears its markers (§4.8's `remove_errors`).
    fn remove_errors(&mut self, cons_symbol: Symbol) {
        let Some(inner) = self.constraints.get(&cons_symbol) else {
            return;
        };
        let (marker, other, strength) = (inner.marker, inner.other, inner.strength);
        let eps = self.config.epsilon();
        if let Some(marker) = marker {
            if matches!(marker.kind(), SymbolKind::Error) {
                Self::merge_row(&self.rows, &mut self.objective, marker, -strength, eps);
            }
        }
        if let Some(other) = other {
            if matches!(other.kind(), SymbolKind::Error) {
                Self::merge_row(&self.rows, &mut self.objective, other, -strength, eps);
            }
        }
        if self.objective.is_constant() {
            self.objective.constant = 0.0;
        }
        if let Some(inner) = self.constraints.get_mut(&cons_symbol) {
            inner.marker = None;
            inner.other = None;
        }
    }

    // ---- edit variables (§4.9) ---------------------------------------------

    pub fn has_edit(&self, var: Variable) -> bool {
        var.solver_id == self.id
            && self
                .vars
                .get(&var.symbol)
                .is_some_and(|v| v.edit_constraint.is_some())
    }

    pub fn add_edit(&mut self, var: Variable, strength: f64) -> Result<(), SolverError> {
        self.check_solver(var.solver_id)?;
        if !self.vars.contains_key(&var.symbol) {
            return Err(SolverError::Failed("variable not found"));
        }
        let strength = strength.min(crate::constraint::strength::STRONG);

        if let Some(existing) = self.vars.get(&var.symbol).unwrap().edit_constraint {
            return self.set_strength(existing, strength);
        }

        let current_value = self.vars.get(&var.symbol).unwrap().value;
        let cons = self.new_constraint(strength);
        self.set_relation(cons, Relation::Equal)
            .expect("a fresh constraint always accepts its first relation");
        self.add_term(cons, var, 1.0)
            .expect("a fresh constraint always accepts its first term");
        self.add_constant(cons, -current_value)
            .expect("a fresh constraint always accepts its constant before installation");
        self.add(cons)
            .expect("an edit constraint (v = current value) always has an immediate subject");

        let inner = self.vars.get_mut(&var.symbol).unwrap();
        inner.edit_constraint = Some(cons);
        inner.edit_value = current_value;
        Ok(())
    }

    pub fn del_edit(&mut self, var: Variable) {
        if var.solver_id != self.id {
            return;
        }
        let Some(cons) = self.vars.get(&var.symbol).and_then(|v| v.edit_constraint) else {
            return;
        };
        self.del_constraint(cons);
        if let Some(inner) = self.vars.get_mut(&var.symbol) {
            inner.edit_constraint = None;
            inner.edit_value = 0.0;
        }
    }

    pub fn suggest(&mut self, var: Variable, value: f64) {
        if var.solver_id != self.id || !self.vars.contains_key(&var.symbol) {
            return;
        }
        if self.vars.get(&var.symbol).unwrap().edit_constraint.is_none() {
            self.add_edit(var, strength::MEDIUM)
                .expect("auto-adding an edit at MEDIUM strength cannot fail for a known variable");
        }
        let edit_cons = self.vars.get(&var.symbol).unwrap().edit_constraint.unwrap();
        let edit_value = self.vars.get(&var.symbol).unwrap().edit_value;
        let delta = value - edit_value;
        self.vars.get_mut(&var.symbol).unwrap().edit_value = value;
        tracing::trace!(variable = var.id(), delta, "suggest");
        self.delta_edit_constant(delta, edit_cons);
        self.dual_optimize();
        if self.auto_update {
            self.update_vars();
        }
    }

    /// Applies `delta` to an edit constraint's marker row(s), per §4.9.
    fn delta_edit_constant(&mut self, delta: f64, cons: Constraint) {
        let Some(inner) = self.constraints.get(&cons.symbol) else {
            return;
        };
        let (marker, other) = (inner.marker, inner.other);

        if let Some(marker) = marker {
            if let Some(row) = self.rows.get_mut(&marker) {
                row.constant -= delta;
                self.queue_infeasible_if_negative(marker);
                return;
            }
        }
        if let Some(other) = other {
            if let Some(row) = self.rows.get_mut(&other) {
                row.constant += delta;
                self.queue_infeasible_if_negative(other);
                return;
            }
        }
        let Some(marker) = marker else { return };
        let keys: Vec<(Symbol, f64)> = self
            .rows
            .iter()
            .filter_map(|(&key, row)| row.coefficient(marker).map(|coeff| (key, coeff)))
            .collect();
        for (key, coeff) in keys {
            self.rows.get_mut(&key).unwrap().constant += coeff * delta;
            if key.is_external() {
                self.mark_dirty(key);
            } else {
                self.queue_infeasible_if_negative(key);
            }
        }
    }
}
