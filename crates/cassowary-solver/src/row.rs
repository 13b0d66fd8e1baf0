//! Linear expressions: a constant plus a symbol-keyed map of coefficients.
//!
//! `Row` is the unit the tableau is built from — the objective, every basic
//! row, and the scratch rows used mid-pivot are all `Row`s. Coefficients are
//! never allowed to linger at (approximately) zero: [`Row::add_var`] erases
//! a term as soon as its coefficient decays into the epsilon band, which is
//! what keeps `is_constant` a cheap, exact check.

use indexmap::IndexMap;

use crate::symbol::Symbol;

fn near_zero(value: f64, eps: f64) -> bool {
    value.abs() < eps
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Row {
    pub constant: f64,
    pub terms: IndexMap<Symbol, f64>,
    /// Bookkeeping for the solver's infeasible-row worklist (§4.7); unused
    /// for the objective row and scratch rows that never live in
    /// `Solver::rows`.
    pub infeasible_queued: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(constant: f64) -> Self {
        Row {
            constant,
            ..Self::default()
        }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, sym: Symbol) -> Option<f64> {
        self.terms.get(&sym).copied()
    }

    /// `terms[sym] += coeff`, dropping the term if the accumulated
    /// coefficient falls within epsilon of zero.
    pub fn add_var(&mut self, sym: Symbol, coeff: f64, eps: f64) {
        let entry = self.terms.entry(sym).or_insert(0.0);
        *entry += coeff;
        if near_zero(*entry, eps) {
            self.terms.shift_remove(&sym);
        }
    }

    /// Scales the constant and every term by `k`. Unlike `add_var` this
    /// never drops terms — a scale can't introduce a near-zero coefficient
    /// that wasn't already one, short of `k == 0`, which callers never pass.
    pub fn multiply(&mut self, k: f64) {
        self.constant *= k;
        for coeff in self.terms.values_mut() {
            *coeff *= k;
        }
    }

    /// `self += other * k`.
    pub fn add_row(&mut self, other: &Row, k: f64, eps: f64) {
        self.constant += other.constant * k;
        for (&sym, &coeff) in &other.terms {
            self.add_var(sym, coeff * k, eps);
        }
    }

    /// Rearranges `basic = constant + Σ cᵢ·symᵢ + c_entry·entry` into
    /// `entry = constant' + … + (1/c_entry)·exit`, in place. `entry` must
    /// already be present with a non-zero coefficient.
    pub fn solve_for(&mut self, entry: Symbol, exit: Option<Symbol>, eps: f64) {
        let coeff = self
            .terms
            .shift_remove(&entry)
            .expect("solve_for requires entry to be present with a non-zero coefficient");
        debug_assert!(!near_zero(coeff, eps));
        let reciprocal = 1.0 / coeff;
        self.multiply(-reciprocal);
        if let Some(exit) = exit {
            self.add_var(exit, reciprocal, eps);
        }
    }

    /// If `sym` occurs in this row, removes it and adds `coeff * expr`.
    pub fn substitute(&mut self, sym: Symbol, expr: &Row, eps: f64) {
        if let Some(coeff) = self.terms.shift_remove(&sym) {
            self.add_row(expr, coeff, eps);
        }
    }
}
