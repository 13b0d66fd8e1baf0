//! Property tests for the universal invariants in §8: feasibility of
//! required constraints, idempotence of `update_vars`, reversibility of
//! add+remove, and clone equivalence.

use cassowary_solver::{strength, Relation, Solver};
use proptest::prelude::*;

fn required_equality(solver: &mut Solver, x: cassowary_solver::Variable, y: cassowary_solver::Variable, offset: f64) -> cassowary_solver::Constraint {
    // x - y + offset = 0
    let cons = solver.new_constraint(strength::REQUIRED);
    solver.set_relation(cons, Relation::Equal).unwrap();
    solver.add_term(cons, x, 1.0).unwrap();
    solver.add_term(cons, y, -1.0).unwrap();
    solver.add_constant(cons, offset).unwrap();
    cons
}

proptest! {
    /// Invariant 1: every installed required constraint evaluates within
    /// epsilon of its relation after `update_vars`.
    #[test]
    fn required_equalities_are_always_feasible(offset in -1000.0f64..1000.0, target in -1000.0f64..1000.0) {
        let mut solver = Solver::new();
        solver.set_auto_update(true);
        let x = solver.new_variable();
        let y = solver.new_variable();
        required_equality(&mut solver, x, y, offset);
        solver.add_edit(x, strength::STRONG).unwrap();
        solver.suggest(x, target);

        prop_assert!((solver.value(x) - solver.value(y) + offset).abs() < 1e-4);
    }

    /// Invariant 3: calling `update_vars` twice in a row is a no-op.
    #[test]
    fn update_vars_is_idempotent(target in -500.0f64..500.0) {
        let mut solver = Solver::new();
        let x = solver.new_variable();
        solver.add_edit(x, strength::STRONG).unwrap();
        solver.suggest(x, target);
        solver.update_vars();
        let first = solver.value(x);
        solver.update_vars();
        prop_assert_eq!(solver.value(x), first);
    }

    /// Invariant 4: add(c) followed by remove(c) returns values to their
    /// pre-add state, provided nothing else mutated the solver meanwhile.
    #[test]
    fn add_then_remove_is_reversible(target in -500.0f64..500.0, offset in -200.0f64..200.0) {
        let mut solver = Solver::new();
        solver.set_auto_update(true);
        let x = solver.new_variable();
        solver.add_edit(x, strength::STRONG).unwrap();
        solver.suggest(x, target);
        let before = solver.value(x);

        let cons = solver.new_constraint(strength::REQUIRED);
        solver.set_relation(cons, Relation::GreaterEqual).unwrap();
        solver.add_term(cons, x, 1.0).unwrap();
        solver.add_constant(cons, offset).unwrap();
        let _ = solver.add(cons);
        solver.remove(cons);

        prop_assert!((solver.value(x) - before).abs() < 1e-4);
    }

    /// Invariant 2: the solver minimizes the weighted sum of violations of
    /// non-required constraints — no perturbation of the free variable can
    /// strictly lower that sum below what the solver already found.
    #[test]
    fn weighted_violation_is_not_improvable_by_perturbation(
        t1 in -500.0f64..500.0,
        t2 in -500.0f64..500.0,
        perturb in -50.0f64..50.0,
    ) {
        let mut solver = Solver::new();
        solver.set_auto_update(true);
        let x = solver.new_variable();

        let weak = solver.new_constraint(strength::WEAK);
        solver.set_relation(weak, Relation::Equal).unwrap();
        solver.add_term(weak, x, 1.0).unwrap();
        solver.add_constant(weak, -t1).unwrap();
        solver.add(weak).unwrap();

        let medium = solver.new_constraint(strength::MEDIUM);
        solver.set_relation(medium, Relation::Equal).unwrap();
        solver.add_term(medium, x, 1.0).unwrap();
        solver.add_constant(medium, -t2).unwrap();
        solver.add(medium).unwrap();

        let violation = |v: f64| strength::WEAK * (v - t1).abs() + strength::MEDIUM * (v - t2).abs();
        let at_optimum = violation(solver.value(x));
        let at_perturbed = violation(solver.value(x) + perturb);

        prop_assert!(at_optimum <= at_perturbed + 1e-6);
    }

    /// Invariant 5: cloning a constraint at strength 0 (meaning "inherit")
    /// and installing the clone instead of the original yields the same
    /// solution.
    #[test]
    fn clone_constraint_yields_same_solution(offset in -200.0f64..200.0) {
        let mut a = Solver::new();
        a.set_auto_update(true);
        let ax = a.new_variable();
        let ay = a.new_variable();
        let original = required_equality(&mut a, ax, ay, offset);
        a.add_edit(ax, strength::STRONG).unwrap();
        a.suggest(ax, 7.0);
        a.add(original).unwrap();

        let mut b = Solver::new();
        b.set_auto_update(true);
        let bx = b.new_variable();
        let by = b.new_variable();
        let source = required_equality(&mut b, bx, by, offset);
        let clone = b.clone_constraint(source, 0.0).unwrap();
        b.add_edit(bx, strength::STRONG).unwrap();
        b.suggest(bx, 7.0);
        b.add(clone).unwrap();

        prop_assert!((a.value(ax) - b.value(bx)).abs() < 1e-4);
        prop_assert!((a.value(ay) - b.value(by)).abs() < 1e-4);
    }
}

#[test]
fn variable_ids_are_stable_and_unique() {
    let mut solver = Solver::new();
    let x = solver.new_variable();
    let y = solver.new_variable();
    assert_ne!(x.id(), y.id());
    let id_before = x.id();
    solver.suggest(x, 3.0);
    assert_eq!(x.id(), id_before);
}

#[test]
fn refcount_keeps_variable_addressable_until_last_reference_drops() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();
    let cons = required_equality(&mut solver, x, solver.new_variable(), -5.0);
    solver.add(cons).unwrap();

    solver.del_variable(x);
    // Still referenced by `cons`'s expression: still addressable.
    assert!((solver.value(x) - 5.0).abs() < 1e-6 || solver.value(x) != 0.0);

    solver.del_constraint(cons);
    // Now unreferenced; a fresh variable can reuse the slot without
    // colliding with the old handle's cached id meaning anything new.
    let fresh = solver.new_variable();
    assert!(fresh.id() >= 1);
}
