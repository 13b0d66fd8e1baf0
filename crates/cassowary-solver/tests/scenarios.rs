//! End-to-end scenarios against the public API.

use cassowary_solver::{strength, Relation, Solver, SolverError};

fn equality(solver: &mut Solver, terms: &[(cassowary_solver::Variable, f64)], constant: f64, s: f64) -> cassowary_solver::Constraint {
    let cons = solver.new_constraint(s);
    solver.set_relation(cons, Relation::Equal).unwrap();
    for &(var, coeff) in terms {
        solver.add_term(cons, var, coeff).unwrap();
    }
    solver.add_constant(cons, constant).unwrap();
    cons
}

#[test]
fn s1_equality_chain() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();
    let y = solver.new_variable();
    let z = solver.new_variable();

    // x + 2 = y  =>  x - y + 2 = 0
    let c1 = equality(&mut solver, &[(x, 1.0), (y, -1.0)], 2.0, strength::REQUIRED);
    assert!(solver.add(c1).is_ok());
    // y + 3 = z  =>  y - z + 3 = 0
    let c2 = equality(&mut solver, &[(y, 1.0), (z, -1.0)], 3.0, strength::REQUIRED);
    assert!(solver.add(c2).is_ok());

    solver.add_edit(x, strength::STRONG).unwrap();
    solver.suggest(x, 10.0);

    assert!((solver.value(x) - 10.0).abs() < 1e-6);
    assert!((solver.value(y) - 12.0).abs() < 1e-6);
    assert!((solver.value(z) - 15.0).abs() < 1e-6);
}

#[test]
fn s2_inequality_bounds() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();

    // x >= 0
    let ge = solver.new_constraint(strength::REQUIRED);
    solver.set_relation(ge, Relation::GreaterEqual).unwrap();
    solver.add_term(ge, x, 1.0).unwrap();
    solver.add(ge).unwrap();

    // x <= 100
    let le = solver.new_constraint(strength::REQUIRED);
    solver.set_relation(le, Relation::LessEqual).unwrap();
    solver.add_term(le, x, 1.0).unwrap();
    solver.add_constant(le, -100.0).unwrap();
    solver.add(le).unwrap();

    // weak x = 50
    let eq = equality(&mut solver, &[(x, 1.0)], -50.0, strength::WEAK);
    solver.add(eq).unwrap();

    assert!(solver.value(x) >= -1e-6 && solver.value(x) <= 100.0 + 1e-6);
    assert!((solver.value(x) - 50.0).abs() < 1e-6);
}

#[test]
fn s3_unsatisfiable_required_pair() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();

    let c1 = equality(&mut solver, &[(x, 1.0)], -1.0, strength::REQUIRED);
    solver.add(c1).unwrap();

    let c2 = equality(&mut solver, &[(x, 1.0)], -2.0, strength::REQUIRED);
    assert_eq!(solver.add(c2), Err(SolverError::Unsatisfied));

    assert!((solver.value(x) - 1.0).abs() < 1e-6);
}

#[test]
fn s4_edit_retarget_has_no_lower_bound() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();
    let y = solver.new_variable();

    // x + y = 20
    let c = equality(&mut solver, &[(x, 1.0), (y, 1.0)], -20.0, strength::REQUIRED);
    solver.add(c).unwrap();
    solver.add_edit(x, strength::STRONG).unwrap();

    solver.suggest(x, 5.0);
    assert!((solver.value(x) - 5.0).abs() < 1e-6);
    assert!((solver.value(y) - 15.0).abs() < 1e-6);

    solver.suggest(x, 25.0);
    assert!((solver.value(x) - 25.0).abs() < 1e-6);
    assert!((solver.value(y) - -5.0).abs() < 1e-6);
}

#[test]
fn s5_removing_edit_restores_freedom() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();
    let y = solver.new_variable();

    let c = equality(&mut solver, &[(x, 1.0), (y, 1.0)], -20.0, strength::REQUIRED);
    solver.add(c).unwrap();
    solver.add_edit(x, strength::STRONG).unwrap();
    solver.suggest(x, 5.0);

    solver.del_edit(x);
    let fix_y = equality(&mut solver, &[(y, 1.0)], 0.0, strength::REQUIRED);
    solver.add(fix_y).unwrap();

    assert!((solver.value(x) - 20.0).abs() < 1e-6);
    assert!((solver.value(y) - 0.0).abs() < 1e-6);
}

#[test]
fn s6_strength_change_flips_the_winner() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();

    let weak = equality(&mut solver, &[(x, 1.0)], 0.0, strength::WEAK);
    solver.add(weak).unwrap();
    let medium = equality(&mut solver, &[(x, 1.0)], -100.0, strength::MEDIUM);
    solver.add(medium).unwrap();

    assert!((solver.value(x) - 100.0).abs() < 1e-6);

    solver.set_strength(weak, strength::STRONG).unwrap();
    assert!((solver.value(x) - 0.0).abs() < 1e-6);
}

/// A weak equality on `x` leaves an Error-marker row sitting on `x`; adding a
/// later required equality on the same `x` then has no external subject and
/// no pivotable marker/other with a negative coefficient, so `add` must fall
/// through to the artificial-variable procedure even though the two
/// constraints agree and installation should succeed cleanly.
#[test]
fn s7_consistent_required_after_weak_forces_artificial_procedure() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();

    let weak = equality(&mut solver, &[(x, 1.0)], -5.0, strength::WEAK);
    solver.add(weak).unwrap();
    assert!((solver.value(x) - 5.0).abs() < 1e-6);

    let required = equality(&mut solver, &[(x, 1.0)], -5.0, strength::REQUIRED);
    assert!(solver.add(required).is_ok());
    assert!((solver.value(x) - 5.0).abs() < 1e-6);
}

/// Same setup, but the required constraint disagrees with the weak one: the
/// artificial-variable procedure still finds a feasible point, and the
/// required constraint wins outright since it cannot be violated.
#[test]
fn s8_required_after_weak_at_different_value_still_resolves() {
    let mut solver = Solver::new();
    solver.set_auto_update(true);
    let x = solver.new_variable();

    let weak = equality(&mut solver, &[(x, 1.0)], -5.0, strength::WEAK);
    solver.add(weak).unwrap();

    let required = equality(&mut solver, &[(x, 1.0)], -7.0, strength::REQUIRED);
    assert!(solver.add(required).is_ok());
    assert!((solver.value(x) - 7.0).abs() < 1e-6);
}
