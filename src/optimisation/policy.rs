//! The policy submodel.
//!
//! Currently the only active policy is the bus angle limit. Investment budget and emissions
//! policies have reserved slots here but are not implemented.
use crate::solver::{LinearExpr, Problem, Sense, Variable};
use crate::system::System;

/// Add the angle limit constraints: `−θ_lim ≤ θ ≤ θ_lim` for every bus, scenario and timepoint.
pub fn add_policy_submodel(problem: &mut Problem, system: &System, angle: &[Variable]) {
    let limit = system.policy.max_diffangle;
    for &var in angle {
        problem.add_constraint(LinearExpr::term(var, 1.0), Sense::LessEqual, limit);
        problem.add_constraint(LinearExpr::term(var, 1.0), Sense::GreaterEqual, -limit);
    }
}
