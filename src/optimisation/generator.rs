//! The generator submodel.
//!
//! Generators are split by stage at load time: dispatchable generators get a single capacity and
//! dispatch schedule shared across scenarios (first stage), while variable generators get a
//! capacity and dispatch per scenario (second stage, recourse), with dispatch bounded by the
//! capacity factor profile.
use super::costs::CostRegisters;
use super::{expectation_factor, BusInjections};
use crate::settings::Formulation;
use crate::solver::{LinearExpr, Problem, QuadExpr, Sense, Variable};
use crate::system::{Generator, Stage, System};
use indexmap::IndexMap;
use std::rc::Rc;

/// The decision variables added by the generator submodel.
///
/// The maps keep track of the combination of parameters each variable corresponds to, for when
/// the results of the optimisation are read back.
#[derive(Debug, Default)]
pub struct GeneratorVariables {
    /// Installed capacity per dispatchable generator
    pub capacity: IndexMap<Rc<str>, Variable>,
    /// Dispatch per dispatchable generator and timepoint
    pub dispatch: IndexMap<(Rc<str>, usize), Variable>,
    /// Installed capacity per variable generator and scenario
    pub scenario_capacity: IndexMap<(Rc<str>, usize), Variable>,
    /// Dispatch per variable generator, scenario and timepoint
    pub scenario_dispatch: IndexMap<(Rc<str>, usize, usize), Variable>,
}

/// Add generator variables, constraints and cost terms to the problem.
///
/// Dispatch variables are entered into the per-bus injection expressions which the transmission
/// submodel later turns into power balance constraints.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `system` - The static system data
/// * `formulation` - Formulation switches
/// * `injections` - Per-bus injection expressions to contribute dispatch into
/// * `costs` - The shared cost registers
pub fn add_generator_submodel(
    problem: &mut Problem,
    system: &System,
    formulation: &Formulation,
    injections: &mut BusInjections,
    costs: &mut CostRegisters,
) -> GeneratorVariables {
    let mut variables = GeneratorVariables::default();

    for (name, generator) in &system.generators {
        match generator.stage {
            Stage::Dispatchable => {
                let capacity = problem.add_variable(generator.exist_cap, generator.cap_limit);
                variables.capacity.insert(Rc::clone(name), capacity);

                let mut invest = QuadExpr::new();
                invest.add_linear(capacity, generator.invest_cost);
                costs.add_generator_period_cost(&invest);

                for (t, _) in system.iter_timepoints() {
                    let dispatch = problem.add_variable(0.0, f64::INFINITY);
                    variables.dispatch.insert((Rc::clone(name), t), dispatch);

                    // Dispatch cannot exceed installed capacity
                    let mut headroom = LinearExpr::term(dispatch, 1.0);
                    headroom.push(capacity, -1.0);
                    problem.add_constraint(headroom, Sense::LessEqual, 0.0);

                    // The same dispatch serves every scenario
                    for (s, _) in system.iter_scenarios() {
                        injections.add(generator.bus, s, t, dispatch, 1.0);
                    }

                    costs.add_generator_timepoint_cost(t, &operating_cost(generator, dispatch, 1.0));
                }
            }
            Stage::Variable => {
                for (s, scenario) in system.iter_scenarios() {
                    let factor = expectation_factor(
                        formulation.expectation_mode,
                        scenario.probability,
                        system.n_scenarios(),
                    );

                    let capacity = problem.add_variable(generator.exist_cap, generator.cap_limit);
                    variables
                        .scenario_capacity
                        .insert((Rc::clone(name), s), capacity);

                    let mut invest = QuadExpr::new();
                    invest.add_linear(capacity, factor * generator.invest_cost);
                    costs.add_generator_period_cost(&invest);

                    for (t, _) in system.iter_timepoints() {
                        let dispatch = problem.add_variable(0.0, f64::INFINITY);
                        variables
                            .scenario_dispatch
                            .insert((Rc::clone(name), s, t), dispatch);

                        // Dispatch cannot exceed the capacity factor share of installed capacity
                        let cf = system.capacity_factor(name, s, t);
                        let mut headroom = LinearExpr::term(dispatch, 1.0);
                        headroom.push(capacity, -cf);
                        problem.add_constraint(headroom, Sense::LessEqual, 0.0);

                        injections.add(generator.bus, s, t, dispatch, 1.0);

                        costs.add_generator_timepoint_cost(
                            t,
                            &operating_cost(generator, dispatch, factor),
                        );
                    }
                }
            }
        }
    }

    variables
}

/// The operating cost of one dispatch variable, scaled by `factor`:
/// `factor · (c2·g² + c1·g + c0 + vom·g)`
fn operating_cost(generator: &Generator, dispatch: Variable, factor: f64) -> QuadExpr {
    let mut cost = QuadExpr::new();
    cost.add_quadratic(dispatch, dispatch, factor * generator.c2);
    cost.add_linear(dispatch, factor * (generator.c1 + generator.var_om_cost));
    cost.add_constant(factor * generator.c0);
    cost
}
