//! The energy storage submodel.
//!
//! Each unit gets a first-stage power capacity and, per scenario and timepoint, charge,
//! discharge and state-of-energy variables. The state of energy follows the cyclic dynamics
//!
//! ```text
//! SOE[t] = SOE[prev(t)] + √η·CHG[t]·dur_t − (1/√η)·DIS[t]·dur_t
//! ```
//!
//! where `prev` wraps within each timeseries, so the state at the end of a series equals the
//! state at its start. Energy capacity is not an independent decision: it is `duration` hours at
//! full power.
use super::costs::CostRegisters;
use super::{expectation_factor, BusInjections};
use crate::settings::Formulation;
use crate::solver::{LinearExpr, Problem, QuadExpr, Sense, Variable};
use crate::system::System;
use indexmap::IndexMap;
use std::rc::Rc;

/// The decision variables added by the storage submodel.
#[derive(Debug, Default)]
pub struct StorageVariables {
    /// Installed power capacity per unit
    pub power_capacity: IndexMap<Rc<str>, Variable>,
    /// Charging power per unit, scenario and timepoint
    pub charge: IndexMap<(Rc<str>, usize, usize), Variable>,
    /// Discharging power per unit, scenario and timepoint
    pub discharge: IndexMap<(Rc<str>, usize, usize), Variable>,
    /// State of energy per unit, scenario and timepoint
    pub state_of_energy: IndexMap<(Rc<str>, usize, usize), Variable>,
}

/// Add storage variables, constraints and cost terms to the problem.
///
/// Net injection (discharge minus charge) is contributed to the per-bus injection expressions.
pub fn add_storage_submodel(
    problem: &mut Problem,
    system: &System,
    formulation: &Formulation,
    injections: &mut BusInjections,
    costs: &mut CostRegisters,
) -> StorageVariables {
    let mut variables = StorageVariables::default();

    for (name, unit) in &system.storage_units {
        let power_capacity = problem.add_variable(unit.exist_power_cap, f64::INFINITY);
        variables
            .power_capacity
            .insert(Rc::clone(name), power_capacity);

        let mut invest = QuadExpr::new();
        invest.add_linear(power_capacity, unit.invest_cost);
        costs.add_period_cost(&invest);

        let sqrt_eff = unit.efficiency.sqrt();

        for (s, scenario) in system.iter_scenarios() {
            let factor = expectation_factor(
                formulation.expectation_mode,
                scenario.probability,
                system.n_scenarios(),
            );

            for (t, _) in system.iter_timepoints() {
                let charge = problem.add_variable(0.0, f64::INFINITY);
                let discharge = problem.add_variable(0.0, f64::INFINITY);
                let state_of_energy = problem.add_variable(0.0, f64::INFINITY);
                variables.charge.insert((Rc::clone(name), s, t), charge);
                variables
                    .discharge
                    .insert((Rc::clone(name), s, t), discharge);
                variables
                    .state_of_energy
                    .insert((Rc::clone(name), s, t), state_of_energy);

                injections.add(unit.bus, s, t, discharge, 1.0);
                injections.add(unit.bus, s, t, charge, -1.0);

                let mut vom = QuadExpr::new();
                vom.add_linear(charge, factor * unit.var_om_cost);
                vom.add_linear(discharge, factor * unit.var_om_cost);
                costs.add_timepoint_cost(t, &vom);
            }
        }

        // The remaining constraints need all of the unit's variables in place
        for (s, _) in system.iter_scenarios() {
            for (t, timepoint) in system.iter_timepoints() {
                let charge = variables.charge[&(Rc::clone(name), s, t)];
                let discharge = variables.discharge[&(Rc::clone(name), s, t)];
                let state_of_energy = variables.state_of_energy[&(Rc::clone(name), s, t)];
                let prev_state = variables.state_of_energy[&(Rc::clone(name), s, timepoint.prev)];

                // SOE[t] − SOE[prev] − √η·dur·CHG + (1/√η)·dur·DIS = 0
                //
                // For a timeseries of length one, prev(t) = t and the state terms cancel,
                // which forces zero net cycling.
                let mut dynamics = LinearExpr::term(state_of_energy, 1.0);
                dynamics.push(prev_state, -1.0);
                dynamics.push(charge, -sqrt_eff * timepoint.duration_hrs);
                dynamics.push(discharge, timepoint.duration_hrs / sqrt_eff);
                problem.add_constraint(dynamics, Sense::Equal, 0.0);

                // CHG + DIS ≤ installed power capacity
                let mut power = LinearExpr::term(charge, 1.0);
                power.push(discharge, 1.0);
                power.push(power_capacity, -1.0);
                problem.add_constraint(power, Sense::LessEqual, 0.0);

                // SOE ≤ energy capacity, i.e. `duration` hours at full power
                let mut energy = LinearExpr::term(state_of_energy, 1.0);
                energy.push(power_capacity, -unit.duration);
                problem.add_constraint(energy, Sense::LessEqual, 0.0);
            }
        }
    }

    variables
}
