//! The transmission submodel.
//!
//! Adds bus angle variables (with the slack bus fixed to zero), DC flow expressions, flow limit
//! constraints and the bus power balance constraints which couple all submodels together.
use super::BusInjections;
use crate::network::Network;
use crate::settings::{FlowLimits, Formulation};
use crate::solver::{LinearExpr, Problem, Sense, Variable};
use crate::system::System;
use num_complex::Complex64;

/// The decision variables and expressions added by the transmission submodel.
#[derive(Debug)]
pub struct TransmissionVariables {
    /// Bus angle per (bus, scenario, timepoint), dense with the same layout as
    /// [`System::bst_index`]
    pub angle: Vec<Variable>,
    /// Net DC power leaving each bus, per (bus, scenario, timepoint)
    pub flows: Vec<LinearExpr>,
}

/// Add angle variables, flow limits and power balance constraints to the problem.
///
/// This submodel must run after the generator and storage submodels, since the balance
/// constraints consume the completed per-bus injection expressions.
///
/// The power balance is an inequality, `injection ≥ load + flow`: generation above requirements
/// is implicitly curtailed. An explicit shed variable with a high penalty would be the natural
/// extension but is not part of the formulation.
pub fn add_transmission_submodel(
    problem: &mut Problem,
    system: &System,
    network: &Network,
    formulation: &Formulation,
    injections: &BusInjections,
) -> TransmissionVariables {
    let n_bus = system.n_buses();

    // Angle variables, with the slack bus fixed as the reference
    let mut angle = Vec::with_capacity(n_bus * system.n_scenarios() * system.n_timepoints());
    for bus in 0..n_bus {
        for (s, _) in system.iter_scenarios() {
            for (t, _) in system.iter_timepoints() {
                let var = problem.add_variable(f64::NEG_INFINITY, f64::INFINITY);
                debug_assert_eq!(angle.len(), system.bst_index(bus, s, t));
                angle.push(var);
                if bus == system.slack_bus {
                    problem.fix(var, 0.0);
                }
            }
        }
    }

    // Net DC power leaving bus n: Σ_m B[n,m]·(θ_n − θ_m)
    let mut flows = Vec::with_capacity(angle.len());
    for bus in 0..n_bus {
        for (s, _) in system.iter_scenarios() {
            for (t, _) in system.iter_timepoints() {
                let mut flow = LinearExpr::new();
                for other in 0..n_bus {
                    if other == bus {
                        continue;
                    }
                    let b = network.susceptance(bus, other);
                    if b == 0.0 {
                        continue;
                    }
                    flow.push(angle[system.bst_index(bus, s, t)], b);
                    flow.push(angle[system.bst_index(other, s, t)], -b);
                }
                flows.push(flow);
            }
        }
    }

    match formulation.flow_limits {
        FlowLimits::Aggregate => {
            // Cap the net injection at each bus by the summed rating of its incident lines
            for bus in 0..n_bus {
                let cap = network.max_flow(bus);
                for (s, _) in system.iter_scenarios() {
                    for (t, _) in system.iter_timepoints() {
                        let flow = &flows[system.bst_index(bus, s, t)];
                        problem.add_constraint(flow.clone(), Sense::LessEqual, cap);
                        problem.add_constraint(flow.clone(), Sense::GreaterEqual, -cap);
                    }
                }
            }
        }
        FlowLimits::PerLine => {
            // Cap the flow on each line by its own rating: |b_ℓ·(θ_f − θ_t)| ≤ rate_ℓ
            for line in &system.lines {
                let b = -Complex64::new(line.r, line.x).inv().im;
                for (s, _) in system.iter_scenarios() {
                    for (t, _) in system.iter_timepoints() {
                        let mut flow =
                            LinearExpr::term(angle[system.bst_index(line.from_bus, s, t)], b);
                        flow.push(angle[system.bst_index(line.to_bus, s, t)], -b);
                        problem.add_constraint(flow.clone(), Sense::LessEqual, line.rate);
                        problem.add_constraint(flow, Sense::GreaterEqual, -line.rate);
                    }
                }
            }
        }
    }

    // Power balance: injection ≥ load + flow at every bus, scenario and timepoint
    for bus in 0..n_bus {
        for (s, _) in system.iter_scenarios() {
            for (t, _) in system.iter_timepoints() {
                let idx = system.bst_index(bus, s, t);
                let mut balance = injections.expr(bus, s, t).clone();
                balance.add_scaled(&flows[idx], -1.0);
                problem.add_constraint(balance, Sense::GreaterEqual, system.load(bus, s, t));
            }
        }
    }

    TransmissionVariables { angle, flows }
}
