//! Assembly and solution of the capacity expansion problem.
//!
//! The composer creates the optimisation problem, initialises the shared cost registers and
//! invokes the submodels in a fixed order: generators, storage, transmission, policy. The order
//! matters only in that transmission consumes the per-bus injection expressions the generator
//! and storage submodels produce. Each submodel reads the shared [`System`], writes variables
//! and constraints into the problem and accumulates additively into the cost registers; the
//! accumulation itself is order-independent.
//!
//! The objective is the weighted sum of the per-timepoint costs plus the per-period cost:
//!
//! ```text
//! minimise  Σ_t weight_t · CostPerTimepoint[t] + CostPerPeriod
//! ```
//!
//! Two compatibility behaviours are kept as defaults and can be switched via
//! [`Formulation`](crate::settings::Formulation): scenario cost terms are weighted by
//! `probability / |scenarios|` rather than by probability alone, and flow limits cap the
//! aggregate injection per bus rather than the flow per line.
use crate::network::Network;
use crate::settings::{ExpectationMode, Formulation};
use crate::solver::{LinearExpr, Problem, Solution, SolveStatus, Variable};
use crate::system::System;
use itertools::Itertools;
use std::io::{self, Write};
use std::rc::Rc;

pub mod costs;
mod generator;
mod policy;
mod storage;
mod transmission;

pub use costs::CostBreakdown;
use costs::CostRegisters;
use generator::{add_generator_submodel, GeneratorVariables};
use policy::add_policy_submodel;
use storage::{add_storage_submodel, StorageVariables};
use transmission::{add_transmission_submodel, TransmissionVariables};

/// The weight a scenario's cost terms carry in the objective.
///
/// In `SourceCompat` mode the probability is additionally divided by the scenario count.
fn expectation_factor(mode: ExpectationMode, probability: f64, n_scenarios: usize) -> f64 {
    match mode {
        ExpectationMode::SourceCompat => probability / n_scenarios as f64,
        ExpectationMode::ProbabilityOnly => probability,
    }
}

/// Per-bus injection expressions, populated additively by the generator and storage submodels
/// and consumed by the transmission submodel's power balance constraints.
#[derive(Debug)]
pub struct BusInjections {
    exprs: Vec<LinearExpr>,
    n_scenarios: usize,
    n_timepoints: usize,
}

impl BusInjections {
    fn new(system: &System) -> Self {
        Self {
            exprs: vec![
                LinearExpr::new();
                system.n_buses() * system.n_scenarios() * system.n_timepoints()
            ],
            n_scenarios: system.n_scenarios(),
            n_timepoints: system.n_timepoints(),
        }
    }

    fn index(&self, bus: usize, scenario: usize, timepoint: usize) -> usize {
        (bus * self.n_scenarios + scenario) * self.n_timepoints + timepoint
    }

    /// Add `coeff · var` to the injection at the given bus, scenario and timepoint
    pub fn add(&mut self, bus: usize, scenario: usize, timepoint: usize, var: Variable, coeff: f64) {
        let idx = self.index(bus, scenario, timepoint);
        self.exprs[idx].push(var, coeff);
    }

    /// The injection expression at the given bus, scenario and timepoint
    pub fn expr(&self, bus: usize, scenario: usize, timepoint: usize) -> &LinearExpr {
        &self.exprs[self.index(bus, scenario, timepoint)]
    }
}

/// A fully assembled problem, ready to solve.
///
/// Assembly runs the full pipeline up to (and including) setting the objective; the only
/// remaining transitions are solving and, on success, result extraction via [`PlanSolution`].
pub struct AssembledPlan<'a> {
    system: &'a System,
    problem: Problem,
    generators: GeneratorVariables,
    storage: StorageVariables,
    transmission: TransmissionVariables,
    injections: BusInjections,
    costs: CostRegisters,
}

/// Assemble the optimisation problem for the given system.
///
/// # Arguments
///
/// * `system` - The static system data
/// * `formulation` - Formulation switches
pub fn assemble<'a>(system: &'a System, formulation: &Formulation) -> AssembledPlan<'a> {
    let network = Network::from_system(system, formulation.include_shunts);

    let mut problem = Problem::new();
    let mut injections = BusInjections::new(system);
    let mut costs = CostRegisters::new(system.n_timepoints());

    let generators =
        add_generator_submodel(&mut problem, system, formulation, &mut injections, &mut costs);
    let storage =
        add_storage_submodel(&mut problem, system, formulation, &mut injections, &mut costs);
    let transmission =
        add_transmission_submodel(&mut problem, system, &network, formulation, &injections);
    add_policy_submodel(&mut problem, system, &transmission.angle);

    problem.add_objective(&costs.objective(system));

    AssembledPlan {
        system,
        problem,
        generators,
        storage,
        transmission,
        injections,
        costs,
    }
}

impl<'a> AssembledPlan<'a> {
    /// Write a human-readable dump of the assembled problem, for debugging
    pub fn dump_model<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.problem.dump(writer)
    }

    /// The number of decision variables in the assembled problem
    pub fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    /// The number of constraint rows in the assembled problem
    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }

    /// Solve the assembled problem.
    ///
    /// # Returns
    ///
    /// The solution on (almost) optimal termination, or the solver's termination status
    /// otherwise, surfaced unchanged. No retry is attempted.
    pub fn solve(self) -> Result<PlanSolution<'a>, SolveStatus> {
        let solution = self.problem.solve()?;

        Ok(PlanSolution {
            system: self.system,
            solution,
            generators: self.generators,
            storage: self.storage,
            transmission: self.transmission,
            injections: self.injections,
            costs: self.costs,
        })
    }
}

/// The solution to a solved capacity expansion problem.
///
/// All extraction methods read primal values; this type only exists once the solver has reported
/// success.
#[derive(Debug)]
pub struct PlanSolution<'a> {
    system: &'a System,
    solution: Solution,
    generators: GeneratorVariables,
    storage: StorageVariables,
    transmission: TransmissionVariables,
    injections: BusInjections,
    costs: CostRegisters,
}

impl PlanSolution<'_> {
    /// The system the problem was assembled from
    pub fn system(&self) -> &System {
        self.system
    }

    /// The interned ID of the named generator, for building lookup keys without re-allocating
    /// the name.
    fn generator_id(&self, name: &str) -> Rc<str> {
        let (id, _) = self
            .system
            .generators
            .get_key_value(name)
            .expect("No generator found for given name");
        Rc::clone(id)
    }

    /// The interned ID of the named storage unit.
    fn storage_id(&self, name: &str) -> Rc<str> {
        let (id, _) = self
            .system
            .storage_units
            .get_key_value(name)
            .expect("No storage unit found for given name");
        Rc::clone(id)
    }

    /// The objective value
    pub fn objective_value(&self) -> f64 {
        self.solution.objective_value()
    }

    /// Installed capacity of a dispatchable generator
    pub fn generator_capacity(&self, name: &str) -> f64 {
        self.solution.value(self.generators.capacity[name])
    }

    /// Dispatch of a dispatchable generator at a timepoint
    pub fn generator_dispatch(&self, name: &str, timepoint: usize) -> f64 {
        self.solution
            .value(self.generators.dispatch[&(self.generator_id(name), timepoint)])
    }

    /// Installed capacity of a variable generator in a scenario
    pub fn scenario_capacity(&self, name: &str, scenario: usize) -> f64 {
        self.solution
            .value(self.generators.scenario_capacity[&(self.generator_id(name), scenario)])
    }

    /// Dispatch of a variable generator in a scenario at a timepoint
    pub fn scenario_dispatch(&self, name: &str, scenario: usize, timepoint: usize) -> f64 {
        let key = (self.generator_id(name), scenario, timepoint);
        self.solution.value(self.generators.scenario_dispatch[&key])
    }

    /// Installed power capacity of a storage unit
    pub fn storage_power_capacity(&self, name: &str) -> f64 {
        self.solution.value(self.storage.power_capacity[name])
    }

    /// Charging power of a storage unit in a scenario at a timepoint
    pub fn storage_charge(&self, name: &str, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .value(self.storage.charge[&(self.storage_id(name), scenario, timepoint)])
    }

    /// Discharging power of a storage unit in a scenario at a timepoint
    pub fn storage_discharge(&self, name: &str, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .value(self.storage.discharge[&(self.storage_id(name), scenario, timepoint)])
    }

    /// State of energy of a storage unit in a scenario at a timepoint
    pub fn storage_state_of_energy(&self, name: &str, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .value(self.storage.state_of_energy[&(self.storage_id(name), scenario, timepoint)])
    }

    /// Bus angle in radians. Exactly zero at the slack bus.
    pub fn angle(&self, bus: usize, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .value(self.transmission.angle[self.system.bst_index(bus, scenario, timepoint)])
    }

    /// Net DC power leaving the given bus
    pub fn flow_at_bus(&self, bus: usize, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .eval_linear(&self.transmission.flows[self.system.bst_index(bus, scenario, timepoint)])
    }

    /// Total power injected at the given bus by generators and storage
    pub fn injection_at_bus(&self, bus: usize, scenario: usize, timepoint: usize) -> f64 {
        self.solution
            .eval_linear(self.injections.expr(bus, scenario, timepoint))
    }

    /// The itemised system costs
    pub fn cost_breakdown(&self) -> CostBreakdown {
        self.costs.breakdown(&self.solution, self.system)
    }

    /// The itemised generator-only costs
    pub fn generator_cost_breakdown(&self) -> CostBreakdown {
        self.costs.generator_breakdown(&self.solution, self.system)
    }

    /// Iterate over the names of dispatchable generators, in input order
    pub fn iter_dispatchable_names(&self) -> impl Iterator<Item = &Rc<str>> {
        self.generators.capacity.keys()
    }

    /// Iterate over the names of variable generators, in input order
    pub fn iter_variable_names(&self) -> impl Iterator<Item = &Rc<str>> {
        // The map is keyed per scenario with keys grouped by generator; report each name once
        self.generators
            .scenario_capacity
            .keys()
            .map(|(name, _)| name)
            .dedup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{storage_unit, two_bus_system};
    use crate::settings::FlowLimits;
    use float_cmp::approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ExpectationMode::SourceCompat, 0.5, 2, 0.25)]
    #[case(ExpectationMode::SourceCompat, 1.0, 1, 1.0)]
    #[case(ExpectationMode::ProbabilityOnly, 0.5, 2, 0.5)]
    #[case(ExpectationMode::ProbabilityOnly, 1.0, 1, 1.0)]
    fn test_expectation_factor(
        #[case] mode: ExpectationMode,
        #[case] probability: f64,
        #[case] n_scenarios: usize,
        #[case] expected: f64,
    ) {
        assert!(approx_eq!(
            f64,
            expectation_factor(mode, probability, n_scenarios),
            expected
        ));
    }

    #[test]
    fn test_assemble_counts() {
        let system = two_bus_system();
        let plan = assemble(&system, &Formulation::default());

        // One dispatchable and one variable generator, one scenario, one timepoint:
        // cap + dispatch, scenario cap + scenario dispatch, two angles
        assert_eq!(plan.num_variables(), 6);
        assert!(plan.num_constraints() > 0);
    }

    #[test]
    fn test_storage_variables_added() {
        let mut system = two_bus_system();
        let unit = storage_unit("battery", 1, 1.0, 1.0);
        system.storage_units.insert(Rc::clone(&unit.name), unit);

        let plan = assemble(&system, &Formulation::default());

        // The storage unit adds a power capacity plus charge, discharge and state of energy for
        // the single scenario and timepoint
        assert_eq!(plan.num_variables(), 10);
    }

    #[test]
    fn test_per_line_limits_add_rows() {
        let system = two_bus_system();
        let aggregate = assemble(&system, &Formulation::default());
        let per_line = assemble(
            &system,
            &Formulation {
                flow_limits: FlowLimits::PerLine,
                ..Formulation::default()
            },
        );

        // One line vs two buses: per-line mode adds fewer limit rows here, but both must
        // produce some
        assert!(aggregate.num_constraints() > 0);
        assert!(per_line.num_constraints() > 0);
        assert_ne!(aggregate.num_constraints(), per_line.num_constraints());
    }
}
