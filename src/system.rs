//! The system represents the static input data provided by the user.
//!
//! It is constructed once during data loading and is read-only to the rest of the program.
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// A network bus (electrical node).
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// A unique name for the bus
    pub name: Rc<str>,
    /// Nominal voltage in kV
    pub kv: f64,
    /// Free-form bus type label
    pub bus_type: String,
    /// Latitude of the bus
    pub lat: f64,
    /// Longitude of the bus
    pub lon: f64,
    /// Whether this bus is the angle reference
    pub slack: bool,
}

/// A transmission line between two buses (π-model).
///
/// Endpoints are stored as indices into [`System::buses`]. Parallel lines between the same pair
/// of buses are permitted; their admittances sum in the nodal matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// A unique name for the line
    pub name: Rc<str>,
    /// Index of the sending bus
    pub from_bus: usize,
    /// Index of the receiving bus
    pub to_bus: usize,
    /// Thermal rating in MW
    pub rate: f64,
    /// Series resistance in p.u.
    pub r: f64,
    /// Series reactance in p.u.
    pub x: f64,
    /// Shunt conductance in p.u.
    pub g: f64,
    /// Shunt susceptance in p.u.
    pub b: f64,
}

/// Whether a generator's decisions are made before or after scenario realisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// First-stage: capacity and dispatch are shared across all scenarios
    Dispatchable,
    /// Second-stage (recourse): capacity and dispatch are chosen per scenario, with dispatch
    /// bounded by a capacity factor profile
    Variable,
}

/// A generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    /// A unique name for the generator
    pub name: Rc<str>,
    /// Technology label
    pub tech: String,
    /// Index of the bus the generator is connected to
    pub bus: usize,
    /// Quadratic cost coefficient ($/MW²h)
    pub c2: f64,
    /// Linear cost coefficient ($/MWh)
    pub c1: f64,
    /// Constant cost term ($/h)
    pub c0: f64,
    /// Investment cost per MW of installed capacity
    pub invest_cost: f64,
    /// Existing capacity in MW (lower bound on installed capacity)
    pub exist_cap: f64,
    /// Maximum installable capacity in MW
    pub cap_limit: f64,
    /// Variable operation and maintenance cost ($/MWh)
    pub var_om_cost: f64,
    /// Which stage the generator's decisions belong to
    pub stage: Stage,
}

/// An energy storage unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUnit {
    /// A unique name for the storage unit
    pub name: Rc<str>,
    /// Technology label
    pub tech: String,
    /// Index of the bus the unit is connected to
    pub bus: usize,
    /// Investment cost per MW of power capacity
    pub invest_cost: f64,
    /// Existing power capacity in MW
    pub exist_power_cap: f64,
    /// Existing energy capacity in MWh (informational; the formulation derives energy capacity
    /// from `duration`)
    pub exist_energy_cap: f64,
    /// Variable operation and maintenance cost ($/MWh charged or discharged)
    pub var_om_cost: f64,
    /// Round-trip efficiency, in (0, 1]
    pub efficiency: f64,
    /// Storage duration in hours at full power
    pub duration: f64,
}

/// A scenario with its probability of realisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// A unique name for the scenario
    pub name: Rc<str>,
    /// Probability of realisation, in [0, 1]. Probabilities sum to one over all scenarios.
    pub probability: f64,
}

/// An ordered, cyclically closed collection of timepoints sharing duration and scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    /// A unique name for the timeseries
    pub name: Rc<str>,
    /// Duration of each timepoint in hours
    pub duration_of_timepoints: f64,
    /// Number of timepoints in the series
    pub number_timepoints: usize,
    /// Multiplier converting one pass of the series into the full period
    pub scale_to_period: f64,
    /// Indices into [`System::timepoints`], in series order
    pub timepoints: Vec<usize>,
}

/// An atomic time step in the optimisation horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct Timepoint {
    /// The timepoint's numeric ID from the input file
    pub id: u32,
    /// A unique name for the timepoint
    pub name: Rc<str>,
    /// Index of the timeseries this timepoint belongs to
    pub timeseries: usize,
    /// Duration of the timepoint in hours
    pub duration_hrs: f64,
    /// Multiplier converting a per-timepoint cost into a per-period cost
    pub weight: f64,
    /// Index of the previous timepoint. The first timepoint of a timeseries wraps to the last,
    /// closing the loop.
    pub prev: usize,
}

/// Policy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Maximum bus angle magnitude in radians
    pub max_diffangle: f64,
}

/// The static system data for a planning run.
///
/// Buses, scenarios and timepoints are indexed by their position in the respective collection;
/// all cross-references in the other records are stored as such indices. The dense `loads` table
/// is indexed via [`System::bst_index`].
#[derive(Debug)]
pub struct System {
    /// Buses, keyed by name. Iteration order gives the bus index.
    pub buses: IndexMap<Rc<str>, Bus>,
    /// Index of the single slack bus
    pub slack_bus: usize,
    /// Transmission lines
    pub lines: Vec<Line>,
    /// Generators, keyed by name
    pub generators: IndexMap<Rc<str>, Generator>,
    /// Energy storage units, keyed by name
    pub storage_units: IndexMap<Rc<str>, StorageUnit>,
    /// Scenarios, keyed by name. Iteration order gives the scenario index.
    pub scenarios: IndexMap<Rc<str>, Scenario>,
    /// Timeseries, keyed by name
    pub timeseries: IndexMap<Rc<str>, Timeseries>,
    /// Timepoints, ordered by ID
    pub timepoints: Vec<Timepoint>,
    /// Load in MW for every (bus, scenario, timepoint), dense. Entries absent from the input
    /// file are zero.
    pub loads: Vec<f64>,
    /// Capacity factor profiles for variable generators, keyed by generator name. Each profile
    /// is dense over (scenario, timepoint); see [`System::st_index`].
    pub capacity_factors: HashMap<Rc<str>, Vec<f64>>,
    /// Policy parameters
    pub policy: Policy,
}

impl System {
    /// The number of buses
    pub fn n_buses(&self) -> usize {
        self.buses.len()
    }

    /// The number of scenarios
    pub fn n_scenarios(&self) -> usize {
        self.scenarios.len()
    }

    /// The number of timepoints
    pub fn n_timepoints(&self) -> usize {
        self.timepoints.len()
    }

    /// Flat index into a dense (scenario, timepoint) table
    pub fn st_index(&self, scenario: usize, timepoint: usize) -> usize {
        scenario * self.n_timepoints() + timepoint
    }

    /// Flat index into a dense (bus, scenario, timepoint) table
    pub fn bst_index(&self, bus: usize, scenario: usize, timepoint: usize) -> usize {
        (bus * self.n_scenarios() + scenario) * self.n_timepoints() + timepoint
    }

    /// The load at the given bus, scenario and timepoint in MW
    pub fn load(&self, bus: usize, scenario: usize, timepoint: usize) -> f64 {
        self.loads[self.bst_index(bus, scenario, timepoint)]
    }

    /// The capacity factor for a variable generator at the given scenario and timepoint.
    ///
    /// # Panics
    ///
    /// Panics if the generator has no capacity factor profile (i.e. it is dispatchable).
    pub fn capacity_factor(&self, generator: &str, scenario: usize, timepoint: usize) -> f64 {
        let profile = self
            .capacity_factors
            .get(generator)
            .expect("No capacity factor profile for generator");
        profile[self.st_index(scenario, timepoint)]
    }

    /// Iterate over (index, scenario) pairs
    pub fn iter_scenarios(&self) -> impl Iterator<Item = (usize, &Scenario)> {
        self.scenarios.values().enumerate()
    }

    /// Iterate over (index, timepoint) pairs
    pub fn iter_timepoints(&self) -> impl Iterator<Item = (usize, &Timepoint)> {
        self.timepoints.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use crate::fixture::two_bus_system;

    #[test]
    fn test_dense_indexing() {
        let system = two_bus_system();
        let n_scn = system.n_scenarios();
        let n_tp = system.n_timepoints();

        // Every (bus, scenario, timepoint) triple maps to a distinct slot
        let mut seen = vec![false; system.loads.len()];
        for bus in 0..system.n_buses() {
            for scenario in 0..n_scn {
                for timepoint in 0..n_tp {
                    let idx = system.bst_index(bus, scenario, timepoint);
                    assert!(!seen[idx]);
                    seen[idx] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
