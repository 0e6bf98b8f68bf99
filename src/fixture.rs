//! Fixtures for tests
use crate::system::{
    Bus, Generator, Line, Policy, Scenario, Stage, StorageUnit, System, Timepoint, Timeseries,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// A bus with the given name and slack flag
pub fn bus(name: &str, slack: bool) -> Bus {
    Bus {
        name: name.into(),
        kv: 230.0,
        bus_type: "transmission".to_string(),
        lat: 0.0,
        lon: 0.0,
        slack,
    }
}

/// A line with the given endpoints and series impedance, and no shunt
pub fn test_line(name: &str, from_bus: usize, to_bus: usize, rate: f64, r: f64, x: f64) -> Line {
    Line {
        name: name.into(),
        from_bus,
        to_bus,
        rate,
        r,
        x,
        g: 0.0,
        b: 0.0,
    }
}

/// A single timeseries of `n` timepoints with unit duration and scale
pub fn single_timescale(n: usize) -> (IndexMap<Rc<str>, Timeseries>, Vec<Timepoint>) {
    let name: Rc<str> = "base".into();
    let series = Timeseries {
        name: Rc::clone(&name),
        duration_of_timepoints: 1.0,
        number_timepoints: n,
        scale_to_period: 1.0,
        timepoints: (0..n).collect(),
    };

    let timepoints = (0..n)
        .map(|idx| Timepoint {
            id: idx as u32,
            name: format!("t{idx}").into(),
            timeseries: 0,
            duration_hrs: 1.0,
            weight: 1.0,
            prev: if idx == 0 { n - 1 } else { idx - 1 },
        })
        .collect();

    ([(name, series)].into_iter().collect(), timepoints)
}

/// A two-bus system with the given lines and no generators, storage or loads
pub fn system_with_lines(lines: Vec<Line>) -> System {
    let buses: IndexMap<Rc<str>, Bus> = [bus("north", true), bus("south", false)]
        .into_iter()
        .map(|b| (Rc::clone(&b.name), b))
        .collect();
    let scenarios: IndexMap<Rc<str>, Scenario> = {
        let name: Rc<str> = "base".into();
        [(
            Rc::clone(&name),
            Scenario {
                name,
                probability: 1.0,
            },
        )]
        .into_iter()
        .collect()
    };
    let (timeseries, timepoints) = single_timescale(1);
    let n = buses.len() * scenarios.len() * timepoints.len();

    System {
        buses,
        slack_bus: 0,
        lines,
        generators: IndexMap::new(),
        storage_units: IndexMap::new(),
        scenarios,
        timeseries,
        timepoints,
        loads: vec![0.0; n],
        capacity_factors: HashMap::new(),
        policy: Policy {
            max_diffangle: 720.0_f64.to_radians(),
        },
    }
}

/// A two-bus system with a dispatchable generator at the slack bus, a variable generator at the
/// other bus (capacity factor one) and a 50 MW load at the other bus
pub fn two_bus_system() -> System {
    let mut system = system_with_lines(vec![test_line("n_s", 0, 1, 100.0, 0.0, 0.1)]);

    let gas: Rc<str> = "gas_north".into();
    system.generators.insert(
        Rc::clone(&gas),
        Generator {
            name: gas,
            tech: "gas".to_string(),
            bus: 0,
            c2: 0.0,
            c1: 10.0,
            c0: 0.0,
            invest_cost: 2.0,
            exist_cap: 0.0,
            cap_limit: 100.0,
            var_om_cost: 0.0,
            stage: Stage::Dispatchable,
        },
    );

    let wind: Rc<str> = "wind_south".into();
    system.generators.insert(
        Rc::clone(&wind),
        Generator {
            name: Rc::clone(&wind),
            tech: "wind".to_string(),
            bus: 1,
            c2: 0.0,
            c1: 0.0,
            c0: 0.0,
            invest_cost: 0.0,
            exist_cap: 0.0,
            cap_limit: 1000.0,
            var_om_cost: 0.5,
            stage: Stage::Variable,
        },
    );
    system.capacity_factors.insert(wind, vec![1.0]);

    let idx = system.bst_index(1, 0, 0);
    system.loads[idx] = 50.0;

    system
}

/// A storage unit at the given bus with a one-hour duration
pub fn storage_unit(name: &str, bus: usize, invest_cost: f64, efficiency: f64) -> StorageUnit {
    StorageUnit {
        name: name.into(),
        tech: "battery".to_string(),
        bus,
        invest_cost,
        exist_power_cap: 0.0,
        exist_energy_cap: 0.0,
        var_om_cost: 0.0,
        efficiency,
        duration: 1.0,
    }
}

/// The path to the bundled demo model's inputs
pub fn demo_inputs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("two_bus")
        .join("inputs")
}
