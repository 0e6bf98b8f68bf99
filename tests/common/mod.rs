//! Shared helpers for building small systems in integration tests.
use gridplan::system::{
    Bus, Generator, Line, Policy, Scenario, Stage, StorageUnit, System, Timepoint, Timeseries,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

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

pub fn line(name: &str, from_bus: usize, to_bus: usize, rate: f64, x: f64) -> Line {
    Line {
        name: name.into(),
        from_bus,
        to_bus,
        rate,
        r: 0.0,
        x,
        g: 0.0,
        b: 0.0,
    }
}

/// A first-stage generator with linear cost `c1` and no quadratic or constant term
pub fn dispatchable(
    name: &str,
    bus: usize,
    c1: f64,
    invest_cost: f64,
    exist_cap: f64,
    cap_limit: f64,
) -> Generator {
    Generator {
        name: name.into(),
        tech: "thermal".to_string(),
        bus,
        c2: 0.0,
        c1,
        c0: 0.0,
        invest_cost,
        exist_cap,
        cap_limit,
        var_om_cost: 0.0,
        stage: Stage::Dispatchable,
    }
}

/// A second-stage generator; its capacity factor profile is supplied separately
pub fn variable(name: &str, bus: usize, var_om_cost: f64, cap_limit: f64) -> Generator {
    Generator {
        name: name.into(),
        tech: "wind".to_string(),
        bus,
        c2: 0.0,
        c1: 0.0,
        c0: 0.0,
        invest_cost: 0.0,
        exist_cap: 0.0,
        cap_limit,
        var_om_cost,
        stage: Stage::Variable,
    }
}

pub fn storage(name: &str, bus: usize, invest_cost: f64, efficiency: f64, duration: f64) -> StorageUnit {
    StorageUnit {
        name: name.into(),
        tech: "battery".to_string(),
        bus,
        invest_cost,
        exist_power_cap: 0.0,
        exist_energy_cap: 0.0,
        var_om_cost: 0.0,
        efficiency,
        duration,
    }
}

/// Assemble a [`System`] from parts.
///
/// A single timeseries of `n_timepoints` unit-duration, unit-scale timepoints is used.
/// Scenarios are (name, probability) pairs; loads are (bus, scenario, timepoint, MW) entries;
/// capacity factor profiles are dense over (scenario, timepoint).
pub fn build_system(
    buses: Vec<Bus>,
    lines: Vec<Line>,
    generators: Vec<Generator>,
    capacity_factors: Vec<(&str, Vec<f64>)>,
    storage_units: Vec<StorageUnit>,
    scenarios: Vec<(&str, f64)>,
    n_timepoints: usize,
    loads: Vec<(usize, usize, usize, f64)>,
    max_diffangle_deg: f64,
) -> System {
    let slack_bus = buses.iter().position(|b| b.slack).expect("No slack bus");
    let buses: IndexMap<Rc<str>, Bus> = buses
        .into_iter()
        .map(|b| (Rc::clone(&b.name), b))
        .collect();
    let generators: IndexMap<Rc<str>, Generator> = generators
        .into_iter()
        .map(|g| (Rc::clone(&g.name), g))
        .collect();
    let storage_units: IndexMap<Rc<str>, StorageUnit> = storage_units
        .into_iter()
        .map(|s| (Rc::clone(&s.name), s))
        .collect();
    let scenarios: IndexMap<Rc<str>, Scenario> = scenarios
        .into_iter()
        .map(|(name, probability)| {
            let name: Rc<str> = name.into();
            (
                Rc::clone(&name),
                Scenario { name, probability },
            )
        })
        .collect();

    let series_name: Rc<str> = "base".into();
    let timeseries: IndexMap<Rc<str>, Timeseries> = [(
        Rc::clone(&series_name),
        Timeseries {
            name: series_name,
            duration_of_timepoints: 1.0,
            number_timepoints: n_timepoints,
            scale_to_period: 1.0,
            timepoints: (0..n_timepoints).collect(),
        },
    )]
    .into_iter()
    .collect();
    let timepoints: Vec<Timepoint> = (0..n_timepoints)
        .map(|idx| Timepoint {
            id: idx as u32,
            name: format!("t{idx}").into(),
            timeseries: 0,
            duration_hrs: 1.0,
            weight: 1.0,
            prev: if idx == 0 { n_timepoints - 1 } else { idx - 1 },
        })
        .collect();

    let capacity_factors: HashMap<Rc<str>, Vec<f64>> = capacity_factors
        .into_iter()
        .map(|(name, profile)| {
            assert_eq!(profile.len(), scenarios.len() * n_timepoints);
            (Rc::from(name), profile)
        })
        .collect();

    let n_scenarios = scenarios.len();
    let mut load_table = vec![0.0; buses.len() * n_scenarios * n_timepoints];
    for (bus, scenario, timepoint, mw) in loads {
        load_table[(bus * n_scenarios + scenario) * n_timepoints + timepoint] = mw;
    }

    System {
        buses,
        slack_bus,
        lines,
        generators,
        storage_units,
        scenarios,
        timeseries,
        timepoints,
        loads: load_table,
        capacity_factors,
        policy: Policy {
            max_diffangle: max_diffangle_deg.to_radians(),
        },
    }
}
