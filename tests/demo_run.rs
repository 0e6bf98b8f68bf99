//! An integration test driving the bundled demo model end to end through the CSV pipeline.
use float_cmp::approx_eq;
use gridplan::input::load_system;
use gridplan::optimisation::assemble;
use gridplan::output::{create_output_directory, write_results};
use gridplan::settings::Settings;
use gridplan::system::Stage;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the bundled demo model.
fn get_demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("two_bus")
}

#[test]
fn test_demo_model_end_to_end() {
    let demo_dir = get_demo_dir();
    let settings = Settings::from_path(&demo_dir).unwrap();
    let system = load_system(demo_dir.join("inputs")).unwrap();

    // The wind unit was promoted to second stage by its capacity factor entries
    assert_eq!(system.generators["wind_south"].stage, Stage::Variable);
    assert_eq!(system.generators["gas_north"].stage, Stage::Dispatchable);
    assert!(approx_eq!(
        f64,
        system.scenarios.values().map(|s| s.probability).sum::<f64>(),
        1.0,
        epsilon = 1e-9
    ));

    let solution = assemble(&system, &settings.formulation).solve().unwrap();

    // Capacity stays between the existing floor and the build limit
    for (name, generator) in &system.generators {
        match generator.stage {
            Stage::Dispatchable => {
                let capacity = solution.generator_capacity(name);
                assert!(capacity >= generator.exist_cap - 1e-4);
                assert!(capacity <= generator.cap_limit + 1e-4);
            }
            Stage::Variable => {
                for (s, _) in system.iter_scenarios() {
                    let capacity = solution.scenario_capacity(name, s);
                    assert!(capacity >= generator.exist_cap - 1e-4);
                    assert!(capacity <= generator.cap_limit + 1e-4);

                    // Dispatch respects the capacity factor share of capacity
                    for (t, _) in system.iter_timepoints() {
                        let dispatch = solution.scenario_dispatch(name, s, t);
                        let cf = system.capacity_factor(name, s, t);
                        assert!(dispatch >= -1e-4);
                        assert!(dispatch <= cf * capacity + 1e-4);
                    }
                }
            }
        }
    }

    // Power balance holds everywhere and the slack angle is the exact reference
    for bus in 0..system.n_buses() {
        for (s, _) in system.iter_scenarios() {
            for (t, _) in system.iter_timepoints() {
                let surplus = solution.injection_at_bus(bus, s, t)
                    - system.load(bus, s, t)
                    - solution.flow_at_bus(bus, s, t);
                assert!(surplus >= -1e-4, "Power balance violated at bus {bus}");

                let angle = solution.angle(bus, s, t);
                if bus == system.slack_bus {
                    assert_eq!(angle, 0.0);
                }
                assert!(angle.abs() <= system.policy.max_diffangle + 1e-6);
            }
        }
    }

    // The storage state of energy follows its dynamics around each cycle
    for (name, unit) in &system.storage_units {
        let sqrt_eff = unit.efficiency.sqrt();
        for (s, _) in system.iter_scenarios() {
            for (t, timepoint) in system.iter_timepoints() {
                let residual = solution.storage_state_of_energy(name, s, t)
                    - solution.storage_state_of_energy(name, s, timepoint.prev)
                    - sqrt_eff * solution.storage_charge(name, s, t) * timepoint.duration_hrs
                    + solution.storage_discharge(name, s, t) * timepoint.duration_hrs / sqrt_eff;
                assert!(residual.abs() <= 1e-4, "Storage dynamics violated for {name}");
            }
        }
    }

    // The itemised costs reproduce the objective
    let costs = solution.cost_breakdown();
    assert!(approx_eq!(
        f64,
        costs.total,
        solution.objective_value(),
        epsilon = 1e-6 * costs.total.abs().max(1.0)
    ));
    let generator_costs = solution.generator_cost_breakdown();
    assert!(generator_costs.total <= costs.total + 1e-6);

    // Write results and check the emitted files
    let out_dir = tempdir().unwrap();
    let output_path = create_output_directory(out_dir.path()).unwrap();
    write_results(&solution, &output_path).unwrap();

    for file_name in [
        "gen_cap.csv",
        "gen_dispatch.csv",
        "var_gen_cap.csv",
        "var_gen_dispatch.csv",
        "storage_cap.csv",
        "storage_dispatch.csv",
        "costs_itemized.csv",
        "gen_costs_itemized.csv",
    ] {
        assert!(output_path.join(file_name).is_file(), "{file_name} missing");
    }

    // Round trip: the emitted total cost matches the recomputed objective
    let mut reader = csv::Reader::from_path(output_path.join("costs_itemized.csv")).unwrap();
    let mut emitted_total = None;
    for record in reader.records() {
        let record = record.unwrap();
        if &record[0] == "TotalCost" {
            emitted_total = Some(record[1].parse::<f64>().unwrap());
        }
    }
    let emitted_total = emitted_total.expect("No TotalCost row");
    assert!(approx_eq!(
        f64,
        emitted_total,
        solution.objective_value(),
        epsilon = 1e-6 * emitted_total.abs().max(1.0)
    ));
}

#[test]
fn test_demo_model_dump() {
    let demo_dir = get_demo_dir();
    let system = load_system(demo_dir.join("inputs")).unwrap();
    let plan = assemble(&system, &Default::default());

    let mut dump = Vec::new();
    plan.dump_model(&mut dump).unwrap();
    let text = String::from_utf8(dump).unwrap();
    assert!(text.contains(&format!("variables: {}", plan.num_variables())));
}
