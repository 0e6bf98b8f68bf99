//! Code for reading energy storage units from an input file.
use super::*;
use crate::system::{Bus, StorageUnit};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const STORAGE_FILE_NAME: &str = "energy_storage.csv";

/// A storage record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct StorageRaw {
    name: String,
    tech: String,
    bus_name: String,
    invest_cost: f64,
    exist_power_cap: f64,
    exist_energy_cap: f64,
    var_om_cost: f64,
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    efficiency: f64,
    duration: f64,
}

/// Read energy storage units from the storage CSV file.
///
/// The file may contain no data rows (a system without storage).
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
/// * `buses` - Buses for connection resolution
pub fn read_storage_units(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, StorageUnit>> {
    let file_path = inputs_dir.join(STORAGE_FILE_NAME);
    let iter = read_csv_optional(&file_path)?;
    read_storage_units_from_iter(iter, buses).with_context(|| input_err_msg(file_path))
}

fn read_storage_units_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, StorageUnit>>
where
    I: Iterator<Item = StorageRaw>,
{
    let mut units = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.exist_power_cap >= 0.0,
            "Storage unit {} must have exist_power_cap >= 0",
            raw.name
        );
        ensure!(
            raw.exist_energy_cap >= 0.0,
            "Storage unit {} must have exist_energy_cap >= 0",
            raw.name
        );
        ensure!(
            raw.duration > 0.0,
            "Storage unit {} must have duration > 0",
            raw.name
        );

        let name: Rc<str> = Rc::from(raw.name.as_str());
        let unit = StorageUnit {
            name: Rc::clone(&name),
            tech: raw.tech,
            bus: buses.index_of_id(&raw.bus_name)?,
            invest_cost: raw.invest_cost,
            exist_power_cap: raw.exist_power_cap,
            exist_energy_cap: raw.exist_energy_cap,
            var_om_cost: raw.var_om_cost,
            efficiency: raw.efficiency,
            duration: raw.duration,
        };
        ensure!(
            units.insert(name, unit).is_none(),
            "Duplicate storage unit name found: {}",
            raw.name
        );
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::Bus;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn test_buses() -> IndexMap<Rc<str>, Bus> {
        let name: Rc<str> = "south".into();
        [(
            Rc::clone(&name),
            Bus {
                name,
                kv: 230.0,
                bus_type: "transmission".to_string(),
                lat: 0.0,
                lon: 0.0,
                slack: true,
            },
        )]
        .into_iter()
        .collect()
    }

    fn create_storage_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(STORAGE_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_storage_units() {
        let dir = tempdir().unwrap();
        create_storage_file(
            dir.path(),
            "name,tech,bus_name,invest_cost,exist_power_cap,exist_energy_cap,var_om_cost,efficiency,duration
battery_south,li_ion,south,25,5,20,0.4,0.9,4",
        );

        let units = read_storage_units(dir.path(), &test_buses()).unwrap();
        assert_eq!(units.len(), 1);
        let unit = &units["battery_south"];
        assert_eq!(unit.bus, 0);
        assert_eq!(unit.efficiency, 0.9);
        assert_eq!(unit.duration, 4.0);
    }

    #[test]
    fn test_read_storage_units_empty() {
        let dir = tempdir().unwrap();
        create_storage_file(
            dir.path(),
            "name,tech,bus_name,invest_cost,exist_power_cap,exist_energy_cap,var_om_cost,efficiency,duration",
        );

        let units = read_storage_units(dir.path(), &test_buses()).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn test_read_storage_units_bad_efficiency() {
        let dir = tempdir().unwrap();
        create_storage_file(
            dir.path(),
            "name,tech,bus_name,invest_cost,exist_power_cap,exist_energy_cap,var_om_cost,efficiency,duration
battery_south,li_ion,south,25,5,20,0.4,1.2,4",
        );

        assert!(read_storage_units(dir.path(), &test_buses()).is_err());
    }
}
