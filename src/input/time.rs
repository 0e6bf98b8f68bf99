//! Code for reading the time discretisation and resolving the timescale.
//!
//! Timepoints are grouped into timeseries. Each timepoint inherits its duration from its
//! timeseries and gets a weight converting per-timepoint costs into per-period costs. The
//! timepoints of a series form a closed loop: the previous timepoint of the first is the last.
use super::*;
use crate::system::{Timepoint, Timeseries};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const TIMESERIES_FILE_NAME: &str = "timeseries.csv";
const TIMEPOINTS_FILE_NAME: &str = "timepoints.csv";

/// A timeseries record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct TimeseriesRaw {
    name: String,
    duration_of_timepoints: f64,
    number_timepoints: usize,
    scale_to_period: f64,
}

/// A timepoint record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct TimepointRaw {
    id: u32,
    name: String,
    timeseries_name: String,
}

/// Read the timeseries and timepoints CSV files and resolve the timescale.
///
/// Resolution links each timepoint to its timeseries, sets its duration and weight
/// (`duration · scale_to_period`), fills the series' ordered timepoint list, and sets the cyclic
/// previous-timepoint index. Timepoint IDs within a timeseries must form a contiguous ascending
/// range, so that the wrap from the first to the last produces a true cyclic boundary.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
///
/// # Returns
///
/// The timeseries keyed by name and the timepoints ordered by ID (position gives the timepoint
/// index).
pub fn read_timescale(
    inputs_dir: &Path,
) -> Result<(IndexMap<Rc<str>, Timeseries>, Vec<Timepoint>)> {
    let series_path = inputs_dir.join(TIMESERIES_FILE_NAME);
    let series = read_series_from_iter(read_csv(&series_path)?)
        .with_context(|| input_err_msg(&series_path))?;

    let timepoints_path = inputs_dir.join(TIMEPOINTS_FILE_NAME);
    let timepoints = resolve_timescale(read_csv(&timepoints_path)?, series)
        .with_context(|| input_err_msg(&timepoints_path))?;
    Ok(timepoints)
}

fn read_series_from_iter<I>(iter: I) -> Result<IndexMap<Rc<str>, Timeseries>>
where
    I: Iterator<Item = TimeseriesRaw>,
{
    let mut series = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.duration_of_timepoints > 0.0,
            "Timeseries {} must have duration_of_timepoints > 0",
            raw.name
        );
        ensure!(
            raw.number_timepoints > 0,
            "Timeseries {} must have number_timepoints > 0",
            raw.name
        );

        let name: Rc<str> = Rc::from(raw.name.as_str());
        let entry = Timeseries {
            name: Rc::clone(&name),
            duration_of_timepoints: raw.duration_of_timepoints,
            number_timepoints: raw.number_timepoints,
            scale_to_period: raw.scale_to_period,
            timepoints: Vec::with_capacity(raw.number_timepoints),
        };
        ensure!(
            series.insert(name, entry).is_none(),
            "Duplicate timeseries name found: {}",
            raw.name
        );
    }

    Ok(series)
}

fn resolve_timescale<I>(
    iter: I,
    mut series: IndexMap<Rc<str>, Timeseries>,
) -> Result<(IndexMap<Rc<str>, Timeseries>, Vec<Timepoint>)>
where
    I: Iterator<Item = TimepointRaw>,
{
    let mut raws = iter.collect_vec();
    raws.sort_by_key(|raw| raw.id);
    ensure!(
        raws.iter().tuple_windows().all(|(a, b)| a.id < b.id),
        "Timepoint IDs must be unique"
    );

    let mut names = std::collections::HashSet::new();
    let mut timepoints = Vec::with_capacity(raws.len());
    for (idx, raw) in raws.iter().enumerate() {
        ensure!(
            names.insert(raw.name.clone()),
            "Duplicate timepoint name found: {}",
            raw.name
        );
        let series_idx = series
            .get_index_of(raw.timeseries_name.as_str())
            .with_context(|| format!("Unknown timeseries {} found", raw.timeseries_name))?;
        let entry = &mut series[series_idx];
        entry.timepoints.push(idx);

        timepoints.push(Timepoint {
            id: raw.id,
            name: Rc::from(raw.name.as_str()),
            timeseries: series_idx,
            duration_hrs: entry.duration_of_timepoints,
            weight: entry.duration_of_timepoints * entry.scale_to_period,
            // Resolved below once the series membership is complete
            prev: idx,
        });
    }

    // Close each series into a loop and check its shape
    for entry in series.values() {
        ensure!(
            entry.timepoints.len() == entry.number_timepoints,
            "Timeseries {} has {} timepoints but declares {}",
            entry.name,
            entry.timepoints.len(),
            entry.number_timepoints
        );
        ensure!(
            entry
                .timepoints
                .iter()
                .tuple_windows()
                .all(|(&a, &b)| timepoints[b].id == timepoints[a].id + 1),
            "Timepoint IDs in timeseries {} must be contiguous",
            entry.name
        );

        let first = entry.timepoints[0];
        let last = *entry.timepoints.last().unwrap();
        timepoints[first].prev = last;
        for (&a, &b) in entry.timepoints.iter().tuple_windows() {
            timepoints[b].prev = a;
        }
    }

    Ok((series, timepoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_file(dir_path: &Path, file_name: &str, contents: &str) {
        let mut file = File::create(dir_path.join(file_name)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    fn create_timescale_files(dir_path: &Path, timepoints: &str) {
        create_file(
            dir_path,
            TIMESERIES_FILE_NAME,
            "name,duration_of_timepoints,number_timepoints,scale_to_period
winter,6,2,365
summer,6,2,365",
        );
        create_file(dir_path, TIMEPOINTS_FILE_NAME, timepoints);
    }

    #[test]
    fn test_read_timescale() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "id,name,timeseries_name
0,winter_day,winter
1,winter_night,winter
2,summer_day,summer
3,summer_night,summer",
        );

        let (series, timepoints) = read_timescale(dir.path()).unwrap();
        assert_eq!(timepoints.len(), 4);
        assert_eq!(series["winter"].timepoints, vec![0, 1]);
        assert_eq!(series["summer"].timepoints, vec![2, 3]);

        // Weight is duration times scale
        assert_eq!(timepoints[0].weight, 6.0 * 365.0);
        assert_eq!(timepoints[0].duration_hrs, 6.0);

        // The previous-timepoint linkage wraps within each series
        assert_eq!(timepoints[0].prev, 1);
        assert_eq!(timepoints[1].prev, 0);
        assert_eq!(timepoints[2].prev, 3);
        assert_eq!(timepoints[3].prev, 2);
    }

    #[test]
    fn test_read_timescale_single_timepoint_series() {
        let dir = tempdir().unwrap();
        create_file(
            dir.path(),
            TIMESERIES_FILE_NAME,
            "name,duration_of_timepoints,number_timepoints,scale_to_period
all,24,1,365",
        );
        create_file(
            dir.path(),
            TIMEPOINTS_FILE_NAME,
            "id,name,timeseries_name
0,all_day,all",
        );

        let (_, timepoints) = read_timescale(dir.path()).unwrap();
        assert_eq!(timepoints[0].prev, 0);
    }

    #[test]
    fn test_read_timescale_count_mismatch() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "id,name,timeseries_name
0,winter_day,winter
1,winter_night,winter
2,summer_day,summer",
        );

        assert!(read_timescale(dir.path()).is_err());
    }

    #[test]
    fn test_read_timescale_non_contiguous_ids() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "id,name,timeseries_name
0,winter_day,winter
2,winter_night,winter
1,summer_day,summer
3,summer_night,summer",
        );

        assert!(read_timescale(dir.path()).is_err());
    }

    #[test]
    fn test_read_timescale_unknown_series() {
        let dir = tempdir().unwrap();
        create_timescale_files(
            dir.path(),
            "id,name,timeseries_name
0,spring_day,spring
1,winter_day,winter
2,winter_night,winter
3,summer_day,summer",
        );

        assert!(read_timescale(dir.path()).is_err());
    }
}
