//! Program settings, read from an optional `settings.toml` in the model directory.
use crate::input::read_toml;
use anyhow::Result;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Model settings
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// The "global" section of the settings file
    #[serde(default)]
    pub global: Global,
    /// The "formulation" section of the settings file
    #[serde(default)]
    pub formulation: Formulation,
}

/// Represents the "global" section of the settings file.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Global {
    /// The program log level
    pub log_level: Option<String>,
    /// Whether to write a human-readable model dump alongside the results
    #[serde(default)]
    pub debug_model: bool,
}

/// Represents the "formulation" section of the settings file.
///
/// These switches select between the compatibility behaviours kept as defaults and their
/// stricter alternatives (see the module documentation of [`crate::optimisation`]).
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Formulation {
    /// How scenario-dependent cost terms are weighted in the objective
    pub expectation_mode: ExpectationMode,
    /// Which flow limit constraints are applied
    pub flow_limits: FlowLimits,
    /// Whether line shunt admittances are included in the admittance matrix
    pub include_shunts: bool,
}

impl Default for Formulation {
    fn default() -> Self {
        Self {
            expectation_mode: ExpectationMode::SourceCompat,
            flow_limits: FlowLimits::Aggregate,
            include_shunts: true,
        }
    }
}

/// How scenario-dependent cost terms are weighted in the objective.
#[derive(Clone, Copy, Debug, PartialEq, DeserializeLabeledStringEnum)]
pub enum ExpectationMode {
    /// Weight each scenario by `probability / number_of_scenarios`.
    ///
    /// The extra division by the scenario count is kept for compatibility with results produced
    /// by earlier versions of this model.
    #[string = "source_compat"]
    SourceCompat,
    /// Weight each scenario by its probability only
    #[string = "probability_only"]
    ProbabilityOnly,
}

/// Which flow limit constraints are applied.
#[derive(Clone, Copy, Debug, PartialEq, DeserializeLabeledStringEnum)]
pub enum FlowLimits {
    /// Cap the net DC injection at each bus by the summed rating of its incident lines.
    ///
    /// Looser than a per-line limit, but kept as the default for compatibility.
    #[string = "aggregate"]
    Aggregate,
    /// Cap the flow on each line by its own rating
    #[string = "per_line"]
    PerLine,
}

impl Settings {
    /// Read settings from the `settings.toml` file in the given model directory, if present.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing the model
    ///
    /// # Returns
    ///
    /// The settings, or the defaults if the file does not exist.
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Settings> {
        let file_path = model_dir.as_ref().join(SETTINGS_FILE_NAME);
        if !file_path.exists() {
            return Ok(Settings::default());
        }

        read_toml(&file_path)
    }
}
