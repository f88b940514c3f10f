// src/models.rs

use serde::Deserialize;
use std::path::PathBuf;

use crate::constants;
use crate::core::settings::SettingsTree;

// --- MASTER SWEEP DOCUMENT MODELS ---
// These mirror the user-authored YAML document. It is read once at startup
// and is read-only for the rest of the sweep; per-run trees are deep copies.

/// The deserialized structure of the master sweep document.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MasterConfig {
    #[serde(default)]
    pub run_settings: RunSettings,
    #[serde(default)]
    pub output_config: OutputConfig,
    #[serde(default)]
    pub iteration_parameters: IterationParameters,
    /// The deeply nested simulator defaults: shared sections plus the
    /// `beam_pattern_module` / `interferometer_module` subtrees.
    #[serde(default)]
    pub oskar_ini_defaults: SettingsTree,
    #[serde(default)]
    pub executables: ExecutablesConfig,
    pub calibration_settings: Option<CalibrationConfig>,
}

/// Global toggles controlling which stages run and how.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct RunSettings {
    #[serde(default)]
    pub run_beam_sim: bool,
    #[serde(default)]
    pub run_interf_sim: bool,
    #[serde(default)]
    pub run_calibration: bool,
    /// When false, all time-varying antenna error magnitudes are forced to
    /// "0.0" regardless of per-phase-centre overrides.
    #[serde(default)]
    pub include_telescope_errors: bool,
    /// Validate and log intended commands without launching anything.
    #[serde(default)]
    pub dry_run: bool,
}

/// Naming templates and base filenames for generated artifacts.
#[derive(Deserialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub base_output_directory: PathBuf,
    #[serde(default = "default_run_dir_pattern")]
    pub images_folder_pattern: String,
    #[serde(default = "default_beam_ini_filename")]
    pub beam_ini_filename: String,
    #[serde(default = "default_interf_ini_filename")]
    pub interf_ini_filename: String,
    #[serde(default = "default_beam_root_path")]
    pub beam_root_path_base: String,
    #[serde(default = "default_ms_filename")]
    pub interf_ms_base_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_output_directory: default_output_directory(),
            images_folder_pattern: default_run_dir_pattern(),
            beam_ini_filename: default_beam_ini_filename(),
            interf_ini_filename: default_interf_ini_filename(),
            beam_root_path_base: default_beam_root_path(),
            interf_ms_base_filename: default_ms_filename(),
        }
    }
}

/// The three sweep axes plus the shared sky-model base directory.
#[derive(Deserialize, Debug, Clone)]
pub struct IterationParameters {
    #[serde(default)]
    pub telescope_configs: Vec<TelescopeConfig>,
    #[serde(default)]
    pub sky_model_configs: Vec<SkyModelConfig>,
    #[serde(default = "default_sky_models_dir")]
    pub sky_models_base_dir: PathBuf,
    #[serde(default)]
    pub phase_centre_configs: Vec<PhaseCentreConfig>,
}

impl Default for IterationParameters {
    fn default() -> Self {
        Self {
            telescope_configs: Vec::new(),
            sky_model_configs: Vec::new(),
            sky_models_base_dir: default_sky_models_dir(),
            phase_centre_configs: Vec::new(),
        }
    }
}

/// One telescope on the sweep's outermost axis.
#[derive(Deserialize, Debug, Clone)]
pub struct TelescopeConfig {
    pub name: String,
    /// Path to the telescope array description, relative to the project root.
    pub input_directory: PathBuf,
    /// Hardware error magnitudes; only meaningful when
    /// `include_telescope_errors` is set.
    pub gain_error_std: Option<String>,
    pub phase_error_std: Option<String>,
}

/// One source catalog on the sky-model axis.
#[derive(Deserialize, Debug, Clone)]
pub struct SkyModelConfig {
    /// Filename relative to `sky_models_base_dir`.
    pub filename: String,
}

/// One pointing on the phase-centre axis.
#[derive(Deserialize, Debug, Clone)]
pub struct PhaseCentreConfig {
    pub id: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub start_time_utc: String,
    /// Per-pointing overrides of the time-varying error magnitudes, applied
    /// only when the global error flag is on.
    pub gain_error_std: Option<String>,
    pub phase_error_std: Option<String>,
}

/// Names or paths of the external programs to invoke.
#[derive(Deserialize, Debug, Clone)]
pub struct ExecutablesConfig {
    #[serde(default = "default_beam_executable")]
    pub beam_pattern: String,
    #[serde(default = "default_interf_executable")]
    pub interferometer: String,
    #[serde(default = "default_calibrate_executable")]
    pub calibrate: String,
}

impl Default for ExecutablesConfig {
    fn default() -> Self {
        Self {
            beam_pattern: default_beam_executable(),
            interferometer: default_interf_executable(),
            calibrate: default_calibrate_executable(),
        }
    }
}

/// Settings for the calibration stage.
#[derive(Deserialize, Debug, Clone)]
pub struct CalibrationConfig {
    /// Source list for calibration. An unset value is passed to the command
    /// line as the literal token `None`, which the run log makes visible.
    pub source_list: Option<String>,
    #[serde(default = "default_solution_filename")]
    pub solution_output: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            source_list: None,
            solution_output: default_solution_filename(),
        }
    }
}

// --- serde default helpers ---

fn default_output_directory() -> PathBuf {
    PathBuf::from(constants::DEFAULT_OUTPUT_DIRECTORY)
}
fn default_run_dir_pattern() -> String {
    constants::DEFAULT_RUN_DIR_PATTERN.to_string()
}
fn default_beam_ini_filename() -> String {
    constants::DEFAULT_BEAM_INI_FILENAME.to_string()
}
fn default_interf_ini_filename() -> String {
    constants::DEFAULT_INTERF_INI_FILENAME.to_string()
}
fn default_beam_root_path() -> String {
    constants::DEFAULT_BEAM_ROOT_PATH.to_string()
}
fn default_ms_filename() -> String {
    constants::DEFAULT_MS_FILENAME.to_string()
}
fn default_sky_models_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_SKY_MODELS_DIR)
}
fn default_solution_filename() -> String {
    constants::DEFAULT_SOLUTION_FILENAME.to_string()
}
fn default_beam_executable() -> String {
    constants::BEAM_EXECUTABLE.to_string()
}
fn default_interf_executable() -> String {
    constants::INTERF_EXECUTABLE.to_string()
}
fn default_calibrate_executable() -> String {
    constants::CALIBRATE_EXECUTABLE.to_string()
}
