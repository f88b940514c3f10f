// src/constants.rs

/// The name of the append-only log file inside each run directory.
pub const RUN_LOG_FILENAME: &str = "run.log";

/// Default base directory for generated run directories.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "simulation_outputs";

/// Default naming template for a run directory. Placeholders are filled per
/// sweep combination.
pub const DEFAULT_RUN_DIR_PATTERN: &str =
    "images_{sky_name_no_ext}_{tel_name}{error_suffix}_{pc_id}";

/// Default filenames for the generated per-run INI files.
pub const DEFAULT_BEAM_INI_FILENAME: &str = "beam.ini";
pub const DEFAULT_INTERF_INI_FILENAME: &str = "interf.ini";

/// Default visibility-set name written into interferometer configs.
pub const DEFAULT_MS_FILENAME: &str = "vis.ms";

/// Default root path for beam-pattern outputs written into beam configs.
pub const DEFAULT_BEAM_ROOT_PATH: &str = "beam_output";

/// Default base directory (relative to the project root) for sky-model files.
pub const DEFAULT_SKY_MODELS_DIR: &str = "sky_models";

/// Default solution filename for the calibration stage.
pub const DEFAULT_SOLUTION_FILENAME: &str = "hyperdrive_solutions.fits";

/// Executable names used when the sweep document supplies no overrides.
pub const BEAM_EXECUTABLE: &str = "oskar_sim_beam_pattern";
pub const INTERF_EXECUTABLE: &str = "oskar_sim_interferometer";
pub const CALIBRATE_EXECUTABLE: &str = "hyperdrive";

/// Version string written into `General/version` when the defaults tree
/// carries none.
pub const UNKNOWN_VERSION: &str = "unknown";

/// The shared top-level sections seeded into every generated tree.
pub const COMMON_SECTIONS: [&str; 4] = ["General", "simulator", "observation", "telescope"];

/// Directory-name suffixes derived from the global error-injection flag.
pub const ERRORS_ON_SUFFIX: &str = "_errors_on";
pub const ERRORS_OFF_SUFFIX: &str = "_errors_off";

/// Timestamp format used for run-log entries.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
