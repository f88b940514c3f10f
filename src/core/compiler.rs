//! # Config Compiler
//!
//! Builds the per-run [`SettingsTree`] for one sweep combination, one builder
//! per executable kind. Both builders follow the same shape: seed the shared
//! sections from the defaults document (deep-copied, never mutated in
//! place), merge in the module-specific subtree, then override the named
//! per-run fields. Fields the defaults document leaves unset resolve to
//! `Absent` and are dropped at flatten time; the simulator applies its own
//! defaults for those.

use std::path::Path;

use crate::constants;
use crate::core::paths::{self, PathError};
use crate::core::settings::{SettingsTree, SettingsValue};
use crate::models::{
    OutputConfig, PhaseCentreConfig, RunSettings, SkyModelConfig, TelescopeConfig,
};

/// Everything shared across the combinations of one sweep: the read-only
/// defaults document, global toggles, output naming, and the project root
/// against which input paths in the document are resolved.
#[derive(Debug, Clone, Copy)]
pub struct CompilerContext<'a> {
    pub defaults: &'a SettingsTree,
    pub run_settings: &'a RunSettings,
    pub output: &'a OutputConfig,
    pub project_root: &'a Path,
}

impl CompilerContext<'_> {
    /// The settings tree for one beam-pattern simulation run.
    pub fn build_beam_tree(
        &self,
        tel: &TelescopeConfig,
        pc: &PhaseCentreConfig,
        run_dir: &Path,
    ) -> Result<SettingsTree, PathError> {
        let mut tree = self.seed_common_sections();
        if let Some(module) = self.defaults.get_tree("beam_pattern_module") {
            tree.merge_module(module);
        }

        self.apply_general(&mut tree, constants::BEAM_EXECUTABLE);
        self.apply_simulator(&mut tree);
        self.apply_observation(&mut tree, pc);
        self.apply_telescope(&mut tree, tel, pc, run_dir)?;

        let beam = tree.subtree_mut("beam_pattern");
        beam.subtree_mut("beam_image").set(
            "fov_deg",
            self.defaults
                .leaf("beam_pattern_module/beam_pattern/beam_image/fov_deg"),
        );
        // root_path is read by the simulator relative to the INI's own
        // directory, so the base name goes in untouched.
        beam.set("root_path", self.output.beam_root_path_base.as_str());
        let amp = self
            .defaults
            .leaf("beam_pattern_module/beam_pattern/station_outputs/fits_image/amp");
        beam.subtree_mut_path("station_outputs/fits_image").set(
            "amp",
            if amp.is_absent() {
                SettingsValue::Bool(true)
            } else {
                amp
            },
        );

        Ok(tree)
    }

    /// The settings tree for one interferometer simulation run.
    pub fn build_interferometer_tree(
        &self,
        tel: &TelescopeConfig,
        sky: &SkyModelConfig,
        pc: &PhaseCentreConfig,
        sky_models_base_dir: &Path,
        run_dir: &Path,
    ) -> Result<SettingsTree, PathError> {
        let mut tree = self.seed_common_sections();
        if let Some(module) = self.defaults.get_tree("interferometer_module") {
            tree.merge_module(module);
        }

        self.apply_general(&mut tree, constants::INTERF_EXECUTABLE);
        self.apply_simulator(&mut tree);
        self.apply_observation(&mut tree, pc);
        self.apply_telescope(&mut tree, tel, pc, run_dir)?;

        let interf = tree.subtree_mut("interferometer");
        // ms_filename is likewise relative to the INI's directory.
        interf.set("ms_filename", self.output.interf_ms_base_filename.as_str());
        interf.set(
            "channel_bandwidth_hz",
            self.defaults
                .leaf("interferometer_module/interferometer/channel_bandwidth_hz"),
        );
        interf.set(
            "time_average_sec",
            self.defaults
                .leaf("interferometer_module/interferometer/time_average_sec"),
        );

        let sky_file_abs = self
            .project_root
            .join(sky_models_base_dir)
            .join(&sky.filename);
        let sky_file_rel = paths::relative_to(&sky_file_abs, run_dir)?;
        let sky_model = tree.subtree_mut_path("sky/oskar_sky_model");
        sky_model.set("file", sky_file_rel.to_string_lossy().into_owned());
        sky_model.subtree_mut("filter").set(
            "radius_outer_deg",
            self.defaults
                .leaf("interferometer_module/sky/oskar_sky_model/filter/radius_outer_deg"),
        );

        Ok(tree)
    }

    /// Deep copies of the shared sections; a missing section still appears,
    /// empty, so later overrides have somewhere to land.
    fn seed_common_sections(&self) -> SettingsTree {
        let mut tree = SettingsTree::new();
        for section in constants::COMMON_SECTIONS {
            match self.defaults.get_tree(section) {
                Some(subtree) => tree.set(section, subtree.clone()),
                None => tree.set(section, SettingsTree::new()),
            }
        }
        tree
    }

    fn apply_general(&self, tree: &mut SettingsTree, app: &str) {
        let version = match self.defaults.leaf("General/version") {
            SettingsValue::Absent => SettingsValue::Str(constants::UNKNOWN_VERSION.into()),
            v => v,
        };
        let general = tree.subtree_mut("General");
        general.set("app", app);
        general.set("version", version);
    }

    fn apply_simulator(&self, tree: &mut SettingsTree) {
        let simulator = tree.subtree_mut("simulator");
        simulator.set("use_gpus", self.defaults.leaf("simulator/use_gpus"));
        simulator.set(
            "double_precision",
            self.defaults.leaf("simulator/double_precision"),
        );
    }

    fn apply_observation(&self, tree: &mut SettingsTree, pc: &PhaseCentreConfig) {
        let observation = tree.subtree_mut("observation");
        observation.set("phase_centre_ra_deg", pc.ra_deg);
        observation.set("phase_centre_dec_deg", pc.dec_deg);
        observation.set("start_time_utc", pc.start_time_utc.as_str());
        for field in [
            "start_frequency_hz",
            "frequency_inc_hz",
            "num_channels",
            "length",
            "num_time_steps",
        ] {
            observation.set(field, self.defaults.leaf(&format!("observation/{field}")));
        }
    }

    fn apply_telescope(
        &self,
        tree: &mut SettingsTree,
        tel: &TelescopeConfig,
        pc: &PhaseCentreConfig,
        run_dir: &Path,
    ) -> Result<(), PathError> {
        let input_abs = self.project_root.join(&tel.input_directory);
        let input_rel = paths::relative_to(&input_abs, run_dir)?;

        let (gain_std, phase_std) = self.effective_error_stds(pc);

        let telescope = tree.subtree_mut("telescope");
        telescope.set("input_directory", input_rel.to_string_lossy().into_owned());

        let enable_numerical = self
            .defaults
            .leaf("telescope/aperture_array/element_pattern/enable_numerical");
        telescope
            .subtree_mut_path("aperture_array/element_pattern")
            .set(
                "enable_numerical",
                if enable_numerical.is_absent() {
                    SettingsValue::Bool(false)
                } else {
                    enable_numerical
                },
            );

        let element = telescope.subtree_mut_path("aperture_array/array_pattern/element");
        // Fixed (non-time-varying) gain/phase come straight from defaults,
        // regardless of the error-injection flag.
        for field in [
            "x_gain",
            "y_gain",
            "x_phase_error_fixed_deg",
            "y_phase_error_fixed_deg",
        ] {
            element.set(
                field,
                self.defaults.leaf(&format!(
                    "telescope/aperture_array/array_pattern/element/{field}"
                )),
            );
        }
        element.set("x_gain_error_time", gain_std.as_str());
        element.set("y_gain_error_time", gain_std.as_str());
        element.set("x_phase_error_time_deg", phase_std.as_str());
        element.set("y_phase_error_time_deg", phase_std.as_str());

        Ok(())
    }

    /// The time-varying error magnitudes: zero unless error injection is
    /// globally enabled, in which case the phase centre's overrides apply
    /// (identically to both polarisation axes).
    fn effective_error_stds(&self, pc: &PhaseCentreConfig) -> (String, String) {
        if !self.run_settings.include_telescope_errors {
            return ("0.0".into(), "0.0".into());
        }
        (
            pc.gain_error_std.clone().unwrap_or_else(|| "0.0".into()),
            pc.phase_error_std.clone().unwrap_or_else(|| "0.0".into()),
        )
    }
}
