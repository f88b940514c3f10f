//! # Sweep Orchestrator
//!
//! Walks the Cartesian product of the three sweep axes (telescope outermost,
//! then sky model, then phase centre), derives a unique run directory per
//! combination, and drives compile, write and invoke for each enabled stage.
//! No stage or combination failure ever aborts the sweep; outcomes live in
//! console output and each run directory's `run.log`.

use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::core::compiler::CompilerContext;
use crate::core::ini_writer;
use crate::models::MasterConfig;
use crate::system::runner::{self, StageRequest};

const BEAM_LABEL: &str = "OSKAR Beam Pattern simulation";
const INTERF_LABEL: &str = "OSKAR Interferometer simulation";
const CALIBRATE_LABEL: &str = "Calibration";

/// Aggregate counts for one whole sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Combinations enumerated (always the full Cartesian product).
    pub combinations: usize,
    pub stages_attempted: usize,
    pub stages_succeeded: usize,
}

/// Runs the full sweep described by `master`. Input paths in the document
/// are resolved against `project_root`.
pub fn run_sweep(master: &MasterConfig, project_root: &Path) -> SweepReport {
    let mut report = SweepReport::default();

    let iter = &master.iteration_parameters;
    if iter.telescope_configs.is_empty()
        || iter.sky_model_configs.is_empty()
        || iter.phase_centre_configs.is_empty()
    {
        log::warn!("One or more sweep axes are empty; nothing to do.");
        println!(
            "{}",
            "Warning: one or more sweep axes (telescopes, sky models, phase centres) \
             are empty. No configs will be generated."
                .yellow()
        );
        return report;
    }

    let run_settings = &master.run_settings;
    let base_output_dir = project_root.join(&master.output_config.base_output_directory);
    let compiler = CompilerContext {
        defaults: &master.oskar_ini_defaults,
        run_settings,
        output: &master.output_config,
        project_root,
    };

    for tel in &iter.telescope_configs {
        for sky in &iter.sky_model_configs {
            for pc in &iter.phase_centre_configs {
                report.combinations += 1;

                println!("\n--- Preparing Run {} ---", report.combinations);
                println!(
                    "  Telescope: {}, Sky: {}, Phase Centre: {}",
                    tel.name.cyan(),
                    sky.filename.cyan(),
                    pc.id.cyan()
                );

                let run_dir = base_output_dir.join(run_dir_name(
                    &master.output_config.images_folder_pattern,
                    &sky.filename,
                    &tel.name,
                    run_settings.include_telescope_errors,
                    &pc.id,
                ));
                // Idempotent: re-running a sweep over existing directories is
                // supported, the logs just keep accumulating.
                if let Err(e) = fs::create_dir_all(&run_dir) {
                    println!(
                        "  {} Could not create run directory {}: {e}",
                        "ERROR:".red().bold(),
                        run_dir.display()
                    );
                    continue;
                }
                println!("  Output Directory: {}", run_dir.display());

                if run_settings.run_beam_sim {
                    let outcome = run_simulation_stage(
                        &run_dir,
                        BEAM_LABEL,
                        &master.executables.beam_pattern,
                        &master.output_config.beam_ini_filename,
                        run_settings.dry_run,
                        || compiler.build_beam_tree(tel, pc, &run_dir),
                    );
                    record(&mut report, outcome);
                }

                if run_settings.run_interf_sim {
                    let outcome = run_simulation_stage(
                        &run_dir,
                        INTERF_LABEL,
                        &master.executables.interferometer,
                        &master.output_config.interf_ini_filename,
                        run_settings.dry_run,
                        || {
                            compiler.build_interferometer_tree(
                                tel,
                                sky,
                                pc,
                                &iter.sky_models_base_dir,
                                &run_dir,
                            )
                        },
                    );
                    record(&mut report, outcome);
                }

                if run_settings.run_calibration {
                    let outcome = run_calibration_stage(master, &run_dir);
                    record(&mut report, outcome);
                }
            }
        }
    }

    println!(
        "\nProcessed {} combinations in {}: {} of {} stage invocations succeeded.",
        report.combinations.to_string().cyan(),
        base_output_dir.display(),
        report.stages_succeeded.to_string().green(),
        report.stages_attempted
    );
    report
}

fn record(report: &mut SweepReport, succeeded: bool) {
    report.stages_attempted += 1;
    if succeeded {
        report.stages_succeeded += 1;
    }
}

/// Compile, write and invoke one simulation stage. Compile and write
/// failures count as stage failures; the sweep is never interrupted.
fn run_simulation_stage<F, E>(
    run_dir: &Path,
    label: &str,
    executable: &str,
    ini_filename: &str,
    dry_run: bool,
    build: F,
) -> bool
where
    F: FnOnce() -> Result<crate::core::settings::SettingsTree, E>,
    E: std::fmt::Display,
{
    println!("  Preparing {label}...");
    let tree = match build() {
        Ok(tree) => tree,
        Err(e) => {
            println!(
                "    {} Could not compile settings for {label}: {e}",
                "ERROR:".red().bold()
            );
            return false;
        }
    };

    let ini_path = run_dir.join(ini_filename);
    if let Err(e) = ini_writer::write_ini(&tree, &ini_path) {
        println!("    {} {e}", "ERROR:".red().bold());
        return false;
    }
    println!("    Generated config: {}", ini_path.display());

    // The process runs with the run directory as CWD, so the config is
    // passed by bare filename; the precheck uses the full path.
    let request = StageRequest {
        label,
        executable,
        args: vec![ini_filename.to_string()],
        run_dir,
        config_file: Some(&ini_path),
        dry_run,
    };
    runner::run_stage(&request)
}

/// The calibration stage has no generated config of its own, so there is no
/// input-file precheck; its inputs are named on the command line.
fn run_calibration_stage(master: &MasterConfig, run_dir: &Path) -> bool {
    let calibration = master
        .calibration_settings
        .clone()
        .unwrap_or_default();
    // An unset source list is passed through as the literal token `None`;
    // the run log keeps that visible to the operator.
    let source_list = calibration
        .source_list
        .unwrap_or_else(|| "None".to_string());

    let request = StageRequest {
        label: CALIBRATE_LABEL,
        executable: &master.executables.calibrate,
        args: vec![
            "-d".to_string(),
            master.output_config.interf_ms_base_filename.clone(),
            "--source-list".to_string(),
            source_list,
            "-o".to_string(),
            calibration.solution_output,
        ],
        run_dir,
        config_file: None,
        dry_run: master.run_settings.dry_run,
    };
    runner::run_stage(&request)
}

/// Formats one run directory name from the configured template.
fn run_dir_name(
    pattern: &str,
    sky_filename: &str,
    tel_name: &str,
    errors_on: bool,
    pc_id: &str,
) -> PathBuf {
    let error_suffix = if errors_on {
        constants::ERRORS_ON_SUFFIX
    } else {
        constants::ERRORS_OFF_SUFFIX
    };
    PathBuf::from(
        pattern
            .replace("{sky_name_no_ext}", sky_name_no_ext(sky_filename))
            .replace("{tel_name}", tel_name)
            .replace("{error_suffix}", error_suffix)
            .replace("{pc_id}", pc_id),
    )
}

/// The sky-model display name: the filename with its final extension
/// stripped, if it has one.
fn sky_name_no_ext(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(stem, _)| stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn master_from_yaml(yaml: &str) -> MasterConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const TWO_SKY_DRY_RUN: &str = r#"
        run_settings:
          run_interf_sim: true
          dry_run: true
        iteration_parameters:
          telescope_configs:
            - name: MWA
              input_directory: telescopes/mwa
          sky_model_configs:
            - filename: model_a.osm
            - filename: model_b.osm
          phase_centre_configs:
            - id: pc1
              ra_deg: 201.36
              dec_deg: -43.02
              start_time_utc: "2024-01-01 12:00:00"
        oskar_ini_defaults:
          simulator:
            use_gpus: false
        "#;

    #[test]
    fn dry_run_sweep_produces_configs_and_logged_dry_runs() {
        let root = tempdir().unwrap();
        let master = master_from_yaml(TWO_SKY_DRY_RUN);

        let report = run_sweep(&master, root.path());
        assert_eq!(report.combinations, 2);
        assert_eq!(report.stages_attempted, 2);
        assert_eq!(report.stages_succeeded, 2);

        let base = root.path().join("simulation_outputs");
        for sky in ["model_a", "model_b"] {
            let run_dir = base.join(format!("images_{sky}_MWA_errors_off_pc1"));
            assert!(run_dir.is_dir(), "missing {}", run_dir.display());

            let ini = fs::read_to_string(run_dir.join("interf.ini")).unwrap();
            assert!(ini.contains(&format!(
                "oskar_sky_model/file=../../sky_models/{sky}.osm"
            )));
            assert!(ini.contains("app=oskar_sim_interferometer"));

            let log = fs::read_to_string(run_dir.join("run.log")).unwrap();
            assert_eq!(log.matches("[DRY RUN]").count(), 1);
            assert!(!log.contains("--- Stdout ---"));
        }
    }

    #[test]
    fn cartesian_product_is_fully_enumerated_with_unique_directories() {
        let root = tempdir().unwrap();
        let master = master_from_yaml(
            r#"
            iteration_parameters:
              telescope_configs:
                - {name: MWA, input_directory: t/mwa}
                - {name: SKA, input_directory: t/ska}
              sky_model_configs:
                - {filename: a.osm}
                - {filename: b.osm}
              phase_centre_configs:
                - {id: pc1, ra_deg: 0.0, dec_deg: 0.0, start_time_utc: "t"}
                - {id: pc2, ra_deg: 1.0, dec_deg: 1.0, start_time_utc: "t"}
            "#,
        );

        let report = run_sweep(&master, root.path());
        assert_eq!(report.combinations, 8);

        let base = root.path().join("simulation_outputs");
        let dirs: Vec<_> = fs::read_dir(&base)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(dirs.len(), 8);
    }

    #[test]
    fn empty_axis_is_degenerate() {
        let root = tempdir().unwrap();
        let master = master_from_yaml(
            r#"
            iteration_parameters:
              telescope_configs: []
              sky_model_configs:
                - {filename: a.osm}
              phase_centre_configs:
                - {id: pc1, ra_deg: 0.0, dec_deg: 0.0, start_time_utc: "t"}
            "#,
        );
        let report = run_sweep(&master, root.path());
        assert_eq!(report, SweepReport::default());
        assert!(!root.path().join("simulation_outputs").exists());
    }

    #[test]
    fn failing_stage_does_not_block_later_stages_or_combinations() {
        let root = tempdir().unwrap();
        let master = master_from_yaml(
            r#"
            run_settings:
              run_beam_sim: true
              run_interf_sim: true
            executables:
              beam_pattern: definitely-not-an-installed-beam-exe
              interferometer: definitely-not-an-installed-interf-exe
            iteration_parameters:
              telescope_configs:
                - {name: MWA, input_directory: t/mwa}
              sky_model_configs:
                - {filename: a.osm}
              phase_centre_configs:
                - {id: pc1, ra_deg: 0.0, dec_deg: 0.0, start_time_utc: "t"}
                - {id: pc2, ra_deg: 1.0, dec_deg: 1.0, start_time_utc: "t"}
            "#,
        );

        let report = run_sweep(&master, root.path());
        // Every stage of every combination was still attempted.
        assert_eq!(report.combinations, 2);
        assert_eq!(report.stages_attempted, 4);
        assert_eq!(report.stages_succeeded, 0);

        for pc in ["pc1", "pc2"] {
            let log = fs::read_to_string(
                root.path()
                    .join("simulation_outputs")
                    .join(format!("images_a_MWA_errors_off_{pc}"))
                    .join("run.log"),
            )
            .unwrap();
            assert!(log.contains("Attempting OSKAR Beam Pattern simulation"));
            assert!(log.contains("Attempting OSKAR Interferometer simulation"));
        }
    }

    #[test]
    fn calibration_uses_the_literal_none_sentinel_when_unset() {
        let root = tempdir().unwrap();
        let master = master_from_yaml(
            r#"
            run_settings:
              run_calibration: true
              dry_run: true
            iteration_parameters:
              telescope_configs:
                - {name: MWA, input_directory: t/mwa}
              sky_model_configs:
                - {filename: a.osm}
              phase_centre_configs:
                - {id: pc1, ra_deg: 0.0, dec_deg: 0.0, start_time_utc: "t"}
            "#,
        );

        let report = run_sweep(&master, root.path());
        assert_eq!(report.stages_succeeded, 1);

        let log = fs::read_to_string(
            root.path()
                .join("simulation_outputs/images_a_MWA_errors_off_pc1/run.log"),
        )
        .unwrap();
        assert!(log.contains("hyperdrive -d vis.ms --source-list None -o hyperdrive_solutions.fits"));
        assert!(log.contains("[DRY RUN]"));
    }

    #[test]
    fn run_dir_names_encode_the_error_flag() {
        assert_eq!(
            run_dir_name(
                constants::DEFAULT_RUN_DIR_PATTERN,
                "model_a.osm",
                "MWA",
                true,
                "pc1"
            ),
            PathBuf::from("images_model_a_MWA_errors_on_pc1")
        );
        assert_eq!(
            run_dir_name(
                constants::DEFAULT_RUN_DIR_PATTERN,
                "no_extension",
                "SKA",
                false,
                "pc9"
            ),
            PathBuf::from("images_no_extension_SKA_errors_off_pc9")
        );
    }
}
