//! # Path Resolver
//!
//! Generated configs must stay portable when the whole output tree is
//! relocated, so every resource path written into them is expressed relative
//! to the run directory that holds the config. Resolution is purely lexical:
//! inputs are absolutized against the process working directory and
//! normalized, without touching the filesystem, so paths that do not exist
//! yet (e.g. a run directory about to be created) resolve the same way.

use std::env;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine the current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Makes `path` absolute against the current working directory and
/// lexically resolves `.`/`..` components.
pub fn absolutize(path: &Path) -> Result<PathBuf, PathError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_err(PathError::CurrentDir)?.join(path)
    };
    Ok(normalize(dunce::simplified(&absolute)))
}

/// Lexical `.`/`..` normalization. `..` at the root is dropped, matching
/// how operating systems resolve it.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // Above a relative start; keep the component.
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The path of `target` expressed relative to `base`, with `os.path.relpath`
/// semantics: both sides are absolutized first, so inputs given relative to
/// the original working directory resolve correctly even though the result
/// will be consumed from inside `base`.
///
/// Joining the result back onto `base` reconstructs `target`.
pub fn relative_to(target: &Path, base: &Path) -> Result<PathBuf, PathError> {
    let target = absolutize(target)?;
    let base = absolutize(base)?;

    let target_parts: Vec<Component<'_>> = target.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_trees_climb_then_descend() {
        let rel = relative_to(
            Path::new("/project/telescopes/mwa_phase1"),
            Path::new("/project/simulation_outputs/run_1"),
        )
        .unwrap();
        assert_eq!(rel, PathBuf::from("../../telescopes/mwa_phase1"));
    }

    #[test]
    fn joining_back_reconstructs_the_target() {
        let target = Path::new("/data/sky_models/model_a.osm");
        let base = Path::new("/data/outputs/images_model_a_MWA_errors_off_pc1");
        let rel = relative_to(target, base).unwrap();
        assert_eq!(absolutize(&base.join(&rel)).unwrap(), target);
    }

    #[test]
    fn target_inside_base_needs_no_parent_segments() {
        let rel = relative_to(
            Path::new("/out/run_1/beam_output"),
            Path::new("/out/run_1"),
        )
        .unwrap();
        assert_eq!(rel, PathBuf::from("beam_output"));
    }

    #[test]
    fn identical_paths_resolve_to_dot() {
        let rel = relative_to(Path::new("/out/run_1"), Path::new("/out/run_1")).unwrap();
        assert_eq!(rel, PathBuf::from("."));
    }

    #[test]
    fn relative_inputs_are_resolved_against_the_working_directory() {
        let cwd = env::current_dir().unwrap();
        let abs = absolutize(Path::new("telescopes/mwa")).unwrap();
        assert_eq!(abs, normalize(&cwd.join("telescopes/mwa")));
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }
}
