use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::angles::AngleWindow;
use crate::error::MeasurementError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeasurementOptions {
    /// Capture S-parameters in addition to the pattern sweep.
    pub s_parameters: bool,
}

/// The chamber capture pipeline, driven once per sweep point.
pub trait Measurement {
    fn run_sweep(
        &mut self,
        name: &str,
        window: &AngleWindow,
        save_path: &Path,
        options: &MeasurementOptions,
    ) -> Result<PathBuf, MeasurementError>;
}

#[derive(Serialize)]
struct Manifest<'a> {
    name: &'a str,
    window: &'a AngleWindow,
    options: &'a MeasurementOptions,
}

/// Records each requested capture as `<save_path>/<name>.json`, for runs
/// without an instrument attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestMeasurement;

impl Measurement for ManifestMeasurement {
    fn run_sweep(
        &mut self,
        name: &str,
        window: &AngleWindow,
        save_path: &Path,
        options: &MeasurementOptions,
    ) -> Result<PathBuf, MeasurementError> {
        fs::create_dir_all(save_path)?;
        let path = save_path.join(format!("{name}.json"));
        let manifest = Manifest {
            name,
            window,
            options,
        };
        fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
        info!("Run sweep: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_manifest_named_after_the_point() {
        let dir = tempfile::tempdir().unwrap();
        let window = AngleWindow {
            az_start: 35.0,
            az_finish: -35.0,
            el_start: 0.0,
            el_finish: 0.0,
            pol_start: 0.0,
            pol_finish: 0.0,
            horn_start: 90.0,
            horn_finish: 90.0,
        };
        let path = ManifestMeasurement
            .run_sweep("point_a", &window, dir.path(), &MeasurementOptions::default())
            .unwrap();
        assert_eq!(path, dir.path().join("point_a.json"));

        let record: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(record["name"], "point_a");
        assert_eq!(record["window"]["az_start"], 35.0);
        assert_eq!(record["window"]["horn_finish"], 90.0);
        assert_eq!(record["options"]["s_parameters"], false);
    }

    #[test]
    fn creates_missing_save_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run").join("ku");
        let window = AngleWindow {
            az_start: 0.0,
            az_finish: 0.0,
            el_start: 0.0,
            el_finish: 0.0,
            pol_start: 0.0,
            pol_finish: 0.0,
            horn_start: 0.0,
            horn_finish: 0.0,
        };
        let path = ManifestMeasurement
            .run_sweep("p", &window, &nested, &MeasurementOptions::default())
            .unwrap();
        assert!(path.exists());
    }
}
