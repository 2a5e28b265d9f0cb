use std::{error::Error, fs, path::Path};

use camcal_core::CalibrationData;
use camcal_pipeline::{run_calibration, CalibrationConfig};
use clap::Parser;

/// Planar camera calibration from observed pattern points.
#[derive(Debug, Parser)]
#[command(author, version, about = "Planar camera calibration pipeline")]
struct Args {
    /// Path to a JSON file containing CalibrationData (model points, views,
    /// image size).
    #[arg(long)]
    input: String,

    /// Optional path to a JSON CalibrationConfig. Defaults are used if
    /// omitted.
    #[arg(long)]
    config: Option<String>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn calibrate_from_files(
    input_path: &str,
    config_path: Option<&str>,
) -> Result<String, Box<dyn Error>> {
    let data: CalibrationData = load_json_file(Path::new(input_path))?;

    let config = if let Some(cfg_path) = config_path {
        load_json_file::<CalibrationConfig>(Path::new(cfg_path))?
    } else {
        CalibrationConfig::default()
    };

    let report = run_calibration(&data, &config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let json = calibrate_from_files(&args.input, args.config.as_deref())?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::synthetic::{grid_points, project_views, tilted_poses};
    use camcal_core::{CameraIntrinsics, Vec3};
    use camcal_pipeline::CalibrationReport;
    use tempfile::NamedTempFile;

    fn write_json<T: serde::Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn synthetic_data() -> CalibrationData {
        let a = CameraIntrinsics {
            fx: 800.0,
            fy: 780.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        };
        let model = grid_points(6, 5, 0.04);
        let poses = tilted_poses(4, 0.12, 0.8, 0.05, Vec3::new(0.1, 0.08, 0.0));
        let views = project_views(&a, None, &poses, &model);
        CalibrationData::new(model, views, (1280, 720))
    }

    #[test]
    fn helper_smoke_test() {
        let data = synthetic_data();
        let input_file = NamedTempFile::new().unwrap();
        let config_file = NamedTempFile::new().unwrap();

        write_json(&data, input_file.path());
        write_json(&CalibrationConfig::default(), config_file.path());

        let json = calibrate_from_files(
            input_file.path().to_str().unwrap(),
            Some(config_file.path().to_str().unwrap()),
        )
        .expect("cli helper should succeed");

        let report: CalibrationReport = serde_json::from_str(&json).unwrap();
        assert!(report.rms < 1e-4, "rms: {}", report.rms);
        assert_eq!(report.views.len(), 4);
        assert!(report.rejected_views.is_empty());
    }

    #[test]
    fn missing_input_file_is_an_error() {
        assert!(calibrate_from_files("/nonexistent/points.json", None).is_err());
    }
}
