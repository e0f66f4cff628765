//! Configuration files and result export

use layered_fdtd::{export::export_all, run, FdtdError, LayerSpec, SimulationConfig, SourceSpec};
use pretty_assertions::assert_eq;
use std::fs;

fn small_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.grid.cells = 300;
    config.source_position = 40;
    config.probes = vec![30, 50];
    config.layers = vec![LayerSpec::new(150, 300, 2.0)];
    config.absorber.left_width = 20;
    config.absorber.right_start = 280;
    config.max_time = 600;
    config.analysis.fft_size = 1024;
    config.analysis.incident_window = 200;
    config
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");

    let mut config = small_config();
    config.source = SourceSpec::ModulatedGaussian {
        delay: 50.0,
        width: 15.0,
        cells_per_wavelength: 25.0,
    };
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = SimulationConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{ "layers": [
            { "start": 500, "end": 600, "eps": 2.0 },
            { "start": 590, "end": 700, "eps": 3.0 }
        ] }"#,
    )
    .unwrap();

    assert!(matches!(
        SimulationConfig::from_file(&path),
        Err(FdtdError::Config(_))
    ));

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        SimulationConfig::from_file(&path),
        Err(FdtdError::Json(_))
    ));

    assert!(matches!(
        SimulationConfig::from_file(&dir.path().join("missing.json")),
        Err(FdtdError::Io(_))
    ));
}

#[test]
fn test_export_writes_result_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config();
    config.snapshot_every = 100;
    let output = run(&config).unwrap();

    let written = export_all(&output, dir.path()).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["probes.csv", "spectrum.csv", "frames.json", "report.json"]);

    let probes = fs::read_to_string(dir.path().join("probes.csv")).unwrap();
    let mut lines = probes.lines();
    assert_eq!(lines.next().unwrap(), "step,time_s,ez_30,hy_30,ez_50,hy_50");
    assert_eq!(lines.count(), 600);

    let spectrum = fs::read_to_string(dir.path().join("spectrum.csv")).unwrap();
    assert_eq!(spectrum.lines().count(), 1025);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["steps_run"], 600);
    assert_eq!(report["probe_positions"], serde_json::json!([30, 50]));
    assert!(report["passband"].as_array().unwrap().len() > 0);

    let frames: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("frames.json")).unwrap()).unwrap();
    assert_eq!(frames.as_array().unwrap().len(), 6);
}
