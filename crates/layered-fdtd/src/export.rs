//! Result files for plotting and reporting
//! - probes.csv: one row per step, E and H per probe
//! - spectrum.csv: shifted frequency axis, spectra and |Γ|
//! - frames.json: Ez snapshots, if any were recorded
//! - report.json: configuration, run summary and the passband |Γ| curve

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::simulation::RunOutput;
use crate::spectrum::GammaPoint;

/// Summary written to report.json
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub config: &'a SimulationConfig,
    pub dt: f64,
    pub df: f64,
    pub steps_run: usize,
    pub probe_positions: Vec<usize>,
    pub gamma_min: Option<f64>,
    pub gamma_max: Option<f64>,
    pub gamma_mean: Option<f64>,
    pub passband: Vec<GammaPoint>,
}

impl<'a> RunReport<'a> {
    pub fn new(output: &'a RunOutput) -> Self {
        let passband = output.passband();
        let finite: Vec<f64> = passband
            .iter()
            .map(|p| p.gamma)
            .filter(|g| g.is_finite())
            .collect();

        let (gamma_min, gamma_max, gamma_mean) = if finite.is_empty() {
            (None, None, None)
        } else {
            let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = finite.iter().sum::<f64>() / finite.len() as f64;
            (Some(min), Some(max), Some(mean))
        };

        Self {
            config: &output.config,
            dt: output.dt,
            df: output.spectrum.df,
            steps_run: output.steps_run,
            probe_positions: output.probes.iter().map(|p| p.position()).collect(),
            gamma_min,
            gamma_max,
            gamma_mean,
            passband,
        }
    }
}

/// Write probe time series as CSV
pub fn write_probes_csv(output: &RunOutput, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    write!(writer, "step,time_s")?;
    for probe in &output.probes {
        write!(writer, ",ez_{0},hy_{0}", probe.position())?;
    }
    writeln!(writer)?;

    let len = output.probes.first().map_or(0, |p| p.e().len());
    for q in 0..len {
        write!(writer, "{},{:e}", q, q as f64 * output.dt)?;
        for probe in &output.probes {
            write!(writer, ",{:e},{:e}", probe.e()[q], probe.h()[q])?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    info!("Exported {} probe samples x {} probes to {:?}", len, output.probes.len(), path);
    Ok(())
}

/// Write the shifted spectra as CSV; undefined |Γ| is written as NaN
pub fn write_spectrum_csv(output: &RunOutput, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let s = &output.spectrum;
    let (incident_norm, reflected_norm) = s.normalized();

    writeln!(writer, "frequency_hz,incident,reflected,incident_norm,reflected_norm,gamma")?;
    for k in 0..s.size() {
        writeln!(
            writer,
            "{:e},{:e},{:e},{:e},{:e},{:e}",
            s.frequencies[k],
            s.incident[k],
            s.reflected[k],
            incident_norm[k],
            reflected_norm[k],
            s.gamma[k]
        )?;
    }

    writer.flush()?;
    info!("Exported spectrum ({} bins) to {:?}", s.size(), path);
    Ok(())
}

/// Write all result files into `dir`, returning the paths written
pub fn export_all(output: &RunOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let probes = dir.join("probes.csv");
    write_probes_csv(output, &probes)?;
    written.push(probes);

    let spectrum = dir.join("spectrum.csv");
    write_spectrum_csv(output, &spectrum)?;
    written.push(spectrum);

    if !output.frames.is_empty() {
        let frames = dir.join("frames.json");
        let writer = BufWriter::new(File::create(&frames)?);
        serde_json::to_writer(writer, &output.frames)?;
        info!("Exported {} field frames to {:?}", output.frames.len(), frames);
        written.push(frames);
    }

    let report = dir.join("report.json");
    let writer = BufWriter::new(File::create(&report)?);
    serde_json::to_writer_pretty(writer, &RunReport::new(output))?;
    info!("Exported run report to {:?}", report);
    written.push(report);

    Ok(written)
}
