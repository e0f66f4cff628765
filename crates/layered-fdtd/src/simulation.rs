//! End-to-end reflection run: configuration in, probe records and spectra out

use serde::Serialize;
use tracing::info;

use crate::config::SimulationConfig;
use crate::engine::{FdtdEngine, FieldObserver};
use crate::error::Result;
use crate::medium::Medium;
use crate::probe::Probe;
use crate::snapshot::{Frame, SnapshotRecorder};
use crate::source::TfsfSource;
use crate::spectrum::{reflection_spectrum, GammaPoint, Spectrum};

/// Everything a finished run produces
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub config: SimulationConfig,
    /// Time step (s)
    pub dt: f64,
    /// Steps actually simulated; probes are padded beyond this
    pub steps_run: usize,
    pub probes: Vec<Probe>,
    pub spectrum: Spectrum,
    pub frames: Vec<Frame>,
}

impl RunOutput {
    /// |Γ| restricted to the configured passband
    pub fn passband(&self) -> Vec<GammaPoint> {
        self.spectrum
            .passband(self.config.analysis.fmin, self.config.analysis.fmax)
    }
}

/// A configured engine with a TFSF source and its probes
pub struct Simulation {
    config: SimulationConfig,
    medium: Medium,
    engine: FdtdEngine,
}

impl Simulation {
    /// Validate the configuration and build medium, source and probes
    pub fn from_config(config: SimulationConfig) -> Result<Self> {
        let medium = Medium::from_config(&config)?;
        let courant = config.grid.courant;
        let s = config.source_position;

        let pulse = config.pulse()?;
        let wave = pulse.plane_wave(medium.eps()[s], medium.mu()[s], courant);
        let source = TfsfSource::new(s, wave, &medium, courant)?;

        let mut engine =
            FdtdEngine::new(&medium, courant, config.max_time).with_parallel(config.parallel);
        engine.add_source(Box::new(source))?;
        for &pos in &config.probes {
            engine.add_probe(pos)?;
        }

        info!(
            "Configured {} cells (dx = {:.3e} m, dt = {:.3e} s), {} layer(s), source at {}, \
             pulse delay {:.1} / width {:.1} steps",
            config.grid.cells,
            config.grid.cell_size,
            config.dt(),
            config.layers.len(),
            s,
            pulse.delay,
            pulse.width
        );

        Ok(Self {
            config,
            medium,
            engine,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    pub fn engine(&self) -> &FdtdEngine {
        &self.engine
    }

    /// Run to completion
    pub fn run(self) -> Result<RunOutput> {
        self.run_with(&mut [])
    }

    /// Run with extra observers, e.g. a live viewer that may stop early
    pub fn run_with(mut self, observers: &mut [&mut dyn FieldObserver]) -> Result<RunOutput> {
        let mut recorder = SnapshotRecorder::new(self.config.snapshot_every, self.config.max_time);

        let steps_run = {
            let mut all: Vec<&mut dyn FieldObserver> = Vec::with_capacity(observers.len() + 1);
            all.push(&mut recorder);
            for observer in observers.iter_mut() {
                all.push(&mut **observer);
            }
            self.engine.run(&mut all)?
        };

        let dt = self.config.dt();
        let analysis = self.config.analysis;
        let probes = self.engine.into_probes();

        let spectrum = reflection_spectrum(
            probes[analysis.incident_probe].e(),
            probes[analysis.reflected_probe].e(),
            analysis.incident_window,
            analysis.fft_size,
            dt,
        )?;
        info!(
            "Spectrum: {} bins, df = {:.3e} Hz, passband [{:.3e}, {:.3e}] Hz",
            spectrum.size(),
            spectrum.df,
            analysis.fmin,
            analysis.fmax
        );

        Ok(RunOutput {
            config: self.config,
            dt,
            steps_run,
            probes,
            spectrum,
            frames: recorder.into_frames(),
        })
    }
}

/// Build and run a simulation from a configuration
pub fn run(config: &SimulationConfig) -> Result<RunOutput> {
    Simulation::from_config(config.clone())?.run()
}

/// Normal-incidence Fresnel |Γ| between two lossless dielectrics
pub fn fresnel_reflection(eps1: f64, eps2: f64) -> f64 {
    let (n1, n2) = (eps1.sqrt(), eps2.sqrt());
    ((n1 - n2) / (n1 + n2)).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ObserverControl;
    use crate::error::FdtdError;

    #[test]
    fn test_fresnel_values() {
        assert!((fresnel_reflection(1.0, 4.0) - 1.0 / 3.0).abs() < 1e-15);
        assert!(fresnel_reflection(2.0, 2.0).abs() < 1e-15);
        assert!((fresnel_reflection(4.0, 1.0) - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_config_never_starts() {
        let mut config = SimulationConfig::default();
        config.probes.push(999);
        assert!(matches!(
            Simulation::from_config(config),
            Err(FdtdError::Config(_))
        ));
    }

    #[test]
    fn test_snapshots_and_observer() {
        struct Counter(usize);
        impl FieldObserver for Counter {
            fn observe(&mut self, _step: usize, _ez: &[f64], _hy: &[f64]) -> ObserverControl {
                self.0 += 1;
                ObserverControl::Continue
            }
        }

        let mut config = SimulationConfig::default();
        config.max_time = 200;
        config.analysis.fft_size = 256;
        config.analysis.incident_window = 100;
        config.snapshot_every = 50;

        let mut counter = Counter(0);
        let output = Simulation::from_config(config)
            .unwrap()
            .run_with(&mut [&mut counter])
            .unwrap();

        assert_eq!(counter.0, 200);
        assert_eq!(output.steps_run, 200);
        assert_eq!(output.frames.len(), 4);
        assert_eq!(output.frames[3].step, 150);
        assert_eq!(output.frames[0].ez.len(), 1000);
        assert_eq!(output.probes.len(), 2);
        assert_eq!(output.spectrum.size(), 256);
    }
}
