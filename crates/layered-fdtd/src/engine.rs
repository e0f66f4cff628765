//! 1D Yee leapfrog engine (Ez / Hy)
//!
//! One step, in fixed order:
//! 1. H pass over all N-1 cells
//! 2. source H corrections
//! 3. first-order outflow condition on the two E end cells
//! 4. E pass over interior cells
//! 5. source E corrections
//! 6. finiteness check
//! 7. probes record, observers are notified
//!
//! H at q+½ must be complete before E at q+1 is computed, so steps never
//! overlap. With `parallel` set, passes 1 and 4 are rayon fork-joins that
//! finish before the step continues.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::W0;
use crate::error::{FdtdError, FieldComponent, Result};
use crate::medium::{Coefficients, Medium};
use crate::probe::Probe;
use crate::source::SourceContribution;

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed; sources and probes may still be added
    Uninitialized,
    /// `next_step` is the step the next call to [`FdtdEngine::step`] performs
    Running { next_step: usize },
    /// No more steps; probe buffers are full length
    Finished { steps_run: usize },
    /// A non-finite field value appeared during `step`; fields are unusable
    Failed { step: usize },
}

/// Observer verdict after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverControl {
    Continue,
    Stop,
}

/// Receives a read-only view of the fields after every completed step.
///
/// Work done here runs inside the time loop and should stay bounded.
pub trait FieldObserver {
    fn observe(&mut self, step: usize, ez: &[f64], hy: &[f64]) -> ObserverControl;
}

/// 1D FDTD simulation
pub struct FdtdEngine {
    coeffs: Coefficients,
    ez: Vec<f64>,
    hy: Vec<f64>,
    sources: Vec<Box<dyn SourceContribution>>,
    probes: Vec<Probe>,
    max_time: usize,
    parallel: bool,
    state: EngineState,
}

impl FdtdEngine {
    /// Create an engine with zero fields for `max_time` steps
    pub fn new(medium: &Medium, courant: f64, max_time: usize) -> Self {
        let n = medium.cells();
        Self {
            coeffs: Coefficients::new(medium, courant),
            ez: vec![0.0; n],
            hy: vec![0.0; n - 1],
            sources: Vec::new(),
            probes: Vec::new(),
            max_time,
            parallel: false,
            state: EngineState::Uninitialized,
        }
    }

    /// Run the per-cell passes on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Register a source contribution
    pub fn add_source(&mut self, source: Box<dyn SourceContribution>) -> Result<()> {
        self.ensure_uninitialized("add a source")?;
        self.sources.push(source);
        Ok(())
    }

    /// Add a probe and return its index
    pub fn add_probe(&mut self, position: usize) -> Result<usize> {
        self.ensure_uninitialized("add a probe")?;
        self.probes.push(Probe::new(position, self.ez.len(), self.max_time)?);
        Ok(self.probes.len() - 1)
    }

    fn ensure_uninitialized(&self, what: &str) -> Result<()> {
        match self.state {
            EngineState::Uninitialized => Ok(()),
            state => Err(FdtdError::state(format!("cannot {what} in state {state:?}"))),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn max_time(&self) -> usize {
        self.max_time
    }

    pub fn ez(&self) -> &[f64] {
        &self.ez
    }

    pub fn hy(&self) -> &[f64] {
        &self.hy
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn into_probes(self) -> Vec<Probe> {
        self.probes
    }

    /// Sum of Ez² + (W0·Hy)² over the grid
    pub fn field_energy(&self) -> f64 {
        let e: f64 = self.ez.iter().map(|v| v * v).sum();
        let h: f64 = self.hy.iter().map(|v| (W0 * v).powi(2)).sum();
        e + h
    }

    /// Advance by one step. Returns `Stop` once the engine has finished,
    /// either because the last step ran or because an observer asked to stop.
    pub fn step(&mut self, observers: &mut [&mut dyn FieldObserver]) -> Result<ObserverControl> {
        let q = match self.state {
            EngineState::Uninitialized => 0,
            EngineState::Running { next_step } => next_step,
            EngineState::Finished { steps_run } => {
                return Err(FdtdError::state(format!(
                    "engine already finished after {steps_run} steps"
                )));
            }
            EngineState::Failed { step } => {
                return Err(FdtdError::state(format!(
                    "engine failed with non-finite fields at step {step}"
                )));
            }
        };
        if q >= self.max_time {
            self.finish(q);
            return Ok(ObserverControl::Stop);
        }
        self.state = EngineState::Running { next_step: q };

        self.update_h();
        for source in &self.sources {
            source.correct_h(q, &mut self.hy);
        }

        let n = self.ez.len();
        self.ez[0] = self.ez[1];
        self.ez[n - 1] = self.ez[n - 2];

        self.update_e();
        for source in &self.sources {
            source.correct_e(q, &mut self.ez);
        }

        if let Err(err) = self.check_finite(q) {
            self.state = EngineState::Failed { step: q };
            return Err(err);
        }

        for probe in &mut self.probes {
            probe.add_data(&self.ez, &self.hy)?;
        }

        let mut control = ObserverControl::Continue;
        for observer in observers.iter_mut() {
            if observer.observe(q, &self.ez, &self.hy) == ObserverControl::Stop {
                control = ObserverControl::Stop;
            }
        }

        let steps_run = q + 1;
        if control == ObserverControl::Stop && steps_run < self.max_time {
            warn!(
                "Observer stopped the run after {} of {} steps; padding probes",
                steps_run, self.max_time
            );
            self.finish(steps_run);
        } else if steps_run == self.max_time {
            self.finish(steps_run);
            control = ObserverControl::Stop;
        } else {
            self.state = EngineState::Running { next_step: steps_run };
        }

        Ok(control)
    }

    /// Step until finished; returns the number of steps run
    pub fn run(&mut self, observers: &mut [&mut dyn FieldObserver]) -> Result<usize> {
        info!(
            "Starting FDTD run: {} cells, {} steps, {} source(s), {} probe(s){}",
            self.ez.len(),
            self.max_time,
            self.sources.len(),
            self.probes.len(),
            if self.parallel { ", parallel" } else { "" }
        );

        loop {
            if let EngineState::Finished { steps_run } = self.state {
                info!("FDTD run finished after {} steps", steps_run);
                return Ok(steps_run);
            }
            self.step(observers)?;
        }
    }

    /// End the run early; probes are zero-padded to full length
    pub fn stop(&mut self) {
        let steps_run = match self.state {
            EngineState::Uninitialized => 0,
            EngineState::Running { next_step } => next_step,
            EngineState::Finished { .. } | EngineState::Failed { .. } => return,
        };
        warn!("Run stopped after {} of {} steps; padding probes", steps_run, self.max_time);
        self.finish(steps_run);
    }

    fn finish(&mut self, steps_run: usize) {
        for probe in &mut self.probes {
            probe.pad_to_capacity();
        }
        self.state = EngineState::Finished { steps_run };
    }

    fn update_h(&mut self) {
        let parallel = self.parallel;
        let Self { coeffs, ez, hy, .. } = self;
        let chyh = &coeffs.chyh[..];
        let chye = &coeffs.chye[..];
        let ez = &ez[..];

        if parallel {
            hy.par_iter_mut().enumerate().for_each(|(i, h)| {
                *h = chyh[i] * *h + chye[i] * (ez[i + 1] - ez[i]);
            });
        } else {
            for (i, h) in hy.iter_mut().enumerate() {
                *h = chyh[i] * *h + chye[i] * (ez[i + 1] - ez[i]);
            }
        }
    }

    fn update_e(&mut self) {
        let parallel = self.parallel;
        let Self { coeffs, ez, hy, .. } = self;
        let ceze = &coeffs.ceze[..];
        let cezh = &coeffs.cezh[..];
        let hy = &hy[..];
        let n = ez.len();
        let interior = &mut ez[1..n - 1];

        if parallel {
            interior.par_iter_mut().enumerate().for_each(|(j, e)| {
                let i = j + 1;
                *e = ceze[i] * *e + cezh[i] * (hy[i] - hy[i - 1]);
            });
        } else {
            for (j, e) in interior.iter_mut().enumerate() {
                let i = j + 1;
                *e = ceze[i] * *e + cezh[i] * (hy[i] - hy[i - 1]);
            }
        }
    }

    fn check_finite(&self, step: usize) -> Result<()> {
        if let Some(cell) = self.hy.iter().position(|v| !v.is_finite()) {
            return Err(FdtdError::NonFinite {
                step,
                component: FieldComponent::Hy,
                cell,
            });
        }
        if let Some(cell) = self.ez.iter().position(|v| !v.is_finite()) {
            return Err(FdtdError::NonFinite {
                step,
                component: FieldComponent::Ez,
                cell,
            });
        }
        if step % 500 == 0 {
            debug!("step {}: max |Ez| = {:.3e}", step, max_abs(&self.ez));
        }
        Ok(())
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbsorberSpec;
    use crate::source::{GaussianModPlaneWave, GaussianPlaneWave, SoftSource, TfsfSource};
    use pretty_assertions::assert_eq;

    struct StopAfter(usize);

    impl FieldObserver for StopAfter {
        fn observe(&mut self, step: usize, _ez: &[f64], _hy: &[f64]) -> ObserverControl {
            if step + 1 >= self.0 {
                ObserverControl::Stop
            } else {
                ObserverControl::Continue
            }
        }
    }

    fn vacuum_tfsf(cells: usize, source: usize, max_time: usize) -> FdtdEngine {
        let medium = Medium::uniform(cells).unwrap();
        let wave = GaussianModPlaneWave::new(40.0, 12.0, 20.0, 1.0, 1.0, 1.0);
        let mut engine = FdtdEngine::new(&medium, 1.0, max_time);
        engine
            .add_source(Box::new(TfsfSource::new(source, Box::new(wave), &medium, 1.0).unwrap()))
            .unwrap();
        engine
    }

    #[test]
    fn test_no_source_stays_zero() {
        let medium = Medium::uniform(50).unwrap().with_absorber(&AbsorberSpec {
            left_width: 5,
            right_start: 45,
            loss: 0.02,
        });
        let mut engine = FdtdEngine::new(&medium, 1.0, 200);
        engine.add_probe(25).unwrap();
        engine.run(&mut []).unwrap();

        assert!(engine.ez().iter().all(|&v| v == 0.0));
        assert!(engine.hy().iter().all(|&v| v == 0.0));
        assert!(engine.probes()[0].e().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = vacuum_tfsf(40, 10, 3);
        assert_eq!(engine.state(), EngineState::Uninitialized);

        assert_eq!(engine.step(&mut []).unwrap(), ObserverControl::Continue);
        assert_eq!(engine.state(), EngineState::Running { next_step: 1 });
        assert!(engine.add_probe(5).is_err());

        engine.step(&mut []).unwrap();
        assert_eq!(engine.step(&mut []).unwrap(), ObserverControl::Stop);
        assert_eq!(engine.state(), EngineState::Finished { steps_run: 3 });
        assert!(matches!(engine.step(&mut []), Err(FdtdError::State(_))));
    }

    #[test]
    fn test_field_lengths() {
        let engine = vacuum_tfsf(40, 10, 3);
        assert_eq!(engine.hy().len(), engine.ez().len() - 1);
    }

    #[test]
    fn test_tfsf_one_cell_per_step() {
        let (cells, source) = (400, 50);
        let mut engine = vacuum_tfsf(cells, source, 300);
        let near = engine.add_probe(source + 10).unwrap();
        let far = engine.add_probe(source + 110).unwrap();
        let behind = engine.add_probe(source - 20).unwrap();
        engine.run(&mut []).unwrap();

        let probes = engine.probes();
        let peak = probes[near].e().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak > 0.5);

        // Same waveform, 100 steps later
        for q in 0..190 {
            let a = probes[near].e()[q];
            let b = probes[far].e()[q + 100];
            assert!((a - b).abs() < 1e-9 * peak, "step {q}: {a} vs {b}");
        }

        // Nothing leaks into the scattered-field region
        let leak = probes[behind].e().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(leak < 1e-9 * peak, "leak {leak}");
    }

    #[test]
    fn test_soft_source_symmetric() {
        let (cells, source) = (301, 150);
        let medium = Medium::uniform(cells).unwrap();
        let wave = GaussianPlaneWave::new(30.0, 8.0, 1.0, 1.0, 1.0);
        let mut engine = FdtdEngine::new(&medium, 1.0, 120);
        engine.add_source(Box::new(SoftSource::new(source, Box::new(wave)))).unwrap();

        for _ in 0..120 {
            engine.step(&mut []).unwrap();
            let ez = engine.ez();
            for k in 1..140 {
                let (right, left) = (ez[source + k], ez[source - k]);
                assert!((right - left).abs() <= 1e-12 * (1.0 + right.abs()));
            }
        }
        assert!(max_abs(engine.ez()) > 0.1);
    }

    #[test]
    fn test_non_finite_reported_with_cell() {
        let mut eps = vec![1.0; 30];
        eps[12] = 0.0;
        let medium = Medium::from_arrays(eps, vec![1.0; 29], vec![0.0; 30]).unwrap();
        let mut engine = FdtdEngine::new(&medium, 1.0, 10);

        match engine.step(&mut []) {
            Err(FdtdError::NonFinite { step, component, cell }) => {
                assert_eq!(step, 0);
                assert_eq!(component, FieldComponent::Ez);
                assert_eq!(cell, 12);
            }
            other => panic!("expected non-finite error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(engine.state(), EngineState::Failed { step: 0 });

        // The corrupted fields are never stepped again
        assert!(matches!(engine.step(&mut []), Err(FdtdError::State(_))));
        assert!(matches!(engine.run(&mut []), Err(FdtdError::State(_))));
        engine.stop();
        assert_eq!(engine.state(), EngineState::Failed { step: 0 });
    }

    #[test]
    fn test_stop_pads_probes() {
        let mut engine = vacuum_tfsf(100, 20, 50);
        engine.add_probe(30).unwrap();
        for _ in 0..10 {
            engine.step(&mut []).unwrap();
        }
        engine.stop();

        assert_eq!(engine.state(), EngineState::Finished { steps_run: 10 });
        let probe = &engine.probes()[0];
        assert_eq!(probe.e().len(), 50);
        assert_eq!(probe.h().len(), 50);
        assert_eq!(probe.valid_len(), 10);
        assert!(probe.e()[10..].iter().all(|&v| v == 0.0));
        assert!(matches!(engine.step(&mut []), Err(FdtdError::State(_))));

        // Stopping again keeps the first verdict
        engine.stop();
        assert_eq!(engine.state(), EngineState::Finished { steps_run: 10 });
    }

    #[test]
    fn test_stop_before_first_step() {
        let mut engine = vacuum_tfsf(100, 20, 50);
        engine.add_probe(30).unwrap();
        engine.stop();

        assert_eq!(engine.state(), EngineState::Finished { steps_run: 0 });
        assert_eq!(engine.run(&mut []).unwrap(), 0);
        let probe = &engine.probes()[0];
        assert_eq!(probe.valid_len(), 0);
        assert_eq!(probe.e().len(), 50);
        assert!(probe.e().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_observer_early_stop_pads_probes() {
        let mut engine = vacuum_tfsf(200, 20, 150);
        engine.add_probe(40).unwrap();
        let mut stop = StopAfter(60);
        let steps = engine.run(&mut [&mut stop]).unwrap();

        assert_eq!(steps, 60);
        assert_eq!(engine.state(), EngineState::Finished { steps_run: 60 });
        let probe = &engine.probes()[0];
        assert_eq!(probe.e().len(), 150);
        assert_eq!(probe.h().len(), 150);
        assert_eq!(probe.valid_len(), 60);
        assert!(probe.e()[60..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let medium = Medium::from_arrays(
            (0..300).map(|i| if i >= 150 { 4.0 } else { 1.0 }).collect(),
            vec![1.0; 299],
            vec![0.0; 300],
        )
        .unwrap()
        .with_absorber(&AbsorberSpec {
            left_width: 20,
            right_start: 280,
            loss: 0.02,
        });

        let build = |parallel: bool| {
            let wave = GaussianModPlaneWave::new(40.0, 12.0, 20.0, 1.0, 1.0, 1.0);
            let mut engine = FdtdEngine::new(&medium, 1.0, 400).with_parallel(parallel);
            engine
                .add_source(Box::new(TfsfSource::new(50, Box::new(wave), &medium, 1.0).unwrap()))
                .unwrap();
            engine.add_probe(30).unwrap();
            engine.run(&mut []).unwrap();
            engine
        };

        let seq = build(false);
        let par = build(true);
        assert_eq!(seq.ez(), par.ez());
        assert_eq!(seq.hy(), par.hy());
        assert_eq!(seq.probes(), par.probes());
    }
}
