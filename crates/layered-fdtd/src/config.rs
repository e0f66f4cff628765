//! Run configuration
//!
//! Everything a run needs is described by [`SimulationConfig`], which is
//! deserialized from JSON. Missing fields fall back to the defaults below,
//! which reproduce the reference three-layer run (5-30 GHz band, 0.5 mm
//! cells, 1000 cells). [`SimulationConfig::validate`] rejects every invalid
//! combination before any array is allocated.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

use crate::error::{FdtdError, Result};
use crate::source::{PulseParameters, PulseShape};

/// Speed of light in vacuum (m/s)
pub const C0: f64 = 299_792_458.0;
/// Rounded wave speed the reference run derives its time step from (m/s)
pub const REFERENCE_WAVE_SPEED: f64 = 3e8;
/// Free-space wave impedance used by the normalized update equations (Ω)
pub const W0: f64 = 120.0 * PI;

/// Grid geometry and time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of E cells; H has one fewer
    pub cells: usize,
    /// Cell size (m)
    pub cell_size: f64,
    /// Courant number Sc = c·dt/dx
    pub courant: f64,
    /// Vacuum wave speed used for `dt` (m/s)
    pub wave_speed: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cells: 1000,
            cell_size: 0.5e-3,
            courant: 1.0,
            wave_speed: REFERENCE_WAVE_SPEED,
        }
    }
}

/// A dielectric layer occupying the half-open cell range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub start: usize,
    pub end: usize,
    /// Relative permittivity
    pub eps: f64,
}

impl LayerSpec {
    pub fn new(start: usize, end: usize, eps: f64) -> Self {
        Self { start, end, eps }
    }
}

/// Lossy regions `[0, left_width)` and `[right_start, cells)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsorberSpec {
    pub left_width: usize,
    pub right_start: usize,
    /// Normalized loss σ·dt/(2·ε·ε0)
    pub loss: f64,
}

impl Default for AbsorberSpec {
    fn default() -> Self {
        Self {
            left_width: 50,
            right_start: 950,
            loss: 0.02,
        }
    }
}

impl AbsorberSpec {
    /// No absorbing regions at all
    pub fn none(cells: usize) -> Self {
        Self {
            left_width: 0,
            right_start: cells,
            loss: 0.0,
        }
    }
}

/// Excitation waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Modulated Gaussian given directly in time steps and cells
    ModulatedGaussian {
        delay: f64,
        width: f64,
        cells_per_wavelength: f64,
    },
    /// Modulated Gaussian derived from a frequency band.
    ///
    /// `a0` is the envelope attenuation at t = 0, `amax` the attenuation at
    /// the band edges.
    Band {
        fmin: f64,
        fmax: f64,
        a0: f64,
        amax: f64,
    },
    /// Unmodulated Gaussian pulse
    Gaussian { delay: f64, width: f64 },
}

impl Default for SourceSpec {
    fn default() -> Self {
        SourceSpec::Band {
            fmin: 5e9,
            fmax: 30e9,
            a0: 100.0,
            amax: 100.0,
        }
    }
}

impl SourceSpec {
    /// Resolve to pulse parameters in time steps and cells
    pub fn resolve(&self, dt: f64, courant: f64) -> Result<PulseParameters> {
        match *self {
            SourceSpec::ModulatedGaussian {
                delay,
                width,
                cells_per_wavelength,
            } => {
                if !(width > 0.0) || !(cells_per_wavelength > 0.0) || !delay.is_finite() {
                    return Err(FdtdError::config(format!(
                        "modulated Gaussian needs finite delay and positive width and \
                         cells per wavelength, got delay={delay}, width={width}, \
                         cells_per_wavelength={cells_per_wavelength}"
                    )));
                }
                Ok(PulseParameters {
                    shape: PulseShape::Modulated,
                    delay,
                    width,
                    cells_per_wavelength,
                })
            }
            SourceSpec::Band { fmin, fmax, a0, amax } => {
                if !(fmin >= 0.0) || !(fmax > fmin) {
                    return Err(FdtdError::config(format!(
                        "source band must satisfy 0 <= fmin < fmax, got [{fmin}, {fmax}]"
                    )));
                }
                if !(a0 > 1.0) || !(amax > 1.0) {
                    return Err(FdtdError::config(format!(
                        "envelope attenuations must exceed 1, got a0={a0}, amax={amax}"
                    )));
                }
                let f0 = (fmax + fmin) / 2.0;
                let delta_f = fmax - fmin;

                // Envelope width (s) so that the band edges sit at 1/amax
                let wg = 2.0 * amax.ln().sqrt() / (PI * delta_f);
                // Delay (s) so that the pulse starts at 1/a0
                let dg = wg * a0.ln().sqrt();

                Ok(PulseParameters {
                    shape: PulseShape::Modulated,
                    delay: dg / dt,
                    width: wg / dt,
                    cells_per_wavelength: courant / (f0 * dt),
                })
            }
            SourceSpec::Gaussian { delay, width } => {
                if !(width > 0.0) || !delay.is_finite() {
                    return Err(FdtdError::config(format!(
                        "Gaussian needs finite delay and positive width, \
                         got delay={delay}, width={width}"
                    )));
                }
                Ok(PulseParameters {
                    shape: PulseShape::Gaussian,
                    delay,
                    width,
                    cells_per_wavelength: f64::INFINITY,
                })
            }
        }
    }
}

/// Post-run spectral analysis settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Transform length, a power of two no smaller than the step count
    pub fft_size: usize,
    /// Number of leading samples of the incident probe used as the incident proxy
    pub incident_window: usize,
    /// Index into `probes` of the incident-field probe
    pub incident_probe: usize,
    /// Index into `probes` of the reflected-field probe
    pub reflected_probe: usize,
    /// Passband within which |Γ| is meaningful (Hz)
    pub fmin: f64,
    pub fmax: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 1 << 16,
            incident_window: 300,
            incident_probe: 1,
            reflected_probe: 0,
            fmin: 5e9,
            fmax: 30e9,
        }
    }
}

/// Complete run description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    /// TFSF plane (E cell index)
    pub source_position: usize,
    /// Probe cell indices
    pub probes: Vec<usize>,
    pub layers: Vec<LayerSpec>,
    pub absorber: AbsorberSpec,
    pub source: SourceSpec,
    /// Number of time steps
    pub max_time: usize,
    pub analysis: AnalysisConfig,
    /// Record an Ez frame every N steps (0 disables)
    pub snapshot_every: usize,
    /// Run the per-cell update passes on the rayon pool
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let grid = GridConfig::default();
        let interface = grid.cells / 2;
        let layer_1 = interface + (0.01 / grid.cell_size) as usize;
        let layer_2 = layer_1 + (0.03 / grid.cell_size) as usize;

        Self {
            source_position: 100,
            probes: vec![75, 125],
            layers: vec![
                LayerSpec::new(interface, layer_1, 3.5),
                LayerSpec::new(layer_1, layer_2, 4.8),
                LayerSpec::new(layer_2, grid.cells, 6.5),
            ],
            absorber: AbsorberSpec::default(),
            source: SourceSpec::default(),
            max_time: 1800,
            analysis: AnalysisConfig::default(),
            snapshot_every: 0,
            parallel: false,
            grid,
        }
    }
}

impl SimulationConfig {
    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Time step (s)
    pub fn dt(&self) -> f64 {
        self.grid.courant * self.grid.cell_size / self.grid.wave_speed
    }

    /// Resolved source pulse parameters
    pub fn pulse(&self) -> Result<PulseParameters> {
        self.source.resolve(self.dt(), self.grid.courant)
    }

    /// Check every constraint that must hold before the time loop starts
    pub fn validate(&self) -> Result<()> {
        let n = self.grid.cells;

        if n < 3 {
            return Err(FdtdError::config(format!("grid needs at least 3 cells, got {n}")));
        }
        if !(self.grid.cell_size > 0.0) || !self.grid.cell_size.is_finite() {
            return Err(FdtdError::config(format!(
                "cell size must be positive, got {}",
                self.grid.cell_size
            )));
        }
        if !(self.grid.courant > 0.0 && self.grid.courant <= 1.0) {
            return Err(FdtdError::config(format!(
                "Courant number must lie in (0, 1] for 1D stability, got {}",
                self.grid.courant
            )));
        }
        if !(self.grid.wave_speed > 0.0) || !self.grid.wave_speed.is_finite() {
            return Err(FdtdError::config(format!(
                "wave speed must be positive, got {}",
                self.grid.wave_speed
            )));
        }

        // Hy[s-1] and mu[s] must both exist
        if self.source_position == 0 || self.source_position > n - 2 {
            return Err(FdtdError::config(format!(
                "source position {} must lie in [1, {}]",
                self.source_position,
                n - 2
            )));
        }

        for &pos in &self.probes {
            if pos >= n {
                return Err(FdtdError::config(format!(
                    "probe position {pos} is outside the grid [0, {n})"
                )));
            }
            if pos >= n - 1 {
                return Err(FdtdError::config(format!(
                    "probe position {pos} has no Hy sample (Hy has {} cells)",
                    n - 1
                )));
            }
        }

        self.validate_layers()?;
        self.validate_absorber()?;

        if self.max_time == 0 {
            return Err(FdtdError::config("max_time must be at least one step"));
        }

        self.validate_analysis()?;
        self.pulse()?;

        Ok(())
    }

    fn validate_layers(&self) -> Result<()> {
        let n = self.grid.cells;
        let mut sorted = self.layers.clone();
        sorted.sort_by_key(|l| l.start);

        for layer in &sorted {
            if layer.start >= layer.end || layer.end > n {
                return Err(FdtdError::config(format!(
                    "layer [{}, {}) is empty or outside the grid [0, {n})",
                    layer.start, layer.end
                )));
            }
            if !(layer.eps > 0.0) || !layer.eps.is_finite() {
                return Err(FdtdError::config(format!(
                    "layer [{}, {}) has invalid permittivity {}",
                    layer.start, layer.end, layer.eps
                )));
            }
        }

        for pair in sorted.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(FdtdError::config(format!(
                    "layers [{}, {}) and [{}, {}) overlap",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                )));
            }
        }

        Ok(())
    }

    fn validate_absorber(&self) -> Result<()> {
        let n = self.grid.cells;
        let a = &self.absorber;

        if a.right_start > n {
            return Err(FdtdError::config(format!(
                "right absorber start {} is outside the grid [0, {n}]",
                a.right_start
            )));
        }
        if a.left_width > a.right_start {
            return Err(FdtdError::config(format!(
                "absorbers [0, {}) and [{}, {n}) overlap",
                a.left_width, a.right_start
            )));
        }
        if !(a.loss >= 0.0) || !a.loss.is_finite() {
            return Err(FdtdError::config(format!(
                "absorber loss must be finite and non-negative, got {}",
                a.loss
            )));
        }

        Ok(())
    }

    fn validate_analysis(&self) -> Result<()> {
        let an = &self.analysis;

        if !an.fft_size.is_power_of_two() {
            return Err(FdtdError::config(format!(
                "FFT size must be power of 2, got {}",
                an.fft_size
            )));
        }
        if an.fft_size < self.max_time {
            return Err(FdtdError::config(format!(
                "FFT size {} is smaller than the step count {}",
                an.fft_size, self.max_time
            )));
        }
        if an.incident_window == 0 || an.incident_window > self.max_time {
            return Err(FdtdError::config(format!(
                "incident window {} must lie in [1, {}]",
                an.incident_window, self.max_time
            )));
        }
        for (role, idx) in [("incident", an.incident_probe), ("reflected", an.reflected_probe)] {
            if idx >= self.probes.len() {
                return Err(FdtdError::config(format!(
                    "{role} probe index {idx} does not name one of the {} probes",
                    self.probes.len()
                )));
            }
        }
        if !(an.fmin < an.fmax) {
            return Err(FdtdError::config(format!(
                "passband must satisfy fmin < fmax, got [{}, {}]",
                an.fmin, an.fmax
            )));
        }

        Ok(())
    }
}
