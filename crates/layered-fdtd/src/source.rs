//! Plane-wave sources and their coupling into the grid
//!
//! A [`PlaneWave`] is a pure function of a fractional spatial offset `m`
//! (cells) and a fractional time `q` (steps). A [`SourceContribution`] decides
//! how such a wave enters the update loop; the engine only calls its two
//! hooks, one after the H pass and one after the E pass.

use std::f64::consts::PI;

use crate::config::W0;
use crate::error::{FdtdError, Result};
use crate::medium::Medium;

/// Envelope family of a pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseShape {
    /// Gaussian envelope times a sinusoidal carrier
    Modulated,
    /// Bare Gaussian envelope
    Gaussian,
}

/// Pulse parameters in discrete units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseParameters {
    pub shape: PulseShape,
    /// Envelope center (steps)
    pub delay: f64,
    /// Envelope half-width (steps)
    pub width: f64,
    /// Carrier wavelength (cells); infinite for an unmodulated pulse
    pub cells_per_wavelength: f64,
}

impl PulseParameters {
    /// Build the plane wave for a source sitting in a medium with `eps`, `mu`
    pub fn plane_wave(&self, eps: f64, mu: f64, courant: f64) -> Box<dyn PlaneWave> {
        match self.shape {
            PulseShape::Modulated => Box::new(GaussianModPlaneWave::new(
                self.delay,
                self.width,
                self.cells_per_wavelength,
                eps,
                mu,
                courant,
            )),
            PulseShape::Gaussian => Box::new(GaussianPlaneWave::new(
                self.delay, self.width, eps, mu, courant,
            )),
        }
    }
}

/// Analytic incident field evaluated at spatial offset `m` and time `q`
pub trait PlaneWave: Send + Sync {
    fn field(&self, m: f64, q: f64) -> f64;
}

/// Modulated Gaussian plane wave
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianModPlaneWave {
    pub delay: f64,
    pub width: f64,
    pub cells_per_wavelength: f64,
    pub eps: f64,
    pub mu: f64,
    pub courant: f64,
}

impl GaussianModPlaneWave {
    pub fn new(
        delay: f64,
        width: f64,
        cells_per_wavelength: f64,
        eps: f64,
        mu: f64,
        courant: f64,
    ) -> Self {
        Self {
            delay,
            width,
            cells_per_wavelength,
            eps,
            mu,
            courant,
        }
    }
}

impl PlaneWave for GaussianModPlaneWave {
    fn field(&self, m: f64, q: f64) -> f64 {
        let n = (self.eps * self.mu).sqrt();
        let carrier = (2.0 * PI / self.cells_per_wavelength * (q * self.courant - m * n)).sin();
        let envelope = (-((q - m * n / self.courant - self.delay) / self.width).powi(2)).exp();
        carrier * envelope
    }
}

/// Gaussian plane wave without a carrier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPlaneWave {
    pub delay: f64,
    pub width: f64,
    pub eps: f64,
    pub mu: f64,
    pub courant: f64,
}

impl GaussianPlaneWave {
    pub fn new(delay: f64, width: f64, eps: f64, mu: f64, courant: f64) -> Self {
        Self {
            delay,
            width,
            eps,
            mu,
            courant,
        }
    }
}

impl PlaneWave for GaussianPlaneWave {
    fn field(&self, m: f64, q: f64) -> f64 {
        let n = (self.eps * self.mu).sqrt();
        (-((q - m * n / self.courant - self.delay) / self.width).powi(2)).exp()
    }
}

/// Injected-flux term applied at fixed cells after each bulk update
pub trait SourceContribution: Send {
    /// Called right after the H pass of step `q`
    fn correct_h(&self, q: usize, hy: &mut [f64]);

    /// Called right after the E pass of step `q`
    fn correct_e(&self, q: usize, ez: &mut [f64]);
}

/// Total-field/scattered-field plane at E cell `position`.
///
/// Cells `>= position` hold the total field, cells `< position` only the
/// scattered field.
pub struct TfsfSource {
    position: usize,
    wave: Box<dyn PlaneWave>,
    h_scale: f64,
    e_scale: f64,
}

impl TfsfSource {
    pub fn new(
        position: usize,
        wave: Box<dyn PlaneWave>,
        medium: &Medium,
        courant: f64,
    ) -> Result<Self> {
        if position == 0 || position + 1 >= medium.cells() {
            return Err(FdtdError::config(format!(
                "TFSF plane at {} needs cells on both sides (grid has {})",
                position,
                medium.cells()
            )));
        }
        let mu_h = medium.mu()[position - 1];
        let eps = medium.eps()[position];
        let mu = medium.mu()[position];

        Ok(Self {
            position,
            wave,
            h_scale: courant / (W0 * mu_h),
            e_scale: courant / (eps * mu).sqrt(),
        })
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl SourceContribution for TfsfSource {
    fn correct_h(&self, q: usize, hy: &mut [f64]) {
        hy[self.position - 1] -= self.h_scale * self.wave.field(0.0, q as f64);
    }

    fn correct_e(&self, q: usize, ez: &mut [f64]) {
        ez[self.position] += self.e_scale * self.wave.field(-0.5, q as f64 + 0.5);
    }
}

/// Additive point source on Ez; radiates toward both ends
pub struct SoftSource {
    position: usize,
    wave: Box<dyn PlaneWave>,
}

impl SoftSource {
    pub fn new(position: usize, wave: Box<dyn PlaneWave>) -> Self {
        Self { position, wave }
    }
}

impl SourceContribution for SoftSource {
    fn correct_h(&self, _q: usize, _hy: &mut [f64]) {}

    fn correct_e(&self, q: usize, ez: &mut [f64]) {
        ez[self.position] += self.wave.field(0.0, q as f64);
    }
}
