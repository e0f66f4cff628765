//! Spectral analysis of probe records
//!
//! Incident and reflected series are zero-padded to a power-of-two length,
//! transformed with rustfft and shifted so that index 0 is the most negative
//! frequency. The reflection coefficient is the ratio of the two magnitudes.
//!
//! |Γ| is only meaningful inside the band the source actually excites.
//! Outside it the incident magnitude approaches zero and the ratio is noise
//! or undefined (NaN where the incident magnitude is exactly zero). Use
//! [`Spectrum::passband`] to restrict to the configured band.

use num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;

use crate::error::{FdtdError, Result};

/// Shifted magnitude spectra and reflection coefficient, index-aligned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Frequency axis (Hz), `(k - size/2)·df`
    pub frequencies: Vec<f64>,
    /// |FFT| of the truncated incident series
    pub incident: Vec<f64>,
    /// |FFT| of the reflected series
    pub reflected: Vec<f64>,
    /// |Γ| = reflected / incident; NaN where incident is zero
    pub gamma: Vec<f64>,
    /// Frequency resolution (Hz)
    pub df: f64,
}

/// One sample of the passband view
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GammaPoint {
    pub frequency: f64,
    pub incident: f64,
    pub reflected: f64,
    pub gamma: f64,
}

impl Spectrum {
    /// Transform length
    pub fn size(&self) -> usize {
        self.frequencies.len()
    }

    /// Points with `fmin <= f <= fmax`
    pub fn passband(&self, fmin: f64, fmax: f64) -> Vec<GammaPoint> {
        self.frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f >= fmin && f <= fmax)
            .map(|(k, &f)| GammaPoint {
                frequency: f,
                incident: self.incident[k],
                reflected: self.reflected[k],
                gamma: self.gamma[k],
            })
            .collect()
    }

    /// Incident and reflected spectra divided by the incident peak
    pub fn normalized(&self) -> (Vec<f64>, Vec<f64>) {
        let peak = self.incident.iter().cloned().fold(0.0f64, f64::max);
        if peak == 0.0 {
            return (self.incident.clone(), self.reflected.clone());
        }
        (
            self.incident.iter().map(|v| v / peak).collect(),
            self.reflected.iter().map(|v| v / peak).collect(),
        )
    }
}

/// Zero-pad `samples` to `size`, FFT, and return shifted magnitudes
pub fn shifted_magnitude(samples: &[f64], size: usize) -> Result<Vec<f64>> {
    check_size(size, samples.len())?;

    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    fft.process(&mut buffer);

    let mut magnitude: Vec<f64> = buffer.iter().map(|c| c.norm()).collect();
    fft_shift(&mut magnitude);
    Ok(magnitude)
}

/// Move the zero-frequency bin to the center (even lengths)
pub fn fft_shift(values: &mut [f64]) {
    let half = values.len() / 2;
    values.rotate_left(half);
}

/// Shifted frequency axis for a transform of `size` samples spaced `dt`
pub fn frequency_axis(size: usize, dt: f64) -> Vec<f64> {
    let df = 1.0 / (size as f64 * dt);
    let half = (size / 2) as f64;
    (0..size).map(|k| (k as f64 - half) * df).collect()
}

/// Reflection spectrum from an incident proxy and a reflected record.
///
/// Only the first `incident_window` samples of `incident` are used; the rest
/// is replaced by zeros so that returning reflections are excluded.
pub fn reflection_spectrum(
    incident: &[f64],
    reflected: &[f64],
    incident_window: usize,
    size: usize,
    dt: f64,
) -> Result<Spectrum> {
    if incident_window == 0 || incident_window > incident.len() {
        return Err(FdtdError::config(format!(
            "incident window {} must lie in [1, {}]",
            incident_window,
            incident.len()
        )));
    }
    if !(dt > 0.0) {
        return Err(FdtdError::config(format!("time step must be positive, got {dt}")));
    }

    let mut truncated = vec![0.0; incident.len()];
    truncated[..incident_window].copy_from_slice(&incident[..incident_window]);

    let incident = shifted_magnitude(&truncated, size)?;
    let reflected = shifted_magnitude(reflected, size)?;

    let gamma = incident
        .iter()
        .zip(&reflected)
        .map(|(&i, &r)| if i != 0.0 { r / i } else { f64::NAN })
        .collect();

    Ok(Spectrum {
        frequencies: frequency_axis(size, dt),
        incident,
        reflected,
        gamma,
        df: 1.0 / (size as f64 * dt),
    })
}

/// Frequency of the largest non-negative-frequency bin
pub fn peak_frequency(samples: &[f64], size: usize, dt: f64) -> Result<f64> {
    let magnitude = shifted_magnitude(samples, size)?;
    let frequencies = frequency_axis(size, dt);
    let half = size / 2;

    let (k, _) = magnitude[half..]
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (k, &m)| if m > best.1 { (k, m) } else { best });
    Ok(frequencies[half + k])
}

fn check_size(size: usize, len: usize) -> Result<()> {
    if !size.is_power_of_two() {
        return Err(FdtdError::config(format!("FFT size must be power of 2, got {size}")));
    }
    if size < len {
        return Err(FdtdError::config(format!(
            "FFT size {size} is smaller than the series length {len}"
        )));
    }
    Ok(())
}
