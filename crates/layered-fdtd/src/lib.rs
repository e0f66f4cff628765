//! layered-fdtd: reflection spectra of layered dielectrics by 1D FDTD
//!
//! This crate provides:
//! - A layered, lossy medium model with absorbing end regions
//! - Modulated-Gaussian plane waves injected through a TF/SF plane
//! - A Yee leapfrog engine (Ez / Hy) with probes and field observers
//! - FFT-based incident/reflected spectra and the reflection coefficient |Γ(f)|
//!
//! All quantities inside the engine are in discrete units: cells for space,
//! steps for time. Physical units only appear in the configuration (cell
//! size, frequencies) and on the spectral frequency axis.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod medium;
pub mod probe;
pub mod simulation;
pub mod snapshot;
pub mod source;
pub mod spectrum;

pub use config::{
    AbsorberSpec, AnalysisConfig, GridConfig, LayerSpec, SimulationConfig, SourceSpec, C0,
    REFERENCE_WAVE_SPEED, W0,
};
pub use engine::{EngineState, FdtdEngine, FieldObserver, ObserverControl};
pub use error::{FdtdError, FieldComponent, Result};
pub use medium::{Coefficients, Medium};
pub use probe::Probe;
pub use simulation::{fresnel_reflection, run, RunOutput, Simulation};
pub use snapshot::{Frame, SnapshotRecorder};
pub use source::{
    GaussianModPlaneWave, GaussianPlaneWave, PlaneWave, PulseParameters, PulseShape, SoftSource,
    SourceContribution, TfsfSource,
};
pub use spectrum::{reflection_spectrum, GammaPoint, Spectrum};
