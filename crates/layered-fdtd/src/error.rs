//! Error types for layered FDTD runs.

use thiserror::Error;

/// Result type for FDTD operations.
pub type Result<T> = std::result::Result<T, FdtdError>;

/// Field component named in numerical diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldComponent {
    Ez,
    Hy,
}

impl std::fmt::Display for FieldComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldComponent::Ez => write!(f, "Ez"),
            FieldComponent::Hy => write!(f, "Hy"),
        }
    }
}

/// Errors that can occur while configuring or running a simulation.
#[derive(Error, Debug)]
pub enum FdtdError {
    /// Invalid configuration, detected before the time loop starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Medium arrays with inconsistent lengths.
    #[error("Grid shape error: {0}")]
    GridShape(String),

    /// A field value became NaN or infinite during stepping.
    #[error("Non-finite {component} at cell {cell} on step {step}")]
    NonFinite {
        step: usize,
        component: FieldComponent,
        cell: usize,
    },

    /// Operation not allowed in the current engine state.
    #[error("Engine state error: {0}")]
    State(String),

    /// Probe buffer is full.
    #[error("Probe at cell {position} is full ({capacity} samples)")]
    ProbeOverflow { position: usize, capacity: usize },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FdtdError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a grid shape error.
    pub fn grid_shape(msg: impl Into<String>) -> Self {
        Self::GridShape(msg.into())
    }

    /// Create an engine state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}
