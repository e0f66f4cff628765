//! Layered medium and update coefficients

use crate::config::{AbsorberSpec, SimulationConfig, W0};
use crate::error::{FdtdError, Result};

/// Per-cell material arrays on the Yee grid.
///
/// `eps` and `loss` live on the N E cells, `mu` on the N-1 H cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Medium {
    eps: Vec<f64>,
    mu: Vec<f64>,
    loss: Vec<f64>,
    /// E cells whose coefficients are averaged from their neighbours
    absorber_edges: Vec<usize>,
}

impl Medium {
    /// Wrap explicit arrays. Only the array shapes are checked.
    pub fn from_arrays(eps: Vec<f64>, mu: Vec<f64>, loss: Vec<f64>) -> Result<Self> {
        if eps.len() < 2 {
            return Err(FdtdError::grid_shape(format!(
                "need at least 2 E cells, got {}",
                eps.len()
            )));
        }
        if mu.len() + 1 != eps.len() {
            return Err(FdtdError::grid_shape(format!(
                "mu must have one fewer cell than eps: eps={}, mu={}",
                eps.len(),
                mu.len()
            )));
        }
        if loss.len() != eps.len() {
            return Err(FdtdError::grid_shape(format!(
                "loss must match eps: eps={}, loss={}",
                eps.len(),
                loss.len()
            )));
        }

        Ok(Self {
            eps,
            mu,
            loss,
            absorber_edges: Vec::new(),
        })
    }

    /// Lossless vacuum
    pub fn uniform(cells: usize) -> Result<Self> {
        Self::from_arrays(vec![1.0; cells], vec![1.0; cells.saturating_sub(1)], vec![0.0; cells])
    }

    /// Build the layered medium described by a validated configuration
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let n = config.grid.cells;

        let mut eps = vec![1.0; n];
        for layer in &config.layers {
            eps[layer.start..layer.end].fill(layer.eps);
        }

        let medium = Self::from_arrays(eps, vec![1.0; n - 1], vec![0.0; n])?;
        Ok(medium.with_absorber(&config.absorber))
    }

    /// Apply lossy end regions and mark their inner edges for smoothing
    pub fn with_absorber(mut self, absorber: &AbsorberSpec) -> Self {
        let n = self.cells();
        let right_start = absorber.right_start.min(n);
        let left_width = absorber.left_width.min(right_start);

        self.loss[..left_width].fill(absorber.loss);
        self.loss[right_start..].fill(absorber.loss);

        self.absorber_edges.clear();
        if absorber.loss > 0.0 {
            let mut edges = Vec::new();
            if left_width > 0 {
                edges.push(left_width);
            }
            if right_start < n {
                edges.push(right_start);
            }
            edges.retain(|&edge| edge >= 1 && edge + 1 < n);
            edges.dedup();
            self.absorber_edges = edges;
        }
        self
    }

    /// Number of E cells
    pub fn cells(&self) -> usize {
        self.eps.len()
    }

    pub fn eps(&self) -> &[f64] {
        &self.eps
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn loss(&self) -> &[f64] {
        &self.loss
    }

    pub fn absorber_edges(&self) -> &[usize] {
        &self.absorber_edges
    }
}

/// Update coefficients, fixed for the whole run
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    pub ceze: Vec<f64>,
    pub cezh: Vec<f64>,
    pub chyh: Vec<f64>,
    pub chye: Vec<f64>,
}

impl Coefficients {
    pub fn new(medium: &Medium, courant: f64) -> Self {
        let n = medium.cells();
        let eps = medium.eps();
        let mu = medium.mu();
        let loss = medium.loss();

        let mut ceze: Vec<f64> = loss.iter().map(|l| (1.0 - l) / (1.0 + l)).collect();
        let mut cezh: Vec<f64> = eps
            .iter()
            .zip(loss)
            .map(|(e, l)| courant * W0 / (e * (1.0 + l)))
            .collect();

        let chyh: Vec<f64> = loss[..n - 1].iter().map(|l| (1.0 - l) / (1.0 + l)).collect();
        let chye: Vec<f64> = mu
            .iter()
            .zip(&loss[..n - 1])
            .map(|(m, l)| courant / (W0 * m * (1.0 + l)))
            .collect();

        // A hard loss step would itself reflect
        for &edge in medium.absorber_edges() {
            ceze[edge] = (ceze[edge - 1] + ceze[edge + 1]) / 2.0;
            cezh[edge] = (cezh[edge - 1] + cezh[edge + 1]) / 2.0;
        }

        Self {
            ceze,
            cezh,
            chyh,
            chye,
        }
    }
}
