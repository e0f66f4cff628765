//! Field probes

use serde::Serialize;

use crate::error::{FdtdError, Result};

/// Records Ez and Hy at one cell, one sample per step.
///
/// Buffers are allocated once for the whole run and never grow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    position: usize,
    capacity: usize,
    /// Samples actually produced by the engine; the rest is padding
    valid_len: usize,
    e: Vec<f64>,
    h: Vec<f64>,
}

impl Probe {
    /// Probe at `position` for a grid of `cells` E cells
    pub fn new(position: usize, cells: usize, capacity: usize) -> Result<Self> {
        if position >= cells {
            return Err(FdtdError::config(format!(
                "probe position {position} is outside the grid [0, {cells})"
            )));
        }
        if position + 1 >= cells {
            return Err(FdtdError::config(format!(
                "probe position {position} has no Hy sample (Hy has {} cells)",
                cells - 1
            )));
        }

        Ok(Self {
            position,
            capacity,
            valid_len: 0,
            e: Vec::with_capacity(capacity),
            h: Vec::with_capacity(capacity),
        })
    }

    /// Append the current values at this probe's cell
    pub fn add_data(&mut self, ez: &[f64], hy: &[f64]) -> Result<()> {
        if self.e.len() >= self.capacity {
            return Err(FdtdError::ProbeOverflow {
                position: self.position,
                capacity: self.capacity,
            });
        }
        self.e.push(ez[self.position]);
        self.h.push(hy[self.position]);
        self.valid_len = self.e.len();
        Ok(())
    }

    /// Zero-fill up to capacity after an early stop
    pub fn pad_to_capacity(&mut self) {
        self.e.resize(self.capacity, 0.0);
        self.h.resize(self.capacity, 0.0);
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Samples recorded before any padding
    pub fn valid_len(&self) -> usize {
        self.valid_len
    }

    pub fn e(&self) -> &[f64] {
        &self.e
    }

    pub fn h(&self) -> &[f64] {
        &self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_own_cell() {
        let mut probe = Probe::new(2, 5, 3).unwrap();
        probe.add_data(&[0.0, 1.0, 2.0, 3.0, 4.0], &[10.0, 11.0, 12.0, 13.0]).unwrap();
        probe.add_data(&[0.0, 1.0, 5.0, 3.0, 4.0], &[10.0, 11.0, 15.0, 13.0]).unwrap();
        assert_eq!(probe.e(), &[2.0, 5.0]);
        assert_eq!(probe.h(), &[12.0, 15.0]);
        assert_eq!(probe.valid_len(), 2);
    }

    #[test]
    fn test_last_cell_rejected() {
        assert!(Probe::new(4, 5, 10).is_err());
        assert!(Probe::new(5, 5, 10).is_err());
        assert!(Probe::new(3, 5, 10).is_ok());
    }

    #[test]
    fn test_overflow_and_padding() {
        let ez = [1.0; 4];
        let hy = [2.0; 3];
        let mut probe = Probe::new(1, 4, 4).unwrap();
        for _ in 0..4 {
            probe.add_data(&ez, &hy).unwrap();
        }
        assert!(matches!(
            probe.add_data(&ez, &hy),
            Err(FdtdError::ProbeOverflow { position: 1, capacity: 4 })
        ));

        let mut short = Probe::new(1, 4, 4).unwrap();
        short.add_data(&ez, &hy).unwrap();
        short.pad_to_capacity();
        assert_eq!(short.e(), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(short.h(), &[2.0, 0.0, 0.0, 0.0]);
        assert_eq!(short.valid_len(), 1);
    }
}
