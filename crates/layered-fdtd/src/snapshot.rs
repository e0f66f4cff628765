//! Periodic Ez snapshots for external animation

use serde::Serialize;

use crate::engine::{FieldObserver, ObserverControl};

/// Ez over the whole grid after one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub step: usize,
    pub ez: Vec<f64>,
}

/// Copies Ez every `every` steps; `every == 0` records nothing
#[derive(Debug, Clone, Default)]
pub struct SnapshotRecorder {
    every: usize,
    frames: Vec<Frame>,
}

impl SnapshotRecorder {
    pub fn new(every: usize, max_time: usize) -> Self {
        let capacity = if every == 0 { 0 } else { max_time.div_ceil(every) };
        Self {
            every,
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FieldObserver for SnapshotRecorder {
    fn observe(&mut self, step: usize, ez: &[f64], _hy: &[f64]) -> ObserverControl {
        if self.every != 0 && step % self.every == 0 {
            tracing::debug!("snapshot at step {}", step);
            self.frames.push(Frame {
                step,
                ez: ez.to_vec(),
            });
        }
        ObserverControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_every_nth_step() {
        let mut recorder = SnapshotRecorder::new(5, 12);
        for step in 0..12 {
            recorder.observe(step, &[step as f64, 0.0], &[0.0]);
        }
        let steps: Vec<usize> = recorder.frames().iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![0, 5, 10]);
        assert_eq!(recorder.frames()[1].ez, vec![5.0, 0.0]);
    }

    #[test]
    fn test_disabled() {
        let mut recorder = SnapshotRecorder::new(0, 100);
        recorder.observe(0, &[1.0], &[]);
        assert!(recorder.frames().is_empty());
    }
}
