use crate::state::{events::StatSample, timeline::Timeline};

/// Cumulative statistic rebuilt from periodic checkpoints plus the exact deltas
/// received after them.
///
/// A checkpoint is trusted as ground truth at its own timestamp; deltas at or
/// before it are kept for auditing but never summed.
#[derive(Debug, Clone, Default)]
pub struct CheckpointedStatTrack {
    checkpoints: Timeline<StatSample>,
    deltas: Timeline<StatSample>,
}

impl CheckpointedStatTrack {
    /// Create an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an exact increment.
    pub fn add_delta(&mut self, sample: StatSample) {
        self.deltas.insert(sample);
    }

    /// Store an authoritative absolute value.
    pub fn add_checkpoint(&mut self, sample: StatSample) {
        self.checkpoints.insert(sample);
    }

    /// Value of the statistic at `at`, or `None` before the first checkpoint.
    pub fn value_at(&self, at: i64) -> Option<f64> {
        let base = self.checkpoints.event_at(at)?;
        let drift: f64 = self
            .deltas
            .between(base.time, at)
            .iter()
            .map(|delta| delta.value)
            .sum();
        Some(base.value + drift)
    }

    /// Latest checkpoint at or before `at`.
    pub fn checkpoint_at(&self, at: i64) -> Option<&StatSample> {
        self.checkpoints.event_at(at)
    }

    /// Every stored delta, including those shadowed by a later checkpoint.
    pub fn deltas(&self) -> &Timeline<StatSample> {
        &self.deltas
    }

    /// Number of stored checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Number of stored deltas.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Drop both checkpoints and deltas.
    pub fn clear(&mut self) {
        self.checkpoints.clear();
        self.deltas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_from_checkpoint_and_later_deltas() {
        let mut track = CheckpointedStatTrack::new();
        track.add_checkpoint(StatSample::new(0, 0.0));
        track.add_checkpoint(StatSample::new(1000, 500.0));
        track.add_delta(StatSample::new(1200, 300.0));

        assert_eq!(track.value_at(1100), Some(500.0));
        assert_eq!(track.value_at(1300), Some(800.0));
        assert_eq!(track.value_at(-1), None);
    }

    #[test]
    fn deltas_before_baseline_are_ignored_but_kept() {
        let mut track = CheckpointedStatTrack::new();
        track.add_delta(StatSample::new(400, 50.0));
        track.add_checkpoint(StatSample::new(500, 1000.0));
        track.add_delta(StatSample::new(500, 20.0));
        track.add_delta(StatSample::new(600, 30.0));

        assert_eq!(track.value_at(450), None);
        assert_eq!(track.value_at(500), Some(1000.0));
        assert_eq!(track.value_at(600), Some(1030.0));
        assert_eq!(track.delta_count(), 3);
        assert_eq!(track.deltas().first().map(|d| d.time), Some(400));
    }

    #[test]
    fn late_checkpoint_overrides_accumulated_drift() {
        let mut track = CheckpointedStatTrack::new();
        track.add_checkpoint(StatSample::new(0, 0.0));
        track.add_delta(StatSample::new(100, 300.0));
        track.add_delta(StatSample::new(200, 300.0));
        // A delta went missing in transit; the checkpoint carries the truth.
        track.add_checkpoint(StatSample::new(250, 900.0));

        assert_eq!(track.value_at(220), Some(600.0));
        assert_eq!(track.value_at(250), Some(900.0));
        assert_eq!(track.checkpoint_at(260).map(|c| c.value), Some(900.0));
    }

    #[test]
    fn out_of_order_arrival_is_resolved_by_time() {
        let mut track = CheckpointedStatTrack::new();
        track.add_delta(StatSample::new(1200, 300.0));
        track.add_checkpoint(StatSample::new(1000, 500.0));
        track.add_checkpoint(StatSample::new(0, 0.0));
        track.add_delta(StatSample::new(1100, 1.0));

        assert_eq!(track.value_at(1150), Some(501.0));
        assert_eq!(track.value_at(1300), Some(801.0));
    }

    #[test]
    fn clear_empties_both_timelines() {
        let mut track = CheckpointedStatTrack::new();
        track.add_checkpoint(StatSample::new(0, 10.0));
        track.add_delta(StatSample::new(5, 1.0));
        track.clear();

        assert_eq!(track.value_at(10), None);
        assert_eq!(track.checkpoint_count(), 0);
        assert_eq!(track.delta_count(), 0);
    }
}
