//! Running score statistics over terminal tasks.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::task::TaskOutcome;

/// Counts and score sum, updated once per task as it reaches a terminal state.
///
/// The type is `Copy`: progress snapshots take it by value, so a reader can
/// never observe a half-applied `record`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ScoreAccumulator {
    completed_count: usize,
    failed_count: usize,
    score_sum: f64,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one terminal outcome.
    pub fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Succeeded { score } => {
                self.completed_count += 1;
                self.score_sum += score;
            }
            TaskOutcome::Failed => self.failed_count += 1,
        }
    }

    /// Tasks that reached `Succeeded`.
    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Tasks that reached `Failed`.
    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Sum of scores over succeeded tasks only.
    pub fn score_sum(&self) -> f64 {
        self.score_sum
    }

    /// Tasks that reached any terminal state.
    pub fn processed(&self) -> usize {
        self.completed_count + self.failed_count
    }

    /// Mean score over succeeded tasks; `None` means "no data", not zero.
    pub fn average_score(&self) -> Option<f64> {
        if self.completed_count == 0 {
            None
        } else {
            Some(self.score_sum / self.completed_count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_average() {
        let acc = ScoreAccumulator::new();
        assert_eq!(acc.processed(), 0);
        assert_eq!(acc.average_score(), None);
    }

    #[test]
    fn test_failures_do_not_touch_score() {
        let mut acc = ScoreAccumulator::new();
        acc.record(TaskOutcome::Succeeded { score: 5.0 });
        acc.record(TaskOutcome::Succeeded { score: 3.0 });
        acc.record(TaskOutcome::Failed);

        assert_eq!(acc.completed_count(), 2);
        assert_eq!(acc.failed_count(), 1);
        assert_eq!(acc.score_sum(), 8.0);
        assert_eq!(acc.average_score(), Some(4.0));
    }

    #[test]
    fn test_all_failed_is_no_data() {
        let mut acc = ScoreAccumulator::new();
        for _ in 0..4 {
            acc.record(TaskOutcome::Failed);
        }
        assert_eq!(acc.processed(), 4);
        assert_eq!(acc.average_score(), None);
    }

    #[test]
    fn test_average_matches_plain_mean() {
        let scores = [1.0, 2.0, 4.0, 5.0, 3.0, 0.0, 5.0];
        let mut acc = ScoreAccumulator::new();
        for score in scores {
            acc.record(TaskOutcome::Succeeded { score });
        }
        let expected = scores.iter().sum::<f64>() / scores.len() as f64;
        assert_eq!(acc.average_score(), Some(expected));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut acc = ScoreAccumulator::new();
        acc.record(TaskOutcome::Succeeded { score: 2.0 });
        let snapshot = acc;
        acc.record(TaskOutcome::Failed);
        assert_eq!(snapshot.processed(), 1);
        assert_eq!(acc.processed(), 2);
    }
}
