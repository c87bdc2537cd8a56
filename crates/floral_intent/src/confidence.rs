//! Deterministic confidence for a resolved selection.

use serde::Serialize;

/// Confidence lost per unresolved conflict note.
pub const CONFLICT_PENALTY: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLabel {
    Low,
    Med,
    High,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLabel::High
        } else if score >= 0.5 {
            ConfidenceLabel::Med
        } else {
            ConfidenceLabel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub score: f64,
    pub label: ConfidenceLabel,
}

impl Confidence {
    /// `mean(scores) * (1 - 0.2 * conflicts)`, clamped to `[0, 1]`.
    pub fn from_scores(scores: &[f64], conflicts: usize) -> Self {
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        let penalty = 1.0 - CONFLICT_PENALTY * conflicts as f64;
        let score = (mean * penalty).clamp(0.0, 1.0);
        Self {
            score,
            label: ConfidenceLabel::from_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_without_conflicts() {
        let c = Confidence::from_scores(&[1.0, 0.5, 0.6], 0);
        assert!((c.score - 0.7).abs() < 1e-9);
        assert_eq!(c.label, ConfidenceLabel::Med);
    }

    #[test]
    fn test_conflicts_penalise() {
        let c = Confidence::from_scores(&[1.0, 1.0], 2);
        assert!((c.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_at_zero() {
        let c = Confidence::from_scores(&[1.0], 7);
        assert_eq!(c.score, 0.0);
        assert_eq!(c.label, ConfidenceLabel::Low);
    }

    #[test]
    fn test_empty_scores() {
        assert_eq!(Confidence::from_scores(&[], 0).score, 0.0);
    }
}
