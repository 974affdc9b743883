//! Answer confidence derived from the best retrieval score.

use rag_store::DistanceKind;
use serde::{Deserialize, Serialize};

use crate::error::ContextorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Score thresholds together with the metric they were calibrated for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfidencePolicy {
    pub metric: DistanceKind,
    pub high: f32,
    pub medium: f32,
}

impl ConfidencePolicy {
    pub fn new(metric: DistanceKind) -> Self {
        Self {
            metric,
            high: 0.8,
            medium: 0.6,
        }
    }

    /// `score > high` is high, `score > medium` is medium, anything else
    /// (NaN included) is low.
    pub fn classify(&self, score: f32) -> Confidence {
        if score > self.high {
            Confidence::High
        } else if score > self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn validate(&self, index_metric: DistanceKind) -> Result<(), ContextorError> {
        if !(self.high.is_finite() && self.medium.is_finite()) || self.high <= self.medium {
            return Err(ContextorError::InvalidConfiguration(format!(
                "confidence thresholds need high > medium (got {} / {})",
                self.high, self.medium
            )));
        }
        if self.metric != index_metric {
            return Err(ContextorError::InvalidConfiguration(format!(
                "confidence thresholds are calibrated for {} but the index uses {}",
                self.metric.as_str(),
                index_metric.as_str()
            )));
        }
        Ok(())
    }
}
