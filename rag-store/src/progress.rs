//! Stage reporting for ingestion runs.
//!
//! The server passes [`NoopProgress`]; the CLI draws an [`IndicatifProgress`] bar
//! with one tick per working stage.

use indicatif::{ProgressBar, ProgressStyle};

use crate::ingest::IngestStage;

/// Observer of an ingestion run. All methods default to no-ops.
pub trait Progress: Send + Sync {
    /// The run entered one of [`IngestStage::WORK`].
    fn stage(&self, _stage: IngestStage) {}
    /// The run ended with [`IngestStage::Done`] or [`IngestStage::Failed`].
    fn finish(&self, _outcome: IngestStage) {}
}

#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

/// Bar sized to the working stages of one document.
pub struct IndicatifProgress {
    pb: ProgressBar,
    source: String,
}

impl IndicatifProgress {
    pub fn for_document(source: impl Into<String>) -> Self {
        let pb = ProgressBar::new(IngestStage::WORK.len() as u64);
        let style = ProgressStyle::with_template("{prefix} {bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        let source = source.into();
        pb.set_prefix(source.clone());
        Self { pb, source }
    }
}

impl Progress for IndicatifProgress {
    fn stage(&self, stage: IngestStage) {
        // the bar counts finished stages, so the first one stays at 0
        if stage != IngestStage::Fetching {
            self.pb.inc(1);
        }
        self.pb.set_message(stage.as_str());
    }

    fn finish(&self, outcome: IngestStage) {
        match outcome {
            IngestStage::Failed => {
                let at = self.pb.message();
                self.pb
                    .abandon_with_message(format!("{} failed while {at}", self.source));
            }
            _ => self.pb.finish_with_message(outcome.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_ticks_once_per_finished_stage() {
        let p = IndicatifProgress::for_document("cs.pdf");
        for stage in IngestStage::WORK {
            p.stage(stage);
        }
        assert_eq!(p.pb.position(), 4);
        assert_eq!(p.pb.message(), "upserting");

        p.finish(IngestStage::Failed);
        assert_eq!(p.pb.message(), "cs.pdf failed while upserting");
    }
}
