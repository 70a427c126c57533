//! Per-pass outcome tally

use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

use crate::model::PublishResults;
use crate::status::PostStatus;

/// What happened to one due post during a pass
#[derive(Debug, Clone, Serialize)]
pub struct PostOutcome {
    pub post_id: String,
    /// Status the pass resolved the post to
    pub status: PostStatus,
    pub results: PublishResults,
    /// Whether the updated record was written
    pub persisted: bool,
}

impl PostOutcome {
    pub fn failed_platforms(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(p, _)| p.to_string())
            .collect()
    }
}

/// Read-only summary of one publish pass
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    pub dry_run: bool,
    /// Due posts selected for this pass
    pub considered: usize,
    pub published: usize,
    pub failed: usize,
    /// Resolved posts whose write did not land; they stay scheduled
    pub persist_errors: usize,
    /// Due posts left untouched because shutdown was requested
    pub deferred: usize,
    pub outcomes: Vec<PostOutcome>,
}

impl RunSummary {
    pub fn new(started_at: OffsetDateTime, dry_run: bool) -> Self {
        Self {
            started_at,
            finished_at: None,
            dry_run,
            considered: 0,
            published: 0,
            failed: 0,
            persist_errors: 0,
            deferred: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: PostOutcome) {
        if !outcome.persisted {
            self.persist_errors += 1;
        } else {
            match outcome.status {
                PostStatus::Published => self.published += 1,
                PostStatus::Failed => self.failed += 1,
                _ => {}
            }
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self, at: OffsetDateTime) {
        self.finished_at = Some(at);
    }

    /// Posts resolved and written this pass
    pub fn resolved(&self) -> usize {
        self.published + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "considered={} published={} failed={}",
            self.considered, self.published, self.failed
        )?;
        if self.persist_errors > 0 {
            write!(f, " persist_errors={}", self.persist_errors)?;
        }
        if self.deferred > 0 {
            write!(f, " deferred={}", self.deferred)?;
        }
        if self.dry_run {
            f.write_str(" (dry run)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, PublishResult};
    use time::macros::datetime;

    fn outcome(status: PostStatus, persisted: bool) -> PostOutcome {
        PostOutcome {
            post_id: "p".to_string(),
            status,
            results: PublishResults::new(),
            persisted,
        }
    }

    #[test]
    fn test_record_tallies_by_status() {
        let mut summary = RunSummary::new(datetime!(2024-01-01 00:00 UTC), false);
        summary.considered = 4;
        summary.record(outcome(PostStatus::Published, true));
        summary.record(outcome(PostStatus::Failed, true));
        summary.record(outcome(PostStatus::Failed, true));
        summary.record(outcome(PostStatus::Published, false));

        assert_eq!(summary.published, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.persist_errors, 1);
        assert_eq!(summary.resolved(), 3);
        assert_eq!(summary.outcomes.len(), 4);
        assert_eq!(
            summary.to_string(),
            "considered=4 published=1 failed=2 persist_errors=1"
        );
    }

    #[test]
    fn test_failed_platforms() {
        let mut results = PublishResults::new();
        results.insert(Platform::Twitter, PublishResult::failed("nope"));
        results.insert(
            Platform::Reddit,
            PublishResult::succeeded("r1", "https://reddit.com/r1", datetime!(2024-01-01 00:00 UTC)),
        );
        let outcome = PostOutcome {
            post_id: "p".to_string(),
            status: PostStatus::Failed,
            results,
            persisted: true,
        };
        assert_eq!(outcome.failed_platforms(), vec!["twitter"]);
    }
}
