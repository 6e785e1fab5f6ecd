use super::{LOG_TARGET, Progress, RevisionEvaluator, SearchLimits, StopReason};
use crate::Result;
use crate::evergreen::RevisionDescriptor;
use core::pin::pin;
use core::sync::atomic::{AtomicU64, Ordering};
use futures::{Stream, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The identifier of the newest revision that matched
    Matched(String),

    /// Every revision was evaluated and none matched
    Exhausted,

    /// A limit ended the search before a match was found
    Stopped(StopReason),
}

/// A linear, newest-first scan over a revision history.
#[derive(Debug)]
pub struct RevisionSearch<'a> {
    limits: &'a SearchLimits,
    progress: &'a dyn Progress,
}

impl<'a> RevisionSearch<'a> {
    #[must_use]
    pub const fn new(limits: &'a SearchLimits, progress: &'a dyn Progress) -> Self {
        Self { limits, progress }
    }

    /// Evaluate revisions in stream order until one matches.
    ///
    /// Limits are checked before a revision is evaluated, so a stopped search never fetches
    /// anything for the revision that tripped the limit. The stream is not polled past the
    /// first match. Stream and evaluation errors end the search.
    pub async fn run<E, S>(&self, label: &str, evaluator: &E, revisions: S) -> Result<SearchOutcome>
    where
        E: RevisionEvaluator,
        S: Stream<Item = Result<RevisionDescriptor>>,
    {
        let start_time = Instant::now();
        let scanned = Arc::new(AtomicU64::new(0));

        self.progress.set_phase("Searching");
        self.progress.set_determinate(Box::new({
            let scanned = Arc::clone(&scanned);
            let total = self.limits.max_lookback as u64;
            let message = format!("{label} revisions");
            move || (total, scanned.load(Ordering::Relaxed).min(total), message.clone())
        }));

        let outcome = self.scan(evaluator, revisions, start_time, &scanned).await;
        self.progress.done();

        let outcome = outcome?;
        log::debug!(
            target: LOG_TARGET,
            "Search finished after {} revision(s) in {:.3}s: {outcome:?}",
            scanned.load(Ordering::Relaxed),
            start_time.elapsed().as_secs_f64()
        );
        Ok(outcome)
    }

    async fn scan<E, S>(&self, evaluator: &E, revisions: S, start_time: Instant, scanned: &AtomicU64) -> Result<SearchOutcome>
    where
        E: RevisionEvaluator,
        S: Stream<Item = Result<RevisionDescriptor>>,
    {
        let mut revisions = pin!(revisions);
        let mut index = 0;

        while let Some(revision) = revisions.try_next().await? {
            if let Some(reason) = self.limits.limit_hit(index, &revision.revision, start_time.elapsed()) {
                return Ok(SearchOutcome::Stopped(reason));
            }

            log::debug!(target: LOG_TARGET, "Evaluating revision {index} '{}'", revision.revision);
            let matched = evaluator.evaluate(&revision).await?;
            let _ = scanned.fetch_add(1, Ordering::Relaxed);

            if matched {
                return Ok(SearchOutcome::Matched(revision.revision));
            }

            index += 1;
        }

        Ok(SearchOutcome::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::NoProgress;
    use core::time::Duration;
    use futures::stream::{self, StreamExt};
    use std::sync::Mutex;

    /// Matches revisions by position and records which ones it saw.
    struct ScriptedEvaluator {
        verdicts: Vec<bool>,
        seen: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl ScriptedEvaluator {
        fn new(verdicts: &[bool]) -> Self {
            Self {
                verdicts: verdicts.to_vec(),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl RevisionEvaluator for ScriptedEvaluator {
        async fn evaluate(&self, revision: &RevisionDescriptor) -> Result<bool> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let index: usize = revision.revision.trim_start_matches("rev").parse().unwrap();
            self.seen.lock().unwrap().push(revision.revision.clone());
            Ok(self.verdicts[index % self.verdicts.len()])
        }
    }

    fn revisions(count: usize) -> impl Stream<Item = Result<RevisionDescriptor>> {
        stream::iter((0..count).map(|i| Ok(RevisionDescriptor::new(format!("rev{i}"), Vec::new()))))
    }

    fn limits(max_lookback: usize) -> SearchLimits {
        SearchLimits {
            max_lookback,
            ..SearchLimits::default()
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let evaluator = ScriptedEvaluator::new(&[false, false, false, true, true, false]);
        let limits = limits(50);

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, revisions(20))
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Matched("rev3".to_string()));
        assert_eq!(evaluator.seen(), ["rev0", "rev1", "rev2", "rev3"]);
    }

    #[tokio::test]
    async fn test_lookback_stops_before_match() {
        let evaluator = ScriptedEvaluator::new(&[false, false, false, true]);
        let limits = limits(1);

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, revisions(20))
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Stopped(StopReason::Lookback { index: 2, max_lookback: 1 }));
        assert_eq!(evaluator.seen(), ["rev0", "rev1"]);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let evaluator = ScriptedEvaluator::new(&[false]);
        let limits = limits(50);

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, revisions(5))
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(evaluator.seen().len(), 5);
    }

    #[tokio::test]
    async fn test_commit_limit() {
        let evaluator = ScriptedEvaluator::new(&[false, false, true]);
        let limits = SearchLimits {
            commit_limit: Some("rev2".to_string()),
            ..SearchLimits::default()
        };

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, revisions(10))
            .await
            .unwrap();

        assert!(matches!(outcome, SearchOutcome::Stopped(StopReason::CommitLimit { .. })));
        assert_eq!(evaluator.seen(), ["rev0", "rev1"]);
    }

    #[tokio::test]
    async fn test_timeout_checked_between_revisions() {
        let evaluator = ScriptedEvaluator {
            delay: Duration::from_millis(50),
            ..ScriptedEvaluator::new(&[false])
        };
        let limits = SearchLimits {
            timeout: Some(Duration::from_millis(10)),
            ..SearchLimits::default()
        };

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, revisions(10))
            .await
            .unwrap();

        // The first evaluation runs to completion even though it outlasts the timeout
        assert!(matches!(outcome, SearchOutcome::Stopped(StopReason::Timeout { .. })));
        assert_eq!(evaluator.seen(), ["rev0"]);
    }

    #[tokio::test]
    async fn test_stream_is_not_polled_past_match() {
        let evaluator = ScriptedEvaluator::new(&[true]);
        let limits = limits(50);
        let polled = AtomicU64::new(0);

        let stream = revisions(10).inspect(|_| {
            let _ = polled.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = RevisionSearch::new(&limits, &NoProgress)
            .run("project", &evaluator, stream)
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Matched("rev0".to_string()));
        assert_eq!(polled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_error_ends_search() {
        let evaluator = ScriptedEvaluator::new(&[false]);
        let limits = limits(50);
        let stream = revisions(2).chain(stream::once(async { Err(ohno::app_err!("page fetch failed")) }));

        let result = RevisionSearch::new(&limits, &NoProgress).run("project", &evaluator, stream).await;

        assert!(result.is_err());
        assert_eq!(evaluator.seen().len(), 2);
    }
}
