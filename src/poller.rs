//! Periodic fetch-and-render loop.
//!
//! [`StatusPoller::start`] spawns a timer task that fires every period,
//! starting one full period after the call. Every tick spawns an independent
//! [`StatusPoller::poll_once`]; a slow response never holds back the next
//! tick. With [`Sequencing::Unordered`] overlapping cycles race and the last
//! one to complete wins. [`Sequencing::DiscardStale`] drops completions that
//! were issued before the one already applied.
//!
//! ```text
//!   tick ──▶ poll_once ──▶ source.fetch() ──┬─ Ok(doc) ──▶ render(doc)
//!                                           └─ Err(_)  ──▶ render_failure()
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::render::{RenderReport, Renderer};
use crate::source::StatusSource;
use crate::view::StatusView;

/// Period between poll cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Ordering policy for overlapping poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sequencing {
    /// Every completion is applied; the last to finish wins.
    #[default]
    Unordered,
    /// Completions older than the last applied request are dropped.
    DiscardStale,
}

/// Result of a single poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The document was rendered.
    Rendered(RenderReport),
    /// The fetch failed and the failure message was rendered.
    Failed,
    /// A newer cycle had already been applied; nothing was written.
    Discarded,
}

/// Running counters across all cycles.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    pub cycles: u64,
    pub rendered: u64,
    pub failed: u64,
    pub discarded: u64,
    pub last_success: Option<Instant>,
    pub last_failure: Option<Instant>,
}

impl PollStats {
    /// Whether the most recent completed cycle failed.
    pub fn last_failed(&self) -> bool {
        match (self.last_success, self.last_failure) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(ok), Some(err)) => err > ok,
        }
    }

    fn record(&mut self, outcome: PollOutcome) {
        self.cycles += 1;
        match outcome {
            PollOutcome::Rendered(_) => {
                self.rendered += 1;
                self.last_success = Some(Instant::now());
            }
            PollOutcome::Failed => {
                self.failed += 1;
                self.last_failure = Some(Instant::now());
            }
            PollOutcome::Discarded => self.discarded += 1,
        }
    }
}

struct Inner<V> {
    source: Box<dyn StatusSource>,
    view: Arc<Mutex<V>>,
    renderer: Renderer,
    interval: Duration,
    sequencing: Sequencing,
    /// Sequence number handed to the next request.
    next_seq: AtomicU64,
    /// Sequence number of the last completion written to the view.
    applied_seq: AtomicU64,
    in_flight: AtomicUsize,
    stats: Mutex<PollStats>,
}

/// Fetches status documents from a source and renders them onto a view.
///
/// Cheap to clone; clones share the same view, counters and source.
pub struct StatusPoller<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for StatusPoller<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for StatusPoller<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("source", &self.inner.source.description())
            .field("interval", &self.inner.interval)
            .field("sequencing", &self.inner.sequencing)
            .finish()
    }
}

impl<V: StatusView + 'static> StatusPoller<V> {
    /// Create a poller with the default period and [`Sequencing::Unordered`].
    pub fn new(source: Box<dyn StatusSource>, view: Arc<Mutex<V>>, renderer: Renderer) -> Self {
        Self::with_options(source, view, renderer, DEFAULT_INTERVAL, Sequencing::default())
    }

    /// Create a poller with an explicit period and sequencing policy.
    ///
    /// A zero period is raised to one millisecond.
    pub fn with_options(
        source: Box<dyn StatusSource>,
        view: Arc<Mutex<V>>,
        renderer: Renderer,
        interval: Duration,
        sequencing: Sequencing,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                view,
                renderer,
                interval: interval.max(Duration::from_millis(1)),
                sequencing,
                next_seq: AtomicU64::new(0),
                applied_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                stats: Mutex::new(PollStats::default()),
            }),
        }
    }

    /// The shared view this poller writes to.
    pub fn view(&self) -> Arc<Mutex<V>> {
        Arc::clone(&self.inner.view)
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn sequencing(&self) -> Sequencing {
        self.inner.sequencing
    }

    pub fn source_description(&self) -> &str {
        self.inner.source.description()
    }

    /// Number of requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> PollStats {
        self.inner.stats.lock().clone()
    }

    /// Start the recurring timer. The first cycle runs one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> PollerHandle {
        let poller = self.clone();
        let period = self.inner.interval;
        let started_at = tokio::time::Instant::now();

        info!(
            event = "poller.started",
            source = self.source_description(),
            interval_ms = period.as_millis() as u64
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(started_at + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let cycle = poller.clone();
                tokio::spawn(async move {
                    cycle.poll_once().await;
                });
            }
        });

        PollerHandle {
            task,
            period,
            started_at,
        }
    }

    /// Run one fetch-and-render cycle.
    pub async fn poll_once(&self) -> PollOutcome {
        let inner = &self.inner;
        let seq = inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let result = {
            let _guard = InFlight::enter(&inner.in_flight);
            inner.source.fetch().await
        };

        let outcome = {
            let mut view = inner.view.lock();

            if inner.sequencing == Sequencing::DiscardStale
                && seq < inner.applied_seq.load(Ordering::SeqCst)
            {
                debug!(event = "poller.stale_discarded", seq);
                PollOutcome::Discarded
            } else {
                inner.applied_seq.fetch_max(seq, Ordering::SeqCst);
                match result {
                    Ok(doc) => {
                        let report = inner.renderer.render(&mut *view, &doc);
                        debug!(
                            event = "poller.rendered",
                            seq,
                            written = report.written,
                            skipped = report.skipped
                        );
                        PollOutcome::Rendered(report)
                    }
                    Err(e) => {
                        warn!(
                            event = "poller.poll_failed",
                            seq,
                            source = inner.source.description(),
                            error = %e
                        );
                        inner.renderer.render_failure(&mut *view);
                        PollOutcome::Failed
                    }
                }
            }
        };

        inner.stats.lock().record(outcome);
        outcome
    }
}

/// Keeps the in-flight counter accurate even if the cycle is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of a running poll timer.
///
/// Dropping the handle stops the timer, same as [`PollerHandle::stop`].
/// Requests already in flight are left to complete.
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<()>,
    period: Duration,
    started_at: tokio::time::Instant,
}

impl PollerHandle {
    /// Stop the timer. No further cycles are started.
    pub fn stop(self) {
        info!(event = "poller.stopped");
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Approximate time until the next scheduled cycle.
    pub fn next_poll_in(&self) -> Duration {
        let period = self.period.as_millis().max(1);
        let elapsed = self.started_at.elapsed().as_millis();
        let into_period = elapsed % period;
        Duration::from_millis((period - into_period) as u64)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StatusDocument;
    use crate::error::PollError;
    use crate::render::FAILURE_MESSAGE;
    use crate::view::{default_layout, Page};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    enum Reply {
        Doc(&'static str),
        Status(u16),
    }

    /// Replays a fixed list of (delay, reply) pairs, one per fetch.
    #[derive(Debug)]
    struct ScriptedSource {
        script: Mutex<VecDeque<(Duration, Reply)>>,
        calls: Arc<AtomicUsize>,
    }

    impl std::fmt::Debug for Reply {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Reply::Doc(body) => write!(f, "Doc({})", body),
                Reply::Status(code) => write!(f, "Status({})", code),
            }
        }
    }

    impl ScriptedSource {
        fn new(script: Vec<(u64, Reply)>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let script = script
                .into_iter()
                .map(|(secs, reply)| (Duration::from_secs(secs), reply))
                .collect();
            (
                Self {
                    script: Mutex::new(script),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch(&self) -> Result<StatusDocument, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            let Some((delay, reply)) = next else {
                return Err(PollError::Transport("script exhausted".to_string()));
            };
            tokio::time::sleep(delay).await;
            match reply {
                Reply::Doc(body) => StatusDocument::parse(body),
                Reply::Status(code) => Err(PollError::Status(code)),
            }
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    fn poller(script: Vec<(u64, Reply)>, sequencing: Sequencing) -> (StatusPoller<Page>, Arc<AtomicUsize>) {
        let (source, calls) = ScriptedSource::new(script);
        let view = Arc::new(Mutex::new(Page::from_layout(&default_layout())));
        let poller = StatusPoller::with_options(
            Box::new(source),
            view,
            Renderer::default(),
            DEFAULT_INTERVAL,
            sequencing,
        );
        (poller, calls)
    }

    fn text(poller: &StatusPoller<Page>, id: &str) -> String {
        poller.view().lock().text(id).unwrap_or_default().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once_renders() {
        let (poller, calls) = poller(
            vec![(0, Reply::Doc(r#"{"ts":"0","temp":21.5,"unknownfield":5}"#))],
            Sequencing::Unordered,
        );

        let outcome = poller.poll_once().await;

        assert_eq!(
            outcome,
            PollOutcome::Rendered(RenderReport { written: 2, skipped: 1 })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(text(&poller, "ts"), "0 (NEVER)");
        assert_eq!(text(&poller, "temp"), "21.5");
        assert_eq!(poller.stats().rendered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_values() {
        let (poller, _) = poller(
            vec![
                (0, Reply::Doc(r#"{"temp":"21.50","hum":"40.0"}"#)),
                (0, Reply::Status(500)),
                (0, Reply::Status(404)),
            ],
            Sequencing::Unordered,
        );

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, PollOutcome::Failed);
        assert_eq!(poller.poll_once().await, PollOutcome::Failed);

        assert_eq!(text(&poller, "status"), FAILURE_MESSAGE);
        assert_eq!(text(&poller, "temp"), "21.50");
        assert_eq!(text(&poller, "hum"), "40.0");
        let stats = poller.stats();
        assert_eq!(stats.failed, 2);
        assert!(stats.last_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_renders_failure() {
        // Empty script: every fetch is a transport error
        let (poller, _) = poller(vec![], Sequencing::Unordered);
        assert_eq!(poller.poll_once().await, PollOutcome::Failed);
        assert_eq!(text(&poller, "status"), FAILURE_MESSAGE);
        assert_eq!(text(&poller, "temp"), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_cycles_last_completion_wins() {
        let (poller, _) = poller(
            vec![
                (10, Reply::Doc(r#"{"temp":"first"}"#)),
                (1, Reply::Doc(r#"{"temp":"second"}"#)),
            ],
            Sequencing::Unordered,
        );

        let (a, b) = tokio::join!(poller.poll_once(), poller.poll_once());

        assert!(matches!(a, PollOutcome::Rendered(_)));
        assert!(matches!(b, PollOutcome::Rendered(_)));
        // The first-issued request completed last, so its values stick
        assert_eq!(text(&poller, "temp"), "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_stale_keeps_newest_request() {
        let (poller, _) = poller(
            vec![
                (10, Reply::Doc(r#"{"temp":"first"}"#)),
                (1, Reply::Doc(r#"{"temp":"second"}"#)),
            ],
            Sequencing::DiscardStale,
        );

        let (a, b) = tokio::join!(poller.poll_once(), poller.poll_once());

        assert_eq!(a, PollOutcome::Discarded);
        assert!(matches!(b, PollOutcome::Rendered(_)));
        assert_eq!(text(&poller, "temp"), "second");
        assert_eq!(poller.stats().discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_one_full_period() {
        let (poller, calls) = poller(
            vec![(0, Reply::Doc(r#"{"temp":"21.50"}"#))],
            Sequencing::Unordered,
        );

        let handle = poller.start();
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(29_999)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(text(&poller, "temp"), "21.50");

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_do_not_wait_for_slow_responses() {
        let (poller, calls) = poller(
            vec![
                (100, Reply::Doc("{}")),
                (100, Reply::Doc("{}")),
                (100, Reply::Doc("{}")),
            ],
            Sequencing::Unordered,
        );

        let handle = poller.start();
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(poller.in_flight(), 3);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_race_later_completion_wins() {
        // Tick at 30s resolves at 70s; tick at 60s resolves at 61s
        let (poller, _) = poller(
            vec![
                (40, Reply::Doc(r#"{"temp":"first"}"#)),
                (1, Reply::Doc(r#"{"temp":"second"}"#)),
            ],
            Sequencing::Unordered,
        );

        let handle = poller.start();
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(text(&poller, "temp"), "second");

        tokio::time::sleep(Duration::from_secs(6)).await;
        handle.stop();
        assert_eq!(text(&poller, "temp"), "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_timer() {
        let (poller, calls) = poller(vec![], Sequencing::Unordered);

        let handle = poller.start();
        handle.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_poll_in() {
        let (poller, _) = poller(vec![], Sequencing::Unordered);
        let handle = poller.start();
        assert_eq!(handle.next_poll_in(), DEFAULT_INTERVAL);
        assert_eq!(handle.period(), DEFAULT_INTERVAL);
        handle.stop();
    }

    #[test]
    fn test_last_failed() {
        let mut stats = PollStats::default();
        assert!(!stats.last_failed());
        stats.record(PollOutcome::Failed);
        assert!(stats.last_failed());
        std::thread::sleep(Duration::from_millis(2));
        stats.record(PollOutcome::Rendered(RenderReport::default()));
        assert!(!stats.last_failed());
    }
}
