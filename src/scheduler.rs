//! Drives collect → filter → render without blocking the input loop.
//!
//! ```text
//!   Idle ──tick / refresh──▶ Polling ──result──▶ Rendering ──▶ Idle
//! ```
//!
//! Collection runs on a worker thread and hands its result back over a
//! channel; [`Scheduler::pump`] is called from the UI loop to pick it up.
//! Ticks that arrive while busy are dropped; a manual refresh while busy is
//! remembered (once) and started as soon as the scheduler is idle again.

use crate::collectors::command::CancelToken;
use crate::collectors::{CollectError, Collection, Collector, ParseWarning};
use crate::filter::Filters;
use crate::history::History;
use crate::models::pool::Pool;
use crate::view_model::{self, CycleStatus, Selection, ViewModel};
use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Rendering,
}

type PollResult = Result<Collection, CollectError>;

struct Worker {
    handle: JoinHandle<()>,
    cancel: CancelToken,
    rx:     Receiver<PollResult>,
}

/// Last good state plus the bookkeeping of the cycles since.
#[derive(Debug, Default)]
struct Store {
    pools:                Vec<Pool>,
    warnings:             Vec<ParseWarning>,
    cycle:                u64,
    last_success:         Option<DateTime<Utc>>,
    error:                Option<String>,
    consecutive_failures: u32,
}

impl Store {
    fn status(&self) -> CycleStatus {
        CycleStatus {
            cycle:                self.cycle,
            last_success:         self.last_success,
            error:                self.error.clone(),
            consecutive_failures: self.consecutive_failures,
            warnings:             self.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Replace the snapshot. Pools the collection marks incomplete keep
    /// their previous version whole, or are left out if there is none.
    fn replace(&mut self, c: Collection) {
        let mut pools = c.pools;
        for name in &c.incomplete {
            if let Some(prev) = self.pools.iter().find(|p| &p.name == name) {
                pools.push(prev.clone());
            }
        }
        self.pools        = pools;
        self.warnings     = c.warnings;
        self.last_success = Some(c.collected_at);
        self.error        = None;
        self.consecutive_failures = 0;
    }
}

pub struct Scheduler {
    collector:      Arc<dyn Collector>,
    filters:        Filters,
    interval:       Duration,
    phase:          Phase,
    next_tick:      Instant,
    pending_manual: bool,
    coalesced:      u64,
    worker:         Option<Worker>,
    store:          Store,
    history:        History,
    view:           ViewModel,
}

impl Scheduler {
    pub fn new(collector: Arc<dyn Collector>, filters: Filters, interval: Duration, history_capacity: usize) -> Self {
        Self {
            collector,
            filters,
            interval,
            phase:          Phase::Idle,
            next_tick:      Instant::now() + interval,
            pending_manual: false,
            coalesced:      0,
            worker:         None,
            store:          Store::default(),
            history:        History::new(history_capacity),
            view:           ViewModel::default(),
        }
    }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn view(&self) -> &ViewModel { &self.view }

    pub fn interval(&self) -> Duration { self.interval }

    /// Ticks dropped because a poll was already in flight.
    #[cfg(test)]
    pub fn coalesced_ticks(&self) -> u64 { self.coalesced }

    #[cfg(test)]
    pub fn has_pending_refresh(&self) -> bool { self.pending_manual }

    pub fn pool_filter(&self) -> Option<&str> { self.filters.pool.as_deref() }

    /// Apply a result obtained outside the worker (the startup poll).
    pub fn seed(&mut self, result: PollResult, sel: &Selection) {
        self.finish(result, sel);
        self.next_tick = Instant::now() + self.interval;
    }

    /// Timer check; call every loop iteration. Returns true if a poll started.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.next_tick = now + self.interval;
        if self.phase != Phase::Idle {
            self.coalesced += 1;
            debug!(coalesced = self.coalesced, "tick dropped; poll in flight");
            return false;
        }
        self.start();
        true
    }

    /// Manual refresh. Starts now when idle, otherwise after the current poll.
    pub fn request_refresh(&mut self) {
        if self.phase == Phase::Idle {
            self.start();
        } else {
            self.pending_manual = true;
        }
    }

    /// Pick up a finished poll, if any. Returns true when the view changed.
    pub fn pump(&mut self, sel: &Selection) -> bool {
        let Some(worker) = &self.worker else { return false };
        let result = match worker.rx.try_recv() {
            Ok(r)                           => r,
            Err(TryRecvError::Empty)        => return false,
            Err(TryRecvError::Disconnected) => Err(CollectError::WorkerLost),
        };
        if let Some(w) = self.worker.take() {
            let _ = w.handle.join();
        }
        self.finish(result, sel);
        if std::mem::take(&mut self.pending_manual) {
            self.start();
        }
        true
    }

    /// Rebuild the view from the stored state, e.g. after the selection moved.
    pub fn rerender(&mut self, sel: &Selection) {
        let filtered = self.filters.apply(&self.store.pools);
        self.view = view_model::build(&filtered, &self.history, sel, &self.store.status());
    }

    /// Cancel any in-flight poll, wait for its worker and discard the result.
    pub fn shutdown(&mut self) {
        if let Some(w) = self.worker.take() {
            w.cancel.cancel();
            let _ = w.handle.join();
            debug!("in-flight poll cancelled at shutdown");
        }
        self.pending_manual = false;
        self.phase = Phase::Idle;
    }

    /// The filtered snapshot as of the last successful poll.
    #[cfg(test)]
    pub fn snapshot(&self) -> crate::filter::FilteredView {
        self.filters.apply(&self.store.pools)
    }

    fn start(&mut self) {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let collector = Arc::clone(&self.collector);
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            let _ = tx.send(collector.collect(&token));
        });
        self.worker = Some(Worker { handle, cancel, rx });
        self.phase = Phase::Polling;
        debug!(cycle = self.store.cycle + 1, "poll started");
    }

    fn finish(&mut self, result: PollResult, sel: &Selection) {
        self.phase = Phase::Rendering;
        self.store.cycle += 1;
        match result {
            Ok(c) => {
                info!(cycle = self.store.cycle, pools = c.pools.len(), warnings = c.warnings.len(), "poll ok");
                self.history.record_collection(&c);
                self.store.replace(c);
            }
            Err(CollectError::Cancelled) => {
                debug!("poll cancelled; result discarded");
            }
            Err(e) => {
                self.store.consecutive_failures += 1;
                warn!(error = %e, failures = self.store.consecutive_failures, "poll failed");
                self.store.error = Some(e.to_string());
            }
        }
        self.rerender(sel);
        self.phase = Phase::Idle;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fixtures;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Sleeps `delay` (in small steps, honouring cancel) then returns the fixture.
    struct SlowCollector {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Collector for SlowCollector {
        fn collect(&self, cancel: &CancelToken) -> PollResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let until = Instant::now() + self.delay;
            while Instant::now() < until {
                if cancel.is_cancelled() { return Err(CollectError::Cancelled); }
                thread::sleep(Duration::from_millis(5));
            }
            Ok(fixtures::collection())
        }
    }

    /// Returns queued results in order.
    struct ScriptedCollector(Mutex<VecDeque<PollResult>>);

    impl Collector for ScriptedCollector {
        fn collect(&self, _cancel: &CancelToken) -> PollResult {
            self.0.lock().unwrap().pop_front().unwrap_or(Err(CollectError::Cancelled))
        }
    }

    struct PanickingCollector;

    impl Collector for PanickingCollector {
        fn collect(&self, _cancel: &CancelToken) -> PollResult {
            panic!("parser bug");
        }
    }

    fn wait_idle(s: &mut Scheduler, sel: &Selection) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while s.phase() != Phase::Idle || s.worker.is_some() {
            s.pump(sel);
            assert!(Instant::now() < deadline, "poll never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn slow(delay_ms: u64) -> (Scheduler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let collector = SlowCollector { delay: Duration::from_millis(delay_ms), calls: Arc::clone(&calls) };
        let s = Scheduler::new(Arc::new(collector), Filters::default(), Duration::from_millis(10), 10);
        (s, calls)
    }

    #[test]
    fn ticks_while_polling_are_coalesced() {
        let (mut s, calls) = slow(300);
        let sel = Selection::default();
        assert!(s.tick(Instant::now() + Duration::from_millis(20)));
        assert_eq!(s.phase(), Phase::Polling);

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(100) {
            assert!(!s.tick(Instant::now() + Duration::from_secs(1)));
            s.pump(&sel);
            thread::sleep(Duration::from_millis(15));
        }
        wait_idle(&mut s, &sel);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(s.coalesced_ticks() > 0);
        assert_eq!(s.view().tabs.len(), 3);
    }

    #[test]
    fn manual_refresh_while_busy_runs_once_afterwards() {
        let (mut s, calls) = slow(100);
        let sel = Selection::default();
        s.request_refresh();
        s.request_refresh();
        s.request_refresh();
        assert!(s.has_pending_refresh());
        wait_idle(&mut s, &sel);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!s.has_pending_refresh());
    }

    #[test]
    fn shutdown_cancels_in_flight_poll() {
        let (mut s, calls) = slow(5_000);
        s.request_refresh();
        let started = Instant::now();
        s.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.view().tabs.is_empty(), "late result must be discarded");
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn failure_keeps_data_and_recovery_clears_banner() {
        let first = fixtures::collection();
        let mut second = fixtures::collection();
        second.pools.retain(|p| p.name == "tank");
        second.pools[0].alloc_bytes = 1;
        second.collected_at += chrono::Duration::seconds(10);

        let script = ScriptedCollector(Mutex::new(VecDeque::from([
            Err(CollectError::CommandFailed { command: "zpool list".into(), code: Some(1), stderr: "boom".into() }),
            Ok(second),
        ])));
        let mut s = Scheduler::new(Arc::new(script), Filters::default(), Duration::from_secs(60), 10);
        let sel = Selection::default();
        s.seed(Ok(first), &sel);
        assert_eq!(s.view().tabs.len(), 3);
        assert!(s.view().status.banner.is_none());

        s.request_refresh();
        wait_idle(&mut s, &sel);
        let banner = s.view().status.banner.clone().expect("banner after failure");
        assert!(banner.text.contains("boom"));
        assert!(!banner.critical);
        assert_eq!(s.view().tabs.len(), 3, "previous snapshot stays displayed");

        s.request_refresh();
        wait_idle(&mut s, &sel);
        assert!(s.view().status.banner.is_none());
        assert_eq!(s.view().tabs.len(), 1);
        assert_eq!(s.view().tabs[0].capacity.alloc_bytes, 1);
        assert_eq!(s.view().status.cycle, 3);
    }

    #[test]
    fn worker_dying_without_result_counts_as_failure() {
        let mut s = Scheduler::new(Arc::new(PanickingCollector), Filters::default(), Duration::from_secs(60), 10);
        let sel = Selection::default();
        s.seed(Ok(fixtures::collection()), &sel);

        s.request_refresh();
        wait_idle(&mut s, &sel);
        let banner = s.view().status.banner.clone().expect("banner after lost worker");
        assert!(banner.text.contains("exited without a result"), "{}", banner.text);
        assert_eq!(s.view().status.cycle, 2);
        assert_eq!(s.view().tabs.len(), 3, "previous snapshot stays displayed");
    }

    #[test]
    fn incomplete_pool_keeps_previous_version() {
        let first = fixtures::collection();
        let mut second = fixtures::collection();
        second.pools.retain(|p| p.name != "backup");
        second.incomplete = vec!["backup".into()];
        second.pools[0].alloc_bytes = 7;

        let mut s = Scheduler::new(
            Arc::new(ScriptedCollector(Mutex::new(VecDeque::new()))),
            Filters::default(), Duration::from_secs(60), 10,
        );
        let sel = Selection::default();
        s.seed(Ok(first.clone()), &sel);
        s.seed(Ok(second), &sel);

        let snap = s.snapshot();
        let backup = snap.pools.iter().find(|p| p.name == "backup").unwrap();
        assert_eq!(backup, first.pools.iter().find(|p| p.name == "backup").unwrap());
        assert_eq!(snap.pools[0].alloc_bytes, 7);
    }

    #[test]
    fn pool_filter_applies_to_the_view() {
        let filters = Filters { pool: Some("tank".into()), dataset: None };
        let mut s = Scheduler::new(
            Arc::new(ScriptedCollector(Mutex::new(VecDeque::new()))),
            filters, Duration::from_secs(60), 10,
        );
        s.seed(Ok(fixtures::collection()), &Selection::default());
        assert_eq!(s.view().tabs.len(), 1);
    }
}
