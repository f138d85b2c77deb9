//! Poll timers.
//!
//! Each source gets its own interval task that fires once immediately and
//! then on its cadence. A tick never awaits the fetch: it spawns a detached
//! fetch task that reports back over the outcome channel. Stopping the
//! scheduler aborts the timers only, so fetches already in flight still
//! finish (or time out) and report.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::error::FetchError;
use crate::feed::{Fetch, Sample, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOrigin {
    Timer,
    Staggered,
    SpotCheck,
    FollowUp,
}

#[derive(Debug)]
pub struct PollOutcome {
    pub source: SourceId,
    pub origin: PollOrigin,
    pub result: Result<Sample, FetchError>,
}

/// Extra work the engine asks for after applying an outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    Fetch(SourceId),
    Stagger(Vec<SourceId>),
}

#[derive(Debug, Clone)]
pub struct Cadence {
    pub source: SourceId,
    pub every: Duration,
}

#[derive(Debug, Clone)]
pub struct PollPlan {
    pub cadences: Vec<Cadence>,
    pub spot_check_every: Duration,
    pub stagger_step: Duration,
}

impl PollPlan {
    pub fn from_config(cfg: &Config) -> Self {
        let secs = Duration::from_secs;
        let cadences = vec![
            Cadence { source: SourceId::Markets, every: secs(cfg.market_every_secs) },
            Cadence { source: SourceId::Global, every: secs(cfg.market_every_secs) },
            Cadence { source: SourceId::Hashrate, every: secs(cfg.hashrate_every_secs) },
            Cadence { source: SourceId::BlockDag, every: secs(cfg.blockdag_every_secs) },
            Cadence { source: SourceId::Blocks, every: secs(cfg.blocks_every_secs) },
            Cadence { source: SourceId::Tokens, every: secs(cfg.tokens_every_secs) },
            Cadence { source: SourceId::News, every: secs(cfg.news_every_secs) },
            Cadence { source: SourceId::Supply, every: secs(cfg.supply_every_secs) },
            Cadence { source: SourceId::Nodes, every: secs(cfg.nodes_every_secs) },
        ];
        Self {
            cadences,
            spot_check_every: secs(cfg.spot_check_every_secs),
            stagger_step: cfg.stagger_step(),
        }
    }
}

pub struct PollScheduler {
    fetcher: Arc<dyn Fetch>,
    tx: mpsc::Sender<PollOutcome>,
    stagger_step: Duration,
    timers: Vec<JoinHandle<()>>,
}

fn spawn_fetch(fetcher: Arc<dyn Fetch>, tx: mpsc::Sender<PollOutcome>, source: SourceId, origin: PollOrigin) {
    tokio::spawn(async move {
        let result = fetcher.fetch(&source).await;
        // A closed channel means the terminal is gone; nothing to report to.
        let _ = tx.send(PollOutcome { source, origin, result }).await;
    });
}

impl PollScheduler {
    pub fn new(fetcher: Arc<dyn Fetch>, tx: mpsc::Sender<PollOutcome>, stagger_step: Duration) -> Self {
        Self { fetcher, tx, stagger_step, timers: Vec::new() }
    }

    pub fn start(&mut self, plan: &PollPlan) {
        for cadence in &plan.cadences {
            self.arm(cadence.source.clone(), cadence.every);
        }
    }

    /// Poll `source` now and then every `every`.
    pub fn arm(&mut self, source: SourceId, every: Duration) {
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        self.timers.push(tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                spawn_fetch(fetcher.clone(), tx.clone(), source.clone(), PollOrigin::Timer);
            }
        }));
    }

    /// One-shot fetches, the i-th delayed by `i * step`.
    pub fn stagger(&mut self, sources: Vec<SourceId>, step: Duration) {
        for (i, source) in sources.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let tx = self.tx.clone();
            let delay = step.saturating_mul(i as u32);
            self.timers.push(tokio::spawn(async move {
                sleep(delay).await;
                spawn_fetch(fetcher, tx, source, PollOrigin::Staggered);
            }));
        }
    }

    /// Every `every`, refresh one uniformly chosen address. This keeps the
    /// ledger visibly live; coverage comes from the staggered bulk poll.
    pub fn spot_check(&mut self, addresses: Vec<String>, every: Duration) {
        if addresses.is_empty() {
            return;
        }
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        self.timers.push(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let pick = rand::thread_rng().gen_range(0..addresses.len());
                let source = SourceId::Balance(addresses[pick].clone());
                spawn_fetch(fetcher.clone(), tx.clone(), source, PollOrigin::SpotCheck);
            }
        }));
    }

    pub fn fetch_now(&self, source: SourceId) {
        spawn_fetch(self.fetcher.clone(), self.tx.clone(), source, PollOrigin::FollowUp);
    }

    pub fn follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Fetch(source) => self.fetch_now(source),
            FollowUp::Stagger(sources) => {
                let step = self.stagger_step;
                self.stagger(sources, step);
            }
        }
    }

    /// Cancel every future fire. In-flight fetches are left to finish.
    pub fn stop_all(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    pub fn active_timers(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Payload;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records when each source was fetched; optionally takes a while.
    #[derive(Default)]
    struct FakeFetch {
        calls: Mutex<Vec<(SourceId, Instant)>>,
        latency: Duration,
    }

    #[async_trait]
    impl Fetch for FakeFetch {
        async fn fetch(&self, source: &SourceId) -> Result<Sample, FetchError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((source.clone(), Instant::now()));
            }
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            Ok(Sample {
                source: source.clone(),
                payload: Payload::Nodes(1),
                fetched_at_ms: 0,
                is_fresh: true,
            })
        }
    }

    fn setup(latency: Duration) -> (Arc<FakeFetch>, PollScheduler, mpsc::Receiver<PollOutcome>) {
        let fake = Arc::new(FakeFetch { latency, ..Default::default() });
        let (tx, rx) = mpsc::channel(256);
        let scheduler = PollScheduler::new(fake.clone(), tx, Duration::from_millis(300));
        (fake, scheduler, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<PollOutcome>) -> Vec<PollOutcome> {
        let mut out = Vec::new();
        while let Ok(o) = rx.try_recv() {
            out.push(o);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_is_immediate() {
        let (_fake, mut sched, mut rx) = setup(Duration::ZERO);
        sched.arm(SourceId::Hashrate, Duration::from_secs(10));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.source, SourceId::Hashrate);
        assert_eq!(first.origin, PollOrigin::Timer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadences_are_independent() {
        let (_fake, mut sched, mut rx) = setup(Duration::ZERO);
        sched.arm(SourceId::Blocks, Duration::from_secs(5));
        sched.arm(SourceId::Hashrate, Duration::from_secs(10));
        sleep(Duration::from_secs(21)).await;
        let mut counts: HashMap<SourceId, usize> = HashMap::new();
        for o in drain(&mut rx) {
            *counts.entry(o.source).or_default() += 1;
        }
        assert_eq!(counts.get(&SourceId::Blocks), Some(&5));
        assert_eq!(counts.get(&SourceId::Hashrate), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stagger_offsets() {
        let (fake, mut sched, mut rx) = setup(Duration::ZERO);
        let start = Instant::now();
        let sources: Vec<SourceId> = (0..4).map(|i| SourceId::Balance(format!("kaspa:{}", i))).collect();
        sched.stagger(sources.clone(), Duration::from_millis(300));
        for _ in 0..4 {
            assert_eq!(rx.recv().await.unwrap().origin, PollOrigin::Staggered);
        }
        let calls = fake.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        for (i, (source, at)) in calls.iter().enumerate() {
            assert_eq!(source, &sources[i]);
            assert_eq!(at.duration_since(start), Duration::from_millis(300 * i as u64));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_keeps_in_flight() {
        let (fake, mut sched, mut rx) = setup(Duration::from_secs(4));
        sched.arm(SourceId::Markets, Duration::from_secs(30));
        // Let the immediate tick start its fetch, then stop the timer.
        sleep(Duration::from_millis(10)).await;
        sched.stop_all();
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.source, SourceId::Markets);
        sleep(Duration::from_secs(120)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
        assert_eq!(sched.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spot_check_picks_tracked_addresses() {
        let (_fake, mut sched, mut rx) = setup(Duration::ZERO);
        let addresses = vec!["kaspa:a".to_string(), "kaspa:b".to_string()];
        sched.spot_check(addresses.clone(), Duration::from_secs(3));
        // No immediate fire.
        sleep(Duration::from_secs(2)).await;
        assert!(drain(&mut rx).is_empty());
        sleep(Duration::from_secs(27)).await;
        let outcomes = drain(&mut rx);
        assert_eq!(outcomes.len(), 9);
        for o in outcomes {
            assert_eq!(o.origin, PollOrigin::SpotCheck);
            match o.source {
                SourceId::Balance(a) => assert!(addresses.contains(&a)),
                other => panic!("unexpected source {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_stagger_uses_configured_step() {
        let (fake, mut sched, mut rx) = setup(Duration::ZERO);
        let start = Instant::now();
        sched.follow_up(FollowUp::Stagger(vec![SourceId::Supply, SourceId::Nodes]));
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        let calls = fake.calls.lock().unwrap().clone();
        assert_eq!(calls[1].1.duration_since(start), Duration::from_millis(300));
    }
}
