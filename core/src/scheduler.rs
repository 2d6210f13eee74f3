//! Task queue and bounded worker pool.
//!
//! The pool moves through a linear lifecycle: the queue is fully populated
//! before any worker starts, workers drain it cooperatively, and the final
//! state says whether the scan ran to completion or was interrupted.
//! Cancellation is carried by an explicit [`StopSignal`] handed in by the
//! caller; there is no process-global flag.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{debug, trace};
use wraith_common::config::{ScanConfig, ScanKind};
use wraith_common::network::ports::PortSet;
use wraith_common::network::target::TargetSet;

use crate::enrich;
use crate::probe::{self, Probe, ProbeStrategy};
use crate::store::{PortState, ResultStore};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One unit of work: a host, and for port scans the port to probe.
/// Discovery scans carry `port: None` and probe the host itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScanTask {
    pub addr: IpAddr,
    pub port: Option<u16>,
}

/// Cloneable cancellation handle. Triggering is sticky and idempotent.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Populating,
    Running,
    Draining,
    Done,
    Cancelled,
}

pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Bounded pool of async workers pulling from a shared queue.
pub struct WorkerPool {
    cfg: ScanConfig,
    strategy: Arc<dyn ProbeStrategy>,
    store: Arc<ResultStore>,
    stop: StopSignal,
    on_progress: Option<Arc<ProgressFn>>,
    state: PoolState,
}

impl WorkerPool {
    pub fn new(
        cfg: ScanConfig,
        strategy: Arc<dyn ProbeStrategy>,
        store: Arc<ResultStore>,
        stop: StopSignal,
        on_progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            cfg,
            strategy,
            store,
            stop,
            on_progress: on_progress.map(Arc::new),
            state: PoolState::Idle,
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Spawns the workers, populates the queue while they consume it,
    /// and waits for the drain. Returns the terminal state.
    ///
    /// Workers start first so that a nonzero enqueue delay paces the
    /// probes themselves instead of adding idle time up front. The task
    /// count is known from the resolved sets, so progress reporting does
    /// not need to wait for population to finish.
    pub async fn run(&mut self, targets: &TargetSet, ports: &PortSet) -> PoolState {
        let queue: Arc<Mutex<VecDeque<ScanTask>>> = Arc::new(Mutex::new(VecDeque::new()));
        let sealed = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicUsize::new(0));

        let total = if self.cfg.kind.is_host_discovery() {
            targets.len()
        } else {
            targets.len() * ports.len()
        };
        debug!(tasks = total, workers = self.cfg.workers, "starting pool");

        self.state = PoolState::Populating;
        let mut handles = Vec::with_capacity(self.cfg.workers);
        for id in 0..self.cfg.workers {
            handles.push(tokio::spawn(worker(
                id,
                WorkerContext {
                    cfg: self.cfg.clone(),
                    strategy: Arc::clone(&self.strategy),
                    store: Arc::clone(&self.store),
                    stop: self.stop.clone(),
                    queue: Arc::clone(&queue),
                    sealed: Arc::clone(&sealed),
                    completed: Arc::clone(&completed),
                    total,
                    on_progress: self.on_progress.clone(),
                },
            )));
        }

        self.populate(&queue, targets, ports).await;
        sealed.store(true, Ordering::SeqCst);
        self.state = PoolState::Running;
        debug!("queue sealed, draining backlog");

        self.state = PoolState::Draining;
        for handle in handles {
            // Worker bodies never panic; a join error would mean the
            // runtime tore the task down underneath us.
            let _ = handle.await;
        }

        self.state = if self.stop.is_triggered() {
            PoolState::Cancelled
        } else {
            PoolState::Done
        };
        self.state
    }

    async fn populate(&self, queue: &Mutex<VecDeque<ScanTask>>, targets: &TargetSet, ports: &PortSet) {
        if self.cfg.kind.is_host_discovery() {
            let mut q = queue.lock().unwrap();
            for addr in targets {
                q.push_back(ScanTask { addr, port: None });
            }
            return;
        }

        for addr in targets {
            // A record per host up front, so unresponsive hosts still
            // appear in the report.
            self.store.touch(addr);

            let mut host_ports = ports.as_slice().to_vec();
            if self.cfg.stealth {
                host_ports.shuffle(&mut rand::rng());
            }
            for port in host_ports {
                if self.stop.is_triggered() {
                    return;
                }
                queue
                    .lock()
                    .unwrap()
                    .push_back(ScanTask { addr, port: Some(port) });
                if !self.cfg.enqueue_delay.is_zero() {
                    tokio::time::sleep(self.cfg.enqueue_delay).await;
                }
            }
        }
    }
}

struct WorkerContext {
    cfg: ScanConfig,
    strategy: Arc<dyn ProbeStrategy>,
    store: Arc<ResultStore>,
    stop: StopSignal,
    queue: Arc<Mutex<VecDeque<ScanTask>>>,
    sealed: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
    total: usize,
    on_progress: Option<Arc<ProgressFn>>,
}

async fn worker(id: usize, ctx: WorkerContext) {
    loop {
        if ctx.stop.is_triggered() {
            trace!(worker = id, "stopping on signal");
            return;
        }
        let task = ctx.queue.lock().unwrap().pop_front();
        let Some(task) = task else {
            if ctx.sealed.load(Ordering::SeqCst) {
                trace!(worker = id, "queue drained");
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        };

        let probe = match ctx.strategy.probe(&task, ctx.cfg.probe_timeout).await {
            Ok(probe) => probe,
            Err(e) => {
                debug!(addr = %task.addr, port = ?task.port, error = %e, "probe failed");
                Probe::closed()
            }
        };
        apply(&ctx, task, probe).await;

        let done = ctx.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(report) = &ctx.on_progress {
            report(done, ctx.total);
        }
    }
}

async fn apply(ctx: &WorkerContext, task: ScanTask, probe: Probe) {
    match task.port {
        Some(port) => {
            if !probe.state.is_positive() {
                return;
            }
            let service = enrich::well_known_name(port).map(str::to_string);
            // Full-handshake scans already burned their stealth, so a
            // second connection for the banner costs nothing extra.
            let banner = if ctx.cfg.kind == ScanKind::Tcp && probe.state == PortState::Open {
                probe::banner::grab(task.addr, port, ctx.cfg.probe_timeout).await
            } else {
                None
            };
            ctx.store
                .record_port(task.addr, port, probe.state, service, banner);
        }
        None => {
            if probe.state == PortState::Open {
                ctx.store.mark_up(task.addr, probe.mac.clone());
            } else {
                ctx.store.touch(task.addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    struct CountingStrategy {
        seen: Mutex<HashMap<(IpAddr, Option<u16>), usize>>,
    }

    #[async_trait]
    impl ProbeStrategy for CountingStrategy {
        async fn probe(&self, task: &ScanTask, _wait: Duration) -> anyhow::Result<Probe> {
            *self
                .seen
                .lock()
                .unwrap()
                .entry((task.addr, task.port))
                .or_insert(0) += 1;
            Ok(Probe::state(PortState::Open))
        }
    }

    struct SlowStrategy;

    #[async_trait]
    impl ProbeStrategy for SlowStrategy {
        async fn probe(&self, _task: &ScanTask, _wait: Duration) -> anyhow::Result<Probe> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Probe::state(PortState::Closed))
        }
    }

    fn config(workers: usize) -> ScanConfig {
        ScanConfig {
            workers,
            ..ScanConfig::default()
        }
    }

    fn targets(spec: &str) -> TargetSet {
        TargetSet::resolve(spec).unwrap()
    }

    fn ports(spec: &str) -> PortSet {
        PortSet::resolve(spec).unwrap()
    }

    #[tokio::test]
    async fn every_task_runs_exactly_once() {
        let strategy = Arc::new(CountingStrategy {
            seen: Mutex::new(HashMap::new()),
        });
        let store = Arc::new(ResultStore::new());
        let mut pool = WorkerPool::new(
            config(4),
            strategy.clone(),
            store,
            StopSignal::new(),
            None,
        );

        let state = pool
            .run(&targets("127.0.0.1,127.0.0.2"), &ports("1-25"))
            .await;
        assert_eq!(state, PoolState::Done);

        let seen = strategy.seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        assert!(seen.values().all(|&count| count == 1));
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let strategy = Arc::new(CountingStrategy {
            seen: Mutex::new(HashMap::new()),
        });
        let store = Arc::new(ResultStore::new());
        let last = Arc::new(Mutex::new((0usize, 0usize)));
        let last_cb = Arc::clone(&last);
        let mut pool = WorkerPool::new(
            config(3),
            strategy,
            store,
            StopSignal::new(),
            Some(Box::new(move |done, total| {
                let mut slot = last_cb.lock().unwrap();
                if done > slot.0 {
                    *slot = (done, total);
                }
            })),
        );

        pool.run(&targets("127.0.0.1"), &ports("1-30")).await;
        assert_eq!(*last.lock().unwrap(), (30, 30));
    }

    #[tokio::test]
    async fn stop_signal_interrupts_the_pool() {
        let store = Arc::new(ResultStore::new());
        let stop = StopSignal::new();
        let mut pool = WorkerPool::new(
            config(2),
            Arc::new(SlowStrategy),
            store,
            stop.clone(),
            None,
        );

        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.trigger();
        });

        let started = std::time::Instant::now();
        let state = pool.run(&targets("127.0.0.1"), &ports("1-200")).await;
        assert_eq!(state, PoolState::Cancelled);
        // Two workers at 100ms per probe would take ~10s without the stop.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn enqueue_delay_paces_probes_instead_of_stalling_them() {
        use std::time::Instant;

        struct TimestampingStrategy {
            started: Instant,
            seen: Mutex<Vec<Duration>>,
        }

        #[async_trait]
        impl ProbeStrategy for TimestampingStrategy {
            async fn probe(&self, _task: &ScanTask, _wait: Duration) -> anyhow::Result<Probe> {
                self.seen.lock().unwrap().push(self.started.elapsed());
                Ok(Probe::closed())
            }
        }

        let strategy = Arc::new(TimestampingStrategy {
            started: Instant::now(),
            seen: Mutex::new(Vec::new()),
        });
        let cfg = ScanConfig {
            workers: 4,
            enqueue_delay: Duration::from_millis(50),
            ..ScanConfig::default()
        };
        let store = Arc::new(ResultStore::new());
        let mut pool = WorkerPool::new(cfg, strategy.clone(), store, StopSignal::new(), None);

        // 20 tasks at 50ms apart spread population over roughly a second.
        let state = pool.run(&targets("127.0.0.1"), &ports("1-20")).await;
        assert_eq!(state, PoolState::Done);

        let seen = strategy.seen.lock().unwrap();
        assert_eq!(seen.len(), 20);
        let first = *seen.iter().min().unwrap();
        let last = *seen.iter().max().unwrap();
        assert!(
            first < Duration::from_millis(300),
            "first probe should not wait for population to finish, waited {first:?}"
        );
        assert!(
            last >= Duration::from_millis(700),
            "probes should be spread across the delay window, last at {last:?}"
        );
    }

    #[tokio::test]
    async fn discovery_scans_enqueue_one_task_per_host() {
        let strategy = Arc::new(CountingStrategy {
            seen: Mutex::new(HashMap::new()),
        });
        let store = Arc::new(ResultStore::new());
        let cfg = ScanConfig {
            kind: ScanKind::Ping,
            workers: 2,
            ..ScanConfig::default()
        };
        let mut pool = WorkerPool::new(cfg, strategy.clone(), store.clone(), StopSignal::new(), None);

        pool.run(&targets("127.0.0.1,127.0.0.2,127.0.0.3"), &ports("80"))
            .await;

        let seen = strategy.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.keys().all(|(_, port)| port.is_none()));
        assert_eq!(store.up_hosts().len(), 3);
    }

    #[test]
    fn stop_signal_is_sticky() {
        let stop = StopSignal::new();
        assert!(!stop.is_triggered());
        stop.trigger();
        stop.trigger();
        assert!(stop.is_triggered());
        assert!(stop.clone().is_triggered());
    }

    #[tokio::test]
    async fn unresponsive_hosts_still_get_a_record() {
        struct AlwaysClosed;

        #[async_trait]
        impl ProbeStrategy for AlwaysClosed {
            async fn probe(&self, _task: &ScanTask, _wait: Duration) -> anyhow::Result<Probe> {
                Ok(Probe::closed())
            }
        }

        let store = Arc::new(ResultStore::new());
        let mut pool = WorkerPool::new(
            config(2),
            Arc::new(AlwaysClosed),
            store.clone(),
            StopSignal::new(),
            None,
        );
        pool.run(&targets("127.0.0.1"), &ports("80,443")).await;

        let record = store.get(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap();
        assert_eq!(record.status, crate::store::HostStatus::Unknown);
        assert!(record.ports.is_empty());
    }
}
