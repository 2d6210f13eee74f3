//! The scan engine's single entry point.
//!
//! `run_scan` wires resolution, the worker pool, enrichment and report
//! assembly together. All state lives for one invocation and travels by
//! argument; cancellation comes in through the caller's [`StopSignal`].

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};
use wraith_common::config::ScanConfig;
use wraith_common::network::ports::PortSet;
use wraith_common::network::target::TargetSet;

use crate::enrich::EnrichmentPipeline;
use crate::probe;
use crate::report::{ReportBuilder, ScanReport};
use crate::scheduler::{PoolState, ProgressFn, StopSignal, WorkerPool};
use crate::store::ResultStore;

pub struct ScanOutcome {
    pub report: ScanReport,
    /// `Done` for a full run, `Cancelled` when the stop signal fired.
    pub state: PoolState,
}

pub async fn run_scan(
    cfg: &ScanConfig,
    target_spec: &str,
    port_spec: &str,
    stop: StopSignal,
    on_progress: Option<ProgressFn>,
) -> anyhow::Result<ScanOutcome> {
    let targets = TargetSet::resolve(target_spec)?;
    let ports = PortSet::resolve(port_spec)?;
    info!(
        hosts = targets.len(),
        ports = ports.as_slice().len(),
        kind = %cfg.kind,
        "starting scan"
    );

    let builder = ReportBuilder::start(cfg.kind, target_spec, port_spec);
    let store = Arc::new(ResultStore::new());
    let strategy = probe::strategy_for(cfg.kind);
    let mut pool = WorkerPool::new(
        cfg.clone(),
        strategy,
        Arc::clone(&store),
        stop,
        on_progress,
    );

    let state = pool.run(&targets, &ports).await;
    drop(pool);

    if state == PoolState::Done {
        let pipeline = EnrichmentPipeline::from_config(cfg);
        if !pipeline.is_empty() {
            debug!("running enrichment");
            pipeline.run(&store, cfg.probe_timeout).await;
        }
    } else {
        info!("scan interrupted, skipping enrichment");
    }

    let store = Arc::try_unwrap(store).map_err(|_| anyhow!("result store still shared"))?;
    let report = builder.finish(store, &targets);
    Ok(ScanOutcome { report, state })
}
