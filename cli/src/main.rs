mod commands;
mod terminal;

use commands::CommandLine;
use indicatif::{ProgressBar, ProgressStyle};
use terminal::{logging, print};
use tracing::{info, warn};
use wraith_core::scan::{self, ScanOutcome};
use wraith_core::scheduler::{PoolState, StopSignal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init();

    let cfg = commands.scan_config();
    if cfg.kind.needs_raw_sockets() && !is_root::is_root() {
        warn!(
            "{} scans need raw sockets; expect failures without elevated privileges",
            cfg.kind
        );
    }

    let stop = StopSignal::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, winding down");
            interrupt.trigger();
        }
    });

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} probes")?
            .progress_chars("=> "),
    );
    let bar = progress.clone();
    let on_progress = Box::new(move |done: usize, total: usize| {
        if bar.length() != Some(total as u64) {
            bar.set_length(total as u64);
        }
        bar.set_position(done as u64);
    });

    let ScanOutcome { report, state } = scan::run_scan(
        &cfg,
        &commands.target,
        &commands.ports,
        stop,
        Some(on_progress),
    )
    .await?;
    progress.finish_and_clear();

    if state == PoolState::Cancelled {
        warn!("scan cancelled; results below are partial");
    }
    print::render(&report);

    if let Some(path) = &commands.output {
        report.write_json(path)?;
        info!("report saved to {}", path.display());
    }

    Ok(())
}
