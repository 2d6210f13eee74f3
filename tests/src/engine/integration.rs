#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use wraith_common::config::{ScanConfig, ScanKind};
use wraith_core::scan::{self, ScanOutcome};
use wraith_core::scheduler::{PoolState, StopSignal};
use wraith_core::store::{HostStatus, PortState};

fn tcp_config() -> ScanConfig {
    ScanConfig {
        kind: ScanKind::Tcp,
        workers: 4,
        probe_timeout: Duration::from_millis(500),
        ..ScanConfig::default()
    }
}

/// A full connect scan against a listener on loopback must find exactly
/// that one port open and nothing else in the probed window.
#[tokio::test]
async fn connect_scan_finds_the_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let port_spec = format!("{}-{}", port.saturating_sub(2), port.saturating_add(2));

    let ScanOutcome { report, state } =
        scan::run_scan(&tcp_config(), "127.0.0.1", &port_spec, StopSignal::new(), None)
            .await
            .unwrap();

    assert_eq!(state, PoolState::Done);
    assert_eq!(report.hosts.len(), 1);
    assert_eq!(report.hosts_up(), 1);

    let record = report.hosts.get(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap();
    assert_eq!(record.status, HostStatus::Up);

    let open: Vec<u16> = record
        .ports
        .iter()
        .filter(|(_, p)| p.state == PortState::Open)
        .map(|(p, _)| *p)
        .collect();
    assert_eq!(open, vec![port]);

    drop(listener);
}

/// An already-triggered stop signal must cancel the scan before any
/// probing happens; the report still carries the invocation metadata.
#[tokio::test]
async fn pre_triggered_stop_cancels_immediately() {
    let stop = StopSignal::new();
    stop.trigger();

    let ScanOutcome { report, state } =
        scan::run_scan(&tcp_config(), "127.0.0.1", "1-2000", stop, None)
            .await
            .unwrap();

    assert_eq!(state, PoolState::Cancelled);
    assert_eq!(report.scan_info.targets, "127.0.0.1");
    assert_eq!(report.scan_info.ports, "1-2000");
    assert_eq!(report.hosts_up(), 0);
}

#[tokio::test]
async fn progress_callback_sees_the_full_task_count() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let port_spec = format!("{}-{}", port.saturating_sub(4), port.saturating_add(5));

    let last = Arc::new(Mutex::new((0usize, 0usize)));
    let last_cb = Arc::clone(&last);
    let on_progress = Box::new(move |done: usize, total: usize| {
        let mut slot = last_cb.lock().unwrap();
        if done > slot.0 {
            *slot = (done, total);
        }
    });

    let ScanOutcome { state, .. } = scan::run_scan(
        &tcp_config(),
        "127.0.0.1",
        &port_spec,
        StopSignal::new(),
        Some(on_progress),
    )
    .await
    .unwrap();

    assert_eq!(state, PoolState::Done);
    assert_eq!(*last.lock().unwrap(), (10, 10));
}

/// Unresolvable input surfaces as an error before anything runs.
#[tokio::test]
async fn invalid_specs_fail_fast() {
    let bad_target =
        scan::run_scan(&tcp_config(), "300.1.2.3/24", "80", StopSignal::new(), None).await;
    assert!(bad_target.is_err());

    let bad_ports =
        scan::run_scan(&tcp_config(), "127.0.0.1", "90-10", StopSignal::new(), None).await;
    assert!(bad_ports.is_err());
}

/// Multiple loopback targets keep their resolution order in the report,
/// and hosts that answered nothing stay at status unknown.
#[tokio::test]
async fn report_keeps_target_order_for_mixed_results() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let ScanOutcome { report, .. } = scan::run_scan(
        &tcp_config(),
        "127.0.0.2,127.0.0.1",
        &port.to_string(),
        StopSignal::new(),
        None,
    )
    .await
    .unwrap();

    let addrs: Vec<IpAddr> = report.hosts.addrs().collect();
    assert_eq!(
        addrs,
        vec![
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
        ]
    );
    let up = report.hosts.get(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap();
    assert_eq!(up.status, HostStatus::Up);
}
