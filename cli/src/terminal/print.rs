//! Colored terminal rendering of a finished scan.

use colored::*;
use wraith_core::report::ScanReport;
use wraith_core::store::{HostStatus, PortState};

pub const TOTAL_WIDTH: usize = 64;

const BANNER_PREVIEW_LINES: usize = 2;

pub fn header(msg: &str) {
    let formatted = format!("⟦ {} ⟧", msg.to_uppercase());
    let dash_count = TOTAL_WIDTH.saturating_sub(formatted.chars().count());
    let left = dash_count / 2;
    let right = dash_count - left;
    println!(
        "{}{}{}",
        "─".repeat(left).bright_black(),
        formatted.bright_green(),
        "─".repeat(right).bright_black()
    );
}

pub fn fat_separator() {
    println!("{}", "═".repeat(TOTAL_WIDTH).bright_black());
}

/// Prints the report the way the plain summary lays it out, with a
/// splash of color per finding.
pub fn render(report: &ScanReport) {
    fat_separator();
    header("scan summary");
    println!(
        "Scanned {} hosts, {} hosts up, {} open ports found",
        report.hosts.len().to_string().bold(),
        report.hosts_up().to_string().green().bold(),
        report.open_port_count().to_string().green().bold()
    );
    println!(
        "Scan duration: {:.2} seconds",
        report.scan_info.duration
    );

    for (addr, record) in report
        .hosts
        .iter()
        .filter(|(_, record)| record.status == HostStatus::Up)
    {
        println!();
        match &record.hostname {
            Some(name) => println!(
                "{} {} ({})",
                "Host:".bright_green().bold(),
                addr.to_string().bold(),
                name.cyan()
            ),
            None => println!(
                "{} {}",
                "Host:".bright_green().bold(),
                addr.to_string().bold()
            ),
        }
        if let Some(mac) = &record.mac {
            println!(" {} MAC {}", "├─".bright_black(), mac.cyan());
        }
        if let Some(os) = &record.os {
            println!(
                " {} OS  {} ({}%)",
                "├─".bright_black(),
                os.name.cyan(),
                os.accuracy
            );
        }

        let open: Vec<_> = record
            .ports
            .iter()
            .filter(|(_, p)| p.state.is_positive())
            .collect();
        for (i, (port, port_record)) in open.iter().enumerate() {
            let branch = if i + 1 == open.len() { "└─" } else { "├─" };
            let state = match port_record.state {
                PortState::PossiblyOpen => "possibly open".yellow(),
                _ => "open".green(),
            };
            let service = port_record.service.as_deref().unwrap_or("unknown");
            let mut line = format!(
                " {} {}  {}  {}",
                branch.bright_black(),
                format!("{port:>5}").bold(),
                state,
                service.cyan()
            );
            if let Some(product) = &port_record.product {
                line.push_str(&format!(" ({product}"));
                if let Some(version) = &port_record.version {
                    line.push_str(&format!(" {version}"));
                }
                line.push(')');
            }
            println!("{line}");
            if let Some(banner) = &port_record.banner {
                for preview in banner.lines().take(BANNER_PREVIEW_LINES) {
                    println!("      {}", preview.dimmed());
                }
                if banner.lines().count() > BANNER_PREVIEW_LINES {
                    println!("      {}", "...".dimmed());
                }
            }
        }
    }
    println!();
    fat_separator();
}
