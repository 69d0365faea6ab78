/*!
 * Tracing
 * Subscriber setup for the kernel's structured `tracing` events
 *
 * The kernel only emits events; installing a subscriber is the host's call.
 */

use crate::scheduler::SchedulerReport;
use tracing::{info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_TRACE_JSON: Enable JSON output (default: false)
///
/// A second call is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("KERNEL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Emit one summary event for a completed cycle
pub fn emit_report(report: &SchedulerReport) {
    info!(
        cycle = report.cycle,
        mode = %report.mode,
        executed = report.executed_count(),
        skipped = report.skipped_count(),
        sleeping = report.sleeping,
        woken = report.woken,
        swept = report.swept,
        compute = report.compute_total(),
        soft_ceiling = report.ceilings.soft,
        hard_ceiling = report.ceilings.hard,
        "Cycle report"
    );
    for fault in &report.faults {
        warn!(
            cycle = report.cycle,
            pid = fault.pid,
            type_name = %fault.type_name,
            kind = ?fault.kind,
            error = %fault.message,
            "Process fault this cycle"
        );
    }
}
