//! Operator-facing result lines.

use std::io::{self, Write};

use mem_primitives::PatternKind;

use crate::driver::RunSummary;
use crate::worker::WorkerReport;

const MIB: f64 = 1024.0 * 1024.0;

/// Lines printed for one worker, each prefixed with `[target/slot]`.
pub fn worker_lines(r: &WorkerReport) -> Vec<String> {
    let tag = format!("[{}/{}]", r.target, r.slot);
    let mut lines = vec![
        format!("{} Bytes Count (MB): {:.2}", tag, r.bytes_moved as f64 / MIB),
        format!("{} Elapsed Time: {:.2}s", tag, r.elapsed.as_secs_f64()),
    ];

    if r.performance {
        lines.push(format!("{} Throughput: {:.2}GB/s", tag, r.throughput_gib()));
    } else if r.completed {
        lines.push(format!("{} Pattern Loaded", tag));
    } else {
        lines.push(format!("{} Pattern load interrupted", tag));
    }

    if r.adjacency_errors > 0 {
        lines.push(format!("{} ERROR: Adjacent bits disturbed {}", tag, r.adjacency_errors));
    }
    if r.walking_mismatches > 0 {
        let which = if r.pattern == PatternKind::WalkingOnes { 1 } else { 0 };
        lines.push(format!(
            "{} ERROR: Walking {} mismatches {}",
            tag, which, r.walking_mismatches
        ));
    }
    if r.readback_mismatches > 0 {
        lines.push(format!("{} ERROR: Readback mismatches {}", tag, r.readback_mismatches));
    }
    if let Some(sum) = r.checksum {
        lines.push(format!("{} Readback checksum: {:#018x}", tag, sum));
    }
    lines
}

/// Write every worker's lines, then the aggregate for performance runs.
pub fn write_summary(
    out: &mut dyn Write,
    summary: &RunSummary,
    performance: bool,
) -> io::Result<()> {
    for r in &summary.reports {
        for line in worker_lines(r) {
            writeln!(out, "{}", line)?;
        }
    }
    if performance {
        writeln!(out, "Total bytes: {}", summary.total_bytes())?;
    }
    if summary.interrupted {
        writeln!(
            out,
            "Stopped by signal ({} of {} workers started)",
            summary.started, summary.planned
        )?;
    }
    Ok(())
}
