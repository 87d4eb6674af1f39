//! Plain result lines, one measurement per line.

use crate::config::BenchTest;
use crate::harness::{AccessResult, BenchResult, CopyResult};
use crate::stats::Stats;

fn phase_line(label: &str, s: &Stats) -> String {
    format!(
        "{}: max - {:.6}s, min - {:.6}s, average - {:.6}s",
        label, s.max, s.min, s.mean
    )
}

pub fn copy_lines(r: &CopyResult) -> Vec<String> {
    vec![
        format!("Test No: {}", r.test.number()),
        phase_line("T1", &r.invalidate),
        phase_line("T2", &r.copy),
        phase_line("T3", &r.flush),
    ]
}

pub fn access_line(r: &AccessResult) -> String {
    match r.test {
        BenchTest::SingleWrite => format!("mem_write: Wrote {} bytes in {:.6}s", r.size, r.secs),
        _ => format!("mem_read: Read {} bytes in {:.6}s", r.size, r.secs),
    }
}

pub fn print_summary(result: &BenchResult) {
    match result {
        BenchResult::Copy(r) => {
            for line in copy_lines(r) {
                println!("{}", line);
            }
        }
        BenchResult::Access(r) => println!("{}", access_line(r)),
    }
}
