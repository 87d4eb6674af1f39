//! Table output using comfy-table.
//!
//! Columns: Phase | Max (us) | Min (us) | Mean (us) | Median (us) | CV% | GB/s

use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::config::format_size;
use crate::harness::CopyResult;
use crate::stats::Stats;

fn us(secs: f64) -> String {
    format!("{:.2}", secs * 1e6)
}

fn phase_row(name: &str, s: &Stats, gbs: Option<f64>) -> Vec<Cell> {
    let cv = format!("{:.1}", s.cv_percent);
    let cv_cell = if s.cv_percent >= 25.0 {
        Cell::new(&cv).fg(Color::Red)
    } else if s.cv_percent >= 10.0 {
        Cell::new(&cv).fg(Color::Yellow)
    } else {
        Cell::new(&cv).fg(Color::Green)
    };
    vec![
        Cell::new(name),
        Cell::new(us(s.max)).set_alignment(CellAlignment::Right),
        Cell::new(us(s.min)).set_alignment(CellAlignment::Right),
        Cell::new(us(s.mean)).set_alignment(CellAlignment::Right),
        Cell::new(us(s.median)).set_alignment(CellAlignment::Right),
        cv_cell.set_alignment(CellAlignment::Right),
        Cell::new(
            gbs.map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
        )
        .set_alignment(CellAlignment::Right),
    ]
}

pub fn build_table(r: &CopyResult) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Max (us)").add_attribute(Attribute::Bold),
            Cell::new("Min (us)").add_attribute(Attribute::Bold),
            Cell::new("Mean (us)").add_attribute(Attribute::Bold),
            Cell::new("Median (us)").add_attribute(Attribute::Bold),
            Cell::new("CV%").add_attribute(Attribute::Bold),
            Cell::new("GB/s").add_attribute(Attribute::Bold),
        ]);
    table.add_row(phase_row("T1 invalidate", &r.invalidate, None));
    table.add_row(phase_row("T2 copy", &r.copy, Some(r.copy_gb_per_sec)));
    table.add_row(phase_row("T3 flush", &r.flush, None));
    table
}

pub fn render_table(r: &CopyResult) {
    println!(
        "\n=== {} copy @ {} x {} ===",
        r.strategy,
        format_size(r.size),
        r.iterations
    );
    println!("{}", build_table(r));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchTest;
    use crate::stats::compute_stats;

    #[test]
    fn test_table_has_three_phases() {
        let r = CopyResult {
            test: BenchTest::LibraryCopy,
            strategy: "library".to_string(),
            size: 1 << 20,
            iterations: 3,
            invalidate: compute_stats(&[1e-6, 2e-6, 3e-6]),
            copy: compute_stats(&[1e-4, 1e-4, 1e-4]),
            flush: compute_stats(&[5e-6, 5e-6, 5e-6]),
            copy_gb_per_sec: 9.77,
            verified: true,
        };
        let table = build_table(&r);
        assert_eq!(table.row_iter().count(), 3);
        let text = table.to_string();
        assert!(text.contains("T2 copy"));
        assert!(text.contains("9.77"));
        assert!(text.contains("100.00"));
    }
}
