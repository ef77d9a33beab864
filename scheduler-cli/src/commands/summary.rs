//! Shared cycle-summary table rendering (spec.md §4.8: "counts of created,
//! updated, deleted, skipped, degraded"), grounded on the `tabled` usage in
//! the `trainrs` sibling example's CLI reports.

use scheduler_core::engine::CycleSummary;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    metric: &'static str,
    count: u32,
}

pub fn print(summary: &CycleSummary) {
    let rows = vec![
        SummaryRow { metric: "created", count: summary.created },
        SummaryRow { metric: "updated", count: summary.updated },
        SummaryRow { metric: "deleted", count: summary.deleted },
        SummaryRow { metric: "skipped", count: summary.skipped },
        SummaryRow { metric: "degraded", count: summary.degraded },
        SummaryRow { metric: "buffered", count: summary.buffered },
    ];
    println!("{}", Table::new(rows));
    if summary.aborted {
        println!("cycle aborted: deadline exceeded");
    }
}
