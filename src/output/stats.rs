//! Statistics generation from the graph database
//!
//! This module provides functionality for extracting and displaying
//! graph statistics from the storage layer.

use crate::crawler::CrawlReport;
use crate::storage::{GraphCounts, RunRecord, Storage};
use crate::CastnetError;
use std::fmt::Write;

/// Graph statistics summary
#[derive(Debug, Clone)]
pub struct GraphStatistics {
    pub counts: GraphCounts,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl GraphStatistics {
    /// Share of edges that both endpoints reference, as a percentage
    pub fn confirmed_edge_ratio(&self) -> f64 {
        if self.counts.edges == 0 {
            return 0.0;
        }
        let confirmed = self.counts.edges.saturating_sub(self.counts.one_sided_edges);
        (confirmed as f64 / self.counts.edges as f64) * 100.0
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<GraphStatistics, CastnetError> {
    Ok(GraphStatistics {
        counts: storage.graph_counts()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Renders statistics as the text block printed by `--stats`
pub fn format_statistics(stats: &GraphStatistics) -> String {
    let mut out = String::new();
    let counts = &stats.counts;

    let _ = writeln!(out, "=== Graph Statistics ===\n");
    let _ = writeln!(out, "Records:");
    let _ = writeln!(out, "  Actors: {}", counts.actors);
    let _ = writeln!(out, "  Movies: {}", counts.movies);
    let _ = writeln!(out);

    let _ = writeln!(out, "Edges:");
    let _ = writeln!(out, "  Total: {}", counts.edges);
    let _ = writeln!(
        out,
        "  Referenced from one side only: {}",
        counts.one_sided_edges
    );
    let _ = writeln!(
        out,
        "  Confirmed by both sides: {:.1}%",
        stats.confirmed_edge_ratio()
    );

    if let Some(run) = &stats.latest_run {
        let _ = writeln!(out);
        let _ = writeln!(out, "Latest Run #{}:", run.id);
        let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
        let _ = writeln!(out, "  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            let _ = writeln!(out, "  Finished: {}", finished);
        }
        let _ = writeln!(
            out,
            "  Pages: {} fetched, {} failed",
            run.pages_fetched, run.pages_failed
        );
        let _ = writeln!(
            out,
            "  Records: {} actors, {} movies",
            run.actors, run.movies
        );
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &GraphStatistics) {
    print!("{}", format_statistics(stats));
}

/// Renders the end-of-crawl report
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Report ===\n");
    let _ = writeln!(
        out,
        "Pages fetched: {} ({} failed, {} denied by robots.txt)",
        report.pages_fetched, report.pages_failed, report.robots_denied
    );
    let _ = writeln!(
        out,
        "Records: {} actors, {} movies, {} empty",
        report.actors, report.movies, report.empty_records
    );
    let _ = writeln!(
        out,
        "Tasks: {} admitted, {} duplicates dropped",
        report.tasks_admitted, report.tasks_duplicate
    );
    let _ = writeln!(out, "Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    out
}
