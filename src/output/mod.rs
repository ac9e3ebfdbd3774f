//! Output module for reports, statistics and exports
//!
//! This module handles:
//! - Printing the end-of-crawl report
//! - Graph statistics read back from the database
//! - JSON export of stored records

mod export;
pub mod stats;

pub use export::{collect_graph, export_graph, write_json, GraphExport};
pub use stats::{
    format_report, format_statistics, load_statistics, print_statistics, GraphStatistics,
};
