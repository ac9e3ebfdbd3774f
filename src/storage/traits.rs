//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlReport;
use crate::item::{ActorItem, MovieItem};
use crate::storage::{ActorFilter, GraphCounts, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Records are keyed by page URL. Saving a record whose URL is already stored
/// replaces the earlier version, including its outgoing references.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()>;

    // ===== Records =====

    /// Saves an actor record and its filmography references
    fn save_actor(&mut self, actor: &ActorItem, run_id: i64) -> StorageResult<()>;

    /// Saves a movie record and its cast references
    fn save_movie(&mut self, movie: &MovieItem, run_id: i64) -> StorageResult<()>;

    /// Gets an actor by page URL
    ///
    /// The movie list is the actor's own filmography followed by movies whose
    /// cast lists the actor but the filmography does not.
    fn get_actor(&self, url: &str) -> StorageResult<Option<ActorItem>>;

    /// Gets a movie by page URL, with the cast completed the same way
    fn get_movie(&self, url: &str) -> StorageResult<Option<MovieItem>>;

    /// Case-insensitive exact name lookup; underscores are read as spaces
    fn find_actor_by_name(&self, name: &str) -> StorageResult<Option<ActorItem>>;

    /// Actors matching any of the filter groups
    fn find_actors(&self, filters: &[ActorFilter]) -> StorageResult<Vec<ActorItem>>;

    /// Every stored actor, ordered by URL
    fn all_actors(&self) -> StorageResult<Vec<ActorItem>>;

    /// Every stored movie, ordered by URL
    fn all_movies(&self) -> StorageResult<Vec<MovieItem>>;

    // ===== Statistics =====

    /// Record and edge counts for the whole graph
    fn graph_counts(&self) -> StorageResult<GraphCounts>;
}
