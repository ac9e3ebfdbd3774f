//! Graph item emitter
//!
//! Workers hand records to an unbounded channel and child tasks to the
//! frontier. A single writer drains the channel on a blocking thread, so a slow
//! database never holds up fetching.

use crate::crawler::frontier::{Admission, Frontier};
use crate::crawler::task::Task;
use crate::item::Item;
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Destination of the item stream
pub trait ItemSink: Send {
    fn accept(&mut self, item: &Item) -> Result<(), StorageError>;
}

/// Collects items in memory
impl ItemSink for Vec<Item> {
    fn accept(&mut self, item: &Item) -> Result<(), StorageError> {
        self.push(item.clone());
        Ok(())
    }
}

/// Persists records of one crawl run
pub struct StorageSink<S> {
    storage: S,
    run_id: i64,
}

impl<S: Storage> StorageSink<S> {
    pub fn new(storage: S, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage + Send> ItemSink for StorageSink<S> {
    fn accept(&mut self, item: &Item) -> Result<(), StorageError> {
        match item {
            Item::Actor(actor) => self.storage.save_actor(actor, self.run_id),
            Item::Movie(movie) => self.storage.save_movie(movie, self.run_id),
            Item::Empty => Ok(()),
        }
    }
}

/// Counts of what reached the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub actors: u64,
    pub movies: u64,
    pub empty: u64,
    /// Records the sink rejected
    pub failed: u64,
}

/// Admission counts for one batch of child tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub admitted: u64,
    pub duplicate: u64,
}

/// Forwards records to the writer and child tasks to the frontier
#[derive(Debug, Clone)]
pub struct Emitter {
    frontier: Arc<Frontier>,
    items: mpsc::UnboundedSender<Item>,
}

impl Emitter {
    pub fn new(frontier: Arc<Frontier>, items: mpsc::UnboundedSender<Item>) -> Self {
        Self { frontier, items }
    }

    /// Queues a record for the writer without waiting
    pub fn emit_item(&self, item: Item) {
        if self.items.send(item).is_err() {
            tracing::warn!("Item writer is gone, dropping record");
        }
    }

    /// Enqueues child tasks; duplicates and tasks refused by a closed frontier are dropped
    pub fn emit_tasks(&self, tasks: Vec<Task>) -> EmitStats {
        let mut stats = EmitStats::default();
        for task in tasks {
            match self.frontier.enqueue(task) {
                Admission::Accepted => stats.admitted += 1,
                Admission::Duplicate => stats.duplicate += 1,
                Admission::Closed => {}
            }
        }
        stats
    }
}

/// Starts the writer that drains the item stream into `sink`
///
/// The writer stops once every sender is dropped and hands the sink back with
/// its summary.
pub fn spawn_writer<S>(mut sink: S) -> (mpsc::UnboundedSender<Item>, JoinHandle<(S, WriterSummary)>)
where
    S: ItemSink + 'static,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<Item>();

    let handle = tokio::task::spawn_blocking(move || {
        let mut summary = WriterSummary::default();

        while let Some(item) = receiver.blocking_recv() {
            if let Err(e) = sink.accept(&item) {
                tracing::warn!("Failed to store record {}: {}", item.url().unwrap_or("(empty)"), e);
                summary.failed += 1;
                continue;
            }
            match item {
                Item::Actor(_) => summary.actors += 1,
                Item::Movie(_) => summary.movies += 1,
                Item::Empty => summary.empty += 1,
            }
        }

        tracing::debug!("Item writer finished: {:?}", summary);
        (sink, summary)
    });

    (sender, handle)
}
