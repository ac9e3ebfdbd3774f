//! JSON output of stored records
//!
//! Used by `--export`, `--query` and `--actor`.

use crate::item::{ActorItem, MovieItem};
use crate::storage::Storage;
use crate::CastnetError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Every stored record
#[derive(Debug, Serialize)]
pub struct GraphExport {
    pub actors: Vec<ActorItem>,
    pub movies: Vec<MovieItem>,
}

/// Reads every record from storage
pub fn collect_graph(storage: &dyn Storage) -> Result<GraphExport, CastnetError> {
    Ok(GraphExport {
        actors: storage.all_actors()?,
        movies: storage.all_movies()?,
    })
}

/// Writes `value` as pretty JSON followed by a newline
pub fn write_json<T: Serialize + ?Sized>(value: &T, writer: &mut dyn Write) -> Result<(), CastnetError> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Exports the whole graph to a JSON file
pub fn export_graph(storage: &dyn Storage, path: &Path) -> Result<GraphExport, CastnetError> {
    let graph = collect_graph(storage)?;
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(&graph, &mut writer)?;
    writer.flush()?;
    Ok(graph)
}
