//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlReport;
use crate::item::{ActorItem, MovieItem};
use crate::storage::query::any_of;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ActorFilter, GraphCounts, RunRecord, RunStatus};
use crate::CastnetError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

/// Movies linked to an actor: its own filmography in page order, then movies
/// that list the actor without being listed back
const LINKED_MOVIES_SQL: &str = "
    SELECT movie_url FROM (
        SELECT movie_url, 0 AS source, position FROM actor_movies WHERE actor_url = ?1
        UNION ALL
        SELECT movie_url, 1 AS source, 0 AS position FROM movie_actors
        WHERE actor_url = ?1
          AND movie_url NOT IN (SELECT movie_url FROM actor_movies WHERE actor_url = ?1)
    )
    ORDER BY source, position, movie_url";

/// Actors linked to a movie, built the same way from the other side
const LINKED_ACTORS_SQL: &str = "
    SELECT actor_url FROM (
        SELECT actor_url, 0 AS source, position FROM movie_actors WHERE movie_url = ?1
        UNION ALL
        SELECT actor_url, 1 AS source, 0 AS position FROM actor_movies
        WHERE movie_url = ?1
          AND actor_url NOT IN (SELECT actor_url FROM movie_actors WHERE movie_url = ?1)
    )
    ORDER BY source, position, actor_url";

const ONE_SIDED_EDGES_SQL: &str = "
    SELECT
        (SELECT COUNT(*) FROM (
            SELECT actor_url, movie_url FROM actor_movies
            EXCEPT
            SELECT actor_url, movie_url FROM movie_actors))
      + (SELECT COUNT(*) FROM (
            SELECT actor_url, movie_url FROM movie_actors
            EXCEPT
            SELECT actor_url, movie_url FROM actor_movies))";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
                           pages_fetched, pages_failed, actors, movies";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and applies the schema
    pub fn new(path: &Path) -> Result<Self, CastnetError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CastnetError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn linked_urls(&self, sql: &str, url: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let urls = stmt
            .query_map(params![url], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn urls(&self, sql: &str, values: Vec<rusqlite::types::Value>) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let urls = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn actors_by_url(&self, urls: Vec<String>) -> StorageResult<Vec<ActorItem>> {
        let mut actors = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(actor) = self.get_actor(&url)? {
                actors.push(actor);
            }
        }
        Ok(actors)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(from_db_count(count))
    }
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        pages_fetched: from_db_count(row.get(5)?),
        pages_failed: from_db_count(row.get(6)?),
        actors: from_db_count(row.get(7)?),
        movies: from_db_count(row.get(8)?),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let elapsed_ms = i64::try_from(report.elapsed.as_millis()).unwrap_or(i64::MAX);

        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
                pages_fetched = ?3, pages_failed = ?4, robots_denied = ?5,
                actors = ?6, movies = ?7, empty_records = ?8,
                tasks_admitted = ?9, tasks_duplicate = ?10, elapsed_ms = ?11
             WHERE id = ?12",
            params![
                status.to_db_string(),
                now,
                to_db_count(report.pages_fetched),
                to_db_count(report.pages_failed),
                to_db_count(report.robots_denied),
                to_db_count(report.actors),
                to_db_count(report.movies),
                to_db_count(report.empty_records),
                to_db_count(report.tasks_admitted),
                to_db_count(report.tasks_duplicate),
                elapsed_ms,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn save_actor(&mut self, actor: &ActorItem, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO actors (url, name, age, crawled_at, crawled_run)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                crawled_at = excluded.crawled_at,
                crawled_run = excluded.crawled_run",
            params![actor.url, actor.name, actor.age, now, run_id],
        )?;
        tx.execute(
            "DELETE FROM actor_movies WHERE actor_url = ?1",
            params![actor.url],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO actor_movies (actor_url, movie_url, position)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, movie_url) in actor.movies.iter().enumerate() {
                stmt.execute(params![actor.url, movie_url, to_db_count(position as u64)])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn save_movie(&mut self, movie: &MovieItem, run_id: i64) -> StorageResult<()> {
        let income = movie
            .income
            .map(|income| {
                i64::try_from(income).map_err(|_| StorageError::OutOfRange {
                    field: "income",
                    value: income.to_string(),
                })
            })
            .transpose()?;

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO movies (url, name, income, crawled_at, crawled_run)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                income = excluded.income,
                crawled_at = excluded.crawled_at,
                crawled_run = excluded.crawled_run",
            params![movie.url, movie.name, income, now, run_id],
        )?;
        tx.execute(
            "DELETE FROM movie_actors WHERE movie_url = ?1",
            params![movie.url],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO movie_actors (movie_url, actor_url, position)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, actor_url) in movie.actors.iter().enumerate() {
                stmt.execute(params![movie.url, actor_url, to_db_count(position as u64)])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_actor(&self, url: &str) -> StorageResult<Option<ActorItem>> {
        let row: Option<(String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT name, age FROM actors WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((name, age)) = row else {
            return Ok(None);
        };

        let age = age
            .map(|age| {
                u32::try_from(age).map_err(|_| StorageError::OutOfRange {
                    field: "age",
                    value: age.to_string(),
                })
            })
            .transpose()?;

        Ok(Some(ActorItem {
            name,
            age,
            url: url.to_string(),
            movies: self.linked_urls(LINKED_MOVIES_SQL, url)?,
        }))
    }

    fn get_movie(&self, url: &str) -> StorageResult<Option<MovieItem>> {
        let row: Option<(String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT name, income FROM movies WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((name, income)) = row else {
            return Ok(None);
        };

        let income = income
            .map(|income| {
                u64::try_from(income).map_err(|_| StorageError::OutOfRange {
                    field: "income",
                    value: income.to_string(),
                })
            })
            .transpose()?;

        Ok(Some(MovieItem {
            name,
            income,
            url: url.to_string(),
            actors: self.linked_urls(LINKED_ACTORS_SQL, url)?,
        }))
    }

    fn find_actor_by_name(&self, name: &str) -> StorageResult<Option<ActorItem>> {
        let name = name.replace('_', " ");
        let url: Option<String> = self
            .conn
            .query_row(
                "SELECT url FROM actors WHERE lower(name) = lower(?1) ORDER BY url LIMIT 1",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;

        match url {
            Some(url) => self.get_actor(&url),
            None => Ok(None),
        }
    }

    fn find_actors(&self, filters: &[ActorFilter]) -> StorageResult<Vec<ActorItem>> {
        let mut values = Vec::new();
        let condition = any_of(filters, &mut values);
        let sql = format!(
            "SELECT a.url FROM actors a WHERE {} ORDER BY a.url",
            condition
        );

        let urls = self.urls(&sql, values)?;
        self.actors_by_url(urls)
    }

    fn all_actors(&self) -> StorageResult<Vec<ActorItem>> {
        let urls = self.urls("SELECT url FROM actors ORDER BY url", Vec::new())?;
        self.actors_by_url(urls)
    }

    fn all_movies(&self) -> StorageResult<Vec<MovieItem>> {
        let urls = self.urls("SELECT url FROM movies ORDER BY url", Vec::new())?;
        let mut movies = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(movie) = self.get_movie(&url)? {
                movies.push(movie);
            }
        }
        Ok(movies)
    }

    // ===== Statistics =====

    fn graph_counts(&self) -> StorageResult<GraphCounts> {
        Ok(GraphCounts {
            actors: self.count("SELECT COUNT(*) FROM actors")?,
            movies: self.count("SELECT COUNT(*) FROM movies")?,
            edges: self.count("SELECT COUNT(*) FROM edges")?,
            one_sided_edges: self.count(ONE_SIDED_EDGES_SQL)?,
        })
    }
}
