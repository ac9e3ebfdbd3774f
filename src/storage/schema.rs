//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Castnet database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0,
    robots_denied INTEGER NOT NULL DEFAULT 0,
    actors INTEGER NOT NULL DEFAULT 0,
    movies INTEGER NOT NULL DEFAULT 0,
    empty_records INTEGER NOT NULL DEFAULT 0,
    tasks_admitted INTEGER NOT NULL DEFAULT 0,
    tasks_duplicate INTEGER NOT NULL DEFAULT 0,
    elapsed_ms INTEGER NOT NULL DEFAULT 0
);

-- Actor pages
CREATE TABLE IF NOT EXISTS actors (
    url TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    crawled_at TEXT NOT NULL,
    crawled_run INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_actors_name ON actors(name COLLATE NOCASE);

-- Movie pages
CREATE TABLE IF NOT EXISTS movies (
    url TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    income INTEGER,
    crawled_at TEXT NOT NULL,
    crawled_run INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_movies_name ON movies(name COLLATE NOCASE);

-- Filmography references, as listed on actor pages
CREATE TABLE IF NOT EXISTS actor_movies (
    actor_url TEXT NOT NULL REFERENCES actors(url) ON DELETE CASCADE,
    movie_url TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (actor_url, movie_url)
);

CREATE INDEX IF NOT EXISTS idx_actor_movies_movie ON actor_movies(movie_url);

-- Cast references, as listed on movie pages
CREATE TABLE IF NOT EXISTS movie_actors (
    movie_url TEXT NOT NULL REFERENCES movies(url) ON DELETE CASCADE,
    actor_url TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (movie_url, actor_url)
);

CREATE INDEX IF NOT EXISTS idx_movie_actors_actor ON movie_actors(actor_url);

-- Undirected graph: an edge exists if either side references the other
CREATE VIEW IF NOT EXISTS edges AS
    SELECT actor_url, movie_url FROM actor_movies
    UNION
    SELECT actor_url, movie_url FROM movie_actors;
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
