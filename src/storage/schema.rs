//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the lnsync cache.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every known wiki page, keyed by title
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    parent TEXT NOT NULL DEFAULT '',
    last_update TEXT,
    last_check TEXT,
    is_watched INTEGER NOT NULL DEFAULT 0,
    is_finished_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_pages_type ON pages(type);
CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent);
CREATE INDEX IF NOT EXISTS idx_pages_watched ON pages(is_watched);

-- Novel detail records
CREATE TABLE IF NOT EXISTS novel_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page TEXT NOT NULL UNIQUE,
    synopsis TEXT NOT NULL DEFAULT '',
    cover_url TEXT,
    cover_referer TEXT,
    last_update TEXT,
    last_check TEXT
);

-- Books (volumes) of a novel, in reading order
CREATE TABLE IF NOT EXISTS novel_books (
    novel_page TEXT NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    PRIMARY KEY (novel_page, position)
);

-- Chapters of a book; the chapter itself lives in pages
CREATE TABLE IF NOT EXISTS novel_chapters (
    novel_page TEXT NOT NULL,
    book_position INTEGER NOT NULL,
    position INTEGER NOT NULL,
    page TEXT NOT NULL,
    PRIMARY KEY (novel_page, book_position, position)
);

-- Rendered page bodies
CREATE TABLE IF NOT EXISTS novel_contents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    last_update TEXT,
    last_check TEXT
);

-- Images referenced by a page body, in document order
CREATE TABLE IF NOT EXISTS content_images (
    content_page TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    referer TEXT,
    PRIMARY KEY (content_page, position)
);

-- Downloaded or resolved images, keyed by canonical URL
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    referer TEXT,
    local_path TEXT,
    last_update TEXT,
    last_check TEXT
);

CREATE INDEX IF NOT EXISTS idx_images_referer ON images(referer);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
