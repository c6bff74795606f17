//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{BookModel, ImageModel, NovelCollectionModel, NovelContentModel, PageModel, PageType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::SyncError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::{Path, PathBuf};

/// Page columns in the order `page_from_row` expects them
const PAGE_COLUMNS: &str =
    "p.id, p.page, p.title, p.type, p.parent, p.last_update, p.last_check, p.is_watched, p.is_finished_read";

const IMAGE_COLUMNS: &str = "id, name, url, referer, local_path, last_update, last_check";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SyncError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SyncError> {
        let conn = init_database(path).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

fn to_db_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|ts| ts.to_rfc3339())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            s.parse::<DateTime<Utc>>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Maps `PAGE_COLUMNS` starting at column `offset`
fn page_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<PageModel> {
    Ok(PageModel {
        id: row.get(offset)?,
        page: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        page_type: PageType::from_db_string(&row.get::<_, String>(offset + 3)?)
            .unwrap_or(PageType::Other),
        parent: row.get(offset + 4)?,
        last_update: timestamp_column(row, offset + 5)?,
        last_check: timestamp_column(row, offset + 6)?,
        is_watched: row.get(offset + 7)?,
        is_finished_read: row.get(offset + 8)?,
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ImageModel> {
    Ok(ImageModel {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        referer: row.get(3)?,
        local_path: row.get::<_, Option<String>>(4)?.map(PathBuf::from),
        last_update: timestamp_column(row, 5)?,
        last_check: timestamp_column(row, 6)?,
    })
}

fn select_page(conn: &Connection, page: &str) -> rusqlite::Result<Option<PageModel>> {
    conn.query_row(
        &format!("SELECT {} FROM pages p WHERE p.page = ?1", PAGE_COLUMNS),
        params![page],
        |row| page_from_row(row, 0),
    )
    .optional()
}

fn select_pages(
    conn: &Connection,
    filter: &str,
    value: &dyn ToSql,
) -> rusqlite::Result<Vec<PageModel>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM pages p WHERE {} = ?1 ORDER BY p.id ASC",
        PAGE_COLUMNS, filter
    ))?;

    let pages = stmt
        .query_map(params![value], |row| page_from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pages)
}

/// Writes a page coming from the network, keeping the user's flags
///
/// Timestamps the sync did not observe keep their stored values.
fn upsert_synced_page(conn: &Connection, page: &PageModel) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pages (page, title, type, parent, last_update, last_check, is_watched, is_finished_read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(page) DO UPDATE SET
            title = excluded.title,
            type = excluded.type,
            parent = excluded.parent,
            last_update = COALESCE(excluded.last_update, pages.last_update),
            last_check = COALESCE(excluded.last_check, pages.last_check)",
        params![
            page.page,
            page.title,
            page.page_type.to_db_string(),
            page.parent,
            to_db_timestamp(page.last_update),
            to_db_timestamp(page.last_check),
            page.is_watched,
            page.is_finished_read,
        ],
    )?;
    Ok(())
}

/// Writes a chapter link found in a novel's detail record
///
/// A page already stored keeps its type and parent, so a listed novel linked
/// from another novel stays a novel. Only pages of the same type take the
/// link text as their title.
fn upsert_chapter_page(conn: &Connection, page: &PageModel) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pages (page, title, type, parent, last_update, last_check, is_watched, is_finished_read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(page) DO UPDATE SET
            title = CASE WHEN pages.type = excluded.type THEN excluded.title ELSE pages.title END,
            last_update = COALESCE(excluded.last_update, pages.last_update),
            last_check = COALESCE(excluded.last_check, pages.last_check)",
        params![
            page.page,
            page.title,
            page.page_type.to_db_string(),
            page.parent,
            to_db_timestamp(page.last_update),
            to_db_timestamp(page.last_check),
            page.is_watched,
            page.is_finished_read,
        ],
    )?;
    Ok(())
}

fn select_image(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<ImageModel>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM images WHERE {} = ?1 ORDER BY id ASC LIMIT 1",
            IMAGE_COLUMNS, column
        ),
        params![value],
        image_from_row,
    )
    .optional()
}

fn count(conn: &Connection, sql: &str, value: Option<&str>) -> StorageResult<u64> {
    let count: i64 = match value {
        Some(value) => conn.query_row(sql, params![value], |row| row.get(0))?,
        None => conn.query_row(sql, [], |row| row.get(0))?,
    };
    Ok(count as u64)
}

impl Storage for SqliteStorage {
    // ===== Pages =====

    fn get_page(&self, page: &str) -> StorageResult<Option<PageModel>> {
        Ok(select_page(&self.conn, page)?)
    }

    fn get_pages_by_type(&self, page_type: PageType) -> StorageResult<Vec<PageModel>> {
        Ok(select_pages(&self.conn, "p.type", &page_type.to_db_string())?)
    }

    fn get_watched_pages(&self) -> StorageResult<Vec<PageModel>> {
        Ok(select_pages(&self.conn, "p.is_watched", &true)?)
    }

    fn upsert_page(&mut self, page: &PageModel) -> StorageResult<PageModel> {
        self.conn.execute(
            "INSERT INTO pages (page, title, type, parent, last_update, last_check, is_watched, is_finished_read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(page) DO UPDATE SET
                title = excluded.title,
                type = excluded.type,
                parent = excluded.parent,
                last_update = excluded.last_update,
                last_check = excluded.last_check,
                is_watched = excluded.is_watched,
                is_finished_read = excluded.is_finished_read",
            params![
                page.page,
                page.title,
                page.page_type.to_db_string(),
                page.parent,
                to_db_timestamp(page.last_update),
                to_db_timestamp(page.last_check),
                page.is_watched,
                page.is_finished_read,
            ],
        )?;

        select_page(&self.conn, &page.page)?
            .ok_or_else(|| StorageError::MissingAfterWrite(page.page.clone()))
    }

    fn upsert_synced_pages(&mut self, pages: &[PageModel]) -> StorageResult<Vec<PageModel>> {
        let tx = self.conn.transaction()?;

        for page in pages {
            upsert_synced_page(&tx, page)?;
        }

        let mut stored = Vec::with_capacity(pages.len());
        for page in pages {
            let saved = select_page(&tx, &page.page)?
                .ok_or_else(|| StorageError::MissingAfterWrite(page.page.clone()))?;
            stored.push(saved);
        }

        tx.commit()?;
        Ok(stored)
    }

    // ===== Novel details =====

    fn get_novel_details(&self, page: &str) -> StorageResult<Option<NovelCollectionModel>> {
        let novel = self
            .conn
            .query_row(
                "SELECT id, page, synopsis, cover_url, cover_referer, last_update, last_check
                 FROM novel_details WHERE page = ?1",
                params![page],
                |row| {
                    Ok(NovelCollectionModel {
                        id: row.get(0)?,
                        page: row.get(1)?,
                        synopsis: row.get(2)?,
                        cover_url: row.get(3)?,
                        cover_referer: row.get(4)?,
                        books: Vec::new(),
                        last_update: timestamp_column(row, 5)?,
                        last_check: timestamp_column(row, 6)?,
                    })
                },
            )
            .optional()?;

        let Some(mut novel) = novel else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT position, title FROM novel_books WHERE novel_page = ?1 ORDER BY position ASC",
        )?;
        novel.books = stmt
            .query_map(params![page], |row| {
                Ok(BookModel {
                    position: row.get(0)?,
                    title: row.get(1)?,
                    chapters: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT c.book_position, {}
             FROM novel_chapters c JOIN pages p ON p.page = c.page
             WHERE c.novel_page = ?1
             ORDER BY c.book_position ASC, c.position ASC",
            PAGE_COLUMNS
        ))?;
        let chapters = stmt
            .query_map(params![page], |row| {
                Ok((row.get::<_, u32>(0)?, page_from_row(row, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (book_position, chapter) in chapters {
            if let Some(book) = novel
                .books
                .iter_mut()
                .find(|book| book.position == book_position)
            {
                book.chapters.push(chapter);
            }
        }

        Ok(Some(novel))
    }

    fn upsert_novel_details(
        &mut self,
        novel: &NovelCollectionModel,
    ) -> StorageResult<NovelCollectionModel> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO novel_details (page, synopsis, cover_url, cover_referer, last_update, last_check)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(page) DO UPDATE SET
                synopsis = excluded.synopsis,
                cover_url = excluded.cover_url,
                cover_referer = excluded.cover_referer,
                last_update = excluded.last_update,
                last_check = excluded.last_check",
            params![
                novel.page,
                novel.synopsis,
                novel.cover_url,
                novel.cover_referer,
                to_db_timestamp(novel.last_update),
                to_db_timestamp(novel.last_check),
            ],
        )?;

        tx.execute(
            "DELETE FROM novel_books WHERE novel_page = ?1",
            params![novel.page],
        )?;
        tx.execute(
            "DELETE FROM novel_chapters WHERE novel_page = ?1",
            params![novel.page],
        )?;

        for (book_position, book) in novel.books.iter().enumerate() {
            tx.execute(
                "INSERT INTO novel_books (novel_page, position, title) VALUES (?1, ?2, ?3)",
                params![novel.page, book_position as u32, book.title],
            )?;

            for (position, chapter) in book.chapters.iter().enumerate() {
                upsert_chapter_page(&tx, chapter)?;
                tx.execute(
                    "INSERT INTO novel_chapters (novel_page, book_position, position, page)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![novel.page, book_position as u32, position as u32, chapter.page],
                )?;
            }
        }

        tx.commit()?;

        self.get_novel_details(&novel.page)?
            .ok_or_else(|| StorageError::MissingAfterWrite(novel.page.clone()))
    }

    // ===== Novel contents =====

    fn get_novel_content(&self, page: &str) -> StorageResult<Option<NovelContentModel>> {
        let content = self
            .conn
            .query_row(
                "SELECT id, content, last_update, last_check FROM novel_contents WHERE page = ?1",
                params![page],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        timestamp_column(row, 2)?,
                        timestamp_column(row, 3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, body, last_update, last_check)) = content else {
            return Ok(None);
        };

        let owner = select_page(&self.conn, page)?
            .unwrap_or_else(|| PageModel::new(page, PageType::Content));

        let mut stmt = self.conn.prepare(
            "SELECT i.id, ci.name, COALESCE(i.url, ci.url), COALESCE(i.referer, ci.referer),
                    i.local_path, i.last_update, i.last_check
             FROM content_images ci LEFT JOIN images i ON i.name = ci.name
             WHERE ci.content_page = ?1
             ORDER BY ci.position ASC",
        )?;
        let images = stmt
            .query_map(params![page], |row| {
                Ok(ImageModel {
                    id: row.get::<_, Option<i64>>(0)?.unwrap_or(0),
                    name: row.get(1)?,
                    url: row.get(2)?,
                    referer: row.get(3)?,
                    local_path: row.get::<_, Option<String>>(4)?.map(PathBuf::from),
                    last_update: timestamp_column(row, 5)?,
                    last_check: timestamp_column(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(NovelContentModel {
            id,
            page: owner,
            content: body,
            images,
            last_update,
            last_check,
        }))
    }

    fn upsert_novel_content(
        &mut self,
        content: &NovelContentModel,
    ) -> StorageResult<NovelContentModel> {
        let key = content.key().to_string();
        let tx = self.conn.transaction()?;

        upsert_synced_page(&tx, &content.page)?;

        tx.execute(
            "INSERT INTO novel_contents (page, content, last_update, last_check)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(page) DO UPDATE SET
                content = excluded.content,
                last_update = excluded.last_update,
                last_check = excluded.last_check",
            params![
                key,
                content.content,
                to_db_timestamp(content.last_update),
                to_db_timestamp(content.last_check),
            ],
        )?;

        tx.execute(
            "DELETE FROM content_images WHERE content_page = ?1",
            params![key],
        )?;
        for (position, image) in content.images.iter().enumerate() {
            tx.execute(
                "INSERT INTO content_images (content_page, position, name, url, referer)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![key, position as u32, image.name, image.url, image.referer],
            )?;
        }

        tx.commit()?;

        self.get_novel_content(&key)?
            .ok_or(StorageError::MissingAfterWrite(key))
    }

    // ===== Images =====

    fn get_image(&self, name: &str) -> StorageResult<Option<ImageModel>> {
        Ok(select_image(&self.conn, "name", name)?)
    }

    fn get_image_by_referer(&self, referer: &str) -> StorageResult<Option<ImageModel>> {
        Ok(select_image(&self.conn, "referer", referer)?)
    }

    fn upsert_image(&mut self, image: &ImageModel) -> StorageResult<ImageModel> {
        let local_path = image
            .local_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned());

        self.conn.execute(
            "INSERT INTO images (name, url, referer, local_path, last_update, last_check)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                url = excluded.url,
                referer = COALESCE(excluded.referer, images.referer),
                local_path = COALESCE(excluded.local_path, images.local_path),
                last_update = excluded.last_update,
                last_check = excluded.last_check",
            params![
                image.name,
                image.url,
                image.referer,
                local_path,
                to_db_timestamp(image.last_update),
                to_db_timestamp(image.last_check),
            ],
        )?;

        select_image(&self.conn, "name", &image.name)?
            .ok_or_else(|| StorageError::MissingAfterWrite(image.name.clone()))
    }

    // ===== Statistics =====

    fn count_pages_by_type(&self, page_type: PageType) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM pages WHERE type = ?1",
            Some(page_type.to_db_string()),
        )
    }

    fn count_watched_pages(&self) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM pages WHERE is_watched = 1",
            None,
        )
    }

    fn count_novel_details(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM novel_details", None)
    }

    fn count_novel_contents(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM novel_contents", None)
    }

    fn count_images(&self) -> StorageResult<(u64, u64)> {
        let total = count(&self.conn, "SELECT COUNT(*) FROM images", None)?;
        let downloaded = count(
            &self.conn,
            "SELECT COUNT(*) FROM images WHERE local_path IS NOT NULL",
            None,
        )?;
        Ok((total, downloaded))
    }
}

/// Initializes or opens a database at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
