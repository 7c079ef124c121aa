use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use super::ItemStore;
use crate::error::StoreResult;
use crate::models::Item;

/// Item store backed by the catalog's SQLite file.
///
/// Expected schema:
/// `items(id INTEGER PRIMARY KEY, text TEXT, emoji TEXT)` and
/// `recipes(result INTEGER, first INTEGER, second INTEGER)`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open an existing catalog read-only.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::info!(path = %path.as_ref().display(), "item database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn item_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Item> {
    let id: i64 = row.get(offset)?;
    let text: String = row.get(offset + 1)?;
    let emoji: String = row.get(offset + 2)?;
    Ok(Item::from_parts(id, &emoji, &text))
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl ItemStore for SqliteStore {
    fn total_item_count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let total: i64 = conn.query_row("SELECT COUNT(id) FROM items", [], |row| row.get(0))?;
        Ok(total.max(0) as u64)
    }

    fn item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
        let conn = self.conn.lock();
        let item = conn
            .query_row(
                "SELECT id, text, emoji FROM items WHERE id = ?1",
                params![id],
                |row| item_from_row(row, 0),
            )
            .optional()?;
        Ok(item)
    }

    fn item_batch(&self, limit: usize, after_id: i64) -> StoreResult<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, text, emoji FROM items WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;
        let items = stmt
            .query_map(params![after_id, limit as i64], |row| item_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn items_by_fuzzy_name(&self, query: &str, limit: usize) -> StoreResult<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, text, emoji FROM items \
             WHERE text LIKE '%' || ?1 || '%' ESCAPE '\\' \
             ORDER BY id LIMIT ?2",
        )?;
        let items = stmt
            .query_map(params![escape_like(query), limit as i64], |row| {
                item_from_row(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn first_recipe_for(&self, item_id: i64) -> StoreResult<Option<(Item, Item)>> {
        let conn = self.conn.lock();
        let components = conn
            .query_row(
                "SELECT c1.id, c1.text, c1.emoji, c2.id, c2.text, c2.emoji \
                 FROM recipes AS r \
                 JOIN items AS c1 ON c1.id = r.first \
                 JOIN items AS c2 ON c2.id = r.second \
                 WHERE r.result = ?1 \
                 ORDER BY r.first ASC, r.second DESC \
                 LIMIT 1",
                params![item_id],
                |row| Ok((item_from_row(row, 0)?, item_from_row(row, 3)?)),
            )
            .optional()?;
        Ok(components)
    }
}
