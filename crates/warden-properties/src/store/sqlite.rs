//! SQLite-backed property storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use super::{NewProperty, PropertyStore, StoreError, StoreResult};
use crate::types::Property;

const SELECT_COLUMNS: &str = "id, name, city, state, country, lat, lng, geohash5, is_active, \
                              tags, created_at, updated_at";

/// SQLite property store.
///
/// The connection sits behind a mutex; async reads hop onto the blocking
/// pool so the runtime never waits on disk.
#[derive(Clone)]
pub struct SqlitePropertyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePropertyStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::unavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS properties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                country TEXT NOT NULL DEFAULT 'US',
                lat REAL,
                lng REAL,
                geohash5 TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_properties_geohash5 ON properties(geohash5);
            "#,
        )?;
        Ok(())
    }

    fn row_to_property(row: &rusqlite::Row) -> rusqlite::Result<Property> {
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;
        let tags_str: String = row.get(9)?;
        let is_active: i32 = row.get(8)?;

        Ok(Property {
            id: row.get(0)?,
            name: row.get(1)?,
            city: row.get(2)?,
            state: row.get(3)?,
            country: row.get(4)?,
            latitude: row.get(5)?,
            longitude: row.get(6)?,
            geohash5: row.get(7)?,
            is_active: is_active != 0,
            tags: serde_json::from_str(&tags_str).unwrap_or_default(),
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    /// Insert one property and return it with its assigned id.
    pub fn insert(&self, new: &NewProperty) -> StoreResult<Property> {
        let conn = self.conn.lock();
        Self::insert_with(&conn, new)?;
        let id = conn.last_insert_rowid();
        Self::get_with(&conn, id)?
            .ok_or_else(|| StoreError::unavailable(format!("property {} vanished after insert", id)))
    }

    fn insert_with(conn: &Connection, new: &NewProperty) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let tags = serde_json::to_string(&new.tags).map_err(|e| StoreError::Import(e.to_string()))?;
        conn.execute(
            "INSERT INTO properties \
             (name, city, state, country, lat, lng, geohash5, is_active, tags, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                new.name,
                new.city,
                new.state,
                new.country,
                new.latitude,
                new.longitude,
                new.geohash5,
                new.is_active as i32,
                tags,
                now,
            ],
        )?;
        Ok(())
    }

    fn get_with(conn: &Connection, id: i64) -> StoreResult<Option<Property>> {
        let sql = format!("SELECT {} FROM properties WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::row_to_property).optional()?)
    }

    /// Total number of stored properties.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Insert every record from a JSON array file in one transaction.
    pub fn import_json<P: AsRef<Path>>(&self, path: P) -> StoreResult<usize> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Import(format!("{}: {}", path.display(), e)))?;
        let records: Vec<NewProperty> = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Import(format!("{}: {}", path.display(), e)))?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for record in &records {
            Self::insert_with(&tx, record)?;
        }
        tx.commit()?;

        tracing::info!("Imported {} properties from {}", records.len(), path.display());
        Ok(records.len())
    }

    /// Blocking form of [`PropertyStore::find_range`].
    pub fn find_range_blocking(
        &self,
        search_text: Option<&str>,
        after_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<Property>> {
        let pattern = search_text.map(|text| format!("%{}%", escape_like(text)));
        let sql = format!(
            r#"SELECT {} FROM properties
               WHERE (?1 IS NULL
                      OR name LIKE ?1 ESCAPE '\'
                      OR city LIKE ?1 ESCAPE '\'
                      OR state LIKE ?1 ESCAPE '\')
                 AND (?2 IS NULL OR id > ?2)
               ORDER BY id ASC
               LIMIT ?3"#,
            SELECT_COLUMNS
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![pattern, after_id, limit.min(i64::MAX as usize) as i64],
                Self::row_to_property,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl PropertyStore for SqlitePropertyStore {
    async fn find_range(
        &self,
        search_text: Option<&str>,
        after_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<Property>> {
        let store = self.clone();
        let search_text = search_text.map(str::to_owned);
        tokio::task::spawn_blocking(move || {
            store.find_range_blocking(search_text.as_deref(), after_id, limit)
        })
        .await?
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
