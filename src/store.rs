//! SQLite persistence with COLMAP's table layout

use std::collections::HashMap;
use std::path::Path;

use log::{debug, trace, warn};
use rusqlite::{Connection, OptionalExtension, params};

pub const KEYPOINTS_TABLE: &str = "keypoints";
pub const MATCHES_TABLE: &str = "matches";
pub const TWO_VIEW_GEOMETRIES_TABLE: &str = "two_view_geometries";

/// Write side needed by the exporter.
///
/// `upsert_blob` replaces any existing row with the same key.
pub trait MatchStore {
    fn delete_all(&mut self, table: &str) -> rusqlite::Result<()>;
    fn upsert_blob(
        &mut self,
        table: &str,
        key: i64,
        rows: i32,
        cols: i32,
        payload: &[u8],
    ) -> rusqlite::Result<()>;
    fn begin(&mut self) -> rusqlite::Result<()>;
    fn commit(&mut self) -> rusqlite::Result<()>;
    fn rollback(&mut self) -> rusqlite::Result<()>;
}

/// Image names and ids registered in a database.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    /// image name to zero-based camera index
    pub name_to_index: HashMap<String, usize>,
    /// 1-based image id to image name
    pub id_to_name: HashMap<u32, String>,
}

impl ImageIndex {
    /// Display name of `image_id`, falling back to the id itself.
    pub fn display_name(&self, image_id: u32) -> String {
        self.id_to_name
            .get(&image_id)
            .cloned()
            .unwrap_or_else(|| image_id.to_string())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    /// Largest registered image id, or 0 when there are none. Ids may have
    /// gaps, so this and not `len` bounds the camera indices.
    pub fn max_image_id(&self) -> u32 {
        self.id_to_name.keys().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

/// Table name is interpolated into SQL, so only the known tables pass.
fn key_column(table: &str) -> Option<&'static str> {
    match table {
        KEYPOINTS_TABLE => Some("image_id"),
        MATCHES_TABLE | TWO_VIEW_GEOMETRIES_TABLE => Some("pair_id"),
        _ => None,
    }
}

fn unknown_table(table: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidParameterName(table.to_string())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the tables touched by the exporter if they are missing.
    pub fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS images (
                image_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                name TEXT NOT NULL UNIQUE,
                camera_id INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS keypoints (
                image_id INTEGER PRIMARY KEY NOT NULL,
                rows INTEGER NOT NULL,
                cols INTEGER NOT NULL,
                data BLOB
            );
            CREATE TABLE IF NOT EXISTS matches (
                pair_id INTEGER PRIMARY KEY NOT NULL,
                rows INTEGER NOT NULL,
                cols INTEGER NOT NULL,
                data BLOB
            );
            CREATE TABLE IF NOT EXISTS two_view_geometries (
                pair_id INTEGER PRIMARY KEY NOT NULL,
                rows INTEGER NOT NULL,
                cols INTEGER NOT NULL,
                data BLOB,
                config INTEGER NOT NULL DEFAULT 2
            );",
        )
    }

    /// Registers an image and returns its id.
    pub fn insert_image(&self, name: &str) -> rusqlite::Result<u32> {
        self.conn
            .execute("INSERT INTO images (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid() as u32)
    }

    /// Reads `images` into name and id lookups.
    pub fn read_image_index(&self) -> rusqlite::Result<ImageIndex> {
        let mut stmt = self.conn.prepare("SELECT image_id, name FROM images")?;
        let rows = stmt.query_map([], |row| {
            let image_id: u32 = row.get(0)?;
            let name: String = row.get(1)?;
            Ok((image_id, name))
        })?;
        let mut index = ImageIndex::default();
        for row in rows {
            let (image_id, name) = row?;
            trace!("image {} -> id {}", name, image_id);
            if image_id == 0 {
                warn!("skipping image {} with reserved id 0", name);
                continue;
            }
            index.name_to_index.insert(name.clone(), image_id as usize - 1);
            index.id_to_name.insert(image_id, name);
        }
        debug!("read {} images", index.len());
        Ok(index)
    }

    /// Returns `(rows, cols, data)` stored under `key`.
    pub fn read_blob(
        &self,
        table: &str,
        key: i64,
    ) -> rusqlite::Result<Option<(i32, i32, Vec<u8>)>> {
        let column = key_column(table).ok_or_else(|| unknown_table(table))?;
        self.conn
            .query_row(
                &format!("SELECT rows, cols, data FROM {} WHERE {} = ?1", table, column),
                params![key],
                |row| {
                    let data: Option<Vec<u8>> = row.get(2)?;
                    Ok((row.get(0)?, row.get(1)?, data.unwrap_or_default()))
                },
            )
            .optional()
    }

    pub fn count_rows(&self, table: &str) -> rusqlite::Result<usize> {
        key_column(table).ok_or_else(|| unknown_table(table))?;
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
    }
}

impl MatchStore for SqliteStore {
    fn delete_all(&mut self, table: &str) -> rusqlite::Result<()> {
        key_column(table).ok_or_else(|| unknown_table(table))?;
        let deleted = self.conn.execute(&format!("DELETE FROM {}", table), [])?;
        debug!("deleted {} rows from {}", deleted, table);
        Ok(())
    }

    fn upsert_blob(
        &mut self,
        table: &str,
        key: i64,
        rows: i32,
        cols: i32,
        payload: &[u8],
    ) -> rusqlite::Result<()> {
        let column = key_column(table).ok_or_else(|| unknown_table(table))?;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
                table, column
            ),
            params![key, rows, cols, payload],
        )?;
        Ok(())
    }

    fn begin(&mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch("ROLLBACK")
    }
}
