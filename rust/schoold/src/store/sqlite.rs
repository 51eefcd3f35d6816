use super::{RecordStore, RemoteError};
use crate::model::{Collection, Fields, RecordId, ID_FIELD};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub const DB_FILE: &str = "schoold.sqlite3";

/// Record store kept in a workspace-local SQLite file.
///
/// Every collection shares one `records` table; field maps are stored as JSON
/// text. Identifiers come from a per-collection sequence and are never reused,
/// so a larger id always means a later insert.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace)?;
        let conn = Connection::open(workspace.join(DB_FILE))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RemoteError> {
        self.conn
            .lock()
            .map_err(|_| RemoteError::Storage("store connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            collection TEXT NOT NULL,
            id INTEGER NOT NULL,
            fields TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            PRIMARY KEY(collection, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS record_sequences(
            collection TEXT PRIMARY KEY,
            last_id INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn now_text() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn with_id(mut fields: Fields, id: RecordId) -> Fields {
    fields.insert(ID_FIELD.to_string(), serde_json::Value::from(id));
    fields
}

fn decode(raw: &str, id: RecordId) -> Result<Fields, RemoteError> {
    let fields: Fields = serde_json::from_str(raw)?;
    Ok(with_id(fields, id))
}

impl RecordStore for SqliteStore {
    fn list(&self, collection: Collection) -> Result<Vec<Fields>, RemoteError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, fields FROM records WHERE collection = ? ORDER BY id")?;
        let rows = stmt
            .query_map([collection.name()], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        rows.into_iter().map(|(id, raw)| decode(&raw, id)).collect()
    }

    fn get_by_id(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> Result<Option<Fields>, RemoteError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT fields FROM records WHERE collection = ? AND id = ?",
                (collection.name(), id),
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|raw| decode(&raw, id)).transpose()
    }

    fn create(&self, collection: Collection, mut fields: Fields) -> Result<Fields, RemoteError> {
        fields.remove(ID_FIELD);
        let raw = serde_json::to_string(&fields)?;

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO record_sequences(collection, last_id) VALUES(?, 1)
             ON CONFLICT(collection) DO UPDATE SET last_id = last_id + 1",
            [collection.name()],
        )?;
        let id: i64 = tx.query_row(
            "SELECT last_id FROM record_sequences WHERE collection = ?",
            [collection.name()],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO records(collection, id, fields, created_at) VALUES(?, ?, ?, ?)",
            (collection.name(), id, &raw, now_text()),
        )?;
        tx.commit()?;
        Ok(with_id(fields, id))
    }

    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Fields,
    ) -> Result<Fields, RemoteError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT fields FROM records WHERE collection = ? AND id = ?",
                (collection.name(), id),
                |r| r.get(0),
            )
            .optional()?;
        let Some(existing) = existing else {
            return Err(RemoteError::NotFound { collection, id });
        };
        let mut merged: Fields = serde_json::from_str(&existing)?;
        for (k, v) in fields {
            if k != ID_FIELD {
                merged.insert(k, v);
            }
        }
        let raw = serde_json::to_string(&merged)?;
        tx.execute(
            "UPDATE records SET fields = ?, updated_at = ? WHERE collection = ? AND id = ?",
            (&raw, now_text(), collection.name(), id),
        )?;
        tx.commit()?;
        Ok(with_id(merged, id))
    }

    fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, RemoteError> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            (collection.name(), id),
        )?;
        Ok(n > 0)
    }
}
