//! SQLite-backed repository for gesture samples, trained models and action bindings.
//!
//! Three logical collections keyed by user id. Multi-row writes run in a single
//! transaction so callers never observe a half-applied capture or deletion.

use std::path::{Path, PathBuf};

use gestura_core::{Error, NormalizationMode, NormalizedSample, Result, NUM_LANDMARKS};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{BINDINGS_SQL, MODELS_SQL, SAMPLES_SQL};
use crate::types::*;

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Raw sample columns before decoding.
type SampleRow = (i64, String, String, String, String, bool, i64);

/// SQLite store for the gesture pipeline.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/gestura.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("gestura.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let stats = store.get_stats()?;
        info!(
            "SqliteStore initialized: {} samples, {} users, {} models, path={}",
            stats.total_samples,
            stats.users,
            stats.models,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}\n{}", SAMPLES_SQL, MODELS_SQL, BINDINGS_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Samples
    // ---------------------------------------------------------------

    /// Insert samples for one gesture. Returns the number of rows written.
    pub fn insert_samples(&self, user_id: &str, gesture: &str, samples: &[NewSample]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let count = Self::insert_samples_tx(&tx, user_id, gesture, samples)?;
        tx.commit().map_err(db_err)?;
        Ok(count)
    }

    /// Insert samples and upsert the gesture's action binding in one transaction.
    pub fn record_capture(
        &self,
        user_id: &str,
        gesture: &str,
        samples: &[NewSample],
        action: &str,
    ) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let count = Self::insert_samples_tx(&tx, user_id, gesture, samples)?;
        Self::upsert_binding_tx(&tx, user_id, gesture, action)?;
        tx.commit().map_err(db_err)?;
        debug!("Stored {} samples for {}/{} → {}", count, user_id, gesture, action);
        Ok(count)
    }

    fn insert_samples_tx(
        tx: &rusqlite::Transaction<'_>,
        user_id: &str,
        gesture: &str,
        samples: &[NewSample],
    ) -> Result<usize> {
        let now = now_millis();
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO gesture_samples (user_id, gesture, features_json, normalization, synthetic, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(db_err)?;
        for s in samples {
            let features_json = serde_json::to_string(s.sample.points())?;
            stmt.execute(params![
                user_id,
                gesture,
                features_json,
                s.sample.mode().as_str(),
                s.synthetic,
                now
            ])
            .map_err(db_err)?;
        }
        Ok(samples.len())
    }

    /// All samples for a user, optionally restricted to one gesture, in insertion order.
    pub fn find_samples(&self, user_id: &str, gesture: Option<&str>) -> Result<Vec<StoredSample>> {
        let conn = self.conn.lock();
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<SampleRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        };

        let rows: Vec<SampleRow> = match gesture {
            Some(g) => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT id, user_id, gesture, features_json, normalization, synthetic, created_at
                         FROM gesture_samples WHERE user_id = ?1 AND gesture = ?2 ORDER BY id",
                    )
                    .map_err(db_err)?;
                let rows = stmt.query_map(params![user_id, g], map_row).map_err(db_err)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;
                collected
            }
            None => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT id, user_id, gesture, features_json, normalization, synthetic, created_at
                         FROM gesture_samples WHERE user_id = ?1 ORDER BY id",
                    )
                    .map_err(db_err)?;
                let rows = stmt.query_map(params![user_id], map_row).map_err(db_err)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;
                collected
            }
        };
        drop(conn);

        rows.into_iter().map(Self::decode_sample).collect()
    }

    fn decode_sample(row: SampleRow) -> Result<StoredSample> {
        let (id, user_id, gesture, features_json, normalization, synthetic, created_at) = row;
        let points: [[f32; 3]; NUM_LANDMARKS] = serde_json::from_str(&features_json)
            .map_err(|e| Error::Storage(format!("sample {} has malformed features: {}", id, e)))?;
        let mode: NormalizationMode = normalization.parse()?;
        Ok(StoredSample {
            id,
            user_id,
            gesture,
            sample: NormalizedSample::from_points(points, mode),
            synthetic,
            created_at,
        })
    }

    /// Count all samples for a user.
    pub fn count_samples(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM gesture_samples WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count)
    }

    /// Distinct gesture labels for a user, sorted.
    pub fn list_gestures(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT gesture FROM gesture_samples WHERE user_id = ?1 ORDER BY gesture",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| row.get(0))
            .map_err(db_err)?;
        let gestures = rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)?;
        Ok(gestures)
    }

    /// Delete a gesture's samples and its binding together.
    pub fn delete_gesture(&self, user_id: &str, gesture: &str) -> Result<GestureDeletion> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let samples_deleted = tx
            .execute(
                "DELETE FROM gesture_samples WHERE user_id = ?1 AND gesture = ?2",
                params![user_id, gesture],
            )
            .map_err(db_err)?;
        let bindings = tx
            .execute(
                "DELETE FROM gesture_actions WHERE user_id = ?1 AND gesture = ?2",
                params![user_id, gesture],
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(GestureDeletion {
            samples_deleted,
            binding_deleted: bindings > 0,
        })
    }

    // ---------------------------------------------------------------
    // Models
    // ---------------------------------------------------------------

    /// Replace the user's model blob. Returns the new `updated_at`.
    pub fn upsert_model(&self, user_id: &str, blob: &[u8]) -> Result<i64> {
        let now = now_millis();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO user_models (user_id, model_blob, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET model_blob = excluded.model_blob, updated_at = excluded.updated_at",
            params![user_id, blob, now],
        )
        .map_err(db_err)?;
        Ok(now)
    }

    pub fn find_model(&self, user_id: &str) -> Result<Option<ModelRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .prepare_cached("SELECT user_id, model_blob, updated_at FROM user_models WHERE user_id = ?1")
            .map_err(db_err)?
            .query_row(params![user_id], |row| {
                Ok(ModelRecord {
                    user_id: row.get(0)?,
                    blob: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .optional()
            .map_err(db_err)?;
        Ok(record)
    }

    pub fn delete_model(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM user_models WHERE user_id = ?1", params![user_id])
            .map_err(db_err)?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Action bindings
    // ---------------------------------------------------------------

    pub fn upsert_binding(&self, user_id: &str, gesture: &str, action: &str) -> Result<()> {
        let conn = self.conn.lock();
        Self::upsert_binding_tx(&conn, user_id, gesture, action)
    }

    fn upsert_binding_tx(conn: &Connection, user_id: &str, gesture: &str, action: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO gesture_actions (user_id, gesture, action, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, gesture) DO UPDATE SET action = excluded.action, updated_at = excluded.updated_at",
            params![user_id, gesture, action, now_millis()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn find_binding(&self, user_id: &str, gesture: &str) -> Result<Option<ActionBindingRecord>> {
        let conn = self.conn.lock();
        let binding = conn
            .prepare_cached(
                "SELECT gesture, action, updated_at FROM gesture_actions WHERE user_id = ?1 AND gesture = ?2",
            )
            .map_err(db_err)?
            .query_row(params![user_id, gesture], Self::row_to_binding)
            .optional()
            .map_err(db_err)?;
        Ok(binding)
    }

    pub fn list_bindings(&self, user_id: &str) -> Result<Vec<ActionBindingRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT gesture, action, updated_at FROM gesture_actions WHERE user_id = ?1 ORDER BY gesture",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], Self::row_to_binding)
            .map_err(db_err)?;
        let bindings = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;
        Ok(bindings)
    }

    pub fn delete_binding(&self, user_id: &str, gesture: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "DELETE FROM gesture_actions WHERE user_id = ?1 AND gesture = ?2",
                params![user_id, gesture],
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    fn row_to_binding(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionBindingRecord> {
        Ok(ActionBindingRecord {
            gesture: row.get(0)?,
            action: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let count = |sql: &str| -> Result<i64> { conn.query_row(sql, [], |row| row.get(0)).map_err(db_err) };

        let total_samples = count("SELECT COUNT(*) FROM gesture_samples")?;
        let synthetic_samples = count("SELECT COUNT(*) FROM gesture_samples WHERE synthetic = 1")?;
        let users = count("SELECT COUNT(DISTINCT user_id) FROM gesture_samples")?;
        let models = count("SELECT COUNT(*) FROM user_models")?;
        let bindings = count("SELECT COUNT(*) FROM gesture_actions")?;

        let db_size_mb = std::fs::metadata(&self.db_path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        Ok(StoreStats {
            total_samples,
            synthetic_samples,
            users,
            models,
            bindings,
            db_path: self.db_path.display().to_string(),
            db_size_mb: (db_size_mb * 100.0).round() / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn sample(offset: f32) -> NewSample {
        let mut points = [[0.0f32; 3]; NUM_LANDMARKS];
        for (i, p) in points.iter_mut().enumerate().skip(1) {
            *p = [offset + i as f32 * 0.01, offset, -0.01];
        }
        NewSample {
            sample: NormalizedSample::from_points(points, NormalizationMode::TranslationOnly),
            synthetic: false,
        }
    }

    #[test]
    fn test_insert_and_find_samples() {
        let (store, _dir) = test_store();

        store.insert_samples("u1", "fist", &[sample(0.1), sample(0.2)]).unwrap();
        store.insert_samples("u1", "open", &[sample(0.3)]).unwrap();
        store.insert_samples("u2", "fist", &[sample(0.4)]).unwrap();

        assert_eq!(store.count_samples("u1").unwrap(), 3);
        assert_eq!(store.find_samples("u1", Some("fist")).unwrap().len(), 2);

        let all = store.find_samples("u1", None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].sample, sample(0.1).sample);
        assert_eq!(store.list_gestures("u1").unwrap(), vec!["fist", "open"]);
    }

    #[test]
    fn test_record_capture_upserts_binding() {
        let (store, _dir) = test_store();

        store.record_capture("u1", "wave", &[sample(0.1)], "Mute").unwrap();
        store.record_capture("u1", "wave", &[sample(0.2)], "VolumeUp").unwrap();

        let binding = store.find_binding("u1", "wave").unwrap().unwrap();
        assert_eq!(binding.action, "VolumeUp");
        assert_eq!(store.list_bindings("u1").unwrap().len(), 1);
        assert_eq!(store.count_samples("u1").unwrap(), 2);
    }

    #[test]
    fn test_delete_gesture_removes_samples_and_binding() {
        let (store, _dir) = test_store();

        store.record_capture("u1", "wave", &[sample(0.1), sample(0.2)], "Mute").unwrap();
        store.record_capture("u1", "fist", &[sample(0.3)], "NewTab").unwrap();

        let deletion = store.delete_gesture("u1", "wave").unwrap();
        assert_eq!(deletion.samples_deleted, 2);
        assert!(deletion.binding_deleted);
        assert!(store.find_binding("u1", "wave").unwrap().is_none());
        assert_eq!(store.count_samples("u1").unwrap(), 1);

        let again = store.delete_gesture("u1", "wave").unwrap();
        assert_eq!(again.samples_deleted, 0);
        assert!(!again.binding_deleted);
    }

    #[test]
    fn test_bindings_have_independent_lifecycle() {
        let (store, _dir) = test_store();

        store.upsert_binding("u1", "wave", "Mute").unwrap();
        assert_eq!(store.count_samples("u1").unwrap(), 0);
        assert!(store.delete_binding("u1", "wave").unwrap());
        assert!(!store.delete_binding("u1", "wave").unwrap());
    }

    #[test]
    fn test_model_upsert_replaces_prior_blob() {
        let (store, _dir) = test_store();

        assert!(store.find_model("u1").unwrap().is_none());
        let first = store.upsert_model("u1", b"first").unwrap();
        let second = store.upsert_model("u1", b"second").unwrap();
        assert!(second >= first);

        let record = store.find_model("u1").unwrap().unwrap();
        assert_eq!(record.blob, b"second");
        assert_eq!(record.updated_at, second);
        assert_eq!(store.get_stats().unwrap().models, 1);

        assert!(store.delete_model("u1").unwrap());
        assert!(store.find_model("u1").unwrap().is_none());
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();

        let mut synthetic = sample(0.5);
        synthetic.synthetic = true;
        store.record_capture("u1", "fist", &[sample(0.1), synthetic], "Mute").unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_samples, 2);
        assert_eq!(stats.synthetic_samples, 1);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.bindings, 1);
    }
}
