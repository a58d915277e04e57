//! SQLite-backed vector store using the `sqlite-vec` extension.
//!
//! Entries live in two tables: `entries` for metadata/text and
//! `entry_embeddings` for vectors, joined by id. Similarity search is a
//! `vec_distance_cosine` ordered scan, which keeps the store free of any
//! assumptions about how scores are shaped downstream.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use tokio_rusqlite::{ffi, rusqlite, Connection};
use tracing::debug;

use super::{EntryRecord, RawMatch, VectorStore};
use crate::types::RetrievalError;

#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Opens (or creates) the store at `path` and prepares the schema.
    ///
    /// The sqlite-vec extension is registered process-wide on first use;
    /// `vec_version()` is probed so a broken registration fails here rather
    /// than at first query.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RetrievalError::Index(err.to_string()))?;

        conn.call(|conn| -> rusqlite::Result<()> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS entries (
                     id TEXT PRIMARY KEY,
                     source TEXT NOT NULL,
                     kind TEXT NOT NULL,
                     title TEXT,
                     description TEXT NOT NULL,
                     link TEXT NOT NULL,
                     content TEXT NOT NULL,
                     chunk_index INTEGER NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS entry_embeddings (
                     id TEXT PRIMARY KEY,
                     embedding BLOB NOT NULL
                 );",
            )
            ?;
            Ok(())
        })
        .await
        .map_err(|err| RetrievalError::Index(err.to_string()))?;

        Ok(Self { conn })
    }

    fn register_sqlite_vec() -> Result<(), RetrievalError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RetrievalError::Index)
    }
}

#[async_trait::async_trait]
impl VectorStore for SqliteVectorStore {
    async fn reset(&self) -> Result<(), RetrievalError> {
        self.conn
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute_batch("DELETE FROM entry_embeddings; DELETE FROM entries;")
                    ?;
                Ok(())
            })
            .await
            .map_err(|err| RetrievalError::Index(err.to_string()))?;
        debug!("vector store reset");
        Ok(())
    }

    async fn insert(&self, entries: Vec<EntryRecord>) -> Result<(), RetrievalError> {
        if entries.is_empty() {
            return Ok(());
        }

        let rows: Vec<(EntryRecord, String)> = entries
            .into_iter()
            .filter_map(|entry| {
                let embedding = entry.embedding.as_ref()?;
                let encoded = serde_json::to_string(embedding).ok()?;
                Some((entry, encoded))
            })
            .collect();

        let inserted = rows.len();
        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                let tx = conn
                    .transaction()
                    ?;
                for (entry, embedding_json) in &rows {
                    tx.execute(
                        "INSERT INTO entries
                             (id, source, kind, title, description, link, content, chunk_index)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        (
                            &entry.id,
                            &entry.source,
                            entry.kind.as_str(),
                            &entry.title,
                            &entry.description,
                            &entry.link,
                            &entry.content,
                            entry.chunk_index as i64,
                        ),
                    )
                    ?;
                    tx.execute(
                        "INSERT INTO entry_embeddings (id, embedding)
                         VALUES (?1, vec_f32(?2))",
                        (&entry.id, embedding_json),
                    )
                    ?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| RetrievalError::Index(err.to_string()))?;

        debug!(inserted, "entries written to sqlite store");
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RawMatch>, RetrievalError> {
        let embedding_json = serde_json::to_string(embedding)
            .map_err(|err| RetrievalError::Index(err.to_string()))?;

        self.conn
            .call(move |conn| -> rusqlite::Result<Vec<RawMatch>> {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT e.id, e.source, e.kind, e.title, e.description, e.link, \
                                e.content, e.chunk_index, \
                                vec_distance_cosine(em.embedding, vec_f32(?1)) AS distance \
                         FROM entries e \
                         JOIN entry_embeddings em ON e.id = em.id \
                         ORDER BY distance ASC, e.rowid ASC \
                         LIMIT {top_k}"
                    ))
                    ?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let entry = EntryRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            kind: row
                                .get::<_, String>(2)?
                                .parse()
                                .unwrap_or(crate::types::DocumentKind::Page),
                            title: row.get(3)?,
                            description: row.get(4)?,
                            link: row.get(5)?,
                            content: row.get(6)?,
                            chunk_index: row.get::<_, i64>(7)? as usize,
                            embedding: None,
                        };
                        let distance: f32 = row.get(8)?;
                        Ok((entry, distance))
                    })
                    ?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RetrievalError::Index(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        self.conn
            .call(|conn| -> rusqlite::Result<usize> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
                    ?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RetrievalError::Index(err.to_string()))
    }
}
