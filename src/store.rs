use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS used_words (\
    word TEXT NOT NULL, \
    language TEXT NOT NULL, \
    PRIMARY KEY (word, language))";

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Sqlite(value)
    }
}

/// Words already served, partitioned by language.
///
/// Each `(word, language)` pair is stored at most once. The connection is
/// closed when the store is dropped.
pub struct UsageStore {
    conn: Mutex<Connection>,
}

impl UsageStore {
    /// Opens (or creates) the database file and its table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening usage store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All words recorded for `language`; empty when there are none.
    pub fn used_words(&self, language: &str) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT word FROM used_words WHERE language = ?1")?;
        let words = stmt
            .query_map([language], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        debug!(language, count = words.len(), "loaded used words");
        Ok(words)
    }

    /// Same as [`used_words`](Self::used_words) but alphabetically ordered.
    pub fn used_words_sorted(&self, language: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT word FROM used_words WHERE language = ?1 ORDER BY word")?;
        let words = stmt
            .query_map([language], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words)
    }

    pub fn used_count(&self, language: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM used_words WHERE language = ?1",
            [language],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Records `words` for `language` in a single transaction.
    ///
    /// Words already present are skipped silently. Either every insert lands
    /// or none does.
    pub fn store_used(&self, words: &[String], language: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO used_words (word, language) VALUES (?1, ?2)")?;
            for word in words {
                stmt.execute(params![word, language])?;
            }
        }
        tx.commit()?;
        debug!(language, count = words.len(), "stored used words");
        Ok(())
    }
}
