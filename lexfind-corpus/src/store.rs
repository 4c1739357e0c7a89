//! SQLite-backed profile store
//!
//! Relational storage for profile records with an FTS5 name index, alias
//! tables, cached experience text and bincode-encoded embedding vectors.
//! The connection sits behind a mutex; the engine only ever reads.

use dashmap::DashMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::query::{AliasTable, CompiledQuery, ProfileRow};
use crate::record::ProfileRecord;

/// Core schema. The FTS5 table mirrors profile names by rowid so name
/// predicates can match whole tokens instead of substrings.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE NOT NULL,
    name TEXT,
    first_name TEXT,
    last_name TEXT,
    email TEXT,
    phone TEXT,
    title TEXT,
    office_location TEXT,
    clerkship TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS educations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL,
    degree_type TEXT,
    year INTEGER,
    school_name TEXT,
    school_normalized TEXT,
    is_law_degree INTEGER DEFAULT 0,
    honors TEXT,
    full_text TEXT,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS practices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL,
    practice_type TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS industries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL,
    industry TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS regions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL,
    region TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL,
    language TEXT NOT NULL,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS schools (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_name TEXT NOT NULL,
    alias TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS practice_aliases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_name TEXT NOT NULL,
    alias TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS experience_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL UNIQUE,
    content TEXT,
    parsed_text TEXT,
    embedding BLOB,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE VIRTUAL TABLE IF NOT EXISTS profiles_fts USING fts5(full_name);
";

/// SQLite-based profile store with cached text lookups
pub struct ProfileStore {
    conn: Mutex<Connection>,
    /// Fast lookup cache for per-profile experience text
    text_cache: DashMap<i64, String>,
    corpus_id: String,
}

impl ProfileStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let corpus_id = path.to_string_lossy().into_owned();

        tracing::info!("ProfileStore opened at: {}", path.display());
        Self::from_connection(conn, corpus_id)
    }

    /// Open an in-memory store (tests, scratch corpora)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, corpus_id: String) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            text_cache: DashMap::new(),
            corpus_id,
        })
    }

    /// Identity of this corpus, used for cache keying upstream
    pub fn corpus_id(&self) -> &str {
        &self.corpus_id
    }

    /// Create secondary indexes for fast structured lookups.
    /// Idempotent; run once after bulk ingestion.
    pub fn create_indexes(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE INDEX IF NOT EXISTS idx_educations_lawyear
                ON educations(year) WHERE is_law_degree = 1;
            CREATE INDEX IF NOT EXISTS idx_educations_school
                ON educations(school_normalized);
            CREATE INDEX IF NOT EXISTS idx_educations_profile
                ON educations(profile_id);
            CREATE INDEX IF NOT EXISTS idx_practices_type
                ON practices(practice_type);
            CREATE INDEX IF NOT EXISTS idx_practices_profile
                ON practices(profile_id);
            CREATE INDEX IF NOT EXISTS idx_industries_profile
                ON industries(profile_id);
            CREATE INDEX IF NOT EXISTS idx_regions_profile
                ON regions(profile_id);
            CREATE INDEX IF NOT EXISTS idx_languages_profile
                ON languages(profile_id);
            CREATE INDEX IF NOT EXISTS idx_profiles_title
                ON profiles(title);
            ",
        )?;
        tracing::info!("secondary indexes ready for corpus {}", self.corpus_id);
        Ok(())
    }

    /// Insert a profile record with all child rows. Returns the new id.
    pub fn add_profile(&self, record: &ProfileRecord) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO profiles
                (url, name, first_name, last_name, email, phone, title, office_location, clerkship)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.url,
                record.name,
                record.first_name,
                record.last_name,
                record.email,
                record.phone,
                record.title,
                record.office_location,
                record.clerkship,
            ],
        )?;
        let profile_id = tx.last_insert_rowid();

        if let Some(name) = &record.name {
            tx.execute(
                "INSERT INTO profiles_fts (rowid, full_name) VALUES (?1, ?2)",
                params![profile_id, name],
            )?;
        }

        for education in &record.educations {
            tx.execute(
                "INSERT INTO educations
                    (profile_id, degree_type, year, school_name, school_normalized,
                     is_law_degree, honors, full_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    profile_id,
                    education.degree_type,
                    education.year,
                    education.school_name,
                    education.school_normalized,
                    education.is_law_degree as i64,
                    education.honors,
                    education.full_text,
                ],
            )?;
        }
        for practice in &record.practices {
            tx.execute(
                "INSERT INTO practices (profile_id, practice_type) VALUES (?1, ?2)",
                params![profile_id, practice],
            )?;
        }
        for industry in &record.industries {
            tx.execute(
                "INSERT INTO industries (profile_id, industry) VALUES (?1, ?2)",
                params![profile_id, industry],
            )?;
        }
        for region in &record.regions {
            tx.execute(
                "INSERT INTO regions (profile_id, region) VALUES (?1, ?2)",
                params![profile_id, region],
            )?;
        }
        for language in &record.languages {
            tx.execute(
                "INSERT INTO languages (profile_id, language) VALUES (?1, ?2)",
                params![profile_id, language],
            )?;
        }

        tx.commit()?;
        Ok(profile_id)
    }

    /// Number of profiles in the corpus
    pub fn profile_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Display name of a profile, if it exists and has one
    pub fn display_name(&self, profile_id: i64) -> Option<String> {
        let conn = self.conn.lock();
        match conn
            .query_row(
                "SELECT name FROM profiles WHERE id = ?1",
                params![profile_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
        {
            Ok(name) => name.flatten(),
            Err(e) => {
                tracing::warn!("display_name lookup failed for {profile_id}: {e}");
                None
            }
        }
    }

    /// Source URL of a profile
    pub fn profile_url(&self, profile_id: i64) -> Option<String> {
        let conn = self.conn.lock();
        match conn
            .query_row(
                "SELECT url FROM profiles WHERE id = ?1",
                params![profile_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("profile_url lookup failed for {profile_id}: {e}");
                None
            }
        }
    }

    // ==========================================
    // Alias tables
    // ==========================================

    /// Register a school alias (e.g. "yale law school" -> "Yale")
    pub fn add_school_alias(&self, alias: &str, normalized: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO schools (normalized_name, alias) VALUES (?1, ?2)",
            params![normalized, alias],
        )?;
        Ok(())
    }

    /// Register a practice-area alias (e.g. "m&a" -> "Mergers & Acquisitions")
    pub fn add_practice_alias(&self, alias: &str, normalized: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO practice_aliases (normalized_name, alias) VALUES (?1, ?2)",
            params![normalized, alias],
        )?;
        Ok(())
    }

    /// Load the school alias table into memory
    pub fn school_aliases(&self) -> Result<AliasTable> {
        self.load_aliases("SELECT alias, normalized_name FROM schools WHERE alias IS NOT NULL")
    }

    /// Load the practice-area alias table into memory
    pub fn practice_aliases(&self) -> Result<AliasTable> {
        self.load_aliases(
            "SELECT alias, normalized_name FROM practice_aliases WHERE alias IS NOT NULL",
        )
    }

    fn load_aliases(&self, sql: &str) -> Result<AliasTable> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut table = AliasTable::new();
        for row in rows {
            let (alias, normalized) = row?;
            table.insert(alias, normalized);
        }
        Ok(table)
    }

    // ==========================================
    // Experience text and embeddings
    // ==========================================

    /// Upsert the cached experience text for a profile
    pub fn save_experience(&self, profile_id: i64, content: &str, parsed_text: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO experience_embeddings (profile_id, content, parsed_text)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(profile_id) DO UPDATE SET
                 content = excluded.content,
                 parsed_text = excluded.parsed_text",
            params![profile_id, content, parsed_text],
        )?;
        drop(conn);
        self.text_cache.remove(&profile_id);
        Ok(())
    }

    /// Upsert the embedding vector for a profile
    pub fn save_embedding(&self, profile_id: i64, vector: &[f32]) -> Result<()> {
        let blob = bincode::serialize(&vector.to_vec())?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO experience_embeddings (profile_id, embedding)
             VALUES (?1, ?2)
             ON CONFLICT(profile_id) DO UPDATE SET embedding = excluded.embedding",
            params![profile_id, blob],
        )?;
        Ok(())
    }

    /// Cached descriptive text for a profile (parsed text + experience
    /// content). None when the profile has no cached text yet.
    pub fn cached_text(&self, profile_id: i64) -> Option<String> {
        if let Some(cached) = self.text_cache.get(&profile_id) {
            return Some(cached.clone());
        }

        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT parsed_text, content FROM experience_embeddings WHERE profile_id = ?1",
                params![profile_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional();
        drop(conn);

        match row {
            Ok(Some((parsed, content))) => {
                let text = format!(
                    "{} {}",
                    parsed.unwrap_or_default(),
                    content.unwrap_or_default()
                );
                let text = text.trim().to_string();
                if text.is_empty() {
                    return None;
                }
                self.text_cache.insert(profile_id, text.clone());
                Some(text)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("cached_text lookup failed for {profile_id}: {e}");
                None
            }
        }
    }

    /// Number of profiles with a stored embedding vector
    pub fn embedding_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM experience_embeddings WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All stored (profile_id, vector) pairs. Vectors that fail to decode
    /// are skipped with a warning rather than failing the whole read.
    pub fn embedded_vectors(&self) -> Result<Vec<(i64, Vec<f32>)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT profile_id, embedding FROM experience_embeddings
             WHERE embedding IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut vectors = Vec::new();
        for row in rows {
            let (profile_id, blob) = row?;
            match bincode::deserialize::<Vec<f32>>(&blob) {
                Ok(vector) => vectors.push((profile_id, vector)),
                Err(e) => {
                    tracing::warn!("skipping undecodable vector for profile {profile_id}: {e}");
                }
            }
        }
        Ok(vectors)
    }

    // ==========================================
    // Query execution
    // ==========================================

    /// Execute a compiled query, optionally capped to `limit` rows
    pub fn execute(&self, query: &CompiledQuery, limit: Option<usize>) -> Result<Vec<ProfileRow>> {
        let sql = match limit {
            Some(n) => format!("{} LIMIT {n}", query.sql),
            None => query.sql.clone(),
        };
        tracing::debug!("executing: {sql}");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(query.params.iter()), |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                url: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Execution plan for a compiled query. Diagnostics only.
    pub fn explain(&self, query: &CompiledQuery) -> Result<String> {
        let sql = format!("EXPLAIN QUERY PLAN {}", query.sql);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(query.params.iter()), |row| {
            row.get::<_, String>(3)
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines.join("\n"))
    }

    /// Corpus statistics
    pub fn stats(&self) -> Result<serde_json::Value> {
        let profiles = self.profile_count()?;
        let embedded = self.embedding_count()?;
        let conn = self.conn.lock();
        let educations: i64 =
            conn.query_row("SELECT COUNT(*) FROM educations", [], |row| row.get(0))?;
        let practices: i64 =
            conn.query_row("SELECT COUNT(*) FROM practices", [], |row| row.get(0))?;

        Ok(serde_json::json!({
            "corpusId": self.corpus_id,
            "totalProfiles": profiles,
            "embeddedProfiles": embedded,
            "educations": educations,
            "practices": practices,
        }))
    }
}
