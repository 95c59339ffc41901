//! `SQLite` persistence for agents.
//!
//! Each [`Agent`] is serialised to JSON and stored as a BLOB keyed by its id.
//! A small key/value table carries world-level metadata such as the clock.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS agents (
//!     agent_id   TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! CREATE TABLE IF NOT EXISTS world_meta (
//!     key   TEXT PRIMARY KEY,
//!     value TEXT NOT NULL
//! );
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::PersistenceConfig;
use crate::error::{ReynardError, Result};
use crate::types::AgentId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS agents (
        agent_id   TEXT PRIMARY KEY,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        checksum   TEXT
    );
    CREATE TABLE IF NOT EXISTS world_meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );";

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32(data))
}

/// CRC-32 (ISO 3309 polynomial, reflected).
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

/// An open `SQLite` store of agents.
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Agent store opened");

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) an agent.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Serialization`] if encoding fails, or
    /// [`ReynardError::Database`] on `SQLite` failures.
    pub fn save_agent(&self, agent: &Agent) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(agent).map_err(|e| ReynardError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));

        self.conn.execute(
            "INSERT INTO agents (agent_id, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(agent_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![agent.id.0.to_string(), json, Utc::now().to_rfc3339(), checksum],
        )?;

        debug!(
            agent = %agent.id,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved agent"
        );
        Ok(())
    }

    /// Save many agents in one transaction.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing is committed in that case.
    pub fn save_agents<'a>(&mut self, agents: impl IntoIterator<Item = &'a Agent>) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut saved = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO agents (agent_id, data, updated_at, checksum)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(agent_id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at,
                    checksum = excluded.checksum",
            )?;
            let now = Utc::now().to_rfc3339();
            for agent in agents {
                let json = serde_json::to_vec(agent)
                    .map_err(|e| ReynardError::Serialization(e.to_string()))?;
                let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
                stmt.execute(params![agent.id.0.to_string(), json, now, checksum])?;
                saved += 1;
            }
        }
        tx.commit()?;
        debug!(agents = saved, "Saved agent batch");
        Ok(saved)
    }

    /// Load an agent. `None` if no row exists.
    ///
    /// A checksum mismatch is logged and the data is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Serialization`] if decoding fails, or
    /// [`ReynardError::Database`] on `SQLite` failures.
    pub fn load_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM agents WHERE agent_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![agent_id.0.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };
        self.verify_checksum(agent_id, &data, stored_checksum.as_deref());

        let agent: Agent =
            serde_json::from_slice(&data).map_err(|e| ReynardError::Serialization(e.to_string()))?;
        Ok(Some(agent))
    }

    /// Load every stored agent.
    ///
    /// # Errors
    ///
    /// Returns the first decoding or database failure.
    pub fn load_all(&self) -> Result<Vec<Agent>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT agent_id, data, checksum FROM agents ORDER BY agent_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut agents = Vec::new();
        for row in rows {
            let (id_str, data, checksum) = row?;
            let Ok(uuid) = uuid::Uuid::parse_str(&id_str) else {
                warn!(id = %id_str, "Skipping row with invalid UUID");
                continue;
            };
            self.verify_checksum(&AgentId(uuid), &data, checksum.as_deref());
            let agent: Agent = serde_json::from_slice(&data)
                .map_err(|e| ReynardError::Serialization(e.to_string()))?;
            agents.push(agent);
        }
        Ok(agents)
    }

    fn verify_checksum(&self, agent_id: &AgentId, data: &[u8], stored: Option<&str>) {
        if !self.config.checksum_enabled {
            return;
        }
        if let Some(expected) = stored {
            let actual = crc32_hex(data);
            if expected != actual {
                warn!(
                    agent = %agent_id,
                    expected = %expected,
                    actual = %actual,
                    "Checksum mismatch, stored agent may be corrupt"
                );
            }
        }
    }

    /// Delete an agent. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn delete_agent(&self, agent_id: &AgentId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM agents WHERE agent_id = ?1",
            params![agent_id.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Ids of every stored agent.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn list_agents(&self) -> Result<Vec<AgentId>> {
        let mut stmt = self.conn.prepare_cached("SELECT agent_id FROM agents")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            let id_str = row?;
            match uuid::Uuid::parse_str(&id_str) {
                Ok(uuid) => ids.push(AgentId(uuid)),
                Err(_) => warn!(id = %id_str, "Skipping row with invalid UUID"),
            }
        }
        Ok(ids)
    }

    /// Number of stored agents.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn agent_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // World metadata
    // ------------------------------------------------------------------

    /// Store a metadata value.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO world_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a metadata value.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM world_meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with `SQLite`'s online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] on `SQLite` failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Agent store backup completed"
        );
        Ok(())
    }

    /// Write `<db>.bak.1`, shifting older backups up and keeping at most
    /// `backup_count` of them. A no-op for in-memory databases.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] or [`ReynardError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        let max = self.config.backup_count;
        if max == 0 || self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }
        let oldest = self.backup_path(max);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for i in (1..max).rev() {
            let src = self.backup_path(i);
            if src.exists() {
                std::fs::rename(&src, self.backup_path(i + 1))?;
            }
        }
        self.backup(self.backup_path(1))
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut name = self.db_path.as_os_str().to_owned();
        name.push(format!(".bak.{n}"));
        PathBuf::from(name)
    }

    /// Path to the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`. `Ok(true)` means healthy.
    ///
    /// # Errors
    ///
    /// Returns [`ReynardError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReynardConfig;
    use crate::memory::{Memory, MemoryType};
    use crate::types::{PersonalityTraits, Position, SimTime};

    fn sample_agent() -> Agent {
        let mut agent = Agent::new(
            "Tod",
            Position::new(4.0, 2.0),
            PersonalityTraits::default(),
            &ReynardConfig::default(),
        );
        if let Some(memory) = agent.memory.as_mut() {
            memory.store(Memory::new(
                MemoryType::Episodic,
                "Found a warren by the river",
                0.7,
                0.4,
                SimTime::at(12.0),
            ));
        }
        agent
    }

    fn engine() -> PersistenceEngine {
        PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    #[test]
    fn save_then_load() {
        let engine = engine();
        let agent = sample_agent();
        engine.save_agent(&agent).expect("save");

        let loaded = engine.load_agent(&agent.id).expect("load").expect("Some");
        assert_eq!(loaded.name, "Tod");
        let memories = loaded.memory.expect("memory component");
        assert_eq!(memories.len(), 1);
        assert_eq!(memories.total_memories_created, 1);
    }

    #[test]
    fn missing_agent_is_none() {
        assert!(engine().load_agent(&AgentId::new()).expect("load").is_none());
    }

    #[test]
    fn upsert_overwrites() {
        let engine = engine();
        let mut agent = sample_agent();
        engine.save_agent(&agent).expect("save");
        agent.name = "Tod the Elder".to_string();
        engine.save_agent(&agent).expect("save again");
        assert_eq!(engine.agent_count().expect("count"), 1);
        let loaded = engine.load_agent(&agent.id).expect("load").expect("Some");
        assert_eq!(loaded.name, "Tod the Elder");
    }

    #[test]
    fn batch_save_list_delete() {
        let mut engine = engine();
        let agents = vec![sample_agent(), sample_agent(), sample_agent()];
        assert_eq!(engine.save_agents(&agents).expect("batch"), 3);
        assert_eq!(engine.list_agents().expect("list").len(), 3);
        assert_eq!(engine.load_all().expect("all").len(), 3);

        assert!(engine.delete_agent(&agents[0].id).expect("delete"));
        assert!(!engine.delete_agent(&agents[0].id).expect("delete again"));
        assert_eq!(engine.agent_count().expect("count"), 2);
    }

    #[test]
    fn meta_round_trip() {
        let engine = engine();
        assert!(engine.get_meta("clock").expect("get").is_none());
        engine.set_meta("clock", "42.5").expect("set");
        engine.set_meta("clock", "43.5").expect("overwrite");
        assert_eq!(engine.get_meta("clock").expect("get").as_deref(), Some("43.5"));
    }

    #[test]
    fn file_store_backup_and_integrity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("world.db");
        let engine = PersistenceEngine::open(&path, &PersistenceConfig::default()).expect("open");
        engine.save_agent(&sample_agent()).expect("save");
        assert!(engine.integrity_check().expect("check"));

        engine.create_rotating_backup().expect("backup 1");
        engine.create_rotating_backup().expect("backup 2");
        assert!(dir.path().join("world.db.bak.1").exists());
        assert!(dir.path().join("world.db.bak.2").exists());

        let restored =
            PersistenceEngine::open(dir.path().join("world.db.bak.1"), &PersistenceConfig::default())
                .expect("open backup");
        assert_eq!(restored.agent_count().expect("count"), 1);
    }

    #[test]
    fn checksum_is_stable() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }
}
