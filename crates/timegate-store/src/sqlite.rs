//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use timegate_api::TokenRecord;
use timegate_util::TokenId;
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Token records; time_limit_config is opaque JSON
            CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                time_limit_enabled INTEGER NOT NULL DEFAULT 0,
                time_limit_config TEXT,
                created_at TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_tokens_created ON tokens(created_at);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

const TOKEN_COLUMNS: &str = "id, name, time_limit_enabled, time_limit_config, created_at";

/// Columns of one `tokens` row, in `TOKEN_COLUMNS` order
type TokenRow = (String, String, bool, Option<String>, String);

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<TokenRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn build_token(
    (id, name, time_limit_enabled, time_limit_config, created_at): TokenRow,
) -> StoreResult<TokenRecord> {
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("token {}: created_at: {}", id, e)))?;

    Ok(TokenRecord {
        id: TokenId::new(id),
        name,
        time_limit_enabled,
        time_limit_config,
        created_at,
    })
}

impl Store for SqliteStore {
    fn insert_token(&self, token: &TokenRecord) -> StoreResult<()> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            r#"
            INSERT INTO tokens (id, name, time_limit_enabled, time_limit_config, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
            params![
                token.id.as_str(),
                token.name,
                token.time_limit_enabled,
                token.time_limit_config,
                token.created_at.to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(token.id.to_string()));
        }

        debug!(token_id = %token.id, "Token inserted");
        Ok(())
    }

    fn get_token(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM tokens WHERE id = ?", TOKEN_COLUMNS),
                [id.as_str()],
                token_from_row,
            )
            .optional()?;

        row.map(build_token).transpose()
    }

    fn update_token(&self, token: &TokenRecord) -> StoreResult<()> {
        let conn = self.lock()?;

        let updated = conn.execute(
            r#"
            UPDATE tokens
            SET name = ?, time_limit_enabled = ?, time_limit_config = ?
            WHERE id = ?
            "#,
            params![
                token.name,
                token.time_limit_enabled,
                token.time_limit_config,
                token.id.as_str(),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(token.id.to_string()));
        }

        debug!(
            token_id = %token.id,
            time_limit_enabled = token.time_limit_enabled,
            "Token updated"
        );
        Ok(())
    }

    fn set_time_limit_config(&self, id: &TokenId, config: Option<&str>) -> StoreResult<()> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE tokens SET time_limit_config = ? WHERE id = ?",
            params![config, id.as_str()],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(token_id = %id, "Time-limit config written");
        Ok(())
    }

    fn set_time_limit_enabled(&self, id: &TokenId, enabled: bool) -> StoreResult<()> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE tokens SET time_limit_enabled = ? WHERE id = ?",
            params![enabled, id.as_str()],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(token_id = %id, enabled, "Time-limit flag written");
        Ok(())
    }

    fn delete_token(&self, id: &TokenId) -> StoreResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tokens WHERE id = ?", [id.as_str()])?;
        Ok(deleted > 0)
    }

    fn list_tokens(&self) -> StoreResult<Vec<TokenRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tokens ORDER BY created_at, id",
            TOKEN_COLUMNS
        ))?;
        let rows = stmt.query_map([], token_from_row)?;

        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(build_token(row?)?);
        }
        Ok(tokens)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| StoreError::Serialization(format!("audit {}: {}", id, e)))?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn record(id: &str) -> TokenRecord {
        TokenRecord::new(
            TokenId::new(id),
            format!("{} token", id),
            Utc.with_ymd_and_hms(2025, 12, 25, 9, 0, 0).unwrap(),
        )
    }

    fn timestamp() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 12, 25, 10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_token_insert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let mut token = record("tok-1");
        token.time_limit_enabled = true;
        token.time_limit_config = Some(r#"{"rules":[]}"#.into());

        store.insert_token(&token).unwrap();
        let loaded = store.get_token(&token.id).unwrap().unwrap();
        assert_eq!(loaded, token);

        assert!(store.get_token(&TokenId::new("missing")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_token(&record("tok-1")).unwrap();

        let result = store.insert_token(&record("tok-1"));
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn test_update_replaces_config() {
        let store = SqliteStore::in_memory().unwrap();
        let mut token = record("tok-1");
        store.insert_token(&token).unwrap();

        token.time_limit_enabled = true;
        token.time_limit_config = Some("opaque".into());
        store.update_token(&token).unwrap();

        let loaded = store.get_token(&token.id).unwrap().unwrap();
        assert!(loaded.time_limit_enabled);
        assert_eq!(loaded.time_limit_config.as_deref(), Some("opaque"));
    }

    #[test]
    fn test_update_missing_token() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.update_token(&record("ghost"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_column_writes_leave_other_fields_alone() {
        let store = SqliteStore::in_memory().unwrap();
        let token = record("tok-1");
        store.insert_token(&token).unwrap();

        store.set_time_limit_enabled(&token.id, true).unwrap();
        store
            .set_time_limit_config(&token.id, Some(r#"{"rules":[]}"#))
            .unwrap();

        let loaded = store.get_token(&token.id).unwrap().unwrap();
        assert!(loaded.time_limit_enabled);
        assert_eq!(loaded.time_limit_config.as_deref(), Some(r#"{"rules":[]}"#));
        assert_eq!(loaded.name, token.name);

        store.set_time_limit_config(&token.id, None).unwrap();
        let loaded = store.get_token(&token.id).unwrap().unwrap();
        assert!(loaded.time_limit_enabled);
        assert!(loaded.time_limit_config.is_none());

        let ghost = TokenId::new("ghost");
        assert!(matches!(
            store.set_time_limit_enabled(&ghost, true),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_time_limit_config(&ghost, None),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_and_list() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_token(&record("a")).unwrap();
        store.insert_token(&record("b")).unwrap();

        assert_eq!(store.list_tokens().unwrap().len(), 2);
        assert!(store.delete_token(&TokenId::new("a")).unwrap());
        assert!(!store.delete_token(&TokenId::new("a")).unwrap());

        let remaining = store.list_tokens().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_str(), "b");
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        let event = AuditEvent::new(
            AuditEventType::TimeLimitUpdated {
                token_id: TokenId::new("tok-1"),
                rule_count: 2,
            },
            timestamp(),
        );
        store.append_audit(event).unwrap();
        store
            .append_audit(AuditEvent::new(
                AuditEventType::TokenDeleted {
                    token_id: TokenId::new("tok-1"),
                },
                timestamp(),
            ))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::TokenDeleted { .. }));
        assert!(matches!(
            events[1].event,
            AuditEventType::TimeLimitUpdated { rule_count: 2, .. }
        ));
        assert_eq!(events[1].timestamp, timestamp());

        assert_eq!(store.get_recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timegate.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_token(&record("persisted")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_token(&TokenId::new("persisted")).unwrap().is_some());
    }
}
