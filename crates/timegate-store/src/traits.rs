//! Store trait definitions

use timegate_api::TokenRecord;
use timegate_util::TokenId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
///
/// Each call reads or writes one consistent version of a token record;
/// callers never observe a half-applied update.
pub trait Store: Send + Sync {
    // Tokens

    /// Insert a new token record. Fails if the ID is taken.
    fn insert_token(&self, token: &TokenRecord) -> StoreResult<()>;

    /// Load a token record
    fn get_token(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>>;

    /// Replace an existing token record wholesale
    fn update_token(&self, token: &TokenRecord) -> StoreResult<()>;

    /// Overwrite only the serialized time-limit config of a token
    fn set_time_limit_config(&self, id: &TokenId, config: Option<&str>) -> StoreResult<()>;

    /// Overwrite only the time-limit flag of a token
    fn set_time_limit_enabled(&self, id: &TokenId, enabled: bool) -> StoreResult<()>;

    /// Delete a token record (and with it its time-limit config).
    /// Returns whether a record was removed.
    fn delete_token(&self, id: &TokenId) -> StoreResult<bool>;

    /// List all token records ordered by creation time
    fn list_tokens(&self) -> StoreResult<Vec<TokenRecord>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
