//! Audit event types

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use timegate_api::DenialReason;
use timegate_util::TokenId;

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Token record created
    TokenCreated { token_id: TokenId, name: String },

    /// Token record deleted
    TokenDeleted { token_id: TokenId },

    /// Time-limit rules replaced
    TimeLimitUpdated { token_id: TokenId, rule_count: usize },

    /// Time-limit rules rejected by validation; nothing was persisted
    TimeLimitRejected { token_id: TokenId, error: String },

    /// Time-limit enforcement switched on or off
    TimeLimitToggled { token_id: TokenId, enabled: bool },

    /// Access refused outside the permitted time window
    AccessDenied {
        token_id: TokenId,
        reason: DenialReason,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<FixedOffset>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
