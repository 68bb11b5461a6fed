//! Access guard: store-backed time-limit administration and checks

use chrono::Utc;
use std::sync::Arc;
use timegate_api::{AccessDecision, TimeLimitConfig, TokenRecord};
use timegate_store::{AuditEvent, AuditEventType, Store};
use timegate_util::{Clock, TokenId};
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, TimeLimitError, TimeLimited};

/// Ties a token store and a clock to the time-limit rules.
///
/// The guard holds no mutable state of its own. Every update is validated
/// on a copy of the token record, and only the changed column is written
/// back, so concurrent rule and flag updates never clobber each other.
pub struct AccessGuard {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    audit_denials: bool,
}

impl AccessGuard {
    /// Create a new access guard
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            audit_denials: true,
        }
    }

    /// Whether time-window denials are written to the audit log
    pub fn with_audit_denials(mut self, enabled: bool) -> Self {
        self.audit_denials = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event, self.clock.now())) {
            warn!(error = %e, "Failed to append audit event");
        }
    }

    /// Create a token with time limits disabled and no rules
    pub fn create_token(&self, name: impl Into<String>) -> CoreResult<TokenRecord> {
        let token = TokenRecord::new(TokenId::generate(), name, self.clock.now().with_timezone(&Utc));
        self.store.insert_token(&token)?;

        info!(token_id = %token.id, name = %token.name, "Token created");
        self.audit(AuditEventType::TokenCreated {
            token_id: token.id.clone(),
            name: token.name.clone(),
        });
        Ok(token)
    }

    /// Delete a token; its time-limit config goes with it
    pub fn delete_token(&self, id: &TokenId) -> CoreResult<()> {
        if !self.store.delete_token(id)? {
            return Err(CoreError::TokenNotFound(id.clone()));
        }

        info!(token_id = %id, "Token deleted");
        self.audit(AuditEventType::TokenDeleted {
            token_id: id.clone(),
        });
        Ok(())
    }

    /// Load a token record
    pub fn token(&self, id: &TokenId) -> CoreResult<TokenRecord> {
        self.store
            .get_token(id)?
            .ok_or_else(|| CoreError::TokenNotFound(id.clone()))
    }

    /// Decode a token's rule set
    pub fn time_limit_config(&self, id: &TokenId) -> CoreResult<TimeLimitConfig> {
        Ok(self.token(id)?.get_time_limit_config()?)
    }

    /// Replace a token's rules. Nothing is persisted unless every rule is valid.
    pub fn update_time_limit(&self, id: &TokenId, config: &TimeLimitConfig) -> CoreResult<()> {
        let mut token = self.token(id)?;

        if let Err(e) = token.set_time_limit_config(config) {
            warn!(token_id = %id, error = %e, "Time-limit rules rejected");
            self.audit(AuditEventType::TimeLimitRejected {
                token_id: id.clone(),
                error: e.to_string(),
            });
            return Err(e.into());
        }

        self.store
            .set_time_limit_config(id, token.time_limit_config_raw())?;

        info!(token_id = %id, rule_count = config.len(), "Time-limit rules replaced");
        self.audit(AuditEventType::TimeLimitUpdated {
            token_id: id.clone(),
            rule_count: config.len(),
        });
        Ok(())
    }

    /// Switch time-limit enforcement on or off
    pub fn set_time_limit_enabled(&self, id: &TokenId, enabled: bool) -> CoreResult<()> {
        let token = self.token(id)?;
        if token.time_limit_enabled() == enabled {
            debug!(token_id = %id, enabled, "Time-limit flag unchanged");
            return Ok(());
        }

        self.store.set_time_limit_enabled(id, enabled)?;

        info!(token_id = %id, enabled, "Time-limit enforcement toggled");
        self.audit(AuditEventType::TimeLimitToggled {
            token_id: id.clone(),
            enabled,
        });
        Ok(())
    }

    /// Decide whether the token identified by `id` may be used now.
    ///
    /// An unknown token is an error, not a denial, so callers can keep
    /// "invalid token" apart from "outside permitted time window".
    pub fn authorize(&self, id: &TokenId) -> CoreResult<AccessDecision> {
        let token = self.token(id)?;
        Ok(self.authorize_token(&token)?)
    }

    /// Decide on an already-loaded token snapshot. This is the hot-path
    /// entry point for callers that resolved the token themselves.
    pub fn authorize_token(&self, token: &TokenRecord) -> Result<AccessDecision, TimeLimitError> {
        let decision = token.evaluate_time_limit(&*self.clock)?;

        if let AccessDecision::Denied { reason } = &decision {
            warn!(token_id = %token.id, code = reason.code(), "Access outside permitted time window");
            if self.audit_denials {
                self.audit(AuditEventType::AccessDenied {
                    token_id: token.id.clone(),
                    reason: reason.clone(),
                });
            }
        } else {
            debug!(token_id = %token.id, "Access within permitted time window");
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use timegate_api::{DenialReason, TimeLimitRule};
    use timegate_store::SqliteStore;
    use timegate_util::FixedClock;

    /// 2025-12-28 is a Sunday (weekday code 0)
    fn sunday_at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 12, 28, h, m, 0)
            .unwrap()
    }

    fn guard_at(instant: DateTime<FixedOffset>) -> (AccessGuard, Arc<FixedClock>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let clock = Arc::new(FixedClock::new(instant));
        (AccessGuard::new(store, clock.clone()), clock)
    }

    #[test]
    fn test_create_and_load_token() {
        let (guard, _) = guard_at(sunday_at(10, 0));
        let token = guard.create_token("ci").unwrap();

        let loaded = guard.token(&token.id).unwrap();
        assert_eq!(loaded.name, "ci");
        assert!(!loaded.time_limit_enabled);
        assert!(guard.time_limit_config(&token.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_token_is_error_not_denial() {
        let (guard, _) = guard_at(sunday_at(10, 0));
        let result = guard.authorize(&TokenId::new("nope"));
        assert!(matches!(result, Err(CoreError::TokenNotFound(_))));
    }

    #[test]
    fn test_update_and_authorize() {
        let (guard, clock) = guard_at(sunday_at(8, 0));
        let token = guard.create_token("ci").unwrap();

        guard
            .update_time_limit(
                &token.id,
                &TimeLimitConfig::new(vec![TimeLimitRule::new(0, "09:00", "10:00")]),
            )
            .unwrap();

        // Rules are stored but not enforced until enabled
        assert!(guard.authorize(&token.id).unwrap().is_allowed());

        guard.set_time_limit_enabled(&token.id, true).unwrap();
        let decision = guard.authorize(&token.id).unwrap();
        assert!(matches!(
            decision.denial(),
            Some(DenialReason::OutsideTimeWindow { weekday: 0, .. })
        ));

        clock.set(sunday_at(9, 30));
        assert!(guard.authorize(&token.id).unwrap().is_allowed());
    }

    #[test]
    fn test_rejected_update_keeps_stored_rules() {
        let (guard, _) = guard_at(sunday_at(8, 0));
        let token = guard.create_token("ci").unwrap();
        let original = TimeLimitConfig::new(vec![TimeLimitRule::every_day("09:00", "17:00")]);
        guard.update_time_limit(&token.id, &original).unwrap();

        let bad = TimeLimitConfig::new(vec![
            TimeLimitRule::every_day("08:00", "09:00"),
            TimeLimitRule::new(7, "08:00", "09:00"),
        ]);
        let err = guard.update_time_limit(&token.id, &bad).unwrap_err();
        assert!(matches!(err, CoreError::TimeLimit(TimeLimitError::InvalidRule { index: 1, .. })));

        assert_eq!(guard.time_limit_config(&token.id).unwrap(), original);

        let audits = guard.store().get_recent_audits(1).unwrap();
        assert!(matches!(audits[0].event, AuditEventType::TimeLimitRejected { .. }));
    }

    #[test]
    fn test_denials_are_audited() {
        let (guard, _) = guard_at(sunday_at(23, 0));
        let token = guard.create_token("ci").unwrap();
        guard
            .update_time_limit(
                &token.id,
                &TimeLimitConfig::new(vec![TimeLimitRule::every_day("09:00", "17:00")]),
            )
            .unwrap();
        guard.set_time_limit_enabled(&token.id, true).unwrap();

        assert!(!guard.authorize(&token.id).unwrap().is_allowed());

        let audits = guard.store().get_recent_audits(1).unwrap();
        assert!(matches!(audits[0].event, AuditEventType::AccessDenied { .. }));
        assert_eq!(audits[0].timestamp, sunday_at(23, 0));
    }

    #[test]
    fn test_denial_audit_can_be_disabled() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let clock = Arc::new(FixedClock::new(sunday_at(23, 0)));
        let guard = AccessGuard::new(store, clock).with_audit_denials(false);

        let mut token = guard.create_token("ci").unwrap();
        token.set_time_limit_enabled(true);
        token
            .set_time_limit_config(&TimeLimitConfig::new(vec![TimeLimitRule::every_day("09:00", "17:00")]))
            .unwrap();

        assert!(!guard.authorize_token(&token).unwrap().is_allowed());

        let audits = guard.store().get_recent_audits(10).unwrap();
        assert!(audits.iter().all(|a| !matches!(a.event, AuditEventType::AccessDenied { .. })));
    }

    #[test]
    fn test_corrupt_config_surfaces_as_error() {
        let (guard, _) = guard_at(sunday_at(12, 0));
        let mut token = guard.create_token("ci").unwrap();
        token.time_limit_enabled = true;
        token.time_limit_config = Some("[[[".into());
        guard.store().update_token(&token).unwrap();

        match guard.authorize(&token.id) {
            Err(CoreError::TimeLimit(e)) => {
                assert_eq!(e.kind(), crate::TimeLimitErrorKind::ConfigCorrupt)
            }
            other => panic!("expected corrupt config error, got {:?}", other),
        }
    }

    #[test]
    fn test_toggle_is_idempotent() {
        let (guard, _) = guard_at(sunday_at(12, 0));
        let token = guard.create_token("ci").unwrap();

        guard.set_time_limit_enabled(&token.id, true).unwrap();
        guard.set_time_limit_enabled(&token.id, true).unwrap();

        let toggles = guard
            .store()
            .get_recent_audits(10)
            .unwrap()
            .into_iter()
            .filter(|a| matches!(a.event, AuditEventType::TimeLimitToggled { .. }))
            .count();
        assert_eq!(toggles, 1);
    }

    /// Flips the time-limit flag on the first read, as another admin
    /// request landing between a read and a write would.
    struct EnableOnFirstRead {
        inner: SqliteStore,
        fired: std::sync::atomic::AtomicBool,
    }

    impl Store for EnableOnFirstRead {
        fn insert_token(&self, token: &TokenRecord) -> timegate_store::StoreResult<()> {
            self.inner.insert_token(token)
        }

        fn get_token(&self, id: &TokenId) -> timegate_store::StoreResult<Option<TokenRecord>> {
            let token = self.inner.get_token(id)?;
            if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.inner.set_time_limit_enabled(id, true)?;
            }
            Ok(token)
        }

        fn update_token(&self, token: &TokenRecord) -> timegate_store::StoreResult<()> {
            self.inner.update_token(token)
        }

        fn set_time_limit_config(
            &self,
            id: &TokenId,
            config: Option<&str>,
        ) -> timegate_store::StoreResult<()> {
            self.inner.set_time_limit_config(id, config)
        }

        fn set_time_limit_enabled(&self, id: &TokenId, enabled: bool) -> timegate_store::StoreResult<()> {
            self.inner.set_time_limit_enabled(id, enabled)
        }

        fn delete_token(&self, id: &TokenId) -> timegate_store::StoreResult<bool> {
            self.inner.delete_token(id)
        }

        fn list_tokens(&self) -> timegate_store::StoreResult<Vec<TokenRecord>> {
            self.inner.list_tokens()
        }

        fn append_audit(&self, event: AuditEvent) -> timegate_store::StoreResult<()> {
            self.inner.append_audit(event)
        }

        fn get_recent_audits(&self, limit: usize) -> timegate_store::StoreResult<Vec<AuditEvent>> {
            self.inner.get_recent_audits(limit)
        }

        fn is_healthy(&self) -> bool {
            self.inner.is_healthy()
        }
    }

    #[test]
    fn test_rule_update_keeps_concurrent_enable() {
        let inner = SqliteStore::in_memory().unwrap();
        let token = TokenRecord::new(TokenId::new("tok"), "ci", sunday_at(8, 0).with_timezone(&Utc));
        inner.insert_token(&token).unwrap();

        let store = Arc::new(EnableOnFirstRead {
            inner,
            fired: std::sync::atomic::AtomicBool::new(false),
        });
        let guard = AccessGuard::new(store, Arc::new(FixedClock::new(sunday_at(8, 0))));

        let config = TimeLimitConfig::new(vec![TimeLimitRule::new(0, "09:00", "10:00")]);
        guard.update_time_limit(&token.id, &config).unwrap();

        let stored = guard.token(&token.id).unwrap();
        assert!(stored.time_limit_enabled);
        assert_eq!(stored.get_time_limit_config().unwrap(), config);
        assert!(!guard.authorize(&token.id).unwrap().is_allowed());
    }

    #[test]
    fn test_delete_token() {
        let (guard, _) = guard_at(sunday_at(12, 0));
        let token = guard.create_token("ci").unwrap();

        guard.delete_token(&token.id).unwrap();
        assert!(matches!(guard.token(&token.id), Err(CoreError::TokenNotFound(_))));
        assert!(matches!(guard.delete_token(&token.id), Err(CoreError::TokenNotFound(_))));
    }
}
