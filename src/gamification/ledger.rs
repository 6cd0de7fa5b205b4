//! Gamification ledger: points, level and badges per user.

use std::sync::Arc;

use uuid::Uuid;

use super::types::{CreditOutcome, GamificationProfile, LedgerDelta};
use crate::storage::{LedgerStore, StorageError};

/// Ledger facade over a [`LedgerStore`].
///
/// All writes are additive: points are incremented in place and badges are
/// inserted only if absent, so a streak bonus and a challenge reward landing
/// at the same moment both survive.
pub struct GamificationLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for GamificationLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> GamificationLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read a profile; users without one get the zero state.
    pub async fn read(&self, user_id: Uuid) -> Result<GamificationProfile, StorageError> {
        self.store.read_profile(user_id).await
    }

    /// Apply an additive delta.
    pub async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
    ) -> Result<GamificationProfile, StorageError> {
        if delta.is_empty() {
            return self.store.read_profile(user_id).await;
        }

        let profile = self.store.apply_delta(user_id, delta).await?;
        tracing::debug!(
            "Ledger {}: +{} points, badges {:?} -> {} points (level {})",
            user_id,
            delta.points,
            delta.badges,
            profile.eco_points,
            profile.level()
        );
        Ok(profile)
    }

    /// Apply a delta at most once per `credit_key`.
    pub async fn credit_once(
        &self,
        user_id: Uuid,
        credit_key: &str,
        delta: &LedgerDelta,
    ) -> Result<CreditOutcome, StorageError> {
        let outcome = self.store.apply_delta_once(user_id, credit_key, delta).await?;
        if outcome.applied {
            tracing::debug!("Credited {} to {}: +{} points", credit_key, user_id, delta.points);
        } else {
            tracing::debug!("Credit {} already applied for {}", credit_key, user_id);
        }
        Ok(outcome)
    }

    pub async fn is_credited(&self, user_id: Uuid, credit_key: &str) -> Result<bool, StorageError> {
        self.store.has_credit(user_id, credit_key).await
    }
}
