//! Personalized challenge cache.
//!
//! Serves a user's generated challenge set while it is still valid, and
//! regenerates it otherwise. Generation failures never reach the caller: the
//! static fallback set is served instead and the cache is left untouched.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::client::ChallengeGenerator;
use super::fingerprint::{check_entry, fingerprint, CacheValidity};
use super::parser::{parse_challenges, MAX_GENERATED};
use super::types::{ChallengeCacheEntry, GenerationError, PersonalizedChallenges};
use crate::carbon::types::{ActivityRecord, LifestyleProfile};
use crate::challenges::types::ChallengeDefinition;
use crate::storage::config::{CacheSettings, GeneratorSettings};
use crate::storage::{ActivityStore, CacheStore};

/// Personalized challenge cache over a store and a generator.
pub struct PersonalizedChallengeCache<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
    settings: CacheSettings,
    /// Budget for one generation attempt
    attempt_timeout: Duration,
    /// Attempts after the first
    max_retries: u32,
}

impl<S, G> PersonalizedChallengeCache<S, G>
where
    S: CacheStore + ActivityStore,
    G: ChallengeGenerator,
{
    pub fn new(
        store: Arc<S>,
        generator: Arc<G>,
        settings: CacheSettings,
        generator_settings: &GeneratorSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
            attempt_timeout: generator_settings.timeout(),
            max_retries: generator_settings.max_retries,
        }
    }

    /// Challenges for a user, from the cache when it is still valid.
    pub async fn get_challenges(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
        footprint: f64,
    ) -> PersonalizedChallenges {
        self.get_challenges_at(user_id, profile, footprint, Utc::now())
            .await
    }

    /// [`Self::get_challenges`] evaluated at `now`.
    pub async fn get_challenges_at(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
        footprint: f64,
        now: DateTime<Utc>,
    ) -> PersonalizedChallenges {
        let current = fingerprint(profile, footprint);

        let entry = match self.store.get_cache_entry(user_id).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Challenge cache read failed for {}: {}", user_id, e);
                None
            }
        };

        let validity = check_entry(
            entry.as_ref(),
            &current,
            footprint,
            self.settings.drift_tolerance,
            now,
        );

        match (validity, entry) {
            (CacheValidity::Valid, Some(entry)) => {
                tracing::debug!("Challenge cache hit for {}", user_id);
                PersonalizedChallenges::cached(&entry, now)
            }
            (validity, _) => {
                tracing::debug!("Challenge cache miss for {}: {:?}", user_id, validity);
                self.regenerate_at(user_id, profile, footprint, now).await
            }
        }
    }

    /// Regenerate regardless of the cache.
    pub async fn refresh(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
        footprint: f64,
    ) -> PersonalizedChallenges {
        self.regenerate_at(user_id, profile, footprint, Utc::now())
            .await
    }

    async fn regenerate_at(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
        footprint: f64,
        now: DateTime<Utc>,
    ) -> PersonalizedChallenges {
        match self.generate(user_id, profile, footprint, now).await {
            Ok(challenges) => {
                let entry = ChallengeCacheEntry {
                    user_id,
                    challenges,
                    fingerprint: fingerprint(profile, footprint),
                    footprint_snapshot: footprint,
                    generated_at: now,
                    expires_at: now + chrono::Duration::days(self.settings.ttl_days),
                };

                if let Err(e) = self.store.put_cache_entry(&entry).await {
                    tracing::warn!("Failed to cache challenges for {}: {}", user_id, e);
                }
                match self.store.increment_generation_count(user_id).await {
                    Ok(count) => tracing::info!(
                        "Generated {} challenges for {} (generation #{})",
                        entry.challenges.len(),
                        user_id,
                        count
                    ),
                    Err(e) => tracing::warn!("Failed to count generation for {}: {}", user_id, e),
                }

                PersonalizedChallenges::generated(entry.challenges)
            }
            Err(e) => {
                tracing::warn!("Challenge generation failed for {}, serving fallback: {}", user_id, e);
                PersonalizedChallenges::fallback()
            }
        }
    }

    async fn generate(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
        footprint: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChallengeDefinition>, GenerationError> {
        let today = now.date_naive();
        let from = today - chrono::Duration::days(self.settings.history_days.max(1) - 1);
        let history = self.store.activities_between(user_id, from, today).await?;

        let prompt = build_prompt(profile, footprint, &history);
        let response = self.generate_with_retry(&prompt).await?;
        parse_challenges(&response)
    }

    /// One attempt plus up to `max_retries` more, each under the timeout.
    async fn generate_with_retry(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(
                self.attempt_timeout,
                self.generator.generate(prompt),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(self.attempt_timeout.as_secs())),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!("Generation attempt {} failed, retrying: {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Prompt describing the user and the payload shape expected back.
pub fn build_prompt(
    profile: &LifestyleProfile,
    footprint: f64,
    history: &[ActivityRecord],
) -> String {
    fn field<T: std::fmt::Display>(value: Option<T>) -> String {
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "not given".to_string())
    }

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Suggest up to {} short eco challenges for this person.",
        MAX_GENERATED
    );
    let _ = writeln!(prompt, "\nProfile:");
    let _ = writeln!(prompt, "- transport: {}", field(profile.transport_mode));
    let _ = writeln!(prompt, "- commute distance: {}", field(profile.commute_distance));
    let _ = writeln!(prompt, "- diet: {}", field(profile.diet_choice));
    let _ = writeln!(prompt, "- AC use: {}", field(profile.ac_hours));
    let _ = writeln!(prompt, "- screen time: {}", field(profile.screen_time));
    let _ = writeln!(prompt, "- waste: {}", field(profile.waste));
    let _ = writeln!(prompt, "\nDaily footprint: {:.2} kg CO2e", footprint);

    if history.is_empty() {
        let _ = writeln!(prompt, "\nNo activity logged in the last few days.");
    } else {
        let _ = writeln!(prompt, "\nRecent days (kg CO2e):");
        for record in history {
            let b = &record.breakdown;
            let _ = writeln!(
                prompt,
                "- {}: total {:.2} (transport {:.2}, diet {:.2}, electricity {:.2}, lifestyle {:.2})",
                record.date, b.total, b.transport, b.diet, b.electricity, b.lifestyle
            );
        }
    }

    let _ = writeln!(
        prompt,
        "\nRespond with a JSON array only. Each item looks like:\n{}",
        SCHEMA_EXAMPLE
    );
    let _ = writeln!(
        prompt,
        "Allowed criteria: diet (choice, max_meat_percent, min_plant_percent, max_ordered_meals), \
         transport (mode: cycling|walking|public|electric|carpool|work_from_home|green, min_reduction_percent), \
         electricity (max_emission, max_ac_hours, min_unplugged_devices, min_reduction_percent), \
         lifestyle (daily_logging, waste_managed), water (max_emission, max_shower_minutes)."
    );
    prompt
}

const SCHEMA_EXAMPLE: &str = r#"{"title": "Bus Commute", "description": "Take public transport to work.", "criteria": {"type": "transport", "rule": {"kind": "mode", "target": "public"}}, "duration_days": 3, "reward": {"points": 60, "badge": null}}"#;
