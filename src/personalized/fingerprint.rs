//! Cache fingerprints and validity checks.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::types::ChallengeCacheEntry;
use crate::carbon::types::LifestyleProfile;

/// Stable hash over the inputs that shape a generated challenge set: the
/// profile's transport, diet, electricity and lifestyle answers plus the
/// footprint rounded to the nearest kilogram.
pub fn fingerprint(profile: &LifestyleProfile, footprint: f64) -> String {
    fn field<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    }

    let canonical = format!(
        "transport={};distance={};diet={};ac={};screen={};waste={};footprint={}",
        field(profile.transport_mode),
        field(profile.commute_distance),
        field(profile.diet_choice),
        field(profile.ac_hours),
        field(profile.screen_time),
        field(profile.waste),
        footprint.round() as i64,
    );

    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Outcome of checking a cache entry against the current inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheValidity {
    Valid,
    Missing,
    Expired,
    FingerprintChanged,
    /// Footprint moved further than the tolerance allows
    FootprintDrift { drift: f64 },
}

impl CacheValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, CacheValidity::Valid)
    }
}

/// Check an entry. All three conditions must hold for a hit: unexpired,
/// fingerprint match, and a footprint within `tolerance` of the snapshot the
/// set was generated for (`|snapshot - footprint| <= tolerance * snapshot`).
pub fn check_entry(
    entry: Option<&ChallengeCacheEntry>,
    fingerprint: &str,
    footprint: f64,
    drift_tolerance: f64,
    now: DateTime<Utc>,
) -> CacheValidity {
    let Some(entry) = entry else {
        return CacheValidity::Missing;
    };

    if entry.is_expired_at(now) {
        return CacheValidity::Expired;
    }

    if entry.fingerprint != fingerprint {
        return CacheValidity::FingerprintChanged;
    }

    let drift = (entry.footprint_snapshot - footprint).abs();
    if drift > drift_tolerance * entry.footprint_snapshot.abs() {
        return CacheValidity::FootprintDrift { drift };
    }

    CacheValidity::Valid
}
