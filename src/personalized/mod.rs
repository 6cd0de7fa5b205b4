//! Personalized challenges.
//!
//! Generated challenge sets are cached per user and reused while the
//! user's profile and footprint stay close to what the set was generated for.

pub mod cache;
pub mod client;
pub mod fingerprint;
pub mod parser;
pub mod types;

pub use cache::PersonalizedChallengeCache;
pub use client::{ChallengeGenerator, GenerativeClient};
pub use fingerprint::{check_entry, fingerprint, CacheValidity};
pub use types::{ChallengeCacheEntry, ChallengeSource, GenerationError, PersonalizedChallenges};
