//! Parsing of generative service responses.
//!
//! The service answers in free text that is expected to embed a JSON payload,
//! either a bare array of challenges or an object with a `challenges` array,
//! possibly inside a fenced code block and surrounded by prose.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::types::GenerationError;
use crate::challenges::types::{
    ChallengeCriteria, ChallengeDefinition, DietCriteria, Reward, TransportCriteria,
};

/// Most challenges kept from one response.
pub const MAX_GENERATED: usize = 8;

/// Points granted when the response omits a reward.
const DEFAULT_REWARD_POINTS: u32 = 30;

/// Prefix for every generated challenge id.
pub const GENERATED_ID_PREFIX: &str = "ai_";

#[derive(Debug, Deserialize)]
struct GeneratedChallenge {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    criteria: ChallengeCriteria,
    #[serde(default)]
    duration_days: Option<u32>,
    #[serde(default)]
    reward: Option<Reward>,
}

/// Extract challenge definitions from a response.
///
/// Individual malformed entries are skipped; a response with no usable entry
/// at all is [`GenerationError::Malformed`].
pub fn parse_challenges(response: &str) -> Result<Vec<ChallengeDefinition>, GenerationError> {
    let items = candidates(response)
        .into_iter()
        .find_map(|candidate| challenge_array(&candidate))
        .ok_or_else(|| GenerationError::Malformed("no challenge payload found".to_string()))?;

    let mut seen = HashSet::new();
    let mut challenges = Vec::new();

    for item in items {
        let generated: GeneratedChallenge = match serde_json::from_value(item) {
            Ok(generated) => generated,
            Err(e) => {
                tracing::debug!("Skipping malformed generated challenge: {}", e);
                continue;
            }
        };

        if !is_satisfiable(&generated.criteria) {
            tracing::debug!("Skipping unsatisfiable generated challenge '{}'", generated.title);
            continue;
        }

        // Generated ids are always prefixed, apart from catalog ids
        let name = generated
            .id
            .as_deref()
            .map(slug)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slug(&generated.title));
        let base = if name.starts_with(GENERATED_ID_PREFIX) {
            name
        } else {
            format!("{}{}", GENERATED_ID_PREFIX, name)
        };
        let id = unique_id(&base, &mut seen);

        challenges.push(ChallengeDefinition {
            id,
            title: generated.title.trim().to_string(),
            description: generated.description.trim().to_string(),
            criteria: generated.criteria,
            duration_days: generated.duration_days.unwrap_or(1).clamp(1, 30),
            reward: generated.reward.unwrap_or(Reward {
                points: DEFAULT_REWARD_POINTS,
                badge: None,
            }),
        });

        if challenges.len() == MAX_GENERATED {
            break;
        }
    }

    if challenges.is_empty() {
        return Err(GenerationError::Malformed(
            "response contained no valid challenges".to_string(),
        ));
    }
    Ok(challenges)
}

/// Text spans that might hold the JSON payload, most specific first.
fn candidates(response: &str) -> Vec<String> {
    let mut out = Vec::new();

    let mut rest = response;
    while let Some(start) = rest.find("```") {
        let after = &rest[start + 3..];
        // Skip an info string such as `json`
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        match body.find("```") {
            Some(end) => {
                out.push(body[..end].trim().to_string());
                rest = &body[end + 3..];
            }
            None => break,
        }
    }

    out.push(response.trim().to_string());

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (response.find(open), response.rfind(close)) {
            if start < end {
                out.push(response[start..=end].to_string());
            }
        }
    }

    out
}

fn challenge_array(candidate: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("challenges") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Criteria naming an unrecognised value can never be met.
fn is_satisfiable(criteria: &ChallengeCriteria) -> bool {
    match criteria {
        ChallengeCriteria::Diet(DietCriteria::Choice(choice)) => {
            *choice != crate::carbon::types::DietChoice::Unknown
        }
        ChallengeCriteria::Transport(TransportCriteria::Mode(group)) => {
            *group != crate::challenges::types::ModeGroup::Unknown
        }
        _ => true,
    }
}

fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

fn unique_id(base: &str, seen: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut n = 2;
    while !seen.insert(id.clone()) {
        id = format!("{}_{}", base, n);
        n += 1;
    }
    id
}
