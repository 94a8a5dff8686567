/*!
 * Model-specific concurrency tuning.
 *
 * The scheduler's hard cap is chosen once per batch from a static lookup on
 * the model profile: light/fast models tolerate more parallel requests than
 * heavy reasoning models. A user override from configuration always wins.
 */

use serde::Serialize;

use crate::app_config::TranslationProvider;

/// Coarse speed/weight class of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    Light,
    Standard,
    Heavy,
}

impl ModelClass {
    /// Hard concurrency cap for the class
    pub fn cap(self) -> usize {
        match self {
            Self::Light => 6,
            Self::Standard => 4,
            Self::Heavy => 3,
        }
    }
}

// Matched against whole name tokens, never substrings ("gemini" is not "mini").
// Checked in order; light markers win over heavy ones ("gpt-4.1-mini" is light).
const LIGHT_MARKERS: &[&str] = &["mini", "nano", "flash", "haiku", "lite", "small", "8b", "3b"];
const HEAVY_MARKERS: &[&str] = &["opus", "pro", "o1", "o3", "large", "70b", "gpt-4.1"];

/// Concurrency profile for one provider/model pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelProfile {
    pub provider: TranslationProvider,
    pub model: String,
    pub class: ModelClass,
    /// Maximum concurrent requests for this model
    pub max_concurrent_requests: usize,
}

impl ModelProfile {
    /// Get the profile for a given provider and model name
    pub fn for_model(provider: TranslationProvider, model: &str) -> Self {
        let class = Self::classify_model(model);
        Self {
            provider,
            model: model.to_string(),
            class,
            max_concurrent_requests: class.cap(),
        }
    }

    /// Classify a model by well-known markers in its name
    pub fn classify_model(model: &str) -> ModelClass {
        let name = model.to_lowercase();
        let tokens = name_tokens(&name);
        if LIGHT_MARKERS.iter().any(|marker| has_marker(&tokens, marker)) {
            ModelClass::Light
        } else if HEAVY_MARKERS.iter().any(|marker| has_marker(&tokens, marker)) {
            ModelClass::Heavy
        } else {
            ModelClass::Standard
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .filter(|cap| *cap > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}

// Split a model name on the separators vendors use: "llama3.1:70b" -> llama3, 1, 70b
fn name_tokens(name: &str) -> Vec<&str> {
    name.split(|c: char| matches!(c, '-' | ':' | '.' | '/' | '_'))
        .filter(|token| !token.is_empty())
        .collect()
}

// A marker may span several tokens ("gpt-4.1"); they must appear contiguously.
fn has_marker(tokens: &[&str], marker: &str) -> bool {
    let parts = name_tokens(marker);
    !parts.is_empty() && tokens.windows(parts.len()).any(|window| window == parts.as_slice())
}
