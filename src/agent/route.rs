//! Provider routing derived from a model identifier.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Providers a model identifier can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKey {
    OpenAi,
    Anthropic,
}

impl ProviderKey {
    /// Model-id prefixes owned by this provider.
    pub const fn model_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["gpt"],
            Self::Anthropic => &["claude"],
        }
    }

    /// Provider owning `model`, matched by prefix.
    pub fn for_model(model: &str) -> Option<Self> {
        [Self::OpenAi, Self::Anthropic].into_iter().find(|key| {
            key.model_prefixes()
                .iter()
                .any(|prefix| model.starts_with(prefix))
        })
    }
}

/// Provider-qualified model identifier used to invoke the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRoute {
    /// Provider matched by prefix, if any.
    pub provider: Option<ProviderKey>,
    /// Model id as configured on the agent.
    pub model: String,
    /// `provider/model` for matched ids, the unmodified id otherwise.
    pub qualified: String,
}

impl ProviderRoute {
    /// Derive the route for `model`. Pure: no lookups, no I/O.
    pub fn resolve(model: &str) -> Self {
        let provider = ProviderKey::for_model(model);
        let qualified = match provider {
            Some(key) => format!("{key}/{model}"),
            None => model.to_string(),
        };
        Self {
            provider,
            model: model.to_string(),
            qualified,
        }
    }
}

impl std::fmt::Display for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified)
    }
}
