use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a generative model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or tuned models)
    Custom(String),
}

/// Known model versions
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Gemini 2.0 Flash
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,

    /// Gemini 2.0 Flash-Lite
    #[serde(rename = "gemini-2.0-flash-lite")]
    Gemini20FlashLite,

    /// Gemini 2.5 Flash
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,

    /// Gemini 2.5 Pro
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,
}

impl KnownModel {
    /// All known models, in the order they are listed to users.
    pub const ALL: [KnownModel; 4] = [
        KnownModel::Gemini20Flash,
        KnownModel::Gemini20FlashLite,
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25Pro,
    ];

    /// The identifier the API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
            KnownModel::Gemini20FlashLite => "gemini-2.0-flash-lite",
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini20Flash)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let name = s.strip_prefix("models/").unwrap_or(s);
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == name)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(name.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}
