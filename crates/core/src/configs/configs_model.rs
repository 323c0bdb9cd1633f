//! AI configuration domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::configs_constants::*;
use crate::errors::{Error, Result};

/// Closed set of chat-completion vendors the engine can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    DeepSeek,
    Kimi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::DeepSeek, ProviderKind::Kimi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Kimi => "kimi",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "kimi" => Ok(ProviderKind::Kimi),
            other => Err(Error::invalid_input(format!("Unknown provider: {}", other))),
        }
    }
}

/// Domain model representing a stored model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub id: String,
    pub user_id: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub provider: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAiConfig {
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub provider: String,
    #[serde(default)]
    pub is_default: bool,
}

impl NewAiConfig {
    /// The configuration every user starts with.
    pub fn baseline() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            provider: DEFAULT_PROVIDER.to_string(),
            is_default: true,
        }
    }

    /// Secondary, non-default configuration seeded next to the baseline.
    pub fn alternate() -> Self {
        Self {
            model_name: ALTERNATE_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            provider: ALTERNATE_PROVIDER.to_string(),
            is_default: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_model_name(&self.model_name)?;
        validate_temperature(self.temperature)?;
        validate_max_tokens(self.max_tokens)?;
        self.provider.parse::<ProviderKind>()?;
        Ok(())
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigUpdate {
    pub model_name: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub provider: Option<String>,
    pub is_default: Option<bool>,
}

impl AiConfigUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref model_name) = self.model_name {
            validate_model_name(model_name)?;
        }
        if let Some(temperature) = self.temperature {
            validate_temperature(temperature)?;
        }
        if let Some(max_tokens) = self.max_tokens {
            validate_max_tokens(max_tokens)?;
        }
        if let Some(ref provider) = self.provider {
            provider.parse::<ProviderKind>()?;
        }
        Ok(())
    }

    /// Applies the present fields onto `config`. `is_default` only changes when
    /// the update names it, and the current default can never be unset here.
    pub fn apply_to(self, config: &mut AiConfig) -> Result<()> {
        if config.is_default && self.is_default == Some(false) {
            return Err(Error::invalid_input(
                "The default configuration cannot be unset; promote another configuration instead",
            ));
        }
        if let Some(model_name) = self.model_name {
            config.model_name = model_name.trim().to_string();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(provider) = self.provider {
            config.provider = provider.trim().to_ascii_lowercase();
        }
        if let Some(is_default) = self.is_default {
            config.is_default = is_default;
        }
        Ok(())
    }
}

fn validate_model_name(model_name: &str) -> Result<()> {
    if model_name.trim().is_empty() {
        return Err(Error::invalid_input("Model name must not be empty"));
    }
    Ok(())
}

fn validate_temperature(temperature: f64) -> Result<()> {
    if !temperature.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(Error::invalid_input(format!(
            "Temperature must be between {} and {}, got {}",
            MIN_TEMPERATURE, MAX_TEMPERATURE, temperature
        )));
    }
    Ok(())
}

fn validate_max_tokens(max_tokens: i32) -> Result<()> {
    if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&max_tokens) {
        return Err(Error::invalid_input(format!(
            "Max tokens must be between {} and {}, got {}",
            MIN_MAX_TOKENS, MAX_MAX_TOKENS, max_tokens
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_provider_kind_parse_and_display() {
        assert_eq!("deepseek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert_eq!(" Kimi ".parse::<ProviderKind>().unwrap(), ProviderKind::Kimi);
        assert_eq!(ProviderKind::DeepSeek.to_string(), "deepseek");

        let err = "openai".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_provider_kind_serde() {
        let json = serde_json::to_string(&ProviderKind::Kimi).unwrap();
        assert_eq!(json, "\"kimi\"");
    }

    #[test]
    fn test_baseline_values() {
        let baseline = NewAiConfig::baseline();
        assert_eq!(baseline.model_name, "deepseek-v1-8k");
        assert_eq!(baseline.provider, "deepseek");
        assert_eq!(baseline.temperature, 0.7);
        assert_eq!(baseline.max_tokens, 2048);
        assert!(baseline.is_default);
        assert!(baseline.validate().is_ok());

        let alternate = NewAiConfig::alternate();
        assert_eq!(alternate.model_name, "moonshot-v1-8k");
        assert_eq!(alternate.provider, "kimi");
        assert!(!alternate.is_default);
    }

    #[test]
    fn test_validation_bounds() {
        let mut input = NewAiConfig::baseline();
        input.temperature = 1.0;
        input.max_tokens = 4096;
        assert!(input.validate().is_ok());

        input.temperature = 1.01;
        assert!(input.validate().is_err());

        input.temperature = f64::NAN;
        assert!(input.validate().is_err());

        input.temperature = 0.0;
        input.max_tokens = 0;
        assert!(input.validate().is_err());

        input.max_tokens = 4097;
        assert!(input.validate().is_err());

        input.max_tokens = 1;
        input.provider = "gpt".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_applies_present_fields_only() {
        let now = Utc::now();
        let mut config = AiConfig {
            id: "c1".into(),
            user_id: "u1".into(),
            model_name: "deepseek-chat".into(),
            temperature: 0.7,
            max_tokens: 2048,
            provider: "deepseek".into(),
            is_default: false,
            created_at: now,
            updated_at: now,
        };

        let update = AiConfigUpdate {
            max_tokens: Some(1024),
            provider: Some("KIMI".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        update.apply_to(&mut config).unwrap();

        assert_eq!(config.model_name, "deepseek-chat");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.provider, "kimi");
        assert!(!config.is_default);
    }

    #[test]
    fn test_update_keeps_default_flag_unless_named() {
        let now = Utc::now();
        let mut config = AiConfig {
            id: "c1".into(),
            user_id: "u1".into(),
            model_name: "deepseek-chat".into(),
            temperature: 0.7,
            max_tokens: 2048,
            provider: "deepseek".into(),
            is_default: true,
            created_at: now,
            updated_at: now,
        };

        let update = AiConfigUpdate {
            temperature: Some(0.3),
            ..Default::default()
        };
        update.apply_to(&mut config).unwrap();
        assert!(config.is_default);
        assert_eq!(config.temperature, 0.3);

        let unset = AiConfigUpdate {
            is_default: Some(false),
            temperature: Some(0.9),
            ..Default::default()
        };
        let err = unset.apply_to(&mut config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(config.is_default);
        assert_eq!(config.temperature, 0.3);
    }
}
