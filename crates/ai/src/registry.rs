//! Provider lookup by name.

use log::info;
use serde::Serialize;
use smartdecision_core::configs::ProviderKind;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AiError;
use crate::provider::{ChatProvider, DeepSeekClient, KimiClient, ProviderClient};

/// Credentials and endpoints for the supported vendors. A vendor without an
/// API key is not registered.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub deepseek_api_key: Option<String>,
    pub deepseek_base_url: Option<String>,
    pub kimi_api_key: Option<String>,
    pub kimi_base_url: Option<String>,
}

/// Models offered per provider.
const MODEL_CATALOGUE: &[(ProviderKind, &[&str])] = &[
    (ProviderKind::DeepSeek, &["deepseek-chat", "deepseek-reasoner"]),
    (
        ProviderKind::Kimi,
        &[
            "moonshot-v1-8k",
            "moonshot-v1-32k",
            "moonshot-v1-128k",
            "moonshot-v1-auto",
        ],
    ),
];

/// One entry of [`ProviderRegistry::available_models`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderModels {
    pub provider: ProviderKind,
    pub models: Vec<String>,
    /// Whether the provider has credentials in this process.
    pub configured: bool,
}

/// Maps provider names to clients.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn from_settings(settings: ProviderSettings) -> Self {
        let http = reqwest::Client::new();
        let mut registry = Self::new();

        if let Some(key) = non_blank(settings.deepseek_api_key.as_deref()) {
            let client = DeepSeekClient::new(
                http.clone(),
                key,
                non_blank(settings.deepseek_base_url.as_deref()),
            );
            registry = registry.with_provider(
                ProviderKind::DeepSeek,
                Arc::new(ProviderClient::DeepSeek(client)),
            );
        }
        if let Some(key) = non_blank(settings.kimi_api_key.as_deref()) {
            let client =
                KimiClient::new(http, key, non_blank(settings.kimi_base_url.as_deref()));
            registry =
                registry.with_provider(ProviderKind::Kimi, Arc::new(ProviderClient::Kimi(client)));
        }

        info!(
            "Provider registry ready with {} provider(s)",
            registry.providers.len()
        );
        registry
    }

    /// Client for `name`. Unknown and unconfigured providers are both errors.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ChatProvider>, AiError> {
        let kind = name
            .parse::<ProviderKind>()
            .map_err(|_| AiError::UnknownProvider(name.to_string()))?;
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| AiError::UnknownProvider(name.to_string()))
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn available_models(&self) -> Vec<ProviderModels> {
        MODEL_CATALOGUE
            .iter()
            .map(|(kind, models)| ProviderModels {
                provider: *kind,
                models: models.iter().map(|m| m.to_string()).collect(),
                configured: self.is_configured(*kind),
            })
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
