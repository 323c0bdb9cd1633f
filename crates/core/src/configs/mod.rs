//! AI configuration module - per-user model settings with a single default.

mod configs_constants;
mod configs_model;
mod configs_service;
mod configs_traits;

pub use configs_constants::*;
pub use configs_model::{AiConfig, AiConfigUpdate, NewAiConfig, ProviderKind};
pub use configs_service::AiConfigService;
pub use configs_traits::{AiConfigRepositoryTrait, AiConfigServiceTrait};
