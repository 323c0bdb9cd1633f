use crate::configs::configs_model::{AiConfig, AiConfigUpdate, NewAiConfig};
use crate::errors::Result;
use async_trait::async_trait;

/// Trait for AI configuration repository operations.
///
/// Every async method runs as one write transaction, so the "single default
/// per user" rule holds between any two statements.
#[async_trait]
pub trait AiConfigRepositoryTrait: Send + Sync {
    /// Returns `DatabaseError::NotFound` when absent.
    fn get_config(&self, config_id: &str) -> Result<AiConfig>;

    /// All configs of a user, oldest first.
    fn list_configs(&self, user_id: &str) -> Result<Vec<AiConfig>>;

    fn find_default(&self, user_id: &str) -> Result<Option<AiConfig>>;

    /// Inserts a config. When it is the default, the user's other configs are
    /// demoted in the same transaction.
    async fn create_config(&self, user_id: &str, new_config: NewAiConfig) -> Result<AiConfig>;

    /// Loads the config, applies `update` and persists it in one transaction.
    /// When it becomes the default, the user's other configs are demoted in
    /// that same transaction.
    async fn update_config(&self, config_id: &str, update: AiConfigUpdate) -> Result<AiConfig>;

    /// Deletes the config only if it is not the default; returns affected rows.
    async fn delete_non_default_config(&self, config_id: &str) -> Result<usize>;

    /// Returns the user's default, inserting `baseline` as default when there is none.
    async fn get_or_create_default(&self, user_id: &str, baseline: NewAiConfig)
        -> Result<AiConfig>;

    /// Returns the user's configs, inserting `seeds` when the user has none and
    /// promoting the oldest config when none is marked default.
    async fn seed_configs(&self, user_id: &str, seeds: Vec<NewAiConfig>) -> Result<Vec<AiConfig>>;
}

/// Trait for AI configuration service operations.
#[async_trait]
pub trait AiConfigServiceTrait: Send + Sync {
    async fn get_default_config(&self, user_id: &str) -> Result<AiConfig>;
    async fn list_configs(&self, user_id: &str) -> Result<Vec<AiConfig>>;
    fn get_config(&self, user_id: &str, config_id: &str) -> Result<AiConfig>;
    async fn create_config(&self, user_id: &str, new_config: NewAiConfig) -> Result<AiConfig>;
    async fn update_config(
        &self,
        user_id: &str,
        config_id: &str,
        update: AiConfigUpdate,
    ) -> Result<AiConfig>;
    async fn delete_config(&self, user_id: &str, config_id: &str) -> Result<()>;
}
