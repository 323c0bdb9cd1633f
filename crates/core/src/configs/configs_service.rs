use super::configs_model::{AiConfig, AiConfigUpdate, NewAiConfig};
use super::configs_traits::{AiConfigRepositoryTrait, AiConfigServiceTrait};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

pub struct AiConfigService {
    repository: Arc<dyn AiConfigRepositoryTrait>,
}

impl AiConfigService {
    pub fn new(repository: Arc<dyn AiConfigRepositoryTrait>) -> Self {
        AiConfigService { repository }
    }

    /// Loads a config and checks that `user_id` owns it.
    fn owned_config(&self, user_id: &str, config_id: &str) -> Result<AiConfig> {
        let config = self.repository.get_config(config_id)?;
        if config.user_id != user_id {
            return Err(Error::Forbidden(format!(
                "Configuration {} belongs to another user",
                config_id
            )));
        }
        Ok(config)
    }
}

fn normalize(mut new_config: NewAiConfig) -> NewAiConfig {
    new_config.model_name = new_config.model_name.trim().to_string();
    new_config.provider = new_config.provider.trim().to_ascii_lowercase();
    new_config
}

#[async_trait]
impl AiConfigServiceTrait for AiConfigService {
    async fn get_default_config(&self, user_id: &str) -> Result<AiConfig> {
        if let Some(config) = self.repository.find_default(user_id)? {
            return Ok(config);
        }
        info!("No default AI config for user {}, creating baseline", user_id);
        self.repository
            .get_or_create_default(user_id, NewAiConfig::baseline())
            .await
    }

    async fn list_configs(&self, user_id: &str) -> Result<Vec<AiConfig>> {
        let configs = self.repository.list_configs(user_id)?;
        if !configs.is_empty() && configs.iter().filter(|c| c.is_default).count() == 1 {
            return Ok(configs);
        }
        debug!("Seeding AI configs for user {}", user_id);
        self.repository
            .seed_configs(
                user_id,
                vec![NewAiConfig::baseline(), NewAiConfig::alternate()],
            )
            .await
    }

    fn get_config(&self, user_id: &str, config_id: &str) -> Result<AiConfig> {
        self.owned_config(user_id, config_id)
    }

    async fn create_config(&self, user_id: &str, new_config: NewAiConfig) -> Result<AiConfig> {
        new_config.validate()?;
        self.repository
            .create_config(user_id, normalize(new_config))
            .await
    }

    async fn update_config(
        &self,
        user_id: &str,
        config_id: &str,
        update: AiConfigUpdate,
    ) -> Result<AiConfig> {
        update.validate()?;
        // Ownership never changes, so checking it before the write is enough.
        self.owned_config(user_id, config_id)?;
        self.repository.update_config(config_id, update).await
    }

    async fn delete_config(&self, user_id: &str, config_id: &str) -> Result<()> {
        let config = self.owned_config(user_id, config_id)?;
        if config.is_default {
            return Err(Error::CannotDeleteDefault(config_id.to_string()));
        }

        // The statement itself filters on is_default, a concurrent promotion
        // shows up here as zero affected rows.
        let deleted = self
            .repository
            .delete_non_default_config(config_id)
            .await?;
        if deleted == 0 {
            return match self.repository.get_config(config_id) {
                Ok(_) => Err(Error::CannotDeleteDefault(config_id.to_string())),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }
}
