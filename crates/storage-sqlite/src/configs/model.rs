//! Database models for AI configurations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use smartdecision_core::configs::{AiConfig, NewAiConfig};

use crate::utils::{format_timestamp, parse_timestamp};

/// Database model for AI configurations
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::ai_configs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AiConfigDB {
    pub id: String,
    pub user_id: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub provider: String,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl AiConfigDB {
    pub fn from_new(user_id: &str, new_config: NewAiConfig, created_at: DateTime<Utc>) -> Self {
        let now = format_timestamp(created_at);
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            model_name: new_config.model_name,
            temperature: new_config.temperature,
            max_tokens: new_config.max_tokens,
            provider: new_config.provider,
            is_default: new_config.is_default,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl From<AiConfigDB> for AiConfig {
    fn from(db: AiConfigDB) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            model_name: db.model_name,
            temperature: db.temperature,
            max_tokens: db.max_tokens,
            provider: db.provider,
            is_default: db.is_default,
            created_at: parse_timestamp(&db.created_at),
            updated_at: parse_timestamp(&db.updated_at),
        }
    }
}

impl From<AiConfig> for AiConfigDB {
    fn from(domain: AiConfig) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            model_name: domain.model_name,
            temperature: domain.temperature,
            max_tokens: domain.max_tokens,
            provider: domain.provider,
            is_default: domain.is_default,
            created_at: format_timestamp(domain.created_at),
            updated_at: format_timestamp(domain.updated_at),
        }
    }
}
