use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use smartdecision_core::configs::{
    AiConfig, AiConfigRepositoryTrait, AiConfigUpdate, NewAiConfig,
};
use smartdecision_core::errors::{Error, Result};

use super::model::AiConfigDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::ai_configs;
use crate::utils::format_timestamp;

pub struct AiConfigRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl AiConfigRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        AiConfigRepository { pool, writer }
    }
}

fn load_user_configs(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<AiConfigDB>> {
    ai_configs::table
        .filter(ai_configs::user_id.eq(user_id))
        .order((ai_configs::created_at.asc(), ai_configs::id.asc()))
        .select(AiConfigDB::as_select())
        .load::<AiConfigDB>(conn)
        .into_core()
}

fn load_default(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<AiConfigDB>> {
    ai_configs::table
        .filter(ai_configs::user_id.eq(user_id))
        .filter(ai_configs::is_default.eq(true))
        .select(AiConfigDB::as_select())
        .first::<AiConfigDB>(conn)
        .optional()
        .into_core()
}

/// Clears the default flag on every config of `user_id` except `keep_id`.
fn demote_others(
    conn: &mut SqliteConnection,
    user_id: &str,
    keep_id: &str,
    updated_at: &str,
) -> Result<usize> {
    let demoted = diesel::update(
        ai_configs::table
            .filter(ai_configs::user_id.eq(user_id))
            .filter(ai_configs::is_default.eq(true))
            .filter(ai_configs::id.ne(keep_id)),
    )
    .set((
        ai_configs::is_default.eq(false),
        ai_configs::updated_at.eq(updated_at),
    ))
    .execute(conn)
    .map_err(StorageError::from)?;
    if demoted > 0 {
        debug!("Demoted previous default config of user {}", user_id);
    }
    Ok(demoted)
}

fn insert_config(conn: &mut SqliteConnection, row: AiConfigDB) -> Result<AiConfigDB> {
    if row.is_default {
        demote_others(conn, &row.user_id, &row.id, &row.updated_at)?;
    }
    diesel::insert_into(ai_configs::table)
        .values(&row)
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(row)
}

#[async_trait]
impl AiConfigRepositoryTrait for AiConfigRepository {
    fn get_config(&self, config_id: &str) -> Result<AiConfig> {
        let mut conn = get_connection(&self.pool)?;
        ai_configs::table
            .find(config_id)
            .select(AiConfigDB::as_select())
            .first::<AiConfigDB>(&mut conn)
            .optional()
            .into_core()?
            .map(AiConfig::from)
            .ok_or_else(|| Error::not_found(format!("AI config {}", config_id)))
    }

    fn list_configs(&self, user_id: &str) -> Result<Vec<AiConfig>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = load_user_configs(&mut conn, user_id)?;
        Ok(rows.into_iter().map(AiConfig::from).collect())
    }

    fn find_default(&self, user_id: &str) -> Result<Option<AiConfig>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(load_default(&mut conn, user_id)?.map(AiConfig::from))
    }

    async fn create_config(&self, user_id: &str, new_config: NewAiConfig) -> Result<AiConfig> {
        let row = AiConfigDB::from_new(user_id, new_config, Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AiConfig> {
                Ok(insert_config(conn, row)?.into())
            })
            .await
    }

    async fn update_config(&self, config_id: &str, update: AiConfigUpdate) -> Result<AiConfig> {
        let config_id = config_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AiConfig> {
                // Read inside the write transaction so a concurrent promotion
                // is never overwritten by a stale copy.
                let current = ai_configs::table
                    .find(&config_id)
                    .select(AiConfigDB::as_select())
                    .first::<AiConfigDB>(conn)
                    .optional()
                    .into_core()?
                    .ok_or_else(|| Error::not_found(format!("AI config {}", config_id)))?;

                let mut config = AiConfig::from(current);
                update.apply_to(&mut config)?;
                config.updated_at = Utc::now();
                let row = AiConfigDB::from(config);

                if row.is_default {
                    demote_others(conn, &row.user_id, &row.id, &row.updated_at)?;
                }
                diesel::update(ai_configs::table.find(&row.id))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row.into())
            })
            .await
    }

    async fn delete_non_default_config(&self, config_id: &str) -> Result<usize> {
        let config_id = config_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(
                    ai_configs::table
                        .filter(ai_configs::id.eq(&config_id))
                        .filter(ai_configs::is_default.eq(false)),
                )
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }

    async fn get_or_create_default(
        &self,
        user_id: &str,
        baseline: NewAiConfig,
    ) -> Result<AiConfig> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AiConfig> {
                if let Some(existing) = load_default(conn, &user_id)? {
                    return Ok(existing.into());
                }
                let seed = NewAiConfig {
                    is_default: true,
                    ..baseline
                };
                let row = AiConfigDB::from_new(&user_id, seed, Utc::now());
                Ok(insert_config(conn, row)?.into())
            })
            .await
    }

    async fn seed_configs(&self, user_id: &str, seeds: Vec<NewAiConfig>) -> Result<Vec<AiConfig>> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<AiConfig>> {
                let mut rows = load_user_configs(conn, &user_id)?;

                if rows.is_empty() {
                    // Distinct timestamps keep the seeds in their given order.
                    let base = Utc::now();
                    for (offset, seed) in seeds.into_iter().enumerate() {
                        let created_at = base + Duration::microseconds(offset as i64);
                        insert_config(conn, AiConfigDB::from_new(&user_id, seed, created_at))?;
                    }
                    rows = load_user_configs(conn, &user_id)?;
                }

                if !rows.iter().any(|r| r.is_default) {
                    if let Some(oldest) = rows.first_mut() {
                        let now = format_timestamp(Utc::now());
                        diesel::update(ai_configs::table.find(&oldest.id))
                            .set((
                                ai_configs::is_default.eq(true),
                                ai_configs::updated_at.eq(&now),
                            ))
                            .execute(conn)
                            .map_err(StorageError::from)?;
                        debug!("Promoted config {} to default", oldest.id);
                        oldest.is_default = true;
                        oldest.updated_at = now;
                    }
                }

                Ok(rows.into_iter().map(AiConfig::from).collect())
            })
            .await
    }
}
