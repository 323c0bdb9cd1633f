use std::sync::Arc;

use crate::config::Config;
use smartdecision_ai::{ChatConfig, ChatService, ProviderRegistry, ServiceEnvironment};
use smartdecision_core::{
    configs::{AiConfigService, AiConfigServiceTrait},
    knowledge::{
        IngestionConfig, IngestionPool, KnowledgeService, KnowledgeServiceTrait, LocalFileStore,
    },
    sessions::SessionService,
};
use smartdecision_storage_sqlite::{
    db, AiConfigRepository, KnowledgeRepository, SessionRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub config_service: Arc<dyn AiConfigServiceTrait>,
    pub knowledge_service: Arc<dyn KnowledgeServiceTrait>,
    pub chat_service: Arc<ChatService<ServiceEnvironment>>,
}

pub fn init_tracing() {
    let log_format = std::env::var("SD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    build_state_with_registry(config, ProviderRegistry::from_settings(config.providers.clone()))
        .await
}

/// Same as [`build_state`] with a caller-supplied provider registry.
pub async fn build_state_with_registry(
    config: &Config,
    registry: ProviderRegistry,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone())?;

    let config_repository = Arc::new(AiConfigRepository::new(pool.clone(), writer.clone()));
    let config_service: Arc<dyn AiConfigServiceTrait> =
        Arc::new(AiConfigService::new(config_repository));

    let session_repository = Arc::new(SessionRepository::new(pool.clone(), writer.clone()));
    let session_service = Arc::new(SessionService::new(session_repository));

    let knowledge_repository = Arc::new(KnowledgeRepository::new(pool.clone(), writer.clone()));
    let file_store = Arc::new(LocalFileStore::new(&config.upload_dir));
    let ingestion = IngestionPool::start(
        knowledge_repository.clone(),
        file_store.clone(),
        IngestionConfig {
            workers: config.ingest_workers,
            ..Default::default()
        },
    );
    let knowledge_service: Arc<dyn KnowledgeServiceTrait> = Arc::new(KnowledgeService::new(
        knowledge_repository,
        file_store,
        ingestion,
    ));

    let resumed = knowledge_service.resume_ingestion().await?;
    if resumed > 0 {
        tracing::info!("Re-queued {} pending knowledge file(s)", resumed);
    }

    let environment = Arc::new(ServiceEnvironment {
        config_service: config_service.clone(),
        session_service,
        knowledge_service: knowledge_service.clone(),
        provider_registry: Arc::new(registry),
    });
    let chat_service = Arc::new(ChatService::new(environment, ChatConfig::default()));

    Ok(Arc::new(AppState {
        config_service,
        knowledge_service,
        chat_service,
    }))
}
