//! Environment abstraction for the chat orchestrator.
//!
//! `ChatEnvironment` hands the orchestrator its collaborators. The server
//! builds a [`ServiceEnvironment`] from the storage-backed services; tests use
//! the in-memory doubles in [`test_env`].

use smartdecision_core::{
    configs::AiConfigServiceTrait, knowledge::KnowledgeServiceTrait,
    sessions::SessionServiceTrait,
};
use std::sync::Arc;

use crate::registry::ProviderRegistry;

pub trait ChatEnvironment: Send + Sync {
    fn config_service(&self) -> Arc<dyn AiConfigServiceTrait>;

    fn session_service(&self) -> Arc<dyn SessionServiceTrait>;

    fn knowledge_service(&self) -> Arc<dyn KnowledgeServiceTrait>;

    fn provider_registry(&self) -> Arc<ProviderRegistry>;
}

/// Environment assembled from concrete service instances.
#[derive(Clone)]
pub struct ServiceEnvironment {
    pub config_service: Arc<dyn AiConfigServiceTrait>,
    pub session_service: Arc<dyn SessionServiceTrait>,
    pub knowledge_service: Arc<dyn KnowledgeServiceTrait>,
    pub provider_registry: Arc<ProviderRegistry>,
}

impl ChatEnvironment for ServiceEnvironment {
    fn config_service(&self) -> Arc<dyn AiConfigServiceTrait> {
        self.config_service.clone()
    }

    fn session_service(&self) -> Arc<dyn SessionServiceTrait> {
        self.session_service.clone()
    }

    fn knowledge_service(&self) -> Arc<dyn KnowledgeServiceTrait> {
        self.knowledge_service.clone()
    }

    fn provider_registry(&self) -> Arc<ProviderRegistry> {
        self.provider_registry.clone()
    }
}
