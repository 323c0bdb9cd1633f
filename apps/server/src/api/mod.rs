//! HTTP routes under `/api/v1`.

pub mod chat;
pub mod configs;
pub mod health;
pub mod knowledge;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use serde::Deserialize;
use smartdecision_core::pagination::PageRequest;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, main_lib::AppState};

/// `?page=&pageSize=` query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn to_request(&self, default_size: i64) -> PageRequest {
        PageRequest::new(self.page, self.page_size, default_size)
    }
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    // Streaming replies can outlive the request timeout, so that route is
    // merged after the timeout layer.
    let api = Router::new()
        .merge(health::router())
        .merge(chat::router())
        .merge(sessions::router())
        .merge(configs::router())
        .merge(knowledge::router())
        .layer(TimeoutLayer::new(config.request_timeout))
        .merge(chat::streaming_router());

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
}
