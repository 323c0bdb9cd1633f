use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use smartdecision_ai::ProviderModels;
use smartdecision_core::configs::{AiConfig, AiConfigUpdate, NewAiConfig};

use crate::{auth::CurrentUser, error::ApiResult, main_lib::AppState};

async fn list_configs(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<Vec<AiConfig>>> {
    let configs = state.config_service.list_configs(&user_id).await?;
    Ok(Json(configs))
}

async fn create_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(new_config): Json<NewAiConfig>,
) -> ApiResult<(StatusCode, Json<AiConfig>)> {
    let config = state
        .config_service
        .create_config(&user_id, new_config)
        .await?;
    Ok((StatusCode::CREATED, Json(config)))
}

async fn get_default_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<AiConfig>> {
    let config = state.config_service.get_default_config(&user_id).await?;
    Ok(Json(config))
}

async fn get_config(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<AiConfig>> {
    let config = state.config_service.get_config(&user_id, &id)?;
    Ok(Json(config))
}

async fn update_config(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(update): Json<AiConfigUpdate>,
) -> ApiResult<Json<AiConfig>> {
    let config = state
        .config_service
        .update_config(&user_id, &id, update)
        .await?;
    Ok(Json(config))
}

async fn delete_config(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatusCode> {
    state.config_service.delete_config(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Static model catalogue, flagged with which providers have credentials.
async fn list_models(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user_id): CurrentUser,
) -> Json<Vec<ProviderModels>> {
    Json(state.chat_service.available_models())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/configs", get(list_configs).post(create_config))
        .route("/ai/configs/default", get(get_default_config))
        .route(
            "/ai/configs/{id}",
            get(get_config).put(update_config).delete(delete_config),
        )
        .route("/ai/models", get(list_models))
}
