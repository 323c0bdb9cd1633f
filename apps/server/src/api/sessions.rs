use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use smartdecision_core::{
    pagination::Page,
    sessions::{ChatMessage, ChatSession},
};

use super::PageQuery;
use crate::{auth::CurrentUser, error::ApiResult, main_lib::AppState};

const DEFAULT_SESSION_PAGE_SIZE: i64 = 10;
const DEFAULT_MESSAGE_PAGE_SIZE: i64 = 20;

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<ChatSession>>> {
    let page = state
        .chat_service
        .list_sessions(&user_id, query.to_request(DEFAULT_SESSION_PAGE_SIZE))?;
    Ok(Json(page))
}

async fn list_messages(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<ChatMessage>>> {
    let page = state.chat_service.list_messages(
        &user_id,
        &id,
        query.to_request(DEFAULT_MESSAGE_PAGE_SIZE),
    )?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct RenameBody {
    title: String,
}

async fn rename_session(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<RenameBody>,
) -> ApiResult<Json<ChatSession>> {
    let session = state
        .chat_service
        .rename_session(&user_id, &id, &body.title)
        .await?;
    Ok(Json(session))
}

async fn delete_session(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatusCode> {
    state.chat_service.delete_session(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/sessions", get(list_sessions))
        .route("/chat/sessions/{id}/messages", get(list_messages))
        .route(
            "/chat/sessions/{id}",
            put(rename_session).delete(delete_session),
        )
}
