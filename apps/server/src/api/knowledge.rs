use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use smartdecision_core::{
    knowledge::{KnowledgeFile, KnowledgeFileDetail, MAX_UPLOAD_BYTES},
    pagination::Page,
};

use super::PageQuery;
use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const UPLOAD_FIELD: &str = "file";
const DEFAULT_FILE_PAGE_SIZE: i64 = 10;

/// Room for multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 64 * 1024;

async fn upload_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<KnowledgeFile>)> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart data: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Upload is missing a file name".to_string()))?;

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
        {
            if (data.len() + chunk.len()) as u64 > MAX_UPLOAD_BYTES {
                return Err(ApiError::BadRequest(format!(
                    "File exceeds the maximum size of {} bytes",
                    MAX_UPLOAD_BYTES
                )));
            }
            data.extend_from_slice(&chunk);
        }

        tracing::debug!("Received upload {} ({} bytes)", file_name, data.len());
        let file = state
            .knowledge_service
            .upload_file(&user_id, &file_name, data.len() as u64, data)
            .await?;
        return Ok((StatusCode::CREATED, Json(file)));
    }

    Err(ApiError::BadRequest(format!(
        "Multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<KnowledgeFile>>> {
    let page = state
        .knowledge_service
        .list_files(&user_id, query.to_request(DEFAULT_FILE_PAGE_SIZE))?;
    Ok(Json(page))
}

async fn get_file(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<KnowledgeFileDetail>> {
    let detail = state.knowledge_service.get_file(&user_id, &id)?;
    Ok(Json(detail))
}

async fn delete_file(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<StatusCode> {
    state.knowledge_service.delete_file(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/knowledge/upload",
            post(upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/knowledge", get(list_files))
        .route("/knowledge/{id}", get(get_file).delete(delete_file))
}
