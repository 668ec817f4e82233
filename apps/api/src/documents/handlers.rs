use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::extractor::CurrentUser;
use crate::documents::storage::{format_file_size, object_key, owns_path};
use crate::errors::AppError;
use crate::models::document::{DocumentRow, DocumentStatus};
use crate::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub file_url: String,
    pub file_path: String,
    pub size: Option<String>,
    pub status: Option<String>,
    pub visa_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub file_url: Option<String>,
    pub file_path: Option<String>,
    pub size: Option<String>,
    pub status: Option<String>,
    pub visa_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub status_filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_url: String,
    pub file_path: String,
    pub size: String,
    pub content_type: String,
}

/// POST /documents
pub async fn handle_create_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Document name is required".to_string()));
    }
    let status = match &req.status {
        Some(s) => parse_status(s)?,
        None => DocumentStatus::Pending,
    };

    let row = sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO documents
            (user_id, name, type, file_url, file_path, size, status, visa_id, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(user.id())
    .bind(req.name.trim())
    .bind(&req.doc_type)
    .bind(&req.file_url)
    .bind(&req.file_path)
    .bind(&req.size)
    .bind(status.as_str())
    .bind(req.visa_id)
    .bind(&req.description)
    .fetch_one(&state.db)
    .await?;

    info!("User {} added document {}", user.id(), row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<DocumentListQuery>,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    let status = match params.status_filter.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(parse_status(s)?),
    };

    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT * FROM documents
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY uploaded_at DESC, id DESC
        "#,
    )
    .bind(user.id())
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<DocumentRow>, AppError> {
    find_owned(&state, user.id(), id).await.map(Json)
}

/// PUT /documents/:id
pub async fn handle_update_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentRow>, AppError> {
    let status = req.status.as_deref().map(parse_status).transpose()?;
    if matches!(&req.name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Document name cannot be empty".to_string()));
    }

    let row = sqlx::query_as::<_, DocumentRow>(
        r#"
        UPDATE documents SET
            name = COALESCE($3, name),
            type = COALESCE($4, type),
            file_url = COALESCE($5, file_url),
            file_path = COALESCE($6, file_path),
            size = COALESCE($7, size),
            status = COALESCE($8, status),
            visa_id = COALESCE($9, visa_id),
            description = COALESCE($10, description),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.id())
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.doc_type)
    .bind(&req.file_url)
    .bind(&req.file_path)
    .bind(&req.size)
    .bind(status.map(|s| s.as_str()))
    .bind(req.visa_id)
    .bind(&req.description)
    .fetch_optional(&state.db)
    .await?;

    row.map(Json).ok_or_else(not_found)
}

/// DELETE /documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "DELETE FROM documents WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user.id())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(not_found)?;

    // Stored objects are removed best effort; the row is already gone.
    if owns_path(user.id(), &row.file_path) {
        if let Err(e) = state.storage.delete(&row.file_path).await {
            warn!("Could not delete stored object {}: {e}", row.file_path);
        }
    }

    info!("User {} deleted document {}", user.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /documents/upload
///
/// Multipart form with a single `file` field.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        if body.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if body.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(
                "File size must be less than 10MB".to_string(),
            ));
        }

        let key = object_key(user.id(), &file_name);
        let size = format_file_size(body.len());
        let file_url = state.storage.put(&key, body, &content_type).await?;

        return Ok(Json(UploadResponse {
            file_url,
            file_path: key,
            size,
            content_type,
        }));
    }

    Err(AppError::Validation("Missing `file` field".to_string()))
}

async fn find_owned(state: &AppState, user_id: i64, id: i64) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(not_found)
}

fn parse_status(value: &str) -> Result<DocumentStatus, AppError> {
    DocumentStatus::parse(value).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid status '{value}'; expected pending, verified or rejected"
        ))
    })
}

fn not_found() -> AppError {
    AppError::NotFound("Document not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_rejects_unknown() {
        assert_eq!(parse_status("Verified").unwrap(), DocumentStatus::Verified);
        assert!(matches!(parse_status("lost"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_request_accepts_type_key() {
        let req: UpdateDocumentRequest =
            serde_json::from_str(r#"{"type": "passport", "status": "verified"}"#).unwrap();
        assert_eq!(req.doc_type.as_deref(), Some("passport"));
        assert!(req.name.is_none());
    }
}
