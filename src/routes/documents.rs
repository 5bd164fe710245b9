//! Document library routes. Uploads and maintenance are admin-only; reading and
//! semantic search are open to any signed-in user.

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::users::page_params;
use crate::error::ApiError;
use crate::services::audit::ClientInfo;
use crate::services::documents::{self, Document, DocumentError, DocumentSearch, DocumentStats, DocumentType, NewDocument};
use crate::services::page::{DEFAULT_PAGE_SIZE, Page, PageParams};
use crate::state::AppState;

pub(crate) fn document_error(err: DocumentError, context: &'static str) -> ApiError {
    match err {
        DocumentError::UnsupportedType
        | DocumentError::PdfExtraction
        | DocumentError::InvalidEncoding
        | DocumentError::TooShort
        | DocumentError::InvalidTitle
        | DocumentError::InvalidQuery
        | DocumentError::InvalidLimit => ApiError::bad_request(err.to_string()),
        DocumentError::TooLarge { .. } => ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
        DocumentError::NotFound => ApiError::not_found(err.to_string()),
        DocumentError::Unavailable => ApiError::unavailable(err.to_string()),
        DocumentError::Embedding(_) | DocumentError::Vector(_) | DocumentError::Database(_) => {
            ApiError::internal(&err, context)
        }
    }
}

// =============================================================================
// MULTIPART
// =============================================================================

/// `a, b` or a JSON array `["a", "b"]`.
pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
            return items.into_iter().map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect();
        }
    }
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

/// Fields collected from an upload form before validation.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub source: Option<String>,
    pub authors: Vec<String>,
    pub keywords: Vec<String>,
}

impl UploadForm {
    pub(crate) fn into_parts(self) -> Result<(NewDocument, String, Vec<u8>), ApiError> {
        let filename = self.filename.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
        let title = self
            .title
            .ok_or_else(|| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "title is required"))?;
        let raw_type = self
            .document_type
            .ok_or_else(|| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "document_type is required"))?;
        let document_type = DocumentType::parse(raw_type.trim())
            .ok_or_else(|| ApiError::bad_request(format!("Unknown document type: {}", raw_type.trim())))?;

        let input = NewDocument {
            title,
            document_type,
            source: self.source.filter(|s| !s.trim().is_empty()),
            authors: self.authors,
            keywords: self.keywords,
        };
        Ok((input, filename, self.bytes))
    }
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(|e| ApiError::new(e.status(), e.body_text()))
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                form.filename = Some(field.file_name().unwrap_or_default().to_owned());
                form.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?
                    .to_vec();
            }
            "title" => form.title = Some(field_text(field).await?),
            "document_type" => form.document_type = Some(field_text(field).await?),
            "source" => form.source = Some(field_text(field).await?),
            "authors" => form.authors = parse_list(&field_text(field).await?),
            "keywords" => form.keywords = parse_list(&field_text(field).await?),
            other => tracing::debug!(field = other, "documents: ignoring unknown upload field"),
        }
    }
    Ok(form)
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    pub document_type: Option<DocumentType>,
}

fn first_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// `POST /documents/upload`
pub async fn upload(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    multipart: Multipart,
) -> Result<Json<Document>, ApiError> {
    let (input, filename, bytes) = read_upload(multipart).await?.into_parts()?;
    let document = documents::upload(&state, admin.id, input, &filename, &bytes, &client)
        .await
        .map_err(|e| document_error(e, "Failed to upload document"))?;
    Ok(Json(document))
}

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Page<Document>>, ApiError> {
    let page = documents::list(&state.pool, page_params(PageParams { page: params.page, size: params.size })?, params.document_type)
        .await
        .map_err(|e| document_error(e, "Failed to retrieve documents"))?;
    Ok(Json(page))
}

pub async fn get(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Document>, ApiError> {
    let document = documents::get(&state.pool, id)
        .await
        .map_err(|e| document_error(e, "Failed to retrieve document"))?;
    Ok(Json(document))
}

/// `POST /documents/search`
pub async fn search(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<DocumentSearch>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let results = documents::search(&state, &body)
        .await
        .map_err(|e| document_error(e, "Failed to search documents"))?;
    Ok(Json(results))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    client: ClientInfo,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    documents::delete(&state, id, admin.id, &client)
        .await
        .map_err(|e| document_error(e, "Failed to delete document"))?;
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

pub async fn reprocess(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let document = documents::reprocess(&state, id)
        .await
        .map_err(|e| document_error(e, "Failed to reprocess document"))?;
    Ok(Json(json!({ "message": "Document queued for reprocessing", "document": document })))
}

pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<DocumentStats>, ApiError> {
    let stats = documents::stats(&state)
        .await
        .map_err(|e| document_error(e, "Failed to retrieve document statistics"))?;
    Ok(Json(stats))
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
