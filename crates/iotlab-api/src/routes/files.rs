//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Flat text file CRUD routes."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use iotlab_logging::LogContext;
use iotlab_store::{NewFile, StoreError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{parse_optional_json, record, ApiError, ErrorResponse, Messages};
use crate::ApiState;

const FILE_MESSAGES: Messages = Messages {
    conflict: "File already exists",
    not_found: "File not found",
    missing_body: "Missing JSON body",
};

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ContentResponse {
    #[schema(example = "hello")]
    content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CreatedResponse {
    #[schema(example = "File created")]
    message: String,
    #[schema(example = "notes.txt")]
    filename: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct MessageResponse {
    #[schema(example = "File updated")]
    message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_owned(),
        })
    }
}

/// Body of a file overwrite; a missing `content` empties the file.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct UpdateRequest {
    #[serde(default)]
    #[schema(example = "bye")]
    content: Option<String>,
}

pub(crate) fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/files", get(list_files).post(create_file))
        .route(
            "/files/:filename",
            get(get_file).put(update_file).delete(delete_file),
        )
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses((status = 200, description = "File names", body = [String]))
)]
pub(crate) async fn list_files(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<String>>, ApiError> {
    state
        .files()
        .list()
        .map(Json)
        .map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))
}

#[utoipa::path(
    get,
    path = "/files/{filename}",
    tag = "files",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File content", body = ContentResponse),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub(crate) async fn get_file(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state
        .files()
        .get(&filename)
        .map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))?;
    Ok(Json(ContentResponse { content }))
}

#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    request_body(content = NewFile, description = "Name and initial text", content_type = "application/json"),
    responses(
        (status = 201, description = "File created", body = CreatedResponse),
        (status = 400, description = "Missing or invalid JSON body, or invalid file name", body = ErrorResponse),
        (status = 409, description = "File already exists", body = ErrorResponse)
    )
)]
pub(crate) async fn create_file(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let body: Option<NewFile> = parse_optional_json(&body)?;
    let requested = body.as_ref().and_then(|b| b.filename.clone());
    let ctx = LogContext::new()
        .with_resource(requested.as_deref().unwrap_or("<generated>"))
        .with_operation("create");
    let result = state.files().create(body);
    record(&ctx, "file.create", &result);
    let filename = result.map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "File created".to_owned(),
            filename,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/files/{filename}",
    tag = "files",
    params(("filename" = String, Path, description = "Stored file name")),
    request_body(content = UpdateRequest, description = "Replacement text", content_type = "application/json"),
    responses(
        (status = 200, description = "File updated", body = MessageResponse),
        (status = 400, description = "Invalid file name, missing or invalid JSON body", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub(crate) async fn update_file(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let body: Option<UpdateRequest> = match parse_optional_json(&body) {
        Ok(body) => body,
        Err(err) => {
            let exists = state
                .files()
                .exists(&filename)
                .map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))?;
            if !exists {
                return Err(ApiError::from_store(
                    StoreError::NotFound(filename),
                    &FILE_MESSAGES,
                ));
            }
            return Err(err);
        }
    };
    let ctx = LogContext::new()
        .with_resource(&filename)
        .with_operation("update");
    let result = state
        .files()
        .update(&filename, body.map(|request| request.content));
    record(&ctx, "file.update", &result);
    result.map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))?;
    Ok(MessageResponse::new("File updated"))
}

#[utoipa::path(
    delete,
    path = "/files/{filename}",
    tag = "files",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_file(
    State(state): State<Arc<ApiState>>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ctx = LogContext::new()
        .with_resource(&filename)
        .with_operation("delete");
    let result = state.files().delete(&filename);
    record(&ctx, "file.delete", &result);
    result.map_err(|err| ApiError::from_store(err, &FILE_MESSAGES))?;
    Ok(MessageResponse::new("File deleted"))
}
