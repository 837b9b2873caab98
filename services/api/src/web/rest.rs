//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Besides session creation and the snapshot read, this module serves the
//! two tool-like query contracts the engine exposes to the language-model
//! collaborator: snippet search and range excerpting over the current
//! document text.

use crate::web::state::AppState;
use annotation_core::document::{find_ranges, range_text};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        get_snapshot_handler,
        search_document_handler,
        get_range_handler,
    ),
    components(
        schemas(CreateSessionRequest, CreateSessionResponse, RangeHit, RangeExcerptResponse)
    ),
    tags(
        (name = "Annotation API", description = "API endpoints for the annotated-document chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The payload for creating a session from a plain-text document.
#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// The full document text, UTF-8.
    pub content: String,
}

/// The response payload sent after successfully creating a session.
#[derive(Serialize, ToSchema)]
pub struct CreateSessionResponse {
    session_id: Uuid,
}

/// One occurrence of a searched snippet, as a half-open char range.
#[derive(Serialize, ToSchema)]
pub struct RangeHit {
    start: usize,
    end: usize,
}

/// The exact text of a document range, with optional surrounding context.
#[derive(Serialize, ToSchema)]
pub struct RangeExcerptResponse {
    start: usize,
    end: usize,
    text: String,
    context: String,
}

#[derive(Deserialize, IntoParams)]
pub struct SearchParams {
    /// The exact text to look for in the document.
    pub snippet: String,
}

#[derive(Deserialize, IntoParams)]
pub struct RangeParams {
    pub start: usize,
    pub end: usize,
    /// Chars of context to include either side of the range.
    #[serde(default)]
    pub padding: usize,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a new session from a plain-text document.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse),
        (status = 400, description = "Empty document")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if payload.content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Document content must not be empty".to_string(),
        ));
    }
    let session_id = app_state.create_session(payload.content).await;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    ))
}

/// Read the full store snapshot for a session.
///
/// The snapshot is the single serialized form of the engine's entities; a
/// persistence collaborator can store it and recreate the session from it.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/snapshot",
    responses(
        (status = 200, description = "The current store snapshot as JSON"),
        (status = 404, description = "Unknown session")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session to read")
    )
)]
pub async fn get_snapshot_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = app_state
        .session(session_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Unknown session".to_string()))?;
    let snapshot = session.lock().await.store.clone();
    Ok(Json(snapshot))
}

/// Find every occurrence of a text snippet in the session's document.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/search",
    responses(
        (status = 200, description = "Matching char ranges, in document order", body = [RangeHit]),
        (status = 404, description = "Unknown session")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session whose document to search"),
        SearchParams
    )
)]
pub async fn search_document_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = app_state
        .session(session_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Unknown session".to_string()))?;
    let hits: Vec<RangeHit> = {
        let session = session.lock().await;
        find_ranges(&session.store.content, &params.snippet)
            .into_iter()
            .map(|c| RangeHit {
                start: c.start,
                end: c.end,
            })
            .collect()
    };
    Ok(Json(hits))
}

/// Read the exact document text for a char range, with optional padding.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/range",
    responses(
        (status = 200, description = "The excerpted range", body = RangeExcerptResponse),
        (status = 404, description = "Unknown session, or the clamped range is empty")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session whose document to excerpt"),
        RangeParams
    )
)]
pub async fn get_range_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = app_state
        .session(session_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Unknown session".to_string()))?;
    let excerpt = {
        let session = session.lock().await;
        range_text(
            &session.store.content,
            params.start,
            params.end,
            params.padding,
        )
    };
    match excerpt {
        Some(excerpt) => Ok(Json(RangeExcerptResponse {
            start: excerpt.start,
            end: excerpt.end,
            text: excerpt.text,
            context: excerpt.context,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            "The requested range contains no document text".to_string(),
        )),
    }
}
