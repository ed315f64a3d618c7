//! Attachment upload and download routes.

use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};
use postline_core::attachment::{Attachment, UploadInput};
use postline_shared::types::{AttachmentId, PostId};

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Public attachment routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/attachments/{name}", get(download))
}

/// Routes that require authentication.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/posts/upload", post(upload))
}

/// Attachment as returned to clients.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    /// Attachment ID, passed back when creating a post.
    pub id: AttachmentId,
    /// Blob name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Upload time (RFC 3339).
    pub created_at: String,
    /// Owning post, once linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    /// Download path.
    pub url: String,
}

impl From<Attachment> for AttachmentResponse {
    fn from(a: Attachment) -> Self {
        Self {
            url: format!("/api/v1/attachments/{}", a.blob_name),
            id: a.id,
            name: a.blob_name,
            content_type: a.content_type,
            created_at: a.created_at.to_rfc3339(),
            post_id: a.post_id,
        }
    }
}

/// POST `/posts/upload`
/// Store a file as an unlinked attachment.
async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AttachmentResponse>)> {
    let mut input = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        input = Some(UploadInput {
            filename,
            content_type,
            bytes,
        });
        break;
    }

    let input =
        input.ok_or_else(|| ApiError::validation(format!("missing multipart field `{FILE_FIELD}`")))?;

    let attachment = state.attachment_service().upload(input).await?;

    info!(
        user_id = %auth.user_id(),
        attachment_id = %attachment.id,
        "Attachment stored"
    );

    Ok((StatusCode::CREATED, Json(attachment.into())))
}

/// GET `/attachments/{name}`
/// Serve a stored file with its recorded content type.
async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let (attachment, bytes) = state.attachment_service().download(&name).await?;

    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}
