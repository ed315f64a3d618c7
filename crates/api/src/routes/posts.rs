//! Post and timeline routes.
//!
//! Relative reads take the anchor post id in the path:
//! `?direction=after` (default) lists newer posts oldest first, unpaged;
//! any other `direction` pages older posts newest first. With `direction=after`,
//! `count=true` returns `{"count": n}` instead of posts; before-pages ignore it.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::attachments::AttachmentResponse;
use crate::{
    AppState,
    error::ApiResult,
    middleware::AuthUser,
};
use postline_core::post::{Direction, NewPost, Post};
use postline_shared::types::{AttachmentId, PageRequest, PageResponse, PostId, UserId};

/// Public read routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(latest))
        .route("/posts/{id}", get(relative))
        .route("/posts/{id}/detail", get(detail))
        .route("/users/{username}/posts", get(user_latest))
        .route("/users/{username}/posts/{id}", get(user_relative))
}

/// Routes that require authentication.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create))
        .route("/posts/{id}", delete(remove))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a post.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    /// Post text.
    pub content: String,
    /// Previously uploaded attachment to link.
    #[serde(default)]
    pub attachment_id: Option<AttachmentId>,
}

/// Query parameters for reads relative to an anchor post.
#[derive(Debug, Deserialize)]
pub struct RelativeParams {
    /// Which side of the anchor to read.
    #[serde(default)]
    pub direction: Direction,
    /// Return only the number of matching posts.
    #[serde(default)]
    pub count: bool,
    /// Page number for `before` reads (1-indexed).
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size for `before` reads.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// What a relative read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeRead {
    NewCount,
    Newer,
    OlderPage(PageRequest),
}

impl RelativeParams {
    fn read(&self) -> RelativeRead {
        match (self.direction, self.count) {
            (Direction::After, true) => RelativeRead::NewCount,
            (Direction::After, false) => RelativeRead::Newer,
            (Direction::Before, _) => RelativeRead::OlderPage(self.page_request()),
        }
    }

    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }
}

/// Post as returned to clients.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    /// Post ID; the cursor for relative reads.
    pub id: PostId,
    /// Post text.
    pub content: String,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Author.
    pub owner_id: UserId,
    /// Linked attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentResponse>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            content: post.content,
            created_at: post.created_at.to_rfc3339(),
            owner_id: post.owner_id,
            attachment: post.attachment.map(Into::into),
        }
    }
}

fn into_page(page: PageResponse<Post>) -> PageResponse<PostResponse> {
    page.map(PostResponse::from)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/posts`
async fn latest(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<PostResponse>>> {
    let page = state.timeline().get_latest(None, page).await?;
    Ok(Json(into_page(page)))
}

/// GET `/users/{username}/posts`
async fn user_latest(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<PostResponse>>> {
    let page = state.timeline().get_latest(Some(&username), page).await?;
    Ok(Json(into_page(page)))
}

/// GET `/posts/{id}`
async fn relative(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Query(params): Query<RelativeParams>,
) -> ApiResult<Response> {
    relative_to(&state, id, None, &params).await
}

/// GET `/users/{username}/posts/{id}`
async fn user_relative(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, PostId)>,
    Query(params): Query<RelativeParams>,
) -> ApiResult<Response> {
    relative_to(&state, id, Some(&username), &params).await
}

async fn relative_to(
    state: &AppState,
    anchor: PostId,
    username: Option<&str>,
    params: &RelativeParams,
) -> ApiResult<Response> {
    let timeline = state.timeline();

    let response = match params.read() {
        RelativeRead::NewCount => {
            let count = timeline.get_new_count(anchor, username).await?;
            Json(json!({ "count": count })).into_response()
        }
        RelativeRead::Newer => {
            let posts = timeline.get_after(anchor, username, None).await?;
            let posts: Vec<PostResponse> = posts.into_iter().map(Into::into).collect();
            Json(posts).into_response()
        }
        RelativeRead::OlderPage(page) => {
            let page = timeline.get_before(anchor, username, page).await?;
            Json(into_page(page)).into_response()
        }
    };

    Ok(response)
}

/// GET `/posts/{id}/detail`
async fn detail(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> ApiResult<Json<PostResponse>> {
    let post = state.timeline().get_post(id).await?;
    Ok(Json(post.into()))
}

/// POST `/posts`
async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let post = NewPost::new(payload.content, auth.user_id())?;
    let created = state
        .linker()
        .link_on_create(post, payload.attachment_id)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// DELETE `/posts/{id}`
async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    state.deleter().delete_post(id, auth.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
