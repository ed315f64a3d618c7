//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the post timeline and attachments
//! - Authentication middleware
//! - Error to response mapping

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use postline_core::attachment::AttachmentService;
use postline_core::post::{AttachmentLinker, PostDeleter, TimelineService};
use postline_core::storage::StorageService;
use postline_db::{AttachmentRepository, PostRepository, UserRepository};
use postline_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Blob storage for attachment files.
    pub storage: Arc<StorageService>,
}

impl AppState {
    fn posts(&self) -> Arc<PostRepository> {
        Arc::new(PostRepository::new((*self.db).clone()))
    }

    fn attachments(&self) -> Arc<AttachmentRepository> {
        Arc::new(AttachmentRepository::new((*self.db).clone()))
    }

    /// Timeline reads.
    #[must_use]
    pub fn timeline(&self) -> TimelineService<PostRepository, UserRepository> {
        TimelineService::new(
            self.posts(),
            Arc::new(UserRepository::new((*self.db).clone())),
        )
    }

    /// Post creation.
    #[must_use]
    pub fn linker(&self) -> AttachmentLinker<PostRepository, AttachmentRepository> {
        AttachmentLinker::new(self.posts(), self.attachments())
    }

    /// Post deletion.
    #[must_use]
    pub fn deleter(&self) -> PostDeleter<PostRepository, StorageService> {
        PostDeleter::new(self.posts(), Arc::clone(&self.storage))
    }

    /// Uploads and downloads.
    #[must_use]
    pub fn attachment_service(&self) -> AttachmentService<AttachmentRepository, StorageService> {
        AttachmentService::new(
            self.attachments(),
            Arc::clone(&self.storage),
            self.storage.policy().clone(),
        )
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    // Leave headroom over the file limit for multipart framing.
    let body_limit = usize::try_from(state.storage.policy().max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024);

    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
