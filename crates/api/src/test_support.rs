//! Router harness for handler tests that never reach the database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, create_router};
use postline_core::storage::{StorageConfig, StorageProvider, StorageService};
use postline_shared::{JwtConfig, JwtService};

pub struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = StorageService::from_config(StorageConfig::new(StorageProvider::Memory))
            .expect("memory storage");
        let state = AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
            storage: Arc::new(storage),
        };
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub fn token(&self, username: &str) -> String {
        self.state
            .jwt_service
            .generate_access_token(Uuid::new_v4(), username)
            .expect("should generate token")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    pub async fn json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// A single-part `multipart/form-data` body and its content type header.
pub fn multipart_body(
    field: &str,
    filename: &str,
    part_type: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "postline-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {part_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
