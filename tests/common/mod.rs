use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use stockbook_api::{
    config::AppConfig, db, services::ingestion::IngestionService, AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str =
    "stockbook_integration_signing_key_with_plenty_of_entropy_0x5c2d8b4e_asdfghjk";
pub const TEST_USERNAME: &str = "tester";
pub const TEST_EMAIL: &str = "tester@example.com";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

const MULTIPART_BOUNDARY: &str = "stockbook-test-boundary-7d1f";

/// Helper harness for spinning up the application against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    upload_dir: TempDir,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create database dir");
        let upload_dir = TempDir::new().expect("create upload dir");
        let db_path = db_dir.path().join("stockbook_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            1800,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let mut state = AppState::new(db_arc.clone(), cfg);
        state.services.ingestion =
            Arc::new(IngestionService::new(db_arc).with_temp_dir(upload_dir.path()));

        state
            .auth
            .register(TEST_USERNAME, TEST_EMAIL, TEST_PASSWORD)
            .await
            .expect("register test user");
        let token = state
            .auth
            .login(TEST_USERNAME, TEST_PASSWORD)
            .await
            .expect("login test user")
            .access_token;

        let router = stockbook_api::app_router(state.clone());

        Self {
            router,
            state,
            token,
            upload_dir,
            _db_dir: db_dir,
        }
    }

    /// Access the bearer token for the default user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Directory the ingestion service stages uploads in.
    #[allow(dead_code)]
    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for authenticated requests.
    #[allow(dead_code)]
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Posts `contents` as the `file` field of a multipart upload.
    #[allow(dead_code)]
    pub async fn upload(&self, filename: &str, contents: &[u8], token: Option<&str>) -> Response {
        let mut payload = format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(contents);
        payload.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            );
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        self.send(builder.body(Body::from(payload)).expect("failed to build request"))
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Reads a response body as JSON.
#[allow(dead_code)]
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Builds a sheet with the standard columns for `days` days.
#[allow(dead_code)]
pub fn csv_sheet(days: u32, rows: &[&str]) -> Vec<u8> {
    let mut header = String::from("ID,Product Name,Opening Inventory");
    for day in 1..=days {
        header.push_str(&format!(
            ",Procurement Qty (Day {day}),Procurement Price (Day {day}),Sales Qty (Day {day}),Sales Price (Day {day})"
        ));
    }

    let mut sheet = header;
    for row in rows {
        sheet.push('\n');
        sheet.push_str(row);
    }
    sheet.push('\n');
    sheet.into_bytes()
}
