//! Test utilities for integration testing over the full HTTP stack.

use axum_test::TestServer;
use uuid::Uuid;

use crate::api::models::spaces::{SpaceCreateRequest, SpaceResponse};
use crate::config::Config;
use crate::types::{AccountId, AdminId};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    // Sweeps are triggered explicitly in tests.
    config.sweeper.enabled = false;
    config
}

pub async fn create_test_app() -> (TestServer, crate::BackgroundServices) {
    let app = crate::Application::new(create_test_config())
        .await
        .expect("Failed to create application");
    app.into_test_server()
}

/// Identity headers a trusted proxy would set for a regular account.
pub fn as_account(account_id: AccountId) -> [(&'static str, String); 2] {
    [
        ("x-actor-id", account_id.to_string()),
        ("x-actor-role", "professional".to_string()),
    ]
}

/// Identity headers a trusted proxy would set for an admin.
pub fn as_admin(admin_id: AdminId) -> [(&'static str, String); 2] {
    [("x-actor-id", admin_id.to_string()), ("x-actor-role", "admin".to_string())]
}

pub fn with_identity(mut request: axum_test::TestRequest, headers: &[(&'static str, String)]) -> axum_test::TestRequest {
    for (name, value) in headers {
        request = request.add_header(*name, value.clone());
    }
    request
}

pub async fn create_space(server: &TestServer, admin: AdminId, name: &str, cost_credits: i64) -> SpaceResponse {
    let response = with_identity(server.post("/api/v1/admin/spaces"), &as_admin(admin))
        .json(&SpaceCreateRequest {
            name: name.to_string(),
            description: None,
            capacity: 4,
            cost_credits,
        })
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<SpaceResponse>()
}

pub async fn grant_credits(server: &TestServer, admin: AdminId, account: AccountId, amount: i64) {
    let response = with_identity(
        server.post(&format!("/api/v1/admin/accounts/{account}/credits")),
        &as_admin(admin),
    )
    .json(&serde_json::json!({ "amount": amount }))
    .await;
    response.assert_status(axum::http::StatusCode::CREATED);
}

pub fn test_admin() -> AdminId {
    Uuid::new_v4()
}

pub fn test_account() -> AccountId {
    Uuid::new_v4()
}
