//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response structures for API communication
//!
//! User routes live under `/api/v1`, administrative routes under
//! `/api/v1/admin`. All endpoints carry OpenAPI annotations via `utoipa`;
//! the rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;
