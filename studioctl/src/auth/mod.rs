//! Actor identity from trusted proxy headers.
//!
//! The engine never verifies credentials itself; an upstream proxy
//! authenticates the caller and forwards their id and role in headers named
//! by [`AuthConfig`](crate::config::AuthConfig). Handlers take a
//! [`CurrentActor`] (any authenticated caller) or [`RequireAdmin`]
//! (admin-only routes) extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

use crate::errors::{Error, Result};
use crate::types::AccountId;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Professional,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "professional" => Ok(Role::Professional),
            _ => Err(()),
        }
    }
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor {
    pub id: AccountId,
    pub role: Role,
}

impl CurrentActor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header = |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());

        let raw_id = header(&state.config.auth.id_header).ok_or(Error::Unauthenticated {
            message: Some("Missing identity header".to_string()),
        })?;
        let id: AccountId = raw_id.parse().map_err(|_| Error::Unauthenticated {
            message: Some("Identity header is not a valid UUID".to_string()),
        })?;

        // A proxy that authenticates but does not classify the caller gets
        // the least-privileged role.
        let role = match header(&state.config.auth.role_header) {
            Some(raw) => raw.parse().map_err(|_| Error::Unauthenticated {
                message: Some(format!("Unknown role '{raw}'")),
            })?,
            None => {
                trace!("no role header, defaulting to professional");
                Role::Professional
            }
        };

        debug!(actor = %id, ?role, "authenticated actor");
        Ok(CurrentActor { id, role })
    }
}

/// Extractor for admin-only routes; rejects everyone else with 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub CurrentActor);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let actor = CurrentActor::from_request_parts(parts, state).await?;
        if !actor.is_admin() {
            return Err(Error::Forbidden {
                action: "access administrative operations".to_string(),
            });
        }
        Ok(RequireAdmin(actor))
    }
}
