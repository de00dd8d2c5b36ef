//! Resolving the authenticated principal for a request.
//!
//! Session issuance is handled by an identity-aware proxy in front of this
//! server. After authenticating the client it forwards the user's stable ID in
//! the [USER_ID_HEADER] header. Handlers receive the principal through the
//! [Principal] extractor and pass it explicitly into every ledger operation,
//! so the core never reads ambient session state.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{Error, database_id::UserId};

/// The header the upstream identity layer uses to forward the authenticated
/// user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub UserId);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|text| text.parse().ok())
            .map(Principal)
            .ok_or(Error::Unauthorized)
    }
}
