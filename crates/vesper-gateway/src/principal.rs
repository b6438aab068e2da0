//! Principal-extraction seam. OAuth/JWT issuance and verification are out of
//! scope for the core (spec.md §1); this extractor is the interface point a
//! real auth layer plugs into. It trusts an already-verified identity
//! forwarded as `X-Vesper-User` — the shape an upstream auth proxy or
//! middleware would set after checking a bearer token, not a replacement
//! for that check.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::GatewayError;

pub struct Principal(pub String);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get("x-vesper-user")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Unauthenticated("missing X-Vesper-User header".to_string()))?;

        Ok(Principal(username.to_string()))
    }
}
