//! Extract the optional caller identity from request extensions.
//!
//! Authentication itself lives outside the engine: whatever middleware the
//! embedding application runs is expected to insert an [`Actor`] into the
//! request extensions after verifying credentials. Absence simply means an
//! anonymous caller.

use crate::api::Actor;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Extractor for the optional caller identity.
#[derive(Clone, Debug)]
pub struct MaybeActor(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeActor(parts.extensions.get::<Actor>().cloned()))
    }
}
