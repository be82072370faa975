//! `CallerRecipient` extractor: the recipient identity asserted by the
//! trusted upstream proxy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use herald_core::{AppError, Recipient};

use crate::error::ApiError;

/// Header carrying `user` or `admin`.
pub const RECIPIENT_TYPE_HEADER: &str = "x-recipient-type";
/// Header carrying the numeric recipient id.
pub const RECIPIENT_ID_HEADER: &str = "x-recipient-id";

/// The caller's recipient identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerRecipient(pub Recipient);

impl std::ops::Deref for CallerRecipient {
    type Target = Recipient;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CallerRecipient
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let kind = header_value(parts, RECIPIENT_TYPE_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing x-recipient-type header"))?;
        let id = header_value(parts, RECIPIENT_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing x-recipient-id header"))?
            .parse::<i64>()
            .map_err(|_| AppError::unauthorized("Invalid x-recipient-id header"))?;

        let recipient = Recipient::from_parts(kind, id)
            .map_err(|e| AppError::unauthorized(e.message))?;

        Ok(CallerRecipient(recipient))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
