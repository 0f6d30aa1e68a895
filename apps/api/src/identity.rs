//! Request identity.
//!
//! Authentication happens upstream. A signed-in request arrives with
//! `x-user-id` (the user's UUID); anonymous browsers send an opaque
//! `x-session-id`. A request may carry both.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_HEADER: &str = "x-user-id";
pub const SESSION_HEADER: &str = "x-session-id";
const MAX_SESSION_ID_LEN: usize = 128;

/// Who owns the ledger being touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(Uuid),
    Guest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub session_id: Option<String>,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let session_id = match header(headers, SESSION_HEADER) {
            Some(raw) => Some(validate_session_id(raw)?),
            None => None,
        };

        if let Some(raw) = header(headers, USER_HEADER) {
            let user_id = Uuid::parse_str(raw)
                .map_err(|_| AppError::fields(&[(USER_HEADER, "must be a UUID")]))?;
            return Ok(Caller {
                identity: Identity::User(user_id),
                session_id,
            });
        }

        match session_id {
            Some(session_id) => Ok(Caller {
                identity: Identity::Guest(session_id.clone()),
                session_id: Some(session_id),
            }),
            None => Err(AppError::Unauthorized),
        }
    }

    /// Key for per-browser state: the conversation and the suggestion slot.
    pub fn session_key(&self) -> String {
        match (&self.session_id, &self.identity) {
            (Some(session_id), _) => session_id.clone(),
            (None, Identity::User(user_id)) => format!("user-{user_id}"),
            (None, Identity::Guest(session_id)) => session_id.clone(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn validate_session_id(raw: &str) -> Result<String, AppError> {
    let valid = raw.len() <= MAX_SESSION_ID_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(raw.to_string())
    } else {
        Err(AppError::fields(&[(
            SESSION_HEADER,
            "must be at most 128 characters of [A-Za-z0-9_-]",
        )]))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}
