//! HTTP status classification.
//!
//! Maps numeric status codes onto the closed set of codes this client
//! recognizes. Anything outside that set — including 2xx codes other than
//! 200 — classifies as [`HttpStatus::Unknown`].

use serde::{Deserialize, Serialize};

/// The status codes this client distinguishes.
///
/// Only the exact code 200 is treated as success. This is an exact-match
/// policy, not a range check: 201, 204 and every other 2xx code map to
/// [`HttpStatus::Unknown`] and are classified as non-success. Callers that
/// need range semantics should inspect [`HttpStatus::class`] instead of
/// relying on the success flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpStatus {
    /// 200 OK — the only success code.
    Success,
    /// 301 Moved Permanently.
    PermanentRedirect,
    /// 302 Found.
    TemporaryRedirect,
    /// 400 Bad Request.
    BadRequest,
    /// 401 Unauthorized.
    NotAuthorized,
    /// 403 Forbidden.
    Forbidden,
    /// 404 Not Found.
    NotFound,
    /// 500 Internal Server Error.
    InternalServerError,
    /// 503 Service Unavailable.
    ServiceUnavailable,
    /// Any code not in the recognized set.
    Unknown,
}

/// Semantic category of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// The request completed successfully (exactly 200).
    Success,
    /// The request was redirected.
    Redirect,
    /// The client sent an invalid request.
    ClientError,
    /// The server failed to complete a valid request.
    ServerError,
    /// Outside the recognized code set.
    Unknown,
}

impl HttpStatus {
    /// Classifies a numeric status code.
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => HttpStatus::Success,
            301 => HttpStatus::PermanentRedirect,
            302 => HttpStatus::TemporaryRedirect,
            400 => HttpStatus::BadRequest,
            401 => HttpStatus::NotAuthorized,
            403 => HttpStatus::Forbidden,
            404 => HttpStatus::NotFound,
            500 => HttpStatus::InternalServerError,
            503 => HttpStatus::ServiceUnavailable,
            _ => HttpStatus::Unknown,
        }
    }

    /// The numeric code, or 0 for [`HttpStatus::Unknown`].
    pub fn code(&self) -> u16 {
        match self {
            HttpStatus::Success => 200,
            HttpStatus::PermanentRedirect => 301,
            HttpStatus::TemporaryRedirect => 302,
            HttpStatus::BadRequest => 400,
            HttpStatus::NotAuthorized => 401,
            HttpStatus::Forbidden => 403,
            HttpStatus::NotFound => 404,
            HttpStatus::InternalServerError => 500,
            HttpStatus::ServiceUnavailable => 503,
            HttpStatus::Unknown => 0,
        }
    }

    /// True iff the status is exactly 200.
    pub fn is_success(&self) -> bool {
        matches!(self, HttpStatus::Success)
    }

    /// The semantic category of this status.
    pub fn class(&self) -> StatusClass {
        match self {
            HttpStatus::Success => StatusClass::Success,
            HttpStatus::PermanentRedirect | HttpStatus::TemporaryRedirect => StatusClass::Redirect,
            HttpStatus::BadRequest
            | HttpStatus::NotAuthorized
            | HttpStatus::Forbidden
            | HttpStatus::NotFound => StatusClass::ClientError,
            HttpStatus::InternalServerError | HttpStatus::ServiceUnavailable => {
                StatusClass::ServerError
            }
            HttpStatus::Unknown => StatusClass::Unknown,
        }
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpStatus::Unknown => write!(f, "unknown"),
            other => write!(f, "{}", other.code()),
        }
    }
}
