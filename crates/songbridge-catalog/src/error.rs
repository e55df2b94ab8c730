// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Bad or expired token. Every further request will fail the same way.
    #[error("Catalog rejected credentials: {status} - {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    Transient { retry_after: Duration },

    #[error("API error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid response from catalog API: {0}")]
    InvalidResponse(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("At most {max} tracks can be added per request, got {size}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Catalog client misconfigured: {0}")]
    Configuration(String),

    #[error("Rate limiter closed")]
    RateLimiterClosed,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Remote { status, .. } => Some(*status),
            Self::Transient { .. } => Some(429),
            Self::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
