//! Draft/entity store error taxonomy

use thiserror::Error;

/// Errors returned by the draft/entity store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The draft was evicted by the server-side TTL. Distinguished from a
    /// generic failure so the caller can say "this draft has expired"
    /// instead of showing a retry prompt.
    #[error("draft {activity_id} has expired")]
    Expired { activity_id: String },

    /// Edit-mode load against a missing entity
    #[error("activity {activity_id} not found")]
    NotFound { activity_id: String },

    /// Any other unsuccessful HTTP response
    #[error("store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (DNS, connect, timeout)
    #[error("store request failed: {message}")]
    Network { message: String },

    /// The response body did not match the expected shape
    #[error("failed to decode store response: {message}")]
    Decode { message: String },

    /// No store base URL configured
    #[error("store base URL is not configured")]
    NotConfigured,
}

impl StoreError {
    /// Is this the distinguished expired-draft failure?
    pub fn is_expired(&self) -> bool {
        matches!(self, StoreError::Expired { .. })
    }

    /// Is this a missing-entity failure?
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn expired(activity_id: impl Into<String>) -> Self {
        StoreError::Expired {
            activity_id: activity_id.into(),
        }
    }

    pub fn not_found(activity_id: impl Into<String>) -> Self {
        StoreError::NotFound {
            activity_id: activity_id.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        StoreError::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        StoreError::Decode {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_is_distinguished() {
        assert!(StoreError::expired("act-1").is_expired());
        assert!(!StoreError::not_found("act-1").is_expired());
        assert!(!StoreError::network("connection reset").is_expired());
        assert!(!StoreError::Http {
            status: 500,
            message: "oops".to_string()
        }
        .is_expired());
    }

    #[test]
    fn test_display() {
        let err = StoreError::expired("act-42");
        assert_eq!(err.to_string(), "draft act-42 has expired");

        let err = StoreError::Http {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "store returned HTTP 503: unavailable");
    }
}
