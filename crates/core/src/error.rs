#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity}")]
    NotFound { entity: &'static str },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Unknown notification kind: {0}")]
    UnknownNotificationKind(String),
}

impl CoreError {
    /// Wrap any displayable storage-layer error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Wrap any displayable transport-layer error.
    pub fn delivery(err: impl std::fmt::Display) -> Self {
        Self::Delivery(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_omits_user_secret() {
        let err = CoreError::NotFound {
            entity: "notification_profile",
        };
        assert_eq!(err.to_string(), "Entity not found: notification_profile");
    }

    #[test]
    fn storage_helper_keeps_message() {
        let err = CoreError::storage("connection reset");
        assert_eq!(err.to_string(), "Storage error: connection reset");
    }

    #[test]
    fn delivery_helper_keeps_message() {
        let err = CoreError::delivery("webhook: HTTP 502; email: relay refused");
        assert_eq!(
            err.to_string(),
            "Delivery failed: webhook: HTTP 502; email: relay refused"
        );
    }
}
