#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Cookie enumeration/removal, tab lookup or storage read failed.
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(#[source] anyhow::Error),

    /// The policy could not be persisted. Nothing was committed.
    #[error("Failed to persist policy for '{domain}': {source}")]
    PersistenceWrite {
        domain: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Classification overlay unavailable: {0}")]
    OverlayUnavailable(String),

    #[error("Classification overlay timed out after {0:?}")]
    OverlayTimeout(std::time::Duration),

    #[error("Classification overlay returned malformed output: {0}")]
    OverlayMalformed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GuardError {
    /// True for the failures that degrade silently instead of reaching the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GuardError::PersistenceWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn persistence_write_is_the_only_surfaced_error() {
        let write = GuardError::PersistenceWrite {
            domain: "shop.example".into(),
            source: anyhow::anyhow!("disk full"),
        };
        assert!(!write.is_recoverable());
        assert_eq!(write.to_string(), "Failed to persist policy for 'shop.example': disk full");

        assert!(GuardError::OverlayTimeout(Duration::from_millis(5)).is_recoverable());
        assert!(GuardError::PlatformUnavailable(anyhow::anyhow!("gone")).is_recoverable());
    }
}
