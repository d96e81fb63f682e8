//! Error types for cfsync.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid IP range: {0}")]
    InvalidRange(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Reload error: {0}")]
    Reload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            SyncError::Network("HTTP 503".to_string()).to_string(),
            "Network error: HTTP 503"
        );
        assert_eq!(
            SyncError::Configuration("template missing".to_string()).to_string(),
            "Configuration error: template missing"
        );
    }
}
