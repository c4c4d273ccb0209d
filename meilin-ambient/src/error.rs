//! Error types for the meilin-ambient crate.
//!
//! A selection that finds nothing eligible is not an error. Selectors
//! return `Ok(None)` for that case.

/// Errors raised while loading packs or driving a selector.
#[derive(Debug, thiserror::Error)]
pub enum AmbientError {
    /// A catalogue or mode table entry is malformed. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mode id that is not registered in the mode table.
    #[error("unknown personality mode: {0}")]
    UnknownMode(String),

    /// The pack document could not be parsed.
    #[error("pack parse error: {0}")]
    Pack(String),

    /// The pack file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for meilin-ambient results.
pub type Result<T> = std::result::Result<T, AmbientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_configuration() {
        let err = AmbientError::Configuration("duplicate behavior id: sigh".into());
        assert_eq!(
            err.to_string(),
            "configuration error: duplicate behavior id: sigh"
        );
    }

    #[test]
    fn display_unknown_mode() {
        let err = AmbientError::UnknownMode("hyper".into());
        assert_eq!(err.to_string(), "unknown personality mode: hyper");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AmbientError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AmbientError>();
    }
}
