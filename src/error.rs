//! Error types for the MeiLin ambient host.

use meilin_ambient::AmbientError;

/// Top-level error type for the ambient host.
#[derive(Debug, thiserror::Error)]
pub enum MeiLinError {
    /// Host configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Behavior pack or selector error.
    #[error("ambient error: {0}")]
    Ambient(#[from] AmbientError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Loop or channel error.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MeiLinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_errors_convert() {
        let err: MeiLinError = AmbientError::UnknownMode("hyper".into()).into();
        assert_eq!(
            err.to_string(),
            "ambient error: unknown personality mode: hyper"
        );
    }

    #[test]
    fn display_runtime() {
        let err = MeiLinError::Runtime("ambient loop stopped".into());
        assert_eq!(err.to_string(), "runtime error: ambient loop stopped");
    }
}
