use std::path::PathBuf;

/// Failure kinds raised while resolving or loading classes.
///
/// Public operations return `anyhow::Error`; the kind stays reachable through
/// `downcast_ref::<ScanError>()`.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("I/O failure at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed resource location: {location} ({reason})")]
    MalformedResource { location: String, reason: String },

    #[error("invalid class file for {class_name}: {reason}")]
    ClassFormat { class_name: String, reason: String },

    #[error("initialization of {class_name} failed: {reason}")]
    Initialization { class_name: String, reason: String },
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResource {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
