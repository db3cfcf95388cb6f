use std::sync::Arc;

pub type KilnResult<T> = Result<T, KilnError>;

/// Generic error that contains all the different kinds of errors that may occur when using the API
#[derive(Debug, Clone)]
pub enum KilnError {
    StringError(String),
    IoError(Arc<std::io::Error>),

    /// The caller asked for something the current state cannot satisfy (missing required shader,
    /// too many input layout elements, SRB requested before its pipeline exists). These are
    /// always caller bugs or bad content; the expected recovery is to skip the batch.
    ConfigurationError(String),

    /// The device refused to create a GPU object. Carries enough context to find the offending
    /// state in a log dump.
    BackendObjectCreationFailed {
        object_kind: &'static str,
        debug_name: String,
        hash: u64,
    },

    /// A cooked shader package on disk does not match what we expect (wrong magic, wrong
    /// format version, or wrong shader content hash). The package must be re-cooked.
    ShaderBytecodeMismatch(String),
}

impl std::error::Error for KilnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            KilnError::StringError(_) => None,
            KilnError::IoError(ref e) => Some(&**e),
            KilnError::ConfigurationError(_) => None,
            KilnError::BackendObjectCreationFailed { .. } => None,
            KilnError::ShaderBytecodeMismatch(_) => None,
        }
    }
}

impl core::fmt::Display for KilnError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            KilnError::StringError(ref e) => e.fmt(fmt),
            KilnError::IoError(ref e) => e.fmt(fmt),
            KilnError::ConfigurationError(ref e) => write!(fmt, "configuration error: {}", e),
            KilnError::BackendObjectCreationFailed {
                object_kind,
                ref debug_name,
                hash,
            } => write!(
                fmt,
                "device failed to create {} \"{}\" (hash {:016x})",
                object_kind, debug_name, hash
            ),
            KilnError::ShaderBytecodeMismatch(ref e) => {
                write!(fmt, "cooked shader rejected: {}", e)
            }
        }
    }
}

impl From<&str> for KilnError {
    fn from(str: &str) -> Self {
        KilnError::StringError(str.to_string())
    }
}

impl From<String> for KilnError {
    fn from(string: String) -> Self {
        KilnError::StringError(string)
    }
}

impl From<std::io::Error> for KilnError {
    fn from(error: std::io::Error) -> Self {
        KilnError::IoError(Arc::new(error))
    }
}
