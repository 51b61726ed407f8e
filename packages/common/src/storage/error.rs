use std::fmt;

/// Errors raised while accepting or storing an upload.
#[derive(Debug)]
pub enum UploadError {
    /// The body exceeded the configured ceiling.
    FileTooLarge { limit: u64 },
    /// Declared MIME type or file signature is not PDF.
    InvalidFileType(String),
    /// A stored path could not be resolved under the upload root.
    InvalidPath(String),
    /// The requested file does not exist.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileTooLarge { limit } => write!(f, "file exceeds size limit of {limit} bytes"),
            Self::InvalidFileType(detail) => write!(f, "unsupported file type: {detail}"),
            Self::InvalidPath(path) => write!(f, "invalid upload path: {path}"),
            Self::NotFound(path) => write!(f, "file not found: {path}"),
            Self::Io(err) => write!(f, "upload IO error: {err}"),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
