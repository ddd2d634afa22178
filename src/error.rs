//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum SonogramError {
    /// Malformed or unsupported audio container.
    #[error("Format error: {message}")]
    Format { message: String },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid channel {channel}: audio has {channels} channel(s)")]
    InvalidChannel { channel: usize, channels: usize },

    #[error("Cannot specify both {first} and {second}")]
    MutuallyExclusive { first: &'static str, second: &'static str },

    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    /// Unknown window function, color map or audio container.
    #[error("Unsupported encoding: {message}")]
    UnsupportedEncoding { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl SonogramError {
    pub fn format<S: Into<String>>(msg: S) -> Self { Self::Format { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::InvalidConfig { message: msg.into() } }
    pub fn range<S: Into<String>>(msg: S) -> Self { Self::InvalidRange { message: msg.into() } }
    pub fn unsupported<S: Into<String>>(msg: S) -> Self { Self::UnsupportedEncoding { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }

    pub fn exclusive(first: &'static str, second: &'static str) -> Self {
        Self::MutuallyExclusive { first, second }
    }
}

pub type Result<T> = std::result::Result<T, SonogramError>;

impl From<std::io::Error> for SonogramError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<image::ImageError> for SonogramError {
    fn from(err: image::ImageError) -> Self { Self::io(format!("Image: {}", err)) }
}

impl From<claxon::Error> for SonogramError {
    fn from(err: claxon::Error) -> Self {
        match err {
            claxon::Error::IoError(e) => Self::io(e.to_string()),
            other => Self::format(format!("FLAC: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SonogramError::format("unknown chunk ID: ABCD");
        assert_eq!(e.to_string(), "Format error: unknown chunk ID: ABCD");

        let e = SonogramError::InvalidChannel { channel: 2, channels: 2 };
        assert!(e.to_string().contains("channel 2"));

        let e = SonogramError::exclusive("overlap", "segments");
        assert_eq!(e.to_string(), "Cannot specify both overlap and segments");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: SonogramError = io.into();
        assert!(matches!(e, SonogramError::Io { .. }));
    }
}
