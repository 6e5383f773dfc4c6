use thiserror::Error;

/// Result type for I/O and decode boundaries.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures at the edges of the editor. None of these is fatal: callers log
/// them and fall back to a default value.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),
}
