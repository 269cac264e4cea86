//! Error types shared by every API module

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top level error returned by all API calls
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client or request configuration, detected before any network call
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A route geometry accessor was called for the wrong variant
    #[error("geometry type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {path}")]
    Status { status: u16, path: String },

    /// The body was shorter or longer than the declared Content-Length
    #[error("content length mismatch (expected {expected} received {received})")]
    ContentLengthMismatch { expected: u64, received: u64 },
}

/// The service answered but signalled a logical error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Mapbox API error api rate limit exceeded")]
    RateLimitExceeded,

    #[error("Mapbox API error unauthorized")]
    Unauthorized,

    #[error("api error: {0}")]
    Message(String),
}

/// Image payload could not be turned into a raster
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("unrecognised content type ({0})")]
    UnsupportedContentType(String),
}

/// Tile-space and raster-space geometry failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("{axis} offset not within tile space ({axis}: {offset} max: {max})")]
    OutOfBounds {
        axis: char,
        offset: i64,
        max: i64,
    },

    /// Tile wrapping is only defined from zoom level 1 upwards
    #[error("invalid zoom level {0}")]
    InvalidZoom(u8),

    #[error("tile dimensions differ ({expected:?} != {found:?})")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("tile grid is empty or ragged")]
    EmptyGrid,
}
