//! Error types for the styled rendering pipeline.

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Everything a render pass, an asset load or an export can fail with.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The matrix has more modules than the target has pixels on one axis.
    /// Raised before anything is drawn.
    #[error("the canvas is too small: {module_count} modules do not fit in {width}x{height}")]
    Configuration {
        module_count: usize,
        width: u32,
        height: u32,
    },

    #[error("failed to load asset '{source_name}': {message}")]
    AssetLoad {
        source_name: String,
        message: String,
    },

    #[error("no drawing surface available for {width}x{height}")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("qr encoding failed: {0}")]
    Encode(String),

    #[error("export failed: {0}")]
    Export(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render worker is not running")]
    WorkerUnavailable,
}

impl RenderError {
    /// Create an asset error for the given source.
    pub fn asset(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::AssetLoad {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
