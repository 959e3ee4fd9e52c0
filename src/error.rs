use thiserror::Error;

/// Failure to obtain the bytes of one frame.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame resource not found: {0}")]
    NotFound(String),

    #[error("Fetch failed: {0}")]
    Other(String),
}

/// Malformed or incomplete header or pixel data in one frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Buffer is not a DICOM file")]
    NotDicom,

    #[error("Missing {0} element")]
    MissingElement(&'static str),

    #[error("Unsupported bits allocated: {0}")]
    UnsupportedBitsAllocated(u16),

    #[error("Encapsulated pixel data is not supported")]
    EncapsulatedPixelData,

    #[error("Pixel data too short: expected {expected} samples, found {actual}")]
    PixelDataLength { expected: usize, actual: usize },

    #[error("Invalid image dimensions: {columns}x{rows}")]
    InvalidDimensions { rows: u16, columns: u16 },
}

/// Preconditions of the coordinate model that do not hold.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Viewport or frame has an empty size")]
    EmptyViewport,

    #[error("No frame is loaded")]
    NoFrame,

    #[error("Transform is not invertible")]
    SingularMatrix,
}

/// Failure of a single frame load, recorded against its cache slot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Decode task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}
