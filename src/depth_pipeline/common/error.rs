use thiserror::Error;

/// Every variant aborts the current run. Missing depth information is never
/// an error; it is carried by sentinel values instead.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read container: {0}")]
    ContainerError(String),

    #[error("Stream mismatch: {0}")]
    StreamMismatchError(String),

    #[error("Unsupported frame format: {0}")]
    UnsupportedFormatError(String),

    #[error("Failed to decode video frame: {0}")]
    DecodeError(String),

    #[error("Failed to encode output image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to serialize camera intrinsics: {0}")]
    SerializeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
