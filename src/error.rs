//! Error types for decoding and loading animated images.

use crate::BuildError;
use thiserror::Error;

/// Errors raised while reading an animated image container.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The data does not start with a known signature
    #[error("Not a recognized animated image container")]
    UnrecognizedFormat,

    /// The data ends before the container header does
    #[error("Data too small: expected at least {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// An unknown block introducer was found
    #[error("Unexpected block 0x{byte:02x} at offset {offset}")]
    Malformed { offset: usize, byte: u8 },

    /// The container holds no frames at all
    #[error("No readable frames")]
    NoReadableFrames,

    /// Pixel decoding failed
    #[cfg(feature = "gif")]
    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// Any failure on the way from bytes to a [`Timeline`](crate::Timeline).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
