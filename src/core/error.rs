use thiserror::Error;

/// Universal error type for the availability and rendering layers.
///
/// Public entry points (the read validator, the render driver, page close)
/// never surface this type: they fold it into a `bool` or a
/// [`RenderState`](crate::rendering::RenderState). It is used for the
/// internal fallible steps underneath them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PDFError {
    /// `offset + size` is not representable in 64 bits
    #[error("Byte range overflow: offset {offset} + size {size}")]
    RangeOverflow { offset: u64, size: u64 },

    /// Data not yet delivered by the host (a download hint has been scheduled)
    #[error("Data not available: {size} bytes at offset {offset}")]
    DataNotAvailable { offset: u64, size: u64 },

    /// Data was reported available but the underlying read failed
    #[error("Read failed: {size} bytes at offset {offset}")]
    ReadFailed { offset: u64, size: u64 },

    /// Invalid byte range requested
    #[error("Invalid byte range: {begin}..{end}")]
    InvalidByteRange { begin: u64, end: u64 },

    /// Invalid stream position
    #[error("Invalid position {pos} for stream of length {length}")]
    InvalidPosition { pos: u64, length: u64 },

    /// End of stream reached unexpectedly
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    /// Image or stream data could not be decoded
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Drawing failed in the device or the rendering context
    #[error("Rendering error: {0}")]
    RenderingError(String),

    /// Operation is not valid in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Stream operation failed
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl PDFError {
    /// Returns true for errors that go away once the host delivers more bytes.
    ///
    /// A failed read of data reported as available is treated the same way as
    /// missing data: both lead to a re-fetch request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PDFError::DataNotAvailable { .. } | PDFError::ReadFailed { .. }
        )
    }
}

/// Result type alias for PDF operations
pub type PDFResult<T> = Result<T, PDFError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(PDFError::DataNotAvailable { offset: 0, size: 1 }.is_retryable());
        assert!(PDFError::ReadFailed { offset: 0, size: 1 }.is_retryable());
        assert!(!PDFError::RangeOverflow { offset: u64::MAX, size: 1 }.is_retryable());
        assert!(!PDFError::UnexpectedEndOfStream.is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = PDFError::DataNotAvailable { offset: 512, size: 100 };
        assert_eq!(err.to_string(), "Data not available: 100 bytes at offset 512");

        let err = PDFError::InvalidByteRange { begin: 10, end: 4 };
        assert_eq!(err.to_string(), "Invalid byte range: 10..4");
    }
}
