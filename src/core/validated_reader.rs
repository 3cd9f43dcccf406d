use super::error::{PDFError, PDFResult};
use super::read_validator::ReadValidator;

/// Upper bound on the read-ahead buffer, whatever the configured padding.
pub const MAX_READ_AHEAD: u64 = 1 << 20;

/// A positioned reader over a [`ReadValidator`] with a fixed read-ahead buffer.
///
/// Every refill is pre-flighted with
/// [`ReadValidator::check_data_range_and_request_if_unavailable`], whose
/// padding covers the refill window, so a missing window is requested
/// as a whole instead of one byte at a time. The buffer is the padding capped
/// at the file size and [`MAX_READ_AHEAD`], and is only allocated on refill.
///
/// `DataNotAvailable` and `ReadFailed` errors are retryable: the position is
/// left unchanged and the same call succeeds once the host has delivered the
/// scheduled ranges.
pub struct ValidatedReader<'a> {
    validator: &'a ReadValidator,
    /// Current read position
    pos: u64,
    /// Read-ahead buffer
    buffer: Vec<u8>,
    /// File offset of `buffer[0]`
    buffer_offset: u64,
    /// Refill size in bytes
    buffer_size: usize,
}

impl<'a> ValidatedReader<'a> {
    pub fn new(validator: &'a ReadValidator) -> Self {
        let buffer_size = validator
            .config()
            .read_ahead_padding()
            .min(validator.file_size())
            .clamp(1, MAX_READ_AHEAD);
        ValidatedReader {
            validator,
            pos: 0,
            buffer: Vec::new(),
            buffer_offset: 0,
            buffer_size: usize::try_from(buffer_size).unwrap_or(usize::MAX),
        }
    }

    /// Returns the total length of the underlying document.
    pub fn length(&self) -> u64 {
        self.validator.file_size()
    }

    /// Returns the current position.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Sets the current position.
    pub fn set_pos(&mut self, pos: u64) -> PDFResult<()> {
        if pos > self.length() {
            return Err(PDFError::InvalidPosition {
                pos,
                length: self.length(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Reads and returns a single byte, advancing the position.
    pub fn get_byte(&mut self) -> PDFResult<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads a single byte without advancing the position.
    pub fn peek_byte(&mut self) -> PDFResult<u8> {
        if self.pos >= self.length() {
            return Err(PDFError::UnexpectedEndOfStream);
        }
        if !self.buffer_contains(self.pos, 1) {
            self.fill_buffer(self.pos)?;
        }
        Ok(self.buffer[(self.pos - self.buffer_offset) as usize])
    }

    /// Reads exactly `length` bytes, advancing the position.
    pub fn get_bytes(&mut self, length: usize) -> PDFResult<Vec<u8>> {
        let end = self
            .pos
            .checked_add(length as u64)
            .ok_or(PDFError::RangeOverflow {
                offset: self.pos,
                size: length as u64,
            })?;
        if end > self.length() {
            return Err(PDFError::UnexpectedEndOfStream);
        }
        if length == 0 {
            return Ok(Vec::new());
        }

        let bytes = if length <= self.buffer_size {
            if !self.buffer_contains(self.pos, length) {
                self.fill_buffer(self.pos)?;
            }
            let begin = (self.pos - self.buffer_offset) as usize;
            self.buffer[begin..begin + length].to_vec()
        } else {
            let mut bytes = vec![0u8; length];
            self.read_validated(&mut bytes, self.pos)?;
            bytes
        };

        self.pos = end;
        Ok(bytes)
    }

    /// Skips `n` bytes by advancing the position.
    pub fn skip(&mut self, n: u64) -> PDFResult<()> {
        let target = self.pos.saturating_add(n);
        self.set_pos(target)
    }

    fn buffer_contains(&self, pos: u64, length: usize) -> bool {
        pos >= self.buffer_offset
            && pos + length as u64 <= self.buffer_offset + self.buffer.len() as u64
    }

    fn fill_buffer(&mut self, pos: u64) -> PDFResult<()> {
        let remaining = self.length() - pos;
        let len = remaining.min(self.buffer_size as u64) as usize;
        if len == 0 {
            return Err(PDFError::UnexpectedEndOfStream);
        }

        // The validator's padding covers the refill window.
        if !self
            .validator
            .check_data_range_and_request_if_unavailable(pos, 0)
        {
            return Err(PDFError::DataNotAvailable {
                offset: pos,
                size: len as u64,
            });
        }

        let mut block = vec![0u8; len];
        self.read_validated(&mut block, pos)?;
        self.buffer = block;
        self.buffer_offset = pos;
        Ok(())
    }

    fn read_validated(&self, buffer: &mut [u8], offset: u64) -> PDFResult<()> {
        let session = self.validator.session();
        if session.read_block_at_offset(buffer, offset) {
            return Ok(());
        }

        let size = buffer.len() as u64;
        if session.read_error() {
            Err(PDFError::ReadFailed { offset, size })
        } else {
            Err(PDFError::DataNotAvailable { offset, size })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk_manager::{ChunkManager, ChunkedFile};
    use crate::core::file_access::{DownloadHints, MemoryByteSource};
    use crate::core::read_validator::ValidatorConfig;

    #[test]
    fn test_reads_resident_data() {
        let data: Vec<u8> = (0..=255).collect();
        let validator = ReadValidator::new(MemoryByteSource::from_bytes(data))
            .with_config(ValidatorConfig::new(Some(16), Some(16)));
        let mut reader = ValidatedReader::new(&validator);

        assert_eq!(reader.get_byte().unwrap(), 0);
        assert_eq!(reader.peek_byte().unwrap(), 1);
        assert_eq!(reader.get_bytes(20).unwrap()[19], 20);
        assert_eq!(reader.pos(), 21);

        reader.set_pos(250).unwrap();
        assert_eq!(reader.get_bytes(6).unwrap(), vec![250, 251, 252, 253, 254, 255]);
        assert_eq!(reader.get_byte(), Err(PDFError::UnexpectedEndOfStream));
    }

    #[test]
    fn test_missing_window_is_requested_then_retried() {
        let file = ChunkedFile::new(ChunkManager::new(1024, Some(256), None));
        let hints = DownloadHints::new();
        let validator = ReadValidator::new(file.clone())
            .with_oracle(file.clone())
            .with_hints(hints.clone())
            .with_config(ValidatorConfig::new(Some(256), Some(256)));
        let mut reader = ValidatedReader::new(&validator);

        reader.set_pos(300).unwrap();
        let result = reader.get_byte();
        assert!(matches!(result, Err(PDFError::DataNotAvailable { offset: 300, .. })));
        assert_eq!(reader.pos(), 300);

        for segment in hints.take() {
            let begin = segment.offset();
            let data: Vec<u8> = (begin..segment.end()).map(|i| (i % 251) as u8).collect();
            file.on_receive_range(begin, &data).unwrap();
        }

        assert_eq!(reader.get_byte().unwrap(), (300 % 251) as u8);
    }

    #[test]
    fn test_huge_padding_is_capped() {
        let data: Vec<u8> = (0..64).collect();
        let validator = ReadValidator::new(MemoryByteSource::from_bytes(data))
            .with_config(ValidatorConfig::new(None, Some(u64::MAX / 2)));
        let mut reader = ValidatedReader::new(&validator);

        assert_eq!(reader.buffer_size, 64);
        reader.set_pos(10).unwrap();
        assert_eq!(reader.get_bytes(4).unwrap(), vec![10, 11, 12, 13]);
        assert_eq!(reader.buffer.len(), 54);
    }

    #[test]
    fn test_set_pos_out_of_bounds() {
        let validator = ReadValidator::new(MemoryByteSource::from_bytes(vec![0; 10]));
        let mut reader = ValidatedReader::new(&validator);
        assert_eq!(
            reader.set_pos(11),
            Err(PDFError::InvalidPosition { pos: 11, length: 10 })
        );
    }
}
