use super::byte_range::ByteRange;
use super::error::{PDFError, PDFResult};
use super::file_access::ByteSource;
use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A byte source backed by a file on disk.
///
/// The file may still be growing (a download spooled to disk): the size is
/// fixed when the source is opened, and reads past what the file currently
/// holds fail instead of returning short data.
pub struct FileByteSource {
    /// File handle for reading blocks
    file: RefCell<File>,
    /// Path to the file (stored for reference)
    file_path: PathBuf,
    /// Declared document length
    length: u64,
}

impl FileByteSource {
    /// Opens a file, taking its current length as the document size.
    pub fn open<P: AsRef<Path>>(path: P) -> PDFResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file = File::open(&file_path)
            .map_err(|e| PDFError::StreamError(format!("Failed to open file: {}", e)))?;
        let length = file
            .metadata()
            .map_err(|e| PDFError::StreamError(format!("Failed to get file length: {}", e)))?
            .len();

        Ok(Self::from_file(file, file_path, length))
    }

    /// Opens a file whose final size is already known (e.g. from a
    /// Content-Length header) while its bytes are still being written.
    pub fn open_with_length<P: AsRef<Path>>(path: P, length: u64) -> PDFResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file = File::open(&file_path)
            .map_err(|e| PDFError::StreamError(format!("Failed to open file: {}", e)))?;
        Ok(Self::from_file(file, file_path, length))
    }

    fn from_file(file: File, file_path: PathBuf, length: u64) -> Self {
        FileByteSource {
            file: RefCell::new(file),
            file_path,
            length,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_exact_at(&self, offset: u64, size: usize) -> PDFResult<Vec<u8>> {
        let mut file = self
            .file
            .try_borrow_mut()
            .map_err(|_| PDFError::StreamError("File handle already in use".to_string()))?;

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| PDFError::StreamError(format!("Failed to seek: {}", e)))?;

        let mut block = vec![0u8; size];
        file.read_exact(&mut block)
            .map_err(|e| PDFError::StreamError(format!("Failed to read block: {}", e)))?;
        Ok(block)
    }
}

impl ByteSource for FileByteSource {
    fn size(&self) -> u64 {
        self.length
    }

    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        let Some(range) = ByteRange::new(offset, buffer.len() as u64) else {
            return false;
        };
        if range.end() > self.length {
            return false;
        }

        // Read into a scratch block so a short read never leaks into `buffer`.
        match self.read_exact_at(offset, buffer.len()) {
            Ok(block) => {
                buffer.copy_from_slice(&block);
                true
            }
            Err(err) => {
                log::debug!("{}: {err}", self.file_path.display());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_block_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\nhello").unwrap();
        tmp.flush().unwrap();

        let source = FileByteSource::open(tmp.path()).unwrap();
        assert_eq!(source.size(), 14);

        let mut buf = [0u8; 5];
        assert!(source.read_block_at_offset(&mut buf, 9));
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_short_file_never_partially_fills() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        // Declared larger than what has been written so far
        let source = FileByteSource::open_with_length(tmp.path(), 100).unwrap();
        let mut buf = [0xEEu8; 8];
        assert!(!source.read_block_at_offset(&mut buf, 6));
        assert_eq!(buf, [0xEE; 8]);
    }

    #[test]
    fn test_open_missing_file() {
        let result = FileByteSource::open("/nonexistent/file.pdf");
        assert!(matches!(result, Err(PDFError::StreamError(_))));
    }
}
