use super::byte_range::ByteRange;
use super::error::{PDFError, PDFResult};
use super::file_access::{AvailabilityOracle, ByteSource};
use lru::LruCache;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Default chunk size: 64KB
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// Default maximum number of chunks to keep in memory cache
pub const DEFAULT_MAX_CACHED_CHUNKS: usize = 10;

/// Host-side store of document chunks that have arrived so far.
///
/// Tracks two different things:
/// - which chunks have been received at some point (`loaded_chunks`), which is
///   what availability queries answer from,
/// - which chunk payloads are still held (`chunk_cache`, bounded LRU).
///
/// A chunk that was received and then evicted is still reported as
/// available, but reading it fails. The read validator treats that failure
/// as a stale availability answer and asks for the range again.
pub struct ChunkManager {
    /// Total length of the data in bytes
    total_length: u64,
    /// Size of each chunk in bytes
    chunk_size: usize,
    /// Total number of chunks
    num_chunks: usize,

    /// Cache of chunk payloads (chunk_number -> data)
    chunk_cache: LruCache<usize, Vec<u8>>,

    /// Set of all chunks that have been received at some point
    loaded_chunks: FxHashSet<usize>,
}

impl ChunkManager {
    /// Creates a new ChunkManager.
    ///
    /// # Arguments
    /// * `total_length` - Total length of the document
    /// * `chunk_size` - Size of each chunk (default: 64KB)
    /// * `max_cached_chunks` - Maximum chunk payloads to keep (default: 10)
    pub fn new(
        total_length: u64,
        chunk_size: Option<usize>,
        max_cached_chunks: Option<usize>,
    ) -> Self {
        let chunk_size = chunk_size
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        let max_cached_chunks = max_cached_chunks
            .and_then(NonZeroUsize::new)
            .or(NonZeroUsize::new(DEFAULT_MAX_CACHED_CHUNKS))
            .unwrap_or(NonZeroUsize::MIN);
        let num_chunks = total_length.div_ceil(chunk_size as u64) as usize;

        ChunkManager {
            total_length,
            chunk_size,
            num_chunks,
            chunk_cache: LruCache::new(max_cached_chunks),
            loaded_chunks: FxHashSet::default(),
        }
    }

    /// Returns the total length of the data.
    pub fn length(&self) -> u64 {
        self.total_length
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the total number of chunks.
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// Gets the chunk number for a given byte position.
    pub fn get_chunk_number(&self, pos: u64) -> usize {
        (pos / self.chunk_size as u64) as usize
    }

    /// Expected payload length of a chunk (the last one may be short).
    fn chunk_len(&self, chunk_num: usize) -> usize {
        let start = chunk_num as u64 * self.chunk_size as u64;
        (self.total_length - start).min(self.chunk_size as u64) as usize
    }

    /// Grows the payload cache so `chunks` consecutive chunks fit at once.
    ///
    /// A range wider than the cache could otherwise never be held whole, and
    /// every redelivery would evict its own front.
    fn reserve_chunks(&mut self, chunks: usize) {
        let Some(needed) = NonZeroUsize::new(chunks) else {
            return;
        };
        if needed > self.chunk_cache.cap() {
            log::debug!(
                "growing chunk cache from {} to {} chunks",
                self.chunk_cache.cap(),
                needed
            );
            self.chunk_cache.resize(needed);
        }
    }

    /// Stores the payload of one chunk.
    pub fn on_receive_data(&mut self, chunk_num: usize, chunk: Vec<u8>) -> PDFResult<()> {
        if chunk_num >= self.num_chunks {
            let begin = chunk_num as u64 * self.chunk_size as u64;
            return Err(PDFError::InvalidByteRange {
                begin,
                end: begin.saturating_add(self.chunk_size as u64),
            });
        }

        let expected = self.chunk_len(chunk_num);
        if chunk.len() != expected {
            return Err(PDFError::StreamError(format!(
                "Chunk {} has {} bytes, expected {}",
                chunk_num,
                chunk.len(),
                expected
            )));
        }

        self.loaded_chunks.insert(chunk_num);
        if let Some((evicted, _)) = self.chunk_cache.push(chunk_num, chunk) {
            if evicted != chunk_num {
                log::trace!("evicted chunk {evicted} from cache");
            }
        }
        Ok(())
    }

    /// Stores every complete chunk contained in `data`, which starts at `begin`.
    ///
    /// `begin` must be chunk aligned. A trailing partial chunk is ignored
    /// unless it is the short last chunk of the document.
    ///
    /// Returns the number of chunks stored.
    pub fn on_receive_range(&mut self, begin: u64, data: &[u8]) -> PDFResult<usize> {
        let end = begin
            .checked_add(data.len() as u64)
            .ok_or(PDFError::RangeOverflow {
                offset: begin,
                size: data.len() as u64,
            })?;
        if begin % self.chunk_size as u64 != 0 || end > self.total_length {
            return Err(PDFError::InvalidByteRange { begin, end });
        }

        let mut chunk_num = self.get_chunk_number(begin);
        let span = data
            .len()
            .div_ceil(self.chunk_size)
            .min(self.num_chunks.saturating_sub(chunk_num));
        self.reserve_chunks(span);

        let mut stored = 0;
        let mut consumed = 0;
        while chunk_num < self.num_chunks {
            let len = self.chunk_len(chunk_num);
            if consumed + len > data.len() {
                break;
            }
            self.on_receive_data(chunk_num, data[consumed..consumed + len].to_vec())?;
            consumed += len;
            chunk_num += 1;
            stored += 1;
        }
        Ok(stored)
    }

    /// Checks if a specific chunk has been received.
    pub fn has_chunk(&self, chunk: usize) -> bool {
        self.loaded_chunks.contains(&chunk)
    }

    /// Returns a list of chunk numbers that have not been received.
    pub fn get_missing_chunks(&self) -> Vec<usize> {
        (0..self.num_chunks)
            .filter(|chunk| !self.loaded_chunks.contains(chunk))
            .collect()
    }

    /// Returns the next missing chunk starting from `begin_chunk`, with wraparound.
    pub fn next_empty_chunk(&self, begin_chunk: usize) -> Option<usize> {
        (0..self.num_chunks)
            .map(|i| (begin_chunk + i) % self.num_chunks)
            .find(|chunk| !self.loaded_chunks.contains(chunk))
    }

    /// Returns the number of chunks ever received.
    pub fn num_chunks_loaded(&self) -> usize {
        self.loaded_chunks.len()
    }

    /// Returns true if all chunks have been received.
    pub fn is_data_loaded(&self) -> bool {
        self.loaded_chunks.len() == self.num_chunks
    }

    /// Checks if a chunk payload is currently held (not just received).
    pub fn is_chunk_cached(&self, chunk_num: usize) -> bool {
        self.chunk_cache.contains(&chunk_num)
    }

    /// Returns true if every chunk touching `[offset, offset + size)` was received.
    pub fn is_range_loaded(&self, offset: u64, size: u64) -> bool {
        let Some(range) = ByteRange::new(offset, size) else {
            return false;
        };
        if range.end() > self.total_length {
            return false;
        }
        if range.is_empty() {
            return true;
        }
        let begin_chunk = self.get_chunk_number(range.offset());
        let end_chunk = self.get_chunk_number(range.end() - 1);
        (begin_chunk..=end_chunk).all(|chunk| self.loaded_chunks.contains(&chunk))
    }

    /// Copies `buffer.len()` bytes at `offset` out of the cached payloads.
    ///
    /// Nothing is written unless every chunk involved is still cached.
    pub fn read_range(&mut self, buffer: &mut [u8], offset: u64) -> PDFResult<()> {
        let size = buffer.len() as u64;
        let range = ByteRange::new(offset, size).ok_or(PDFError::RangeOverflow { offset, size })?;
        if range.end() > self.total_length {
            return Err(PDFError::InvalidByteRange {
                begin: range.offset(),
                end: range.end(),
            });
        }
        if range.is_empty() {
            return Ok(());
        }

        let begin_chunk = self.get_chunk_number(range.offset());
        let end_chunk = self.get_chunk_number(range.end() - 1);
        self.reserve_chunks(end_chunk - begin_chunk + 1);
        for chunk in begin_chunk..=end_chunk {
            if !self.loaded_chunks.contains(&chunk) {
                return Err(PDFError::DataNotAvailable { offset, size });
            }
            if !self.chunk_cache.contains(&chunk) {
                return Err(PDFError::ReadFailed { offset, size });
            }
        }

        let chunk_size = self.chunk_size as u64;
        let mut written = 0usize;
        for chunk in begin_chunk..=end_chunk {
            let chunk_start = chunk as u64 * chunk_size;
            let from = range.offset().max(chunk_start) - chunk_start;
            let to = range.end().min(chunk_start + chunk_size) - chunk_start;
            let data = self
                .chunk_cache
                .get(&chunk)
                .ok_or(PDFError::ReadFailed { offset, size })?;
            let piece = &data[from as usize..to as usize];
            buffer[written..written + piece.len()].copy_from_slice(piece);
            written += piece.len();
        }
        Ok(())
    }
}

/// Shared handle to a [`ChunkManager`] that plugs into the read path.
///
/// The host keeps one clone to deliver data; the validator holds another as
/// both its byte source and its availability oracle.
#[derive(Clone)]
pub struct ChunkedFile {
    manager: Rc<RefCell<ChunkManager>>,
}

impl ChunkedFile {
    pub fn new(manager: ChunkManager) -> Self {
        ChunkedFile {
            manager: Rc::new(RefCell::new(manager)),
        }
    }

    pub fn on_receive_data(&self, chunk_num: usize, chunk: Vec<u8>) -> PDFResult<()> {
        self.manager.borrow_mut().on_receive_data(chunk_num, chunk)
    }

    pub fn on_receive_range(&self, begin: u64, data: &[u8]) -> PDFResult<usize> {
        self.manager.borrow_mut().on_receive_range(begin, data)
    }

    pub fn get_missing_chunks(&self) -> Vec<usize> {
        self.manager.borrow().get_missing_chunks()
    }

    pub fn is_data_loaded(&self) -> bool {
        self.manager.borrow().is_data_loaded()
    }

    pub fn num_chunks_loaded(&self) -> usize {
        self.manager.borrow().num_chunks_loaded()
    }

    pub fn chunk_size(&self) -> usize {
        self.manager.borrow().chunk_size()
    }
}

impl ByteSource for ChunkedFile {
    fn size(&self) -> u64 {
        self.manager.borrow().length()
    }

    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        match self.manager.borrow_mut().read_range(buffer, offset) {
            Ok(()) => true,
            Err(err) if err.is_retryable() => {
                log::debug!("chunked read failed: {err}");
                false
            }
            Err(err) => {
                log::warn!("chunked read rejected: {err}");
                false
            }
        }
    }
}

impl AvailabilityOracle for ChunkedFile {
    fn is_data_available(&self, offset: u64, size: u64) -> bool {
        self.manager.borrow().is_range_loaded(offset, size)
    }
}
