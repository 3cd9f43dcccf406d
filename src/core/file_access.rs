//! Host-facing interfaces for partially available documents.
//!
//! The read side of the engine talks to three collaborators supplied by the
//! embedding host:
//! - a [`ByteSource`] that reads bytes which are already resident,
//! - an [`AvailabilityOracle`] that says whether a range is resident yet,
//! - a [`DownloadHintSink`] that receives the ranges the engine wants next.
//!
//! All three take `&self`: the engine is single-threaded and collaborators
//! that need to mutate use interior mutability.

use super::byte_range::ByteRange;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Random-access source of document bytes.
pub trait ByteSource {
    /// Total size of the document in bytes.
    fn size(&self) -> u64;

    /// Fills `buffer` with the bytes starting at `offset`.
    ///
    /// All-or-nothing: implementations must leave `buffer` untouched when
    /// they return `false`.
    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool;
}

/// Answers "are these bytes resident yet".
pub trait AvailabilityOracle {
    fn is_data_available(&self, offset: u64, size: u64) -> bool;
}

/// Receives byte ranges the engine needs the host to fetch.
pub trait DownloadHintSink {
    fn add_segment(&self, offset: u64, size: u64);
}

impl<T: ByteSource + ?Sized> ByteSource for Rc<T> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        (**self).read_block_at_offset(buffer, offset)
    }
}

impl<T: AvailabilityOracle + ?Sized> AvailabilityOracle for Rc<T> {
    fn is_data_available(&self, offset: u64, size: u64) -> bool {
        (**self).is_data_available(offset, size)
    }
}

impl<T: DownloadHintSink + ?Sized> DownloadHintSink for Rc<T> {
    fn add_segment(&self, offset: u64, size: u64) {
        (**self).add_segment(offset, size)
    }
}

/// A fully resident in-memory source.
///
/// The underlying data is stored in an Arc so clones share the buffer.
#[derive(Debug, Clone)]
pub struct MemoryByteSource {
    bytes: Arc<Vec<u8>>,
}

impl MemoryByteSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryByteSource {
            bytes: Arc::new(bytes),
        }
    }
}

impl ByteSource for MemoryByteSource {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        let Some(range) = ByteRange::new(offset, buffer.len() as u64) else {
            return false;
        };
        if range.end() > self.size() {
            return false;
        }
        let begin = range.offset() as usize;
        buffer.copy_from_slice(&self.bytes[begin..begin + buffer.len()]);
        true
    }
}

/// Collects download hints for the host to act on.
///
/// Clones share the same pending list, so one clone can be handed to a
/// [`ReadValidator`](super::read_validator::ReadValidator) while the host keeps
/// another to drain.
#[derive(Debug, Clone, Default)]
pub struct DownloadHints {
    segments: Rc<RefCell<SmallVec<[ByteRange; 4]>>>,
}

impl DownloadHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending segments.
    pub fn len(&self) -> usize {
        self.segments.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.borrow().is_empty()
    }

    /// Returns a copy of the pending segments without draining them.
    pub fn segments(&self) -> Vec<ByteRange> {
        self.segments.borrow().to_vec()
    }

    /// Drains and returns the pending segments.
    pub fn take(&self) -> Vec<ByteRange> {
        self.segments.borrow_mut().drain(..).collect()
    }
}

impl DownloadHintSink for DownloadHints {
    fn add_segment(&self, offset: u64, size: u64) {
        match ByteRange::new(offset, size) {
            Some(range) => self.segments.borrow_mut().push(range),
            None => log::warn!("dropping unrepresentable hint segment at {offset} (+{size})"),
        }
    }
}
