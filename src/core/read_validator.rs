//! Availability-gated reading.
//!
//! [`ReadValidator`] sits between a consumer (parser, header probe, buffered
//! reader) and the host's byte source. It never hands out bytes it cannot
//! vouch for: when a range is not resident yet it records that fact,
//! schedules a block-aligned download hint, and reports failure. Consumers
//! retry the identical call once the host has delivered the data.
//!
//! Two sticky flags summarize what went wrong since they were last cleared:
//! `read_error` (the source failed on data reported as present) and
//! `has_unavailable_data` (a download had to be scheduled). A [`Session`]
//! isolates the flags for one logical sub-operation without losing the
//! flags raised before it.

use super::byte_range::ByteRange;
use super::file_access::{AvailabilityOracle, ByteSource, DownloadHintSink};
use std::cell::Cell;
use std::ops::Deref;

/// Default hint alignment in bytes.
pub const DEFAULT_BLOCK_SIZE: u64 = 512;

/// Default read-ahead padding applied by
/// [`ReadValidator::check_data_range_and_request_if_unavailable`].
///
/// Matches the refill size of [`ValidatedReader`](super::validated_reader::ValidatedReader).
pub const DEFAULT_READ_AHEAD_PADDING: u64 = 512;

/// Tuning knobs for a [`ReadValidator`].
///
/// `read_ahead_padding` should equal the buffer size of whatever reader fills
/// itself after a pre-flight check. Too small and the reader keeps hitting
/// missing data one refill later; too large and the host over-fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    block_size: u64,
    read_ahead_padding: u64,
}

impl ValidatorConfig {
    /// Creates a config; `None` selects the defaults. A zero block size is
    /// treated as 1 (no alignment).
    pub fn new(block_size: Option<u64>, read_ahead_padding: Option<u64>) -> Self {
        ValidatorConfig {
            block_size: block_size.unwrap_or(DEFAULT_BLOCK_SIZE).max(1),
            read_ahead_padding: read_ahead_padding.unwrap_or(DEFAULT_READ_AHEAD_PADDING),
        }
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn read_ahead_padding(&self) -> u64 {
        self.read_ahead_padding
    }

    /// Rounds `offset` down to a block boundary.
    pub fn align_down(&self, offset: u64) -> u64 {
        if offset > 0 {
            offset - offset % self.block_size
        } else {
            0
        }
    }

    /// Rounds `offset` up past the next block boundary.
    ///
    /// Returns `offset` unchanged if the aligned value is not representable.
    pub fn align_up(&self, offset: u64) -> u64 {
        self.align_down(offset)
            .checked_add(self.block_size)
            .unwrap_or(offset)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Mutable state owned by one validator.
#[derive(Debug)]
struct ValidationState {
    file_size: u64,
    read_error: Cell<bool>,
    has_unavailable_data: Cell<bool>,
    whole_file_available: Cell<bool>,
    session_depth: Cell<usize>,
}

/// Validating wrapper around a [`ByteSource`].
pub struct ReadValidator {
    source: Box<dyn ByteSource>,
    oracle: Option<Box<dyn AvailabilityOracle>>,
    hints: Option<Box<dyn DownloadHintSink>>,
    config: ValidatorConfig,
    state: ValidationState,
}

impl ReadValidator {
    /// Wraps `source`. Without an oracle every range counts as available;
    /// without a hint sink scheduling only raises the flag.
    pub fn new<S: ByteSource + 'static>(source: S) -> Self {
        let file_size = source.size();
        ReadValidator {
            source: Box::new(source),
            oracle: None,
            hints: None,
            config: ValidatorConfig::default(),
            state: ValidationState {
                file_size,
                read_error: Cell::new(false),
                has_unavailable_data: Cell::new(false),
                whole_file_available: Cell::new(false),
                session_depth: Cell::new(0),
            },
        }
    }

    pub fn with_oracle<O: AvailabilityOracle + 'static>(mut self, oracle: O) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    pub fn with_hints<H: DownloadHintSink + 'static>(mut self, hints: H) -> Self {
        self.hints = Some(Box::new(hints));
        self
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn file_size(&self) -> u64 {
        self.state.file_size
    }

    pub fn read_error(&self) -> bool {
        self.state.read_error.get()
    }

    pub fn has_unavailable_data(&self) -> bool {
        self.state.has_unavailable_data.get()
    }

    pub fn has_read_problems(&self) -> bool {
        self.read_error() || self.has_unavailable_data()
    }

    pub fn reset_errors(&self) {
        self.state.read_error.set(false);
        self.state.has_unavailable_data.set(false);
    }

    /// Opens a flag-isolating scope. The flags are restored (OR-merged) when
    /// the returned guard is dropped.
    pub fn session(&self) -> Session<'_> {
        Session::enter(self)
    }

    /// Reads `buffer.len()` bytes at `offset`.
    ///
    /// Returns false without touching `buffer` when the range is out of
    /// bounds, not yet available (a hint is scheduled), or the source read
    /// fails (`read_error` is raised and the hint is scheduled again).
    pub fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        let size = buffer.len() as u64;
        let Some(range) = ByteRange::new(offset, size) else {
            log::debug!("read at {offset} (+{size}) overflows");
            return false;
        };
        if range.end() > self.state.file_size {
            return false;
        }

        if !self.is_data_range_available(offset, size) {
            self.schedule_download(offset, size);
            return false;
        }

        if self.source.read_block_at_offset(buffer, offset) {
            return true;
        }

        log::debug!("source read failed for available range {range}");
        self.state.read_error.set(true);
        self.schedule_download(offset, size);
        false
    }

    /// Pre-flights `[offset, offset + size + padding)` without reading.
    ///
    /// Returns true when everything (clamped to the file size) is already
    /// available; otherwise schedules the range and returns false.
    pub fn check_data_range_and_request_if_unavailable(&self, offset: u64, size: u64) -> bool {
        if offset > self.state.file_size {
            return true;
        }

        let Some(end) = offset
            .checked_add(size)
            .and_then(|end| end.checked_add(self.config.read_ahead_padding))
        else {
            return false;
        };
        let end = end.min(self.state.file_size);
        let segment_size = end - offset;

        if self.is_data_range_available(offset, segment_size) {
            return true;
        }
        self.schedule_download(offset, segment_size);
        false
    }

    /// Returns true once the whole file is resident. Monotonic: after the
    /// first `true` the oracle is never asked again.
    pub fn is_whole_file_available(&self) -> bool {
        if !self.state.whole_file_available.get()
            && self.is_data_range_available(0, self.state.file_size)
        {
            log::debug!("whole file ({} bytes) available", self.state.file_size);
            self.state.whole_file_available.set(true);
        }
        self.state.whole_file_available.get()
    }

    /// Like [`is_whole_file_available`](Self::is_whole_file_available), but
    /// also requests the whole file when it is not resident yet.
    pub fn check_whole_file_and_request_if_unavailable(&self) -> bool {
        if self.is_whole_file_available() {
            return true;
        }
        if let Some(hints) = &self.hints {
            hints.add_segment(0, self.state.file_size);
        }
        false
    }

    fn is_data_range_available(&self, offset: u64, size: u64) -> bool {
        if self.state.whole_file_available.get() {
            return true;
        }
        match &self.oracle {
            Some(oracle) => oracle.is_data_available(offset, size),
            None => true,
        }
    }

    fn schedule_download(&self, offset: u64, size: u64) {
        self.state.has_unavailable_data.set(true);
        let Some(hints) = &self.hints else {
            return;
        };
        if size == 0 {
            return;
        }

        let start = self.config.align_down(offset);
        let Some(end) = offset.checked_add(size) else {
            return;
        };
        let Some(segment) = ByteRange::from_bounds(start, self.config.align_up(end)) else {
            return;
        };
        let segment = segment.clamp_to(self.state.file_size);
        if segment.is_empty() {
            return;
        }

        log::trace!("scheduling download of {segment}");
        hints.add_segment(segment.offset(), segment.size());
    }
}

impl ByteSource for ReadValidator {
    fn size(&self) -> u64 {
        self.file_size()
    }

    fn read_block_at_offset(&self, buffer: &mut [u8], offset: u64) -> bool {
        ReadValidator::read_block_at_offset(self, buffer, offset)
    }
}

/// Scoped isolation of a validator's error flags.
///
/// Entering snapshots and clears both flags; dropping ORs the snapshot back
/// in. A flag raised inside the session therefore stays visible to every
/// enclosing scope, and a flag raised before it is only hidden, never lost.
/// Sessions must end in the reverse order they were opened.
pub struct Session<'a> {
    validator: &'a ReadValidator,
    saved_read_error: bool,
    saved_has_unavailable_data: bool,
    depth: usize,
}

impl<'a> Session<'a> {
    fn enter(validator: &'a ReadValidator) -> Self {
        let state = &validator.state;
        let depth = state.session_depth.get() + 1;
        state.session_depth.set(depth);

        Session {
            validator,
            saved_read_error: state.read_error.replace(false),
            saved_has_unavailable_data: state.has_unavailable_data.replace(false),
            depth,
        }
    }

    pub fn validator(&self) -> &'a ReadValidator {
        self.validator
    }
}

impl Deref for Session<'_> {
    type Target = ReadValidator;

    fn deref(&self) -> &ReadValidator {
        self.validator
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let state = &self.validator.state;
        debug_assert_eq!(
            state.session_depth.get(),
            self.depth,
            "validator sessions must end in LIFO order"
        );
        state.session_depth.set(self.depth - 1);

        state
            .read_error
            .set(state.read_error.get() | self.saved_read_error);
        state
            .has_unavailable_data
            .set(state.has_unavailable_data.get() | self.saved_has_unavailable_data);
    }
}
