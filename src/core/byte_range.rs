use std::fmt;

/// A half-open byte interval `[offset, offset + size)`.
///
/// The end of every `ByteRange` is representable as a `u64`: instances can
/// only be built through checked addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    offset: u64,
    size: u64,
}

impl ByteRange {
    /// Creates a range, or `None` if `offset + size` overflows.
    pub fn new(offset: u64, size: u64) -> Option<Self> {
        offset.checked_add(size)?;
        Some(ByteRange { offset, size })
    }

    /// Creates a range from `[begin, end)`, or `None` if `end < begin`.
    pub fn from_bounds(begin: u64, end: u64) -> Option<Self> {
        let size = end.checked_sub(begin)?;
        Some(ByteRange { offset: begin, size })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        // Checked at construction.
        self.offset + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns true if `other` lies entirely inside this range.
    pub fn contains(&self, other: &ByteRange) -> bool {
        other.offset >= self.offset && other.end() <= self.end()
    }

    /// Returns the range clamped to `[0, limit)`.
    pub fn clamp_to(&self, limit: u64) -> ByteRange {
        let begin = self.offset.min(limit);
        let end = self.end().min(limit);
        ByteRange {
            offset: begin,
            size: end - begin,
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}
