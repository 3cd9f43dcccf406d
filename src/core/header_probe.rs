use super::read_validator::ReadValidator;

/// How far into the file the `%PDF-` marker may appear.
pub const HEADER_SEARCH_LIMIT: u64 = 1024;

const HEADER_MARKER: &[u8] = b"%PDF-";

/// Outcome of looking for the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProbe {
    /// Header found at `offset`; `version` is major * 10 + minor (e.g. 17).
    Found { offset: u64, version: u32 },
    /// The search window is resident and holds no header.
    NotFound,
    /// Part of the search window is missing; a hint has been scheduled.
    NeedMoreData,
}

/// Locates the `%PDF-x.y` header within the first [`HEADER_SEARCH_LIMIT`] bytes.
///
/// Runs inside its own validator session, so the answer reflects only this
/// probe while earlier flags survive it.
pub fn probe_header(validator: &ReadValidator) -> HeaderProbe {
    let session = validator.session();

    let window = HEADER_SEARCH_LIMIT.min(session.file_size()) as usize;
    if window < HEADER_MARKER.len() {
        return HeaderProbe::NotFound;
    }

    let mut buf = vec![0u8; window];
    if !session.read_block_at_offset(&mut buf, 0) {
        if session.has_read_problems() {
            return HeaderProbe::NeedMoreData;
        }
        return HeaderProbe::NotFound;
    }

    let Some(offset) = buf
        .windows(HEADER_MARKER.len())
        .position(|w| w == HEADER_MARKER)
    else {
        return HeaderProbe::NotFound;
    };

    let digits = &buf[offset + HEADER_MARKER.len()..];
    let version = match digits {
        [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            u32::from(major - b'0') * 10 + u32::from(minor - b'0')
        }
        _ => 0,
    };
    log::debug!("found header at {offset}, version {version}");

    HeaderProbe::Found {
        offset: offset as u64,
        version,
    }
}
