//! Availability-gated reading tests
//!
//! These tests drive the read validator against stub oracles and against a
//! chunked file that receives data the way a downloading host would.


use pdf_x_progressive::core::*;
use std::io::Write;
use test_utils::*;

fn validator_over(len: usize, available: u64, hints: &DownloadHints) -> ReadValidator {
    ReadValidator::new(MemoryByteSource::from_bytes(pattern_bytes(len)))
        .with_oracle(PrefixOracle { available })
        .with_hints(hints.clone())
}

#[test]
fn test_unavailable_read_requests_aligned_block() {
    init_logging();
    let hints = DownloadHints::new();
    let validator = validator_over(10000, 512, &hints);

    let mut buf = [0xAAu8; 100];
    assert!(!validator.read_block_at_offset(&mut buf, 600));

    assert!(validator.has_unavailable_data());
    assert!(!validator.read_error());
    assert_eq!(hints.segments(), vec![ByteRange::new(512, 512).unwrap()]);
    assert!(buf.iter().all(|&b| b == 0xAA), "buffer must stay untouched");
}

#[test]
fn test_available_read_copies_exact_bytes() {
    let hints = DownloadHints::new();
    let validator = validator_over(10000, 512, &hints);

    let mut buf = [0u8; 100];
    assert!(validator.read_block_at_offset(&mut buf, 400));
    assert_eq!(buf.to_vec(), pattern_bytes(500)[400..].to_vec());
    assert!(hints.is_empty());
    assert!(!validator.has_read_problems());
}

#[test]
fn test_out_of_bounds_and_overflow() {
    let hints = DownloadHints::new();
    let validator = validator_over(1000, 1000, &hints);
    let mut buf = [7u8; 16];

    assert!(!validator.read_block_at_offset(&mut buf, 990));
    assert!(!validator.read_block_at_offset(&mut buf, u64::MAX - 4));
    assert!(buf.iter().all(|&b| b == 7));
    assert!(hints.is_empty());
    assert!(!validator.has_unavailable_data());
}

#[test]
fn test_hint_is_clamped_to_file_size() {
    let hints = DownloadHints::new();
    let validator = validator_over(1100, 0, &hints);

    let mut buf = [0u8; 50];
    assert!(!validator.read_block_at_offset(&mut buf, 1040));
    assert_eq!(hints.segments(), vec![ByteRange::new(1024, 76).unwrap()]);
}

#[test]
fn test_evicted_chunk_sets_read_error_and_reschedules() {
    init_logging();
    // Room for a single cached chunk: receiving chunk 1 evicts chunk 0.
    let file = ChunkedFile::new(ChunkManager::new(2048, Some(512), Some(1)));
    file.on_receive_data(0, pattern_bytes(512)).unwrap();
    file.on_receive_data(1, pattern_bytes(512)).unwrap();

    let hints = DownloadHints::new();
    let validator = ReadValidator::new(file.clone())
        .with_oracle(file.clone())
        .with_hints(hints.clone());

    let mut buf = [0u8; 10];
    assert!(!validator.read_block_at_offset(&mut buf, 5));
    assert!(validator.read_error());
    assert!(validator.has_unavailable_data());
    assert_eq!(hints.take(), vec![ByteRange::new(0, 512).unwrap()]);

    // Redelivery makes the identical call succeed.
    file.on_receive_data(0, pattern_bytes(512)).unwrap();
    assert!(validator.read_block_at_offset(&mut buf, 5));
    assert_eq!(buf.to_vec(), pattern_bytes(15)[5..].to_vec());
}

#[test]
fn test_read_wider_than_chunk_cache_succeeds_after_delivery() {
    // 20 chunks against the default cache of 10.
    let file = ChunkedFile::new(ChunkManager::new(10000, Some(512), None));
    let hints = DownloadHints::new();
    let validator = ReadValidator::new(file.clone())
        .with_oracle(file.clone())
        .with_hints(hints.clone());
    let data = pattern_bytes(10000);

    let mut buf = vec![0u8; 10000];
    assert!(!validator.read_block_at_offset(&mut buf, 0));
    for segment in hints.take() {
        let range = segment.offset() as usize..segment.end() as usize;
        file.on_receive_range(segment.offset(), &data[range]).unwrap();
    }

    assert!(validator.read_block_at_offset(&mut buf, 0));
    assert!(!validator.read_error());
    assert_eq!(buf, data);
    assert!(hints.is_empty());
}

#[test]
fn test_failing_source_with_everything_available() {
    let hints = DownloadHints::new();
    let validator = ReadValidator::new(FailingSource { size: 4096 }).with_hints(hints.clone());

    let mut buf = [0u8; 8];
    assert!(!validator.read_block_at_offset(&mut buf, 1000));
    assert!(validator.read_error());
    assert_eq!(hints.segments(), vec![ByteRange::new(512, 512).unwrap()]);
}

#[test]
fn test_check_data_range_pads_and_clamps() {
    let hints = DownloadHints::new();
    let validator = validator_over(2000, 1000, &hints);

    // 100 + 50 + 512 padding fits within the available prefix.
    assert!(validator.check_data_range_and_request_if_unavailable(100, 50));
    assert!(hints.is_empty());

    assert!(!validator.check_data_range_and_request_if_unavailable(900, 10));
    assert_eq!(hints.take(), vec![ByteRange::new(512, 1024).unwrap()]);

    // Clamped at the end of the file.
    assert!(!validator.check_data_range_and_request_if_unavailable(1900, 10));
    assert_eq!(hints.take(), vec![ByteRange::new(1536, 464).unwrap()]);

    // Past the end there is nothing to fetch.
    assert!(validator.check_data_range_and_request_if_unavailable(5000, 10));
}

#[test]
fn test_whole_file_availability_is_cached() {
    let oracle = GrowingOracle::new();
    let hints = DownloadHints::new();
    let validator = ReadValidator::new(MemoryByteSource::from_bytes(pattern_bytes(4096)))
        .with_oracle(oracle.clone())
        .with_hints(hints.clone());

    assert!(!validator.check_whole_file_and_request_if_unavailable());
    assert_eq!(hints.take(), vec![ByteRange::new(0, 4096).unwrap()]);

    oracle.make_available(0, 4096);
    assert!(validator.is_whole_file_available());
    let queries = oracle.queries();

    assert!(validator.is_whole_file_available());
    assert!(validator.check_whole_file_and_request_if_unavailable());
    assert_eq!(oracle.queries(), queries, "oracle must not be asked again");
    assert!(hints.is_empty());
}

#[test]
fn test_session_isolates_and_merges_flags() {
    let hints = DownloadHints::new();
    let validator = validator_over(10000, 512, &hints);
    let mut buf = [0u8; 10];

    assert!(!validator.read_block_at_offset(&mut buf, 2000));
    assert!(validator.has_unavailable_data());

    {
        let session = validator.session();
        assert!(!session.has_unavailable_data());
        assert!(session.read_block_at_offset(&mut buf, 0));
        assert!(!session.has_read_problems());
    }
    assert!(validator.has_unavailable_data(), "earlier flag survives the session");

    validator.reset_errors();
    {
        let _session = validator.session();
        assert!(!validator.read_block_at_offset(&mut buf, 3000));
    }
    assert!(validator.has_unavailable_data(), "inner flag propagates outward");
}

#[test]
fn test_header_probe_over_partial_file() {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.extend(pattern_bytes(3000));
    let file = ChunkedFile::new(ChunkManager::new(data.len() as u64, Some(1024), None));
    let hints = DownloadHints::new();
    let validator = ReadValidator::new(file.clone())
        .with_oracle(file.clone())
        .with_hints(hints.clone());

    assert_eq!(probe_header(&validator), HeaderProbe::NeedMoreData);
    for segment in hints.take() {
        let end = segment.end() as usize;
        file.on_receive_range(segment.offset(), &data[segment.offset() as usize..end])
            .unwrap();
    }

    validator.reset_errors();
    assert_eq!(
        probe_header(&validator),
        HeaderProbe::Found {
            offset: 0,
            version: 14
        }
    );
}

#[test]
fn test_validated_reader_over_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&pattern_bytes(3000)).unwrap();
    file.flush().unwrap();

    let source = FileByteSource::open(file.path()).unwrap();
    let validator = ReadValidator::new(source);
    let mut reader = ValidatedReader::new(&validator);

    reader.set_pos(1000).unwrap();
    assert_eq!(reader.get_byte().unwrap(), (1000 % 251) as u8);
    assert_eq!(reader.get_bytes(1500).unwrap(), pattern_bytes(2501)[1001..].to_vec());
    reader.skip(10).unwrap();
    assert_eq!(reader.pos(), 2511);
}
