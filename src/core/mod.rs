pub mod byte_range;
pub mod chunk_manager;
pub mod decode;
pub mod error;
pub mod file_access;
pub mod file_byte_source;
pub mod header_probe;
pub mod page;
pub mod read_validator;
pub mod validated_reader;

pub use byte_range::ByteRange;
pub use chunk_manager::{ChunkManager, ChunkedFile};
pub use error::{PDFError, PDFResult};
pub use file_access::{
    AvailabilityOracle, ByteSource, DownloadHintSink, DownloadHints, MemoryByteSource,
};
pub use file_byte_source::FileByteSource;
pub use header_probe::{HeaderProbe, probe_header};
pub use page::{
    Annotation, AnnotationFlags, Color, FillRule, ImageColorSpace, ImageEncoding, ImageObject,
    OptionalContentGroup, Page, PageId, PageObject, PageObjectKind, PathObject, PathSegment,
    TextObject, Viewport,
};
pub use read_validator::{ReadValidator, Session, ValidatorConfig};
pub use validated_reader::ValidatedReader;
