//! # PDF-X Progressive: rendering over partially loaded documents
//!
//! Building blocks for viewers that start showing a PDF before all of its
//! bytes have arrived.
//!
//! ## Features
//!
//! - **Availability-gated reading**: [`ReadValidator`] never hands out bytes
//!   that have not been delivered yet, and tells the host which ranges to
//!   fetch next
//! - **Progressive rendering**: page renders that pause and resume between
//!   drawable objects, with a fixed resource teardown order
//! - **Deferred page destruction**: closing a page while an outer call is
//!   still iterating through its view is safe
//!
//! ## Quick Start
//!
//! ```rust
//! use pdf_x_progressive::core::{ChunkManager, ChunkedFile, DownloadHints, ReadValidator};
//!
//! // 10000 bytes, of which nothing has arrived yet
//! let file = ChunkedFile::new(ChunkManager::new(10000, Some(512), None));
//! let hints = DownloadHints::new();
//! let validator = ReadValidator::new(file.clone())
//!     .with_oracle(file.clone())
//!     .with_hints(hints.clone());
//!
//! let mut buf = [0u8; 100];
//! assert!(!validator.read_block_at_offset(&mut buf, 600));
//!
//! // Deliver what the validator asked for, then retry.
//! for segment in hints.take() {
//!     let data = vec![0u8; segment.size() as usize];
//!     file.on_receive_range(segment.offset(), &data)?;
//! }
//! assert!(validator.read_block_at_offset(&mut buf, 600));
//! # Ok::<(), pdf_x_progressive::PDFError>(())
//! ```
//!
//! ## Architecture
//!
//! - **core**: byte sources, the read validator, chunk storage and the page model
//! - **rendering**: devices, render context, renderer, resource bundle and the
//!   Start / Continue / Close driver
//! - **view**: page views, their environment and page closing

pub mod core;
pub mod rendering;
pub mod view;

// Re-export main types for convenience
pub use core::{
    ByteRange, ByteSource, PDFError, PDFResult, Page, PageId, ReadValidator, Session,
    ValidatorConfig,
};
pub use rendering::{
    PauseAdapter, RenderOptionFlags, RenderState, close_render, continue_render, start_render,
};
pub use view::{PageHandle, close_page};
