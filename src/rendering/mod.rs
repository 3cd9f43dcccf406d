//! Progressive page rendering.
//!
//! This module provides the rendering side of the crate:
//! - A Device trait for backend abstraction
//! - A render context holding the layers of one pass
//! - A resumable renderer and the bundle that owns its resources
//! - The Start / Continue / Close driver

pub mod annotation;
pub mod bundle;
pub mod context;
pub mod device;
pub mod options;
pub mod progressive;
pub mod renderer;

// Re-export key types
pub use annotation::AnnotationList;
pub use bundle::{RenderResourceBundle, ResourceSlot, TeardownLog};
pub use context::{RenderContext, RenderLayer};
pub use device::{BitmapDevice, Device, Paint, RecordingDevice, RenderTarget, new_render_target};
pub use options::{ColorMode, RenderOptionFlags, RenderOptions, Usage};
pub use progressive::{
    PAUSE_ADAPTER_VERSION, PauseAdapter, close_render, continue_render, start_render,
    start_render_with_device,
};
pub use renderer::{ProgressiveRenderer, RenderState};
