//! Resumable per-object renderer.

use super::context::RenderContext;
use super::device::Device;
use super::options::RenderOptions;
use super::progressive::PauseAdapter;
use std::fmt;

/// Status of a progressive render, crossing the API as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Ready = 0,
    ToBeContinued = 1,
    Done = 2,
    Failed = 3,
}

impl RenderState {
    pub fn is_finished(self) -> bool {
        matches!(self, RenderState::Done | RenderState::Failed)
    }
}

impl From<RenderState> for i32 {
    fn from(state: RenderState) -> i32 {
        state as i32
    }
}

impl TryFrom<i32> for RenderState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(RenderState::Ready),
            1 => Ok(RenderState::ToBeContinued),
            2 => Ok(RenderState::Done),
            3 => Ok(RenderState::Failed),
            other => Err(other),
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderState::Ready => "ready",
            RenderState::ToBeContinued => "to be continued",
            RenderState::Done => "done",
            RenderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Walks the layers of a [`RenderContext`] one object at a time.
///
/// The cursor (`layer`, `object`) always points at the next object to draw.
/// The pause adapter is polled after each drawn object, and only while
/// objects remain, so a render whose last object has been drawn finishes
/// as `Done` regardless of what the adapter would say.
#[derive(Debug, Default)]
pub struct ProgressiveRenderer {
    state: RenderState,
    layer: usize,
    object: usize,
    drawn: usize,
}

impl ProgressiveRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Number of objects visited so far.
    pub fn objects_drawn(&self) -> usize {
        self.drawn
    }

    /// Resets the cursor and renders until done, failed, or paused.
    pub fn start(
        &mut self,
        context: &mut RenderContext,
        device: &mut dyn Device,
        options: &RenderOptions,
        pause: Option<&mut dyn PauseAdapter>,
    ) -> RenderState {
        self.layer = 0;
        self.object = 0;
        self.drawn = 0;
        self.state = RenderState::ToBeContinued;
        self.continue_render(context, device, options, pause)
    }

    /// Resumes a paused render. Finished renders just report their state.
    pub fn continue_render(
        &mut self,
        context: &mut RenderContext,
        device: &mut dyn Device,
        options: &RenderOptions,
        mut pause: Option<&mut dyn PauseAdapter>,
    ) -> RenderState {
        if self.state != RenderState::ToBeContinued {
            return self.state;
        }

        while self.seek_next(context) {
            if let Err(e) = context.render_object(self.layer, self.object, device, options) {
                log::warn!(
                    "render failed at object {} of layer {}: {}",
                    self.object,
                    self.layer,
                    e
                );
                self.state = RenderState::Failed;
                return self.state;
            }
            self.object += 1;
            self.drawn += 1;

            if !self.seek_next(context) {
                break;
            }
            if let Some(adapter) = pause.as_deref_mut() {
                if adapter.need_to_pause_now() {
                    log::trace!("render paused after {} objects", self.drawn);
                    return self.state;
                }
            }
        }

        log::debug!("render done, {} objects", self.drawn);
        self.state = RenderState::Done;
        self.state
    }

    /// Moves the cursor past exhausted layers. Returns whether an object remains.
    fn seek_next(&mut self, context: &RenderContext) -> bool {
        while let Some(layer) = context.layers().get(self.layer) {
            if self.object < layer.objects().len() {
                return true;
            }
            self.layer += 1;
            self.object = 0;
        }
        false
    }
}
