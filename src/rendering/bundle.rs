//! The resources of one in-progress render, torn down in a fixed order.

use super::annotation::AnnotationList;
use super::context::RenderContext;
use super::device::Device;
use super::options::RenderOptions;
use super::progressive::PauseAdapter;
use super::renderer::{ProgressiveRenderer, RenderState};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One slot of a [`RenderResourceBundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSlot {
    Renderer,
    Context,
    Device,
    Options,
    Annotations,
}

/// Shared record of slot releases, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct TeardownLog(Rc<RefCell<Vec<ResourceSlot>>>);

impl TeardownLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, slot: ResourceSlot) {
        self.0.borrow_mut().push(slot);
    }

    pub fn entries(&self) -> Vec<ResourceSlot> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Owns everything a progressive render needs between calls.
///
/// The renderer draws through the context and device, and the context holds
/// layers built from the annotation list, so slots are released renderer,
/// context, device, options, annotations. [`teardown`](Self::teardown) (or
/// [`replace`](Self::replace)) is the only way slots are released; dropping
/// the bundle goes through it too.
#[derive(Default)]
pub struct RenderResourceBundle {
    annotations: Option<AnnotationList>,
    options: Option<RenderOptions>,
    device: Option<Box<dyn Device>>,
    context: Option<RenderContext>,
    renderer: Option<ProgressiveRenderer>,
    log: Option<TeardownLog>,
}

impl RenderResourceBundle {
    /// A bundle ready to start, with a fresh renderer.
    pub fn new(
        annotations: Option<AnnotationList>,
        options: RenderOptions,
        device: Box<dyn Device>,
        context: RenderContext,
    ) -> Self {
        RenderResourceBundle {
            annotations,
            options: Some(options),
            device: Some(device),
            context: Some(context),
            renderer: Some(ProgressiveRenderer::new()),
            log: None,
        }
    }

    /// Records every slot release into `log`.
    pub fn with_teardown_log(mut self, log: TeardownLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Whether no slot is held.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_none()
            && self.options.is_none()
            && self.device.is_none()
            && self.context.is_none()
            && self.renderer.is_none()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Current renderer state, if a renderer is held.
    pub fn state(&self) -> Option<RenderState> {
        self.renderer.as_ref().map(ProgressiveRenderer::state)
    }

    pub fn annotations(&self) -> Option<&AnnotationList> {
        self.annotations.as_ref()
    }

    pub fn options(&self) -> Option<&RenderOptions> {
        self.options.as_ref()
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    /// Starts the renderer from the first object.
    pub fn start(&mut self, pause: Option<&mut dyn PauseAdapter>) -> RenderState {
        self.drive(true, pause)
    }

    /// Resumes the renderer. `Failed` when any slot it needs is missing.
    pub fn resume(&mut self, pause: Option<&mut dyn PauseAdapter>) -> RenderState {
        self.drive(false, pause)
    }

    fn drive(&mut self, restart: bool, pause: Option<&mut dyn PauseAdapter>) -> RenderState {
        let (Some(renderer), Some(context), Some(device), Some(options)) = (
            self.renderer.as_mut(),
            self.context.as_mut(),
            self.device.as_deref_mut(),
            self.options.as_ref(),
        ) else {
            return RenderState::Failed;
        };

        if restart {
            renderer.start(context, device, options, pause)
        } else {
            renderer.continue_render(context, device, options, pause)
        }
    }

    /// Tears down the current slots in order, then takes over `next`.
    pub fn replace(&mut self, next: RenderResourceBundle) {
        self.release_slots();
        let previous = std::mem::replace(self, next);
        debug_assert!(previous.is_empty());
    }

    /// Releases every slot. Idempotent.
    pub fn teardown(&mut self) {
        self.release_slots();
    }

    fn release_slots(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            drop(renderer);
            self.released(ResourceSlot::Renderer);
        }
        if let Some(context) = self.context.take() {
            drop(context);
            self.released(ResourceSlot::Context);
        }
        if let Some(device) = self.device.take() {
            drop(device);
            self.released(ResourceSlot::Device);
        }
        if self.options.take().is_some() {
            self.released(ResourceSlot::Options);
        }
        if let Some(annotations) = self.annotations.take() {
            drop(annotations);
            self.released(ResourceSlot::Annotations);
        }
    }

    fn released(&self, slot: ResourceSlot) {
        log::trace!("released render slot {:?}", slot);
        if let Some(log) = &self.log {
            log.record(slot);
        }
    }
}

impl Drop for RenderResourceBundle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for RenderResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResourceBundle")
            .field("annotations", &self.annotations.as_ref().map(AnnotationList::len))
            .field("options", &self.options)
            .field("device", &self.device.is_some())
            .field("context", &self.context.as_ref().map(RenderContext::layer_count))
            .field("renderer", &self.renderer)
            .finish()
    }
}
