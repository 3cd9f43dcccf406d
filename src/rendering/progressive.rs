//! Start / Continue / Close driver for progressive page rendering.
//!
//! A render is started against a page handle and a target surface. Without a
//! pause adapter it runs to completion in one call; with one, it returns
//! [`RenderState::ToBeContinued`] whenever the adapter asks to pause and is
//! resumed with [`continue_render`]. Whatever the outcome, the caller ends the
//! render with [`close_render`], which is also the only way to cancel one.
//!
//! None of these functions panic or return errors: every problem surfaces as
//! [`RenderState::Failed`].

use super::annotation::AnnotationList;
use super::bundle::RenderResourceBundle;
use super::context::RenderContext;
use super::device::{BitmapDevice, Device, RenderTarget};
use super::options::{RenderOptionFlags, RenderOptions};
use super::renderer::RenderState;
use crate::core::error::{PDFError, PDFResult};
use crate::core::page::{Page, Viewport};
use crate::view::PageHandle;
use std::cell::RefMut;
use std::rc::Rc;

/// The only pause adapter version accepted.
pub const PAUSE_ADAPTER_VERSION: i32 = 1;

/// Tells a running render when to yield.
pub trait PauseAdapter {
    fn version(&self) -> i32 {
        PAUSE_ADAPTER_VERSION
    }

    /// Polled between drawable objects; returning true suspends the render.
    fn need_to_pause_now(&mut self) -> bool;
}

impl<F: FnMut() -> bool> PauseAdapter for F {
    fn need_to_pause_now(&mut self) -> bool {
        self()
    }
}

fn check_adapter(pause: &Option<&mut dyn PauseAdapter>) -> PDFResult<()> {
    match pause {
        Some(adapter) if adapter.version() != PAUSE_ADAPTER_VERSION => Err(
            PDFError::InvalidOperation(format!(
                "unsupported pause adapter version {}",
                adapter.version()
            )),
        ),
        _ => Ok(()),
    }
}

fn native_page(handle: &PageHandle) -> PDFResult<RefMut<'_, Page>> {
    let page = handle
        .as_native()
        .ok_or_else(|| PDFError::InvalidOperation("foreign page".to_string()))?;
    page.try_borrow_mut()
        .map_err(|_| PDFError::InvalidOperation("page is busy".to_string()))
}

/// Starts rendering `page` into `target`.
///
/// Fails without retaining anything when `target` is `None`, the pause
/// adapter has an unsupported version, or the handle is not a parsed native
/// page. A render the page already holds is torn down first.
pub fn start_render(
    target: Option<RenderTarget>,
    page: &PageHandle,
    viewport: Viewport,
    rotation: i32,
    flags: RenderOptionFlags,
    pause: Option<&mut dyn PauseAdapter>,
) -> RenderState {
    let Some(target) = target else {
        log::warn!("start_render called without a target");
        return RenderState::Failed;
    };
    start_render_with_device(
        Box::new(BitmapDevice::new(target)),
        page,
        viewport,
        rotation,
        flags,
        pause,
    )
}

/// Same as [`start_render`], drawing through a caller-supplied device.
pub fn start_render_with_device(
    device: Box<dyn Device>,
    page: &PageHandle,
    viewport: Viewport,
    rotation: i32,
    flags: RenderOptionFlags,
    pause: Option<&mut dyn PauseAdapter>,
) -> RenderState {
    let mut page = match check_adapter(&pause).and_then(|()| native_page(page)) {
        Ok(page) => page,
        Err(e) => {
            log::warn!("start_render: {}", e);
            return RenderState::Failed;
        }
    };
    if !page.is_parsed() {
        log::warn!("start_render: {} is not parsed", page.id());
        return RenderState::Failed;
    }

    let matrix = page.display_matrix(viewport, rotation);
    let options = RenderOptions::from_flags(flags);

    let mut context = RenderContext::new(Rc::clone(page.content_groups()), &options);
    context.append_layer(Rc::clone(page.objects()), matrix);

    let annotations = flags.contains(RenderOptionFlags::ANNOT).then(|| {
        let list = AnnotationList::new(page.annotations(), options.is_printing());
        list.display_annotations(&mut context, matrix);
        list
    });

    let mut bundle = RenderResourceBundle::new(annotations, options, device, context);
    if let Some(log) = page.teardown_log() {
        bundle = bundle.with_teardown_log(log.clone());
    }
    page.set_render_bundle(bundle);

    log::debug!(
        "starting render of {} with flags {:#x}",
        page.id(),
        flags.bits()
    );
    match page.render_bundle_mut() {
        Some(bundle) => bundle.start(pause),
        None => RenderState::Failed,
    }
}

/// Resumes a paused render. `Failed`, with no side effect, when the page
/// has no active render.
pub fn continue_render(page: &PageHandle, pause: Option<&mut dyn PauseAdapter>) -> RenderState {
    let mut page = match check_adapter(&pause).and_then(|()| native_page(page)) {
        Ok(page) => page,
        Err(e) => {
            log::warn!("continue_render: {}", e);
            return RenderState::Failed;
        }
    };
    match page.render_bundle_mut() {
        Some(bundle) if bundle.has_renderer() => {
            let state = bundle.resume(pause);
            if state.is_finished() {
                log::debug!("continue_render: render on {} finished as {}", page.id(), state);
            } else {
                log::trace!("continue_render: {}", state);
            }
            state
        }
        _ => {
            log::debug!("continue_render: no active render on {}", page.id());
            RenderState::Failed
        }
    }
}

/// Tears down the page's render resources. Idempotent; never fails.
pub fn close_render(page: &PageHandle) {
    let Some(page) = page.as_native() else {
        return;
    };
    match page.try_borrow_mut() {
        Ok(mut page) => page.clear_render_bundle(),
        Err(_) => log::warn!("close_render: page is busy, render left to page teardown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::page::{Color, PageId, PageObject};
    use crate::rendering::bundle::{ResourceSlot, TeardownLog};
    use crate::rendering::device::{RecordingDevice, new_render_target};
    use crate::view::ForeignPage;

    fn parsed_page(objects: usize) -> PageHandle {
        let mut page = Page::new(PageId(0), [0.0, 0.0, 100.0, 100.0]);
        page.set_contents(
            (0..objects)
                .map(|i| PageObject::filled_rect(i as f32 * 10.0, 0.0, 5.0, 5.0, Color::black()))
                .collect(),
        );
        PageHandle::from_page(page)
    }

    struct OldAdapter;

    impl PauseAdapter for OldAdapter {
        fn version(&self) -> i32 {
            2
        }

        fn need_to_pause_now(&mut self) -> bool {
            false
        }
    }

    #[test]
    fn test_missing_target_fails_without_bundle() {
        let page = parsed_page(1);
        let state = start_render(
            None,
            &page,
            Viewport::new(0, 0, 100, 100),
            0,
            RenderOptionFlags::empty(),
            None,
        );
        assert_eq!(state, RenderState::Failed);
        assert!(page.as_native().unwrap().borrow().render_bundle().is_none());
    }

    #[test]
    fn test_unsupported_adapter_version() {
        let page = parsed_page(1);
        let target = new_render_target(100, 100, Color::white());
        let mut adapter = OldAdapter;
        let state = start_render(
            target,
            &page,
            Viewport::new(0, 0, 100, 100),
            0,
            RenderOptionFlags::empty(),
            Some(&mut adapter),
        );
        assert_eq!(state, RenderState::Failed);
        assert!(page.as_native().unwrap().borrow().render_bundle().is_none());
    }

    #[test]
    fn test_unparsed_and_foreign_pages_fail() {
        let unparsed = PageHandle::from_page(Page::new(PageId(1), [0.0, 0.0, 10.0, 10.0]));
        let foreign = PageHandle::Foreign(ForeignPage::new(PageId(2)));
        for page in [&unparsed, &foreign] {
            let state = start_render_with_device(
                Box::new(RecordingDevice::new(10, 10)),
                page,
                Viewport::new(0, 0, 10, 10),
                0,
                RenderOptionFlags::empty(),
                None,
            );
            assert_eq!(state, RenderState::Failed);
        }
    }

    #[test]
    fn test_render_into_bitmap() {
        let page = parsed_page(1);
        let target = new_render_target(100, 100, Color::white()).unwrap();

        let state = start_render(
            Some(Rc::clone(&target)),
            &page,
            Viewport::new(0, 0, 100, 100),
            0,
            RenderOptionFlags::NO_SMOOTHPATH,
            None,
        );
        assert_eq!(state, RenderState::Done);

        // The rect covers page (0..5, 0..5), the bottom-left of the target.
        let pixel = target.borrow().pixel(2, 97).unwrap();
        assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (0, 0, 0));
        close_render(&page);
    }

    #[test]
    fn test_restart_replaces_bundle() {
        let page = parsed_page(3);
        let log = TeardownLog::new();
        page.as_native().unwrap().borrow_mut().set_teardown_log(log.clone());
        let mut pause = || true;

        let first = start_render_with_device(
            Box::new(RecordingDevice::new(100, 100)),
            &page,
            Viewport::new(0, 0, 100, 100),
            0,
            RenderOptionFlags::empty(),
            Some(&mut pause),
        );
        assert_eq!(first, RenderState::ToBeContinued);

        let second = start_render_with_device(
            Box::new(RecordingDevice::new(100, 100)),
            &page,
            Viewport::new(0, 0, 100, 100),
            0,
            RenderOptionFlags::empty(),
            None,
        );
        assert_eq!(second, RenderState::Done);
        assert_eq!(log.entries().first(), Some(&ResourceSlot::Renderer));
        assert_eq!(log.entries().len(), 4);

        close_render(&page);
        close_render(&page);
        assert_eq!(log.entries().len(), 8);
    }

    #[test]
    fn test_viewport_past_i32_range_renders_off_target() {
        let page = parsed_page(2);
        let device = RecordingDevice::new(10, 10);
        let state = start_render_with_device(
            Box::new(device.clone()),
            &page,
            Viewport::new(i32::MAX - 5, i32::MAX - 5, 10, 10),
            1,
            RenderOptionFlags::empty(),
            None,
        );
        assert_eq!(state, RenderState::Done);
        assert_eq!(device.operations().len(), 2);
        close_render(&page);
    }

    #[test]
    fn test_continue_without_render_fails() {
        let page = parsed_page(1);
        assert_eq!(continue_render(&page, None), RenderState::Failed);
        assert!(page.as_native().unwrap().borrow().render_bundle().is_none());
    }
}
