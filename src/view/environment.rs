use super::page_view::PageView;
use super::{Environment, View};
use crate::core::page::{Page, PageId};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Owns the page views of one document.
pub struct FormEnvironment {
    views: RefCell<FxHashMap<PageId, Rc<PageView>>>,
    self_ref: Weak<FormEnvironment>,
}

impl FormEnvironment {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|self_ref| FormEnvironment {
            views: RefCell::new(FxHashMap::default()),
            self_ref: self_ref.clone(),
        })
    }

    /// Returns the view of `page`, creating and binding one if needed.
    pub fn get_or_create_view(&self, page: &Rc<RefCell<Page>>) -> Rc<PageView> {
        let page_id = page.borrow().id();
        if let Some(view) = self.view(page_id) {
            return view;
        }

        let environment: Weak<dyn Environment> = self.self_ref.clone();
        let view = Rc::new(PageView::new(page, environment));
        let link: Weak<dyn View> = Rc::downgrade(&view) as Weak<dyn View>;
        page.borrow_mut().set_view(link);
        self.views.borrow_mut().insert(page_id, Rc::clone(&view));

        log::debug!("created view for {}", page_id);
        view
    }

    pub fn view(&self, page_id: PageId) -> Option<Rc<PageView>> {
        self.views.borrow().get(&page_id).cloned()
    }

    pub fn view_count(&self) -> usize {
        self.views.borrow().len()
    }
}

impl Environment for FormEnvironment {
    fn remove_view(&self, page_id: PageId) {
        let locked = match self.views.borrow().get(&page_id) {
            Some(view) => view.is_locked() || view.is_being_destroyed(),
            None => return,
        };
        if locked {
            log::debug!("view of {} is in use, not removed", page_id);
            return;
        }

        // The map borrow must be released before the view's teardown runs.
        let removed = self.views.borrow_mut().remove(&page_id);
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::page::{Color, PageObject, Viewport};
    use crate::rendering::bundle::{ResourceSlot, TeardownLog};
    use crate::rendering::device::RecordingDevice;
    use crate::rendering::{RenderOptionFlags, RenderState, start_render_with_device};
    use crate::view::PageHandle;

    fn page(id: u32) -> Rc<RefCell<Page>> {
        let mut page = Page::new(PageId(id), [0.0, 0.0, 10.0, 10.0]);
        page.set_contents(vec![
            PageObject::filled_rect(0.0, 0.0, 1.0, 1.0, Color::black()),
            PageObject::filled_rect(2.0, 2.0, 1.0, 1.0, Color::black()),
        ]);
        Rc::new(RefCell::new(page))
    }

    #[test]
    fn test_view_is_created_once() {
        let env = FormEnvironment::new();
        let page = page(0);

        let first = env.get_or_create_view(&page);
        let second = env.get_or_create_view(&page);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(env.view_count(), 1);
        assert!(page.borrow().view().is_some());
    }

    #[test]
    fn test_remove_view_tears_down_render() {
        let env = FormEnvironment::new();
        let page = page(1);
        let log = TeardownLog::new();
        page.borrow_mut().set_teardown_log(log.clone());
        env.get_or_create_view(&page);

        let handle = PageHandle::Native(Rc::clone(&page));
        let mut pause = || true;
        let state = start_render_with_device(
            Box::new(RecordingDevice::new(10, 10)),
            &handle,
            Viewport::new(0, 0, 10, 10),
            0,
            RenderOptionFlags::empty(),
            Some(&mut pause),
        );
        assert_eq!(state, RenderState::ToBeContinued);

        env.remove_view(PageId(1));
        assert_eq!(env.view_count(), 0);
        assert_eq!(log.entries().first(), Some(&ResourceSlot::Renderer));
        assert!(page.borrow().render_bundle().is_none());
        assert!(page.borrow().view().is_none());
    }

    #[test]
    fn test_locked_view_is_not_removed() {
        let env = FormEnvironment::new();
        let page = page(2);
        let view = env.get_or_create_view(&page);

        let lock = view.lock();
        env.remove_view(PageId(2));
        assert_eq!(env.view_count(), 1);

        drop(lock);
        env.remove_view(PageId(2));
        assert_eq!(env.view_count(), 0);
    }
}
