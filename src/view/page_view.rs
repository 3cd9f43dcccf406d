use super::{Environment, View};
use crate::core::page::{Annotation, Page, PageId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// The view of one page inside a [`FormEnvironment`](super::FormEnvironment).
///
/// Holds the page weakly unless ownership was handed over by a close that
/// happened while the view was locked.
pub struct PageView {
    page_id: PageId,
    page: Weak<RefCell<Page>>,
    owned_page: RefCell<Option<Rc<RefCell<Page>>>>,
    lock_count: Cell<usize>,
    being_destroyed: Cell<bool>,
    environment: Weak<dyn Environment>,
}

impl PageView {
    pub(crate) fn new(page: &Rc<RefCell<Page>>, environment: Weak<dyn Environment>) -> Self {
        PageView {
            page_id: page.borrow().id(),
            page: Rc::downgrade(page),
            owned_page: RefCell::new(None),
            lock_count: Cell::new(0),
            being_destroyed: Cell::new(false),
            environment,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The page, if it is still alive.
    pub fn page(&self) -> Option<Rc<RefCell<Page>>> {
        self.page.upgrade()
    }

    /// Whether a locked close handed the page to this view.
    pub fn owns_page(&self) -> bool {
        self.owned_page.borrow().is_some()
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count.get()
    }

    /// Marks the view as in use until the guard is dropped. Locks nest.
    pub fn lock(self: &Rc<Self>) -> ViewLock {
        self.lock_count.set(self.lock_count.get() + 1);
        ViewLock {
            view: Rc::clone(self),
        }
    }

    /// Calls `f` for each annotation of the page while the view is locked.
    ///
    /// `f` may close the page; the page then stays alive until the loop
    /// ends and is freed together with this view.
    pub fn visit_annotations<F>(self: &Rc<Self>, mut f: F)
    where
        F: FnMut(&Annotation),
    {
        let Some(page) = self.page.upgrade() else {
            return;
        };
        let annotations = match page.try_borrow() {
            Ok(page) => page.annotations().to_vec(),
            Err(_) => return,
        };
        drop(page);

        let _lock = self.lock();
        for annotation in &annotations {
            f(annotation);
        }
    }

    fn unlock(&self) {
        let count = self.lock_count.get().saturating_sub(1);
        self.lock_count.set(count);
        if count > 0 || !self.owns_page() {
            return;
        }

        // A close arrived while locked; finish it now.
        log::debug!("completing deferred close of {}", self.page_id);
        if let Some(environment) = self.environment.upgrade() {
            environment.remove_view(self.page_id);
        }
    }
}

impl View for PageView {
    fn is_being_destroyed(&self) -> bool {
        self.being_destroyed.get()
    }

    fn is_locked(&self) -> bool {
        self.lock_count.get() > 0
    }

    fn take_page_ownership(&self, page: Rc<RefCell<Page>>) {
        log::debug!("view takes ownership of {}", self.page_id);
        *self.owned_page.borrow_mut() = Some(page);
    }

    fn environment(&self) -> Option<Rc<dyn Environment>> {
        self.environment.upgrade()
    }
}

impl Drop for PageView {
    fn drop(&mut self) {
        self.being_destroyed.set(true);
        log::debug!("tearing down view of {}", self.page_id);

        if let Some(page) = self.page.upgrade() {
            match page.try_borrow_mut() {
                Ok(mut page) => {
                    page.clear_render_bundle();
                    page.clear_view();
                }
                Err(_) => log::warn!("{} busy during view teardown", self.page_id),
            }
        }

        // Frees the page when the view was its last owner.
        let owned = self.owned_page.get_mut().take();
        drop(owned);
    }
}

impl fmt::Debug for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("page_id", &self.page_id)
            .field("lock_count", &self.lock_count.get())
            .field("owns_page", &self.owns_page())
            .field("being_destroyed", &self.being_destroyed.get())
            .finish()
    }
}

/// Keeps a [`PageView`] locked while alive.
#[must_use = "the view unlocks as soon as the guard is dropped"]
pub struct ViewLock {
    view: Rc<PageView>,
}

impl ViewLock {
    pub fn view(&self) -> &Rc<PageView> {
        &self.view
    }
}

impl Drop for ViewLock {
    fn drop(&mut self) {
        self.view.unlock();
    }
}
