use crate::core::page::{Page, PageId};
use std::cell::RefCell;
use std::rc::Rc;

/// A page owned by another subsystem; closing it is that subsystem's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignPage {
    id: PageId,
}

impl ForeignPage {
    pub fn new(id: PageId) -> Self {
        ForeignPage { id }
    }

    pub fn id(&self) -> PageId {
        self.id
    }
}

/// The caller's handle to an open page.
#[derive(Debug)]
pub enum PageHandle {
    Native(Rc<RefCell<Page>>),
    Foreign(ForeignPage),
}

impl PageHandle {
    pub fn from_page(page: Page) -> Self {
        PageHandle::Native(Rc::new(RefCell::new(page)))
    }

    pub fn as_native(&self) -> Option<&Rc<RefCell<Page>>> {
        match self {
            PageHandle::Native(page) => Some(page),
            PageHandle::Foreign(_) => None,
        }
    }

    /// Id of the page, or `None` while a native page is mutably borrowed.
    pub fn id(&self) -> Option<PageId> {
        match self {
            PageHandle::Native(page) => page.try_borrow().ok().map(|p| p.id()),
            PageHandle::Foreign(foreign) => Some(foreign.id()),
        }
    }
}

/// Closes a page handle.
///
/// Foreign pages are left alone. A native page with no live view, or whose
/// view is already being torn down, is released with the handle. If the view
/// is locked the page is handed to it and freed when the view goes away;
/// otherwise the view is removed from its environment, which tears down the
/// page's render resources before the page is freed.
pub fn close_page(handle: PageHandle) {
    let page = match handle {
        PageHandle::Native(page) => page,
        PageHandle::Foreign(foreign) => {
            log::trace!("close_page: {} is foreign", foreign.id());
            return;
        }
    };

    let (page_id, view) = match page.try_borrow() {
        Ok(p) => (p.id(), p.view()),
        Err(_) => {
            log::warn!("close_page: page is busy, releasing handle only");
            return;
        }
    };

    let Some(view) = view else {
        log::debug!("closing {} without a view", page_id);
        return;
    };
    if view.is_being_destroyed() {
        return;
    }
    if view.is_locked() {
        log::debug!("deferring close of {} to its locked view", page_id);
        view.take_page_ownership(page);
        return;
    }

    match view.environment() {
        Some(environment) => environment.remove_view(page_id),
        None => log::warn!("view of {} has no environment", page_id),
    }
    drop(view);
    drop(page);
}
