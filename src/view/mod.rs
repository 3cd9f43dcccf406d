//! Page views and deferred page destruction.
//!
//! A native page may be bound to one [`View`], owned by an [`Environment`].
//! The page only keeps a weak link back to its view. Closing a page whose
//! view is locked by an outer call frame hands the page to the view instead
//! of freeing it; the view frees it when it is torn down.

pub mod environment;
pub mod handle;
pub mod page_view;

use crate::core::page::{Page, PageId};
use std::cell::RefCell;
use std::rc::Rc;

pub use environment::FormEnvironment;
pub use handle::{ForeignPage, PageHandle, close_page};
pub use page_view::{PageView, ViewLock};

/// A page view collaborator.
pub trait View {
    /// True while the view's own teardown is running.
    fn is_being_destroyed(&self) -> bool;

    /// True while an outer call frame is iterating through the view.
    fn is_locked(&self) -> bool;

    /// Makes the view responsible for freeing `page`.
    fn take_page_ownership(&self, page: Rc<RefCell<Page>>);

    /// The environment that owns this view, if it is still alive.
    fn environment(&self) -> Option<Rc<dyn Environment>>;
}

/// The host that owns page views.
pub trait Environment {
    /// Removes and tears down the view bound to `page_id`.
    fn remove_view(&self, page_id: PageId);
}
