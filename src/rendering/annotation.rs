//! Annotation appearances drawn on top of the page content.

use super::context::RenderContext;
use crate::core::page::{Annotation, PageObject};
use std::rc::Rc;
use tiny_skia::Transform;

struct DisplayedAnnotation {
    subtype: String,
    origin: (f32, f32),
    appearance: Rc<[PageObject]>,
}

/// The annotations of a page that are shown for one usage.
pub struct AnnotationList {
    entries: Vec<DisplayedAnnotation>,
}

impl AnnotationList {
    /// Keeps the annotations visible when printing (if `printing`) or viewing.
    ///
    /// Hidden annotations are never shown. Printing requires the print flag;
    /// viewing skips no-view and invisible annotations.
    pub fn new(annotations: &[Annotation], printing: bool) -> Self {
        let entries = annotations
            .iter()
            .filter(|annot| {
                let flags = annot.flags;
                if flags.hidden {
                    return false;
                }
                if printing {
                    flags.print
                } else {
                    !flags.no_view && !flags.invisible
                }
            })
            .map(|annot| DisplayedAnnotation {
                subtype: annot.subtype.clone(),
                origin: (annot.rect[0], annot.rect[1]),
                appearance: Rc::clone(&annot.appearance),
            })
            .collect::<Vec<_>>();

        log::trace!(
            "{} of {} annotations displayed (printing: {})",
            entries.len(),
            annotations.len(),
            printing
        );
        AnnotationList { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subtypes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.subtype.as_str())
    }

    /// Appends one layer per annotation, placed at its rect's lower-left
    /// corner in the page space `matrix` maps from.
    pub fn display_annotations(&self, context: &mut RenderContext, matrix: Transform) {
        for entry in &self.entries {
            let (x, y) = entry.origin;
            context.append_layer(
                Rc::clone(&entry.appearance),
                matrix.pre_concat(Transform::from_translate(x, y)),
            );
        }
    }
}
