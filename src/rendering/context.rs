//! Rendering context for drawing page objects.
//!
//! A [`RenderContext`] holds the layers of one render pass: the page content
//! first, then one layer per displayed annotation. Each layer is a shared
//! list of objects plus the matrix that maps it into device space. The
//! renderer walks the layers object by object, which is what makes a pass
//! resumable.

use super::device::{Device, Paint};
use super::options::{ColorMode, RenderOptions, Usage};
use crate::core::decode::decode_image;
use crate::core::error::PDFResult;
use crate::core::page::{
    Color, ImageObject, OptionalContentGroup, PageObject, PageObjectKind, PathObject,
    PathSegment, TextObject,
};
use lru::LruCache;
use rustc_hash::FxHashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;
use tiny_skia::{FilterQuality, Path, PathBuilder, Pixmap, Rect, Transform};

/// Horizontal advance of a glyph box, relative to the font size.
const GLYPH_ADVANCE: f32 = 0.5;

/// A list of objects drawn with one matrix.
#[derive(Debug, Clone)]
pub struct RenderLayer {
    objects: Rc<[PageObject]>,
    matrix: Transform,
}

impl RenderLayer {
    pub fn objects(&self) -> &[PageObject] {
        &self.objects
    }

    pub fn matrix(&self) -> Transform {
        self.matrix
    }
}

/// Decoded images are cached per (layer, object) position.
type ImageKey = (usize, usize);

/// Everything the renderer needs to draw one pass, minus the device.
pub struct RenderContext {
    layers: Vec<RenderLayer>,
    content_groups: Rc<FxHashMap<String, OptionalContentGroup>>,
    usage: Usage,
    image_cache: LruCache<ImageKey, Rc<Pixmap>>,
}

impl RenderContext {
    pub fn new(
        content_groups: Rc<FxHashMap<String, OptionalContentGroup>>,
        options: &RenderOptions,
    ) -> Self {
        let capacity =
            NonZeroUsize::new(options.image_cache_capacity()).unwrap_or(NonZeroUsize::MIN);
        RenderContext {
            layers: Vec::new(),
            content_groups,
            usage: options.usage,
            image_cache: LruCache::new(capacity),
        }
    }

    /// Appends a layer drawn after every existing one.
    pub fn append_layer(&mut self, objects: Rc<[PageObject]>, matrix: Transform) {
        self.layers.push(RenderLayer { objects, matrix });
    }

    pub fn layers(&self) -> &[RenderLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn cached_image_count(&self) -> usize {
        self.image_cache.len()
    }

    /// Whether `object` is visible for this pass's usage.
    ///
    /// Objects outside any group, or in a group the page doesn't define,
    /// are always visible.
    pub fn is_visible(&self, object: &PageObject) -> bool {
        let Some(name) = &object.content_group else {
            return true;
        };
        match self.content_groups.get(name) {
            Some(group) => match self.usage {
                Usage::View => group.view_state,
                Usage::Print => group.print_state,
            },
            None => true,
        }
    }

    /// Draws object `index` of layer `layer`. Out-of-range positions are a no-op.
    pub fn render_object(
        &mut self,
        layer: usize,
        index: usize,
        device: &mut dyn Device,
        options: &RenderOptions,
    ) -> PDFResult<()> {
        let Some(render_layer) = self.layers.get(layer) else {
            return Ok(());
        };
        let Some(object) = render_layer.objects.get(index) else {
            return Ok(());
        };
        if !self.is_visible(object) {
            log::trace!("skipping hidden object {index} of layer {layer}");
            return Ok(());
        }

        let objects = Rc::clone(&render_layer.objects);
        let matrix = render_layer.matrix();
        match &objects[index].kind {
            PageObjectKind::Path(path) => render_path(path, matrix, device, options),
            PageObjectKind::Text(text) => render_text(text, matrix, device, options),
            PageObjectKind::Image(image) => {
                self.render_image((layer, index), image, matrix, device, options)
            }
        }
    }

    fn render_image(
        &mut self,
        key: ImageKey,
        image: &ImageObject,
        matrix: Transform,
        device: &mut dyn Device,
        options: &RenderOptions,
    ) -> PDFResult<()> {
        let pixmap = match self.image_cache.get(&key) {
            Some(pixmap) => Rc::clone(pixmap),
            None => {
                let decoded = Rc::new(decode_image(image, options.color_mode == ColorMode::Gray)?);
                self.image_cache.put(key, Rc::clone(&decoded));
                decoded
            }
        };

        // Pixel (0, 0) is the top-left corner of the unit square.
        let to_unit = Transform::from_row(
            1.0 / image.width as f32,
            0.0,
            0.0,
            -1.0 / image.height as f32,
            0.0,
            1.0,
        );
        let transform = matrix.pre_concat(image.matrix).pre_concat(to_unit);

        let quality = if options.no_smooth_image {
            FilterQuality::Nearest
        } else if options.force_halftone {
            FilterQuality::Bicubic
        } else {
            FilterQuality::Bilinear
        };

        device.draw_image(&pixmap, transform, quality)
    }
}

fn output_color(color: Color, options: &RenderOptions) -> Color {
    match options.color_mode {
        ColorMode::Normal => color,
        ColorMode::Gray => color.to_gray(),
    }
}

fn build_path(segments: &[PathSegment]) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(x, y) => builder.move_to(x, y),
            PathSegment::LineTo(x, y) => builder.line_to(x, y),
            PathSegment::CurveTo(x1, y1, x2, y2, x, y) => builder.cubic_to(x1, y1, x2, y2, x, y),
            PathSegment::Close => builder.close(),
        }
    }
    builder.finish()
}

fn render_path(
    path: &PathObject,
    matrix: Transform,
    device: &mut dyn Device,
    options: &RenderOptions,
) -> PDFResult<()> {
    let Some(sk_path) = build_path(&path.segments) else {
        return Ok(());
    };
    let transform = matrix.pre_concat(path.matrix);
    let anti_alias = !options.no_smooth_path;

    if let Some((color, rule)) = path.fill {
        let paint = Paint {
            color: output_color(color, options),
            anti_alias,
        };
        device.fill_path(&sk_path, &paint, rule, transform)?;
    }
    if let Some((color, width)) = path.stroke {
        let paint = Paint {
            color: output_color(color, options),
            anti_alias,
        };
        device.stroke_path(&sk_path, &paint, width, transform)?;
    }
    Ok(())
}

fn render_text(
    text: &TextObject,
    matrix: Transform,
    device: &mut dyn Device,
    options: &RenderOptions,
) -> PDFResult<()> {
    let transform = matrix.pre_concat(text.matrix);
    let paint = Paint {
        color: output_color(text.color, options),
        anti_alias: !options.no_smooth_text,
    };

    if device.supports_native_text() && !options.no_native_text {
        return device.draw_native_text(text, &paint, transform);
    }

    // Without font programs every glyph is drawn as a box on the baseline.
    let advance = text.font_size * GLYPH_ADVANCE;
    let (x, y) = text.origin;
    let mut builder = PathBuilder::new();
    for (i, ch) in text.text.chars().enumerate() {
        if ch.is_whitespace() {
            continue;
        }
        let left = x + advance * i as f32;
        if let Some(rect) = Rect::from_xywh(left, y, advance * 0.8, text.font_size * 0.7) {
            builder.push_rect(rect);
        }
    }
    match builder.finish() {
        Some(glyphs) => device.fill_path(
            &glyphs,
            &paint,
            crate::core::page::FillRule::NonZero,
            transform,
        ),
        None => Ok(()),
    }
}
