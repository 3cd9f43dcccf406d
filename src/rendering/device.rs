//! Device trait for rendering backend abstraction.
//!
//! The render context turns page objects into device-space geometry and
//! hands it to a [`Device`]. [`BitmapDevice`] rasterizes into a caller-owned
//! tiny-skia pixmap; [`RecordingDevice`] only records what it was asked to
//! draw, for tests and diagnostics.

use crate::core::error::{PDFError, PDFResult};
use crate::core::page::{Color, FillRule, TextObject};
use std::cell::RefCell;
use std::rc::Rc;
use tiny_skia::{
    FillRule as SkiaFillRule, FilterQuality, Paint as SkiaPaint, Path, Pixmap, PixmapPaint,
    Stroke, Transform,
};

/// Caller-owned target surface.
///
/// Shared with the device for the lifetime of a render; whatever has been
/// drawn when a render is cancelled stays in the pixmap.
pub type RenderTarget = Rc<RefCell<Pixmap>>;

/// Creates a target of the given size filled with `background`.
pub fn new_render_target(width: u32, height: u32, background: Color) -> Option<RenderTarget> {
    let mut pixmap = Pixmap::new(width, height)?;
    pixmap.fill(to_skia_color(background));
    Some(Rc::new(RefCell::new(pixmap)))
}

/// Paint for drawing operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub anti_alias: bool,
}

/// A device that can render page drawing operations.
pub trait Device {
    /// Device size in pixels.
    fn size(&self) -> (u32, u32);

    /// Fills `path` (object space) mapped through `transform`.
    fn fill_path(
        &mut self,
        path: &Path,
        paint: &Paint,
        rule: FillRule,
        transform: Transform,
    ) -> PDFResult<()>;

    /// Strokes `path` with a line of `line_width` object-space units.
    fn stroke_path(
        &mut self,
        path: &Path,
        paint: &Paint,
        line_width: f32,
        transform: Transform,
    ) -> PDFResult<()>;

    /// Draws `image` with its pixel grid mapped through `transform`.
    fn draw_image(
        &mut self,
        image: &Pixmap,
        transform: Transform,
        quality: FilterQuality,
    ) -> PDFResult<()>;

    /// Whether the device can draw text itself (e.g. a printer driver).
    fn supports_native_text(&self) -> bool {
        false
    }

    /// Draws a text object natively. Only called when
    /// [`supports_native_text`](Self::supports_native_text) returns true.
    fn draw_native_text(
        &mut self,
        text: &TextObject,
        paint: &Paint,
        transform: Transform,
    ) -> PDFResult<()> {
        let _ = (text, paint, transform);
        Err(PDFError::RenderingError(
            "device does not draw text natively".to_string(),
        ))
    }
}

// --- Conversion helpers ---

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn to_skia_paint(paint: &Paint) -> SkiaPaint<'static> {
    let mut sk_paint = SkiaPaint::default();
    sk_paint.set_color(to_skia_color(paint.color));
    sk_paint.anti_alias = paint.anti_alias;
    sk_paint
}

fn to_skia_fill_rule(fill_rule: FillRule) -> SkiaFillRule {
    match fill_rule {
        FillRule::NonZero => SkiaFillRule::Winding,
        FillRule::EvenOdd => SkiaFillRule::EvenOdd,
    }
}

/// Rasterizes into a shared [`RenderTarget`].
pub struct BitmapDevice {
    target: RenderTarget,
}

impl BitmapDevice {
    pub fn new(target: RenderTarget) -> Self {
        BitmapDevice { target }
    }

    fn pixmap(&self) -> PDFResult<std::cell::RefMut<'_, Pixmap>> {
        self.target
            .try_borrow_mut()
            .map_err(|_| PDFError::RenderingError("render target is borrowed".to_string()))
    }
}

impl Device for BitmapDevice {
    fn size(&self) -> (u32, u32) {
        let pixmap = self.target.borrow();
        (pixmap.width(), pixmap.height())
    }

    fn fill_path(
        &mut self,
        path: &Path,
        paint: &Paint,
        rule: FillRule,
        transform: Transform,
    ) -> PDFResult<()> {
        self.pixmap()?.fill_path(
            path,
            &to_skia_paint(paint),
            to_skia_fill_rule(rule),
            transform,
            None,
        );
        Ok(())
    }

    fn stroke_path(
        &mut self,
        path: &Path,
        paint: &Paint,
        line_width: f32,
        transform: Transform,
    ) -> PDFResult<()> {
        let stroke = Stroke {
            width: line_width,
            ..Stroke::default()
        };
        self.pixmap()?
            .stroke_path(path, &to_skia_paint(paint), &stroke, transform, None);
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &Pixmap,
        transform: Transform,
        quality: FilterQuality,
    ) -> PDFResult<()> {
        let paint = PixmapPaint {
            quality,
            ..PixmapPaint::default()
        };
        self.pixmap()?
            .draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
        Ok(())
    }
}

/// A device that records drawing operations instead of rasterizing.
///
/// Clones share the same operation log, so a test can keep one clone while
/// the other is owned by a render bundle.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    width: u32,
    height: u32,
    native_text: bool,
    operations: Rc<RefCell<Vec<String>>>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        RecordingDevice {
            width,
            height,
            native_text: false,
            operations: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Makes the device claim native text support.
    pub fn with_native_text(mut self) -> Self {
        self.native_text = true;
        self
    }

    /// Get the recorded operations.
    pub fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    /// Clear the recorded operations.
    pub fn clear_operations(&self) {
        self.operations.borrow_mut().clear();
    }

    fn record(&self, op: String) {
        self.operations.borrow_mut().push(op);
    }
}

impl Device for RecordingDevice {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill_path(
        &mut self,
        _path: &Path,
        paint: &Paint,
        rule: FillRule,
        _transform: Transform,
    ) -> PDFResult<()> {
        let c = paint.color;
        self.record(format!("fill_path({:?}, #{:02x}{:02x}{:02x})", rule, c.r, c.g, c.b));
        Ok(())
    }

    fn stroke_path(
        &mut self,
        _path: &Path,
        _paint: &Paint,
        line_width: f32,
        _transform: Transform,
    ) -> PDFResult<()> {
        self.record(format!("stroke_path({})", line_width));
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &Pixmap,
        _transform: Transform,
        quality: FilterQuality,
    ) -> PDFResult<()> {
        self.record(format!(
            "draw_image({}x{}, {:?})",
            image.width(),
            image.height(),
            quality
        ));
        Ok(())
    }

    fn supports_native_text(&self) -> bool {
        self.native_text
    }

    fn draw_native_text(
        &mut self,
        text: &TextObject,
        _paint: &Paint,
        _transform: Transform,
    ) -> PDFResult<()> {
        self.record(format!("native_text({})", text.text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{PathBuilder, Rect};

    fn unit_square() -> Path {
        PathBuilder::from_rect(Rect::from_xywh(0.0, 0.0, 1.0, 1.0).unwrap())
    }

    #[test]
    fn test_bitmap_device_fills_target() {
        let target = new_render_target(10, 10, Color::white()).unwrap();
        let mut device = BitmapDevice::new(Rc::clone(&target));
        let paint = Paint {
            color: Color::rgb(255, 0, 0),
            anti_alias: false,
        };

        device
            .fill_path(&unit_square(), &paint, FillRule::NonZero, Transform::from_scale(5.0, 5.0))
            .unwrap();

        let pixmap = target.borrow();
        let inside = pixmap.pixel(2, 2).unwrap();
        assert_eq!((inside.red(), inside.green(), inside.blue()), (255, 0, 0));
        let outside = pixmap.pixel(8, 8).unwrap();
        assert_eq!((outside.red(), outside.green(), outside.blue()), (255, 255, 255));
    }

    #[test]
    fn test_bitmap_device_reports_busy_target() {
        let target = new_render_target(4, 4, Color::white()).unwrap();
        let mut device = BitmapDevice::new(Rc::clone(&target));
        let _held = target.borrow_mut();
        let paint = Paint {
            color: Color::black(),
            anti_alias: true,
        };

        let result = device.fill_path(
            &unit_square(),
            &paint,
            FillRule::NonZero,
            Transform::identity(),
        );
        assert!(matches!(result, Err(PDFError::RenderingError(_))));
    }

    #[test]
    fn test_recording_device_shares_log() {
        let device = RecordingDevice::new(612, 792);
        let mut owned: Box<dyn Device> = Box::new(device.clone());
        let paint = Paint {
            color: Color::rgb(0, 0, 255),
            anti_alias: true,
        };

        owned
            .fill_path(&unit_square(), &paint, FillRule::EvenOdd, Transform::identity())
            .unwrap();
        owned
            .stroke_path(&unit_square(), &paint, 2.0, Transform::identity())
            .unwrap();

        assert_eq!(
            device.operations(),
            vec!["fill_path(EvenOdd, #0000ff)", "stroke_path(2)"]
        );
        assert_eq!(owned.size(), (612, 792));
    }
}
