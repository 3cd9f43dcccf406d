use crate::rendering::bundle::{RenderResourceBundle, TeardownLog};
use crate::view::View;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tiny_skia::Transform;

/// Identifies a page within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// An RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn black() -> Self {
        Color::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Color::rgb(255, 255, 255)
    }

    /// Luminance-preserving gray version of this color.
    pub fn to_gray(self) -> Self {
        let luma = gray_level(self.r, self.g, self.b);
        Color {
            r: luma,
            g: luma,
            b: luma,
            a: self.a,
        }
    }
}

/// ITU-R BT.601 luma.
pub(crate) fn gray_level(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}

/// Fill rule for path filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// One segment of a path, in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathObject {
    pub segments: Vec<PathSegment>,
    pub fill: Option<(Color, FillRule)>,
    /// Stroke color and line width
    pub stroke: Option<(Color, f32)>,
    pub matrix: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextObject {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    /// Baseline origin in object space
    pub origin: (f32, f32),
    pub color: Color,
    pub matrix: Transform,
}

/// Color layout of raw image samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageColorSpace {
    Gray,
    Rgb,
    Rgba,
}

impl ImageColorSpace {
    pub fn components(self) -> usize {
        match self {
            ImageColorSpace::Gray => 1,
            ImageColorSpace::Rgb => 3,
            ImageColorSpace::Rgba => 4,
        }
    }
}

/// How image samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Raw,
    Flate,
}

/// An image drawn into the unit square of `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageObject {
    pub width: u32,
    pub height: u32,
    pub color_space: ImageColorSpace,
    pub encoding: ImageEncoding,
    pub data: Rc<[u8]>,
    pub matrix: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageObjectKind {
    Path(PathObject),
    Text(TextObject),
    Image(ImageObject),
}

/// A drawable object of a parsed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageObject {
    pub kind: PageObjectKind,
    /// Optional content group this object belongs to
    pub content_group: Option<String>,
}

impl PageObject {
    pub fn new(kind: PageObjectKind) -> Self {
        PageObject {
            kind,
            content_group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.content_group = Some(group.into());
        self
    }

    /// Convenience constructor for a filled rectangle.
    pub fn filled_rect(x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        PageObject::new(PageObjectKind::Path(PathObject {
            segments: vec![
                PathSegment::MoveTo(x, y),
                PathSegment::LineTo(x + width, y),
                PathSegment::LineTo(x + width, y + height),
                PathSegment::LineTo(x, y + height),
                PathSegment::Close,
            ],
            fill: Some((color, FillRule::NonZero)),
            stroke: None,
            matrix: Transform::identity(),
        }))
    }
}

/// An optional content group and its default visibility per usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalContentGroup {
    pub name: String,
    pub view_state: bool,
    pub print_state: bool,
}

/// Annotation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationFlags {
    /// Invisible (if set, don't display unknown annotation types)
    pub invisible: bool,

    /// Hidden (if set, don't display or print)
    pub hidden: bool,

    /// Print (if set, print annotation)
    pub print: bool,

    /// No view (if set, don't display on screen)
    pub no_view: bool,
}

impl AnnotationFlags {
    /// Parse annotation flags from an integer.
    pub fn from_flags(flags: i32) -> Self {
        AnnotationFlags {
            invisible: (flags & 1) != 0,
            hidden: (flags & 2) != 0,
            print: (flags & 4) != 0,
            no_view: (flags & 32) != 0,
        }
    }
}

/// An annotation with its normal appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub subtype: String,
    /// [llx, lly, urx, ury] in page space
    pub rect: [f32; 4],
    pub flags: AnnotationFlags,
    /// Appearance objects, in annotation space (origin at the rect's lower-left)
    pub appearance: Rc<[PageObject]>,
}

/// Device-space rectangle a page is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Viewport {
            left,
            top,
            width,
            height,
        }
    }
}

/// A single page: its drawable content plus the state bound to it while it
/// is open (page view back-link, in-progress render resources).
///
/// Content is supplied by the parser through [`Page::set_contents`]; until
/// then the page is not considered parsed and cannot be rendered.
pub struct Page {
    id: PageId,
    /// [llx, lly, urx, ury]
    media_box: [f32; 4],
    objects: Rc<[PageObject]>,
    annotations: Vec<Annotation>,
    content_groups: Rc<FxHashMap<String, OptionalContentGroup>>,
    parsed: bool,

    /// Non-owning link to the page view bound to this page
    view: Option<Weak<dyn View>>,
    render_bundle: Option<RenderResourceBundle>,
    teardown_log: Option<TeardownLog>,
}

impl Page {
    pub fn new(id: PageId, media_box: [f32; 4]) -> Self {
        Page {
            id,
            media_box,
            objects: Rc::from(Vec::new()),
            annotations: Vec::new(),
            content_groups: Rc::new(FxHashMap::default()),
            parsed: false,
            view: None,
            render_bundle: None,
            teardown_log: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn media_box(&self) -> [f32; 4] {
        self.media_box
    }

    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Installs the parsed drawable content and marks the page parsed.
    pub fn set_contents(&mut self, objects: Vec<PageObject>) {
        self.objects = Rc::from(objects);
        self.parsed = true;
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn objects(&self) -> &Rc<[PageObject]> {
        &self.objects
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn add_content_group(&mut self, group: OptionalContentGroup) {
        Rc::make_mut(&mut self.content_groups).insert(group.name.clone(), group);
    }

    pub fn content_groups(&self) -> &Rc<FxHashMap<String, OptionalContentGroup>> {
        &self.content_groups
    }

    /// Matrix mapping page space into `viewport`, rotated clockwise by
    /// `rotation` quarter turns.
    pub fn display_matrix(&self, viewport: Viewport, rotation: i32) -> Transform {
        let (width, height) = (self.width(), self.height());
        if width == 0.0 || height == 0.0 {
            return Transform::identity();
        }

        let left = viewport.left as f32;
        let top = viewport.top as f32;
        let right = left + viewport.width as f32;
        let bottom = top + viewport.height as f32;

        // (x0, y0) is where the page origin lands, (x1, y1) the top-left
        // corner, (x2, y2) the bottom-right corner.
        let (x0, y0, x1, y1, x2, y2) = match rotation.rem_euclid(4) {
            0 => (left, bottom, left, top, right, bottom),
            1 => (left, top, right, top, left, bottom),
            2 => (right, top, right, bottom, left, top),
            _ => (right, bottom, left, bottom, right, top),
        };

        let display = Transform::from_row(
            (x2 - x0) / width,
            (y2 - y0) / width,
            (x1 - x0) / height,
            (y1 - y0) / height,
            x0,
            y0,
        );
        let page = Transform::from_translate(-self.media_box[0], -self.media_box[1]);
        display.pre_concat(page)
    }

    /// Returns the page view bound to this page, if it is still alive.
    pub fn view(&self) -> Option<Rc<dyn View>> {
        self.view.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_view(&mut self, view: Weak<dyn View>) {
        self.view = Some(view);
    }

    pub fn clear_view(&mut self) {
        self.view = None;
    }

    /// Attaches a log that records the release order of every render bundle
    /// this page creates from now on.
    pub fn set_teardown_log(&mut self, log: TeardownLog) {
        self.teardown_log = Some(log);
    }

    pub fn teardown_log(&self) -> Option<&TeardownLog> {
        self.teardown_log.as_ref()
    }

    pub fn render_bundle(&self) -> Option<&RenderResourceBundle> {
        self.render_bundle.as_ref()
    }

    pub fn render_bundle_mut(&mut self) -> Option<&mut RenderResourceBundle> {
        self.render_bundle.as_mut()
    }

    /// Installs `bundle`, tearing down whatever the page held before.
    pub fn set_render_bundle(&mut self, bundle: RenderResourceBundle) {
        match &mut self.render_bundle {
            Some(current) => current.replace(bundle),
            None => self.render_bundle = Some(bundle),
        }
    }

    /// Tears down the page's render resources, if any.
    pub fn clear_render_bundle(&mut self) {
        if let Some(mut bundle) = self.render_bundle.take() {
            bundle.teardown();
        }
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        log::debug!("releasing {}", self.id);
        self.clear_render_bundle();
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("media_box", &self.media_box)
            .field("objects", &self.objects.len())
            .field("annotations", &self.annotations.len())
            .field("parsed", &self.parsed)
            .field("rendering", &self.render_bundle.is_some())
            .finish()
    }
}
