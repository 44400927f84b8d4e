//! The drawing surface a render pass paints into.
//!
//! [`Canvas`] wraps a `tiny_skia::Pixmap` and adds the small amount of state a
//! 2D context carries: an open path that shapes append to, the current fill
//! paint, and a save/restore stack of transforms.

use std::f64::consts::{FRAC_PI_2, PI};

use image::{Rgba, RgbaImage};
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, Path, PathBuilder, PathSegment, Pixmap, PixmapPaint,
    Shader, Transform,
};

use crate::error::{RenderError, RenderResult};

/// Converts an `image` color into a skia color.
pub fn skia_color(color: Rgba<u8>) -> Color {
    let [r, g, b, a] = color.0;
    Color::from_rgba8(r, g, b, a)
}

/// A pixel-addressable surface with a canvas-style path API.
pub struct Canvas {
    pixmap: Pixmap,
    path: PathBuilder,
    shader: Shader<'static>,
    transform: Transform,
    saved: Vec<Transform>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Allocates a transparent surface.
    ///
    /// # Errors
    ///
    /// [`RenderError::SurfaceUnavailable`] when either dimension is zero or the
    /// surface is too large to allocate.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceUnavailable { width, height })?;
        Ok(Self::from_pixmap(pixmap))
    }

    /// Wraps an existing surface, e.g. one handed over from another thread.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap,
            path: PathBuilder::new(),
            shader: Shader::SolidColor(Color::BLACK),
            transform: Transform::identity(),
            saved: Vec::new(),
        }
    }

    /// Releases the underlying surface.
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Reallocates the surface at a new size. Content is discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.width() == width && self.height() == height {
            return Ok(());
        }
        self.pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceUnavailable { width, height })?;
        Ok(())
    }

    /// Clears every pixel to transparent and resets path and transform state.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
        self.path = PathBuilder::new();
        self.transform = Transform::identity();
        self.saved.clear();
    }

    pub fn set_fill_color(&mut self, color: Rgba<u8>) {
        self.shader = Shader::SolidColor(skia_color(color));
    }

    pub fn set_fill_shader(&mut self, shader: Shader<'static>) {
        self.shader = shader;
    }

    fn paint(&self) -> Paint<'static> {
        Paint {
            shader: self.shader.clone(),
            anti_alias: true,
            ..Paint::default()
        }
    }

    pub fn save(&mut self) {
        self.saved.push(self.transform);
    }

    pub fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.transform = self
            .transform
            .pre_concat(Transform::from_translate(tx as f32, ty as f32));
    }

    /// Rotates subsequent geometry by `radians` (clockwise on screen).
    pub fn rotate(&mut self, radians: f64) {
        self.transform = self
            .transform
            .pre_concat(Transform::from_rotate(radians.to_degrees() as f32));
    }

    /// Runs `draw` with the origin moved to (`cx`, `cy`) and rotated by `rotation`,
    /// then restores the previous transform.
    pub fn with_rotation(&mut self, cx: f64, cy: f64, rotation: f64, draw: impl FnOnce(&mut Self)) {
        self.save();
        self.translate(cx, cy);
        if rotation != 0.0 {
            self.rotate(rotation);
        }
        draw(self);
        self.restore();
    }

    /// Starts a new, empty path.
    pub fn begin_path(&mut self) {
        self.path = PathBuilder::new();
    }

    /// Appends `path`, mapped through the current transform, to the open path.
    pub fn append(&mut self, path: Path) {
        let Some(path) = path.transform(self.transform) else {
            return;
        };
        for segment in path.segments() {
            match segment {
                PathSegment::MoveTo(p) => self.path.move_to(p.x, p.y),
                PathSegment::LineTo(p) => self.path.line_to(p.x, p.y),
                PathSegment::QuadTo(p1, p) => self.path.quad_to(p1.x, p1.y, p.x, p.y),
                PathSegment::CubicTo(p1, p2, p) => {
                    self.path.cubic_to(p1.x, p1.y, p2.x, p2.y, p.x, p.y)
                }
                PathSegment::Close => self.path.close(),
            }
        }
    }

    /// Appends a figure built in local coordinates.
    pub fn append_figure(&mut self, build: impl FnOnce(&mut FigureBuilder)) {
        let mut figure = FigureBuilder::new();
        build(&mut figure);
        if let Some(path) = figure.finish() {
            self.append(path);
        }
    }

    /// Fills the open path with the even-odd rule and starts a new one.
    pub fn fill_even_odd(&mut self) {
        let builder = std::mem::replace(&mut self.path, PathBuilder::new());
        if let Some(path) = builder.finish() {
            let paint = self.paint();
            self.pixmap
                .fill_path(&path, &paint, FillRule::EvenOdd, Transform::identity(), None);
        }
    }

    /// Fills a rectangle whose corners are rounded with quadratic curves.
    pub fn fill_round_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let r = radius.clamp(0.0, width.min(height) / 2.0);
        self.begin_path();
        self.append_figure(|f| {
            f.move_to(x + r, y);
            f.line_to(x + width - r, y);
            f.quad_to(x + width, y, x + width, y + r);
            f.line_to(x + width, y + height - r);
            f.quad_to(x + width, y + height, x + width - r, y + height);
            f.line_to(x + r, y + height);
            f.quad_to(x, y + height, x, y + height - r);
            f.line_to(x, y + r);
            f.quad_to(x, y, x + r, y);
            f.close();
        });
        self.fill_even_odd();
    }

    /// Draws `bitmap` scaled into the given rectangle. Empty targets are skipped.
    pub fn draw_bitmap(&mut self, bitmap: &RgbaImage, x: f64, y: f64, width: f64, height: f64) {
        let (bw, bh) = bitmap.dimensions();
        if width <= 0.0 || height <= 0.0 || bw == 0 || bh == 0 {
            return;
        }
        let Some(source) = bitmap_to_pixmap(bitmap) else {
            return;
        };
        let transform = Transform::from_row(
            (width / f64::from(bw)) as f32,
            0.0,
            0.0,
            (height / f64::from(bh)) as f32,
            x as f32,
            y as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    /// Straight-alpha color of one pixel, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba([c.red(), c.green(), c.blue(), c.alpha()]))
    }
}

/// Premultiplies an RGBA image into a pixmap.
pub fn bitmap_to_pixmap(bitmap: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(bitmap.width(), bitmap.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(bitmap.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Un-premultiplies a pixmap into an RGBA image.
pub fn pixmap_to_bitmap(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image
}

/// Builds one closed figure in local coordinates, with canvas-style arcs.
pub struct FigureBuilder {
    pb: PathBuilder,
    open: bool,
}

impl Default for FigureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FigureBuilder {
    pub fn new() -> Self {
        Self {
            pb: PathBuilder::new(),
            open: false,
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.pb.move_to(x as f32, y as f32);
        self.open = true;
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.open {
            self.pb.line_to(x as f32, y as f32);
        } else {
            self.move_to(x, y);
        }
    }

    pub fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) {
        self.pb.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
    }

    pub fn close(&mut self) {
        if self.open {
            self.pb.close();
            self.open = false;
        }
    }

    /// Axis-aligned rectangle as its own subpath.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close();
    }

    /// Full circle as its own subpath.
    pub fn circle(&mut self, cx: f64, cy: f64, r: f64) {
        self.close();
        self.arc(cx, cy, r, 0.0, 2.0 * PI);
        self.close();
    }

    /// Arc from `start` to `end` radians with increasing angle, joined to the
    /// current point by a line the way a 2D context does.
    pub fn arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64) {
        // Like a 2D context, a negative sweep wraps around clockwise.
        let mut sweep = end - start;
        if sweep < 0.0 {
            sweep = sweep.rem_euclid(2.0 * PI);
        }
        let (sx, sy) = (cx + r * start.cos(), cy + r * start.sin());
        self.line_to(sx, sy);
        if sweep <= 0.0 || r <= 0.0 {
            return;
        }
        let segments = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / segments as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let mut a0 = start;
        for _ in 0..segments {
            let a1 = a0 + step;
            let (c0, s0) = (a0.cos(), a0.sin());
            let (c1, s1) = (a1.cos(), a1.sin());
            let p0 = (cx + r * c0, cy + r * s0);
            let p3 = (cx + r * c1, cy + r * s1);
            let p1 = (p0.0 - k * r * s0, p0.1 + k * r * c0);
            let p2 = (p3.0 + k * r * s1, p3.1 - k * r * c1);
            self.pb.cubic_to(
                p1.0 as f32,
                p1.1 as f32,
                p2.0 as f32,
                p2.1 as f32,
                p3.0 as f32,
                p3.1 as f32,
            );
            a0 = a1;
        }
    }

    pub fn finish(mut self) -> Option<Path> {
        self.close();
        self.pb.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_zero_sized_surface_is_unavailable() {
        assert!(matches!(
            Canvas::new(0, 10),
            Err(RenderError::SurfaceUnavailable { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_fill_round_rect_square_corners() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.set_fill_color(RED);
        canvas.fill_round_rect(2.0, 2.0, 6.0, 6.0, 0.0);
        assert_eq!(canvas.pixel(2, 2), Some(RED));
        assert_eq!(canvas.pixel(7, 7), Some(RED));
        assert_eq!(canvas.pixel(1, 1).map(|p| p.0[3]), Some(0));
        assert_eq!(canvas.pixel(8, 8).map(|p| p.0[3]), Some(0));
    }

    #[test]
    fn test_fill_round_rect_rounds_corners() {
        let mut canvas = Canvas::new(40, 40).unwrap();
        canvas.set_fill_color(RED);
        canvas.fill_round_rect(0.0, 0.0, 40.0, 40.0, 20.0);
        assert_eq!(canvas.pixel(0, 0).map(|p| p.0[3]), Some(0));
        assert_eq!(canvas.pixel(20, 20), Some(RED));
    }

    #[test]
    fn test_even_odd_leaves_hole() {
        let mut canvas = Canvas::new(30, 30).unwrap();
        canvas.set_fill_color(RED);
        canvas.begin_path();
        canvas.append_figure(|f| {
            f.rect(0.0, 0.0, 30.0, 30.0);
            f.rect(10.0, 10.0, 10.0, 10.0);
        });
        canvas.fill_even_odd();
        assert_eq!(canvas.pixel(5, 5), Some(RED));
        assert_eq!(canvas.pixel(15, 15).map(|p| p.0[3]), Some(0));
    }

    #[test]
    fn test_with_rotation_restores_transform() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.set_fill_color(RED);
        canvas.begin_path();
        // A 10x4 bar rotated a quarter turn about (10, 10) becomes a 4x10 bar.
        canvas.with_rotation(10.0, 10.0, FRAC_PI_2, |c| {
            c.append_figure(|f| f.rect(-5.0, -2.0, 10.0, 4.0));
        });
        canvas.append_figure(|f| f.rect(0.0, 0.0, 2.0, 2.0));
        canvas.fill_even_odd();
        assert_eq!(canvas.pixel(10, 6), Some(RED));
        assert_eq!(canvas.pixel(6, 10).map(|p| p.0[3]), Some(0));
        assert_eq!(canvas.pixel(1, 1), Some(RED));
    }

    #[test]
    fn test_circle_bounds() {
        let mut figure = FigureBuilder::new();
        figure.circle(10.0, 10.0, 5.0);
        let bounds = figure.finish().unwrap().bounds();
        assert!((bounds.left() - 5.0).abs() < 0.01);
        assert!((bounds.right() - 15.0).abs() < 0.01);
    }

    #[test]
    fn test_draw_bitmap_scales() {
        let bitmap = RgbaImage::from_pixel(2, 2, RED);
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.draw_bitmap(&bitmap, 5.0, 5.0, 10.0, 10.0);
        let center = canvas.pixel(10, 10).unwrap();
        assert!(center.0[0] > 250 && center.0[3] > 250);
        assert_eq!(canvas.pixel(2, 2).map(|p| p.0[3]), Some(0));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        canvas.set_fill_color(RED);
        canvas.fill_round_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        canvas.resize(8, 6).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (8, 6));
        canvas.fill_round_rect(0.0, 0.0, 8.0, 6.0, 0.0);
        canvas.clear();
        assert_eq!(canvas.pixel(3, 3).map(|p| p.0[3]), Some(0));
    }
}
