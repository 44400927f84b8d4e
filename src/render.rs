//! One render pass: backgrounds, frame, modules, finder patterns and logo.

use tracing::{debug, warn};

use crate::assets::{AssetLoader, AssetSource, Bitmap};
use crate::canvas::Canvas;
use crate::config::StyleConfiguration;
use crate::corner::{draw_finder_patterns, is_finder_module, FinderStyle};
use crate::dot::DotRenderer;
use crate::error::{RenderError, RenderResult};
use crate::gradient::{apply_fill, GradientBox};
use crate::logo::{calculate_image_size, HiddenRegion, LogoSize, LogoSizeRequest};
use crate::matrix::QrMatrix;

/// Pixel geometry of the symbol on the surface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Layout {
    pub module_count: usize,
    pub surface_width: u32,
    pub surface_height: u32,
    /// Side of the square the symbol may occupy.
    pub min_size: f64,
    pub dot_size: f64,
    /// Top-left pixel of module (0, 0).
    pub x: f64,
    pub y: f64,
}

impl Layout {
    /// Fits `module_count` modules into the surface described by `style`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Configuration`] when the surface cannot give every module
    /// at least one pixel.
    pub fn compute(style: &StyleConfiguration, module_count: usize) -> RenderResult<Self> {
        let (width, height) = style.surface_size();
        let frame = &style.frame;
        let count = module_count as i64;
        let (w, h) = (i64::from(width), i64::from(height));
        let x_padding = i64::from(frame.x_padding());
        let top = i64::from(frame.top_size);
        let bottom = i64::from(frame.bottom_size);

        let min_size = w.min(h) - 2 * i64::from(style.margin) - x_padding;
        if count == 0 || count > w || count > h || min_size < count {
            return Err(RenderError::Configuration {
                module_count,
                width,
                height,
            });
        }

        let dot_size = min_size / count;
        let x = (w - x_padding - count * dot_size).div_euclid(2) + i64::from(frame.left_inset());
        let y = (h - top - bottom - count * dot_size).div_euclid(2) + top;

        Ok(Self {
            module_count,
            surface_width: width,
            surface_height: height,
            min_size: min_size as f64,
            dot_size: dot_size as f64,
            x: x as f64,
            y: y as f64,
        })
    }

    /// Side of the drawn symbol in pixels.
    pub fn symbol_size(&self) -> f64 {
        self.module_count as f64 * self.dot_size
    }
}

/// Decides which dark modules the generic module pass draws.
#[derive(Clone, Copy, Debug)]
pub struct ModuleFilter {
    module_count: usize,
    hidden: HiddenRegion,
}

impl ModuleFilter {
    pub fn new(module_count: usize, hidden: HiddenRegion) -> Self {
        Self {
            module_count,
            hidden,
        }
    }

    /// False for modules under the logo and for finder pattern cells.
    pub fn should_draw(&self, i: usize, j: usize) -> bool {
        !self.hidden.contains(i, j) && !is_finder_module(i, j, self.module_count)
    }
}

/// What a finished pass drew.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RenderReport {
    pub layout: Layout,
    pub hidden: HiddenRegion,
    pub logo_size: Option<LogoSize>,
    /// Dark modules drawn by the generic module pass.
    pub modules_drawn: usize,
}

/// Renders styled symbols into a [`Canvas`] using an injected asset loader.
pub struct QrRenderer<L> {
    loader: L,
}

impl<L: AssetLoader> QrRenderer<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Runs one full pass over `canvas`.
    ///
    /// The canvas is resized to the style's surface size and cleared. Layers are
    /// drawn bottom-up; assets are loaded right before the layer that needs them,
    /// so a failed load returns an error with the earlier layers already drawn.
    /// A `preloaded_frame` replaces loading `style.frame.image`.
    ///
    /// # Errors
    ///
    /// * [`RenderError::Configuration`] before anything is drawn.
    /// * [`RenderError::SurfaceUnavailable`] when the surface cannot be allocated.
    /// * [`RenderError::AssetLoad`] when the frame image or logo fails to load.
    ///
    /// # Example
    ///
    /// ```
    /// use qirust_styling::{encode, Canvas, DecoderLoader, QrRenderer, StyleConfiguration};
    ///
    /// let style = StyleConfiguration::default();
    /// let code = encode("Hello, World!", &style.qr).unwrap();
    /// let renderer = QrRenderer::new(DecoderLoader::new());
    /// let mut canvas = Canvas::new(1, 1).unwrap();
    /// let report = renderer.render_blocking(&code, &style, &mut canvas, None).unwrap();
    /// assert_eq!((canvas.width(), canvas.height()), (300, 300));
    /// assert!(report.modules_drawn > 0);
    /// ```
    pub async fn render(
        &self,
        matrix: &dyn QrMatrix,
        style: &StyleConfiguration,
        canvas: &mut Canvas,
        preloaded_frame: Option<Bitmap>,
    ) -> RenderResult<RenderReport> {
        let layout = Layout::compute(style, matrix.module_count())?;
        debug!(
            module_count = layout.module_count,
            dot_size = layout.dot_size,
            x = layout.x,
            y = layout.y,
            "render pass started"
        );

        canvas.resize(layout.surface_width, layout.surface_height)?;
        canvas.clear();

        self.draw_frame_background(canvas, style, &layout);

        let frame_image = match (preloaded_frame, &style.frame.image) {
            (Some(bitmap), _) => Some(bitmap),
            (None, Some(source)) => {
                let hint = (layout.surface_width, layout.surface_height);
                Some(self.load(source, hint).await?)
            }
            (None, None) => None,
        };
        if let Some(frame) = &frame_image {
            let (w, h) = (f64::from(layout.surface_width), f64::from(layout.surface_height));
            canvas.draw_bitmap(frame, 0.0, 0.0, w, h);
        }

        self.draw_background(canvas, style, &layout);

        let logo = match &style.logo {
            Some(options) => {
                let side = layout.symbol_size() as u32;
                let bitmap = self.load(&options.source, (side, side)).await?;
                let request = LogoSizeRequest::new(
                    f64::from(bitmap.width()),
                    f64::from(bitmap.height()),
                    layout.dot_size,
                    layout.module_count,
                    style.qr.error_correction_level,
                    options.image_size,
                );
                let size = calculate_image_size(request);
                debug!(?size, "logo sized");
                Some((bitmap, size, options))
            }
            None => None,
        };

        let hidden = match &logo {
            Some((_, size, options)) if options.hide_background_dots => {
                HiddenRegion::new(layout.module_count, size)
            }
            _ => HiddenRegion::default(),
        };
        let filter = ModuleFilter::new(layout.module_count, hidden);
        let modules_drawn = draw_modules(canvas, matrix, style, &layout, &filter);

        let finder_style = FinderStyle {
            square_kind: style.corners_square.kind,
            square_fill: style.corners_square.fill.as_ref().unwrap_or(&style.dots.fill),
            dot_kind: style.corners_dot.kind,
            dot_fill: style.corners_dot.fill.as_ref().unwrap_or(&style.dots.fill),
            module_kind: style.dots.kind,
        };
        draw_finder_patterns(
            canvas,
            &finder_style,
            (layout.x, layout.y),
            layout.dot_size,
            layout.module_count,
        );

        if let Some((bitmap, size, options)) = &logo {
            let margin = f64::from(options.margin);
            let symbol = layout.symbol_size();
            let dx = layout.x + margin + (symbol - size.width) / 2.0;
            let dy = layout.y + margin + (symbol - size.height) / 2.0;
            let dw = (size.width - 2.0 * margin).max(0.0);
            let dh = (size.height - 2.0 * margin).max(0.0);
            canvas.draw_bitmap(bitmap, dx, dy, dw, dh);
        }

        debug!(modules_drawn, "render pass finished");
        Ok(RenderReport {
            layout,
            hidden,
            logo_size: logo.map(|(_, size, _)| size),
            modules_drawn,
        })
    }

    /// [`render`](Self::render) driven to completion on the current thread.
    ///
    /// Only suitable for loaders that do not need an async runtime, such as
    /// [`DecoderLoader`](crate::assets::DecoderLoader).
    pub fn render_blocking(
        &self,
        matrix: &dyn QrMatrix,
        style: &StyleConfiguration,
        canvas: &mut Canvas,
        preloaded_frame: Option<Bitmap>,
    ) -> RenderResult<RenderReport> {
        pollster::block_on(self.render(matrix, style, canvas, preloaded_frame))
    }

    async fn load(&self, source: &AssetSource, size_hint: (u32, u32)) -> RenderResult<Bitmap> {
        self.loader
            .load_bitmap(source, size_hint)
            .await
            .inspect_err(|err| warn!(%err, "asset load failed, aborting pass"))
    }

    fn draw_frame_background(&self, canvas: &mut Canvas, style: &StyleConfiguration, layout: &Layout) {
        let Some(fill) = &style.frame.background else {
            return;
        };
        let (w, h) = (f64::from(layout.surface_width), f64::from(layout.surface_height));
        apply_fill(canvas, fill, 0.0, GradientBox::new(0.0, 0.0, w, h));
        canvas.fill_round_rect(0.0, 0.0, w, h, f64::from(style.border_radius));
    }

    fn draw_background(&self, canvas: &mut Canvas, style: &StyleConfiguration, layout: &Layout) {
        let Some(fill) = &style.background.fill else {
            return;
        };
        let frame = &style.frame;
        apply_fill(
            canvas,
            fill,
            0.0,
            GradientBox::square(layout.x, layout.y, layout.min_size),
        );
        canvas.fill_round_rect(
            f64::from(frame.left_inset()),
            f64::from(frame.top_size),
            f64::from(layout.surface_width) - f64::from(frame.x_padding()),
            f64::from(layout.surface_height) - f64::from(frame.y_padding()),
            f64::from(style.border_radius),
        );
    }
}

/// Draws every dark module the filter lets through as one filled path.
fn draw_modules(
    canvas: &mut Canvas,
    matrix: &dyn QrMatrix,
    style: &StyleConfiguration,
    layout: &Layout,
    filter: &ModuleFilter,
) -> usize {
    let count = layout.module_count;
    let dot_size = layout.dot_size;
    let visible = |i: i64, j: i64| {
        if i < 0 || j < 0 || i >= count as i64 || j >= count as i64 {
            return false;
        }
        let (i, j) = (i as usize, j as usize);
        filter.should_draw(i, j) && matrix.is_dark(i, j)
    };

    apply_fill(
        canvas,
        &style.dots.fill,
        0.0,
        GradientBox::square(layout.x, layout.y, layout.symbol_size()),
    );
    canvas.begin_path();

    let dot = DotRenderer::new(style.dots.kind);
    let mut drawn = 0;
    for i in 0..count {
        for j in 0..count {
            if !visible(i as i64, j as i64) {
                continue;
            }
            let neighbor = |dx: i32, dy: i32| visible(i as i64 + i64::from(dx), j as i64 + i64::from(dy));
            dot.draw(
                canvas,
                layout.x + i as f64 * dot_size,
                layout.y + j as f64 * dot_size,
                dot_size,
                &neighbor,
            );
            drawn += 1;
        }
    }

    canvas.fill_even_odd();
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DecoderLoader;
    use crate::config::{BackgroundOptions, Fill, FrameOptions, LogoOptions};
    use crate::logo::LogoSize;
    use crate::matrix::ModuleGrid;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn dark_grid(count: usize) -> ModuleGrid {
        ModuleGrid::new(count, vec![true; count * count]).unwrap()
    }

    #[test]
    fn test_layout_default_surface() {
        let layout = Layout::compute(&StyleConfiguration::default(), 21).unwrap();
        assert_eq!(layout.dot_size, 14.0);
        assert_eq!((layout.x, layout.y), (3.0, 3.0));
        assert_eq!(layout.min_size, 300.0);
        assert_eq!(layout.symbol_size(), 294.0);
    }

    #[test]
    fn test_layout_with_frame_padding() {
        let style = StyleConfiguration {
            frame: FrameOptions {
                x_size: 10,
                top_size: 20,
                ..FrameOptions::default()
            },
            ..StyleConfiguration::default()
        };
        let layout = Layout::compute(&style, 21).unwrap();
        assert_eq!((layout.surface_width, layout.surface_height), (320, 320));
        assert_eq!(layout.min_size, 300.0);
        assert_eq!(layout.dot_size, 14.0);
        assert_eq!((layout.x, layout.y), (13.0, 23.0));
    }

    #[test]
    fn test_layout_rejects_tiny_surface() {
        let style = StyleConfiguration {
            width: 20,
            height: 20,
            ..StyleConfiguration::default()
        };
        let err = Layout::compute(&style, 25).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Configuration {
                module_count: 25,
                width: 20,
                height: 20
            }
        ));
    }

    #[test]
    fn test_filter_excludes_exactly_the_finders() {
        let filter = ModuleFilter::new(25, HiddenRegion::default());
        let excluded = (0..25)
            .flat_map(|i| (0..25).map(move |j| (i, j)))
            .filter(|&(i, j)| !filter.should_draw(i, j))
            .count();
        assert_eq!(excluded, 3 * 33);
        assert!(!filter.should_draw(0, 0));
        assert!(!filter.should_draw(24, 0));
        assert!(!filter.should_draw(0, 24));
        // Separators are not part of the masks.
        assert!(filter.should_draw(7, 7));
        assert!(filter.should_draw(24, 24));
    }

    #[test]
    fn test_filter_excludes_hidden_region() {
        let hidden = HiddenRegion::new(
            25,
            &LogoSize {
                width: 0.0,
                height: 0.0,
                hide_x_dots: 3,
                hide_y_dots: 3,
            },
        );
        let filter = ModuleFilter::new(25, hidden);
        assert!(!filter.should_draw(12, 12));
        assert!(!filter.should_draw(11, 13));
        assert!(filter.should_draw(10, 12));
    }

    #[test]
    fn test_configuration_error_draws_nothing() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.set_fill_color(BLUE);
        canvas.fill_round_rect(0.0, 0.0, 20.0, 20.0, 0.0);
        let style = StyleConfiguration {
            width: 20,
            height: 20,
            ..StyleConfiguration::default()
        };

        let renderer = QrRenderer::new(DecoderLoader::new());
        let result = renderer.render_blocking(&dark_grid(25), &style, &mut canvas, None);
        assert!(matches!(result, Err(RenderError::Configuration { .. })));
        assert_eq!((canvas.width(), canvas.height()), (20, 20));
        assert_eq!(canvas.pixel(10, 10), Some(BLUE));
    }

    #[test]
    fn test_logo_failure_keeps_background() {
        let style = StyleConfiguration {
            background: BackgroundOptions {
                fill: Some(Fill::Solid(RED)),
            },
            logo: Some(LogoOptions::new(AssetSource::memory("logo.png", vec![0u8; 8]))),
            ..StyleConfiguration::default()
        };
        let mut canvas = Canvas::new(1, 1).unwrap();
        let renderer = QrRenderer::new(DecoderLoader::new());
        let result = renderer.render_blocking(&dark_grid(21), &style, &mut canvas, None);

        assert!(matches!(result, Err(RenderError::AssetLoad { .. })));
        assert_eq!((canvas.width(), canvas.height()), (300, 300));
        // Modules come after the logo load, so the body stays red.
        assert_eq!(canvas.pixel(150, 150), Some(RED));
    }

    #[test]
    fn test_preloaded_frame_is_drawn_under_background() {
        let style = StyleConfiguration {
            frame: FrameOptions {
                top_size: 20,
                ..FrameOptions::default()
            },
            ..StyleConfiguration::default()
        };
        let frame: Bitmap = Arc::new(RgbaImage::from_pixel(4, 4, BLUE));
        let mut canvas = Canvas::new(1, 1).unwrap();
        let renderer = QrRenderer::new(DecoderLoader::new());
        renderer
            .render_blocking(&ModuleGrid::new(21, vec![false; 441]).unwrap(), &style, &mut canvas, Some(frame))
            .unwrap();

        assert_eq!((canvas.width(), canvas.height()), (300, 320));
        assert!(canvas.pixel(150, 5).unwrap().0[2] > 250);
        // Only finder patterns are drawn on a blank grid.
        assert_eq!(canvas.pixel(150, 170), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_all_dark_grid_counts_generic_modules() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        let renderer = QrRenderer::new(DecoderLoader::new());
        let report = renderer
            .render_blocking(&dark_grid(21), &StyleConfiguration::default(), &mut canvas, None)
            .unwrap();
        assert_eq!(report.modules_drawn, 21 * 21 - 3 * 33);
        assert!(report.logo_size.is_none());
        assert_eq!(canvas.pixel(150, 150), Some(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_logo_hides_center_modules() {
        let logo = RgbaImage::from_pixel(10, 10, BLUE);
        let mut bytes = std::io::Cursor::new(Vec::new());
        logo.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let style = StyleConfiguration {
            logo: Some(LogoOptions::new(AssetSource::memory("logo.png", bytes.into_inner()))),
            ..StyleConfiguration::default()
        };

        let mut canvas = Canvas::new(1, 1).unwrap();
        let renderer = QrRenderer::new(DecoderLoader::new());
        let report = renderer
            .render_blocking(&dark_grid(21), &style, &mut canvas, None)
            .unwrap();

        let hidden = report.hidden;
        assert!(hidden.hide_x_dots > 0 && hidden.hide_y_dots > 0);
        let hidden_cells = (hidden.hide_x_dots * hidden.hide_y_dots) as usize;
        assert_eq!(report.modules_drawn, 21 * 21 - 3 * 33 - hidden_cells);
        assert!(canvas.pixel(150, 150).unwrap().0[2] > 250);
    }

    #[test]
    fn test_repeated_passes_are_identical() {
        let style = StyleConfiguration {
            dots: crate::config::DotsOptions {
                kind: crate::config::DotType::Rounded,
                fill: Fill::Solid(RED),
            },
            ..StyleConfiguration::default()
        };
        let grid = ModuleGrid::from_rows(&[
            "#.#.#.#.#.#.#.#.#.#.#",
            ".#.#.#.#.#.#.#.#.#.#.",
            "##..##..##..##..##..#",
            "#####################",
            "..##..##..##..##..##.",
            "#.#.#.#.#.#.#.#.#.#.#",
            ".#.#.#.#.#.#.#.#.#.#.",
            "##..##..##..##..##..#",
            "#####################",
            "..##..##..##..##..##.",
            "#.#.#.#.#.#.#.#.#.#.#",
            ".#.#.#.#.#.#.#.#.#.#.",
            "##..##..##..##..##..#",
            "#####################",
            "..##..##..##..##..##.",
            "#.#.#.#.#.#.#.#.#.#.#",
            ".#.#.#.#.#.#.#.#.#.#.",
            "##..##..##..##..##..#",
            "#####################",
            "..##..##..##..##..##.",
            "#.#.#.#.#.#.#.#.#.#.#",
        ])
        .unwrap();
        let renderer = QrRenderer::new(DecoderLoader::new());

        let mut canvas = Canvas::new(1, 1).unwrap();
        renderer.render_blocking(&grid, &style, &mut canvas, None).unwrap();
        let first = canvas.pixmap().data().to_vec();
        renderer.render_blocking(&grid, &style, &mut canvas, None).unwrap();
        assert_eq!(first, canvas.pixmap().data());
    }
}
