//! Loading frame and logo images.
//!
//! Raster formats go through the `image` decoders. SVG sources are rasterized
//! with `resvg`; when the document has no intrinsic size it is rendered at the
//! caller's size hint instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use image::RgbaImage;
use resvg::usvg;
use tiny_skia::{Pixmap, Transform};
use tracing::{debug, trace};

use crate::canvas::pixmap_to_bitmap;
use crate::error::{RenderError, RenderResult};

/// Decoded, shareable RGBA image.
pub type Bitmap = Arc<RgbaImage>;

/// Where an image comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl AssetSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Name used in error messages and as the SVG cache key.
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Resolves an [`AssetSource`] into pixels.
///
/// `size_hint` is the pixel size used for vector sources without an intrinsic
/// size.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_bitmap(&self, source: &AssetSource, size_hint: (u32, u32)) -> RenderResult<Bitmap>;
}

/// Decodes in-memory sources and reads files synchronously.
#[derive(Default)]
pub struct DecoderLoader {
    // Only the most recent SVG is kept; frames are usually reused across renders.
    last_svg: Mutex<Option<(String, (u32, u32), Bitmap)>>,
}

impl DecoderLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, rasterizing them when they look like SVG.
    pub fn decode(&self, name: &str, bytes: &[u8], size_hint: (u32, u32)) -> RenderResult<Bitmap> {
        if !is_svg(name, bytes) {
            let image = image::load_from_memory(bytes)
                .map_err(|err| RenderError::asset(name, err.to_string()))?;
            trace!(name, width = image.width(), height = image.height(), "decoded raster asset");
            return Ok(Arc::new(image.to_rgba8()));
        }

        let mut cache = self.last_svg.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_name, cached_hint, bitmap)) = cache.as_ref() {
            if cached_name == name && *cached_hint == size_hint {
                trace!(name, "svg cache hit");
                return Ok(Arc::clone(bitmap));
            }
        }
        let bitmap = Arc::new(rasterize_svg(name, bytes, size_hint)?);
        *cache = Some((name.to_string(), size_hint, Arc::clone(&bitmap)));
        Ok(bitmap)
    }

    fn read_file(path: &Path) -> RenderResult<Vec<u8>> {
        std::fs::read(path).map_err(|err| RenderError::asset(path.display().to_string(), err.to_string()))
    }
}

#[async_trait]
impl AssetLoader for DecoderLoader {
    async fn load_bitmap(&self, source: &AssetSource, size_hint: (u32, u32)) -> RenderResult<Bitmap> {
        match source {
            AssetSource::File(path) => {
                let bytes = Self::read_file(path)?;
                self.decode(&source.name(), &bytes, size_hint)
            }
            AssetSource::Memory { name, bytes } => self.decode(name, bytes, size_hint),
        }
    }
}

/// Reads file sources through `tokio::fs` so a worker thread never blocks its
/// runtime on disk access.
#[derive(Default)]
pub struct FetchLoader {
    decoder: DecoderLoader,
}

impl FetchLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetLoader for FetchLoader {
    async fn load_bitmap(&self, source: &AssetSource, size_hint: (u32, u32)) -> RenderResult<Bitmap> {
        match source {
            AssetSource::File(path) => {
                let name = source.name();
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|err| RenderError::asset(name.as_str(), err.to_string()))?;
                debug!(name, len = bytes.len(), "fetched asset");
                self.decoder.decode(&name, &bytes, size_hint)
            }
            AssetSource::Memory { name, bytes } => self.decoder.decode(name, bytes, size_hint),
        }
    }
}

fn is_svg(name: &str, bytes: &[u8]) -> bool {
    if name.to_ascii_lowercase().ends_with(".svg") {
        return true;
    }
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || head.starts_with("<?xml")
}

/// Reads an attribute of the root `<svg>` start tag.
fn root_attribute<'a>(document: &'a str, attribute: &str) -> Option<&'a str> {
    let start = document.find("<svg")?;
    let tag = &document[start + 4..];
    let tag = &tag[..tag.find('>')?];
    let mut rest = tag;
    while let Some(pos) = rest.find(attribute) {
        let before = rest[..pos].chars().next_back();
        let after = rest[pos + attribute.len()..].trim_start();
        rest = &rest[pos + attribute.len()..];
        if !before.is_some_and(char::is_whitespace) {
            continue;
        }
        let Some(value) = after.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let value = &value[1..];
        return value.find(quote).map(|end| value[..end].trim());
    }
    None
}

/// True when the root element pins both dimensions to absolute lengths.
fn has_intrinsic_size(bytes: &[u8]) -> bool {
    let document = String::from_utf8_lossy(bytes);
    let absolute = |attribute| {
        root_attribute(&document, attribute).is_some_and(|value| !value.is_empty() && !value.ends_with('%'))
    };
    absolute("width") && absolute("height")
}

fn rasterize_svg(name: &str, bytes: &[u8], size_hint: (u32, u32)) -> RenderResult<RgbaImage> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|err| RenderError::asset(name, err.to_string()))?;

    let natural = tree.size();
    let (natural_w, natural_h) = (natural.width(), natural.height());
    let (width, height) = if has_intrinsic_size(bytes) || size_hint.0 == 0 || size_hint.1 == 0 {
        (natural_w.ceil() as u32, natural_h.ceil() as u32)
    } else {
        // Fit the viewBox aspect ratio inside the hint.
        let scale = (size_hint.0 as f32 / natural_w).min(size_hint.1 as f32 / natural_h);
        (
            ((natural_w * scale).round() as u32).max(1),
            ((natural_h * scale).round() as u32).max(1),
        )
    };

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::asset(name, format!("cannot rasterize svg at {width}x{height}")))?;
    let transform = Transform::from_scale(
        width as f32 / natural_w.max(f32::EPSILON),
        height as f32 / natural_h.max(f32::EPSILON),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    debug!(name, width, height, "rasterized svg asset");

    Ok(pixmap_to_bitmap(&pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    const RED_SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#ff0000"/></svg>"##;

    fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, color);
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_is_svg_detection() {
        assert!(is_svg("logo.SVG", b""));
        assert!(is_svg("blob", b"  <svg xmlns='x'/>"));
        assert!(is_svg("blob", b"<?xml version=\"1.0\"?><svg/>"));
        assert!(!is_svg("logo.png", &png_bytes(1, 1, Rgba([0, 0, 0, 255]))));
    }

    #[tokio::test]
    async fn test_decode_png_from_memory() {
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("logo.png", png_bytes(3, 2, Rgba([0, 128, 255, 255])));
        let bitmap = loader.load_bitmap(&source, (0, 0)).await.unwrap();
        assert_eq!(bitmap.dimensions(), (3, 2));
        assert_eq!(*bitmap.get_pixel(2, 1), Rgba([0, 128, 255, 255]));
    }

    #[tokio::test]
    async fn test_svg_uses_natural_size() {
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("frame.svg", RED_SQUARE_SVG.as_bytes().to_vec());
        let bitmap = loader.load_bitmap(&source, (300, 300)).await.unwrap();
        assert_eq!(bitmap.dimensions(), (20, 10));
        assert_eq!(*bitmap.get_pixel(10, 5), Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_sizeless_svg_fills_size_hint() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><rect width="10" height="10" fill="#ff0000"/></svg>"##;
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("logo.svg", svg.as_bytes().to_vec());
        let bitmap = loader.load_bitmap(&source, (294, 294)).await.unwrap();
        assert_eq!(bitmap.dimensions(), (294, 294));
    }

    #[tokio::test]
    async fn test_viewbox_svg_keeps_aspect_inside_hint() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20" width="100%"><rect width="40" height="20" fill="#ff0000"/></svg>"##;
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("frame.svg", svg.as_bytes().to_vec());
        let bitmap = loader.load_bitmap(&source, (200, 200)).await.unwrap();
        assert_eq!(bitmap.dimensions(), (200, 100));
        assert_eq!(*bitmap.get_pixel(100, 50), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_intrinsic_size_detection() {
        assert!(has_intrinsic_size(RED_SQUARE_SVG.as_bytes()));
        assert!(has_intrinsic_size(b"<?xml version='1.0'?><svg height='4' width='8'/>"));
        assert!(!has_intrinsic_size(b"<svg viewBox='0 0 4 4' stroke-width='2'/>"));
        assert!(!has_intrinsic_size(b"<svg width='100%' height='100%'/>"));
        assert!(!has_intrinsic_size(b"<svg><rect width='10' height='10'/></svg>"));
    }

    #[tokio::test]
    async fn test_svg_cache_returns_same_bitmap() {
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("frame.svg", RED_SQUARE_SVG.as_bytes().to_vec());
        let first = loader.load_bitmap(&source, (300, 300)).await.unwrap();
        let second = loader.load_bitmap(&source, (300, 300)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_garbage_is_asset_error() {
        let loader = DecoderLoader::new();
        let source = AssetSource::memory("broken.png", vec![1, 2, 3, 4]);
        let err = loader.load_bitmap(&source, (10, 10)).await.unwrap_err();
        assert!(matches!(err, RenderError::AssetLoad { ref source_name, .. } if source_name == "broken.png"));
    }

    #[tokio::test]
    async fn test_fetch_loader_reads_file() {
        let path = std::env::temp_dir().join(format!("qirust-styling-asset-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(4, 4, Rgba([10, 20, 30, 255]))).unwrap();

        let loader = FetchLoader::new();
        let bitmap = loader.load_bitmap(&AssetSource::file(&path), (0, 0)).await.unwrap();
        assert_eq!(bitmap.dimensions(), (4, 4));
        std::fs::remove_file(&path).unwrap();

        let missing = loader.load_bitmap(&AssetSource::file(&path), (0, 0)).await;
        assert!(matches!(missing, Err(RenderError::AssetLoad { .. })));
    }
}
