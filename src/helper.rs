use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tiny_skia::Pixmap;

use crate::assets::DecoderLoader;
use crate::canvas::{pixmap_to_bitmap, Canvas};
use crate::config::StyleConfiguration;
use crate::error::RenderResult;
use crate::matrix::encode;
use crate::render::QrRenderer;

/*---- Export ----*/

/// Output formats a rendered surface can be exported as.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Extension {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Png => "png",
            Extension::Jpeg => "jpeg",
            Extension::Webp => "webp",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            Extension::Png => ImageFormat::Png,
            Extension::Jpeg => ImageFormat::Jpeg,
            Extension::Webp => ImageFormat::WebP,
        }
    }
}

/// Copies a rendered surface into a straight-alpha RGBA image.
pub fn surface_to_image(surface: &Pixmap) -> RgbaImage {
    pixmap_to_bitmap(surface)
}

/// Encodes a rendered surface into the bytes of an image file.
///
/// JPEG has no alpha channel, so the alpha is dropped before encoding.
///
/// # Errors
///
/// Returns [`RenderError::Export`](crate::error::RenderError::Export) if the encoder fails.
pub fn encode_surface(surface: &Pixmap, extension: Extension) -> RenderResult<Vec<u8>> {
    let image = DynamicImage::ImageRgba8(surface_to_image(surface));
    let image = match extension {
        Extension::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, extension.format())?;
    Ok(out.into_inner())
}

/// Saves a rendered surface to a file.
///
/// # Arguments
///
/// * `surface` - The rendered surface to save.
/// * `directory_path` - Optional. The directory path where the image will be saved. If not provided, the default directory is "generated".
/// * `filename` - Optional. The name of the image file without extension. If not provided, a timestamp-based filename will be used.
/// * `extension` - The output format, which also sets the file extension.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the image cannot be encoded or written.
///
/// # Example
///
/// ```rust
/// use qirust_styling::helper::{save_surface, Extension};
/// use tiny_skia::Pixmap;
///
/// let surface = Pixmap::new(8, 8).unwrap();
/// let path = save_surface(&surface, Some("generated"), Some("blank"), Extension::Png).unwrap();
/// assert!(path.ends_with("blank.png"));
/// ```
pub fn save_surface(
    surface: &Pixmap,
    directory_path: Option<&str>,
    filename: Option<&str>,
    extension: Extension,
) -> RenderResult<PathBuf> {
    let directory_path = directory_path.unwrap_or("generated");
    let filename = match filename {
        Some(name) => name.to_string(),
        None => {
            let since_the_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            since_the_epoch.as_millis().to_string()
        }
    };

    // Check if the directory exists, create it if it doesn't
    if !Path::new(directory_path).exists() {
        fs::create_dir_all(directory_path)?;
    }

    let file_path = Path::new(directory_path).join(format!("{}.{}", filename, extension.as_str()));
    fs::write(&file_path, encode_surface(surface, extension)?)?;
    Ok(file_path)
}

/// Generates a styled QR Code image from the provided content.
///
/// # Arguments
///
/// * `content` - The content to encode into the QR Code.
/// * `style` - The style to render with. Its `qr` options drive the encoder.
///
/// # Returns
///
/// The rendered image, sized to the style's surface.
///
/// # Example
///
/// ```
/// use qirust_styling::config::{DotType, StyleConfiguration};
/// use qirust_styling::helper::generate_styled_image;
///
/// let mut style = StyleConfiguration::default();
/// style.dots.kind = DotType::Classy;
/// let img = generate_styled_image("Hello, World!", &style).unwrap();
/// assert_eq!(img.dimensions(), (300, 300));
/// ```
pub fn generate_styled_image(content: &str, style: &StyleConfiguration) -> RenderResult<RgbaImage> {
    let code = encode(content, &style.qr)?;
    let renderer = QrRenderer::new(DecoderLoader::new());
    let mut canvas = Canvas::new(1, 1)?;
    renderer.render_blocking(&code, style, &mut canvas, None)?;
    Ok(surface_to_image(canvas.pixmap()))
}

/// Generates a styled QR Code from the provided content and saves it to a file.
///
/// # Arguments
///
/// * `content` - The content to encode into the QR Code.
/// * `style` - The style to render with.
/// * `directory` - Optional. The directory path where the image will be saved. If not provided, the default directory is "generated".
/// * `filename` - Optional. The name of the image file without extension. If not provided, a timestamp-based filename will be used.
/// * `extension` - The output format.
///
/// # Example
///
/// ```
/// use qirust_styling::config::StyleConfiguration;
/// use qirust_styling::helper::{generate_image, Extension};
///
/// generate_image("Hello, World!", &StyleConfiguration::default(), Some("generated"), Some("hello"), Extension::Webp).unwrap();
/// ```
pub fn generate_image(
    content: &str,
    style: &StyleConfiguration,
    directory: Option<&str>,
    filename: Option<&str>,
    extension: Extension,
) -> RenderResult<PathBuf> {
    let code = encode(content, &style.qr)?;
    let renderer = QrRenderer::new(DecoderLoader::new());
    let mut canvas = Canvas::new(1, 1)?;
    renderer.render_blocking(&code, style, &mut canvas, None)?;
    save_surface(canvas.pixmap(), directory, filename, extension)
}
