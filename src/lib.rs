//! # qirust-styling
//!
//! A Rust library for rendering styled QR codes.
//!
//! `qirust-styling` takes the module matrix of an encoded QR symbol and paints it onto a
//! raster surface with shaped modules, custom finder patterns, solid or gradient fills,
//! frame padding and an embedded logo. Encoding is delegated to the `qrcode` crate; any
//! other encoder can be plugged in through the [`QrMatrix`] trait.
//!
//! ## Features
//!
//! - Thirteen module shapes, from neighbor-aware rounded blobs to fixed stars and hearts.
//! - Finder patterns drawn as circles, squares, rounded squares or diamonds, or with the module shape.
//! - Linear and radial gradients for modules, finder patterns, background and frame.
//! - Logo sizing that stays within the error-correction budget of the symbol.
//! - PNG and SVG logos and frame images.
//! - Render passes on a dedicated worker thread.
//! - Export to PNG, JPEG and WEBP.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qirust-styling = "0.2" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Render a QR code with rounded modules and a dotted finder pattern:
//!
//! ```rust
//! use qirust_styling::config::{CornerDotType, CornerSquareType, DotType, Fill, StyleConfiguration};
//! use qirust_styling::helper::generate_styled_image;
//! use image::Rgba;
//!
//! let mut style = StyleConfiguration::default();
//! style.dots.kind = DotType::Rounded;
//! style.dots.fill = Fill::Solid(Rgba([34, 85, 170, 255]));
//! style.corners_square.kind = Some(CornerSquareType::ExtraRounded);
//! style.corners_dot.kind = Some(CornerDotType::Dot);
//!
//! let img = generate_styled_image("https://example.com", &style).unwrap();
//! assert_eq!(img.dimensions(), (300, 300));
//! ```
//!
//! Render into your own surface and inspect the layout:
//!
//! ```rust
//! use qirust_styling::{encode, Canvas, DecoderLoader, QrRenderer, StyleConfiguration};
//!
//! let style = StyleConfiguration::default();
//! let code = encode("Hello, World!", &style.qr).unwrap();
//! let mut canvas = Canvas::new(1, 1).unwrap();
//! let report = QrRenderer::new(DecoderLoader::new())
//!     .render_blocking(&code, &style, &mut canvas, None)
//!     .unwrap();
//! println!("{} px per module", report.layout.dot_size);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Style options and their defaults.
//! - [`matrix`]: The QR matrix trait and encoder glue.
//! - [`render`]: The render pass orchestrator.
//! - [`dot`], [`corner`], [`gradient`], [`paths`]: Drawing primitives used by a pass.
//! - [`logo`]: Logo sizing against the error-correction budget.
//! - [`assets`]: Image and SVG loading.
//! - [`worker`]: Off-thread render passes.
//! - [`helper`]: Export and one-call convenience functions.

#![forbid(unsafe_code)]

pub mod assets;
pub mod canvas;
pub mod config;
pub mod corner;
pub mod dot;
pub mod error;
pub mod gradient;
pub mod helper;
pub mod logging;
pub mod logo;
pub mod matrix;
pub mod paths;
pub mod render;
pub mod worker;

pub use assets::{AssetLoader, AssetSource, Bitmap, DecoderLoader, FetchLoader};
pub use canvas::Canvas;
pub use config::StyleConfiguration;
pub use error::{RenderError, RenderResult};
pub use matrix::{encode, ModuleGrid, QrMatrix};
pub use render::{Layout, QrRenderer, RenderReport};
pub use worker::{PendingRender, RenderPassId, WorkerBridge, WorkerRequest, WorkerResponse};
