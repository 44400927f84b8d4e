//! Resolved style configuration for one render pass.
//!
//! Everything in here is plain data. Merging partial options, validating user
//! input and choosing defaults happens before a [`StyleConfiguration`] reaches the
//! renderer; the `Default` impls mirror the defaults callers usually start from.

use image::Rgba;

use crate::assets::AssetSource;

/// Opaque black.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Opaque white.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// QR error correction level, from lowest (L) to highest (H) redundancy.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub enum ErrorCorrectionLevel {
    L,
    M,
    #[default]
    Q,
    H,
}

impl ErrorCorrectionLevel {
    /// Fraction of modules that may be obscured while the symbol stays decodable.
    pub fn tolerance(self) -> f64 {
        match self {
            ErrorCorrectionLevel::L => 0.07,
            ErrorCorrectionLevel::M => 0.15,
            ErrorCorrectionLevel::Q => 0.25,
            ErrorCorrectionLevel::H => 0.30,
        }
    }
}

/// Gradient geometry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GradientKind {
    Linear,
    Radial,
}

/// One color stop. `offset` is expected in `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba<u8>,
}

impl ColorStop {
    pub const fn new(offset: f32, color: Rgba<u8>) -> Self {
        Self { offset, color }
    }
}

/// A gradient definition. Stops are used in the order given; they are not
/// sorted or deduplicated.
#[derive(Clone, PartialEq, Debug)]
pub struct GradientSpec {
    pub kind: GradientKind,
    /// Rotation in radians, only meaningful for linear gradients.
    pub rotation: f64,
    pub color_stops: Vec<ColorStop>,
}

/// How a region is painted.
#[derive(Clone, PartialEq, Debug)]
pub enum Fill {
    Solid(Rgba<u8>),
    Gradient(GradientSpec),
}

/// Module shapes.
///
/// The first six react to neighboring dark modules; the rest are fixed paths
/// drawn the same way regardless of their surroundings.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum DotType {
    Dots,
    Rounded,
    Classy,
    ClassyRounded,
    #[default]
    Square,
    ExtraRounded,
    Star,
    Diamond,
    X,
    Cross,
    CrossRounded,
    XRounded,
    Heart,
}

impl DotType {
    pub const ALL: [DotType; 13] = [
        DotType::Dots,
        DotType::Rounded,
        DotType::Classy,
        DotType::ClassyRounded,
        DotType::Square,
        DotType::ExtraRounded,
        DotType::Star,
        DotType::Diamond,
        DotType::X,
        DotType::Cross,
        DotType::CrossRounded,
        DotType::XRounded,
        DotType::Heart,
    ];

    /// The name used for this shape in option files and path templates.
    pub fn name(self) -> &'static str {
        match self {
            DotType::Dots => "dots",
            DotType::Rounded => "rounded",
            DotType::Classy => "classy",
            DotType::ClassyRounded => "classy-rounded",
            DotType::Square => "square",
            DotType::ExtraRounded => "extra-rounded",
            DotType::Star => "star",
            DotType::Diamond => "diamond",
            DotType::X => "x",
            DotType::Cross => "cross",
            DotType::CrossRounded => "cross-rounded",
            DotType::XRounded => "x-rounded",
            DotType::Heart => "heart",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this shape is a fixed path template that ignores neighbors.
    pub fn is_fixed_path(self) -> bool {
        matches!(
            self,
            DotType::Star
                | DotType::Diamond
                | DotType::X
                | DotType::Cross
                | DotType::CrossRounded
                | DotType::XRounded
                | DotType::Heart
        )
    }
}

/// Shapes for the outer 7x7 ring of a finder pattern.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CornerSquareType {
    Dot,
    Square,
    ExtraRounded,
    Diamond,
}

impl CornerSquareType {
    pub fn name(self) -> &'static str {
        match self {
            CornerSquareType::Dot => "dot",
            CornerSquareType::Square => "square",
            CornerSquareType::ExtraRounded => "extra-rounded",
            CornerSquareType::Diamond => "diamond",
        }
    }
}

/// Shapes for the inner 3x3 dot of a finder pattern.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CornerDotType {
    Dot,
    Square,
    Star,
    Diamond,
    X,
    Cross,
    CrossRounded,
    XRounded,
    Heart,
}

impl CornerDotType {
    pub fn name(self) -> &'static str {
        match self {
            CornerDotType::Dot => "dot",
            CornerDotType::Square => "square",
            CornerDotType::Star => "star",
            CornerDotType::Diamond => "diamond",
            CornerDotType::X => "x",
            CornerDotType::Cross => "cross",
            CornerDotType::CrossRounded => "cross-rounded",
            CornerDotType::XRounded => "x-rounded",
            CornerDotType::Heart => "heart",
        }
    }
}

/// Encoder parameters handed to the external QR encoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct QrOptions {
    /// Symbol version 1..=40, or `None` to pick the smallest that fits.
    pub type_number: Option<i16>,
    pub error_correction_level: ErrorCorrectionLevel,
}

#[derive(Clone, PartialEq, Debug)]
pub struct DotsOptions {
    pub kind: DotType,
    pub fill: Fill,
}

impl Default for DotsOptions {
    fn default() -> Self {
        Self {
            kind: DotType::Square,
            fill: Fill::Solid(BLACK),
        }
    }
}

/// Finder ring style. Without a `kind` the ring is drawn module by module with
/// the module shape; without a `fill` it uses the module fill.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CornerSquareOptions {
    pub kind: Option<CornerSquareType>,
    pub fill: Option<Fill>,
}

/// Finder dot style, same fallbacks as [`CornerSquareOptions`].
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CornerDotOptions {
    pub kind: Option<CornerDotType>,
    pub fill: Option<Fill>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct BackgroundOptions {
    /// `None` leaves the body transparent.
    pub fill: Option<Fill>,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            fill: Some(Fill::Solid(WHITE)),
        }
    }
}

/// Padding and decoration around the code body.
///
/// When `right_size` is non-zero the horizontal padding is `left_size + right_size`,
/// otherwise it is `x_size` on both sides.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FrameOptions {
    pub x_size: u32,
    pub left_size: u32,
    pub right_size: u32,
    pub top_size: u32,
    pub bottom_size: u32,
    pub background: Option<Fill>,
    pub image: Option<AssetSource>,
}

impl FrameOptions {
    /// Total horizontal padding added to the configured width.
    pub fn x_padding(&self) -> u32 {
        if self.right_size > 0 {
            self.left_size.saturating_add(self.right_size)
        } else {
            self.x_size.saturating_mul(2)
        }
    }

    /// Padding on the left edge.
    pub fn left_inset(&self) -> u32 {
        if self.right_size > 0 {
            self.left_size
        } else {
            self.x_size
        }
    }

    /// Total vertical padding added to the configured height.
    pub fn y_padding(&self) -> u32 {
        self.top_size.saturating_add(self.bottom_size)
    }
}

/// Embedded logo.
#[derive(Clone, PartialEq, Debug)]
pub struct LogoOptions {
    pub source: AssetSource,
    /// Fraction of the error-correction tolerance the logo may consume, `[0, 1]`.
    pub image_size: f64,
    /// Inset in pixels between the hidden area and the drawn bitmap.
    pub margin: u32,
    /// Skip modules underneath the logo.
    pub hide_background_dots: bool,
}

impl LogoOptions {
    pub fn new(source: AssetSource) -> Self {
        Self {
            source,
            image_size: 0.4,
            margin: 0,
            hide_background_dots: true,
        }
    }
}

/// Fully resolved style for one render pass.
#[derive(Clone, PartialEq, Debug)]
pub struct StyleConfiguration {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    /// Corner radius of the frame and body background rectangles.
    pub border_radius: f32,
    pub qr: QrOptions,
    pub dots: DotsOptions,
    pub corners_square: CornerSquareOptions,
    pub corners_dot: CornerDotOptions,
    pub background: BackgroundOptions,
    pub frame: FrameOptions,
    pub logo: Option<LogoOptions>,
}

impl Default for StyleConfiguration {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            margin: 0,
            border_radius: 0.0,
            qr: QrOptions::default(),
            dots: DotsOptions::default(),
            corners_square: CornerSquareOptions::default(),
            corners_dot: CornerDotOptions::default(),
            background: BackgroundOptions::default(),
            frame: FrameOptions::default(),
            logo: None,
        }
    }
}

impl StyleConfiguration {
    /// Size of the drawing surface: the configured size plus the frame padding.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            self.width.saturating_add(self.frame.x_padding()),
            self.height.saturating_add(self.frame.y_padding()),
        )
    }
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 16 + v;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 {
                channel(&hex[6..8])?
            } else {
                255
            };
            Some(Rgba([r, g, b, a]))
        }
        _ => None,
    }
}
