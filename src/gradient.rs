//! Paint for every filled region: solid colors and linear/radial gradients.

use std::f64::consts::{FRAC_PI_4, TAU};

use tiny_skia::{GradientStop, LinearGradient, Point, RadialGradient, Shader, SpreadMode, Transform};
use tracing::warn;

use crate::canvas::{skia_color, Canvas};
use crate::config::{Fill, GradientKind, GradientSpec};

/// The box a gradient is laid out over.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GradientBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl GradientBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn square(x: f64, y: f64, size: f64) -> Self {
        Self::new(x, y, size, size)
    }
}

/// Start and end of a linear gradient axis, rounded to whole pixels.
///
/// The rotation picks which pair of box edges the axis runs between; the other
/// coordinate is projected through `tan(rotation)`.
pub fn linear_endpoints(rotation: f64, bbox: GradientBox) -> (f64, f64, f64, f64) {
    let rotation = rotation % TAU;
    let positive = normalize_rotation(rotation);
    let half_w = bbox.width / 2.0;
    let half_h = bbox.height / 2.0;
    let (cx, cy) = (bbox.x + half_w, bbox.y + half_h);
    let (mut x0, mut y0, mut x1, mut y1) = (cx, cy, cx, cy);

    if positive <= FRAC_PI_4 || positive > 7.0 * FRAC_PI_4 {
        x0 -= half_w;
        y0 -= half_h * rotation.tan();
        x1 += half_w;
        y1 += half_h * rotation.tan();
    } else if positive <= 3.0 * FRAC_PI_4 {
        y0 -= half_h;
        x0 -= half_w / rotation.tan();
        y1 += half_h;
        x1 += half_w / rotation.tan();
    } else if positive <= 5.0 * FRAC_PI_4 {
        x0 += half_w;
        y0 += half_h * rotation.tan();
        x1 -= half_w;
        y1 -= half_h * rotation.tan();
    } else {
        y0 += half_h;
        x0 += half_w / rotation.tan();
        y1 -= half_h;
        x1 -= half_w / rotation.tan();
    }

    (x0.round(), y0.round(), x1.round(), y1.round())
}

/// Builds the shader for `spec`, rotated by an extra `additional_rotation`.
///
/// Returns `None` only when the spec has no stops. Degenerate geometry paints a
/// solid color instead of failing.
pub fn create_gradient(
    spec: &GradientSpec,
    additional_rotation: f64,
    bbox: GradientBox,
) -> Option<Shader<'static>> {
    let first = spec.color_stops.first()?;
    let stops: Vec<GradientStop> = spec
        .color_stops
        .iter()
        .map(|stop| GradientStop::new(stop.offset, skia_color(stop.color)))
        .collect();

    let shader = match spec.kind {
        GradientKind::Radial => {
            let center = Point::from_xy(
                (bbox.x + bbox.width / 2.0) as f32,
                (bbox.y + bbox.height / 2.0) as f32,
            );
            RadialGradient::new(
                center,
                center,
                (bbox.width / 2.0) as f32,
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            )
        }
        GradientKind::Linear => {
            let (x0, y0, x1, y1) = linear_endpoints(spec.rotation + additional_rotation, bbox);
            LinearGradient::new(
                Point::from_xy(x0 as f32, y0 as f32),
                Point::from_xy(x1 as f32, y1 as f32),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            )
        }
    };

    Some(shader.unwrap_or_else(|| {
        warn!(kind = ?spec.kind, ?bbox, "degenerate gradient, using first stop color");
        Shader::SolidColor(skia_color(first.color))
    }))
}

/// Sets the canvas fill from `fill`. A gradient without stops leaves the
/// current fill unchanged.
pub fn apply_fill(canvas: &mut Canvas, fill: &Fill, additional_rotation: f64, bbox: GradientBox) {
    match fill {
        Fill::Solid(color) => canvas.set_fill_color(*color),
        Fill::Gradient(spec) => {
            if let Some(shader) = create_gradient(spec, additional_rotation, bbox) {
                canvas.set_fill_shader(shader);
            }
        }
    }
}

/// Rotation normalized to `[0, 2π)`.
pub fn normalize_rotation(rotation: f64) -> f64 {
    let r = rotation.rem_euclid(TAU);
    if r >= TAU {
        0.0
    } else {
        r
    }
}
