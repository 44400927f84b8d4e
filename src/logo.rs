//! Sizing an embedded logo against the symbol's error-correction budget.

use crate::config::ErrorCorrectionLevel;

/// Inputs for [`calculate_image_size`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LogoSizeRequest {
    pub original_width: f64,
    pub original_height: f64,
    /// Upper bound on the number of modules the logo may cover.
    pub max_hidden_dots: i64,
    /// Upper bound on covered modules along either axis.
    pub max_hidden_axis_dots: i64,
    pub dot_size: f64,
}

impl LogoSizeRequest {
    /// Derives the module budgets from the symbol and the configured size
    /// fraction `image_size`.
    pub fn new(
        original_width: f64,
        original_height: f64,
        dot_size: f64,
        module_count: usize,
        level: ErrorCorrectionLevel,
        image_size: f64,
    ) -> Self {
        let count = module_count as i64;
        Self {
            original_width,
            original_height,
            max_hidden_dots: max_hidden_dots(module_count, level, image_size),
            max_hidden_axis_dots: count - 14,
            dot_size,
        }
    }
}

/// `floor(image_size × tolerance(level) × module_count²)`.
pub fn max_hidden_dots(module_count: usize, level: ErrorCorrectionLevel, image_size: f64) -> i64 {
    let cover_level = image_size * level.tolerance();
    let count = module_count as f64;
    (cover_level * count * count).floor() as i64
}

/// Pixel size of the logo and the block of modules it hides.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct LogoSize {
    pub width: f64,
    pub height: f64,
    pub hide_x_dots: i64,
    pub hide_y_dots: i64,
}

/// Fits the logo into the hidden-module budget, keeping its aspect ratio.
///
/// Hidden counts are odd so the hidden block stays centered on the symbol.
pub fn calculate_image_size(request: LogoSizeRequest) -> LogoSize {
    let LogoSizeRequest {
        original_width,
        original_height,
        max_hidden_dots,
        max_hidden_axis_dots,
        dot_size,
    } = request;

    if original_height <= 0.0
        || original_width <= 0.0
        || max_hidden_dots <= 0
        || max_hidden_axis_dots <= 0
        || dot_size <= 0.0
    {
        return LogoSize::default();
    }

    let k = original_height / original_width;

    // Largest horizontal run that could fit, at least one module.
    let mut hide_x = ((max_hidden_dots as f64 / k).sqrt().floor() as i64).max(1);
    hide_x = hide_x.min(max_hidden_axis_dots);
    if hide_x % 2 == 0 {
        hide_x -= 1;
    }
    let mut width = hide_x as f64 * dot_size;

    // Opposite axis follows the aspect ratio; ceil so no module peeks out.
    let mut hide_y = 1 + 2 * ((hide_x as f64 * k - 1.0) / 2.0).ceil() as i64;
    let mut height = (width * k).round();

    if hide_y * hide_x > max_hidden_dots || hide_y > max_hidden_axis_dots {
        if hide_y > max_hidden_axis_dots {
            hide_y = max_hidden_axis_dots;
            if hide_y % 2 == 0 {
                hide_y -= 1;
            }
        } else {
            hide_y -= 2;
        }
        height = hide_y as f64 * dot_size;
        hide_x = 1 + 2 * ((hide_y as f64 / k - 1.0) / 2.0).ceil() as i64;
        width = (height / k).round();
    }

    // Pin both counts to odd values within the axis limit, then shrink the
    // longer side until the block fits the area budget.
    let (mut fit_x, mut fit_y) = (
        odd_within(hide_x, max_hidden_axis_dots),
        odd_within(hide_y, max_hidden_axis_dots),
    );
    while fit_x * fit_y > max_hidden_dots {
        if fit_y >= fit_x && fit_y > 1 {
            fit_y -= 2;
        } else if fit_x > 1 {
            fit_x -= 2;
        } else {
            break;
        }
    }
    if (fit_x, fit_y) != (hide_x, hide_y) {
        hide_x = fit_x;
        hide_y = fit_y;
        let fitted = (hide_x as f64 * dot_size).min(hide_y as f64 * dot_size / k);
        width = fitted.round().max(1.0);
        height = (fitted * k).round().max(1.0);
    }

    LogoSize {
        width,
        height,
        hide_x_dots: hide_x.max(0),
        hide_y_dots: hide_y.max(0),
    }
}

/// Largest odd count in `1..=limit` not above `count`.
fn odd_within(count: i64, limit: i64) -> i64 {
    let count = count.clamp(1, limit.max(1));
    if count % 2 == 0 {
        count - 1
    } else {
        count
    }
}

/// Centered block of modules under the logo, in module units.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct HiddenRegion {
    pub module_count: usize,
    pub hide_x_dots: i64,
    pub hide_y_dots: i64,
}

impl HiddenRegion {
    pub fn new(module_count: usize, size: &LogoSize) -> Self {
        Self {
            module_count,
            hide_x_dots: size.hide_x_dots,
            hide_y_dots: size.hide_y_dots,
        }
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        let count = self.module_count as f64;
        let (i, j) = (i as f64, j as f64);
        let (hx, hy) = (self.hide_x_dots as f64, self.hide_y_dots as f64);
        i >= (count - hx) / 2.0
            && i < (count + hx) / 2.0
            && j >= (count - hy) / 2.0
            && j < (count + hy) / 2.0
    }
}
