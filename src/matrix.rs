//! The QR matrix provider seam.
//!
//! The renderer only ever asks two questions of a symbol: how many modules per
//! side, and whether a given module is dark. Encoding lives in the `qrcode`
//! crate; [`encode`] adapts it.

use qrcode::{EcLevel, QrCode, Version};

use crate::config::{ErrorCorrectionLevel, QrOptions};
use crate::error::{RenderError, RenderResult};

/// A square grid of dark and light modules.
pub trait QrMatrix {
    /// Modules per side. Fixed for the lifetime of the matrix.
    fn module_count(&self) -> usize;

    /// Whether the module at column `x`, row `y` is dark. Out-of-range
    /// coordinates are light.
    fn is_dark(&self, x: usize, y: usize) -> bool;
}

impl QrMatrix for QrCode {
    fn module_count(&self) -> usize {
        self.width()
    }

    fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width() && y < self.width() && self[(x, y)] == qrcode::Color::Dark
    }
}

/// An owned snapshot of a matrix, cheap to move across threads.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ModuleGrid {
    count: usize,
    modules: Vec<bool>,
}

impl ModuleGrid {
    /// Builds a grid from row-major module values. Returns `None` unless
    /// `modules.len() == count * count`.
    pub fn new(count: usize, modules: Vec<bool>) -> Option<Self> {
        (modules.len() == count * count).then_some(Self { count, modules })
    }

    /// Copies any matrix into an owned grid.
    pub fn from_matrix(matrix: &dyn QrMatrix) -> Self {
        let count = matrix.module_count();
        let mut modules = Vec::with_capacity(count * count);
        for y in 0..count {
            for x in 0..count {
                modules.push(matrix.is_dark(x, y));
            }
        }
        Self { count, modules }
    }

    /// Parses rows of `#` (dark) and anything else (light). Handy for fixtures.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let count = rows.len();
        let mut modules = Vec::with_capacity(count * count);
        for row in rows {
            if row.chars().count() != count {
                return None;
            }
            modules.extend(row.chars().map(|c| c == '#'));
        }
        Some(Self { count, modules })
    }
}

impl QrMatrix for ModuleGrid {
    fn module_count(&self) -> usize {
        self.count
    }

    fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.count && y < self.count && self.modules[y * self.count + x]
    }
}

fn ec_level(level: ErrorCorrectionLevel) -> EcLevel {
    match level {
        ErrorCorrectionLevel::L => EcLevel::L,
        ErrorCorrectionLevel::M => EcLevel::M,
        ErrorCorrectionLevel::Q => EcLevel::Q,
        ErrorCorrectionLevel::H => EcLevel::H,
    }
}

/// Encodes `data` with the given encoder options.
///
/// # Errors
///
/// Returns [`RenderError::Encode`] if the data does not fit the requested version
/// or level.
///
/// # Example
///
/// ```rust
/// use qirust_styling::config::{ErrorCorrectionLevel, QrOptions};
/// use qirust_styling::matrix::{encode, QrMatrix};
///
/// let options = QrOptions { type_number: None, error_correction_level: ErrorCorrectionLevel::M };
/// let qr = encode("HELLO", &options).unwrap();
/// assert_eq!(qr.module_count(), 21);
/// ```
pub fn encode(data: &str, options: &QrOptions) -> RenderResult<QrCode> {
    let level = ec_level(options.error_correction_level);
    let code = match options.type_number {
        Some(version) if version > 0 => {
            QrCode::with_version(data.as_bytes(), Version::Normal(version), level)
        }
        _ => QrCode::with_error_correction_level(data.as_bytes(), level),
    };
    code.map_err(|e| RenderError::Encode(e.to_string()))
}
