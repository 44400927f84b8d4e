//! Finder patterns: the three 7x7 corner markers.
//!
//! The ring and the center dot are styled on their own. When no shape is
//! configured they are drawn cell by cell from the same masks the orchestrator
//! uses to keep generic module drawing out of these regions.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::canvas::{Canvas, FigureBuilder};
use crate::config::{CornerDotType, CornerSquareType, DotType, Fill};
use crate::dot::DotRenderer;
use crate::gradient::{apply_fill, GradientBox};
use crate::paths::{CORNER_DOT_PATHS, CORNER_SQUARE_PATHS};

/// Side of a finder pattern in modules.
pub const FINDER_SIZE: usize = 7;

pub type Mask = [[u8; FINDER_SIZE]; FINDER_SIZE];

/// Cells of the outer ring.
pub const SQUARE_MASK: Mask = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

/// Cells of the center dot.
pub const DOT_MASK: Mask = [
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 1, 1, 0, 0],
    [0, 0, 1, 1, 1, 0, 0],
    [0, 0, 1, 1, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
];

/// Where a finder pattern sits and how it is turned.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FinderPlacement {
    /// 0 for the left edge, 1 for the right edge.
    pub column: usize,
    /// 0 for the top edge, 1 for the bottom edge.
    pub row: usize,
    /// Extra gradient and shape rotation, radians.
    pub rotation: f64,
}

impl FinderPlacement {
    /// Module coordinates of this pattern's top-left cell.
    pub fn module_origin(&self, module_count: usize) -> (usize, usize) {
        let offset = module_count.saturating_sub(FINDER_SIZE);
        (self.column * offset, self.row * offset)
    }
}

pub const FINDER_PLACEMENTS: [FinderPlacement; 3] = [
    FinderPlacement {
        column: 0,
        row: 0,
        rotation: 0.0,
    },
    FinderPlacement {
        column: 1,
        row: 0,
        rotation: FRAC_PI_2,
    },
    FinderPlacement {
        column: 0,
        row: 1,
        rotation: -FRAC_PI_2,
    },
];

fn mask_at(mask: &Mask, i: i64, j: i64) -> bool {
    if i < 0 || j < 0 {
        return false;
    }
    mask.get(i as usize)
        .and_then(|column| column.get(j as usize))
        .is_some_and(|cell| *cell != 0)
}

/// Set cells of `mask` as `(i, j)` pairs, `i` along x.
pub fn mask_cells(mask: &Mask) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..FINDER_SIZE)
        .flat_map(|i| (0..FINDER_SIZE).map(move |j| (i, j)))
        .filter(|&(i, j)| mask[i][j] != 0)
}

/// Whether module (`i`, `j`) belongs to one of the three finder patterns of a
/// symbol with `module_count` modules per side.
pub fn is_finder_module(i: usize, j: usize, module_count: usize) -> bool {
    FINDER_PLACEMENTS.iter().any(|placement| {
        let (ox, oy) = placement.module_origin(module_count);
        let (li, lj) = (i as i64 - ox as i64, j as i64 - oy as i64);
        mask_at(&SQUARE_MASK, li, lj) || mask_at(&DOT_MASK, li, lj)
    })
}

/// Everything the finder renderer needs from the style.
#[derive(Clone, Copy, Debug)]
pub struct FinderStyle<'a> {
    pub square_kind: Option<CornerSquareType>,
    pub square_fill: &'a Fill,
    pub dot_kind: Option<CornerDotType>,
    pub dot_fill: &'a Fill,
    /// Module shape used when a part has no shape of its own.
    pub module_kind: DotType,
}

/// Draws the three finder patterns for a symbol whose top-left module is at
/// `origin` and whose modules are `dot_size` pixels wide.
pub fn draw_finder_patterns(
    canvas: &mut Canvas,
    style: &FinderStyle<'_>,
    origin: (f64, f64),
    dot_size: f64,
    module_count: usize,
) {
    let square_size = dot_size * FINDER_SIZE as f64;
    let dot_part_size = dot_size * 3.0;
    let span = module_count.saturating_sub(FINDER_SIZE) as f64;

    for placement in FINDER_PLACEMENTS {
        let x = origin.0 + placement.column as f64 * dot_size * span;
        let y = origin.1 + placement.row as f64 * dot_size * span;

        apply_fill(
            canvas,
            style.square_fill,
            placement.rotation,
            GradientBox::square(x, y, square_size),
        );
        canvas.begin_path();
        match style.square_kind {
            Some(kind) => draw_ring(canvas, kind, x, y, square_size, placement.rotation),
            None => draw_mask(canvas, &SQUARE_MASK, style.module_kind, x, y, dot_size),
        }
        canvas.fill_even_odd();

        let (dx, dy) = (x + dot_size * 2.0, y + dot_size * 2.0);
        apply_fill(
            canvas,
            style.dot_fill,
            placement.rotation,
            GradientBox::square(dx, dy, dot_part_size),
        );
        canvas.begin_path();
        match style.dot_kind {
            Some(kind) => draw_center(canvas, kind, dx, dy, dot_part_size, placement.rotation),
            None => draw_mask(canvas, &DOT_MASK, style.module_kind, x, y, dot_size),
        }
        canvas.fill_even_odd();
    }
}

fn draw_mask(canvas: &mut Canvas, mask: &Mask, kind: DotType, x: f64, y: f64, dot_size: f64) {
    let dot = DotRenderer::new(kind);
    for (i, j) in mask_cells(mask) {
        let neighbor = |dx: i32, dy: i32| mask_at(mask, i as i64 + dx as i64, j as i64 + dy as i64);
        dot.draw(
            canvas,
            x + i as f64 * dot_size,
            y + j as f64 * dot_size,
            dot_size,
            &neighbor,
        );
    }
}

/// Rounded square of half-side `h` centered on the origin.
fn rounded_square(f: &mut FigureBuilder, h: f64, r: f64) {
    let inner = h - r;
    f.arc(-inner, -inner, r, PI, 1.5 * PI);
    f.line_to(inner, -h);
    f.arc(inner, -inner, r, 1.5 * PI, 2.0 * PI);
    f.line_to(h, inner);
    f.arc(inner, inner, r, 0.0, FRAC_PI_2);
    f.line_to(-inner, h);
    f.arc(-inner, inner, r, FRAC_PI_2, PI);
    f.close();
}

fn draw_ring(canvas: &mut Canvas, kind: CornerSquareType, x: f64, y: f64, size: f64, rotation: f64) {
    let h = size / 2.0;
    let unit = size / FINDER_SIZE as f64;
    canvas.with_rotation(x + h, y + h, rotation, |c| match kind {
        CornerSquareType::Dot => c.append_figure(|f| {
            f.circle(0.0, 0.0, h);
            f.circle(0.0, 0.0, h - unit);
        }),
        CornerSquareType::Square => c.append_figure(|f| {
            f.rect(-h, -h, size, size);
            f.rect(-h + unit, -h + unit, size - 2.0 * unit, size - 2.0 * unit);
        }),
        CornerSquareType::ExtraRounded => c.append_figure(|f| {
            rounded_square(f, h, 2.5 * unit);
            rounded_square(f, h - unit, 1.5 * unit);
        }),
        CornerSquareType::Diamond => {
            let path = CORNER_SQUARE_PATHS.build(kind.name(), size.round() as u32, -h, -h);
            if let Some(path) = path.to_path() {
                c.append(path);
            }
        }
    });
}

fn draw_center(canvas: &mut Canvas, kind: CornerDotType, x: f64, y: f64, size: f64, rotation: f64) {
    let h = size / 2.0;
    canvas.with_rotation(x + h, y + h, rotation, |c| match kind {
        CornerDotType::Dot => c.append_figure(|f| f.circle(0.0, 0.0, h)),
        CornerDotType::Square => c.append_figure(|f| f.rect(-h, -h, size, size)),
        _ => {
            let path = CORNER_DOT_PATHS.build(kind.name(), size.round() as u32, -h, -h);
            if let Some(path) = path.to_path() {
                c.append(path);
            }
        }
    });
}
