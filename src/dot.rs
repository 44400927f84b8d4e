//! Drawing a single module.
//!
//! Adjacency-sensitive shapes look at the four edge neighbors and flatten the
//! rounding on every side that touches another dark module, so runs of modules
//! merge into one blob. Each shape is one of a handful of primitives drawn
//! around the cell center and turned by a multiple of a quarter turn.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::canvas::{Canvas, FigureBuilder};
use crate::config::DotType;
use crate::paths::DOT_PATHS;

/// Primitive figures, described in their unrotated orientation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Primitive {
    /// Circle filling the cell.
    Dot,
    Square,
    /// Right half is a semicircle.
    SideRounded,
    /// Top-right corner rounded with radius `size / 2`.
    CornerRounded,
    /// Top-right corner rounded with radius `size`.
    CornerExtraRounded,
    /// Top-right and bottom-left corners rounded.
    CornersRounded,
}

impl Primitive {
    /// Corner radii `[top-left, top-right, bottom-right, bottom-left]`.
    fn radii(self, size: f64) -> [f64; 4] {
        let r = size / 2.0;
        match self {
            Primitive::Dot => [r; 4],
            Primitive::Square => [0.0; 4],
            Primitive::SideRounded => [0.0, r, r, 0.0],
            Primitive::CornerRounded => [0.0, r, 0.0, 0.0],
            Primitive::CornerExtraRounded => [0.0, size, 0.0, 0.0],
            Primitive::CornersRounded => [0.0, r, 0.0, r],
        }
    }

    /// Appends the figure centered on the local origin.
    fn build(self, f: &mut FigureBuilder, size: f64) {
        let h = size / 2.0;
        match self {
            Primitive::Dot => f.circle(0.0, 0.0, h),
            Primitive::Square => f.rect(-h, -h, size, size),
            Primitive::SideRounded => {
                f.arc(0.0, 0.0, h, -FRAC_PI_2, FRAC_PI_2);
                f.line_to(-h, h);
                f.line_to(-h, -h);
                f.line_to(0.0, -h);
            }
            Primitive::CornerRounded => {
                f.arc(0.0, 0.0, h, -FRAC_PI_2, 0.0);
                f.line_to(h, h);
                f.line_to(-h, h);
                f.line_to(-h, -h);
                f.line_to(0.0, -h);
            }
            Primitive::CornerExtraRounded => {
                f.arc(-h, h, size, -FRAC_PI_2, 0.0);
                f.line_to(-h, h);
                f.line_to(-h, -h);
            }
            Primitive::CornersRounded => {
                f.arc(0.0, 0.0, h, -FRAC_PI_2, 0.0);
                f.line_to(h, h);
                f.line_to(0.0, h);
                f.arc(0.0, 0.0, h, FRAC_PI_2, PI);
                f.line_to(-h, -h);
                f.line_to(0.0, -h);
            }
        }
        f.close();
    }
}

/// A primitive and the rotation it is drawn with.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Figure {
    pub primitive: Primitive,
    /// Radians, clockwise on screen.
    pub rotation: f64,
}

impl Figure {
    const fn new(primitive: Primitive, rotation: f64) -> Self {
        Self {
            primitive,
            rotation,
        }
    }

    /// Corner radii `[top-left, top-right, bottom-right, bottom-left]` after
    /// rotation.
    pub fn corner_radii(&self, size: f64) -> [f64; 4] {
        let base = self.primitive.radii(size);
        let quarter_turns = (self.rotation / FRAC_PI_2).round().rem_euclid(4.0) as usize;
        let mut rotated = [0.0; 4];
        for (corner, radius) in base.into_iter().enumerate() {
            rotated[(corner + quarter_turns) % 4] = radius;
        }
        rotated
    }

    /// Picks the figure for an adjacency-sensitive `kind` given the neighbor
    /// predicate. Returns `None` for fixed-path kinds.
    pub fn select(kind: DotType, neighbor: &dyn Fn(i32, i32) -> bool) -> Option<Self> {
        let left = neighbor(-1, 0);
        let right = neighbor(1, 0);
        let top = neighbor(0, -1);
        let bottom = neighbor(0, 1);
        let count = [left, right, top, bottom].into_iter().filter(|n| *n).count();

        let figure = match kind {
            DotType::Dots => Figure::new(Primitive::Dot, 0.0),
            DotType::Square => Figure::new(Primitive::Square, 0.0),
            DotType::Rounded | DotType::ExtraRounded => {
                let corner = if kind == DotType::Rounded {
                    Primitive::CornerRounded
                } else {
                    Primitive::CornerExtraRounded
                };
                if count == 0 {
                    Figure::new(Primitive::Dot, 0.0)
                } else if count > 2 || (left && right) || (top && bottom) {
                    Figure::new(Primitive::Square, 0.0)
                } else if count == 2 {
                    let rotation = if left && top {
                        FRAC_PI_2
                    } else if top && right {
                        PI
                    } else if right && bottom {
                        -FRAC_PI_2
                    } else {
                        0.0
                    };
                    Figure::new(corner, rotation)
                } else {
                    let rotation = if top {
                        FRAC_PI_2
                    } else if right {
                        PI
                    } else if bottom {
                        -FRAC_PI_2
                    } else {
                        0.0
                    };
                    Figure::new(Primitive::SideRounded, rotation)
                }
            }
            DotType::Classy | DotType::ClassyRounded => {
                let corner = if kind == DotType::Classy {
                    Primitive::CornerRounded
                } else {
                    Primitive::CornerExtraRounded
                };
                if count == 0 {
                    Figure::new(Primitive::CornersRounded, FRAC_PI_2)
                } else if !left && !top {
                    Figure::new(corner, -FRAC_PI_2)
                } else if !right && !bottom {
                    Figure::new(corner, FRAC_PI_2)
                } else {
                    Figure::new(Primitive::Square, 0.0)
                }
            }
            _ => return None,
        };
        Some(figure)
    }
}

/// Draws modules of one shape kind into the canvas's open path.
#[derive(Clone, Copy, Debug)]
pub struct DotRenderer {
    kind: DotType,
}

impl DotRenderer {
    pub fn new(kind: DotType) -> Self {
        Self { kind }
    }

    /// Appends the module whose top-left pixel is (`x`, `y`).
    ///
    /// `neighbor(dx, dy)` reports whether the module at that offset is dark and
    /// drawn. The caller fills the open path afterwards.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        x: f64,
        y: f64,
        size: f64,
        neighbor: &dyn Fn(i32, i32) -> bool,
    ) {
        match Figure::select(self.kind, neighbor) {
            Some(figure) => draw_figure(canvas, figure, x, y, size),
            None => {
                let path = DOT_PATHS.build(self.kind.name(), size.round() as u32, x, y);
                if let Some(path) = path.to_path() {
                    canvas.append(path);
                }
            }
        }
    }
}

/// Appends `figure` centered in the cell at (`x`, `y`).
pub fn draw_figure(canvas: &mut Canvas, figure: Figure, x: f64, y: f64, size: f64) {
    let (cx, cy) = (x + size / 2.0, y + size / 2.0);
    canvas.with_rotation(cx, cy, figure.rotation, |c| {
        c.append_figure(|f| figure.primitive.build(f, size));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn neighbors(dark: &'static [(i32, i32)]) -> impl Fn(i32, i32) -> bool {
        move |dx, dy| dark.contains(&(dx, dy))
    }

    const ALL_EDGES: &[(i32, i32)] = &[(-1, 0), (1, 0), (0, -1), (0, 1)];

    #[test]
    fn test_surrounded_module_has_no_rounding() {
        for kind in [
            DotType::Rounded,
            DotType::ExtraRounded,
            DotType::Classy,
            DotType::ClassyRounded,
            DotType::Square,
        ] {
            let figure = Figure::select(kind, &neighbors(ALL_EDGES)).unwrap();
            assert_eq!(figure.corner_radii(10.0), [0.0; 4], "{kind:?}");
        }
    }

    #[test]
    fn test_isolated_module_is_fully_rounded() {
        for kind in [DotType::Rounded, DotType::ExtraRounded, DotType::Dots] {
            let figure = Figure::select(kind, &neighbors(&[])).unwrap();
            assert_eq!(figure.corner_radii(10.0), [5.0; 4], "{kind:?}");
        }
    }

    #[test]
    fn test_single_neighbor_rounds_opposite_side() {
        // Neighbor on the left: right side rounded.
        let figure = Figure::select(DotType::Rounded, &neighbors(&[(-1, 0)])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [0.0, 5.0, 5.0, 0.0]);
        // Neighbor above: bottom side rounded.
        let figure = Figure::select(DotType::Rounded, &neighbors(&[(0, -1)])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [0.0, 0.0, 5.0, 5.0]);
        // Neighbor below: top side rounded.
        let figure = Figure::select(DotType::Rounded, &neighbors(&[(0, 1)])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [5.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_two_neighbors_round_free_corner() {
        let figure = Figure::select(DotType::Rounded, &neighbors(&[(-1, 0), (0, -1)])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [0.0, 0.0, 5.0, 0.0]);
        let figure =
            Figure::select(DotType::ExtraRounded, &neighbors(&[(1, 0), (0, 1)])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [10.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_straight_run_is_square() {
        let figure = Figure::select(DotType::Rounded, &neighbors(&[(-1, 0), (1, 0)])).unwrap();
        assert_eq!(figure.primitive, Primitive::Square);
    }

    #[test]
    fn test_classy_isolated_rounds_two_corners() {
        let figure = Figure::select(DotType::Classy, &neighbors(&[])).unwrap();
        assert_eq!(figure.corner_radii(10.0), [5.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_fixed_path_kinds_ignore_neighbors() {
        for kind in DotType::ALL.into_iter().filter(|k| k.is_fixed_path()) {
            assert!(Figure::select(kind, &neighbors(ALL_EDGES)).is_none());
            assert!(Figure::select(kind, &neighbors(&[])).is_none());
        }
    }

    #[test]
    fn test_draw_square_fills_cell() {
        let mut canvas = Canvas::new(30, 30).unwrap();
        canvas.set_fill_color(RED);
        canvas.begin_path();
        DotRenderer::new(DotType::Square).draw(&mut canvas, 10.0, 10.0, 10.0, &neighbors(&[]));
        canvas.fill_even_odd();
        assert_eq!(canvas.pixel(10, 10), Some(RED));
        assert_eq!(canvas.pixel(19, 19), Some(RED));
        assert_eq!(canvas.pixel(20, 20).map(|p| p.0[3]), Some(0));
    }

    #[test]
    fn test_draw_rotated_corner_stays_in_cell() {
        let mut canvas = Canvas::new(30, 30).unwrap();
        canvas.set_fill_color(RED);
        canvas.begin_path();
        // Neighbors right and below: top-left corner is rounded.
        DotRenderer::new(DotType::Rounded).draw(
            &mut canvas,
            10.0,
            10.0,
            10.0,
            &neighbors(&[(1, 0), (0, 1)]),
        );
        canvas.fill_even_odd();
        assert_eq!(canvas.pixel(10, 10).map(|p| p.0[3]), Some(0));
        assert_eq!(canvas.pixel(19, 19), Some(RED));
        assert_eq!(canvas.pixel(19, 10), Some(RED));
        assert_eq!(canvas.pixel(9, 15).map(|p| p.0[3]), Some(0));
    }

    #[test]
    fn test_draw_star_uses_template() {
        let mut canvas = Canvas::new(16, 16).unwrap();
        canvas.set_fill_color(RED);
        canvas.begin_path();
        DotRenderer::new(DotType::Star).draw(&mut canvas, 0.0, 0.0, 16.0, &neighbors(ALL_EDGES));
        canvas.fill_even_odd();
        assert_eq!(canvas.pixel(8, 8), Some(RED));
        assert_eq!(canvas.pixel(0, 0).map(|p| p.0[3]), Some(0));
    }
}
