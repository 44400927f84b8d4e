//! Path templates and the size-keyed geometry cache.
//!
//! A template is an SVG path made of relative commands and space-separated
//! tokens, drawn inside a square of `size` units. The first time a shape is used
//! its numeric tokens are divided by that size (the unit template); each pixel
//! size the shape is requested at is then scaled once, rounded to three decimals
//! and kept for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use tiny_skia::{Path, PathBuilder};

/// A named shape: canonical path text plus its reference size.
#[derive(Clone, Copy, Debug)]
pub struct PathTemplate {
    pub name: &'static str,
    pub path: &'static str,
    pub size: f64,
}

// The paths must be in relative commands (lowercase letters) and unminified.
const DOT_TEMPLATES: &[PathTemplate] = &[
    PathTemplate {
        name: "star",
        path: "m 4 0 l 1.24 2.63 l 2.76 0.43 l -2 2.05 l 0.47 2.89 l -2.47 -1.37 l -2.47 1.37 l 0.47 -2.89 l -2 -2.05 l 2.76 -0.43 z",
        size: 8.0,
    },
    PathTemplate {
        name: "diamond",
        path: "m 4 0 l 4 4 l -4 4 l -4 -4 l 4 -4 l 4 4 z",
        size: 8.0,
    },
    PathTemplate {
        name: "x",
        path: "m 8 0 l -3 0 l -1 1 l -1 -1 l -3 0 l 0 3 l 1 1 l -1 1 l 0 3 l 3 0 l 1 -1 l 1 1 l 3 0 l 0 -3 l -1 -1 l 1 -1 z",
        size: 8.0,
    },
    PathTemplate {
        name: "cross",
        path: "m 5.5 2.5 l 0 -2.5 l -3 0 l 0 2.5 l -2.5 0 l 0 3 l 2.5 0 l 0 2.5 l 3 0 l 0 -2.5 l 2.5 0 l 0 -3 z",
        size: 8.0,
    },
    PathTemplate {
        name: "cross-rounded",
        path: "m 6.5 2.5 h -1 v -1 c 0 -0.83 -0.67 -1.5 -1.5 -1.5 s -1.5 0.67 -1.5 1.5 v 1 h -1 c -0.83 0 -1.5 0.67 -1.5 1.5 s 0.67 1.5 1.5 1.5 h 1 v 1 c 0 0.83 0.67 1.5 1.5 1.5 s 1.5 -0.67 1.5 -1.5 v -1 h 1 c 0.83 0 1.5 -0.67 1.5 -1.5 s -0.67 -1.5 -1.5 -1.5 z",
        size: 8.0,
    },
    PathTemplate {
        name: "x-rounded",
        path: "m 5.88 0 l 0 0 c -0.56 0 -1.1 0.22 -1.5 0.62 l -0.38 0.38 l -0.38 -0.38 c -0.4 -0.4 -0.94 -0.62 -1.5 -0.62 h 0 c -1.17 0 -2.12 0.95 -2.12 2.12 v 0 c 0 0.56 0.22 1.1 0.62 1.5 l 0.38 0.38 l -0.38 0.38 c -0.4 0.4 -0.62 0.94 -0.62 1.5 v 0 c 0 1.17 0.95 2.12 2.12 2.12 h 0 c 0.56 0 1.1 -0.22 1.5 -0.62 l 0.38 -0.38 l 0.38 0.38 c 0.4 0.4 0.94 0.62 1.5 0.62 h 0 c 1.17 0 2.12 -0.95 2.12 -2.12 v 0 c 0 -0.56 -0.22 -1.1 -0.62 -1.5 l -0.38 -0.38 l 0.38 -0.38 c 0.4 -0.4 0.62 -0.94 0.62 -1.5 v 0 c 0 -1.17 -0.95 -2.12 -2.12 -2.12 z",
        size: 8.0,
    },
    PathTemplate {
        name: "heart",
        path: "m 4.01 1.58 c 2 -1.98 3.98 -0.99 3.99 0.98 c 0.01 1.98 -3.99 4.94 -3.99 4.94 s -4.01 -2.96 -4.01 -4.94 s 2 -2.96 4.01 -0.98 z",
        size: 8.0,
    },
];

// Rings are two subpaths filled even-odd.
const CORNER_SQUARE_TEMPLATES: &[PathTemplate] = &[PathTemplate {
    name: "diamond",
    path: "m 3.5 0 l 3.5 3.5 l -3.5 3.5 l -3.5 -3.5 z m 0 1.4 l -2.1 2.1 l 2.1 2.1 l 2.1 -2.1 z",
    size: 7.0,
}];

/// Shapes available to the module renderer.
pub static DOT_PATHS: LazyLock<PathTemplateCache> =
    LazyLock::new(|| PathTemplateCache::new(DOT_TEMPLATES));

/// Shapes available to the finder ring renderer.
pub static CORNER_SQUARE_PATHS: LazyLock<PathTemplateCache> =
    LazyLock::new(|| PathTemplateCache::new(CORNER_SQUARE_TEMPLATES));

/// Shapes available to the finder dot renderer.
pub static CORNER_DOT_PATHS: LazyLock<PathTemplateCache> =
    LazyLock::new(|| PathTemplateCache::new(DOT_TEMPLATES));

/// One token of a path: a command letter or a number.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PathToken {
    Command(char),
    Number(f64),
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathToken::Command(c) => write!(f, "{c}"),
            PathToken::Number(n) => write!(f, "{n}"),
        }
    }
}

type TokenList = Arc<[PathToken]>;

/// Scales and caches a fixed set of templates.
pub struct PathTemplateCache {
    templates: &'static [PathTemplate],
    unit: Mutex<HashMap<&'static str, TokenList>>,
    scaled: Mutex<HashMap<(&'static str, u32), TokenList>>,
}

impl fmt::Debug for PathTemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathTemplateCache")
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

impl PathTemplateCache {
    pub fn new(templates: &'static [PathTemplate]) -> Self {
        Self {
            templates,
            unit: Mutex::new(HashMap::new()),
            scaled: Mutex::new(HashMap::new()),
        }
    }

    fn template(&self, kind: &str) -> Option<&'static PathTemplate> {
        self.templates.iter().find(|t| t.name == kind)
    }

    fn unit_template(&self, template: &'static PathTemplate) -> TokenList {
        let mut unit = self.unit.lock().unwrap_or_else(PoisonError::into_inner);
        unit.entry(template.name)
            .or_insert_with(|| {
                template
                    .path
                    .split(' ')
                    .filter(|item| !item.is_empty())
                    .map(|item| match item.parse::<f64>() {
                        Ok(n) => PathToken::Number(n / template.size),
                        Err(_) => PathToken::Command(item.chars().next().unwrap_or('z')),
                    })
                    .collect()
            })
            .clone()
    }

    /// Builds the path for `kind` at `size` pixels, starting at (`x`, `y`).
    ///
    /// Unknown kinds produce an empty path, which draws nothing.
    pub fn build(&self, kind: &str, size: u32, x: f64, y: f64) -> ShapePath {
        let Some(template) = self.template(kind) else {
            return ShapePath::empty();
        };
        let key = (template.name, size);
        if let Some(body) = self
            .scaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return ShapePath::new(x, y, body.clone());
        }

        let scale = f64::from(size);
        let body: TokenList = self
            .unit_template(template)
            .iter()
            .map(|token| match *token {
                // strip decimals after the 3rd digit
                PathToken::Number(n) => PathToken::Number((n * scale * 1000.0).round() / 1000.0),
                command => command,
            })
            .collect();
        self.scaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, body.clone());
        ShapePath::new(x, y, body)
    }
}

/// A positioned shape path: a move to the origin followed by the scaled body.
#[derive(Clone, PartialEq, Debug)]
pub struct ShapePath {
    origin: Option<(f64, f64)>,
    body: TokenList,
}

impl ShapePath {
    fn new(x: f64, y: f64, body: TokenList) -> Self {
        Self {
            origin: Some((x, y)),
            body,
        }
    }

    pub fn empty() -> Self {
        Self {
            origin: None,
            body: Arc::from(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
    }

    /// The size-scaled tokens after the origin move.
    pub fn body(&self) -> &[PathToken] {
        &self.body
    }

    /// Converts the path into drawable geometry.
    pub fn to_path(&self) -> Option<Path> {
        let (x, y) = self.origin?;
        let mut tokens = Vec::with_capacity(self.body.len() + 3);
        tokens.push(PathToken::Command('m'));
        tokens.push(PathToken::Number(x));
        tokens.push(PathToken::Number(y));
        tokens.extend_from_slice(&self.body);
        build_svg_path(&tokens)
    }
}

impl fmt::Display for ShapePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((x, y)) = self.origin else {
            return Ok(());
        };
        write!(f, "m {x} {y}")?;
        for token in self.body.iter() {
            write!(f, " {token}")?;
        }
        Ok(())
    }
}

fn arity(command: char) -> usize {
    match command.to_ascii_lowercase() {
        'm' | 'l' | 't' => 2,
        'h' | 'v' => 1,
        'c' => 6,
        's' | 'q' => 4,
        _ => 0,
    }
}

/// Interprets SVG path data (`m l h v c s q z`, both cases) into a path.
fn build_svg_path(tokens: &[PathToken]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    let (mut cx, mut cy) = (0.0f64, 0.0f64);
    let (mut sx, mut sy) = (0.0f64, 0.0f64);
    // Second control point of the previous cubic, for `s`.
    let mut last_ctrl: Option<(f64, f64)> = None;
    let mut command: Option<char> = None;
    let mut args: Vec<f64> = Vec::with_capacity(6);
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        match *token {
            PathToken::Command(c) => {
                if c.eq_ignore_ascii_case(&'z') {
                    pb.close();
                    cx = sx;
                    cy = sy;
                    last_ctrl = None;
                    command = None;
                } else {
                    command = Some(c);
                }
                args.clear();
                continue;
            }
            PathToken::Number(n) => args.push(n),
        }

        let Some(c) = command else { continue };
        if args.len() < arity(c) {
            continue;
        }
        let relative = c.is_ascii_lowercase();
        let (ox, oy) = if relative { (cx, cy) } else { (0.0, 0.0) };
        let mut next_ctrl = None;
        match c.to_ascii_lowercase() {
            'm' => {
                cx = ox + args[0];
                cy = oy + args[1];
                sx = cx;
                sy = cy;
                pb.move_to(cx as f32, cy as f32);
                // Extra coordinate pairs after a move are line-tos.
                command = Some(if relative { 'l' } else { 'L' });
            }
            'l' => {
                cx = ox + args[0];
                cy = oy + args[1];
                pb.line_to(cx as f32, cy as f32);
            }
            'h' => {
                cx = if relative { cx + args[0] } else { args[0] };
                pb.line_to(cx as f32, cy as f32);
            }
            'v' => {
                cy = if relative { cy + args[0] } else { args[0] };
                pb.line_to(cx as f32, cy as f32);
            }
            'c' => {
                let (x1, y1) = (ox + args[0], oy + args[1]);
                let (x2, y2) = (ox + args[2], oy + args[3]);
                cx = ox + args[4];
                cy = oy + args[5];
                pb.cubic_to(x1 as f32, y1 as f32, x2 as f32, y2 as f32, cx as f32, cy as f32);
                next_ctrl = Some((x2, y2));
            }
            's' => {
                let (x1, y1) = match last_ctrl {
                    Some((px, py)) => (2.0 * cx - px, 2.0 * cy - py),
                    None => (cx, cy),
                };
                let (x2, y2) = (ox + args[0], oy + args[1]);
                cx = ox + args[2];
                cy = oy + args[3];
                pb.cubic_to(x1 as f32, y1 as f32, x2 as f32, y2 as f32, cx as f32, cy as f32);
                next_ctrl = Some((x2, y2));
            }
            'q' => {
                let (x1, y1) = (ox + args[0], oy + args[1]);
                cx = ox + args[2];
                cy = oy + args[3];
                pb.quad_to(x1 as f32, y1 as f32, cx as f32, cy as f32);
            }
            _ => {}
        }
        last_ctrl = next_ctrl;
        args.clear();
    }

    pb.finish()
}
