use image::Rgba;
use qirust_styling::config::{
    CornerDotOptions, CornerSquareOptions, DotType, DotsOptions, ErrorCorrectionLevel, Fill,
    LogoOptions, QrOptions, StyleConfiguration, WHITE,
};
use qirust_styling::corner::{is_finder_module, FINDER_PLACEMENTS};
use qirust_styling::{
    encode, AssetSource, Canvas, DecoderLoader, QrMatrix, QrRenderer, WorkerBridge,
};
use tiny_skia::Pixmap;

const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
const BLUE: Rgba<u8> = Rgba([20, 20, 220, 255]);
const GREEN: Rgba<u8> = Rgba([20, 180, 20, 255]);

fn hello_style() -> StyleConfiguration {
    StyleConfiguration {
        qr: QrOptions {
            type_number: None,
            error_correction_level: ErrorCorrectionLevel::M,
        },
        dots: DotsOptions {
            kind: DotType::Square,
            fill: Fill::Solid(RED),
        },
        corners_square: CornerSquareOptions {
            kind: None,
            fill: Some(Fill::Solid(BLUE)),
        },
        corners_dot: CornerDotOptions {
            kind: None,
            fill: Some(Fill::Solid(GREEN)),
        },
        ..StyleConfiguration::default()
    }
}

fn module_center(canvas: &Canvas, i: usize, j: usize) -> Rgba<u8> {
    // 21 modules of 14 px starting at (3, 3).
    let x = 3 + i as u32 * 14 + 7;
    let y = 3 + j as u32 * 14 + 7;
    canvas.pixel(x, y).unwrap()
}

#[test]
fn test_hello_layout_and_module_count() {
    let style = hello_style();
    let code = encode("HELLO", &style.qr).unwrap();
    assert_eq!(code.module_count(), 21);

    let mut canvas = Canvas::new(1, 1).unwrap();
    let report = QrRenderer::new(DecoderLoader::new())
        .render_blocking(&code, &style, &mut canvas, None)
        .unwrap();

    assert_eq!((canvas.width(), canvas.height()), (300, 300));
    assert_eq!(report.layout.module_count, 21);
    assert_eq!(report.layout.dot_size, 14.0);
    assert_eq!((report.layout.x, report.layout.y), (3.0, 3.0));

    let dark_outside_finders = (0..21)
        .flat_map(|i| (0..21).map(move |j| (i, j)))
        .filter(|&(i, j)| code.is_dark(i, j) && !is_finder_module(i, j, 21))
        .count();
    assert_eq!(report.modules_drawn, dark_outside_finders);
}

#[test]
fn test_finder_regions_contain_only_finder_output() {
    let style = hello_style();
    let code = encode("HELLO", &style.qr).unwrap();
    let mut canvas = Canvas::new(1, 1).unwrap();
    QrRenderer::new(DecoderLoader::new())
        .render_blocking(&code, &style, &mut canvas, None)
        .unwrap();

    for placement in FINDER_PLACEMENTS {
        let (ox, oy) = placement.module_origin(21);
        for di in 0..7 {
            for dj in 0..7 {
                let color = module_center(&canvas, ox + di, oy + dj);
                let ring = di == 0 || di == 6 || dj == 0 || dj == 6;
                let center = (2..=4).contains(&di) && (2..=4).contains(&dj);
                let expected = if ring {
                    BLUE
                } else if center {
                    GREEN
                } else {
                    WHITE
                };
                assert_eq!(color, expected, "finder cell ({}, {})", ox + di, oy + dj);
            }
        }
    }
}

#[test]
fn test_data_modules_follow_the_matrix() {
    let style = hello_style();
    let code = encode("HELLO", &style.qr).unwrap();
    let mut canvas = Canvas::new(1, 1).unwrap();
    QrRenderer::new(DecoderLoader::new())
        .render_blocking(&code, &style, &mut canvas, None)
        .unwrap();

    for i in 0..21 {
        for j in 0..21 {
            if is_finder_module(i, j, 21) {
                continue;
            }
            let expected = if code.is_dark(i, j) { RED } else { WHITE };
            assert_eq!(module_center(&canvas, i, j), expected, "module ({}, {})", i, j);
        }
    }
}

#[test]
fn test_identical_passes_produce_identical_pixels() {
    let mut style = hello_style();
    style.dots.kind = DotType::ClassyRounded;
    let code = encode("HELLO", &style.qr).unwrap();
    let renderer = QrRenderer::new(DecoderLoader::new());

    let mut first = Canvas::new(1, 1).unwrap();
    renderer.render_blocking(&code, &style, &mut first, None).unwrap();
    let mut second = Canvas::new(40, 40).unwrap();
    renderer.render_blocking(&code, &style, &mut second, None).unwrap();

    assert_eq!(first.pixmap().data(), second.pixmap().data());
}

#[test]
fn test_svg_logo_is_centered_over_hidden_modules() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="40"><rect width="40" height="40" fill="#14b414"/></svg>"##;
    let mut style = hello_style();
    style.qr.error_correction_level = ErrorCorrectionLevel::H;
    style.logo = Some(LogoOptions::new(AssetSource::memory("logo.svg", svg.as_bytes().to_vec())));
    let code = encode("HELLO", &style.qr).unwrap();

    let mut canvas = Canvas::new(1, 1).unwrap();
    let report = QrRenderer::new(DecoderLoader::new())
        .render_blocking(&code, &style, &mut canvas, None)
        .unwrap();

    let size = report.logo_size.unwrap();
    assert_eq!(size.hide_x_dots % 2, 1);
    assert_eq!(size.width, size.height);
    assert!(report.hidden.contains(10, 10));
    let center = canvas.pixel(150, 150).unwrap();
    for (got, want) in center.0.iter().zip(GREEN.0) {
        assert!(got.abs_diff(want) <= 2, "logo pixel {:?}", center);
    }
}

#[tokio::test]
async fn test_worker_and_direct_passes_agree() {
    let mut style = hello_style();
    style.dots.kind = DotType::Dots;
    let code = encode("HELLO", &style.qr).unwrap();

    let mut direct = Canvas::new(1, 1).unwrap();
    QrRenderer::new(DecoderLoader::new())
        .render(&code, &style, &mut direct, None)
        .await
        .unwrap();

    let bridge = WorkerBridge::spawn().unwrap();
    let pending = bridge
        .submit(&code, &style, None, Pixmap::new(1, 1).unwrap())
        .unwrap();
    let (surface, outcome) = pending.wait().await.unwrap().into_parts();
    outcome.unwrap();
    assert_eq!(surface.data(), direct.pixmap().data());
}
