use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use sketch_normalizer::preprocessing::steps::contours::{self, Strategy};
use sketch_normalizer::preprocessing::steps::load;
use sketch_normalizer::{
    convert, crop_only, rectify_and_crop, ErrorKind, ImageSource, Mode, Pipeline,
    PreprocessError,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn save(img: &RgbImage, dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    img.save(&path).expect("Failed to write fixture");
    path
}

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn open_luma(path: &Path) -> GrayImage {
    image::open(path).expect("Failed to read output").to_luma8()
}

/// White w x h rectangle rotated by `degrees` about the centre of a black canvas
fn rotated_rectangle(rect_w: f32, rect_h: f32, degrees: f32) -> RgbImage {
    let mut img = RgbImage::new(800, 700);
    let (cx, cy) = (400.0_f32, 350.0_f32);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let corners = [
        (-rect_w / 2.0, -rect_h / 2.0),
        (rect_w / 2.0, -rect_h / 2.0),
        (rect_w / 2.0, rect_h / 2.0),
        (-rect_w / 2.0, rect_h / 2.0),
    ]
    .map(|(dx, dy)| {
        Point::new(
            (cx + dx * cos - dy * sin).round() as i32,
            (cy + dx * sin + dy * cos).round() as i32,
        )
    });
    draw_polygon_mut(&mut img, &corners, Rgb([255, 255, 255]));
    img
}

fn assert_upright_white_sheet(output: &GrayImage, expected_ratio: f32) {
    let (w, h) = output.dimensions();
    assert_eq!(w.max(h), 1024);

    let ratio = w as f32 / h as f32;
    assert!(
        (ratio - expected_ratio).abs() / expected_ratio < 0.05,
        "aspect ratio {ratio} vs {expected_ratio}"
    );

    // A residual tilt leaves dark wedges in the corners
    let (dx, dy) = (w / 25, h / 25);
    for (x, y) in [(dx, dy), (w - 1 - dx, dy), (w - 1 - dx, h - 1 - dy), (dx, h - 1 - dy)] {
        let value = output.get_pixel(x, y).0[0];
        assert!(value > 200, "corner ({x}, {y}) is dark: {value}");
    }
}

#[test]
fn test_rectify_straightens_rotated_sheet() {
    let dir = TempDir::new().unwrap();
    let src = save(&rotated_rectangle(400.0, 200.0, 20.0), &dir, "rotated.png");
    let dest = dir.path().join("out.png");

    let written = rectify_and_crop(&src, &dest).unwrap();

    assert_eq!(written, dest);
    assert_upright_white_sheet(&open_luma(&dest), 2.0);
}

#[test]
fn test_rectify_straightens_counter_clockwise_rotation() {
    let dir = TempDir::new().unwrap();
    let src = save(&rotated_rectangle(300.0, 240.0, -12.0), &dir, "rotated.png");
    let dest = dir.path().join("out.jpg");

    rectify_and_crop(&src, &dest).unwrap();

    assert_upright_white_sheet(&open_luma(&dest), 1.25);
}

#[test]
fn test_fallback_threshold_rescues_soft_edges() {
    // Smooth horizontal shading with a 60-level step: too gentle for the
    // Canny thresholds but it straddles the global threshold.
    let img = RgbImage::from_fn(300, 240, |x, y| {
        let base = 70 + (x * 30 / 300) as u8;
        let v = if (60..240).contains(&x) && (50..190).contains(&y) {
            base + 60
        } else {
            base
        };
        Rgb([v, v, v])
    });
    let bytes = png_bytes(&img);

    let loaded = load::apply(ImageSource::from(&bytes)).unwrap();
    let boundary = contours::detect(&loaded.blurred).unwrap();
    assert_eq!(boundary.strategy, Strategy::Threshold);

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.png");
    rectify_and_crop(&bytes, &dest).unwrap();

    let (w, h) = open_luma(&dest).dimensions();
    let ratio = w as f32 / h as f32;
    assert!((ratio - 180.0 / 140.0).abs() < 0.1, "ratio {ratio}");
}

#[test]
fn test_uniform_image_has_no_boundary() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::from_pixel(200, 150, Rgb([128, 128, 128])), &dir, "flat.png");
    let dest = dir.path().join("out.png");

    let err = rectify_and_crop(&src, &dest).unwrap_err();

    assert!(matches!(err, PreprocessError::NoDocumentBoundary));
    assert_eq!(err.kind(), ErrorKind::NoDocumentBoundary);
    assert!(!dest.exists());
}

#[test]
fn test_uniform_bright_image_has_no_boundary() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::from_pixel(200, 150, Rgb([250, 250, 250])), &dir, "flat.png");

    let err = rectify_and_crop(&src, dir.path().join("out.png")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoDocumentBoundary);
}

#[test]
fn test_crop_only_on_black_image_is_empty_content() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::new(200, 150), &dir, "black.png");
    let dest = dir.path().join("out.png");

    let err = crop_only(&src, &dest).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyContent);
    assert!(!dest.exists());
}

#[test]
fn test_crop_only_on_uniform_sheet_keeps_full_frame() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::from_pixel(200, 100, Rgb([250, 250, 250])), &dir, "sheet.png");
    let dest = dir.path().join("out.png");

    crop_only(&src, &dest).unwrap();

    assert_eq!(open_luma(&dest).dimensions(), (1024, 512));
}

#[test]
fn test_largest_contour_dominates_selection() {
    let mut img = RgbImage::new(400, 400);
    // Big, lopsided shape
    draw_polygon_mut(
        &mut img,
        &[
            Point::new(30, 40),
            Point::new(250, 20),
            Point::new(280, 230),
            Point::new(150, 290),
            Point::new(40, 220),
        ],
        Rgb([255, 255, 255]),
    );
    // Small, perfect square
    draw_filled_rect_mut(&mut img, Rect::at(320, 320).of_size(40, 40), Rgb([255, 255, 255]));
    let bytes = png_bytes(&img);

    let loaded = load::apply(ImageSource::from(&bytes)).unwrap();
    let boundary = contours::detect(&loaded.blurred).unwrap();

    let max_x = boundary.polygon.iter().map(|p| p.x).max().unwrap();
    let min_y = boundary.polygon.iter().map(|p| p.y).min().unwrap();
    assert!(max_x < 300, "selected the small square: {:?}", boundary.polygon);
    assert!(min_y < 40);
}

#[test]
fn test_wide_input_is_cropped_to_max_ratio() {
    let dir = TempDir::new().unwrap();
    let img = RgbImage::from_fn(3000, 400, |x, _| {
        let v = 100 + (x % 100) as u8;
        Rgb([v, v, v])
    });
    let src = save(&img, &dir, "panorama.png");
    let dest = dir.path().join("out.webp");

    crop_only(&src, &dest).unwrap();

    let (w, h) = open_luma(&dest).dimensions();
    assert_eq!(w, 1024);
    assert!(w as f64 / h as f64 <= 2.5 + 0.01, "{w}x{h}");
}

#[test]
fn test_failed_run_keeps_existing_destination() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::new(64, 64), &dir, "black.png");
    let dest = dir.path().join("out.png");
    std::fs::write(&dest, b"previous").unwrap();

    assert!(crop_only(&src, &dest).is_err());

    assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
}

#[test]
fn test_unsupported_extension_is_encode_error() {
    let dir = TempDir::new().unwrap();
    let src = save(&RgbImage::from_pixel(64, 64, Rgb([200, 200, 200])), &dir, "in.png");
    let dest = dir.path().join("out.unknown");

    let err = crop_only(&src, &dest).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Encode);
    assert!(!dest.exists());
}

#[test]
fn test_undecodable_source_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.png");

    let err = rectify_and_crop(&b"not an image".to_vec(), &dest).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn test_custom_target_size() {
    let img = RgbImage::from_pixel(300, 200, Rgb([180, 180, 180]));
    let bytes = png_bytes(&img);

    let output = Pipeline::new(Mode::CropOnly)
        .with_config(sketch_normalizer::Config::default().with_target_size(256))
        .process(ImageSource::from(&bytes))
        .unwrap();

    assert_eq!(output.image.dimensions(), (256, 171));
}

#[test]
fn test_convert_reencodes_without_processing() {
    let dir = TempDir::new().unwrap();
    let img = RgbImage::from_fn(37, 23, |x, y| Rgb([x as u8, y as u8, 90]));
    let src = save(&img, &dir, "in.png");
    let dest = dir.path().join("original.jpg");

    convert(&src, &dest).unwrap();

    let decoded = image::open(&dest).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (37, 23));
    assert_eq!(image::ImageFormat::from_path(&dest).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn test_grayscale_input_is_accepted() {
    let dir = TempDir::new().unwrap();
    let gray = GrayImage::from_fn(120, 80, |x, _| Luma([if x < 60 { 40 } else { 220 }]));
    let src = dir.path().join("gray.png");
    gray.save(&src).unwrap();
    let dest = dir.path().join("out.png");

    crop_only(&src, &dest).unwrap();

    assert_eq!(open_luma(&dest).dimensions(), (1024, 683));
}

/// Light paper on a mid-grey desk: no pixel is pure black
fn paper_on_desk() -> RgbImage {
    RgbImage::from_fn(400, 300, |x, y| {
        if (80..320).contains(&x) && (60..240).contains(&y) {
            Rgb([235, 235, 235])
        } else {
            Rgb([90, 90, 90])
        }
    })
}

#[test]
fn test_both_modes_handle_backgrounds_without_black() {
    let dir = TempDir::new().unwrap();
    let img = paper_on_desk();
    assert!(img.pixels().all(|p| p.0.iter().all(|&c| c > 0)));
    let src = save(&img, &dir, "desk.png");

    let cropped = dir.path().join("cropped.png");
    crop_only(&src, &cropped).unwrap();
    assert_eq!(open_luma(&cropped).dimensions(), (1024, 768));

    let rectified = dir.path().join("rectified.png");
    rectify_and_crop(&src, &rectified).unwrap();
    let (w, h) = open_luma(&rectified).dimensions();
    assert_eq!(w, 1024);
    let ratio = w as f32 / h as f32;
    assert!((ratio - 240.0 / 180.0).abs() < 0.07, "ratio {ratio}");
}
