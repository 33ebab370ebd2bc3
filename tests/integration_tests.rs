// Integration tests for layertrace
use layertrace::vectorizer::vectorize;
use layertrace::{
    convert, convert_bytes, load_image, PathCommand, VectorizeError, VectorizeOptions, Winding,
};
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn pattern_pixels(width: u32, height: u32, pattern: &str) -> Vec<u8> {
    let mut pixel_data: Vec<u8> = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = match pattern {
                "checkerboard" => {
                    let size = 10;
                    let is_white = ((x / size) + (y / size)) % 2 == 0;
                    if is_white { (255, 255, 255) } else { (0, 0, 0) }
                }
                "circle" => {
                    let cx = width as f64 / 2.0;
                    let cy = height as f64 / 2.0;
                    let radius = width.min(height) as f64 / 4.0;
                    let dx = x as f64 + 0.5 - cx;
                    let dy = y as f64 + 0.5 - cy;
                    if dx * dx + dy * dy <= radius * radius {
                        (255, 0, 0)
                    } else {
                        (255, 255, 255)
                    }
                }
                "frame" => {
                    let inside = (width / 4..width * 3 / 4).contains(&x)
                        && (height / 4..height * 3 / 4).contains(&y);
                    if inside { (255, 255, 255) } else { (0, 0, 0) }
                }
                "bands" => match y * 3 / height {
                    0 => (250, 0, 0),
                    1 => (0, 250, 0),
                    _ => (0, 0, 250),
                },
                _ => (255, 0, 0),
            };
            pixel_data.extend_from_slice(&[r, g, b, 255]);
        }
    }
    pixel_data
}

fn create_test_png(path: &Path, width: u32, height: u32, pattern: &str) {
    let img: image::RgbaImage =
        image::ImageBuffer::from_raw(width, height, pattern_pixels(width, height, pattern)).unwrap();
    img.save(path).expect("Failed to save test image");
}

fn png_bytes(width: u32, height: u32, pattern: &str) -> Vec<u8> {
    let img: image::RgbaImage =
        image::ImageBuffer::from_raw(width, height, pattern_pixels(width, height, pattern)).unwrap();
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn options(num_colors: usize) -> VectorizeOptions {
    VectorizeOptions {
        num_colors,
        ..Default::default()
    }
}

#[test]
fn test_solid_red_end_to_end() {
    let svg = convert_bytes(&png_bytes(4, 4, "solid"), &options(1)).unwrap();
    assert!(svg.contains(r#"width="4""#));
    assert!(svg.contains(r#"height="4""#));
    assert!(svg.contains(r#"viewBox="0 0 4 4""#));
    assert_eq!(svg.matches("<path").count(), 1);
    assert!(svg.contains(r##"fill="#ff0000""##));
    assert!(svg.contains(r#"d="M 0.00,0.00 L 4.00,0.00 L 4.00,4.00 L 0.00,4.00 Z""#));
}

#[test]
fn test_convert_writes_svg_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("frame.png");
    let output = dir.path().join("frame.svg");
    create_test_png(&input, 20, 20, "frame");

    let data = convert(&input, &output, &options(2)).unwrap();
    assert!(output.exists());

    let svg = fs::read_to_string(&output).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert_eq!(svg.matches("<path").count(), data.layers.len());
}

#[test]
fn test_frame_hole_runs_against_outer() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("frame.png");
    create_test_png(&input, 20, 20, "frame");

    let image = load_image(&input).unwrap();
    let data = vectorize(&image, &options(2)).unwrap();
    assert_eq!(data.palette.hex_codes(), vec!["#000000", "#ffffff"]);

    let frame = &data.layers[0];
    assert_eq!(frame.pixel_count, 300);
    assert_eq!(frame.paths.len(), 1);
    assert_eq!(
        frame.paths[0].windings(),
        vec![Winding::Clockwise, Winding::CounterClockwise]
    );
}

#[test]
fn test_layers_sorted_by_pixel_count() {
    let data = vectorize(&load_png(60, 30, "circle"), &options(2)).unwrap();
    assert_eq!(data.layers.len(), 2);
    assert_eq!(data.layers[0].hex(), "#ffffff");
    assert_eq!(data.layers[1].hex(), "#ff0000");
    assert!(data.layers[0].pixel_count > data.layers[1].pixel_count);

    let svg = data.to_svg();
    let white = svg.find("#ffffff").unwrap();
    let red = svg.find("#ff0000").unwrap();
    assert!(white < red);
}

#[test]
fn test_circle_traced_with_curves() {
    let data = vectorize(&load_png(64, 64, "circle"), &options(2)).unwrap();
    let red = data.layers.iter().find(|l| l.hex() == "#ff0000").unwrap();
    assert_eq!(red.paths.len(), 1);
    assert!(red.paths[0].curve_count() > 0);

    let white = data.layers.iter().find(|l| l.hex() == "#ffffff").unwrap();
    assert_eq!(white.paths[0].subpath_count(), 2);
}

#[test]
fn test_checkerboard_subpaths_closed() {
    let data = vectorize(&load_png(40, 40, "checkerboard"), &options(2)).unwrap();
    assert_eq!(data.layers.len(), 2);
    for layer in &data.layers {
        for path in &layer.paths {
            for sub in path.subpaths() {
                assert!(matches!(sub.first(), Some(PathCommand::MoveTo(_))));
                assert_eq!(sub.last(), Some(&PathCommand::Close));
            }
        }
    }
}

#[test]
fn test_seeded_runs_match() {
    let bytes = png_bytes(30, 30, "bands");
    let opts = options(3);
    assert_eq!(
        convert_bytes(&bytes, &opts).unwrap(),
        convert_bytes(&bytes, &opts).unwrap()
    );
}

#[test]
fn test_report_serializes() {
    let data = vectorize(&load_png(30, 30, "bands"), &options(3)).unwrap();
    let json = serde_json::to_value(data.report()).unwrap();
    assert_eq!(json["width"], 30);
    assert_eq!(json["layers"].as_array().unwrap().len(), 3);
    assert_eq!(json["skipped_layers"], 0);
}

#[test]
fn test_garbage_bytes_fail_to_decode() {
    let err = convert_bytes(b"not an image", &options(2)).unwrap_err();
    assert!(matches!(err, VectorizeError::DecodeFailure(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert(
        &dir.path().join("nope.png"),
        &dir.path().join("nope.svg"),
        &options(2),
    )
    .unwrap_err();
    assert!(matches!(err, VectorizeError::Io(_) | VectorizeError::DecodeFailure(_)));
}

fn load_png(width: u32, height: u32, pattern: &str) -> layertrace::RasterImage {
    layertrace::decode_image(&png_bytes(width, height, pattern)).unwrap()
}
