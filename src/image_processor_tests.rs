#[cfg(test)]
mod tests {
    use super::super::*;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
        let img: image::RgbaImage = image::ImageBuffer::from_raw(width, height, rgba).unwrap();
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_new_accepts_matching_buffer() {
        let img = RasterImage::new(3, 2, vec![RGB8::new(1, 2, 3); 6]).unwrap();
        assert_eq!(img.width, 3);
        assert_eq!(img.height, 2);
        assert_eq!(img.pixel_count(), 6);
    }

    #[test]
    fn test_new_rejects_zero_size() {
        let err = RasterImage::new(0, 5, vec![]).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidInput(_)));
    }

    #[test]
    fn test_new_rejects_short_buffer() {
        let err = RasterImage::new(4, 4, vec![RGB8::new(0, 0, 0); 15]).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidInput(_)));
    }

    #[test]
    fn test_from_raw_rgb_packs_channels() {
        let img = RasterImage::from_raw_rgb(2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(img.get(0, 0), Some(RGB8::new(255, 0, 0)));
        assert_eq!(img.get(1, 0), Some(RGB8::new(0, 0, 255)));
    }

    #[test]
    fn test_get_outside_is_none() {
        let img = RasterImage::from_raw_rgb(2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(img.get(2, 0), None);
        assert_eq!(img.get(0, 1), None);
        assert_eq!(img.get(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_from_raw_rgb_rejects_partial_pixel() {
        let err = RasterImage::from_raw_rgb(1, 1, &[1, 2]).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidInput(_)));
    }

    #[test]
    fn test_decode_png_drops_alpha() {
        let bytes = encode_png(2, 2, vec![
            10, 20, 30, 255, 10, 20, 30, 0,
            200, 100, 50, 128, 0, 0, 0, 255,
        ]);
        let img = decode_image(&bytes).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.get(0, 0), Some(RGB8::new(10, 20, 30)));
        assert_eq!(img.get(1, 0), Some(RGB8::new(10, 20, 30)));
        assert_eq!(img.get(0, 1), Some(RGB8::new(200, 100, 50)));
    }

    #[test]
    fn test_decode_garbage_is_decode_failure() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, VectorizeError::DecodeFailure(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_load_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, encode_png(1, 1, vec![7, 8, 9, 255])).unwrap();
        let img = load_image(&path).unwrap();
        assert_eq!(img.pixels, vec![RGB8::new(7, 8, 9)]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = load_image(std::path::Path::new("/nonexistent/missing.png"));
        assert!(result.is_err());
    }
}
