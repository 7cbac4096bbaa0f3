//! Tests for PNG encoding and decoding.

use renderer::png::{
    create_png, create_png_auto, create_png_grayscale, decode_grayscale, read_grayscale, GrayImage,
};
use renderer::RenderError;
use test_utils::create_gray_ramp;

#[test]
fn test_grayscale_png_decodes_to_same_pixels() {
    let pixels = create_gray_ramp(256, 3);
    let png = create_png_grayscale(&pixels, 256, 3).unwrap();
    let decoded = decode_grayscale(&png).unwrap();

    assert_eq!((decoded.width, decoded.height), (256, 3));
    assert_eq!(decoded.pixels, pixels);
}

#[test]
fn test_gray_image_encode_and_read_file() {
    let dir = test_utils::temp_test_dir();
    let path = dir.path().join("TMP_2m.png");
    let image = GrayImage::new(3, 2, vec![0, 127, 255, 1, 2, 3]).unwrap();
    std::fs::write(&path, image.encode().unwrap()).unwrap();

    assert_eq!(read_grayscale(&path).unwrap(), image);
}

#[test]
fn test_unit_scaling() {
    let image = GrayImage::new(2, 1, vec![0, 255]).unwrap();
    assert_eq!(image.to_unit_f32(), vec![0.0, 1.0]);
}

#[test]
fn test_indexed_overlay_keeps_transparency() {
    // Transparent background with one white pixel
    let mut pixels = vec![0u8; 4 * 4 * 4];
    pixels[20..24].copy_from_slice(&[255, 255, 255, 255]);
    let png = create_png_auto(&pixels, 4, 4).unwrap();
    assert_eq!(png[25], 3); // indexed

    let rgba = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(rgba.get_pixel(1, 1).0, [255, 255, 255, 255]);
    assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
}

#[test]
fn test_rgba_png_decodes() {
    let mut pixels = Vec::with_capacity(300 * 4);
    for i in 0..300u32 {
        pixels.extend_from_slice(&[(i % 256) as u8, (i / 256) as u8, 7, 255]);
    }
    let png = create_png(&pixels, 300, 1).unwrap();
    let rgba = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(rgba.get_pixel(299, 0).0, [43, 1, 7, 255]);
}

#[test]
fn test_garbage_is_decode_error() {
    assert!(matches!(
        decode_grayscale(b"not a png"),
        Err(RenderError::Decode(_))
    ));
}
