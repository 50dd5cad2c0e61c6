use std::io::Cursor;

use super::*;
use crate::assets::decode::decode_image;

fn solid_source(w: u32, h: u32, rgba: [u8; 4]) -> SourceImage {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    decode_image(&buf).unwrap()
}

#[test]
fn build_reference_has_exact_requested_size() {
    let src = solid_source(40, 30, [10, 20, 30, 255]);
    let reference = build_reference(&src, Size::new(81, 61).unwrap()).unwrap();
    assert_eq!(reference.size(), Size::new(81, 61).unwrap());
}

#[test]
fn build_reference_keeps_solid_color() {
    let src = solid_source(8, 8, [200, 100, 50, 255]);
    let reference = build_reference(&src, Size::new(21, 15).unwrap()).unwrap();
    for p in reference.premul_pixels().pixels() {
        assert_eq!(p.0, [200, 100, 50, 255]);
    }
}

#[test]
fn build_reference_rejects_empty_size() {
    let src = solid_source(4, 4, [0, 0, 0, 255]);
    let err = build_reference(
        &src,
        Size {
            width: 0,
            height: 10,
        },
    )
    .unwrap_err();
    assert!(matches!(err, KenBurnsError::Configuration(_)));
}

#[test]
fn clones_share_pixels() {
    let src = solid_source(4, 4, [1, 2, 3, 255]);
    let a = build_reference(&src, Size::new(5, 5).unwrap()).unwrap();
    let b = a.clone();
    assert!(std::ptr::eq(a.premul_pixels(), b.premul_pixels()));
}
