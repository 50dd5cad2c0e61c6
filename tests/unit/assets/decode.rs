use std::io::Cursor;

use super::*;

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
    let src = decode_image(&png_bytes(img)).unwrap();

    assert_eq!(src.size(), Size::new(1, 1).unwrap());
    assert_eq!(src.format(), Some(image::ImageFormat::Png));
    assert_eq!(
        src.premul_pixel(0, 0).unwrap(),
        [
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
    assert_eq!(src.premul_pixel(1, 0), None);
}

#[test]
fn decode_rejects_empty_and_corrupt_bytes() {
    assert!(matches!(decode_image(&[]), Err(KenBurnsError::Decode(_))));

    let mut truncated = png_bytes(image::RgbaImage::new(4, 4));
    truncated.truncate(20);
    assert!(matches!(
        decode_image(&truncated),
        Err(KenBurnsError::Decode(_))
    ));
}

#[test]
fn load_source_reports_missing_file() {
    let err = load_source(Path::new("does/not/exist.png")).unwrap_err();
    assert!(err.to_string().contains("does/not/exist.png"));
}
