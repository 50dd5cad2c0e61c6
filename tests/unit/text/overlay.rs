use super::*;
use crate::foundation::core::Size;

const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/fonts/DejaVuSans.ttf");

fn spec(lines: &[&str], font_bytes: Vec<u8>) -> TextOverlaySpec {
    TextOverlaySpec {
        lines: lines.iter().map(|s| s.to_string()).collect(),
        font_bytes: Arc::new(font_bytes),
        font_size: 20.0,
        line_spacing: 1.5,
        color: Rgba8::WHITE,
        origin: Point::new(4.0, 6.0),
    }
}

fn black_frame(w: u32, h: u32) -> FrameRGBA {
    let size = Size::new(w, h).unwrap();
    let data = [0u8, 0, 0, 255].repeat((w * h) as usize);
    FrameRGBA::from_raw(size, data, true).unwrap()
}

#[derive(Default)]
struct RecordingRasterizer {
    origins: Vec<(String, Point)>,
    fail_on: Option<String>,
}

impl TextRasterizer for RecordingRasterizer {
    fn draw_line(&mut self, _dst: &mut FrameRGBA, origin: Point, text: &str) -> KenBurnsResult<Point> {
        if self.fail_on.as_deref() == Some(text) {
            return Err(KenBurnsError::render("missing glyph"));
        }
        self.origins.push((text.to_string(), origin));
        Ok(Point::new(origin.x + 10.0, origin.y))
    }
}

#[test]
fn apply_overlay_advances_by_size_times_spacing() {
    let s = spec(&["one", "two", "three"], vec![1]);
    let mut frame = black_frame(8, 8);
    let mut r = RecordingRasterizer::default();
    apply_overlay(&mut frame, &s, &mut r).unwrap();

    let ys: Vec<f64> = r.origins.iter().map(|(_, p)| p.y).collect();
    assert_eq!(ys, vec![6.0, 36.0, 66.0]);
    assert!(r.origins.iter().all(|(_, p)| p.x == 4.0));
}

#[test]
fn apply_overlay_fails_hard_on_any_line() {
    let s = spec(&["ok", "bad", "never"], vec![1]);
    let mut frame = black_frame(8, 8);
    let mut r = RecordingRasterizer {
        fail_on: Some("bad".to_string()),
        ..Default::default()
    };
    let err = apply_overlay(&mut frame, &s, &mut r).unwrap_err();
    assert!(matches!(err, KenBurnsError::Render(ref m) if m.contains("line 1")));
    assert_eq!(r.origins.len(), 1);
}

#[test]
fn validate_rejects_bad_sizes() {
    let mut s = spec(&["x"], vec![1]);
    s.font_size = 0.0;
    assert!(s.validate().is_err());

    let mut s = spec(&["x"], vec![1]);
    s.line_spacing = f32::NAN;
    assert!(s.validate().is_err());

    let s = spec(&["x"], Vec::new());
    assert!(s.validate().is_err());
}

#[test]
fn parley_rasterizer_rejects_garbage_font() {
    let s = spec(&["x"], b"definitely not a font".to_vec());
    assert!(matches!(
        ParleyRasterizer::new(&s),
        Err(KenBurnsError::Render(_))
    ));
}

#[test]
fn parley_rasterizer_paints_text_deterministically() {
    let s = spec(&["Ken Burns"], std::fs::read(FONT_PATH).unwrap());
    let mut r = ParleyRasterizer::new(&s).unwrap();
    assert!(!r.family_name().trim().is_empty());

    let mut a = black_frame(160, 48);
    let end = r.draw_line(&mut a, s.origin, "Ken Burns").unwrap();
    assert!(end.x > s.origin.x);
    assert_eq!(end.y, s.origin.y);
    assert!(a.data.chunks_exact(4).any(|px| px[0] > 0));
    assert!(a.data.chunks_exact(4).all(|px| px[3] == 255));

    let mut b = black_frame(160, 48);
    r.draw_line(&mut b, s.origin, "Ken Burns").unwrap();
    assert_eq!(a, b);
}

#[test]
fn parley_rasterizer_skips_empty_lines() {
    let s = spec(&[""], std::fs::read(FONT_PATH).unwrap());
    let mut r = ParleyRasterizer::new(&s).unwrap();
    let mut frame = black_frame(16, 16);
    let before = frame.clone();
    let end = r.draw_line(&mut frame, s.origin, "").unwrap();
    assert_eq!(end, s.origin);
    assert_eq!(frame, before);
}
