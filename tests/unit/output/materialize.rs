use std::io::Write as _;

use super::*;
use crate::encode::codec::{ArtifactFormat, ImageCodec};
use crate::foundation::core::Size;
use crate::geometry::zoom::{ZoomDirection, ZoomSchedule};
use crate::render::reference::ReferenceImage;

/// Frame `i` is filled with the marker value `i + 1`.
fn marked_frames(count: u32, size: Size) -> Vec<FrameRGBA> {
    (0..count)
        .map(|i| {
            let marker = (i + 1) as u8;
            FrameRGBA::from_raw(
                size,
                [marker, marker, marker, 255].repeat(size.area() as usize),
                true,
            )
            .unwrap()
        })
        .collect()
}

/// Fails every frame whose marker is listed.
struct FailingEncoder {
    fail_on: Vec<u8>,
}

impl FrameEncoder for FailingEncoder {
    fn extension(&self) -> &str {
        "png"
    }

    fn encode(&self, frame: &FrameRGBA) -> KenBurnsResult<Vec<u8>> {
        if self.fail_on.contains(&frame.data[0]) {
            return Err(KenBurnsError::encode("injected failure"));
        }
        ImageCodec::new(ArtifactFormat::Png).encode(frame)
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn writes_every_frame_under_its_one_based_name() {
    let tmp = tempfile::tempdir().unwrap();
    let size = Size::new(8, 6).unwrap();
    let frames = marked_frames(10, size);
    let naming = ArtifactNaming::new("frame", "png", 10).unwrap();
    let pool = build_thread_pool(Some(4)).unwrap();

    let set = materialize_all(
        &frames,
        tmp.path(),
        &naming,
        &ImageCodec::new(ArtifactFormat::Png),
        &pool,
    )
    .unwrap();

    assert_eq!(set.len(), 10);
    let expected: Vec<String> = (1..=10).map(|n| format!("frame-{n:04}.png")).collect();
    assert_eq!(files_in(tmp.path()), expected);

    // Artifact k holds frame k - 1.
    for (i, path) in set.paths().iter().enumerate() {
        let img = image::open(path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.get_pixel(0, 0).0[0], (i + 1) as u8);
    }
}

#[test]
fn failing_frame_aborts_batch_and_removes_partial_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = marked_frames(10, Size::new(4, 4).unwrap());
    let naming = ArtifactNaming::new("frame", "png", 10).unwrap();
    let pool = build_thread_pool(Some(3)).unwrap();
    let encoder = FailingEncoder { fail_on: vec![7] };

    let err = materialize_all(&frames, tmp.path(), &naming, &encoder, &pool).unwrap_err();
    assert_eq!(err.frame_index(), Some(7));
    assert!(err.to_string().contains("frame-0007.png"), "{err}");
    assert!(files_in(tmp.path()).is_empty());
}

#[test]
fn collecting_variant_reports_all_failures_in_frame_order() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = marked_frames(6, Size::new(4, 4).unwrap());
    let naming = ArtifactNaming::new("frame", "png", 6).unwrap();
    let pool = build_thread_pool(Some(2)).unwrap();
    let encoder = FailingEncoder {
        fail_on: vec![5, 2],
    };

    let failures =
        materialize_all_collecting(&frames, tmp.path(), &naming, &encoder, &pool).unwrap_err();
    let indices: Vec<Option<u32>> = failures.iter().map(KenBurnsError::frame_index).collect();
    assert_eq!(indices, vec![Some(2), Some(5)]);
    assert!(files_in(tmp.path()).is_empty());
}

#[test]
fn existing_artifact_is_never_overwritten() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = marked_frames(3, Size::new(4, 4).unwrap());
    let naming = ArtifactNaming::new("frame", "png", 3).unwrap();
    std::fs::write(tmp.path().join("frame-0002.png"), b"keep").unwrap();
    let pool = build_thread_pool(Some(2)).unwrap();

    let err = materialize_all(
        &frames,
        tmp.path(),
        &naming,
        &ImageCodec::new(ArtifactFormat::Png),
        &pool,
    )
    .unwrap_err();
    assert_eq!(err.frame_index(), Some(2));
    assert_eq!(files_in(tmp.path()), vec!["frame-0002.png".to_string()]);
    assert_eq!(std::fs::read(tmp.path().join("frame-0002.png")).unwrap(), b"keep");
}

/// Accepts `budget` bytes, then fails the way a full disk does.
struct ShortWriter {
    inner: std::fs::File,
    budget: usize,
}

impl std::io::Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.budget == 0 {
            return Err(std::io::Error::other("no space left on device"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn short_write_removes_the_truncated_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("frame-0001.png");
    let out = ShortWriter {
        inner: std::fs::File::create_new(&path).unwrap(),
        budget: 10,
    };

    let err = fill_artifact(&path, out, &[7u8; 64], |_| Ok(())).unwrap_err();
    assert_eq!(err.to_string(), "no space left on device");
    assert!(!path.exists());
}

#[test]
fn failed_sync_removes_the_written_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("frame-0001.png");
    let out = std::fs::File::create_new(&path).unwrap();

    let err = fill_artifact(&path, out, b"complete", |_| {
        Err(std::io::Error::other("sync failed"))
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "sync failed");
    assert!(files_in(tmp.path()).is_empty());
}

#[test]
fn successful_fill_leaves_the_full_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("frame-0001.png");
    let out = std::fs::File::create_new(&path).unwrap();

    fill_artifact(&path, out, b"complete", |f| f.sync_all()).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"complete");
}

#[test]
fn missing_directory_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let frames = marked_frames(1, Size::new(2, 2).unwrap());
    let naming = ArtifactNaming::new("frame", "png", 1).unwrap();
    let pool = build_thread_pool(Some(1)).unwrap();

    let err = materialize_all(
        &frames,
        &tmp.path().join("missing"),
        &naming,
        &ImageCodec::new(ArtifactFormat::Png),
        &pool,
    )
    .unwrap_err();
    assert!(matches!(err, KenBurnsError::Configuration(_)));
}

#[test]
fn zero_threads_is_rejected() {
    assert!(matches!(
        build_thread_pool(Some(0)),
        Err(KenBurnsError::Configuration(_))
    ));
    assert_eq!(build_thread_pool(Some(2)).unwrap().current_num_threads(), 2);
}

#[test]
fn fused_path_matches_materializing_presynthesized_frames() {
    let out = Size::new(24, 16).unwrap();
    let schedule = ZoomSchedule::new(out, 0.03, 8, ZoomDirection::In).unwrap();
    let r = schedule.reference();
    let img = image::RgbaImage::from_fn(r.width, r.height, |x, y| {
        image::Rgba([(x * 7) as u8, (y * 11) as u8, (x + y) as u8, 255])
    });
    let reference = ReferenceImage::from_premul_pixels(img).unwrap();
    let synth = FrameSynthesizer::new(&reference, &schedule, None).unwrap();
    let codec = ImageCodec::new(ArtifactFormat::Png);
    let naming = ArtifactNaming::new("zoom", "png", 8).unwrap();
    let pool = build_thread_pool(Some(4)).unwrap();

    let fused_dir = tempfile::tempdir().unwrap();
    let fused = render_and_materialize(&synth, fused_dir.path(), &naming, &codec, &pool).unwrap();

    let frames: Vec<FrameRGBA> = (0..8)
        .map(|i| synth.synthesize(FrameIndex(i), None).unwrap())
        .collect();
    let staged_dir = tempfile::tempdir().unwrap();
    let staged = materialize_all(&frames, staged_dir.path(), &naming, &codec, &pool).unwrap();

    assert_eq!(fused.len(), 8);
    for (a, b) in fused.paths().iter().zip(staged.paths()) {
        assert_eq!(a.file_name(), b.file_name());
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}
