use std::ffi::OsStr;

use super::*;
use crate::output::artifacts::ArtifactNaming;

fn artifact_set(dir: &Path, count: u32) -> ArtifactSet {
    let naming = ArtifactNaming::new("clip", "png", count).unwrap();
    let paths = (0..count)
        .map(|i| dir.join(naming.file_name(crate::foundation::core::FrameIndex(i))))
        .collect();
    ArtifactSet::new(dir.to_path_buf(), naming, paths)
}

#[test]
fn command_args_follow_image_sequence_layout() {
    let set = artifact_set(Path::new("/tmp/run-abc"), 3);
    let cfg = AssemblyConfig {
        output: PathBuf::from("/tmp/out.mp4"),
        fps: 24,
        overwrite: true,
    };
    let args = FfmpegAssembler::command_args(&set, &cfg);
    let args: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();
    let expected: Vec<&OsStr> = [
        "-y",
        "-loglevel",
        "error",
        "-framerate",
        "24",
        "-start_number",
        "1",
        "-i",
        "/tmp/run-abc/clip-%04d.png",
        "-an",
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
        "/tmp/out.mp4",
    ]
    .into_iter()
    .map(OsStr::new)
    .collect();
    assert_eq!(args, expected);
}

#[test]
fn no_overwrite_uses_dash_n() {
    let set = artifact_set(Path::new("/tmp/run-abc"), 1);
    let mut cfg = AssemblyConfig::new("/tmp/out.mp4");
    cfg.overwrite = false;
    let args = FfmpegAssembler::command_args(&set, &cfg);
    assert_eq!(args[0], OsStr::new("-n"));
}

#[test]
fn zero_fps_is_rejected_before_spawning() {
    let tmp = tempfile::tempdir().unwrap();
    let set = artifact_set(tmp.path(), 2);
    let mut cfg = AssemblyConfig::new(tmp.path().join("out.mp4"));
    cfg.fps = 0;
    let err = FfmpegAssembler::with_program("/nonexistent/ffmpeg")
        .assemble(&set, &cfg)
        .unwrap_err();
    assert!(matches!(err, KenBurnsError::Configuration(_)));
}

#[test]
fn existing_output_without_overwrite_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out.mp4");
    std::fs::write(&out, b"old").unwrap();
    let set = artifact_set(tmp.path(), 2);
    let mut cfg = AssemblyConfig::new(&out);
    cfg.overwrite = false;
    assert!(matches!(
        FfmpegAssembler::new().assemble(&set, &cfg),
        Err(KenBurnsError::Configuration(_))
    ));
    assert_eq!(std::fs::read(&out).unwrap(), b"old");
}

#[test]
fn missing_program_is_an_assembly_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let set = artifact_set(tmp.path(), 2);
    let cfg = AssemblyConfig::new(tmp.path().join("out.mp4"));
    let err = FfmpegAssembler::with_program(tmp.path().join("no-such-ffmpeg"))
        .assemble(&set, &cfg)
        .unwrap_err();
    assert!(matches!(err, KenBurnsError::Assembly { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn empty_artifact_set_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let set = artifact_set(tmp.path(), 0);
    let cfg = AssemblyConfig::new(tmp.path().join("out.mp4"));
    assert!(FfmpegAssembler::new().assemble(&set, &cfg).is_err());
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("a/b/out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(tmp.path().join("a/b").is_dir());
    ensure_parent_dir(Path::new("out.mp4")).unwrap();
}
