use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::settings::AssemblyConfig;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::output::artifacts::ArtifactSet;

/// Hands a finished artifact set to a video encoder.
pub trait VideoAssembler {
    fn assemble(&self, artifacts: &ArtifactSet, cfg: &AssemblyConfig) -> KenBurnsResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    is_program_runnable(Path::new("ffmpeg"))
}

fn is_program_runnable(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> KenBurnsResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// [`VideoAssembler`] that runs the system `ffmpeg` binary over the image sequence.
#[derive(Clone, Debug)]
pub struct FfmpegAssembler {
    program: PathBuf,
}

impl Default for FfmpegAssembler {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `ffmpeg` executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list passed to `ffmpeg` for `artifacts`.
    pub fn command_args(artifacts: &ArtifactSet, cfg: &AssemblyConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(20);
        args.push(if cfg.overwrite { "-y" } else { "-n" }.into());
        for a in ["-loglevel", "error", "-framerate"] {
            args.push(a.into());
        }
        args.push(cfg.fps.to_string().into());
        for a in ["-start_number", "1", "-i"] {
            args.push(a.into());
        }
        args.push(artifacts.input_pattern().into_os_string());
        for a in [
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ] {
            args.push(a.into());
        }
        args.push(cfg.output.clone().into_os_string());
        args
    }
}

impl VideoAssembler for FfmpegAssembler {
    #[tracing::instrument(skip_all, fields(output = %cfg.output.display(), frames = artifacts.len()))]
    fn assemble(&self, artifacts: &ArtifactSet, cfg: &AssemblyConfig) -> KenBurnsResult<()> {
        cfg.validate()?;
        if cfg.output.as_os_str().is_empty() {
            return Err(KenBurnsError::configuration("assembly output path must be set"));
        }
        if artifacts.is_empty() {
            return Err(KenBurnsError::configuration(
                "cannot assemble a video from an empty artifact set",
            ));
        }
        if !cfg.overwrite && cfg.output.exists() {
            return Err(KenBurnsError::configuration(format!(
                "output file '{}' already exists",
                cfg.output.display()
            )));
        }
        ensure_parent_dir(&cfg.output)?;

        if !is_program_runnable(&self.program) {
            return Err(KenBurnsError::assembly(
                "not started",
                format!(
                    "'{}' is required for video assembly, but could not be run",
                    self.program.display()
                ),
            ));
        }

        let started = std::time::Instant::now();
        let output = Command::new(&self.program)
            .args(Self::command_args(artifacts, cfg))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| KenBurnsError::assembly("spawn failed", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KenBurnsError::assembly(
                format!("ffmpeg exited with {}", output.status),
                stderr.trim(),
            ));
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assembled video"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
