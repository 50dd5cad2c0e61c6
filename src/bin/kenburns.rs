use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kenburns::{
    ArtifactFormat, AssemblyConfig, FfmpegAssembler, KenBurnsConfig, KenBurnsError, OverlayConfig,
    ZoomDirection,
};

#[derive(Parser, Debug)]
#[command(name = "kenburns", version, about = "Ken Burns zoom from a single still image")]
struct Cli {
    /// Log debug events (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the frame sequence (and an MP4 with `--out`).
    Render(RunArgs),
    /// Print the zoom geometry as JSON without rendering anything.
    Plan(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON run config; other flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input image.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Directory the run directory is created in.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Number of frames.
    #[arg(long)]
    frames: Option<u32>,

    /// Per-frame zoom factor.
    #[arg(long)]
    factor: Option<f64>,

    #[arg(long, value_enum)]
    direction: Option<ZoomDirection>,

    /// Artifact file prefix.
    #[arg(long)]
    prefix: Option<String>,

    #[arg(long, value_enum)]
    format: Option<ArtifactFormat>,

    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Worker threads (default: all cores).
    #[arg(long)]
    threads: Option<usize>,

    /// Assemble an MP4 at this path (requires `ffmpeg` on PATH).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Video frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Keep the frame artifacts after assembling the video.
    #[arg(long)]
    keep_frames: bool,

    /// Overlay text line; repeat for several lines.
    #[arg(long = "text")]
    text: Vec<String>,

    /// Font file for the overlay.
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long)]
    font_size: Option<f32>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<KenBurnsConfig> {
        let mut cfg = match (&self.config, &self.in_path) {
            (Some(path), _) => KenBurnsConfig::from_json_file(path)
                .with_context(|| format!("load run config '{}'", path.display()))?,
            (None, Some(input)) => KenBurnsConfig::new(input),
            (None, None) => anyhow::bail!("either --in or --config is required"),
        };

        if self.config.is_some()
            && let Some(input) = self.in_path
        {
            cfg.input = input;
        }
        if let Some(v) = self.work_dir {
            cfg.work_dir = Some(v);
        }
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.frames {
            cfg.frame_count = v;
        }
        if let Some(v) = self.factor {
            cfg.zoom_factor = v;
        }
        if let Some(v) = self.direction {
            cfg.direction = v;
        }
        if let Some(v) = self.prefix {
            cfg.artifact_prefix = Some(v);
        }
        if let Some(v) = self.format {
            cfg.format = Some(v);
        }
        if let Some(v) = self.jpeg_quality {
            cfg.jpeg_quality = v;
        }
        if let Some(v) = self.threads {
            cfg.threads = Some(v);
        }
        if let Some(out) = self.out {
            let assemble = cfg.assemble.get_or_insert_with(AssemblyConfig::default);
            assemble.output = out;
        }
        if let Some(fps) = self.fps {
            cfg.assemble.get_or_insert_with(AssemblyConfig::default).fps = fps;
        }
        if self.keep_frames {
            cfg.cleanup = false;
        }

        if !self.text.is_empty() {
            let font = self
                .font
                .or_else(|| cfg.overlay.as_ref().map(|o| o.font.clone()))
                .context("--text requires --font")?;
            let mut overlay = cfg
                .overlay
                .take()
                .unwrap_or_else(|| OverlayConfig::new(Vec::new(), &font));
            overlay.lines = self.text;
            overlay.font = font;
            cfg.overlay = Some(overlay);
        } else if let (Some(font), Some(overlay)) = (self.font, cfg.overlay.as_mut()) {
            overlay.font = font;
        }
        if let (Some(size), Some(overlay)) = (self.font_size, cfg.overlay.as_mut()) {
            overlay.font_size = size;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<KenBurnsError>()
                .map_or(1, KenBurnsError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_render(args: RunArgs) -> anyhow::Result<()> {
    let cfg = args.into_config()?;
    let summary = kenburns::run(&cfg, &FfmpegAssembler::new())?;

    if let Some(dir) = &summary.artifact_dir {
        eprintln!("wrote {} frames to {}", summary.artifact_count, dir.display());
    }
    if let Some(video) = &summary.video {
        eprintln!("wrote {}", video.display());
    }
    Ok(())
}

fn cmd_plan(args: RunArgs) -> anyhow::Result<()> {
    let cfg = args.into_config()?;
    let plan = kenburns::plan(&cfg)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&plan).context("serialize run plan")?
    );
    Ok(())
}
