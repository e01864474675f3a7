//! Command-line arguments.
//!
//! CLI mode runs a single job against pre-rendered frames on disk; daemon
//! mode serves JSON-RPC over stdio. Flags override `INBETWEEN_*` variables.

use std::path::PathBuf;

use clap::Parser;

use crate::config::InbetweenConfig;

/// Default file name of the project manifest.
pub const DEFAULT_MANIFEST: &str = "timeline.json";

/// inbetween-daemon: generate in-between frames and place them on a timeline
#[derive(Parser, Debug)]
#[command(name = "inbetween-daemon")]
#[command(about = "Generates in-between frames from two keyframes and inserts them into a timeline")]
#[command(version)]
pub struct Cli {
    /// Text prompt describing the motion between the keyframes
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// First keyframe; generated frames are inserted from here
    #[arg(short, long, allow_hyphen_values = true)]
    pub start: Option<i32>,

    /// Second keyframe
    #[arg(short, long, allow_hyphen_values = true)]
    pub end: Option<i32>,

    /// Directory holding pre-rendered frames named 0001.png, 0002.png, ...
    #[arg(short, long)]
    pub frames_dir: Option<PathBuf>,

    /// Base directory for generated frames
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Project manifest holding the timeline (default: <frames-dir>/timeline.json)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// API key for the hosted model
    #[arg(long, conflicts_with = "local_address")]
    pub api_key: Option<String>,

    /// Use a local server at this address instead of the hosted model
    #[arg(long)]
    pub local_address: Option<String>,

    /// DDIM eta (0-1)
    #[arg(long)]
    pub eta: Option<f32>,

    /// Classifier-free guidance scale (1-15)
    #[arg(long)]
    pub cfg_scale: Option<f32>,

    /// Number of sampling steps
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub steps: Option<u32>,

    /// Frame stride passed to the model
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=30))]
    pub frame_stride: Option<u32>,

    /// Requested output width in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(64..=5000))]
    pub width: Option<u32>,

    /// Requested output height in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(64..=5000))]
    pub height: Option<u32>,

    /// Run in daemon mode (JSON-RPC over stdio)
    #[arg(long)]
    pub daemon: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running in CLI mode (not daemon mode).
    pub fn is_cli_mode(&self) -> bool {
        !self.daemon && (self.prompt.is_some() || self.frames_dir.is_some())
    }

    /// Returns true if running in daemon mode.
    pub fn is_daemon_mode(&self) -> bool {
        self.daemon
    }

    /// Returns the frames directory, defaulting to the current directory.
    pub fn frames_directory(&self) -> PathBuf {
        self.frames_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns the manifest path, defaulting to `timeline.json` in the frames directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.frames_directory().join(DEFAULT_MANIFEST))
    }

    /// Applies every given flag on top of `config`.
    pub fn apply_to(&self, config: &mut InbetweenConfig) {
        if let Some(ref key) = self.api_key {
            config.use_hosted_model = true;
            config.api_key = key.clone();
        }
        if let Some(ref address) = self.local_address {
            config.use_hosted_model = false;
            config.local_address = address.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = Some(dir.clone());
        }

        let generation = &mut config.generation;
        if let Some(ref prompt) = self.prompt {
            generation.prompt = prompt.clone();
        }
        if let Some(start) = self.start {
            generation.start_frame = start;
        }
        if let Some(end) = self.end {
            generation.end_frame = end;
        }
        if let Some(eta) = self.eta {
            generation.eta = eta;
        }
        if let Some(cfg_scale) = self.cfg_scale {
            generation.cfg_scale = cfg_scale;
        }
        if let Some(steps) = self.steps {
            generation.sampling_steps = steps;
        }
        if let Some(stride) = self.frame_stride {
            generation.frame_stride = stride;
        }
        if let Some(width) = self.width {
            generation.width = width;
        }
        if let Some(height) = self.height {
            generation.height = height;
        }
    }
}
