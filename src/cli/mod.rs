//! CLI entry point for keyrotor.

pub mod generate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::AspectRatio;

/// Generate images, video and text across a rotating pool of API keys.
#[derive(Parser, Debug)]
#[command(name = "keyrotor", version, about = "Key-rotating generation client")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Job id to link each leased key to
    #[arg(long, global = true)]
    pub job: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Text-to-image with billing fallback
    Image(ImageArgs),
    /// Edit or compose images
    Edit(EditArgs),
    /// Text- or image-to-video
    Video(VideoArgs),
    /// Free-form text generation
    Text(TextArgs),
    /// Rewrite a short prompt into a detailed one
    Enhance(EnhanceArgs),
}

/// Arguments for `keyrotor image`.
#[derive(Parser, Debug)]
pub struct ImageArgs {
    pub prompt: String,

    /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)
    #[arg(short, long, default_value = "1:1")]
    pub aspect_ratio: AspectRatio,

    /// Number of images
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,

    /// Output file; numbered when more than one image comes back
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `keyrotor edit`.
#[derive(Parser, Debug)]
pub struct EditArgs {
    pub prompt: String,

    /// Reference image (repeatable)
    #[arg(short, long = "reference")]
    pub references: Vec<PathBuf>,

    /// Mask image; white marks the region to change
    #[arg(short, long)]
    pub mask: Option<PathBuf>,

    #[arg(short, long)]
    pub aspect_ratio: Option<AspectRatio>,

    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `keyrotor video`.
#[derive(Parser, Debug)]
pub struct VideoArgs {
    pub prompt: String,

    /// First frame
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    #[arg(short, long, default_value = "16:9")]
    pub aspect_ratio: AspectRatio,

    #[arg(long)]
    pub negative_prompt: Option<String>,

    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `keyrotor text`.
#[derive(Parser, Debug)]
pub struct TextArgs {
    pub prompt: String,

    /// System instruction
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Image to attach (repeatable)
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,
}

/// Arguments for `keyrotor enhance`.
#[derive(Parser, Debug)]
pub struct EnhanceArgs {
    pub prompt: String,
}
