//! Handlers for the generation subcommands.

use std::path::{Path, PathBuf};

use crate::config::KeyRotorConfig;
use crate::error::{KeyRotorError, Result};
use crate::generation::Generator;
use crate::types::{EditRequest, ImageRequest, InlineImage, TextRequest, VideoRequest};

use super::{Cli, Commands, EditArgs, ImageArgs, TextArgs, VideoArgs};

/// Load configuration and dispatch one command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = KeyRotorConfig::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => KeyRotorConfig::load()?,
    };
    let generator = config.generator()?;
    let job = cli.job;

    match cli.command {
        Commands::Image(args) => handle_image(&generator, args, job).await,
        Commands::Edit(args) => handle_edit(&generator, args, job).await,
        Commands::Video(args) => handle_video(&generator, args, job).await,
        Commands::Text(args) => handle_text(&generator, args, job).await,
        Commands::Enhance(args) => {
            println!("{}", generator.enhance_prompt(&args.prompt).await?);
            Ok(())
        }
    }
}

async fn handle_image(generator: &Generator, args: ImageArgs, job: Option<String>) -> Result<()> {
    let request = ImageRequest::builder()
        .prompt(args.prompt)
        .aspect_ratio(args.aspect_ratio)
        .count(args.count)
        .maybe_job_id(job)
        .build();
    let result = generator.generate_image(&request).await?;
    if result.fell_back {
        eprintln!("Served by fallback model {}", result.model);
    }
    write_images(&result.images, args.out.as_deref())
}

async fn handle_edit(generator: &Generator, args: EditArgs, job: Option<String>) -> Result<()> {
    let references = args
        .references
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<Vec<_>>>()?;
    let mask = args.mask.as_deref().map(load_image).transpose()?;
    let request = EditRequest::builder()
        .prompt(args.prompt)
        .references(references)
        .maybe_mask(mask)
        .maybe_aspect_ratio(args.aspect_ratio)
        .maybe_job_id(job)
        .build();
    let result = generator.edit_image(&request).await?;
    if let Some(text) = &result.text {
        eprintln!("{text}");
    }
    write_images(&result.images, args.out.as_deref())
}

async fn handle_video(generator: &Generator, args: VideoArgs, job: Option<String>) -> Result<()> {
    let image = args.image.as_deref().map(load_image).transpose()?;
    let request = VideoRequest::builder()
        .prompt(args.prompt)
        .maybe_image(image)
        .aspect_ratio(args.aspect_ratio)
        .maybe_negative_prompt(args.negative_prompt)
        .maybe_job_id(job)
        .build();
    let video = generator.generate_video(&request).await?;
    let path = args.out.unwrap_or_else(|| default_output("mp4"));
    std::fs::write(&path, &video.bytes)?;
    println!("{}", path.display());
    Ok(())
}

async fn handle_text(generator: &Generator, args: TextArgs, job: Option<String>) -> Result<()> {
    let images = args
        .images
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<Vec<_>>>()?;
    let request = TextRequest::builder()
        .prompt(args.prompt)
        .maybe_system(args.system)
        .images(images)
        .maybe_temperature(args.temperature)
        .maybe_job_id(job)
        .build();
    println!("{}", generator.generate_text(&request).await?);
    Ok(())
}

fn write_images(images: &[InlineImage], out: Option<&Path>) -> Result<()> {
    for (index, image) in images.iter().enumerate() {
        let bytes = image
            .decode()
            .map_err(|e| KeyRotorError::InvalidArgument(format!("undecodable image data: {e}")))?;
        let path = match out {
            Some(path) if images.len() == 1 => path.to_path_buf(),
            Some(path) => numbered(path, index + 1),
            None => default_output(image.extension()),
        };
        std::fs::write(&path, bytes)?;
        println!("{}", path.display());
    }
    Ok(())
}

fn default_output(extension: &str) -> PathBuf {
    PathBuf::from(format!("keyrotor-{}.{extension}", uuid::Uuid::new_v4()))
}

fn numbered(path: &Path, index: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}-{index}.{ext}"),
        None => format!("{stem}-{index}"),
    };
    path.with_file_name(name)
}

fn load_image(path: &Path) -> Result<InlineImage> {
    let mime_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => {
            return Err(KeyRotorError::InvalidArgument(format!(
                "unsupported image type: {}",
                path.display()
            )))
        }
    };
    Ok(InlineImage::from_bytes(mime_type, &std::fs::read(path)?))
}
