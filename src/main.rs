use blushbooth::capture::{CaptureSession, Facing, StillFrameDevice, run_booth};
use blushbooth::config::{self, BoothConfig};
use blushbooth::enhance::{Enhancer, GeminiEnhancer};
use blushbooth::imaging::{self, RenderRequest};
use blushbooth::preview::PreviewScheduler;
use blushbooth::store::{KvStore, PhotoStore, migrate_legacy};
use blushbooth::studio::{EditSession, Studio, write_download};
use blushbooth::types::{AiPreset, BorderPattern, CaptureMode, FilterSettings, FilterType, TemplateType};
use blushbooth::{logging, output};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "blushbooth")]
#[command(about = "Photo booth compositor: strips, polaroids and frames with filters and AI styles")]
#[command(long_about = "\
Photo booth compositor: strips, polaroids and frames with filters and AI styles

Layouts:
  polaroid      one photo on a white card with the date underneath
  strip         photos stacked vertically on a patterned paper strip
  square_frame  one photo centred in a 50px frame
  none          the photo as is, or a 2x2 grid for four shots

Border patterns (strips): hearts, stars, dots, checker, striped, floral
AI presets: glow, bollywood, retro_anime, vintage_noir, cyber

Run 'blushbooth gen-config' to generate a documented blushbooth.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Data directory (overrides storage.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Look of the composed image.
#[derive(Args, Clone)]
struct StyleArgs {
    /// Layout: none, polaroid, strip, square_frame (default: by shot count)
    #[arg(long)]
    template: Option<TemplateType>,
    /// Border pattern drawn under the photos
    #[arg(long, default_value = "none")]
    pattern: BorderPattern,
    /// Named filter: normal, grayscale, sepia, warm, cool, vintage
    #[arg(long, default_value = "normal")]
    filter: FilterType,
    /// -50..50
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    brightness: i32,
    /// -50..50
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    contrast: i32,
    /// 0..5 px
    #[arg(long, default_value_t = 0)]
    blur: i32,
    /// 0..50
    #[arg(long, default_value_t = 0)]
    grain: i32,
}

impl StyleArgs {
    fn settings(&self) -> FilterSettings {
        FilterSettings::new(
            self.brightness,
            self.contrast,
            self.blur,
            self.grain,
            self.filter,
        )
    }
}

#[derive(Subcommand)]
enum Command {
    /// Compose image files into one PNG
    Compose {
        /// Source images, in layout order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        style: StyleArgs,
        /// Base size in pixels (default: render.final_size)
        #[arg(long)]
        size: Option<u32>,
        /// Leave off the watermark
        #[arg(long)]
        no_watermark: bool,
        /// Fix the grain noise for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Output file
        #[arg(short, long, default_value = "blushbooth.png")]
        out: PathBuf,
    },
    /// Run a booth session from still frames, then edit, save and download
    Booth {
        /// Frames served as the camera feed
        #[arg(long = "frame", required = true)]
        frames: Vec<PathBuf>,
        /// Shots per run: 1, 3 or 4 (default: capture.mode)
        #[arg(long)]
        mode: Option<CaptureMode>,
        /// Countdown seconds: 3, 5 or 10 (default: capture.timer)
        #[arg(long)]
        timer: Option<u32>,
        /// No beeps
        #[arg(long)]
        muted: bool,
        /// Use the back camera (snapshots are not mirrored)
        #[arg(long)]
        back_camera: bool,
        #[command(flatten)]
        style: StyleArgs,
        /// AI preset applied before saving
        #[arg(long, default_value = "none")]
        preset: AiPreset,
        /// Also write the live-preview render
        #[arg(long)]
        preview: bool,
        /// Download directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Don't keep the result in the gallery
        #[arg(long)]
        no_save: bool,
    },
    /// Restyle one image with an AI preset
    Enhance {
        image: PathBuf,
        #[arg(long)]
        preset: AiPreset,
        #[arg(short, long, default_value = "blushbooth-enhanced.png")]
        out: PathBuf,
    },
    /// Browse saved photos
    #[command(subcommand)]
    Gallery(GalleryCommand),
    /// Import photos from the legacy key-value store
    Migrate,
    /// Print a stock blushbooth.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List saved photos, newest first
    List,
    /// Show one photo's details
    Show { id: String },
    /// Delete a photo
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Write a photo as blushbooth-<id>.png
    Export {
        id: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config_file(&cli.config)?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    logging::init_logging(&config.logging);

    match cli.command {
        Command::Compose {
            images,
            style,
            size,
            no_watermark,
            seed,
            out,
        } => {
            let sources = imaging::open_all(&images)?;
            let template = style
                .template
                .unwrap_or_else(|| TemplateType::default_for(sources.len()));
            let size = size.unwrap_or(config.render.final_size);
            let mut request =
                RenderRequest::new(style.settings(), template, style.pattern, size, size)
                    .with_watermark(config.render.watermark && !no_watermark);
            request.grain_seed = seed;
            let composed = imaging::compose(&sources, &request);
            if composed.is_empty() {
                return Err("composition produced no image".into());
            }
            std::fs::write(&out, &composed.png)?;
            println!("{}", output::format_composed(&composed, &out));
        }
        Command::Booth {
            frames,
            mode,
            timer,
            muted,
            back_camera,
            style,
            preset,
            preview,
            out_dir,
            no_save,
        } => {
            let device = StillFrameDevice::from_paths(&frames)?;
            let facing = if back_camera {
                Facing::Environment
            } else {
                config.capture.facing
            };
            let mut session = CaptureSession::open(device, facing)?;
            session.set_timer(timer.unwrap_or(config.capture.timer))?;
            session.set_muted(muted || config.capture.muted);

            let mode = mode.unwrap_or(config.capture.mode);
            let result = run_booth(&mut session, mode, style.pattern, |step| {
                if let Some(line) = output::format_step(step) {
                    println!("{line}");
                }
            })
            .await?;
            drop(session);

            let mut edit = EditSession::new(result.shots, result.pattern);
            edit.settings = style.settings();
            if let Some(template) = style.template {
                edit.template = template;
            }

            if preset != AiPreset::None {
                edit.select_preset(preset);
                let enhancer = Arc::new(GeminiEnhancer::from_config(&config.ai)?);
                if let Err(notice) = edit.apply_enhance(enhancer).await {
                    eprintln!("{notice}");
                }
            }

            if preview {
                write_preview(&edit, &config, &out_dir).await?;
            }

            let finished = edit.finalize(config.render.final_size, config.render.watermark)?;
            let path = write_download(&out_dir, &finished.download_name, &finished.output.png)?;
            println!("{}", output::format_composed(&finished.output, &path));

            if !no_save {
                let mut studio = Studio::open(&config.storage.data_dir)?;
                studio.save(finished.record)?;
                println!("Saved to gallery ({} photos)", studio.photos().len());
            }
        }
        Command::Enhance { image, preset, out } => {
            let png = imaging::SourceImage::open(&image)?.to_png()?;
            let enhancer = GeminiEnhancer::from_config(&config.ai)?;
            let styled = enhancer.enhance(&png, preset).await?;
            std::fs::write(&out, &styled)?;
            println!("Wrote {}", out.display());
        }
        Command::Gallery(sub) => {
            let mut studio = Studio::open(&config.storage.data_dir)?;
            let now = Local::now();
            match sub {
                GalleryCommand::List => {
                    for line in output::format_gallery_list(studio.photos(), now) {
                        println!("{line}");
                    }
                }
                GalleryCommand::Show { id } => {
                    let photo = studio
                        .get(&id)
                        .ok_or_else(|| format!("photo not found: {id}"))?;
                    for line in output::format_photo_detail(photo, now) {
                        println!("{line}");
                    }
                }
                GalleryCommand::Delete { id, yes } => {
                    if !yes {
                        return Err(format!("pass --yes to delete {id}").into());
                    }
                    if studio.get(&id).is_none() {
                        return Err(format!("photo not found: {id}").into());
                    }
                    studio.delete(&id)?;
                    println!("Deleted {id}");
                }
                GalleryCommand::Export { id, out_dir } => {
                    let path = studio.export(&id, &out_dir)?;
                    println!("Wrote {}", path.display());
                }
            }
        }
        Command::Migrate => {
            let data_dir = &config.storage.data_dir;
            let outcome = migrate_legacy(&KvStore::open(data_dir)?, &PhotoStore::open(data_dir)?);
            println!("{}", output::format_migration(&outcome));
        }
        Command::GenConfig => unreachable!("handled before config loading"),
    }

    Ok(())
}

/// Render the edit at preview size through the debounced scheduler and
/// write it next to the download.
async fn write_preview(
    edit: &EditSession,
    config: &BoothConfig,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = PreviewScheduler::default();
    let handle = scheduler.request(
        edit.active_images().to_vec(),
        edit.preview_request(config.render.preview_size),
    );
    if handle.await? && let Some(preview) = scheduler.latest() {
        let path = write_download(out_dir, "blushbooth-preview.png", &preview.output.png)?;
        println!("{}", output::format_composed(&preview.output, &path));
    }
    Ok(())
}
