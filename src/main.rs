mod cli;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{CaptureArgs, Cli, Command, CompareArgs, CropArgs, KeyAction};
use difflens::analysis::GeminiClient;
use difflens::app::{AnalysisStatus, AppEvent, AppState};
use difflens::capture::{FixedViewfinder, FrameSource, ImageFileSource, StillCapture};
use difflens::config::LensConfig;
use difflens::credentials::{self, CredentialStore, FileCredentialStore};
use difflens::documents::{self, DocItem, DocSet};
use difflens::lens_crop::viewport::ContainerGeometry;
use difflens::report;
use difflens::{HasRecoverySuggestion, LensError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Key { action } => key(action),
        Command::Crop(args) => crop(args).await,
        Command::Compare(args) => compare(args).await,
    };
    if let Some(hint) = result
        .as_ref()
        .err()
        .and_then(|e| e.downcast_ref::<LensError>())
        .and_then(|e| e.recovery_suggestion())
    {
        eprintln!("hint: {}", hint);
    }
    result
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn key(action: KeyAction) -> Result<()> {
    let store = FileCredentialStore::default_location()?;
    match action {
        KeyAction::Set { key } => {
            let key = match key {
                Some(key) => key,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            store.set(&key)?;
            println!("✓ API key saved to {}", store.path().display());
        }
        KeyAction::Clear => {
            store.clear()?;
            println!("API key removed");
        }
        KeyAction::Status => {
            if std::env::var(credentials::API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty()) {
                println!("API key: from {}", credentials::API_KEY_ENV);
            } else if store.get()?.is_some() {
                println!("API key: stored at {}", store.path().display());
            } else {
                println!("API key: not set (run `difflens key set`)");
            }
        }
    }
    Ok(())
}

async fn crop(args: CropArgs) -> Result<()> {
    let config = args.capture.to_config();
    config.validate()?;

    let mut source = open_source(&args).await?;
    let viewfinder = viewfinder(&args.capture, &config, &*source)?;

    let still = StillCapture::new(&config)
        .capture_still(&mut *source, &viewfinder)
        .await?;

    tokio::fs::write(&args.output, &still.jpeg)
        .await
        .with_context(|| format!("writing {}", args.output.display()))?;

    let r = still.source_rect;
    let p = still.pixel_rect;
    println!(
        "source rect: x={:.2} y={:.2} w={:.2} h={:.2}",
        r.x, r.y, r.width, r.height
    );
    println!("pixel rect:  x={} y={} w={} h={}", p.x, p.y, p.width, p.height);
    println!(
        "✓ wrote {} ({}x{}, {} bytes)",
        args.output.display(),
        still.size.w,
        still.size.h,
        still.jpeg.len()
    );
    Ok(())
}

async fn open_source(args: &CropArgs) -> Result<Box<dyn FrameSource>> {
    #[cfg(feature = "webcam")]
    if let Some(index) = args.camera {
        return Ok(Box::new(difflens::capture::WebcamSource::open(index)?));
    }

    let path = args
        .frame
        .as_ref()
        .ok_or_else(|| anyhow!("give a frame image to crop"))?;
    Ok(Box::new(ImageFileSource::open(path).await?))
}

/// Container from the flags, or the frame's own size so the preview is 1:1.
fn viewfinder(
    args: &CaptureArgs,
    config: &LensConfig,
    source: &dyn FrameSource,
) -> Result<FixedViewfinder> {
    let container = match args.container {
        Some(container) => container,
        None => {
            let frame = source
                .frame_geometry()
                .ok_or_else(|| anyhow!("{} has no frame yet", source.name()))?;
            ContainerGeometry {
                width: frame.width as f64,
                height: frame.height as f64,
            }
        }
    };
    let viewfinder = FixedViewfinder::new(
        container,
        config.guide_padding,
        config.guide_height_fraction,
    );
    Ok(match args.guide {
        Some(guide) => viewfinder.with_guide(guide),
        None => viewfinder,
    })
}

async fn compare(args: CompareArgs) -> Result<()> {
    let config = args.to_config();
    config.validate()?;

    let store = FileCredentialStore::default_location()?;
    let api_key = credentials::resolve_api_key(&store)?;

    let mut state = AppState::initial(api_key.is_some());
    let Some(api_key) = api_key else {
        bail!(
            "no API key (screen: {}); run `difflens key set` or export {}",
            state.screen,
            credentials::API_KEY_ENV
        );
    };

    for (set, files, frames) in [
        (DocSet::First, &args.first, &args.capture_first),
        (DocSet::Second, &args.second, &args.capture_second),
    ] {
        if !files.is_empty() {
            let items = ingest_all(files).await?;
            state = save_into(state, AppEvent::OpenUpload, set, items)?;
        }
        if !frames.is_empty() {
            let items = capture_all(frames, &args.capture, &config).await?;
            state = save_into(state, AppEvent::OpenCamera, set, items)?;
        }
        let collection = state.set(set);
        println!(
            "{}: {} item(s), ~{:.1} KiB",
            set,
            collection.len(),
            collection.total_kib()
        );
    }

    let client = GeminiClient::new(&config, api_key)?;
    println!("Analysing differences with {} …", config.model);
    let state = difflens::run_analysis(&client, state).await?;

    match &state.analysis {
        AnalysisStatus::Done(markdown) if args.raw => println!("{}", markdown),
        AnalysisStatus::Done(markdown) => print!("{}", report::render_plain(&report::parse(markdown))),
        AnalysisStatus::Failed(message) => bail!("document analysis failed: {}", message),
        other => bail!("analysis did not finish: {:?}", other),
    }
    Ok(())
}

/// Open the picker for `set`, store `items` there and return home.
fn save_into(state: AppState, open: AppEvent, set: DocSet, items: Vec<DocItem>) -> Result<AppState> {
    Ok(state
        .apply(open)?
        .apply(AppEvent::SelectSet(set))?
        .apply(AppEvent::ItemsSaved(items))?)
}

async fn ingest_all(files: &[PathBuf]) -> Result<Vec<DocItem>> {
    let mut items = Vec::with_capacity(files.len());
    for path in files {
        items.push(documents::ingest_file(path).await?);
    }
    Ok(items)
}

async fn capture_all(frames: &[PathBuf], args: &CaptureArgs, config: &LensConfig) -> Result<Vec<DocItem>> {
    let mut capture = StillCapture::new(config);
    let mut items = Vec::with_capacity(frames.len());
    for path in frames {
        let mut source = ImageFileSource::open(path).await?;
        let viewfinder = viewfinder(args, config, &source)?;
        items.push(capture.capture(&mut source, &viewfinder).await?);
    }
    Ok(items)
}
