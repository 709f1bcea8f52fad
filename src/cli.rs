//! CLI implementation.
mod config;

pub use crate::cli::config::Config;
use crate::compose::Compositor;
use crate::error::{Error, Result};
use crate::frames::FrameLibrary;
use crate::image::{Color, ImgBackend};
use crate::layout::{Arrangement, FreeFormLayout, GridLayout, LayoutGeometry, Padding, SlotRect};
use crate::logs::ProgressReporter;
use crate::pipeline::{Manifest, ParallelismOptions, Pipeline, Tally};
use crate::registry::{is_builtin, LayoutRegistry};

use clap::{Args, Parser, Subcommand};
use std::num::NonZero;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Compose photo-booth collages from declarative layouts
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file; defaults to ./collagist.toml, then ~/.collagist/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compose one collage from photo files
    Compose(ComposeArgs),
    /// List every known layout
    Layouts,
    /// Register a custom layout
    AddLayout(AddLayoutArgs),
    /// List frame templates, optionally generating placeholders
    Frames(FramesArgs),
    /// Compose every job of a TOML manifest
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// Layout identifier, such as 2x2 or a custom layout name
    #[arg(short, long)]
    pub layout: String,

    /// Frame template drawn over the collage
    #[arg(short, long, conflicts_with = "auto_frame")]
    pub frame: Option<PathBuf>,

    /// Use the first frame template found for the layout
    #[arg(long)]
    pub auto_frame: bool,

    /// Output image path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Photos, in slot order
    #[arg(required = true)]
    pub photos: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AddLayoutArgs {
    /// Name of the new layout
    pub name: String,

    /// Canvas size, as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    pub canvas: (u32, u32),

    /// Explicit slot, as X,Y,WIDTH,HEIGHT; repeat for each photo
    #[arg(long = "slot", value_parser = parse_slot, conflicts_with = "grid")]
    pub slots: Vec<SlotRect>,

    /// Grid arrangement, as ROWSxCOLUMNS
    #[arg(long)]
    pub grid: Option<Arrangement>,

    /// Grid padding, as TOP,BOTTOM,LEFT,RIGHT
    #[arg(long, value_parser = parse_padding, default_value = "0,0,0,0")]
    pub padding: Padding,

    /// Grid gap between slots
    #[arg(long, default_value_t = 0)]
    pub gap: u32,
}

#[derive(Debug, Args)]
pub struct FramesArgs {
    /// Only show this layout
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Write placeholder frames for layouts that have none
    #[arg(long)]
    pub generate: bool,

    /// Placeholder color, as #RRGGBB
    #[arg(long)]
    pub color: Option<Color>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// TOML manifest with [[job]] tables
    pub manifest: PathBuf,

    /// Number of worker threads
    #[arg(short, long, default_value_t = NonZero::new(4).unwrap())]
    pub workers: NonZero<usize>,

    /// Compose on the current thread, one job at a time
    #[arg(long)]
    pub sequential: bool,
}

macro_rules! error {
    ($res:expr) => {
        $res.unwrap_or_else(|e| panic!("{e}"))
    };
}

impl Cli {
    pub fn run() {
        std::panic::set_hook(Box::new(|panic_info| {
            if let Some(s) = panic_info.payload().downcast_ref::<String>() {
                eprintln!("{s}");
            } else {
                eprintln!("{panic_info}");
            }
        }));
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let cli = Self::parse();
        let (folder, config) = error!(Config::find(cli.config.as_deref()));
        let registry = error!(config.registry(&folder));
        match cli.command {
            Command::Compose(args) => error!(compose(&folder, &config, &registry, args)),
            Command::Layouts => list_layouts(&registry),
            Command::AddLayout(args) => error!(add_layout(&registry, args)),
            Command::Frames(args) => error!(frames(&folder, &config, &registry, args)),
            Command::Batch(args) => {
                let failed = error!(batch(&config, registry, args));
                if failed > 0 {
                    std::process::exit(1);
                }
            }
        }
    }
}

fn compose(folder: &Path, config: &Config, registry: &LayoutRegistry, args: ComposeArgs) -> Result<()> {
    let ib = ImgBackend::new()?;
    let geometry = registry.resolve(&args.layout)?;
    let photos = args
        .photos
        .iter()
        .map(|fp| ib.open_photo(fp))
        .collect::<Result<Vec<_>>>()?;
    let compositor = Compositor::new(&ib).with_background(config.collage.background);
    let collage = compositor.compose(&photos, &geometry)?;

    let frame = match (args.frame, args.auto_frame) {
        (Some(fp), _) => Some(fp),
        (None, true) => {
            let library = FrameLibrary::new(config.frames_folder(folder));
            let found = library.templates_for(&args.layout)?.into_iter().next();
            if found.is_none() {
                log::warn!("no frame template for `{}`", args.layout);
            }
            found
        }
        (None, false) => None,
    };
    let img = match frame {
        Some(fp) => collage.framed(&compositor, &ib.open_frame(&fp)?)?,
        None => collage.into_image(),
    };

    let output = match args.output {
        Some(fp) => fp,
        None => {
            let out_folder = config.output_folder(folder);
            std::fs::create_dir_all(&out_folder).map_err(|e| Error::output_folder(&out_folder, e))?;
            let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
            out_folder.join(format!("collage_{stamp}.{}", config.output.ext))
        }
    };
    ib.write(&img, &output)?;
    println!("{}", output.display());
    Ok(())
}

fn list_layouts(registry: &LayoutRegistry) {
    for (id, geometry) in registry.list_all() {
        let (w, h) = geometry.canvas_size();
        let kind = match &geometry {
            LayoutGeometry::Grid(grid) => format!("grid {}", grid.arrangement()),
            LayoutGeometry::FreeForm(_) => String::from("free-form"),
        };
        let origin = if is_builtin(&id) && !registry.custom_names().contains(&id) {
            "built-in"
        } else {
            "custom"
        };
        println!("{id:<24} {w:>5}x{h:<5} {:>2} slots  {kind:<12} {origin}", geometry.slot_count());
    }
}

fn add_layout(registry: &LayoutRegistry, args: AddLayoutArgs) -> Result<()> {
    let geometry: LayoutGeometry = match args.grid {
        Some(arrangement) => GridLayout::new(args.canvas, args.padding, args.gap, arrangement).into(),
        None if args.slots.is_empty() => {
            return Err(Error::geometry("give either --grid or at least one --slot"))
        }
        None => FreeFormLayout::new(args.canvas, args.slots).into(),
    };
    registry.append(args.name.as_str(), geometry)?;
    println!("added layout `{}`", args.name);
    Ok(())
}

fn frames(folder: &Path, config: &Config, registry: &LayoutRegistry, args: FramesArgs) -> Result<()> {
    let library = FrameLibrary::new(config.frames_folder(folder));
    if args.generate {
        let ib = ImgBackend::new()?;
        let color = args.color.unwrap_or(config.frames.placeholder);
        for path in library.generate_placeholders(registry, &ib, &color)? {
            println!("created {}", path.display());
        }
    }
    let ids: Vec<String> = match args.layout {
        Some(id) => vec![id],
        None => registry.list_all().into_keys().collect(),
    };
    for id in ids {
        let templates = library.templates_for(&id)?;
        println!("{id}: {} template(s)", templates.len());
        for fp in templates {
            println!("    {}", fp.display());
        }
    }
    Ok(())
}

/// Runs a manifest and returns the number of failed jobs.
fn batch(config: &Config, registry: LayoutRegistry, args: BatchArgs) -> Result<usize> {
    let jobs = Manifest::open(&args.manifest)?.into_jobs();
    let pipeline = Pipeline::new(Arc::new(registry), jobs)
        .with_background(config.collage.background);
    let tally = Tally::default();
    let interactive = termion::is_tty(&std::io::stderr());

    if args.sequential {
        match interactive.then(|| ProgressReporter::new(0).ok()).flatten() {
            Some(pbar) => drop(pipeline.with_visitor((tally.clone(), pbar)).run()),
            None => drop(pipeline.with_visitor(tally.clone()).run()),
        }
    } else {
        let opt = ParallelismOptions::new(args.workers);
        match interactive.then(|| ProgressReporter::new(opt.n_workers()).ok()).flatten() {
            Some(pbar) => drop(pipeline.with_visitor((tally.clone(), pbar)).run_parallel(opt).join()?),
            None => drop(pipeline.with_visitor(tally.clone()).run_parallel(opt).join()?),
        }
    }
    log::info!("{} collages written, {} failed", tally.ok(), tally.failed());
    Ok(tally.failed())
}

fn parse_numbers<const N: usize>(s: &str, sep: char) -> std::result::Result<[u32; N], String> {
    let parts = s
        .split(sep)
        .map(|p| p.trim().parse::<u32>().map_err(|e| format!("`{p}`: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    parts
        .try_into()
        .map_err(|v: Vec<u32>| format!("expected {N} numbers, got {}", v.len()))
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let [w, h] = parse_numbers::<2>(&s.to_lowercase(), 'x')?;
    Ok((w, h))
}

fn parse_slot(s: &str) -> std::result::Result<SlotRect, String> {
    let [x, y, w, h] = parse_numbers::<4>(s, ',')?;
    Ok(SlotRect::new(x, y, w, h))
}

fn parse_padding(s: &str) -> std::result::Result<Padding, String> {
    let [top, bottom, left, right] = parse_numbers::<4>(s, ',')?;
    Ok(Padding::new(top, bottom, left, right))
}
