use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use atlas_baker_core::config::{FilterMode, MaxRectsHeuristic, NormalGeneration, TextureCompression};
use atlas_baker_core::font::parse_bmfont;
use atlas_baker_core::{
    BakeConfig, BakeInput, BakeOutput, FontRequest, SourceRef, SpriteRequest, bake, page_file_name, to_json,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{ImageReader, RgbaImage};
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "atlas-baker",
    about = "Bake sprites and bitmap fonts into texture atlases",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bake a YAML manifest (sprites, regions, fonts, config)
    Bake(BakeArgs),
    /// Bake every image under a directory as one whole-texture sprite
    Pack(PackArgs),
}

#[derive(Args, Debug, Clone)]
struct BakeArgs {
    /// Manifest file; relative paths inside it resolve against its directory
    #[arg(help_heading = "Input/Output")]
    manifest: PathBuf,
    #[command(flatten)]
    out: OutputArgs,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Args, Debug, Clone)]
struct PackArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// YAML config file (same keys as a manifest's `config` section)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    #[command(flatten)]
    out: OutputArgs,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.json and name_<page>.png)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    /// Print the merged configuration (after YAML/CLI) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: bake and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

/// Flags applied on top of the YAML configuration.
#[derive(Args, Debug, Clone, Default)]
struct ConfigOverrides {
    /// Max page edge in pixels
    #[arg(long, help_heading = "Layout")]
    max_size: Option<u32>,
    /// Exact page size, e.g. 512x256
    #[arg(long, value_parser = parse_size, help_heading = "Layout")]
    forced_size: Option<(u32, u32)>,
    /// Keep auto-sized pages square
    #[arg(long, help_heading = "Layout")]
    square: Option<bool>,
    /// Spill onto extra pages instead of failing
    #[arg(long, help_heading = "Layout")]
    multi_page: Option<bool>,
    /// Page limit when multi-page is on
    #[arg(long, help_heading = "Layout")]
    max_pages: Option<usize>,
    /// Allow 90deg flips in the atlas
    #[arg(long, help_heading = "Layout")]
    allow_rotation: Option<bool>,
    /// MaxRects heuristics to try, comma separated: baf,bssf,blsf,bl,cp
    #[arg(long, value_delimiter = ',', help_heading = "Layout")]
    heuristics: Vec<String>,

    /// Pad border per sprite (default: 0 for point filtering, 2 otherwise)
    #[arg(long, help_heading = "Image Processing")]
    pad: Option<u32>,
    /// Trim transparent borders
    #[arg(long, help_heading = "Image Processing")]
    trim: Option<bool>,
    /// Trim alpha threshold (0..=255)
    #[arg(long, help_heading = "Image Processing")]
    trim_threshold: Option<u8>,
    /// Fold pixel-identical sprites into one slot
    #[arg(long, help_heading = "Image Processing")]
    dedup: Option<bool>,
    #[arg(long, help_heading = "Image Processing")]
    premultiplied_alpha: Option<bool>,
    /// Texture compression: uncompressed|reduced16|compressed|dithered16_alpha|dithered16_no_alpha
    #[arg(long, help_heading = "Image Processing")]
    compression: Option<String>,
    /// Filter mode: point|bilinear|trilinear
    #[arg(long, help_heading = "Image Processing")]
    filter: Option<String>,
    /// Global source downscale in (0, 1]
    #[arg(long, help_heading = "Image Processing")]
    rescale: Option<f32>,

    /// Pixels per mesh unit
    #[arg(long, help_heading = "Geometry")]
    ppu: Option<f32>,
    /// Global mesh scale
    #[arg(long, help_heading = "Geometry")]
    scale: Option<f32>,
    /// Normals: none|normals|normals_and_tangents
    #[arg(long, help_heading = "Geometry")]
    normals: Option<String>,

    /// Run resolve/process in parallel (requires core feature `parallel`)
    #[arg(long, help_heading = "Performance")]
    parallel: Option<bool>,
}

impl ConfigOverrides {
    fn apply(&self, mut cfg: BakeConfig) -> anyhow::Result<BakeConfig> {
        if let Some(v) = self.max_size {
            cfg.max_texture_size = v;
        }
        if let Some(v) = self.forced_size {
            cfg.forced_size = Some(v);
        }
        if let Some(v) = self.square {
            cfg.force_square = v;
        }
        if let Some(v) = self.multi_page {
            cfg.allow_multiple_pages = v;
        }
        if let Some(v) = self.max_pages {
            cfg.max_pages = v;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        if !self.heuristics.is_empty() {
            cfg.heuristics = self
                .heuristics
                .iter()
                .map(|h| {
                    h.parse::<MaxRectsHeuristic>()
                        .map_err(|_| anyhow::anyhow!("unknown heuristic: {}", h))
                })
                .collect::<anyhow::Result<_>>()?;
        }
        if let Some(v) = self.pad {
            cfg.pad_amount = Some(v);
        }
        if let Some(v) = self.trim {
            cfg.disable_trimming = !v;
        }
        if let Some(v) = self.trim_threshold {
            cfg.trim_threshold = v;
        }
        if let Some(v) = self.dedup {
            cfg.remove_duplicates = v;
        }
        if let Some(v) = self.premultiplied_alpha {
            cfg.premultiplied_alpha = v;
        }
        if let Some(v) = &self.compression {
            cfg.texture_compression = v
                .parse::<TextureCompression>()
                .map_err(|_| anyhow::anyhow!("unknown texture compression: {}", v))?;
        }
        if let Some(v) = &self.filter {
            cfg.filter_mode = v
                .parse::<FilterMode>()
                .map_err(|_| anyhow::anyhow!("unknown filter mode: {}", v))?;
        }
        if let Some(v) = self.rescale {
            cfg.global_texture_rescale = v;
        }
        if let Some(v) = self.ppu {
            cfg.pixels_per_unit = v;
        }
        if let Some(v) = self.scale {
            cfg.global_scale = v;
        }
        if let Some(v) = &self.normals {
            cfg.normal_generation = v
                .parse::<NormalGeneration>()
                .map_err(|_| anyhow::anyhow!("unknown normal generation: {}", v))?;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s}"))?;
    let w = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Ok((w, h))
}

/// A bake manifest as written on disk.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Manifest {
    config: BakeConfig,
    sprites: Vec<ManifestSprite>,
    fonts: Vec<ManifestFont>,
}

#[derive(Debug, Deserialize)]
struct ManifestSprite {
    /// Image file; omitted or unreadable bakes the missing-texture placeholder.
    texture: Option<PathBuf>,
    region: Option<ManifestRegion>,
    #[serde(flatten)]
    request: SpriteRequest,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ManifestRegion {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
struct ManifestFont {
    name: String,
    /// BMFont text file.
    fnt: PathBuf,
    /// Glyph sheet; defaults to the `page` file named inside the .fnt.
    texture: Option<PathBuf>,
    #[serde(default)]
    flip_texture_y: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Bake(args) => run_bake(args, progress),
        Commands::Pack(args) => run_pack(args, progress),
    }
}

fn run_bake(args: &BakeArgs, show_progress: bool) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.manifest)
        .with_context(|| format!("read manifest {}", args.manifest.display()))?;
    let manifest: Manifest = serde_yaml::from_str(&text)
        .with_context(|| format!("parse manifest {}", args.manifest.display()))?;
    let cfg = args.overrides.apply(manifest.config)?;
    if args.out.print_config {
        return print_config(&cfg, &args.out.print_config_format);
    }

    let base = args.manifest.parent().unwrap_or_else(|| Path::new("."));
    let mut table = TextureTable::default();
    for s in &manifest.sprites {
        if let Some(p) = &s.texture {
            table.intern(base.join(p));
        }
    }
    let mut fonts = Vec::with_capacity(manifest.fonts.len());
    for f in &manifest.fonts {
        let fnt_path = base.join(&f.fnt);
        let fnt = fs::read_to_string(&fnt_path).with_context(|| format!("read font {}", fnt_path.display()))?;
        let definition = parse_bmfont(&fnt).with_context(|| format!("parse font {}", fnt_path.display()))?;
        let sheet = match (&f.texture, &definition.page_file) {
            (Some(p), _) => base.join(p),
            (None, Some(page)) => fnt_path.parent().unwrap_or(base).join(page),
            (None, None) => anyhow::bail!("font {} names no texture", f.name),
        };
        let texture = table.intern(sheet);
        fonts.push(FontRequest {
            name: f.name.clone(),
            texture,
            definition,
            flip_texture_y: f.flip_texture_y,
        });
    }

    let (textures, loaded) = table.load(show_progress);
    let sprites = manifest
        .sprites
        .into_iter()
        .map(|s| {
            let texture = s
                .texture
                .as_ref()
                .and_then(|p| table.index.get(&base.join(p)).copied())
                .filter(|id| loaded[*id]);
            let mut req = s.request;
            req.source = texture.map(|t| match s.region {
                Some(r) => SourceRef::Region {
                    texture: t,
                    x: r.x,
                    y: r.y,
                    w: r.w,
                    h: r.h,
                },
                None => SourceRef::Texture(t),
            });
            req
        })
        .collect();
    for f in &mut fonts {
        if !loaded[f.texture] {
            // dangling id: the core warns and every glyph falls back
            f.texture = usize::MAX;
        }
    }
    let input = BakeInput {
        textures,
        sprites,
        fonts,
    };
    finish(input, &cfg, &args.out)
}

fn run_pack(args: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let base_cfg = match &args.config {
        Some(path) => {
            let file = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
            serde_yaml::from_str(&file).with_context(|| format!("parse config {}", path.display()))?
        }
        None => BakeConfig::default(),
    };
    let cfg = args.overrides.apply(base_cfg)?;
    if args.out.print_config {
        return print_config(&cfg, &args.out.print_config_format);
    }

    let paths = gather_paths(&args.input, &args.include, &args.exclude)?;
    let mut table = TextureTable::default();
    for p in &paths {
        table.intern(p.clone());
    }
    let (textures, loaded) = table.load(show_progress);
    let root = if args.input.is_dir() {
        args.input.as_path()
    } else {
        args.input.parent().unwrap_or_else(|| Path::new(""))
    };
    let sprites = paths
        .iter()
        .enumerate()
        .filter(|(i, _)| loaded[*i])
        .map(|(i, p)| SpriteRequest::new(sprite_name(p, root), SourceRef::Texture(i)))
        .collect();
    let input = BakeInput {
        textures,
        sprites,
        fonts: vec![],
    };
    finish(input, &cfg, &args.out)
}

/// Bakes, then writes the page PNGs and the JSON description.
fn finish(input: BakeInput, cfg: &BakeConfig, out_args: &OutputArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let out = bake(input, cfg).map_err(|e| {
        error!(reason = ?e.reason(), "bake failed");
        e
    })?;
    let stats = out.stats();
    info!(
        pages = stats.num_pages,
        sprites = stats.num_sprites,
        slots = stats.num_slots,
        folded = stats.duplicates_folded,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "bake finished"
    );
    if out_args.dry_run {
        println!("{}", stats.summary());
        return Ok(());
    }
    write_outputs(&out, out_args)
}

fn write_outputs(out: &BakeOutput, args: &OutputArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&args.out_dir).with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    for page in &out.pages {
        let png_path = args.out_dir.join(page_file_name(&args.name, page.layout.index));
        page.rgba
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        info!(?png_path, page = page.layout.index, "wrote page");
    }
    let json_path = args.out_dir.join(format!("{}.json", args.name));
    let json = serde_json::to_string_pretty(&to_json(out, &args.name))?;
    fs::write(&json_path, json).with_context(|| format!("write {}", json_path.display()))?;
    info!(?json_path, sprites = out.sprites.len(), fonts = out.fonts.len(), "atlas written");
    Ok(())
}

fn print_config(cfg: &BakeConfig, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => println!("{}", serde_yaml::to_string(cfg)?),
        _ => println!("{}", serde_json::to_string_pretty(cfg)?),
    }
    Ok(())
}

/// Distinct image files, in first-reference order.
#[derive(Default)]
struct TextureTable {
    paths: Vec<PathBuf>,
    index: HashMap<PathBuf, usize>,
}

impl TextureTable {
    fn intern(&mut self, path: PathBuf) -> usize {
        if let Some(&i) = self.index.get(&path) {
            return i;
        }
        let i = self.paths.len();
        self.index.insert(path.clone(), i);
        self.paths.push(path);
        i
    }

    /// Decodes every file. Unreadable files leave an empty image behind so ids
    /// stay stable; the returned mask says which ones loaded.
    fn load(&self, progress: bool) -> (Vec<RgbaImage>, Vec<bool>) {
        use indicatif::{ProgressBar, ProgressStyle};
        let bar = progress.then(|| {
            let b = ProgressBar::new(self.paths.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}")
            {
                b.set_style(style);
            }
            b
        });
        let mut images = Vec::with_capacity(self.paths.len());
        let mut loaded = Vec::with_capacity(self.paths.len());
        for p in &self.paths {
            if let Some(b) = &bar {
                b.set_message(p.file_name().and_then(|s| s.to_str()).unwrap_or("").to_string());
            }
            match load_image(p) {
                Ok(img) => {
                    images.push(img);
                    loaded.push(true);
                }
                Err(e) => {
                    warn!(?p, error = %e, "could not load image, sprite will use the placeholder");
                    images.push(RgbaImage::new(0, 0));
                    loaded.push(false);
                }
            }
            if let Some(b) = &bar {
                b.inc(1);
            }
        }
        if let Some(b) = &bar {
            b.finish_and_clear();
        }
        info!(count = loaded.iter().filter(|l| **l).count(), "loaded input images");
        (images, loaded)
    }
}

fn load_image(p: &Path) -> anyhow::Result<RgbaImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

/// Path relative to `root`, forward slashes, extension dropped.
fn sprite_name(p: &Path, root: &Path) -> String {
    let rel = p.strip_prefix(root).unwrap_or(p);
    rel.with_extension("").to_string_lossy().replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn gather_paths(path: &Path, include: &[String], exclude: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}
