//! Voronoi diagram CLI
//!
//! Builds Fortune-sweep Voronoi diagrams and writes them out as a PNG
//! drawing, a YAML edge dump, or a GIF of drifting sites.
//!
//! ## YAML scene file
//!
//! ```yaml
//! seed: 7
//! count: 120        # random sites, ignored when `sites` is given
//! epsilon: 1.0e-9
//! bounds: { min: { x: 0, y: 0 }, max: { x: 800, y: 600 } }
//! sites:
//!   - { x: 100, y: 80 }
//!   - { x: 420, y: 310 }
//! ```
//!
//! Run with: `sweepline --scene scene.yaml -o out.png`
//!
//! ## Graceful interruption
//!
//! GIF frames are streamed to disk as they render. Press Ctrl+C to stop and
//! keep the frames rendered so far; benchmarks stop after the current size.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use sweepline_core::validation::check_coverage;
use sweepline_core::{
    build_with, raster, BoundingBox, BuildOptions, Diagram, Edge, FortuneEngine, Point, SiteBoard, MAX_SITES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Png,
    Gif,
    Yaml,
}

/// YAML scene file format
#[derive(Debug, Default, Deserialize)]
struct Scene {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    epsilon: Option<f64>,
    #[serde(default)]
    bounds: Option<BoundingBox>,
    #[serde(default)]
    sites: Option<Vec<Point>>,
}

fn load_scene(path: &PathBuf) -> anyhow::Result<Scene> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse scene file: {:?}", path))
}

/// Edge dump written by `--format yaml`
#[derive(Debug, Serialize)]
struct DiagramDump<'a> {
    bounds: BoundingBox,
    sites: Vec<Point>,
    merged: usize,
    edges: &'a [Edge],
}

#[derive(Parser, Debug)]
#[command(name = "sweepline")]
#[command(about = "Build, render and benchmark Voronoi diagrams", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "png")]
    format: OutputFormat,

    /// YAML scene file (sites, bounds, seed, epsilon)
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Number of random sites (clamped to 500)
    #[arg(short = 'n', long)]
    sites: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Relative geometric tolerance
    #[arg(long)]
    epsilon: Option<f64>,

    /// Image width in pixels; also the box width when the scene has no bounds
    #[arg(long, default_value = "800")]
    width: u32,

    /// Image height in pixels; also the box height when the scene has no bounds
    #[arg(long, default_value = "600")]
    height: u32,

    /// Fill each cell with a flat color
    #[arg(long)]
    show_cells: bool,

    /// Do not draw site dots
    #[arg(long)]
    hide_sites: bool,

    /// Cross-check the edges against nearest-site sampling
    #[arg(long)]
    validate: bool,

    /// Number of GIF frames
    #[arg(long, default_value = "90")]
    frames: usize,

    /// GIF frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Site drift speed (box units per second)
    #[arg(long, default_value = "40.0")]
    speed: f64,

    /// Time `build` for increasing site counts instead of rendering
    #[arg(long)]
    benchmark: bool,

    /// Site counts to benchmark
    #[arg(long, value_delimiter = ',', default_value = "100,500,2000,10000,50000")]
    bench_sizes: Vec<usize>,

    /// Builds per site count in benchmark mode
    #[arg(long, default_value = "20")]
    bench_iters: usize,
}

/// Settings after merging the scene file with CLI flags (flags win).
struct Config {
    bounds: BoundingBox,
    seed: u64,
    count: usize,
    options: BuildOptions,
    sites: Option<Vec<Point>>,
}

impl Config {
    fn resolve(args: &Args, scene: Scene) -> anyhow::Result<Self> {
        let bounds = scene
            .bounds
            .unwrap_or_else(|| BoundingBox::from_size(args.width as f64, args.height as f64));
        bounds.validate().context("invalid bounds")?;
        let options = BuildOptions::with_epsilon(
            args.epsilon.or(scene.epsilon).unwrap_or(BuildOptions::default().epsilon),
        );
        Ok(Self {
            bounds,
            seed: args.seed.or(scene.seed).unwrap_or(0),
            count: args.sites.or(scene.count).unwrap_or(100),
            options,
            sites: scene.sites,
        })
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    // Set up SIGINT handler
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
        })
        .context("failed to set Ctrl-C handler")?;
    }

    let scene = args.scene.as_ref().map(load_scene).transpose()?.unwrap_or_default();
    let config = Config::resolve(&args, scene)?;

    if args.benchmark {
        return run_benchmark(&args, &config, &interrupted);
    }

    let output = args
        .output
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Output path required (use -o/--output)"))?;

    let mut board = make_board(&config)?;
    println!(
        "Sites: {} in [{}, {}] x [{}, {}] (seed: {})",
        board.len(),
        config.bounds.min.x,
        config.bounds.max.x,
        config.bounds.min.y,
        config.bounds.max.y,
        config.seed
    );

    match args.format {
        OutputFormat::Gif => render_animation(&args, &mut board, output, &interrupted),
        OutputFormat::Png | OutputFormat::Yaml => {
            let start = Instant::now();
            let handle = board.rebuild()?;
            let diagram = handle.diagram()?;
            println!(
                "Built {} edges in {:.2} ms ({} duplicate sites merged)",
                diagram.edge_count(),
                start.elapsed().as_secs_f64() * 1000.0,
                diagram.merged_sites()
            );
            if args.validate {
                validate(diagram)?;
            }
            if args.format == OutputFormat::Png {
                let canvas = Canvas::new(config.bounds, args.width, args.height);
                let image = canvas.draw(diagram, args.show_cells, !args.hide_sites);
                image
                    .save(output)
                    .with_context(|| format!("failed to write {:?}", output))?;
            } else {
                write_yaml(diagram, output)?;
            }
            println!("Output saved to: {:?}", output);
            Ok(())
        }
    }
}

/// Board seeded from the scene sites, or with random sites otherwise.
fn make_board(config: &Config) -> anyhow::Result<SiteBoard<FortuneEngine>> {
    let mut board = SiteBoard::new(FortuneEngine::new(config.options), config.bounds, config.seed)?;
    match &config.sites {
        Some(sites) => {
            // Scene sites are taken as given, including any outside the box.
            for (i, p) in sites.iter().enumerate() {
                let placed = board
                    .place_site(*p)
                    .with_context(|| format!("invalid scene site {}", i))?;
                if !placed {
                    anyhow::bail!("scene has {} sites; at most {} are supported", sites.len(), MAX_SITES);
                }
            }
        }
        None => {
            let count = board.set_count(config.count);
            if count < config.count {
                eprintln!("Warning: site count clamped from {} to {}", config.count, count);
            }
        }
    }
    Ok(board)
}

fn validate(diagram: &Diagram) -> anyhow::Result<()> {
    let bounds = diagram.bounds();
    let margin = 1e-6 * bounds.width().max(bounds.height()).max(1.0);
    let report = check_coverage(diagram, 256, margin).context("coverage check failed")?;
    println!(
        "Coverage OK: {} samples, {} separation checks, {} near boundaries skipped",
        report.samples, report.separated, report.skipped
    );
    Ok(())
}

fn write_yaml(diagram: &Diagram, output: &Path) -> anyhow::Result<()> {
    let dump = DiagramDump {
        bounds: diagram.bounds(),
        sites: diagram.sites().iter().map(|s| s.pos).collect(),
        merged: diagram.merged_sites(),
        edges: diagram.edges(),
    };
    let file = std::fs::File::create(output).with_context(|| format!("failed to create {:?}", output))?;
    serde_yaml::to_writer(file, &dump).context("failed to write YAML")?;
    Ok(())
}

fn render_animation(
    args: &Args,
    board: &mut SiteBoard<FortuneEngine>,
    output: &Path,
    interrupted: &AtomicBool,
) -> anyhow::Result<()> {
    let fps = args.fps.max(1);
    let dt = 1.0 / fps as f64;
    let canvas = Canvas::new(board.bounds(), args.width, args.height);

    println!("Rendering {} frames at {} fps", args.frames, fps);
    let progress = ProgressBar::new(args.frames as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut encoder = GifWriter::create(output, args.width, args.height, fps)?;
    let mut frames_rendered = 0usize;
    let mut build_time = Duration::ZERO;
    let render_start = Instant::now();

    for frame in 0..args.frames {
        if interrupted.load(Ordering::Relaxed) {
            progress.abandon_with_message("Interrupted");
            eprintln!(
                "Interrupted after {} of {} frames, finalizing partial output...",
                frames_rendered, args.frames
            );
            break;
        }

        let build_start = Instant::now();
        let handle = board.rebuild()?;
        build_time += build_start.elapsed();
        let diagram = handle.diagram()?;
        tracing::debug!(frame, edges = diagram.edge_count(), "frame built");

        let image = canvas.draw(diagram, args.show_cells, !args.hide_sites);
        encoder.write_frame(image.as_raw())?;
        board.step(args.speed, dt);

        frames_rendered += 1;
        progress.inc(1);
    }

    if frames_rendered == 0 {
        eprintln!("No frames rendered.");
        return Ok(());
    }
    if !interrupted.load(Ordering::Relaxed) {
        progress.finish_with_message("Rendering complete");
    }

    let total_wall = render_start.elapsed();
    let partial = if interrupted.load(Ordering::Relaxed) { "partial" } else { "complete" };
    println!("Output saved to: {:?} ({} frames, {})", output, frames_rendered, partial);
    println!(
        "Render time: {:.1}s wall, {:.2} ms/frame building, {:.2} fps avg",
        total_wall.as_secs_f64(),
        build_time.as_secs_f64() * 1000.0 / frames_rendered as f64,
        frames_rendered as f64 / total_wall.as_secs_f64()
    );
    Ok(())
}

fn random_sites(count: usize, bounds: &BoundingBox, seed: u64) -> Vec<Point> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Point::new(
                bounds.min.x + rng.gen::<f64>() * bounds.width(),
                bounds.min.y + rng.gen::<f64>() * bounds.height(),
            )
        })
        .collect()
}

/// Time `build` across site counts
fn run_benchmark(args: &Args, config: &Config, interrupted: &AtomicBool) -> anyhow::Result<()> {
    let iters = args.bench_iters.max(1);

    println!("\n=== Voronoi Benchmark ===");
    println!("Box: {} x {}", config.bounds.width(), config.bounds.height());
    println!("Builds per size: {}", iters);
    println!();
    println!("{:>8} {:>8} {:>10} {:>10} {:>12}", "sites", "edges", "avg_ms", "min_ms", "sites/ms");

    for &count in &args.bench_sizes {
        if interrupted.load(Ordering::Relaxed) {
            eprintln!("Interrupted, skipping remaining sizes");
            break;
        }
        let sites = random_sites(count, &config.bounds, config.seed);

        // Warmup
        let edges = build_with(&sites, config.bounds, &config.options)?.edge_count()?;

        let mut times = Vec::with_capacity(iters);
        for _ in 0..iters {
            let start = Instant::now();
            let handle = build_with(&sites, config.bounds, &config.options)?;
            times.push(start.elapsed());
            drop(handle);
        }
        let avg = times.iter().sum::<Duration>().as_secs_f64() * 1000.0 / iters as f64;
        let min = times.iter().min().copied().unwrap_or_default().as_secs_f64() * 1000.0;
        println!("{:>8} {:>8} {:>10.3} {:>10.3} {:>12.1}", count, edges, avg, min, count as f64 / avg);
    }
    Ok(())
}

/// Maps diagram coordinates onto a pixel raster, y growing downward like a
/// canvas.
struct Canvas {
    bounds: BoundingBox,
    width: u32,
    height: u32,
}

const EDGE_COLOR: image::Rgb<u8> = image::Rgb([20, 20, 30]);
const SITE_COLOR: image::Rgb<u8> = image::Rgb([200, 30, 30]);
const BACKGROUND: image::Rgb<u8> = image::Rgb([255, 255, 255]);

impl Canvas {
    fn new(bounds: BoundingBox, width: u32, height: u32) -> Self {
        Self {
            bounds,
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn to_pixel(&self, p: &Point) -> (f64, f64) {
        let sx = self.width as f64 / self.bounds.width().max(f64::MIN_POSITIVE);
        let sy = self.height as f64 / self.bounds.height().max(f64::MIN_POSITIVE);
        ((p.x - self.bounds.min.x) * sx, (p.y - self.bounds.min.y) * sy)
    }

    fn draw(&self, diagram: &Diagram, show_cells: bool, show_sites: bool) -> image::RgbImage {
        let mut image = image::RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let sites: Vec<Point> = diagram.sites().iter().map(|s| s.pos).collect();

        if show_cells {
            if let Some(labels) = raster::label(&sites, &self.bounds, self.width, self.height) {
                for (i, &cell) in labels.cells.iter().enumerate() {
                    let (x, y) = (i as u32 % self.width, i as u32 / self.width);
                    image.put_pixel(x, y, cell_color(cell as usize));
                }
            }
        }
        for edge in diagram.edges() {
            self.draw_line(&mut image, &edge.a, &edge.b);
        }
        if show_sites {
            self.draw_sites(&mut image, &sites);
        }
        image
    }

    fn put(&self, image: &mut image::RgbImage, x: i64, y: i64, color: image::Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64 {
            image.put_pixel(x as u32, y as u32, color);
        }
    }

    fn draw_line(&self, image: &mut image::RgbImage, a: &Point, b: &Point) {
        let (x0, y0) = self.to_pixel(a);
        let (x1, y1) = self.to_pixel(b);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            self.put(image, x.floor() as i64, y.floor() as i64, EDGE_COLOR);
        }
    }

    /// Draw 3x3 dots at each site position
    fn draw_sites(&self, image: &mut image::RgbImage, sites: &[Point]) {
        for site in sites {
            let (px, py) = self.to_pixel(site);
            let (cx, cy) = (px.floor() as i64, py.floor() as i64);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    self.put(image, cx + dx, cy + dy, SITE_COLOR);
                }
            }
        }
    }
}

/// Pastel color per cell, spread around the hue circle.
fn cell_color(index: usize) -> image::Rgb<u8> {
    let hue = (index as f64 * 0.618_033_988_749_895).fract() * 6.0;
    let (s, v) = (0.35, 0.97);
    let c = v * s;
    let x = c * (1.0 - (hue % 2.0 - 1.0).abs());
    let (r, g, b) = match hue as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let channel = |u: f64| ((u + m) * 255.0).round() as u8;
    image::Rgb([channel(r), channel(g), channel(b)])
}

/// Streaming GIF writer: frames are quantized and written as they arrive.
struct GifWriter {
    encoder: gif::Encoder<std::fs::File>,
    width: u16,
    height: u16,
    frame_delay: u16,
}

impl GifWriter {
    fn create(output: &Path, width: u32, height: u32, fps: u32) -> anyhow::Result<Self> {
        use gif::{Encoder, Repeat};
        let width = u16::try_from(width).context("GIF width must fit in 16 bits")?;
        let height = u16::try_from(height).context("GIF height must fit in 16 bits")?;
        let file = std::fs::File::create(output).with_context(|| format!("failed to create {:?}", output))?;
        let mut encoder = Encoder::new(file, width, height, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;
        let frame_delay = (100 / fps).max(1) as u16;
        Ok(Self {
            encoder,
            width,
            height,
            frame_delay,
        })
    }

    /// Write one frame's raw RGB pixel data
    fn write_frame(&mut self, rgb_data: &[u8]) -> anyhow::Result<()> {
        let mut pixels: Vec<u8> = Vec::with_capacity(self.width as usize * self.height as usize);
        let mut palette: Vec<[u8; 3]> = Vec::new();

        for chunk in rgb_data.chunks_exact(3) {
            let rgb = [chunk[0], chunk[1], chunk[2]];
            let idx = palette.iter().position(|&c| c == rgb).unwrap_or_else(|| {
                if palette.len() < 256 {
                    palette.push(rgb);
                    palette.len() - 1
                } else {
                    palette
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, c)| {
                            let dr = c[0] as i32 - rgb[0] as i32;
                            let dg = c[1] as i32 - rgb[1] as i32;
                            let db = c[2] as i32 - rgb[2] as i32;
                            dr * dr + dg * dg + db * db
                        })
                        .map(|(i, _)| i)
                        .unwrap_or(0)
                }
            });
            pixels.push(idx as u8);
        }

        palette.resize(256, [0, 0, 0]);
        let flat_palette: Vec<u8> = palette.iter().flat_map(|c| c.iter().copied()).collect();

        let mut frame = gif::Frame::from_palette_pixels(self.width, self.height, pixels, flat_palette, None);
        frame.delay = self.frame_delay;
        self.encoder.write_frame(&frame)?;
        Ok(())
    }
}
