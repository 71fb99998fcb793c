use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use reefline::{
    PlaybackRenderer, RendererConfig, TimelineScrollModel, TrackIndex, VideoAnnotations, geom,
};

#[derive(Parser, Debug)]
#[command(name = "reefline", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the timeline lane layout for a video's annotations.
    Lanes(LanesArgs),
    /// Sample the interpolated geometry of every active annotation at a time.
    Sample(SampleArgs),
}

#[derive(Parser, Debug)]
struct LanesArgs {
    /// Input annotations JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline track width in pixels.
    #[arg(long, default_value_t = 1000.0)]
    track_width: f64,

    /// Lane height in pixels.
    #[arg(long, default_value_t = 18.0)]
    lane_height: f64,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Input annotations JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Lanes(args) => cmd_lanes(args),
        Command::Sample(args) => cmd_sample(args),
    }
}

fn read_annotations_json(path: &Path) -> anyhow::Result<VideoAnnotations> {
    let f = File::open(path).with_context(|| format!("open annotations '{}'", path.display()))?;
    let r = BufReader::new(f);
    let video: VideoAnnotations =
        serde_json::from_reader(r).with_context(|| "parse annotations JSON")?;
    Ok(video)
}

#[derive(serde::Serialize)]
struct LaneRow {
    annotation: u64,
    lane: usize,
    start_px: f64,
    end_px: f64,
}

#[derive(serde::Serialize)]
struct LaneBlockOut {
    label: u64,
    top: f64,
    height: f64,
    lane_count: usize,
    rows: Vec<LaneRow>,
}

#[derive(serde::Serialize)]
struct LanesOut {
    total_height: f64,
    blocks: Vec<LaneBlockOut>,
}

fn cmd_lanes(args: LanesArgs) -> anyhow::Result<()> {
    let video = read_annotations_json(&args.in_path)?;
    for ann in &video.annotations {
        ann.validate()?;
    }

    let index = TrackIndex::build(&video.annotations);
    let mut timeline =
        TimelineScrollModel::new(video.duration, args.track_width, args.lane_height)?;
    timeline.set_lane_counts(index.lane_counts());

    let mut blocks = Vec::new();
    for block in timeline.blocks() {
        let group = index
            .groups()
            .iter()
            .find(|g| g.label == block.label)
            .with_context(|| format!("no lane group for label {}", block.label.0))?;
        let mut rows = Vec::new();
        for &(id, lane) in &group.assignment.lanes {
            let ann = video
                .annotations
                .iter()
                .find(|a| a.id == id)
                .with_context(|| format!("lane row references unknown annotation {}", id.0))?;
            let iv = ann.interval();
            rows.push(LaneRow {
                annotation: id.0,
                lane,
                start_px: timeline.pixel_x(iv.start),
                end_px: timeline.pixel_x(iv.end),
            });
        }
        blocks.push(LaneBlockOut {
            label: block.label.0,
            top: block.top,
            height: block.height,
            lane_count: block.lane_count,
            rows,
        });
    }

    let out = LanesOut {
        total_height: timeline.total_height(),
        blocks,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[derive(serde::Serialize)]
struct SampleRow {
    annotation: u64,
    shape: &'static str,
    points: Vec<f64>,
    selected: bool,
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let video = read_annotations_json(&args.in_path)?;
    for ann in &video.annotations {
        ann.validate()?;
    }

    let mut renderer = PlaybackRenderer::new(RendererConfig::new(video.frame_height));
    renderer.set_annotations(video.annotations);
    renderer.settle(args.time);

    let mut rows: Vec<SampleRow> = renderer
        .features()
        .map(|f| SampleRow {
            annotation: f.annotation.0,
            shape: f.geometry.shape().tag(),
            points: geom::encode(&f.geometry, video.frame_height),
            selected: f.selected,
        })
        .collect();
    rows.sort_by_key(|r| r.annotation);

    println!("{}", serde_json::to_string_pretty(&rows)?);
    eprintln!("{} annotation(s) active at t={}", rows.len(), args.time);
    Ok(())
}
