use anyhow::{Context, Result, bail};
use cgmath::{Deg, Euler};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use splinekit_base::{Quaternion, Vector3};
use splinekit_curve::{CurveSample, CurveSegment, SplineNode, orientation_from_tangent};
use splinekit_mesh::{MeshVertex, SourceMesh, SurfaceMesh};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "splinekit")]
#[command(about = "Sample cubic curve segments and transform source meshes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Sample(SampleArgs),
    Transform(TransformArgs),
}

#[derive(Args)]
struct SampleArgs {
    #[arg(long)]
    curve: PathBuf,
    /// Arc-length spacing; without it the cached table samples are printed.
    #[arg(long)]
    step: Option<f64>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct TransformArgs {
    #[arg(long)]
    mesh: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    translate: Option<String>,
    /// Euler angles in degrees, `x,y,z`.
    #[arg(long, allow_hyphen_values = true)]
    rotate_deg: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    scale: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Deserialize)]
struct NodeFile {
    position: Vector3,
    handle: Vector3,
}

#[derive(Deserialize)]
struct CurveFile {
    start: NodeFile,
    end: NodeFile,
}

#[derive(Serialize)]
struct PlacedSample {
    #[serde(flatten)]
    sample: CurveSample,
    orientation: Quaternion,
}

#[derive(Serialize)]
struct SampleReport {
    length: f64,
    samples: Vec<PlacedSample>,
}

#[derive(Serialize)]
struct TransformReport<'a> {
    vertices: &'a [MeshVertex],
    triangles: &'a [[usize; 3]],
    mirrored: bool,
    min_extent_along_axis: f64,
    span_along_axis: f64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Sample(args) => sample(args),
        Command::Transform(args) => transform(args),
    }
}

fn sample(args: SampleArgs) -> Result<()> {
    let file: CurveFile = read_json(&args.curve)?;
    let start = Rc::new(SplineNode::new(file.start.position, file.start.handle));
    let end = Rc::new(SplineNode::new(file.end.position, file.end.handle));
    let segment = CurveSegment::new(start, end);

    let samples = match args.step {
        Some(step) => arc_length_stations(segment.length(), step)?
            .into_iter()
            .map(|d| segment.sample_at_distance(d))
            .collect::<splinekit_base::Result<Vec<_>>>()
            .context("arc-length query failed")?,
        None => segment.samples().to_vec(),
    };

    let report = SampleReport {
        length: segment.length(),
        samples: samples
            .into_iter()
            .map(|sample| PlacedSample {
                sample,
                orientation: orientation_from_tangent(sample.tangent),
            })
            .collect(),
    };
    info!(length = report.length, samples = report.samples.len(), "curve sampled");
    emit(&report, args.out.as_deref())
}

fn transform(args: TransformArgs) -> Result<()> {
    let mesh: SurfaceMesh = read_json(&args.mesh)?;
    let mut source = SourceMesh::build(Arc::new(mesh));
    if let Some(text) = &args.rotate_deg {
        let [x, y, z] = parse_triple(text).context("invalid --rotate-deg")?;
        source = source.rotate(Quaternion::from(Euler::new(Deg(x), Deg(y), Deg(z))));
    }
    if let Some(text) = &args.scale {
        let [x, y, z] = parse_triple(text).context("invalid --scale")?;
        source = source.scale(Vector3::new(x, y, z));
    }
    if let Some(text) = &args.translate {
        let [x, y, z] = parse_triple(text).context("invalid --translate")?;
        source = source.translate(Vector3::new(x, y, z));
    }

    let report = TransformReport {
        vertices: source.vertices().context("failed to transform mesh")?,
        triangles: source.triangles()?,
        mirrored: source.is_mirrored(),
        min_extent_along_axis: source.min_extent_along_axis()?,
        span_along_axis: source.span_along_axis()?,
    };
    info!(
        vertices = report.vertices.len(),
        mirrored = report.mirrored,
        "mesh transformed"
    );
    emit(&report, args.out.as_deref())
}

/// Distances `0, step, 2 * step, ...` up to and including `length`.
fn arc_length_stations(length: f64, step: f64) -> Result<Vec<f64>> {
    if step.is_nan() || step <= 0.0 {
        bail!("--step must be > 0, got {step}");
    }
    let count = (length / step).floor() as usize;
    let mut stations: Vec<f64> = (0..=count).map(|i| i as f64 * step).collect();
    stations.retain(|d| *d <= length);
    if stations.last().is_none_or(|last| *last < length) {
        stations.push(length);
    }
    Ok(stations)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read input file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON from {}", path.display()))
}

fn emit<T: Serialize>(report: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output directory {}", parent.display()))?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("write report {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_triple(text: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        bail!("expected three comma-separated numbers, e.g. 1,0,0");
    }

    let x: f64 = parts[0].trim().parse().context("invalid x")?;
    let y: f64 = parts[1].trim().parse().context("invalid y")?;
    let z: f64 = parts[2].trim().parse().context("invalid z")?;
    Ok([x, y, z])
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
