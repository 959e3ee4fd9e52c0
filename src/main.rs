use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dicom_viewport::{FileSource, Series, Size, Viewer, ViewerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dicom-viewport", about = "Render a DICOM series through the viewport")]
#[command(version)]
struct Cli {
    /// A directory of .dcm files, or the frames of the series in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Zoom steps applied around the viewport center
    #[arg(long, default_value_t = 0)]
    zoom: u32,

    /// Frame to render instead of the key image
    #[arg(long)]
    frame: Option<usize>,

    /// Viewer configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn series_from_inputs(inputs: &[PathBuf]) -> Result<Series> {
    if let [dir] = inputs {
        if dir.is_dir() {
            return Series::from_directory(dir)
                .with_context(|| format!("Failed to list {}", dir.display()));
        }
    }
    let paths = inputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    Ok(Series::new("cli", paths))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    let series = series_from_inputs(&cli.inputs)?;
    if series.is_empty() {
        bail!("No DICOM files found");
    }

    let mut viewer = Viewer::new(Arc::new(FileSource::new()), config);
    viewer.on_metadata(|metadata| {
        info!(
            patient = %metadata.patient_name,
            study = %metadata.study_description,
            series = %metadata.series_description,
            "Metadata"
        );
    });
    viewer.resize(Size::new(f64::from(cli.width), f64::from(cli.height)));
    viewer.set_series(series);
    if let Some(frame) = cli.frame {
        viewer.navigate(frame);
    }

    if !viewer.wait_for_current().await {
        bail!("Frame {} could not be loaded", viewer.current_index());
    }
    for _ in 0..cli.zoom {
        viewer.zoom_in();
    }

    let image = viewer.render().context("Nothing to render")?;
    image
        .save(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!(
        frame = viewer.current_index(),
        output = %cli.output.display(),
        "Rendered"
    );
    Ok(())
}
