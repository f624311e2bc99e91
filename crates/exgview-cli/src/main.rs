use anyhow::{Context, Result};
use clap::Parser;
use exgview_lib::{
    classify::{classify_table, Classification},
    config::ViewerConfig,
    io::read_recording_csv,
    plot::{compose_figure, AxisSide, Figure, PlotBackend, PlotlyHtml},
    table::Table,
};
use log::{debug, info, warn};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::{
    fs::File,
    io::BufWriter,
    ops::Range,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "exgview",
    version,
    about = "Scrollable multichannel EEG + ECG plot from a CSV recording"
)]
struct Cli {
    /// Path to the recording CSV
    #[arg(short, long)]
    input: PathBuf,
    /// Output HTML file
    #[arg(short, long, default_value = "eeg_ecg_plot.html")]
    output: PathBuf,
    /// Keep every Nth row (1 = full data)
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    downsample: u64,
    /// TOML file with chart settings and extra channel patterns
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Chart title (overrides the config file)
    #[arg(long)]
    title: Option<String>,
    /// Also render a static PNG preview
    #[arg(long)]
    png: Option<PathBuf>,
    /// Print the detected column roles as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cmd_plot(&cli)
}

fn cmd_plot(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(title) = &cli.title {
        config.title = title.clone();
    }

    if !cli.json {
        println!("Reading CSV (skipping '#' lines)...");
    }
    let table = read_recording_csv(&cli.input)?;
    info!(
        "loaded {} columns x {} rows from {}",
        table.columns().len(),
        table.row_count(),
        cli.input.display()
    );
    let classes = classify_table(&table, &config.rules());
    for name in table.column_names() {
        debug!("{}: {}", name, classes.role_of(name).label());
    }
    if classes.plottable_count() == 0 {
        warn!("no EEG, ECG or common-mode columns in {}", cli.input.display());
    }
    if cli.json {
        println!("{}", serde_json::to_string(&classes)?);
    } else {
        print_summary(&table, &classes);
    }

    let downsample = usize::try_from(cli.downsample).context("downsample factor too large")?;
    let fig = compose_figure(&table, &classes, &config.chart_options(downsample))?;
    if downsample > 1 && !cli.json {
        println!(
            "Downsampled by factor {}. New length: {}",
            downsample,
            fig.time.len()
        );
    }

    write_html(&cli.output, &fig, &config.plotly_src)?;
    if let Some(png) = &cli.png {
        draw_plotters_figure(png, &fig)?;
        info!("static preview saved to {}", png.display());
    }
    if !cli.json {
        println!("Interactive plot saved to {}", cli.output.display());
    }
    Ok(())
}

fn print_summary(table: &Table, classes: &Classification) {
    println!("Columns: {:?}", table.column_names());
    println!("Detected:");
    println!("  Time: {}", classes.time.as_deref().unwrap_or("-"));
    if classes.eeg_fallback {
        println!("  EEG: {:?} (numeric fallback)", classes.eeg);
    } else {
        println!("  EEG: {:?}", classes.eeg);
    }
    println!("  ECG: {:?}", classes.ecg);
    println!("  CM : {:?}", classes.common_mode);
    println!("  Ignored: {:?}", classes.ignored);
    if !classes.unclassified.is_empty() {
        println!("  Unclassified: {:?}", classes.unclassified);
    }
}

fn write_html(path: &Path, fig: &Figure, plotly_src: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut backend = PlotlyHtml::with_source(BufWriter::new(file), plotly_src);
    backend.draw(fig)?;
    Ok(())
}

fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        0.0..1.0
    } else if min == max {
        (min - 0.5)..(max + 0.5)
    } else {
        min..max
    }
}

/// Contiguous runs of finite points; missing samples break the line.
fn line_runs(x: &[f64], y: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (xv, yv) in x.iter().zip(y) {
        match yv {
            Some(v) if v.is_finite() && xv.is_finite() => current.push((*xv, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Plotly dash units scaled to bitmap pixels (dash length, gap).
fn dash_pixels(dash: [f32; 2]) -> (u32, u32) {
    let px = |v: f32| (v * 3.0).round().max(1.0) as u32;
    (px(dash[0]), px(dash[1]))
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (1200, fig.height));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let x_values: Vec<f64> = fig
        .time
        .iter()
        .enumerate()
        .map(|(i, cell)| cell.as_f64().unwrap_or(i as f64))
        .collect();
    let axis_values = |side: AxisSide| {
        fig.series
            .iter()
            .filter(move |s| s.axis == side)
            .flat_map(|s| s.y.iter().flatten().copied())
    };
    let x_range = value_range(x_values.iter().copied());
    let y_range = value_range(axis_values(AxisSide::Primary));
    let y2_range = value_range(axis_values(AxisSide::Secondary));

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range)?
        .set_secondary_coord(x_range, y2_range);
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc(fig.y2.label.clone().unwrap_or_default())
        .draw()?;

    for series in &fig.series {
        let (r, g, b) = series.style.color.rgb();
        let style = RGBColor(r, g, b).stroke_width(series.style.width.ceil().max(1.0) as u32);
        for run in line_runs(&x_values, &series.y) {
            match (series.axis, series.style.dash.map(dash_pixels)) {
                (AxisSide::Primary, None) => {
                    chart.draw_series(LineSeries::new(run, style))?;
                }
                (AxisSide::Primary, Some((size, gap))) => {
                    chart.draw_series(DashedLineSeries::new(run, size, gap, style))?;
                }
                (AxisSide::Secondary, None) => {
                    chart.draw_secondary_series(LineSeries::new(run, style))?;
                }
                (AxisSide::Secondary, Some((size, gap))) => {
                    chart.draw_secondary_series(DashedLineSeries::new(run, size, gap, style))?;
                }
            }
        }
    }
    root.present()?;
    Ok(())
}
