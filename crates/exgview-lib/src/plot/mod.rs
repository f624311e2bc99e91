pub mod html;

use crate::classify::{ChannelRole, Classification};
use crate::error::{ExgError, Result};
use crate::table::{Cell, Table};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub use html::PlotlyHtml;

pub const DEFAULT_TITLE: &str = "EEG + ECG Multichannel Plot";
pub const DEFAULT_HEIGHT: u32 = 700;

/// ECG and common-mode channels are stored in µV-scale source units.
pub const MILLIVOLT_DIVISOR: f64 = 1000.0;

const PALETTE: [u32; 10] = [
    0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD, 0x8C564B, 0xE377C2, 0x7F7F7F, 0xBCBD22,
    0x17BECF,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

impl Axis {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisSide {
    Primary,
    Secondary,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }

    pub fn hex(&self) -> String {
        format!("#{:06x}", self.0 & 0xFF_FFFF)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    /// Dash/gap lengths in pixels; `None` is a solid line.
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

/// One plotted channel. `y` has one entry per row of the (downsampled) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub column: String,
    pub role: ChannelRole,
    pub axis: AxisSide,
    pub y: Vec<Option<f64>>,
    pub style: Style,
}

/// Named visibility vector over every series of a figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityPreset {
    pub label: String,
    pub visible: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub height: u32,
    pub x: Axis,
    pub y: Axis,
    pub y2: Axis,
    /// Shared x values taken from the time column.
    pub time: Vec<Cell>,
    pub series: Vec<Series>,
    pub presets: Vec<VisibilityPreset>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            height: DEFAULT_HEIGHT,
            x: Axis::labeled("Time (s)"),
            y: Axis::labeled("EEG (µV)"),
            y2: Axis::labeled("ECG / CM (mV)"),
            time: Vec::new(),
            series: Vec::new(),
            presets: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn indices_for(&self, roles: &[ChannelRole]) -> Vec<usize> {
        self.series
            .iter()
            .enumerate()
            .filter(|(_, s)| roles.contains(&s.role))
            .map(|(i, _)| i)
            .collect()
    }

    /// The four toggle groups exposed by renderers: all, EEG only, ECG+CM only, none.
    pub fn build_presets(&mut self) {
        let all = [
            ChannelRole::Eeg,
            ChannelRole::Ecg,
            ChannelRole::CommonMode,
        ];
        self.presets = vec![
            self.preset("All", &all),
            self.preset("EEG only", &[ChannelRole::Eeg]),
            self.preset("ECG+CM only", &[ChannelRole::Ecg, ChannelRole::CommonMode]),
            self.preset("Hide all", &[]),
        ];
    }

    fn preset(&self, label: &str, roles: &[ChannelRole]) -> VisibilityPreset {
        let shown = self.indices_for(roles);
        VisibilityPreset {
            label: label.to_string(),
            visible: (0..self.series.len()).map(|i| shown.contains(&i)).collect(),
        }
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()>;
}

/// Inputs to [`compose_figure`] beyond the table and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub height: u32,
    pub downsample: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            height: DEFAULT_HEIGHT,
            downsample: 1,
        }
    }
}

fn palette_color(idx: usize) -> Color {
    Color(PALETTE[idx % PALETTE.len()])
}

fn scaled(values: Vec<Option<f64>>, divisor: f64) -> Vec<Option<f64>> {
    values.into_iter().map(|v| v.map(|x| x / divisor)).collect()
}

/// Build the dual-axis figure: EEG in µV on the primary axis, ECG and common
/// mode converted to mV on the secondary axis. Fails with
/// [`ExgError::NoPlottableChannels`] when no series would be drawn.
pub fn compose_figure(
    table: &Table,
    classes: &Classification,
    opts: &ChartOptions,
) -> Result<Figure> {
    let table = table.downsample(opts.downsample)?;
    if opts.downsample > 1 {
        info!(
            "downsampled by factor {}; new length {}",
            opts.downsample,
            table.row_count()
        );
    }

    let mut fig = Figure::new(Some(opts.title.clone()));
    fig.height = opts.height;

    let groups = [
        (ChannelRole::Eeg, &classes.eeg),
        (ChannelRole::Ecg, &classes.ecg),
        (ChannelRole::CommonMode, &classes.common_mode),
    ];
    for (role, columns) in groups {
        for name in columns {
            let Some(column) = table.column(name) else {
                warn!("classified column '{}' is missing from the table", name);
                continue;
            };
            let coerced = column.text_count();
            if coerced > 0 {
                warn!(
                    "{} non-numeric cell(s) in '{}' treated as missing",
                    coerced, name
                );
            }
            let color = palette_color(fig.series.len());
            let series = match role {
                ChannelRole::Ecg => Series {
                    name: format!("{} (mV)", name),
                    column: name.clone(),
                    role,
                    axis: AxisSide::Secondary,
                    y: scaled(column.to_numeric(), MILLIVOLT_DIVISOR),
                    style: Style {
                        width: 1.4,
                        dash: None,
                        color,
                    },
                },
                ChannelRole::CommonMode => Series {
                    name: format!("{} (mV, CM)", name),
                    column: name.clone(),
                    role,
                    axis: AxisSide::Secondary,
                    y: scaled(column.to_numeric(), MILLIVOLT_DIVISOR),
                    style: Style {
                        width: 1.4,
                        dash: Some([2.0, 2.0]),
                        color,
                    },
                },
                _ => Series {
                    name: name.clone(),
                    column: name.clone(),
                    role,
                    axis: AxisSide::Primary,
                    y: column.to_numeric(),
                    style: Style {
                        width: 1.0,
                        dash: None,
                        color,
                    },
                },
            };
            fig.add_series(series);
        }
    }

    if fig.series.is_empty() {
        return Err(ExgError::NoPlottableChannels);
    }

    fig.time = match classes.time.as_deref().and_then(|name| table.column(name)) {
        Some(column) => column.cells.clone(),
        None => (0..table.row_count())
            .map(|i| Cell::Number(i as f64))
            .collect(),
    };
    fig.build_presets();
    Ok(fig)
}
