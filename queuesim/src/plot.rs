//! Charts of sweep results against traffic intensity, with one line per buffer capacity.
//!
//! Charts are rendered as SVG files, one per metric and simulated time. Repetitions of the same
//! grid point are averaged into a single point of the line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ordered_float::OrderedFloat;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::experiment::RunRecord;
use crate::{Error, Result};

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;

/// Metric on the vertical axis of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Metric {
    /// Time-average number of packets in the system.
    #[strum(serialize = "en")]
    MeanOccupancy,
    /// Proportion of time the server is idle.
    #[strum(serialize = "p_idle")]
    IdleProbability,
    /// Proportion of dropped packets.
    #[strum(serialize = "p_loss")]
    LossProbability,
}

impl Metric {
    /// All metrics, in the order their charts are drawn.
    pub const ALL: [Self; 3] = [
        Self::MeanOccupancy,
        Self::IdleProbability,
        Self::LossProbability,
    ];

    /// Value of the metric in `record`, if it has one.
    #[must_use]
    pub fn value(self, record: &RunRecord) -> Option<f64> {
        match self {
            Self::MeanOccupancy => Some(record.mean_occupancy),
            Self::IdleProbability => Some(record.idle_probability),
            Self::LossProbability => record.loss_probability,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::MeanOccupancy => "Average number of packets vs traffic intensity",
            Self::IdleProbability => "Proportion of time the server is idle vs traffic intensity",
            Self::LossProbability => "Probability of packet loss vs traffic intensity",
        }
    }

    fn axis_label(self) -> &'static str {
        match self {
            Self::MeanOccupancy => "E[N]",
            Self::IdleProbability => "P_idle",
            Self::LossProbability => "P_loss",
        }
    }
}

/// A line of a chart: `(rho, value)` points of a single buffer capacity, sorted by `rho`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Buffer capacity; `None` for an unbounded buffer.
    pub capacity: Option<usize>,
    /// Points sorted by traffic intensity.
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Legend entry.
    #[must_use]
    pub fn name(&self) -> String {
        match self.capacity {
            Some(k) => format!("K = {}", k),
            None => String::from("K = inf"),
        }
    }
}

/// A chart of one metric for one simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Plotted metric.
    pub metric: Metric,
    /// Simulated time shared by all the records of the chart.
    pub horizon: f64,
    /// One line per capacity, in increasing order of capacity, unbounded first.
    pub series: Vec<Series>,
}

impl Chart {
    /// Name of the file the chart is written to.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-T-{}.svg", self.metric, self.horizon)
    }
}

type Grid = BTreeMap<OrderedFloat<f64>, BTreeMap<Option<usize>, BTreeMap<OrderedFloat<f64>, Vec<f64>>>>;

/// Builds the charts of all metrics for every simulated time in `records`.
///
/// A chart is produced only if some line has at least two traffic intensities; a metric missing
/// from all records (loss probability of unbounded buffers) produces no chart.
#[must_use]
pub fn charts(records: &[RunRecord]) -> Vec<Chart> {
    let mut charts = Vec::new();
    for &metric in &Metric::ALL {
        let mut grid = Grid::new();
        for record in records {
            if let Some(value) = metric.value(record) {
                grid.entry(OrderedFloat(record.horizon))
                    .or_default()
                    .entry(record.capacity)
                    .or_default()
                    .entry(OrderedFloat(record.rho))
                    .or_default()
                    .push(value);
            }
        }
        for (horizon, lines) in grid {
            let series: Vec<Series> = lines
                .into_iter()
                .map(|(capacity, points)| Series {
                    capacity,
                    points: points
                        .into_iter()
                        .map(|(rho, values)| {
                            let mean = values.iter().sum::<f64>() / values.len() as f64;
                            (rho.into_inner(), mean)
                        })
                        .collect(),
                })
                .collect();
            if series.iter().any(|s| s.points.len() > 1) {
                charts.push(Chart {
                    metric,
                    horizon: horizon.into_inner(),
                    series,
                });
            }
        }
    }
    charts
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> Error {
    Error::Plot(err.to_string())
}

fn value_range(chart: &Chart) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let points = || chart.series.iter().flat_map(|s| s.points.iter());
    let rho_min = points().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let rho_max = points().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let value_max = points().map(|p| p.1).fold(0.0, f64::max);
    let x = if rho_max > rho_min {
        rho_min..rho_max
    } else {
        rho_min - 0.5..rho_min + 0.5
    };
    let y = if value_max > 0.0 {
        0.0..value_max * 1.05
    } else {
        0.0..1.0
    };
    (x, y)
}

/// Renders `chart` as an SVG file at `path`.
///
/// # Errors
///
/// Returns [`Error::Plot`] if the chart has no points or cannot be rendered.
pub fn draw(chart: &Chart, path: &Path) -> Result<()> {
    if chart.series.iter().all(|s| s.points.is_empty()) {
        return Err(Error::Plot(format!("no points to draw in {}", path.display())));
    }
    let (x_range, y_range) = value_range(chart);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let mut context = ChartBuilder::on(&root)
        .caption(
            format!("{} (T = {} s)", chart.metric.title(), chart.horizon),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;
    context
        .configure_mesh()
        .x_desc("Traffic intensity (rho)")
        .y_desc(chart.metric.axis_label())
        .axis_desc_style(("sans-serif", 20))
        .draw()
        .map_err(plot_error)?;

    for (idx, series) in chart.series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        context
            .draw_series(LineSeries::new(
                series.points.iter().copied(),
                color.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label(series.name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        context
            .draw_series(
                series
                    .points
                    .iter()
                    .map(|&point| Circle::new(point, 4, color.filled())),
            )
            .map_err(plot_error)?;
    }

    context
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    Ok(())
}

/// Draws all [`charts`] of `records` into `dir`, creating it if needed.
/// Returns the paths of the written files.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or any chart fails to render.
pub fn plot_records(records: &[RunRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    charts(records)
        .iter()
        .map(|chart| -> Result<PathBuf> {
            let path = dir.join(chart.file_name());
            log::debug!("Drawing {}", path.display());
            draw(chart, &path)?;
            Ok(path)
        })
        .collect()
}
