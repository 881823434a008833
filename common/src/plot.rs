use core::fmt::Debug;
use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result, bail};
use itertools::{Itertools, MinMaxResult};
use plotters::{
    coord::{
        Shift,
        ranged1d::{AsRangedCoord, ValueFormatter},
    },
    prelude::*,
};
use tracing::{debug, warn};

use crate::{config::Settings, util::ensure_parent};

/// Pixel position on the drawing backend
pub type Pixel = (i32, i32);

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// Name of the plot, for logging and default file names
    fn name(&self) -> &'static str;
    /// Reads the inputs and renders the chart
    ///
    /// Arguments:
    /// * `settings` - Output directory, image size and data dump switches
    ///
    /// Returns the path of the written image.
    fn plot(&self, settings: &Settings) -> Result<PathBuf>;
}
clone_trait_object!(Plot);

/// Runs every plot in order, stopping at the first failure
pub fn plot(plots: &[Box<dyn Plot>], settings: &Settings) -> Result<Vec<PathBuf>> {
    if plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }

    plots
        .iter()
        .map(|plot| {
            debug!("Running plot {}", plot.name());
            plot.plot(settings)
                .wrap_err_with(|| format!("Plot {}", plot.name()))
        })
        .collect()
}

macro_rules! hexcolour {
    ($colour:literal) => {
        RGBColor(
            (($colour & 0xFF0000) >> 16) as u8,
            (($colour & 0x00FF00) >> 8) as u8,
            ($colour & 0x0000FF) as u8,
        )
    };
}

const COLOURS: &[RGBColor] = &[
    hexcolour!(0x1F77B4),
    hexcolour!(0xFF7F0E),
    hexcolour!(0x2CA02C),
    hexcolour!(0xD62728),
    hexcolour!(0x9467BD),
    hexcolour!(0x8C564B),
    hexcolour!(0xE377C2),
    hexcolour!(0x7F7F7F),
    hexcolour!(0xBCBD22),
    hexcolour!(0x17BECF),
];

pub fn colour(idx: usize) -> RGBColor {
    COLOURS[idx % COLOURS.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Points,
    DashDot,
    Dotted,
    DottedPoints,
}

/// Style cycle for multi-series benchmark plots
pub const BENCH_LOG_STYLES: &[LineStyle] = &[
    LineStyle::Solid,
    LineStyle::Dashed,
    LineStyle::Points,
    LineStyle::DashDot,
    LineStyle::Dotted,
    LineStyle::DottedPoints,
];

impl LineStyle {
    /// Alternating on/off lengths in pixels, `None` for an unbroken line
    pub fn dash_pattern(&self) -> Option<&'static [i32]> {
        match self {
            LineStyle::Solid | LineStyle::Points => None,
            LineStyle::Dashed => Some(&[12, 6]),
            LineStyle::DashDot => Some(&[12, 4, 3, 4]),
            LineStyle::Dotted | LineStyle::DottedPoints => Some(&[3, 4]),
        }
    }

    pub fn draws_line(&self) -> bool {
        !matches!(self, LineStyle::Points)
    }

    pub fn draws_markers(&self) -> bool {
        matches!(self, LineStyle::Points | LineStyle::DottedPoints)
    }
}

/// Splits a polyline into the visible pieces of a dash pattern.
///
/// `pattern` alternates on and off lengths starting with on. An odd-length
/// pattern is repeated once so that on and off keep alternating.
pub fn dash_segments(points: &[Pixel], pattern: &[i32]) -> Vec<Vec<Pixel>> {
    if points.len() < 2 {
        return Vec::new();
    }
    if pattern.is_empty() || pattern.iter().any(|&len| len <= 0) {
        return vec![points.to_vec()];
    }

    let period = if pattern.len() % 2 == 0 {
        pattern.len()
    } else {
        pattern.len() * 2
    };
    let mut idx = 0;
    let mut left = pattern[0] as f64;
    let mut segments = Vec::new();
    let mut current = vec![points[0]];

    for pair in points.windows(2) {
        let (x0, y0) = (pair[0].0 as f64, pair[0].1 as f64);
        let (x1, y1) = (pair[1].0 as f64, pair[1].1 as f64);
        let len = (x1 - x0).hypot(y1 - y0);
        let mut pos = 0.0;

        while len - pos > left {
            pos += left;
            let t = pos / len;
            let split = (
                (x0 + (x1 - x0) * t).round() as i32,
                (y0 + (y1 - y0) * t).round() as i32,
            );
            if idx % 2 == 0 {
                current.push(split);
                segments.push(std::mem::take(&mut current));
            } else {
                current = vec![split];
            }
            idx = (idx + 1) % period;
            left = pattern[idx % pattern.len()] as f64;
        }

        left -= len - pos;
        if idx % 2 == 0 {
            current.push(pair[1]);
        }
    }

    if idx % 2 == 0 && current.len() >= 2 {
        segments.push(current);
    }
    segments
}

/// Draws a polyline in backend pixels with the given style
pub fn draw_styled_path<DB>(
    root: &DrawingArea<DB, Shift>,
    points: &[Pixel],
    style: LineStyle,
    colour: RGBColor,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if style.draws_line() && points.len() >= 2 {
        match style.dash_pattern() {
            Some(pattern) => {
                for segment in dash_segments(points, pattern) {
                    root.draw(&PathElement::new(segment, colour.stroke_width(2)))?;
                }
            }
            None => root.draw(&PathElement::new(points.to_vec(), colour.stroke_width(2)))?,
        }
    }
    if style.draws_markers() {
        for point in points {
            root.draw(&Circle::new(*point, 3, colour.filled()))?;
        }
    }
    Ok(())
}

/// Axis range over the finite values, padded by 5% of the span
pub fn linear_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    match values
        .into_iter()
        .filter(|v| v.is_finite())
        .minmax_by(f64::total_cmp)
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some(v - 1.0..v + 1.0),
        MinMaxResult::MinMax(min, max) if min == max => Some(min - 1.0..max + 1.0),
        MinMaxResult::MinMax(min, max) => {
            let pad = (max - min) * 0.05;
            Some(min - pad..max + pad)
        }
    }
}

/// Axis range over the positive finite values, padded by a constant factor
pub fn log_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    match values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .minmax_by(f64::total_cmp)
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some(v / 2.0..v * 2.0),
        MinMaxResult::MinMax(min, max) => Some(min / 1.25..max * 1.25),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Legend {
    pub position: LegendPosition,
    pub columns: usize,
    pub font_size: u32,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            position: LegendPosition::LowerRight,
            columns: 1,
            font_size: 16,
        }
    }
}

/// Slot `(row, column)` of each legend entry. Columns are filled top to
/// bottom before moving right.
pub fn legend_layout(entries: usize, columns: usize) -> Vec<(usize, usize)> {
    let columns = columns.clamp(1, entries.max(1));
    let rows = entries.div_ceil(columns);
    (0..entries).map(|i| (i % rows, i / rows)).collect()
}

const LEGEND_GLYPH: i32 = 30;
const LEGEND_GAP: i32 = 6;
const LEGEND_PAD: i32 = 8;
const LEGEND_MARGIN: i32 = 10;

/// One line of a chart, already in plot units
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub style: LineStyle,
    pub colour: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YScale {
    Linear,
    Log2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Bitmap,
    Svg,
}

impl Backend {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => Backend::Svg,
            _ => Backend::Bitmap,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineChart {
    caption: Option<String>,
    x_desc: String,
    y_desc: String,
    y_scale: YScale,
    size: (u32, u32),
    legend: Legend,
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new()
    }
}

impl LineChart {
    pub fn new() -> Self {
        Self {
            caption: None,
            x_desc: String::new(),
            y_desc: String::new(),
            y_scale: YScale::Linear,
            size: (1280, 960),
            legend: Legend::default(),
        }
    }

    pub fn caption(&mut self, caption: impl AsRef<str>) -> &mut Self {
        self.caption = Some(caption.as_ref().to_owned());
        self
    }

    pub fn x_desc(&mut self, x_desc: impl AsRef<str>) -> &mut Self {
        self.x_desc = x_desc.as_ref().to_owned();
        self
    }

    pub fn y_desc(&mut self, y_desc: impl AsRef<str>) -> &mut Self {
        self.y_desc = y_desc.as_ref().to_owned();
        self
    }

    pub fn y_scale(&mut self, y_scale: YScale) -> &mut Self {
        self.y_scale = y_scale;
        self
    }

    pub fn size(&mut self, size: (u32, u32)) -> &mut Self {
        self.size = size;
        self
    }

    pub fn legend(&mut self, legend: Legend) -> &mut Self {
        self.legend = legend;
        self
    }

    /// Drops the points that cannot be placed on the y axis
    fn plottable(&self, series: &[ChartSeries]) -> Vec<ChartSeries> {
        series
            .iter()
            .filter_map(|s| {
                let points: Vec<_> = s
                    .points
                    .iter()
                    .copied()
                    .filter(|(x, y)| {
                        x.is_finite()
                            && y.is_finite()
                            && (self.y_scale == YScale::Linear || *y > 0.0)
                    })
                    .collect();
                if points.len() < s.points.len() {
                    warn!(
                        "Dropping {} points of {:?} that cannot be plotted",
                        s.points.len() - points.len(),
                        s.label
                    );
                }
                if points.is_empty() {
                    warn!("Series {:?} has no data, skipping", s.label);
                    return None;
                }
                Some(ChartSeries {
                    points,
                    ..s.clone()
                })
            })
            .collect()
    }

    /// Renders the series to `path`, as svg or png depending on the extension
    pub fn render(&self, path: &Path, series: &[ChartSeries]) -> Result<()> {
        let series = self.plottable(series);
        if series.is_empty() {
            bail!("Nothing to plot for {path:?}");
        }
        ensure_parent(path)?;

        let size = self.size;
        let rendered = match Backend::for_path(path) {
            Backend::Svg => self.draw(SVGBackend::new(path, size).into_drawing_area(), &series),
            Backend::Bitmap => {
                self.draw(BitMapBackend::new(path, size).into_drawing_area(), &series)
            }
        };
        rendered.wrap_err_with(|| format!("Render {path:?}"))?;
        debug!("Wrote {path:?}");
        Ok(())
    }

    fn draw<DB>(&self, root: DrawingArea<DB, Shift>, series: &[ChartSeries]) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;

        let x_range = linear_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
            .ok_or_else(|| eyre::eyre!("No x values"))?;
        let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        match self.y_scale {
            YScale::Linear => {
                let y_range = linear_range(ys).ok_or_else(|| eyre::eyre!("No y values"))?;
                self.draw_on(&root, x_range, y_range, series)?;
            }
            YScale::Log2 => {
                let y_range = log_range(ys).ok_or_else(|| eyre::eyre!("No positive y values"))?;
                self.draw_on(&root, x_range, y_range.log_scale().base(2.0), series)?;
            }
        }

        root.present()?;
        Ok(())
    }

    fn draw_on<DB, Y>(
        &self,
        root: &DrawingArea<DB, Shift>,
        x_range: Range<f64>,
        y_range: Y,
        series: &[ChartSeries],
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        Y: AsRangedCoord<Value = f64>,
        Y::CoordDescType: ValueFormatter<f64>,
    {
        let mut builder = ChartBuilder::on(root);
        builder
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 90)
            .set_label_area_size(LabelAreaPosition::Bottom, 60);
        if let Some(caption) = &self.caption {
            builder.caption(caption, ("sans-serif", 30));
        }
        let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc(&self.x_desc)
            .y_desc(&self.y_desc)
            .label_style(("sans-serif", 16))
            .draw()?;

        for s in series {
            let pixels: Vec<Pixel> = s.points.iter().map(|p| chart.backend_coord(p)).collect();
            draw_styled_path(root, &pixels, s.style, s.colour)?;
        }

        let area = chart.plotting_area().get_pixel_range();
        self.draw_legend(root, area, series)
    }

    fn draw_legend<DB>(
        &self,
        root: &DrawingArea<DB, Shift>,
        area: (Range<i32>, Range<i32>),
        series: &[ChartSeries],
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        if series.is_empty() {
            return Ok(());
        }
        let font: TextStyle = ("sans-serif", self.legend.font_size).into();
        let slots = legend_layout(series.len(), self.legend.columns);
        let rows = slots.iter().map(|(row, _)| row + 1).max().unwrap_or(1);
        let columns = slots.iter().map(|(_, col)| col + 1).max().unwrap_or(1);
        let row_height = self.legend.font_size as i32 + LEGEND_GAP;

        let mut col_widths = vec![0; columns];
        for (s, (_, col)) in series.iter().zip(&slots) {
            let (text_width, _) = root.estimate_text_size(&s.label, &font)?;
            col_widths[*col] = col_widths[*col].max(text_width as i32);
        }
        let col_widths: Vec<i32> = col_widths
            .into_iter()
            .map(|w| LEGEND_GLYPH + LEGEND_GAP + w + LEGEND_PAD)
            .collect();

        let width = col_widths.iter().sum::<i32>() + LEGEND_PAD;
        let height = rows as i32 * row_height + LEGEND_PAD;
        let (x_area, y_area) = area;
        let x0 = match self.legend.position {
            LegendPosition::UpperLeft | LegendPosition::LowerLeft => x_area.start + LEGEND_MARGIN,
            LegendPosition::UpperRight | LegendPosition::LowerRight => {
                x_area.end - LEGEND_MARGIN - width
            }
        };
        let y0 = match self.legend.position {
            LegendPosition::UpperLeft | LegendPosition::UpperRight => y_area.start + LEGEND_MARGIN,
            LegendPosition::LowerLeft | LegendPosition::LowerRight => {
                y_area.end - LEGEND_MARGIN - height
            }
        };

        root.draw(&Rectangle::new(
            [(x0, y0), (x0 + width, y0 + height)],
            WHITE.mix(0.8).filled(),
        ))?;
        root.draw(&Rectangle::new(
            [(x0, y0), (x0 + width, y0 + height)],
            BLACK.stroke_width(1),
        ))?;

        for (s, (row, col)) in series.iter().zip(&slots) {
            let x = x0 + LEGEND_PAD + col_widths[..*col].iter().sum::<i32>();
            let top = y0 + LEGEND_PAD + *row as i32 * row_height;
            let mid = top + self.legend.font_size as i32 / 2;
            draw_styled_path(root, &[(x, mid), (x + LEGEND_GLYPH, mid)], s.style, s.colour)?;
            root.draw(&Text::new(
                s.label.as_str(),
                (x + LEGEND_GLYPH + LEGEND_GAP, top),
                font.clone(),
            ))?;
        }
        Ok(())
    }
}
