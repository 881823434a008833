use std::path::PathBuf;

use common::{
    config::Settings,
    plot::{ChartSeries, Legend, LegendPosition, LineChart, LineStyle, Plot, YScale, colour},
    util::{DEFAULT_KERNEL_SIZE, output_path, write_plot_data},
};
use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

mod table;

pub use table::{
    MIN_COLUMNS, TIME_COLUMN, Table, X_COLUMN, load_table, read_table, read_table_file,
};

pub const CAPTION: &str = "Effects of string length on header parsing nHeaders=20";
pub const X_DESC: &str = "header key length";
pub const Y_DESC: &str = "micros";

/// Legend labels, in the order the tables are given
pub const LABELS: [&str; 4] = [
    "20% prefix, List",
    "50% prefix, List",
    "20% prefix, HashMap",
    "50% prefix, HashMap",
];

pub const STYLES: [LineStyle; 4] = [
    LineStyle::Solid,
    LineStyle::Points,
    LineStyle::Dashed,
    LineStyle::DashDot,
];

fn default_kernel_size() -> usize {
    DEFAULT_KERNEL_SIZE
}

/// Key length vs. smoothed parse time for four header key benchmark tables
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringLength {
    /// Tables for 20% and 50% prefix with a list, then with a hash map
    pub files: [PathBuf; 4],
    /// Median filter window for the time column
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    /// Image to write, defaults to `<plot_dir>/string-length.png`
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PlotData<'a> {
    label: &'a str,
    points: &'a [(f64, f64)],
}

impl StringLength {
    pub fn new(files: [PathBuf; 4], kernel_size: usize, output: Option<PathBuf>) -> Self {
        Self {
            files,
            kernel_size,
            output,
        }
    }

    pub fn read_tables(&self) -> Result<Vec<Table>> {
        self.files
            .iter()
            .map(|file| {
                read_table_file(file, self.kernel_size)
                    .wrap_err_with(|| format!("Read benchmark table {file:?}"))
            })
            .collect()
    }
}

#[typetag::serde]
impl Plot for StringLength {
    fn name(&self) -> &'static str {
        "string-length"
    }

    fn plot(&self, settings: &Settings) -> Result<PathBuf> {
        let tables = self.read_tables()?;
        let series = chart_series(&tables)?;

        if settings.plot_data {
            let data: Vec<_> = series
                .iter()
                .map(|s| PlotData {
                    label: &s.label,
                    points: &s.points,
                })
                .collect();
            write_plot_data(&settings.plot_dir, self.name(), &data)?;
        }

        let path = output_path(&settings.plot_dir, self.output.as_deref(), self.name())?;
        LineChart::new()
            .caption(CAPTION)
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .y_scale(YScale::Linear)
            .size(settings.size)
            .legend(Legend {
                position: LegendPosition::LowerRight,
                columns: 1,
                font_size: 16,
            })
            .render(&path, &series)?;
        info!("Wrote {path:?}");
        Ok(path)
    }
}

/// Column 1 against the smoothed time column, one fixed style per table
pub fn chart_series(tables: &[Table]) -> Result<Vec<ChartSeries>> {
    if tables.len() != LABELS.len() {
        bail!("Expected {} tables, got {}", LABELS.len(), tables.len());
    }
    Ok(tables
        .iter()
        .enumerate()
        .map(|(idx, table)| ChartSeries {
            label: LABELS[idx].to_owned(),
            points: table.points(X_COLUMN, TIME_COLUMN),
            style: STYLES[idx],
            colour: colour(idx),
        })
        .collect())
}
