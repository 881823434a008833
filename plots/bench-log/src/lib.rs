use std::path::PathBuf;

use common::{
    config::Settings,
    plot::{
        BENCH_LOG_STYLES, ChartSeries, Legend, LegendPosition, LineChart, Plot, YScale, colour,
    },
    series::NamedSeries,
    util::{MS_TO_US, output_path, write_plot_data},
};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

mod parse;

pub use parse::{WARMUP_MARKER, parse_log, parse_log_file};

pub const X_DESC: &str = "number of headers";

/// Item count vs. time for every section of a benchmark log, on a base-2
/// log y axis.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchLog {
    /// Benchmark log to read
    pub file: PathBuf,
    /// Y axis description
    pub y_label: String,
    /// Image to write, defaults to `<plot_dir>/<log stem>.png`
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl BenchLog {
    pub fn new(file: PathBuf, y_label: String, output: Option<PathBuf>) -> Self {
        Self {
            file,
            y_label,
            output,
        }
    }

    fn stem(&self) -> &str {
        self.file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_else(|| self.name())
    }
}

#[typetag::serde]
impl Plot for BenchLog {
    fn name(&self) -> &'static str {
        "bench-log"
    }

    fn plot(&self, settings: &Settings) -> Result<PathBuf> {
        let tests = parse_log_file(&self.file)
            .wrap_err_with(|| format!("Parse benchmark log {:?}", self.file))?;
        info!("Parsed {} series from {:?}", tests.len(), self.file);

        let tests = to_micros(&tests);
        if settings.plot_data {
            write_plot_data(&settings.plot_dir, self.stem(), &tests)?;
        }

        let path = output_path(&settings.plot_dir, self.output.as_deref(), self.stem())?;
        LineChart::new()
            .x_desc(X_DESC)
            .y_desc(&self.y_label)
            .y_scale(YScale::Log2)
            .size(settings.size)
            .legend(Legend {
                position: LegendPosition::LowerRight,
                columns: 3,
                font_size: 12,
            })
            .render(&path, &chart_series(&tests))?;
        info!("Wrote {path:?}");
        Ok(path)
    }
}

pub fn to_micros(tests: &[NamedSeries]) -> Vec<NamedSeries> {
    tests.iter().map(|t| t.scaled(MS_TO_US)).collect()
}

/// One chart line per series, cycling through [`BENCH_LOG_STYLES`] in order
pub fn chart_series(tests: &[NamedSeries]) -> Vec<ChartSeries> {
    tests
        .iter()
        .zip(BENCH_LOG_STYLES.iter().cycle())
        .enumerate()
        .map(|(idx, (test, style))| ChartSeries {
            label: test.label.clone(),
            points: test.points().collect(),
            style: *style,
            colour: colour(idx),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use common::{plot::LineStyle, series::Sample};

    use super::*;

    fn sample_log() -> Vec<NamedSeries> {
        parse_log(
            "Warmup\nA\n1,0.5\n2,1.0\nB\n1,0.25\nC\n1,1\nD\n1,1\nE\n1,1\nF\n1,1\nG\n1,1\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn times_are_scaled_to_micros() {
        let tests = to_micros(&sample_log());
        assert_eq!(
            tests[0].samples,
            vec![Sample::new(1, 500.0), Sample::new(2, 1000.0)]
        );
        assert_eq!(tests[1].samples, vec![Sample::new(1, 250.0)]);
    }

    #[test]
    fn styles_cycle_with_series_order() {
        let series = chart_series(&to_micros(&sample_log()));
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].style, LineStyle::Solid);
        assert_eq!(series[1].style, LineStyle::Dashed);
        assert_eq!(series[2].style, LineStyle::Points);
        assert_eq!(series[5].style, LineStyle::DottedPoints);
        assert_eq!(series[6].style, LineStyle::Solid);
        assert_eq!(series[0].points, vec![(1.0, 500.0), (2.0, 1000.0)]);
        assert_eq!(series[3].label, "D");
        assert_ne!(series[0].colour, series[1].colour);
    }

    #[test]
    fn config_round_trips_through_typetag() {
        let plot: Box<dyn Plot> = Box::new(BenchLog::new(
            PathBuf::from("results/map.log"),
            "micros per map".to_owned(),
            None,
        ));
        let json = serde_json::to_string(&plot).unwrap();
        assert!(json.contains(r#""type":"BenchLog""#));
        let back: Box<dyn Plot> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "bench-log");
    }

    #[test]
    fn missing_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            plot_dir: dir.path().to_path_buf(),
            show: false,
            ..Settings::default()
        };
        let plot = BenchLog::new(dir.path().join("none.log"), "us".to_owned(), None);
        let err = plot.plot(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("Parse benchmark log"));
    }

    #[test]
    fn renders_svg_and_png_with_plot_data() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("map.log");
        std::fs::write(
            &log,
            "Warmup\nTreeMap\n1,0.1\n2,0.2\nHashMap\n1,0.05\n2,0.08\nEmpty\n",
        )
        .unwrap();
        let settings = Settings {
            plot_dir: dir.path().to_path_buf(),
            show: false,
            plot_data: true,
            ..Settings::default()
        };

        let svg = dir.path().join("map.svg");
        let png = dir.path().join("map.png");
        for output in [&svg, &png] {
            let plot = BenchLog::new(log.clone(), "micros".to_owned(), Some(output.clone()));
            assert_eq!(&plot.plot(&settings).unwrap(), output);
            assert!(output.exists());
        }

        let text = std::fs::read_to_string(&svg).unwrap();
        for expected in ["TreeMap", "HashMap", X_DESC, "micros"] {
            assert!(text.contains(expected), "{expected} missing from svg");
        }
        // a trailing label without rows has nothing to draw
        assert!(!text.contains("Empty"));

        let data = std::fs::read_to_string(dir.path().join("plot_data").join("map.json")).unwrap();
        let data: Vec<NamedSeries> = serde_json::from_str(&data).unwrap();
        let labels: Vec<_> = data.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["TreeMap", "HashMap", "Empty"]);
        assert_eq!(data[0].samples[0].item_count, 1);
        assert!((data[0].samples[0].time - 100.0).abs() < 1e-9);
        assert!((data[1].samples[1].time - 80.0).abs() < 1e-9);
        assert!(data[2].is_empty());
    }
}
