use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::ParseError;

pub const MS_TO_US: f64 = 1000.0;

/// Default window of [`median_filter`], matching the usual 3-point smoothing
pub const DEFAULT_KERNEL_SIZE: usize = 3;

pub fn scale_to_micros(values: &mut [f64]) {
    for value in values {
        *value *= MS_TO_US;
    }
}

/// 1-D median filter over a window of `kernel_size` values centred on each
/// index. Positions past either end of `values` count as `0.0`.
pub fn median_filter(values: &[f64], kernel_size: usize) -> Result<Vec<f64>, ParseError> {
    if kernel_size % 2 == 0 {
        return Err(ParseError::InvalidKernel(kernel_size));
    }
    let half = kernel_size / 2;
    let mut window = Vec::with_capacity(kernel_size);
    Ok((0..values.len())
        .map(|i| {
            window.clear();
            window.extend((0..kernel_size).map(|k| {
                (i + k)
                    .checked_sub(half)
                    .and_then(|j| values.get(j))
                    .copied()
                    .unwrap_or(0.0)
            }));
            window.sort_unstable_by(f64::total_cmp);
            window[half]
        })
        .collect())
}

/// Turns free text (a file stem, a plot name) into something safe to use as a
/// file name.
pub fn sanitize_name(name: &str) -> Result<String> {
    let re = Regex::new(r"[^A-Za-z0-9._-]+")?;
    let name = re.replace_all(name.trim(), "-");
    let name = name.trim_matches('-');
    if name.is_empty() {
        Ok("plot".to_owned())
    } else {
        Ok(name.to_owned())
    }
}

/// Picks the image path for a plot: the explicit output if one was given,
/// otherwise `<plot_dir>/<stem>.png`.
pub fn output_path(plot_dir: &Path, output: Option<&Path>, stem: &str) -> Result<PathBuf> {
    match output {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(plot_dir.join(format!("{}.png", sanitize_name(stem)?))),
    }
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).wrap_err_with(|| format!("Create dir {parent:?}"))?;
    }
    Ok(())
}

/// Dumps the data behind a plot to `<plot_dir>/plot_data/<stem>.json`
pub fn write_plot_data<T: Serialize + ?Sized>(
    plot_dir: &Path,
    stem: &str,
    data: &T,
) -> Result<PathBuf> {
    let plot_data_dir = plot_dir.join("plot_data");
    if !plot_data_dir.exists() {
        fs::create_dir_all(&plot_data_dir)?;
    }
    let data_path = plot_data_dir.join(format!("{}.json", sanitize_name(stem)?));
    fs::write(&data_path, serde_json::to_string(data)?)
        .wrap_err_with(|| format!("Write plot data {data_path:?}"))?;
    debug!("Wrote plot data to {data_path:?}");
    Ok(data_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_filter_zero_pads_edges() {
        let filtered = median_filter(&[1.0, 5.0, 2.0, 8.0, 3.0], 3).unwrap();
        assert_eq!(filtered, vec![1.0, 2.0, 5.0, 3.0, 3.0]);
    }

    #[test]
    fn median_filter_wider_kernel() {
        let filtered = median_filter(&[4.0, 4.0, 9.0, 4.0, 4.0], 5).unwrap();
        assert_eq!(filtered, vec![4.0, 4.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn median_filter_kernel_of_one_is_identity() {
        let values = [3.0, -1.0, 7.5];
        assert_eq!(median_filter(&values, 1).unwrap(), values.to_vec());
    }

    #[test]
    fn median_filter_rejects_even_kernel() {
        assert!(matches!(
            median_filter(&[1.0], 4),
            Err(ParseError::InvalidKernel(4))
        ));
        assert!(matches!(
            median_filter(&[1.0], 0),
            Err(ParseError::InvalidKernel(0))
        ));
    }

    #[test]
    fn median_filter_empty_input() {
        assert!(median_filter(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn scale_to_micros_multiplies_by_thousand() {
        let mut values = [0.001, 1.5, 0.0];
        scale_to_micros(&mut values);
        assert_eq!(values, [1.0, 1500.0, 0.0]);
    }

    #[test]
    fn sanitize_name_replaces_unsafe_runs() {
        assert_eq!(
            sanitize_name("HashMap String preallocate 64").unwrap(),
            "HashMap-String-preallocate-64"
        );
        assert_eq!(sanitize_name(" map/out.log ").unwrap(), "map-out.log");
        assert_eq!(sanitize_name("///").unwrap(), "plot");
    }

    #[test]
    fn output_path_defaults_into_plot_dir() {
        let path = output_path(Path::new("plots"), None, "map bench").unwrap();
        assert_eq!(path, PathBuf::from("plots/map-bench.png"));
        let explicit = output_path(Path::new("plots"), Some(Path::new("x.svg")), "y").unwrap();
        assert_eq!(explicit, PathBuf::from("x.svg"));
    }

    #[test]
    fn write_plot_data_creates_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plot_data(dir.path(), "run 1", &vec![1, 2, 3]).unwrap();
        assert_eq!(path, dir.path().join("plot_data").join("run-1.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "[1,2,3]");
    }
}
