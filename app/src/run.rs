use std::{
    fs::{copy, create_dir_all, read_to_string},
    path::Path,
    process::Command,
};

use chrono::Local;
use common::{
    config::{Config, Settings},
    plot::Plot,
    util::sanitize_name,
};
use eyre::{Context, Result};
use tracing::{debug, warn};

pub fn load_config(config_file: &Path) -> Result<Config> {
    let config = read_to_string(config_file)
        .wrap_err_with(|| format!("Read config {config_file:?}"))?;
    serde_yml::from_str(&config).wrap_err_with(|| format!("Parse config {config_file:?}"))
}

/// Runs the plots of a config file into a fresh timestamped folder under
/// the configured plot dir, next to a copy of the config.
pub fn run_config(config_file: &Path) -> Result<()> {
    let config = load_config(config_file)?;

    let file_prefix = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let plot_dir = config
        .settings
        .plot_dir
        .join(format!("{}-{file_prefix}", sanitize_name(&config.name)?));
    create_dir_all(&plot_dir)?;
    copy(config_file, plot_dir.join("config.yaml"))?;
    println!("Plots created in folder: {}", plot_dir.display());

    let settings = Settings {
        plot_dir,
        ..config.settings.clone()
    };
    run_plots(&config.plots, &settings)
}

pub fn run_plots(plots: &[Box<dyn Plot>], settings: &Settings) -> Result<()> {
    let paths = common::plot::plot(plots, settings)?;
    for path in &paths {
        println!("Plot written to {}", path.display());
    }
    if settings.show {
        for path in &paths {
            show(path, settings);
        }
    }
    Ok(())
}

/// Opens `path` in the configured viewer and waits for it to exit
fn show(path: &Path, settings: &Settings) {
    let mut viewer = settings.viewer().split_whitespace();
    let Some(program) = viewer.next() else {
        warn!("Empty viewer command, not opening {path:?}");
        return;
    };

    debug!("Opening {path:?} with {program}");
    match Command::new(program).args(viewer).arg(path).spawn() {
        Ok(mut child) => match child.wait() {
            Ok(status) if !status.success() => warn!("Viewer {program} exited with {status}"),
            Ok(_) => {}
            Err(err) => warn!("Waiting for viewer {program}: {err}"),
        },
        Err(err) => warn!("Could not start viewer {program}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    const CONFIG: &str = r#"
name: header parsing
settings:
  plot_dir: out
  size: [800, 600]
  show: false
  plot_data: true
plots:
  - type: BenchLog
    file: results/map.log
    y_label: micros per map
  - type: StringLength
    files: [a.csv, b.csv, c.csv, d.csv]
    kernel_size: 5
    output: cmp.svg
"#;

    #[test]
    fn config_lists_both_plot_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, CONFIG).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "header parsing");
        assert_eq!(config.settings.plot_dir, PathBuf::from("out"));
        assert_eq!(config.settings.size, (800, 600));
        assert!(!config.settings.show && config.settings.plot_data);

        let names: Vec<_> = config.plots.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["bench-log", "string-length"]);
    }

    #[test]
    fn settings_default_when_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "name: empty\nplots: []\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.settings, Settings::default());
        assert!(config.plots.is_empty());
    }

    #[test]
    fn unknown_plot_type_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "name: x\nplots:\n  - type: Heatmap\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn config_run_copies_config_into_plot_folder() {
        let dir = tempfile::tempdir().unwrap();
        let plot_dir = dir.path().join("plots");
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            format!(
                "name: nothing\nsettings:\n  plot_dir: {}\n  show: false\nplots: []\n",
                plot_dir.display()
            ),
        )
        .unwrap();

        run_config(&path).unwrap();
        let runs: Vec<_> = fs::read_dir(&plot_dir).unwrap().collect();
        assert_eq!(runs.len(), 1);
        let run = runs[0].as_ref().unwrap().path();
        assert!(
            run.file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("nothing-")
        );
        assert!(run.join("config.yaml").exists());
    }

    #[test]
    fn missing_viewer_is_not_fatal() {
        let settings = Settings {
            viewer: Some("definitely-not-a-viewer-binary".to_owned()),
            ..Settings::default()
        };
        show(Path::new("plot.png"), &settings);
    }

    /// Viewer that leaves a copy of the image next to it, so the test can
    /// see which path it was handed once `show` returns
    #[cfg(unix)]
    fn copying_viewer(dir: &Path) -> String {
        let script = dir.join("viewer.sh");
        fs::write(&script, "cp \"$1\" \"$1.seen\"\n").unwrap();
        format!("sh {}", script.display())
    }

    #[cfg(unix)]
    #[test]
    fn viewer_gets_image_path_and_is_waited_for() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("plot.png");
        fs::write(&image, "png").unwrap();
        let settings = Settings {
            viewer: Some(copying_viewer(dir.path())),
            ..Settings::default()
        };

        show(&image, &settings);
        assert_eq!(
            fs::read_to_string(dir.path().join("plot.png.seen")).unwrap(),
            "png"
        );
    }

    #[cfg(unix)]
    #[test]
    fn run_plots_shows_rendered_plot() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("map.log");
        fs::write(&log, "Warmup\nTreeMap\n1,0.1\n2,0.2\n").unwrap();
        let output = dir.path().join("map.svg");
        let plot: Box<dyn Plot> = Box::new(bench_log::BenchLog::new(
            log,
            "micros".to_owned(),
            Some(output.clone()),
        ));
        let settings = Settings {
            plot_dir: dir.path().to_path_buf(),
            show: true,
            viewer: Some(copying_viewer(dir.path())),
            ..Settings::default()
        };

        run_plots(&[plot], &settings).unwrap();
        let seen = fs::read_to_string(dir.path().join("map.svg.seen")).unwrap();
        assert_eq!(seen, fs::read_to_string(&output).unwrap());
    }
}
