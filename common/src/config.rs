use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plot::Plot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    pub plots: Vec<Box<dyn Plot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory plots are written to when no explicit output is given
    pub plot_dir: PathBuf,
    /// Image size in pixels
    pub size: (u32, u32),
    /// Open each finished plot in a viewer and wait for it to close
    pub show: bool,
    /// Viewer program, defaults to the platform opener
    pub viewer: Option<String>,
    /// Also write the plotted series as json under `plot_data/`
    pub plot_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plot_dir: PathBuf::from("plots"),
            size: (1280, 960),
            show: true,
            viewer: None,
            plot_data: false,
        }
    }
}

impl Settings {
    pub fn viewer(&self) -> &str {
        match &self.viewer {
            Some(viewer) => viewer,
            None if cfg!(target_os = "macos") => "open",
            None => "xdg-open",
        }
    }
}
