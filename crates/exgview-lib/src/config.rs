use crate::classify::RuleSet;
use crate::error::{ExgError, Result};
use crate::plot::html::DEFAULT_PLOTLY_SRC;
use crate::plot::{ChartOptions, DEFAULT_HEIGHT, DEFAULT_TITLE};
use serde::Deserialize;
use std::path::Path;

/// Extra whole-word patterns appended to the built-in channel heuristics.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    #[serde(default)]
    pub extra_eeg: Vec<String>,
    #[serde(default)]
    pub extra_ecg: Vec<String>,
    #[serde(default)]
    pub extra_common_mode: Vec<String>,
    #[serde(default)]
    pub extra_ignore: Vec<String>,
}

/// Optional TOML settings; every field falls back to the built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_plotly_src")]
    pub plotly_src: String,
    #[serde(default)]
    pub channels: ChannelConfig,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_plotly_src() -> String {
    DEFAULT_PLOTLY_SRC.to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            height: default_height(),
            plotly_src: default_plotly_src(),
            channels: ChannelConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ExgError::io(path, e))?;
        Self::parse(&text).map_err(|message| ExgError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn rules(&self) -> RuleSet {
        RuleSet::default().extended(
            &self.channels.extra_eeg,
            &self.channels.extra_ecg,
            &self.channels.extra_common_mode,
            &self.channels.extra_ignore,
        )
    }

    pub fn chart_options(&self, downsample: usize) -> ChartOptions {
        ChartOptions {
            title: self.title.clone(),
            height: self.height,
            downsample,
        }
    }
}
