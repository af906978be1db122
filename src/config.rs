use crate::color::{LUMINANCE_THRESHOLD, SHADE_LIGHTNESS_MAX, SHADE_LIGHTNESS_MIN};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SUBTITLE_PHRASES: [&str; 3] = ["Quarterly Milestones", "Impact vs Effort", "Analysis"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub remove_titles: bool,
    pub subtitle_phrases: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_titles: true,
            subtitle_phrases: SUBTITLE_PHRASES
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub shade_lightness_min: f64,
    pub shade_lightness_max: f64,
    pub primary_shades: usize,
    pub secondary_shades: usize,
    pub accent_shades: usize,
    pub contrast_threshold: f64,
    pub cleanup: CleanupConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shade_lightness_min: SHADE_LIGHTNESS_MIN,
            shade_lightness_max: SHADE_LIGHTNESS_MAX,
            primary_shades: 5,
            secondary_shades: 5,
            accent_shades: 4,
            contrast_threshold: LUMINANCE_THRESHOLD,
            cleanup: CleanupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CleanupConfigFile {
    remove_titles: Option<bool>,
    subtitle_phrases: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    shade_lightness_min: Option<f64>,
    shade_lightness_max: Option<f64>,
    primary_shades: Option<usize>,
    secondary_shades: Option<usize>,
    accent_shades: Option<usize>,
    contrast_threshold: Option<f64>,
    cleanup: Option<CleanupConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
}

/// Reads a JSON5 config file (comments and trailing commas allowed) and
/// overlays whatever it sets onto the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    let engine = &mut config.engine;
    if let Some(v) = parsed.shade_lightness_min {
        engine.shade_lightness_min = v.clamp(0.0, 100.0);
    }
    if let Some(v) = parsed.shade_lightness_max {
        engine.shade_lightness_max = v.clamp(0.0, 100.0);
    }
    if let Some(v) = parsed.primary_shades {
        engine.primary_shades = v.max(1);
    }
    if let Some(v) = parsed.secondary_shades {
        engine.secondary_shades = v.max(1);
    }
    if let Some(v) = parsed.accent_shades {
        engine.accent_shades = v.max(1);
    }
    if let Some(v) = parsed.contrast_threshold {
        if !(0.0..=1.0).contains(&v) {
            anyhow::bail!("contrastThreshold must be within 0..=1, got {v}");
        }
        engine.contrast_threshold = v;
    }
    if let Some(cleanup) = parsed.cleanup {
        if let Some(v) = cleanup.remove_titles {
            engine.cleanup.remove_titles = v;
        }
        if let Some(v) = cleanup.subtitle_phrases {
            engine.cleanup.subtitle_phrases = v;
        }
    }
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    tracing::debug!(engine = ?config.engine, "loaded engine config");
    Ok(config)
}
