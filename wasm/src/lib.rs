use serde::Deserialize;
use svg_diagram_themer::config::EngineConfig;
use svg_diagram_themer::{DiagramRequest, DiagramThemer, TemplateCache};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemerOptions {
    contrast_threshold: Option<f64>,
    remove_titles: Option<bool>,
}

fn build_engine_config(options: ThemerOptions) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(threshold) = options.contrast_threshold {
        config.contrast_threshold = threshold.clamp(0.0, 1.0);
    }
    if let Some(remove_titles) = options.remove_titles {
        config.cleanup.remove_titles = remove_titles;
    }
    config
}

fn render(request_json: &str, options: ThemerOptions) -> Result<String, String> {
    let request: DiagramRequest =
        serde_json::from_str(request_json).map_err(|error| error.to_string())?;
    let themer = DiagramThemer::new(TemplateCache::builtin(), build_engine_config(options));
    themer
        .render(&request)
        .map(|output| output.content)
        .map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn render_diagram_svg(request_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<ThemerOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        ThemerOptions::default()
    };
    render(request_json, options).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn list_templates() -> Vec<String> {
    TemplateCache::builtin()
        .names()
        .into_iter()
        .map(str::to_string)
        .collect()
}
