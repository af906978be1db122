//! Structural cleanup applied after the baseline recolor: gradients become
//! solid fills, strokes follow fills, titles and subtitles are dropped.
//! Each pass leaves the document unchanged when its pattern is absent.

use crate::color::is_hex_color;
use crate::config::CleanupConfig;
use crate::svg_tree::{attr_value, set_attr};
use crate::theme::{Bucket, Palette};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static GRADIENT_FILL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fill="url\(#[^)]+\)""#).unwrap());
static GRADIENT_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<(?:linear|radial)Gradient\b[^>]*/>\s*|<(?:linear|radial)Gradient\b[^>]*>.*?</(?:linear|radial)Gradient>\s*",
    )
    .unwrap()
});
static EMPTY_DEFS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<defs\b[^>]*>\s*</defs>\s*").unwrap());
static SHAPE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:rect|circle|path|polygon|ellipse)\b[^>]*>").unwrap());
/// A whole `<text>` element: self-closing, or open tag through `</text>`.
/// Group 1 is the content, absent for the self-closing form.
static TEXT_ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<text\b[^>]*?(?:/>|>(.*?)</text>)\s*").unwrap());

/// Palette slots cycled by gradient replacement, keyed by occurrence index.
const GRADIENT_SLOTS: [(Bucket, usize); 4] = [
    (Bucket::Primary, 2),
    (Bucket::Secondary, 2),
    (Bucket::Accent, 1),
    (Bucket::Primary, 1),
];

pub fn run(svg: &str, palette: &Palette, config: &CleanupConfig) -> String {
    let out = remove_gradients(svg, palette);
    let out = normalize_borders(&out);
    if config.remove_titles {
        remove_titles(&out, &config.subtitle_phrases)
    } else {
        out
    }
}

pub fn remove_gradients(svg: &str, palette: &Palette) -> String {
    let mut occurrence = 0usize;
    let out = GRADIENT_FILL_RE.replace_all(svg, |_: &Captures<'_>| {
        let (bucket, index) = GRADIENT_SLOTS[occurrence % GRADIENT_SLOTS.len()];
        occurrence += 1;
        format!(r#"fill="{}""#, palette.slot(bucket, index))
    });
    if occurrence > 0 {
        tracing::debug!(count = occurrence, "replaced gradient fills");
    }
    let out = GRADIENT_DEF_RE.replace_all(&out, "");
    EMPTY_DEFS_RE.replace_all(&out, "").into_owned()
}

/// Filled shapes that declare a stroke get a stroke equal to their fill.
/// Shapes without a solid hex fill (`fill="none"` connectors) keep theirs.
pub fn normalize_borders(svg: &str) -> String {
    SHAPE_TAG_RE
        .replace_all(svg, |caps: &Captures<'_>| {
            let tag = &caps[0];
            match (attr_value(tag, "fill"), attr_value(tag, "stroke")) {
                (Some(fill), Some(stroke)) if is_hex_color(fill) && stroke != fill => {
                    set_attr(tag, "stroke", fill)
                }
                _ => tag.to_string(),
            }
        })
        .into_owned()
}

pub fn remove_titles(svg: &str, subtitle_phrases: &[String]) -> String {
    TEXT_ELEMENT_RE
        .replace_all(svg, |caps: &Captures<'_>| {
            let content = caps.get(1).map_or("", |m| m.as_str());
            if is_title(&caps[0], content, subtitle_phrases) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn is_title(tag: &str, content: &str, subtitle_phrases: &[String]) -> bool {
    let id = attr_value(tag, "id");
    if id.is_some_and(|id| id.ends_with("_title")) {
        return true;
    }
    let number = |name| attr_value(tag, name).and_then(|v| v.trim().parse::<f64>().ok());
    let near_top = number("y").is_some_and(|y| (70.0..100.0).contains(&y));
    let small = number("font-size").is_some_and(|size| (12.0..=14.0).contains(&size));
    if near_top && small {
        return true;
    }
    // Labelled text carries an id, so phrase matching never eats a label.
    id.is_none()
        && subtitle_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && content.contains(phrase.as_str()))
}
