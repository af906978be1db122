use crate::color::{contrast_text_color, is_hex_color};
use crate::spatial::ElementColorMap;
use crate::svg_tree::{set_attr, SvgPatch, SvgTree};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const DEFAULT_BACKGROUND: &str = "#ffffff";

static TEXT_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(?:text|tspan)\b[^>]*>").unwrap());

/// Sets every `<text>` fill to black or white against the background behind
/// it. Must run after region colors are final.
pub fn resolve_text_colors(svg: &str, colors: &ElementColorMap, threshold: f64) -> String {
    let tree = match SvgTree::parse(svg) {
        Ok(tree) => tree,
        Err(err) => {
            tracing::warn!(%err, "svg did not parse, text colored against default background");
            return fallback(svg, threshold);
        }
    };

    let backgrounds = shape_fills(&tree, colors);
    let mut patch = SvgPatch::new();
    for (idx, element) in tree.elements().iter().enumerate() {
        if element.tag != "text" {
            continue;
        }
        let background = authored_background(&tree, idx, &backgrounds)
            .or_else(|| {
                let text_id = element.id.as_deref()?;
                backgrounds
                    .iter()
                    .find(|(shape_id, _)| id_links(shape_id, text_id))
                    .map(|(_, color)| color.as_str())
            })
            .unwrap_or(DEFAULT_BACKGROUND);
        let color = text_color(background, threshold);
        patch.set_attrs(svg, element, &[("fill", color)]);
        for child in tree.descendants(idx) {
            let child = tree.get(child);
            if child.tag == "tspan" && child.fill().is_some() {
                patch.set_attrs(svg, child, &[("fill", color)]);
            }
        }
    }
    tracing::debug!(edits = patch.len(), "resolved text colors");
    patch.apply(svg)
}

/// Id and final hex fill of every shape, in document order.
fn shape_fills(tree: &SvgTree, colors: &ElementColorMap) -> Vec<(String, String)> {
    tree.elements()
        .iter()
        .filter(|element| element.is_shape())
        .filter_map(|element| {
            let id = element.id.clone()?;
            let fill = colors.color_for(element).or(element.fill())?;
            is_hex_color(fill).then(|| (id, fill.to_string()))
        })
        .collect()
}

/// Background named by `data-bg` on the text or its nearest ancestor.
fn authored_background<'a>(
    tree: &SvgTree,
    idx: usize,
    backgrounds: &'a [(String, String)],
) -> Option<&'a str> {
    let reference = std::iter::once(idx)
        .chain(tree.ancestors(idx))
        .find_map(|i| tree.get(i).attr("data-bg"))?;
    let found = backgrounds
        .iter()
        .find(|(id, _)| id == reference)
        .map(|(_, color)| color.as_str());
    if found.is_none() {
        tracing::debug!(reference, "data-bg does not name a filled shape");
    }
    found
}

/// Id conventions linking a filled shape to the text drawn on it.
fn id_links(shape_id: &str, text_id: &str) -> bool {
    if shape_id.replace("_fill", "_text") == text_id {
        return true;
    }
    if let Some(number) = shape_id
        .strip_prefix('q')
        .and_then(|rest| rest.strip_suffix("_fill"))
    {
        if text_id == format!("quadrant_{number}") {
            return true;
        }
    }
    if shape_id == "hub_fill" && text_id == "hub_text" {
        return true;
    }
    match shape_id.strip_suffix("_fill") {
        Some(base) if !base.is_empty() => text_id.contains(base),
        _ => false,
    }
}

fn text_color(background: &str, threshold: f64) -> &'static str {
    contrast_text_color(background, threshold).unwrap_or("#000000")
}

fn fallback(svg: &str, threshold: f64) -> String {
    let color = text_color(DEFAULT_BACKGROUND, threshold);
    TEXT_TAG_RE
        .replace_all(svg, |caps: &Captures<'_>| {
            let tag = &caps[0];
            if tag.starts_with("<tspan") && !tag.contains("fill=") {
                tag.to_string()
            } else {
                set_attr(tag, "fill", color)
            }
        })
        .into_owned()
}
