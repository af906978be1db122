//! Per-diagram region coloring.
//!
//! Each diagram type selects exactly one [`SpatialStrategy`]. Planning runs on
//! the template before the baseline recolor and records which elements the
//! strategy owns, so the baseline pass can leave them alone. Assignment then
//! produces one color per structural region, distinct by construction.

use crate::color::{blend_darker, hex_to_hsl, Hsl};
use crate::error::{Result, ThemeError};
use crate::svg_tree::{SvgElement, SvgPatch, SvgTree};
use crate::theme::{Bucket, ColorScheme, ThemeBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Below this saturation a primary is treated as grey and regions are told
/// apart by lightness alone.
const ACHROMATIC_SATURATION: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialStrategy {
    Grid,
    Radial { spokes: Option<usize> },
    LinearLevels { levels: Option<usize> },
    Blend { circles: Option<usize> },
    None,
}

impl SpatialStrategy {
    pub fn for_diagram(diagram_type: &str) -> Self {
        let count = numeric_part(diagram_type);
        if matches!(diagram_type, "matrix_2x2" | "swot_matrix") {
            Self::Grid
        } else if diagram_type.starts_with("hub_spoke") {
            Self::Radial { spokes: count }
        } else if diagram_type.contains("pyramid") {
            Self::LinearLevels { levels: count }
        } else if diagram_type.starts_with("venn") {
            Self::Blend { circles: count }
        } else {
            Self::None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Radial { .. } => "radial",
            Self::LinearLevels { .. } => "linear_levels",
            Self::Blend { .. } => "blend",
            Self::None => "none",
        }
    }
}

fn numeric_part(diagram_type: &str) -> Option<usize> {
    diagram_type
        .split('_')
        .find_map(|part| part.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Region {
    Quadrant(usize),
    Hub,
    Spoke(usize),
    Level(usize),
    Circle(usize),
    Intersection(Vec<usize>),
}

/// Region key to fill color. Keys are element ids, or `.token` for elements
/// matched only by a class token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementColorMap(BTreeMap<String, String>);

impl ElementColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, color: impl Into<String>) {
        self.0.insert(key.into(), color.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Color for `element` by id first, then by class token.
    pub fn color_for(&self, element: &SvgElement) -> Option<&str> {
        if let Some(color) = element.id.as_deref().and_then(|id| self.get(id)) {
            return Some(color);
        }
        element
            .class()?
            .split_whitespace()
            .find_map(|token| self.get(&format!(".{token}")))
    }
}

#[derive(Debug, Clone)]
pub struct SpatialPlan {
    strategy: SpatialStrategy,
    targets: Vec<(String, Region)>,
}

impl SpatialPlan {
    pub fn none() -> Self {
        Self {
            strategy: SpatialStrategy::None,
            targets: Vec::new(),
        }
    }

    pub fn strategy(&self) -> SpatialStrategy {
        self.strategy
    }

    /// Keys of every element this plan colors.
    pub fn owned(&self) -> HashSet<String> {
        self.targets.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn assign(&self, theme: &ThemeBuilder) -> Result<ElementColorMap> {
        let base = hex_to_hsl(&theme.primary)?;
        let mut allocator = ColorAllocator::default();
        let mut map = ElementColorMap::new();
        let count = |pred: fn(&Region) -> bool| self.targets.iter().filter(|(_, r)| pred(r)).count();

        let circle_colors = match self.strategy {
            SpatialStrategy::Blend { .. } => {
                theme.palette.region_colors(count(|r| matches!(r, Region::Circle(_))))
            }
            _ => Vec::new(),
        };
        let spokes = count(|r| matches!(r, Region::Spoke(_)));
        let levels = count(|r| matches!(r, Region::Level(_)));
        let mut blended: HashMap<Vec<usize>, String> = HashMap::new();

        // Parents are claimed before any blend so a blend never lands on one.
        for (key, region) in &self.targets {
            let color = match region {
                Region::Quadrant(q) => allocator.claim(grid_color(base, *q))?,
                Region::Hub => allocator.claim(hub_color(base))?,
                Region::Spoke(i) => allocator.claim(spoke_color(base, *i, spokes, theme.scheme))?,
                Region::Level(i) => allocator.claim(level_color(base, *i, levels))?,
                Region::Circle(i) => {
                    let color = circle_colors
                        .get(*i)
                        .cloned()
                        .unwrap_or_else(|| theme.palette.slot(Bucket::Primary, *i).to_string());
                    allocator.claim(color)?
                }
                Region::Intersection(_) => continue,
            };
            map.insert(key.clone(), color);
        }
        for (key, region) in &self.targets {
            let Region::Intersection(parents) = region else {
                continue;
            };
            let color = match blended.get(parents) {
                Some(color) => color.clone(),
                None => {
                    let color = allocator.claim_darker(blend_parents(parents, &circle_colors)?)?;
                    blended.insert(parents.clone(), color.clone());
                    color
                }
            };
            map.insert(key.clone(), color);
        }

        tracing::debug!(
            strategy = self.strategy.name(),
            colors = ?map,
            "assigned region colors"
        );
        Ok(map)
    }
}

/// Finds the elements `diagram_type`'s strategy colors. Fails with
/// `MalformedTemplate` when a required id is missing.
pub fn plan(diagram_type: &str, tree: &SvgTree) -> Result<SpatialPlan> {
    let strategy = SpatialStrategy::for_diagram(diagram_type);
    let mut targets = Vec::new();
    let mut required = Vec::new();

    match strategy {
        SpatialStrategy::Grid => {
            for q in 1..=4 {
                let id = format!("q{q}_fill");
                targets.push((id.clone(), Region::Quadrant(q)));
                required.push(id);
            }
        }
        SpatialStrategy::Radial { spokes } => {
            targets.push(("hub_fill".to_string(), Region::Hub));
            required.push("hub_fill".to_string());
            let n = spokes.unwrap_or_else(|| count_numbered(tree, "spoke_", "_fill"));
            for i in 1..=n {
                let id = format!("spoke_{i}_fill");
                targets.push((id.clone(), Region::Spoke(i)));
                required.push(id);
            }
        }
        SpatialStrategy::LinearLevels { levels } => {
            let n = levels.unwrap_or_else(|| count_numbered(tree, "level_", ""));
            for i in 1..=n {
                let id = format!("level_{i}");
                targets.push((id.clone(), Region::Level(i)));
                required.push(id);
            }
        }
        SpatialStrategy::Blend { circles } => {
            let n = circles.unwrap_or_else(|| count_numbered(tree, "circle_", "")).max(2);
            for i in 1..=n {
                let id = format!("circle_{i}");
                targets.push((id.clone(), Region::Circle(i - 1)));
                required.push(id);
            }
            for key in intersection_keys(tree) {
                let parents = parse_parents(&key, n);
                targets.push((key, Region::Intersection(parents)));
            }
        }
        SpatialStrategy::None => {}
    }

    let missing: Vec<String> = required.into_iter().filter(|id| !tree.has_id(id)).collect();
    if !missing.is_empty() {
        return Err(ThemeError::MalformedTemplate {
            template: diagram_type.to_string(),
            missing,
        });
    }
    tracing::debug!(
        diagram_type,
        strategy = strategy.name(),
        regions = targets.len(),
        "planned spatial coloring"
    );
    Ok(SpatialPlan { strategy, targets })
}

/// Number of consecutive `{prefix}{n}{suffix}` ids starting at 1.
fn count_numbered(tree: &SvgTree, prefix: &str, suffix: &str) -> usize {
    (1..)
        .take_while(|n| tree.has_id(&format!("{prefix}{n}{suffix}")))
        .count()
}

fn intersection_keys(tree: &SvgTree) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for element in tree.elements().iter().filter(|e| e.is_shape()) {
        let by_id = element
            .id
            .as_deref()
            .filter(|id| id.starts_with("intersection") || id.starts_with("overlap"))
            .map(str::to_string);
        let key = by_id.or_else(|| {
            element
                .class()?
                .split_whitespace()
                .find(|token| token.starts_with("intersection") || token.starts_with("overlap"))
                .map(|token| format!(".{token}"))
        });
        if let Some(key) = key {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Circle indices named by an intersection key's suffix, e.g. `intersection_ab`
/// or `overlap_13`. Anything unreadable blends the first two circles.
fn parse_parents(key: &str, circles: usize) -> Vec<usize> {
    let fallback = vec![0, 1];
    let suffix = key
        .trim_start_matches('.')
        .trim_start_matches("intersection")
        .trim_start_matches("overlap");
    let mut parents = Vec::new();
    for c in suffix.chars() {
        let index = match c.to_ascii_lowercase() {
            'a' | '1' => 0,
            'b' | '2' => 1,
            'c' | '3' => 2,
            '_' | '-' => continue,
            _ => return fallback,
        };
        if index >= circles {
            return fallback;
        }
        if !parents.contains(&index) {
            parents.push(index);
        }
    }
    if parents.len() < 2 {
        return fallback;
    }
    parents.sort_unstable();
    parents
}

fn blend_parents(parents: &[usize], circle_colors: &[String]) -> Result<String> {
    let color = |i: usize| circle_colors.get(i).map(String::as_str).unwrap_or("#808080");
    let mut blended = blend_darker(color(parents[0]), color(parents[1]))?;
    for &parent in &parents[2..] {
        blended = blend_darker(&blended, color(parent))?;
    }
    Ok(blended)
}

/// Bilinear corners: one axis lightness, the other saturation.
/// Q1 vivid-dark, Q2 vivid-light, Q3 muted-light, Q4 muted-dark.
fn grid_color(base: Hsl, quadrant: usize) -> String {
    if base.s < ACHROMATIC_SATURATION {
        let lightness = match quadrant {
            1 => 28.0,
            2 => 70.0,
            3 => 56.0,
            _ => 42.0,
        };
        return Hsl::new(base.h, base.s, lightness).to_hex();
    }
    let dark = (base.l - 10.0).clamp(25.0, 45.0);
    let light = (base.l + 25.0).clamp(60.0, 85.0);
    let vivid = (base.s + 10.0).clamp(55.0, 100.0);
    let muted = vivid - 35.0;
    let (s, l) = match quadrant {
        1 => (vivid, dark),
        2 => (vivid, light),
        3 => (muted, light),
        _ => (muted, dark),
    };
    Hsl::new(base.h, s, l).to_hex()
}

fn hub_color(base: Hsl) -> String {
    let l = (base.l - 15.0).clamp(20.0, 35.0);
    let s = if base.s < ACHROMATIC_SATURATION {
        base.s
    } else {
        (base.s + 15.0).clamp(60.0, 100.0)
    };
    Hsl::new(base.h, s, l).to_hex()
}

/// Spokes step lightness 45 to 75 while the hue fans out around the primary.
fn spoke_color(base: Hsl, index: usize, spokes: usize, scheme: ColorScheme) -> String {
    let t = if spokes > 1 {
        (index - 1) as f64 / (spokes - 1) as f64
    } else {
        0.5
    };
    let spread = match scheme {
        ColorScheme::Monochromatic => 20.0,
        ColorScheme::Complementary => 90.0,
    };
    let (h, s) = if base.s < ACHROMATIC_SATURATION {
        (base.h, base.s)
    } else {
        (base.h + spread * (t - 0.5), base.s.clamp(45.0, 90.0))
    };
    Hsl::new(h, s, 45.0 + 30.0 * t).to_hex()
}

/// `level_1` is the base: darkest and most saturated. Lightness climbs
/// linearly to the top while saturation eases off.
fn level_color(base: Hsl, level: usize, levels: usize) -> String {
    let factor = (level - 1) as f64 / levels.saturating_sub(1).max(1) as f64;
    let l = 25.0 + factor * 55.0;
    let s = if base.s < ACHROMATIC_SATURATION {
        base.s
    } else {
        (base.s - factor * 20.0).max(30.0)
    };
    Hsl::new(base.h, s, l).to_hex()
}

/// Hands out colors unique within one diagram. On a clash it nudges
/// lightness, then rotates hue, and fails once neither yields a free color.
#[derive(Debug, Default)]
struct ColorAllocator {
    used: HashSet<String>,
}

impl ColorAllocator {
    fn claim(&mut self, color: String) -> Result<String> {
        self.claim_with(color, &[-5.0, 5.0])
    }

    fn claim_darker(&mut self, color: String) -> Result<String> {
        self.claim_with(color, &[-5.0])
    }

    fn claim_with(&mut self, color: String, directions: &[f64]) -> Result<String> {
        if self.used.insert(color.clone()) {
            return Ok(color);
        }
        let hsl = hex_to_hsl(&color)?;
        for turn in 0..12 {
            let hue = hsl.h + 30.0 * turn as f64;
            if turn > 0 {
                let candidate = Hsl::new(hue, hsl.s, hsl.l).to_hex();
                if self.used.insert(candidate.clone()) {
                    return Ok(candidate);
                }
            }
            for step in 1..=20 {
                for direction in directions {
                    let l = hsl.l + direction * step as f64;
                    if !(0.0..=100.0).contains(&l) {
                        continue;
                    }
                    let candidate = Hsl::new(hue, hsl.s, l).to_hex();
                    if self.used.insert(candidate.clone()) {
                        return Ok(candidate);
                    }
                }
            }
        }
        Err(ThemeError::ColorsExhausted(color))
    }
}

/// Writes `fill` (and `stroke`, when declared) on every element the map
/// names.
pub fn apply_colors(svg: &str, tree: &SvgTree, colors: &ElementColorMap) -> String {
    let mut patch = SvgPatch::new();
    for element in tree.elements() {
        let Some(color) = colors.color_for(element) else {
            continue;
        };
        if element.attr("stroke").is_some() {
            patch.set_attrs(svg, element, &[("fill", color), ("stroke", color)]);
        } else {
            patch.set_attrs(svg, element, &[("fill", color)]);
        }
    }
    patch.apply(svg)
}
