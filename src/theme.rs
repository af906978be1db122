use crate::color::{
    adjust_lightness, adjust_saturation, generate_shades_in_band, get_analogous,
    get_complementary, hex_to_hsl, hex_to_rgb,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::svg_tree::attr_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Light surface fills the templates are authored with.
pub const SURFACE_COLORS: [&str; 10] = [
    "#dbeafe", "#dcfce7", "#fef3c7", "#fee2e2", "#e0e7ff", "#fce7f3", "#ede9fe", "#cffafe",
    "#d1fae5", "#fed7aa",
];

/// Saturated emphasis fills the templates are authored with.
pub const EMPHASIS_COLORS: [&str; 6] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4",
];

static NEUTRAL_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = SURFACE_COLORS
        .iter()
        .chain(EMPHASIS_COLORS.iter())
        .map(|color| regex::escape(color))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).unwrap()
});
static START_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z][^>]*>").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Monochromatic,
    #[default]
    Complementary,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub primary_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    #[serde(default = "default_true")]
    pub use_smart_theming: bool,
}

impl ThemeConfig {
    pub fn new(primary_color: impl Into<String>) -> Self {
        Self {
            primary_color: primary_color.into(),
            secondary_color: None,
            accent_color: None,
            color_scheme: ColorScheme::default(),
            use_smart_theming: true,
        }
    }

    pub fn with_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    /// Fails with `InvalidColor` on the first seed that is not `#RRGGBB`.
    pub fn validate(&self) -> Result<()> {
        hex_to_rgb(&self.primary_color)?;
        for color in [&self.secondary_color, &self.accent_color].into_iter().flatten() {
            hex_to_rgb(color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Primary,
    Secondary,
    Accent,
}

/// Shade ramps per hue bucket, each ordered light to dark.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub accent: Vec<String>,
}

impl Palette {
    pub fn bucket(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Primary => &self.primary,
            Bucket::Secondary => &self.secondary,
            Bucket::Accent => &self.accent,
        }
    }

    /// Shade `index` of `bucket`, clamped to the ramp's darkest entry.
    pub fn slot(&self, bucket: Bucket, index: usize) -> &str {
        let ramp = self.bucket(bucket);
        ramp.get(index.min(ramp.len().saturating_sub(1)))
            .map(String::as_str)
            .unwrap_or("#ffffff")
    }

    pub fn distinct_shades(&self) -> usize {
        self.all_shades().collect::<HashSet<_>>().len()
    }

    fn all_shades(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(&self.secondary)
            .chain(&self.accent)
            .map(String::as_str)
    }

    /// `count` pairwise-distinct shades taken round-robin across buckets,
    /// starting one step in from the light end of each ramp.
    pub fn region_colors(&self, count: usize) -> Vec<String> {
        let depth = self
            .primary
            .len()
            .max(self.secondary.len())
            .max(self.accent.len());
        let order = std::iter::once(1).chain(2..depth).chain(std::iter::once(0));
        let mut picked: Vec<String> = Vec::with_capacity(count);
        for index in order {
            for bucket in [Bucket::Primary, Bucket::Secondary, Bucket::Accent] {
                if picked.len() == count {
                    return picked;
                }
                if let Some(shade) = self.bucket(bucket).get(index) {
                    if !picked.contains(shade) {
                        picked.push(shade.clone());
                    }
                }
            }
        }
        picked
    }
}

/// A resolved theme: seed colors, their shade ramps and the substitution map
/// from neutral template colors to palette shades.
#[derive(Debug, Clone)]
pub struct ThemeBuilder {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub scheme: ColorScheme,
    pub palette: Palette,
    color_map: HashMap<String, String>,
}

impl ThemeBuilder {
    pub fn from_config(theme: &ThemeConfig, config: &EngineConfig) -> Result<Self> {
        theme.validate()?;
        match theme.color_scheme {
            ColorScheme::Monochromatic => Self::monochromatic(&theme.primary_color, config),
            ColorScheme::Complementary => Self::complementary(
                &theme.primary_color,
                theme.secondary_color.as_deref(),
                theme.accent_color.as_deref(),
                config,
            ),
        }
    }

    /// Secondary and accent are same-hue variants of the primary; neutral
    /// template colors map onto shades by lightness rank.
    pub fn monochromatic(primary: &str, config: &EngineConfig) -> Result<Self> {
        let secondary = adjust_saturation(&adjust_lightness(primary, 15.0)?, -10.0)?;
        let accent = adjust_saturation(&adjust_lightness(primary, -15.0)?, 10.0)?;
        let palette = build_palette(primary, &secondary, &accent, config)?;
        let color_map = rank_preserving_map(&palette)?;
        Ok(Self {
            primary: primary.to_lowercase(),
            secondary,
            accent,
            scheme: ColorScheme::Monochromatic,
            palette,
            color_map,
        })
    }

    /// Missing secondary/accent seeds are derived by complementary and
    /// analogous harmony.
    pub fn complementary(
        primary: &str,
        secondary: Option<&str>,
        accent: Option<&str>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let secondary = match secondary {
            Some(color) => {
                hex_to_rgb(color)?;
                color.to_lowercase()
            }
            None => get_complementary(primary)?,
        };
        let accent = match accent {
            Some(color) => {
                hex_to_rgb(color)?;
                color.to_lowercase()
            }
            None => get_analogous(primary)?.1,
        };
        let palette = build_palette(primary, &secondary, &accent, config)?;
        let color_map = bucketed_map(&palette);
        Ok(Self {
            primary: primary.to_lowercase(),
            secondary,
            accent,
            scheme: ColorScheme::Complementary,
            palette,
            color_map,
        })
    }

    pub fn mapped_color(&self, neutral: &str) -> Option<&str> {
        self.color_map
            .get(&neutral.to_lowercase())
            .map(String::as_str)
    }

    /// Baseline recolor of every neutral template color.
    pub fn apply_to_svg(&self, svg: &str) -> String {
        self.apply_to_svg_except(svg, &HashSet::new())
    }

    /// Baseline recolor that leaves elements whose id (or `.class` token) is in
    /// `skip` untouched. Only start tags are rewritten, never text content.
    pub fn apply_to_svg_except(&self, svg: &str, skip: &HashSet<String>) -> String {
        self.recolor_selected(svg, |tag| !is_listed(tag, skip))
    }

    /// Baseline recolor restricted to the elements listed in `only`.
    pub fn apply_to_svg_only(&self, svg: &str, only: &HashSet<String>) -> String {
        self.recolor_selected(svg, |tag| is_listed(tag, only))
    }

    fn recolor_selected(&self, svg: &str, select: impl Fn(&str) -> bool) -> String {
        let map = self.document_map(svg, &select);
        recolor_tags(svg, &select, |color| {
            map.get(&color.to_lowercase()).map(String::as_str)
        })
    }

    /// Substitution for the neutral colors present in the selected tags of
    /// `svg`. Each color keeps its theme-wide shade unless another color
    /// already took it, in which case it moves to the nearest free shade. Two
    /// distinct template colors only share a shade once the palette runs out.
    fn document_map(&self, svg: &str, select: &impl Fn(&str) -> bool) -> HashMap<String, String> {
        let present: HashSet<String> = START_TAG_RE
            .find_iter(svg)
            .map(|tag| tag.as_str())
            .filter(|tag| select(*tag))
            .flat_map(|tag| NEUTRAL_COLOR_RE.find_iter(tag))
            .map(|color| color.as_str().to_lowercase())
            .collect();
        let shades: Vec<(&str, Bucket, f64)> = [Bucket::Primary, Bucket::Secondary, Bucket::Accent]
            .into_iter()
            .flat_map(|bucket| {
                self.palette
                    .bucket(bucket)
                    .iter()
                    .map(move |shade| (shade.as_str(), bucket))
            })
            .filter_map(|(shade, bucket)| hex_to_hsl(shade).ok().map(|hsl| (shade, bucket, hsl.l)))
            .collect();

        let mut taken: HashSet<&str> = HashSet::new();
        let mut map = HashMap::new();
        for neutral in neutral_colors().filter(|neutral| present.contains(*neutral)) {
            let Some(preferred) = self.color_map.get(neutral) else {
                continue;
            };
            let chosen = self
                .nearest_free_shade(preferred, &shades, &taken)
                .unwrap_or(preferred.as_str());
            taken.insert(chosen);
            map.insert(neutral.to_string(), chosen.to_string());
        }
        map
    }

    fn nearest_free_shade<'p>(
        &self,
        preferred: &str,
        shades: &[(&'p str, Bucket, f64)],
        taken: &HashSet<&str>,
    ) -> Option<&'p str> {
        let (home, lightness) = shades
            .iter()
            .find(|(shade, ..)| *shade == preferred)
            .map(|(_, bucket, l)| (*bucket, *l))?;
        let cost = |(shade, bucket, l): &(&str, Bucket, f64)| {
            let away = self.scheme == ColorScheme::Complementary && *bucket != home;
            (*shade != preferred, away, (l - lightness).abs())
        };
        shades
            .iter()
            .filter(|(shade, ..)| !taken.contains(shade))
            .min_by(|a, b| {
                let (a, b) = (cost(*a), cost(*b));
                a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.total_cmp(&b.2))
            })
            .map(|(shade, ..)| *shade)
    }
}

fn build_palette(
    primary: &str,
    secondary: &str,
    accent: &str,
    config: &EngineConfig,
) -> Result<Palette> {
    let (lo, hi) = (config.shade_lightness_min, config.shade_lightness_max);
    let primary = generate_shades_in_band(primary, config.primary_shades.max(1), lo, hi)?;
    let step = (hi - lo).abs() / config.primary_shades.saturating_sub(1).max(1) as f64;

    let mut taken: HashSet<String> = primary.iter().cloned().collect();
    let secondary = separated_ramp(
        secondary,
        config.secondary_shades,
        (lo, hi),
        &[step / 3.0],
        &mut taken,
    )?;
    let accent = separated_ramp(
        accent,
        config.accent_shades,
        (lo, hi),
        &[step / 6.0, step / 2.0],
        &mut taken,
    )?;
    Ok(Palette {
        primary,
        secondary,
        accent,
    })
}

/// Shade ramp for `color`. A grey seed, or one whose harmony collapses onto
/// the primary hue, yields shades already in `taken`; the band is then moved
/// darker by the first offset that clears them.
fn separated_ramp(
    color: &str,
    n: usize,
    (lo, hi): (f64, f64),
    offsets: &[f64],
    taken: &mut HashSet<String>,
) -> Result<Vec<String>> {
    let mut ramp = generate_shades_in_band(color, n.max(1), lo, hi)?;
    for offset in offsets {
        if !ramp.iter().any(|shade| taken.contains(shade)) {
            break;
        }
        tracing::debug!(color, offset, "shade ramp overlaps, shifting band");
        ramp = generate_shades_in_band(color, n.max(1), lo - offset, hi - offset)?;
    }
    taken.extend(ramp.iter().cloned());
    Ok(ramp)
}

fn neutral_colors() -> impl Iterator<Item = &'static str> {
    SURFACE_COLORS.iter().chain(EMPHASIS_COLORS.iter()).copied()
}

/// The i-th lightest neutral color maps to the shade at the same relative rank.
fn rank_preserving_map(palette: &Palette) -> Result<HashMap<String, String>> {
    let mut neutrals: Vec<(&str, f64)> = neutral_colors()
        .map(|c| hex_to_hsl(c).map(|hsl| (c, hsl.l)))
        .collect::<Result<_>>()?;
    neutrals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut shades: Vec<(&str, f64)> = palette
        .all_shades()
        .map(|c| hex_to_hsl(c).map(|hsl| (c, hsl.l)))
        .collect::<Result<_>>()?;
    shades.sort_by(|a, b| b.1.total_cmp(&a.1));
    shades.dedup_by(|a, b| a.0 == b.0);

    let last_neutral = neutrals.len().saturating_sub(1).max(1) as f64;
    let last_shade = shades.len().saturating_sub(1) as f64;
    Ok(neutrals
        .iter()
        .enumerate()
        .map(|(rank, (neutral, _))| {
            let target = (rank as f64 * last_shade / last_neutral).round() as usize;
            (neutral.to_string(), shades[target].0.to_string())
        })
        .collect())
}

/// Surfaces take the light end of each bucket, emphasis colors the middle;
/// both cycle primary, secondary, accent.
fn bucketed_map(palette: &Palette) -> HashMap<String, String> {
    let buckets = [Bucket::Primary, Bucket::Secondary, Bucket::Accent];
    let mut map = HashMap::new();
    for (i, surface) in SURFACE_COLORS.iter().enumerate() {
        let shade = palette.slot(buckets[i % 3], i / 3 % 2);
        map.insert(surface.to_string(), shade.to_string());
    }
    for (i, emphasis) in EMPHASIS_COLORS.iter().enumerate() {
        let shade = palette.slot(buckets[i % 3], 2 + i / 3);
        map.insert(emphasis.to_string(), shade.to_string());
    }
    map
}

/// Whether a start tag's id, or one of its class tokens as `.token`, is in
/// `keys`.
fn is_listed(tag: &str, keys: &HashSet<String>) -> bool {
    attr_value(tag, "id").is_some_and(|id| keys.contains(id))
        || attr_value(tag, "class").is_some_and(|class| {
            class
                .split_whitespace()
                .any(|token| keys.contains(&format!(".{token}")))
        })
}

fn recolor_tags<'m>(
    svg: &str,
    select: impl Fn(&str) -> bool,
    lookup: impl Fn(&str) -> Option<&'m str>,
) -> String {
    START_TAG_RE
        .replace_all(svg, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            if !select(tag) {
                return tag.to_string();
            }
            NEUTRAL_COLOR_RE
                .replace_all(tag, |m: &regex::Captures<'_>| {
                    lookup(&m[0]).unwrap_or(&m[0]).to_string()
                })
                .into_owned()
        })
        .into_owned()
}

/// Recolor used when smart theming is off: neutral colors go straight to the
/// seed colors, cycling primary, secondary, accent.
pub fn apply_basic_theme(svg: &str, theme: &ThemeConfig) -> Result<String> {
    theme.validate()?;
    let primary = theme.primary_color.to_lowercase();
    let secondary = match &theme.secondary_color {
        Some(color) => color.to_lowercase(),
        None => get_complementary(&primary)?,
    };
    let accent = match &theme.accent_color {
        Some(color) => color.to_lowercase(),
        None => get_analogous(&primary)?.1,
    };
    let seeds = [primary, secondary, accent];
    let map: HashMap<String, &str> = neutral_colors()
        .enumerate()
        .map(|(i, neutral)| (neutral.to_string(), seeds[i % 3].as_str()))
        .collect();
    Ok(recolor_tags(svg, |_| true, |color| {
        map.get(&color.to_lowercase()).copied()
    }))
}
