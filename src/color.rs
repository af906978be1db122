//! Hex/RGB/HSL conversions and the adjustment primitives the palette and
//! spatial passes are built from.
//!
//! Hue is kept in `[0, 360)`, saturation and lightness in `[0, 100]`.

use crate::error::{Result, ThemeError};

/// Default lightness band for shade ramps, light end first.
pub const SHADE_LIGHTNESS_MAX: f64 = 85.0;
pub const SHADE_LIGHTNESS_MIN: f64 = 25.0;

/// Luminance above which black text reads better than white (WCAG crossover).
pub const LUMINANCE_THRESHOLD: f64 = 0.179;

const BLEND_SATURATION_BOOST: f64 = 10.0;
const BLEND_DARKEN: f64 = 15.0;
const BLEND_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    /// Builds a color with hue wrapped and saturation/lightness clamped.
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self {
            h: h.rem_euclid(360.0),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    pub fn to_hex(self) -> String {
        rgb_to_hex(hsl_to_rgb(self))
    }
}

pub fn hex_to_rgb(hex: &str) -> Result<Rgb> {
    let invalid = || ThemeError::InvalidColor(hex.to_string());
    let digits = hex
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(invalid)?;
    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid());
    Ok(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

pub fn is_hex_color(value: &str) -> bool {
    hex_to_rgb(value).is_ok()
}

pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return Hsl::new(0.0, 0.0, l * 100.0);
    }
    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    Hsl::new(h * 60.0, s * 100.0, l * 100.0)
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let s = hsl.s.clamp(0.0, 100.0) / 100.0;
    let l = hsl.l.clamp(0.0, 100.0) / 100.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = hsl.h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: to_u8(r1),
        g: to_u8(g1),
        b: to_u8(b1),
    }
}

pub fn hex_to_hsl(hex: &str) -> Result<Hsl> {
    hex_to_rgb(hex).map(rgb_to_hsl)
}

pub fn adjust_lightness(color: &str, delta: f64) -> Result<String> {
    let hsl = hex_to_hsl(color)?;
    Ok(Hsl::new(hsl.h, hsl.s, hsl.l + delta).to_hex())
}

pub fn adjust_saturation(color: &str, delta: f64) -> Result<String> {
    let hsl = hex_to_hsl(color)?;
    Ok(Hsl::new(hsl.h, hsl.s + delta, hsl.l).to_hex())
}

/// `n` shades of `color` across the default lightness band, lightest first.
pub fn generate_shades(color: &str, n: usize) -> Result<Vec<String>> {
    generate_shades_in_band(color, n, SHADE_LIGHTNESS_MIN, SHADE_LIGHTNESS_MAX)
}

/// Shades with hue and saturation held, lightness stepping evenly from
/// `max_lightness` down to `min_lightness`.
pub fn generate_shades_in_band(
    color: &str,
    n: usize,
    min_lightness: f64,
    max_lightness: f64,
) -> Result<Vec<String>> {
    let base = hex_to_hsl(color)?;
    let (lo, hi) = if min_lightness <= max_lightness {
        (min_lightness, max_lightness)
    } else {
        (max_lightness, min_lightness)
    };
    let shades = match n {
        0 => Vec::new(),
        1 => vec![Hsl::new(base.h, base.s, (lo + hi) / 2.0).to_hex()],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|i| Hsl::new(base.h, base.s, hi - step * i as f64).to_hex())
                .collect()
        }
    };
    Ok(shades)
}

fn rotate_hue(color: &str, degrees: f64) -> Result<String> {
    let hsl = hex_to_hsl(color)?;
    Ok(Hsl::new(hsl.h + degrees, hsl.s, hsl.l).to_hex())
}

pub fn get_complementary(color: &str) -> Result<String> {
    rotate_hue(color, 180.0)
}

/// The two neighbours at -30 and +30 degrees.
pub fn get_analogous(color: &str) -> Result<(String, String)> {
    Ok((rotate_hue(color, -30.0)?, rotate_hue(color, 30.0)?))
}

pub fn get_triadic(color: &str) -> Result<(String, String)> {
    Ok((rotate_hue(color, 120.0)?, rotate_hue(color, 240.0)?))
}

/// WCAG 2.x relative luminance in `[0, 1]`.
pub fn relative_luminance(rgb: Rgb) -> f64 {
    let linear = |channel: u8| {
        let v = channel as f64 / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(rgb.r) + 0.7152 * linear(rgb.g) + 0.0722 * linear(rgb.b)
}

/// `#000000` on backgrounds brighter than `threshold`, otherwise `#ffffff`.
pub fn contrast_text_color(background: &str, threshold: f64) -> Result<&'static str> {
    let luminance = relative_luminance(hex_to_rgb(background)?);
    Ok(if luminance > threshold {
        "#000000"
    } else {
        "#ffffff"
    })
}

/// Overlap color for two regions: saturation-weighted mean hue, boosted
/// saturation and a lightness below both parents. Keeps stepping darker until
/// the result is darker than the brighter parent and equal to neither.
pub fn blend_darker(a: &str, b: &str) -> Result<String> {
    let (rgb_a, rgb_b) = (hex_to_rgb(a)?, hex_to_rgb(b)?);
    let (hsl_a, hsl_b) = (rgb_to_hsl(rgb_a), rgb_to_hsl(rgb_b));

    let (mut sin, mut cos) = (0.0, 0.0);
    for hsl in [hsl_a, hsl_b] {
        let weight = hsl.s.max(1e-6);
        sin += weight * hsl.h.to_radians().sin();
        cos += weight * hsl.h.to_radians().cos();
    }
    let hue = sin.atan2(cos).to_degrees();
    let saturation = (hsl_a.s.max(hsl_b.s) + BLEND_SATURATION_BOOST).min(100.0);
    let ceiling = relative_luminance(rgb_a).max(relative_luminance(rgb_b));

    let mut lightness = (hsl_a.l.min(hsl_b.l) - BLEND_DARKEN).max(0.0);
    loop {
        let rgb = hsl_to_rgb(Hsl::new(hue, saturation, lightness));
        let fits = relative_luminance(rgb) < ceiling && rgb != rgb_a && rgb != rgb_b;
        if fits || lightness <= 0.0 {
            return Ok(rgb_to_hex(rgb));
        }
        lightness = (lightness - BLEND_STEP).max(0.0);
    }
}
