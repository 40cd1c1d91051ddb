//! RGBA colors and colormaps.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Builds a color from unit-interval channels, clamping out-of-range input.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        fn channel(v: f64) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// `#rrggbb`, used for SVG `fill` attributes. Alpha is emitted separately.
    pub fn to_hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(self) -> f64 {
        self.a as f64 / 255.0
    }

    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Rgba {
    type Err = Error;

    /// Accepts `white`, `black`, `transparent` and `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`.
    fn from_str(text: &str) -> Result<Self> {
        parse_color(text).ok_or_else(|| Error::InvalidColor {
            value: text.to_string(),
        })
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_color(text: &str) -> Option<Rgba> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(Rgba::TRANSPARENT),
        "white" => return Some(Rgba::WHITE),
        "black" => return Some(Rgba::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Some(Rgba::rgb(hex1(bytes[0])?, hex1(bytes[1])?, hex1(bytes[2])?)),
        4 => Some(Rgba::new(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            hex1(bytes[3])?,
        )),
        6 => Some(Rgba::rgb(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
        )),
        8 => Some(Rgba::new(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            hex2(&bytes[6..8])?,
        )),
        _ => None,
    }
}

/// Maps a position in `[0, 1]` to a color.
///
/// Named maps follow the matplotlib definitions of the same name. `Gradient` interpolates
/// linearly between evenly spaced stops.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Colormap {
    #[default]
    Jet,
    Hsv,
    Rainbow,
    Greys,
    Gradient(Vec<Rgba>),
}

// (x, y) anchors of matplotlib's `jet` segment data, per channel.
const JET_RED: &[(f64, f64)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: &[(f64, f64)] = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: &[(f64, f64)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn piecewise(anchors: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(first_x, first_y)) = anchors.first() else {
        return 0.0;
    };
    if t <= first_x {
        return first_y;
    }
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if t <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (y1 - y0) * (t - x0) / (x1 - x0);
        }
    }
    anchors.last().map(|&(_, y)| y).unwrap_or(0.0)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

impl Colormap {
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Jet => "jet",
            Colormap::Hsv => "hsv",
            Colormap::Rainbow => "rainbow",
            Colormap::Greys => "greys",
            Colormap::Gradient(_) => "gradient",
        }
    }

    pub fn sample(&self, t: f64) -> Rgba {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Colormap::Jet => Rgba::from_unit(
                piecewise(JET_RED, t),
                piecewise(JET_GREEN, t),
                piecewise(JET_BLUE, t),
            ),
            Colormap::Hsv => {
                let (r, g, b) = hsv_to_rgb(t, 1.0, 1.0);
                Rgba::from_unit(r, g, b)
            }
            Colormap::Rainbow => {
                let r = (2.0 * t - 0.5).abs();
                let g = (std::f64::consts::PI * t).sin();
                let b = (std::f64::consts::FRAC_PI_2 * t).cos();
                Rgba::from_unit(r, g, b)
            }
            Colormap::Greys => {
                let v = 1.0 - t;
                Rgba::from_unit(v, v, v)
            }
            Colormap::Gradient(stops) => sample_gradient(stops, t),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Colormap::Gradient(stops) = self {
            if stops.is_empty() {
                return Err(Error::invalid_option(
                    "cmap",
                    "a gradient needs at least one color stop",
                ));
            }
        }
        Ok(())
    }
}

fn sample_gradient(stops: &[Rgba], t: f64) -> Rgba {
    match stops.len() {
        0 => Rgba::BLACK,
        1 => stops[0],
        n => {
            let pos = t * (n - 1) as f64;
            let i = (pos.floor() as usize).min(n - 2);
            let f = pos - i as f64;
            let (a, b) = (stops[i], stops[i + 1]);
            let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
            Rgba::new(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b), lerp(a.a, b.a))
        }
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jet" => Ok(Colormap::Jet),
            "hsv" => Ok(Colormap::Hsv),
            "rainbow" => Ok(Colormap::Rainbow),
            "greys" | "grays" | "gray" | "grey" => Ok(Colormap::Greys),
            other => Err(Error::invalid_option(
                "cmap",
                format!("unknown colormap `{other}`"),
            )),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ColormapRepr {
    Named(String),
    Stops(Vec<Rgba>),
}

impl Serialize for Colormap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Colormap::Gradient(stops) => ColormapRepr::Stops(stops.clone()),
            named => ColormapRepr::Named(named.name().to_string()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Colormap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match ColormapRepr::deserialize(deserializer)? {
            ColormapRepr::Named(name) => name.parse().map_err(serde::de::Error::custom),
            ColormapRepr::Stops(stops) => Ok(Colormap::Gradient(stops)),
        }
    }
}
