use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use eframe::egui::Color32;
use serde::Deserialize;

/// Opaque RGB color used for zone fills, category ramps and bar fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiplies every channel by `factor`, saturating at 255.
    pub fn lighten(self, factor: f32) -> Self {
        let scale = |channel: u8| (channel as f32 * factor.max(0.0)).round().clamp(0.0, 255.0) as u8;
        Self::rgb(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Linear RGB interpolation; `t` outside `[0, 1]` extrapolates and saturates.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let mix = |from: u8, to: u8| {
            (from as f32 + (to as f32 - from as f32) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_color32(self) -> Color32 {
        Color32::from_rgb(self.r, self.g, self.b)
    }

    pub fn with_opacity(self, opacity: f32) -> Color32 {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(self.r, self.g, self.b, alpha)
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "gray" | "grey" => Self::GRAY,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            _ => return None,
        };
        Some(color)
    }

    fn parse_hex(digits: &str) -> anyhow::Result<Self> {
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|digit| [digit, digit]).collect::<String>(),
            6 => digits.to_owned(),
            _ => return Err(anyhow!("hex color must have 3 or 6 digits, got {digits:?}")),
        };

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .with_context(|| format!("invalid hex digits in color #{digits}"))
        };

        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    fn parse_rgb_function(arguments: &str) -> anyhow::Result<Self> {
        let channels = arguments
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f32>()
                    .with_context(|| format!("invalid rgb() channel {part:?}"))
                    .map(|value| value.round().clamp(0.0, 255.0) as u8)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
            _ => Err(anyhow!("rgb() expects three channels, got {}", channels.len())),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::GRAY
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim().to_ascii_lowercase();

        if let Some(digits) = value.strip_prefix('#') {
            return Self::parse_hex(digits);
        }

        if let Some(arguments) = value
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_rgb_function(arguments);
        }

        Self::named(&value).ok_or_else(|| anyhow!("unsupported color {raw:?}"))
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Linear map from a numeric domain onto an RGB ramp. Values outside the
/// domain extrapolate, with channels saturating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearColorScale {
    pub domain: (f64, f64),
    pub range: (Color, Color),
}

impl LinearColorScale {
    pub fn new(domain: (f64, f64), range: (Color, Color)) -> Self {
        Self { domain, range }
    }

    pub fn color(&self, value: f64) -> Color {
        let (d0, d1) = self.domain;
        let span = d1 - d0;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            (value - d0) / span
        };
        self.range.0.lerp(self.range.1, t as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_notations() {
        assert_eq!("#00A59B".parse::<Color>().unwrap(), Color::rgb(0, 165, 155));
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(
            "rgb(128, 128, 128)".parse::<Color>().unwrap(),
            Color::GRAY
        );
        assert_eq!("blue".parse::<Color>().unwrap(), Color::rgb(0, 0, 255));
        assert!("#12345".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn lighten_saturates_instead_of_wrapping() {
        assert_eq!(Color::GRAY.lighten(1.25), Color::rgb(160, 160, 160));
        assert_eq!(Color::rgb(250, 10, 0).lighten(1.25), Color::rgb(255, 13, 0));
    }

    #[test]
    fn linear_scale_hits_both_ends() {
        let scale = LinearColorScale::new((1.0, 17.0), (Color::WHITE, Color::rgb(0, 0, 255)));
        assert_eq!(scale.color(1.0), Color::WHITE);
        assert_eq!(scale.color(17.0), Color::rgb(0, 0, 255));
        assert_eq!(scale.color(9.0), Color::rgb(128, 128, 255));
    }

    #[test]
    fn display_round_trips_through_hex() {
        let color = Color::rgb(232, 78, 16);
        assert_eq!(color.to_string(), "#e84e10");
        assert_eq!(color.to_string().parse::<Color>().unwrap(), color);
    }
}
