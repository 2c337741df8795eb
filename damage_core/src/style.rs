//! Inline-style parsing and the severity colour scale.

use std::fmt;

/// 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = value.to_ascii_lowercase();
        let inner = lower.strip_prefix("rgb(")?.strip_suffix(')')?;
        let mut channels = inner.split(',').map(|part| part.trim().parse::<u8>());
        let r = channels.next()?.ok()?;
        let g = channels.next()?.ok()?;
        let b = channels.next()?.ok()?;
        if channels.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }

    /// Linear interpolation per channel; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, target: Rgb, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Rgb::new(
            lerp_channel(self.r, target.r, t),
            lerp_channel(self.g, target.g, t),
            lerp_channel(self.b, target.b, t),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Rgb::new(digit(0)?, digit(1)?, digit(2)?))
        }
        6 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb::new(pair(0)?, pair(2)?, pair(4)?))
        }
        _ => None,
    }
}

fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    let value = from as f32 + (to as f32 - from as f32) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Linear interpolation of an opacity, rounded to three decimals.
pub fn lerp_opacity(from: f32, to: f32, t: f32) -> f32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let value = (from + (to - from) * t).clamp(0.0, 1.0);
    (value * 1000.0).round() / 1000.0
}

/// Ordered `property:value` pairs of an inline `style` attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleDeclarations {
    entries: Vec<(String, String)>,
}

impl StyleDeclarations {
    pub fn parse(style: &str) -> Self {
        let entries = style
            .split(';')
            .filter_map(|declaration| {
                let (property, value) = declaration.split_once(':')?;
                let property = property.trim();
                if property.is_empty() {
                    return None;
                }
                Some((property.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value.as_str())
    }

    /// Replace `property` in place, or append it when absent.
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((property.to_string(), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for StyleDeclarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (property, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}:{}", property, value)?;
        }
        Ok(())
    }
}

/// Undamaged style of a zone as declared by the template.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStyle {
    raw: String,
    declarations: StyleDeclarations,
    fill: Rgb,
    opacity: f32,
}

impl ZoneStyle {
    /// Build from the raw `style` attribute text and an optional `fill`
    /// presentation attribute. An unparseable fill is treated as black.
    pub fn from_attributes(style: Option<&str>, fill_attr: Option<&str>) -> Self {
        let raw = style.unwrap_or_default().to_string();
        let declarations = StyleDeclarations::parse(&raw);
        let fill = declarations
            .get("fill")
            .or(fill_attr)
            .and_then(Rgb::parse)
            .unwrap_or(Rgb::BLACK);
        let opacity = declarations
            .get("fill-opacity")
            .and_then(|value| value.parse::<f32>().ok())
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        Self {
            raw,
            declarations,
            fill,
            opacity,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn declarations(&self) -> &StyleDeclarations {
        &self.declarations
    }

    pub fn fill(&self) -> Rgb {
        self.fill
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}
