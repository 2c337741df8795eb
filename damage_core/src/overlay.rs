//! Re-renders the catalog template with severity-driven zone styles.

use std::borrow::Cow;

use damage_schema::{clamp_severity, DamageSnapshot, ZoneStyleSummary};

use crate::catalog::ZoneCatalog;
use crate::config::PaletteConfig;
use crate::style::{lerp_opacity, Rgb, ZoneStyle};

/// Colour a zone reaches at maximum damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPalette {
    pub damage_fill: Rgb,
    pub damage_opacity: f32,
}

impl Default for OverlayPalette {
    fn default() -> Self {
        Self {
            damage_fill: PaletteConfig::FALLBACK_DAMAGE_FILL,
            damage_opacity: 1.0,
        }
    }
}

impl From<&PaletteConfig> for OverlayPalette {
    fn from(config: &PaletteConfig) -> Self {
        Self {
            damage_fill: config.damage_fill(),
            damage_opacity: config.damage_opacity(),
        }
    }
}

/// Style a zone renders with at a given severity.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStyle<'a> {
    pub text: Cow<'a, str>,
    pub fill: Rgb,
    pub opacity: f32,
    pub is_default: bool,
}

/// Pure severity → style mapping.
///
/// Severity 0 returns the template style verbatim; anything above
/// interpolates `fill` and `fill-opacity` toward the palette. Out-of-range
/// input is clamped and NaN reads as 0.
pub fn zone_style<'a>(
    default: &'a ZoneStyle,
    palette: &OverlayPalette,
    severity: f32,
) -> RenderedStyle<'a> {
    let t = if severity.is_nan() {
        0.0
    } else {
        clamp_severity(severity)
    };
    if t <= 0.0 {
        return RenderedStyle {
            text: Cow::Borrowed(default.raw()),
            fill: default.fill(),
            opacity: default.opacity(),
            is_default: true,
        };
    }

    let fill = default.fill().lerp(palette.damage_fill, t);
    let opacity = lerp_opacity(default.opacity(), palette.damage_opacity, t);
    let mut declarations = default.declarations().clone();
    declarations.set("fill", fill.to_string());
    declarations.set("fill-opacity", opacity.to_string());
    RenderedStyle {
        text: Cow::Owned(declarations.to_string()),
        fill,
        opacity,
        is_default: false,
    }
}

/// A rendered overlay and the state revision it reflects.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    pub document: String,
    pub revision: u64,
    pub zones: Vec<ZoneStyleSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    palette: OverlayPalette,
}

impl OverlayRenderer {
    pub fn new(palette: OverlayPalette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &OverlayPalette {
        &self.palette
    }

    /// Copy the template and splice in the style of every zone element.
    ///
    /// Bytes outside zone `style` attributes are copied unchanged, and zones
    /// at severity 0 keep their original start tag.
    pub fn render(&self, catalog: &ZoneCatalog, snapshot: &DamageSnapshot) -> RenderedOverlay {
        let template = catalog.template();
        let mut document = String::with_capacity(template.len() + catalog.len() * 48);
        let mut zones = Vec::with_capacity(catalog.len());
        let mut cursor = 0;

        for zone in catalog.zones() {
            let severity = snapshot.severity(&zone.id);
            let style = zone_style(&zone.default_style, &self.palette, severity);

            if !style.is_default {
                match zone.geometry.style_value() {
                    Some(range) => {
                        document.push_str(&template[cursor..range.start]);
                        document.push_str(&style.text);
                        cursor = range.end;
                    }
                    None => {
                        let at = zone.geometry.insertion_point();
                        document.push_str(&template[cursor..at]);
                        document.push_str(" style=\"");
                        document.push_str(&style.text);
                        document.push('"');
                        cursor = at;
                    }
                }
            }

            zones.push(ZoneStyleSummary {
                zone: zone.id.clone(),
                severity: clamp_severity(severity),
                fill: style.fill.to_string(),
                opacity: style.opacity,
            });
        }
        document.push_str(&template[cursor..]);

        RenderedOverlay {
            document,
            revision: snapshot.revision,
            zones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerConfig;
    use damage_schema::ZoneId;

    const SMALL_TEMPLATE: &str = concat!(
        "<svg id=\"frame\">\n",
        "  <rect id=\"bg\" style=\"fill:#ffffff\"/>\n",
        "  <path class=\"front-bumper\" style=\"fill:#ff0000;stroke:none\" d=\"M 0 0\"/>\n",
        "  <path class=\"left-rear-tyre\" d=\"M 1 1\"/>\n",
        "</svg>\n"
    );

    fn small_catalog() -> ZoneCatalog {
        ZoneCatalog::load(SMALL_TEMPLATE, &MarkerConfig::default()).expect("loads")
    }

    fn palette() -> OverlayPalette {
        OverlayPalette {
            damage_fill: Rgb::new(0, 0, 0),
            damage_opacity: 0.5,
        }
    }

    fn snapshot(entries: &[(&str, f32)], revision: u64) -> DamageSnapshot {
        DamageSnapshot {
            revision,
            severities: entries
                .iter()
                .map(|(zone, severity)| (ZoneId::new(*zone), *severity))
                .collect(),
        }
    }

    #[test]
    fn undamaged_render_is_the_template() {
        let catalog = small_catalog();
        let overlay = OverlayRenderer::new(palette()).render(&catalog, &DamageSnapshot::default());
        assert_eq!(overlay.document, SMALL_TEMPLATE);
        assert_eq!(overlay.revision, 0);
        assert_eq!(overlay.zones.len(), 2);
    }

    #[test]
    fn style_is_total_over_the_unit_interval() {
        let default = ZoneStyle::from_attributes(Some("fill:#c80000;fill-opacity:1"), None);
        let palette = palette();
        for step in 0..=20 {
            let severity = step as f32 / 20.0;
            let style = zone_style(&default, &palette, severity);
            assert!(style.opacity >= 0.5 && style.opacity <= 1.0);
            assert!(style.fill.r <= 0xc8);
        }
        let full = zone_style(&default, &palette, 1.0);
        assert_eq!(full.fill, Rgb::new(0, 0, 0));
        assert_eq!(full.text, "fill:#000000;fill-opacity:0.5");
        let half = zone_style(&default, &palette, 0.5);
        assert_eq!(half.fill, Rgb::new(100, 0, 0));
        assert_eq!(half.opacity, 0.75);
        assert_eq!(zone_style(&default, &palette, f32::NAN).text, default.raw());
    }

    #[test]
    fn damaged_zones_only_touch_style() {
        let catalog = small_catalog();
        let overlay = OverlayRenderer::new(palette()).render(
            &catalog,
            &snapshot(&[("front-bumper", 1.0), ("left-rear-tyre", 1.0)], 4),
        );
        insta::assert_snapshot!(overlay.document, @r###"
        <svg id="frame">
          <rect id="bg" style="fill:#ffffff"/>
          <path class="front-bumper" style="fill:#000000;stroke:none;fill-opacity:0.5" d="M 0 0"/>
          <path style="fill:#000000;fill-opacity:0.5" class="left-rear-tyre" d="M 1 1"/>
        </svg>
        "###);
        assert_eq!(overlay.revision, 4);
        assert_eq!(overlay.zones[0].fill, "#000000");
        assert_eq!(overlay.zones[0].opacity, 0.5);
    }

    #[test]
    fn render_emits_every_catalog_zone() {
        let catalog = ZoneCatalog::reference();
        let renderer = OverlayRenderer::default();
        let sparse = renderer.render(&catalog, &snapshot(&[("rear-bumper", 0.5)], 1));
        assert_eq!(sparse.zones.len(), catalog.len());
        for zone in catalog.zones() {
            let marker = format!("class=\"{}\"", zone.id);
            assert_eq!(sparse.document.matches(marker.as_str()).count(), 1);
        }
        let summary = sparse
            .zones
            .iter()
            .find(|summary| summary.zone.as_str() == "rear-bumper")
            .expect("rear bumper summarised");
        assert_eq!(summary.severity, 0.5);
    }
}
