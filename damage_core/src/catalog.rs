//! Zone catalog extracted once from a vector template.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use damage_schema::ZoneId;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::config::{DamageZoneConfig, MarkerConfig, REFERENCE_TEMPLATE};
use crate::resolver::normalize_tag;
use crate::style::ZoneStyle;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed template: {reason}")]
    MalformedTemplate { reason: String },
    #[error("template contains no zone markers")]
    EmptyTemplate,
    #[error("failed to read template from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    fn malformed(reason: impl Into<String>) -> Self {
        CatalogError::MalformedTemplate {
            reason: reason.into(),
        }
    }
}

/// Where a zone lives inside the template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRef {
    /// Tag name of the element, e.g. `path`.
    pub element: String,
    /// The element's own `id` attribute, if any.
    pub element_id: Option<String>,
    /// Byte range of the element's start tag.
    pub tag_span: Range<usize>,
    style_value: Option<Range<usize>>,
    name_end: usize,
}

impl GeometryRef {
    /// Byte range of the `style` attribute value, quotes excluded.
    pub fn style_value(&self) -> Option<Range<usize>> {
        self.style_value.clone()
    }

    /// Byte offset just past the tag name, where a missing `style` is inserted.
    pub fn insertion_point(&self) -> usize {
        self.name_end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub label: String,
    pub geometry: GeometryRef,
    pub default_style: ZoneStyle,
}

/// Immutable set of zones defined by one template version.
#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    template: String,
    zones: Vec<Zone>,
    index: HashMap<ZoneId, usize>,
}

impl ZoneCatalog {
    /// Parse `template` and collect every element carrying a zone marker.
    pub fn load(template: impl Into<String>, markers: &MarkerConfig) -> Result<Self, CatalogError> {
        let template = template.into();
        let zones = extract_zones(&template, markers)?;
        if zones.is_empty() {
            return Err(CatalogError::EmptyTemplate);
        }
        let index = zones
            .iter()
            .enumerate()
            .map(|(position, zone)| (zone.id.clone(), position))
            .collect();
        tracing::debug!(
            target: "damage_zones::catalog",
            zones = zones.len(),
            "catalog.loaded"
        );
        Ok(Self {
            template,
            zones,
            index,
        })
    }

    pub fn from_file(path: &Path, markers: &MarkerConfig) -> Result<Self, CatalogError> {
        let template = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(template, markers)
    }

    /// Catalog for the built-in eight-zone reference template.
    pub fn reference() -> Self {
        Self::load(REFERENCE_TEMPLATE, &MarkerConfig::default())
            .expect("reference template should parse")
    }

    /// Load the template named by `config`, or the reference template.
    pub fn from_config(config: &DamageZoneConfig) -> Result<Self, CatalogError> {
        match config.template_path() {
            Some(path) => Self::from_file(path, config.markers()),
            None => Self::load(REFERENCE_TEMPLATE, config.markers()),
        }
    }

    /// Zones in document order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: &ZoneId) -> Option<&Zone> {
        self.index.get(id).map(|position| &self.zones[*position])
    }

    pub fn contains(&self, id: &ZoneId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ZoneId> + '_ {
        self.zones.iter().map(|zone| &zone.id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

fn extract_zones(template: &str, markers: &MarkerConfig) -> Result<Vec<Zone>, CatalogError> {
    let mut reader = Reader::from_str(template);
    let mut depth = 0usize;
    let mut zones: Vec<Zone> = Vec::new();

    loop {
        let before = reader.buffer_position();
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return Err(CatalogError::malformed(format!(
                    "xml error near byte {}: {}",
                    reader.buffer_position(),
                    err
                )))
            }
        };
        let after = reader.buffer_position();

        let element = match &event {
            Event::Start(element) => {
                depth += 1;
                element
            }
            Event::Empty(element) => element,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        if let Some(zone) = zone_from_element(template, element, before..after, markers)? {
            let key = normalize_tag(zone.id.as_str());
            if zones
                .iter()
                .any(|existing| normalize_tag(existing.id.as_str()) == key)
            {
                return Err(CatalogError::malformed(format!(
                    "zone '{}' is declared more than once",
                    zone.id
                )));
            }
            zones.push(zone);
        }
    }

    if depth != 0 {
        return Err(CatalogError::malformed(format!(
            "{} element(s) left unterminated",
            depth
        )));
    }
    Ok(zones)
}

fn zone_from_element(
    template: &str,
    element: &BytesStart<'_>,
    span: Range<usize>,
    markers: &MarkerConfig,
) -> Result<Option<Zone>, CatalogError> {
    let mut class = None;
    let mut marker = None;
    let mut element_id = None;
    let mut label = None;
    let mut fill = None;

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| CatalogError::malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| CatalogError::malformed(err.to_string()))?
            .into_owned();
        match key.as_str() {
            "class" => class = Some(value),
            "id" => element_id = Some(value),
            "inkscape:label" | "aria-label" => label = Some(value),
            "fill" => fill = Some(value),
            other if other == markers.zone_attribute() => marker = Some(value),
            _ => {}
        }
    }

    let id = match marker {
        Some(value) if !value.trim().is_empty() => value.trim().to_ascii_lowercase(),
        _ => match class.as_deref().and_then(|class| markers.match_class(class)) {
            Some(token) => token.to_ascii_lowercase(),
            None => return Ok(None),
        },
    };

    // The reader may already have consumed `<` while reading preceding text,
    // so search back from the end of the tag.
    let open = template[..span.end]
        .rfind('<')
        .ok_or_else(|| CatalogError::malformed(format!("zone '{}' has no start tag", id)))?;
    let tag = &template[open..span.end];
    let layout = scan_start_tag(tag)
        .ok_or_else(|| CatalogError::malformed(format!("unreadable start tag for zone '{}'", id)))?;
    let style_value = layout
        .style_value
        .map(|range| open + range.start..open + range.end);
    let style_text = style_value.clone().map(|range| &template[range]);

    let geometry = GeometryRef {
        element: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
        element_id,
        tag_span: open..span.end,
        style_value,
        name_end: open + layout.name_end,
    };

    Ok(Some(Zone {
        label: label.unwrap_or_else(|| title_case(&id)),
        id: ZoneId::new(id),
        geometry,
        default_style: ZoneStyle::from_attributes(style_text, fill.as_deref()),
    }))
}

struct TagLayout {
    name_end: usize,
    style_value: Option<Range<usize>>,
}

/// Locate the tag name and the `style` value inside a raw start tag.
fn scan_start_tag(tag: &str) -> Option<TagLayout> {
    let bytes = tag.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let is_name_end = |b: u8| b.is_ascii_whitespace() || b == b'>' || b == b'/' || b == b'=';

    let mut i = 1;
    while i < bytes.len() && !is_name_end(bytes[i]) {
        i += 1;
    }
    let name_end = i;
    let mut style_value = None;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' || bytes[i] == b'/' {
            break;
        }
        let key_start = i;
        while i < bytes.len() && !is_name_end(bytes[i]) {
            i += 1;
        }
        let key = &tag[key_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_end = value_start + tag[value_start..].find(quote as char)?;
        if key == "style" {
            style_value = Some(value_start..value_end);
        }
        i = value_end + 1;
    }

    Some(TagLayout {
        name_end,
        style_value,
    })
}

fn title_case(id: &str) -> String {
    id.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
