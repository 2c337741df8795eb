//! Maps raw damage sources onto catalog zone identifiers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use damage_schema::{ImpactVector, ZoneId, ZoneSource};

use crate::catalog::ZoneCatalog;
use crate::config::ImpactConfig;

/// Resolves free-form zone tags and impact descriptors against one catalog.
///
/// Tags are normalised (trimmed, lowercased, separators folded to `-`, `tire`
/// spelled `tyre`), matched directly against catalog identifiers, then looked
/// up in the alias table. Anything that still does not name a catalog zone
/// resolves to an empty sequence.
#[derive(Debug, Clone)]
pub struct ZoneResolver {
    catalog: Arc<ZoneCatalog>,
    by_name: HashMap<String, ZoneId>,
    aliases: HashMap<String, Vec<ZoneId>>,
    impact: ImpactConfig,
}

impl ZoneResolver {
    pub fn new(
        catalog: Arc<ZoneCatalog>,
        aliases: &BTreeMap<String, Vec<String>>,
        impact: ImpactConfig,
    ) -> Self {
        let by_name: HashMap<String, ZoneId> = catalog
            .ids()
            .map(|id| (normalize_tag(id.as_str()), id.clone()))
            .collect();

        let mut table = HashMap::with_capacity(aliases.len());
        for (alias, targets) in aliases {
            let mut zones: Vec<ZoneId> = Vec::with_capacity(targets.len());
            for target in targets {
                match by_name.get(&normalize_tag(target)) {
                    Some(zone) if !zones.contains(zone) => zones.push(zone.clone()),
                    Some(_) => {}
                    None => tracing::debug!(
                        target: "damage_zones::resolver",
                        alias = %alias,
                        zone = %target,
                        "alias.target_missing"
                    ),
                }
            }
            if !zones.is_empty() {
                table.insert(normalize_tag(alias), zones);
            }
        }

        Self {
            catalog,
            by_name,
            aliases: table,
            impact,
        }
    }

    pub fn catalog(&self) -> &Arc<ZoneCatalog> {
        &self.catalog
    }

    /// Resolve a raw tag. Never fails; unknown tags yield an empty sequence.
    pub fn resolve(&self, raw_tag: &str) -> Vec<ZoneId> {
        let tag = normalize_tag(raw_tag);
        if tag.is_empty() {
            return Vec::new();
        }
        if let Some(zone) = self.by_name.get(&tag) {
            return vec![zone.clone()];
        }
        self.aliases
            .get(&tag)
            .map(|zones| {
                zones
                    .iter()
                    .filter(|zone| self.catalog.contains(zone))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve an impact descriptor by its bearing on the ground plane.
    ///
    /// Bearings inside the bumper cone hit that end's bumper, bearings past
    /// the skirt cone hit that side's skirt, and anything between hits the
    /// corner tyre followed by the nearer panel.
    pub fn resolve_impact(&self, impact: &ImpactVector) -> Vec<ZoneId> {
        if !impact.is_finite() || impact.planar_magnitude() < self.impact.min_magnitude() {
            return Vec::new();
        }
        let end = if impact.z >= 0.0 { "front" } else { "rear" };
        let side = if impact.x >= 0.0 { "right" } else { "left" };
        let bumper = format!("{}-bumper", end);
        let skirt = format!("{}-skirt", side);
        let tyre = format!("{}-{}-tyre", side, end);

        let bearing = impact.x.abs().atan2(impact.z.abs()).to_degrees();
        let bumper_cone = self.impact.bumper_cone_degrees();
        let skirt_cone = self.impact.skirt_cone_degrees();
        let candidates: Vec<&str> = if bearing < bumper_cone {
            vec![bumper.as_str()]
        } else if bearing > skirt_cone {
            vec![skirt.as_str()]
        } else if bearing < (bumper_cone + skirt_cone) / 2.0 {
            vec![tyre.as_str(), bumper.as_str()]
        } else {
            vec![tyre.as_str(), skirt.as_str()]
        };

        candidates
            .into_iter()
            .filter_map(|name| self.by_name.get(name).cloned())
            .collect()
    }

    pub fn resolve_source(&self, source: &ZoneSource) -> Vec<ZoneId> {
        match source {
            ZoneSource::Tag(tag) => self.resolve(tag),
            ZoneSource::Impact(impact) => self.resolve_impact(impact),
        }
    }
}

/// Canonical form of a zone tag used for every lookup.
pub fn normalize_tag(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut normalized = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let c = if c == '_' || c.is_whitespace() { '-' } else { c };
        if c == '-' && (normalized.is_empty() || normalized.ends_with('-')) {
            continue;
        }
        normalized.push(c);
    }
    while normalized.ends_with('-') {
        normalized.pop();
    }
    normalized.replace("tire", "tyre")
}
