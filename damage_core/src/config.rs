//! Configuration for the damage-zone model.
//!
//! Loaded from `damage_zone_config.json` with support for an environment
//! variable override and a built-in fallback.

use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::style::Rgb;

pub const BUILTIN_DAMAGE_ZONE_CONFIG: &str = include_str!("data/damage_zone_config.json");

/// Reference vehicle template naming the eight body zones.
pub const REFERENCE_TEMPLATE: &str = include_str!("data/damage_zones.svg");

/// Identifiers carried by [`REFERENCE_TEMPLATE`], in document order.
pub const REFERENCE_ZONE_IDS: [&str; 8] = [
    "front-bumper",
    "left-skirt",
    "rear-bumper",
    "left-rear-tyre",
    "left-front-tyre",
    "right-front-tyre",
    "right-rear-tyre",
    "right-skirt",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DamageZoneConfig {
    registration: RegistrationConfig,
    unknown_tags: UnknownTagConfig,
    markers: MarkerConfig,
    aliases: BTreeMap<String, Vec<String>>,
    impact: ImpactConfig,
    palette: PaletteConfig,
    ingest: IngestConfig,
    template_path: Option<PathBuf>,
}

impl Default for DamageZoneConfig {
    fn default() -> Self {
        Self {
            registration: RegistrationConfig::default(),
            unknown_tags: UnknownTagConfig::default(),
            markers: MarkerConfig::default(),
            aliases: default_aliases(),
            impact: ImpactConfig::default(),
            palette: PaletteConfig::default(),
            ingest: IngestConfig::default(),
            template_path: None,
        }
    }
}

impl DamageZoneConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_DAMAGE_ZONE_CONFIG)
                .expect("builtin damage zone config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, DamageZoneConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| DamageZoneConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = DamageZoneConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn registration(&self) -> &RegistrationConfig {
        &self.registration
    }

    pub fn unknown_tags(&self) -> &UnknownTagConfig {
        &self.unknown_tags
    }

    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    pub fn aliases(&self) -> &BTreeMap<String, Vec<String>> {
        &self.aliases
    }

    pub fn impact(&self) -> &ImpactConfig {
        &self.impact
    }

    pub fn palette(&self) -> &PaletteConfig {
        &self.palette
    }

    pub fn ingest(&self) -> &IngestConfig {
        &self.ingest
    }

    pub fn template_path(&self) -> Option<&Path> {
        self.template_path.as_deref()
    }

    pub fn with_require_registration(mut self, required: bool) -> Self {
        self.registration.require_registration = required;
        self
    }

    pub fn with_unknown_tag_policy(mut self, policy: UnknownTagPolicy) -> Self {
        self.unknown_tags.policy = policy;
        self
    }

    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        self.template_path = path;
        self
    }
}

#[derive(Debug, Error)]
pub enum DamageZoneConfigError {
    #[error("failed to parse damage zone config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read damage zone config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    require_registration: bool,
}

impl RegistrationConfig {
    /// When false, a vehicle is tracked on its first resolved event.
    pub fn require_registration(&self) -> bool {
        self.require_registration
    }
}

/// What to do with an event whose zone source resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTagPolicy {
    #[default]
    Drop,
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnknownTagConfig {
    policy: UnknownTagPolicy,
}

impl UnknownTagConfig {
    pub fn policy(&self) -> UnknownTagPolicy {
        self.policy
    }
}

/// Which template elements count as zones.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    zone_classes: Vec<String>,
    zone_attribute: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            zone_classes: REFERENCE_ZONE_IDS.iter().map(|id| id.to_string()).collect(),
            zone_attribute: "data-zone".to_string(),
        }
    }
}

impl MarkerConfig {
    pub fn new(zone_classes: Vec<String>, zone_attribute: impl Into<String>) -> Self {
        Self {
            zone_classes,
            zone_attribute: zone_attribute.into(),
        }
    }

    pub fn zone_classes(&self) -> &[String] {
        &self.zone_classes
    }

    pub fn zone_attribute(&self) -> &str {
        &self.zone_attribute
    }

    /// First class token naming a recognised zone.
    pub fn match_class<'a>(&self, class_attr: &'a str) -> Option<&'a str> {
        class_attr.split_whitespace().find(|token| {
            self.zone_classes
                .iter()
                .any(|known| known.eq_ignore_ascii_case(token))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    bumper_cone_degrees: f32,
    skirt_cone_degrees: f32,
    min_magnitude: f32,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            bumper_cone_degrees: 30.0,
            skirt_cone_degrees: 60.0,
            min_magnitude: 0.05,
        }
    }
}

impl ImpactConfig {
    pub fn bumper_cone_degrees(&self) -> f32 {
        self.bumper_cone_degrees.clamp(0.0, 90.0)
    }

    pub fn skirt_cone_degrees(&self) -> f32 {
        self.skirt_cone_degrees
            .clamp(self.bumper_cone_degrees(), 90.0)
    }

    pub fn min_magnitude(&self) -> f32 {
        self.min_magnitude.max(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    damage_fill: String,
    damage_opacity: f32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            damage_fill: "#b71c1c".to_string(),
            damage_opacity: 1.0,
        }
    }
}

impl PaletteConfig {
    pub const FALLBACK_DAMAGE_FILL: Rgb = Rgb::new(0xb7, 0x1c, 0x1c);

    /// Maximum-damage fill colour; an unparseable value falls back to the default.
    pub fn damage_fill(&self) -> Rgb {
        Rgb::parse(&self.damage_fill).unwrap_or(Self::FALLBACK_DAMAGE_FILL)
    }

    pub fn damage_opacity(&self) -> f32 {
        if self.damage_opacity.is_finite() {
            self.damage_opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

impl IngestConfig {
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }
}

fn default_aliases() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 22] = [
        ("front", &["front-bumper"]),
        ("nose", &["front-bumper"]),
        ("rear", &["rear-bumper"]),
        ("back", &["rear-bumper"]),
        ("tail", &["rear-bumper"]),
        ("left", &["left-skirt"]),
        ("left-side", &["left-skirt"]),
        ("right", &["right-skirt"]),
        ("right-side", &["right-skirt"]),
        ("fl", &["left-front-tyre"]),
        ("fr", &["right-front-tyre"]),
        ("rl", &["left-rear-tyre"]),
        ("rr", &["right-rear-tyre"]),
        ("front-left-tyre", &["left-front-tyre"]),
        ("front-right-tyre", &["right-front-tyre"]),
        ("rear-left-tyre", &["left-rear-tyre"]),
        ("rear-right-tyre", &["right-rear-tyre"]),
        ("front-tyres", &["left-front-tyre", "right-front-tyre"]),
        ("rear-tyres", &["left-rear-tyre", "right-rear-tyre"]),
        ("left-tyres", &["left-front-tyre", "left-rear-tyre"]),
        ("right-tyres", &["right-front-tyre", "right-rear-tyre"]),
        (
            "tyres",
            &[
                "left-front-tyre",
                "right-front-tyre",
                "left-rear-tyre",
                "right-rear-tyre",
            ],
        ),
    ];
    table
        .iter()
        .map(|(alias, zones)| {
            (
                alias.to_string(),
                zones.iter().map(|zone| zone.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DamageZoneConfigMetadata {
    path: Option<PathBuf>,
}

impl DamageZoneConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_damage_zone_config_from_env() -> (Arc<DamageZoneConfig>, DamageZoneConfigMetadata) {
    let override_path = env::var("DAMAGE_ZONE_CONFIG_PATH").ok().map(PathBuf::from);
    let default_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/damage_zone_config.json");

    let candidates: Vec<PathBuf> = match override_path {
        Some(ref path) => vec![path.clone()],
        None => vec![default_path.clone()],
    };

    for path in candidates {
        match DamageZoneConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "damage_zones::config",
                    path = %path.display(),
                    "damage_zone_config.loaded=file"
                );
                return (Arc::new(config), DamageZoneConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "damage_zones::config",
                    path = %path.display(),
                    error = %err,
                    "damage_zone_config.load_failed"
                );
            }
        }
    }

    let config = DamageZoneConfig::builtin();
    tracing::info!(
        target: "damage_zones::config",
        "damage_zone_config.loaded=builtin"
    );
    (config, DamageZoneConfigMetadata::new(None))
}
