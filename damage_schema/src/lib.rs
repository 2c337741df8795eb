//! Data contracts shared by the damage-zone crates.
//!
//! Everything here is plain serde data: identifiers, the inbound
//! [`DamageEvent`] record and the read-only views handed back to callers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const SEVERITY_MIN: f32 = 0.0;
pub const SEVERITY_MAX: f32 = 1.0;

/// Clamp a severity into `[0, 1]`.
pub fn clamp_severity(value: f32) -> f32 {
    value.clamp(SEVERITY_MIN, SEVERITY_MAX)
}

/// Identifier of a tracked vehicle instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VehicleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stable identifier of a body zone, e.g. `front-bumper`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ZoneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How an event value combines with the stored severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Replace the stored severity.
    Absolute,
    /// Add to the stored severity.
    #[default]
    Delta,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Absolute => f.write_str("absolute"),
            ApplyMode::Delta => f.write_str("delta"),
        }
    }
}

/// Collision point relative to the vehicle origin.
///
/// `x` grows to the vehicle's right, `y` upward and `z` toward the front.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpactVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ImpactVector {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Length of the vector projected onto the ground plane.
    pub fn planar_magnitude(&self) -> f32 {
        self.x.hypot(self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Where an event says the damage landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSource {
    /// Free-form zone tag, possibly aliased or unnormalised.
    Tag(String),
    /// Impact descriptor reported by a collision.
    Impact(ImpactVector),
}

impl fmt::Display for ZoneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneSource::Tag(tag) => write!(f, "tag '{}'", tag),
            ZoneSource::Impact(v) => write!(f, "impact ({}, {}, {})", v.x, v.y, v.z),
        }
    }
}

/// A single damage report for one vehicle. Consumed on ingestion, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub vehicle: VehicleId,
    pub source: ZoneSource,
    pub value: f32,
    #[serde(default)]
    pub mode: ApplyMode,
}

impl DamageEvent {
    pub fn tagged(
        vehicle: impl Into<VehicleId>,
        tag: impl Into<String>,
        value: f32,
        mode: ApplyMode,
    ) -> Self {
        Self {
            vehicle: vehicle.into(),
            source: ZoneSource::Tag(tag.into()),
            value,
            mode,
        }
    }

    pub fn impact(
        vehicle: impl Into<VehicleId>,
        vector: ImpactVector,
        value: f32,
        mode: ApplyMode,
    ) -> Self {
        Self {
            vehicle: vehicle.into(),
            source: ZoneSource::Impact(vector),
            value,
            mode,
        }
    }
}

/// Immutable copy of one vehicle's damage state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageSnapshot {
    pub revision: u64,
    pub severities: BTreeMap<ZoneId, f32>,
}

impl DamageSnapshot {
    /// Severity for `zone`; unset zones read as undamaged.
    pub fn severity(&self, zone: &ZoneId) -> f32 {
        self.severities.get(zone).copied().unwrap_or(SEVERITY_MIN)
    }

    pub fn is_undamaged(&self) -> bool {
        self.severities.values().all(|value| *value <= SEVERITY_MIN)
    }
}

/// Per-zone style summary attached to a rendered overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStyleSummary {
    pub zone: ZoneId,
    pub severity: f32,
    pub fill: String,
    pub opacity: f32,
}
