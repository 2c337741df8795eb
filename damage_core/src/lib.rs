//! Vehicle damage zone model.
//!
//! A [`ZoneCatalog`] is extracted once from a vector template, per-vehicle
//! [`DamageState`] records a severity in `[0, 1]` for each zone, and the
//! [`OverlayRenderer`] re-styles the template from a state snapshot. The
//! [`DamageZoneService`] ties these together behind a thread-safe registry
//! keyed by vehicle.

pub mod catalog;
pub mod config;
mod hashing;
pub mod ingest;
pub mod overlay;
pub mod resolver;
pub mod service;
pub mod state;
pub mod style;
pub mod watcher;

pub use catalog::{CatalogError, GeometryRef, Zone, ZoneCatalog};
pub use config::{
    load_damage_zone_config_from_env, DamageZoneConfig, DamageZoneConfigError,
    DamageZoneConfigMetadata, ImpactConfig, MarkerConfig, PaletteConfig, UnknownTagPolicy,
    BUILTIN_DAMAGE_ZONE_CONFIG, REFERENCE_TEMPLATE, REFERENCE_ZONE_IDS,
};
pub use hashing::shard_for;
pub use ingest::{IngestError, IngestPipeline, IngestStats};
pub use overlay::{zone_style, OverlayPalette, OverlayRenderer, RenderedOverlay, RenderedStyle};
pub use resolver::{normalize_tag, ZoneResolver};
pub use service::{DamageZoneService, RecordOutcome, ReloadReport, ServiceError, ServiceOptions};
pub use state::{DamageState, StateError};
pub use style::{Rgb, ZoneStyle};
pub use watcher::TemplateWatcher;

pub use damage_schema::{
    ApplyMode, DamageEvent, DamageSnapshot, ImpactVector, VehicleId, ZoneId, ZoneSource,
    ZoneStyleSummary,
};
