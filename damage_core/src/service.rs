//! Registry of tracked vehicles and the entry point for damage events.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use damage_schema::{DamageEvent, DamageSnapshot, VehicleId, ZoneId, ZoneSource};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use thiserror::Error;

use crate::catalog::ZoneCatalog;
use crate::config::{DamageZoneConfig, ImpactConfig, UnknownTagPolicy};
use crate::overlay::{OverlayPalette, OverlayRenderer, RenderedOverlay};
use crate::resolver::ZoneResolver;
use crate::state::{DamageState, StateError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("vehicle {0} is not tracked")]
    VehicleNotTracked(VehicleId),
    #[error("{zone_source} for vehicle {vehicle} does not name a known zone")]
    UnresolvedZone {
        vehicle: VehicleId,
        zone_source: ZoneSource,
    },
    #[error(transparent)]
    State(#[from] StateError),
}

/// Result of recording one event.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// Revision of the vehicle's state after the event.
    pub revision: u64,
    /// Zones the event was applied to; empty when it was dropped.
    pub zones: Vec<ZoneId>,
}

impl RecordOutcome {
    pub fn is_dropped(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Zone membership changes caused by a catalog reload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReloadReport {
    pub added_zones: Vec<ZoneId>,
    pub removed_zones: Vec<ZoneId>,
    pub vehicles_rebound: usize,
    pub entries_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub require_registration: bool,
    pub unknown_tags: UnknownTagPolicy,
    pub aliases: BTreeMap<String, Vec<String>>,
    pub impact: ImpactConfig,
    pub palette: OverlayPalette,
}

impl From<&DamageZoneConfig> for ServiceOptions {
    fn from(config: &DamageZoneConfig) -> Self {
        Self {
            require_registration: config.registration().require_registration(),
            unknown_tags: config.unknown_tags().policy(),
            aliases: config.aliases().clone(),
            impact: config.impact().clone(),
            palette: OverlayPalette::from(config.palette()),
        }
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from(&DamageZoneConfig::default())
    }
}

type VehicleSlot = Arc<Mutex<DamageState>>;

/// Orchestrates resolution, state mutation and rendering for every vehicle.
///
/// Lock order is catalog binding, then the registry, then a vehicle slot.
/// Writers to one vehicle serialise on its slot; different vehicles never
/// contend beyond the registry's read lock.
pub struct DamageZoneService {
    resolver: RwLock<Arc<ZoneResolver>>,
    vehicles: RwLock<HashMap<VehicleId, VehicleSlot>>,
    renderer: OverlayRenderer,
    options: ServiceOptions,
}

impl DamageZoneService {
    pub fn new(catalog: Arc<ZoneCatalog>, options: ServiceOptions) -> Self {
        let resolver = ZoneResolver::new(catalog, &options.aliases, options.impact.clone());
        Self {
            resolver: RwLock::new(Arc::new(resolver)),
            vehicles: RwLock::new(HashMap::new()),
            renderer: OverlayRenderer::new(options.palette),
            options,
        }
    }

    pub fn from_config(catalog: Arc<ZoneCatalog>, config: &DamageZoneConfig) -> Self {
        Self::new(catalog, ServiceOptions::from(config))
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn catalog(&self) -> Arc<ZoneCatalog> {
        Arc::clone(self.resolver.read().catalog())
    }

    /// Start tracking `vehicle`. Returns false if it was already tracked.
    pub fn register(&self, vehicle: &VehicleId) -> bool {
        let binding = self.resolver.read();
        let mut vehicles = self.vehicles.write();
        if vehicles.contains_key(vehicle) {
            return false;
        }
        let state = DamageState::new(Arc::clone(binding.catalog()));
        vehicles.insert(vehicle.clone(), Arc::new(Mutex::new(state)));
        tracing::debug!(
            target: "damage_zones::service",
            vehicle = %vehicle,
            "vehicle.registered"
        );
        true
    }

    /// Stop tracking `vehicle` and destroy its state.
    ///
    /// Returns the final snapshot, or `None` if the vehicle was not tracked.
    /// No event is applied to the state after it is taken out of the registry.
    pub fn evict(&self, vehicle: &VehicleId) -> Option<DamageSnapshot> {
        let slot = self.vehicles.write().remove(vehicle)?;
        let snapshot = slot.lock().snapshot();
        tracing::debug!(
            target: "damage_zones::service",
            vehicle = %vehicle,
            revision = snapshot.revision,
            "vehicle.evicted"
        );
        Some(snapshot)
    }

    pub fn is_tracked(&self, vehicle: &VehicleId) -> bool {
        self.vehicles.read().contains_key(vehicle)
    }

    pub fn tracked_vehicles(&self) -> Vec<VehicleId> {
        let mut vehicles: Vec<VehicleId> = self.vehicles.read().keys().cloned().collect();
        vehicles.sort();
        vehicles
    }

    /// Resolve and apply one event.
    ///
    /// An event whose source names no zone is logged and dropped (or rejected
    /// under [`UnknownTagPolicy::Reject`]); it never creates a vehicle.
    ///
    /// The registry stays read-locked while the vehicle's state is mutated, so
    /// an `evict` racing this call either happens first (the event sees an
    /// untracked vehicle) or waits for the event to land.
    pub fn record_event(&self, event: &DamageEvent) -> Result<RecordOutcome, ServiceError> {
        let resolver = self.resolver.read();
        let registry = self.vehicles.read();
        let slot = registry.get(&event.vehicle);
        if slot.is_none() && self.options.require_registration {
            return Err(ServiceError::VehicleNotTracked(event.vehicle.clone()));
        }

        let zones = resolver.resolve_source(&event.source);
        if zones.is_empty() {
            tracing::warn!(
                target: "damage_zones::service",
                vehicle = %event.vehicle,
                source = %event.source,
                "event.dropped=unresolved_tag"
            );
            return match self.options.unknown_tags {
                UnknownTagPolicy::Reject => Err(ServiceError::UnresolvedZone {
                    vehicle: event.vehicle.clone(),
                    zone_source: event.source.clone(),
                }),
                UnknownTagPolicy::Drop => Ok(RecordOutcome {
                    revision: slot.map(|slot| slot.lock().revision()).unwrap_or(0),
                    zones,
                }),
            };
        }

        let revision = match slot {
            Some(slot) => apply_event(&mut slot.lock(), &zones, event)?,
            None => {
                drop(registry);
                let mut registry = self.vehicles.write();
                let revision = match registry.get(&event.vehicle) {
                    Some(slot) => apply_event(&mut slot.lock(), &zones, event)?,
                    None => {
                        let mut state = DamageState::new(Arc::clone(resolver.catalog()));
                        let revision = apply_event(&mut state, &zones, event)?;
                        registry.insert(event.vehicle.clone(), Arc::new(Mutex::new(state)));
                        revision
                    }
                };
                revision
            }
        };

        tracing::trace!(
            target: "damage_zones::service",
            vehicle = %event.vehicle,
            revision,
            zones = zones.len(),
            "event.applied"
        );
        Ok(RecordOutcome { revision, zones })
    }

    /// Severity of one zone. Unknown zones are surfaced as errors.
    pub fn severity(&self, vehicle: &VehicleId, zone: &ZoneId) -> Result<f32, ServiceError> {
        let severity = self.with_state(vehicle, |state| state.get(zone))??;
        Ok(severity)
    }

    pub fn snapshot(&self, vehicle: &VehicleId) -> Result<DamageSnapshot, ServiceError> {
        self.with_state(vehicle, |state| state.snapshot())
    }

    /// Render the vehicle's current state.
    ///
    /// The snapshot is copied under the vehicle lock; rendering happens after
    /// every lock is released.
    pub fn current_overlay(&self, vehicle: &VehicleId) -> Result<RenderedOverlay, ServiceError> {
        let (catalog, snapshot) = {
            let resolver = self.resolver.read();
            let snapshot = self.with_state(vehicle, |state| state.snapshot())?;
            (Arc::clone(resolver.catalog()), snapshot)
        };
        Ok(self.renderer.render(&catalog, &snapshot))
    }

    /// Render several vehicles in parallel.
    pub fn overlays(
        &self,
        vehicles: &[VehicleId],
    ) -> Vec<(VehicleId, Result<RenderedOverlay, ServiceError>)> {
        vehicles
            .par_iter()
            .map(|vehicle| (vehicle.clone(), self.current_overlay(vehicle)))
            .collect()
    }

    /// Clear the vehicle back to undamaged. Returns the new revision.
    pub fn reset(&self, vehicle: &VehicleId) -> Result<u64, ServiceError> {
        self.with_state(vehicle, |state| state.reset())
    }

    /// Swap in a new catalog and rebind every tracked vehicle to it.
    pub fn reload_catalog(&self, catalog: Arc<ZoneCatalog>) -> ReloadReport {
        let mut binding = self.resolver.write();
        let previous = Arc::clone(binding.catalog());
        let added_zones: Vec<ZoneId> = catalog
            .ids()
            .filter(|id| !previous.contains(id))
            .cloned()
            .collect();
        let removed_zones: Vec<ZoneId> = previous
            .ids()
            .filter(|id| !catalog.contains(id))
            .cloned()
            .collect();

        let mut report = ReloadReport {
            added_zones,
            removed_zones,
            ..ReloadReport::default()
        };
        for slot in self.vehicles.read().values() {
            report.entries_dropped += slot.lock().rebind(Arc::clone(&catalog));
            report.vehicles_rebound += 1;
        }
        *binding = Arc::new(ZoneResolver::new(
            catalog,
            &self.options.aliases,
            self.options.impact.clone(),
        ));

        tracing::info!(
            target: "damage_zones::service",
            added = report.added_zones.len(),
            removed = report.removed_zones.len(),
            vehicles = report.vehicles_rebound,
            entries_dropped = report.entries_dropped,
            "catalog.reloaded"
        );
        report
    }

    /// Run `f` on the vehicle's state with the registry read-locked.
    fn with_state<T>(
        &self,
        vehicle: &VehicleId,
        f: impl FnOnce(&mut DamageState) -> T,
    ) -> Result<T, ServiceError> {
        let registry = self.vehicles.read();
        let slot = registry
            .get(vehicle)
            .ok_or_else(|| ServiceError::VehicleNotTracked(vehicle.clone()))?;
        let mut state = slot.lock();
        Ok(f(&mut *state))
    }
}

fn apply_event(
    state: &mut DamageState,
    zones: &[ZoneId],
    event: &DamageEvent,
) -> Result<u64, StateError> {
    state.apply_many(zones, event.value, event.mode)?;
    Ok(state.revision())
}
