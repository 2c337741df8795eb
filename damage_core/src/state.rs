//! Per-vehicle severity map with a mutation revision counter.

use std::collections::BTreeMap;
use std::sync::Arc;

use damage_schema::{clamp_severity, ApplyMode, DamageSnapshot, ZoneId, SEVERITY_MIN};
use thiserror::Error;

use crate::catalog::ZoneCatalog;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("zone '{0}' is not part of the catalog")]
    UnknownZone(ZoneId),
    #[error("severity value {0} is not a finite number")]
    NonFiniteSeverity(f32),
}

/// Damage recorded for one vehicle, bound to the catalog it was created against.
///
/// Every key is a member of that catalog and every value lies in `[0, 1]`.
/// Unset zones read as zero.
#[derive(Debug, Clone)]
pub struct DamageState {
    catalog: Arc<ZoneCatalog>,
    severities: BTreeMap<ZoneId, f32>,
    revision: u64,
}

impl DamageState {
    pub fn new(catalog: Arc<ZoneCatalog>) -> Self {
        Self {
            catalog,
            severities: BTreeMap::new(),
            revision: 0,
        }
    }

    pub fn catalog(&self) -> &Arc<ZoneCatalog> {
        &self.catalog
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, zone: &ZoneId) -> Result<f32, StateError> {
        self.ensure_known(zone)?;
        Ok(self.severities.get(zone).copied().unwrap_or(SEVERITY_MIN))
    }

    /// Apply `value` to one zone and return the new severity.
    pub fn apply(&mut self, zone: &ZoneId, value: f32, mode: ApplyMode) -> Result<f32, StateError> {
        let updated = self.apply_many(std::slice::from_ref(zone), value, mode)?;
        Ok(updated[0])
    }

    /// Apply `value` to every zone in `zones` as one mutation.
    ///
    /// All zones are validated before anything changes, so a failure leaves
    /// both severities and revision untouched. The revision advances once.
    pub fn apply_many(
        &mut self,
        zones: &[ZoneId],
        value: f32,
        mode: ApplyMode,
    ) -> Result<Vec<f32>, StateError> {
        if !value.is_finite() {
            return Err(StateError::NonFiniteSeverity(value));
        }
        for zone in zones {
            self.ensure_known(zone)?;
        }

        let mut updated = Vec::with_capacity(zones.len());
        for zone in zones {
            let current = self.severities.get(zone).copied().unwrap_or(SEVERITY_MIN);
            let next = match mode {
                ApplyMode::Absolute => clamp_severity(value),
                ApplyMode::Delta => clamp_severity(current + value),
            };
            self.severities.insert(zone.clone(), next);
            updated.push(next);
        }
        self.revision += 1;
        Ok(updated)
    }

    /// Clear every zone back to zero. Returns the new revision.
    pub fn reset(&mut self) -> u64 {
        self.severities.clear();
        self.revision += 1;
        self.revision
    }

    /// Re-bind to a replacement catalog, dropping severities for zones it no
    /// longer defines. Returns the number of entries dropped.
    pub fn rebind(&mut self, catalog: Arc<ZoneCatalog>) -> usize {
        let before = self.severities.len();
        self.severities.retain(|zone, _| catalog.contains(zone));
        self.catalog = catalog;
        self.revision += 1;
        before - self.severities.len()
    }

    pub fn snapshot(&self) -> DamageSnapshot {
        DamageSnapshot {
            revision: self.revision,
            severities: self.severities.clone(),
        }
    }

    fn ensure_known(&self, zone: &ZoneId) -> Result<(), StateError> {
        if self.catalog.contains(zone) {
            Ok(())
        } else {
            Err(StateError::UnknownZone(zone.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerConfig;

    fn state() -> DamageState {
        DamageState::new(Arc::new(ZoneCatalog::reference()))
    }

    fn zone(id: &str) -> ZoneId {
        ZoneId::new(id)
    }

    #[test]
    fn unset_zone_reads_zero_and_unknown_zone_fails() {
        let state = state();
        assert_eq!(state.get(&zone("left-skirt")), Ok(0.0));
        assert_eq!(
            state.get(&zone("roof")),
            Err(StateError::UnknownZone(zone("roof")))
        );
    }

    #[test]
    fn out_of_range_values_clamp() {
        let mut state = state();
        assert_eq!(state.apply(&zone("front-bumper"), 3.5, ApplyMode::Absolute), Ok(1.0));
        assert_eq!(state.apply(&zone("front-bumper"), -2.0, ApplyMode::Absolute), Ok(0.0));
        assert_eq!(state.apply(&zone("rear-bumper"), -0.4, ApplyMode::Delta), Ok(0.0));
        assert_eq!(state.apply(&zone("rear-bumper"), 0.7, ApplyMode::Delta), Ok(0.7));
        assert_eq!(state.apply(&zone("rear-bumper"), 0.7, ApplyMode::Delta), Ok(1.0));
    }

    #[test]
    fn repeated_absolute_is_idempotent_but_counts_revisions() {
        let mut state = state();
        let before = state.revision();
        state
            .apply(&zone("left-skirt"), 0.4, ApplyMode::Absolute)
            .expect("apply succeeds");
        let first = state.snapshot();
        state
            .apply(&zone("left-skirt"), 0.4, ApplyMode::Absolute)
            .expect("apply succeeds");
        let second = state.snapshot();
        assert_eq!(first.severities, second.severities);
        assert_eq!(state.get(&zone("left-skirt")), Ok(0.4));
        assert_eq!(state.revision(), before + 2);
    }

    #[test]
    fn failed_apply_changes_nothing() {
        let mut state = state();
        state
            .apply(&zone("left-skirt"), 0.2, ApplyMode::Absolute)
            .expect("apply succeeds");
        let before = state.snapshot();

        let err = state
            .apply_many(
                &[zone("left-skirt"), zone("spoiler")],
                0.5,
                ApplyMode::Delta,
            )
            .unwrap_err();
        assert_eq!(err, StateError::UnknownZone(zone("spoiler")));
        assert!(matches!(
            state.apply(&zone("left-skirt"), f32::NAN, ApplyMode::Delta),
            Err(StateError::NonFiniteSeverity(_))
        ));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn multi_zone_apply_advances_revision_once() {
        let mut state = state();
        let updated = state
            .apply_many(
                &[zone("left-rear-tyre"), zone("right-rear-tyre")],
                0.25,
                ApplyMode::Delta,
            )
            .expect("apply succeeds");
        assert_eq!(updated, vec![0.25, 0.25]);
        assert_eq!(state.revision(), 1);
    }

    #[test]
    fn snapshot_survives_later_mutation() {
        let mut state = state();
        state
            .apply(&zone("front-bumper"), 0.3, ApplyMode::Delta)
            .expect("apply succeeds");
        let snapshot = state.snapshot();
        state
            .apply(&zone("front-bumper"), 0.5, ApplyMode::Delta)
            .expect("apply succeeds");
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.severity(&zone("front-bumper")), 0.3);
    }

    #[test]
    fn reset_clears_and_advances() {
        let mut state = state();
        state
            .apply(&zone("front-bumper"), 0.9, ApplyMode::Absolute)
            .expect("apply succeeds");
        assert_eq!(state.reset(), 2);
        assert!(state.snapshot().is_undamaged());
        assert_eq!(state.get(&zone("front-bumper")), Ok(0.0));
    }

    #[test]
    fn rebind_drops_removed_zones() {
        let mut state = state();
        state
            .apply(&zone("front-bumper"), 0.6, ApplyMode::Absolute)
            .expect("apply succeeds");
        state
            .apply(&zone("left-skirt"), 0.2, ApplyMode::Absolute)
            .expect("apply succeeds");

        let template = r#"<svg><path class="front-bumper" d="M0 0"/></svg>"#;
        let smaller = ZoneCatalog::load(template, &MarkerConfig::default()).expect("loads");
        assert_eq!(state.rebind(Arc::new(smaller)), 1);
        assert_eq!(state.revision(), 3);
        assert_eq!(state.get(&zone("front-bumper")), Ok(0.6));
        assert!(matches!(
            state.get(&zone("left-skirt")),
            Err(StateError::UnknownZone(_))
        ));
    }
}
