mod common;

use std::sync::Arc;

use damage_core::{
    ApplyMode, DamageEvent, MarkerConfig, ServiceError, StateError, VehicleId, ZoneCatalog, ZoneId,
};

const TRIMMED_TEMPLATE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <path class="front-bumper" style="fill:#ff0000" d="M 0 0 L 10 0"/>
  <path class="rear-bumper" style="fill:#ff0000" d="M 0 20 L 10 20"/>
  <path data-zone="roof" style="fill:#cccccc" d="M 0 10 L 10 10"/>
</svg>
"#;

#[test]
fn reload_keeps_surviving_zones_and_marks_overlays_stale() {
    let service = common::reference_service();
    let vehicle = VehicleId::new("V1");
    service.register(&vehicle);
    for tag in ["front", "left", "rear-tyres"] {
        service
            .record_event(&DamageEvent::tagged("V1", tag, 0.6, ApplyMode::Absolute))
            .expect("event applies");
    }
    let before = service.current_overlay(&vehicle).expect("renders");

    let catalog = ZoneCatalog::load(TRIMMED_TEMPLATE, &MarkerConfig::default())
        .expect("trimmed template loads");
    let report = service.reload_catalog(Arc::new(catalog));
    assert_eq!(report.added_zones, vec![ZoneId::new("roof")]);
    assert_eq!(report.removed_zones.len(), 6);
    assert_eq!(report.vehicles_rebound, 1);
    assert_eq!(report.entries_dropped, 3);

    let after = service.current_overlay(&vehicle).expect("renders");
    assert!(after.revision > before.revision);
    assert_eq!(after.zones.len(), 3);
    assert_eq!(service.severity(&vehicle, &ZoneId::new("front-bumper")).expect("read"), 0.6);
    assert_eq!(service.severity(&vehicle, &ZoneId::new("roof")).expect("read"), 0.0);
    assert!(matches!(
        service.severity(&vehicle, &ZoneId::new("left-skirt")),
        Err(ServiceError::State(StateError::UnknownZone(_)))
    ));

    service
        .record_event(&DamageEvent::tagged("V1", "ROOF", 0.5, ApplyMode::Delta))
        .expect("new zone resolves");
    assert_eq!(service.severity(&vehicle, &ZoneId::new("roof")).expect("read"), 0.5);
}

#[test]
fn vehicles_registered_after_reload_use_the_new_catalog() {
    let service = common::reference_service();
    let catalog = ZoneCatalog::load(TRIMMED_TEMPLATE, &MarkerConfig::default())
        .expect("trimmed template loads");
    service.reload_catalog(Arc::new(catalog));

    let vehicle = VehicleId::new("late");
    service.register(&vehicle);
    let overlay = service.current_overlay(&vehicle).expect("renders");
    assert_eq!(overlay.document, TRIMMED_TEMPLATE);
    assert_eq!(overlay.zones.len(), 3);
}
