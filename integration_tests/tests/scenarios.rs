mod common;

use damage_core::{
    ApplyMode, DamageEvent, ImpactVector, ServiceError, StateError, VehicleId, ZoneId,
    REFERENCE_ZONE_IDS,
};

fn v(id: &str) -> VehicleId {
    VehicleId::new(id)
}

fn z(id: &str) -> ZoneId {
    ZoneId::new(id)
}

#[test]
fn front_bumper_damage_clamps_and_renders_at_maximum() {
    let service = common::reference_service();
    assert_eq!(service.catalog().len(), 8);
    assert!(service.register(&v("V1")));

    let first = service
        .record_event(&DamageEvent::tagged("V1", "FRONT-BUMPER", 0.3, ApplyMode::Delta))
        .expect("first event applies");
    assert_eq!(first.revision, 1);
    assert_eq!(service.severity(&v("V1"), &z("front-bumper")).expect("read"), 0.3);

    let second = service
        .record_event(&DamageEvent::tagged("V1", "front-bumper", 0.9, ApplyMode::Delta))
        .expect("second event applies");
    assert_eq!(second.revision, 2);
    assert_eq!(service.severity(&v("V1"), &z("front-bumper")).expect("read"), 1.0);

    let overlay = service.current_overlay(&v("V1")).expect("renders");
    assert_eq!(overlay.revision, 2);
    assert_eq!(overlay.zones.len(), 8);

    let bumper = common::zone_tag(&overlay.document, "front-bumper");
    assert!(
        bumper.contains("fill:#1565c0;fill-opacity:0.8;"),
        "front bumper should carry the maximum-damage style: {}",
        bumper
    );
    assert!(!bumper.contains("#ff0000"), "default fill must be replaced: {}", bumper);
    let summary = overlay
        .zones
        .iter()
        .find(|summary| summary.zone == z("front-bumper"))
        .expect("front bumper summary");
    assert_eq!(summary.fill, "#1565c0");
    assert_eq!(summary.opacity, 0.8);

    let catalog = service.catalog();
    let pristine = catalog.template();
    for zone in REFERENCE_ZONE_IDS.iter().filter(|zone| **zone != "front-bumper") {
        assert_eq!(
            common::zone_tag(&overlay.document, zone),
            common::zone_tag(pristine, zone),
            "zone {} should keep its default style",
            zone
        );
    }
}

#[test]
fn evicted_vehicle_cannot_be_rendered() {
    let service = common::reference_service();
    service.register(&v("V1"));
    service
        .record_event(&DamageEvent::tagged("V1", "rear", 0.5, ApplyMode::Delta))
        .expect("event applies");

    let last = service.evict(&v("V1")).expect("V1 was tracked");
    assert_eq!(last.revision, 1);
    assert_eq!(last.severity(&z("rear-bumper")), 0.5);
    assert!(matches!(
        service.current_overlay(&v("V1")),
        Err(ServiceError::VehicleNotTracked(vehicle)) if vehicle == v("V1")
    ));
}

#[test]
fn reset_renders_like_a_fresh_vehicle() {
    let service = common::reference_service();
    service.register(&v("used"));
    service.register(&v("fresh"));
    for tag in ["front", "rear-tyres", "left"] {
        service
            .record_event(&DamageEvent::tagged("used", tag, 0.7, ApplyMode::Absolute))
            .expect("event applies");
    }

    let revision = service.reset(&v("used")).expect("tracked");
    assert_eq!(revision, 4);

    let used = service.current_overlay(&v("used")).expect("renders");
    let fresh = service.current_overlay(&v("fresh")).expect("renders");
    assert_eq!(used.document, fresh.document);
    assert_eq!(used.zones, fresh.zones);
    assert_ne!(used.revision, fresh.revision);
}

#[test]
fn registration_is_required_by_the_fixture_config() {
    let service = common::reference_service();
    let result = service.record_event(&DamageEvent::tagged("ghost", "front", 0.2, ApplyMode::Delta));
    assert!(matches!(result, Err(ServiceError::VehicleNotTracked(_))));
    assert!(service.tracked_vehicles().is_empty());
}

#[test]
fn unknown_tags_never_fail_or_mutate() {
    let service = common::reference_service();
    service.register(&v("V1"));
    for tag in ["sunroof", "", "   ", "front bumperz", "🚗"] {
        let outcome = service
            .record_event(&DamageEvent::tagged("V1", tag, 0.4, ApplyMode::Delta))
            .expect("unknown tags are dropped");
        assert!(outcome.is_dropped());
    }
    assert_eq!(service.snapshot(&v("V1")).expect("tracked").revision, 0);
}

#[test]
fn multi_zone_alias_and_impact_events() {
    let service = common::reference_service();
    service.register(&v("V1"));

    let outcome = service
        .record_event(&DamageEvent::tagged("V1", "tyres", 0.25, ApplyMode::Delta))
        .expect("alias applies");
    assert_eq!(outcome.zones.len(), 4);
    assert_eq!(outcome.revision, 1);

    let outcome = service
        .record_event(&DamageEvent::impact(
            "V1",
            ImpactVector::new(1.5, 0.2, 0.1),
            0.5,
            ApplyMode::Delta,
        ))
        .expect("impact applies");
    assert_eq!(outcome.zones, vec![z("right-skirt")]);
    assert_eq!(outcome.revision, 2);

    let snapshot = service.snapshot(&v("V1")).expect("tracked");
    assert_eq!(snapshot.severity(&z("left-rear-tyre")), 0.25);
    assert_eq!(snapshot.severity(&z("right-skirt")), 0.5);
    assert_eq!(snapshot.severity(&z("front-bumper")), 0.0);
}

#[test]
fn non_finite_values_are_rejected() {
    let service = common::reference_service();
    service.register(&v("V1"));
    let result = service.record_event(&DamageEvent::tagged("V1", "front", f32::NAN, ApplyMode::Absolute));
    assert!(matches!(
        result,
        Err(ServiceError::State(StateError::NonFiniteSeverity(_)))
    ));
    assert_eq!(service.snapshot(&v("V1")).expect("tracked").revision, 0);
}
