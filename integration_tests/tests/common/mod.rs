#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use damage_core::{
    load_damage_zone_config_from_env, DamageZoneConfig, DamageZoneService, ZoneCatalog,
};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_damage_zone_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test damage zone config at {}",
            config_path.display()
        );

        std::env::set_var("DAMAGE_ZONE_CONFIG_PATH", &config_path);
    });
}

/// Config loaded the same way the console binary loads it.
pub fn test_config() -> Arc<DamageZoneConfig> {
    ensure_test_config();
    let (config, metadata) = load_damage_zone_config_from_env();
    assert!(
        metadata.path().is_some(),
        "test config should load from the fixture, not the built-in copy"
    );
    config
}

/// Service over the reference template using the fixture config.
pub fn reference_service() -> Arc<DamageZoneService> {
    let config = test_config();
    let catalog = ZoneCatalog::from_config(&config).expect("reference catalog loads");
    Arc::new(DamageZoneService::from_config(Arc::new(catalog), &config))
}

/// Start tag of the zone element carrying `class="<zone>"`.
pub fn zone_tag<'a>(document: &'a str, zone: &str) -> &'a str {
    let marker = format!("class=\"{}\"", zone);
    let at = document
        .find(marker.as_str())
        .unwrap_or_else(|| panic!("zone {} missing from document", zone));
    let start = document[..at].rfind('<').expect("tag start");
    let end = at + document[at..].find('>').expect("tag end");
    &document[start..=end]
}
