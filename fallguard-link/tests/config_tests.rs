use fallguard_link::LinkConfig;

#[test]
fn default_config() {
    let config = LinkConfig::default();
    assert_eq!(config.device_name, "FallGuard Device");
    assert_eq!(config.send_timeout_ms, 5_000);
    assert_eq!(config.alert_name, "Fall Signal");
    assert_eq!(config.alert_phone, "");
}

#[test]
fn partial_config_fills_defaults() {
    let config: LinkConfig =
        serde_json::from_str(r#"{"device_name":"Wrist","send_timeout_ms":250}"#).unwrap();
    assert_eq!(config.device_name, "Wrist");
    assert_eq!(config.send_timeout_ms, 250);
    assert_eq!(config.alert_name, "Fall Signal");
}

#[test]
fn sentinel_caregiver_matches_config() {
    let config = LinkConfig::default();
    let c = config.sentinel_caregiver().unwrap();
    assert_eq!(c.name(), "Fall Signal");
    assert_eq!(c.phone_number(), "");
    assert!(c.is_enabled());
}

#[test]
fn sentinel_caregiver_rejects_blank_name() {
    let config = LinkConfig {
        alert_name: "  ".into(),
        ..Default::default()
    };
    assert!(config.sentinel_caregiver().is_err());
}
