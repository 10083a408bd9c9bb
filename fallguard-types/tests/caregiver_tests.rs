use fallguard_types::{Caregiver, CaregiverId, Error};
use pretty_assertions::assert_eq;

// ── Construction ────────────────────────────────────────────────

#[test]
fn new_populates_fields() {
    let c = Caregiver::new("Ana", "+15550100", true).unwrap();
    assert_eq!(c.name(), "Ana");
    assert_eq!(c.phone_number(), "+15550100");
    assert!(c.is_enabled());
}

#[test]
fn new_assigns_distinct_ids() {
    let a = Caregiver::new("Ana", "", true).unwrap();
    let b = Caregiver::new("Ana", "", true).unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn with_id_keeps_id() {
    let id = CaregiverId::new();
    let c = Caregiver::with_id(id, "Fall Signal", "", true).unwrap();
    assert_eq!(c.id(), id);
}

#[test]
fn empty_phone_is_allowed() {
    let c = Caregiver::new("Fall Signal", "", false).unwrap();
    assert_eq!(c.phone_number(), "");
    assert!(!c.is_enabled());
}

#[test]
fn empty_name_is_rejected() {
    let err = Caregiver::new("", "123", true).unwrap_err();
    assert!(matches!(err, Error::InvalidCaregiver(_)));
}

#[test]
fn whitespace_name_is_rejected() {
    assert!(Caregiver::new("   ", "", true).is_err());
}

// ── Serialization ───────────────────────────────────────────────

#[test]
fn serializes_with_camel_case_fields() {
    let c = Caregiver::new("Ana", "42", true).unwrap();
    let value = serde_json::to_value(&c).unwrap();
    assert_eq!(value["name"], "Ana");
    assert_eq!(value["phoneNumber"], "42");
    assert_eq!(value["isEnabled"], true);
    assert_eq!(value["id"], c.id().to_string());
}

#[test]
fn deserialize_ignores_unknown_fields() {
    let id = CaregiverId::new();
    let json = format!(
        r#"{{"id":"{id}","name":"Ana","phoneNumber":"","isEnabled":true,"relationship":"sister"}}"#
    );
    let c: Caregiver = serde_json::from_str(&json).unwrap();
    assert_eq!(c, Caregiver::with_id(id, "Ana", "", true).unwrap());
}

#[test]
fn deserialize_missing_field_fails() {
    let id = CaregiverId::new();
    let json = format!(r#"{{"id":"{id}","name":"Ana","isEnabled":true}}"#);
    assert!(serde_json::from_str::<Caregiver>(&json).is_err());
}

#[test]
fn deserialize_rejects_blank_name() {
    let id = CaregiverId::new();
    for name in ["", "   "] {
        let json = format!(
            r#"{{"id":"{id}","name":"{name}","phoneNumber":"","isEnabled":true}}"#
        );
        let err = serde_json::from_str::<Caregiver>(&json).unwrap_err();
        assert!(err.to_string().contains("name must not be empty"), "{err}");
    }
}

#[test]
fn error_display_invalid_caregiver() {
    let err = Error::InvalidCaregiver("name must not be empty".into());
    assert!(err.to_string().contains("invalid caregiver"));
}
