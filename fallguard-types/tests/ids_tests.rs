use fallguard_types::{CaregiverId, Error};
use std::collections::HashSet;
use std::str::FromStr;

#[test]
fn caregiver_id_new_is_unique() {
    let a = CaregiverId::new();
    let b = CaregiverId::new();
    assert_ne!(a, b);
}

#[test]
fn caregiver_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = CaregiverId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn caregiver_id_display_and_parse() {
    let id = CaregiverId::new();
    let parsed = CaregiverId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn caregiver_id_from_str() {
    let id = CaregiverId::new();
    let parsed = CaregiverId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn caregiver_id_parse_invalid() {
    assert!(matches!(
        CaregiverId::parse("not-a-uuid"),
        Err(Error::InvalidUuid(_))
    ));
    assert!(matches!(
        CaregiverId::from_str(""),
        Err(Error::InvalidUuid(_))
    ));
}

#[test]
fn caregiver_id_serializes_as_plain_string() {
    let id = CaregiverId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}

#[test]
fn caregiver_id_hash_and_eq() {
    let id = CaregiverId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}
