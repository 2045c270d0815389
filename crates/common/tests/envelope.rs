//! Integration tests for boxing values between generated identities

mod common;

use ::common::crypto::{box_padded, box_value, unbox, unbox_body, unbox_key, Envelope};
use ::common::identifier::get_tag;
use serde_json::{json, Value};

#[test]
fn test_get_tag() {
    let hash = "lFluepOmDxEUcZWlLfz0rHU61xLQYxknAEd6z4un8P8=.sha256";
    let author = "@/02iw6SFEPIHl8nMkYSwcCgRWxiG6VP547Wcp1NW8Bo=.ed25519";
    assert_eq!(get_tag(hash), Some("sha256"));
    assert_eq!(get_tag(author), Some("ed25519"));
}

#[test]
fn test_unbox_key_and_unbox_body() {
    let keys = common::keypairs(2);
    let (alice, bob) = (&keys[0], &keys[1]);

    let boxed = box_value(
        &json!({"okay": true}),
        &[*bob.public(), *alice.public()],
        &mut rand::rng(),
    )
    .unwrap();

    let key = unbox_key(&boxed, alice.secret()).unwrap();
    let msg: Value = unbox_body(&boxed, &key).unwrap();
    let msg2: Value = unbox(&boxed, alice.secret()).unwrap();
    assert_eq!(msg, json!({"okay": true}));
    assert_eq!(msg, msg2);
}

#[test]
fn test_only_recipients_can_unbox() {
    let keys = common::keypairs(5);
    let (recipients, outsiders) = keys.split_at(3);
    let publics: Vec<_> = recipients.iter().map(|k| *k.public()).collect();

    let boxed = box_padded(&json!(["a", "b"]), &publics, 6, &mut rand::rng()).unwrap();

    for recipient in recipients {
        let msg: Value = unbox(&boxed, recipient.secret()).unwrap();
        assert_eq!(msg, json!(["a", "b"]));
    }
    for outsider in outsiders {
        assert!(unbox_key(&boxed, outsider.secret()).is_none());
    }
}

#[test]
fn test_text_form_survives_transport() {
    let keys = common::keypairs(1);
    let boxed = box_value(&json!({"t": 1}), &[*keys[0].public()], &mut rand::rng()).unwrap();

    let wire = boxed.to_string();
    assert_eq!(get_tag(&wire), Some("box"));

    let received: Envelope = wire.parse().unwrap();
    let msg: Value = unbox(&received, keys[0].secret()).unwrap();
    assert_eq!(msg, json!({"t": 1}));
}

#[test]
fn test_boxing_with_loaded_keys() {
    let (path, _temp) = common::setup_key_path();
    let created = ::common::keyfile::load_or_create_sync(&path).unwrap();

    let boxed = box_value(&json!("for me"), &[*created.public()], &mut rand::rng()).unwrap();

    let loaded = ::common::keyfile::load_sync(&path).unwrap();
    let msg: String = unbox(&boxed, loaded.secret()).unwrap();
    assert_eq!(msg, "for me");
}
