//! Registry behavior: name uniqueness, edge-case names, scoping.

use eventry::{EventRegistry, MintError, LISTENER_ERRORS, LISTENER_ERRORS_NAME};

#[test]
fn second_mint_of_same_name_fails() {
    let registry = EventRegistry::new();
    registry.mint::<u32>("x").expect("first mint");

    let err = registry.mint::<u32>("x").expect_err("duplicate mint");
    assert!(matches!(err, MintError::DuplicateName { ref name } if name == "x"));
    // The message names the offending event.
    assert!(err.to_string().contains("x"), "message was: {err}");
}

#[test]
fn duplicate_detection_ignores_payload_type() {
    let registry = EventRegistry::new();
    registry.mint::<String>("typed").unwrap();
    assert!(registry.mint::<u64>("typed").is_err());
}

#[test]
fn empty_name_is_mintable_exactly_once() {
    let registry = EventRegistry::new();
    registry.mint::<()>("").expect("empty name mints");
    assert!(registry.mint::<()>("").is_err());
}

#[test]
fn names_are_case_sensitive_and_byte_exact() {
    let registry = EventRegistry::new();
    registry.mint::<u8>("shutdown").unwrap();
    registry.mint::<u8>("Shutdown").unwrap();
    registry.mint::<u8>("shut_down").unwrap();
    registry.mint::<u8>("shut-down").unwrap();
    assert!(registry.mint::<u8>("shutdown").is_err());
}

#[test]
fn long_and_non_ascii_names_are_ordinary() {
    let registry = EventRegistry::new();
    let long = "segment.".repeat(512);
    registry.mint::<u8>(long.clone()).unwrap();
    assert!(registry.mint::<u8>(long).is_err());

    registry.mint::<u8>("статус.изменён").unwrap();
    registry.mint::<u8>("状態変更").unwrap();
    assert!(registry.mint::<u8>("状態変更").is_err());
}

#[test]
fn reserved_error_channel_name_is_pre_taken() {
    let registry = EventRegistry::new();
    assert!(registry.is_minted(LISTENER_ERRORS_NAME));
    assert!(registry.mint::<u8>(LISTENER_ERRORS_NAME).is_err());
    assert_eq!(LISTENER_ERRORS.name(), LISTENER_ERRORS_NAME);
}

#[test]
fn registries_are_independent_scopes() {
    let a = EventRegistry::new();
    let b = EventRegistry::new();
    let from_a = a.mint::<u32>("scoped").expect("mint in a");
    let from_b = b.mint::<u32>("scoped").expect("mint in b");
    // Same name, different registries: distinct channels.
    assert_ne!(from_a, from_b);
}

#[test]
fn minted_ids_compare_by_mint_call() {
    let registry = EventRegistry::new();
    let first = registry.mint::<u32>("one").unwrap();
    let second = registry.mint::<u32>("two").unwrap();
    assert_eq!(first, first.clone());
    assert_ne!(first, second);
    assert_eq!(first.name(), "one");
}

#[test]
fn default_registry_mints_through_free_function() {
    // The default registry lives for the whole test process; keep the names
    // unique to this test.
    let id = eventry::mint::<u8>("tests.registry.default.alpha").unwrap();
    assert_eq!(id.name(), "tests.registry.default.alpha");
    assert!(eventry::mint::<u8>("tests.registry.default.alpha").is_err());
    assert!(eventry::default_registry().is_minted("tests.registry.default.alpha"));
}
