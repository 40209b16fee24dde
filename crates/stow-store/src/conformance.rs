//! Behavioural checks every backend must pass.
//!
//! Each check panics on violation and expects a store with no keys under the
//! `conformance/` and `user` names. Backends run [`check_all`] from their own
//! test modules; backends with an idempotent delete use [`check_all_with`]
//! and assert their delete policy separately.

use serde::{Deserialize, Serialize};

use crate::codec::Json;
use crate::error::ErrorKind;
use crate::traits::{Store, StoreExt};

/// The sample value used by the checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    pub fn john() -> Self {
        Self {
            name: "John".into(),
            email: "john@x.com".into(),
        }
    }
}

/// Run every check, including double-delete.
pub fn check_all(store: &dyn Store) {
    check_all_with(store, true);
}

/// Run every check; double-delete is asserted only when `strict_delete` is set.
pub fn check_all_with(store: &dyn Store, strict_delete: bool) {
    check_user_scenario_with(store, strict_delete);
    check_round_trip(store);
    check_overwrite(store);
    check_tombstone(store);
    if strict_delete {
        check_double_delete(store);
    }
    check_prefix_listing(store);
}

/// Set, list, get, delete and re-delete a user record.
///
/// The final double delete is only asserted when `strict_delete` is set.
pub fn check_user_scenario_with(store: &dyn Store, strict_delete: bool) {
    let user = User::john();
    store.set("user", &Json(user.clone())).unwrap();

    assert_eq!(store.list("u").unwrap(), vec!["user".to_string()]);

    let mut fetched = Json(User::default());
    store.get("user", &mut fetched).unwrap();
    assert_eq!(fetched.0, user);

    store.del("user").unwrap();
    assert!(store.list("u").unwrap().is_empty());

    let err = store.get("user", &mut fetched).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);

    let second = store.del("user");
    if strict_delete {
        assert_eq!(second.unwrap_err().kind(), ErrorKind::KeyNotFound);
    }
}

/// [`check_user_scenario_with`] with strict delete semantics.
pub fn check_user_scenario(store: &dyn Store) {
    check_user_scenario_with(store, true);
}

/// Values read back equal the values written.
pub fn check_round_trip(store: &dyn Store) {
    let payloads: [&[u8]; 3] = [b"", b"plain", &[0, 159, 146, 150, 255]];
    for (i, payload) in payloads.iter().enumerate() {
        let key = format!("conformance/rt/{i}");
        store.set(&key, &payload.to_vec()).unwrap();
        let mut out = Vec::<u8>::new();
        store.get(&key, &mut out).unwrap();
        assert_eq!(out, *payload, "round trip of {key}");
        store.del(&key).unwrap();
    }
}

/// A second set replaces the first.
pub fn check_overwrite(store: &dyn Store) {
    store.set_json("conformance/ow", &1u32).unwrap();
    store.set_json("conformance/ow", &2u32).unwrap();
    assert_eq!(store.get_json::<u32>("conformance/ow").unwrap(), 2);
    assert_eq!(
        store.list("conformance/ow").unwrap(),
        vec!["conformance/ow".to_string()]
    );
    store.del("conformance/ow").unwrap();
}

/// A deleted key reads as not found.
pub fn check_tombstone(store: &dyn Store) {
    store.set_json("conformance/ts", &"gone soon").unwrap();
    store.del("conformance/ts").unwrap();
    let err = store.get_json::<String>("conformance/ts").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
}

/// Deleting an absent key reports not found.
pub fn check_double_delete(store: &dyn Store) {
    store.set_json("conformance/dd", &0u8).unwrap();
    store.del("conformance/dd").unwrap();
    let err = store.del("conformance/dd").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
}

/// Listing is an exact string-prefix match over keys.
pub fn check_prefix_listing(store: &dyn Store) {
    let keys = [
        "conformance/ls/alpha",
        "conformance/ls/alphabet",
        "conformance/ls/beta/one",
        "conformance/lsx",
    ];
    for key in keys {
        store.set(key, &Vec::<u8>::new()).unwrap();
    }

    let mut listed = store.list("conformance/ls/alpha").unwrap();
    listed.sort();
    assert_eq!(listed, vec!["conformance/ls/alpha", "conformance/ls/alphabet"]);

    let mut listed = store.list("conformance/ls").unwrap();
    listed.sort();
    assert_eq!(listed, keys.to_vec());

    let mut listed = store.list("conformance/ls/b").unwrap();
    listed.sort();
    assert_eq!(listed, vec!["conformance/ls/beta/one"]);

    assert!(store.list("conformance/nothing").unwrap().is_empty());

    for key in keys {
        store.del(key).unwrap();
    }
}
