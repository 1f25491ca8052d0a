// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for content hashing and the absent sentinel

use geofresh_core::ContentHash;
use proptest::prelude::*;

#[test]
fn test_absent_sentinel_forces_first_fetch() {
    // The absent sentinel must not match anything, including the hash of
    // an empty buffer and another absent sentinel
    let absent = ContentHash::absent();
    assert!(absent.is_absent());
    assert!(!absent.matches(&ContentHash::of(b"")));
    assert!(!absent.matches(&ContentHash::absent()));
}

#[test]
fn test_display_is_lowercase_hex() {
    let rendered = ContentHash::of(b"payload").to_string();
    assert_eq!(rendered.len(), 64);
    assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

proptest! {
    #[test]
    fn prop_hash_is_deterministic(data: Vec<u8>) {
        prop_assert!(ContentHash::of(&data).matches(&ContentHash::of(&data)));
    }

    #[test]
    fn prop_different_content_never_matches(a: Vec<u8>, b: Vec<u8>) {
        prop_assume!(a != b);
        prop_assert!(!ContentHash::of(&a).matches(&ContentHash::of(&b)));
    }

    #[test]
    fn prop_real_hash_never_matches_absent(data: Vec<u8>) {
        prop_assert!(!ContentHash::of(&data).matches(&ContentHash::absent()));
    }
}
