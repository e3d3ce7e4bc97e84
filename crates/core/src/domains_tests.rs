// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn initial_domains_are_empty_at_version_zero() {
    let initial = VersionedDomains::initial();
    assert_eq!(initial.version, INITIAL_DYNAMIC_FILTERS_VERSION);
    assert!(initial.is_empty());
}

#[test]
fn next_version_increments() {
    assert_eq!(VersionedDomains::next_version(0), 1);
    assert_eq!(VersionedDomains::next_version(41), 42);
}

#[test]
fn next_version_saturates_at_ceiling() {
    assert_eq!(VersionedDomains::next_version(u64::MAX), u64::MAX);
}

#[test]
fn domain_kind_predicates() {
    assert!(Domain::All.is_all());
    assert!(Domain::None.is_none());
    let values = Domain::values([json!(1), json!(2)]);
    assert!(!values.is_all());
    assert!(!values.is_none());
}

#[test]
fn domain_serde_tagged_form() {
    let json = serde_json::to_value(Domain::values([json!("a")])).unwrap();
    assert_eq!(json, json!({"kind": "values", "values": ["a"]}));

    let all: Domain = serde_json::from_value(json!({"kind": "all"})).unwrap();
    assert!(all.is_all());
}

#[test]
fn versioned_domains_preserve_insertion_order() {
    let mut domains = IndexMap::new();
    domains.insert(DynamicFilterId::new("df_2"), Domain::All);
    domains.insert(DynamicFilterId::new("df_1"), Domain::None);
    let versioned = VersionedDomains::new(3, domains);

    let keys: Vec<_> = versioned.domains.keys().map(|k| k.as_str().to_string()).collect();
    assert_eq!(keys, vec!["df_2", "df_1"]);
}

proptest! {
    #[test]
    fn domain_serde_roundtrip(domain in arb_domain()) {
        let json = serde_json::to_string(&domain).unwrap();
        let parsed: Domain = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(domain, parsed);
    }
}
