// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog registry uniqueness under concurrent registration.

use super::prelude::*;

#[test]
fn concurrent_registration_succeeds_exactly_once() {
    let registry = Arc::new(CatalogRegistry::new());
    let threads = 16;

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.register(Catalog::new("lake", format!("connector-{i}"))).is_ok()
            })
        })
        .collect();

    let successes =
        handles.into_iter().map(|h| h.join().unwrap_or(false)).filter(|ok| *ok).count();
    assert_eq!(successes, 1);
    assert_eq!(registry.names().len(), 1);
    assert!(registry.get("lake").is_some());
}

#[test]
fn reregistration_after_removal_succeeds() {
    let registry = CatalogRegistry::new();
    registry.register(Catalog::new("lake", "iceberg")).unwrap();

    let err = registry.register(Catalog::new("lake", "delta")).unwrap_err();
    assert_eq!(err, CatalogError::AlreadyRegistered("lake".to_string()));

    let removed = registry.remove("lake").unwrap();
    assert_eq!(removed.connector, "iceberg");

    registry.register(Catalog::new("lake", "delta")).unwrap();
    assert_eq!(registry.get("lake").unwrap().connector, "delta");
}

#[test]
fn lookups_race_registrations_safely() {
    let registry = Arc::new(CatalogRegistry::new());
    let writer = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            for i in 0..100 {
                let _ = registry.register(Catalog::new(format!("cat-{i}"), "memory"));
            }
        })
    };
    let reader = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            let mut max_seen = 0;
            for _ in 0..1000 {
                max_seen = max_seen.max(registry.names().len());
            }
            max_seen
        })
    };

    writer.join().unwrap();
    let max_seen = reader.join().unwrap();
    assert!(max_seen <= 100);
    assert_eq!(registry.names().len(), 100);
}
