//! Property-based tests for the registry and dispatcher using proptest.

use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use switchyard_dispatch::{dispatch, Args, FailureKind, Handler, Registry, SimpleFnHandler};

// ============================================================================
// Test helpers
// ============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,6}", 1..4).prop_map(|segments| segments.join("."))
}

fn names_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(name_strategy(), 0..20)
}

fn tagged(tag: usize) -> Arc<dyn Handler> {
    Arc::new(SimpleFnHandler::new(move |_a: &Args| Ok::<_, anyhow::Error>(tag)))
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Every registered name resolves to exactly the handler registered under it.
    #[test]
    fn get_returns_registered_handler(names in names_strategy()) {
        let mut registry = Registry::new();
        let handlers: Vec<(String, Arc<dyn Handler>)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), tagged(i)))
            .collect();

        for (name, handler) in &handlers {
            registry.register_arc(name, handler.clone()).unwrap();
        }

        for (name, handler) in &handlers {
            let found = registry.get(name).unwrap();
            prop_assert!(Arc::ptr_eq(&found, handler));
        }
    }

    /// Names that were never registered are not found, by get or dispatch.
    #[test]
    fn unregistered_names_are_not_found(
        names in names_strategy(),
        probe in name_strategy(),
    ) {
        prop_assume!(!names.contains(&probe));

        let mut registry = Registry::new();
        for (i, name) in names.iter().enumerate() {
            registry.register_arc(name, tagged(i)).unwrap();
        }

        prop_assert!(registry.get(&probe).is_err());
        let result = dispatch(&registry, &probe, vec![]);
        prop_assert_eq!(result.kind(), Some(FailureKind::NotFound));
    }

    /// list_names reports exactly the registered set, sorted, and is stable.
    #[test]
    fn list_names_matches_registered_set(names in names_strategy()) {
        let mut registry = Registry::new();
        for (i, name) in names.iter().enumerate() {
            registry.register_arc(name, tagged(i)).unwrap();
        }

        let listed = registry.list_names();
        let expected: Vec<String> = names.iter().cloned().collect();
        prop_assert_eq!(&listed, &expected);
        prop_assert_eq!(listed, registry.list_names());
    }

    /// A second registration under a taken name never replaces the first.
    #[test]
    fn duplicate_registration_never_replaces(name in name_strategy()) {
        let mut registry = Registry::new();
        let first = tagged(1);
        registry.register_arc(&name, first.clone()).unwrap();

        prop_assert!(registry.register_arc(&name, tagged(2)).is_err());
        prop_assert!(Arc::ptr_eq(&registry.get(&name).unwrap(), &first));
    }

    /// Dispatch of a summing handler agrees with direct addition.
    #[test]
    fn dispatch_add_matches_sum(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut registry = Registry::new();
        registry
            .register_fn("add", |args: &Args| {
                Ok::<_, anyhow::Error>(args.get::<i64>(0)? + args.get::<i64>(1)?)
            })
            .unwrap();

        let result = dispatch(&registry, "add", vec![json!(a), json!(b)]);
        prop_assert_eq!(result.value(), Some(&json!(a + b)));
    }
}
