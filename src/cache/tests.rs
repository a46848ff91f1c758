use std::sync::Arc;
use std::thread;

use super::*;

fn id(name: &str) -> ScriptIdentity {
    ScriptIdentity::from_path(&std::env::temp_dir().join("scriptswap-cache").join(name))
}

fn module(body: &str) -> Arc<Module> {
    Arc::new(Module::new(body.as_bytes().to_vec()))
}

#[test]
fn test_first_install_is_version_one() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");

    assert_eq!(cache.get_version(&foo), None);
    assert_eq!(cache.update_version(&foo, module("v1"), None, None), 1);
    assert_eq!(cache.get_version(&foo), Some(1));
    assert_eq!(cache.get_current(&foo).unwrap().module.payload(), b"v1");
}

#[test]
fn test_retention_trims_oldest() {
    let cache = VersionedCache::new(3);
    let foo = id("foo.lua");
    for i in 1..=5 {
        cache.update_version(&foo, module(&format!("v{i}")), None, None);
    }
    assert_eq!(cache.retained_versions(&foo), vec![3, 4, 5]);
}

#[test]
fn test_retention_has_floor() {
    let cache = VersionedCache::new(0);
    assert_eq!(cache.retain(), MIN_RETAIN);

    let foo = id("foo.lua");
    cache.update_version(&foo, module("a"), None, None);
    cache.update_version(&foo, module("b"), None, None);
    cache.update_version(&foo, module("c"), None, None);
    assert_eq!(cache.retained_versions(&foo), vec![2, 3]);
    assert!(cache.rollback(&foo));
    assert_eq!(cache.get_version(&foo), Some(2));
}

#[test]
fn test_rollback_steps_back_once_per_call() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    for body in ["a", "b", "c"] {
        cache.update_version(&foo, module(body), None, None);
    }

    assert!(cache.rollback(&foo));
    assert_eq!(cache.get_version(&foo), Some(2));
    assert!(cache.rollback(&foo));
    assert_eq!(cache.get_version(&foo), Some(1));
    assert!(!cache.rollback(&foo));
    assert_eq!(cache.get_version(&foo), Some(1));
}

#[test]
fn test_rollback_unknown_identity() {
    let cache = VersionedCache::default();
    assert!(!cache.rollback(&id("never.lua")));
    assert!(cache.rollback_to(&id("never.lua"), 1).is_none());
}

#[test]
fn test_counter_never_decrements_after_rollback() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    cache.update_version(&foo, module("a"), None, None);
    cache.update_version(&foo, module("b"), None, None);
    assert!(cache.rollback(&foo));

    // Install after rollback continues from the counter, not the pointer.
    assert_eq!(cache.update_version(&foo, module("c"), None, None), 3);
    assert_eq!(cache.retained_versions(&foo), vec![1, 3]);
}

#[test]
fn test_rollback_to_pins_version() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    for body in ["a", "b", "c"] {
        cache.update_version(&foo, module(body), None, None);
    }

    let entry = cache.rollback_to(&foo, 1).unwrap();
    assert_eq!(entry.version, 1);
    assert_eq!(cache.get_version(&foo), Some(1));
}

#[test]
fn test_rollback_to_current_is_noop_success() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    cache.update_version(&foo, module("a"), None, None);

    let entry = cache.rollback_to(&foo, 1).unwrap();
    assert_eq!(entry.module.payload(), b"a");
    assert_eq!(cache.get_version(&foo), Some(1));
    assert!(cache.rollback_to(&foo, 7).is_none());
}

#[test]
fn test_explicit_version_raises_counter() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");

    assert_eq!(cache.update_version(&foo, module("restored"), None, Some(7)), 7);
    assert_eq!(cache.update_version(&foo, module("next"), None, None), 8);
}

#[test]
fn test_instance_is_kept_with_entry() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    let instance: Instance = Arc::new(42_u32);
    cache.update_version(&foo, module("a"), Some(instance), None);

    let current = cache.get_current(&foo).unwrap();
    let value = current.instance.as_ref().unwrap().downcast_ref::<u32>();
    assert_eq!(value, Some(&42));
}

#[test]
fn test_identities_are_isolated() {
    let cache = VersionedCache::default();
    let foo = id("foo.lua");
    let bar = id("bar.lua");
    cache.update_version(&foo, module("f1"), None, None);
    cache.update_version(&foo, module("f2"), None, None);
    cache.update_version(&bar, module("b1"), None, None);

    assert!(cache.rollback(&foo));
    assert_eq!(cache.get_version(&foo), Some(1));
    assert_eq!(cache.get_version(&bar), Some(1));
    assert_eq!(cache.identities(), vec![bar, foo]);
}

#[test]
fn test_concurrent_installs_across_identities() {
    let cache = Arc::new(VersionedCache::default());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let script = id(&format!("s{t}.lua"));
                for i in 0..50 {
                    cache.update_version(&script, module(&format!("{t}-{i}")), None, None);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 8);
    for t in 0..8 {
        let script = id(&format!("s{t}.lua"));
        assert_eq!(cache.get_version(&script), Some(50));
        assert_eq!(cache.retained_versions(&script), vec![47, 48, 49, 50]);
    }
}

#[test]
fn test_readers_never_see_a_gap() {
    let cache = Arc::new(VersionedCache::default());
    let foo = id("foo.lua");
    cache.update_version(&foo, module("0"), None, None);

    let reader = {
        let cache = Arc::clone(&cache);
        let foo = foo.clone();
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..10_000 {
                let version = cache.get_version(&foo).unwrap();
                assert!(version >= last);
                last = version;
            }
        })
    };
    for i in 1..200 {
        cache.update_version(&foo, module(&i.to_string()), None, None);
    }
    reader.join().unwrap();
}
