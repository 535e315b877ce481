// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use obj_lite_cache::{CacheOptions, ObjectCache, ROOT_OBJECT_KEY};
use obj_lite_core::{GeometryParser, ParsedObject, Provenance};
use std::fs;
use std::path::Path;

const QUAD: &[u8] = b"\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

fn quad() -> ParsedObject {
    GeometryParser::default().parse_all(QUAD).unwrap()
}

fn open(root: &Path, mapped: bool) -> ObjectCache {
    let options = CacheOptions::default()
        .with_root(root)
        .with_memory_mapped_reads(mapped);
    ObjectCache::new("models", options).unwrap()
}

fn assert_same(restored: &ParsedObject, original: &ParsedObject) {
    assert_eq!(restored.layout, original.layout);
    assert_eq!(restored.vertex_count, original.vertex_count);
    assert_eq!(restored.buffer.as_bytes(), original.buffer.as_bytes());
    assert_eq!(restored.provenance, Provenance::Cached);
    assert_eq!(restored.source_range, None);
}

#[test]
fn test_round_trip_eager() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), false);
    let original = quad();

    assert!(cache.put(&original, "quad"));
    let restored = cache.get("quad").unwrap();

    assert_same(&restored, &original);
    assert!(!restored.buffer.is_mapped());
}

#[test]
fn test_round_trip_mapped() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), true);
    let original = quad();

    assert!(cache.put(&original, "quad"));
    let restored = cache.get("quad").unwrap();

    assert_same(&restored, &original);
    assert!(restored.buffer.is_mapped());

    // Payload is 4-byte aligned inside the record, so the mapping is too.
    let floats = restored.buffer.as_floats().unwrap();
    assert_eq!(floats.len(), 6 * 8);
    assert_eq!(floats, original.buffer.to_floats().as_slice());
}

#[test]
fn test_mapped_buffer_survives_record_replacement() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), true);
    let original = quad();
    assert!(cache.put(&original, "quad"));
    let restored = cache.get("quad").unwrap();

    let empty = GeometryParser::default().parse_all(b"v 1 2 3\n").unwrap();
    assert!(cache.put(&empty, "quad"));

    assert_eq!(restored.buffer.as_bytes(), original.buffer.as_bytes());
    assert_eq!(cache.get("quad").unwrap().vertex_count, 0);
}

#[test]
fn test_empty_object_round_trips() {
    let root = tempfile::tempdir().unwrap();
    for mapped in [false, true] {
        let cache = open(root.path(), mapped);
        let empty = GeometryParser::default().parse_all(b"").unwrap();
        assert!(cache.cache_object(&empty));

        let restored = cache.cached_object_for_root_object().unwrap();
        assert_eq!(restored.vertex_count, 0);
        assert!(restored.buffer.is_empty());
    }
}

#[test]
fn test_disabled_cache_never_hits_or_stores() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), true);
    assert!(cache.put(&quad(), ROOT_OBJECT_KEY));

    cache.set_enabled(false);
    assert!(!cache.is_enabled());
    assert!(cache.get(ROOT_OBJECT_KEY).is_none());
    assert!(cache.cached_object_for_root_object().is_none());
    assert!(!cache.put(&quad(), "other"));
    assert!(!cache.directory().join("other.bin").exists());

    cache.set_enabled(true);
    assert!(cache.get(ROOT_OBJECT_KEY).is_some());
}

#[test]
fn test_corrupt_record_is_a_miss() {
    let root = tempfile::tempdir().unwrap();
    for mapped in [false, true] {
        let cache = open(root.path(), mapped);
        assert!(cache.put(&quad(), "quad"));

        let path = cache.directory().join("quad.bin");
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 5);
        fs::write(&path, &bytes).unwrap();
        assert!(cache.get("quad").is_none());

        fs::write(&path, b"99garbage").unwrap();
        assert!(cache.get("quad").is_none());

        fs::write(&path, b"").unwrap();
        assert!(cache.get("quad").is_none());
    }
}

#[test]
fn test_clear_removes_every_entry() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), false);
    assert!(cache.put(&quad(), "a"));
    assert!(cache.put(&quad(), "b"));
    fs::create_dir(cache.directory().join("stray")).unwrap();

    cache.clear().unwrap();

    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_none());
    assert_eq!(fs::read_dir(cache.directory()).unwrap().count(), 0);

    // Clearing an empty namespace still succeeds.
    cache.clear().unwrap();
}

#[test]
fn test_remove_entry() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), false);
    assert!(cache.put(&quad(), "a"));
    assert!(cache.remove("a").unwrap());
    assert!(!cache.remove("a").unwrap());
}

#[test]
fn test_file_namespaces() {
    let root = tempfile::tempdir().unwrap();
    let sources = tempfile::tempdir().unwrap();
    let first = sources.path().join("first.obj");
    let second = sources.path().join("second.obj");
    fs::write(&first, QUAD).unwrap();
    fs::write(&second, QUAD).unwrap();

    let by_path = CacheOptions::default().with_root(root.path());
    let a = ObjectCache::for_file(&first, by_path.clone()).unwrap();
    let b = ObjectCache::for_file(&second, by_path).unwrap();
    assert_ne!(a.name(), b.name());

    let by_contents = CacheOptions::default()
        .with_root(root.path())
        .with_hash_file_contents(true);
    let c = ObjectCache::for_file(&first, by_contents.clone()).unwrap();
    let d = ObjectCache::for_file(&second, by_contents.clone()).unwrap();
    assert_eq!(c.name(), d.name());

    fs::write(&second, b"v 1 1 1\n").unwrap();
    let e = ObjectCache::for_file(&second, by_contents).unwrap();
    assert_ne!(c.name(), e.name());
}

#[test]
fn test_contents_namespace_of_missing_file_fails() {
    let root = tempfile::tempdir().unwrap();
    let options = CacheOptions::default()
        .with_root(root.path())
        .with_hash_file_contents(true);
    assert!(ObjectCache::for_file(root.path().join("missing.obj"), options).is_err());
}

#[test]
fn test_unwritable_root_is_directory_error() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("file");
    fs::write(&blocker, b"not a directory").unwrap();

    let options = CacheOptions::default().with_root(&blocker);
    assert!(matches!(
        ObjectCache::new("models", options),
        Err(obj_lite_cache::Error::CacheDirectory { .. })
    ));
}

#[test]
fn test_concurrent_writers_to_distinct_keys() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), true);
    let original = quad();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let cache = &cache;
            let original = &original;
            scope.spawn(move || assert!(cache.put(original, &format!("key-{}", i))));
        }
    });

    for i in 0..8 {
        let restored = cache.get(&format!("key-{}", i)).unwrap();
        assert_eq!(restored.buffer.as_bytes(), original.buffer.as_bytes());
    }
}

#[test]
fn test_cache_names_differing_by_punctuation_stay_apart() {
    let root = tempfile::tempdir().unwrap();
    let options = CacheOptions::default().with_root(root.path());
    let dotted = ObjectCache::new("a.b", options.clone()).unwrap();
    let underscored = ObjectCache::new("a_b", options).unwrap();

    assert_ne!(dotted.directory(), underscored.directory());
    assert!(dotted.cache_object(&quad()));
    assert!(underscored.cached_object_for_root_object().is_none());
}

#[test]
fn test_object_names_differing_by_punctuation_stay_apart() {
    let root = tempfile::tempdir().unwrap();
    let cache = open(root.path(), false);
    let parser = GeometryParser::default();

    let mut dotted = parser.parse_all(b"v 1 1 1\nf 1 1 1\n").unwrap();
    dotted.name = Some("Cube.001".to_string());
    let mut underscored = parser.parse_all(b"v 9 9 9\nf 1 1 1\n").unwrap();
    underscored.name = Some("Cube_001".to_string());

    assert!(cache.cache_object(&dotted));
    assert!(cache.cached_object_for_name("Cube_001").is_none());
    assert!(cache.cache_object(&underscored));

    let restored = cache.cached_object_for_name("Cube_001").unwrap();
    assert_eq!(restored.vertex(0).unwrap()[..3], [9.0, 9.0, 9.0]);
    let restored = cache.cached_object_for_name("Cube.001").unwrap();
    assert_eq!(restored.vertex(0).unwrap()[..3], [1.0, 1.0, 1.0]);
}
