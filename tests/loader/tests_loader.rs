use std::fs;

use arcadia::{
    ErrorKind, FileHandler, LoaderOptions, LocalFileHandler, MemoryFileHandler, ModelError,
    ModelLoader,
};

use crate::helpers::{
    DEMO, DEMO_PATH, EXT_VIEWPOINT, FRAGMENT, FRAGMENT_PATH, node, registry, related_ids,
};

fn memory() -> MemoryFileHandler {
    MemoryFileHandler::new()
        .with_file(DEMO_PATH, DEMO)
        .with_file(FRAGMENT_PATH, FRAGMENT)
}

#[test]
fn test_load_follows_fragment_links() {
    let loader = ModelLoader::new(memory(), registry());
    let model = loader.load(DEMO_PATH).unwrap();

    let names: Vec<_> = model.resources().map(|(name, _)| name.to_owned()).collect();
    assert_eq!(names, vec![DEMO_PATH, FRAGMENT_PATH]);
    assert_eq!(related_ids(&model, "lc-system", "allocated"), vec!["lf-1", "lf-3"]);
    assert_eq!(related_ids(&model, "lf-3", "allocators"), vec!["lc-system"]);
    assert!(!model.is_corrupt());
}

#[test]
fn test_discovery_can_be_disabled() {
    let options = LoaderOptions {
        discover_fragments: false,
        ..LoaderOptions::default()
    };
    let model = ModelLoader::new(memory(), registry())
        .with_options(options.clone())
        .load(DEMO_PATH)
        .unwrap();
    assert_eq!(model.resources().count(), 1);

    let options = LoaderOptions {
        fragments: vec![FRAGMENT_PATH.to_owned()],
        ..options
    };
    let model = ModelLoader::new(memory(), registry())
        .with_options(options)
        .load(DEMO_PATH)
        .unwrap();
    assert_eq!(model.resources().count(), 2);
}

#[test]
fn test_local_files_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("fragments")).unwrap();
    fs::write(dir.path().join(DEMO_PATH), DEMO).unwrap();
    fs::write(dir.path().join(FRAGMENT_PATH), FRAGMENT).unwrap();

    let loader = ModelLoader::new(LocalFileHandler::new(dir.path()), registry());
    let mut model = loader.load(DEMO_PATH).unwrap();
    loader.save(&model).unwrap();
    assert_eq!(fs::read(dir.path().join(DEMO_PATH)).unwrap(), DEMO);
    assert_eq!(fs::read(dir.path().join(FRAGMENT_PATH)).unwrap(), FRAGMENT);

    let c = node(&model, "lc-c");
    model.set(c, "allocated", vec!["lf-3".into()]).unwrap();
    loader.save(&model).unwrap();

    let reloaded = loader.load(DEMO_PATH).unwrap();
    assert_eq!(related_ids(&reloaded, "lc-c", "allocated"), vec!["lf-3"]);
    assert_eq!(
        related_ids(&reloaded, "lf-3", "allocators"),
        vec!["lc-system", "lc-c"]
    );
}

#[test]
fn test_duplicate_ids_mark_model_corrupt() {
    let duplicate = String::from_utf8(FRAGMENT.to_vec())
        .unwrap()
        .replace("lf-3", "lf-1");
    let handler = MemoryFileHandler::new()
        .with_file(DEMO_PATH, DEMO)
        .with_file(FRAGMENT_PATH, duplicate);
    let loader = ModelLoader::new(handler, registry());
    let model = loader.load(DEMO_PATH).unwrap();

    assert!(model.is_corrupt());
    // The element read last wins.
    let lf1 = model.by_id("lf-1").unwrap();
    assert_eq!(lf1.name(), Some("Brake"));

    let err = loader.save(&model).unwrap_err();
    assert!(matches!(err, ModelError::Corrupt(_)));
    assert_eq!(loader.handler().read(DEMO_PATH).unwrap(), DEMO);
}

#[test]
fn test_entrypoint_errors() {
    let loader = ModelLoader::new(memory(), registry());
    let err = loader.load("demo.xml").unwrap_err();
    assert!(matches!(err, ModelError::Config(_)));

    let err = loader.load("missing.capella").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let handler = MemoryFileHandler::new().with_file(DEMO_PATH, DEMO);
    let err = ModelLoader::new(handler, registry())
        .load(DEMO_PATH)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io, "linked fragment is missing");
}

#[test]
fn test_viewpoints_from_options() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<core:Package xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:ext="http://example.com/ext/1.0" xmlns:core="http://example.com/core" id="root">
  <ownedProperties xsi:type="ext:Note" id="note"/>
</core:Package>
"#;
    let handler = MemoryFileHandler::new().with_file("vp.aird", xml);
    let mut options = LoaderOptions::default();
    options
        .viewpoints
        .insert(EXT_VIEWPOINT.to_owned(), "1.0.2".to_owned());
    let model = ModelLoader::new(handler, registry())
        .with_options(options)
        .load("vp.aird")
        .unwrap();
    assert_eq!(
        model.by_id("note").unwrap().class().unwrap().qualified_name(),
        "ext:Note"
    );
}

#[cfg(feature = "serde")]
#[test]
fn test_options_from_yaml() {
    let options = LoaderOptions::from_yaml(
        r#"
entrypoint_extensions: [capella]
fragments: [fragments/extra.capellafragment]
viewpoints:
  demo.ext: "1.0"
"#,
    )
    .unwrap();
    assert_eq!(options.entrypoint_extensions, vec!["capella"]);
    assert!(options.discover_fragments);
    assert_eq!(options.viewpoints.get("demo.ext").map(String::as_str), Some("1.0"));
}
