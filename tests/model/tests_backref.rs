use arcadia::{ErrorKind, ModelError};

use crate::helpers::{DEMO_PATH, demo_model, node, related_ids};

#[test]
fn test_read_finds_referrers() {
    let model = demo_model();
    assert_eq!(related_ids(&model, "lf-1", "allocators"), vec!["lc-system"]);
    assert_eq!(related_ids(&model, "lf-2", "allocators"), vec!["lc-c"]);
    assert_eq!(related_ids(&model, "lc-b", "pairedWith"), vec!["lc-a"]);
}

#[test]
fn test_read_through_containment() {
    let model = demo_model();
    assert_eq!(related_ids(&model, "lc-a", "parents"), vec!["lc-system"]);
    assert!(related_ids(&model, "lc-system", "parents").is_empty());
}

#[test]
fn test_reflects_new_referrers() {
    let mut model = demo_model();
    let lf2 = node(&model, "lf-2");
    let allocators = model.relation(lf2, "allocators").unwrap();
    assert_eq!(allocators.ids(&model).unwrap(), vec!["lc-c"]);

    let a = node(&model, "lc-a");
    model.set(a, "allocated", vec!["lf-2".into()]).unwrap();
    assert_eq!(allocators.ids(&model).unwrap(), vec!["lc-a", "lc-c"]);

    let c = node(&model, "lc-c");
    model.clear(c, "allocated").unwrap();
    assert_eq!(allocators.ids(&model).unwrap(), vec!["lc-a"]);
}

#[test]
fn test_sorted_by_attribute() {
    let mut model = demo_model();
    let system = node(&model, "lc-system");
    let c = node(&model, "lc-c");
    model.set(system, "pair", vec!["lc-b".into(), "lc-a".into()]).unwrap();
    model.set(c, "pair", vec!["lc-b".into(), "lc-a".into()]).unwrap();
    // Document order would be lc-system, lc-a, lc-c.
    assert_eq!(
        related_ids(&model, "lc-b", "pairedWith"),
        vec!["lc-a", "lc-c", "lc-system"]
    );
}

#[test]
fn test_write_is_refused() {
    let mut model = demo_model();
    let lf1 = node(&model, "lf-1");
    let before = model.to_bytes(DEMO_PATH).unwrap();

    let err = model.set(lf1, "allocators", vec!["lc-a".into()]).unwrap_err();
    assert!(matches!(err, ModelError::ReadOnly { .. }));
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert!(err.to_string().contains("allocated"), "{err}");

    let err = model.clear(lf1, "allocators").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);

    assert_eq!(model.to_bytes(DEMO_PATH).unwrap(), before);
}
