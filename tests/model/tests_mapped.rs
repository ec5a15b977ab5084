use arcadia::{ErrorKind, MappedItem, ModelError};

use crate::helpers::{demo_model, node};

#[test]
fn test_keys_and_values() {
    let model = demo_model();
    let view = model.mapped(node(&model, "pkg-root"), "properties").unwrap();
    assert_eq!(view.keys(&model).unwrap(), vec!["owner", "state"]);
    assert!(matches!(
        view.get(&model, "owner").unwrap(),
        Some(MappedItem::Value(Some("alice")))
    ));
    assert!(view.get(&model, "missing").unwrap().is_none());
}

#[test]
fn test_set_rewrites_mapvalue_in_place() {
    let mut model = demo_model();
    let view = model.mapped(node(&model, "pkg-root"), "properties").unwrap();
    view.set(&mut model, "state", "final").unwrap();
    assert!(matches!(
        view.get(&model, "state").unwrap(),
        Some(MappedItem::Value(Some("final")))
    ));
    assert_eq!(
        model.document().attr(node(&model, "prop-2"), "value"),
        Some("final")
    );

    let err = view.set(&mut model, "missing", "x").unwrap_err();
    assert!(matches!(err, ModelError::UnknownElement(_)));
}

#[test]
fn test_without_mapvalue_yields_elements() {
    let mut model = demo_model();
    let view = model
        .mapped(node(&model, "pkg-root"), "propertyElements")
        .unwrap();
    match view.get(&model, "owner").unwrap() {
        Some(MappedItem::Element(e)) => assert_eq!(e.id(), Some("prop-1")),
        other => panic!("expected an element, got {other:?}"),
    }
    let err = view.set(&mut model, "owner", "bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[test]
fn test_requires_mapkey() {
    let model = demo_model();
    let err = model
        .mapped(node(&model, "pkg-root"), "packages")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
}
