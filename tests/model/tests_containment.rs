use std::sync::Arc;

use arcadia::{
    Association, ClassDef, ClassRef, Containment, ErrorKind, Model, ModelError, Namespace,
    NamespaceRegistry, NewObject, Value,
};

use crate::helpers::{demo_model, la, node, related_ids};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_read_children_by_role() {
    let model = demo_model();
    assert_eq!(related_ids(&model, "pkg-root", "packages"), ids(&["pkg-sub"]));
    assert_eq!(related_ids(&model, "pkg-root", "components"), ids(&["lc-system"]));
    assert_eq!(
        related_ids(&model, "lc-system", "subComponents"),
        ids(&["lc-a", "lc-b", "lc-c"])
    );
    assert!(related_ids(&model, "pkg-sub", "packages").is_empty());
}

#[test]
fn test_write_then_read_is_fixed_point() {
    let mut model = demo_model();
    let system = node(&model, "lc-system");
    model
        .set(system, "subComponents", vec!["lc-c".into(), "lc-a".into()])
        .unwrap();
    let first = related_ids(&model, "lc-system", "subComponents");
    assert_eq!(first, ids(&["lc-c", "lc-a"]));

    let again: Vec<Value> = first.iter().map(|id| Value::from(id.as_str())).collect();
    model.set(system, "subComponents", again).unwrap();
    assert_eq!(related_ids(&model, "lc-system", "subComponents"), first);
}

#[test]
fn test_removed_children_leave_the_index() {
    let mut model = demo_model();
    let system = node(&model, "lc-system");
    model.set(system, "subComponents", vec!["lc-b".into()]).unwrap();
    assert!(model.node_by_id("lc-a").is_none());
    assert!(model.node_by_id("lc-c").is_none());
    assert!(model.node_by_id("lc-b").is_some());
}

#[test]
fn test_deleting_fixed_length_targets_is_refused() {
    // lc-a pairs lc-b and lc-c; dropping them would leave the pair short.
    let mut model = demo_model();
    let system = node(&model, "lc-system");
    let before = model.to_bytes("demo.capella").unwrap();
    let err = model
        .set(system, "subComponents", vec!["lc-a".into()])
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::Cardinality {
            expected: 2,
            actual: 0,
            ..
        }
    ));
    assert_eq!(model.to_bytes("demo.capella").unwrap(), before);
}

#[test]
fn test_move_existing_element() {
    let mut model = demo_model();
    let a = node(&model, "lc-a");
    model.set(a, "subComponents", vec!["lc-b".into()]).unwrap();

    assert_eq!(related_ids(&model, "lc-a", "subComponents"), ids(&["lc-b"]));
    assert_eq!(
        related_ids(&model, "lc-system", "subComponents"),
        ids(&["lc-a", "lc-c"])
    );
    let b = model.by_id("lc-b").unwrap();
    assert_eq!(b.parent().and_then(|p| p.id()), Some("lc-a"));
    assert_eq!(b.tag(), Some("ownedLogicalComponents"));
}

#[test]
fn test_cycle_is_rejected() {
    let mut model = demo_model();
    let a = node(&model, "lc-a");
    let err = model
        .set(a, "subComponents", vec!["lc-system".into()])
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidValue { .. }));
    assert_eq!(
        related_ids(&model, "lc-system", "subComponents"),
        ids(&["lc-a", "lc-b", "lc-c"])
    );
}

#[test]
fn test_new_object_uses_alternate_class() {
    let mut model = demo_model();
    let b = node(&model, "lc-b");
    model
        .set(b, "subComponents", vec![NewObject::new().attr("name", "New").into()])
        .unwrap();

    let children = model.element(b).unwrap().related("subComponents").unwrap();
    assert_eq!(children.len(), 1);
    let child = children[0];
    assert_eq!(child.attr("xsi:type"), Some("la:LogicalComponent"));
    assert_eq!(child.name(), Some("New"));
    assert_eq!(child.id().map(str::len), Some(36));
    assert_eq!(child.class().unwrap().qualified_name(), "la:LogicalComponent");
}

#[test]
fn test_new_object_keeps_given_id() {
    let mut model = demo_model();
    let b = node(&model, "lc-b");
    model
        .set(
            b,
            "subComponents",
            vec![NewObject::new().attr("id", "lc-new").attr("name", "N").into()],
        )
        .unwrap();
    assert_eq!(related_ids(&model, "lc-b", "subComponents"), ids(&["lc-new"]));
}

#[test]
fn test_abstract_class_cannot_be_created() {
    let mut model = demo_model();
    let b = node(&model, "lc-b");
    let err = model
        .set(
            b,
            "subComponents",
            vec![NewObject::of_class(la("AbstractComponent")).into()],
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::AbstractClass(_)));
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert!(related_ids(&model, "lc-b", "subComponents").is_empty());
}

#[test]
fn test_wrong_class_changes_nothing() {
    let mut model = demo_model();
    let root = node(&model, "pkg-root");
    let before = model.to_bytes("demo.capella").unwrap();
    let err = model
        .set(root, "packages", vec!["pkg-sub".into(), "lc-a".into()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conformance);
    assert_eq!(model.to_bytes("demo.capella").unwrap(), before);
}

#[test]
fn test_invalid_values() {
    let mut model = demo_model();
    let system = node(&model, "lc-system");

    let err = model
        .set(system, "subComponents", vec!["nope".into()])
        .unwrap_err();
    assert!(matches!(err, ModelError::UnknownElement(_)));

    let err = model
        .set(system, "subComponents", vec!["lc-a".into(), "lc-a".into()])
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidValue { .. }));

    let err = model
        .set(
            system,
            "subComponents",
            vec![NewObject::new().attr("id", "lc-b").into()],
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidValue { .. }));

    assert_eq!(
        related_ids(&model, "lc-system", "subComponents"),
        ids(&["lc-a", "lc-b", "lc-c"])
    );
}

#[test]
fn test_clear_removes_children() {
    let mut model = demo_model();
    let system = node(&model, "lc-system");
    model.clear(system, "subComponents").unwrap();
    assert!(related_ids(&model, "lc-system", "subComponents").is_empty());
    assert!(model.node_by_id("lc-a").is_none());
}

#[test]
fn test_single_attr_scalar() {
    let mut model = demo_model();
    let root = node(&model, "pkg-root");
    assert_eq!(model.scalar(root, "description").unwrap(), None);

    model.set_scalar(root, "description", "first").unwrap();
    model.set_scalar(root, "description", "second").unwrap();
    assert_eq!(model.scalar(root, "description").unwrap().as_deref(), Some("second"));
    assert_eq!(model.relation(root, "description").unwrap().len(&model).unwrap(), 1);
}

#[test]
fn test_scalar_needs_single_attr() {
    let mut model = demo_model();
    let root = node(&model, "pkg-root");
    let err = model.set_scalar(root, "packages", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[test]
fn test_unknown_relation() {
    let model = demo_model();
    let err = model.relation(node(&model, "pkg-root"), "nothing").unwrap_err();
    assert!(matches!(err, ModelError::UnknownRelation { .. }));
}

// ============================================================================
// Fixed-length containments
// ============================================================================

/// A `lk:Link` resource root with exactly two `ends`, a free-form `bag`
/// and an `anchor` pointing at exactly one end.
fn link_model() -> (Model, arcadia::xml::NodeId) {
    let mut registry = NamespaceRegistry::new();
    let ns = registry
        .add(Namespace::new("http://example.com/links", "lk").unwrap())
        .unwrap();
    ns.define(ClassDef::builder(&ns, "End")).unwrap();
    ns.define(
        ClassDef::builder(&ns, "Link")
            .relation(
                "ends",
                Containment::new("ownedEnds", ClassRef::new("lk", "End")).fixed_length(2),
            )
            .relation("bag", Containment::new("ownedBag", ClassRef::new("lk", "End")))
            .relation(
                "anchor",
                Association::new("anchor", ClassRef::new("lk", "End")).fixed_length(1),
            ),
    )
    .unwrap();

    let mut model = Model::new(Arc::new(registry));
    let doc = model
        .new_resource("links.capella", &ClassRef::new("lk", "Link"))
        .unwrap();
    let root = model.document().root_element(doc).unwrap();
    (model, root)
}

fn end(id: &str) -> Value {
    NewObject::new().attr("id", id).into()
}

#[test]
fn test_fixed_length_wrong_count_creates_nothing() {
    let (mut model, root) = link_model();
    let err = model.set(root, "ends", vec![end("e1")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cardinality);
    assert!(model.node_by_id("e1").is_none());
    assert!(model.relation(root, "ends").unwrap().is_empty(&model).unwrap());

    model.set(root, "ends", vec![end("e1"), end("e2")]).unwrap();
    let err = model.clear(root, "ends").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cardinality);
    assert_eq!(
        model.relation(root, "ends").unwrap().ids(&model).unwrap(),
        vec!["e1", "e2"]
    );
}

#[test]
fn test_moving_out_of_fixed_length_is_refused() {
    let (mut model, root) = link_model();
    model.set(root, "ends", vec![end("e1"), end("e2")]).unwrap();

    let err = model.set(root, "bag", vec!["e1".into()]).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Cardinality {
            expected: 2,
            actual: 1,
            ..
        }
    ));
    let ends = model.relation(root, "ends").unwrap();
    assert_eq!(ends.ids(&model).unwrap(), vec!["e1", "e2"]);
    assert!(model.relation(root, "bag").unwrap().is_empty(&model).unwrap());
}

#[test]
fn test_deleting_anchor_target_is_refused() {
    let (mut model, root) = link_model();
    model.set(root, "bag", vec![end("b1"), end("b2")]).unwrap();
    model.set(root, "anchor", vec!["b1".into()]).unwrap();

    let err = model.set(root, "bag", vec!["b2".into()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cardinality);
    let err = model.clear(root, "bag").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cardinality);
    assert!(model.node_by_id("b1").is_some());

    // Dropping the other element is fine.
    model.set(root, "bag", vec!["b1".into()]).unwrap();
    assert!(model.node_by_id("b2").is_none());
}

#[test]
fn test_foreign_owner_is_an_error() {
    let demo = demo_model();
    let (small, _) = link_model();
    let far = node(&demo, "pkg-sub");

    assert!(matches!(small.element(far), Err(ModelError::UnknownElement(_))));
    assert!(small.relation(far, "ends").is_err());
    let list = demo
        .relation(node(&demo, "lc-system"), "subComponents")
        .unwrap();
    assert!(list.nodes(&small).is_err());
    let allocators = demo.relation(node(&demo, "lf-1"), "allocators").unwrap();
    assert!(allocators.nodes(&small).is_err());

    let mut small = small;
    let allocated = demo.relation(node(&demo, "lc-c"), "allocated").unwrap();
    assert!(allocated.clear(&mut small).is_err());
}
