use arcadia::{ClassRef, Model, ModelError, NewObject};

use crate::helpers::{EXT_VIEWPOINT, core, demo_model, node, registry};

#[test]
fn test_class_of_typed_and_untyped_elements() {
    let model = demo_model();
    let class = |id: &str| model.by_id(id).unwrap().class().unwrap().qualified_name();
    assert_eq!(class("project"), "core:Project");
    // No xsi:type: the containment's declared class applies.
    assert_eq!(class("pkg-sub"), "core:Package");
    assert_eq!(class("lc-a"), "la:LogicalComponent");
    assert_eq!(class("prop-1"), "core:Property");
}

#[test]
fn test_navigation() {
    let model = demo_model();
    let system = model.by_id("lc-system").unwrap();
    assert_eq!(system.parent().and_then(|p| p.id()), Some("pkg-root"));
    let names: Vec<_> = system.children().iter().filter_map(|c| c.name()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(system.related("allocated").unwrap()[0].name(), Some("Drive"));
    assert_eq!(
        system.to_string(),
        r#"<la:LogicalComponent "System" (lc-system)>"#
    );
}

#[test]
fn test_element_nodes_in_document_order() {
    let model = demo_model();
    let ids: Vec<_> = model
        .element_nodes()
        .into_iter()
        .filter_map(|n| model.id_of(n))
        .collect();
    assert_eq!(
        ids,
        vec![
            "project", "pkg-root", "prop-1", "prop-2", "lc-system", "lc-a", "lc-b", "lc-c",
            "lf-1", "lf-2", "pkg-sub",
        ]
    );
    assert_eq!(model.len(), ids.len());
}

#[test]
fn test_list_push_insert_remove() {
    let mut model = demo_model();
    let list = model
        .relation(node(&model, "lc-system"), "subComponents")
        .unwrap();

    list.push(&mut model, NewObject::new().attr("id", "lc-d")).unwrap();
    list.insert(&mut model, 0, NewObject::new().attr("id", "lc-e")).unwrap();
    assert_eq!(
        list.ids(&model).unwrap(),
        vec!["lc-e", "lc-a", "lc-b", "lc-c", "lc-d"]
    );

    let a = node(&model, "lc-a");
    list.remove(&mut model, a).unwrap();
    assert_eq!(list.ids(&model).unwrap(), vec!["lc-e", "lc-b", "lc-c", "lc-d"]);
    assert!(model.node_by_id("lc-a").is_none());

    let sub = node(&model, "pkg-sub");
    let err = list.remove(&mut model, sub).unwrap_err();
    assert!(matches!(err, ModelError::UnknownElement(_)));
    assert_eq!(list.by_attr(&model, "id", "lc-d").unwrap().len(), 1);
}

#[test]
fn test_new_resource_declares_namespaces() {
    let mut model = Model::new(registry());
    let doc = model
        .new_resource("new.capella", &core("Project"))
        .unwrap();
    let root = model.document().root_element(doc).unwrap();
    model
        .set(
            root,
            "components",
            vec![NewObject::new().attr("name", "Top").into()],
        )
        .unwrap();

    let doc = model.document();
    assert_eq!(doc.attr(root, "xmlns:core"), Some("http://example.com/core"));
    assert_eq!(doc.attr(root, "xmlns:la"), Some("http://example.com/la/7.0"));
    assert_eq!(
        model.by_id(model.id_of(root).unwrap()).unwrap().class().unwrap().name(),
        "Project"
    );
}

#[test]
fn test_viewpoint_namespace_needs_activation() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<core:Package xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:core="http://example.com/core" xmlns:ext="http://example.com/ext/1.0" id="root">
  <ownedProperties xsi:type="ext:Note" id="note"/>
</core:Package>
"#;
    let mut model = Model::new(registry());
    model.add_resource("vp.capella", xml).unwrap();
    let err = model.by_id("note").unwrap().class().unwrap_err();
    assert!(matches!(err, ModelError::UnknownNamespace(_)));

    model.activate_viewpoint(EXT_VIEWPOINT, "1.3").unwrap();
    assert_eq!(
        model.by_id("note").unwrap().class().unwrap().qualified_name(),
        "ext:Note"
    );
}

#[test]
fn test_abstract_root_is_rejected() {
    let mut model = Model::new(registry());
    let err = model
        .new_resource("x.capella", &ClassRef::new("core", "Element"))
        .unwrap_err();
    assert!(matches!(err, ModelError::AbstractClass(_)));
}
