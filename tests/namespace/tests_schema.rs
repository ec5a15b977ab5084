#![cfg(feature = "serde")]

use std::sync::Arc;

use arcadia::{Model, NamespaceRegistry, NewObject, RelationKind};

const SCHEMA: &str = r#"{
  "namespaces": [
    {
      "uri": "http://example.com/oa/{VERSION}",
      "alias": "oa",
      "maxver": "6.0.0",
      "version_precision": 2,
      "classes": [
        {
          "name": "Entity",
          "relations": {
            "actors": {
              "kind": "containment",
              "role": "ownedEntities",
              "class": "oa:Entity",
              "mapkey": "name"
            },
            "roles": {
              "kind": "association",
              "role": "allocatedRoles",
              "class": "oa:Role"
            }
          }
        },
        {
          "name": "Role",
          "minver": "5.0",
          "relations": {
            "entities": {
              "kind": "backref",
              "class": "oa:Entity",
              "attrs": ["roles"]
            }
          }
        },
        {
          "name": "Actor",
          "superclass": "oa:Entity",
          "relations": {
            "actors": { "kind": "containment", "class": "oa:Actor", "fixed_length": 1 }
          }
        }
      ]
    }
  ]
}"#;

#[test]
fn test_from_json_builds_classes_and_relations() {
    let registry = NamespaceRegistry::from_json(SCHEMA).unwrap();
    let entity = registry.resolve("oa", "Entity", None).unwrap();
    let kinds: Vec<_> = entity
        .all_relations()
        .values()
        .map(|r| r.kind())
        .collect();
    assert_eq!(kinds, vec![RelationKind::Containment, RelationKind::Association]);

    let role = registry.resolve("oa", "Role", None).unwrap();
    assert_eq!(role.relation("entities").unwrap().kind(), RelationKind::Backref);
}

#[test]
fn test_redeclared_relation_inherits_role() {
    let registry = NamespaceRegistry::from_json(SCHEMA).unwrap();
    let actor = registry.resolve("oa", "Actor", None).unwrap();
    let actors = actor.relation("actors").unwrap();
    assert_eq!(actors.role(), Some("ownedEntities"));
    assert_eq!(actors.mapkey(), Some("name"));
    assert_eq!(actors.fixed_length(), 1);
    assert_eq!(actors.class().name(), "Actor");
}

#[test]
fn test_schema_driven_model() {
    let registry = Arc::new(NamespaceRegistry::from_json(SCHEMA).unwrap());
    let mut model = Model::new(registry);
    let doc = model
        .new_resource("ops.capella", &arcadia::ClassRef::new("oa", "Entity"))
        .unwrap();
    let root = model.document().root_element(doc).unwrap();
    model
        .set(
            root,
            "actors",
            vec![NewObject::new().attr("name", "Crew").into()],
        )
        .unwrap();

    let view = model.mapped(root, "actors").unwrap();
    assert_eq!(view.keys(&model).unwrap(), vec!["Crew"]);
    let bytes = model.to_bytes("ops.capella").unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(r#"xmlns:oa="http://example.com/oa/6.0""#), "{text}");
}
