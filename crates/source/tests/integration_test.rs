// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the source crate

use std::collections::HashMap;

use ormbind_source::{
    Annotated, AnnotationSource, AnnotationUsage, ClassDetails, MemberDetails, MemberKind,
    SourceError, StaticAnnotationSource, names,
};

// Mock source implementation for integration testing
struct TestSource {
    classes: HashMap<String, ClassDetails>,
}

impl TestSource {
    fn new() -> Self {
        let mut classes = HashMap::new();
        classes.insert(
            "com.acme.Customer".to_string(),
            ClassDetails::new("com.acme.Customer")
                .with_annotation(AnnotationUsage::new(names::ENTITY))
                .with_member(
                    MemberDetails::field("id", "long")
                        .with_annotation(AnnotationUsage::new(names::ID)),
                ),
        );
        classes.insert(
            "com.acme.Audited".to_string(),
            ClassDetails::new("com.acme.Audited")
                .annotation_type()
                .with_annotation(
                    AnnotationUsage::new(names::TYPE_BINDER_TYPE)
                        .with("binder", "com.acme.AuditBinder"),
                ),
        );
        Self { classes }
    }
}

impl AnnotationSource for TestSource {
    fn class_details(&self, name: &str) -> Option<&ClassDetails> {
        self.classes.get(name)
    }

    fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }
}

#[test]
fn test_default_resolve_class() {
    let source = TestSource::new();
    assert!(source.resolve_class("com.acme.Customer").is_ok());

    let result = source.resolve_class("com.acme.Missing");
    match result {
        Err(SourceError::ClassNotFound(name)) => assert_eq!(name, "com.acme.Missing"),
        _ => panic!("Expected ClassNotFound error, got {:?}", result),
    }
}

#[test]
fn test_meta_annotation_lookup() {
    let source = TestSource::new();
    let binder = source
        .annotation_type("com.acme.Audited")
        .and_then(|t| t.annotation(names::TYPE_BINDER_TYPE))
        .and_then(|a| a.class_ref("binder"));
    assert_eq!(binder, Some("com.acme.AuditBinder"));
    assert!(source.annotation_type("com.acme.Customer").is_none());
}

#[test]
fn test_class_has_annotation() {
    let source = TestSource::new();
    assert!(source.class_has_annotation("com.acme.Customer", names::ENTITY));
    assert!(!source.class_has_annotation("com.acme.Customer", names::EMBEDDABLE));
    assert!(!source.class_has_annotation("com.acme.Nope", names::ENTITY));
}

#[test]
fn test_yaml_document_with_members() {
    let yaml = r#"
classes:
  - name: com.acme.Order
    annotations:
      - name: Entity
      - name: Table
        attributes:
          name: ORDERS
          uniqueConstraints:
            - name: UniqueConstraint
              attributes:
                columnNames: [number, customer_id]
    members:
      - name: id
        type_name: long
        annotations:
          - name: Id
          - name: GeneratedValue
            attributes: { strategy: SEQUENCE }
      - name: lines
        type_name: java.util.List<com.acme.OrderLine>
        annotations:
          - name: OneToMany
            attributes: { mappedBy: order }
      - name: onCreate
        kind: method
        annotations: [{ name: PrePersist }]
  - name: com.acme.OrderLine
    annotations: [{ name: Entity }]
"#;
    let source = StaticAnnotationSource::from_yaml_str(yaml).unwrap();
    assert_eq!(source.len(), 2);

    let order = source.resolve_class("com.acme.Order").unwrap();
    let table = order.annotation(names::TABLE).unwrap();
    assert_eq!(table.string("name"), Some("ORDERS"));
    let constraints = table.nested_list("uniqueConstraints");
    assert_eq!(constraints[0].string_list("columnNames"), vec!["number", "customer_id"]);

    let id = order.member("id").unwrap();
    assert!(id.is_primitive());
    assert_eq!(
        id.annotation(names::GENERATED_VALUE)
            .map(|g| g.enum_value("strategy", "AUTO")),
        Some("SEQUENCE")
    );

    let lines = order.member("lines").unwrap();
    assert!(lines.is_collection());
    assert_eq!(lines.collection_element_type(), Some("com.acme.OrderLine"));

    let callback = order.member("onCreate").unwrap();
    assert_eq!(callback.kind, MemberKind::Method);
    assert_eq!(order.attributes().count(), 2);
}

#[test]
fn test_duplicate_classes_in_document() {
    let yaml = r#"
classes:
  - name: com.acme.Order
  - name: com.acme.Order
"#;
    let result = StaticAnnotationSource::from_yaml_str(yaml);
    assert!(matches!(result, Err(SourceError::DuplicateClass(_))));
}
