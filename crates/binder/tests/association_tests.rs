// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for associations and join column defaults

use ormbind_binder::{MappingError, MetadataBuilder};
use ormbind_model::{Identifier, Metadata, Selectable};
use ormbind_source::{AnnotationUsage, MemberDetails, StaticAnnotationSource, names};
use ormbind_test_utils::{MappingAssertions, MappingFixtures, init_tracing};

fn build(source: &StaticAnnotationSource) -> Metadata {
    init_tracing();
    match MetadataBuilder::new(source).build() {
        Ok(metadata) => metadata,
        Err(e) => panic!("Expected the mapping to bind, got {:?}", e),
    }
}

/// `Account` n..1 `Customer`, where `Customer` lives in `customer_table`
fn customer_accounts(customer_table: &str) -> StaticAnnotationSource {
    StaticAnnotationSource::new()
        .with_class(
            MappingFixtures::entity("Customer")
                .with_annotation(AnnotationUsage::new(names::TABLE).with("name", customer_table))
                .with_member(MappingFixtures::id("id", "long")),
        )
        .with_class(
            MappingFixtures::entity("Account")
                .with_member(MappingFixtures::id("id", "long"))
                .with_member(
                    MemberDetails::field("customer", "Customer").with_annotation(AnnotationUsage::new(names::MANY_TO_ONE)),
                ),
        )
}

fn to_one_columns(metadata: &Metadata, entity: &str, property: &str) -> Vec<Identifier> {
    let owner = MappingAssertions::entity(metadata, entity);
    match owner.property(property) {
        Some(property) => property
            .value
            .selectables()
            .into_iter()
            .filter_map(|s| match s {
                Selectable::Column(name) => Some(name),
                Selectable::Formula(_) => None,
            })
            .collect(),
        None => panic!("Expected property '{}' on '{}'", property, entity),
    }
}

// ===== Order domain =====

#[test]
fn test_inverse_one_to_many_uses_owning_join_column() {
    let metadata = build(&MappingFixtures::order_domain());

    let lines = match metadata.collection("com.acme.Order.lines") {
        Some(collection) => collection,
        None => panic!("Expected collection 'com.acme.Order.lines'"),
    };
    assert!(lines.is_resolved());
    assert_eq!(lines.mapped_by.as_deref(), Some("order"));

    let line_table = MappingAssertions::entity_table(&metadata, "com.acme.OrderLine");
    assert_eq!(lines.collection_table, Some(line_table.id));
    assert_eq!(
        lines.key.as_ref().map(|key| key.columns.clone()),
        Some(vec![Identifier::unquoted("ORDER_ID")])
    );
}

#[test]
fn test_explicit_join_column_references_owner_key() {
    let metadata = build(&MappingFixtures::order_domain());

    let line_table = MappingAssertions::entity_table(&metadata, "com.acme.OrderLine");
    MappingAssertions::assert_has_column(line_table, "ORDER_ID");
    let fk = MappingAssertions::foreign_key(line_table, &["ORDER_ID"]);
    assert_eq!(fk.referenced_table, MappingAssertions::entity_table(&metadata, "com.acme.Order").id);
    assert!(fk.references_primary_key());
}

#[test]
fn test_implicit_join_column_name() {
    let metadata = build(&MappingFixtures::order_domain());

    assert_eq!(
        to_one_columns(&metadata, "com.acme.OrderLine", "product"),
        vec![Identifier::unquoted("product_sku")]
    );
    let line_table = MappingAssertions::entity_table(&metadata, "com.acme.OrderLine");
    MappingAssertions::assert_has_column(line_table, "product_sku");
    MappingAssertions::foreign_key(line_table, &["product_sku"]);
}

#[test]
fn test_explicit_table_name_is_kept() {
    let metadata = build(&MappingFixtures::order_domain());

    let table = MappingAssertions::entity_table(&metadata, "com.acme.Order");
    assert_eq!(table.name.table.text(), "orders");
    MappingAssertions::assert_primary_key(table, &["id"]);
}

#[test]
fn test_binding_is_deterministic() {
    let first = build(&MappingFixtures::order_domain()).to_json().unwrap();
    let second = build(&MappingFixtures::order_domain()).to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_yaml_source_binds_like_programmatic_source() {
    let yaml = StaticAnnotationSource::from_yaml_str(MappingFixtures::order_domain_yaml()).unwrap();

    let from_yaml = build(&yaml).to_json().unwrap();
    let from_code = build(&MappingFixtures::order_domain()).to_json().unwrap();
    assert_eq!(from_yaml, from_code);
}

#[test]
fn test_inverse_one_to_many_rejects_composite_owning_side() {
    init_tracing();
    let join_column = |name: &str, referenced: &str| {
        AnnotationUsage::new(names::JOIN_COLUMN)
            .with("name", name)
            .with("referencedColumnName", referenced)
    };
    let source = StaticAnnotationSource::new()
        .with_class(
            MappingFixtures::entity("Order")
                .with_member(MappingFixtures::id("region", "String"))
                .with_member(MappingFixtures::id("number", "long"))
                .with_member(MappingFixtures::one_to_many_mapped_by("lines", "OrderLine", "order")),
        )
        .with_class(
            MappingFixtures::entity("OrderLine")
                .with_member(MappingFixtures::id("id", "long"))
                .with_member(
                    MemberDetails::field("order", "Order")
                        .with_annotation(AnnotationUsage::new(names::MANY_TO_ONE))
                        .with_annotation(AnnotationUsage::new(names::JOIN_COLUMNS).with(
                            "value",
                            vec![join_column("O_REGION", "region"), join_column("O_NUMBER", "number")],
                        )),
                ),
        );

    let result = MetadataBuilder::new(&source).build();
    match result {
        Err(MappingError::MappedByResolution {
            entity,
            property,
            mapped_by,
            reason,
            ..
        }) => {
            assert_eq!(entity, "Order");
            assert_eq!(property, "lines");
            assert_eq!(mapped_by, "order");
            assert!(reason.contains("more than one column"), "{}", reason);
        }
        _ => panic!("Expected MappedByResolution error, got {:?}", result.map(|_| ())),
    }
}

// ===== Quoting =====

#[test]
fn test_quoted_referenced_table_quotes_implicit_join_column() {
    let metadata = build(&customer_accounts("`customer`"));

    let columns = to_one_columns(&metadata, "Account", "customer");
    assert_eq!(columns, vec![Identifier::quoted("customer_id")]);
    assert!(columns[0].is_quoted());
}

#[test]
fn test_unquoted_referenced_table_keeps_join_column_unquoted() {
    let metadata = build(&customer_accounts("customer"));

    let columns = to_one_columns(&metadata, "Account", "customer");
    assert_eq!(columns, vec![Identifier::unquoted("customer_id")]);
    assert!(!columns[0].is_quoted());
}
