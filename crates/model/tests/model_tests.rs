// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Unit tests for the mapping model

use ormbind_model::{
    Column, Dialect, ForeignKey, Identifier, Metadata, OnDeleteAction, PersistentClass,
    PersistentClassKind, QualifiedTableName, Selectable, SimpleValue, Table, TableId, Value,
};

fn order_metadata() -> Metadata {
    let mut metadata = Metadata::default();

    let mut orders = Table::new(
        TableId(0),
        QualifiedTableName::new(None, None, Identifier::unquoted("ORDERS")),
        Identifier::unquoted("ORDERS"),
    );
    orders.add_column(Column::new(Identifier::unquoted("ID")).with_nullable(false));

    let mut lines = Table::new(
        TableId(1),
        QualifiedTableName::new(None, None, Identifier::quoted("OrderLine")),
        Identifier::quoted("OrderLine"),
    );
    lines.add_column(Column::new(Identifier::unquoted("ORDER_ID")));
    lines.add_foreign_key(ForeignKey {
        name: None,
        columns: vec![Identifier::unquoted("ORDER_ID")],
        referenced_table: TableId(0),
        referenced_entity: Some("Order".to_string()),
        referenced_columns: Vec::new(),
        on_delete: OnDeleteAction::Cascade,
        constraint: true,
    });

    metadata.tables.push(orders);
    metadata.tables.push(lines);

    let mut order = PersistentClass::new("Order", "Order", PersistentClassKind::Root, TableId(0));
    let mut id = SimpleValue::new(TableId(0)).with_type_name("long");
    id.selectables
        .push(Selectable::Column(Identifier::unquoted("ID")));
    order.identifier = Some(Value::Basic(id));
    order.identifier_property = Some("id".to_string());
    metadata.entities.insert("Order".to_string(), order);
    metadata
}

#[test]
fn test_metadata_json_round_trip() {
    let metadata = order_metadata();
    let json = metadata.to_json().unwrap();
    let back: Metadata = serde_json::from_str(&json).unwrap();
    assert_eq!(back, metadata);
}

#[test]
fn test_quoted_table_renders_per_dialect() {
    let metadata = order_metadata();
    let table = metadata.table_named("`OrderLine`").unwrap();
    assert_eq!(table.name.table.render_for(Dialect::MySQL), "`OrderLine`");
    assert_eq!(table.name.table.render_for(Dialect::PostgreSQL), "\"OrderLine\"");
    assert_eq!(table.foreign_keys[0].on_delete, OnDeleteAction::Cascade);
    assert!(table.foreign_keys[0].references_primary_key());
}

#[test]
fn test_table_from_yaml() {
    let yaml = r#"
id: 3
name:
  catalog: null
  schema: null
  table:
    text: CUSTOMER
logical_name:
  text: Customer
subselect: null
is_abstract: false
included_table: null
columns:
  - name: { text: ID }
    logical_name: { text: id }
    type_name: long
    sql_type: null
    length: null
    precision: null
    scale: null
    nullable: false
    unique: false
    check: null
    default_value: null
    comment: null
primary_key:
  name: null
  columns:
    - text: ID
foreign_keys: []
unique_keys: []
indexes: []
checks: []
comment: null
"#;
    let table: Table = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(table.id, TableId(3));
    assert_eq!(table.primary_key_columns(), &[Identifier::unquoted("ID")]);
    assert!(table.column_by_logical_name(&Identifier::unquoted("ID")).is_some());
    assert!(table.is_physical());
}
