// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Annotated class fixtures

use ormbind_source::{names, AnnotationUsage, ClassDetails, MemberDetails, StaticAnnotationSource};

/// Sample annotated domains for binder tests
pub struct MappingFixtures;

impl MappingFixtures {
    // ===== Building blocks =====

    /// Class annotated `@Entity`
    pub fn entity(name: &str) -> ClassDetails {
        ClassDetails::new(name).with_annotation(AnnotationUsage::new(names::ENTITY))
    }

    /// `@Id` field
    pub fn id(name: &str, type_name: &str) -> MemberDetails {
        MemberDetails::field(name, type_name).with_annotation(AnnotationUsage::new(names::ID))
    }

    /// Plain basic field
    pub fn basic(name: &str, type_name: &str) -> MemberDetails {
        MemberDetails::field(name, type_name)
    }

    /// `@ManyToOne` field joined through one named column
    pub fn many_to_one(name: &str, target: &str, column: &str) -> MemberDetails {
        MemberDetails::field(name, target)
            .with_annotation(AnnotationUsage::new(names::MANY_TO_ONE))
            .with_annotation(AnnotationUsage::new(names::JOIN_COLUMN).with("name", column))
    }

    /// `@OneToMany(mappedBy)` set
    pub fn one_to_many_mapped_by(name: &str, target: &str, mapped_by: &str) -> MemberDetails {
        MemberDetails::field(name, format!("java.util.Set<{}>", target))
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY).with("mappedBy", mapped_by))
    }

    // ===== Domains =====

    /// `Order` 1..n `OrderLine` n..1 `Product`
    ///
    /// `OrderLine.order` joins through `ORDER_ID`; `Order.lines` is the
    /// inverse side.
    pub fn order_domain() -> StaticAnnotationSource {
        StaticAnnotationSource::new()
            .with_class(
                Self::entity("com.acme.Order")
                    .with_annotation(AnnotationUsage::new(names::TABLE).with("name", "orders"))
                    .with_member(Self::id("id", "long"))
                    .with_member(Self::basic("placedAt", "java.time.Instant"))
                    .with_member(Self::one_to_many_mapped_by("lines", "com.acme.OrderLine", "order")),
            )
            .with_class(
                Self::entity("com.acme.OrderLine")
                    .with_member(Self::id("id", "long"))
                    .with_member(Self::basic("quantity", "int"))
                    .with_member(Self::many_to_one("order", "com.acme.Order", "ORDER_ID"))
                    .with_member(
                        MemberDetails::field("product", "com.acme.Product")
                            .with_annotation(AnnotationUsage::new(names::MANY_TO_ONE)),
                    ),
            )
            .with_class(
                Self::entity("com.acme.Product")
                    .with_member(Self::id("sku", "String"))
                    .with_member(Self::basic("name", "String")),
            )
    }

    /// The order domain as a YAML document
    pub const fn order_domain_yaml() -> &'static str {
        r#"
classes:
  - name: com.acme.Order
    annotations:
      - name: Entity
      - name: Table
        attributes: { name: orders }
    members:
      - name: id
        type_name: long
        annotations:
          - name: Id
      - name: placedAt
        type_name: java.time.Instant
      - name: lines
        type_name: java.util.Set<com.acme.OrderLine>
        annotations:
          - name: OneToMany
            attributes: { mappedBy: order }
  - name: com.acme.OrderLine
    annotations:
      - name: Entity
    members:
      - name: id
        type_name: long
        annotations:
          - name: Id
      - name: quantity
        type_name: int
      - name: order
        type_name: com.acme.Order
        annotations:
          - name: ManyToOne
          - name: JoinColumn
            attributes: { name: ORDER_ID }
      - name: product
        type_name: com.acme.Product
        annotations:
          - name: ManyToOne
  - name: com.acme.Product
    annotations:
      - name: Entity
    members:
      - name: sku
        type_name: String
        annotations:
          - name: Id
      - name: name
        type_name: String
"#
    }

    /// SINGLE_TABLE hierarchy `Animal` ← `Dog`, `Cat`
    ///
    /// The root declares `@DiscriminatorColumn(name = "KIND")`; `cat` is
    /// extra annotations for `Cat`.
    pub fn animals_single_table(cat: Vec<AnnotationUsage>) -> StaticAnnotationSource {
        let mut cat_class = Self::entity("Cat")
            .with_superclass("Animal")
            .with_member(Self::basic("indoor", "boolean"));
        for annotation in cat {
            cat_class = cat_class.with_annotation(annotation);
        }
        StaticAnnotationSource::new()
            .with_class(
                Self::entity("Animal")
                    .with_annotation(AnnotationUsage::new(names::INHERITANCE).with("strategy", "SINGLE_TABLE"))
                    .with_annotation(AnnotationUsage::new(names::DISCRIMINATOR_COLUMN).with("name", "KIND"))
                    .with_member(Self::id("id", "long"))
                    .with_member(Self::basic("name", "String")),
            )
            .with_class(
                Self::entity("Dog")
                    .with_superclass("Animal")
                    .with_member(Self::basic("breed", "String")),
            )
            .with_class(cat_class)
    }

    /// A root entity with no subclasses and no discriminator annotations
    pub fn lone_root() -> StaticAnnotationSource {
        StaticAnnotationSource::new().with_class(
            Self::entity("Invoice")
                .with_annotation(AnnotationUsage::new(names::INHERITANCE).with("strategy", "SINGLE_TABLE"))
                .with_member(Self::id("id", "long"))
                .with_member(Self::basic("amount", "java.math.BigDecimal")),
        )
    }

    /// Root with a discriminator of `discriminator_type` and no
    /// `@DiscriminatorValue`; its subclass declares `T`
    pub fn typed_discriminator(discriminator_type: &str) -> StaticAnnotationSource {
        StaticAnnotationSource::new()
            .with_class(
                Self::entity("Vehicle")
                    .with_annotation(AnnotationUsage::new(names::INHERITANCE).with("strategy", "SINGLE_TABLE"))
                    .with_annotation(
                        AnnotationUsage::new(names::DISCRIMINATOR_COLUMN).with("discriminatorType", discriminator_type),
                    )
                    .with_member(Self::id("id", "long")),
            )
            .with_class(
                Self::entity("Truck")
                    .with_superclass("Vehicle")
                    .with_annotation(AnnotationUsage::new(names::DISCRIMINATOR_VALUE).with("value", "T")),
            )
    }

    /// JOINED hierarchy `Payment` ← `CardPayment`
    ///
    /// The root's id is `paymentId`; the subclass declares no
    /// `@PrimaryKeyJoinColumn`.
    pub fn payments_joined() -> StaticAnnotationSource {
        StaticAnnotationSource::new()
            .with_class(
                Self::entity("Payment")
                    .with_annotation(AnnotationUsage::new(names::INHERITANCE).with("strategy", "JOINED"))
                    .with_member(Self::id("paymentId", "long"))
                    .with_member(Self::basic("amount", "java.math.BigDecimal")),
            )
            .with_class(
                Self::entity("CardPayment")
                    .with_superclass("Payment")
                    .with_member(Self::basic("cardNumber", "String")),
            )
    }

    /// `Enrollment` with `@IdClass(EnrollmentId)`
    ///
    /// The entity's `@Id` attributes are `student` and `course`; the id
    /// class declares `id_class_attributes`.
    pub fn id_class_domain(id_class_attributes: &[&str]) -> StaticAnnotationSource {
        let mut id_class = ClassDetails::new("EnrollmentId");
        for name in id_class_attributes {
            id_class = id_class.with_member(Self::basic(name, "long"));
        }
        StaticAnnotationSource::new()
            .with_class(
                Self::entity("Enrollment")
                    .with_annotation(AnnotationUsage::new(names::ID_CLASS).with("value", "EnrollmentId"))
                    .with_member(Self::id("student", "long"))
                    .with_member(Self::id("course", "long"))
                    .with_member(Self::basic("grade", "String")),
            )
            .with_class(id_class)
    }

    /// SINGLE_TABLE root with `subclasses` direct subclasses of a few
    /// attributes each
    pub fn wide_hierarchy(subclasses: usize) -> StaticAnnotationSource {
        let mut source = StaticAnnotationSource::new().with_class(
            Self::entity("Document")
                .with_member(Self::id("id", "long"))
                .with_member(Self::basic("title", "String"))
                .with_member(Self::basic("createdAt", "java.time.Instant")),
        );
        for index in 0..subclasses {
            source = source.with_class(
                Self::entity(&format!("Document{}", index))
                    .with_superclass("Document")
                    .with_member(Self::basic(&format!("field{}A", index), "String"))
                    .with_member(Self::basic(&format!("field{}B", index), "int")),
            );
        }
        source
    }
}
