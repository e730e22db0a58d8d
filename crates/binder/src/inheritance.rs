// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Inheritance States
//!
//! One [`InheritanceState`] per entity, mapped superclass and embeddable,
//! built in a single walk over classes ordered supertypes first. The state
//! fixes the inheritance type of each class and its position in the
//! hierarchy, which the entity binder turns into an
//! [`InheritanceStrategy`] once and then dispatches on.

use std::cell::OnceCell;

use indexmap::IndexMap;
use ormbind_model::InheritanceType;
use ormbind_source::{names, Annotated, ClassDetails, MemberDetails, MemberKind};
use tracing::{debug, warn};

use crate::context::BindingContext;
use crate::error::{BindResult, MappingError};

/// Inheritance states by class name
pub type InheritanceStates = IndexMap<String, InheritanceState>;

/// Persistence role of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassCategory {
    Entity,
    MappedSuperclass,
    Embeddable,
}

impl ClassCategory {
    /// Category of a class; `None` for classes the binder does not map
    pub fn of(class: &ClassDetails) -> Option<Self> {
        if class.has_annotation(names::ENTITY) {
            Some(ClassCategory::Entity)
        } else if class.has_annotation(names::MAPPED_SUPERCLASS) {
            Some(ClassCategory::MappedSuperclass)
        } else if class.has_annotation(names::EMBEDDABLE) {
            Some(ClassCategory::Embeddable)
        } else {
            None
        }
    }
}

/// Where an entity sits in its hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyPosition {
    Root { has_subclasses: bool },
    Subclass { super_entity: String },
}

/// Inheritance strategy of one entity, selected once per entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InheritanceStrategy {
    /// A root without subclasses and without `@Inheritance`
    NoInheritance,
    SingleTable(HierarchyPosition),
    Joined(HierarchyPosition),
    TablePerClass(HierarchyPosition),
}

impl InheritanceStrategy {
    pub fn position(&self) -> Option<&HierarchyPosition> {
        match self {
            InheritanceStrategy::NoInheritance => None,
            InheritanceStrategy::SingleTable(position)
            | InheritanceStrategy::Joined(position)
            | InheritanceStrategy::TablePerClass(position) => Some(position),
        }
    }

    pub fn super_entity(&self) -> Option<&str> {
        match self.position() {
            Some(HierarchyPosition::Subclass { super_entity }) => Some(super_entity),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.super_entity().is_none()
    }

    /// Whether rows of the entity live in a table of its own
    pub fn has_own_table(&self) -> bool {
        !matches!(
            self,
            InheritanceStrategy::SingleTable(HierarchyPosition::Subclass { .. })
        )
    }

    pub fn inheritance_type(&self) -> Option<InheritanceType> {
        match self {
            InheritanceStrategy::NoInheritance => None,
            InheritanceStrategy::SingleTable(_) => Some(InheritanceType::SingleTable),
            InheritanceStrategy::Joined(_) => Some(InheritanceType::Joined),
            InheritanceStrategy::TablePerClass(_) => Some(InheritanceType::TablePerClass),
        }
    }
}

/// How persistent attributes are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Field,
    Property,
}

impl AccessType {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "FIELD" => Some(AccessType::Field),
            "PROPERTY" => Some(AccessType::Property),
            _ => None,
        }
    }

    fn member_kind(self) -> MemberKind {
        match self {
            AccessType::Field => MemberKind::Field,
            AccessType::Property => MemberKind::Getter,
        }
    }
}

/// A persistent attribute and the class declaring it
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub name: String,
    pub member: MemberDetails,
    pub declaring_class: String,
}

impl PropertyData {
    pub fn is_id(&self) -> bool {
        self.member.has_annotation(names::ID) || self.member.has_annotation(names::EMBEDDED_ID)
    }
}

/// Attributes an entity binds itself: those of its mapped superclasses,
/// top-down, then its own
#[derive(Debug, Clone, PartialEq)]
pub struct ElementsToProcess {
    pub properties: Vec<PropertyData>,
    pub access: AccessType,
    pub id_property_count: usize,
}

impl ElementsToProcess {
    pub fn id_properties(&self) -> impl Iterator<Item = &PropertyData> {
        self.properties.iter().filter(|p| p.is_id())
    }

    pub fn other_properties(&self) -> impl Iterator<Item = &PropertyData> {
        self.properties.iter().filter(|p| !p.is_id())
    }
}

/// Inheritance facts of one class
#[derive(Debug, Clone)]
pub struct InheritanceState {
    pub class_name: String,
    pub category: ClassCategory,
    /// Resolved type; `None` for a mapped superclass outside any hierarchy
    /// that declares none
    inheritance_type: Option<InheritanceType>,
    /// The class carries `@Inheritance` itself
    pub explicit_inheritance: bool,
    /// There is an entity above this class
    pub has_parents: bool,
    /// Some mapped class extends this class
    pub has_siblings: bool,
    pub is_embeddable_superclass: bool,
    /// Nearest supertype with a state
    pub superclass: Option<String>,
    pub super_entity: Option<String>,
    /// Mapped superclasses between this class and its super entity, top-down
    pub mapped_superclasses: Vec<String>,
    pub is_abstract: bool,
    elements: OnceCell<ElementsToProcess>,
}

impl InheritanceState {
    pub fn inheritance_type(&self) -> InheritanceType {
        self.inheritance_type.unwrap_or(InheritanceType::SingleTable)
    }

    /// Select the strategy the entity binder dispatches on
    pub fn strategy(&self) -> InheritanceStrategy {
        let position = match &self.super_entity {
            Some(super_entity) => HierarchyPosition::Subclass {
                super_entity: super_entity.clone(),
            },
            None => {
                if !self.has_siblings && !self.explicit_inheritance {
                    return InheritanceStrategy::NoInheritance;
                }
                HierarchyPosition::Root {
                    has_subclasses: self.has_siblings,
                }
            }
        };
        match self.inheritance_type() {
            InheritanceType::SingleTable => InheritanceStrategy::SingleTable(position),
            InheritanceType::Joined => InheritanceStrategy::Joined(position),
            InheritanceType::TablePerClass => InheritanceStrategy::TablePerClass(position),
        }
    }

    /// Persistent attributes of the class, computed on first use
    pub fn elements(&self, ctx: &BindingContext<'_>) -> BindResult<&ElementsToProcess> {
        if let Some(elements) = self.elements.get() {
            return Ok(elements);
        }
        let computed = self.collect_elements(ctx)?;
        Ok(self.elements.get_or_init(|| computed))
    }

    fn collect_elements(&self, ctx: &BindingContext<'_>) -> BindResult<ElementsToProcess> {
        let class = ctx.class(&self.class_name, &self.class_name)?;
        let access = self.determine_access(ctx, class)?;

        let mut declaring: Vec<&ClassDetails> = Vec::with_capacity(self.mapped_superclasses.len() + 1);
        for name in &self.mapped_superclasses {
            declaring.push(ctx.class(name, &self.class_name)?);
        }
        declaring.push(class);

        let mut properties: Vec<PropertyData> = Vec::new();
        for declaring_class in declaring {
            for member in declaring_class.attributes() {
                if member.has_annotation(names::TRANSIENT) {
                    continue;
                }
                let member_access = member
                    .annotation(names::ACCESS)
                    .and_then(|a| AccessType::parse(a.enum_value("value", "")));
                let included = match member_access {
                    Some(explicit) => explicit.member_kind() == member.kind,
                    None => member.kind == access.member_kind(),
                };
                if !included {
                    continue;
                }
                if properties.iter().any(|p| p.name == member.name) {
                    continue;
                }
                properties.push(PropertyData {
                    name: member.name.clone(),
                    member: member.clone(),
                    declaring_class: declaring_class.name.clone(),
                });
            }
        }

        let id_property_count = properties.iter().filter(|p| p.is_id()).count();
        debug!(
            class = %self.class_name,
            properties = properties.len(),
            ids = id_property_count,
            ?access,
            "Collected persistent attributes"
        );
        Ok(ElementsToProcess {
            properties,
            access,
            id_property_count,
        })
    }

    /// Access type: class-level `@Access`, else where the identifier is
    /// placed anywhere up the hierarchy, else field access
    fn determine_access(&self, ctx: &BindingContext<'_>, class: &ClassDetails) -> BindResult<AccessType> {
        let mut current = Some(class);
        while let Some(details) = current {
            if let Some(access) = details.annotation(names::ACCESS) {
                let value = access.enum_value("value", "FIELD");
                return AccessType::parse(value).ok_or_else(|| MappingError::AnnotationMisuse {
                    class: details.name.clone(),
                    annotation: names::ACCESS.to_string(),
                    reason: format!("unknown access type '{}'", value),
                });
            }
            let id_member = details.attributes().find(|m| {
                m.has_annotation(names::ID) || m.has_annotation(names::EMBEDDED_ID)
            });
            if let Some(member) = id_member {
                return Ok(match member.kind {
                    MemberKind::Getter => AccessType::Property,
                    _ => AccessType::Field,
                });
            }
            current = details
                .superclass
                .as_deref()
                .and_then(|name| ctx.source.class_details(name));
        }
        Ok(AccessType::Field)
    }
}

/// Build the states of `classes`, which must list supertypes first
pub fn build_inheritance_states(
    ctx: &BindingContext<'_>,
    classes: &[&ClassDetails],
) -> BindResult<InheritanceStates> {
    let mut states = InheritanceStates::new();

    for class in classes {
        let Some(category) = ClassCategory::of(class) else {
            continue;
        };

        let explicit = class.annotation(names::INHERITANCE);
        let declared_type = match explicit {
            Some(annotation) => {
                let strategy = annotation.enum_value("strategy", "SINGLE_TABLE");
                Some(InheritanceType::parse(strategy).ok_or_else(|| {
                    MappingError::AnnotationMisuse {
                        class: class.name.clone(),
                        annotation: names::INHERITANCE.to_string(),
                        reason: format!("unknown inheritance strategy '{}'", strategy),
                    }
                })?)
            }
            None => None,
        };

        let superclass = nearest_state(ctx, class, &states);
        let mut super_entity = None;
        let mut mapped_superclasses = Vec::new();
        let mut inherited_type = None;
        if let Some(super_name) = &superclass {
            if let Some(super_state) = states.get_mut(super_name) {
                super_state.has_siblings = true;
                inherited_type = super_state.inheritance_type;
            }
            let mut cursor = Some(super_name.clone());
            while let Some(name) = cursor {
                let Some(state) = states.get(&name) else { break };
                match state.category {
                    ClassCategory::Entity => {
                        super_entity = Some(name);
                        break;
                    }
                    ClassCategory::MappedSuperclass => mapped_superclasses.insert(0, name),
                    ClassCategory::Embeddable => {}
                }
                cursor = state.superclass.clone();
            }
        }

        let inheritance_type = match (inherited_type, declared_type) {
            (Some(inherited), Some(declared)) => {
                if inherited != declared {
                    warn!(
                        class = %class.name,
                        declared = %declared,
                        inherited = %inherited,
                        "Mixed inheritance strategies in one hierarchy, ignoring the subclass strategy"
                    );
                }
                Some(inherited)
            }
            (Some(inherited), None) => Some(inherited),
            (None, Some(declared)) => Some(declared),
            (None, None) if category == ClassCategory::MappedSuperclass => None,
            (None, None) => Some(InheritanceType::SingleTable),
        };

        debug!(
            class = %class.name,
            ?category,
            inheritance = ?inheritance_type,
            super_entity = ?super_entity,
            "Built inheritance state"
        );
        states.insert(
            class.name.clone(),
            InheritanceState {
                class_name: class.name.clone(),
                category,
                inheritance_type,
                explicit_inheritance: explicit.is_some(),
                has_parents: super_entity.is_some(),
                has_siblings: false,
                is_embeddable_superclass: category == ClassCategory::MappedSuperclass,
                superclass,
                super_entity,
                mapped_superclasses,
                is_abstract: class.is_abstract,
                elements: OnceCell::new(),
            },
        );
    }

    // Only entity subclasses make a root a hierarchy
    let entity_parents: Vec<String> = states
        .values()
        .filter(|s| s.category == ClassCategory::Entity)
        .filter_map(|s| s.super_entity.clone())
        .collect();
    for state in states.values_mut() {
        if state.category == ClassCategory::Entity {
            state.has_siblings = entity_parents.contains(&state.class_name);
        }
    }

    Ok(states)
}

/// Nearest supertype of `class` that already has a state
fn nearest_state(
    ctx: &BindingContext<'_>,
    class: &ClassDetails,
    states: &InheritanceStates,
) -> Option<String> {
    let mut current = class.superclass.clone();
    while let Some(name) = current {
        if states.contains_key(&name) {
            return Some(name);
        }
        current = ctx
            .source
            .class_details(&name)
            .and_then(|details| details.superclass.clone());
    }
    None
}
