// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Entity Binder
//!
//! Turns one `@Entity` class into a [`PersistentClass`] registered in the
//! collector. The caller binds supertypes first; everything that needs a
//! binding made later is queued as a second pass.
//!
//! ## Binding states
//!
//! ```text
//! New → EntityAnnotationBound → TableBound → InheritanceResolved
//!     → IdentifierResolved → Registered
//! ```
//!
//! | Step | Work | State reached |
//! |------|------|---------------|
//! | 1 | conflicting annotations | |
//! | 2 | names, proxy, locking, cache, filters | |
//! | 3 | `@Subselect` | `EntityAnnotationBound` |
//! | 4 | primary and secondary tables | |
//! | 5 | custom SQL and loader | |
//! | 6 | `@Synchronize`, `@Check` | `TableBound` |
//! | 7 | joined key or discriminator column | |
//! | 8 | discriminator value | `InheritanceResolved` |
//! | 9 | identifier, then the other attributes | `IdentifierResolved` |
//! | 10 | complementary tables, callbacks, registration, type binders | `Registered` |

use ormbind_model::{
    CacheConcurrency, CacheSettings, CustomSql, CustomSqlSet, ExecuteCheck, FilterConfiguration, Identifier, Loader,
    MappedSuperclass, OptimisticLockStyle, PersistentClass, PersistentClassKind, PolymorphismType, UniqueKey,
};
use ormbind_naming::{AttributePath, EntityNaming, ImplicitEntityNameSource};
use ormbind_source::{names, simple_name, Annotated, AnnotationUsage, ClassDetails};
use tracing::{debug, instrument, warn};

use crate::callbacks::resolve_callbacks;
use crate::collector::{EntityTableXref, MetadataCollector};
use crate::column::{collect_attribute_overrides, find_join};
use crate::config::SharedCacheMode;
use crate::context::BindingContext;
use crate::discriminator::{bind_discriminator_column, bind_discriminator_value};
use crate::error::{BindResult, MappingError};
use crate::foreign_key::{ForeignKeyTarget, PendingForeignKey};
use crate::identifier::bind_identifier;
use crate::inheritance::{ClassCategory, HierarchyPosition, InheritanceState, InheritanceStates, InheritanceStrategy};
use crate::join_column::{on_delete_action, AnnotatedJoinColumns};
use crate::property::{bind_property, PropertySite};
use crate::second_pass::SecondPass;
use crate::session::BootSession;
use crate::table::{apply_complementary_tables, bind_checks, bind_secondary_tables, bind_table, TableSpec};
use crate::type_binder::TypeBinder;

/// Progress of one entity through the binder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityBindingState {
    New,
    EntityAnnotationBound,
    TableBound,
    InheritanceResolved,
    IdentifierResolved,
    /// In the collector, with its first-pass work queued
    Registered,
}

impl EntityBindingState {
    /// The only state that may follow this one
    pub fn next(self) -> Option<Self> {
        match self {
            EntityBindingState::New => Some(EntityBindingState::EntityAnnotationBound),
            EntityBindingState::EntityAnnotationBound => Some(EntityBindingState::TableBound),
            EntityBindingState::TableBound => Some(EntityBindingState::InheritanceResolved),
            EntityBindingState::InheritanceResolved => Some(EntityBindingState::IdentifierResolved),
            EntityBindingState::IdentifierResolved => Some(EntityBindingState::Registered),
            EntityBindingState::Registered => None,
        }
    }
}

/// Entity-level facts read before the entity has a table
#[derive(Debug, Clone, Default)]
struct EntityFacts {
    jpa_entity_name: String,
    lazy: bool,
    proxy_interface: Option<String>,
    mutable: bool,
    dynamic_insert: bool,
    dynamic_update: bool,
    select_before_update: bool,
    batch_size: Option<u32>,
    where_clause: Option<String>,
    row_id: Option<String>,
    optimistic_lock: OptimisticLockStyle,
    polymorphism: PolymorphismType,
    cache: CacheSettings,
    natural_id_cache_region: Option<String>,
    filters: Vec<FilterConfiguration>,
}

impl EntityFacts {
    fn apply(self, entity: &mut PersistentClass) {
        entity.jpa_entity_name = self.jpa_entity_name;
        entity.lazy = self.lazy;
        entity.proxy_interface = self.proxy_interface;
        entity.mutable = self.mutable;
        entity.dynamic_insert = self.dynamic_insert;
        entity.dynamic_update = self.dynamic_update;
        entity.select_before_update = self.select_before_update;
        entity.batch_size = self.batch_size;
        entity.where_clause = self.where_clause;
        entity.row_id = self.row_id;
        entity.optimistic_lock = self.optimistic_lock;
        entity.polymorphism = self.polymorphism;
        entity.cache = self.cache;
        entity.natural_id_cache_region = self.natural_id_cache_region;
        entity.filters = self.filters;
    }
}

/// Annotation present and not switched off with `value = false`
fn flag(class: &ClassDetails, annotation: &str) -> bool {
    class
        .annotation(annotation)
        .is_some_and(|usage| usage.bool_or("value", true))
}

fn misuse(class: &ClassDetails, annotation: &str, reason: impl Into<String>) -> MappingError {
    MappingError::AnnotationMisuse {
        class: class.name.clone(),
        annotation: annotation.to_string(),
        reason: reason.into(),
    }
}

fn custom_sql_slot<'s>(set: &'s mut CustomSqlSet, annotation: &str) -> &'s mut Option<CustomSql> {
    match annotation {
        names::SQL_INSERT => &mut set.insert,
        names::SQL_UPDATE => &mut set.update,
        names::SQL_DELETE => &mut set.delete,
        _ => &mut set.delete_all,
    }
}

struct EntityBinder<'b, 'a> {
    ctx: BindingContext<'a>,
    class: &'b ClassDetails,
    state: &'b InheritanceState,
    strategy: InheritanceStrategy,
    binding_state: EntityBindingState,
}

/// Bind one entity class
///
/// # Errors
///
/// Annotation misuse, a missing identifier, or an assertion failure when a
/// supertype was not bound first.
#[instrument(skip_all, fields(class = %class.name))]
pub fn bind_entity(
    session: &mut BootSession<'_>,
    class: &ClassDetails,
    states: &InheritanceStates,
) -> BindResult<EntityBindingState> {
    let Some(state) = states.get(&class.name) else {
        return Err(MappingError::AssertionFailure {
            class: class.name.clone(),
            message: "no inheritance state was built for the class".to_string(),
        });
    };
    if state.category != ClassCategory::Entity {
        return Err(misuse(class, names::ENTITY, "only entities are bound by the entity binder"));
    }
    let ctx = session.context();
    let collector = &mut session.collector;
    let strategy = state.strategy();
    if let Some(super_entity) = strategy.super_entity() {
        if !collector.has_entity(super_entity) {
            return Err(MappingError::AssertionFailure {
                class: class.name.clone(),
                message: format!("super entity '{}' is not bound yet", super_entity),
            });
        }
    }

    let mut binder = EntityBinder {
        ctx,
        class,
        state,
        strategy,
        binding_state: EntityBindingState::New,
    };

    binder.validate()?;
    let facts = binder.entity_facts(collector)?;
    let subselect = binder.subselect();
    binder.advance_to(EntityBindingState::EntityAnnotationBound)?;

    let mut entity = binder.bind_tables(collector, facts, subselect)?;
    binder.bind_custom_sql(collector, &mut entity)?;
    binder.bind_synchronize_and_checks(collector, &mut entity);
    binder.advance_to(EntityBindingState::TableBound)?;

    binder.resolve_inheritance(collector, &mut entity)?;
    binder.bind_discriminator_value(collector, &mut entity)?;
    binder.advance_to(EntityBindingState::InheritanceResolved)?;

    binder.bind_attributes(collector, &mut entity)?;
    binder.advance_to(EntityBindingState::IdentifierResolved)?;

    binder.register(collector, entity)?;
    binder.advance_to(EntityBindingState::Registered)?;
    Ok(binder.binding_state)
}

impl EntityBinder<'_, '_> {
    fn advance_to(&mut self, next: EntityBindingState) -> BindResult<()> {
        if self.binding_state.next() != Some(next) {
            return Err(MappingError::AssertionFailure {
                class: self.class.name.clone(),
                message: format!("cannot move from {:?} to {:?}", self.binding_state, next),
            });
        }
        debug!(class = %self.class.name, from = ?self.binding_state, to = ?next, "Entity binding state");
        self.binding_state = next;
        Ok(())
    }

    // ---- step 1 ----

    fn validate(&self) -> BindResult<()> {
        let class = self.class;
        let conflicts = [
            (names::ENTITY, names::MAPPED_SUPERCLASS, class.has_annotation(names::MAPPED_SUPERCLASS)),
            (names::ENTITY, names::EMBEDDABLE, class.has_annotation(names::EMBEDDABLE)),
            (
                names::DYNAMIC_INSERT,
                names::SQL_INSERT,
                flag(class, names::DYNAMIC_INSERT) && class.has_annotation(names::SQL_INSERT),
            ),
            (
                names::DYNAMIC_UPDATE,
                names::SQL_UPDATE,
                flag(class, names::DYNAMIC_UPDATE) && class.has_annotation(names::SQL_UPDATE),
            ),
            (
                names::SQL_SELECT,
                names::LOADER,
                class.has_annotation(names::SQL_SELECT) && class.has_annotation(names::LOADER),
            ),
        ];
        for (first, second, conflicting) in conflicts {
            if conflicting {
                return Err(MappingError::ConflictingAnnotations {
                    class: class.name.clone(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
        Ok(())
    }

    // ---- steps 2 and 3 ----

    fn entity_facts(&self, collector: &MetadataCollector) -> BindResult<EntityFacts> {
        let class = self.class;
        let jpa_entity_name = class
            .annotation(names::ENTITY)
            .and_then(|e| e.string("name"))
            .unwrap_or_else(|| class.simple_name())
            .to_string();

        let proxy = class.annotation(names::PROXY);
        let lazy = proxy.is_none_or(|p| p.bool_or("lazy", true));
        let proxy_interface = lazy.then(|| {
            proxy
                .and_then(|p| p.class_ref("proxyClass"))
                .unwrap_or(&class.name)
                .to_string()
        });

        let dynamic_update = flag(class, names::DYNAMIC_UPDATE);
        let optimistic_lock = match class.annotation(names::OPTIMISTIC_LOCKING) {
            Some(usage) => {
                let text = usage.enum_value("type", "VERSION");
                let style = OptimisticLockStyle::parse(text).ok_or_else(|| {
                    misuse(class, names::OPTIMISTIC_LOCKING, format!("unknown locking type '{}'", text))
                })?;
                if matches!(style, OptimisticLockStyle::All | OptimisticLockStyle::Dirty) && !dynamic_update {
                    return Err(misuse(
                        class,
                        names::OPTIMISTIC_LOCKING,
                        format!("type {} requires @{}", text, names::DYNAMIC_UPDATE),
                    ));
                }
                style
            }
            None => OptimisticLockStyle::Version,
        };
        let polymorphism = match class.annotation(names::POLYMORPHISM).map(|p| p.enum_value("type", "IMPLICIT")) {
            Some("EXPLICIT") => PolymorphismType::Explicit,
            _ => PolymorphismType::Implicit,
        };

        let (cache, natural_id_cache_region) = match self.strategy.super_entity() {
            Some(super_entity) => {
                if class.has_annotation(names::CACHE) || class.has_annotation(names::CACHEABLE) {
                    warn!(
                        class = %class.name,
                        "Cache settings on an entity subclass are ignored; the hierarchy root decides"
                    );
                }
                let root = collector.root_entity(super_entity);
                (
                    root.map(|r| r.cache.clone()).unwrap_or_default(),
                    root.and_then(|r| r.natural_id_cache_region.clone()),
                )
            }
            None => (
                self.root_cache()?,
                class.annotation(names::NATURAL_ID_CACHE).map(|n| {
                    n.string("region")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{}##NaturalId", class.name))
                }),
            ),
        };

        let facts = EntityFacts {
            jpa_entity_name,
            lazy,
            proxy_interface,
            mutable: !class.has_annotation(names::IMMUTABLE),
            dynamic_insert: flag(class, names::DYNAMIC_INSERT),
            dynamic_update,
            select_before_update: flag(class, names::SELECT_BEFORE_UPDATE),
            batch_size: class
                .annotation(names::BATCH_SIZE)
                .and_then(|b| b.int("size"))
                .and_then(|size| u32::try_from(size).ok()),
            where_clause: class
                .annotation(names::SQL_RESTRICTION)
                .and_then(|r| r.string("value"))
                .or_else(|| class.annotation(names::WHERE).and_then(|w| w.string("clause")))
                .map(str::to_string),
            row_id: class
                .annotation(names::ROW_ID)
                .and_then(|r| r.string("value"))
                .map(str::to_string),
            optimistic_lock,
            polymorphism,
            cache,
            natural_id_cache_region,
            filters: self.filters(collector)?,
        };
        debug!(
            class = %class.name,
            jpa_name = %facts.jpa_entity_name,
            cached = facts.cache.enabled,
            filters = facts.filters.len(),
            "Bound entity facts"
        );
        Ok(facts)
    }

    fn root_cache(&self) -> BindResult<CacheSettings> {
        let class = self.class;
        let cacheable = class.annotation(names::CACHEABLE).map(|c| c.bool_or("value", true));
        let cache = class.annotation(names::CACHE);
        let enabled = match self.ctx.config.shared_cache_mode {
            SharedCacheMode::All => true,
            SharedCacheMode::None => false,
            SharedCacheMode::EnableSelective => cacheable.unwrap_or(cache.is_some()),
            SharedCacheMode::DisableSelective => cacheable.unwrap_or(true),
        };
        if !enabled {
            return Ok(CacheSettings::default());
        }
        let concurrency = match cache.and_then(|c| c.string("usage")) {
            Some(usage) => {
                let text = usage.rsplit('.').next().unwrap_or(usage);
                Some(CacheConcurrency::parse(text).ok_or_else(|| {
                    misuse(class, names::CACHE, format!("unknown cache concurrency '{}'", usage))
                })?)
            }
            None => self.ctx.config.default_cache_concurrency,
        };
        Ok(CacheSettings {
            enabled,
            concurrency,
            region: Some(
                cache
                    .and_then(|c| c.string("region"))
                    .unwrap_or(&class.name)
                    .to_string(),
            ),
            include_lazy: cache.is_none_or(|c| c.string_or_empty("include") != "non-lazy"),
        })
    }

    /// Filters of the class, then of its mapped superclasses nearest first;
    /// a filter name is applied once
    fn filters(&self, collector: &MetadataCollector) -> BindResult<Vec<FilterConfiguration>> {
        let mut chain = vec![self.class];
        for name in self.state.mapped_superclasses.iter().rev() {
            chain.push(self.ctx.class(name, &self.class.name)?);
        }
        let mut filters: Vec<FilterConfiguration> = Vec::new();
        for details in chain {
            for usage in details.repeated_annotations(names::FILTER, names::FILTERS) {
                let name = usage
                    .string("name")
                    .ok_or_else(|| misuse(details, names::FILTER, "'name' is required"))?;
                if filters.iter().any(|f| f.name == name) {
                    continue;
                }
                let condition = usage
                    .string("condition")
                    .map(str::to_string)
                    .or_else(|| {
                        collector
                            .filter_definition(name)
                            .and_then(|d| d.default_condition.clone())
                    })
                    .ok_or_else(|| MappingError::FilterWithoutCondition {
                        entity: self.class.name.clone(),
                        filter: name.to_string(),
                    })?;
                filters.push(FilterConfiguration {
                    name: name.to_string(),
                    condition,
                    deduce_alias_injection_points: usage.bool_or("deduceAliasInjectionPoints", true),
                });
            }
        }
        Ok(filters)
    }

    fn subselect(&self) -> Option<String> {
        self.class
            .annotation(names::SUBSELECT)
            .and_then(|s| s.string("value"))
            .map(str::to_string)
    }

    // ---- steps 4 to 6 ----

    fn bind_tables(
        &self,
        collector: &mut MetadataCollector,
        facts: EntityFacts,
        subselect: Option<String>,
    ) -> BindResult<PersistentClass> {
        let class = self.class;
        let ctx = &self.ctx;
        let spec = TableSpec::from_annotation(ctx, class.annotation(names::TABLE));
        let super_entity = self.strategy.super_entity().map(str::to_string);
        let kind = match &self.strategy {
            InheritanceStrategy::SingleTable(HierarchyPosition::Subclass { .. }) => {
                PersistentClassKind::SingleTableSubclass
            }
            InheritanceStrategy::Joined(HierarchyPosition::Subclass { .. }) => {
                PersistentClassKind::JoinedSubclass { key: None }
            }
            InheritanceStrategy::TablePerClass(HierarchyPosition::Subclass { .. }) => {
                PersistentClassKind::UnionSubclass
            }
            _ => PersistentClassKind::Root,
        };

        let table = if self.strategy.has_own_table() {
            let logical = match &spec.name {
                Some(name) => name.clone(),
                None => ctx.implicit_identifier(ctx.implicit_naming.determine_primary_table_name(
                    &ImplicitEntityNameSource {
                        entity_naming: EntityNaming::new(&class.name, &class.name, &facts.jpa_entity_name),
                    },
                )),
            };
            let included = match (&self.strategy, &super_entity) {
                (InheritanceStrategy::TablePerClass(_), Some(super_entity)) => {
                    collector.entity(super_entity).map(|s| s.table)
                }
                _ => None,
            };
            let table = bind_table(ctx, collector, &spec, &logical);
            let physical = collector.table_mut(table);
            physical.subselect = subselect.clone();
            if matches!(self.strategy, InheritanceStrategy::TablePerClass(_)) {
                // an abstract class of a union hierarchy has no rows of its own
                physical.is_abstract = class.is_abstract;
                physical.included_table = included;
            }
            if let Some(comment) = class.annotation(names::COMMENT).and_then(|c| c.string("value")) {
                physical.comment = Some(comment.to_string());
            }
            collector.add_entity_table_xref(&class.name, EntityTableXref::new(logical, table, super_entity.clone()));
            table
        } else {
            let Some(root) = super_entity.as_deref().and_then(|s| collector.root_entity(s)) else {
                return Err(MappingError::AssertionFailure {
                    class: class.name.clone(),
                    message: "single table subclass without a bound root".to_string(),
                });
            };
            let root_table = root.table;
            let root_logical = collector.table(root_table).logical_name.clone();
            if let Some(declared) = &spec.name {
                let physical = collector.table(root_table);
                if !physical.logical_name.matches(declared) && !physical.name.table.matches(declared) {
                    return Err(MappingError::InheritanceTableMismatch {
                        entity: class.name.clone(),
                        declared: declared.to_string(),
                        root_table: root_logical.to_string(),
                    });
                }
            }
            collector.add_entity_table_xref(
                &class.name,
                EntityTableXref::new(root_logical, root_table, super_entity.clone()),
            );
            root_table
        };

        let mut entity = PersistentClass::new(&class.name, &facts.jpa_entity_name, kind, table);
        facts.apply(&mut entity);
        entity.superclass = super_entity;
        entity.inheritance_type = self.strategy.inheritance_type();
        entity.is_abstract = class.is_abstract;
        entity.subselect = subselect;
        bind_secondary_tables(ctx, collector, &mut entity, class)?;
        debug!(entity = %entity.entity_name, table = %collector.table(table).name, "Bound entity tables");
        Ok(entity)
    }

    /// One custom DML annotation and the join it targets, `None` for the
    /// primary table
    fn custom_sql(
        &self,
        collector: &MetadataCollector,
        entity: &PersistentClass,
        usage: &AnnotationUsage,
    ) -> BindResult<(Option<usize>, CustomSql)> {
        let sql = usage
            .string("sql")
            .ok_or_else(|| misuse(self.class, &usage.name, "'sql' is required"))?;
        let check_text = usage.enum_value("check", "NONE");
        let check = ExecuteCheck::parse(check_text)
            .ok_or_else(|| misuse(self.class, &usage.name, format!("unknown result check '{}'", check_text)))?;
        let join = match usage.string("table").and_then(|t| self.ctx.identifier(t)) {
            None => None,
            Some(name) => {
                let primary = collector.table(entity.table);
                if primary.logical_name.matches(&name) || primary.name.table.matches(&name) {
                    None
                } else {
                    Some(find_join(collector, entity, &name).ok_or_else(|| {
                        MappingError::UnknownSecondaryTable {
                            entity: entity.entity_name.clone(),
                            table: name.to_string(),
                        }
                    })?)
                }
            }
        };
        Ok((
            join,
            CustomSql {
                sql: sql.to_string(),
                callable: usage.bool_or("callable", false),
                check,
            },
        ))
    }

    fn bind_custom_sql(&self, collector: &MetadataCollector, entity: &mut PersistentClass) -> BindResult<()> {
        for annotation in [names::SQL_INSERT, names::SQL_UPDATE, names::SQL_DELETE, names::SQL_DELETE_ALL] {
            for usage in self.class.annotations().iter().filter(|a| a.name == annotation) {
                let (join, sql) = self.custom_sql(collector, entity, usage)?;
                let target = match join {
                    Some(index) => &mut entity.joins[index].custom_sql,
                    None => &mut entity.custom_sql,
                };
                *custom_sql_slot(target, annotation) = Some(sql);
            }
        }

        if let Some(select) = self.class.annotation(names::SQL_SELECT) {
            let sql = select
                .string("sql")
                .ok_or_else(|| misuse(self.class, names::SQL_SELECT, "'sql' is required"))?;
            entity.loader = Some(Loader::Sql(sql.to_string()));
        } else if let Some(loader) = self.class.annotation(names::LOADER) {
            let query = loader
                .string("namedQuery")
                .ok_or_else(|| misuse(self.class, names::LOADER, "'namedQuery' is required"))?;
            entity.loader = Some(Loader::NamedQuery(query.to_string()));
        }
        Ok(())
    }

    fn bind_synchronize_and_checks(&self, collector: &mut MetadataCollector, entity: &mut PersistentClass) {
        if let Some(synchronize) = self.class.annotation(names::SYNCHRONIZE) {
            entity.synchronized_tables = synchronize
                .string_list("value")
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        bind_checks(collector, entity.table, self.class);
    }

    // ---- steps 7 and 8 ----

    fn resolve_inheritance(&self, collector: &mut MetadataCollector, entity: &mut PersistentClass) -> BindResult<()> {
        let class = self.class;
        let pk_join_columns = class.repeated_annotations(names::PRIMARY_KEY_JOIN_COLUMN, names::PRIMARY_KEY_JOIN_COLUMNS);

        match &self.strategy {
            InheritanceStrategy::Joined(HierarchyPosition::Subclass { super_entity }) => {
                let mut join_columns = AnnotatedJoinColumns::for_primary_key_join(
                    &self.ctx,
                    &entity.entity_name,
                    &pk_join_columns,
                    class.annotation(names::FOREIGN_KEY),
                );
                join_columns.on_delete = on_delete_action(class, &entity.entity_name)?;
                debug!(
                    entity = %entity.entity_name,
                    super_entity = %super_entity,
                    explicit_columns = pk_join_columns.len(),
                    "Queued joined subclass key"
                );
                collector.add_second_pass(SecondPass::ForeignKey(PendingForeignKey {
                    entity: entity.entity_name.clone(),
                    target: ForeignKeyTarget::JoinedSubclassKey { join_columns },
                }));
                collector.add_second_pass(SecondPass::CreateKey {
                    entity: entity.entity_name.clone(),
                });
            }
            strategy => {
                if !strategy.is_root() {
                    if let Some(annotation) = [names::PRIMARY_KEY_JOIN_COLUMN, names::PRIMARY_KEY_JOIN_COLUMNS, names::ON_DELETE]
                        .into_iter()
                        .find(|a| class.has_annotation(a))
                    {
                        return Err(misuse(class, annotation, "only a JOINED subclass is joined to its supertype"));
                    }
                }
                if strategy.has_own_table() {
                    collector.add_second_pass(SecondPass::CreateKey {
                        entity: entity.entity_name.clone(),
                    });
                }
            }
        }
        bind_discriminator_column(&self.ctx, collector, entity, class, &self.strategy)
    }

    fn bind_discriminator_value(&self, collector: &MetadataCollector, entity: &mut PersistentClass) -> BindResult<()> {
        let discriminator = match self.strategy.super_entity() {
            None => entity.discriminator.as_ref(),
            Some(super_entity) => collector
                .root_entity(super_entity)
                .and_then(|root| root.discriminator.as_ref()),
        };
        let discriminator_type = discriminator.map(|d| d.discriminator_type);
        bind_discriminator_value(entity, self.class, discriminator_type)
    }

    // ---- step 9 ----

    fn bind_attributes(&self, collector: &mut MetadataCollector, entity: &mut PersistentClass) -> BindResult<()> {
        let ctx = &self.ctx;
        bind_identifier(ctx, collector, entity, self.class, self.state, &self.strategy)?;

        let elements = self.state.elements(ctx)?;
        let overrides = collect_attribute_overrides(self.class, None);
        for data in elements.other_properties() {
            let site = PropertySite {
                member: &data.member,
                declaring_class: &data.declaring_class,
                path: AttributePath::parse(&data.name),
                overrides: &overrides,
                key: false,
            };
            let property = bind_property(ctx, collector, entity, &site)?;
            if data.member.has_annotation(names::VERSION) {
                if !self.strategy.is_root() {
                    return Err(misuse(self.class, names::VERSION, "only the hierarchy root declares the version"));
                }
                if let Some(existing) = &entity.version_property {
                    return Err(misuse(
                        self.class,
                        names::VERSION,
                        format!("'{}' and '{}' are both versions", existing, data.name),
                    ));
                }
                entity.version_property = Some(data.name.clone());
            }
            entity.properties.push(property);
        }

        let natural_id_columns: Vec<Identifier> = entity
            .properties
            .iter()
            .filter(|p| p.natural_id && p.join.is_none())
            .flat_map(|p| p.value.column_names())
            .collect();
        if !natural_id_columns.is_empty() {
            let table = collector.table_mut(entity.table);
            if !table.unique_keys.iter().any(|uk| uk.columns == natural_id_columns) {
                table.unique_keys.push(UniqueKey {
                    name: None,
                    columns: natural_id_columns,
                });
            }
        }

        for name in &self.state.mapped_superclasses {
            if collector.mapped_superclass(name).is_none() {
                collector.add_mapped_superclass(MappedSuperclass {
                    class_name: name.clone(),
                    super_entity: self.state.super_entity.clone(),
                    declared_properties: elements
                        .properties
                        .iter()
                        .filter(|p| &p.declaring_class == name)
                        .map(|p| p.name.clone())
                        .collect(),
                });
            }
        }
        debug!(
            entity = %entity.entity_name,
            properties = entity.properties.len(),
            version = ?entity.version_property,
            "Bound attributes"
        );
        Ok(())
    }

    // ---- step 10 ----

    fn register(&self, collector: &mut MetadataCollector, mut entity: PersistentClass) -> BindResult<()> {
        let class = self.class;
        apply_complementary_tables(&self.ctx, collector, &entity, class)?;
        entity.callbacks = resolve_callbacks(&self.ctx, class)?;
        let binders = self.type_binders()?;

        let entity_name = entity.entity_name.clone();
        let has_secondary_tables = !entity.joins.is_empty();
        collector.add_import(entity.jpa_entity_name.clone(), entity_name.clone())?;
        collector.add_entity_binding(entity)?;
        if has_secondary_tables {
            collector.add_second_pass(SecondPass::SecondaryTableFromAnnotation {
                entity: entity_name.clone(),
            });
            collector.add_second_pass(SecondPass::SecondaryTable {
                entity: entity_name.clone(),
            });
        }

        if let Some(registered) = collector.entity_mut(&entity_name) {
            for (usage, binder) in binders {
                binder.bind(usage, class, registered)?;
            }
        }
        Ok(())
    }

    /// Registered binders for the class annotations whose type carries
    /// `@TypeBinderType`
    fn type_binders(&self) -> BindResult<Vec<(&AnnotationUsage, &dyn TypeBinder)>> {
        let mut binders = Vec::new();
        for usage in self.class.annotations() {
            let Some(meta) = self
                .ctx
                .source
                .annotation_type(&usage.name)
                .and_then(|t| t.annotation(names::TYPE_BINDER_TYPE))
            else {
                continue;
            };
            let Some(binder_name) = meta.class_ref("binder") else {
                continue;
            };
            let binder = self
                .ctx
                .type_binders
                .get(binder_name)
                .ok_or_else(|| MappingError::UnknownTypeBinder {
                    class: self.class.name.clone(),
                    annotation: simple_name(&usage.name).to_string(),
                    binder: binder_name.to_string(),
                })?;
            binders.push((usage, binder));
        }
        Ok(binders)
    }
}
