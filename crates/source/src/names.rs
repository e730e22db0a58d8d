// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Names of the annotations understood by the binder.

// Class categories
pub const ENTITY: &str = "Entity";
pub const MAPPED_SUPERCLASS: &str = "MappedSuperclass";
pub const EMBEDDABLE: &str = "Embeddable";

// Tables
pub const TABLE: &str = "Table";
pub const SECONDARY_TABLE: &str = "SecondaryTable";
pub const SECONDARY_TABLES: &str = "SecondaryTables";
pub const SECONDARY_ROW: &str = "SecondaryRow";
pub const SECONDARY_ROWS: &str = "SecondaryRows";
pub const TABLE_OPTIONS: &str = "TableOptions";
pub const TABLE_OPTIONS_LIST: &str = "TableOptionsList";
pub const SUBSELECT: &str = "Subselect";
pub const SYNCHRONIZE: &str = "Synchronize";
pub const CHECK: &str = "Check";
pub const COMMENT: &str = "Comment";
pub const UNIQUE_CONSTRAINT: &str = "UniqueConstraint";
pub const INDEX: &str = "Index";

// Inheritance
pub const INHERITANCE: &str = "Inheritance";
pub const DISCRIMINATOR_COLUMN: &str = "DiscriminatorColumn";
pub const DISCRIMINATOR_FORMULA: &str = "DiscriminatorFormula";
pub const DISCRIMINATOR_VALUE: &str = "DiscriminatorValue";
pub const DISCRIMINATOR_OPTIONS: &str = "DiscriminatorOptions";
pub const PRIMARY_KEY_JOIN_COLUMN: &str = "PrimaryKeyJoinColumn";
pub const PRIMARY_KEY_JOIN_COLUMNS: &str = "PrimaryKeyJoinColumns";
pub const ON_DELETE: &str = "OnDelete";

// Identifiers
pub const ID: &str = "Id";
pub const EMBEDDED_ID: &str = "EmbeddedId";
pub const ID_CLASS: &str = "IdClass";
pub const GENERATED_VALUE: &str = "GeneratedValue";
pub const SEQUENCE_GENERATOR: &str = "SequenceGenerator";
pub const SEQUENCE_GENERATORS: &str = "SequenceGenerators";
pub const TABLE_GENERATOR: &str = "TableGenerator";
pub const TABLE_GENERATORS: &str = "TableGenerators";
pub const GENERIC_GENERATOR: &str = "GenericGenerator";
pub const GENERIC_GENERATORS: &str = "GenericGenerators";
pub const MAPS_ID: &str = "MapsId";

// Basic properties
pub const ACCESS: &str = "Access";
pub const BASIC: &str = "Basic";
pub const COLUMN: &str = "Column";
pub const COLUMNS: &str = "Columns";
pub const FORMULA: &str = "Formula";
pub const TRANSIENT: &str = "Transient";
pub const VERSION: &str = "Version";
pub const NATURAL_ID: &str = "NaturalId";
pub const OPTIMISTIC_LOCK: &str = "OptimisticLock";
pub const EMBEDDED: &str = "Embedded";
pub const ATTRIBUTE_OVERRIDE: &str = "AttributeOverride";
pub const ATTRIBUTE_OVERRIDES: &str = "AttributeOverrides";

// Associations
pub const MANY_TO_ONE: &str = "ManyToOne";
pub const ONE_TO_ONE: &str = "OneToOne";
pub const ONE_TO_MANY: &str = "OneToMany";
pub const MANY_TO_MANY: &str = "ManyToMany";
pub const JOIN_COLUMN: &str = "JoinColumn";
pub const JOIN_COLUMNS: &str = "JoinColumns";
pub const JOIN_COLUMN_OR_FORMULA: &str = "JoinColumnOrFormula";
pub const JOIN_COLUMNS_OR_FORMULAS: &str = "JoinColumnsOrFormulas";
pub const JOIN_FORMULA: &str = "JoinFormula";
pub const JOIN_TABLE: &str = "JoinTable";
pub const FOREIGN_KEY: &str = "ForeignKey";
pub const ORDER_BY: &str = "OrderBy";

// Entity behaviour
pub const CACHEABLE: &str = "Cacheable";
pub const CACHE: &str = "Cache";
pub const NATURAL_ID_CACHE: &str = "NaturalIdCache";
pub const IMMUTABLE: &str = "Immutable";
pub const DYNAMIC_INSERT: &str = "DynamicInsert";
pub const DYNAMIC_UPDATE: &str = "DynamicUpdate";
pub const SELECT_BEFORE_UPDATE: &str = "SelectBeforeUpdate";
pub const OPTIMISTIC_LOCKING: &str = "OptimisticLocking";
pub const POLYMORPHISM: &str = "Polymorphism";
pub const PROXY: &str = "Proxy";
pub const BATCH_SIZE: &str = "BatchSize";
pub const WHERE: &str = "Where";
pub const SQL_RESTRICTION: &str = "SQLRestriction";
pub const ROW_ID: &str = "RowId";

// Custom SQL
pub const SQL_INSERT: &str = "SQLInsert";
pub const SQL_UPDATE: &str = "SQLUpdate";
pub const SQL_DELETE: &str = "SQLDelete";
pub const SQL_DELETE_ALL: &str = "SQLDeleteAll";
pub const SQL_SELECT: &str = "SQLSelect";
pub const LOADER: &str = "Loader";

// Filters and fetching
pub const FILTER: &str = "Filter";
pub const FILTERS: &str = "Filters";
pub const FILTER_DEF: &str = "FilterDef";
pub const FILTER_DEFS: &str = "FilterDefs";
pub const FETCH_PROFILE: &str = "FetchProfile";
pub const FETCH_PROFILES: &str = "FetchProfiles";

// Hierarchy-wide registrations
pub const NAMED_QUERY: &str = "NamedQuery";
pub const NAMED_QUERIES: &str = "NamedQueries";
pub const NAMED_NATIVE_QUERY: &str = "NamedNativeQuery";
pub const NAMED_NATIVE_QUERIES: &str = "NamedNativeQueries";
pub const TYPE_REGISTRATION: &str = "TypeRegistration";
pub const TYPE_REGISTRATIONS: &str = "TypeRegistrations";
pub const IMPORTED: &str = "Imported";

// Callbacks and extensions
pub const ENTITY_LISTENERS: &str = "EntityListeners";
pub const EXCLUDE_SUPERCLASS_LISTENERS: &str = "ExcludeSuperclassListeners";
pub const TYPE_BINDER_TYPE: &str = "TypeBinderType";
