//! Declarative filtering, ordering and pagination for list endpoints.
//!
//! Each listed entity declares its filter fields, presets, allowed orderings
//! and search once in an [`EntityFilters`]. A [`ListEngine`] turns any query
//! string into a predicate, an ordering and a page of results from a
//! [`DataStore`], and [`list_router`] serves that over axum.

pub mod config;
pub mod errors;
pub mod filtering;
pub mod listing;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod store;

pub use config::ListConfig;
pub use errors::{ApiError, ConfigError};
pub use filtering::{
    EntityFilters, FieldFilterSpec, FieldKind, FilterSpecRegistry, FilterValue, MatchMode,
    MultipleOperator, OrderingSpec, PresetDefinition, SearchConfig, SelectorOperator,
};
pub use listing::{ListEngine, ListOutcome, ListRequest, PreparedList};
pub use models::{ListParams, ListResponse, PageMeta, PresetSummary};
pub use permissions::{Caller, CapabilityOracle, PermissionOracle};
pub use routes::{ListService, list_router};
pub use store::{CompiledQuery, DataStore, SeaOrmStore};
