//! Declarative list filtering: field specs, query normalization, presets,
//! predicate compilation, ordering and pagination.

pub mod compiler;
pub mod pagination;
pub mod params;
pub mod predicate;
pub mod presets;
pub mod search;
pub mod sort;
pub mod spec;

pub use compiler::{CompileContext, CompiledFilter, compile, compile_from, ids_predicate};
pub use pagination::{GroupKeyFn, Page, PageRequest, calculate_content_range, paginate, total_pages};
pub use params::{FilterValue, NormalizedValues, ParameterNormalizer, QueryParams};
pub use predicate::{Leaf, LeafOp, Predicate};
pub use presets::{PresetDefinition, PresetResolver};
pub use search::{
    MatchMode, SearchConfig, SearchHelpTextCache, ShardedTranslations, TranslationProvider,
};
pub use sort::{OrderKey, OrderingSpec, ResolvedOrdering, null_hiding_predicate, resolve_ordering};
pub use spec::{
    EntityFilters, EntityFiltersBuilder, FieldFilterSpec, FieldKind, FieldSpecBuilder,
    FilterRule, FilterSpecRegistry, Lookup, MultipleOperator, Selector, SelectorOperator,
};
