//! # Listing pipeline
//!
//! [`ListEngine`] runs one list request end to end:
//!
//! 1. normalize the raw query against the entity's field specs,
//! 2. apply the requested preset, if the caller may see it,
//! 3. compile the filter predicate (the generic `ids` filter first),
//! 4. resolve the ordering, with the permission bypass,
//! 5. hide nulls under a single ascending key when other filters are active,
//! 6. paginate against the data store.
//!
//! Every step but the last is synchronous and pure; [`ListEngine::prepare`]
//! exposes them on their own. The engine holds no per-request state and is
//! shared between requests behind an `Arc`.

use sea_orm::DbErr;
use std::sync::Arc;

use crate::config::ListConfig;
use crate::filtering::compiler::{CompileContext, CompiledFilter, compile_from, ids_predicate};
use crate::filtering::pagination::{GroupKeyFn, Page, PageRequest, paginate};
use crate::filtering::params::{NormalizedValues, ParameterNormalizer, QueryParams};
use crate::filtering::predicate::Predicate;
use crate::filtering::presets::PresetResolver;
use crate::filtering::search::{SearchHelpTextCache, ShardedTranslations, TranslationProvider};
use crate::filtering::sort::{ResolvedOrdering, null_hiding_predicate, resolve_ordering};
use crate::filtering::spec::EntityFilters;
use crate::models::{ListParams, PageMeta, PresetSummary};
use crate::permissions::{CapabilityOracle, Caller, PermissionOracle};
use crate::store::{CompiledQuery, DataStore};

/// One list request: the raw query, an optional preset slug from the path, and the caller.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub params: QueryParams,
    pub preset: Option<String>,
    pub caller: Caller,
}

impl ListRequest {
    #[must_use]
    pub fn new(params: QueryParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        Self::new(QueryParams::from_query_string(query))
    }

    #[must_use]
    pub fn with_preset(mut self, slug: impl Into<String>) -> Self {
        self.preset = Some(slug.into());
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = caller;
        self
    }
}

/// Result of every step before pagination.
#[derive(Debug, Clone)]
pub struct PreparedList {
    pub params: ListParams,
    /// Filter values after the preset was applied
    pub values: NormalizedValues,
    pub applied_preset: Option<String>,
    pub canonical_preset: Option<String>,
    pub visible_presets: Vec<PresetSummary>,
    pub filter: CompiledFilter,
    /// Active filters, the `ids` filter included
    pub active_filters: usize,
    pub ordering: ResolvedOrdering,
    pub query: CompiledQuery,
    pub page_request: PageRequest,
}

#[derive(Debug, Clone)]
pub struct ListOutcome<T> {
    pub page: Page<T>,
    pub prepared: PreparedList,
    pub search_help_text: Option<Arc<str>>,
}

impl<T> ListOutcome<T> {
    #[must_use]
    pub fn meta(&self) -> PageMeta {
        let prepared = &self.prepared;
        PageMeta {
            total_results: self.page.total_results,
            total_pages: self.page.total_pages,
            page: self.page.page_index.saturating_add(1),
            page_size: self.page.page_size,
            is_last_page: self.page.is_last_page,
            ordering: prepared.ordering.keys.iter().map(ToString::to_string).collect(),
            reverse_order: prepared.ordering.reverse,
            is_default_ordering: prepared.ordering.is_default,
            relevant_fields: prepared.ordering.relevant_fields.clone(),
            group_headers: self.page.group_headers.clone(),
            active_filters: prepared.active_filters,
            preset: prepared.applied_preset.clone(),
            canonical_preset: prepared.canonical_preset.clone(),
            presets: prepared.visible_presets.clone(),
            search_help_text: self.search_help_text.as_deref().map(str::to_string),
        }
    }
}

pub struct ListEngine {
    config: ListConfig,
    normalizer: ParameterNormalizer,
    permissions: Arc<dyn PermissionOracle>,
    translations: Arc<dyn TranslationProvider>,
    help_texts: SearchHelpTextCache,
}

impl Default for ListEngine {
    fn default() -> Self {
        Self::new(ListConfig::default())
    }
}

impl ListEngine {
    #[must_use]
    pub fn new(config: ListConfig) -> Self {
        Self {
            normalizer: ParameterNormalizer::new(config.csv_separator),
            config,
            permissions: Arc::new(CapabilityOracle),
            translations: Arc::new(ShardedTranslations::default()),
            help_texts: SearchHelpTextCache::new(),
        }
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionOracle>) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn with_translations(mut self, translations: Arc<dyn TranslationProvider>) -> Self {
        self.translations = translations;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    #[must_use]
    pub fn normalizer(&self) -> ParameterNormalizer {
        self.normalizer
    }

    /// Run every step up to, but excluding, the data-store calls.
    #[must_use]
    pub fn prepare(&self, entity: &EntityFilters, request: &ListRequest) -> PreparedList {
        let params = ListParams::from_query(&request.params);
        let caller = &request.caller;

        let resolver = PresetResolver::new(entity, self.normalizer);
        let visible = resolver.visible(caller, self.permissions.as_ref());
        let mut values = self.normalizer.normalize(entity, &request.params);

        let applied_preset = request.preset.as_deref().and_then(|slug| {
            let found = visible.iter().find(|preset| preset.slug == slug);
            if found.is_none() {
                tracing::debug!(entity = entity.name(), slug, "Unknown or hidden preset, listing without it");
            }
            found.map(|preset| preset.slug.clone())
        });
        if let Some(slug) = &applied_preset {
            values = resolver.apply(slug, &values);
        }

        let ctx = CompileContext::new(self.translations.as_ref())
            .with_language(params.language.as_deref());
        let ids = params
            .ids
            .as_deref()
            .and_then(|raw| ids_predicate(entity, raw));
        let ids_active = usize::from(ids.is_some());
        let filter = compile_from(ids.unwrap_or_default(), entity, &values, &ctx);
        let active_filters = filter.active_filters + ids_active;

        let can_bypass = self
            .permissions
            .has_capability(caller, &self.config.bypass_ordering_capability);
        let ordering = resolve_ordering(
            params.ordering.as_deref(),
            params.reverse_order,
            entity.ordering(),
            can_bypass,
        );

        let predicate = match null_hiding_predicate(&ordering, active_filters) {
            Some(hide_nulls) => filter.predicate.clone().and(hide_nulls),
            None => filter.predicate.clone(),
        };

        let page_request = PageRequest {
            index: params.page_index(),
            size: self.config.page_size(params.page_size, entity.page_size()),
            per_line: entity.per_line().unwrap_or(self.config.default_per_line),
            show_group_headers: entity.show_group_headers(),
            default_filters: active_filters == 0 && ordering.is_default,
        };

        let canonical_preset = resolver
            .matches_among(visible.iter().copied(), &values)
            .map(|preset| preset.slug.clone());

        let query = CompiledQuery {
            predicate,
            distinct: filter.distinct,
            order_keys: ordering.keys.clone(),
            reverse: ordering.reverse,
        };

        tracing::debug!(
            entity = entity.name(),
            active_filters,
            ordering = %crate::filtering::sort::join_keys(&ordering.keys),
            page = page_request.index,
            preset = applied_preset.as_deref(),
            "Prepared list request"
        );

        PreparedList {
            params,
            values,
            applied_preset,
            canonical_preset,
            visible_presets: visible.into_iter().map(PresetSummary::from).collect(),
            filter,
            active_filters,
            ordering,
            query,
            page_request,
        }
    }

    /// Search help text of `entity` in `language`, computed once per pair.
    #[must_use]
    pub fn search_help_text(&self, entity: &EntityFilters, language: Option<&str>) -> Option<Arc<str>> {
        let search = entity.search()?;
        Some(
            self.help_texts
                .get_or_compute(entity.name(), language, || search.help_text(language)),
        )
    }

    /// Run the full pipeline against `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's `DbErr` unchanged. Malformed input never errors.
    pub async fn list<S>(
        &self,
        entity: &EntityFilters,
        store: &S,
        request: &ListRequest,
        group_key: Option<&GroupKeyFn<S::Item>>,
    ) -> Result<ListOutcome<S::Item>, DbErr>
    where
        S: DataStore + ?Sized,
    {
        let prepared = self.prepare(entity, request);
        let page = paginate(store, &prepared.query, &prepared.page_request, group_key).await?;
        let search_help_text = self.search_help_text(entity, prepared.params.language.as_deref());
        Ok(ListOutcome {
            page,
            prepared,
            search_help_text,
        })
    }
}

/// Predicate a request compiles to, without touching a store.
#[must_use]
pub fn compiled_predicate(engine: &ListEngine, entity: &EntityFilters, query: &str) -> Predicate {
    engine
        .prepare(entity, &ListRequest::from_query_string(query))
        .query
        .predicate
}
