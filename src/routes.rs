use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::filtering::pagination::{GroupKeyFn, calculate_content_range};
use crate::filtering::spec::EntityFilters;
use crate::listing::{ListEngine, ListRequest};
use crate::models::ListResponse;
use crate::permissions::Caller;
use crate::store::DataStore;

/// Handler state: one listed entity and where its rows come from.
pub struct ListService<S: DataStore> {
    pub engine: Arc<ListEngine>,
    pub entity: Arc<EntityFilters>,
    pub store: Arc<S>,
    pub group_key: Option<Arc<GroupKeyFn<S::Item>>>,
}

impl<S: DataStore> Clone for ListService<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            entity: Arc::clone(&self.entity),
            store: Arc::clone(&self.store),
            group_key: self.group_key.clone(),
        }
    }
}

impl<S: DataStore> ListService<S> {
    pub fn new(engine: Arc<ListEngine>, entity: Arc<EntityFilters>, store: S) -> Self {
        Self {
            engine,
            entity,
            store: Arc::new(store),
            group_key: None,
        }
    }

    /// Emit group-header flags keyed by `group_key` when the entity shows them.
    #[must_use]
    pub fn with_group_key(
        mut self,
        group_key: impl Fn(&S::Item) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.group_key = Some(Arc::new(group_key));
        self
    }

    async fn respond(
        &self,
        request: ListRequest,
    ) -> Result<(HeaderMap, Json<ListResponse<S::Item>>), ApiError> {
        let outcome = self
            .engine
            .list(
                self.entity.as_ref(),
                self.store.as_ref(),
                &request,
                self.group_key.as_deref(),
            )
            .await?;

        let meta = outcome.meta();
        let headers = calculate_content_range(
            outcome.page.offset(),
            outcome.page.items.len() as u64,
            outcome.page.total_results,
            self.entity.name(),
        );
        Ok((headers, Json(ListResponse::new(outcome.page, meta))))
    }
}

// List the entity, filtered by the query string.
pub async fn list_handler<S>(
    State(service): State<ListService<S>>,
    caller: Caller,
    RawQuery(query): RawQuery,
) -> Result<(HeaderMap, Json<ListResponse<S::Item>>), ApiError>
where
    S: DataStore + 'static,
    S::Item: Serialize,
{
    let request = ListRequest::from_query_string(query.as_deref().unwrap_or_default())
        .with_caller(caller);
    service.respond(request).await
}

// Same list with a preset's values applied on top of the query string.
pub async fn preset_list_handler<S>(
    State(service): State<ListService<S>>,
    caller: Caller,
    Path(preset): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<(HeaderMap, Json<ListResponse<S::Item>>), ApiError>
where
    S: DataStore + 'static,
    S::Item: Serialize,
{
    let request = ListRequest::from_query_string(query.as_deref().unwrap_or_default())
        .with_preset(preset)
        .with_caller(caller);
    service.respond(request).await
}

/// `GET /` lists the entity, `GET /{preset}` lists it through a preset.
///
/// Nest one router per entity; paths matching no entity get axum's 404.
pub fn list_router<S>(service: ListService<S>) -> Router
where
    S: DataStore + 'static,
    S::Item: Serialize,
{
    Router::new()
        .route("/", get(list_handler::<S>))
        .route("/{preset}", get(preset_list_handler::<S>))
        .with_state(service)
}
