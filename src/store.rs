//! Narrow data-store interface consumed by the paginator.

use async_trait::async_trait;
use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::{Alias, Expr, SimpleExpr},
};
use std::marker::PhantomData;

use crate::filtering::predicate::Predicate;
use crate::filtering::sort::OrderKey;

/// Everything the store needs to run one listing query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    pub distinct: bool,
    /// Final sort keys, primary first, with any reversal already applied
    pub order_keys: Vec<OrderKey>,
    /// Whether the ordering was reversed. Informational: stores sort by
    /// `order_keys` alone.
    pub reverse: bool,
}

impl CompiledQuery {
    #[must_use]
    pub fn condition(&self, backend: DbBackend) -> Condition {
        self.predicate.to_condition(backend)
    }
}

/// Counting and windowed fetching over a compiled query.
///
/// Errors are returned unchanged; listing never retries or swallows them.
#[async_trait]
pub trait DataStore: Send + Sync {
    type Item: Send;

    /// Number of rows matching the query, ignoring any window.
    async fn count(&self, query: &CompiledQuery) -> Result<u64, DbErr>;

    /// Rows `offset..offset + limit` of the ordered query.
    async fn fetch(
        &self,
        query: &CompiledQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::Item>, DbErr>;
}

/// [`DataStore`] over a sea-orm entity.
pub struct SeaOrmStore<E> {
    db: DatabaseConnection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SeaOrmStore<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: EntityTrait> SeaOrmStore<E> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    fn select(&self, query: &CompiledQuery) -> Select<E> {
        let mut select = E::find().filter(query.condition(self.db.get_database_backend()));
        for key in &query.order_keys {
            let column: SimpleExpr = Expr::col(Alias::new(key.column.as_str())).into();
            select = select.order_by(column, key.order());
        }
        if query.distinct {
            select = select.distinct();
        }
        select
    }
}

#[async_trait]
impl<E> DataStore for SeaOrmStore<E>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    type Item = E::Model;

    async fn count(&self, query: &CompiledQuery) -> Result<u64, DbErr> {
        self.select(query).count(&self.db).await
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::Item>, DbErr> {
        self.select(query)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
    }
}
