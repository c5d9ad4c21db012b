use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationDef, Select, sea_query::Alias,
};
use std::marker::PhantomData;

use crate::filtering::{FilterQuery, build_condition, order_exprs};

/// Anything that can count and window the records matching a [`FilterQuery`].
#[async_trait]
pub trait QuerySource: Send + Sync {
    type Record: Send;

    /// Total number of matching records.
    async fn count(&self, query: &FilterQuery) -> Result<u64, DbErr>;

    /// Matching records in `[offset, offset + limit)`.
    async fn fetch(
        &self,
        query: &FilterQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::Record>, DbErr>;
}

/// [`QuerySource`] over a Sea-ORM entity.
///
/// Direct filters are qualified with the entity's table name. Nested filters
/// (`owner_name`) need a matching join registered with [`with_joins`](Self::with_joins):
///
/// ```rust,ignore
/// fn item_joins() -> Vec<(String, RelationDef)> {
///     vec![("owner".into(), items::Relation::Owner.def())]
/// }
///
/// let source = EntitySource::<items::Entity>::new(&db).with_joins(item_joins);
/// ```
pub struct EntitySource<'db, E: EntityTrait> {
    db: &'db DatabaseConnection,
    joins: JoinFactory,
    entity: PhantomData<E>,
}

/// Builds the `(alias, relation)` pairs to LEFT JOIN.
///
/// Joining consumes a `RelationDef`, so this runs once per statement.
pub type JoinFactory = fn() -> Vec<(String, RelationDef)>;

fn no_joins() -> Vec<(String, RelationDef)> {
    Vec::new()
}

impl<'db, E: EntityTrait> EntitySource<'db, E> {
    pub fn new(db: &'db DatabaseConnection) -> Self {
        Self {
            db,
            joins: no_joins,
            entity: PhantomData,
        }
    }

    /// LEFT JOIN the relations `joins` returns, each under its alias, so
    /// `alias_field` filters resolve.
    #[must_use]
    pub fn with_joins(mut self, joins: JoinFactory) -> Self {
        self.joins = joins;
        self
    }

    /// Table name direct columns are qualified with.
    #[must_use]
    pub fn table_name() -> String {
        E::default().table_name().to_string()
    }

    /// Filtered and ordered select, without windowing.
    #[must_use]
    pub fn select(&self, query: &FilterQuery) -> Select<E> {
        let table = Self::table_name();

        let mut select = E::find();
        for (alias, relation) in (self.joins)() {
            select = select.join_as(JoinType::LeftJoin, relation, Alias::new(alias));
        }

        select = select.filter(build_condition(query, &table));
        for (column, direction) in order_exprs(query, &table) {
            select = select.order_by(column, direction);
        }
        select
    }
}

#[async_trait]
impl<E> QuerySource for EntitySource<'_, E>
where
    E: EntityTrait + Send + Sync,
    E::Model: Send + Sync,
{
    type Record = E::Model;

    async fn count(&self, query: &FilterQuery) -> Result<u64, DbErr> {
        self.select(query).count(self.db).await
    }

    async fn fetch(
        &self,
        query: &FilterQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::Record>, DbErr> {
        self.select(query)
            .offset(offset)
            .limit(limit)
            .all(self.db)
            .await
    }
}
