use async_trait::async_trait;
use axum::http::HeaderMap;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    RelationDef,
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

use crate::filtering::{FieldTable, FilterQuery};
use crate::links::LinkedRecord;
use crate::pagination::{Page, Paginator};
use crate::source::{EntitySource, QuerySource};

/// Operations exposed for a resource, passed to the authorization and validation hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    GetSingle,
    GetList,
    Create,
    CreateBulk,
    Update,
    Delete,
}

impl ApiMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetSingle => "GET_SINGLE",
            Self::GetList => "GET_LIST",
            Self::Create => "CREATE",
            Self::CreateBulk => "CREATE_BULK",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an update body is applied to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// `PUT`: fields missing from the body are reset.
    Replace,
    /// `PATCH`: fields missing from the body keep their stored value.
    Merge,
}

pub trait MergeIntoActiveModel<ActiveModelType> {
    /// Apply this update onto the stored record.
    ///
    /// # Errors
    ///
    /// Fails when the update cannot be applied in `mode`.
    fn merge_into_activemodel(
        self,
        existing: ActiveModelType,
        mode: UpdateMode,
    ) -> Result<ActiveModelType, DbErr>;
}

/// A Sea-ORM entity exposed through the list, single-record, create, update,
/// delete and bulk endpoints.
///
/// `Self` is the API representation of a record; it is built from the
/// entity's model and carries its own links.
///
/// ```rust,ignore
/// impl ApiResource for Item {
///     type EntityType = items::Entity;
///     type ModelType = items::Model;
///     type ActiveModelType = items::ActiveModel;
///     type CreateModel = NewItem;
///     type UpdateModel = ItemUpdate;
///
///     const RESOURCE_NAME: &'static str = "Item";
///
///     fn joins() -> Vec<(String, RelationDef)> {
///         vec![("owner".into(), items::Relation::Owner.def())]
///     }
/// }
/// ```
#[async_trait]
pub trait ApiResource: LinkedRecord + Serialize + Sized + Send + Sync + 'static
where
    Self: From<Self::ModelType>,
{
    type EntityType: EntityTrait<Model = Self::ModelType> + Sync;
    type ModelType: IntoActiveModel<Self::ActiveModelType> + Send + Sync + 'static;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType> + ActiveModelBehavior + Send + Sync + 'static;
    type CreateModel: DeserializeOwned + Into<Self::ActiveModelType> + Send + 'static;
    type UpdateModel: DeserializeOwned + MergeIntoActiveModel<Self::ActiveModelType> + Send + 'static;

    /// Entity name used in route names, e.g. `Item` for `api_item_getlist`.
    const RESOURCE_NAME: &'static str;
    /// Integer identity column.
    const ID_FIELD: &'static str = "id";

    /// Fields accepted as filters and as `orderBy` targets.
    #[must_use]
    fn field_table() -> FieldTable {
        FieldTable::from_entity::<Self::EntityType>()
    }

    /// Relations joined into list queries, keyed by the prefix used in nested filters.
    #[must_use]
    fn joins() -> Vec<(String, RelationDef)> {
        Vec::new()
    }

    /// Whether the caller may run `method`. Everything is allowed by default.
    fn authorize(_method: ApiMethod, _headers: &HeaderMap) -> bool {
        true
    }

    /// Filters forced onto every list request, e.g. scoping to the caller's account.
    ///
    /// They override query parameters with the same key.
    #[must_use]
    fn list_filters(_headers: &HeaderMap) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Check a record before it is stored.
    ///
    /// # Errors
    ///
    /// Returns the validation messages reported back to the client.
    fn validate_record(_record: &Self::CreateModel, _method: ApiMethod) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Check an update body before it is applied.
    ///
    /// # Errors
    ///
    /// Returns the validation messages reported back to the client.
    fn validate_update(_record: &Self::UpdateModel, _mode: UpdateMode) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Adjust a record right before it is inserted or updated.
    fn before_save(_active_model: &mut Self::ActiveModelType, _method: ApiMethod) {}

    /// Runs after a record was inserted or updated.
    async fn after_save(_db: &DatabaseConnection, _record: &Self, _method: ApiMethod) -> Result<(), DbErr> {
        Ok(())
    }

    /// Runs after a record was deleted.
    async fn after_delete(_db: &DatabaseConnection, _id: i64) -> Result<(), DbErr> {
        Ok(())
    }

    #[must_use]
    fn source(db: &DatabaseConnection) -> EntitySource<'_, Self::EntityType> {
        EntitySource::new(db).with_joins(Self::joins)
    }

    async fn get_page(
        db: &DatabaseConnection,
        query: &FilterQuery,
        page_number: u64,
        page_size: u64,
    ) -> Result<Page<Self>, DbErr> {
        let source = Self::source(db);
        let page = Paginator::new(&source)
            .with_page_size(page_size)
            .paginate(query, page_number)
            .await?;
        Ok(page.map(Self::from))
    }

    async fn find_model(db: &DatabaseConnection, id: i64) -> Result<Self::ModelType, DbErr> {
        let query = FilterQuery::by_ids(Self::ID_FIELD, &[id]);
        Self::source(db)
            .fetch(&query, 0, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbErr::RecordNotFound(format!("{} not found", Self::RESOURCE_NAME)))
    }

    async fn get_one(db: &DatabaseConnection, id: i64) -> Result<Self, DbErr> {
        Ok(Self::from(Self::find_model(db, id).await?))
    }

    async fn create(
        db: &DatabaseConnection,
        create_model: Self::CreateModel,
        method: ApiMethod,
    ) -> Result<Self, DbErr> {
        let mut active_model: Self::ActiveModelType = create_model.into();
        Self::before_save(&mut active_model, method);
        let record = Self::from(active_model.insert(db).await?);
        Self::after_save(db, &record, method).await?;
        Ok(record)
    }

    async fn update(
        db: &DatabaseConnection,
        id: i64,
        update_model: Self::UpdateModel,
        mode: UpdateMode,
    ) -> Result<Self, DbErr> {
        let existing: Self::ActiveModelType = Self::find_model(db, id).await?.into_active_model();
        let mut active_model = update_model.merge_into_activemodel(existing, mode)?;
        Self::before_save(&mut active_model, ApiMethod::Update);
        let record = Self::from(active_model.update(db).await?);
        Self::after_save(db, &record, ApiMethod::Update).await?;
        Ok(record)
    }

    async fn delete(db: &DatabaseConnection, id: i64) -> Result<(), DbErr> {
        let active_model: Self::ActiveModelType = Self::find_model(db, id).await?.into_active_model();
        active_model.delete(db).await?;
        Self::after_delete(db, id).await
    }
}
