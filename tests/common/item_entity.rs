use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use crudlink::filtering::FieldTable;
use crudlink::links::{LinkedRecord, Relation as LinkRelation};
use crudlink::traits::{ApiMethod, ApiResource, MergeIntoActiveModel, UpdateMode};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use super::owner_entity::OwnerRef;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub priority: i32,
    pub owner_id: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::owner_entity::Entity",
        from = "Column::OwnerId",
        to = "super::owner_entity::Column::Id"
    )]
    Owner,
}

impl Related<super::owner_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub status: String,
    pub priority: i32,
    pub owner_id: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Item {
    fn from(model: Model) -> Self {
        Item {
            id: model.id,
            name: model.name,
            status: model.status,
            priority: model.priority,
            owner_id: model.owner_id,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ItemCreate {
    pub name: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub priority: i32,
    pub owner_id: i32,
}

fn default_status() -> String {
    "open".to_string()
}

impl From<ItemCreate> for ActiveModel {
    fn from(create: ItemCreate) -> Self {
        ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(create.name),
            status: ActiveValue::Set(create.status),
            priority: ActiveValue::Set(create.priority),
            owner_id: ActiveValue::Set(create.owner_id),
            updated_at: ActiveValue::Set(Utc::now()),
        }
    }
}

/// Update body; every field is optional so it serves both `PUT` and `PATCH`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    pub owner_id: Option<i32>,
}

impl MergeIntoActiveModel<ActiveModel> for ItemUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel, mode: UpdateMode) -> Result<ActiveModel, DbErr> {
        match mode {
            UpdateMode::Merge => {
                if let Some(name) = self.name {
                    existing.name = ActiveValue::Set(name);
                }
                if let Some(status) = self.status {
                    existing.status = ActiveValue::Set(status);
                }
                if let Some(priority) = self.priority {
                    existing.priority = ActiveValue::Set(priority);
                }
                if let Some(owner_id) = self.owner_id {
                    existing.owner_id = ActiveValue::Set(owner_id);
                }
            }
            UpdateMode::Replace => {
                let (Some(name), Some(owner_id)) = (self.name, self.owner_id) else {
                    return Err(DbErr::Custom("name and owner_id are required".to_string()));
                };
                existing.name = ActiveValue::Set(name);
                existing.status = ActiveValue::Set(self.status.unwrap_or_else(default_status));
                existing.priority = ActiveValue::Set(self.priority.unwrap_or_default());
                existing.owner_id = ActiveValue::Set(owner_id);
            }
        }
        existing.updated_at = ActiveValue::Set(Utc::now());
        Ok(existing)
    }
}

impl LinkedRecord for Item {
    fn entity_name(&self) -> &str {
        "Item"
    }

    fn record_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn relations(&self) -> Vec<LinkRelation> {
        vec![LinkRelation::single("owner", Some(&OwnerRef(self.owner_id)))]
    }
}

/// Header scoping list requests to one owner.
pub const OWNER_SCOPE_HEADER: &str = "x-owner-scope";
/// Header marking a read-only caller.
pub const READ_ONLY_HEADER: &str = "x-read-only";

#[async_trait]
impl ApiResource for Item {
    type EntityType = Entity;
    type ModelType = Model;
    type ActiveModelType = ActiveModel;
    type CreateModel = ItemCreate;
    type UpdateModel = ItemUpdate;

    const RESOURCE_NAME: &'static str = "Item";

    fn field_table() -> FieldTable {
        FieldTable::from_entity::<Entity>().association("owner", "owner_id")
    }

    fn joins() -> Vec<(String, RelationDef)> {
        vec![("owner".to_string(), Relation::Owner.def())]
    }

    fn authorize(method: ApiMethod, headers: &HeaderMap) -> bool {
        method == ApiMethod::GetList
            || method == ApiMethod::GetSingle
            || !headers.contains_key(READ_ONLY_HEADER)
    }

    fn list_filters(headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .get(OWNER_SCOPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|owner| vec![("owner".to_string(), owner.to_string())])
            .unwrap_or_default()
    }

    fn validate_record(record: &ItemCreate, _method: ApiMethod) -> Result<(), Vec<String>> {
        if record.name.trim().is_empty() {
            return Err(vec!["name is required".to_string()]);
        }
        Ok(())
    }

    fn validate_update(record: &ItemUpdate, mode: UpdateMode) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        match &record.name {
            Some(name) if name.trim().is_empty() => errors.push("name is required".to_string()),
            None if mode == UpdateMode::Replace => errors.push("name is required".to_string()),
            _ => {}
        }
        if record.owner_id.is_none() && mode == UpdateMode::Replace {
            errors.push("owner_id is required".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn before_save(active_model: &mut ActiveModel, _method: ApiMethod) {
        let trimmed = match &active_model.name {
            ActiveValue::Set(name) if name.trim() != name => Some(name.trim().to_string()),
            _ => None,
        };
        if let Some(name) = trimmed {
            active_model.name = ActiveValue::Set(name);
        }
    }
}
