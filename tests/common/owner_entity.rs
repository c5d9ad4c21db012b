use crudlink::links::LinkedRecord;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "owners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_entity::Entity")]
    Items,
}

impl Related<super::item_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Link target for an owner known only by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerRef(pub i32);

impl LinkedRecord for OwnerRef {
    fn entity_name(&self) -> &str {
        "Owner"
    }

    fn record_id(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}
