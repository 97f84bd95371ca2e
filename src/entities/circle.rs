use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "circles")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub profile_image: Option<String>,
    pub admin_id: String,
    #[sea_orm(unique)]
    pub circle_code: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::circle_member::Entity")]
    CircleMember,
}

impl Related<super::circle_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CircleMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
